/// Resolves the public name of a command or option.
///
/// An explicit `name` wins over the `key` (type or field name). The result is
/// kebab-cased: `BuildCommand` and `build_command` both become `build-command`.
#[must_use]
pub fn resolve_name(key: &str, name: Option<&str>) -> String {
    let source = match name {
        Some(name) if !name.is_empty() => name,
        _ => key,
    };

    let mut resolved = String::with_capacity(source.len() + 4);
    for (i, c) in source.chars().enumerate() {
        if c == '_' {
            resolved.push('-');
        } else if c.is_uppercase() {
            if i > 0 && !resolved.ends_with('-') {
                resolved.push('-');
            }
            resolved.extend(c.to_lowercase());
        } else {
            resolved.push(c);
        }
    }

    resolved
}

/// Last path segment of a Rust type name, without generic parameters.
#[must_use]
pub fn short_type_name(full: &'static str) -> &'static str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}
