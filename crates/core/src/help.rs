//! Help data and the renderers that turn it into output.
//!
//! The router never formats text itself. It collects a [`HelpData`] and hands
//! it to whichever [`HelpRenderer`] the [`crate::cli::Cli`] was built with.

use std::io::{stdout, IsTerminal, Stdout, Write};

use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use serde::Serialize;

use crate::binding::builtin_options;
use crate::cli::CliConfig;
use crate::command_definitions::{ArgumentSpec, ArgumentsDescriptor, CommandType, OptionBinding};
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::value::{Value, ValueType};

/// Total width help text is wrapped to, padding included.
pub const HELP_WIDTH: usize = 80;

/// Left padding of indented help lines.
pub const HELP_PADDING: usize = 4;

const NO_DESCRIPTION: &str = "(no description provided)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HelpKind {
    Usage,
    Version,
    Examples,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgumentSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub required: bool,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&ArgumentSpec> for ArgumentSummary {
    fn from(spec: &ArgumentSpec) -> Self {
        Self {
            name: spec.name.clone(),
            value_type: spec.value_type,
            required: spec.required,
            pattern: spec.pattern.as_ref().map(|pattern| pattern.as_str().to_string()),
            default: spec.default.clone(),
            description: spec.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverloadSummary {
    pub arguments: Vec<ArgumentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&ArgumentsDescriptor> for OverloadSummary {
    fn from(descriptor: &ArgumentsDescriptor) -> Self {
        Self {
            arguments: descriptor.arguments.iter().map(ArgumentSummary::from).collect(),
            description: descriptor.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shorthand: Option<String>,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&OptionBinding> for OptionSummary {
    fn from(binding: &OptionBinding) -> Self {
        Self {
            name: binding.spec.long_name(),
            shorthand: binding.spec.shorthand.clone(),
            value_type: binding.spec.value_type,
            env: binding.spec.env.clone(),
            description: binding.spec.description.clone(),
        }
    }
}

/// Everything a renderer needs to describe one point of the command tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HelpData {
    pub kind: HelpKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandSummary>,
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<CommandSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overloads: Vec<OverloadSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl HelpData {
    fn empty(kind: HelpKind, cli: &CliConfig, path: &str) -> Self {
        Self {
            kind,
            title: cli.title.clone(),
            description: cli.description.clone(),
            command: None,
            path: path.to_string(),
            subcommands: Vec::new(),
            overloads: Vec::new(),
            options: Vec::new(),
            message: None,
            suggestions: Vec::new(),
            version: None,
            examples: Vec::new(),
        }
    }

    /// Help for the CLI itself, listing its top-level commands.
    #[must_use]
    pub fn for_root(kind: HelpKind, cli: &CliConfig, registry: &Registry) -> Self {
        let mut help = Self::empty(kind, cli, &cli.name);
        help.subcommands = summarize_commands(registry, &cli.commands);
        help.options = builtin_options().iter().map(OptionSummary::from).collect();
        help.version = cli.version.clone();
        help.examples = cli
            .commands
            .iter()
            .filter_map(|command| registry.descriptor(command).example)
            .collect();
        help
    }

    /// Help for `command`, reached through `path`.
    ///
    /// The version is the command's own, or the CLI's when the command
    /// declares none.
    #[must_use]
    pub fn for_command(
        kind: HelpKind,
        cli: &CliConfig,
        registry: &Registry,
        command: &CommandType,
        path: &str,
    ) -> Self {
        let entry = registry.entry(command);
        let descriptor = &entry.descriptor;

        let mut help = Self::empty(kind, cli, path);
        help.command = Some(CommandSummary {
            name: registry.name_of(command),
            description: descriptor.description.clone(),
        });
        help.subcommands = summarize_commands(registry, &descriptor.subcommands);
        help.overloads = entry
            .overloads
            .iter()
            .map(|overload| OverloadSummary::from(&overload.descriptor))
            .collect();
        help.options = entry
            .options
            .iter()
            .chain(&builtin_options())
            .map(OptionSummary::from)
            .collect();
        help.version = descriptor.version.clone().or_else(|| cli.version.clone());
        help.examples = descriptor.example.iter().cloned().collect();
        help
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Keeps only overload `index`, dropping the subcommand listing.
    #[must_use]
    pub fn only_overload(mut self, index: usize) -> Self {
        self.overloads = self.overloads.into_iter().nth(index).into_iter().collect();
        self.subcommands.clear();
        self
    }
}

fn summarize_commands(registry: &Registry, commands: &[CommandType]) -> Vec<CommandSummary> {
    commands
        .iter()
        .map(|command| CommandSummary {
            name: registry.name_of(command),
            description: registry.descriptor(command).description,
        })
        .collect()
}

pub trait HelpRenderer {
    /// # Errors
    ///
    /// Returns an error when the output cannot be written.
    fn render(&mut self, help: &HelpData) -> Result<()>;
}

impl<R: HelpRenderer + ?Sized> HelpRenderer for &mut R {
    fn render(&mut self, help: &HelpData) -> Result<()> {
        (**self).render(help)
    }
}

/// Word-wraps `text` to [`HELP_WIDTH`] columns, prefixing every line with
/// `padding`.
#[must_use]
pub fn wrap_description(text: &str, padding: &str) -> Vec<String> {
    let mut lines = vec![padding.to_string()];

    for word in text.split_whitespace() {
        let Some(line) = lines.last_mut() else {
            break;
        };

        let separator = usize::from(line.len() > padding.len());
        if line.len() > padding.len() && line.len() + separator + word.len() > HELP_WIDTH {
            lines.push(format!("{padding}{word}"));
        } else {
            if separator == 1 {
                line.push(' ');
            }
            line.push_str(word);
        }
    }

    lines
}

/// Human-readable help, coloured when the output is a terminal.
pub struct TextRenderer<W: Write> {
    out: W,
    color: bool,
}

impl TextRenderer<Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        let out = stdout();
        let color = out.is_terminal();
        Self { out, color }
    }
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn styled(&mut self, text: &str, color: Color) -> Result<()> {
        if self.color {
            queue!(self.out, SetForegroundColor(color), Print(text), ResetColor)?;
        } else {
            queue!(self.out, Print(text))?;
        }
        Ok(())
    }

    fn heading(&mut self, text: &str) -> Result<()> {
        if self.color {
            queue!(
                self.out,
                SetAttribute(Attribute::Bold),
                Print(text),
                SetAttribute(Attribute::Reset)
            )?;
        } else {
            queue!(self.out, Print(text))?;
        }
        Ok(())
    }

    fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    fn description(&mut self, text: Option<&str>, padding: &str) -> Result<()> {
        for line in wrap_description(text.unwrap_or(NO_DESCRIPTION), padding) {
            self.line(&line)?;
        }
        Ok(())
    }

    fn header(&mut self, help: &HelpData) -> Result<()> {
        let title = match &help.description {
            Some(description) => format!("{} - {description}", help.title),
            None => help.title.clone(),
        };
        self.styled(&title, Color::Cyan)?;
        self.line("")?;

        if let Some(command) = &help.command {
            let command_line = match &command.description {
                Some(description) => format!(" -> ... {} - {description}", command.name),
                None => format!(" -> ... {}", command.name),
            };
            self.styled(&command_line, Color::Cyan)?;
            self.line("")?;
        }

        self.line("")?;

        if let Some(message) = &help.message {
            for line in wrap_description(message, "* ") {
                self.styled(&line, Color::Yellow)?;
                self.line("")?;
            }

            if !help.suggestions.is_empty() {
                let suggestions = format!("  Did you mean: {}?", help.suggestions.join(", "));
                self.styled(&suggestions, Color::Yellow)?;
                self.line("")?;
            }
            self.line("")?;
        }

        Ok(())
    }

    fn usage(&mut self, help: &HelpData) -> Result<()> {
        let pad = " ".repeat(HELP_PADDING);

        self.heading("USAGE")?;
        self.line("\n")?;
        if !help.subcommands.is_empty() {
            self.line(&format!("{pad}{} <subcommand>", help.path))?;
        }
        if !help.overloads.is_empty() {
            self.line(&format!("{pad}{} <args...>", help.path))?;
        }
        if !help.options.is_empty() {
            self.line(&format!("{pad}{} <options...>", help.path))?;
        }

        if !help.subcommands.is_empty() {
            self.line("")?;
            self.heading("SUBCOMMANDS")?;
            self.line("\n")?;
            for command in &help.subcommands {
                self.styled(&format!("{pad}{}", command.name), Color::Green)?;
                self.line("")?;
                self.description(command.description.as_deref(), &pad.repeat(2))?;
            }
        }

        if !help.overloads.is_empty() {
            self.line("")?;
            self.heading("ARGUMENTS")?;
            self.line("")?;
            for overload in &help.overloads {
                let signature = overload
                    .arguments
                    .iter()
                    .map(|argument| {
                        if argument.required {
                            format!("<{}>", argument.name)
                        } else {
                            format!("[{}]", argument.name)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                self.line("")?;
                self.styled(&format!("{pad}{signature}"), Color::Green)?;
                self.line("")?;
                if let Some(description) = &overload.description {
                    self.description(Some(description), &pad.repeat(2))?;
                }
                for argument in &overload.arguments {
                    self.line(&format!("{}{}", pad.repeat(2), argument.name))?;
                    self.description(argument.description.as_deref(), &pad.repeat(3))?;
                }
            }
        }

        if !help.options.is_empty() {
            self.line("")?;
            self.heading("OPTIONS")?;
            self.line("\n")?;
            for option in &help.options {
                let flag = match &option.shorthand {
                    Some(shorthand) => format!("{pad}-{shorthand}, --{}", option.name),
                    None => format!("{pad}--{}", option.name),
                };
                self.styled(&flag, Color::Green)?;
                self.line("")?;
                self.description(option.description.as_deref(), &pad.repeat(2))?;
            }
        }

        Ok(())
    }
}

impl<W: Write> HelpRenderer for TextRenderer<W> {
    fn render(&mut self, help: &HelpData) -> Result<()> {
        self.header(help)?;

        match help.kind {
            HelpKind::Usage => self.usage(help)?,
            HelpKind::Version => {
                let version = help.version.as_deref().unwrap_or("(no version declared)");
                self.line(&format!("{} {version}", help.path))?;
            }
            HelpKind::Examples => {
                self.heading("EXAMPLES")?;
                self.line("\n")?;
                if help.examples.is_empty() {
                    self.line(&format!("{}(no examples provided)", " ".repeat(HELP_PADDING)))?;
                }
                for example in &help.examples {
                    for line in example.lines() {
                        self.line(&format!("{}{line}", " ".repeat(HELP_PADDING)))?;
                    }
                }
            }
        }

        self.out.flush()?;
        Ok(())
    }
}

/// Writes help data as YAML documents, for tooling that wraps the CLI.
pub struct StructuredRenderer<W: Write> {
    out: W,
}

impl StructuredRenderer<Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self { out: stdout() }
    }
}

impl<W: Write> StructuredRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> HelpRenderer for StructuredRenderer<W> {
    fn render(&mut self, help: &HelpData) -> Result<()> {
        let document = serde_yaml::to_string(help).map_err(|e| {
            Error::yaml_error(
                "serializing".to_string(),
                "help".to_string(),
                "-".to_string(),
                e,
            )
        })?;

        writeln!(self.out, "---")?;
        self.out.write_all(document.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Keeps every rendered [`HelpData`] instead of printing it.
#[derive(Debug, Default)]
pub struct MemoryRenderer {
    pub rendered: Vec<HelpData>,
}

impl MemoryRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last(&self) -> Option<&HelpData> {
        self.rendered.last()
    }
}

impl HelpRenderer for MemoryRenderer {
    fn render(&mut self, help: &HelpData) -> Result<()> {
        self.rendered.push(help.clone());
        Ok(())
    }
}
