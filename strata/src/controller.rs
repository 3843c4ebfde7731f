//! Controller, command and argument declarations.
//!
//! Everything in here is plain data built once at declaration time. The
//! engine never mutates a spec after it has been registered.

use crate::error::SetupError;
use crate::invocation::Invocation;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::sync::Arc;

/// Label of the root controller unless the engine is configured otherwise.
pub const ROOT_LABEL: &str = "base";

/// Convert an identifier into its command-line form (`my_cmd` -> `my-cmd`).
pub fn hyphenate(name: &str) -> String {
    name.replace('_', "-")
}

/// Convert a command-line name back into its identifier form.
pub fn unhyphenate(name: &str) -> String {
    name.replace('-', "_")
}

// ============================================================================
// Stacking
// ============================================================================

/// How a controller is composed into the controller it is stacked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackedType {
    /// Commands and options appear on the parent's own parser surface.
    Embedded,

    /// The controller becomes a sub-command of the parent with its own
    /// parser surface one level deeper.
    Nested,
}

impl StackedType {
    /// Parse a declared stacked type for the controller `label`.
    pub fn parse(label: &str, declared: &str) -> Result<Self, SetupError> {
        match declared {
            "embedded" => Ok(StackedType::Embedded),
            "nested" => Ok(StackedType::Nested),
            other => Err(SetupError::InvalidStackedType {
                label: label.to_string(),
                stacked_type: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StackedType::Embedded => "embedded",
            StackedType::Nested => "nested",
        }
    }
}

impl fmt::Display for StackedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// What the parser does when it meets an option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgAction {
    /// Store the following value.
    #[default]
    Store,

    /// Store `true` when present, `false` otherwise.
    StoreTrue,

    /// Store `false` when present, `true` otherwise.
    StoreFalse,

    /// Store the given constant when present.
    StoreConst(String),

    /// Collect every occurrence's value into a list.
    Append,

    /// Count occurrences.
    Count,
}

impl ArgAction {
    /// Whether the option consumes a value from the command line.
    pub fn takes_value(&self) -> bool {
        matches!(self, ArgAction::Store | ArgAction::Append)
    }
}

/// Options bag handed opaquely to the argument parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgOptions {
    /// Destination name in the parsed invocation.
    pub dest: Option<String>,

    /// Help text for `--help` output.
    pub help: Option<String>,

    pub action: ArgAction,

    /// Default value (only meaningful for value-taking and `store_const` actions).
    pub default: Option<String>,

    /// Allowed values.
    pub choices: Option<Vec<String>>,

    pub required: bool,

    /// Value placeholder name (e.g. `FILE`).
    pub metavar: Option<String>,

    /// Keep the option out of `--help` output.
    pub hidden: bool,
}

/// One option or positional argument: its flag strings plus options.
///
/// Flags starting with `--` are long options, `-x` is a short option, and a
/// single bare name declares a positional argument.
///
/// ```
/// use strata::ArgSpec;
///
/// let arg = ArgSpec::new(["-f", "--foo-bar"]).help("foo option");
/// assert_eq!(arg.dest(), "foo_bar");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    pub flags: Vec<String>,

    #[serde(default)]
    pub options: ArgOptions,
}

impl ArgSpec {
    /// Create an argument from its flag strings.
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: flags.into_iter().map(Into::into).collect(),
            options: ArgOptions::default(),
        }
    }

    /// Create a positional argument.
    pub fn positional(name: impl Into<String>) -> Self {
        Self::new([name.into()])
    }

    pub fn dest(&self) -> String {
        if let Some(dest) = &self.options.dest {
            return dest.clone();
        }

        let name = self
            .flags
            .iter()
            .find_map(|f| f.strip_prefix("--"))
            .or_else(|| self.flags.iter().find_map(|f| f.strip_prefix('-')))
            .or_else(|| self.flags.first().map(String::as_str))
            .unwrap_or_default();

        unhyphenate(name)
    }

    /// Whether this declares a positional argument rather than an option.
    pub fn is_positional(&self) -> bool {
        self.flags.len() == 1 && !self.flags[0].starts_with('-')
    }

    pub fn with_dest(mut self, dest: impl Into<String>) -> Self {
        self.options.dest = Some(dest.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.options.help = Some(help.into());
        self
    }

    pub fn action(mut self, action: ArgAction) -> Self {
        self.options.action = action;
        self
    }

    pub fn store_true(self) -> Self {
        self.action(ArgAction::StoreTrue)
    }

    pub fn store_false(self) -> Self {
        self.action(ArgAction::StoreFalse)
    }

    pub fn store_const(self, value: impl Into<String>) -> Self {
        self.action(ArgAction::StoreConst(value.into()))
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.options.default = Some(value.into());
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn required(mut self) -> Self {
        self.options.required = true;
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.options.metavar = Some(metavar.into());
        self
    }

    pub fn hide(mut self) -> Self {
        self.options.hidden = true;
        self
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Function invoked when a command is dispatched.
pub type CommandFn<R> = Arc<dyn Fn(&Invocation) -> R + Send + Sync>;

/// A command exposed by a controller.
///
/// # Example
///
/// ```
/// use strata::{ArgSpec, CommandSpec};
///
/// let cmd: CommandSpec<String> = CommandSpec::new("my_command", |_| "ran".to_string())
///     .help("this is the help message for my_command")
///     .alias("my-cmd")
///     .arg(ArgSpec::new(["-f", "--foo"]).help("foo option"));
///
/// assert_eq!(cmd.parser_name(), "my-command");
/// ```
pub struct CommandSpec<R> {
    pub name: String,
    pub help: Option<String>,
    pub hidden: bool,
    pub arguments: Vec<ArgSpec>,
    pub aliases: Vec<String>,
    func: CommandFn<R>,
}

impl<R> CommandSpec<R> {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Invocation) -> R + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            help: None,
            hidden: false,
            arguments: Vec::new(),
            aliases: Vec::new(),
            func: Arc::new(func),
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn hide(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.arguments.push(arg);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Name of the sub-command as typed on the command line.
    pub fn parser_name(&self) -> String {
        hyphenate(&self.name)
    }

    pub fn func(&self) -> CommandFn<R> {
        Arc::clone(&self.func)
    }
}

impl<R> Clone for CommandSpec<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            help: self.help.clone(),
            hidden: self.hidden,
            arguments: self.arguments.clone(),
            aliases: self.aliases.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<R> fmt::Debug for CommandSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("help", &self.help)
            .field("hidden", &self.hidden)
            .field("arguments", &self.arguments)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Controllers
// ============================================================================

fn default_stacked_on() -> Option<String> {
    Some(ROOT_LABEL.to_string())
}

fn default_stacked_type() -> String {
    StackedType::Embedded.as_str().to_string()
}

fn default_title() -> String {
    "sub-commands".to_string()
}

/// Declarative configuration of one controller.
///
/// `stacked_type` is kept as declared and only validated by the stack
/// resolver, so a manifest with an unknown value still registers and fails at
/// setup with [`SetupError::InvalidStackedType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSpec {
    pub label: String,

    /// Parent controller. Ignored for the root.
    #[serde(default = "default_stacked_on")]
    pub stacked_on: Option<String>,

    #[serde(default = "default_stacked_type")]
    pub stacked_type: String,

    #[serde(default)]
    pub arguments: Vec<ArgSpec>,

    /// Alternate names (nested controllers only).
    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub hidden: bool,

    /// Text shown next to the controller in its parent's listing.
    #[serde(default)]
    pub help: Option<String>,

    /// Text at the top of the controller's own `--help`.
    #[serde(default)]
    pub description: Option<String>,

    /// Text at the bottom of the controller's own `--help`.
    #[serde(default)]
    pub epilog: Option<String>,

    /// Heading of the sub-command listing.
    #[serde(default = "default_title")]
    pub title: String,

    /// Command to run when no sub-command is given.
    #[serde(default)]
    pub default_command: Option<String>,

    /// Usage line replacing the generated one (root and nested only).
    #[serde(default)]
    pub usage: Option<String>,
}

impl ControllerSpec {
    /// Create a controller embedded on the root (or the root itself when
    /// `label` is [`ROOT_LABEL`]).
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let stacked_on = (label != ROOT_LABEL).then(|| ROOT_LABEL.to_string());

        Self {
            label,
            stacked_on,
            stacked_type: default_stacked_type(),
            arguments: Vec::new(),
            aliases: Vec::new(),
            hidden: false,
            help: None,
            description: None,
            epilog: None,
            title: default_title(),
            default_command: None,
            usage: None,
        }
    }

    /// Create the root controller.
    pub fn root() -> Self {
        Self::new(ROOT_LABEL)
    }

    pub fn stacked_on(mut self, parent: impl Into<String>) -> Self {
        self.stacked_on = Some(parent.into());
        self
    }

    /// Mark this controller as having no parent.
    pub fn unstacked(mut self) -> Self {
        self.stacked_on = None;
        self
    }

    pub fn stacked_type(mut self, stacked_type: impl Into<String>) -> Self {
        self.stacked_type = stacked_type.into();
        self
    }

    pub fn embedded(self) -> Self {
        self.stacked_type(StackedType::Embedded.as_str())
    }

    pub fn nested(self) -> Self {
        self.stacked_type(StackedType::Nested.as_str())
    }

    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.arguments.push(arg);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn hide(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn epilog(mut self, epilog: impl Into<String>) -> Self {
        self.epilog = Some(epilog.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn default_command(mut self, command: impl Into<String>) -> Self {
        self.default_command = Some(command.into());
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Help text in the parent's listing, `"<label> controller"` if unset.
    pub fn help_text(&self) -> String {
        self.help
            .clone()
            .unwrap_or_else(|| format!("{} controller", hyphenate(&self.label)))
    }

    /// Sub-command name of a nested controller.
    pub fn parser_name(&self) -> String {
        hyphenate(&self.label)
    }
}

/// A type that declares a controller and the commands it exposes.
///
/// # Example
///
/// ```
/// use strata::{CommandSpec, Controller, ControllerSpec};
///
/// struct Users;
///
/// impl Controller<String> for Users {
///     fn spec(&self) -> ControllerSpec {
///         ControllerSpec::new("users").nested().default_command("list")
///     }
///
///     fn commands(&self) -> Vec<CommandSpec<String>> {
///         vec![CommandSpec::new("list", |_| "alice, bob".to_string())]
///     }
/// }
/// ```
///
/// The two hooks run on every registered controller, in stacking order, each
/// time the engine dispatches. They run whichever command is finally
/// selected.
pub trait Controller<R> {
    fn spec(&self) -> ControllerSpec;

    fn commands(&self) -> Vec<CommandSpec<R>>;

    /// Called before the argument list is parsed.
    fn pre_parse(&self, _argv: &[OsString]) {}

    /// Called after a successful parse, before the command runs.
    fn post_parse(&self, _invocation: &Invocation) {}
}
