//! Argument parser primitive.
//!
//! The engine never touches clap directly: it builds its tree through the
//! [`ArgumentParser`] trait, one parser and sub-command group at a time, and
//! asks the same backend to parse the final argument list. [`ClapParser`] is
//! the implementation used by default.

mod clap_backend;

pub use clap_backend::ClapParser;

use crate::controller::ArgSpec;
use crate::invocation::Invocation;
use std::ffi::OsString;

/// Handle to a parser created by an [`ArgumentParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParserId(usize);

impl ParserId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a sub-command group created by an [`ArgumentParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

impl GroupId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Presentation options of one parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// One-line help shown in the parent's sub-command listing.
    pub help: Option<String>,

    /// Text at the top of this parser's `--help`.
    pub description: Option<String>,

    /// Text at the bottom of this parser's `--help`.
    pub epilog: Option<String>,

    pub aliases: Vec<String>,

    /// Leave this parser out of the parent's listing.
    pub hidden: bool,

    /// Enables `-V/--version` on this parser.
    pub version: Option<String>,

    /// Replaces the generated usage line.
    pub usage: Option<String>,
}

/// Options of a sub-command group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupOptions {
    /// Heading of the sub-command listing.
    pub title: Option<String>,

    /// Reject input that stops at the owning parser without naming a
    /// sub-command (help is shown when nothing at all was typed).
    pub required: bool,
}

/// Setup-time failure reported by an argument parser.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("argument {flag}: conflicting option string on parser '{parser}'")]
    Conflict { parser: String, flag: String },

    #[error("invalid option string '{0}'")]
    InvalidFlag(String),

    #[error("parser '{0}' already has a sub-command group")]
    GroupExists(String),

    #[error("sub-command '{name}' already exists under parser '{parser}'")]
    DuplicateParser { parser: String, name: String },

    #[error("unknown parser or group handle")]
    UnknownHandle,
}

/// The primitive operations the engine needs from an argument parser.
pub trait ArgumentParser {
    /// Create a new top-level parser.
    fn create_parser(&mut self, name: &str, options: ParserOptions) -> ParserId;

    /// Add an option or positional argument to a parser.
    fn add_option(&mut self, parser: ParserId, arg: &ArgSpec) -> Result<(), ArgumentError>;

    /// Create the (single) sub-command group of a parser.
    fn add_subcommand_group(
        &mut self,
        parser: ParserId,
        options: GroupOptions,
    ) -> Result<GroupId, ArgumentError>;

    /// Create a sub-command parser inside a group.
    fn add_parser(
        &mut self,
        group: GroupId,
        name: &str,
        options: ParserOptions,
    ) -> Result<ParserId, ArgumentError>;

    /// Parse `tokens` (without the program name) starting at `root`.
    ///
    /// Values from every parser along the matched sub-command path are merged
    /// into one invocation: an explicitly given value always wins, and a
    /// default from a deeper parser replaces a default from a shallower one.
    /// A required option is satisfied when any parser on that path received
    /// it.
    fn parse(&self, root: ParserId, tokens: &[OsString]) -> Result<Invocation, clap::Error>;

    /// Render the `--help` text of a parser (the long form, with descriptions).
    fn render_help(&self, parser: ParserId) -> Option<String>;
}
