//! Error types.
//!
//! Setup and framework errors are bugs in how the CLI was declared and exit
//! with code 101. Usage errors come from the argument parser and carry its
//! own exit code (0 for `--help`/`--version`, 2 otherwise).

use crate::parser::ArgumentError;

/// Failure while building the command tree. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("controller label '{0}' is already registered")]
    DuplicateLabel(String),

    #[error("controller '{0}' is not registered")]
    NotFound(String),

    #[error("root controller '{0}' is not registered")]
    MissingRoot(String),

    #[error("unresolved controllers (stacked_on does not lead to the root): {}", .0.join(", "))]
    UnresolvedController(Vec<String>),

    #[error(
        "invalid stacked type '{stacked_type}' on controller '{label}', expecting one of: [embedded, nested]"
    )]
    InvalidStackedType { label: String, stacked_type: String },

    #[error(transparent)]
    ArgumentConflict(#[from] ArgumentError),

    #[error("command '{command}' declares option '{flag}' more than once")]
    DuplicateArgument { command: String, flag: String },

    #[error("command '{name}' is defined more than once under controller '{namespace}'")]
    DuplicateCommand { name: String, namespace: String },

    #[error("alias '{alias}' collides with an existing command or alias under controller '{namespace}'")]
    DuplicateAlias { alias: String, namespace: String },
}

/// A runtime invariant of the engine was violated.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("no command registered for route '{0}'")]
    UnknownRoute(String),

    #[error("controller '{label}' has no command '{command}' to run by default")]
    MissingDefaultCommand { label: String, command: String },

    /// [`Engine::dispatch`](crate::Engine::dispatch) answers this with the
    /// controller's help.
    #[error("controller '{0}' has no default command")]
    NoDefaultCommand(String),

    #[error("parsed input names unknown controller namespace '{0}'")]
    UnknownNamespace(String),
}

/// Top-level error returned by the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Internal Error: {0}\n\nThis is likely a bug.")]
    Setup(#[from] SetupError),

    /// Rejected or informational input (unknown flag, `--help`, ...).
    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error("Internal Error: {0}\n\nThis is likely a bug.")]
    Framework(#[from] FrameworkError),
}

impl Error {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(e) => e.exit_code(),
            Error::Setup(_) | Error::Framework(_) => 101,
        }
    }

    /// Whether the user caused this error (as opposed to the CLI's author).
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::Usage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_exit_code() {
        let err: Error = SetupError::DuplicateLabel("base".into()).into();
        assert_eq!(err.exit_code(), 101);
        assert!(!err.is_user_error());
        assert!(err.to_string().contains("This is likely a bug."));
    }

    #[test]
    fn test_usage_error_exit_code() {
        let err: Error =
            clap::Error::raw(clap::error::ErrorKind::UnknownArgument, "unexpected --x\n").into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.is_user_error());
    }

    #[test]
    fn test_unresolved_lists_every_label() {
        let err = SetupError::UnresolvedController(vec!["a".into(), "b".into()]);
        assert!(err.to_string().ends_with("a, b"));
    }
}
