//! # strata: stacked-controller CLI engine
//!
//! Build one multi-level command line out of independently declared
//! controllers.
//!
//! ## Core Principles
//!
//! - **Stacking, not nesting by hand**: each controller names the controller
//!   it sits on, and the engine works out the order
//! - **Two ways to stack**: `embedded` controllers merge their commands into
//!   the parent's namespace, `nested` controllers become a sub-command level
//! - **Fail at setup**: every declaration error surfaces from
//!   [`EngineBuilder::setup`], never halfway through a user's invocation
//! - **One call per invocation**: a parsed argument list routes to exactly
//!   one command function, or to the deepest controller's default command
//!
//! ## Quick Start
//!
//! ```rust
//! use strata::{CommandSpec, Controller, ControllerSpec, Engine, EngineConfig, Invocation};
//!
//! struct Base;
//!
//! impl Controller<String> for Base {
//!     fn spec(&self) -> ControllerSpec {
//!         ControllerSpec::root().help("example application")
//!     }
//!
//!     fn commands(&self) -> Vec<CommandSpec<String>> {
//!         vec![CommandSpec::new("status", |_: &Invocation| "ok".to_string())]
//!     }
//! }
//!
//! struct Users;
//!
//! impl Controller<String> for Users {
//!     fn spec(&self) -> ControllerSpec {
//!         ControllerSpec::new("users").nested().default_command("list")
//!     }
//!
//!     fn commands(&self) -> Vec<CommandSpec<String>> {
//!         vec![CommandSpec::new("list", |_: &Invocation| "alice, bob".to_string())]
//!     }
//! }
//!
//! # fn main() -> Result<(), strata::Error> {
//! let engine = Engine::<String>::builder(EngineConfig::new("myapp"))
//!     .register(Base)?
//!     .register(Users)?
//!     .setup()?;
//!
//! assert_eq!(engine.dispatch(["status"])?, "ok");
//! assert_eq!(engine.dispatch(["users"])?, "alice, bob");
//! assert_eq!(engine.dispatch(["users", "list"])?, "alice, bob");
//! # Ok(())
//! # }
//! ```
//!
//! In a binary, finish with [`Engine::dispatch_env`] and map errors through
//! [`Error::exit_code`].

// Re-export the derive macro
pub use strata_macros::ControllerMeta;

// ============================================================================
// Modules
// ============================================================================

pub mod collector;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod invocation;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod tracing_support;
pub mod tree;

// ============================================================================
// Re-exports
// ============================================================================

pub use collector::{routing_key, DispatchTable};
pub use config::{ColorMode, ConfigError, EngineConfig};
pub use controller::{
    hyphenate, unhyphenate, ArgAction, ArgOptions, ArgSpec, CommandFn, CommandSpec, Controller,
    ControllerSpec, StackedType, ROOT_LABEL,
};
pub use dispatch::{Dispatcher, Route};
pub use engine::{Engine, EngineBuilder};
pub use error::{Error, FrameworkError, SetupError};
pub use invocation::Invocation;
pub use parser::{
    ArgumentError, ArgumentParser, ClapParser, GroupId, GroupOptions, ParserId, ParserOptions,
};
pub use registry::ControllerRegistry;
pub use resolver::{resolve, Placement, ResolvedController, ResolvedOrder};
pub use tree::{NodeId, ParserNode, ParserTree};

// Re-export tracing itself (required for #[instrument] macro)
pub use tracing_support::tracing;

#[cfg(feature = "tracing")]
pub use tracing_support::{
    init_subscriber, init_subscriber_with_config, TracingConfig, TracingFormat,
};

/// Result type used across the engine's public API.
pub type Result<T, E = Error> = std::result::Result<T, E>;
