//! The hosting-application surface.
//!
//! An [`EngineBuilder`] collects controllers. [`EngineBuilder::setup`]
//! consumes it, resolves the stacks, builds the parser tree and dispatch
//! table, and hands back an immutable [`Engine`] that can dispatch any
//! number of argument lists.

use crate::collector::{self, DispatchTable};
use crate::config::EngineConfig;
use crate::controller::{CommandSpec, Controller, ControllerSpec};
use crate::dispatch::Dispatcher;
use crate::error::{Error, FrameworkError};
use crate::invocation::{Invocation, Sentinels};
use crate::parser::{ArgumentParser, ClapParser, ParserId, ParserOptions};
use crate::registry::ControllerRegistry;
use crate::resolver::{self, ResolvedOrder};
use crate::tree::{self, ParserTree};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use std::ffi::OsString;

/// Collects controllers before setup.
pub struct EngineBuilder<R, P = ClapParser> {
    config: EngineConfig,
    registry: ControllerRegistry<R>,
    parser: P,
}

impl<R> EngineBuilder<R, ClapParser> {
    pub fn new(config: EngineConfig) -> Self {
        let parser = ClapParser::with_color(config.color.into());
        Self {
            config,
            registry: ControllerRegistry::new(),
            parser,
        }
    }
}

impl<R, P: ArgumentParser> EngineBuilder<R, P> {
    /// Swap the argument parser backend.
    pub fn with_parser<Q: ArgumentParser>(self, parser: Q) -> EngineBuilder<R, Q> {
        EngineBuilder {
            config: self.config,
            registry: self.registry,
            parser,
        }
    }

    pub fn register<C>(mut self, controller: C) -> Result<Self, Error>
    where
        C: Controller<R> + Send + Sync + 'static,
    {
        self.registry.register(controller)?;
        Ok(self)
    }

    /// Register a controller declared as data, e.g. loaded from a manifest.
    pub fn register_spec(
        mut self,
        spec: ControllerSpec,
        commands: Vec<CommandSpec<R>>,
    ) -> Result<Self, Error> {
        self.registry.register_spec(spec, commands)?;
        Ok(self)
    }

    pub fn registry(&self) -> &ControllerRegistry<R> {
        &self.registry
    }

    /// Build the command tree. Every declaration error surfaces here.
    pub fn setup(self) -> Result<Engine<R, P>, Error> {
        let Self {
            config,
            registry,
            mut parser,
        } = self;

        let order = resolver::resolve(&registry, &config.root_label)?;
        tracing::debug!(order = ?order.labels(), "controllers resolved");

        let root = registry.get(&config.root_label)?;
        let root_options = ParserOptions {
            help: config.about.clone().or_else(|| root.help.clone()),
            description: root.description.clone(),
            epilog: root.epilog.clone(),
            aliases: Vec::new(),
            hidden: false,
            version: config.version.clone(),
            usage: root.usage.clone(),
        };

        let sentinels = Sentinels::new(&config.resolved_salt());
        let program = config.program_name();

        let mut tree = tree::build(
            &registry,
            &order,
            &mut parser,
            &sentinels,
            &program,
            root_options,
        )?;
        let table = collector::collect(&registry, &order, &mut tree, &mut parser, &sentinels)?;
        tracing::debug!(routes = table.len(), nodes = tree.len(), "setup complete");

        let dispatcher = Dispatcher::new(table, &registry, &config.root_label);

        Ok(Engine {
            config,
            registry,
            order,
            tree,
            parser,
            dispatcher,
        })
    }
}

/// A fully set up command tree.
pub struct Engine<R, P = ClapParser> {
    config: EngineConfig,
    registry: ControllerRegistry<R>,
    order: ResolvedOrder,
    tree: ParserTree,
    parser: P,
    dispatcher: Dispatcher<R>,
}

impl<R> Engine<R, ClapParser> {
    pub fn builder(config: EngineConfig) -> EngineBuilder<R, ClapParser> {
        EngineBuilder::new(config)
    }
}

impl<R, P: ArgumentParser> Engine<R, P> {
    /// Parse an argument list (without the program name).
    pub fn parse<I, S>(&self, argv: I) -> Result<Invocation, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.parse_tokens(argv.into_iter().map(Into::into).collect())
    }

    /// Parse an argument list and run the one command it selects.
    ///
    /// Every registered controller's [`Controller::pre_parse`] and
    /// [`Controller::post_parse`] hooks run around the parse, in stacking
    /// order. Input that stops at a controller with no default command is
    /// answered with that controller's help.
    pub fn dispatch<I, S>(&self, argv: I) -> Result<R, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let tokens: Vec<OsString> = argv.into_iter().map(Into::into).collect();

        self.each_controller(|controller| controller.pre_parse(&tokens));
        let invocation = self.parse_tokens(tokens)?;
        self.each_controller(|controller| controller.post_parse(&invocation));

        match self.dispatcher.dispatch(&invocation) {
            Err(FrameworkError::NoDefaultCommand(label)) => {
                Err(self.help_for(&invocation, label))
            }
            result => Ok(result?),
        }
    }

    /// [`Engine::dispatch`] on the process arguments.
    pub fn dispatch_env(&self) -> Result<R, Error> {
        self.dispatch(std::env::args_os().skip(1))
    }

    /// `--help` text of the parser surface a controller is attached to.
    pub fn render_help(&self, label: &str) -> Option<String> {
        let node = self.tree.node_of(label)?;
        self.parser.render_help(self.tree.node(node).parser)
    }

    pub fn resolved_order(&self) -> &ResolvedOrder {
        &self.order
    }

    pub fn tree(&self) -> &ParserTree {
        &self.tree
    }

    pub fn registry(&self) -> &ControllerRegistry<R> {
        &self.registry
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dispatch_table(&self) -> &DispatchTable<R> {
        self.dispatcher.table()
    }

    fn root_parser(&self) -> ParserId {
        self.tree.node(self.tree.root()).parser
    }

    fn parse_tokens(&self, mut tokens: Vec<OsString>) -> Result<Invocation, Error> {
        let root = self.root_parser();
        if !self.config.ignore_unknown_arguments {
            return Ok(self.parser.parse(root, &tokens)?);
        }

        // Each retry drops one token, so this ends.
        let mut unknown = Vec::new();
        loop {
            match self.parser.parse(root, &tokens) {
                Ok(invocation) => return Ok(invocation.with_unknown_args(unknown)),
                Err(err) if err.kind() == ErrorKind::UnknownArgument => {
                    let Some(pos) = unknown_position(&err, &tokens) else {
                        return Err(err.into());
                    };
                    tracing::debug!(arg = ?tokens[pos], "ignoring unknown argument");
                    unknown.push(tokens.remove(pos));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn each_controller(&self, mut hook: impl FnMut(&dyn Controller<R>)) {
        for label in self.order.labels() {
            if let Some(controller) = self.registry.controller(label) {
                hook(controller);
            }
        }
    }

    /// The `--help` response of the parser the invocation stopped at.
    fn help_for(&self, invocation: &Invocation, label: String) -> Error {
        let tokens: Vec<OsString> = invocation
            .path()
            .iter()
            .map(OsString::from)
            .chain(std::iter::once(OsString::from("--help")))
            .collect();

        tracing::debug!(%label, "no default command, showing help");
        match self.parser.parse(self.root_parser(), &tokens) {
            Err(help) => help.into(),
            Ok(_) => FrameworkError::NoDefaultCommand(label).into(),
        }
    }
}

/// Position of the token a parser rejected as unknown.
fn unknown_position(err: &clap::Error, tokens: &[OsString]) -> Option<usize> {
    let Some(ContextValue::String(arg)) = err.get(ContextKind::InvalidArg) else {
        return None;
    };
    tokens.iter().position(|token| {
        token.to_str().is_some_and(|token| {
            token == arg.as_str()
                || token
                    .strip_prefix(arg.as_str())
                    .is_some_and(|rest| rest.starts_with('='))
        })
    })
}
