//! Command collection.
//!
//! Attaches each controller's options and commands to its parser node and
//! records which function every command route dispatches to.

use crate::controller::{ArgSpec, CommandFn, ControllerSpec};
use crate::error::SetupError;
use crate::invocation::Sentinels;
use crate::parser::{ArgumentError, ArgumentParser, ParserOptions};
use crate::registry::ControllerRegistry;
use crate::resolver::{Placement, ResolvedOrder};
use crate::tree::ParserTree;
use std::collections::HashMap;
use std::fmt;

/// Routing key of a command: `<controller label>.<command name>`.
pub fn routing_key(label: &str, command: &str) -> String {
    format!("{label}.{command}")
}

/// Routing key -> command function.
pub struct DispatchTable<R> {
    routes: HashMap<String, CommandFn<R>>,
}

impl<R> DispatchTable<R> {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, key: String, func: CommandFn<R>) {
        self.routes.insert(key, func);
    }

    pub fn get(&self, key: &str) -> Option<&CommandFn<R>> {
        self.routes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.routes.contains_key(key)
    }

    /// All routing keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.routes.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<R> fmt::Debug for DispatchTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("routes", &self.keys())
            .finish()
    }
}

impl<R> Default for DispatchTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Attach options and commands of every controller, in resolved order.
pub(crate) fn collect<R, P: ArgumentParser>(
    registry: &ControllerRegistry<R>,
    order: &ResolvedOrder,
    tree: &mut ParserTree,
    parser: &mut P,
    sentinels: &Sentinels,
) -> Result<DispatchTable<R>, SetupError> {
    let mut table = DispatchTable::new();

    for entry in order.iter() {
        let spec = registry.get(&entry.label)?;
        let node_id = tree
            .node_of(&spec.label)
            .ok_or_else(|| SetupError::NotFound(spec.label.clone()))?;
        let node = tree.node(node_id).clone();

        tracing::debug!(label = %spec.label, "processing arguments for controller namespace");
        for arg in &spec.arguments {
            tracing::trace!(flags = ?arg.flags, "adding argument");
            parser.add_option(node.parser, arg)?;
        }

        let embedded = matches!(entry.placement, Placement::Embedded { .. });

        tracing::debug!(label = %spec.label, "processing commands for controller namespace");
        for command in registry.commands(&spec.label)? {
            let name = command.parser_name();
            tree.claim(node_id, &name, false)?;
            for alias in &command.aliases {
                tree.claim(node_id, alias, true)?;
            }

            let hidden = command.hidden || (spec.hidden && embedded);
            let options = ParserOptions {
                help: if hidden { None } else { command.help.clone() },
                aliases: command.aliases.clone(),
                hidden,
                ..ParserOptions::default()
            };
            let command_parser = parser.add_parser(node.group, &name, options)?;

            let route = routing_key(&spec.label, &command.name);
            tracing::debug!(%route, %name, "adding command");
            parser.add_option(command_parser, &sentinels.dispatch_arg(&route))?;

            let arguments = inherited_arguments(spec).chain(command.arguments.iter().cloned());
            for arg in arguments {
                parser
                    .add_option(command_parser, &arg)
                    .map_err(|e| match e {
                        ArgumentError::Conflict { flag, .. } => SetupError::DuplicateArgument {
                            command: route.clone(),
                            flag,
                        },
                        other => other.into(),
                    })?;
            }

            table.insert(route, command.func());
        }
    }

    Ok(table)
}

/// Controller-level options repeated on each command parser so they may also
/// follow the command name. Positionals stay on the controller parser. The
/// copies are never required themselves; the parser checks a required option
/// once across the whole matched path.
fn inherited_arguments(spec: &ControllerSpec) -> impl Iterator<Item = ArgSpec> + '_ {
    spec.arguments
        .iter()
        .filter(|arg| !arg.is_positional())
        .map(|arg| {
            let mut arg = arg.clone();
            arg.options.required = false;
            arg
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{CommandSpec, ROOT_LABEL};
    use crate::parser::ClapParser;
    use crate::resolver::resolve;
    use crate::tree;

    fn collect_all(
        controllers: Vec<(ControllerSpec, Vec<CommandSpec<&'static str>>)>,
    ) -> Result<DispatchTable<&'static str>, SetupError> {
        let mut registry = ControllerRegistry::new();
        for (spec, commands) in controllers {
            registry.register_spec(spec, commands)?;
        }
        let order = resolve(&registry, ROOT_LABEL)?;
        let mut parser = ClapParser::new();
        let sentinels = Sentinels::new("test");
        let mut tree = tree::build(
            &registry,
            &order,
            &mut parser,
            &sentinels,
            "prog",
            ParserOptions::default(),
        )?;
        collect(&registry, &order, &mut tree, &mut parser, &sentinels)
    }

    #[test]
    fn test_routes_are_keyed_by_label_and_name() {
        let table = collect_all(vec![
            (
                ControllerSpec::root(),
                vec![CommandSpec::new("cmd1", |_| "cmd1")],
            ),
            (
                ControllerSpec::new("nested_controller").nested(),
                vec![CommandSpec::new("nested_cmd1", |_| "nested")],
            ),
        ])
        .unwrap();

        assert_eq!(
            table.keys(),
            vec!["base.cmd1", "nested_controller.nested_cmd1"]
        );
    }

    #[test]
    fn test_duplicate_command_under_same_node() {
        let err = collect_all(vec![
            (ControllerSpec::root(), Vec::new()),
            (
                ControllerSpec::new("first"),
                vec![CommandSpec::new("default", |_| "first")],
            ),
            (
                ControllerSpec::new("second"),
                vec![CommandSpec::new("default", |_| "second")],
            ),
        ])
        .unwrap_err();

        assert!(matches!(err, SetupError::DuplicateCommand { name, namespace }
            if name == "default" && namespace == "base"));
    }

    #[test]
    fn test_same_command_name_under_different_nodes() {
        let table = collect_all(vec![
            (
                ControllerSpec::root(),
                vec![CommandSpec::new("list", |_| "root")],
            ),
            (
                ControllerSpec::new("users").nested(),
                vec![CommandSpec::new("list", |_| "users")],
            ),
        ])
        .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_alias_collides_with_command() {
        let err = collect_all(vec![(
            ControllerSpec::root(),
            vec![
                CommandSpec::new("status", |_| "status"),
                CommandSpec::new("stats", |_| "stats").alias("status"),
            ],
        )])
        .unwrap_err();

        assert!(matches!(err, SetupError::DuplicateAlias { alias, .. } if alias == "status"));
    }

    #[test]
    fn test_command_conflicts_with_nested_controller() {
        let err = collect_all(vec![
            (
                ControllerSpec::root(),
                vec![CommandSpec::new("users", |_| "users")],
            ),
            (ControllerSpec::new("users").nested(), Vec::new()),
        ])
        .unwrap_err();

        assert!(matches!(err, SetupError::DuplicateCommand { .. }));
    }

    #[test]
    fn test_duplicate_argument_in_command_scope() {
        let err = collect_all(vec![(
            ControllerSpec::root().arg(ArgSpec::new(["-f", "--foo"])),
            vec![CommandSpec::new("cmd1", |_| "cmd1").arg(ArgSpec::new(["--foo"]))],
        )])
        .unwrap_err();

        assert!(matches!(err, SetupError::DuplicateArgument { command, flag }
            if command == "base.cmd1" && flag == "--foo"));
    }

    #[test]
    fn test_embedded_siblings_conflict_on_shared_parser() {
        let err = collect_all(vec![
            (ControllerSpec::root(), Vec::new()),
            (
                ControllerSpec::new("first").arg(ArgSpec::new(["--shared"])),
                Vec::new(),
            ),
            (
                ControllerSpec::new("second").arg(ArgSpec::new(["--shared"])),
                Vec::new(),
            ),
        ])
        .unwrap_err();

        assert!(matches!(
            err,
            SetupError::ArgumentConflict(ArgumentError::Conflict { flag, .. }) if flag == "--shared"
        ));
    }

    #[test]
    fn test_nested_siblings_may_share_flags() {
        let table = collect_all(vec![
            (ControllerSpec::root(), Vec::new()),
            (
                ControllerSpec::new("first")
                    .nested()
                    .arg(ArgSpec::new(["--shared"])),
                vec![CommandSpec::new("run", |_| "first")],
            ),
            (
                ControllerSpec::new("second")
                    .nested()
                    .arg(ArgSpec::new(["--shared"])),
                vec![CommandSpec::new("run", |_| "second")],
            ),
        ])
        .unwrap();
        assert_eq!(table.len(), 2);
    }
}
