//! Parser tree construction.
//!
//! One [`ParserNode`] exists per distinct parser surface. Embedded
//! controllers share the node of the controller they are stacked on; nested
//! controllers get a node of their own one level deeper.

use crate::controller::ControllerSpec;
use crate::error::SetupError;
use crate::invocation::Sentinels;
use crate::parser::{ArgumentParser, GroupId, GroupOptions, ParserId, ParserOptions};
use crate::registry::ControllerRegistry;
use crate::resolver::{Placement, ResolvedOrder};
use std::collections::HashMap;

/// Index of a node in a [`ParserTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A parser surface and the sub-command group commands are added to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserNode {
    pub parser: ParserId,
    pub group: GroupId,
    pub parent: Option<NodeId>,
    /// Label of the controller that created this surface.
    pub owner: String,
}

/// One claimed sub-command name under a node.
#[derive(Debug, Clone, Copy)]
struct Claim {
    alias: bool,
}

#[derive(Debug, Default)]
pub struct ParserTree {
    nodes: Vec<ParserNode>,
    assignments: HashMap<String, NodeId>,
    claims: Vec<HashMap<String, Claim>>,
}

impl ParserTree {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &ParserNode {
        &self.nodes[id.0]
    }

    /// The node a controller's commands and options are attached to.
    pub fn node_of(&self, label: &str) -> Option<NodeId> {
        self.assignments.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, label: &str, node: ParserNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.claims.push(HashMap::new());
        self.assignments.insert(label.to_string(), id);
        id
    }

    /// Reserve a sub-command name (or alias) under a node.
    pub(crate) fn claim(&mut self, node: NodeId, name: &str, alias: bool) -> Result<(), SetupError> {
        let namespace = self.nodes[node.0].owner.clone();
        let claims = &mut self.claims[node.0];

        match claims.get(name) {
            Some(existing) if alias || existing.alias => Err(SetupError::DuplicateAlias {
                alias: name.to_string(),
                namespace,
            }),
            Some(_) => Err(SetupError::DuplicateCommand {
                name: name.to_string(),
                namespace,
            }),
            None => {
                claims.insert(name.to_string(), Claim { alias });
                Ok(())
            }
        }
    }
}

fn group_options(spec: &ControllerSpec) -> GroupOptions {
    GroupOptions {
        title: Some(spec.title.clone()),
        required: spec.default_command.is_none(),
    }
}

/// Walk the resolved order once and create every parser surface.
pub(crate) fn build<R, P: ArgumentParser>(
    registry: &ControllerRegistry<R>,
    order: &ResolvedOrder,
    parser: &mut P,
    sentinels: &Sentinels,
    program: &str,
    root_options: ParserOptions,
) -> Result<ParserTree, SetupError> {
    let mut tree = ParserTree::default();

    let root = registry.get(&order.root().label)?;
    let root_parser = parser.create_parser(program, root_options);
    parser.add_option(root_parser, &sentinels.namespace_arg(&root.label))?;
    let root_group = parser.add_subcommand_group(root_parser, group_options(root))?;
    tree.push(
        &root.label,
        ParserNode {
            parser: root_parser,
            group: root_group,
            parent: None,
            owner: root.label.clone(),
        },
    );

    for entry in order.iter().skip(1) {
        let spec = registry.get(&entry.label)?;

        match &entry.placement {
            Placement::Root => {}
            Placement::Embedded { parent } => {
                let node = tree
                    .node_of(parent)
                    .ok_or_else(|| SetupError::NotFound(parent.clone()))?;
                tracing::debug!(label = %spec.label, %parent, "embedding controller on parent parser");
                tree.assignments.insert(spec.label.clone(), node);
            }
            Placement::Nested { parent } => {
                let parent_id = tree
                    .node_of(parent)
                    .ok_or_else(|| SetupError::NotFound(parent.clone()))?;
                let name = spec.parser_name();

                tree.claim(parent_id, &name, false)?;
                for alias in &spec.aliases {
                    tree.claim(parent_id, alias, true)?;
                }

                tracing::debug!(label = %spec.label, %parent, %name, "nesting controller under parent parser");

                let options = ParserOptions {
                    help: (!spec.hidden).then(|| spec.help_text()),
                    description: spec.description.clone(),
                    epilog: spec.epilog.clone(),
                    aliases: spec.aliases.clone(),
                    hidden: spec.hidden,
                    version: None,
                    usage: spec.usage.clone(),
                };
                let sub_parser = parser.add_parser(tree.node(parent_id).group, &name, options)?;
                parser.add_option(sub_parser, &sentinels.namespace_arg(&spec.label))?;
                let group = parser.add_subcommand_group(sub_parser, group_options(spec))?;

                tree.push(
                    &spec.label,
                    ParserNode {
                        parser: sub_parser,
                        group,
                        parent: Some(parent_id),
                        owner: spec.label.clone(),
                    },
                );
            }
        }
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ControllerSpec, ROOT_LABEL};
    use crate::parser::ClapParser;
    use crate::resolver::resolve;

    fn build_tree(specs: Vec<ControllerSpec>) -> Result<(ParserTree, ClapParser), SetupError> {
        let mut registry: ControllerRegistry<()> = ControllerRegistry::new();
        for spec in specs {
            registry.register_spec(spec, Vec::new())?;
        }
        let order = resolve(&registry, ROOT_LABEL)?;
        let mut parser = ClapParser::new();
        let tree = build(
            &registry,
            &order,
            &mut parser,
            &Sentinels::new("test"),
            "prog",
            ParserOptions::default(),
        )?;
        Ok((tree, parser))
    }

    #[test]
    fn test_embedded_shares_parent_node() {
        let (tree, _) = build_tree(vec![
            ControllerSpec::root(),
            ControllerSpec::new("second").embedded(),
        ])
        .unwrap();

        assert_eq!(tree.node_of("second"), tree.node_of("base"));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_nested_gets_child_node() {
        let (tree, _) = build_tree(vec![
            ControllerSpec::root(),
            ControllerSpec::new("second").nested(),
            ControllerSpec::new("third").stacked_on("second").nested(),
            ControllerSpec::new("fourth").stacked_on("third"),
        ])
        .unwrap();

        let base = tree.node_of("base").unwrap();
        let second = tree.node_of("second").unwrap();
        let third = tree.node_of("third").unwrap();

        assert_ne!(second, base);
        assert_eq!(tree.node(second).parent, Some(base));
        assert_eq!(tree.node(third).parent, Some(second));
        assert_eq!(tree.node_of("fourth"), Some(third));
        assert_eq!(tree.node(tree.root()).parent, None);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_nested_alias_collision() {
        let err = build_tree(vec![
            ControllerSpec::root(),
            ControllerSpec::new("users").nested().alias("u"),
            ControllerSpec::new("uploads").nested().alias("u"),
        ])
        .unwrap_err();

        assert!(matches!(err, SetupError::DuplicateAlias { alias, .. } if alias == "u"));
    }

    #[test]
    fn test_hyphenated_label_collision() {
        let err = build_tree(vec![
            ControllerSpec::root(),
            ControllerSpec::new("my_tool").nested(),
            ControllerSpec::new("my-tool").nested(),
        ])
        .unwrap_err();

        assert!(matches!(err, SetupError::DuplicateCommand { name, .. } if name == "my-tool"));
    }

    #[test]
    fn test_nested_help_lists_controller() {
        let (tree, parser) = build_tree(vec![
            ControllerSpec::root(),
            ControllerSpec::new("users").nested().help("manage users"),
            ControllerSpec::new("secret").nested().hide(),
        ])
        .unwrap();

        let help = parser.render_help(tree.node(tree.root()).parser).unwrap();
        assert!(help.contains("users"));
        assert!(help.contains("manage users"));
        assert!(!help.contains("secret"));
        assert!(!help.contains("controller-namespace"));
    }
}
