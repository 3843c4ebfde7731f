//! [`ArgumentParser`] implementation on top of clap's builder API.
//!
//! Parsers and groups are recorded in an arena while the engine builds its
//! tree; the matching `clap::Command` is only materialized when parsing or
//! rendering help.

use super::{ArgumentError, ArgumentParser, GroupId, GroupOptions, ParserId, ParserOptions};
use crate::controller::{ArgAction, ArgSpec};
use crate::invocation::Invocation;
use anstyle::{AnsiColor, Effects};
use clap::builder::{PossibleValuesParser, Styles};
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgMatches, ColorChoice, Command};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ffi::OsString;

const HELP_FLAGS: [&str; 2] = ["-h", "--help"];
const VERSION_FLAGS: [&str; 2] = ["-V", "--version"];

#[derive(Debug)]
struct ParserDef {
    name: String,
    options: ParserOptions,
    args: Vec<ArgSpec>,
    /// Group this parser was created in (`None` for top-level parsers).
    parent: Option<GroupId>,
    group: Option<GroupId>,
}

#[derive(Debug)]
struct GroupDef {
    owner: ParserId,
    options: GroupOptions,
    members: Vec<ParserId>,
}

/// Argument parser backed by `clap`.
#[derive(Debug, Default)]
pub struct ClapParser {
    parsers: Vec<ParserDef>,
    groups: Vec<GroupDef>,
    color: ColorChoice,
}

impl ClapParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_color(color: ColorChoice) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// The fully materialized clap command for a top-level parser.
    ///
    /// Useful for shell completion or man page generation.
    pub fn command(&self, root: ParserId) -> Option<Command> {
        self.parsers.get(root.index())?;
        Some(
            self.build_command(root)
                .styles(styles())
                .color(self.color),
        )
    }

    fn build_command(&self, id: ParserId) -> Command {
        let def = &self.parsers[id.index()];
        let opts = &def.options;

        let mut cmd = Command::new(def.name.clone()).disable_help_subcommand(true);
        if let Some(help) = &opts.help {
            cmd = cmd.about(help.clone());
        }
        if let Some(description) = &opts.description {
            cmd = cmd.long_about(description.clone());
        }
        if let Some(epilog) = &opts.epilog {
            cmd = cmd.after_help(epilog.clone());
        }
        if !opts.aliases.is_empty() {
            cmd = cmd.visible_aliases(opts.aliases.clone());
        }
        if opts.hidden {
            cmd = cmd.hide(true);
        }
        if let Some(version) = &opts.version {
            cmd = cmd.version(version.clone());
        }
        if let Some(usage) = &opts.usage {
            cmd = cmd.override_usage(usage.clone());
        }

        for (idx, spec) in def.args.iter().enumerate() {
            cmd = cmd.arg(build_arg(idx, spec));
        }

        if let Some(group_id) = def.group {
            let group = &self.groups[group_id.index()];
            if let Some(title) = &group.options.title {
                cmd = cmd.subcommand_help_heading(title.clone());
            }
            if group.options.required && !group.members.is_empty() {
                cmd = cmd.subcommand_required(true).arg_required_else_help(true);
            }
            for member in &group.members {
                cmd = cmd.subcommand(self.build_command(*member));
            }
        }

        cmd
    }

    fn names_in_group(&self, group: &GroupDef) -> Vec<&str> {
        group
            .members
            .iter()
            .flat_map(|member| {
                let def = &self.parsers[member.index()];
                std::iter::once(def.name.as_str()).chain(def.options.aliases.iter().map(String::as_str))
            })
            .collect()
    }

    fn child_named(&self, parent: ParserId, name: &str) -> Option<ParserId> {
        let group = self.parsers.get(parent.index())?.group?;
        self.groups[group.index()]
            .members
            .iter()
            .copied()
            .find(|member| self.parsers[member.index()].name == name)
    }
}

impl ArgumentParser for ClapParser {
    fn create_parser(&mut self, name: &str, options: ParserOptions) -> ParserId {
        let id = ParserId::new(self.parsers.len());
        self.parsers.push(ParserDef {
            name: name.to_string(),
            options,
            args: Vec::new(),
            parent: None,
            group: None,
        });
        id
    }

    fn add_option(&mut self, parser: ParserId, arg: &ArgSpec) -> Result<(), ArgumentError> {
        validate_flags(arg)?;

        let def = self
            .parsers
            .get_mut(parser.index())
            .ok_or(ArgumentError::UnknownHandle)?;

        for flag in arg.flags.iter().filter(|f| f.starts_with('-')) {
            let reserved = HELP_FLAGS.contains(&flag.as_str())
                || (def.options.version.is_some() && VERSION_FLAGS.contains(&flag.as_str()));
            let taken = def
                .args
                .iter()
                .any(|existing| !existing.is_positional() && existing.flags.contains(flag));

            if reserved || taken {
                return Err(ArgumentError::Conflict {
                    parser: def.name.clone(),
                    flag: flag.clone(),
                });
            }
        }

        def.args.push(arg.clone());
        Ok(())
    }

    fn add_subcommand_group(
        &mut self,
        parser: ParserId,
        options: GroupOptions,
    ) -> Result<GroupId, ArgumentError> {
        let def = self
            .parsers
            .get_mut(parser.index())
            .ok_or(ArgumentError::UnknownHandle)?;
        if def.group.is_some() {
            return Err(ArgumentError::GroupExists(def.name.clone()));
        }

        let id = GroupId::new(self.groups.len());
        def.group = Some(id);
        self.groups.push(GroupDef {
            owner: parser,
            options,
            members: Vec::new(),
        });
        Ok(id)
    }

    fn add_parser(
        &mut self,
        group: GroupId,
        name: &str,
        options: ParserOptions,
    ) -> Result<ParserId, ArgumentError> {
        let group_def = self
            .groups
            .get(group.index())
            .ok_or(ArgumentError::UnknownHandle)?;

        let taken = self.names_in_group(group_def);
        if let Some(clash) = std::iter::once(name)
            .chain(options.aliases.iter().map(String::as_str))
            .find(|candidate| taken.contains(candidate))
        {
            return Err(ArgumentError::DuplicateParser {
                parser: self.parsers[group_def.owner.index()].name.clone(),
                name: clash.to_string(),
            });
        }

        let id = ParserId::new(self.parsers.len());
        self.parsers.push(ParserDef {
            name: name.to_string(),
            options,
            args: Vec::new(),
            parent: Some(group),
            group: None,
        });
        self.groups[group.index()].members.push(id);
        Ok(id)
    }

    fn parse(&self, root: ParserId, tokens: &[OsString]) -> Result<Invocation, clap::Error> {
        let mut command = self.command(root).ok_or_else(|| {
            clap::Error::raw(ErrorKind::InvalidSubcommand, "unknown parser handle\n")
        })?;
        let program = OsString::from(&self.parsers[root.index()].name);

        let matches = command
            .try_get_matches_from_mut(std::iter::once(program).chain(tokens.iter().cloned()))?;

        let mut merged = MergedValues::default();
        let mut matched = vec![root];
        let mut path = Vec::new();
        let mut current = root;
        let mut level = &matches;

        loop {
            merged.collect(&self.parsers[current.index()], level);

            let Some((name, sub)) = level.subcommand() else {
                break;
            };
            current = self.child_named(current, name).ok_or_else(|| {
                clap::Error::raw(
                    ErrorKind::InvalidSubcommand,
                    format!("unrecognized sub-command '{name}'\n"),
                )
            })?;
            matched.push(current);
            path.push(name.to_string());
            level = sub;
        }

        // Required options may be given at any level of the matched path, so
        // they are checked against the merged values rather than by clap.
        let mut missing: Vec<String> = Vec::new();
        for spec in matched.iter().flat_map(|id| self.parsers[id.index()].args.iter()) {
            if !spec.options.required || spec.is_positional() || merged.is_explicit(&spec.dest()) {
                continue;
            }
            let label = usage_label(spec);
            if !missing.contains(&label) {
                missing.push(label);
            }
        }
        if !missing.is_empty() {
            return Err(command.error(
                ErrorKind::MissingRequiredArgument,
                format!(
                    "the following required arguments were not provided:\n  {}",
                    missing.join("\n  ")
                ),
            ));
        }

        Ok(Invocation::new(merged.into_values(), path))
    }

    fn render_help(&self, parser: ParserId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = parser;
        while let Some(group) = self.parsers.get(current.index())?.parent {
            names.push(self.parsers[current.index()].name.clone());
            current = self.groups.get(group.index())?.owner;
        }
        names.reverse();

        let mut cmd = self.command(current)?;
        cmd.build();

        let mut target = &mut cmd;
        for name in &names {
            target = target.find_subcommand_mut(name)?;
        }
        Some(target.render_long_help().to_string())
    }
}

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Cyan.on_default())
}

fn arg_id(idx: usize) -> String {
    format!("arg{idx}")
}

fn validate_flags(arg: &ArgSpec) -> Result<(), ArgumentError> {
    if arg.flags.is_empty() {
        return Err(ArgumentError::InvalidFlag(String::new()));
    }

    for flag in &arg.flags {
        let valid = if let Some(long) = flag.strip_prefix("--") {
            !long.is_empty() && !long.starts_with('-')
        } else if let Some(short) = flag.strip_prefix('-') {
            short.chars().count() == 1 && short != "-"
        } else {
            arg.flags.len() == 1 && !flag.is_empty() && arg.options.action.takes_value()
        };

        if !valid {
            return Err(ArgumentError::InvalidFlag(flag.clone()));
        }
    }
    Ok(())
}

/// Placeholder shown for a value: the metavar, else the destination
/// (upper-cased for options).
fn value_name(spec: &ArgSpec) -> String {
    match &spec.options.metavar {
        Some(metavar) => metavar.clone(),
        None if spec.is_positional() => spec.dest(),
        None => spec.dest().to_uppercase(),
    }
}

/// `--url <URL>` for options, `<name>` for positionals.
fn usage_label(spec: &ArgSpec) -> String {
    let flag = spec
        .flags
        .iter()
        .find(|f| f.starts_with("--"))
        .or_else(|| spec.flags.first())
        .cloned()
        .unwrap_or_default();
    match (spec.is_positional(), spec.options.action.takes_value()) {
        (true, _) => format!("<{}>", value_name(spec)),
        (false, true) => format!("{flag} <{}>", value_name(spec)),
        (false, false) => flag,
    }
}

/// A default that clap's value parser would reject (outside `choices`) is
/// applied during the merge instead of being handed to clap.
fn merge_only_default(spec: &ArgSpec) -> Option<&String> {
    let opts = &spec.options;
    let default = opts.default.as_ref().filter(|_| opts.action.takes_value())?;
    match &opts.choices {
        Some(choices) if !choices.contains(default) => Some(default),
        _ => None,
    }
}

fn build_arg(idx: usize, spec: &ArgSpec) -> Arg {
    let opts = &spec.options;
    let mut arg = Arg::new(arg_id(idx));

    let mut has_long = false;
    let mut has_short = false;
    for flag in &spec.flags {
        if let Some(long) = flag.strip_prefix("--") {
            arg = if has_long {
                arg.visible_alias(long.to_string())
            } else {
                arg.long(long.to_string())
            };
            has_long = true;
        } else if let Some(short) = flag.strip_prefix('-').and_then(|s| s.chars().next()) {
            arg = if has_short {
                arg.visible_short_alias(short)
            } else {
                arg.short(short)
            };
            has_short = true;
        }
    }

    arg = match &opts.action {
        ArgAction::Store => arg.action(clap::ArgAction::Set),
        ArgAction::Append => arg.action(clap::ArgAction::Append),
        ArgAction::StoreTrue | ArgAction::StoreConst(_) => arg.action(clap::ArgAction::SetTrue),
        ArgAction::StoreFalse => arg.action(clap::ArgAction::SetFalse),
        ArgAction::Count => arg.action(clap::ArgAction::Count),
    };

    if opts.action.takes_value() {
        arg = match &opts.choices {
            Some(choices) => arg.value_parser(PossibleValuesParser::new(choices.clone())),
            None => arg.value_parser(clap::value_parser!(String)),
        };
        if let Some(default) = &opts.default {
            if merge_only_default(spec).is_none() {
                arg = arg.default_value(default.clone());
            }
        }
        arg = arg.value_name(value_name(spec));
        if spec.is_positional() && opts.action == ArgAction::Append {
            arg = arg.num_args(1..);
        }
    }

    if let Some(help) = &opts.help {
        arg = arg.help(help.clone());
    }
    if opts.required && spec.is_positional() {
        arg = arg.required(true);
    }
    if opts.hidden {
        arg = arg.hide(true);
    }
    arg
}

fn extract(spec: &ArgSpec, id: &str, matches: &ArgMatches, explicit: bool) -> Option<Value> {
    match &spec.options.action {
        ArgAction::Store => matches
            .get_one::<String>(id)
            .map(|v| Value::String(v.clone())),
        ArgAction::Append => matches
            .get_many::<String>(id)
            .map(|vals| Value::Array(vals.map(|v| Value::String(v.clone())).collect())),
        ArgAction::StoreTrue | ArgAction::StoreFalse => Some(Value::Bool(matches.get_flag(id))),
        ArgAction::StoreConst(constant) => {
            if explicit {
                Some(Value::String(constant.clone()))
            } else {
                spec.options.default.clone().map(Value::String)
            }
        }
        ArgAction::Count => Some(Value::from(matches.get_count(id))),
    }
}

/// Values merged across the levels of one sub-command path.
#[derive(Default)]
struct MergedValues(BTreeMap<String, (Value, bool)>);

impl MergedValues {
    fn insert(&mut self, dest: String, value: Value, explicit: bool) {
        match self.0.get(&dest) {
            Some((_, true)) if !explicit => {}
            _ => {
                self.0.insert(dest, (value, explicit));
            }
        }
    }

    fn collect(&mut self, def: &ParserDef, matches: &ArgMatches) {
        for (idx, spec) in def.args.iter().enumerate() {
            let id = arg_id(idx);
            let Some(source) = matches.value_source(&id) else {
                if let Some(default) = merge_only_default(spec) {
                    self.insert(spec.dest(), Value::String(default.clone()), false);
                }
                continue;
            };
            let explicit = source != ValueSource::DefaultValue;

            if let Some(value) = extract(spec, &id, matches, explicit) {
                self.insert(spec.dest(), value, explicit);
            }
        }
    }

    fn is_explicit(&self, dest: &str) -> bool {
        matches!(self.0.get(dest), Some((_, true)))
    }

    fn into_values(self) -> BTreeMap<String, Value> {
        self.0
            .into_iter()
            .map(|(dest, (value, _))| (dest, value))
            .collect()
    }
}
