//! Parsed command-line invocation handed to command functions.

use crate::controller::ArgSpec;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ffi::OsString;

/// Destination of the hidden option recording the matched command route.
pub(crate) const DISPATCH_DEST: &str = "__dispatch__";

/// Destination of the hidden option recording the deepest controller namespace.
pub(crate) const NAMESPACE_DEST: &str = "__controller_namespace__";

/// Hidden options the engine injects to learn which command or controller
/// namespace consumed the input.
///
/// Flag names carry a salt so they cannot collide with user options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sentinels {
    dispatch_flag: String,
    namespace_flag: String,
}

impl Sentinels {
    pub(crate) fn new(salt: &str) -> Self {
        Self {
            dispatch_flag: format!("--dispatch-{salt}"),
            namespace_flag: format!("--controller-namespace-{salt}"),
        }
    }

    /// Hidden option on a command parser whose default is its route.
    pub(crate) fn dispatch_arg(&self, route: &str) -> ArgSpec {
        ArgSpec::new([self.dispatch_flag.as_str()])
            .with_dest(DISPATCH_DEST)
            .default_value(route)
            .hide()
    }

    /// Hidden option on a controller parser whose default is its label.
    pub(crate) fn namespace_arg(&self, label: &str) -> ArgSpec {
        ArgSpec::new([self.namespace_flag.as_str()])
            .with_dest(NAMESPACE_DEST)
            .default_value(label)
            .hide()
    }
}

/// The result of parsing one argument list.
///
/// Values are keyed by argument destination. Routing sentinels written by
/// the engine are stripped out before a command function ever sees this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    values: BTreeMap<String, Value>,
    path: Vec<String>,
    dispatch_key: Option<String>,
    namespace: Option<String>,
    unknown_args: Vec<OsString>,
}

impl Invocation {
    /// Build an invocation from parsed values and the sub-command path that
    /// consumed them.
    pub fn new(values: BTreeMap<String, Value>, path: Vec<String>) -> Self {
        let mut invocation = Self {
            values,
            path,
            dispatch_key: None,
            namespace: None,
            unknown_args: Vec::new(),
        };
        invocation.dispatch_key = invocation.take_string(DISPATCH_DEST);
        invocation.namespace = invocation.take_string(NAMESPACE_DEST);
        invocation
    }

    fn take_string(&mut self, dest: &str) -> Option<String> {
        match self.values.remove(dest) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get(&self, dest: &str) -> Option<&Value> {
        self.values.get(dest)
    }

    pub fn get_str(&self, dest: &str) -> Option<&str> {
        self.values.get(dest).and_then(Value::as_str)
    }

    /// `true` only when the destination holds boolean `true`.
    pub fn flag(&self, dest: &str) -> bool {
        self.values
            .get(dest)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn get_list(&self, dest: &str) -> Vec<&str> {
        match self.values.get(dest) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(s)) => vec![s.as_str()],
            _ => Vec::new(),
        }
    }

    pub fn count(&self, dest: &str) -> u64 {
        self.values.get(dest).and_then(Value::as_u64).unwrap_or(0)
    }

    /// Sub-command names consumed, outermost first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Arguments the parser did not recognize, in the order they were given.
    ///
    /// Always empty unless the engine is configured to ignore unknown
    /// arguments.
    pub fn unknown_args(&self) -> &[OsString] {
        &self.unknown_args
    }

    pub(crate) fn with_unknown_args(mut self, unknown_args: Vec<OsString>) -> Self {
        self.unknown_args = unknown_args;
        self
    }

    /// All values as one JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone().into_iter().collect())
    }

    pub(crate) fn dispatch_key(&self) -> Option<&str> {
        self.dispatch_key.as_deref()
    }

    pub(crate) fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}
