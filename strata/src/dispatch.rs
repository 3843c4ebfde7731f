//! Dispatch.
//!
//! Turns a parsed invocation into exactly one command call. When the user
//! typed a full path down to a command, the command parser's dispatch
//! sentinel names the route directly. Otherwise only a prefix of nested
//! controllers was consumed and the deepest controller's default command
//! runs instead.

use crate::collector::{routing_key, DispatchTable};
use crate::controller::{unhyphenate, CommandFn};
use crate::error::FrameworkError;
use crate::invocation::Invocation;
use crate::registry::ControllerRegistry;
use std::collections::HashMap;

/// Where an invocation is headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// A command was named explicitly.
    Routed { label: String, command: String },

    /// Input stopped at a controller namespace.
    Unrouted { label: String },
}

pub struct Dispatcher<R> {
    table: DispatchTable<R>,
    /// Controller label -> declared default command
    defaults: HashMap<String, Option<String>>,
    root_label: String,
}

impl<R> Dispatcher<R> {
    pub fn new(table: DispatchTable<R>, registry: &ControllerRegistry<R>, root_label: &str) -> Self {
        let defaults = registry
            .all()
            .map(|spec| (spec.label.clone(), spec.default_command.clone()))
            .collect();

        Self {
            table,
            defaults,
            root_label: root_label.to_string(),
        }
    }

    pub fn table(&self) -> &DispatchTable<R> {
        &self.table
    }

    /// Read the routing sentinels of an invocation.
    pub fn route(&self, invocation: &Invocation) -> Result<Route, FrameworkError> {
        match invocation.dispatch_key() {
            Some(key) => {
                let (label, command) = key
                    .rsplit_once('.')
                    .ok_or_else(|| FrameworkError::UnknownRoute(key.to_string()))?;
                Ok(Route::Routed {
                    label: label.to_string(),
                    command: command.to_string(),
                })
            }
            None => Ok(Route::Unrouted {
                label: invocation
                    .namespace()
                    .unwrap_or(&self.root_label)
                    .to_string(),
            }),
        }
    }

    /// Find the function a route runs.
    pub fn resolve(&self, route: &Route) -> Result<&CommandFn<R>, FrameworkError> {
        match route {
            Route::Routed { label, command } => {
                let key = routing_key(label, command);
                self.table
                    .get(&key)
                    .ok_or(FrameworkError::UnknownRoute(key))
            }
            Route::Unrouted { label } => {
                let default = self
                    .defaults
                    .get(label)
                    .ok_or_else(|| FrameworkError::UnknownNamespace(label.clone()))?
                    .as_deref()
                    .ok_or_else(|| FrameworkError::NoDefaultCommand(label.clone()))?;

                self.table
                    .get(&routing_key(label, &unhyphenate(default)))
                    .ok_or_else(|| FrameworkError::MissingDefaultCommand {
                        label: label.clone(),
                        command: default.to_string(),
                    })
            }
        }
    }

    /// Run the one command an invocation resolves to and return its value.
    pub fn dispatch(&self, invocation: &Invocation) -> Result<R, FrameworkError> {
        let route = self.route(invocation)?;
        let func = self.resolve(&route)?;

        tracing::debug!(?route, "dispatching");
        Ok(func(invocation))
    }
}
