//! Controller registry.
//!
//! A flat, registration-ordered collection of controller specs and the
//! commands each one exposes. Imposing stacking order is left to the
//! resolver.

use crate::controller::{CommandSpec, Controller, ControllerSpec};
use crate::error::SetupError;
use std::collections::HashMap;

struct RegistryEntry<R> {
    spec: ControllerSpec,
    commands: Vec<CommandSpec<R>>,
    /// Kept for its parse hooks; `None` for controllers declared as data.
    controller: Option<Box<dyn Controller<R> + Send + Sync>>,
}

/// Registered controllers, keyed by label.
pub struct ControllerRegistry<R> {
    entries: Vec<RegistryEntry<R>>,
    /// Label -> position in `entries`
    index: HashMap<String, usize>,
}

impl<R> ControllerRegistry<R> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a controller and collect its commands.
    pub fn register<C>(&mut self, controller: C) -> Result<(), SetupError>
    where
        C: Controller<R> + Send + Sync + 'static,
    {
        let spec = controller.spec();
        let commands = controller.commands();
        self.insert(spec, commands, Some(Box::new(controller)))
    }

    /// Register a controller from its spec and an explicit command list.
    pub fn register_spec(
        &mut self,
        spec: ControllerSpec,
        commands: Vec<CommandSpec<R>>,
    ) -> Result<(), SetupError> {
        self.insert(spec, commands, None)
    }

    fn insert(
        &mut self,
        spec: ControllerSpec,
        commands: Vec<CommandSpec<R>>,
        controller: Option<Box<dyn Controller<R> + Send + Sync>>,
    ) -> Result<(), SetupError> {
        if self.index.contains_key(&spec.label) {
            return Err(SetupError::DuplicateLabel(spec.label));
        }

        tracing::debug!(
            label = %spec.label,
            stacked_on = ?spec.stacked_on,
            stacked_type = %spec.stacked_type,
            commands = commands.len(),
            "controller registered"
        );

        self.index.insert(spec.label.clone(), self.entries.len());
        self.entries.push(RegistryEntry {
            spec,
            commands,
            controller,
        });
        Ok(())
    }

    /// All specs in registration order.
    pub fn all(&self) -> impl Iterator<Item = &ControllerSpec> {
        self.entries.iter().map(|e| &e.spec)
    }

    pub fn get(&self, label: &str) -> Result<&ControllerSpec, SetupError> {
        self.entry(label).map(|e| &e.spec)
    }

    /// Commands exposed by a controller, in declaration order.
    pub fn commands(&self, label: &str) -> Result<&[CommandSpec<R>], SetupError> {
        self.entry(label).map(|e| e.commands.as_slice())
    }

    /// The controller object registered under `label`, if it was registered
    /// as one rather than as data.
    pub fn controller(&self, label: &str) -> Option<&(dyn Controller<R> + Send + Sync)> {
        self.entry(label).ok()?.controller.as_deref()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, label: &str) -> Result<&RegistryEntry<R>, SetupError> {
        self.index
            .get(label)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| SetupError::NotFound(label.to_string()))
    }
}

impl<R> Default for ControllerRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}
