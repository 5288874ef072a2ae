//! Explicit plugin registries.
//!
//! A [`Registry`] maps plugin names to constructors. Registries are plain
//! values built at startup by explicit `register` calls; there is no global
//! state, so construction order is simply program order.

use std::collections::BTreeMap;

use crate::error::RegistryError;
use crate::plugin::{IoPlugin, MetricsPlugin};

/// Constructor for a plugin of trait-object type `P`.
pub type Constructor<P> = fn() -> Box<P>;

/// Registry of plugin constructors indexed by name.
pub struct Registry<P: ?Sized> {
    constructors: BTreeMap<String, Constructor<P>>,
}

/// Registry of I/O backends.
pub type IoRegistry = Registry<dyn IoPlugin>;

/// Registry of metrics collectors.
pub type MetricsRegistry = Registry<dyn MetricsPlugin>;

impl<P: ?Sized> Registry<P> {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registers a constructor under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        constructor: Constructor<P>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.constructors.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.constructors.insert(name, constructor);
        Ok(())
    }

    /// Removes the constructor registered under `name`.
    pub fn unregister(&mut self, name: &str) -> Result<(), RegistryError> {
        self.constructors
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Instantiates the plugin registered under `name`.
    pub fn build(&self, name: &str) -> Result<Box<P>, RegistryError> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Returns true if a plugin is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Lists registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(|s| s.as_str())
    }

    /// Returns the number of registered plugins.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl<P: ?Sized> Default for Registry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ?Sized> Clone for Registry<P> {
    fn clone(&self) -> Self {
        Self {
            constructors: self.constructors.clone(),
        }
    }
}

impl<P: ?Sized> std::fmt::Debug for Registry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}
