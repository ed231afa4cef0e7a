use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::{Operation, OperationDescriptor};

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Registry misuse. All variants indicate a programming error, not bad input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown operation: {name}")]
    UnknownOperation { name: String },
    #[error("operation registered twice: {name}")]
    DuplicateOperation { name: String },
    #[error("action {action} already registered for operation {existing}")]
    DuplicateAction { action: String, existing: String },
}

// ---------------------------------------------------------------------------
// RegistryBuilder
// ---------------------------------------------------------------------------

/// Collects operation descriptors at startup.
///
/// Duplicates are rejected here, at registration time, so a registry that
/// was built successfully can never fail a lookup for a registered name.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    by_name: HashMap<String, Arc<OperationDescriptor>>,
    by_action: HashMap<String, String>,
    order: Vec<String>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateOperation` if the name is taken, or
    /// `DuplicateAction` if another operation already uses the action URI.
    pub fn register(&mut self, descriptor: OperationDescriptor) -> Result<&mut Self, RegistryError> {
        let name = descriptor.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateOperation { name });
        }
        if let Some(existing) = self.by_action.get(descriptor.action()) {
            return Err(RegistryError::DuplicateAction {
                action: descriptor.action().to_string(),
                existing: existing.clone(),
            });
        }

        self.by_action
            .insert(descriptor.action().to_string(), name.clone());
        self.by_name.insert(name.clone(), Arc::new(descriptor));
        self.order.push(name);
        Ok(self)
    }

    /// Register the descriptor derived from an [`Operation`] marker type.
    ///
    /// # Errors
    ///
    /// Same as [`RegistryBuilder::register`].
    pub fn register_operation<O: Operation>(&mut self) -> Result<&mut Self, RegistryError> {
        self.register(OperationDescriptor::of::<O>())
    }

    /// Freeze the table. The result has no mutation API.
    #[must_use]
    pub fn build(self) -> OperationRegistry {
        OperationRegistry {
            by_name: self.by_name,
            by_action: self.by_action,
            order: self.order,
        }
    }
}

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// Immutable name -> descriptor table.
///
/// Provides two lookup mechanisms:
/// - **By name** (`resolve`): used by the client for every call
/// - **By action** (`resolve_action`): used by endpoints dispatching on the
///   request's action URI
///
/// Safe for unsynchronized concurrent reads; share it behind an `Arc`.
#[derive(Debug)]
pub struct OperationRegistry {
    by_name: HashMap<String, Arc<OperationDescriptor>>,
    by_action: HashMap<String, String>,
    /// Registration order, for deterministic listing.
    order: Vec<String>,
}

impl OperationRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Look up the descriptor registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownOperation` if no such operation was registered.
    pub fn resolve(&self, name: &str) -> Result<Arc<OperationDescriptor>, RegistryError> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownOperation {
                name: name.to_string(),
            })
    }

    /// Look up the descriptor addressed by an action URI.
    ///
    /// # Errors
    ///
    /// Returns `UnknownOperation` (carrying the action) if no operation uses it.
    pub fn resolve_action(&self, action: &str) -> Result<Arc<OperationDescriptor>, RegistryError> {
        match self.by_action.get(action) {
            Some(name) => self.resolve(name),
            None => Err(RegistryError::UnknownOperation {
                name: action.to_string(),
            }),
        }
    }

    /// Operation names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
