use crate::core::errors::AttributeError;
use crate::core::types::{AttributeRef, ComponentId, ContainerKey};
use crate::core::values::{AttributeType, AttributeValue};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

type Getter = dyn Fn() -> Result<AttributeValue, AttributeError> + Send + Sync;

/// Read-only typed handle onto a value owned by a component
///
/// The getter is resolved once when the producer is created, so a read is a
/// plain closure call. Reads must not have side effects.
#[derive(Clone)]
pub struct Producer {
    reference: AttributeRef,
    value_type: AttributeType,
    description: String,
    getter: Arc<Getter>,
}

impl Producer {
    /// Create a producer from an arbitrary getter
    pub fn new<F>(
        reference: AttributeRef,
        value_type: AttributeType,
        description: impl Into<String>,
        getter: F,
    ) -> Self
    where
        F: Fn() -> Result<AttributeValue, AttributeError> + Send + Sync + 'static,
    {
        Self {
            reference,
            value_type,
            description: description.into(),
            getter: Arc::new(getter),
        }
    }

    /// Create a producer reading a field of a shared container
    ///
    /// Only a weak reference is kept; once the container is dropped every read
    /// fails with `ContainerRemoved`.
    pub fn bind<T, F>(
        container: &Arc<RwLock<T>>,
        reference: AttributeRef,
        value_type: AttributeType,
        description: impl Into<String>,
        read: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> AttributeValue + Send + Sync + 'static,
    {
        let weak: Weak<RwLock<T>> = Arc::downgrade(container);
        let key = reference.container().clone();
        Self::new(reference, value_type, description, move || {
            let container = weak
                .upgrade()
                .ok_or_else(|| AttributeError::ContainerRemoved(key.clone()))?;
            let guard = container.read();
            Ok(read(&guard))
        })
    }

    /// Read the current value, checking it against the declared type
    pub fn read(&self) -> Result<AttributeValue, AttributeError> {
        let value = (self.getter)()?;
        if value.value_type() != self.value_type {
            return Err(AttributeError::ValueTypeMismatch {
                expected: self.value_type,
                found: value.value_type(),
            });
        }
        Ok(value)
    }

    pub fn reference(&self) -> &AttributeRef {
        &self.reference
    }

    pub fn container(&self) -> &ContainerKey {
        self.reference.container()
    }

    pub fn component(&self) -> &ComponentId {
        self.reference.component()
    }

    pub fn member(&self) -> &str {
        self.reference.member()
    }

    pub fn value_type(&self) -> AttributeType {
        self.value_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("reference", &self.reference)
            .field("value_type", &self.value_type)
            .field("description", &self.description)
            .finish()
    }
}
