use crate::core::errors::AttributeError;
use crate::core::types::{AttributeRef, ComponentId, ContainerKey};
use crate::core::values::{AttributeType, AttributeValue};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

type Setter = dyn Fn(AttributeValue) -> Result<(), AttributeError> + Send + Sync;

/// Write-only typed handle onto a value owned by a component
#[derive(Clone)]
pub struct Consumer {
    reference: AttributeRef,
    value_type: AttributeType,
    description: String,
    setter: Arc<Setter>,
}

impl Consumer {
    /// Create a consumer from an arbitrary setter
    pub fn new<F>(
        reference: AttributeRef,
        value_type: AttributeType,
        description: impl Into<String>,
        setter: F,
    ) -> Self
    where
        F: Fn(AttributeValue) -> Result<(), AttributeError> + Send + Sync + 'static,
    {
        Self {
            reference,
            value_type,
            description: description.into(),
            setter: Arc::new(setter),
        }
    }

    /// Create a consumer writing a field of a shared container
    ///
    /// Writes to a container that has been dropped are silently ignored.
    pub fn bind<T, F>(
        container: &Arc<RwLock<T>>,
        reference: AttributeRef,
        value_type: AttributeType,
        description: impl Into<String>,
        write: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut T, AttributeValue) -> Result<(), AttributeError> + Send + Sync + 'static,
    {
        let weak: Weak<RwLock<T>> = Arc::downgrade(container);
        Self::new(reference, value_type, description, move |value| {
            match weak.upgrade() {
                Some(container) => {
                    let mut guard = container.write();
                    write(&mut guard, value)
                }
                None => Ok(()),
            }
        })
    }

    /// Apply a value to the underlying field
    pub fn write(&self, value: AttributeValue) -> Result<(), AttributeError> {
        if value.value_type() != self.value_type {
            return Err(AttributeError::ValueTypeMismatch {
                expected: self.value_type,
                found: value.value_type(),
            });
        }
        (self.setter)(value)
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

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("reference", &self.reference)
            .field("value_type", &self.value_type)
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cell {
        value: f64,
    }

    fn cell_consumer(cell: &Arc<RwLock<Cell>>) -> Consumer {
        Consumer::bind(
            cell,
            ComponentId::new("table", "table")
                .container("col0")
                .attribute("value"),
            AttributeType::Scalar,
            "Cell value",
            |c: &mut Cell, v| {
                c.value = v.as_scalar()?;
                Ok(())
            },
        )
    }

    #[test]
    fn test_bound_consumer_writes_field() {
        let cell = Arc::new(RwLock::new(Cell { value: 0.0 }));
        let consumer = cell_consumer(&cell);

        consumer.write(AttributeValue::Scalar(5.0)).unwrap();
        assert_eq!(cell.read().value, 5.0);
    }

    #[test]
    fn test_write_after_container_dropped_is_noop() {
        let cell = Arc::new(RwLock::new(Cell { value: 0.0 }));
        let consumer = cell_consumer(&cell);
        drop(cell);

        assert!(consumer.write(AttributeValue::Scalar(1.0)).is_ok());
    }

    #[test]
    fn test_write_wrong_type_is_rejected() {
        let cell = Arc::new(RwLock::new(Cell { value: 2.0 }));
        let consumer = cell_consumer(&cell);

        let err = consumer.write(AttributeValue::Text("x".into())).unwrap_err();
        assert!(matches!(err, AttributeError::ValueTypeMismatch { .. }));
        assert_eq!(cell.read().value, 2.0);
    }
}
