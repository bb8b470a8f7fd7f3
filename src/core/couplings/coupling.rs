use crate::core::attributes::{Consumer, Producer};
use crate::core::couplings::validator::CouplingValidator;
use crate::core::errors::{CouplingError, PropagationError};
use crate::core::types::{ComponentId, ContainerKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a coupling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CouplingId(Uuid);

impl CouplingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CouplingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CouplingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Directed edge pairing one producer with one consumer of the same type
#[derive(Debug, Clone)]
pub struct Coupling {
    id: CouplingId,
    producer: Producer,
    consumer: Consumer,
}

impl Coupling {
    /// Create a coupling, rejecting producer/consumer pairs whose types differ
    pub fn new(producer: Producer, consumer: Consumer) -> Result<Self, CouplingError> {
        CouplingValidator::validate_types(&producer, &consumer)?;
        Ok(Self {
            id: CouplingId::new(),
            producer,
            consumer,
        })
    }

    pub fn id(&self) -> CouplingId {
        self.id
    }

    pub fn producer(&self) -> &Producer {
        &self.producer
    }

    pub fn consumer(&self) -> &Consumer {
        &self.consumer
    }

    /// True if either endpoint lives in the given container
    pub fn touches_container(&self, key: &ContainerKey) -> bool {
        self.producer.container() == key || self.consumer.container() == key
    }

    /// True if either endpoint belongs to the given component
    pub fn touches_component(&self, component: &ComponentId) -> bool {
        self.producer.component() == component || self.consumer.component() == component
    }

    /// Unbuffered read-then-write of this coupling alone
    pub fn update(&self) -> Result<(), PropagationError> {
        let value = self
            .producer
            .read()
            .map_err(|source| PropagationError::ProducerReadFailure {
                coupling: self.id,
                producer: self.producer.reference().clone(),
                source,
            })?;
        self.consumer
            .write(value)
            .map_err(|source| PropagationError::ConsumerWriteFailure {
                coupling: self.id,
                consumer: self.consumer.reference().clone(),
                source,
            })
    }
}

impl std::fmt::Display for Coupling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.producer.reference(), self.consumer.reference())
    }
}
