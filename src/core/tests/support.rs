use crate::core::attributes::{AttributeContainer, Consumer, Producer};
use crate::core::components::{ComponentState, WorkspaceComponent};
use crate::core::errors::ComponentError;
use crate::core::types::{AttributeRef, ComponentId};
use crate::core::values::{AttributeType, AttributeValue};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

pub const OUT: &str = "out";
pub const IN: &str = "in";
pub const VECTOR_IN: &str = "vector_in";

#[derive(Debug, Default)]
pub struct Cell {
    pub value: f64,
    pub received: f64,
    pub updates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    /// value = received + 1
    Increment,
    Fail,
    Panic,
}

/// Minimal component: one scalar producer, one scalar consumer
pub struct ValueComponent {
    id: ComponentId,
    state: ComponentState,
    cell: Arc<RwLock<Cell>>,
    behavior: Behavior,
    log: Option<Arc<Mutex<Vec<String>>>>,
}

impl ValueComponent {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            id: ComponentId::new(name, "value"),
            state: ComponentState::new(),
            cell: Arc::new(RwLock::new(Cell {
                value,
                ..Cell::default()
            })),
            behavior: Behavior::Increment,
            log: None,
        }
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Record the component name on every update
    pub fn with_log(mut self, log: &Arc<Mutex<Vec<String>>>) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    pub fn value(&self) -> f64 {
        self.cell.read().value
    }

    pub fn set_value(&self, value: f64) {
        self.cell.write().value = value;
    }

    pub fn received(&self) -> f64 {
        self.cell.read().received
    }

    pub fn updates(&self) -> usize {
        self.cell.read().updates
    }

    pub fn out_ref(&self) -> AttributeRef {
        self.id.container(OUT).attribute("value")
    }

    pub fn in_ref(&self) -> AttributeRef {
        self.id.container(IN).attribute("value")
    }

    pub fn producer(&self) -> Producer {
        self.attribute_container(OUT).unwrap().producer("value").unwrap().clone()
    }

    pub fn consumer(&self) -> Consumer {
        self.attribute_container(IN).unwrap().consumer("value").unwrap().clone()
    }

    pub fn vector_consumer(&self) -> Consumer {
        self.attribute_container(VECTOR_IN)
            .unwrap()
            .consumer("values")
            .unwrap()
            .clone()
    }
}

impl WorkspaceComponent for ValueComponent {
    fn id(&self) -> &ComponentId {
        &self.id
    }

    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn update(&self) -> Result<(), ComponentError> {
        if let Some(log) = &self.log {
            log.lock().push(self.id.name().to_string());
        }
        match self.behavior {
            Behavior::Increment => {
                let mut cell = self.cell.write();
                cell.value = cell.received + 1.0;
                cell.updates += 1;
                Ok(())
            }
            Behavior::Fail => Err(ComponentError::update_failure(&self.id, "refused")),
            Behavior::Panic => panic!("component exploded"),
        }
    }

    fn attribute_containers(&self) -> Vec<AttributeContainer> {
        vec![
            AttributeContainer::bind(self.id.container(OUT), &self.cell)
                .producer("value", AttributeType::Scalar, "Value", |cell| {
                    AttributeValue::Scalar(cell.value)
                })
                .build(),
            AttributeContainer::bind(self.id.container(IN), &self.cell)
                .consumer("value", AttributeType::Scalar, "Received", |cell, value| {
                    cell.received = value.as_scalar()?;
                    Ok(())
                })
                .build(),
            AttributeContainer::bind(self.id.container(VECTOR_IN), &self.cell)
                .consumer("values", AttributeType::Vector, "Received sum", |cell, value| {
                    cell.received = value.as_vector()?.iter().sum();
                    Ok(())
                })
                .build(),
        ]
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
