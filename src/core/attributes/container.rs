use crate::core::attributes::{Consumer, Producer};
use crate::core::errors::AttributeError;
use crate::core::types::ContainerKey;
use crate::core::values::{AttributeType, AttributeValue};
use parking_lot::RwLock;
use std::sync::Arc;

/// The coupling surface of one domain object (neuron, table column, ...)
///
/// Components hand these out from `attribute_containers()`; the coupling
/// layer only ever sees the key and the producer/consumer lists.
#[derive(Debug, Clone)]
pub struct AttributeContainer {
    key: ContainerKey,
    producers: Vec<Producer>,
    consumers: Vec<Consumer>,
}

impl AttributeContainer {
    pub fn new(key: ContainerKey) -> Self {
        Self {
            key,
            producers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    /// Start binding typed getters and setters onto a shared object
    pub fn bind<T: Send + Sync + 'static>(key: ContainerKey, target: &Arc<RwLock<T>>) -> ContainerBinder<T> {
        ContainerBinder {
            container: AttributeContainer::new(key),
            target: Arc::clone(target),
        }
    }

    pub fn with_producer(mut self, producer: Producer) -> Self {
        self.producers.push(producer);
        self
    }

    pub fn with_consumer(mut self, consumer: Consumer) -> Self {
        self.consumers.push(consumer);
        self
    }

    pub fn key(&self) -> &ContainerKey {
        &self.key
    }

    pub fn producers(&self) -> &[Producer] {
        &self.producers
    }

    pub fn consumers(&self) -> &[Consumer] {
        &self.consumers
    }

    /// Find a producer by member name
    pub fn producer(&self, member: &str) -> Option<&Producer> {
        self.producers.iter().find(|p| p.member() == member)
    }

    /// Find a consumer by member name
    pub fn consumer(&self, member: &str) -> Option<&Consumer> {
        self.consumers.iter().find(|c| c.member() == member)
    }
}

/// Builder registering producers and consumers against one shared object
pub struct ContainerBinder<T> {
    container: AttributeContainer,
    target: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> ContainerBinder<T> {
    pub fn producer<F>(mut self, member: &str, value_type: AttributeType, description: &str, read: F) -> Self
    where
        F: Fn(&T) -> AttributeValue + Send + Sync + 'static,
    {
        let reference = self.container.key.attribute(member);
        self.container
            .producers
            .push(Producer::bind(&self.target, reference, value_type, description, read));
        self
    }

    pub fn consumer<F>(mut self, member: &str, value_type: AttributeType, description: &str, write: F) -> Self
    where
        F: Fn(&mut T, AttributeValue) -> Result<(), AttributeError> + Send + Sync + 'static,
    {
        let reference = self.container.key.attribute(member);
        self.container
            .consumers
            .push(Consumer::bind(&self.target, reference, value_type, description, write));
        self
    }

    pub fn build(self) -> AttributeContainer {
        self.container
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ComponentId;

    struct Agent {
        heading: f64,
        speed: f64,
    }

    #[test]
    fn test_binder_registers_members() {
        let agent = Arc::new(RwLock::new(Agent {
            heading: 90.0,
            speed: 1.0,
        }));
        let container = AttributeContainer::bind(ComponentId::new("world", "odor").container("agent"), &agent)
            .producer("heading", AttributeType::Scalar, "Heading", |a: &Agent| a.heading.into())
            .consumer("speed", AttributeType::Scalar, "Speed", |a: &mut Agent, v| {
                a.speed = v.as_scalar()?;
                Ok(())
            })
            .build();

        assert_eq!(container.producers().len(), 1);
        assert_eq!(container.consumers().len(), 1);
        assert!(container.producer("speed").is_none());

        let speed = container.consumer("speed").unwrap();
        speed.write(AttributeValue::Scalar(3.0)).unwrap();
        assert_eq!(agent.read().speed, 3.0);
        assert_eq!(
            container.producer("heading").unwrap().read().unwrap(),
            AttributeValue::Scalar(90.0)
        );
    }
}
