use crate::core::attributes::{AttributeContainer, Consumer, Producer};
use crate::core::components::state::ComponentState;
use crate::core::components::traits::WorkspaceComponent;
use crate::core::errors::{AttributeError, ComponentError, WorkspaceError};
use crate::core::parallel::{BufferedElement, BufferedUpdateConfig, ConcurrentBufferedUpdate, ElementId};
use crate::core::types::ComponentId;
use crate::core::values::{AttributeType, AttributeValue};
use atomic_float::AtomicF64;
use parking_lot::RwLock;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

pub const NETWORK_COMPONENT_TYPE: &str = "network";

/// Container key of the whole-network attributes
pub const ALL_NEURONS_CONTAINER: &str = "all";

struct Synapse {
    source: Weak<Neuron>,
    weight: f64,
}

/// Clipped linear unit
///
/// The next activation is the clipped sum of external input, bias and the
/// weighted activations of incoming neurons. External input is consumed by
/// every commit.
pub struct Neuron {
    activation: AtomicF64,
    buffer: AtomicF64,
    input: AtomicF64,
    bias: f64,
    lower_bound: f64,
    upper_bound: f64,
    incoming: RwLock<Vec<Synapse>>,
}

impl Neuron {
    pub fn new(bias: f64) -> Self {
        Self {
            activation: AtomicF64::new(0.0),
            buffer: AtomicF64::new(0.0),
            input: AtomicF64::new(0.0),
            bias,
            lower_bound: -1.0,
            upper_bound: 1.0,
            incoming: RwLock::new(Vec::new()),
        }
    }

    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub fn activation(&self) -> f64 {
        self.activation.load(Ordering::Acquire)
    }

    pub fn set_activation(&self, value: f64) {
        self.activation.store(value, Ordering::Release);
    }

    /// External input accumulated since the last commit
    pub fn input(&self) -> f64 {
        self.input.load(Ordering::Acquire)
    }

    pub fn add_input(&self, value: f64) {
        self.input.fetch_add(value, Ordering::AcqRel);
    }

    pub fn connect_from(&self, source: &Arc<Neuron>, weight: f64) {
        self.incoming.write().push(Synapse {
            source: Arc::downgrade(source),
            weight,
        });
    }

    pub fn fan_in(&self) -> usize {
        self.incoming.read().len()
    }
}

impl BufferedElement for Neuron {
    fn compute(&self) {
        let weighted: f64 = self
            .incoming
            .read()
            .iter()
            .filter_map(|synapse| synapse.source.upgrade().map(|source| source.activation() * synapse.weight))
            .sum();
        let next = (self.input() + self.bias + weighted).clamp(self.lower_bound, self.upper_bound);
        self.buffer.store(next, Ordering::Release);
    }

    fn commit(&self) {
        self.activation.store(self.buffer.load(Ordering::Acquire), Ordering::Release);
        self.input.store(0.0, Ordering::Release);
    }
}

type NeuronList = Vec<(ElementId, Arc<Neuron>)>;

/// Neural network component updated through the parallel buffered engine
///
/// Each neuron is its own container (`neuron_<id>`) with an `activation`
/// producer and an `input` consumer; the `all` container exposes every
/// neuron as a vector in id order.
pub struct NetworkComponent {
    id: ComponentId,
    state: ComponentState,
    engine: Arc<ConcurrentBufferedUpdate>,
    neurons: Arc<RwLock<NeuronList>>,
}

impl NetworkComponent {
    pub fn new(name: impl Into<String>, config: BufferedUpdateConfig) -> Result<Self, WorkspaceError> {
        Ok(Self {
            id: ComponentId::new(name, NETWORK_COMPONENT_TYPE),
            state: ComponentState::new(),
            engine: Arc::new(ConcurrentBufferedUpdate::new(config)?),
            neurons: Arc::new(RwLock::new(Vec::new())),
        })
    }

    pub fn neuron_key(id: ElementId) -> String {
        format!("neuron_{}", id.raw())
    }

    /// The engine updating this network's neurons
    pub fn engine(&self) -> Arc<ConcurrentBufferedUpdate> {
        Arc::clone(&self.engine)
    }

    pub fn add_neuron(&self, neuron: Neuron) -> ElementId {
        let neuron = Arc::new(neuron);
        let id = self.engine.add_element(Arc::clone(&neuron) as Arc<dyn BufferedElement>);
        let mut neurons = self.neurons.write();
        let position = neurons.partition_point(|(existing, _)| *existing < id);
        neurons.insert(position, (id, neuron));
        drop(neurons);
        self.state.set_changed_since_last_save(true);
        id
    }

    /// Add `count` neurons with the same bias as one group
    pub fn add_neuron_group(&self, count: usize, bias: f64) -> Vec<ElementId> {
        let group: Vec<Arc<Neuron>> = (0..count).map(|_| Arc::new(Neuron::new(bias))).collect();
        let ids = self
            .engine
            .add_group(group.iter().map(|neuron| Arc::clone(neuron) as Arc<dyn BufferedElement>));
        let mut neurons = self.neurons.write();
        neurons.extend(ids.iter().copied().zip(group));
        // Kept sorted by id; a concurrent add may have interleaved
        neurons.sort_by_key(|(id, _)| *id);
        drop(neurons);
        self.state.set_changed_since_last_save(true);
        ids
    }

    pub fn remove_neuron(&self, id: ElementId) -> bool {
        self.remove_neurons(&[id]) == 1
    }

    /// Remove neurons; returns how many existed
    pub fn remove_neurons(&self, ids: &[ElementId]) -> usize {
        self.neurons.write().retain(|(neuron_id, _)| !ids.contains(neuron_id));
        let removed = self.engine.remove_group(ids);
        if removed > 0 {
            self.state.set_changed_since_last_save(true);
        }
        removed
    }

    pub fn neuron(&self, id: ElementId) -> Option<Arc<Neuron>> {
        let neurons = self.neurons.read();
        neurons
            .binary_search_by_key(&id, |(neuron_id, _)| *neuron_id)
            .ok()
            .map(|index| Arc::clone(&neurons[index].1))
    }

    /// Neuron addressed by a `neuron_<id>` container key
    fn neuron_for_key(&self, key: &str) -> Option<(ElementId, Arc<Neuron>)> {
        let raw = key.strip_prefix("neuron_")?.parse::<u64>().ok()?;
        let id = ElementId::new(raw);
        self.neuron(id).map(|neuron| (id, neuron))
    }

    pub fn neuron_ids(&self) -> Vec<ElementId> {
        self.neurons.read().iter().map(|(id, _)| *id).collect()
    }

    /// Add a weighted synapse; false if either neuron is unknown
    pub fn connect(&self, source: ElementId, target: ElementId, weight: f64) -> bool {
        match (self.neuron(source), self.neuron(target)) {
            (Some(source), Some(target)) => {
                target.connect_from(&source, weight);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.neurons.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn activations(&self) -> Vec<f64> {
        self.neurons.read().iter().map(|(_, neuron)| neuron.activation()).collect()
    }

    pub fn set_worker_count(&self, workers: usize) {
        self.engine.set_worker_count(workers);
    }

    fn neuron_container(&self, id: ElementId, neuron: &Arc<Neuron>) -> AttributeContainer {
        let key = self.id.container(&Self::neuron_key(id));

        let readable = Arc::downgrade(neuron);
        let removed = key.clone();
        let producer = Producer::new(key.attribute("activation"), AttributeType::Scalar, "Activation", move || {
            readable
                .upgrade()
                .map(|neuron| AttributeValue::Scalar(neuron.activation()))
                .ok_or_else(|| AttributeError::ContainerRemoved(removed.clone()))
        });

        let writable = Arc::downgrade(neuron);
        let consumer = Consumer::new(key.attribute("input"), AttributeType::Scalar, "External input", move |value| {
            if let Some(neuron) = writable.upgrade() {
                neuron.add_input(value.as_scalar()?);
            }
            Ok(())
        });

        AttributeContainer::new(key)
            .with_producer(producer)
            .with_consumer(consumer)
    }

    fn all_container(&self) -> AttributeContainer {
        AttributeContainer::bind(self.id.container(ALL_NEURONS_CONTAINER), &self.neurons)
            .producer("activations", AttributeType::Vector, "All activations", |neurons| {
                AttributeValue::Vector(neurons.iter().map(|(_, neuron)| neuron.activation()).collect())
            })
            .consumer("inputs", AttributeType::Vector, "All inputs", |neurons, value| {
                // Extra values or neurons are left unmatched
                for ((_, neuron), input) in neurons.iter().zip(value.as_vector()?) {
                    neuron.add_input(*input);
                }
                Ok(())
            })
            .build()
    }
}

impl WorkspaceComponent for NetworkComponent {
    fn id(&self) -> &ComponentId {
        &self.id
    }

    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn update(&self) -> Result<(), ComponentError> {
        let report = self
            .engine
            .update_pass()
            .map_err(|e| ComponentError::update_failure(&self.id, e.to_string()))?;
        match report.failures.first() {
            None => Ok(()),
            Some(first) => Err(ComponentError::update_failure(
                &self.id,
                format!("{} neuron failures, first: {}", report.failures.len(), first),
            )),
        }
    }

    fn attribute_containers(&self) -> Vec<AttributeContainer> {
        let mut containers: Vec<AttributeContainer> = self
            .neurons
            .read()
            .iter()
            .map(|(id, neuron)| self.neuron_container(*id, neuron))
            .collect();

        containers.push(self.all_container());
        containers
    }

    fn attribute_container(&self, key: &str) -> Option<AttributeContainer> {
        if key == ALL_NEURONS_CONTAINER {
            return Some(self.all_container());
        }
        self.neuron_for_key(key)
            .map(|(id, neuron)| self.neuron_container(id, &neuron))
    }
}
