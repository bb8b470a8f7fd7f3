use crate::core::attributes::{Consumer, Producer};
use crate::core::errors::CouplingError;
use crate::core::types::AttributeRef;
use std::collections::HashSet;

/// Centralized coupling validation logic
pub struct CouplingValidator;

impl CouplingValidator {
    /// Validate that a producer and a consumer carry the same value type
    pub fn validate_types(producer: &Producer, consumer: &Consumer) -> Result<(), CouplingError> {
        if producer.value_type() != consumer.value_type() {
            return Err(CouplingError::MismatchedAttributeType {
                producer: producer.reference().clone(),
                consumer: consumer.reference().clone(),
                producer_type: producer.value_type(),
                consumer_type: consumer.value_type(),
            });
        }
        Ok(())
    }

    /// Check that an identical producer/consumer pair is not already coupled
    pub fn check_duplicate(
        existing: &HashSet<(AttributeRef, AttributeRef)>,
        producer: &Producer,
        consumer: &Consumer,
    ) -> Result<(), CouplingError> {
        let pair = (producer.reference().clone(), consumer.reference().clone());
        if existing.contains(&pair) {
            return Err(CouplingError::DuplicateCoupling {
                producer: pair.0,
                consumer: pair.1,
            });
        }
        Ok(())
    }

    /// Validate a whole batch of pairs before any of them is created
    ///
    /// Pairs are checked against the existing set and against each other. The
    /// first offending pair aborts the batch.
    pub fn validate_batch(
        existing: &HashSet<(AttributeRef, AttributeRef)>,
        pairs: &[(&Producer, &Consumer)],
    ) -> Result<(), CouplingError> {
        let mut pending = HashSet::new();
        for (producer, consumer) in pairs {
            Self::validate_types(producer, consumer)?;
            Self::check_duplicate(existing, producer, consumer)?;
            let pair = (producer.reference().clone(), consumer.reference().clone());
            if !pending.insert(pair.clone()) {
                return Err(CouplingError::DuplicateCoupling {
                    producer: pair.0,
                    consumer: pair.1,
                });
            }
        }
        Ok(())
    }
}
