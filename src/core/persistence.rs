//! Persisted workspace state
//!
//! Only the update configuration, the ordered action list and the couplings
//! are stored here. Couplings are archived by container key and member name
//! so they can be re-resolved against freshly loaded components.

use crate::core::errors::{CouplingError, ScriptError, WorkspaceError};
use crate::core::execution::{ActionSpec, UpdaterConfig};
use crate::core::types::AttributeRef;
use serde::{Deserialize, Serialize};

/// A coupling as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedCoupling {
    pub producer: AttributeRef,
    pub consumer: AttributeRef,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkspaceState {
    pub config: UpdaterConfig,
    pub update_actions: Vec<ActionSpec>,
    pub couplings: Vec<ArchivedCoupling>,
}

impl WorkspaceState {
    pub fn to_json(&self) -> Result<String, WorkspaceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, WorkspaceError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// What a restore could not bring back
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub couplings_restored: usize,
    /// Couplings skipped because an endpoint could not be resolved
    pub unresolved: Vec<(ArchivedCoupling, CouplingError)>,
    /// Scripted actions restored inert
    pub script_failures: Vec<ScriptError>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && self.script_failures.is_empty()
    }
}
