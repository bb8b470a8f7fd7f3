use crate::core::couplings::CouplingUpdateReport;
use crate::core::errors::{ComponentError, PropagationError, UpdateError};

/// Outcome of updating a set of components
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentUpdateReport {
    /// Components whose parts were all attempted
    pub updated: usize,
    /// Components skipped because their update is switched off
    pub skipped: usize,
    pub failures: Vec<ComponentError>,
    /// At least one component asked a continuous run to stop
    pub halt_requested: bool,
}

impl ComponentUpdateReport {
    pub fn merge(&mut self, other: ComponentUpdateReport) {
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
        self.halt_requested |= other.halt_requested;
    }

    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything that went wrong (or not) in one workspace iteration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationReport {
    /// Iteration count after this iteration
    pub time: u64,
    pub actions_invoked: usize,
    pub coupling_failures: Vec<PropagationError>,
    pub component_failures: Vec<ComponentError>,
    pub action_failures: Vec<UpdateError>,
    pub halt_requested: bool,
}

impl IterationReport {
    pub fn is_ok(&self) -> bool {
        self.coupling_failures.is_empty()
            && self.component_failures.is_empty()
            && self.action_failures.is_empty()
    }

    pub(crate) fn record_couplings(&mut self, report: CouplingUpdateReport) {
        self.coupling_failures.extend(report.failures);
    }

    pub(crate) fn record_components(&mut self, report: ComponentUpdateReport) {
        self.component_failures.extend(report.failures);
        self.halt_requested |= report.halt_requested;
    }
}
