use crate::core::errors::UpdateError;
use crate::core::execution::controls::UpdateControls;
use crate::core::execution::execution_order::ExecutionOrderBuilder;
use crate::core::execution::script::{ScriptEngine, ScriptedUpdateAction};
use crate::core::types::ComponentId;
use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One schedulable unit of per-iteration work
pub trait UpdateAction: Send + Sync {
    /// Short name shown in action lists
    fn description(&self) -> String;

    fn long_description(&self) -> String {
        self.description()
    }

    /// Perform the work, blocking until it is complete
    fn invoke(&self, controls: &dyn UpdateControls) -> Result<(), UpdateError>;

    /// Persistable form of the action; `None` if it cannot be persisted
    fn spec(&self) -> Option<ActionSpec> {
        None
    }
}

/// Serializable description of an update action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ActionSpec {
    BufferedUpdate,
    UpdateCouplings,
    UpdateAllComponents,
    UpdateComponent { component: ComponentId },
    UpdateIncomingCouplings { component: ComponentId },
    UpdateOutgoingCouplings { component: ComponentId },
    PriorityUpdate { order: Vec<ComponentId> },
    TopologicalUpdate,
    Scripted { description: String, source: String },
}

impl ActionSpec {
    /// Rebuild the action; scripted actions are compiled with `engine`
    pub fn build(&self, engine: &Arc<dyn ScriptEngine>) -> Arc<dyn UpdateAction> {
        match self {
            ActionSpec::BufferedUpdate => Arc::new(BufferedUpdate),
            ActionSpec::UpdateCouplings => Arc::new(UpdateCouplings),
            ActionSpec::UpdateAllComponents => Arc::new(UpdateAllComponents),
            ActionSpec::UpdateComponent { component } => Arc::new(UpdateComponent::new(component.clone())),
            ActionSpec::UpdateIncomingCouplings { component } => {
                Arc::new(UpdateIncomingCouplings::new(component.clone()))
            }
            ActionSpec::UpdateOutgoingCouplings { component } => {
                Arc::new(UpdateOutgoingCouplings::new(component.clone()))
            }
            ActionSpec::PriorityUpdate { order } => Arc::new(PriorityUpdate::new(order.clone())),
            ActionSpec::TopologicalUpdate => Arc::new(TopologicalUpdate),
            ActionSpec::Scripted { description, source } => Arc::new(ScriptedUpdateAction::new(
                description.clone(),
                source.clone(),
                Arc::clone(engine),
            )),
        }
    }
}

/// Couplings first, then every component
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferedUpdate;

impl UpdateAction for BufferedUpdate {
    fn description(&self) -> String {
        "Buffered update".to_string()
    }

    fn long_description(&self) -> String {
        "Update all couplings, then update all components in parallel".to_string()
    }

    fn invoke(&self, controls: &dyn UpdateControls) -> Result<(), UpdateError> {
        controls.update_couplings();
        controls.update_all_components();
        Ok(())
    }

    fn spec(&self) -> Option<ActionSpec> {
        Some(ActionSpec::BufferedUpdate)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateCouplings;

impl UpdateAction for UpdateCouplings {
    fn description(&self) -> String {
        "Update couplings".to_string()
    }

    fn invoke(&self, controls: &dyn UpdateControls) -> Result<(), UpdateError> {
        controls.update_couplings();
        Ok(())
    }

    fn spec(&self) -> Option<ActionSpec> {
        Some(ActionSpec::UpdateCouplings)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateAllComponents;

impl UpdateAction for UpdateAllComponents {
    fn description(&self) -> String {
        "Update all components".to_string()
    }

    fn invoke(&self, controls: &dyn UpdateControls) -> Result<(), UpdateError> {
        controls.update_all_components();
        Ok(())
    }

    fn spec(&self) -> Option<ActionSpec> {
        Some(ActionSpec::UpdateAllComponents)
    }
}

/// Update a single component by id
#[derive(Debug, Clone)]
pub struct UpdateComponent {
    component: ComponentId,
}

impl UpdateComponent {
    pub fn new(component: ComponentId) -> Self {
        Self { component }
    }

    pub fn component(&self) -> &ComponentId {
        &self.component
    }
}

impl UpdateAction for UpdateComponent {
    fn description(&self) -> String {
        format!("Update {}", self.component)
    }

    fn invoke(&self, controls: &dyn UpdateControls) -> Result<(), UpdateError> {
        controls.update_component(&self.component).map(|_| ())
    }

    fn spec(&self) -> Option<ActionSpec> {
        Some(ActionSpec::UpdateComponent {
            component: self.component.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct UpdateIncomingCouplings {
    component: ComponentId,
}

impl UpdateIncomingCouplings {
    pub fn new(component: ComponentId) -> Self {
        Self { component }
    }
}

impl UpdateAction for UpdateIncomingCouplings {
    fn description(&self) -> String {
        format!("Update couplings into {}", self.component)
    }

    fn invoke(&self, controls: &dyn UpdateControls) -> Result<(), UpdateError> {
        controls.update_incoming_couplings(&self.component);
        Ok(())
    }

    fn spec(&self) -> Option<ActionSpec> {
        Some(ActionSpec::UpdateIncomingCouplings {
            component: self.component.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct UpdateOutgoingCouplings {
    component: ComponentId,
}

impl UpdateOutgoingCouplings {
    pub fn new(component: ComponentId) -> Self {
        Self { component }
    }
}

impl UpdateAction for UpdateOutgoingCouplings {
    fn description(&self) -> String {
        format!("Update couplings out of {}", self.component)
    }

    fn invoke(&self, controls: &dyn UpdateControls) -> Result<(), UpdateError> {
        controls.update_outgoing_couplings(&self.component);
        Ok(())
    }

    fn spec(&self) -> Option<ActionSpec> {
        Some(ActionSpec::UpdateOutgoingCouplings {
            component: self.component.clone(),
        })
    }
}

/// Update components one at a time in a fixed order
///
/// Each component first receives its incoming couplings, so later components
/// see values produced earlier in the same iteration. Missing components are
/// skipped and the first one is reported after the rest have run.
#[derive(Debug, Clone)]
pub struct PriorityUpdate {
    order: Vec<ComponentId>,
}

impl PriorityUpdate {
    pub fn new(order: Vec<ComponentId>) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &[ComponentId] {
        &self.order
    }
}

impl UpdateAction for PriorityUpdate {
    fn description(&self) -> String {
        "Priority update".to_string()
    }

    fn long_description(&self) -> String {
        let names: Vec<String> = self.order.iter().map(|id| id.to_string()).collect();
        format!("Priority update: {}", names.join(", "))
    }

    fn invoke(&self, controls: &dyn UpdateControls) -> Result<(), UpdateError> {
        let mut first_error = None;
        for component in &self.order {
            controls.update_incoming_couplings(component);
            if let Err(error) = controls.update_component(component) {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn spec(&self) -> Option<ActionSpec> {
        Some(ActionSpec::PriorityUpdate {
            order: self.order.clone(),
        })
    }
}

/// Update components stage by stage along the coupling graph
///
/// Stages are recomputed every iteration so added or removed couplings take
/// effect immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologicalUpdate;

impl UpdateAction for TopologicalUpdate {
    fn description(&self) -> String {
        "Topological update".to_string()
    }

    fn long_description(&self) -> String {
        "Update components in dependency order; each stage runs in parallel".to_string()
    }

    fn invoke(&self, controls: &dyn UpdateControls) -> Result<(), UpdateError> {
        let stages = ExecutionOrderBuilder::build_execution_order_stages(
            &controls.component_ids(),
            &controls.component_dependencies(),
        )?;
        trace!("Topological update over {} stages", stages.len());

        for stage in &stages {
            for component in stage {
                controls.update_incoming_couplings(component);
            }
            controls.update_components(stage)?;
        }
        Ok(())
    }

    fn spec(&self) -> Option<ActionSpec> {
        Some(ActionSpec::TopologicalUpdate)
    }
}

type ActionFn = Arc<dyn Fn(&dyn UpdateControls) -> Result<(), UpdateError> + Send + Sync>;

/// Ad hoc action wrapping a closure; never persisted
#[derive(Clone)]
pub struct ClosureAction {
    description: String,
    body: ActionFn,
}

impl ClosureAction {
    pub fn new<F>(description: impl Into<String>, body: F) -> Self
    where
        F: Fn(&dyn UpdateControls) -> Result<(), UpdateError> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            body: Arc::new(body),
        }
    }
}

impl fmt::Debug for ClosureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureAction")
            .field("description", &self.description)
            .finish()
    }
}

impl UpdateAction for ClosureAction {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn invoke(&self, controls: &dyn UpdateControls) -> Result<(), UpdateError> {
        (self.body)(controls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::execution::script::RegisteredScripts;

    #[test]
    fn test_built_in_actions_round_trip_through_spec() {
        let engine: Arc<dyn ScriptEngine> = Arc::new(RegisteredScripts::new());
        let component = ComponentId::new("net", "network");
        let specs = vec![
            ActionSpec::BufferedUpdate,
            ActionSpec::UpdateCouplings,
            ActionSpec::UpdateAllComponents,
            ActionSpec::UpdateComponent { component: component.clone() },
            ActionSpec::UpdateIncomingCouplings { component: component.clone() },
            ActionSpec::UpdateOutgoingCouplings { component: component.clone() },
            ActionSpec::PriorityUpdate { order: vec![component] },
            ActionSpec::TopologicalUpdate,
            ActionSpec::Scripted {
                description: "custom".to_string(),
                source: "nothing".to_string(),
            },
        ];

        for spec in specs {
            let action = spec.build(&engine);
            assert_eq!(action.spec(), Some(spec));
        }
    }

    #[test]
    fn test_spec_json_is_tagged() {
        let json = serde_json::to_string(&ActionSpec::TopologicalUpdate).unwrap();
        assert_eq!(json, r#"{"kind":"TopologicalUpdate"}"#);
    }

    #[test]
    fn test_closure_action_is_not_persisted() {
        let action = ClosureAction::new("noop", |_controls| Ok(()));
        assert_eq!(action.description(), "noop");
        assert!(action.spec().is_none());
    }
}
