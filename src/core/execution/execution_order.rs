use crate::core::errors::UpdateError;
use crate::core::types::ComponentId;
use std::collections::HashMap;

/// Topological ordering of components over their coupling dependencies
pub struct ExecutionOrderBuilder;

impl ExecutionOrderBuilder {
    /// Organize components into stages with modified Kahn's algorithm
    ///
    /// Every component in a stage depends only on components of earlier
    /// stages, so a stage can be updated in parallel. Within a stage the
    /// components keep their order in `component_ids`. Edges naming unknown
    /// components are ignored.
    pub fn build_execution_order_stages(
        component_ids: &[ComponentId],
        dependencies: &[(ComponentId, ComponentId)],
    ) -> Result<Vec<Vec<ComponentId>>, UpdateError> {
        let position: HashMap<&ComponentId, usize> = component_ids
            .iter()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();

        let mut adj_list: Vec<Vec<usize>> = vec![Vec::new(); component_ids.len()];
        let mut in_degree: Vec<Option<usize>> = vec![Some(0); component_ids.len()];

        for (source, target) in dependencies {
            let (Some(&source), Some(&target)) = (position.get(source), position.get(target)) else {
                continue;
            };
            if source == target {
                continue;
            }
            adj_list[source].push(target);
            if let Some(degree) = in_degree[target].as_mut() {
                *degree += 1;
            }
        }

        let mut stages = Vec::new();
        let mut processed_count = 0;

        while processed_count < component_ids.len() {
            let current_stage: Vec<usize> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, degree)| **degree == Some(0))
                .map(|(index, _)| index)
                .collect();

            if current_stage.is_empty() {
                let remaining = in_degree
                    .iter()
                    .enumerate()
                    .filter(|(_, degree)| degree.is_some())
                    .map(|(index, _)| component_ids[index].clone())
                    .collect();
                return Err(UpdateError::CyclicDependencies(remaining));
            }

            for &index in &current_stage {
                in_degree[index] = None;
                processed_count += 1;
                for &neighbor in &adj_list[index] {
                    if let Some(degree) = in_degree[neighbor].as_mut() {
                        *degree -= 1;
                    }
                }
            }

            stages.push(
                current_stage
                    .into_iter()
                    .map(|index| component_ids[index].clone())
                    .collect(),
            );
        }

        Ok(stages)
    }

    /// Flattened topological order
    pub fn build_execution_order(
        component_ids: &[ComponentId],
        dependencies: &[(ComponentId, ComponentId)],
    ) -> Result<Vec<ComponentId>, UpdateError> {
        let stages = Self::build_execution_order_stages(component_ids, dependencies)?;
        Ok(stages.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str) -> ComponentId {
        ComponentId::new(name, "test")
    }

    fn edge(source: &str, target: &str) -> (ComponentId, ComponentId) {
        (component(source), component(target))
    }

    #[test]
    fn test_build_execution_order_stages_simple() {
        // A -> B -> C
        let components = vec![component("C"), component("B"), component("A")];
        let dependencies = vec![edge("A", "B"), edge("B", "C")];

        let stages = ExecutionOrderBuilder::build_execution_order_stages(&components, &dependencies)
            .expect("Should build execution order");

        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0], vec![component("A")]);
        assert_eq!(stages[1], vec![component("B")]);
        assert_eq!(stages[2], vec![component("C")]);
    }

    #[test]
    fn test_build_execution_order_stages_parallel() {
        // A -> B, A -> C, B -> D, C -> D
        let components = vec![component("A"), component("B"), component("C"), component("D")];
        let dependencies = vec![edge("A", "B"), edge("A", "C"), edge("B", "D"), edge("C", "D")];

        let stages = ExecutionOrderBuilder::build_execution_order_stages(&components, &dependencies)
            .expect("Should build execution order");

        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0], vec![component("A")]);
        assert_eq!(stages[1], vec![component("B"), component("C")]);
        assert_eq!(stages[2], vec![component("D")]);
    }

    #[test]
    fn test_independent_components_share_a_stage() {
        let components = vec![component("Y"), component("X")];
        let stages = ExecutionOrderBuilder::build_execution_order_stages(&components, &[])
            .expect("Should build execution order");
        assert_eq!(stages, vec![vec![component("Y"), component("X")]]);
    }

    #[test]
    fn test_build_execution_order_stages_cycle_detection() {
        // A -> B -> A, C independent
        let components = vec![component("A"), component("B"), component("C")];
        let dependencies = vec![edge("A", "B"), edge("B", "A")];

        let result = ExecutionOrderBuilder::build_execution_order_stages(&components, &dependencies);
        match result {
            Err(UpdateError::CyclicDependencies(remaining)) => {
                assert_eq!(remaining, vec![component("A"), component("B")]);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_components_are_ignored() {
        let components = vec![component("A"), component("B")];
        let dependencies = vec![edge("A", "B"), edge("Ghost", "A")];

        let order = ExecutionOrderBuilder::build_execution_order(&components, &dependencies)
            .expect("Should build execution order");
        assert_eq!(order, vec![component("A"), component("B")]);
    }
}
