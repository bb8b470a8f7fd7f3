use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use workspace_engine::core::components::{ALL_NEURONS_CONTAINER, ROW_CONTAINER};
use workspace_engine::core::execution::{TopologicalUpdate, UpdateCouplings};
use workspace_engine::{
    ActionSpec, AttributeValue, BufferedUpdateConfig, CouplingError, NetworkComponent, Neuron, RegisteredScripts,
    ScriptEngine, ScriptError, ScriptedUpdateAction, TableComponent, UpdaterConfig, Workspace, WorkspaceComponent,
    WorkspaceError, WorkspaceState,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn table() -> Arc<TableComponent> {
    Arc::new(TableComponent::new(
        "stimulus",
        vec!["left".to_string(), "right".to_string()],
        vec![vec![0.1, 0.2], vec![0.3, 0.4], vec![0.5, 0.6]],
    ))
}

fn network() -> Arc<NetworkComponent> {
    let network = NetworkComponent::new("brain", BufferedUpdateConfig::new(2)).unwrap();
    network.add_neuron_group(2, 0.0);
    Arc::new(network)
}

fn workspace() -> Workspace {
    init_logging();
    Workspace::with_config(UpdaterConfig::new().with_thread_pool_size(2)).unwrap()
}

fn neuron_input(network: &NetworkComponent, index: usize) -> workspace_engine::AttributeRef {
    let key = NetworkComponent::neuron_key(network.neuron_ids()[index]);
    network.id().container(&key).attribute("input")
}

#[test]
fn test_table_drives_network() {
    let workspace = workspace();
    let table = table();
    let network = network();
    workspace.add_component(table.clone()).unwrap();
    workspace.add_component(network.clone()).unwrap();

    workspace
        .couple(
            &table.id().container(ROW_CONTAINER).attribute("values"),
            &network.id().container(ALL_NEURONS_CONTAINER).attribute("inputs"),
        )
        .unwrap();

    let report = workspace.iterate().unwrap();
    assert!(report.is_ok());
    // Couplings read row 0, then the table advanced to row 1
    assert_eq!(network.activations(), vec![0.1, 0.2]);
    assert_eq!(table.current_row(), 1);

    workspace.iterate().unwrap();
    assert_eq!(network.activations(), vec![0.3, 0.4]);
    assert_eq!(workspace.time(), 2);
}

#[test]
fn test_resolution_errors_name_the_missing_piece() {
    let workspace = workspace();
    let table = table();
    workspace.add_component(table.clone()).unwrap();

    let missing_component = workspace.resolve_producer(
        &workspace_engine::ComponentId::new("ghost", "table")
            .container("left")
            .attribute("value"),
    );
    assert!(matches!(missing_component, Err(CouplingError::ComponentNotFound(name)) if name == "ghost"));

    let missing_container = workspace.resolve_producer(&table.id().container("middle").attribute("value"));
    assert!(matches!(missing_container, Err(CouplingError::ContainerNotFound(_))));

    let missing_member = workspace.resolve_consumer(&table.id().container("left").attribute("nothing"));
    assert!(matches!(missing_member, Err(CouplingError::ConsumerNotFound(_))));

    let producer = workspace
        .resolve_producer(&table.id().container("left").attribute("value"))
        .unwrap();
    assert_eq!(producer.read().unwrap(), AttributeValue::Scalar(0.1));
}

#[test]
fn test_duplicate_component_names_are_rejected() {
    let workspace = workspace();
    workspace.add_component(table()).unwrap();
    assert!(matches!(
        workspace.add_component(table()),
        Err(WorkspaceError::DuplicateComponent(_))
    ));
}

#[test]
fn test_removing_component_removes_its_couplings() {
    let workspace = workspace();
    let table = table();
    let network = network();
    workspace.add_component(table.clone()).unwrap();
    workspace.add_component(network.clone()).unwrap();
    workspace
        .couple(&table.id().container("left").attribute("value"), &neuron_input(&network, 0))
        .unwrap();
    workspace
        .couple(&table.id().container("right").attribute("value"), &neuron_input(&network, 1))
        .unwrap();
    assert_eq!(workspace.coupling_manager().len(), 2);

    workspace.remove_component("brain").unwrap();

    assert!(workspace.coupling_manager().is_empty());
    assert!(workspace.component("brain").is_none());
    assert!(workspace.iterate().unwrap().is_ok());
    assert!(matches!(
        workspace.remove_component("brain"),
        Err(WorkspaceError::ComponentNotFound(_))
    ));
}

#[test]
fn test_concurrent_coupling_never_outlives_removed_component() {
    let workspace = Arc::new(workspace());
    let sink = Arc::new(TableComponent::new("sink", vec!["y".to_string()], vec![vec![0.0]]));
    workspace.add_component(sink.clone()).unwrap();
    let target = sink.id().container("y").attribute("value");
    let source = workspace_engine::ComponentId::new("source", "table")
        .container("x")
        .attribute("value");

    for _ in 0..50 {
        let table = Arc::new(TableComponent::new("source", vec!["x".to_string()], vec![vec![1.0]]));
        workspace.add_component(table).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let coupler = {
            let workspace = Arc::clone(&workspace);
            let done = Arc::clone(&done);
            let (source, target) = (source.clone(), target.clone());
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    let _ = workspace.couple(&source, &target);
                }
            })
        };

        workspace.remove_component("source").unwrap();
        done.store(true, Ordering::SeqCst);
        coupler.join().unwrap();

        let live: Vec<String> = workspace
            .component_ids()
            .iter()
            .map(|id| id.name().to_string())
            .collect();
        for coupling in workspace.coupling_manager().couplings() {
            assert!(live.iter().any(|name| name == coupling.producer().reference().component().name()));
        }
        assert!(workspace.coupling_manager().is_empty());
    }
}

#[test]
fn test_removing_attribute_container_removes_its_couplings() {
    let workspace = workspace();
    let table = table();
    let network = network();
    workspace.add_component(table.clone()).unwrap();
    workspace.add_component(network.clone()).unwrap();
    let input = neuron_input(&network, 0);
    workspace
        .couple(&table.id().container("left").attribute("value"), &input)
        .unwrap();

    let removed = workspace.remove_attribute_container(input.container());

    assert_eq!(removed.len(), 1);
    assert!(workspace.coupling_manager().is_empty());
}

#[test]
fn test_change_tracking() {
    let workspace = workspace();
    assert!(!workspace.changes_exist());

    let table = table();
    workspace.add_component(table.clone()).unwrap();
    assert!(workspace.changes_exist());

    workspace.mark_saved();
    assert!(!workspace.changes_exist());

    table.set_value(0, 0, 9.0);
    assert!(workspace.changes_exist());
}

#[test]
fn test_state_round_trip_restores_actions_and_couplings() {
    let workspace = workspace();
    let table = table();
    let network = network();
    workspace.add_component(table.clone()).unwrap();
    workspace.add_component(network.clone()).unwrap();
    workspace
        .couple(&table.id().container("left").attribute("value"), &neuron_input(&network, 0))
        .unwrap();

    let scripts = Arc::new(RegisteredScripts::new());
    scripts.register("noop", |_controls| Ok(()));
    let engine: Arc<dyn ScriptEngine> = scripts.clone();
    let actions = workspace.updater().action_manager();
    actions.set_actions(vec![
        Arc::new(UpdateCouplings),
        Arc::new(TopologicalUpdate),
        Arc::new(ScriptedUpdateAction::new("Custom", "noop", Arc::clone(&engine))),
    ]);

    let json = workspace.to_json().unwrap();

    let restored = self::workspace();
    let restored_table = self::table();
    let restored_network = self::network();
    restored.add_component(restored_table.clone()).unwrap();
    restored.add_component(restored_network.clone()).unwrap();

    let report = restored.from_json(&json, &engine).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.couplings_restored, 1);
    assert_eq!(
        restored.updater().action_manager().descriptions(),
        vec!["Update couplings", "Topological update", "Custom"]
    );
    assert_eq!(restored.updater().config().thread_pool_size, Some(2));

    restored.iterate().unwrap();
    // Row 0 from the coupling pass, row 1 once the table has advanced ahead of the network
    let first_neuron = restored_network.neuron(restored_network.neuron_ids()[0]).unwrap();
    assert!((first_neuron.activation() - 0.4).abs() < 1e-12);
    assert_eq!(restored_table.current_row(), 1);
}

#[test]
fn test_restore_reports_what_it_could_not_resolve() {
    let workspace = workspace();
    let table = table();
    let network = network();
    workspace.add_component(table.clone()).unwrap();
    workspace.add_component(network.clone()).unwrap();
    workspace
        .couple(&table.id().container("left").attribute("value"), &neuron_input(&network, 0))
        .unwrap();
    workspace
        .couple(&table.id().container("right").attribute("value"), &neuron_input(&network, 1))
        .unwrap();

    let mut state: WorkspaceState = workspace.save_state();
    state.update_actions.push(ActionSpec::Scripted {
        description: "Gone".to_string(),
        source: "not_registered".to_string(),
    });

    // Only the table comes back
    let restored = self::workspace();
    restored.add_component(self::table()).unwrap();
    let engine: Arc<dyn ScriptEngine> = Arc::new(RegisteredScripts::new());

    let report = restored.restore_state(&state, &engine).unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.couplings_restored, 0);
    assert_eq!(report.unresolved.len(), 2);
    assert!(report
        .unresolved
        .iter()
        .all(|(_, error)| matches!(error, CouplingError::ComponentNotFound(name) if name == "brain")));
    assert!(matches!(
        &report.script_failures[..],
        [ScriptError::EvaluationFailure { name, .. }] if name == "Gone"
    ));
    assert_eq!(restored.updater().action_manager().len(), 2);
}

#[test]
fn test_clear_empties_workspace() {
    let workspace = workspace();
    let table = table();
    let network = network();
    workspace.add_component(table.clone()).unwrap();
    workspace.add_component(network.clone()).unwrap();
    workspace
        .couple(&table.id().container("left").attribute("value"), &neuron_input(&network, 0))
        .unwrap();
    workspace.iterate().unwrap();

    workspace.clear().unwrap();

    assert!(workspace.components().is_empty());
    assert!(workspace.coupling_manager().is_empty());
    assert_eq!(workspace.time(), 0);
    assert!(!workspace.changes_exist());
    assert_eq!(
        workspace.updater().action_manager().descriptions(),
        vec!["Buffered update"]
    );
}

#[test]
fn test_restore_refused_while_running() {
    let workspace = workspace();
    workspace.add_component(network()).unwrap();
    let state = workspace.save_state();
    let engine: Arc<dyn ScriptEngine> = Arc::new(RegisteredScripts::new());

    workspace.run().unwrap();
    let result = workspace.restore_state(&state, &engine);
    workspace.stop();
    workspace.join().unwrap();

    assert!(matches!(result, Err(WorkspaceError::AlreadyRunning)));
    assert!(workspace.restore_state(&state, &engine).is_ok());
}

#[test]
fn test_neuron_accessors() {
    let network = network();
    let extra = network.add_neuron(Neuron::new(0.5).with_bounds(0.0, 0.25));
    network.update().unwrap();
    assert_eq!(network.neuron(extra).unwrap().activation(), 0.25);
    assert_eq!(network.len(), 3);
}
