use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;
use workspace_engine::core::execution::{TopologicalUpdate, UpdateAction};
use workspace_engine::{
    BufferedUpdateConfig, ConcurrencyMode, NetworkComponent, Neuron, RegisteredScripts, ScriptEngine,
    ScriptedUpdateAction, TableComponent, UpdaterConfig, Workspace, WorkspaceComponent,
};

/// Configuration for the headless workspace run
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    // Stimulus table
    pub channels: usize,
    pub samples: usize,
    pub noise_mean: f64,
    pub noise_std_dev: f64,

    // Network
    pub hidden_neurons: usize,
    pub weight: f64,
    pub network_workers: usize,

    // Updater
    pub update_threads: usize,
    pub iterations: usize,
    pub random_seed: u64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            channels: 4,
            samples: 16,
            noise_mean: 0.0,
            noise_std_dev: 0.3,

            hidden_neurons: 8,
            weight: 0.2,
            network_workers: 2,

            update_threads: 2,
            iterations: 20,
            random_seed: 42,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    println!("Starting headless workspace");

    let config = HeadlessConfig::default();

    println!("Configuration:");
    println!(
        "  Stimulus: {} channels x {} samples, noise mean={:.1}, std_dev={:.1}",
        config.channels, config.samples, config.noise_mean, config.noise_std_dev
    );
    println!(
        "  Network: {} inputs, {} hidden, weight={:.2}, workers={}",
        config.channels, config.hidden_neurons, config.weight, config.network_workers
    );
    println!(
        "  Updater: {} threads, {} iterations",
        config.update_threads, config.iterations
    );
    println!();

    // Noisy stimulus rows
    let mut rng = StdRng::seed_from_u64(config.random_seed);
    let noise = Normal::new(config.noise_mean, config.noise_std_dev)?;
    let columns: Vec<String> = (0..config.channels).map(|i| format!("channel_{}", i)).collect();
    let rows: Vec<Vec<f64>> = (0..config.samples)
        .map(|_| (0..config.channels).map(|_| noise.sample(&mut rng)).collect())
        .collect();
    let table = Arc::new(TableComponent::new("stimulus", columns.clone(), rows));

    // Input layer fully connected to the hidden layer
    let network = Arc::new(NetworkComponent::new(
        "network",
        BufferedUpdateConfig::new(config.network_workers),
    )?);
    let inputs = network.add_neuron_group(config.channels, 0.0);
    let hidden: Vec<_> = (0..config.hidden_neurons)
        .map(|_| network.add_neuron(Neuron::new(0.0)))
        .collect();
    for source in &inputs {
        for target in &hidden {
            network.connect(*source, *target, config.weight);
        }
    }

    let workspace = Workspace::with_config(
        UpdaterConfig::new()
            .with_concurrency(ConcurrencyMode::Parallel)
            .with_thread_pool_size(config.update_threads),
    )?;

    println!("Registering components...");
    workspace.add_component(table.clone())?;
    workspace.add_component(network.clone())?;

    println!("Coupling stimulus channels to input neurons...");
    for (column, neuron) in columns.iter().zip(&inputs) {
        workspace.couple(
            &table.id().container(column).attribute("value"),
            &network
                .id()
                .container(&NetworkComponent::neuron_key(*neuron))
                .attribute("input"),
        )?;
    }

    // Topological order plus a scripted summary step
    let scripts = Arc::new(RegisteredScripts::new());
    {
        let network = Arc::clone(&network);
        scripts.register("summarize", move |controls| {
            let mean = network.activations().iter().sum::<f64>() / network.len().max(1) as f64;
            log::info!("t={} mean activation {:.4}", controls.time() + 1, mean);
            Ok(())
        });
    }
    let engine: Arc<dyn ScriptEngine> = scripts;
    let actions: Vec<Arc<dyn UpdateAction>> = vec![
        Arc::new(TopologicalUpdate),
        Arc::new(ScriptedUpdateAction::new("Summarize", "summarize", Arc::clone(&engine))),
    ];
    workspace.updater().action_manager().set_actions(actions);

    println!("Running {} iterations...", config.iterations);
    let reports = workspace.iterate_n(config.iterations)?;
    let failures: usize = reports.iter().filter(|report| !report.is_ok()).count();

    println!();
    println!("Finished at t={} ({} iterations with failures)", workspace.time(), failures);
    println!("Hidden activations:");
    for id in &hidden {
        if let Some(neuron) = network.neuron(*id) {
            println!("  {}: {:+.4}", id, neuron.activation());
        }
    }

    let path = std::env::temp_dir().join("headless_workspace.json");
    std::fs::write(&path, workspace.to_json()?)?;
    workspace.mark_saved();
    println!();
    println!("Saved workspace state to {}", path.display());

    Ok(())
}
