//! hivearchive CLI: inspect an archive and run workflows against a cluster.

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hivearchive_core::config::{ArchiveConfig, BackendKind};
use hivearchive_core::error::Error as GraphError;
use hivearchive_exec::{
    run_workflow, Backend, DummyBackend, ExecutionOptions, Executor, StdinPrompt, WorkflowResult,
};
use hivearchive_planner::{read_archive, OptimizeMode, Registry, Workflow};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "hivearchive")]
#[command(about = "Compile a warehouse of Hive relations into ordered HQL and run it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ArchiveArgs {
    /// Path to the archive definition YAML file
    #[arg(short, long)]
    archive: PathBuf,

    /// Name of the target node (optional)
    #[arg(short, long)]
    query: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct HiveArgs {
    #[command(flatten)]
    archive: ArchiveArgs,

    /// Label of the cluster to run on (overrides config)
    #[arg(short, long)]
    label: Option<String>,

    /// Do not warn on create/drop/insert/alter statements
    #[arg(short = 'n', long)]
    no_warn: bool,

    /// Print HQL rather than executing it
    #[arg(short, long)]
    dry: bool,

    /// Submit jobs without waiting for them to finish
    #[arg(long)]
    detach: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List nodes by resolved materialization
    Show(ArchiveArgs),

    /// Print the dependency tree of the archive or one node
    Graph(ArchiveArgs),

    /// Print optimization statistics as JSON
    Stats(ArchiveArgs),

    /// Drop every database the archive touches
    #[command(name = "drop_all", alias = "drop-all")]
    DropAll(HiveArgs),

    /// Drop every relation resolved to a table
    #[command(name = "drop_tables", alias = "drop-tables")]
    DropTables(HiveArgs),

    /// Drop one relation
    Drop(HiveArgs),

    /// Create one relation without its dependencies
    Create(HiveArgs),

    /// Create tables and what they read from
    #[command(name = "create_tables", alias = "create-tables")]
    CreateTables(HiveArgs),

    /// Recover partitions of partitioned external tables
    #[command(name = "recover_partitions", alias = "recover-partitions")]
    RecoverPartitions(HiveArgs),

    /// Create everything as views to validate HQL without building tables
    Develop(HiveArgs),

    /// Create relations, promoting heavily-read ones to tables
    Build(HiveArgs),

    /// Run statements after building what they read
    Run(HiveArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match dispatch(cli.command) {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("Aborting");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// `Ok(false)` when the operator declined.
fn dispatch(command: Commands) -> CliResult<bool> {
    let (workflow, args) = match command {
        Commands::Show(args) => return show(&args),
        Commands::Graph(args) => return graph(&args),
        Commands::Stats(args) => return stats(&args),
        Commands::DropAll(a) => (Workflow::DropAll, a),
        Commands::DropTables(a) => (Workflow::DropTables, a),
        Commands::Drop(a) => (Workflow::Drop, a),
        Commands::Create(a) => (Workflow::Create, a),
        Commands::CreateTables(a) => (Workflow::CreateTables, a),
        Commands::RecoverPartitions(a) => (Workflow::RecoverPartitions, a),
        Commands::Develop(a) => (Workflow::Develop, a),
        Commands::Build(a) => (Workflow::Build, a),
        Commands::Run(a) => (Workflow::Run, a),
    };
    run_hive_command(workflow, &args)
}

fn show(args: &ArchiveArgs) -> CliResult<bool> {
    let (mut registry, _) = load(&args.archive)?;
    reject_target("show", args)?;
    registry.optimize(OptimizeMode::Build);
    print!("{}", registry.show()?);
    Ok(true)
}

fn graph(args: &ArchiveArgs) -> CliResult<bool> {
    let (registry, _) = load(&args.archive)?;
    match &args.query {
        Some(name) => println!("{}", registry.graph_node(registry.id(name)?)),
        None => println!("{}", registry.graph()),
    }
    Ok(true)
}

fn stats(args: &ArchiveArgs) -> CliResult<bool> {
    let (mut registry, _) = load(&args.archive)?;
    reject_target("stats", args)?;
    let stats = registry.optimize(OptimizeMode::Build);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(true)
}

fn reject_target(verb: &str, args: &ArchiveArgs) -> CliResult<()> {
    match &args.query {
        Some(name) => Err(GraphError::Unsupported {
            verb: verb.to_string(),
            scope: format!("node '{name}'"),
        }
        .into()),
        None => Ok(()),
    }
}

/// Environment first, then the definition's `config:` block.
fn load(path: &Path) -> CliResult<(Registry, ArchiveConfig)> {
    let mut config = ArchiveConfig::from_env()?;
    let parsed = read_archive(path)?;
    parsed.config.apply(&mut config)?;
    config.validate()?;
    let registry = parsed.registry(config.table_threshold)?;
    tracing::debug!(
        archive = %registry.name(),
        path = %path.display(),
        nodes = registry.len(),
        label = %config.label,
        "loaded archive"
    );
    Ok((registry, config))
}

/// CLI flags override everything loaded from env and the definition.
fn execution_options(config: &ArchiveConfig, args: &HiveArgs) -> ExecutionOptions {
    ExecutionOptions {
        warn: !args.no_warn,
        dry: args.dry,
        label: args.label.clone().unwrap_or_else(|| config.label.clone()),
        detach: args.detach,
    }
}

fn build_backend(config: &ArchiveConfig) -> CliResult<Box<dyn Backend>> {
    match config.backend {
        BackendKind::Dummy => Ok(Box::new(DummyBackend::new())),
        BackendKind::Qubole => {
            #[cfg(feature = "qubole")]
            {
                use hivearchive_exec::qubole::QuboleService;
                use hivearchive_exec::{PollingBackend, RetryPolicy};

                let service = QuboleService::from_config(config)?;
                Ok(Box::new(PollingBackend::new(
                    service,
                    RetryPolicy::from_config(config),
                )))
            }

            #[cfg(not(feature = "qubole"))]
            {
                Err("hivearchive was built without the `qubole` feature; rebuild with `--features qubole`".into())
            }
        }
    }
}

fn run_hive_command(workflow: Workflow, args: &HiveArgs) -> CliResult<bool> {
    let (mut registry, config) = load(&args.archive.archive)?;
    let options = execution_options(&config, args);
    let backend = build_backend(&config)?;
    let mut executor = Executor::new(backend, StdinPrompt, options);

    let target = args.archive.query.as_deref();
    match run_workflow(&mut registry, workflow, target, &mut executor)? {
        WorkflowResult::Dry(script) => println!("{}", script.text()),
        WorkflowResult::Completed { manifest, .. } => {
            println!("{}", serde_json::to_string_pretty(&manifest)?)
        }
        WorkflowResult::Submitted(handles) => {
            for handle in handles {
                println!("submitted job {handle}");
            }
        }
        WorkflowResult::Aborted => return Ok(false),
    }
    Ok(true)
}
