use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use nodeflow_config::{ExecutionOptions, OptionsOverride, Workflow};
use nodeflow_engine::{ExecutionPlan, WorkflowExecutor};
use nodeflow_node::NodeRegistry;

/// Nodeflow - runs node-and-edge automation workflows
#[derive(Parser)]
#[command(name = "nodeflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.nodeflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Execute a workflow and print the result
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Run only these nodes and their dependencies
    #[arg(long = "node")]
    nodes: Vec<String>,

    /// Ignore cached node results
    #[arg(long)]
    no_cache: bool,

    /// Drop the workflow's cached results before running
    #[arg(long)]
    clear_cache: bool,

    /// Per-node timeout in milliseconds, 0 to disable
    #[arg(long)]
    timeout_ms: Option<u64>,
  },

  /// Print the execution plan without running anything
  Plan {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Plan only these nodes and their dependencies
    #[arg(long = "node")]
    nodes: Vec<String>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.unwrap_or_else(|| match dirs::home_dir() {
    Some(home) => home.join(".nodeflow"),
    None => PathBuf::from(".nodeflow"),
  });

  match cli.command {
    Some(Commands::Run {
      workflow_file,
      nodes,
      no_cache,
      clear_cache,
      timeout_ms,
    }) => {
      let flags = OptionsOverride {
        timeout_ms,
        max_retries: None,
        use_cache: no_cache.then_some(false),
        clear_cache: clear_cache.then_some(true),
      };
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_workflow(workflow_file, nodes, flags, data_dir))?;
    }
    Some(Commands::Plan {
      workflow_file,
      nodes,
    }) => {
      plan_workflow(&workflow_file, nodes)?;
    }
    None => {
      println!("nodeflow - use --help to see available commands");
    }
  }

  Ok(())
}

async fn run_workflow(
  workflow_file: PathBuf,
  nodes: Vec<String>,
  flags: OptionsOverride,
  data_dir: PathBuf,
) -> Result<()> {
  let workflow = load_workflow(&workflow_file, nodes)?;
  let options = load_options(&data_dir)?.merge(&flags);
  debug!(?options, "options_resolved");

  let executor = WorkflowExecutor::new(NodeRegistry::with_builtins());

  let execution = executor.execute(&workflow, options);
  tokio::pin!(execution);
  let result = tokio::select! {
    result = &mut execution => result,
    Ok(()) = tokio::signal::ctrl_c() => {
      warn!("interrupt received, stopping workflow");
      executor.stop();
      execution.await
    }
  };

  println!("{}", serde_json::to_string_pretty(&result)?);

  if !result.success {
    bail!(
      "workflow '{}' did not complete: {}",
      result.workflow_id,
      result.error.unwrap_or_default()
    );
  }
  Ok(())
}

fn plan_workflow(workflow_file: &Path, nodes: Vec<String>) -> Result<()> {
  let workflow = load_workflow(workflow_file, nodes)?;
  let plan = ExecutionPlan::build(&workflow).context("failed to plan workflow")?;
  println!("{}", serde_json::to_string_pretty(&plan.summary())?);
  Ok(())
}

/// Read a workflow file. A non-empty `--node` list replaces the file's own
/// selection.
fn load_workflow(workflow_file: &Path, nodes: Vec<String>) -> Result<Workflow> {
  let content = std::fs::read_to_string(workflow_file)
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;
  let mut workflow: Workflow = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))?;

  if !nodes.is_empty() {
    workflow.selected_node_ids = Some(nodes);
  }
  Ok(workflow)
}

/// Defaults, overlaid with `<data-dir>/options.json` when it exists.
fn load_options(data_dir: &Path) -> Result<ExecutionOptions> {
  let path = data_dir.join("options.json");
  if !path.exists() {
    return Ok(ExecutionOptions::default());
  }

  let content = std::fs::read_to_string(&path)
    .with_context(|| format!("failed to read options file: {}", path.display()))?;
  let overrides: OptionsOverride = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse options file: {}", path.display()))?;
  Ok(ExecutionOptions::default().merge(&overrides))
}
