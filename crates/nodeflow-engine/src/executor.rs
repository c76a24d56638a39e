//! Workflow executor.

use std::sync::{Arc, Mutex, MutexGuard};

use nodeflow_config::{ExecutionOptions, Workflow};
use nodeflow_node::{NodeResolver, TemplateResolver, VariableResolver};
use tracing::{error, info, instrument, warn};

use crate::cache::{CacheStats, CacheStore, CachedNodeResult};
use crate::context::{ExecutionContext, RunStatus, SKIP_CONTAINER, SKIP_NOT_SELECTED};
use crate::control::RunControl;
use crate::error::ExecutionError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::plan::{ExecutionPlan, ExecutionStrategy};
use crate::result::{ExecutionResult, ExecutionSnapshot};
use crate::run::WorkflowRun;

/// The run currently bound to an executor.
struct ActiveRun {
  control: Arc<RunControl>,
  context: Arc<Mutex<ExecutionContext>>,
}

/// Clears the executor's active slot when a run ends, including when the
/// `execute` future is dropped.
struct ActiveRunGuard<'a> {
  slot: &'a Mutex<Option<ActiveRun>>,
}

impl Drop for ActiveRunGuard<'_> {
  fn drop(&mut self) {
    *lock(self.slot) = None;
  }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Runs workflows one at a time.
///
/// # Usage
///
/// ```ignore
/// let executor = Arc::new(WorkflowExecutor::new(NodeRegistry::with_builtins()));
///
/// let result = executor.execute(&workflow, ExecutionOptions::default()).await;
///
/// // From another task while the run is active:
/// executor.pause();
/// executor.resume();
/// executor.stop();
/// ```
pub struct WorkflowExecutor {
  resolver: Arc<dyn NodeResolver>,
  variables: Arc<dyn VariableResolver>,
  cache: Arc<CacheStore>,
  notifier: Arc<dyn ExecutionNotifier>,
  active: Mutex<Option<ActiveRun>>,
}

impl WorkflowExecutor {
  /// Create an executor using the process-wide cache, minijinja param
  /// resolution and no event notifier.
  pub fn new(resolver: impl NodeResolver + 'static) -> Self {
    Self {
      resolver: Arc::new(resolver),
      variables: Arc::new(TemplateResolver::new()),
      cache: CacheStore::shared(),
      notifier: Arc::new(NoopNotifier),
      active: Mutex::new(None),
    }
  }

  pub fn with_notifier(mut self, notifier: impl ExecutionNotifier + 'static) -> Self {
    self.notifier = Arc::new(notifier);
    self
  }

  pub fn with_variable_resolver(mut self, variables: impl VariableResolver + 'static) -> Self {
    self.variables = Arc::new(variables);
    self
  }

  /// Use a private cache instead of the process-wide one.
  pub fn with_cache_store(mut self, cache: Arc<CacheStore>) -> Self {
    self.cache = cache;
    self
  }

  /// Execute a workflow and report the outcome.
  ///
  /// Never fails: structural errors, node failures and cancellation all come
  /// back as an unsuccessful [`ExecutionResult`].
  #[instrument(
    name = "workflow_execute",
    skip(self, workflow, options),
    fields(workflow_id = %workflow.workflow_id)
  )]
  pub async fn execute(&self, workflow: &Workflow, options: ExecutionOptions) -> ExecutionResult {
    let execution_id = uuid::Uuid::new_v4().to_string();
    let strategy = ExecutionStrategy::for_selection(workflow.selection());
    let context = Arc::new(Mutex::new(ExecutionContext::new(&execution_id, workflow)));
    let control = Arc::new(RunControl::new());

    let _guard = {
      let mut active = lock(&self.active);
      if active.is_some() {
        drop(active);
        warn!(execution_id = %execution_id, "workflow already running on this executor");
        return self.reject(&context, strategy, ExecutionError::AlreadyRunning);
      }
      *active = Some(ActiveRun {
        control: control.clone(),
        context: context.clone(),
      });
      ActiveRunGuard { slot: &self.active }
    };

    lock(&context).start();
    info!(
      execution_id = %execution_id,
      workflow_id = %workflow.workflow_id,
      strategy = ?strategy,
      nodes = workflow.nodes.len(),
      "workflow_started"
    );
    self.notifier.notify(ExecutionEvent::WorkflowStarted {
      execution_id: execution_id.clone(),
      workflow_id: workflow.workflow_id.clone(),
    });

    let outcome = self.run(workflow, &options, &context, &control).await;
    self.finish(&context, strategy, outcome)
  }

  async fn run(
    &self,
    workflow: &Workflow,
    options: &ExecutionOptions,
    context: &Mutex<ExecutionContext>,
    control: &RunControl,
  ) -> Result<(), ExecutionError> {
    if options.clear_cache {
      self.cache.clear_workflow(&workflow.workflow_id);
    }
    self.cache.record_run(&workflow.workflow_id, workflow.nodes.len());

    let plan = ExecutionPlan::build(workflow)?;

    if plan.strategy() == ExecutionStrategy::Full && plan.graph().start_nodes().is_empty() {
      warn!(workflow_id = %workflow.workflow_id, "workflow has no start nodes, nothing to execute");
    }

    {
      let mut ctx = lock(context);
      let graph = plan.graph();
      for node_id in graph.node_ids() {
        if graph.parent_of(node_id).is_some() || plan.order().contains(node_id) {
          continue;
        }
        let reason = if graph.is_container(node_id) {
          SKIP_CONTAINER
        } else {
          SKIP_NOT_SELECTED
        };
        ctx.mark_skipped(node_id, reason);
      }
      ctx.set_planned(plan.order().len());
    }

    let run = WorkflowRun {
      resolver: self.resolver.as_ref(),
      variables: self.variables.as_ref(),
      cache: self.cache.as_ref(),
      notifier: self.notifier.as_ref(),
      workflow,
      options,
      plan: &plan,
      context,
      control,
    };
    run.run().await
  }

  fn finish(
    &self,
    context: &Mutex<ExecutionContext>,
    strategy: ExecutionStrategy,
    outcome: Result<(), ExecutionError>,
  ) -> ExecutionResult {
    let mut ctx = lock(context);
    let execution_id = ctx.execution_id().to_string();

    let error = match outcome {
      Ok(()) => {
        // Running out of nodes is success, with or without an end node.
        ctx.finish(RunStatus::Success);
        None
      }
      Err(ExecutionError::Cancelled) => {
        ctx.finish(RunStatus::Aborted);
        Some(ExecutionError::Cancelled.to_string())
      }
      Err(e) => {
        ctx.finish(RunStatus::Error);
        Some(e.to_string())
      }
    };
    ctx.sweep_pending();

    let result = ExecutionResult::from_context(&ctx, strategy, error);
    drop(ctx);

    match result.status {
      RunStatus::Success => {
        info!(
          execution_id = %execution_id,
          duration_ms = result.duration_ms,
          executed = result.executed_node_ids.len(),
          cached = result.cached_node_ids.len(),
          skipped = result.skipped_node_ids.len(),
          "workflow_completed"
        );
        self.notifier.notify(ExecutionEvent::WorkflowCompleted {
          execution_id,
          duration_ms: result.duration_ms,
        });
      }
      RunStatus::Aborted => {
        warn!(execution_id = %execution_id, "workflow_aborted");
        self.notifier.notify(ExecutionEvent::WorkflowAborted { execution_id });
      }
      _ => {
        let message = result.error.clone().unwrap_or_default();
        error!(execution_id = %execution_id, error = %message, "workflow_failed");
        self.notifier.notify(ExecutionEvent::WorkflowFailed {
          execution_id,
          error: message,
        });
      }
    }

    result
  }

  /// A failed result for a run that never started.
  fn reject(
    &self,
    context: &Mutex<ExecutionContext>,
    strategy: ExecutionStrategy,
    error: ExecutionError,
  ) -> ExecutionResult {
    let mut ctx = lock(context);
    ctx.start();
    ctx.finish(RunStatus::Error);
    ctx.sweep_pending();
    ExecutionResult::from_context(&ctx, strategy, Some(error.to_string()))
  }

  /// Pause the active run at its next checkpoint. No-op without one.
  pub fn pause(&self) {
    if let Some(run) = lock(&self.active).as_ref() {
      run.control.pause();
      lock(&run.context).set_paused(true);
      info!("workflow_paused");
    }
  }

  pub fn resume(&self) {
    if let Some(run) = lock(&self.active).as_ref() {
      lock(&run.context).set_paused(false);
      run.control.resume();
      info!("workflow_resumed");
    }
  }

  /// Stop the active run. A paused run wakes and aborts.
  pub fn stop(&self) {
    if let Some(run) = lock(&self.active).as_ref() {
      run.control.stop();
      info!("workflow_stop_requested");
    }
  }

  pub fn is_running(&self) -> bool {
    lock(&self.active).is_some()
  }

  /// Snapshot of the active run, if any.
  pub fn state(&self) -> Option<ExecutionSnapshot> {
    lock(&self.active)
      .as_ref()
      .map(|run| lock(&run.context).snapshot())
  }

  pub fn cache_store(&self) -> &Arc<CacheStore> {
    &self.cache
  }

  pub fn cached_result(&self, workflow_id: &str, node_id: &str) -> Option<CachedNodeResult> {
    self.cache.get(workflow_id, node_id)
  }

  pub fn clear_cache(&self, workflow_id: &str) {
    self.cache.clear_workflow(workflow_id);
  }

  pub fn clear_all_caches(&self) {
    self.cache.clear_all();
  }

  pub fn cache_stats(&self, workflow_id: &str) -> CacheStats {
    self.cache.stats(workflow_id)
  }
}
