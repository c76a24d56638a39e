mod common;

use common::{CountingNode, executor_with, registry_with, started_order, workflow};
use nodeflow_engine::{
  ChannelNotifier, ExecutionOptions, ExecutionStrategy, NodeStatus, RunStatus, SKIP_NOT_SELECTED,
};
use serde_json::json;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_nodes_run_in_topological_order() {
  let counter = CountingNode::default();
  let registry = registry_with(|r| {
    r.register("count", counter.clone());
  });
  let (tx, mut rx) = mpsc::unbounded_channel();
  let executor = executor_with(registry).with_notifier(ChannelNotifier::new(tx));

  // Declared in reverse of their dependency order.
  let wf = workflow(json!({
    "workflowId": "topo",
    "nodes": [
      { "id": "c", "type": "count" },
      { "id": "b", "type": "count" },
      { "id": "a", "type": "count" },
      { "id": "start", "type": "start" }
    ],
    "edges": [
      { "source": "start", "target": "a" },
      { "source": "a", "target": "b" },
      { "source": "b", "target": "c" }
    ]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(result.success, "run failed: {:?}", result.error);
  assert_eq!(result.strategy, ExecutionStrategy::Full);
  assert_eq!(started_order(&mut rx), vec!["start", "a", "b", "c"]);
  assert_eq!(counter.calls(), 3);
}

#[tokio::test]
async fn test_cycle_fails_before_any_node_runs() {
  let counter = CountingNode::default();
  let registry = registry_with(|r| {
    r.register("count", counter.clone());
  });
  let executor = executor_with(registry);

  let wf = workflow(json!({
    "workflowId": "cycle",
    "nodes": [
      { "id": "start", "type": "start" },
      { "id": "a", "type": "count" },
      { "id": "b", "type": "count" }
    ],
    "edges": [
      { "source": "start", "target": "a" },
      { "source": "a", "target": "b" },
      { "source": "b", "target": "a" }
    ]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(!result.success);
  assert_eq!(result.status, RunStatus::Error);
  assert!(result.error.as_deref().unwrap_or_default().contains("cyclic dependency"));
  assert_eq!(counter.calls(), 0);
  assert!(result.executed_node_ids.is_empty());
  assert_eq!(result.skipped_node_ids, vec!["start", "a", "b"]);
}

#[tokio::test]
async fn test_cycle_through_container_member_fails_before_any_node_runs() {
  let counter = CountingNode::default();
  let registry = registry_with(|r| {
    r.register("count", counter.clone());
  });
  let executor = executor_with(registry);

  let wf = workflow(json!({
    "workflowId": "member-cycle",
    "nodes": [
      { "id": "start", "type": "start" },
      { "id": "a", "type": "count" },
      { "id": "body", "type": "group" },
      { "id": "child", "type": "count", "parentNode": "body" }
    ],
    "edges": [
      { "source": "start", "target": "a" },
      { "source": "a", "target": "child" },
      { "source": "child", "target": "a" }
    ]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(!result.success);
  assert_eq!(result.status, RunStatus::Error);
  assert!(result.error.as_deref().unwrap_or_default().contains("cyclic dependency"));
  assert_eq!(counter.calls(), 0);
  assert!(result.executed_node_ids.is_empty());
}

#[tokio::test]
async fn test_selecting_loop_body_member_is_rejected() {
  let counter = CountingNode::default();
  let registry = registry_with(|r| {
    r.register("count", counter.clone());
  });
  let executor = executor_with(registry);
  let wf = workflow(json!({
    "workflowId": "member-selection",
    "selectedNodeIds": ["child"],
    "nodes": [
      { "id": "start", "type": "start" },
      { "id": "each", "type": "for", "data": { "params": { "items": [1], "containerId": "body" } } },
      { "id": "body", "type": "group" },
      { "id": "child", "type": "count", "parentNode": "body" }
    ],
    "edges": [{ "source": "start", "target": "each" }]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(!result.success);
  assert!(
    result
      .error
      .as_deref()
      .unwrap_or_default()
      .contains("inside container 'body'")
  );
  assert_eq!(counter.calls(), 0);
}

#[tokio::test]
async fn test_unreachable_nodes_are_not_selected() {
  let executor = executor_with(registry_with(|_| {}));
  let wf = workflow(json!({
    "workflowId": "reach",
    "nodes": [
      { "id": "start", "type": "start" },
      { "id": "a", "type": "set" },
      { "id": "island", "type": "set" }
    ],
    "edges": [{ "source": "start", "target": "a" }]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(result.success);
  assert_eq!(result.executed_node_ids, vec!["start", "a"]);
  let island = result.node("island").unwrap();
  assert_eq!(island.status, NodeStatus::Skipped);
  assert_eq!(island.skip_reason.as_deref(), Some(SKIP_NOT_SELECTED));
}

#[tokio::test]
async fn test_multiple_start_nodes_union_reachability() {
  let executor = executor_with(registry_with(|_| {}));
  let wf = workflow(json!({
    "workflowId": "multi",
    "nodes": [
      { "id": "s1", "type": "start" },
      { "id": "s2", "type": "set", "data": { "isStart": true } },
      { "id": "a", "type": "set" },
      { "id": "b", "type": "set" }
    ],
    "edges": [
      { "source": "s1", "target": "a" },
      { "source": "s2", "target": "b" }
    ]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(result.success);
  assert_eq!(result.executed_node_ids, vec!["s1", "s2", "a", "b"]);
}

#[tokio::test]
async fn test_zero_start_nodes_executes_nothing() {
  let counter = CountingNode::default();
  let registry = registry_with(|r| {
    r.register("count", counter.clone());
  });
  let executor = executor_with(registry);
  let wf = workflow(json!({
    "workflowId": "no-start",
    "nodes": [
      { "id": "a", "type": "count" },
      { "id": "b", "type": "count" }
    ],
    "edges": [{ "source": "a", "target": "b" }]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(result.success);
  assert_eq!(counter.calls(), 0);
  assert!(result.executed_node_ids.is_empty());
  assert_eq!(result.skipped_node_ids, vec!["a", "b"]);
}

#[tokio::test]
async fn test_single_selection_runs_ancestors_only() {
  let executor = executor_with(registry_with(|_| {}));
  let wf = workflow(json!({
    "workflowId": "single",
    "selectedNodeIds": ["b"],
    "nodes": [
      { "id": "start", "type": "start" },
      { "id": "a", "type": "set" },
      { "id": "b", "type": "set" },
      { "id": "c", "type": "set" }
    ],
    "edges": [
      { "source": "start", "target": "a" },
      { "source": "a", "target": "b" },
      { "source": "b", "target": "c" }
    ]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(result.success);
  assert_eq!(result.strategy, ExecutionStrategy::Single);
  assert_eq!(result.executed_node_ids, vec!["start", "a", "b"]);
  assert_eq!(result.status_of("c"), Some(NodeStatus::Skipped));
}

#[tokio::test]
async fn test_selective_strategy_with_several_nodes() {
  let executor = executor_with(registry_with(|_| {}));
  let wf = workflow(json!({
    "workflowId": "selective",
    "selectedNodeIds": ["a", "x"],
    "nodes": [
      { "id": "start", "type": "start" },
      { "id": "a", "type": "set" },
      { "id": "x", "type": "set" },
      { "id": "y", "type": "set" }
    ],
    "edges": [
      { "source": "start", "target": "a" },
      { "source": "x", "target": "y" }
    ]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert_eq!(result.strategy, ExecutionStrategy::Selective);
  assert_eq!(result.executed_node_ids, vec!["start", "a", "x"]);
  assert_eq!(result.skipped_node_ids, vec!["y"]);
}

#[tokio::test]
async fn test_unknown_node_type_fails_run() {
  let executor = executor_with(registry_with(|_| {}));
  let wf = workflow(json!({
    "workflowId": "unknown",
    "nodes": [
      { "id": "start", "type": "start" },
      { "id": "shot", "type": "screenshot" },
      { "id": "after", "type": "set" }
    ],
    "edges": [
      { "source": "start", "target": "shot" },
      { "source": "shot", "target": "after" }
    ]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(!result.success);
  assert!(result.error.as_deref().unwrap_or_default().contains("no executor found for type 'screenshot'"));
  assert_eq!(result.status_of("shot"), Some(NodeStatus::Error));
  assert_eq!(result.status_of("after"), Some(NodeStatus::Skipped));
}

#[tokio::test]
async fn test_executable_type_overrides_structural_type() {
  let counter = CountingNode::default();
  let registry = registry_with(|r| {
    r.register("count", counter.clone());
  });
  let executor = executor_with(registry);
  let wf = workflow(json!({
    "workflowId": "node-type",
    "nodes": [
      { "id": "start", "type": "start" },
      { "id": "task", "type": "custom", "data": { "nodeType": "count" } }
    ],
    "edges": [{ "source": "start", "target": "task" }]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(result.success);
  assert_eq!(counter.calls(), 1);
}

#[tokio::test]
async fn test_node_timeout_fails_run() {
  let executor = executor_with(registry_with(|_| {}));
  let wf = workflow(json!({
    "workflowId": "timeout",
    "nodes": [
      { "id": "start", "type": "start" },
      { "id": "slow", "type": "wait", "data": { "params": { "ms": 5000 } } }
    ],
    "edges": [{ "source": "start", "target": "slow" }]
  }));
  let options = ExecutionOptions {
    timeout_ms: 20,
    ..ExecutionOptions::default()
  };

  let result = executor.execute(&wf, options).await;

  assert!(!result.success);
  assert!(result.error.as_deref().unwrap_or_default().contains("timed out after 20ms"));
  assert_eq!(result.status_of("slow"), Some(NodeStatus::Error));
}

#[tokio::test]
async fn test_inputs_follow_handles_and_params_override() {
  let executor = executor_with(registry_with(|_| {}));
  let wf = workflow(json!({
    "workflowId": "inputs",
    "nodes": [
      { "id": "start", "type": "start", "data": { "params": { "url": "https://example.com", "depth": 1 } } },
      {
        "id": "page",
        "type": "set",
        "data": { "params": { "title": "{{ start.url }}/about", "depth": "{{ start.depth + 1 }}" } }
      }
    ],
    "edges": [
      { "source": "start", "target": "page", "sourceHandle": "url", "targetHandle": "link" },
      { "source": "start", "target": "page", "sourceHandle": "depth", "targetHandle": "depth" }
    ]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(result.success, "run failed: {:?}", result.error);
  let outputs = result.node("page").unwrap().outputs.clone().unwrap();
  assert_eq!(outputs["link"], json!("https://example.com"));
  assert_eq!(outputs["title"], json!("https://example.com/about"));
  assert_eq!(outputs["depth"], json!(2));
}

#[tokio::test]
async fn test_failure_stops_the_run() {
  let counter = CountingNode::default();
  let registry = registry_with(|r| {
    r.register("count", counter.clone());
    r.register("fail", common::FailOnItem(json!("always")));
  });
  let executor = executor_with(registry);
  let wf = workflow(json!({
    "workflowId": "fail",
    "nodes": [
      { "id": "start", "type": "start" },
      { "id": "broken", "type": "fail", "data": { "params": { "item": "always" } } },
      { "id": "after", "type": "count" }
    ],
    "edges": [
      { "source": "start", "target": "broken" },
      { "source": "broken", "target": "after" }
    ]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(!result.success);
  assert_eq!(result.status, RunStatus::Error);
  assert_eq!(counter.calls(), 0);
  let broken = result.node("broken").unwrap();
  assert_eq!(broken.status, NodeStatus::Error);
  assert!(broken.error.as_deref().unwrap().contains("boom"));
  assert_eq!(result.status_of("after"), Some(NodeStatus::Skipped));
  assert_eq!(result.node_results.len(), 3);
}

#[tokio::test]
async fn test_success_without_end_node() {
  let executor = executor_with(registry_with(|_| {}));
  let wf = workflow(json!({
    "workflowId": "no-end",
    "nodes": [{ "id": "start", "type": "start" }],
    "edges": []
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(result.success);
  assert!(result.finished_at.is_some());
  assert!(!result.execution_id.is_empty());
}

#[tokio::test]
async fn test_dangling_edge_is_structural_error() {
  let executor = executor_with(registry_with(|_| {}));
  let wf = workflow(json!({
    "workflowId": "dangling",
    "nodes": [{ "id": "start", "type": "start" }],
    "edges": [{ "source": "start", "target": "ghost" }]
  }));

  let result = executor.execute(&wf, ExecutionOptions::default()).await;

  assert!(!result.success);
  assert!(result.error.as_deref().unwrap_or_default().contains("ghost"));
  assert_eq!(result.status_of("start"), Some(NodeStatus::Skipped));
}
