mod common;
use crate::common::init_tracing;

use tokio_util::sync::CancellationToken;

use taskdag::{RunOptions, TaskState};
use taskdag_test_utils::actions::{self, log_contents};
use taskdag_test_utils::builders::GraphBuilder;

#[tokio::test]
async fn diamond_runs_join_node_last() {
    init_tracing();

    // A and B are independent; C joins on both.
    let log = actions::new_log();
    let (mut graph, ids) = GraphBuilder::new()
        .task("A", 10, actions::recording("A", &log))
        .task("B", 20, actions::recording("B", &log))
        .task("C", 10, actions::recording("C", &log))
        .after("C", "A")
        .after("C", "B")
        .build();

    graph
        .execute(RunOptions::new(3), CancellationToken::new())
        .await
        .expect("diamond run should succeed");

    for name in ["A", "B", "C"] {
        assert_eq!(graph.node(ids[name]).unwrap().state(), TaskState::Completed);
    }

    let invoked = log_contents(&log);
    assert_eq!(invoked.len(), 3);
    assert_eq!(invoked.last().unwrap(), "C");
}

#[tokio::test]
async fn cap_one_runs_strictly_by_descending_weight() {
    init_tracing();

    let log = actions::new_log();
    let (mut graph, _ids) = GraphBuilder::new()
        .task("low", 1, actions::recording("low", &log))
        .task("high", 3, actions::recording("high", &log))
        .task("mid", 2, actions::recording("mid", &log))
        .build();

    graph
        .execute(RunOptions::new(1), CancellationToken::new())
        .await
        .expect("sequential run should succeed");

    assert_eq!(log_contents(&log), vec!["high", "mid", "low"]);
}

#[tokio::test]
async fn dependent_waits_for_a_held_predecessor() {
    init_tracing();

    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    let log = actions::new_log();
    let gate = Arc::new(Notify::new());
    let (mut graph, ids) = GraphBuilder::new()
        .task("held", 0, actions::gated("held", &log, &gate))
        .task("waiter", 0, actions::recording("waiter", &log))
        .after("waiter", "held")
        .build();

    let run = tokio::spawn(async move {
        graph
            .execute(RunOptions::new(2), CancellationToken::new())
            .await
            .expect("gated run should succeed");
        graph
    });

    // While the predecessor is held open, the dependent must not start.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(log_contents(&log), vec!["held"]);

    gate.notify_one();
    let graph = run.await.unwrap();

    assert_eq!(log_contents(&log), vec!["held", "waiter"]);
    for name in ["held", "waiter"] {
        assert_eq!(graph.node(ids[name]).unwrap().state(), TaskState::Completed);
    }
}

#[tokio::test]
async fn already_terminal_graph_returns_immediately() {
    init_tracing();

    let log = actions::new_log();
    let (mut graph, ids) = GraphBuilder::new()
        .task("only", 0, actions::recording("only", &log))
        .build();

    let cancel = CancellationToken::new();
    graph
        .execute(RunOptions::new(1), cancel.clone())
        .await
        .expect("first run should succeed");

    // Second run: everything is signaled, nothing is invoked again.
    graph
        .execute(RunOptions::new(1), cancel)
        .await
        .expect("no-op run should succeed");

    assert_eq!(log_contents(&log).len(), 1);
    assert_eq!(graph.node(ids["only"]).unwrap().state(), TaskState::Completed);
}

#[tokio::test]
async fn empty_graph_is_a_successful_run() {
    init_tracing();

    let mut graph = taskdag::TaskGraph::new();
    graph
        .execute(RunOptions::new(1), CancellationToken::new())
        .await
        .expect("empty run should succeed");
}
