mod common;
use crate::common::init_tracing;

use tokio_util::sync::CancellationToken;

use taskdag::{RunOptions, TaskState};
use taskdag_test_utils::actions::{self, log_contents};
use taskdag_test_utils::builders::GraphBuilder;

#[tokio::test]
async fn reset_restores_states_and_clears_payloads() {
    init_tracing();

    let log = actions::new_log();
    let (mut graph, ids) = GraphBuilder::new()
        .task("bad", 0, actions::failing("bad", &log, "transient"))
        .task("child", 0, actions::recording("child", &log))
        .after("child", "bad")
        .build();

    graph
        .execute(
            RunOptions::new(2).reset_after_done(true),
            CancellationToken::new(),
        )
        .await
        .expect("run with failures still succeeds");

    for name in ["bad", "child"] {
        let node = graph.node(ids[name]).unwrap();
        assert_eq!(node.state(), TaskState::NotStarted, "{name} restored");
        assert!(node.failure().is_none(), "{name} payload cleared");
    }
}

#[tokio::test]
async fn reset_makes_the_graph_re_runnable() {
    init_tracing();

    let log = actions::new_log();
    let (mut graph, ids) = GraphBuilder::new()
        .task("first", 2, actions::recording("first", &log))
        .task("second", 1, actions::recording("second", &log))
        .after("second", "first")
        .build();

    let options = RunOptions::new(1).reset_after_done(true);
    graph
        .execute(options, CancellationToken::new())
        .await
        .expect("first run");
    graph
        .execute(options, CancellationToken::new())
        .await
        .expect("second run");

    assert_eq!(
        log_contents(&log),
        vec!["first", "second", "first", "second"],
        "both runs execute every node in dependency order"
    );
    for name in ["first", "second"] {
        assert_eq!(graph.node(ids[name]).unwrap().state(), TaskState::NotStarted);
    }
}

#[tokio::test]
async fn without_reset_terminal_states_are_preserved() {
    init_tracing();

    let log = actions::new_log();
    let (mut graph, ids) = GraphBuilder::new()
        .task("bad", 0, actions::failing("bad", &log, "sticky"))
        .task("good", 0, actions::recording("good", &log))
        .build();

    graph
        .execute(RunOptions::new(2), CancellationToken::new())
        .await
        .expect("run");

    let bad = graph.node(ids["bad"]).unwrap();
    assert_eq!(bad.state(), TaskState::Failed);
    assert_eq!(bad.failure().unwrap().to_string(), "sticky");
    assert_eq!(graph.node(ids["good"]).unwrap().state(), TaskState::Completed);
}
