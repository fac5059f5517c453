mod common;
use crate::common::init_tracing;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use taskdag::{RunOptions, TaskDagError};
use taskdag_test_utils::actions;
use taskdag_test_utils::builders::GraphBuilder;

#[tokio::test]
async fn cancellation_aborts_the_run_and_reaches_in_flight_actions() {
    init_tracing();

    let observed: Vec<Arc<AtomicBool>> = (0..3).map(|_| Arc::new(AtomicBool::new(false))).collect();

    let mut builder = GraphBuilder::new();
    for (i, flag) in observed.iter().enumerate() {
        builder = builder.task(
            &format!("slow{i}"),
            0,
            actions::cancellable_sleep(Duration::from_millis(500), flag),
        );
    }
    let (mut graph, _ids) = builder.build();

    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let err = timeout(
        Duration::from_secs(2),
        graph.execute(RunOptions::new(3), cancel),
    )
    .await
    .expect("cancelled run must not hang")
    .expect_err("cancelled run must not report success");

    assert!(matches!(err, TaskDagError::Cancelled), "got {err:?}");
    assert!(
        observed.iter().any(|f| f.load(Ordering::SeqCst)),
        "at least one in-flight action must observe the token"
    );

    canceller.await.unwrap();
}

#[tokio::test]
async fn pre_cancelled_token_schedules_nothing() {
    init_tracing();

    let log = actions::new_log();
    let (mut graph, _ids) = GraphBuilder::new()
        .task("never", 0, actions::recording("never", &log))
        .build();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = graph
        .execute(RunOptions::new(1), cancel)
        .await
        .expect_err("run with a cancelled token must fail");
    assert!(matches!(err, TaskDagError::Cancelled));
    assert!(actions::log_contents(&log).is_empty());
}
