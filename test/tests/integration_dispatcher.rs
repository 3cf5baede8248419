//! Remote calls between cluster members: collection, suspicion, deadlines
//! and cancellation

use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use cohort_node::{CallOptions, DispatchError};
use cohort_shared::{ResponseMode, ResponseOutcome};
use cohort_test::{TestCluster, ECHO, FAIL};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn within(timeout: Duration) -> CallOptions {
    CallOptions::new(ResponseMode::All).with_timeout(timeout)
}

#[tokio::test(start_paused = true)]
async fn call_collects_a_response_from_every_target() {
    init();
    let cluster = TestCluster::new(3);
    cluster.install_view(1, &[0, 1, 2]);

    let targets = cluster.members(&[0, 1, 2]);
    let responses = cluster
        .node(0)
        .call(&targets, ECHO, Bytes::from_static(b"hello"), within(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(responses.len(), 3);
    assert_eq!(responses.members().copied().collect::<Vec<_>>(), targets);
    for (_, outcome) in responses.iter() {
        assert_eq!(outcome, &ResponseOutcome::Value(Bytes::from_static(b"hello")));
    }
    assert_eq!(cluster.node(0).dispatcher().pending_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn handler_failures_are_data() {
    init();
    let cluster = TestCluster::new(2);
    cluster.install_view(1, &[0, 1]);

    let responses = cluster
        .node(0)
        .call(&cluster.members(&[1]), FAIL, Bytes::new(), within(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(
        responses.get(&cluster.member(1)),
        Some(&ResponseOutcome::Failed(format!("refusing {}", cluster.member(0))))
    );
    assert!(responses.first_value().is_none());
}

#[tokio::test(start_paused = true)]
async fn unknown_handler_answers_with_failure() {
    init();
    let cluster = TestCluster::new(2);
    cluster.install_view(1, &[0, 1]);

    let responses = cluster
        .node(0)
        .call(&cluster.members(&[1]), 77, Bytes::new(), within(Duration::from_secs(5)))
        .await
        .unwrap();

    assert!(matches!(
        responses.get(&cluster.member(1)),
        Some(ResponseOutcome::Failed(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn departed_targets_complete_the_call_before_its_deadline() {
    init();
    let cluster = TestCluster::new(4);
    cluster.install_view(1, &[0, 1, 2, 3]);
    // 2 and 3 receive the request but their answers never arrive
    cluster.hub().mute(cluster.member(2));
    cluster.hub().mute(cluster.member(3));

    let timeout = Duration::from_secs(10);
    let start = Instant::now();
    let future = cluster
        .node(0)
        .call_async(&cluster.members(&[1, 2, 3]), ECHO, Bytes::from_static(b"q"), within(timeout))
        .unwrap();
    cluster.settle().await;
    assert!(future.is_pending());

    cluster.install_view_on(&[0, 1], 2, &[0, 1]);
    let responses = future.await.unwrap();

    assert!(Instant::now() - start < timeout);
    assert_eq!(responses.num_received(), 1);
    assert_eq!(responses.num_suspected(), 2);
    assert_eq!(
        responses.get(&cluster.member(1)),
        Some(&ResponseOutcome::Value(Bytes::from_static(b"q")))
    );
    assert_eq!(
        responses.get(&cluster.member(3)),
        Some(&ResponseOutcome::Suspected)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn calls_racing_a_view_change_never_wait_for_the_leaver() {
    init();
    let cluster = TestCluster::new(3);
    cluster.install_view(1, &[0, 1, 2]);
    let leaver = cluster.member(2);
    cluster.hub().mute(leaver);

    let caller = cluster.node(0).clone();
    let targets = cluster.members(&[1, 2]);
    let calls = tokio::spawn(async move {
        let mut futures = Vec::new();
        for _ in 0..200 {
            futures.push(
                caller
                    .call_async(&targets, ECHO, Bytes::new(), within(Duration::from_secs(60)))
                    .unwrap(),
            );
            tokio::task::yield_now().await;
        }
        futures
    });
    tokio::task::yield_now().await;
    cluster.install_view_on(&[0, 1], 2, &[0, 1]);

    for future in calls.await.unwrap() {
        let responses = tokio::time::timeout(Duration::from_secs(5), future.wait())
            .await
            .expect("call kept waiting for a member that left")
            .unwrap();
        assert_eq!(responses.get(&leaver), Some(&ResponseOutcome::Suspected));
    }
    assert_eq!(cluster.node(0).dispatcher().pending_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn silent_targets_time_out_at_the_deadline() {
    init();
    let cluster = TestCluster::new(3);
    cluster.install_view(1, &[0, 1, 2]);
    cluster.hub().mute(cluster.member(1));
    cluster.hub().mute(cluster.member(2));

    let timeout = Duration::from_millis(200);
    let start = Instant::now();
    let responses = cluster
        .node(0)
        .call(&cluster.members(&[1, 2]), ECHO, Bytes::new(), within(timeout))
        .await
        .unwrap();
    let elapsed = Instant::now() - start;

    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + cluster.node(0).config().dispatcher.sweep_interval);
    assert_eq!(responses.len(), 2);
    assert_eq!(responses.num_no_response(), 2);
}

#[tokio::test(start_paused = true)]
async fn first_mode_returns_on_the_first_answer() {
    init();
    let cluster = TestCluster::new(3);
    cluster.install_view(1, &[0, 1, 2]);
    cluster.hub().mute(cluster.member(2));

    let timeout = Duration::from_secs(30);
    let start = Instant::now();
    let responses = cluster
        .node(0)
        .call(
            &cluster.members(&[1, 2]),
            ECHO,
            Bytes::from_static(b"first"),
            CallOptions::new(ResponseMode::First).with_timeout(timeout),
        )
        .await
        .unwrap();

    assert!(Instant::now() - start < timeout);
    let (from, value) = responses.first_value().unwrap();
    assert_eq!(*from, cluster.member(1));
    assert_eq!(value, &Bytes::from_static(b"first"));
    assert_eq!(
        responses.get(&cluster.member(2)),
        Some(&ResponseOutcome::NoResponse)
    );
}

#[tokio::test(start_paused = true)]
async fn majority_mode_ignores_the_minority() {
    init();
    let cluster = TestCluster::new(4);
    cluster.install_view(1, &[0, 1, 2, 3]);
    cluster.hub().mute(cluster.member(3));

    let responses = cluster
        .node(0)
        .call(
            &cluster.members(&[1, 2, 3]),
            ECHO,
            Bytes::new(),
            CallOptions::new(ResponseMode::Majority).with_timeout(Duration::from_secs(30)),
        )
        .await
        .unwrap();

    assert_eq!(responses.num_received(), 2);
    assert_eq!(responses.num_no_response(), 1);
}

#[tokio::test(start_paused = true)]
async fn no_wait_mode_completes_immediately() {
    init();
    let cluster = TestCluster::new(2);
    cluster.install_view(1, &[0, 1]);

    let future = cluster
        .node(0)
        .call_async(
            &cluster.members(&[1]),
            ECHO,
            Bytes::new(),
            CallOptions::new(ResponseMode::NoWait),
        )
        .unwrap();
    assert!(!future.is_pending());

    let responses = future.await.unwrap();
    assert_eq!(responses.num_no_response(), 1);

    // the late answer finds no call and is dropped
    cluster.settle().await;
    assert_eq!(cluster.node(0).dispatcher().pending_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_calls_do_not_interfere() {
    init();
    let cluster = TestCluster::new(2);
    cluster.install_view(1, &[0, 1]);
    let targets = cluster.members(&[1]);

    let first = cluster
        .node(0)
        .call_async(&targets, ECHO, Bytes::from_static(b"one"), within(Duration::from_secs(5)))
        .unwrap();
    let second = cluster
        .node(0)
        .call_async(&targets, ECHO, Bytes::from_static(b"two"), within(Duration::from_secs(5)))
        .unwrap();
    assert_ne!(first.id(), second.id());

    assert!(first.cancel());
    assert!(!first.cancel());
    assert!(second.is_pending());

    let responses = second.await.unwrap();
    assert_eq!(
        responses.get(&cluster.member(1)),
        Some(&ResponseOutcome::Value(Bytes::from_static(b"two")))
    );

    let id = first.id();
    assert_eq!(first.await, Err(DispatchError::Cancelled { id }));
    assert!(!cluster.node(0).dispatcher().cancel(&id));
}

#[tokio::test(start_paused = true)]
async fn cancelling_a_completed_call_is_a_no_op() {
    init();
    let cluster = TestCluster::new(2);
    cluster.install_view(1, &[0, 1]);

    let future = cluster
        .node(0)
        .call_async(&cluster.members(&[1]), ECHO, Bytes::new(), within(Duration::from_secs(5)))
        .unwrap();
    cluster.settle().await;

    assert!(!future.is_pending());
    assert!(!future.cancel());
    assert!(future.await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn joining_member_does_not_disturb_a_call() {
    init();
    let cluster = TestCluster::new(3);
    cluster.install_view(1, &[0, 1]);

    let future = cluster
        .node(0)
        .call_async(&cluster.members(&[1]), ECHO, Bytes::from_static(b"sync"), within(Duration::from_secs(5)))
        .unwrap();
    cluster.install_view(2, &[0, 1, 2]);

    let responses = future.await.unwrap();
    assert_eq!(responses.num_received(), 1);
    assert_eq!(cluster.app(0).views(), vec![1, 2]);
    assert_eq!(cluster.app(2).views(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn abandoned_call_is_swept_after_its_deadline() {
    init();
    let cluster = TestCluster::new(2);
    cluster.install_view(1, &[0, 1]);
    cluster.hub().mute(cluster.member(1));

    let timeout = Duration::from_millis(300);
    let future = cluster
        .node(0)
        .call_async(&cluster.members(&[1]), ECHO, Bytes::new(), within(timeout))
        .unwrap();
    drop(future);
    assert_eq!(cluster.node(0).dispatcher().pending_calls(), 1);

    let sweep = cluster.node(0).config().dispatcher.sweep_interval;
    tokio::time::sleep(timeout + sweep).await;
    assert_eq!(cluster.node(0).dispatcher().pending_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn calls_need_a_view_and_a_target() {
    init();
    let cluster = TestCluster::new(2);

    let early = cluster
        .node(0)
        .call(&cluster.members(&[1]), ECHO, Bytes::new(), CallOptions::default())
        .await;
    assert_eq!(early, Err(DispatchError::NotConnected));

    cluster.install_view(1, &[0, 1]);
    let empty = cluster
        .node(0)
        .call(&[], ECHO, Bytes::new(), CallOptions::default())
        .await;
    assert_eq!(empty, Err(DispatchError::NoTargets));
}
