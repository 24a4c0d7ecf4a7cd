//! Publisher tests: leadership gating, compaction and splitting on the way
//! out, aggregate send failures, and the partition-marker broadcast.


use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prost::Message;
use uuid::Uuid;

use schedbus::bus::message::{
    CONTROL_MESSAGE, EXPLICIT_PARTITION_PROPERTY, MESSAGE_TYPE_PROPERTY,
};
use schedbus::bus::{BusProducer, MessageId, WireMessage};
use schedbus::config::PublisherConfig;
use schedbus::error::{BusError, Result};
use schedbus::events::{EventSequence, JobEvent, JobEventKind, PartitionMarker};
use schedbus::leader::LeaderToken;
use schedbus::preprocess::GreedyPreprocessor;
use schedbus::publisher::{BusPublisher, Publisher};

use test_harness::{test_metrics, FakeLeaderController, RecordingProducer};

fn publisher(
    producer: Arc<RecordingProducer>,
    num_partitions: usize,
    leader: FakeLeaderController,
    config: PublisherConfig,
) -> BusPublisher<FakeLeaderController, GreedyPreprocessor> {
    BusPublisher::new(
        producer,
        num_partitions,
        config,
        leader,
        GreedyPreprocessor,
        test_metrics(),
    )
}

fn sequence(job_set: &str, job_ids: &[&str]) -> EventSequence {
    let events = job_ids
        .iter()
        .map(|id| JobEvent::new(*id, JobEventKind::Running))
        .collect();
    EventSequence::new("queue-1", job_set).with_events(events)
}

#[tokio::test]
async fn empty_input_is_a_noop_without_touching_token_or_bus() {
    let producer = RecordingProducer::new();
    let leader = FakeLeaderController::new(true);
    let publisher = publisher(producer.clone(), 2, leader.clone(), PublisherConfig::default());

    publisher
        .publish_messages(Vec::new(), &LeaderToken::new())
        .await
        .unwrap();

    assert_eq!(producer.sent_count().await, 0);
    assert_eq!(leader.validations(), 0);
}

#[tokio::test]
async fn invalid_token_publishes_nothing_and_returns_success() {
    let producer = RecordingProducer::new();
    let leader = FakeLeaderController::new(false);
    let publisher = publisher(producer.clone(), 2, leader.clone(), PublisherConfig::default());

    publisher
        .publish_messages(
            vec![sequence("set-a", &["job-1"]), sequence("set-b", &["job-2"])],
            &LeaderToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(producer.sent_count().await, 0);
    assert_eq!(leader.validations(), 1);
}

#[tokio::test]
async fn leader_publishes_one_control_message_per_sequence() {
    let producer = RecordingProducer::new();
    let publisher = publisher(
        producer.clone(),
        2,
        FakeLeaderController::new(true),
        PublisherConfig::default(),
    );

    let input = vec![
        sequence("set-a", &["job-1", "job-2"]),
        sequence("set-b", &["job-3"]),
    ];
    publisher
        .publish_messages(input.clone(), &LeaderToken::new())
        .await
        .unwrap();

    let sent = producer.sent.lock().await;
    assert_eq!(sent.len(), 2);
    for (msg, expected) in sent.iter().zip(&input) {
        assert_eq!(msg.property(MESSAGE_TYPE_PROPERTY), Some(CONTROL_MESSAGE));
        assert_eq!(msg.key(), expected.job_set_name);
        let decoded = EventSequence::decode(msg.payload()).unwrap();
        assert_eq!(&decoded, expected);
    }
}

#[tokio::test]
async fn consecutive_sequences_for_one_job_set_are_compacted() {
    let producer = RecordingProducer::new();
    let publisher = publisher(
        producer.clone(),
        2,
        FakeLeaderController::new(true),
        PublisherConfig::default(),
    );

    publisher
        .publish_messages(
            vec![
                sequence("set-a", &["job-1"]),
                sequence("set-a", &["job-2", "job-3"]),
            ],
            &LeaderToken::new(),
        )
        .await
        .unwrap();

    let sent = producer.sent.lock().await;
    assert_eq!(sent.len(), 1);
    let decoded = EventSequence::decode(sent[0].payload()).unwrap();
    let job_ids: Vec<&str> = decoded.events.iter().map(|e| e.job_id.as_str()).collect();
    assert_eq!(job_ids, vec!["job-1", "job-2", "job-3"]);
}

#[tokio::test]
async fn oversized_sequences_are_split_preserving_event_order() {
    let producer = RecordingProducer::new();
    let input = sequence(
        "set-a",
        &["job-1", "job-2", "job-3", "job-4", "job-5", "job-6"],
    );
    let max_bytes = input.encoded_len() / 2;
    let publisher = publisher(
        producer.clone(),
        2,
        FakeLeaderController::new(true),
        PublisherConfig::default().with_max_message_bytes(max_bytes),
    );

    publisher
        .publish_messages(vec![input.clone()], &LeaderToken::new())
        .await
        .unwrap();

    let sent = producer.sent.lock().await;
    assert!(sent.len() > 1);
    let mut job_ids = Vec::new();
    for msg in sent.iter() {
        assert_eq!(msg.key(), "set-a");
        let decoded = EventSequence::decode(msg.payload()).unwrap();
        assert!(decoded.encoded_len() <= max_bytes);
        job_ids.extend(decoded.events.into_iter().map(|e| e.job_id));
    }
    let expected: Vec<String> = input.events.iter().map(|e| e.job_id.clone()).collect();
    assert_eq!(job_ids, expected);
}

#[tokio::test]
async fn send_failures_surface_as_one_aggregate_error() {
    let producer = RecordingProducer::new();
    producer.fail_after(1);
    let publisher = publisher(
        producer.clone(),
        2,
        FakeLeaderController::new(true),
        PublisherConfig::default(),
    );

    let err = publisher
        .publish_messages(
            vec![
                sequence("set-a", &["job-1"]),
                sequence("set-b", &["job-2"]),
                sequence("set-c", &["job-3"]),
            ],
            &LeaderToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BusError::PublishFailed { failed: 2, total: 3 }
    ));
    // The message that got through is not rolled back.
    assert_eq!(producer.sent_count().await, 1);
}

/// Producer whose sends never resolve.
struct StalledProducer;

#[async_trait]
impl BusProducer for StalledProducer {
    async fn send(&self, _msg: WireMessage) -> Result<MessageId> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn outstanding_sends_fail_after_the_send_timeout() {
    let publisher = BusPublisher::new(
        Arc::new(StalledProducer),
        2,
        PublisherConfig::default().with_send_timeout(Duration::from_millis(50)),
        FakeLeaderController::new(true),
        GreedyPreprocessor,
        test_metrics(),
    );

    let err = publisher
        .publish_messages(vec![sequence("set-a", &["job-1"])], &LeaderToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BusError::SendTimeout(_)));
}

#[tokio::test]
async fn markers_are_broadcast_to_every_partition() {
    let producer = RecordingProducer::new();
    let publisher = publisher(
        producer.clone(),
        3,
        FakeLeaderController::new(true),
        PublisherConfig::default(),
    );

    let group_id = Uuid::new_v4();
    let published = publisher.publish_markers(group_id).await.unwrap();
    assert_eq!(published, 3);

    let sent = producer.sent.lock().await;
    assert_eq!(sent.len(), 3);
    for (partition, msg) in sent.iter().enumerate() {
        assert_eq!(msg.property(MESSAGE_TYPE_PROPERTY), Some(CONTROL_MESSAGE));
        assert_eq!(
            msg.property(EXPLICIT_PARTITION_PROPERTY),
            Some(partition.to_string().as_str())
        );
        let marker = PartitionMarker::decode(msg.payload()).unwrap();
        assert_eq!(marker.group_id, group_id.to_string());
        assert_eq!(marker.partition, partition as u32);
    }
}

#[tokio::test]
async fn marker_broadcast_aborts_on_first_failure() {
    let producer = RecordingProducer::new();
    producer.fail_after(1);
    let publisher = publisher(
        producer.clone(),
        3,
        FakeLeaderController::new(true),
        PublisherConfig::default(),
    );

    assert!(publisher.publish_markers(Uuid::new_v4()).await.is_err());
    assert_eq!(producer.sent_count().await, 1);
}
