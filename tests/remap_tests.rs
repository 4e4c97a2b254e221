//! Remap engine: copy, verify by count, and only then drop the source.

mod common;

use std::time::Duration;

use common::FakeDomain;
use domainsync::error::StepError;
use domainsync::execution::StepStatus;
use domainsync::remap::{backoff_delay, counts_converged, RemapOperation};
use serde_json::{json, Map, Value};
use tokio::time::Instant;

fn keyword_mapping() -> Map<String, Value> {
    json!({ "properties": { "a": { "type": "keyword" } } })
        .as_object()
        .cloned()
        .unwrap()
}

// ============================================================================
// Empty source
// ============================================================================

#[tokio::test]
async fn absent_source_is_created_directly_with_mapping() {
    let api = FakeDomain::new();
    let op = RemapOperation::new("logs").with_mappings(keyword_mapping());

    let res = op.run(&api).await;

    assert_eq!(res, Ok(StepStatus::Applied));
    assert!(api.has_index("logs"));
    assert_eq!(api.mapping_of("logs"), Some(keyword_mapping()));
    assert_eq!(api.count_calls("reindex"), 0);
    assert_eq!(api.count_calls("delete_index"), 0);
}

#[tokio::test]
async fn empty_existing_index_is_left_in_place() {
    let api = FakeDomain::new().with_index("logs", 0);
    let op = RemapOperation::new("logs").with_mappings(keyword_mapping());

    let res = op.run(&api).await;

    assert_eq!(res, Ok(StepStatus::AlreadySatisfied));
    assert_eq!(api.count_calls("create_index"), 0);
    assert_eq!(api.count_calls("delete_index"), 0);
    assert!(api.has_index("logs"));
    // the live index keeps whatever mapping it had
    assert_eq!(api.mapping_of("logs"), None);
}

#[tokio::test]
async fn source_count_failure_touches_nothing() {
    let api = FakeDomain::new().with_index("logs", 10).failing("count");
    let res = RemapOperation::new("logs").to("logs_temporary").run(&api).await;

    assert!(matches!(res, Err(StepError::Lookup(_))));
    assert_eq!(api.count_calls("create_index"), 0);
    assert!(api.has_index("logs"));
}

// ============================================================================
// Copy and verify
// ============================================================================

#[tokio::test(start_paused = true)]
async fn converges_on_third_poll_and_drops_source() {
    let api = FakeDomain::new().with_index("logs", 100).with_reindex_lag(2);
    let op = RemapOperation::new("logs")
        .to("logs_temporary")
        .with_backoff_unit(Duration::from_secs(1));

    let started = Instant::now();
    let res = op.run(&api).await;

    assert_eq!(res, Ok(StepStatus::Applied));
    assert_eq!(api.count_calls("count:logs_temporary"), 3);
    // waits after attempts 1 and 2 only
    assert_eq!(started.elapsed(), Duration::from_secs(1 + 4));
    assert!(!api.has_index("logs"));
    assert_eq!(api.docs("logs_temporary"), Some(100));
}

#[tokio::test(start_paused = true)]
async fn non_converged_copy_keeps_source() {
    let api = FakeDomain::new().with_index("logs", 100).stalled();
    let op = RemapOperation::new("logs")
        .to("logs_temporary")
        .with_retry_budget(4)
        .with_backoff_unit(Duration::from_secs(1));

    let started = Instant::now();
    let res = op.run(&api).await;

    match res {
        Err(StepError::NotConverged {
            attempts,
            expected,
            observed,
            ..
        }) => {
            assert_eq!(attempts, 4);
            assert_eq!(expected, 100);
            assert_eq!(observed, Some(50));
        }
        other => panic!("expected NotConverged, got {other:?}"),
    }
    assert_eq!(api.count_calls("count:logs_temporary"), 4);
    assert_eq!(api.count_calls("delete_index"), 0);
    assert_eq!(api.docs("logs"), Some(100));
    assert_eq!(started.elapsed(), Duration::from_secs(1 + 4 + 9));
}

#[tokio::test]
async fn create_failure_aborts_before_copy() {
    let api = FakeDomain::new().with_index("logs", 10).failing("create_index");
    let res = RemapOperation::new("logs").to("logs_temporary").run(&api).await;

    assert!(matches!(res, Err(StepError::Remote(_))));
    assert_eq!(api.count_calls("reindex"), 0);
    assert_eq!(api.count_calls("count:logs_temporary"), 0);
    assert_eq!(api.docs("logs"), Some(10));
}

#[tokio::test]
async fn reindex_failure_aborts_before_polling() {
    let api = FakeDomain::new().with_index("logs", 10).failing("reindex");
    let res = RemapOperation::new("logs").to("logs_temporary").run(&api).await;

    assert!(matches!(res, Err(StepError::Remote(_))));
    assert_eq!(api.count_calls("count:logs_temporary"), 0);
    assert_eq!(api.count_calls("delete_index"), 0);
    assert_eq!(api.docs("logs"), Some(10));
}

#[tokio::test]
async fn populated_in_place_remap_is_rejected() {
    let api = FakeDomain::new().with_index("logs", 10);
    let res = RemapOperation::new("logs").run(&api).await;

    assert!(matches!(res, Err(StepError::InvalidRemap(_))));
    assert_eq!(api.count_calls("create_index"), 0);
    assert_eq!(api.docs("logs"), Some(10));
}

#[tokio::test(start_paused = true)]
async fn overshooting_counts_do_not_count_as_converged() {
    let api = FakeDomain::new()
        .with_index("logs", 100)
        .with_scripted_counts("logs", vec![Some(100)])
        .with_scripted_counts("logs_temporary", vec![Some(99), Some(101), Some(100)]);
    let res = RemapOperation::new("logs").to("logs_temporary").run(&api).await;

    assert_eq!(res, Ok(StepStatus::Applied));
    assert_eq!(api.count_calls("count:logs_temporary"), 3);
    assert_eq!(api.count_calls("delete_index:logs"), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_destination_counts_never_delete_source() {
    let api = FakeDomain::new()
        .with_index("logs", 100)
        .with_scripted_counts("logs", vec![Some(100)])
        .with_scripted_counts("logs_temporary", vec![None, Some(0), None]);
    let res = RemapOperation::new("logs")
        .to("logs_temporary")
        .with_retry_budget(3)
        .run(&api)
        .await;

    assert!(matches!(res, Err(StepError::NotConverged { .. })));
    assert_eq!(api.count_calls("delete_index"), 0);
    assert!(api.has_index("logs"));
}

#[tokio::test(start_paused = true)]
async fn delete_failure_after_convergence_is_reported() {
    let api = FakeDomain::new()
        .with_index("logs", 5)
        .failing("delete_index");
    let res = RemapOperation::new("logs").to("logs_temporary").run(&api).await;

    assert!(matches!(res, Err(StepError::Remote(_))));
    assert_eq!(api.docs("logs"), Some(5));
}

// ============================================================================
// Pure helpers
// ============================================================================

#[test]
fn backoff_is_attempt_squared_units() {
    let unit = Duration::from_secs(1);
    let delays: Vec<u64> = (1..=15).map(|x| backoff_delay(x, unit).as_secs()).collect();
    assert_eq!(
        delays,
        vec![1, 4, 9, 16, 25, 36, 49, 64, 81, 100, 121, 144, 169, 196, 225]
    );
}

#[test]
fn backoff_scales_with_unit() {
    assert_eq!(
        backoff_delay(3, Duration::from_millis(10)),
        Duration::from_millis(90)
    );
}

#[test]
fn convergence_requires_equal_nonzero_counts() {
    assert!(counts_converged(100, Some(100)));
    assert!(!counts_converged(100, Some(99)));
    assert!(!counts_converged(100, None));
    assert!(!counts_converged(0, Some(0)));
    assert!(!counts_converged(0, None));
}

#[test]
fn defaults_match_documented_values() {
    let op = RemapOperation::new("logs");
    assert_eq!(op.destination_index, "logs");
    assert_eq!(op.retry_budget, 15);
    assert_eq!(op.poll_filter, "index,docs.count");
    assert!(op.mappings.is_empty());
}
