mod common;

use chrono::Duration as ChronoDuration;
use common::{fenced, init_tracing, noon, passage_json, test_retry};
use devotional_service::jobs::{DailyOutcome, JobError, PassageJob};
use devotional_service::models::Passage;
use devotional_service::services::providers::mock::{MockReply, MockTextProvider};
use devotional_service::services::store::{MemoryStore, StoreError, StoreOp};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn job(store: &Arc<MemoryStore>, provider: &Arc<MockTextProvider>) -> PassageJob {
    PassageJob::new(store.clone(), provider.clone(), test_retry(), 10)
}

fn stored_passage(reference: &str, at: chrono::DateTime<chrono::Utc>) -> Passage {
    Passage {
        id: Uuid::new_v4(),
        verse_reference: reference.to_string(),
        verse_text: "1. texto".to_string(),
        reading_time_estimate: 1,
        created_at: at,
        updated_at: at,
    }
}

#[tokio::test]
async fn existing_passage_short_circuits_without_generation() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let existing = stored_passage("Sofonias 3:17", noon() - ChronoDuration::hours(6));
    let existing_id = existing.id;
    store.seed_passage(existing);
    let provider = Arc::new(MockTextProvider::new(MockReply::text(passage_json(
        "Tiago 1:5",
        "1. texto",
    ))));

    let outcome = job(&store, &provider).run_at(noon()).await.unwrap();

    assert_eq!(outcome, DailyOutcome::AlreadyExists(existing_id));
    assert_eq!(provider.call_count(), 0);
    assert_eq!(store.passages().len(), 1);
}

#[tokio::test]
async fn yesterday_passage_does_not_count_for_today() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    store.seed_passage(stored_passage("Salmos 121:1-2", noon() - ChronoDuration::days(1)));
    let provider = Arc::new(MockTextProvider::new(MockReply::text(passage_json(
        "Josué 1:9",
        "1. Seja forte e corajoso",
    ))));

    let outcome = job(&store, &provider).run_at(noon()).await.unwrap();

    assert!(matches!(outcome, DailyOutcome::Created(_)));
    assert_eq!(provider.call_count(), 1);
    // Recent references feed the prompt.
    assert!(provider.prompts()[0].contains("- Salmos 121:1-2"));
}

#[tokio::test(start_paused = true)]
async fn overload_twice_then_success_waits_increasing_delays() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(MockTextProvider::scripted([
        MockReply::overloaded(),
        MockReply::overloaded(),
        MockReply::text(fenced(&passage_json("Habacuque 3:17-19", "1. Ainda que"))),
    ]));

    let outcome = job(&store, &provider).run_at(noon()).await.unwrap();

    let DailyOutcome::Created(passage) = outcome else {
        panic!("expected a created passage");
    };
    assert_eq!(passage.verse_reference, "Habacuque 3:17-19");

    let calls = provider.calls();
    assert_eq!(calls.len(), 3);
    let first_gap = calls[1].at - calls[0].at;
    let second_gap = calls[2].at - calls[1].at;
    assert!(first_gap >= Duration::from_millis(2000) && first_gap < Duration::from_millis(2100));
    assert!(second_gap >= Duration::from_millis(4000) && second_gap < Duration::from_millis(4100));
    assert!(store.logs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn three_overloads_fail_and_log_three_attempts() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(MockTextProvider::new(MockReply::overloaded()));

    let err = job(&store, &provider).run_at(noon()).await.unwrap_err();

    assert!(matches!(err, JobError::Generation { attempts: 3, .. }));
    assert_eq!(err.status_code().as_u16(), 503);
    assert_eq!(err.details(), Some("The model is currently overloaded"));
    assert_eq!(provider.call_count(), 3);
    assert!(store.passages().is_empty());

    let logs = store.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].job_name, "passage-generate");
    assert_eq!(logs[0].error_details["retry_attempts"], 3);
    assert_eq!(logs[0].error_details["status"], 503);
}

#[tokio::test(start_paused = true)]
async fn network_errors_are_retried() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(MockTextProvider::scripted([
        MockReply::Network("connection reset".to_string()),
        MockReply::text(passage_json("Neemias 8:10", "1. A alegria do Senhor")),
    ]));

    let outcome = job(&store, &provider).run_at(noon()).await.unwrap();

    assert!(matches!(outcome, DailyOutcome::Created(_)));
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn non_overload_status_stops_after_one_attempt() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(MockTextProvider::new(MockReply::Status(
        400,
        "API key not valid".to_string(),
    )));

    let err = job(&store, &provider).run_at(noon()).await.unwrap_err();

    assert_eq!(provider.call_count(), 1);
    assert_eq!(err.status_code().as_u16(), 400);
    assert_eq!(err.details(), Some("API error"));
    assert_eq!(store.logs()[0].error_details["retry_attempts"], 1);
    assert_eq!(
        store.logs()[0].error_details["response_text"],
        "API key not valid"
    );
}

#[tokio::test]
async fn missing_text_body_is_rejected_without_writing() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(MockTextProvider::new(MockReply::text(
        r#"{"verse_reference": "Isaías 43:2"}"#,
    )));

    let err = job(&store, &provider).run_at(noon()).await.unwrap_err();

    assert_eq!(err.to_string(), "Missing passage fields");
    assert_eq!(err.status_code().as_u16(), 502);
    assert!(store.passages().is_empty());

    let logs = store.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].error_details["missing_fields"][0], "verse_text");
}

#[tokio::test]
async fn unparseable_output_is_a_bad_gateway() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(MockTextProvider::new(MockReply::text(
        "Desculpe, não posso ajudar com isso.",
    )));

    let err = job(&store, &provider).run_at(noon()).await.unwrap_err();

    assert_eq!(err.to_string(), "Failed to parse passage generated by AI.");
    assert_eq!(err.status_code().as_u16(), 502);
    assert_eq!(
        store.logs()[0].error_details["raw_response"],
        "Desculpe, não posso ajudar com isso."
    );
}

#[tokio::test]
async fn stored_verse_text_has_no_literal_newlines() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(MockTextProvider::new(MockReply::text(passage_json(
        "Salmos 46:1-3",
        "1. Deus é o nosso refúgio e fortaleza,\n2. socorro bem presente na angústia.\n3. Portanto, não temeremos",
    ))));

    job(&store, &provider).run_at(noon()).await.unwrap();

    let stored = &store.passages()[0];
    assert!(!stored.verse_text.contains('\n'));
    assert_eq!(stored.verse_text.matches("<br>").count(), 2);
    assert_eq!(stored.created_at, noon());
}

#[tokio::test]
async fn second_run_in_the_same_day_reports_existing() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(MockTextProvider::new(MockReply::text(passage_json(
        "Tiago 1:2-4",
        "1. Meus irmãos",
    ))));
    let job = job(&store, &provider);

    let first = job.run_at(noon()).await.unwrap();
    let second = job.run_at(noon() + ChronoDuration::hours(3)).await.unwrap();

    let DailyOutcome::Created(created) = first else {
        panic!("first run should create");
    };
    assert_eq!(second, DailyOutcome::AlreadyExists(created.id));
    assert_eq!(store.passages().len(), 1);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn duplicate_check_failure_aborts_and_logs() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    store.fail(
        StoreOp::FindPassage,
        StoreError {
            message: "permission denied for table passages".to_string(),
            code: Some("42501".to_string()),
            hint: None,
        },
    );
    let provider = Arc::new(MockTextProvider::new(MockReply::text("{}")));

    let err = job(&store, &provider).run_at(noon()).await.unwrap_err();

    assert_eq!(err.to_string(), "Error checking existing passage");
    assert_eq!(err.status_code().as_u16(), 500);
    assert_eq!(provider.call_count(), 0);
    let logs = store.logs();
    assert_eq!(logs[0].error_details["error_code"], "42501");
    assert_eq!(logs[0].error_details["date_check"], "2025-06-14");
}

#[tokio::test]
async fn recent_reference_failure_is_not_fatal() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    store.seed_passage(stored_passage("Rute 1:16", noon() - ChronoDuration::days(3)));
    store.fail(StoreOp::RecentPassages, StoreError::new("timeout"));
    let provider = Arc::new(MockTextProvider::new(MockReply::text(passage_json(
        "Miqueias 6:8",
        "1. Ele te declarou",
    ))));

    let outcome = job(&store, &provider).run_at(noon()).await.unwrap();

    assert!(matches!(outcome, DailyOutcome::Created(_)));
    assert!(!provider.prompts()[0].contains("NÃO SELECIONE"));
    assert!(store.logs().is_empty());
}

#[tokio::test]
async fn insert_failure_is_logged_and_surfaced() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    store.fail(StoreOp::InsertPassage, StoreError::new("disk full"));
    let provider = Arc::new(MockTextProvider::new(MockReply::text(passage_json(
        "Lamentações 3:22-23",
        "1. As misericórdias do Senhor",
    ))));

    let err = job(&store, &provider).run_at(noon()).await.unwrap_err();

    assert_eq!(err.to_string(), "Failed to save passage to database.");
    let logs = store.logs();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].error_details["passage_data"]
        .as_str()
        .unwrap()
        .contains("Lamentações 3:22-23"));
}

#[tokio::test]
async fn log_write_failure_does_not_change_the_response() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    store.fail(StoreOp::InsertPassage, StoreError::new("disk full"));
    store.fail(StoreOp::AppendLog, StoreError::new("log table missing"));
    let provider = Arc::new(MockTextProvider::new(MockReply::text(passage_json(
        "Lamentações 3:22-23",
        "1. As misericórdias do Senhor",
    ))));

    let err = job(&store, &provider).run_at(noon()).await.unwrap_err();

    assert_eq!(err.to_string(), "Failed to save passage to database.");
    assert_eq!(err.status_code().as_u16(), 500);
}
