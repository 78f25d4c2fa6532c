//! Ingestion against wrapped memory stores

use pretty_assertions::assert_eq;
use std::sync::Arc;
use subledger_core::{
    ErrorClass, IngestError, IngestResponse, SubscriptionIngestion, SubscriptionPayload,
};
use subledger_store::{MemoryStore, WritePolicy};
use subledger_test_utils::{ada, payload, CountingConnector, FailAt, FailingConnector};

#[tokio::test]
async fn missing_email_opens_no_connection() {
    let connector = CountingConnector::new(Arc::new(MemoryStore::upsert()));
    let ingestion = SubscriptionIngestion::new(Arc::new(connector.clone()));

    let err = ingestion
        .ingest(&payload("x", "", "y"), "")
        .await
        .unwrap_err();

    assert_eq!(err, IngestError::MissingField("email"));
    assert_eq!(err.class(), ErrorClass::Client);
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn malformed_body_opens_no_connection() {
    let connector = CountingConnector::new(Arc::new(MemoryStore::upsert()));
    let ingestion = SubscriptionIngestion::new(Arc::new(connector.clone()));

    let err = ingestion.ingest_json("\"just a string\"", "").await.unwrap_err();

    assert!(matches!(err, IngestError::MalformedPayload(_)));
    assert_eq!(err.class(), ErrorClass::Client);
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn ada_is_stored_normalized() {
    let store = MemoryStore::upsert();
    let ingestion = SubscriptionIngestion::new(Arc::new(store.clone()));

    ingestion.ingest(&ada(), "203.0.113.7").await.unwrap();

    let rows = store.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Ada");
    assert_eq!(rows[0].email, "ada@ex.com");
    assert_eq!(rows[0].source, "blog");
    assert_eq!(rows[0].company, "");
}

#[tokio::test]
async fn upsert_store_holds_second_submission() {
    let store = MemoryStore::upsert();
    let ingestion = SubscriptionIngestion::new(Arc::new(store.clone()));

    ingestion.ingest(&ada(), "").await.unwrap();
    let second = SubscriptionPayload::new("Ada Lovelace", "ada@ex.com ", "newsletter")
        .with_company("Analytical Engines");
    ingestion.ingest(&second, "198.51.100.4").await.unwrap();

    let rows = store.rows();
    assert_eq!(rows.len(), 1);
    let expected = second.normalize("198.51.100.4").unwrap();
    assert_eq!(rows[0].name, expected.name);
    assert_eq!(rows[0].company, expected.company);
    assert_eq!(rows[0].email, expected.email);
    assert_eq!(rows[0].source, expected.source);
    assert_eq!(rows[0].origin_address, expected.origin_address);
}

#[tokio::test]
async fn append_only_store_holds_both_submissions() {
    let store = MemoryStore::append_only();
    let ingestion = SubscriptionIngestion::new(Arc::new(store.clone()));

    ingestion.ingest(&ada(), "").await.unwrap();
    ingestion.ingest(&ada(), "").await.unwrap();

    assert_eq!(ingestion.write_policy(), WritePolicy::AppendOnly);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn connect_failure_is_store_unavailable() {
    let ingestion = SubscriptionIngestion::new(Arc::new(FailingConnector::new(FailAt::Connect)));

    let result = ingestion.ingest(&ada(), "").await;

    assert_eq!(result, Err(IngestError::StoreUnavailable));
    let response = IngestResponse::from_result(&result);
    assert_eq!(
        response.error.as_deref(),
        Some("An error occurred while processing your subscription")
    );
}

#[tokio::test]
async fn write_failure_still_closes_connection() {
    let connector = FailingConnector::new(FailAt::Write);
    let ingestion = SubscriptionIngestion::new(Arc::new(connector.clone()));

    let err = ingestion.ingest(&ada(), "").await.unwrap_err();

    assert_eq!(err, IngestError::StoreUnavailable);
    assert_eq!(err.class(), ErrorClass::Server);
    assert_eq!(connector.closes(), 1);
    assert!(connector.store().is_empty());
}

#[tokio::test]
async fn close_failure_does_not_undo_write() {
    let connector = FailingConnector::new(FailAt::Close);
    let ingestion = SubscriptionIngestion::new(Arc::new(connector.clone()));

    let ack = ingestion.ingest(&ada(), "").await.unwrap();

    assert_eq!(ack.policy, WritePolicy::Upsert);
    assert_eq!(connector.store().len(), 1);
    assert_eq!(connector.closes(), 1);
}

#[tokio::test]
async fn every_successful_ingest_opens_and_closes_once() {
    let connector = CountingConnector::new(Arc::new(MemoryStore::append_only()));
    let ingestion = SubscriptionIngestion::new(Arc::new(connector.clone()));

    for i in 0..3 {
        ingestion
            .ingest(&payload("n", &format!("u{i}@ex.com"), "blog"), "")
            .await
            .unwrap();
    }

    assert_eq!(connector.connects(), 3);
    assert_eq!(connector.closes(), 3);
}

#[tokio::test]
async fn concurrent_ingests_share_nothing_but_the_store() {
    let store = MemoryStore::upsert();
    let ingestion = SubscriptionIngestion::new(Arc::new(store.clone()));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let ingestion = ingestion.clone();
            tokio::spawn(async move {
                ingestion
                    .ingest(&payload("n", &format!("u{}@ex.com", i % 4), "blog"), "")
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(store.len(), 4);
}
