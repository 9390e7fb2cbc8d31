//! Tests for decode module

use super::*;
use crate::error::Error;
use crate::listing::{ObjectLister, ObjectLocator};
use crate::storage::{object_path, ObjectSource};
use crate::types::{DatasetKind, MalformedRecordPolicy};
use arrow::array::{Array, Int64Array, StringArray};
use futures::stream;
use object_store::PutPayload;
use pretty_assertions::assert_eq;

const SONG: &str = r#"{"num_songs": 1, "artist_id": "ARJIE2Y1187B994AB7", "artist_latitude": null, "artist_longitude": null, "artist_location": "", "artist_name": "Line Renaud", "song_id": "SOUPIRU12A6D4FA1E1", "title": "Der Kleine Dompfaff", "duration": 152.92036, "year": 0}"#;

const PLAY: &str = r#"{"artist":"Des'ree","auth":"Logged In","firstName":"Kaylee","gender":"F","itemInSession":1,"lastName":"Summers","length":246.30812,"level":"free","location":"Phoenix-Mesa-Scottsdale, AZ","method":"PUT","page":"NextSong","registration":1540344794796.0,"sessionId":139,"song":"You Gotta Be","status":200,"ts":1541106106796,"userAgent":"Mozilla/5.0","userId":"8"}"#;

const LOGIN: &str = r#"{"artist":null,"auth":"Logged In","firstName":"Kaylee","gender":"F","itemInSession":0,"lastName":"Summers","length":null,"level":"free","location":"Phoenix-Mesa-Scottsdale, AZ","method":"GET","page":"Home","registration":1540344794796.0,"sessionId":139,"song":null,"status":200,"ts":1541106106000,"userAgent":"Mozilla/5.0","userId":""}"#;

// ============================================================================
// Record Schema Tests
// ============================================================================

#[test]
fn test_catalog_record_from_source_json() {
    let record: CatalogRecord = serde_json::from_str(SONG).unwrap();
    assert_eq!(record.catalog_id, "SOUPIRU12A6D4FA1E1");
    assert_eq!(record.creator_id, "ARJIE2Y1187B994AB7");
    assert_eq!(record.creator_name.as_deref(), Some("Line Renaud"));
    assert_eq!(record.creator_lat, None);
    assert_eq!(record.year, Some(0));
}

#[test]
fn test_catalog_record_accepts_domain_names() {
    let record: CatalogRecord =
        serde_json::from_str(r#"{"catalog_id": "S1", "title": "Test Song", "creator_id": "A1"}"#)
            .unwrap();
    assert_eq!(record.catalog_id, "S1");
    assert_eq!(record.duration, None);
}

#[test]
fn test_catalog_record_requires_key() {
    let result = serde_json::from_str::<CatalogRecord>(r#"{"title": "No Id", "artist_id": "A1"}"#);
    assert!(result.is_err());
}

#[test]
fn test_event_record_from_source_json() {
    let record: EventRecord = serde_json::from_str(PLAY).unwrap();
    assert!(record.is_play());
    assert_eq!(record.epoch_ms_timestamp, 1_541_106_106_796);
    assert_eq!(record.user_id.as_deref(), Some("8"));
    assert_eq!(record.session_id, Some(139));
    assert_eq!(record.catalog_title.as_deref(), Some("You Gotta Be"));
}

#[test]
fn test_event_record_user_id_normalization() {
    let login: EventRecord = serde_json::from_str(LOGIN).unwrap();
    assert!(!login.is_play());
    assert_eq!(login.user_id, None);
    assert_eq!(login.catalog_title, None);

    let numeric: EventRecord =
        serde_json::from_str(r#"{"page": "NextSong", "ts": 1, "userId": 42}"#).unwrap();
    assert_eq!(numeric.user_id.as_deref(), Some("42"));
}

#[test]
fn test_record_batches() {
    let songs: Vec<CatalogRecord> = vec![serde_json::from_str(SONG).unwrap()];
    let batch = CatalogRecord::to_batch(&songs).unwrap();
    assert_eq!(batch.num_rows(), 1);
    assert_eq!(batch.schema(), CatalogRecord::schema());

    let events: Vec<EventRecord> = vec![
        serde_json::from_str(PLAY).unwrap(),
        serde_json::from_str(LOGIN).unwrap(),
    ];
    let batch = EventRecord::to_batch(&events).unwrap();
    assert_eq!(batch.num_rows(), 2);

    let user_ids = batch
        .column_by_name("user_id")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(user_ids.value(0), "8");
    assert!(user_ids.is_null(1));

    let ts = batch
        .column_by_name("epoch_ms_timestamp")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(ts.value(1), 1_541_106_106_000);
}

// ============================================================================
// JSONL Decoding Tests
// ============================================================================

#[test]
fn test_decode_lines_skips_blank_lines() {
    let body = format!("{PLAY}\n\n  \n{LOGIN}\n");
    let decoded: DecodedObject<EventRecord> =
        decode_lines(body.as_bytes(), "memory://b/e.json", MalformedRecordPolicy::Abort).unwrap();
    assert_eq!(decoded.records.len(), 2);
    assert_eq!(decoded.skipped, 0);
}

#[test]
fn test_decode_lines_abort_reports_line() {
    let body = format!("{PLAY}\n{{not json\n{LOGIN}");
    let err = decode_lines::<EventRecord>(
        body.as_bytes(),
        "memory://b/e.json",
        MalformedRecordPolicy::Abort,
    )
    .unwrap_err();

    match err {
        Error::Parse { location, line, .. } => {
            assert_eq!(location, "memory://b/e.json");
            assert_eq!(line, 2);
        }
        other => panic!("Expected parse error, got {other:?}"),
    }
}

#[test]
fn test_decode_lines_skip_counts() {
    let body = format!("{PLAY}\n{{not json\n{{\"page\": \"NextSong\"}}\n{LOGIN}\n");
    let decoded = decode_lines::<EventRecord>(
        body.as_bytes(),
        "memory://b/e.json",
        MalformedRecordPolicy::Skip,
    )
    .unwrap();
    assert_eq!(decoded.records.len(), 2);
    assert_eq!(decoded.skipped, 2);
}

#[test]
fn test_decode_lines_invalid_utf8_is_malformed() {
    let mut body = PLAY.as_bytes().to_vec();
    body.extend_from_slice(b"\n{\"page\": \"\xff\xfe\"}\n");
    let decoded = decode_lines::<EventRecord>(&body, "e.json", MalformedRecordPolicy::Skip).unwrap();
    assert_eq!(decoded.records.len(), 1);
    assert_eq!(decoded.skipped, 1);
}

// ============================================================================
// Reader Tests
// ============================================================================

async fn put(source: &ObjectSource, key: &str, body: String) {
    source
        .store()
        .put(&object_path(key).unwrap(), PutPayload::from(body))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_read_events_in_listing_order() {
    let source = ObjectSource::in_memory("udacity-dend");
    put(&source, "log_data/2018/11/a.json", format!("{PLAY}\n{LOGIN}\n")).await;
    put(&source, "log_data/2018/11/b.json", format!("{LOGIN}\n")).await;
    put(&source, "log_data/2018/11/c.json", format!("{PLAY}\n")).await;

    let lister = ObjectLister::new(&source, "log_data").with_page_size(2);
    let outcome = RecordReader::new(&source)
        .with_concurrency(3)
        .read_events(lister.locators())
        .await
        .unwrap();

    assert_eq!(outcome.objects, 3);
    assert_eq!(outcome.records.len(), 4);
    let pages: Vec<&str> = outcome.records.iter().map(|r| r.event_type.as_str()).collect();
    assert_eq!(pages, vec!["NextSong", "Home", "Home", "NextSong"]);
}

#[tokio::test]
async fn test_read_catalog_abort_on_malformed() {
    let source = ObjectSource::in_memory("udacity-dend");
    put(&source, "song_data/A/a.json", SONG.to_string()).await;
    put(&source, "song_data/A/b.json", "{\"title\": \"truncated\"".to_string()).await;

    let lister = ObjectLister::new(&source, "song_data");
    let err = RecordReader::new(&source)
        .read_catalog(lister.locators())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Parse { line: 1, .. }));
}

#[tokio::test]
async fn test_read_catalog_skip_policy() {
    let source = ObjectSource::in_memory("udacity-dend");
    put(&source, "song_data/A/a.json", SONG.to_string()).await;
    put(&source, "song_data/A/b.json", "garbage".to_string()).await;

    let lister = ObjectLister::new(&source, "song_data");
    let outcome = RecordReader::new(&source)
        .with_policy(MalformedRecordPolicy::Skip)
        .read_catalog(lister.locators())
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.objects, 2);
    assert_eq!(outcome.skipped_lines, 1);
}

#[tokio::test]
async fn test_read_missing_object_is_retrieval_error() {
    let source = ObjectSource::in_memory("udacity-dend");
    let locators = stream::iter(vec![Ok(ObjectLocator::new(
        "memory",
        "udacity-dend",
        "log_data/gone.json",
    ))]);

    let err = RecordReader::new(&source)
        .read::<EventRecord, _>(DatasetKind::Events, locators)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Retrieval { .. }));
}

#[tokio::test]
async fn test_read_rejects_foreign_bucket() {
    let source = ObjectSource::in_memory("udacity-dend");
    let locators = stream::iter(vec![Ok(ObjectLocator::new("s3", "other", "a.json"))]);

    let err = RecordReader::new(&source)
        .read_events(locators)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("not in bucket"));
}

#[tokio::test]
async fn test_listing_error_propagates_through_reader() {
    let source = ObjectSource::in_memory("udacity-dend");
    let locators = stream::iter(vec![Err(Error::retrieval("s3://x/log_data", "timeout"))]);

    let err = RecordReader::new(&source)
        .read_events(locators)
        .await
        .unwrap_err();

    assert!(err.is_retryable());
}
