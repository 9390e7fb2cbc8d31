//! Integration tests over a local filesystem bucket
//!
//! Tests the full end-to-end flow: JSON objects on disk → both flows →
//! partitioned Parquet tables read back through the public API

use arrow::array::{Array, AsArray};
use arrow::datatypes::{Int32Type, Int64Type};
use arrow::record_batch::RecordBatch;
use pretty_assertions::assert_eq;
use serde_json::json;
use star_etl::config::load_config_from_str;
use star_etl::listing::ObjectLister;
use star_etl::output::PartitionedWriter;
use star_etl::pipeline::Pipeline;
use star_etl::storage::ObjectSource;
use star_etl::transform::{
    catalog_dim_schema, creator_dim_schema, play_fact_schema, time_dim_schema, user_dim_schema,
};
use star_etl::types::{tables, DatasetKind};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const THURSDAY_EVENING: i64 = 1_541_106_106_796; // 2018-11-01T21:01:46.796Z
const FRIDAY_MORNING: i64 = 1_541_150_000_000; // 2018-11-02T09:13:20Z

fn write(root: &Path, key: &str, body: &str) {
    let path = root.join(key);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn song(id: &str, title: &str, artist: &str, year: i32) -> String {
    json!({
        "num_songs": 1,
        "artist_id": artist,
        "artist_latitude": 35.14968,
        "artist_longitude": -90.04892,
        "artist_location": "Memphis, TN",
        "artist_name": "Elena",
        "song_id": id,
        "title": title,
        "duration": 241.3971,
        "year": year
    })
    .to_string()
}

fn event(page: &str, ts: i64, user: &str, level: &str, title: Option<&str>) -> String {
    json!({
        "artist": null,
        "auth": "Logged In",
        "firstName": "Lily",
        "gender": "F",
        "itemInSession": 3,
        "lastName": "Koch",
        "length": null,
        "level": level,
        "location": "Chicago-Naperville-Elgin, IL-IN-WI",
        "method": "PUT",
        "page": page,
        "registration": 1_541_048_010_796.0,
        "sessionId": 818,
        "song": title,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0 (X11; Linux x86_64)",
        "userId": user.parse::<i64>().map_or_else(|_| json!(user), |n| json!(n))
    })
    .to_string()
}

/// Two catalog objects and three events: two plays (one matching) and a login
fn seed(root: &Path) {
    write(
        root,
        "song_data/A/A/A/TRAAAAW128F429D538.json",
        &song("SOMZWCG12A8C13C480", "I Didn't Mean To", "ARD7TVE1187B99BFB1", 0),
    );
    write(
        root,
        "song_data/A/A/B/TRAABJL12903CDCF1A.json",
        &song("SOUDSGM12AC9618304", "Insatiable", "ARNTLGG11E2835DDB9", 2004),
    );
    write(
        root,
        "log_data/2018/11/2018-11-01-events.json",
        &[
            event("Login", THURSDAY_EVENING - 60_000, "15", "paid", None),
            event("NextSong", THURSDAY_EVENING, "15", "paid", Some("Insatiable")),
            event("NextSong", FRIDAY_MORNING, "15", "paid", Some("Sehr kosmisch")),
        ]
        .join("\n"),
    );
    write(root, "log_data/README.md", "not an event file");
}

/// Pipeline over `<dir>/udacity-dend` writing to `<dir>/analytics`
fn pipeline_in(dir: &Path, extra_yaml: &str) -> (Pipeline, PartitionedWriter) {
    let source = dir.join("udacity-dend");
    let output = dir.join("analytics");
    fs::create_dir_all(&source).unwrap();

    let yaml = format!(
        r#"
catalog: {{ url: "{src}", prefix: "song_data" }}
events: {{ url: "{src}", prefix: "log_data" }}
output: {{ url: "{out}" }}
parquet: {{ compression: zstd }}
{extra_yaml}
"#,
        src = source.display(),
        out = output.display()
    );
    let pipeline = Pipeline::new(load_config_from_str(&yaml).unwrap()).unwrap();
    let reader = PartitionedWriter::parse(output.to_str().unwrap()).unwrap();

    (pipeline, reader)
}

fn setup() -> (TempDir, Pipeline, PartitionedWriter) {
    let dir = tempdir().unwrap();
    seed(&dir.path().join("udacity-dend"));
    let (pipeline, reader) = pipeline_in(dir.path(), "");

    (dir, pipeline, reader)
}

fn rows(batches: &[RecordBatch]) -> usize {
    batches.iter().map(RecordBatch::num_rows).sum()
}

// ============================================================================
// End-to-End Tests
// ============================================================================

#[tokio::test]
async fn test_end_to_end_star_schema() {
    let (dir, pipeline, reader) = setup();
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.catalog.objects_read, 2);
    assert_eq!(summary.events.objects_read, 1);
    assert_eq!(summary.events.unmatched_plays, 1);

    let songs = reader
        .read_table(tables::SONGS, &catalog_dim_schema())
        .await
        .unwrap();
    assert_eq!(rows(&songs), 2);

    let artists = reader
        .read_table(tables::ARTISTS, &creator_dim_schema())
        .await
        .unwrap();
    assert_eq!(rows(&artists), 2);

    let users = reader
        .read_table(tables::USERS, &user_dim_schema())
        .await
        .unwrap();
    assert_eq!(rows(&users), 1);
    assert_eq!(users[0].column(0).as_string::<i32>().value(0), "15");

    let plays = reader
        .read_table(tables::SONGPLAYS, &play_fact_schema())
        .await
        .unwrap();
    assert_eq!(rows(&plays), 1);
    assert_eq!(plays[0].column(4).as_string::<i32>().value(0), "SOUDSGM12AC9618304");
    assert_eq!(plays[0].column(5).as_string::<i32>().value(0), "ARNTLGG11E2835DDB9");
    assert_eq!(plays[0].column(6).as_primitive::<Int64Type>().value(0), 818);

    let out = dir.path().join("analytics");
    assert!(out
        .join("songs/year=2004/creator_id=ARNTLGG11E2835DDB9")
        .is_dir());
    assert!(out.join("songs/year=0/creator_id=ARD7TVE1187B99BFB1").is_dir());
    assert!(out.join("songplays/year=2018/month=11").is_dir());
    assert!(out.join("artists/_SUCCESS").is_file());
}

#[tokio::test]
async fn test_time_dimension_fields() {
    let (_dir, pipeline, reader) = setup();
    pipeline.run().await.unwrap();

    let time = reader
        .read_table(tables::TIME, &time_dim_schema())
        .await
        .unwrap();
    assert_eq!(rows(&time), 2);

    let mut fields = Vec::new();
    for batch in &time {
        for row in 0..batch.num_rows() {
            let int = |idx: usize| batch.column(idx).as_primitive::<Int32Type>().value(row);
            fields.push((int(1), int(2), int(3), int(4), int(5), int(6)));
        }
    }
    fields.sort_unstable();

    // (hour, day, week, month, year, weekday) with weekday 1 = Sunday
    assert_eq!(
        fields,
        vec![(9, 2, 44, 11, 2018, 6), (21, 1, 44, 11, 2018, 5)]
    );
}

#[tokio::test]
async fn test_rerun_replaces_tables() {
    let (dir, pipeline, reader) = setup();
    pipeline.run().await.unwrap();
    pipeline.run().await.unwrap();

    let plays = reader
        .read_table(tables::SONGPLAYS, &play_fact_schema())
        .await
        .unwrap();
    assert_eq!(rows(&plays), 1);
    assert!(!plays[0].column(0).is_null(0));

    let files: Vec<_> = fs::read_dir(dir.path().join("analytics/songplays/year=2018/month=11"))
        .unwrap()
        .collect();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_separate_flows() {
    let (_dir, pipeline, reader) = setup();

    assert!(pipeline.run_event_flow().await.is_err());
    pipeline.run_catalog_flow().await.unwrap();
    let events = pipeline.run_event_flow().await.unwrap();

    assert_eq!(events.rows_written(tables::SONGPLAYS), Some(1));
    assert!(reader.is_committed(tables::SONGPLAYS).await.unwrap());
}

#[tokio::test]
async fn test_empty_creator_id_survives_join() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("udacity-dend");
    write(
        &source,
        "song_data/A/A/A/TRAAAAA.json",
        &song("SOEMPTY12AB0182B3F", "Unknown Artist Song", "", 2000),
    );
    write(
        &source,
        "log_data/2018/11/2018-11-01-events.json",
        &event("NextSong", THURSDAY_EVENING, "15", "paid", Some("Unknown Artist Song")),
    );
    let (pipeline, reader) = pipeline_in(dir.path(), "");

    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.events.rows_written(tables::SONGPLAYS), Some(1));
    assert!(dir
        .path()
        .join("analytics/songs/year=2000/creator_id=")
        .is_dir());

    let songs = reader
        .read_table(tables::SONGS, &catalog_dim_schema())
        .await
        .unwrap();
    assert_eq!(rows(&songs), 1);
    assert_eq!(songs[0].column(2).as_string::<i32>().value(0), "");

    let plays = reader
        .read_table(tables::SONGPLAYS, &play_fact_schema())
        .await
        .unwrap();
    assert_eq!(plays[0].column(4).as_string::<i32>().value(0), "SOEMPTY12AB0182B3F");
    assert_eq!(plays[0].column(5).as_string::<i32>().value(0), "");
}

// ============================================================================
// Listing Tests
// ============================================================================

#[tokio::test]
async fn test_lister_over_local_bucket() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    let source = ObjectSource::parse(dir.path().to_str().unwrap()).unwrap();

    let events = ObjectLister::new(&source, "log_data").collect().await.unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].key.ends_with("2018-11-01-events.json"));

    let songs = ObjectLister::new(&source, "song_data").collect().await.unwrap();
    assert_eq!(songs.len(), 2);
}

#[tokio::test]
async fn test_local_catalog_spans_many_pages() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("udacity-dend");
    for i in 0..60 {
        write(
            &source,
            &format!("song_data/{}/{}/TR{i:04}.json", i % 4, i % 5),
            &song(&format!("SO{i:04}"), &format!("Song {i}"), "ARD7TVE1187B99BFB1", 1990),
        );
    }
    let (pipeline, reader) = pipeline_in(dir.path(), "listing: { page_size: 7 }");

    let listed = pipeline.list(DatasetKind::Catalog).await.unwrap();
    let unique: HashSet<_> = listed.iter().collect();
    assert_eq!(listed.len(), 60);
    assert_eq!(unique.len(), 60);

    let stats = pipeline.run_catalog_flow().await.unwrap();
    assert_eq!(stats.objects_read, 60);
    assert_eq!(stats.records_kept, 60);

    let songs = reader
        .read_table(tables::SONGS, &catalog_dim_schema())
        .await
        .unwrap();
    assert_eq!(rows(&songs), 60);
}
