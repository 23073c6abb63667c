//! End-to-end tests for pipeline runs.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tempfile::TempDir;

use podium::{
    Column, DatasetDefinition, Derivation, ErrorKind, JoinKind, Metric, Pipeline, PipelineConfig,
    QueryEngine, RunState, Schema, Step, Tier, TieredStore, Value, ValueType,
};

/// The sample Olympics data shipped with the repository.
fn sample_data() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

/// Helper to write source files into a fresh directory.
fn write_sources(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for (name, content) in files {
        fs::write(dir.path().join(name), content).expect("Failed to write source");
    }
    dir
}

fn medals_config() -> PipelineConfig {
    let schema = Schema::with_columns(vec![
        Column::required("country", ValueType::String),
        Column::new("gold", ValueType::Integer),
        Column::new("silver", ValueType::Integer),
        Column::new("bronze", ValueType::Integer),
    ]);
    let mut metrics = IndexMap::new();
    metrics.insert("totalGold".to_string(), Metric::sum("gold"));

    PipelineConfig::new(vec![DatasetDefinition::new("medals", "medals.csv", schema)])
        .with_derivations(vec![Derivation::new(
            "gold_total",
            Step::Aggregate {
                input: "medals".to_string(),
                group_by: Vec::new(),
                metrics,
            },
        )])
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_duplicate_medal_rows_are_removed_before_aggregation() {
    let input = write_sources(&[(
        "medals.csv",
        "country,gold,silver,bronze\n\
         USA,39,41,33\n\
         USA,39,41,33\n\
         CHN,38,32,18\n",
    )]);
    let store = TieredStore::in_memory();
    let pipeline = Pipeline::new(medals_config(), store.clone()).unwrap();

    let summary = pipeline.run(input.path()).unwrap();
    assert_eq!(summary.loads[0].rows, 3);
    assert_eq!(summary.cleaning[0].duplicates_removed, 1);
    assert_eq!(summary.cleaning[0].rows_out, 2);

    let cleansed = store
        .read(Tier::Cleansed, "medals", Some(&summary.run_id))
        .unwrap();
    assert_eq!(cleansed.row_count(), 2);

    let total = QueryEngine::new(store).dataset("gold_total").unwrap();
    assert_eq!(total.schema.column_names(), vec!["totalGold"]);
    assert_eq!(total.rows, vec![vec![Value::Integer(77)]]);
}

#[test]
fn test_left_join_leaves_unmatched_medals_null() {
    let input = write_sources(&[
        ("teams.csv", "team,discipline\nUSA,Swimming\nJPN,Judo\n"),
        ("medals.csv", "team,gold\nUSA,1\n"),
    ]);
    let config = PipelineConfig::new(vec![
        DatasetDefinition::new(
            "teams",
            "teams.csv",
            Schema::with_columns(vec![
                Column::required("team", ValueType::String),
                Column::new("discipline", ValueType::String),
            ]),
        ),
        DatasetDefinition::new(
            "medals",
            "medals.csv",
            Schema::with_columns(vec![
                Column::required("team", ValueType::String),
                Column::new("gold", ValueType::Integer),
            ]),
        ),
    ])
    .with_derivations(vec![Derivation::new(
        "teams_medals",
        Step::Join {
            left: "teams".to_string(),
            right: "medals".to_string(),
            on: vec!["team".to_string()],
            right_on: Vec::new(),
            kind: JoinKind::Left,
        },
    )]);

    let store = TieredStore::in_memory();
    Pipeline::new(config, store.clone())
        .unwrap()
        .run(input.path())
        .unwrap();

    let joined = QueryEngine::new(store).dataset("teams_medals").unwrap();
    assert_eq!(joined.schema.column_names(), vec!["team", "discipline", "gold"]);
    assert_eq!(
        joined.rows,
        vec![
            vec![Value::from("USA"), Value::from("Swimming"), Value::Integer(1)],
            vec![Value::from("JPN"), Value::from("Judo"), Value::Null],
        ]
    );
    assert!(!joined.schema.get_column("gold").unwrap().required);
}

// =============================================================================
// Olympics Pipeline Tests
// =============================================================================

#[test]
fn test_olympics_run_over_sample_data() {
    let dir = TempDir::new().unwrap();
    let store = TieredStore::local(dir.path()).unwrap();
    let pipeline = Pipeline::new(PipelineConfig::olympics(), store.clone()).unwrap();

    let summary = pipeline.run(sample_data()).unwrap();
    assert_eq!(summary.loads.len(), 5);
    assert!(summary.loads.iter().all(|l| l.row_errors.is_empty()));
    assert_eq!(summary.confirmed.len(), 15);

    let athletes = summary
        .cleaning
        .iter()
        .find(|r| r.dataset == "athletes")
        .unwrap();
    assert_eq!(athletes.rows_in, 25);
    assert_eq!(athletes.duplicates_removed, 1);
    assert_eq!(athletes.fills_by_column.get("athlete_country"), Some(&1));

    // The raw tier keeps the duplicate exactly as ingested.
    let (raw, source) = store.read_raw("medals", Some(&summary.run_id)).unwrap();
    assert_eq!(raw.row_count(), 21);
    assert_eq!(source.file, "Medals.csv");
    assert_eq!(summary.confirmed["medals"], 20);

    let engine = QueryEngine::new(store.clone());
    assert_eq!(engine.latest_run().unwrap(), summary.run_id);

    let medals = engine.medal_counts_by_country().unwrap();
    assert_eq!(medals.row_count(), 20);
    assert_eq!(
        medals.schema.column_names(),
        vec!["medal_country", "gold", "silver", "bronze", "total"]
    );

    let entries = engine.entries_by_discipline_and_gender().unwrap();
    assert_eq!(entries.row_count(), 24);
    assert_eq!(entries.value(0, "gender"), Some(&Value::from("female")));

    let top = engine.dataset("top_medal_countries").unwrap();
    assert_eq!(top.row_count(), 10);
    assert_eq!(top.value(0, "medal_country"), Some(&Value::from("United States of America")));

    let regions = engine.dataset("athletes_enriched").unwrap();
    let usa = (0..regions.row_count())
        .find(|&i| regions.value(i, "person_name") == Some(&Value::from("BILES Simone")))
        .unwrap();
    assert_eq!(regions.value(usa, "region"), Some(&Value::from("North America")));
    assert_eq!(
        regions.value(usa, "upper_country"),
        Some(&Value::from("UNITED STATES OF AMERICA"))
    );

    let runs = store.runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].state, RunState::Confirmed);
}

#[test]
fn test_athletes_medals_join_keeps_unmatched_athletes() {
    let store = TieredStore::in_memory();
    Pipeline::new(PipelineConfig::olympics(), store.clone())
        .unwrap()
        .run(sample_data())
        .unwrap();

    let joined = QueryEngine::new(store).dataset("athletes_medals").unwrap();
    assert_eq!(joined.row_count(), 24);
    let sudan = (0..joined.row_count())
        .find(|&i| joined.value(i, "athlete_country") == Some(&Value::from("Sudan")))
        .unwrap();
    assert_eq!(joined.value(sudan, "gold"), Some(&Value::Null));
    assert_eq!(joined.value(sudan, "medal_country"), Some(&Value::Null));
}

// =============================================================================
// Failure Handling Tests
// =============================================================================

#[test]
fn test_missing_source_fails_run() {
    let input = write_sources(&[]);
    let store = TieredStore::in_memory();
    let pipeline = Pipeline::new(medals_config(), store.clone()).unwrap();

    let failure = pipeline.run(input.path()).unwrap_err();
    assert_eq!(failure.stage, RunState::Ingesting);
    assert_eq!(failure.kind, ErrorKind::Io);

    let runs = store.runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].state, RunState::Failed);
    assert_eq!(runs[0].failure.as_ref(), Some(&failure));

    let err = QueryEngine::new(store).latest_run().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoCompletedRun);
}

#[test]
fn test_failed_transform_hides_partial_confirmed_output() {
    let input = write_sources(&[("medals.csv", "country,gold,silver,bronze\nUSA,39,41,33\n")]);
    let config = medals_config().with_derivations(vec![Derivation::new(
        "best",
        Step::TopN {
            input: "medals".to_string(),
            column: "platinum".to_string(),
            n: 3,
        },
    )]);
    let store = TieredStore::in_memory();
    let pipeline = Pipeline::new(config, store.clone()).unwrap();

    let failure = pipeline.run(input.path()).unwrap_err();
    assert_eq!(failure.stage, RunState::Transforming);
    assert_eq!(failure.kind, ErrorKind::ColumnNotFound);

    // The certified base dataset was written before the failure...
    assert_eq!(
        store.datasets(Tier::Confirmed, &failure.run_id).unwrap(),
        vec!["medals"]
    );
    // ...but queries never see a run that did not reach Confirmed.
    let err = QueryEngine::new(store.clone()).dataset("medals").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoCompletedRun);

    // A retry is a fresh run; the failed run's history is untouched.
    let history = store.run_history(&failure.run_id).unwrap();
    let retry = Pipeline::new(medals_config(), store.clone())
        .unwrap()
        .run(input.path())
        .unwrap();
    assert_ne!(retry.run_id, failure.run_id);
    assert_eq!(store.run_history(&failure.run_id).unwrap(), history);
    assert_eq!(QueryEngine::new(store).latest_run().unwrap(), retry.run_id);
}

#[test]
fn test_too_many_row_errors_aborts_ingestion() {
    let input = write_sources(&[(
        "medals.csv",
        "country,gold,silver,bronze\nUSA,many,41,33\nCHN,38,lots,18\nJPN,27,14,17\n",
    )]);
    let mut config = medals_config();
    config.loader.max_row_errors = 1;
    let pipeline = Pipeline::new(config, TieredStore::in_memory()).unwrap();

    let failure = pipeline.run(input.path()).unwrap_err();
    assert_eq!(failure.kind, ErrorKind::IngestionAborted);
    assert_eq!(failure.stage, RunState::Ingesting);
}

#[test]
fn test_tolerated_row_errors_are_reported() {
    let input = write_sources(&[(
        "medals.csv",
        "country,gold,silver,bronze\nUSA,many,41,33\nCHN,38,32,18\n",
    )]);
    let pipeline = Pipeline::new(medals_config(), TieredStore::in_memory()).unwrap();

    let summary = pipeline.run(input.path()).unwrap();
    let load = &summary.loads[0];
    assert_eq!(load.rows, 1);
    assert_eq!(load.row_errors.len(), 1);
    assert_eq!(load.row_errors[0].row, 1);
    assert_eq!(load.row_errors[0].column.as_deref(), Some("gold"));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_runs_do_not_collide() {
    let dir = TempDir::new().unwrap();
    let store = TieredStore::local(dir.path()).unwrap();
    let pipeline = Pipeline::new(PipelineConfig::olympics(), store.clone()).unwrap();
    let data = sample_data();

    let summaries: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| pipeline.run(&data)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("run thread panicked"))
            .collect()
    });

    let mut ids: Vec<_> = summaries
        .into_iter()
        .map(|s| s.expect("concurrent run failed").run_id)
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    let runs = store.runs().unwrap();
    assert_eq!(runs.len(), 4);
    assert!(runs.iter().all(|r| r.state == RunState::Confirmed));
    assert_eq!(
        QueryEngine::new(store).latest_run().unwrap(),
        ids.last().cloned().unwrap()
    );
}
