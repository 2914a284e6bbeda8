use std::{path::PathBuf, sync::Arc};

use consequences::{
    compute::{FieldValue, RegionSelector, ResultRecord, DAMAGE_FIELDS, LIFE_LOSS_FIELDS},
    hazards::{BoundingBox, GriddedHazardProvider, HazardEvent, Location, UniformHazardProvider},
    pipeline::Pipeline,
    scenario::{Scenario, ScenarioLoader},
    sink::{JsonLinesSink, MemorySink},
    RunSummary,
};

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

fn scenario_path() -> PathBuf {
    PathBuf::from("scenarios/riverside.yaml")
}

fn load() -> Scenario {
    scenario_loader()
        .load(scenario_path())
        .expect("scenario parses")
}

async fn run_scenario(
    scenario: &Scenario,
    workers: usize,
    life_loss: bool,
) -> (Vec<ResultRecord>, RunSummary) {
    let hazard = scenario.build_hazard().expect("hazard builds");
    let assets = Arc::new(scenario.build_asset_provider().expect("assets build"));
    let settings = scenario
        .compute_settings(None, false, life_loss)
        .expect("settings build");
    let pipeline = Pipeline::new(hazard, settings).with_workers(workers);
    let mut sink = MemorySink::default();
    let summary = pipeline
        .run(assets, RegionSelector::All, &mut sink)
        .await
        .expect("pipeline runs");
    assert!(sink.closed);
    (sink.records, summary)
}

fn text(record: &ResultRecord, field: &str) -> String {
    match record.get(field) {
        Some(FieldValue::Text(value)) => value.clone(),
        other => panic!("field {field} is not text: {other:?}"),
    }
}

#[test]
fn scenario_loader_reads_fixture() {
    let scenario = load();
    assert_eq!(scenario.name, "riverside");
    assert_eq!(scenario.seed, 20240412);
    assert_eq!(scenario.workers, Some(2));
    assert_eq!(scenario.assets.len(), 5);
    assert_eq!(scenario.occupancy_types.len(), 2);
    assert!(scenario.life_loss.is_some());
}

#[tokio::test]
async fn riverside_run_summarizes_every_asset() {
    let scenario = load();
    let (records, summary) = run_scenario(&scenario, 2, true).await;

    assert_eq!(summary.processed, 5);
    assert_eq!(summary.written, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.substitutions, 1);
    assert!(!summary.cancelled);

    let names: Vec<String> = records.iter().map(|r| text(r, "name")).collect();
    assert_eq!(names, ["house-1", "house-2", "shop-1", "barn-1"]);

    let expected: Vec<&str> = DAMAGE_FIELDS
        .iter()
        .chain(LIFE_LOSS_FIELDS.iter())
        .copied()
        .collect();
    for record in &records {
        assert_eq!(record.names().collect::<Vec<_>>(), expected);
        assert_eq!(text(record, "population_period"), "day");
        assert_eq!(text(record, "warning"), "compliance");
    }

    assert_eq!(text(&records[0], "stability"), "collapsed");
    assert_eq!(text(&records[0], "lethality_zone"), "high");
    // masonry: derived velocity 40 / 8 = 5 stays under 6.6
    assert_eq!(text(&records[1], "stability"), "stable");
    assert_eq!(records[1].get("lethality_zone"), Some(&FieldValue::Null));
    assert_eq!(records[1].get("ll_tot"), Some(&FieldValue::Integer(0)));
    // manufactured override lowers the threshold to 20
    assert_eq!(text(&records[3], "stability"), "collapsed");

    assert_eq!(
        records[3].get("occupancy_substituted"),
        Some(&FieldValue::Bool(true))
    );
    assert_eq!(text(&records[3], "occupancy_type"), "RES1");
}

#[tokio::test]
async fn results_do_not_depend_on_worker_count() {
    let scenario = load();
    let (single, _) = run_scenario(&scenario, 1, true).await;
    let (many, _) = run_scenario(&scenario, 8, true).await;
    let (again, _) = run_scenario(&scenario, 3, true).await;
    assert_eq!(single, many);
    assert_eq!(single, again);
}

#[tokio::test]
async fn damage_only_runs_omit_life_loss_fields() {
    let scenario = load();
    let (records, summary) = run_scenario(&scenario, 2, false).await;
    assert_eq!(summary.written, 4);
    for record in &records {
        assert_eq!(record.names().collect::<Vec<_>>(), DAMAGE_FIELDS);
        assert!(record.get("ll_tot").is_none());
    }
}

#[tokio::test]
async fn region_selector_limits_the_stream() {
    let scenario = load();
    let hazard = scenario.build_hazard().unwrap();
    let assets = Arc::new(scenario.build_asset_provider().unwrap());
    let settings = scenario.compute_settings(None, true, false).unwrap();
    let pipeline = Pipeline::new(hazard, settings).with_workers(2);

    let west = BoundingBox::new(0.0, 0.0, 500.0, 500.0).unwrap();
    let mut sink = MemorySink::default();
    let summary = pipeline
        .run(assets, RegionSelector::Within(west), &mut sink)
        .await
        .unwrap();
    assert_eq!(summary.processed, 2);
    let names: Vec<String> = sink.records.iter().map(|r| text(r, "name")).collect();
    assert_eq!(names, ["house-1", "house-2"]);
}

#[tokio::test]
async fn assets_missing_a_required_parameter_are_counted_and_skipped() {
    let scenario = load();
    let grid = GriddedHazardProvider::new(
        Location::new(0.0, 0.0),
        500.0,
        2,
        vec![
            Some(HazardEvent::new().with_velocity(4.0)),
            Some(HazardEvent::depth_event(1.0)),
            None,
            Some(HazardEvent::depth_event(5.0)),
        ],
    )
    .unwrap();
    let assets = Arc::new(scenario.build_asset_provider().unwrap());
    let settings = scenario.compute_settings(None, false, false).unwrap();
    let pipeline = Pipeline::new(Arc::new(grid), settings).with_workers(2);

    let mut sink = MemorySink::default();
    let summary = pipeline
        .run(assets, RegionSelector::All, &mut sink)
        .await
        .unwrap();
    assert_eq!(summary.processed, 5);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.skipped, 1);
    let names: Vec<String> = sink.records.iter().map(|r| text(r, "name")).collect();
    assert_eq!(names, ["shop-1", "barn-1"]);
}

#[tokio::test]
async fn non_finite_hazard_values_fail_assets_not_the_run() {
    let scenario = load();
    let boundary = BoundingBox::new(0.0, 0.0, 1000.0, 1000.0).unwrap();
    let hazard = UniformHazardProvider::new(HazardEvent::depth_event(f64::NAN), boundary);
    let assets = Arc::new(scenario.build_asset_provider().unwrap());
    let settings = scenario.compute_settings(None, false, true).unwrap();
    let pipeline = Pipeline::new(Arc::new(hazard), settings).with_workers(2);

    let mut sink = MemorySink::default();
    let summary = pipeline
        .run(assets, RegionSelector::All, &mut sink)
        .await
        .expect("bad hazard values must not abort the run");
    assert_eq!(summary.processed, 5);
    assert_eq!(summary.failed, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.written, 0);
    assert!(sink.closed);
}

#[tokio::test]
async fn stop_handle_cancels_before_any_asset() {
    let scenario = load();
    let hazard = scenario.build_hazard().unwrap();
    let assets = Arc::new(scenario.build_asset_provider().unwrap());
    let settings = scenario.compute_settings(None, false, true).unwrap();
    let pipeline = Pipeline::new(hazard, settings);
    pipeline
        .stop_handle()
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let mut sink = MemorySink::default();
    let summary = pipeline
        .run(assets, RegionSelector::All, &mut sink)
        .await
        .unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.processed, 0);
    assert!(sink.records.is_empty());
}

#[tokio::test]
async fn json_lines_sink_writes_results_file() {
    let scenario = load();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out").join("riverside.jsonl");

    let hazard = scenario.build_hazard().unwrap();
    let assets = Arc::new(scenario.build_asset_provider().unwrap());
    let settings = scenario.compute_settings(Some(7), false, true).unwrap();
    let mut sink = JsonLinesSink::create(&path).unwrap();
    let summary = Pipeline::new(hazard, settings)
        .with_workers(2)
        .run(assets, RegionSelector::All, &mut sink)
        .await
        .unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len() as u64, summary.written);

    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["name"], "house-1");
    assert_eq!(first["damage_category"], "RES");
    assert!(first["structure_damage"].as_f64().unwrap() > 0.0);
    assert!(first["ll_tot"].is_u64());
}
