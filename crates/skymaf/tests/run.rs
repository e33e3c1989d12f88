//! End-to-end runs through the file-based front end

use std::fs;
use std::path::Path;

use skymaf::{FilePersister, JsonRenderer, Overrides, RunSummary, load_run_config, load_table};
use skymaf_core::{Driver, FailureStage, MafError};
use tempfile::tempdir;

const TABLE: &str = r#"{
  "columns": {
    "airmass": [1.0, 1.2, 1.4, 1.6, 1.8, 2.0],
    "filter": ["r", "g", "r", "g", "r", "r"],
    "fieldRA": [10.0, 50.0, 120.0, 200.0, 280.0, 340.0],
    "fieldDec": [-60.0, -30.0, 0.0, 10.0, 45.0, 80.0]
  }
}"#;

const CONFIG: &str = r#"run_name: test run
groups:
  - slicer:
      one_d:
        column: airmass
        bins: 2
    constraints: ["filter = 'r'", "filter = 'g'"]
    metrics:
      - metric: { stat: count, column: airmass }
        summaries:
          - stat: sum
  - slicer: uni
    metrics:
      - metric: { stat: mean, column: airmass }
        merge: { group: overview, label: mean }
      - metric: { stat: max, column: airmass }
        merge: { group: overview, label: max }
      - metric: { stat: mean, column: seeing }
"#;

fn write_inputs(dir: &Path) {
    fs::write(dir.join("table.json"), TABLE).unwrap();
    fs::write(dir.join("run.yaml"), CONFIG).unwrap();
}

#[test]
fn test_run_writes_artifacts_and_summary() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path());
    let out_dir = dir.path().join("plots");

    let config = Overrides {
        run_name: None,
        out_dir: Some(out_dir.clone()),
    }
    .apply(load_run_config(&dir.path().join("run.yaml")).unwrap());
    let table = load_table(&dir.path().join("table.json")).unwrap();

    let report = Driver::new(config).run(&table, &JsonRenderer, &FilePersister);

    let names: Vec<&str> = report.bundles.iter().map(|b| b.name()).collect();
    assert_eq!(
        names,
        vec![
            "test_run_Count_airmass_filter_r_OneDSlicer",
            "test_run_Count_airmass_filter_g_OneDSlicer",
            "test_run_Mean_airmass_all_UniSlicer",
            "test_run_Max_airmass_all_UniSlicer",
        ]
    );
    assert_eq!(report.bundles[0].summary_values()[0].value, Some(4.0));
    assert_eq!(report.bundles[1].summary_values()[0].value, Some(2.0));

    // The missing column fails its own bundle only
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "test_run_Mean_seeing_all_UniSlicer");
    assert_eq!(report.failures[0].stage, FailureStage::Execute);
    assert_eq!(
        report.failures[0].error,
        MafError::UnknownColumn("seeing".into())
    );

    // Two standalone plots and one merged plot
    assert_eq!(report.artifacts.len(), 3);
    assert!(report.artifacts.iter().all(|p| p.exists()));
    let merged = out_dir.join("test_run_overview.json");
    assert_eq!(report.artifacts[2], merged);

    let plot: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&merged).unwrap()).unwrap();
    let layers = plot["layers"].as_array().unwrap();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0]["label"], "mean");
    assert_eq!(layers[1]["label"], "max");
    assert_eq!(layers[1]["results"]["values"][0], 2.0);

    let summary_path = RunSummary::from_report("test run", &report)
        .write(&out_dir)
        .unwrap();
    let summary = fs::read_to_string(summary_path).unwrap();
    assert!(summary.contains("test_run_Count_airmass_filter_r_OneDSlicer"));
    assert!(summary.contains("unknown column `seeing`"));
}

#[test]
fn test_partitions_shared_across_metrics() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path());
    let mut config = load_run_config(&dir.path().join("run.yaml")).unwrap();
    config.groups.truncate(1);
    let extra = config.groups[0].metrics[0].clone();
    config.groups[0].metrics.push(extra);
    let table = load_table(&dir.path().join("table.json")).unwrap();

    let report = Driver::new(config).execute(&table);
    assert!(report.is_success());
    assert_eq!(report.bundles.len(), 4);
    assert_eq!(report.partition_setups, 2);
    assert_eq!(
        report.bundles[1].name(),
        "test_run_Count_airmass_filter_r_OneDSlicer_2"
    );
}

#[test]
fn test_bad_inputs_are_reported() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("bad.yaml");
    fs::write(&config_path, "run_name: x\ngroups: [{ slicer: hexagons, metrics: [] }]\n").unwrap();
    assert!(load_run_config(&config_path).is_err());
    assert!(load_run_config(&dir.path().join("missing.yaml")).is_err());

    let table_path = dir.path().join("bad.json");
    fs::write(&table_path, r#"{"columns": {"a": [1, 2], "b": ["r"]}}"#).unwrap();
    let err = load_table(&table_path).unwrap_err();
    assert!(format!("{err}").contains("bad.json"), "{err}");
}
