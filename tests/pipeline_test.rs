//! Full pipeline runs against filesystem storage: write, list, read back.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array};

use datastd::config::Config;
use datastd::dataset::RawDataset;
use datastd::pipeline::{IngestPipeline, Pipeline};
use datastd::storage::{read_dataset, DatastreamStorage, FilesystemStorage};
use datastd::units::UnitRegistry;

const CONFIG: &str = r#"
pipeline:
  type: Ingest
  location_id: buoy
  instrument_id: gill
dataset:
  attrs:
    title: Wind ingest
  coords:
    time:
      dtype: datetime
      dims: [time]
      attrs:
        units: "Seconds since 1970-01-01 00:00:00"
  data_vars:
    wind_speed:
      dtype: float
      dims: [time]
      attrs:
        units: m/s
        fail_range: [0.0, 60.0]
    station_elevation:
      dtype: double
      dims: []
      data: 2.5
      attrs:
        units: m
"#;

fn make_pipeline(root: &std::path::Path) -> IngestPipeline<FilesystemStorage> {
    let units = UnitRegistry::standard();
    let config = Config::from_yaml_str(CONFIG, &units).expect("config should load");
    let storage = FilesystemStorage::new(root).expect("storage root");
    IngestPipeline::new(config, storage)
}

fn raw_input() -> RawDataset {
    let mut raw = RawDataset::new();
    // 2020-09-25T07:00:05Z onward, ten-second cadence.
    let time: ArrayRef = Arc::new(Int64Array::from(vec![1601017205, 1601017215]));
    let speed: ArrayRef = Arc::new(Float64Array::from(vec![4.2, 63.0]));
    raw.insert("time", time);
    raw.insert("wind_speed", speed);
    raw
}

#[test]
fn run_writes_a_grammatical_datastream_file() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = make_pipeline(dir.path());

    let path = pipeline.run(&raw_input()).unwrap();

    assert!(path.is_file());
    let filename = path.file_name().unwrap().to_str().unwrap();
    // The timestamp comes from the data itself, not the wall clock.
    assert_eq!(filename, "buoy.gill.a1.20200925.070005.parquet");
    assert!(path.ends_with("buoy/buoy.gill.a1/buoy.gill.a1.20200925.070005.parquet"));
}

#[test]
fn fetch_lists_stored_files_for_the_datastream() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = make_pipeline(dir.path());
    let storage = FilesystemStorage::new(dir.path()).unwrap();

    assert!(storage.fetch("buoy.gill.a1").unwrap().is_empty());

    let path = pipeline.run(&raw_input()).unwrap();
    let files = storage.fetch("buoy.gill.a1").unwrap();
    assert_eq!(files, vec![path]);
}

#[test]
fn rerunning_the_same_input_overwrites_rather_than_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = make_pipeline(dir.path());
    let storage = FilesystemStorage::new(dir.path()).unwrap();

    let first = pipeline.run(&raw_input()).unwrap();
    let second = pipeline.run(&raw_input()).unwrap();

    assert_eq!(first, second);
    assert_eq!(storage.fetch("buoy.gill.a1").unwrap().len(), 1);
}

#[test]
fn saved_datasets_read_back_identically() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = make_pipeline(dir.path());

    // Reconstruct what run() persisted: standardized plus qc annotation.
    let (mut expected, _) = pipeline.standardize(&raw_input()).unwrap();
    datastd::qc::annotate(&pipeline.config().dataset, &mut expected).unwrap();

    let path = pipeline.run(&raw_input()).unwrap();
    let restored = read_dataset(&path).unwrap();

    assert_eq!(restored.name, "buoy.gill.a1");
    assert_eq!(restored, expected);
}

#[test]
fn scalar_variables_survive_the_column_padding() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = make_pipeline(dir.path());

    let path = pipeline.run(&raw_input()).unwrap();
    let restored = read_dataset(&path).unwrap();

    let elevation = &restored.data_vars["station_elevation"];
    assert!(elevation.dims.is_empty());
    assert_eq!(elevation.len(), 1);
    assert_eq!(elevation.values.null_count(), 0);
}
