//! End-to-end standardization behavior, without touching storage.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Float32Type, Int32Type, TimeUnit};

use datastd::config::Config;
use datastd::dataset::RawDataset;
use datastd::error::{DataError, PipelineError};
use datastd::pipeline::IngestPipeline;
use datastd::qc;
use datastd::storage::FilesystemStorage;
use datastd::units::UnitRegistry;

const CONFIG: &str = r#"
pipeline:
  type: Ingest
  location_id: buoy
  instrument_id: imu
  qualifier: z06
dataset:
  attrs:
    title: IMU motion ingest
    description: Pitch and roll from the buoy-mounted IMU.
  coords:
    time:
      dtype: datetime
      dims: [time]
      attrs:
        units: "Seconds since 1970-01-01 00:00:00"
        long_name: Time
  data_vars:
    pitch:
      dtype: float
      dims: [time]
      attrs:
        units: degree
        long_name: Pitch
        valid_range: [-180.0, 180.0]
        fail_range: [-45.0, 45.0]
    roll:
      dtype: float
      dims: [time]
      attrs:
        units: degree
        long_name: Roll
    latitude:
      dtype: double
      dims: []
      data: 46.20
      attrs:
        units: degree
        long_name: Latitude
"#;

fn load_config() -> Config {
    let units = UnitRegistry::standard();
    Config::from_yaml_str(CONFIG, &units).expect("config should load")
}

fn raw_input() -> RawDataset {
    let mut raw = RawDataset::new();
    let time: ArrayRef = Arc::new(Int64Array::from(vec![1601017205, 1601017215, 1601017225]));
    let pitch: ArrayRef = Arc::new(Float64Array::from(vec![1.5, 720.0, -3.25]));
    let roll: ArrayRef = Arc::new(Float64Array::from(vec![0.5, 0.25, 0.75]));
    raw.insert("time", time);
    raw.insert("pitch", pitch);
    raw.insert("roll", roll);
    raw
}

fn pipeline(dir: &std::path::Path) -> IngestPipeline<FilesystemStorage> {
    let storage = FilesystemStorage::new(dir).expect("storage root");
    IngestPipeline::new(load_config(), storage)
}

#[test]
fn output_slots_use_the_declared_dtypes() {
    let dir = tempfile::tempdir().unwrap();
    let (dataset, _) = pipeline(dir.path()).standardize(&raw_input()).unwrap();

    assert_eq!(
        dataset.coords["time"].values.data_type(),
        &DataType::Timestamp(TimeUnit::Second, None)
    );
    assert_eq!(
        dataset.data_vars["pitch"].values.data_type(),
        &DataType::Float32
    );
    assert_eq!(
        dataset.data_vars["latitude"].values.data_type(),
        &DataType::Float64
    );
}

#[test]
fn out_of_valid_range_samples_become_fill_values() {
    let dir = tempfile::tempdir().unwrap();
    let (dataset, summary) = pipeline(dir.path()).standardize(&raw_input()).unwrap();

    let pitch = dataset.data_vars["pitch"].values.as_primitive::<Float32Type>();
    assert_eq!(pitch.value(0), 1.5);
    assert_eq!(pitch.value(1), -9999.0);
    assert_eq!(pitch.value(2), -3.25);
    assert_eq!(summary.substituted.get("pitch"), Some(&1));
    assert_eq!(summary.total_substituted(), 1);
}

#[test]
fn literal_slots_are_broadcast_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (dataset, summary) = pipeline(dir.path()).standardize(&raw_input()).unwrap();

    let latitude = &dataset.data_vars["latitude"];
    assert!(latitude.dims.is_empty());
    assert_eq!(latitude.len(), 1);
    assert_eq!(
        latitude.values.as_primitive::<arrow::datatypes::Float64Type>().value(0),
        46.20
    );
    assert_eq!(summary.literals, vec!["latitude".to_string()]);
}

#[test]
fn the_datastream_attribute_names_the_output() {
    let dir = tempfile::tempdir().unwrap();
    let (dataset, _) = pipeline(dir.path()).standardize(&raw_input()).unwrap();

    assert_eq!(dataset.name, "buoy.imu-z06.a1");
    assert_eq!(
        dataset.attrs.get("datastream").and_then(|v| v.as_str()),
        Some("buoy.imu-z06.a1")
    );
}

#[test]
fn missing_variables_are_filled_and_named_in_the_summary() {
    let dir = tempfile::tempdir().unwrap();
    let mut raw = raw_input();
    raw.fields.remove("roll");

    let (dataset, summary) = pipeline(dir.path()).standardize(&raw).unwrap();

    assert_eq!(summary.missing, vec!["roll".to_string()]);
    let roll = dataset.data_vars["roll"].values.as_primitive::<Float32Type>();
    assert_eq!(roll.len(), 3);
    assert!((0..3).all(|i| roll.value(i) == -9999.0));
}

#[test]
fn missing_coordinates_fail_with_the_slot_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut raw = raw_input();
    raw.fields.remove("time");

    let err = pipeline(dir.path()).standardize(&raw).unwrap_err();
    match err {
        PipelineError::Data(DataError::MissingCoordinate(name)) => assert_eq!(name, "time"),
        other => panic!("expected MissingCoordinate, got {other:?}"),
    }
}

#[test]
fn missing_fields_with_no_fill_value_fail_with_the_slot_name() {
    let yaml = CONFIG.replace(
        "    roll:\n      dtype: float\n",
        "    roll:\n      dtype: str\n",
    );
    let units = UnitRegistry::standard();
    let config = Config::from_yaml_str(&yaml, &units).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let storage = FilesystemStorage::new(dir.path()).unwrap();
    let pipeline = IngestPipeline::new(config, storage);

    let mut raw = raw_input();
    raw.fields.remove("roll");

    let err = pipeline.standardize(&raw).unwrap_err();
    match err {
        PipelineError::Data(DataError::MissingField(name)) => assert_eq!(name, "roll"),
        other => panic!("expected MissingField, got {other:?}"),
    }
}

#[test]
fn dimension_lengths_must_match_the_coordinate() {
    let dir = tempfile::tempdir().unwrap();
    let mut raw = raw_input();
    let short: ArrayRef = Arc::new(Float64Array::from(vec![0.5, 0.25]));
    raw.insert("roll", short);

    let err = pipeline(dir.path()).standardize(&raw).unwrap_err();
    match err {
        PipelineError::Data(DataError::DimensionMismatch {
            name,
            dim,
            expected,
            actual,
        }) => {
            assert_eq!(name, "roll");
            assert_eq!(dim, "time");
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("expected DimensionMismatch, got {other:?}"),
    }
}

#[test]
fn unparseable_raw_values_become_fill_values() {
    let dir = tempfile::tempdir().unwrap();
    let mut raw = raw_input();
    let text: ArrayRef = Arc::new(StringArray::from(vec!["0.5", "bogus", "0.75"]));
    raw.insert("roll", text);

    let (dataset, summary) = pipeline(dir.path()).standardize(&raw).unwrap();
    let roll = dataset.data_vars["roll"].values.as_primitive::<Float32Type>();
    assert_eq!(roll.value(0), 0.5);
    assert_eq!(roll.value(1), -9999.0);
    assert_eq!(summary.substituted.get("roll"), Some(&1));
}

#[test]
fn standardization_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path());
    let raw = raw_input();

    let (first, first_summary) = pipeline.standardize(&raw).unwrap();
    let (second, second_summary) = pipeline.standardize(&raw).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_summary, second_summary);
}

#[test]
fn datasets_without_a_time_coordinate_fail_validation() {
    let yaml = CONFIG
        .replace("    time:\n", "    height:\n")
        .replace("      dims: [time]", "      dims: [height]")
        .replace(
            "        units: \"Seconds since 1970-01-01 00:00:00\"\n        long_name: Time",
            "        units: m\n        long_name: Height",
        )
        .replace("      dtype: datetime", "      dtype: double");
    let units = UnitRegistry::standard();
    let config = Config::from_yaml_str(&yaml, &units).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let storage = FilesystemStorage::new(dir.path()).unwrap();
    let pipeline = IngestPipeline::new(config, storage);

    let mut raw = RawDataset::new();
    let height: ArrayRef = Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0]));
    let pitch: ArrayRef = Arc::new(Float64Array::from(vec![0.0, 0.0, 0.0]));
    let roll: ArrayRef = Arc::new(Float64Array::from(vec![0.0, 0.0, 0.0]));
    raw.insert("height", height);
    raw.insert("pitch", pitch);
    raw.insert("roll", roll);

    let err = pipeline.standardize(&raw).unwrap_err();
    match err {
        PipelineError::Data(DataError::Validation(validation)) => {
            assert!(validation.report.has_failures());
            assert!(validation
                .report
                .checks
                .iter()
                .any(|c| c.name == "time coordinate present"));
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
fn qc_annotation_adds_flag_variables_for_fail_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path());
    let (mut dataset, _) = pipeline.standardize(&raw_input()).unwrap();

    qc::annotate(&pipeline.config().dataset, &mut dataset).unwrap();

    let flags = dataset.data_vars["qc_pitch"].values.as_primitive::<Int32Type>();
    // pitch[1] was 720.0: replaced with fill, so its flag is "missing".
    assert_eq!(flags.value(0), 0);
    assert_eq!(flags.value(1), qc::QC_BIT_MISSING);
    assert_eq!(flags.value(2), 0);

    assert_eq!(
        dataset.data_vars["pitch"].attrs.get("ancillary_variables"),
        Some(&datastd::config::AttrValue::Str("qc_pitch".to_string()))
    );
    // roll declares no fail/warn bounds, so it gets no flag variable.
    assert!(dataset.data_vars.get("qc_roll").is_none());
}
