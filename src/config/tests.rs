use super::*;
use crate::error::DefinitionError;
use proptest::prelude::*;

fn registry() -> UnitRegistry {
    UnitRegistry::standard()
}

fn load(yaml: &str) -> Result<Config, DefinitionError> {
    Config::from_yaml_str(yaml, &registry())
}

const MINIMAL: &str = r#"
pipeline:
  type: Ingest
  location_id: buoy
  instrument_id: imu
dataset:
  coords:
    time:
      dtype: datetime
      dims: [time]
      attrs:
        units: "Seconds since 1970-01-01 00:00:00"
  data_vars:
    pitch:
      dtype: float
      dims: [time]
      attrs:
        units: degree
"#;

#[test]
fn minimal_config_loads() {
    let config = load(MINIMAL).unwrap();
    assert_eq!(config.pipeline.pipeline_type, PipelineType::Ingest);
    assert_eq!(config.dataset.coords.len(), 1);
    assert_eq!(config.dataset.data_vars.len(), 1);
    assert_eq!(config.dataset.data_vars["pitch"].name, "pitch");
}

#[test]
fn default_data_levels_per_pipeline_type() {
    let config = load(MINIMAL).unwrap();
    assert_eq!(config.pipeline.input_datastream_name(), "buoy.imu.00");
    assert_eq!(config.pipeline.output_datastream_name(), "buoy.imu.a1");

    let vap = MINIMAL.replace("type: Ingest", "type: VAP");
    let config = load(&vap).unwrap();
    assert_eq!(config.pipeline.input_datastream_name(), "buoy.imu.a1");
    assert_eq!(config.pipeline.output_datastream_name(), "buoy.imu.b1");
}

#[test]
fn qualifier_and_temporal_join_with_dashes() {
    let yaml = MINIMAL.replace(
        "  instrument_id: imu\n",
        "  instrument_id: imu\n  qualifier: z06\n  temporal: 10m\n",
    );
    let config = load(&yaml).unwrap();
    assert_eq!(
        config.pipeline.output_datastream_name(),
        "buoy.imu-z06-10m.a1"
    );
}

#[test]
fn explicit_data_levels_override_defaults() {
    let yaml = MINIMAL.replace(
        "  instrument_id: imu\n",
        "  instrument_id: imu\n  output_data_level: b7\n",
    );
    let config = load(&yaml).unwrap();
    assert_eq!(config.pipeline.output_datastream_name(), "buoy.imu.b7");
}

#[test]
fn pipeline_type_must_name_a_valid_choice() {
    let yaml = MINIMAL.replace("type: Ingest", "type: Egress");
    let err = load(&yaml).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Ingest"), "got: {message}");
    assert!(message.contains("VAP"), "got: {message}");
}

#[test]
fn illegal_naming_components_are_all_reported() {
    let yaml = MINIMAL
        .replace("location_id: buoy", "location_id: buoy.a")
        .replace("instrument_id: imu", "instrument_id: im u");
    let err = load(&yaml).unwrap_err();
    match err {
        DefinitionError::IllegalNameComponents { components } => {
            assert_eq!(components, vec!["buoy.a".to_string(), "im u".to_string()]);
        }
        other => panic!("expected IllegalNameComponents, got {other:?}"),
    }
}

#[test]
fn coordinates_must_dimension_themselves() {
    let yaml = MINIMAL.replace("      dims: [time]\n      attrs:\n        units: \"Seconds since 1970-01-01 00:00:00\"", "      dims: [t]\n      attrs:\n        units: \"Seconds since 1970-01-01 00:00:00\"");
    let err = load(&yaml).unwrap_err();
    match err {
        DefinitionError::CoordinateDims { name, dims } => {
            assert_eq!(name, "time");
            assert_eq!(dims, vec!["t".to_string()]);
        }
        other => panic!("expected CoordinateDims, got {other:?}"),
    }
}

#[test]
fn numeric_dtypes_get_the_default_fill_value() {
    let yaml = MINIMAL.replace("dtype: float", "dtype: int");
    let config = load(&yaml).unwrap();
    assert_eq!(
        config.dataset.data_vars["pitch"].attrs.fill_value,
        Some(LiteralValue::Int(-9999))
    );

    let config = load(MINIMAL).unwrap();
    assert_eq!(
        config.dataset.data_vars["pitch"].attrs.fill_value,
        Some(LiteralValue::Float(-9999.0))
    );
}

#[test]
fn string_and_datetime_dtypes_get_no_default_fill() {
    let yaml = MINIMAL.replace("dtype: float", "dtype: str");
    let config = load(&yaml).unwrap();
    assert_eq!(config.dataset.data_vars["pitch"].attrs.fill_value, None);

    let config = load(MINIMAL).unwrap();
    assert_eq!(config.dataset.coords["time"].attrs.fill_value, None);
}

#[test]
fn explicit_fill_values_are_preserved() {
    let yaml = MINIMAL.replace(
        "        units: degree\n",
        "        units: degree\n        _FillValue: -32768\n",
    );
    let config = load(&yaml).unwrap();
    assert_eq!(
        config.dataset.data_vars["pitch"].attrs.fill_value,
        Some(LiteralValue::Int(-32768))
    );
}

#[test]
fn missing_units_require_the_unknown_units_phrase() {
    let yaml = MINIMAL.replace("        units: degree\n", "        long_name: Pitch\n");
    let err = load(&yaml).unwrap_err();
    assert!(matches!(err, DefinitionError::MissingUnits(name) if name == "pitch"));

    let yaml = MINIMAL.replace(
        "        units: degree\n",
        "        comment: \"Unknown units.\"\n",
    );
    assert!(load(&yaml).is_ok());
}

#[test]
fn unitless_quantities_use_one() {
    let yaml = MINIMAL.replace("units: degree", "units: \"1\"");
    assert!(load(&yaml).is_ok());
}

#[test]
fn percent_and_time_offset_units_skip_the_registry() {
    let yaml = MINIMAL.replace("units: degree", "units: \"%\"");
    assert!(load(&yaml).is_ok());
}

#[test]
fn unknown_attribute_keys_are_rejected() {
    let yaml = MINIMAL.replace(
        "        units: degree\n",
        "        units: degree\n        banana: 3\n",
    );
    let err = load(&yaml).unwrap_err();
    assert!(err.to_string().contains("banana"), "got: {err}");
}

#[test]
fn range_attributes_need_exactly_two_elements() {
    let yaml = MINIMAL.replace(
        "        units: degree\n",
        "        units: degree\n        valid_range: [0.0, 1.0, 2.0]\n",
    );
    assert!(load(&yaml).is_err());

    let yaml = MINIMAL.replace(
        "        units: degree\n",
        "        units: degree\n        valid_range: [10.0, 0.0]\n",
    );
    let err = load(&yaml).unwrap_err();
    assert!(matches!(err, DefinitionError::InvalidAttribute { .. }));
}

#[test]
fn variable_names_allow_the_documented_punctuation() {
    let yaml = MINIMAL.replace(
        "    pitch:",
        "    \"HorizontalSpeedAverage(Double)\":",
    );
    assert!(load(&yaml).is_ok());

    let yaml = MINIMAL.replace("    pitch:", "    \"bad name\":");
    let err = load(&yaml).unwrap_err();
    assert!(matches!(err, DefinitionError::InvalidName(name) if name == "bad name"));
}

#[test]
fn names_cannot_collide_across_coords_and_data_vars() {
    let yaml = MINIMAL.replace("    pitch:", "    time:");
    let err = load(&yaml).unwrap_err();
    assert!(matches!(err, DefinitionError::NameCollision(name) if name == "time"));
}

#[test]
fn dims_must_reference_declared_coordinates() {
    let yaml = MINIMAL.replace("      dims: [time]\n      attrs:\n        units: degree", "      dims: [depth]\n      attrs:\n        units: degree");
    let err = load(&yaml).unwrap_err();
    match err {
        DefinitionError::UnknownDimension { name, dim } => {
            assert_eq!(name, "pitch");
            assert_eq!(dim, "depth");
        }
        other => panic!("expected UnknownDimension, got {other:?}"),
    }
}

#[test]
fn later_documents_override_earlier_ones() {
    let combined = format!(
        "{MINIMAL}\n---\npipeline:\n  type: Ingest\n  location_id: pier\n  instrument_id: imu\n"
    );
    let config = load(&combined).unwrap();
    assert_eq!(config.pipeline.output_datastream_name(), "pier.imu.a1");
}

#[test]
fn dtype_aliases_map_to_the_same_tags() {
    let yaml = MINIMAL.replace("dtype: float", "dtype: float32");
    let config = load(&yaml).unwrap();
    assert_eq!(config.dataset.data_vars["pitch"].dtype, DType::Float);
}

proptest! {
    #[test]
    fn legal_components_always_derive_valid_datastream_names(
        location in "[a-z][a-z0-9]{0,7}",
        instrument in "[a-z][a-z0-9]{0,7}",
        qualifier in "([a-z0-9]{1,4})?",
    ) {
        let pipeline = PipelineConfig {
            pipeline_type: PipelineType::Ingest,
            input_data_level: None,
            output_data_level: None,
            location_id: location,
            instrument_id: instrument,
            qualifier,
            temporal: String::new(),
        };
        pipeline.finalize().unwrap();
        let name = pipeline.output_datastream_name();
        prop_assert_eq!(name.split('.').count(), 3);
        prop_assert!(crate::standards::validate_datastream_name(&name).is_ok());
    }
}
