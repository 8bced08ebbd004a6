//! Domain conventions validator and naming grammar.
//!
//! [`Standards`] is the ruleset a standardized dataset is checked against at
//! the end of every run: structural rules (every dimension backed by a
//! self-dimensioned coordinate, lengths consistent), metadata rules (units
//! declared or acknowledged unknown, fill values typed like their variable),
//! and naming rules (datastream and file name grammar).
//!
//! Each rule is an individually-named check feeding a [`ValidationReport`];
//! a report with failures becomes a [`ValidationError`] carrying the full
//! report, so an operator sees every violation at once instead of fixing
//! them one re-run at a time.

mod report;

use std::path::{Path, PathBuf};

use arrow::array::Array;

use crate::config::{AttrValue, UNKNOWN_UNITS_PHRASE};
use crate::dataset::{DataArray, Dataset};
use crate::error::DefinitionError;
use crate::qc::operators::is_non_decreasing;

pub use report::{CheckStatus, ValidationCheck, ValidationReport};

/// File extensions permitted in datastream file names.
const VALID_EXTENSIONS: [&str; 5] = ["parquet", "csv", "json", "yaml", "raw"];

/// The dataset violated the standards ruleset.
///
/// Carries the full report; the `Display` form lists every check.
#[derive(Debug, thiserror::Error)]
#[error("dataset failed standards validation:\n{report}")]
pub struct ValidationError {
    /// The complete check-by-check report.
    pub report: ValidationReport,
}

/// A conventions validator collaborator.
///
/// The engine calls this once per run on the assembled dataset. Implement it
/// to apply a different ruleset than the default [`Standards`].
pub trait DatasetValidator {
    /// Checks the dataset, returning the structured violation report on
    /// failure.
    fn validate(&self, dataset: &Dataset) -> Result<(), ValidationError>;
}

/// The default conventions ruleset.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standards;

impl Standards {
    /// Runs every check and returns the full report, regardless of outcome.
    pub fn report(&self, dataset: &Dataset) -> ValidationReport {
        let mut report = ValidationReport::new(dataset.name.clone());

        self.check_datastream_attr(dataset, &mut report);
        self.check_time_coordinate(dataset, &mut report);
        self.check_coordinates(dataset, &mut report);
        self.check_dimensions(dataset, &mut report);
        for (name, array) in dataset.coords.iter().chain(dataset.data_vars.iter()) {
            self.check_units_attr(name, array, &mut report);
            self.check_fill_value(name, array, &mut report);
            self.check_range_attrs(name, array, &mut report);
        }

        report
    }

    fn check_datastream_attr(&self, dataset: &Dataset, report: &mut ValidationReport) {
        match dataset.attrs.get("datastream").and_then(AttrValue::as_str) {
            Some(name) => match validate_datastream_name(name) {
                Ok(()) => report.add_check(ValidationCheck::ok("datastream name")),
                Err(err) => {
                    report.add_check(ValidationCheck::failed("datastream name", err.to_string()));
                }
            },
            None => report.add_check(ValidationCheck::failed(
                "datastream attribute present",
                "global attrs must include 'datastream'",
            )),
        }
    }

    fn check_time_coordinate(&self, dataset: &Dataset, report: &mut ValidationReport) {
        match dataset.coords.get("time") {
            Some(time) => {
                report.add_check(ValidationCheck::ok("time coordinate present"));
                match is_non_decreasing(&time.values) {
                    Ok(true) => {
                        report.add_check(ValidationCheck::ok("time non-decreasing"));
                    }
                    Ok(false) => report.add_check(ValidationCheck::warning(
                        "time non-decreasing",
                        "time values decrease between samples (may be intentional)",
                    )),
                    Err(err) => report.add_check(ValidationCheck::warning(
                        "time non-decreasing",
                        format!("could not compare time values: {err}"),
                    )),
                }
            }
            None => report.add_check(ValidationCheck::failed(
                "time coordinate present",
                "datasets must be indexed by a 'time' coordinate",
            )),
        }
    }

    fn check_coordinates(&self, dataset: &Dataset, report: &mut ValidationReport) {
        for (name, coord) in &dataset.coords {
            let self_dimensioned = coord.dims.len() == 1
                && coord.dims.first().map(String::as_str) == Some(name.as_str())
                && coord.shape.len() == 1;
            if self_dimensioned {
                report.add_check(ValidationCheck::ok(format!("coord '{name}' self-dimensioned")));
            } else {
                report.add_check(ValidationCheck::failed(
                    format!("coord '{name}' self-dimensioned"),
                    format!("expected dims ['{name}'], found {:?}", coord.dims),
                ));
            }
        }
    }

    fn check_dimensions(&self, dataset: &Dataset, report: &mut ValidationReport) {
        for (name, array) in &dataset.data_vars {
            for (dim, &size) in array.dims.iter().zip(array.shape.iter()) {
                match dataset.dim_len(dim) {
                    Some(expected) if expected == size => {
                        report.add_check(ValidationCheck::ok(format!(
                            "dim '{dim}' of '{name}' consistent"
                        )));
                    }
                    Some(expected) => report.add_check(ValidationCheck::failed(
                        format!("dim '{dim}' of '{name}' consistent"),
                        format!("length {size}, coordinate has {expected}"),
                    )),
                    None => report.add_check(ValidationCheck::failed(
                        format!("dim '{dim}' of '{name}' has a coordinate"),
                        format!("no coordinate named '{dim}'"),
                    )),
                }
            }
        }
    }

    fn check_units_attr(&self, name: &str, array: &DataArray, report: &mut ValidationReport) {
        let has_units = array
            .attrs
            .get("units")
            .and_then(AttrValue::as_str)
            .is_some_and(|u| !u.trim().is_empty());
        let commented = array
            .attrs
            .get("comment")
            .and_then(AttrValue::as_str)
            .is_some_and(|c| c.contains(UNKNOWN_UNITS_PHRASE));
        if has_units || commented {
            report.add_check(ValidationCheck::ok(format!("units of '{name}' declared")));
        } else {
            report.add_check(ValidationCheck::failed(
                format!("units of '{name}' declared"),
                "set 'units', or state 'Unknown units.' in the comment",
            ));
        }
    }

    fn check_fill_value(&self, name: &str, array: &DataArray, report: &mut ValidationReport) {
        let Some(fill) = array.attrs.get("_FillValue") else {
            return;
        };
        let data_type = array.values.data_type();
        let numeric_like = data_type.is_numeric()
            || matches!(data_type, arrow::datatypes::DataType::Timestamp(_, _));
        let compatible = match fill {
            AttrValue::Int(_) | AttrValue::Float(_) => numeric_like,
            AttrValue::Str(_) => matches!(
                data_type,
                arrow::datatypes::DataType::Utf8 | arrow::datatypes::DataType::LargeUtf8
            ),
            _ => false,
        };
        if compatible {
            report.add_check(ValidationCheck::ok(format!("_FillValue of '{name}' typed")));
        } else {
            report.add_check(ValidationCheck::failed(
                format!("_FillValue of '{name}' typed"),
                format!("fill value {fill:?} does not match data type {data_type}"),
            ));
        }
    }

    fn check_range_attrs(&self, name: &str, array: &DataArray, report: &mut ValidationReport) {
        for attr in ["valid_range", "fail_range", "warn_range"] {
            if let Some(value) = array.attrs.get(attr) {
                let two_elements =
                    matches!(value, AttrValue::List(items) if items.len() == 2);
                if two_elements {
                    report.add_check(ValidationCheck::ok(format!("{attr} of '{name}' is a pair")));
                } else {
                    report.add_check(ValidationCheck::failed(
                        format!("{attr} of '{name}' is a pair"),
                        format!("expected a [min, max] pair, found {value:?}"),
                    ));
                }
            }
        }
    }
}

impl DatasetValidator for Standards {
    fn validate(&self, dataset: &Dataset) -> Result<(), ValidationError> {
        let report = self.report(dataset);
        if report.has_failures() {
            return Err(ValidationError { report });
        }
        if report.has_warnings() {
            log::warn!("{report}");
        }
        Ok(())
    }
}

/// Checks a datastream name against the
/// `(location_id).(instrument_id)[-qualifier][-temporal].(data_level)`
/// grammar.
pub fn validate_datastream_name(name: &str) -> Result<(), DefinitionError> {
    if name.split('.').count() != 3 {
        return Err(DefinitionError::IllegalName {
            name: name.to_string(),
            reason: "expected (location_id).(instrument_id)[-qualifier][-temporal].(data_level)"
                .to_string(),
        });
    }
    for c in name.chars() {
        if !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')) {
            return Err(DefinitionError::IllegalName {
                name: name.to_string(),
                reason: format!("'{c}' is not a permitted character"),
            });
        }
    }
    Ok(())
}

/// Checks a datastream file name:
/// `datastream.YYYYMMDD.HHMMSS.<ext>` with a permitted extension.
pub fn validate_filename(filename: &str) -> Result<(), DefinitionError> {
    let parts: Vec<&str> = filename.split('.').collect();
    if parts.len() != 6 {
        return Err(DefinitionError::IllegalName {
            name: filename.to_string(),
            reason: "expected datastream_name.date.time.extension".to_string(),
        });
    }
    validate_datastream_name(&parts[..3].join("."))?;
    let (date, time, ext) = (parts[3], parts[4], parts[5]);
    if !(date.len() == 8 && date.chars().all(|c| c.is_ascii_digit())) {
        return Err(DefinitionError::IllegalName {
            name: filename.to_string(),
            reason: format!("'{date}' is not a valid date"),
        });
    }
    if !(time.len() == 6 && time.chars().all(|c| c.is_ascii_digit())) {
        return Err(DefinitionError::IllegalName {
            name: filename.to_string(),
            reason: format!("'{time}' is not a valid time"),
        });
    }
    if !VALID_EXTENSIONS.contains(&ext) {
        return Err(DefinitionError::IllegalName {
            name: filename.to_string(),
            reason: format!("'{ext}' is not a valid file extension"),
        });
    }
    Ok(())
}

/// Directory a datastream's files belong in, relative to `root`:
/// `root/location_id/datastream_name`.
pub fn datastream_path(datastream_name: &str, root: &Path) -> Result<PathBuf, DefinitionError> {
    validate_datastream_name(datastream_name)?;
    let location_id = datastream_name.split('.').next().unwrap_or_default();
    Ok(root.join(location_id).join(datastream_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datastream_names_need_three_components() {
        assert!(validate_datastream_name("buoy.imu.a1").is_ok());
        assert!(validate_datastream_name("buoy.imu-z06-10m.a1").is_ok());
        assert!(validate_datastream_name("buoy.imu").is_err());
        assert!(validate_datastream_name("buoy.imu.a1.extra").is_err());
    }

    #[test]
    fn datastream_names_reject_odd_characters() {
        assert!(validate_datastream_name("buoy.im u.a1").is_err());
        assert!(validate_datastream_name("buoy.imu.a#").is_err());
    }

    #[test]
    fn filenames_follow_the_grammar() {
        assert!(validate_filename("buoy.imu.a1.20201201.000000.parquet").is_ok());
        assert!(validate_filename("buoy.imu.a1.20201201.000000.exe").is_err());
        assert!(validate_filename("buoy.imu.a1.2020121.000000.parquet").is_err());
        assert!(validate_filename("buoy.imu.a1.20201201.0000.parquet").is_err());
    }

    #[test]
    fn datastream_paths_group_by_location() {
        let path = datastream_path("buoy.imu.a1", Path::new("/data")).unwrap();
        assert_eq!(path, Path::new("/data/buoy/buoy.imu.a1"));
    }
}
