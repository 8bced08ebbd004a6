//! Variable attribute model.
//!
//! Attributes are the free-form-looking but strictly-checked metadata
//! recorded on every output variable: units, user-facing descriptions, and
//! the quality-control bounds (`valid_*`, `fail_*`, `warn_*`) that drive
//! screening. The attribute schema is closed: an unrecognized key is a
//! [`DefinitionError`] at load time, so typos cannot silently produce
//! undocumented metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;
use crate::units::UnitRegistry;

/// A free-form attribute value, as found in global attributes and in the
/// serialized form of variable attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Str(String),
    /// Homogeneous or mixed list of values.
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Returns the value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a float, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

/// A scalar literal usable as a fill value or as pre-supplied data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// Text literal.
    Str(String),
}

impl From<&LiteralValue> for AttrValue {
    fn from(value: &LiteralValue) -> Self {
        match value {
            LiteralValue::Int(v) => AttrValue::Int(*v),
            LiteralValue::Float(v) => AttrValue::Float(*v),
            LiteralValue::Str(v) => AttrValue::Str(v.clone()),
        }
    }
}

/// Attributes recorded on an output variable or coordinate.
///
/// The `valid_*` bounds drive fill-value substitution during extraction;
/// `fail_*` and `warn_*` bounds drive companion quality-flag variables. All
/// other fields are descriptive metadata passed through to the output
/// dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableAttributes {
    /// Units the data are measured in. Unitless quantities should use `"1"`.
    /// If the units are unknown the attribute must be omitted and `comment`
    /// must include the phrase "Unknown units.".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,

    /// Brief display label for the measured property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,

    /// Name from the CF Standard Name table, if a suitable match exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_name: Option<String>,

    /// ISO 19115-1 code for the source of the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_content_type: Option<String>,

    /// CF role (timeseries_id, profile_id, or trajectory_id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf_role: Option<String>,

    /// Sensor accuracy, in the same units as the variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,

    /// Sensor precision, in the same units as the variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,

    /// Sensor resolution, in the same units as the variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<f64>,

    /// Name of the instrument variable that collected this data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,

    /// Make and model of the instrument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make_model: Option<String>,

    /// ISO-8601 date of the last calibration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_date: Option<String>,

    /// User-friendly description of what the variable represents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// `[min, max]` outside of which values are replaced with the fill value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_range: Option<[f64; 2]>,

    /// `[min, max]` outside of which values are flagged as failing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_range: Option<[f64; 2]>,

    /// `[min, max]` outside of which values are flagged as suspect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_range: Option<[f64; 2]>,

    /// Largest allowed difference between consecutive values; larger jumps
    /// are replaced with the fill value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_delta: Option<f64>,

    /// Largest difference between consecutive values before flagging as
    /// failing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_delta: Option<f64>,

    /// Largest difference between consecutive values before flagging as
    /// suspect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_delta: Option<f64>,

    /// Sentinel written in place of missing or invalid samples. Defaults to
    /// `-9999` cast to the variable's dtype for numeric dtypes.
    #[serde(
        default,
        alias = "_FillValue",
        skip_serializing_if = "Option::is_none"
    )]
    pub fill_value: Option<LiteralValue>,
}

/// The exact phrase a comment must carry when units are unknown.
pub const UNKNOWN_UNITS_PHRASE: &str = "Unknown units.";

type AttrCheck = fn(&VariableAttributes, &str, &UnitRegistry) -> Result<(), DefinitionError>;

/// Ordered invariant checks run after deserialization. Each check is a pure
/// function over the constructed value and is independently testable.
const CHECKS: &[(&str, AttrCheck)] = &[
    ("units-known-or-commented", VariableAttributes::check_units_known),
    ("ranges-ordered", VariableAttributes::check_ranges_ordered),
    ("units-parse", VariableAttributes::check_units_parse),
];

impl VariableAttributes {
    /// Runs the ordered invariant checks for the attributes of `name`.
    ///
    /// Construction is two-phase: serde populates the fields, then this
    /// method enforces the cross-field rules. The first violated invariant
    /// is returned.
    pub fn validate(&self, name: &str, units: &UnitRegistry) -> Result<(), DefinitionError> {
        for (_, check) in CHECKS {
            check(self, name, units)?;
        }
        Ok(())
    }

    /// `units` must be set, or `comment` must acknowledge that they are
    /// unknown. This is a hard definition error, distinct from the
    /// unit-parseability warning below.
    fn check_units_known(
        &self,
        name: &str,
        _units: &UnitRegistry,
    ) -> Result<(), DefinitionError> {
        let has_units = self.units.as_deref().is_some_and(|u| !u.trim().is_empty());
        if has_units {
            return Ok(());
        }
        let commented = self
            .comment
            .as_deref()
            .is_some_and(|c| c.contains(UNKNOWN_UNITS_PHRASE));
        if commented {
            Ok(())
        } else {
            Err(DefinitionError::MissingUnits(name.to_string()))
        }
    }

    /// Range pairs must satisfy `min <= max`.
    fn check_ranges_ordered(
        &self,
        name: &str,
        _units: &UnitRegistry,
    ) -> Result<(), DefinitionError> {
        let pairs = [
            ("valid_range", self.valid_range),
            ("fail_range", self.fail_range),
            ("warn_range", self.warn_range),
        ];
        for (attr, range) in pairs {
            if let Some([min, max]) = range {
                if min > max {
                    return Err(DefinitionError::InvalidAttribute {
                        name: name.to_string(),
                        attr: attr.to_string(),
                        reason: format!("min {min} is greater than max {max}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// An unparseable unit string is kept as-is and logged, never rejected.
    ///
    /// The literal `%` and time-offset encodings starting with
    /// `"Seconds since "` are accepted without a registry lookup.
    fn check_units_parse(
        &self,
        name: &str,
        units: &UnitRegistry,
    ) -> Result<(), DefinitionError> {
        if let Some(unit_str) = self.units.as_deref() {
            if unit_str == "%" || unit_str.starts_with("Seconds since ") {
                return Ok(());
            }
            if let Err(err) = units.parse(unit_str) {
                log::warn!(
                    "'{unit_str}' (units of '{name}') is not a recognized unit or \
                     combination of units ({err}); the string will be kept as-is"
                );
            }
        }
        Ok(())
    }

    /// Serializes the attributes into the map recorded on the output
    /// variable. Only present fields are emitted; the fill value uses the
    /// conventional `_FillValue` key.
    pub fn to_attr_map(&self) -> BTreeMap<String, AttrValue> {
        let mut map = BTreeMap::new();
        let text = [
            ("units", &self.units),
            ("long_name", &self.long_name),
            ("standard_name", &self.standard_name),
            ("coverage_content_type", &self.coverage_content_type),
            ("cf_role", &self.cf_role),
            ("instrument", &self.instrument),
            ("make_model", &self.make_model),
            ("calibration_date", &self.calibration_date),
            ("comment", &self.comment),
        ];
        for (key, value) in text {
            if let Some(value) = value {
                map.insert(key.to_string(), AttrValue::Str(value.clone()));
            }
        }
        let floats = [
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("resolution", self.resolution),
            ("valid_delta", self.valid_delta),
            ("fail_delta", self.fail_delta),
            ("warn_delta", self.warn_delta),
        ];
        for (key, value) in floats {
            if let Some(value) = value {
                map.insert(key.to_string(), AttrValue::Float(value));
            }
        }
        let ranges = [
            ("valid_range", self.valid_range),
            ("fail_range", self.fail_range),
            ("warn_range", self.warn_range),
        ];
        for (key, range) in ranges {
            if let Some([min, max]) = range {
                map.insert(
                    key.to_string(),
                    AttrValue::List(vec![AttrValue::Float(min), AttrValue::Float(max)]),
                );
            }
        }
        if let Some(fill) = &self.fill_value {
            map.insert("_FillValue".to_string(), AttrValue::from(fill));
        }
        map
    }
}
