//! Variable and coordinate definitions.
//!
//! A definition is a named, typed slot in the output dataset: a dtype, an
//! ordered list of dimensioning coordinates, an attribute set, and optionally
//! pre-supplied literal data. A [`Coordinate`] is a [`Variable`] with the
//! added invariant that it is dimensioned only by itself.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::error::ArrowError;
use serde::{Deserialize, Serialize};

use super::attributes::{LiteralValue, VariableAttributes};
use crate::error::{DataError, DefinitionError};
use crate::units::UnitRegistry;

/// Closed set of declared data type tags.
///
/// Tags map to Arrow types for the in-memory representation and drive the
/// default fill value: numeric tags default to `-9999` cast to the tag,
/// while `str` and `datetime` have no default fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 8-bit signed integer.
    #[serde(alias = "int8")]
    Byte,
    /// 16-bit signed integer.
    #[serde(alias = "int16")]
    Short,
    /// 32-bit signed integer.
    #[serde(alias = "int32")]
    Int,
    /// 64-bit signed integer.
    #[serde(alias = "int64")]
    Long,
    /// 32-bit float.
    #[serde(alias = "float32")]
    Float,
    /// 64-bit float.
    #[serde(alias = "float64")]
    Double,
    /// UTF-8 text.
    #[serde(alias = "string")]
    Str,
    /// Epoch-second timestamps.
    #[serde(alias = "datetime64")]
    Datetime,
}

impl DType {
    /// The Arrow type backing this tag.
    pub fn arrow_type(self) -> DataType {
        match self {
            DType::Byte => DataType::Int8,
            DType::Short => DataType::Int16,
            DType::Int => DataType::Int32,
            DType::Long => DataType::Int64,
            DType::Float => DataType::Float32,
            DType::Double => DataType::Float64,
            DType::Str => DataType::Utf8,
            DType::Datetime => DataType::Timestamp(TimeUnit::Second, None),
        }
    }

    /// True for the integer and float tags.
    pub fn is_numeric(self) -> bool {
        !matches!(self, DType::Str | DType::Datetime)
    }

    /// The default fill sentinel for this tag: `-9999` cast to the tag for
    /// numeric tags, none for `str` and `datetime`.
    pub fn default_fill(self) -> Option<LiteralValue> {
        match self {
            DType::Byte | DType::Short | DType::Int | DType::Long => {
                Some(LiteralValue::Int(-9999))
            }
            DType::Float | DType::Double => Some(LiteralValue::Float(-9999.0)),
            DType::Str | DType::Datetime => None,
        }
    }

    /// Casts `values` to this tag's Arrow type.
    ///
    /// The cast is lossy-safe: entries that cannot be represented become
    /// null, for the caller to substitute or reject. Numeric input destined
    /// for `datetime` is interpreted as epoch seconds.
    pub(crate) fn cast_array(self, values: &ArrayRef) -> Result<ArrayRef, ArrowError> {
        let target = self.arrow_type();
        if values.data_type() == &target {
            return Ok(values.clone());
        }
        if self == DType::Datetime && values.data_type().is_numeric() {
            let seconds = cast(values, &DataType::Int64)?;
            return cast(&seconds, &target);
        }
        cast(values, &target)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            DType::Byte => "byte",
            DType::Short => "short",
            DType::Int => "int",
            DType::Long => "long",
            DType::Float => "float",
            DType::Double => "double",
            DType::Str => "str",
            DType::Datetime => "datetime",
        };
        f.write_str(tag)
    }
}

impl LiteralValue {
    /// Materializes this literal as a one-element array of `dtype`.
    pub(crate) fn to_scalar_array(&self, dtype: DType) -> Result<ArrayRef, ArrowError> {
        let base: ArrayRef = match self {
            LiteralValue::Int(v) => Arc::new(Int64Array::from(vec![*v])),
            LiteralValue::Float(v) => Arc::new(Float64Array::from(vec![*v])),
            LiteralValue::Str(v) => Arc::new(StringArray::from(vec![v.clone()])),
        };
        dtype.cast_array(&base)
    }
}

/// Pre-supplied data for a slot that is not retrieved from the raw input,
/// e.g. the fixed latitude/longitude/altitude of a deployment site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralData {
    /// A single value, broadcast across the declared dims.
    Scalar(LiteralValue),
    /// One value per element of the declared dims.
    List(Vec<LiteralValue>),
}

impl LiteralData {
    /// Materializes the literal as an array of `dtype`. A scalar is repeated
    /// `broadcast` times (1 when no dims are involved).
    pub(crate) fn to_array(
        &self,
        name: &str,
        dtype: DType,
        broadcast: usize,
    ) -> Result<ArrayRef, DataError> {
        let base: ArrayRef = match self {
            LiteralData::Scalar(LiteralValue::Int(v)) => {
                Arc::new(Int64Array::from(vec![*v; broadcast]))
            }
            LiteralData::Scalar(LiteralValue::Float(v)) => {
                Arc::new(Float64Array::from(vec![*v; broadcast]))
            }
            LiteralData::Scalar(LiteralValue::Str(v)) => {
                Arc::new(StringArray::from(vec![v.clone(); broadcast]))
            }
            LiteralData::List(values) => {
                if values.iter().any(|v| matches!(v, LiteralValue::Str(_))) {
                    let text: Vec<String> = values
                        .iter()
                        .map(|v| match v {
                            LiteralValue::Str(s) => s.clone(),
                            LiteralValue::Int(i) => i.to_string(),
                            LiteralValue::Float(f) => f.to_string(),
                        })
                        .collect();
                    Arc::new(StringArray::from(text))
                } else {
                    let floats: Vec<f64> = values
                        .iter()
                        .map(|v| match v {
                            LiteralValue::Int(i) => *i as f64,
                            LiteralValue::Float(f) => *f,
                            LiteralValue::Str(_) => unreachable!(),
                        })
                        .collect();
                    Arc::new(Float64Array::from(floats))
                }
            }
        };
        let casted = dtype.cast_array(&base).map_err(|source| DataError::Cast {
            name: name.to_string(),
            to: dtype.to_string(),
            source,
        })?;
        if casted.null_count() > 0 {
            return Err(DataError::Incomplete {
                name: name.to_string(),
                count: casted.null_count(),
                to: dtype.to_string(),
            });
        }
        Ok(casted)
    }

    /// Number of elements the literal provides, or `None` for a scalar.
    pub fn len(&self) -> Option<usize> {
        match self {
            LiteralData::Scalar(_) => None,
            LiteralData::List(values) => Some(values.len()),
        }
    }
}

/// Characters permitted in variable names besides ASCII alphanumerics.
const NAME_EXTRA_CHARS: &str = "_()[]{}./";

pub(crate) fn validate_name(name: &str) -> Result<(), DefinitionError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || NAME_EXTRA_CHARS.contains(c));
    if valid {
        Ok(())
    } else {
        Err(DefinitionError::InvalidName(name.to_string()))
    }
}

/// A declared data variable: a named, typed slot in the output dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Variable {
    /// Slot name. Set from the enclosing mapping key during finalization.
    #[serde(skip)]
    pub name: String,

    /// Pre-supplied data for slots not retrieved from the raw input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<LiteralData>,

    /// Declared data type tag.
    pub dtype: DType,

    /// Ordered coordinate names that dimension this variable.
    pub dims: Vec<String>,

    /// Variable attributes recorded in the output dataset.
    #[serde(default)]
    pub attrs: VariableAttributes,
}

impl Variable {
    /// Second construction phase: adopts the mapping key as the slot name and
    /// enforces the definition invariants.
    ///
    /// After the attribute checks pass, the default fill value is derived
    /// for numeric dtypes that did not set one explicitly.
    pub fn finalize(&mut self, name: &str, units: &UnitRegistry) -> Result<(), DefinitionError> {
        validate_name(name)?;
        self.name = name.to_string();

        for (i, dim) in self.dims.iter().enumerate() {
            if self.dims[..i].contains(dim) {
                return Err(DefinitionError::DuplicateDimension {
                    name: name.to_string(),
                    dim: dim.clone(),
                });
            }
        }

        self.attrs.validate(name, units)?;

        if self.attrs.fill_value.is_none() {
            self.attrs.fill_value = self.dtype.default_fill();
        }
        Ok(())
    }

    /// One-element array holding this slot's fill value in its dtype, if a
    /// fill value is set.
    pub(crate) fn fill_scalar(&self) -> Result<Option<ArrayRef>, DataError> {
        match &self.attrs.fill_value {
            None => Ok(None),
            Some(fill) => {
                let array = fill.to_scalar_array(self.dtype).map_err(|source| {
                    DataError::Cast {
                        name: self.name.clone(),
                        to: self.dtype.to_string(),
                        source,
                    }
                })?;
                if array.null_count() > 0 {
                    return Err(DataError::Incomplete {
                        name: self.name.clone(),
                        count: 1,
                        to: self.dtype.to_string(),
                    });
                }
                Ok(Some(array))
            }
        }
    }
}

/// A coordinate: a variable that indexes itself and dimensions others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coordinate(
    /// The underlying variable definition.
    pub Variable,
);

impl Coordinate {
    /// Variable finalization plus the self-dimensioning invariant:
    /// `dims == [name]`.
    pub fn finalize(&mut self, name: &str, units: &UnitRegistry) -> Result<(), DefinitionError> {
        self.0.finalize(name, units)?;
        if self.0.dims.len() != 1 || self.0.dims[0] != name {
            return Err(DefinitionError::CoordinateDims {
                name: name.to_string(),
                dims: self.0.dims.clone(),
            });
        }
        Ok(())
    }
}

impl Deref for Coordinate {
    type Target = Variable;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
