//! Per-slot extraction: raw field lookup, dtype coercion, and validity
//! screening.
//!
//! Extraction reconciles one declared slot against the raw input. The
//! declared dtype always wins (values are cast), the declared dims always
//! win (lengths are checked against the extracted coordinates), and samples
//! that cannot be represented or fall outside the `valid_*` bounds are
//! replaced with the slot's fill value, so the output is declared-complete.

use std::collections::BTreeMap;

use arrow::array::{Array, ArrayRef, BooleanArray, Scalar, UInt32Array};
use arrow::compute::kernels::boolean::{and, is_null, not, or};
use arrow::compute::kernels::zip::zip;
use arrow::compute::take;
use arrow::error::ArrowError;

use crate::config::{Coordinate, DType, Variable};
use crate::dataset::{DataArray, RawDataset};
use crate::error::DataError;
use crate::qc::operators::{delta_mask, fill_nulls, out_of_range_mask};

/// How a slot was populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    /// Values extracted from a raw field.
    Extracted,
    /// Values pre-supplied by the definition's literal data.
    Literal,
    /// The raw field was absent; the slot was initialized to its fill value
    /// and flagged for the downstream conventions check.
    MissingFilled,
}

/// The result of populating one slot.
#[derive(Debug, Clone)]
pub struct SlotOutcome {
    /// The populated array.
    pub array: DataArray,
    /// Where its values came from.
    pub source: SlotSource,
    /// Number of samples replaced with the fill value.
    pub substituted: usize,
}

/// Populates a coordinate slot. Coordinates have no fallback: a missing raw
/// field is a [`DataError`], because every other slot is sized by them.
pub(crate) fn coordinate_slot(
    coord: &Coordinate,
    raw: &RawDataset,
) -> Result<SlotOutcome, DataError> {
    let attrs = coord.attrs.to_attr_map();
    if let Some(literal) = &coord.data {
        let n = literal.len().unwrap_or(1);
        let values = literal.to_array(&coord.name, coord.dtype, n)?;
        let array = DataArray::new(coord.dims.clone(), vec![values.len()], values, attrs)?;
        return Ok(SlotOutcome {
            array,
            source: SlotSource::Literal,
            substituted: 0,
        });
    }

    let field = raw
        .get(&coord.name)
        .ok_or_else(|| DataError::MissingCoordinate(coord.name.clone()))?;
    if field.shape.len() != 1 {
        return Err(DataError::CoordinateShape {
            name: coord.name.clone(),
            shape: field.shape.clone(),
        });
    }
    let (values, substituted) = screen(coord, &field.values)?;
    let array = DataArray::new(coord.dims.clone(), vec![values.len()], values, attrs)?;
    Ok(SlotOutcome {
        array,
        source: SlotSource::Extracted,
        substituted,
    })
}

/// Populates a data variable slot against the already-extracted coordinate
/// sizes.
pub(crate) fn variable_slot(
    var: &Variable,
    raw: &RawDataset,
    dim_sizes: &BTreeMap<String, usize>,
) -> Result<SlotOutcome, DataError> {
    let mut shape = Vec::with_capacity(var.dims.len());
    for dim in &var.dims {
        let size = dim_sizes
            .get(dim)
            .copied()
            .ok_or_else(|| DataError::MissingCoordinate(dim.clone()))?;
        shape.push(size);
    }
    let expected: usize = shape.iter().product();
    let attrs = var.attrs.to_attr_map();

    if let Some(literal) = &var.data {
        if let Some(len) = literal.len() {
            if len != expected {
                return Err(DataError::LiteralShape {
                    name: var.name.clone(),
                    expected,
                    actual: len,
                });
            }
        }
        let values = literal.to_array(&var.name, var.dtype, expected)?;
        let array = DataArray::new(var.dims.clone(), shape, values, attrs)?;
        return Ok(SlotOutcome {
            array,
            source: SlotSource::Literal,
            substituted: 0,
        });
    }

    match raw.get(&var.name) {
        Some(field) => {
            if field.shape.len() != var.dims.len() {
                return Err(DataError::RankMismatch {
                    name: var.name.clone(),
                    expected: var.dims.len(),
                    actual: field.shape.len(),
                });
            }
            for (i, dim) in var.dims.iter().enumerate() {
                let declared = shape.get(i).copied().unwrap_or(0);
                let actual = field.shape.get(i).copied().unwrap_or(0);
                if declared != actual {
                    return Err(DataError::DimensionMismatch {
                        name: var.name.clone(),
                        dim: dim.clone(),
                        expected: declared,
                        actual,
                    });
                }
            }
            let (values, substituted) = screen(var, &field.values)?;
            let array = DataArray::new(var.dims.clone(), shape, values, attrs)?;
            Ok(SlotOutcome {
                array,
                source: SlotSource::Extracted,
                substituted,
            })
        }
        None => {
            let fill = var
                .fill_scalar()?
                .ok_or_else(|| DataError::MissingField(var.name.clone()))?;
            let values = broadcast_scalar(&fill, expected).map_err(DataError::Arrow)?;
            let array = DataArray::new(var.dims.clone(), shape, values, attrs)?;
            Ok(SlotOutcome {
                array,
                source: SlotSource::MissingFilled,
                substituted: expected,
            })
        }
    }
}

/// Casts raw values to the declared dtype and replaces unrepresentable or
/// out-of-valid-bounds samples with the fill value.
///
/// Returns the screened values and the number of substitutions. A slot with
/// no fill value cannot be screened; unrepresentable samples there are a
/// [`DataError`].
fn screen(var: &Variable, values: &ArrayRef) -> Result<(ArrayRef, usize), DataError> {
    let casted = var
        .dtype
        .cast_array(values)
        .map_err(|source| DataError::Cast {
            name: var.name.clone(),
            to: var.dtype.to_string(),
            source,
        })?;
    let fill = var.fill_scalar()?;

    let mut out = casted;
    let mut substituted = 0;
    // Positions already replaced, excluded from later checks so a fill value
    // is never re-flagged or used as a delta baseline.
    let mut screened = fill_nulls(&is_null(&out).map_err(DataError::Arrow)?, true);

    let null_count = out.null_count();
    if null_count > 0 {
        let Some(fill) = &fill else {
            return Err(DataError::Incomplete {
                name: var.name.clone(),
                count: null_count,
                to: var.dtype.to_string(),
            });
        };
        out = substitute(&out, &screened, fill)?;
        substituted += null_count;
    }

    let screenable = var.dtype.is_numeric() || var.dtype == DType::Datetime;
    if screenable {
        if let (Some(fill), Some([min, max])) = (&fill, var.attrs.valid_range) {
            let oob = out_of_range_mask(&out, min, max).map_err(DataError::Arrow)?;
            let oob = and(&oob, &not(&screened).map_err(DataError::Arrow)?)
                .map_err(DataError::Arrow)?;
            let count = oob.true_count();
            if count > 0 {
                out = substitute(&out, &oob, fill)?;
                substituted += count;
                screened = or(&screened, &oob).map_err(DataError::Arrow)?;
            }
        }
        if let (Some(fill), Some(max_delta)) = (&fill, var.attrs.valid_delta) {
            let jumps = delta_mask(&out, max_delta, &screened).map_err(DataError::Arrow)?;
            let count = jumps.true_count();
            if count > 0 {
                out = substitute(&out, &jumps, fill)?;
                substituted += count;
            }
        }
    }

    Ok((out, substituted))
}

fn substitute(
    values: &ArrayRef,
    mask: &BooleanArray,
    fill: &ArrayRef,
) -> Result<ArrayRef, DataError> {
    zip(mask, &Scalar::new(fill.clone()), values).map_err(DataError::Arrow)
}

fn broadcast_scalar(fill: &ArrayRef, n: usize) -> Result<ArrayRef, ArrowError> {
    let indices = UInt32Array::from(vec![0u32; n]);
    take(fill.as_ref(), &indices, None)
}
