//! Quality-flag annotation.
//!
//! The `valid_*` bounds are enforced during extraction (bad samples become
//! fill values). The `fail_*` and `warn_*` bounds declared on a variable do
//! not alter the data; instead this module records them as a companion
//! `qc_<name>` flag variable so downstream consumers can filter on
//! assessment severity.
//!
//! Flag bits:
//!
//! | Bit | Meaning |
//! |-----|---------|
//! | 1   | sample is missing (fill value) |
//! | 2   | sample outside `fail_range` or jump above `fail_delta` |
//! | 4   | sample outside `warn_range` or jump above `warn_delta` |

pub mod operators;

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{Array, BooleanArray, Int32Array};
use arrow::compute::kernels::boolean::or;

use crate::config::{AttrValue, DatasetConfig, Variable};
use crate::dataset::{DataArray, Dataset};
use crate::error::DataError;

/// Flag bit for missing samples.
pub const QC_BIT_MISSING: i32 = 1;
/// Flag bit for samples failing the `fail_*` bounds.
pub const QC_BIT_FAIL: i32 = 2;
/// Flag bit for samples failing the `warn_*` bounds.
pub const QC_BIT_WARN: i32 = 4;

/// Space-separated meanings matching the flag bits, CF style.
const FLAG_MEANINGS: &str = "missing_or_invalid fail_limits_exceeded warn_limits_exceeded";

/// Adds `qc_<name>` flag variables for every data variable that declares
/// `fail_*` or `warn_*` bounds, and links them via `ancillary_variables`.
///
/// Variables whose qc slot name is already taken are left alone.
pub fn annotate(definition: &DatasetConfig, dataset: &mut Dataset) -> Result<(), DataError> {
    let mut flags = Vec::new();
    for (name, var) in &definition.data_vars {
        if !wants_flags(var) {
            continue;
        }
        let qc_name = format!("qc_{name}");
        if dataset.get(&qc_name).is_some() {
            continue;
        }
        let Some(array) = dataset.data_vars.get(name) else {
            continue;
        };
        flags.push((name.clone(), qc_name, build_flags(var, array)?));
    }

    for (parent, qc_name, qc_array) in flags {
        if let Some(parent_array) = dataset.data_vars.get_mut(&parent) {
            parent_array.attrs.insert(
                "ancillary_variables".to_string(),
                AttrValue::Str(qc_name.clone()),
            );
        }
        dataset.data_vars.insert(qc_name, qc_array);
    }
    Ok(())
}

fn wants_flags(var: &Variable) -> bool {
    let attrs = &var.attrs;
    attrs.fail_range.is_some()
        || attrs.warn_range.is_some()
        || attrs.fail_delta.is_some()
        || attrs.warn_delta.is_some()
}

fn build_flags(var: &Variable, array: &DataArray) -> Result<DataArray, DataError> {
    let values = &array.values;
    let fill = var.fill_scalar()?;
    let missing = operators::missing_mask(values, fill.as_ref())?;

    let fail = tier_mask(var, values, &missing, var.attrs.fail_range, var.attrs.fail_delta)?;
    let warn = tier_mask(var, values, &missing, var.attrs.warn_range, var.attrs.warn_delta)?;

    let mut bits = vec![0i32; values.len()];
    apply_bit(&mut bits, &missing, QC_BIT_MISSING);
    apply_bit(&mut bits, &fail, QC_BIT_FAIL);
    apply_bit(&mut bits, &warn, QC_BIT_WARN);

    let mut attrs = BTreeMap::new();
    let label = var.attrs.long_name.as_deref().unwrap_or(&var.name);
    attrs.insert(
        "long_name".to_string(),
        AttrValue::Str(format!("Quality check results for {label}")),
    );
    attrs.insert("units".to_string(), AttrValue::Str("1".to_string()));
    attrs.insert(
        "standard_name".to_string(),
        AttrValue::Str("quality_flag".to_string()),
    );
    attrs.insert(
        "flag_masks".to_string(),
        AttrValue::List(vec![
            AttrValue::Int(QC_BIT_MISSING as i64),
            AttrValue::Int(QC_BIT_FAIL as i64),
            AttrValue::Int(QC_BIT_WARN as i64),
        ]),
    );
    attrs.insert(
        "flag_meanings".to_string(),
        AttrValue::Str(FLAG_MEANINGS.to_string()),
    );

    DataArray::new(
        array.dims.clone(),
        array.shape.clone(),
        Arc::new(Int32Array::from(bits)),
        attrs,
    )
}

fn tier_mask(
    var: &Variable,
    values: &arrow::array::ArrayRef,
    missing: &BooleanArray,
    range: Option<[f64; 2]>,
    delta: Option<f64>,
) -> Result<BooleanArray, DataError> {
    if !var.dtype.is_numeric() && var.dtype != crate::config::DType::Datetime {
        return Ok(BooleanArray::from(vec![false; values.len()]));
    }
    let mut mask = BooleanArray::from(vec![false; values.len()]);
    if let Some([min, max]) = range {
        let oob = operators::out_of_range_mask(values, min, max)?;
        mask = or(&mask, &oob)?;
    }
    if let Some(max_delta) = delta {
        let jumps = operators::delta_mask(values, max_delta, missing)?;
        mask = or(&mask, &jumps)?;
    }
    // Missing samples carry only the missing bit.
    let not_missing: BooleanArray = missing.iter().map(|v| Some(!v.unwrap_or(false))).collect();
    Ok(arrow::compute::kernels::boolean::and(&mask, &not_missing)?)
}

fn apply_bit(bits: &mut [i32], mask: &BooleanArray, bit: i32) {
    for (i, flag) in mask.iter().enumerate() {
        if flag.unwrap_or(false) {
            bits[i] |= bit;
        }
    }
}
