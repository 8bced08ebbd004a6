//! Pure quality-check operators.
//!
//! Each operator inspects a slot's values and returns a boolean failure mask
//! (true = the sample failed the check). Operators never modify data; the
//! extraction engine and the flag annotator decide what a failure means
//! (fill substitution or a quality-flag bit).

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array, Scalar};
use arrow::compute::cast;
use arrow::compute::kernels::boolean::{is_null, or};
use arrow::compute::kernels::cmp::{eq, gt, lt};
use arrow::datatypes::{DataType, Float64Type};
use arrow::error::ArrowError;

/// Casts values to `f64` for threshold comparisons. Timestamps compare by
/// their epoch-second value.
pub(crate) fn to_f64(values: &ArrayRef) -> Result<Float64Array, ArrowError> {
    let values = match values.data_type() {
        DataType::Timestamp(_, _) => cast(values, &DataType::Int64)?,
        _ => values.clone(),
    };
    let floats = cast(&values, &DataType::Float64)?;
    Ok(floats.as_primitive::<Float64Type>().clone())
}

/// Replaces null mask entries with `default`, so downstream boolean algebra
/// and selection kernels see a dense mask.
pub(crate) fn fill_nulls(mask: &BooleanArray, default: bool) -> BooleanArray {
    if mask.null_count() == 0 {
        return mask.clone();
    }
    mask.iter().map(|v| Some(v.unwrap_or(default))).collect()
}

/// True where a sample is missing: null, or equal to the fill sentinel.
pub fn missing_mask(
    values: &ArrayRef,
    fill: Option<&ArrayRef>,
) -> Result<BooleanArray, ArrowError> {
    let mut mask = fill_nulls(&is_null(values)?, true);
    if let Some(fill) = fill {
        let equals_fill = eq(values, &Scalar::new(fill.clone()))?;
        mask = or(&mask, &fill_nulls(&equals_fill, false))?;
    }
    Ok(mask)
}

/// True where a sample falls outside `[min, max]`.
///
/// Null samples are not flagged here; pair with [`missing_mask`].
pub fn out_of_range_mask(
    values: &ArrayRef,
    min: f64,
    max: f64,
) -> Result<BooleanArray, ArrowError> {
    let floats = to_f64(values)?;
    let below = lt(&floats, &Float64Array::new_scalar(min))?;
    let above = gt(&floats, &Float64Array::new_scalar(max))?;
    or(&fill_nulls(&below, false), &fill_nulls(&above, false))
}

/// True where the jump from the previous sample exceeds `max_delta`.
///
/// Samples marked in `exclude` (already missing or invalid) neither trigger
/// the check nor serve as the comparison baseline, matching how screened
/// data should be read: a fill value is not a physical jump.
pub fn delta_mask(
    values: &ArrayRef,
    max_delta: f64,
    exclude: &BooleanArray,
) -> Result<BooleanArray, ArrowError> {
    let floats = to_f64(values)?;
    let n = floats.len();
    let mut flags = vec![false; n];
    for i in 1..n {
        if exclude.value(i) || exclude.value(i - 1) {
            continue;
        }
        if floats.is_null(i) || floats.is_null(i - 1) {
            continue;
        }
        if (floats.value(i) - floats.value(i - 1)).abs() > max_delta {
            flags[i] = true;
        }
    }
    Ok(BooleanArray::from(flags))
}

/// True when the values never decrease, the expectation for a time
/// coordinate.
pub fn is_non_decreasing(values: &ArrayRef) -> Result<bool, ArrowError> {
    let floats = to_f64(values)?;
    for i in 1..floats.len() {
        if floats.is_null(i) || floats.is_null(i - 1) {
            continue;
        }
        if floats.value(i) < floats.value(i - 1) {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int32Array};
    use std::sync::Arc;

    fn array(values: Vec<Option<f64>>) -> ArrayRef {
        Arc::new(Float64Array::from(values))
    }

    #[test]
    fn missing_mask_flags_nulls_and_fill_sentinels() {
        let values = array(vec![Some(1.0), None, Some(-9999.0), Some(4.0)]);
        let fill: ArrayRef = Arc::new(Float64Array::from(vec![-9999.0]));
        let mask = missing_mask(&values, Some(&fill)).unwrap();
        assert_eq!(
            mask.iter().map(|v| v.unwrap()).collect::<Vec<_>>(),
            vec![false, true, true, false]
        );
    }

    #[test]
    fn out_of_range_mask_is_inclusive_at_the_bounds() {
        let values = array(vec![Some(-1.0), Some(0.0), Some(10.0), Some(10.5)]);
        let mask = out_of_range_mask(&values, 0.0, 10.0).unwrap();
        assert_eq!(
            mask.iter().map(|v| v.unwrap()).collect::<Vec<_>>(),
            vec![true, false, false, true]
        );
    }

    #[test]
    fn delta_mask_skips_excluded_baselines() {
        let values = array(vec![Some(1.0), Some(2.0), Some(50.0), Some(51.0)]);
        let exclude = BooleanArray::from(vec![false, false, true, false]);
        let mask = delta_mask(&values, 5.0, &exclude).unwrap();
        // 2.0 -> 50.0 is excluded; 50.0 -> 51.0 uses an excluded baseline.
        assert_eq!(
            mask.iter().map(|v| v.unwrap()).collect::<Vec<_>>(),
            vec![false, false, false, false]
        );

        let no_exclusions = BooleanArray::from(vec![false; 4]);
        let mask = delta_mask(&values, 5.0, &no_exclusions).unwrap();
        assert_eq!(
            mask.iter().map(|v| v.unwrap()).collect::<Vec<_>>(),
            vec![false, false, true, false]
        );
    }

    #[test]
    fn non_decreasing_accepts_ties() {
        let increasing: ArrayRef = Arc::new(Int32Array::from(vec![1, 2, 2, 3]));
        assert!(is_non_decreasing(&increasing).unwrap());

        let decreasing: ArrayRef = Arc::new(Int32Array::from(vec![1, 3, 2]));
        assert!(!is_non_decreasing(&decreasing).unwrap());
    }
}
