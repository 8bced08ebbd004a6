//! In-memory dataset containers.
//!
//! [`RawDataset`] is the input contract: named fields with Arrow-backed
//! array values, produced by an external parser or the bundled CSV reader.
//! [`Dataset`] is the standardized output: self-dimensioned coordinates,
//! dimensioned data variables, and attribute maps at both levels. Arrays are
//! stored flattened in row-major order with an explicit shape, so a slot can
//! be multi-dimensional (e.g. `[time, depth]`) while remaining a single
//! Arrow array.

use std::collections::BTreeMap;

use arrow::array::{Array, ArrayRef};

use crate::config::AttrValue;
use crate::error::DataError;

/// One named array in a dataset: dims, shape, flattened values, attributes.
#[derive(Debug, Clone)]
pub struct DataArray {
    /// Ordered dimension names.
    pub dims: Vec<String>,

    /// Length along each dimension; `shape.product() == values.len()`.
    pub shape: Vec<usize>,

    /// Flattened row-major values.
    pub values: ArrayRef,

    /// Attributes recorded on this array.
    pub attrs: BTreeMap<String, AttrValue>,
}

impl DataArray {
    /// Creates an array, checking that the shape accounts for every value.
    pub fn new(
        dims: Vec<String>,
        shape: Vec<usize>,
        values: ArrayRef,
        attrs: BTreeMap<String, AttrValue>,
    ) -> Result<Self, DataError> {
        let expected: usize = shape.iter().product();
        if expected != values.len() || dims.len() != shape.len() {
            return Err(DataError::ShapeMismatch {
                shape,
                len: values.len(),
            });
        }
        Ok(Self {
            dims,
            shape,
            values,
            attrs,
        })
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the array holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for DataArray {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims
            && self.shape == other.shape
            && self.attrs == other.attrs
            && self.values.to_data() == other.values.to_data()
    }
}

/// A standardized, self-describing dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// The datastream name this dataset belongs to.
    pub name: String,

    /// Coordinates, keyed by name. Each is one-dimensional and dimensions
    /// itself.
    pub coords: BTreeMap<String, DataArray>,

    /// Data variables, keyed by name.
    pub data_vars: BTreeMap<String, DataArray>,

    /// Global attributes.
    pub attrs: BTreeMap<String, AttrValue>,
}

impl Dataset {
    /// Length of a dimension, taken from its coordinate.
    pub fn dim_len(&self, dim: &str) -> Option<usize> {
        self.coords.get(dim).map(DataArray::len)
    }

    /// Looks up a coordinate or data variable by name.
    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.coords.get(name).or_else(|| self.data_vars.get(name))
    }
}

/// One named field of a raw input dataset.
#[derive(Debug, Clone)]
pub struct RawField {
    /// Flattened row-major values.
    pub values: ArrayRef,

    /// Length along each dimension of the raw field.
    pub shape: Vec<usize>,
}

impl RawField {
    /// Wraps a one-dimensional array as a raw field.
    pub fn from_array(values: ArrayRef) -> Self {
        let shape = vec![values.len()];
        Self { values, shape }
    }

    /// Wraps flattened values with an explicit multi-dimensional shape.
    pub fn with_shape(values: ArrayRef, shape: Vec<usize>) -> Result<Self, DataError> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(DataError::ShapeMismatch {
                shape,
                len: values.len(),
            });
        }
        Ok(Self { values, shape })
    }
}

/// A raw in-memory dataset: named fields with array values.
///
/// This is everything the standardization engine requires of its input; how
/// the fields were parsed out of an instrument file is not its concern.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    /// The named fields, keyed by raw field name.
    pub fields: BTreeMap<String, RawField>,
}

impl RawDataset {
    /// Creates an empty raw dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a one-dimensional field.
    pub fn insert(&mut self, name: impl Into<String>, values: ArrayRef) {
        self.fields.insert(name.into(), RawField::from_array(values));
    }

    /// Adds a field with an explicit shape.
    pub fn insert_field(&mut self, name: impl Into<String>, field: RawField) {
        self.fields.insert(name.into(), field);
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&RawField> {
        self.fields.get(name)
    }
}
