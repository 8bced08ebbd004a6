//! Filesystem-backed datastream storage.
//!
//! Layout follows the datastream naming standards:
//!
//! ```text
//! root/
//! └── buoy/                          # location_id
//!     └── buoy.imu.a1/               # datastream_name
//!         └── buoy.imu.a1.20201201.000000.parquet
//! ```
//!
//! Each file is a single Parquet file. Variables are stored as columns,
//! null-padded to the longest slot; the true dims, shapes, and attributes
//! are JSON-encoded in the Parquet footer key-value metadata under
//! `datastd:` keys, so a file round-trips to an identical [`Dataset`] and
//! stays queryable by any Parquet-aware tool.
//!
//! The file timestamp comes from the dataset's own first time value, never
//! the wall clock, so re-processing an input produces the same file name.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{new_null_array, Array, ArrayRef, AsArray};
use arrow::compute::{cast, concat, concat_batches};
use arrow::datatypes::{DataType, Field, Int64Type, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::{DateTime, Utc};
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use serde::{Deserialize, Serialize};

use super::{DatastreamStorage, StorageError};
use crate::config::AttrValue;
use crate::dataset::{DataArray, Dataset};
use crate::standards::{datastream_path, validate_filename};

/// Format version written into every dataset file footer.
pub const DATASTD_FORMAT_VERSION: &str = "1.0";

const KEY_FORMAT_VERSION: &str = "datastd:format_version";
const KEY_DATASTREAM: &str = "datastd:datastream";
const KEY_DATASET_ATTRS: &str = "datastd:dataset_attrs";
const KEY_LAYOUT: &str = "datastd:layout";
const KEY_WRITTEN_AT: &str = "datastd:written_at";

/// Per-slot layout recorded in the footer so the column can be restored to
/// its declared dims and shape.
#[derive(Debug, Serialize, Deserialize)]
struct SlotLayout {
    dims: Vec<String>,
    shape: Vec<usize>,
    attrs: BTreeMap<String, AttrValue>,
    coord: bool,
}

/// Stores datastream files under a root directory.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    /// Creates the storage, ensuring the root directory exists.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The root directory files are stored under.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DatastreamStorage for FilesystemStorage {
    fn save(&self, dataset: &Dataset) -> Result<PathBuf, StorageError> {
        let stamp = first_time_value(dataset)?;
        let dir = datastream_path(&dataset.name, &self.root)?;
        std::fs::create_dir_all(&dir)?;

        let filename = format!(
            "{}.{}.{}.parquet",
            dataset.name,
            stamp.format("%Y%m%d"),
            stamp.format("%H%M%S"),
        );
        validate_filename(&filename)?;

        let path = dir.join(filename);
        write_dataset(&path, dataset)?;
        debug!("wrote {}", path.display());
        Ok(path)
    }

    fn fetch(&self, datastream_name: &str) -> Result<Vec<PathBuf>, StorageError> {
        let dir = datastream_path(datastream_name, &self.root)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            if path.is_file()
                && name.starts_with(datastream_name)
                && validate_filename(name).is_ok()
            {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Writes a standardized dataset as a single Parquet file.
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<(), StorageError> {
    let slots: Vec<(&String, &DataArray, bool)> = dataset
        .coords
        .iter()
        .map(|(name, array)| (name, array, true))
        .chain(
            dataset
                .data_vars
                .iter()
                .map(|(name, array)| (name, array, false)),
        )
        .collect();

    let rows = slots.iter().map(|(_, array, _)| array.len()).max().unwrap_or(0);

    let mut fields = Vec::with_capacity(slots.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(slots.len());
    let mut layout = BTreeMap::new();
    for (name, array, coord) in &slots {
        let data_type = array.values.data_type().clone();
        let padded = if array.len() < rows {
            let padding = new_null_array(&data_type, rows - array.len());
            concat(&[array.values.as_ref(), padding.as_ref()])?
        } else {
            array.values.clone()
        };
        fields.push(Field::new(name.as_str(), data_type, true));
        columns.push(padded);
        layout.insert(
            (*name).clone(),
            SlotLayout {
                dims: array.dims.clone(),
                shape: array.shape.clone(),
                attrs: array.attrs.clone(),
                coord: *coord,
            },
        );
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new_with_options(
        schema.clone(),
        columns,
        &RecordBatchOptions::new().with_row_count(Some(rows)),
    )?;

    let metadata = [
        (KEY_FORMAT_VERSION, DATASTD_FORMAT_VERSION.to_string()),
        (KEY_DATASTREAM, dataset.name.clone()),
        (KEY_DATASET_ATTRS, serde_json::to_string(&dataset.attrs)?),
        (KEY_LAYOUT, serde_json::to_string(&layout)?),
        (KEY_WRITTEN_AT, Utc::now().to_rfc3339()),
    ];
    let kv_metadata: Vec<KeyValue> = metadata
        .into_iter()
        .map(|(key, value)| KeyValue {
            key: key.to_string(),
            value: Some(value),
        })
        .collect();

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(
            ZstdLevel::try_new(3).unwrap_or_else(|_| ZstdLevel::default()),
        ))
        .set_key_value_metadata(Some(kv_metadata))
        .build();

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Reads a dataset file written by [`write_dataset`] back into a [`Dataset`].
pub fn read_dataset(path: &Path) -> Result<Dataset, StorageError> {
    let invalid = |reason: String| StorageError::InvalidFile {
        path: path.display().to_string(),
        reason,
    };

    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let kv: BTreeMap<String, String> = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .map(|kv| {
            kv.iter()
                .filter_map(|item| item.value.clone().map(|v| (item.key.clone(), v)))
                .collect()
        })
        .unwrap_or_default();

    let name = kv
        .get(KEY_DATASTREAM)
        .cloned()
        .ok_or_else(|| invalid(format!("missing '{KEY_DATASTREAM}' footer metadata")))?;
    let attrs: BTreeMap<String, AttrValue> = kv
        .get(KEY_DATASET_ATTRS)
        .map(|json| serde_json::from_str(json))
        .transpose()?
        .unwrap_or_default();
    let layout: BTreeMap<String, SlotLayout> = kv
        .get(KEY_LAYOUT)
        .map(|json| serde_json::from_str(json))
        .transpose()?
        .ok_or_else(|| invalid(format!("missing '{KEY_LAYOUT}' footer metadata")))?;

    let schema = builder.schema().clone();
    let batches: Vec<RecordBatch> = builder
        .build()?
        .collect::<Result<Vec<_>, arrow::error::ArrowError>>()?;
    let combined = concat_batches(&schema, &batches)?;

    let mut coords = BTreeMap::new();
    let mut data_vars = BTreeMap::new();
    for (slot_name, slot) in layout {
        let column = combined
            .column_by_name(&slot_name)
            .ok_or_else(|| invalid(format!("column '{slot_name}' not found")))?;
        let len: usize = slot.shape.iter().product();
        if len > column.len() {
            return Err(invalid(format!(
                "column '{slot_name}' has {} row(s), layout expects {len}",
                column.len()
            )));
        }
        let values = column.slice(0, len);
        let array = DataArray::new(slot.dims, slot.shape, values, slot.attrs)
            .map_err(|err| invalid(err.to_string()))?;
        if slot.coord {
            coords.insert(slot_name, array);
        } else {
            data_vars.insert(slot_name, array);
        }
    }

    Ok(Dataset {
        name,
        coords,
        data_vars,
        attrs,
    })
}

/// First value of the time coordinate as a UTC timestamp.
fn first_time_value(dataset: &Dataset) -> Result<DateTime<Utc>, StorageError> {
    let time = dataset
        .coords
        .get("time")
        .ok_or_else(|| StorageError::NoTimeCoordinate(dataset.name.clone()))?;
    if time.is_empty() {
        return Err(StorageError::EmptyTimeCoordinate(dataset.name.clone()));
    }
    let seconds = cast(&time.values, &DataType::Int64)?;
    let seconds = seconds.as_primitive::<Int64Type>();
    DateTime::from_timestamp(seconds.value(0), 0)
        .ok_or_else(|| StorageError::EmptyTimeCoordinate(dataset.name.clone()))
}
