//! # datastd - Instrument Data Standardization
//!
//! `datastd` turns raw instrument data into self-describing, standards-
//! conformant datasets. You declare the expected shape of your data once, in
//! a YAML configuration document — coordinates, variables, dtypes, units,
//! and quality-control ranges — and the engine reconciles every raw file
//! against that declaration, producing an output dataset that satisfies the
//! schema's invariants or failing with a precise diagnostic.
//!
//! ## Key Features
//!
//! - **Declarative schemas**: the configuration document is a closed, typed
//!   model. Unknown attribute keys, illegal names, unordered ranges, and
//!   missing units all fail at load time, before any data is touched.
//!
//! - **Declared-complete output**: raw values are cast to the declared
//!   dtype, and samples that are missing, unrepresentable, or outside the
//!   `valid_*` bounds are replaced with the variable's fill value, so
//!   downstream consumers never see surprise gaps.
//!
//! - **Quality flags**: `fail_*` and `warn_*` bounds become companion
//!   `qc_<name>` flag variables instead of altering the data.
//!
//! - **Conventions validation**: every run ends with a structured,
//!   check-by-check standards report; failures carry the whole report.
//!
//! - **Datastream naming**: outputs are named
//!   `location.instrument[-qualifier][-temporal].level` and stored in a
//!   predictable per-datastream layout, one Parquet file per run, readable
//!   by any Parquet-aware tool.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use arrow::array::{ArrayRef, Float64Array, Int64Array};
//! use datastd::config::Config;
//! use datastd::dataset::RawDataset;
//! use datastd::pipeline::IngestPipeline;
//! use datastd::storage::FilesystemStorage;
//! use datastd::units::UnitRegistry;
//!
//! let yaml = r#"
//! pipeline:
//!   type: Ingest
//!   location_id: buoy
//!   instrument_id: imu
//! dataset:
//!   attrs:
//!     title: IMU ingest
//!   coords:
//!     time:
//!       dtype: datetime
//!       dims: [time]
//!       attrs:
//!         units: "Seconds since 1970-01-01 00:00:00"
//!   data_vars:
//!     pitch:
//!       dtype: float
//!       dims: [time]
//!       attrs:
//!         units: degree
//!         valid_range: [-180.0, 180.0]
//! "#;
//!
//! let units = UnitRegistry::standard();
//! let config = Config::from_yaml_str(yaml, &units)?;
//!
//! let mut raw = RawDataset::new();
//! let time: ArrayRef = Arc::new(Int64Array::from(vec![0, 10, 20]));
//! let pitch: ArrayRef = Arc::new(Float64Array::from(vec![1.0, 2.0, 720.0]));
//! raw.insert("time", time);
//! raw.insert("pitch", pitch);
//!
//! let storage = FilesystemStorage::new("storage/root")?;
//! let pipeline = IngestPipeline::new(config, storage);
//!
//! let (dataset, summary) = pipeline.standardize(&raw)?;
//! assert_eq!(dataset.name, "buoy.imu.a1");
//! // 720.0 is outside valid_range and was replaced with the fill value.
//! assert_eq!(summary.total_substituted(), 1);
//! # Ok::<(), datastd::error::PipelineError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`config`]: the typed configuration model (attributes, variables,
//!   coordinates, pipeline identity, dataset schema)
//! - [`units`]: the unit-algebra registry backing unit sanity checks
//! - [`dataset`]: in-memory containers for raw and standardized data
//! - [`pipeline`]: the standardization engine
//! - [`qc`]: quality-check operators and flag annotation
//! - [`standards`]: the conventions validator and naming grammar
//! - [`storage`]: datastream storage collaborators
//! - [`io`]: raw input readers (header CSV)
//!
//! ## Error Model
//!
//! Schema problems are [`error::DefinitionError`]s and fail configuration
//! loading; per-file problems are [`error::DataError`]s attributing the
//! failing slot, so one bad file never poisons a batch. Unparseable unit
//! strings are warnings, kept verbatim.

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod qc;
pub mod standards;
pub mod storage;
pub mod units;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{
        AttrValue, Config, Coordinate, DType, DatasetConfig, LiteralData, LiteralValue,
        PipelineConfig, PipelineType, Variable, VariableAttributes,
    };
    pub use crate::dataset::{DataArray, Dataset, RawDataset, RawField};
    pub use crate::error::{DataError, DefinitionError, PipelineError};
    pub use crate::io::read_raw_csv;
    pub use crate::pipeline::{IngestPipeline, Pipeline, RunStage, RunSummary};
    pub use crate::standards::{
        DatasetValidator, Standards, ValidationCheck, ValidationError, ValidationReport,
    };
    pub use crate::storage::{
        read_dataset, write_dataset, DatastreamStorage, FilesystemStorage, StorageError,
    };
    pub use crate::units::{UnitError, UnitRegistry};
}
