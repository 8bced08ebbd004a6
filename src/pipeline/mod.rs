//! The standardization engine.
//!
//! A pipeline owns a finalized [`Config`], a storage collaborator, and a
//! conventions validator. Each run is an independent, synchronous, in-memory
//! transform of one raw dataset:
//!
//! ```text
//! Raw -> Extracting -> Assembled -> Validating -> Standardized
//! ```
//!
//! Coordinates are always extracted before data variables, because variable
//! extraction needs the coordinate sizes for dimension-length checks. A
//! failure at any stage carries the originating error; no partial output is
//! usable. The shared config template is never mutated, so a surrounding
//! driver may run many files sequentially (or in separate processes) against
//! one pipeline value.

mod extract;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::config::{AttrValue, Config};
use crate::dataset::{Dataset, RawDataset};
use crate::error::{DataError, PipelineError};
use crate::qc;
use crate::standards::{DatasetValidator, Standards};
use crate::storage::DatastreamStorage;

pub use extract::{SlotOutcome, SlotSource};

/// Stages of a standardization run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Nothing processed yet.
    Raw,
    /// Iterating the schema's coordinates, then variables.
    Extracting,
    /// Output dataset built from the populated schema.
    Assembled,
    /// Conventions validator running.
    Validating,
    /// Terminal success.
    Standardized,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            RunStage::Raw => "raw",
            RunStage::Extracting => "extracting",
            RunStage::Assembled => "assembled",
            RunStage::Validating => "validating",
            RunStage::Standardized => "standardized",
        };
        f.write_str(stage)
    }
}

/// What happened to each declared slot during one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Slots populated from raw fields.
    pub extracted: Vec<String>,

    /// Slots populated from literal data in the definition.
    pub literals: Vec<String>,

    /// Declared variables absent from the raw dataset, initialized to their
    /// fill value. Surfaced so the conventions layer and operators can see
    /// exactly which names were missing.
    pub missing: Vec<String>,

    /// Fill-value substitution counts per slot (missing, unrepresentable,
    /// or outside the `valid_*` bounds).
    pub substituted: BTreeMap<String, usize>,
}

impl RunSummary {
    /// Total fill-value substitutions across all slots.
    pub fn total_substituted(&self) -> usize {
        self.substituted.values().sum()
    }

    fn record(&mut self, name: &str, outcome: &SlotOutcome) {
        match outcome.source {
            SlotSource::Extracted => self.extracted.push(name.to_string()),
            SlotSource::Literal => self.literals.push(name.to_string()),
            SlotSource::MissingFilled => self.missing.push(name.to_string()),
        }
        if outcome.substituted > 0 {
            self.substituted.insert(name.to_string(), outcome.substituted);
        }
    }
}

/// A pipeline: one required operation turning a raw dataset into a persisted
/// standardized dataset.
pub trait Pipeline {
    /// Processes one raw dataset and returns the storage location of the
    /// standardized result.
    fn run(&self, raw: &RawDataset) -> Result<PathBuf, PipelineError>;
}

/// The standard ingest pipeline: standardize, annotate quality flags,
/// validate, save.
///
/// The conventions validator is an injected collaborator rather than an
/// overridable method; swap in a different [`DatasetValidator`] to apply a
/// different ruleset.
#[derive(Debug)]
pub struct IngestPipeline<S, V = Standards> {
    config: Config,
    storage: S,
    validator: V,
}

impl<S: DatastreamStorage> IngestPipeline<S, Standards> {
    /// Creates a pipeline with the default [`Standards`] validator.
    pub fn new(config: Config, storage: S) -> Self {
        Self::with_validator(config, storage, Standards)
    }
}

impl<S: DatastreamStorage, V: DatasetValidator> IngestPipeline<S, V> {
    /// Creates a pipeline with a custom conventions validator.
    pub fn with_validator(config: Config, storage: S, validator: V) -> Self {
        Self {
            config,
            storage,
            validator,
        }
    }

    /// The pipeline's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Standardizes one raw dataset against the declared schema.
    ///
    /// Returns the validated dataset together with a [`RunSummary`] of how
    /// each slot was populated. The run is deterministic: the same raw input
    /// and schema always produce an identical dataset.
    pub fn standardize(
        &self,
        raw: &RawDataset,
    ) -> Result<(Dataset, RunSummary), PipelineError> {
        let definition = &self.config.dataset;
        let datastream = self.config.pipeline.output_datastream_name();
        let mut summary = RunSummary::default();

        debug!("{datastream}: run stage: {}", RunStage::Extracting);
        let mut coords = BTreeMap::new();
        let mut dim_sizes = BTreeMap::new();
        for (name, coord) in &definition.coords {
            let outcome = extract::coordinate_slot(coord, raw)?;
            summary.record(name, &outcome);
            dim_sizes.insert(name.clone(), outcome.array.len());
            coords.insert(name.clone(), outcome.array);
        }

        let mut data_vars = BTreeMap::new();
        for (name, var) in &definition.data_vars {
            let outcome = extract::variable_slot(var, raw, &dim_sizes)?;
            summary.record(name, &outcome);
            data_vars.insert(name.clone(), outcome.array);
        }

        debug!("{datastream}: run stage: {}", RunStage::Assembled);
        let mut attrs = definition.attrs.clone();
        attrs.insert("datastream".to_string(), AttrValue::Str(datastream.clone()));
        let dataset = Dataset {
            name: datastream.clone(),
            coords,
            data_vars,
            attrs,
        };

        debug!("{datastream}: run stage: {}", RunStage::Validating);
        self.validator
            .validate(&dataset)
            .map_err(DataError::from)?;

        debug!("{datastream}: run stage: {}", RunStage::Standardized);
        Ok((dataset, summary))
    }
}

impl<S: DatastreamStorage, V: DatasetValidator> Pipeline for IngestPipeline<S, V> {
    fn run(&self, raw: &RawDataset) -> Result<PathBuf, PipelineError> {
        let (mut dataset, summary) = self.standardize(raw)?;
        qc::annotate(&self.config.dataset, &mut dataset)?;

        if !summary.missing.is_empty() {
            warn!(
                "{}: {} declared variable(s) missing from the raw input: {:?}",
                dataset.name,
                summary.missing.len(),
                summary.missing
            );
        }
        let substituted = summary.total_substituted();
        if substituted > 0 {
            debug!("{}: {substituted} sample(s) replaced with fill values", dataset.name);
        }

        let path = self.storage.save(&dataset)?;
        info!("{}: saved to {}", dataset.name, path.display());
        Ok(path)
    }
}
