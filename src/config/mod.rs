//! Typed configuration model.
//!
//! A configuration document declares, in YAML, the pipeline identity and the
//! full schema of the output dataset: coordinates, data variables, their
//! dtypes, dimensions, attributes, and quality-control ranges. Loading the
//! document is the only place the schema can fail — a finalized [`Config`]
//! is guaranteed internally consistent, so standardization errors can only
//! come from the raw data.
//!
//! Construction is two-phase throughout the model: serde populates the typed
//! fields (rejecting unknown keys), then `finalize` runs the ordered
//! cross-field invariant checks and derives defaults (fill values, data
//! levels, datastream names).

mod attributes;
mod dataset;
mod pipeline;
mod variables;

#[cfg(test)]
mod tests;

use std::path::Path;

use serde::Deserialize;

pub use attributes::{AttrValue, LiteralValue, VariableAttributes, UNKNOWN_UNITS_PHRASE};
pub use dataset::DatasetConfig;
pub use pipeline::{PipelineConfig, PipelineType};
pub use variables::{Coordinate, DType, LiteralData, Variable};

use crate::error::DefinitionError;
use crate::units::UnitRegistry;

/// A fully-validated configuration: pipeline identity plus dataset schema.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Naming and classification of the pipeline.
    pub pipeline: PipelineConfig,

    /// The declared output dataset schema.
    pub dataset: DatasetConfig,
}

impl Config {
    /// Parses and finalizes a configuration from YAML text.
    ///
    /// Multi-document files are merged top-to-bottom, later keys winning,
    /// so a shared preamble can be combined with per-deployment overrides.
    pub fn from_yaml_str(text: &str, units: &UnitRegistry) -> Result<Self, DefinitionError> {
        let mut merged = serde_yaml::Mapping::new();
        Self::merge_documents(text, &mut merged)?;
        Self::from_mapping(merged, units)
    }

    /// Loads and merges one or more YAML configuration files.
    pub fn load_files<P: AsRef<Path>>(
        paths: &[P],
        units: &UnitRegistry,
    ) -> Result<Self, DefinitionError> {
        let mut merged = serde_yaml::Mapping::new();
        for path in paths {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Self::merge_documents(&text, &mut merged)?;
        }
        Self::from_mapping(merged, units)
    }

    fn merge_documents(
        text: &str,
        merged: &mut serde_yaml::Mapping,
    ) -> Result<(), DefinitionError> {
        for document in serde_yaml::Deserializer::from_str(text) {
            let value = serde_yaml::Value::deserialize(document)?;
            match value {
                serde_yaml::Value::Mapping(mapping) => {
                    for (key, value) in mapping {
                        merged.insert(key, value);
                    }
                }
                serde_yaml::Value::Null => {}
                _ => return Err(DefinitionError::NotAMapping),
            }
        }
        Ok(())
    }

    fn from_mapping(
        mapping: serde_yaml::Mapping,
        units: &UnitRegistry,
    ) -> Result<Self, DefinitionError> {
        let mut config: Config =
            serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))?;
        config.finalize(units)?;
        Ok(config)
    }

    fn finalize(&mut self, units: &UnitRegistry) -> Result<(), DefinitionError> {
        self.pipeline.finalize()?;
        self.dataset.finalize(units)?;
        Ok(())
    }
}
