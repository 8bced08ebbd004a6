//! Pipeline identity: type, data levels, and derived datastream names.

use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;

/// Processing stage this pipeline implements.
///
/// Any other value in the configuration document fails deserialization with
/// an error naming the two valid choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineType {
    /// Raw instrument input to a standardized dataset.
    Ingest,
    /// Value-added product derived from already-standardized input.
    #[serde(rename = "VAP")]
    Vap,
}

impl PipelineType {
    /// Data level consumed by default: `"00"` for Ingest, `"a1"` for VAP.
    pub fn default_input_level(self) -> &'static str {
        match self {
            PipelineType::Ingest => "00",
            PipelineType::Vap => "a1",
        }
    }

    /// Data level produced by default: `"a1"` for Ingest, `"b1"` for VAP.
    pub fn default_output_level(self) -> &'static str {
        match self {
            PipelineType::Ingest => "a1",
            PipelineType::Vap => "b1",
        }
    }
}

/// Characters that separate datastream name components and are therefore
/// forbidden inside them.
const ILLEGAL_COMPONENT_CHARS: [char; 3] = ['.', '-', ' '];

/// The naming and classification section of a configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Pipeline kind; drives the default data levels.
    #[serde(rename = "type")]
    pub pipeline_type: PipelineType,

    /// Override for the consumed data level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data_level: Option<String>,

    /// Override for the produced data level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data_level: Option<String>,

    /// Where the instrument is deployed (e.g. `buoy`).
    pub location_id: String,

    /// Which instrument produced the data (e.g. `imu`).
    pub instrument_id: String,

    /// Optional qualifier distinguishing multiple instances (e.g. `z06`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub qualifier: String,

    /// Optional temporal resolution component (e.g. `10m`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub temporal: String,
}

impl PipelineConfig {
    /// Checks the naming components for illegal characters.
    ///
    /// All four components are checked together and every offender is
    /// reported in one error, so a bad configuration is fixed in a single
    /// round-trip.
    pub fn finalize(&self) -> Result<(), DefinitionError> {
        let components = [
            &self.location_id,
            &self.instrument_id,
            &self.qualifier,
            &self.temporal,
        ];
        let bad: Vec<String> = components
            .into_iter()
            .filter(|c| c.contains(&ILLEGAL_COMPONENT_CHARS[..]))
            .cloned()
            .collect();
        if bad.is_empty() {
            Ok(())
        } else {
            Err(DefinitionError::IllegalNameComponents { components: bad })
        }
    }

    /// Data level consumed by this pipeline (override or type default).
    pub fn input_data_level(&self) -> &str {
        self.input_data_level
            .as_deref()
            .unwrap_or_else(|| self.pipeline_type.default_input_level())
    }

    /// Data level produced by this pipeline (override or type default).
    pub fn output_data_level(&self) -> &str {
        self.output_data_level
            .as_deref()
            .unwrap_or_else(|| self.pipeline_type.default_output_level())
    }

    /// `location_id.instrument_id[-qualifier][-temporal]`, shared by the
    /// input and output datastream names.
    pub fn base_datastream_name(&self) -> String {
        let mut base = format!("{}.{}", self.location_id, self.instrument_id);
        if !self.qualifier.is_empty() {
            base.push('-');
            base.push_str(&self.qualifier);
        }
        if !self.temporal.is_empty() {
            base.push('-');
            base.push_str(&self.temporal);
        }
        base
    }

    /// Datastream name of the data this pipeline consumes.
    pub fn input_datastream_name(&self) -> String {
        format!("{}.{}", self.base_datastream_name(), self.input_data_level())
    }

    /// Datastream name of the data this pipeline produces.
    pub fn output_datastream_name(&self) -> String {
        format!("{}.{}", self.base_datastream_name(), self.output_data_level())
    }
}
