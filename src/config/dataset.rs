//! The aggregate dataset schema: coordinates, data variables, and global
//! attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::attributes::AttrValue;
use super::variables::{Coordinate, Variable};
use crate::error::DefinitionError;
use crate::units::UnitRegistry;

/// The `dataset` section of a configuration document.
///
/// Coordinates and data variables are two disjoint name-to-definition
/// mappings; declaring the same name in both is a [`DefinitionError`]. The
/// finalized config is an immutable template shared by every run of the
/// pipeline — extraction writes into fresh per-run structures and never
/// mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    /// Global attributes copied onto the output dataset.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttrValue>,

    /// Coordinate definitions, keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub coords: BTreeMap<String, Coordinate>,

    /// Data variable definitions, keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data_vars: BTreeMap<String, Variable>,
}

impl DatasetConfig {
    /// Second construction phase: adopts mapping keys as slot names and
    /// enforces the cross-slot invariants.
    pub fn finalize(&mut self, units: &UnitRegistry) -> Result<(), DefinitionError> {
        for (name, coord) in &mut self.coords {
            coord.finalize(name, units)?;
        }
        for (name, var) in &mut self.data_vars {
            var.finalize(name, units)?;
        }
        for (name, var) in &self.data_vars {
            if self.coords.contains_key(name) {
                return Err(DefinitionError::NameCollision(name.clone()));
            }
            for dim in &var.dims {
                if !self.coords.contains_key(dim) {
                    return Err(DefinitionError::UnknownDimension {
                        name: name.clone(),
                        dim: dim.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Looks up a definition by name in either mapping.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.coords
            .get(name)
            .map(|c| &c.0)
            .or_else(|| self.data_vars.get(name))
    }
}
