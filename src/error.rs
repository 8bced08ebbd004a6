//! Error taxonomy for the standardization engine.
//!
//! Two error kinds are kept strictly apart:
//!
//! - [`DefinitionError`]: the configuration/schema itself is invalid. Always
//!   fatal at configuration-load time and never silently defaulted.
//! - [`DataError`]: a specific raw input cannot satisfy an otherwise-valid
//!   schema. Reported per run with the failing slot name; one bad input file
//!   must not poison the processing of the next.
//!
//! Non-fatal conditions (e.g. an unparseable unit string) are downgraded to
//! `log::warn!` rather than surfaced through either type.

use arrow::error::ArrowError;

/// The configuration or schema definition is invalid.
///
/// These errors are raised while loading and finalizing a configuration
/// document, before any raw data is touched.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// The YAML document could not be parsed or did not match the model.
    #[error("invalid configuration document: {0}")]
    Document(#[from] serde_yaml::Error),

    /// A configuration document whose root is not a mapping.
    #[error("configuration document root must be a mapping")]
    NotAMapping,

    /// A configuration file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    Io {
        /// Path of the unreadable file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A variable or coordinate name contains characters outside the
    /// permitted set (alphanumerics, underscore, and `( ) [ ] { } . /`).
    #[error("'{0}' is not a valid variable name")]
    InvalidName(String),

    /// A coordinate that is not dimensioned by itself.
    #[error("coord '{name}' must have dims ['{name}']. Found: {dims:?}")]
    CoordinateDims {
        /// Name of the offending coordinate.
        name: String,
        /// The dims that were actually declared.
        dims: Vec<String>,
    },

    /// A variable that lists the same dimension twice.
    #[error("variable '{name}' repeats dimension '{dim}'")]
    DuplicateDimension {
        /// Name of the offending variable.
        name: String,
        /// The repeated dimension.
        dim: String,
    },

    /// A variable dimensioned by a coordinate that is not declared.
    #[error("variable '{name}' references undeclared coordinate '{dim}'")]
    UnknownDimension {
        /// Name of the offending variable.
        name: String,
        /// The undeclared dimension.
        dim: String,
    },

    /// The same name is used for a coordinate and a data variable.
    #[error("'{0}' is declared as both a coordinate and a data variable")]
    NameCollision(String),

    /// `units` is absent and the comment does not acknowledge it.
    #[error(
        "the 'units' attr of '{0}' is required if known; if the units are not \
         known, the 'comment' attr must include the phrase 'Unknown units.' \
         (unitless quantities should set 'units' to '1')"
    )]
    MissingUnits(String),

    /// An attribute value that violates a field-level constraint.
    #[error("attribute '{attr}' of '{name}': {reason}")]
    InvalidAttribute {
        /// Name of the variable or coordinate carrying the attribute.
        name: String,
        /// The offending attribute key.
        attr: String,
        /// What was wrong with it.
        reason: String,
    },

    /// One or more datastream naming components contain `.`, `-`, or space.
    ///
    /// Every offending component is listed so a configuration can be fixed in
    /// a single round-trip.
    #[error(
        "the following properties contain one or more illegal characters \
         ('.', '-', ' '): {components:?}"
    )]
    IllegalNameComponents {
        /// All components that failed the check.
        components: Vec<String>,
    },

    /// A datastream or file name that does not follow the naming grammar.
    #[error("illegal name '{name}': {reason}")]
    IllegalName {
        /// The rejected name.
        name: String,
        /// Which rule it broke.
        reason: String,
    },
}

/// A raw input dataset is incompatible with an otherwise-valid schema.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// A declared coordinate has no counterpart in the raw dataset.
    ///
    /// Coordinates size every other slot, so this is always fatal for the
    /// run.
    #[error("raw dataset is missing required coordinate '{0}'")]
    MissingCoordinate(String),

    /// A declared variable is absent from the raw dataset and has no fill
    /// value to default to.
    #[error("raw dataset is missing field '{0}', which has no fill value")]
    MissingField(String),

    /// The raw values could not be cast to the declared dtype at all.
    #[error("cannot cast field '{name}' to {to}: {source}")]
    Cast {
        /// The slot being extracted.
        name: String,
        /// The declared dtype.
        to: String,
        /// Underlying Arrow cast error.
        #[source]
        source: ArrowError,
    },

    /// Individual values failed conversion and the slot has no fill value to
    /// substitute for them.
    #[error(
        "field '{name}' contains {count} value(s) that cannot be represented \
         as {to}, and '{name}' has no fill value"
    )]
    Incomplete {
        /// The slot being extracted.
        name: String,
        /// How many values failed.
        count: usize,
        /// The declared dtype.
        to: String,
    },

    /// A variable whose extracted length along a dimension disagrees with
    /// the coordinate that defines it.
    #[error("dimension '{dim}' of '{name}' has length {actual}, expected {expected}")]
    DimensionMismatch {
        /// The slot being extracted.
        name: String,
        /// The inconsistent dimension.
        dim: String,
        /// Length of the coordinate.
        expected: usize,
        /// Length found in the raw field.
        actual: usize,
    },

    /// A raw field with a different number of dimensions than declared.
    #[error("field '{name}' has {actual} dimension(s), expected {expected}")]
    RankMismatch {
        /// The slot being extracted.
        name: String,
        /// Declared number of dims.
        expected: usize,
        /// Number of dims in the raw field.
        actual: usize,
    },

    /// A coordinate extracted from a raw field that is not one-dimensional.
    #[error("coordinate '{name}' must be one-dimensional, got shape {shape:?}")]
    CoordinateShape {
        /// Name of the coordinate.
        name: String,
        /// The offending shape.
        shape: Vec<usize>,
    },

    /// Pre-supplied literal data whose element count disagrees with the
    /// declared dims.
    #[error("literal data for '{name}' has {actual} element(s), expected {expected}")]
    LiteralShape {
        /// The slot carrying the literal.
        name: String,
        /// Element count implied by the dims.
        expected: usize,
        /// Element count of the literal.
        actual: usize,
    },

    /// An array whose flattened length disagrees with its shape.
    #[error("shape {shape:?} does not match {len} stored value(s)")]
    ShapeMismatch {
        /// The declared shape.
        shape: Vec<usize>,
        /// The flattened value count.
        len: usize,
    },

    /// The assembled dataset failed the conventions validator.
    #[error(transparent)]
    Validation(#[from] crate::standards::ValidationError),

    /// An Arrow kernel failed while transforming the data.
    #[error(transparent)]
    Arrow(#[from] ArrowError),

    /// Raw input could not be read.
    #[error("failed to read raw input: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The schema itself is malformed; should have been caught at load.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// This particular raw input cannot satisfy the schema.
    #[error(transparent)]
    Data(#[from] DataError),

    /// The storage collaborator failed to persist the result.
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),
}
