//! Derivation errors.

use thiserror::Error;

use crate::layer::WeightName;

/// Error raised while deriving the configuration of one layer.
///
/// A layer's configuration is all-or-nothing: any of these aborts the whole bundle.
#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("reuse factor of `{config}` resolves to zero")]
    InvalidReuseFactor { config: String },

    #[error("multiplier limit of `{config}` is negative ({limit}), sparsity statistics are inconsistent")]
    NegativeMultiplierLimit { config: String, limit: i64 },

    #[error("forward and backward directions disagree on `{field}`: {forward} != {backward}")]
    ConsistencyMismatch { field: &'static str, forward: String, backward: String },

    #[error("unknown activation kind `{0}`")]
    UnknownActivationKind(String),

    #[error("unknown value `{value}` for attribute `{attribute}`")]
    UnknownAttribute { attribute: &'static str, value: String },

    #[error("missing weight tensor `{0}`")]
    MissingWeightTensor(WeightName),

    #[error("weight tensor `{name}` has {zeros} zeros out of {elements} elements")]
    InvalidWeightStatistics { name: String, elements: usize, zeros: usize },

    #[error("invalid precision `{0}`")]
    InvalidPrecision(String),
}

/// Derivation error attributed to the layer it was raised for.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("layer {index}: {error}")]
pub struct LayerError {
    /// Unique index of the offending layer.
    pub index: usize,

    /// Underlying error.
    #[source]
    pub error: ConfigError,
}

impl LayerError {
    /// Attributes `error` to layer `index`.
    pub fn new(index: usize, error: ConfigError) -> Self { Self { index, error } }
}
