//! Matrix multiplication (`nnet::dense_config`) synthesis.

use log::{debug, warn};

use crate::layer::{Strategy, WeightTensor};
use crate::precision::{NamedType, PrecisionRegistry, PrecisionType, ProductType};
use crate::{clog2, div_roundup, ConfigError};

/// Resource and type configuration of one matrix multiplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplierConfig {
    /// Struct name.
    pub name: String,

    /// Input width.
    pub n_in: usize,

    /// Output width.
    pub n_out: usize,

    /// Multiplication strategy.
    pub strategy: Strategy,

    /// Reuse factor, always equal to `n_in`.
    pub reuse_factor: usize,

    /// Zero weights.
    pub n_zeros: usize,

    /// Nonzero weights.
    pub n_nonzeros: usize,

    /// `ceil(n_in * n_out / reuse_factor) - floor(n_zeros / reuse_factor)`.
    pub multiplier_limit: usize,

    /// Accumulator type.
    pub accum_type: NamedType,

    /// Bias type.
    pub bias_type: NamedType,

    /// Weight type.
    pub weight_type: NamedType,

    /// Unsigned width of the row/column index of compressed weights.
    pub index_type_width: usize,

    /// Product kernel.
    pub product_type: ProductType,
}

/// Inputs of [`MultiplierConfig::derive`].
#[derive(Debug, Clone)]
pub struct MultiplierParams<'a> {
    /// Struct name.
    pub name: String,

    /// Input width.
    pub n_in: usize,

    /// Output width.
    pub n_out: usize,

    /// Multiplication strategy.
    pub strategy: Strategy,

    /// Precision of the multiplied data.
    pub input_precision: &'a PrecisionType,

    /// Weight matrix; provides the weight type and sparsity.
    pub weight: &'a WeightTensor,

    /// Bias vector; provides the bias type.
    pub bias: &'a WeightTensor,

    /// Accumulator type.
    pub accum_type: NamedType,
}

/// Returns `ceil(n_in * n_out / reuse_factor) - floor(n_zeros / reuse_factor)` for the config `config`.
pub fn multiplier_limit(
    config: &str, n_in: usize, n_out: usize, reuse_factor: usize, n_zeros: usize,
) -> Result<usize, ConfigError> {
    let n_mult = n_in.checked_mul(n_out).ok_or_else(|| {
        ConfigError::InvalidDimension(format!("`{}` has too many multiplications ({} x {})", config, n_in, n_out))
    })?;
    let ceil = div_roundup(n_mult, reuse_factor)
        .ok_or_else(|| ConfigError::InvalidReuseFactor { config: config.to_string() })?;
    let zeros = n_zeros / reuse_factor;

    if zeros > ceil {
        let limit = i64::try_from(zeros - ceil).map_or(i64::MIN, |excess| -excess);
        return Err(ConfigError::NegativeMultiplierLimit { config: config.to_string(), limit });
    }
    Ok(ceil - zeros)
}

impl MultiplierConfig {
    /// Derives the configuration of a multiplication.
    ///
    /// The reuse factor is pinned to the input width: every multiplier is time-multiplexed over a full
    /// input row.
    pub fn derive<R: PrecisionRegistry + ?Sized>(params: MultiplierParams<'_>, registry: &R) -> Result<Self, ConfigError> {
        let MultiplierParams { name, n_in, n_out, strategy, input_precision, weight, bias, accum_type } = params;
        let reuse_factor = n_in;
        weight.check()?;

        if n_in.checked_mul(n_out) != Some(weight.element_count) {
            warn!(
                "{}: weight `{}` has {} elements, expected {} x {}",
                name, weight.var_name, weight.element_count, n_in, n_out
            );
        }

        let multiplier_limit = multiplier_limit(&name, n_in, n_out, reuse_factor, weight.zero_count)?;
        let product_type = registry.product_type(input_precision, &weight.typ.precision);

        debug!(
            "{}: n_in={} n_out={} reuse_factor={} multiplier_limit={} product={}",
            name, n_in, n_out, reuse_factor, multiplier_limit, product_type
        );

        Ok(Self {
            name,
            n_in,
            n_out,
            strategy,
            reuse_factor,
            n_zeros: weight.zero_count,
            n_nonzeros: weight.nonzero_count(),
            multiplier_limit,
            accum_type,
            bias_type: bias.typ.clone(),
            weight_type: weight.typ.clone(),
            index_type_width: clog2(n_in.max(n_out)).max(1),
            product_type,
        })
    }
}
