//! Activation (`nnet::activ_config`, `nnet::hard_activ_config`) synthesis.

use log::debug;

use crate::layer::{ActivationKind, HardActivationParams, IoType};
use crate::precision::{NamedType, PrecisionType};
use crate::ConfigError;

/// Activation computed from a lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableActivation {
    /// Struct name.
    pub name: String,

    /// Activation function.
    pub kind: ActivationKind,

    /// Input width.
    pub n_in: usize,

    /// Reuse factor.
    pub reuse_factor: usize,

    /// IO type.
    pub io_type: IoType,

    /// Number of table entries.
    pub table_size: usize,

    /// Table entry precision.
    pub table_precision: PrecisionType,
}

impl TableActivation {
    /// Bit width of one table entry.
    pub fn table_entry_width(&self) -> usize { self.table_precision.width() }
}

/// Typed constant defined out of line.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedConstant {
    /// Value.
    pub value: f64,

    /// Type the value is defined with.
    pub typ: NamedType,
}

/// Piecewise-linear activation `clamp(slope * x + shift)`.
#[derive(Debug, Clone, PartialEq)]
pub struct HardActivation {
    /// Struct name.
    pub name: String,

    /// Activation function.
    pub kind: ActivationKind,

    /// Input width.
    pub n_in: usize,

    /// Reuse factor.
    pub reuse_factor: usize,

    /// IO type.
    pub io_type: IoType,

    /// Slope.
    pub slope: TypedConstant,

    /// Shift.
    pub shift: TypedConstant,
}

/// Activation configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationConfig {
    /// Lookup-table activation.
    Table(TableActivation),

    /// Hard activation.
    Hard(HardActivation),
}

/// Inputs of [`ActivationConfig::derive`].
///
/// Both the table and the slope/shift parameters are supplied; the activation kind decides which are used.
#[derive(Debug, Clone)]
pub struct ActivationParams<'a> {
    /// Struct name.
    pub name: String,

    /// Activation function.
    pub kind: ActivationKind,

    /// Input width.
    pub n_in: usize,

    /// Reuse factor.
    pub reuse_factor: usize,

    /// IO type.
    pub io_type: IoType,

    /// Number of table entries.
    pub table_size: usize,

    /// Table entry precision.
    pub table_precision: &'a PrecisionType,

    /// Slope/shift values and precisions.
    pub hard: &'a HardActivationParams,

    /// Typedef name of the slope.
    pub slope_type: String,

    /// Typedef name of the shift.
    pub shift_type: String,
}

impl ActivationConfig {
    /// Derives the configuration of an activation.
    pub fn derive(params: ActivationParams<'_>) -> Result<Self, ConfigError> {
        let ActivationParams {
            name,
            kind,
            n_in,
            reuse_factor,
            io_type,
            table_size,
            table_precision,
            hard,
            slope_type,
            shift_type,
        } = params;

        if reuse_factor == 0 {
            return Err(ConfigError::InvalidReuseFactor { config: name });
        }

        let config = if kind.is_hard() {
            debug!("{}: hard {} n_in={} slope={} shift={}", name, kind, n_in, hard.slope, hard.shift);
            Self::Hard(HardActivation {
                name,
                kind,
                n_in,
                reuse_factor,
                io_type,
                slope: TypedConstant {
                    value: hard.slope,
                    typ: NamedType::new(slope_type, hard.slope_precision.clone()),
                },
                shift: TypedConstant {
                    value: hard.shift,
                    typ: NamedType::new(shift_type, hard.shift_precision.clone()),
                },
            })
        } else {
            if table_size == 0 {
                return Err(ConfigError::InvalidDimension(format!("lookup table of `{}` has no entries", name)));
            }
            debug!("{}: table {} n_in={} table_size={}", name, kind, n_in, table_size);
            Self::Table(TableActivation {
                name,
                kind,
                n_in,
                reuse_factor,
                io_type,
                table_size,
                table_precision: table_precision.clone(),
            })
        };

        Ok(config)
    }

    /// Struct name.
    pub fn name(&self) -> &str {
        match self {
            Self::Table(config) => &config.name,
            Self::Hard(config) => &config.name,
        }
    }

    /// Activation function.
    pub fn kind(&self) -> ActivationKind {
        match self {
            Self::Table(config) => config.kind,
            Self::Hard(config) => config.kind,
        }
    }

    /// Input width.
    pub fn n_in(&self) -> usize {
        match self {
            Self::Table(config) => config.n_in,
            Self::Hard(config) => config.n_in,
        }
    }

    /// Reuse factor.
    pub fn reuse_factor(&self) -> usize {
        match self {
            Self::Table(config) => config.reuse_factor,
            Self::Hard(config) => config.reuse_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(kind: ActivationKind, table_size: usize, reuse_factor: usize) -> Result<ActivationConfig, ConfigError> {
        let table_precision = PrecisionType::fixed(18, 8);
        let hard = HardActivationParams::default();
        ActivationConfig::derive(ActivationParams {
            name: format!("{}_config2_f", kind),
            kind,
            n_in: 8,
            reuse_factor,
            io_type: IoType::Parallel,
            table_size,
            table_precision: &table_precision,
            hard: &hard,
            slope_type: "slope2_f_t".to_string(),
            shift_type: "shift2_f_t".to_string(),
        })
    }

    #[test]
    fn table_variant() {
        let config = derive(ActivationKind::Tanh, 1024, 1).unwrap();
        let ActivationConfig::Table(table) = &config else { panic!("expected table variant: {:?}", config) };

        assert_eq!(table.table_size, 1024);
        assert_eq!(table.table_entry_width(), 18);
        assert_eq!(config.name(), "tanh_config2_f");
        assert_eq!(config.n_in(), 8);
    }

    #[test]
    fn hard_variant() {
        for kind in [ActivationKind::HardSigmoid, ActivationKind::HardTanh] {
            let config = derive(kind, 1024, 1).unwrap();
            let ActivationConfig::Hard(hard) = &config else { panic!("expected hard variant: {:?}", config) };

            assert_eq!(hard.slope.value, 0.2);
            assert_eq!(hard.slope.typ, NamedType::new("slope2_f_t", PrecisionType::ufixed(16, 0)));
            assert_eq!(hard.shift.value, 0.5);
            assert_eq!(hard.shift.typ, NamedType::new("shift2_f_t", PrecisionType::ufixed(1, 0)));
            assert_eq!(config.kind(), kind);
        }
    }

    #[test]
    fn hard_variant_ignores_table() {
        assert!(matches!(derive(ActivationKind::HardSigmoid, 0, 1), Ok(ActivationConfig::Hard(_))));
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(matches!(derive(ActivationKind::Sigmoid, 0, 1), Err(ConfigError::InvalidDimension(_))));
    }

    #[test]
    fn zero_reuse_is_rejected() {
        assert!(matches!(derive(ActivationKind::Sigmoid, 1024, 0), Err(ConfigError::InvalidReuseFactor { .. })));
    }
}
