//! Fixed-point precision descriptors and the product-type registry.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::ConfigError;

/// Numeric precision of a value as seen by the HLS toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrecisionType {
    /// Fixed-point number: `ap_fixed<width, integer>` or `ap_ufixed<width, integer>`.
    Fixed {
        /// Total bit width.
        width: usize,
        /// Integer bits, may be negative or exceed `width`.
        integer: i32,
        /// Signedness.
        signed: bool,
        /// Quantization and overflow modes, e.g. `AP_RND`, `AP_SAT`.
        modes: Vec<String>,
    },

    /// Integer: `ap_int<width>` or `ap_uint<width>`.
    Integer {
        /// Total bit width.
        width: usize,
        /// Signedness.
        signed: bool,
    },

    /// Binary value encoded in a single bit (xnor networks).
    Xnor,
}

impl PrecisionType {
    /// Signed fixed-point precision without quantization/overflow modes.
    pub fn fixed(width: usize, integer: i32) -> Self { Self::Fixed { width, integer, signed: true, modes: vec![] } }

    /// Unsigned fixed-point precision without quantization/overflow modes.
    pub fn ufixed(width: usize, integer: i32) -> Self {
        Self::Fixed { width, integer, signed: false, modes: vec![] }
    }

    /// Integer precision.
    pub fn integer(width: usize, signed: bool) -> Self { Self::Integer { width, signed } }

    /// Returns total bit width.
    pub fn width(&self) -> usize {
        match self {
            Self::Fixed { width, .. } | Self::Integer { width, .. } => *width,
            Self::Xnor => 1,
        }
    }
}

impl Default for PrecisionType {
    fn default() -> Self { Self::fixed(16, 6) }
}

impl fmt::Display for PrecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed { width, integer, signed, modes } => {
                let prefix = if *signed { "ap_fixed" } else { "ap_ufixed" };
                let args = [width.to_string(), integer.to_string()].into_iter().chain(modes.iter().cloned()).join(",");
                write!(f, "{}<{}>", prefix, args)
            }
            Self::Integer { width, signed } => {
                write!(f, "{}<{}>", if *signed { "ap_int" } else { "ap_uint" }, width)
            }
            Self::Xnor => write!(f, "ap_uint<1>"),
        }
    }
}

impl FromStr for PrecisionType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidPrecision(s.to_string());
        let s = s.trim();

        if s == "xnor" {
            return Ok(Self::Xnor);
        }

        let (prefix, rest) = s.split_once('<').ok_or_else(invalid)?;
        let args = rest.strip_suffix('>').ok_or_else(invalid)?.split(',').map(str::trim).collect::<Vec<_>>();
        let width = args[0].parse::<usize>().map_err(|_| invalid())?;
        if width == 0 {
            return Err(invalid());
        }

        match (prefix.trim(), args.len()) {
            ("ap_int", 1) => Ok(Self::integer(width, true)),
            ("ap_uint", 1) => Ok(Self::integer(width, false)),
            (prefix @ ("ap_fixed" | "ap_ufixed"), len) if len >= 2 => {
                let integer = args[1].parse::<i32>().map_err(|_| invalid())?;
                let modes = args[2..].iter().map(|mode| mode.to_string()).collect();
                Ok(Self::Fixed { width, integer, signed: prefix == "ap_fixed", modes })
            }
            _ => Err(invalid()),
        }
    }
}

/// Precision bound to the typedef name it is emitted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedType {
    /// Typedef name, e.g. `weight2_t`.
    pub name: String,

    /// Underlying precision.
    pub precision: PrecisionType,
}

impl NamedType {
    /// Creates new named type.
    pub fn new<S: Into<String>>(name: S, precision: PrecisionType) -> Self { Self { name: name.into(), precision } }
}

impl fmt::Display for NamedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.name) }
}

/// Multiplication kernel chosen for a pair of operand precisions (`nnet::product::*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductType {
    /// Plain multiplication.
    Mult,

    /// Both operands are binary.
    BothBinary,

    /// Weight is binary.
    WeightBinary,

    /// Data is binary.
    DataBinary,

    /// Weight is ternary.
    WeightTernary,
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mult => "mult",
            Self::BothBinary => "both_binary",
            Self::WeightBinary => "weight_binary",
            Self::DataBinary => "data_binary",
            Self::WeightTernary => "weight_ternary",
        })
    }
}

/// Maps operand precisions to product kernels.
pub trait PrecisionRegistry {
    /// Selects the product kernel for `data × weight`.
    fn product_type(&self, data: &PrecisionType, weight: &PrecisionType) -> ProductType;
}

/// Product-type selection of the Vivado HLS `nnet` library.
#[derive(Debug, Default, Clone, Copy)]
pub struct VivadoRegistry;

impl PrecisionRegistry for VivadoRegistry {
    fn product_type(&self, data: &PrecisionType, weight: &PrecisionType) -> ProductType {
        match (data, weight) {
            (PrecisionType::Xnor, PrecisionType::Xnor) => ProductType::BothBinary,
            (_, PrecisionType::Xnor) => ProductType::WeightBinary,
            (PrecisionType::Xnor, _) => ProductType::DataBinary,
            (_, PrecisionType::Integer { width: 2, signed: true }) => ProductType::WeightTernary,
            _ => ProductType::Mult,
        }
    }
}
