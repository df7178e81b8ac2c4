//! Typed description of a bidirectional recurrent layer.
//!
//! Attributes are parsed and validated once, when the layer is constructed; the synthesizers only ever
//! see the typed values.

use std::fmt;
use std::str::FromStr;

use linked_hash_map::LinkedHashMap;

use crate::precision::{NamedType, PrecisionType};
use crate::ConfigError;

/// Named tensor dimension, e.g. `N_TIME_STEPS_2 = 20`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dim {
    /// Symbol under which the dimension is defined.
    pub name: String,

    /// Size.
    pub size: usize,
}

impl Dim {
    /// Creates new dimension.
    pub fn new<S: Into<String>>(name: S, size: usize) -> Self { Self { name: name.into(), size } }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} ({})", self.name, self.size) }
}

/// Tensor flowing between layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Buffer name, e.g. `layer2_out`.
    pub name: String,

    /// Ordered dimensions, outermost first.
    pub dims: Vec<Dim>,

    /// Element type.
    pub typ: NamedType,
}

impl Variable {
    /// Creates new variable.
    pub fn new<S: Into<String>>(name: S, dims: Vec<Dim>, typ: NamedType) -> Self {
        Self { name: name.into(), dims, typ }
    }

    /// Returns the `i`-th dimension.
    pub fn dim(&self, i: usize) -> Result<&Dim, ConfigError> {
        self.dims.get(i).ok_or_else(|| {
            ConfigError::InvalidDimension(format!("`{}` has {} dimension(s), expected at least {}", self.name, self.dims.len(), i + 1))
        })
    }
}

/// Kind of recurrent cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// Long short-term memory.
    Lstm,

    /// Gated recurrent unit.
    Gru,
}

impl CellKind {
    /// Number of linear projections per cell step.
    pub fn gate_count(self) -> usize {
        match self {
            Self::Lstm => 4,
            Self::Gru => 3,
        }
    }

    /// Name of the config base struct, e.g. `lstm` for `nnet::lstm_config`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lstm => "lstm",
            Self::Gru => "gru",
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for CellKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lstm" => Ok(Self::Lstm),
            "gru" => Ok(Self::Gru),
            _ => Err(ConfigError::UnknownAttribute { attribute: "cell_kind", value: s.to_string() }),
        }
    }
}

/// Activation function.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationKind {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
    Softplus,
    Softsign,
    Elu,
    Selu,
    HardSigmoid,
    HardTanh,
}

impl ActivationKind {
    const ALL: [Self; 10] = [
        Self::Linear,
        Self::Relu,
        Self::Sigmoid,
        Self::Tanh,
        Self::Softplus,
        Self::Softsign,
        Self::Elu,
        Self::Selu,
        Self::HardSigmoid,
        Self::HardTanh,
    ];

    /// Returns the kernel name, e.g. `nnet::activation::hard_sigmoid`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Relu => "relu",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::Softplus => "softplus",
            Self::Softsign => "softsign",
            Self::Elu => "elu",
            Self::Selu => "selu",
            Self::HardSigmoid => "hard_sigmoid",
            Self::HardTanh => "hard_tanh",
        }
    }

    /// Whether this is a piecewise-linear activation computed from a slope/shift pair.
    pub fn is_hard(self) -> bool { self.as_str().contains("hard") }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ActivationKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownActivationKind(s.to_string()))
    }
}

/// Implementation strategy of the matrix multiplications.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Latency,
    Resource,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Latency => "latency",
            Self::Resource => "resource",
        })
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latency" => Ok(Self::Latency),
            "resource" => Ok(Self::Resource),
            _ => Err(ConfigError::UnknownAttribute { attribute: "strategy", value: s.to_string() }),
        }
    }
}

/// How data is passed between layers.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoType {
    Parallel,
    Stream,
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parallel => "io_parallel",
            Self::Stream => "io_stream",
        })
    }
}

impl FromStr for IoType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "io_parallel" | "parallel" => Ok(Self::Parallel),
            "io_stream" | "stream" => Ok(Self::Stream),
            _ => Err(ConfigError::UnknownAttribute { attribute: "io_type", value: s.to_string() }),
        }
    }
}

/// How forward and backward outputs are combined.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeMode {
    Concat,
    Sum,
    Mul,
    Ave,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Concat => "concat",
            Self::Sum => "sum",
            Self::Mul => "mul",
            Self::Ave => "ave",
        })
    }
}

impl FromStr for MergeMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "concat" => Ok(Self::Concat),
            "sum" => Ok(Self::Sum),
            "mul" => Ok(Self::Mul),
            "ave" => Ok(Self::Ave),
            _ => Err(ConfigError::UnknownAttribute { attribute: "merge_mode", value: s.to_string() }),
        }
    }
}

/// Direction of one half of a bidirectional layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Processes the sequence front to back.
    Forward,

    /// Processes the sequence back to front.
    Backward,
}

impl Direction {
    /// Suffix used in generated symbols.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Forward => "f",
            Self::Backward => "b",
        }
    }

    /// Weight tensors owned by this direction.
    pub fn weights(self) -> DirectionWeights {
        match self {
            Self::Forward => DirectionWeights {
                weight: WeightName::ForwardWeight,
                bias: WeightName::ForwardBias,
                recurrent_weight: WeightName::ForwardRecurrentWeight,
                recurrent_bias: WeightName::ForwardRecurrentBias,
            },
            Self::Backward => DirectionWeights {
                weight: WeightName::BackwardWeight,
                bias: WeightName::BackwardBias,
                recurrent_weight: WeightName::BackwardRecurrentWeight,
                recurrent_bias: WeightName::BackwardRecurrentBias,
            },
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        })
    }
}

/// Names of the four tensors of one direction.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionWeights {
    pub weight: WeightName,
    pub bias: WeightName,
    pub recurrent_weight: WeightName,
    pub recurrent_bias: WeightName,
}

/// Weight tensor slots of a bidirectional layer.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightName {
    ForwardWeight,
    ForwardBias,
    ForwardRecurrentWeight,
    ForwardRecurrentBias,
    BackwardWeight,
    BackwardBias,
    BackwardRecurrentWeight,
    BackwardRecurrentBias,
}

impl WeightName {
    /// All slots.
    pub const ALL: [Self; 8] = [
        Self::ForwardWeight,
        Self::ForwardBias,
        Self::ForwardRecurrentWeight,
        Self::ForwardRecurrentBias,
        Self::BackwardWeight,
        Self::BackwardBias,
        Self::BackwardRecurrentWeight,
        Self::BackwardRecurrentBias,
    ];

    /// Returns slot name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ForwardWeight => "forward_weight",
            Self::ForwardBias => "forward_bias",
            Self::ForwardRecurrentWeight => "forward_recurrent_weight",
            Self::ForwardRecurrentBias => "forward_recurrent_bias",
            Self::BackwardWeight => "backward_weight",
            Self::BackwardBias => "backward_bias",
            Self::BackwardRecurrentWeight => "backward_recurrent_weight",
            Self::BackwardRecurrentBias => "backward_recurrent_bias",
        }
    }
}

impl fmt::Display for WeightName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for WeightName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownAttribute { attribute: "weight", value: s.to_string() })
    }
}

/// Weight tensor together with its sparsity statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightTensor {
    /// Variable name the tensor is emitted under, e.g. `w2`.
    pub var_name: String,

    /// Number of elements.
    pub element_count: usize,

    /// Number of elements equal to zero.
    pub zero_count: usize,

    /// Element type.
    pub typ: NamedType,
}

impl WeightTensor {
    /// Creates new weight tensor. Fails if there are more zeros than elements.
    pub fn new<S: Into<String>>(
        var_name: S, element_count: usize, zero_count: usize, typ: NamedType,
    ) -> Result<Self, ConfigError> {
        let tensor = Self { var_name: var_name.into(), element_count, zero_count, typ };
        tensor.check()?;
        Ok(tensor)
    }

    /// Checks that there are no more zeros than elements.
    ///
    /// The fields are public, so tensors built without [`WeightTensor::new`] are checked again before use.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.zero_count > self.element_count {
            return Err(ConfigError::InvalidWeightStatistics {
                name: self.var_name.clone(),
                elements: self.element_count,
                zeros: self.zero_count,
            });
        }
        Ok(())
    }

    /// Number of nonzero elements.
    pub fn nonzero_count(&self) -> usize { self.element_count.saturating_sub(self.zero_count) }
}

/// Slope/shift pair of a hard activation.
#[derive(Debug, Clone, PartialEq)]
pub struct HardActivationParams {
    /// Slope value.
    pub slope: f64,

    /// Shift value.
    pub shift: f64,

    /// Precision the slope is defined with.
    pub slope_precision: PrecisionType,

    /// Precision the shift is defined with.
    pub shift_precision: PrecisionType,
}

impl Default for HardActivationParams {
    fn default() -> Self {
        Self {
            slope: 0.2,
            shift: 0.5,
            slope_precision: PrecisionType::ufixed(16, 0),
            shift_precision: PrecisionType::ufixed(1, 0),
        }
    }
}

/// Attributes of a bidirectional recurrent layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrentAttributes {
    /// Cell kind of both directions.
    pub cell_kind: CellKind,

    /// Activation of the cell/candidate path.
    pub activation: ActivationKind,

    /// Activation of the gates.
    pub recurrent_activation: ActivationKind,

    /// Whether the whole output sequence is returned, or only its last step.
    pub return_sequences: bool,

    /// Multiplication strategy.
    pub strategy: Strategy,

    /// IO type.
    pub io_type: IoType,

    /// Layer-level reuse factor.
    pub reuse_factor: usize,

    /// Whether the recurrent state is kept in static storage across calls.
    pub static_reuse: bool,

    /// Merge mode of the two directions.
    pub merge_mode: MergeMode,

    /// Accumulator precision of the cell.
    pub accum_precision: PrecisionType,

    /// Accumulator precision of the gate multiplications.
    pub dense_accum_precision: PrecisionType,

    /// Recurrent state precision.
    pub state_precision: PrecisionType,

    /// Activation result precision.
    pub activation_precision: PrecisionType,

    /// Number of lookup table entries.
    pub table_size: usize,

    /// Lookup table entry precision.
    pub table_precision: PrecisionType,

    /// Slope/shift of `activation` if it is hard.
    pub hard_activation: HardActivationParams,

    /// Slope/shift of `recurrent_activation` if it is hard.
    pub hard_recurrent_activation: HardActivationParams,
}

impl RecurrentAttributes {
    /// Creates new attributes with default sizing and precisions.
    pub fn new(cell_kind: CellKind, activation: ActivationKind, recurrent_activation: ActivationKind) -> Self {
        Self {
            cell_kind,
            activation,
            recurrent_activation,
            return_sequences: false,
            strategy: Strategy::Latency,
            io_type: IoType::Parallel,
            reuse_factor: 1,
            static_reuse: true,
            merge_mode: MergeMode::Concat,
            accum_precision: PrecisionType::fixed(32, 16),
            dense_accum_precision: PrecisionType::fixed(32, 16),
            state_precision: PrecisionType::default(),
            activation_precision: PrecisionType::default(),
            table_size: 1024,
            table_precision: PrecisionType::fixed(18, 8),
            hard_activation: HardActivationParams::default(),
            hard_recurrent_activation: HardActivationParams::default(),
        }
    }

    /// Sets `return_sequences`.
    pub fn with_return_sequences(mut self, return_sequences: bool) -> Self {
        self.return_sequences = return_sequences;
        self
    }

    /// Sets multiplication strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets IO type.
    pub fn with_io_type(mut self, io_type: IoType) -> Self {
        self.io_type = io_type;
        self
    }

    /// Sets layer reuse factor.
    pub fn with_reuse_factor(mut self, reuse_factor: usize) -> Self {
        self.reuse_factor = reuse_factor;
        self
    }

    /// Sets static state reuse.
    pub fn with_static_reuse(mut self, static_reuse: bool) -> Self {
        self.static_reuse = static_reuse;
        self
    }

    /// Sets merge mode.
    pub fn with_merge_mode(mut self, merge_mode: MergeMode) -> Self {
        self.merge_mode = merge_mode;
        self
    }

    /// Sets accumulator precision.
    pub fn with_accum_precision(mut self, precision: PrecisionType) -> Self {
        self.accum_precision = precision;
        self
    }

    /// Sets accumulator precision of the gate multiplications.
    pub fn with_dense_accum_precision(mut self, precision: PrecisionType) -> Self {
        self.dense_accum_precision = precision;
        self
    }

    /// Sets recurrent state precision.
    pub fn with_state_precision(mut self, precision: PrecisionType) -> Self {
        self.state_precision = precision;
        self
    }

    /// Sets activation result precision.
    pub fn with_activation_precision(mut self, precision: PrecisionType) -> Self {
        self.activation_precision = precision;
        self
    }

    /// Sets lookup table size and entry precision.
    pub fn with_table(mut self, table_size: usize, precision: PrecisionType) -> Self {
        self.table_size = table_size;
        self.table_precision = precision;
        self
    }

    /// Sets slope/shift of the hard activation.
    pub fn with_hard_activation(mut self, params: HardActivationParams) -> Self {
        self.hard_activation = params;
        self
    }

    /// Sets slope/shift of the hard recurrent activation.
    pub fn with_hard_recurrent_activation(mut self, params: HardActivationParams) -> Self {
        self.hard_recurrent_activation = params;
        self
    }
}

/// Source of shapes, attributes and weights of one layer.
pub trait LayerProvider {
    /// Unique index of the layer within the model.
    fn index(&self) -> usize;

    /// Input variable, dims `[n_sequence, n_in]`.
    fn input(&self) -> &Variable;

    /// Output variable, dims `[n_sequence_out, n_out]` or `[n_out]`.
    fn output(&self) -> &Variable;

    /// Attributes the given direction is derived from.
    fn attributes(&self, direction: Direction) -> &RecurrentAttributes;

    /// Weight tensor in the given slot.
    fn weight(&self, name: WeightName) -> Option<&WeightTensor>;
}

/// Bidirectional recurrent layer node.
#[derive(Debug, Clone)]
pub struct LayerNode {
    /// Unique index.
    pub index: usize,

    /// Layer name.
    pub name: String,

    /// Input variable.
    pub input: Variable,

    /// Output variable.
    pub output: Variable,

    /// Attributes shared by both directions.
    pub attributes: RecurrentAttributes,

    /// Weight tensors by slot.
    pub weights: LinkedHashMap<WeightName, WeightTensor>,
}

impl LayerNode {
    /// Creates new layer node without weights.
    pub fn new<S: Into<String>>(
        index: usize, name: S, input: Variable, output: Variable, attributes: RecurrentAttributes,
    ) -> Result<Self, ConfigError> {
        let name = name.into();

        for var in [&input, &output] {
            if var.dims.is_empty() {
                return Err(ConfigError::InvalidDimension(format!("`{}` of layer `{}` has no dimensions", var.name, name)));
            }
        }
        if attributes.reuse_factor == 0 {
            return Err(ConfigError::InvalidReuseFactor { config: name });
        }

        Ok(Self { index, name, input, output, attributes, weights: LinkedHashMap::new() })
    }

    /// Adds the weight tensor in the given slot, replacing any previous one.
    pub fn with_weight(mut self, name: WeightName, tensor: WeightTensor) -> Self {
        let _ = self.weights.insert(name, tensor);
        self
    }
}

impl LayerProvider for LayerNode {
    fn index(&self) -> usize { self.index }

    fn input(&self) -> &Variable { &self.input }

    fn output(&self) -> &Variable { &self.output }

    fn attributes(&self, _direction: Direction) -> &RecurrentAttributes { &self.attributes }

    fn weight(&self, name: WeightName) -> Option<&WeightTensor> { self.weights.get(&name) }
}
