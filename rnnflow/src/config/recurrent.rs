//! Per-direction recurrent cell (`nnet::lstm_config`, `nnet::gru_config`) synthesis.

use log::debug;

use super::{ActivationConfig, ActivationParams, MultiplierConfig, MultiplierParams, Symbols};
use crate::layer::{CellKind, Direction, IoType, LayerProvider, MergeMode, Strategy, Variable, WeightName, WeightTensor};
use crate::precision::{NamedType, PrecisionRegistry};
use crate::ConfigError;

/// Sequence and state sizes of a bidirectional layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrentShape {
    /// Feature width of one input step.
    pub n_in: usize,

    /// Input sequence length.
    pub n_sequence: usize,

    /// Width of the concatenated output of both directions.
    pub n_out: usize,

    /// State width of one direction, `n_out / 2`.
    pub n_state: usize,

    /// Output sequence length; 1 unless the whole sequence is returned.
    pub n_sequence_out: usize,
}

impl RecurrentShape {
    /// Derives sizes from the input dims `[n_sequence, n_in]` and the output dims, which are
    /// `[n_sequence_out, n_out]` if `return_sequences` is set and `[n_out, ..]` otherwise.
    pub fn derive(input: &Variable, output: &Variable, return_sequences: bool) -> Result<Self, ConfigError> {
        let n_sequence = input.dim(0)?.size;
        let n_in = input.dim(1)?.size;

        let (n_sequence_out, out) = if return_sequences {
            (output.dim(0)?.size, output.dim(1)?)
        } else {
            (1, output.dim(0)?)
        };

        if out.size % 2 != 0 {
            return Err(ConfigError::InvalidDimension(format!(
                "output dimension {} of `{}` is odd and cannot be split between two directions",
                out, output.name
            )));
        }

        Ok(Self { n_in, n_sequence, n_out: out.size, n_state: out.size / 2, n_sequence_out })
    }
}

/// Configuration of one direction of a bidirectional layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PerDirectionConfig {
    /// Struct name.
    pub name: String,

    /// Direction.
    pub direction: Direction,

    /// Cell kind.
    pub cell_kind: CellKind,

    /// Input feature width.
    pub n_in: usize,

    /// Output width.
    pub n_out: usize,

    /// State width.
    pub n_state: usize,

    /// Input sequence length.
    pub n_sequence: usize,

    /// Output sequence length.
    pub n_sequence_out: usize,

    /// Multiplication strategy.
    pub strategy: Strategy,

    /// IO type.
    pub io_type: IoType,

    /// Layer reuse factor.
    pub reuse_factor: usize,

    /// Whether the state is kept in static storage.
    pub use_static_reuse: bool,

    /// Merge mode of the parent layer.
    pub merge_mode: MergeMode,

    /// Accumulator type of the gate multiplications.
    pub accum_dense_type: NamedType,

    /// Accumulator type.
    pub accum_type: NamedType,

    /// Type of this direction's input weight.
    pub weight_type: NamedType,

    /// Type of this direction's input bias.
    pub bias_type: NamedType,

    /// Recurrent state type.
    pub state_type: NamedType,

    /// Activation result type.
    pub act_type: NamedType,

    /// Recurrent activation result type.
    pub recr_act_type: NamedType,

    /// Input-to-gates multiplication.
    pub input_multiplier: MultiplierConfig,

    /// State-to-gates multiplication.
    pub state_multiplier: MultiplierConfig,

    /// Cell activation.
    pub activation: ActivationConfig,

    /// Gate activation.
    pub recurrent_activation: ActivationConfig,
}

/// Returns the weight tensor in `name`, or fails with [`ConfigError::MissingWeightTensor`].
pub(crate) fn get_weight<L: LayerProvider + ?Sized>(layer: &L, name: WeightName) -> Result<&WeightTensor, ConfigError> {
    layer.weight(name).ok_or(ConfigError::MissingWeightTensor(name))
}

impl PerDirectionConfig {
    /// Derives the configuration of `direction` of `layer`.
    pub fn derive<L, R>(layer: &L, direction: Direction, registry: &R) -> Result<Self, ConfigError>
    where
        L: LayerProvider + ?Sized,
        R: PrecisionRegistry + ?Sized,
    {
        let index = layer.index();
        let attrs = layer.attributes(direction);
        let shape = RecurrentShape::derive(layer.input(), layer.output(), attrs.return_sequences)?;
        let gates = attrs.cell_kind.gate_count();
        let symbols = Symbols::direction(index, direction);

        let names = direction.weights();
        let weight = get_weight(layer, names.weight)?;
        let bias = get_weight(layer, names.bias)?;
        let recurrent_weight = get_weight(layer, names.recurrent_weight)?;
        let recurrent_bias = get_weight(layer, names.recurrent_bias)?;

        let accum_type = NamedType::new(Symbols::layer(index).typ("accum"), attrs.accum_precision.clone());
        let accum_dense_type =
            NamedType::new(Symbols::layer(index).typ("accum_dense"), attrs.dense_accum_precision.clone());
        let input_precision = &layer.input().typ.precision;

        let input_multiplier = MultiplierConfig::derive(
            MultiplierParams {
                name: symbols.multiplier(1),
                n_in: shape.n_in,
                n_out: shape.n_state * gates,
                strategy: attrs.strategy,
                input_precision,
                weight,
                bias,
                accum_type: accum_dense_type.clone(),
            },
            registry,
        )?;

        let state_multiplier = MultiplierConfig::derive(
            MultiplierParams {
                name: symbols.multiplier(2),
                n_in: shape.n_state,
                n_out: shape.n_state * gates,
                strategy: attrs.strategy,
                input_precision,
                weight: recurrent_weight,
                bias: recurrent_bias,
                accum_type: accum_dense_type.clone(),
            },
            registry,
        )?;

        let activation = ActivationConfig::derive(ActivationParams {
            name: symbols.activation(attrs.activation),
            kind: attrs.activation,
            n_in: shape.n_state,
            reuse_factor: attrs.reuse_factor,
            io_type: attrs.io_type,
            table_size: attrs.table_size,
            table_precision: &attrs.table_precision,
            hard: &attrs.hard_activation,
            slope_type: symbols.typ("slope"),
            shift_type: symbols.typ("shift"),
        })?;

        // The gate activation covers every gate except the candidate/output one.
        let recurrent_activation = ActivationConfig::derive(ActivationParams {
            name: symbols.recurrent_activation(attrs.recurrent_activation),
            kind: attrs.recurrent_activation,
            n_in: shape.n_state * (gates - 1),
            reuse_factor: attrs.reuse_factor,
            io_type: attrs.io_type,
            table_size: attrs.table_size,
            table_precision: &attrs.table_precision,
            hard: &attrs.hard_recurrent_activation,
            slope_type: symbols.typ("recr_slope"),
            shift_type: symbols.typ("recr_shift"),
        })?;

        let config = Self {
            name: symbols.config(),
            direction,
            cell_kind: attrs.cell_kind,
            n_in: shape.n_in,
            n_out: shape.n_out,
            n_state: shape.n_state,
            n_sequence: shape.n_sequence,
            n_sequence_out: shape.n_sequence_out,
            strategy: attrs.strategy,
            io_type: attrs.io_type,
            reuse_factor: attrs.reuse_factor,
            use_static_reuse: attrs.static_reuse,
            merge_mode: attrs.merge_mode,
            accum_dense_type,
            accum_type,
            weight_type: weight.typ.clone(),
            bias_type: bias.typ.clone(),
            state_type: NamedType::new(symbols.typ("state"), attrs.state_precision.clone()),
            act_type: NamedType::new(symbols.typ("act"), attrs.activation_precision.clone()),
            recr_act_type: NamedType::new(symbols.typ("recr_act"), attrs.activation_precision.clone()),
            input_multiplier,
            state_multiplier,
            activation,
            recurrent_activation,
        };

        debug!(
            "{}: {} {} n_in={} n_state={} n_sequence={} n_sequence_out={}",
            config.name, direction, config.cell_kind, config.n_in, config.n_state, config.n_sequence, config.n_sequence_out
        );

        Ok(config)
    }
}
