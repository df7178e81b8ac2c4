//! Bidirectional layer (`nnet::bidirectional_config`) assembly.

use std::fmt;

use arrayvec::ArrayVec;
use log::debug;

use super::recurrent::get_weight;
use super::{ActivationConfig, MultiplierConfig, PerDirectionConfig, Symbols};
use crate::layer::{Direction, IoType, LayerProvider, MergeMode, Strategy, WeightName};
use crate::precision::{NamedType, PrecisionRegistry};
use crate::{ConfigError, LayerError};

/// Kernel the layer is lowered to.
pub const KERNEL_NAME: &str = "bidirectional_array";

/// Order in which the weights are passed to the kernel, after the input and output buffers.
pub const CALL_WEIGHT_ORDER: [WeightName; 8] = [
    WeightName::BackwardWeight,
    WeightName::BackwardRecurrentWeight,
    WeightName::BackwardBias,
    WeightName::BackwardRecurrentBias,
    WeightName::ForwardWeight,
    WeightName::ForwardRecurrentWeight,
    WeightName::ForwardBias,
    WeightName::ForwardRecurrentBias,
];

/// Configuration of a bidirectional layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BidirectionalConfig {
    /// Struct name.
    pub name: String,

    /// Input feature width.
    pub n_in: usize,

    /// Output width.
    pub n_out: usize,

    /// State width of one direction.
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

    /// Merge mode.
    pub merge_mode: MergeMode,

    /// Accumulator type of the gate multiplications.
    pub accum_dense_type: NamedType,

    /// Accumulator type.
    pub accum_type: NamedType,

    /// Weight type, bound from the backward direction.
    pub weight_type: NamedType,

    /// Bias type, bound from the backward direction.
    pub bias_type: NamedType,

    /// Forward direction.
    pub forward: PerDirectionConfig,

    /// Backward direction.
    pub backward: PerDirectionConfig,
}

/// Call of the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    /// Kernel name.
    pub kernel: &'static str,

    /// Template parameters: input type, output type, config.
    pub type_params: [String; 3],

    /// Input buffer, output buffer, and the weights in [`CALL_WEIGHT_ORDER`].
    pub args: ArrayVec<String, 10>,
}

/// Record of a derived bundle, borrowed from it.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy)]
pub enum ConfigRecord<'a> {
    Multiplier(&'a MultiplierConfig),
    Activation(&'a ActivationConfig),
    Direction(&'a PerDirectionConfig),
    Bidirectional(&'a BidirectionalConfig),
}

impl ConfigRecord<'_> {
    /// Struct name of the record.
    pub fn name(&self) -> &str {
        match self {
            Self::Multiplier(config) => &config.name,
            Self::Activation(config) => config.name(),
            Self::Direction(config) => &config.name,
            Self::Bidirectional(config) => &config.name,
        }
    }
}

/// Everything derived for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerBundle {
    /// Layer index.
    pub index: usize,

    /// Parent configuration, owning both directions.
    pub config: BidirectionalConfig,

    /// Kernel call.
    pub call: FunctionCall,
}

impl LayerBundle {
    /// Returns all records in definition order: every record comes after the records it refers to.
    pub fn records(&self) -> Vec<ConfigRecord<'_>> {
        let mut records = vec![];
        for direction in [&self.config.forward, &self.config.backward] {
            records.push(ConfigRecord::Multiplier(&direction.input_multiplier));
            records.push(ConfigRecord::Multiplier(&direction.state_multiplier));
            records.push(ConfigRecord::Activation(&direction.recurrent_activation));
            records.push(ConfigRecord::Activation(&direction.activation));
        }
        records.push(ConfigRecord::Direction(&self.config.forward));
        records.push(ConfigRecord::Direction(&self.config.backward));
        records.push(ConfigRecord::Bidirectional(&self.config));
        records
    }

    /// Returns the types the layer introduces, each once: the accumulators, then per direction the
    /// state, activation result and hard-activation constant types.
    ///
    /// Weight, bias and input/output types are owned by whoever provides those tensors.
    pub fn types(&self) -> Vec<&NamedType> {
        let mut types = vec![&self.config.accum_dense_type, &self.config.accum_type];
        for direction in [&self.config.forward, &self.config.backward] {
            types.extend([&direction.state_type, &direction.act_type, &direction.recr_act_type]);
            for activation in [&direction.activation, &direction.recurrent_activation] {
                if let ActivationConfig::Hard(hard) = activation {
                    types.extend([&hard.slope.typ, &hard.shift.typ]);
                }
            }
        }
        types
    }
}

fn ensure_shared<T: PartialEq + fmt::Debug>(field: &'static str, forward: T, backward: T) -> Result<(), ConfigError> {
    if forward == backward {
        Ok(())
    } else {
        Err(ConfigError::ConsistencyMismatch { field, forward: format!("{:?}", forward), backward: format!("{:?}", backward) })
    }
}

/// Checks that the two directions agree on every field they must share.
pub fn check_consistency(forward: &PerDirectionConfig, backward: &PerDirectionConfig) -> Result<(), ConfigError> {
    ensure_shared("n_in", forward.n_in, backward.n_in)?;
    ensure_shared("n_sequence", forward.n_sequence, backward.n_sequence)?;
    ensure_shared("strategy", forward.strategy, backward.strategy)?;
    ensure_shared("reuse_factor", forward.reuse_factor, backward.reuse_factor)?;
    ensure_shared("merge_mode", forward.merge_mode, backward.merge_mode)?;
    ensure_shared("cell_kind", forward.cell_kind, backward.cell_kind)?;
    ensure_shared("use_static", forward.use_static_reuse, backward.use_static_reuse)?;
    Ok(())
}

impl BidirectionalConfig {
    /// Derives both directions of `layer` and assembles them under the parent configuration.
    pub fn derive<L, R>(layer: &L, registry: &R) -> Result<Self, ConfigError>
    where
        L: LayerProvider + ?Sized,
        R: PrecisionRegistry + ?Sized,
    {
        let forward = PerDirectionConfig::derive(layer, Direction::Forward, registry)?;
        let backward = PerDirectionConfig::derive(layer, Direction::Backward, registry)?;
        check_consistency(&forward, &backward)?;

        // The parent typedefs refer to the backward tensors; each direction keeps its own.
        let weight_type = get_weight(layer, WeightName::BackwardWeight)?.typ.clone();
        let bias_type = get_weight(layer, WeightName::BackwardBias)?.typ.clone();

        let config = Self {
            name: Symbols::layer(layer.index()).config(),
            n_in: forward.n_in,
            n_out: forward.n_out,
            n_state: forward.n_state,
            n_sequence: forward.n_sequence,
            n_sequence_out: forward.n_sequence_out,
            strategy: forward.strategy,
            io_type: forward.io_type,
            reuse_factor: forward.reuse_factor,
            merge_mode: forward.merge_mode,
            accum_dense_type: forward.accum_dense_type.clone(),
            accum_type: forward.accum_type.clone(),
            weight_type,
            bias_type,
            forward,
            backward,
        };

        debug!("{}: n_out={} merge_mode={}", config.name, config.n_out, config.merge_mode);
        Ok(config)
    }
}

impl FunctionCall {
    /// Derives the kernel call of `layer` configured by `config`.
    pub fn derive<L: LayerProvider + ?Sized>(layer: &L, config: &BidirectionalConfig) -> Result<Self, ConfigError> {
        let (input, output) = (layer.input(), layer.output());

        let mut args = ArrayVec::new();
        args.push(input.name.clone());
        args.push(output.name.clone());
        for name in CALL_WEIGHT_ORDER {
            args.push(get_weight(layer, name)?.var_name.clone());
        }

        Ok(Self {
            kernel: KERNEL_NAME,
            type_params: [input.typ.name.clone(), output.typ.name.clone(), config.name.clone()],
            args,
        })
    }
}

/// Derives the configuration bundle of a bidirectional layer, attributing any error to the layer.
pub fn derive_layer<L, R>(layer: &L, registry: &R) -> Result<LayerBundle, LayerError>
where
    L: LayerProvider + ?Sized,
    R: PrecisionRegistry + ?Sized,
{
    let index = layer.index();
    let config = BidirectionalConfig::derive(layer, registry).map_err(|error| LayerError::new(index, error))?;
    let call = FunctionCall::derive(layer, &config).map_err(|error| LayerError::new(index, error))?;
    Ok(LayerBundle { index, config, call })
}
