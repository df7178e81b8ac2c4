//! TOML description of a model.

use std::collections::BTreeMap;

use rnnflow::layer::*;
use rnnflow::precision::{NamedType, PrecisionType};
use rnnflow::{ConfigError, Model};
use serde::Deserialize;

/// Whole model file: shared settings and the layers.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDesc {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default, rename = "layer")]
    pub layers: Vec<LayerDesc>,
}

/// Defaults applied to every layer that does not override them.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub strategy: String,
    pub io_type: String,
    pub reuse_factor: usize,
    pub static_reuse: bool,
    pub merge_mode: String,
    pub accum_precision: String,
    pub dense_accum_precision: String,
    pub state_precision: String,
    pub activation_precision: String,
    pub table_size: usize,
    pub table_precision: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strategy: "latency".to_string(),
            io_type: "io_parallel".to_string(),
            reuse_factor: 1,
            static_reuse: true,
            merge_mode: "concat".to_string(),
            accum_precision: "ap_fixed<32,16>".to_string(),
            dense_accum_precision: "ap_fixed<32,16>".to_string(),
            state_precision: "ap_fixed<16,6>".to_string(),
            activation_precision: "ap_fixed<16,6>".to_string(),
            table_size: 1024,
            table_precision: "ap_fixed<18,8>".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DimDesc {
    pub name: String,
    pub size: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: String,
    pub precision: String,
    pub dims: Vec<DimDesc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightDesc {
    pub var: String,
    #[serde(rename = "type")]
    pub typ: String,
    pub precision: String,
    pub elements: usize,
    #[serde(default)]
    pub zeros: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HardDesc {
    pub slope: f64,
    pub shift: f64,
    pub slope_precision: Option<String>,
    pub shift_precision: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerDesc {
    pub index: usize,
    pub name: String,
    pub cell: String,
    pub activation: String,
    pub recurrent_activation: String,
    #[serde(default)]
    pub return_sequences: bool,
    pub strategy: Option<String>,
    pub io_type: Option<String>,
    pub reuse_factor: Option<usize>,
    pub static_reuse: Option<bool>,
    pub merge_mode: Option<String>,
    pub accum_precision: Option<String>,
    pub dense_accum_precision: Option<String>,
    pub state_precision: Option<String>,
    pub activation_precision: Option<String>,
    pub table_size: Option<usize>,
    pub table_precision: Option<String>,
    pub hard_activation: Option<HardDesc>,
    pub hard_recurrent_activation: Option<HardDesc>,
    pub input: VariableDesc,
    pub output: VariableDesc,
    pub weights: BTreeMap<String, WeightDesc>,
}

fn precision(layer: Option<&String>, default: &str) -> Result<PrecisionType, ConfigError> {
    layer.map_or(default, String::as_str).parse()
}

impl VariableDesc {
    fn into_variable(self) -> Result<Variable, ConfigError> {
        let typ = NamedType::new(self.typ, self.precision.parse()?);
        let dims = self.dims.into_iter().map(|dim| Dim::new(dim.name, dim.size)).collect();
        Ok(Variable::new(self.name, dims, typ))
    }
}

impl HardDesc {
    fn into_params(self) -> Result<HardActivationParams, ConfigError> {
        let default = HardActivationParams::default();
        Ok(HardActivationParams {
            slope: self.slope,
            shift: self.shift,
            slope_precision: self.slope_precision.map_or(Ok(default.slope_precision), |p| p.parse())?,
            shift_precision: self.shift_precision.map_or(Ok(default.shift_precision), |p| p.parse())?,
        })
    }
}

impl LayerDesc {
    /// Parses and validates the layer, filling unset attributes from `settings`.
    pub fn into_node(self, settings: &Settings) -> Result<LayerNode, ConfigError> {
        let attrs = RecurrentAttributes::new(self.cell.parse()?, self.activation.parse()?, self.recurrent_activation.parse()?)
            .with_return_sequences(self.return_sequences)
            .with_strategy(self.strategy.as_ref().unwrap_or(&settings.strategy).parse()?)
            .with_io_type(self.io_type.as_ref().unwrap_or(&settings.io_type).parse()?)
            .with_reuse_factor(self.reuse_factor.unwrap_or(settings.reuse_factor))
            .with_static_reuse(self.static_reuse.unwrap_or(settings.static_reuse))
            .with_merge_mode(self.merge_mode.as_ref().unwrap_or(&settings.merge_mode).parse()?)
            .with_accum_precision(precision(self.accum_precision.as_ref(), &settings.accum_precision)?)
            .with_dense_accum_precision(precision(self.dense_accum_precision.as_ref(), &settings.dense_accum_precision)?)
            .with_state_precision(precision(self.state_precision.as_ref(), &settings.state_precision)?)
            .with_activation_precision(precision(self.activation_precision.as_ref(), &settings.activation_precision)?)
            .with_table(
                self.table_size.unwrap_or(settings.table_size),
                precision(self.table_precision.as_ref(), &settings.table_precision)?,
            )
            .with_hard_activation(self.hard_activation.map_or(Ok(HardActivationParams::default()), HardDesc::into_params)?)
            .with_hard_recurrent_activation(
                self.hard_recurrent_activation.map_or(Ok(HardActivationParams::default()), HardDesc::into_params)?,
            );

        let mut node =
            LayerNode::new(self.index, self.name, self.input.into_variable()?, self.output.into_variable()?, attrs)?;
        for (slot, weight) in self.weights {
            let typ = NamedType::new(weight.typ, weight.precision.parse()?);
            node = node.with_weight(slot.parse()?, WeightTensor::new(weight.var, weight.elements, weight.zeros, typ)?);
        }
        Ok(node)
    }
}

impl ModelDesc {
    /// Builds the model, attributing errors to the layer they come from.
    pub fn into_model(self) -> anyhow::Result<Model> {
        let mut model = Model::default();
        for layer in self.layers {
            let index = layer.index;
            let node = layer
                .into_node(&self.settings)
                .map_err(|error| rnnflow::LayerError::new(index, error))?;
            model.add(node);
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rnnflow::VivadoRegistry;

    const WEIGHTS: &str = r#"
[layer.weights.forward_weight]
var = "w2_f"
type = "weight2_f_t"
precision = "ap_fixed<16,6>"
elements = 192
zeros = 32

[layer.weights.forward_bias]
var = "b2_f"
type = "bias2_f_t"
precision = "ap_fixed<16,6>"
elements = 24

[layer.weights.forward_recurrent_weight]
var = "wr2_f"
type = "weight2_f_t"
precision = "ap_fixed<16,6>"
elements = 192

[layer.weights.forward_recurrent_bias]
var = "br2_f"
type = "bias2_f_t"
precision = "ap_fixed<16,6>"
elements = 24

[layer.weights.backward_weight]
var = "w2_b"
type = "weight2_b_t"
precision = "ap_fixed<16,6>"
elements = 192

[layer.weights.backward_bias]
var = "b2_b"
type = "bias2_b_t"
precision = "ap_fixed<16,6>"
elements = 24

[layer.weights.backward_recurrent_weight]
var = "wr2_b"
type = "weight2_b_t"
precision = "ap_fixed<16,6>"
elements = 192

[layer.weights.backward_recurrent_bias]
var = "br2_b"
type = "bias2_b_t"
precision = "ap_fixed<16,6>"
elements = 24
"#;

    fn document(layer: &str) -> String {
        format!(
            r#"
[settings]
reuse_factor = 2
dense_accum_precision = "ap_fixed<24,12>"

[[layer]]
index = 2
name = "bidirectional"
{}

[layer.input]
name = "input_1"
type = "input_t"
precision = "ap_fixed<16,6>"
dims = [{{ name = "N_TIME_STEPS_1", size = 20 }}, {{ name = "N_INPUT_1_1", size = 8 }}]

[layer.output]
name = "layer2_out"
type = "result_t"
precision = "ap_fixed<16,6>"
dims = [{{ name = "N_LAYER_2", size = 16 }}]
{}"#,
            layer, WEIGHTS
        )
    }

    fn parse(layer: &str) -> anyhow::Result<Model> { toml::from_str::<ModelDesc>(&document(layer))?.into_model() }

    #[test]
    fn gru_layer() {
        let model = parse(
            r#"cell = "gru"
activation = "tanh"
recurrent_activation = "hard_sigmoid"
merge_mode = "sum"
hard_recurrent_activation = { slope = 0.25, shift = 0.5 }"#,
        )
        .unwrap();

        let node = &model.layers[0];
        assert_eq!(node.attributes.cell_kind, CellKind::Gru);
        assert_eq!(node.attributes.reuse_factor, 2);
        assert_eq!(node.attributes.merge_mode, MergeMode::Sum);
        assert_eq!(node.attributes.hard_recurrent_activation.slope, 0.25);
        assert_eq!(node.weights.len(), 8);
        assert_eq!(node.attributes.dense_accum_precision, "ap_fixed<24,12>".parse::<PrecisionType>().unwrap());
        assert_eq!(node.attributes.accum_precision, PrecisionType::fixed(32, 16));

        let bundles = model.derive(&VivadoRegistry).unwrap();
        let mult = &bundles[0].config.forward.input_multiplier;
        assert_eq!((mult.n_in, mult.n_out, mult.multiplier_limit), (8, 24, 20));
    }

    #[test]
    fn unknown_activation() {
        let err = parse(
            r#"cell = "lstm"
activation = "hard_swish"
recurrent_activation = "sigmoid""#,
        )
        .unwrap_err();

        assert_eq!(
            err.downcast_ref::<rnnflow::LayerError>().map(|e| &e.error),
            Some(&ConfigError::UnknownActivationKind("hard_swish".to_string()))
        );
    }

    #[test]
    fn unknown_attribute() {
        let err = parse(
            r#"cell = "lstm"
activation = "tanh"
recurrent_activation = "sigmoid"
strategy = "fastest""#,
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<rnnflow::LayerError>().map(|e| &e.error),
            Some(ConfigError::UnknownAttribute { attribute: "strategy", .. })
        ));
    }
}
