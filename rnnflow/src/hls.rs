//! Renders derived configurations as HLS C++.

use std::fmt;

use itertools::Itertools;

use crate::config::*;
use crate::utils::indent;

const INDENT: usize = 4;

/// Headers the generated configurations depend on.
pub const INCLUDES: [&str; 1] = ["nnet_utils/nnet_bidirectional.h"];

fn gen_struct(name: &str, base: &str, members: Vec<String>) -> String {
    format!("struct {} : nnet::{} {{\n{}\n}};", name, base, indent(members.join("\n"), INDENT))
}

fn constant(name: &str, value: impl fmt::Display) -> String { format!("static const unsigned {} = {};", name, value) }

fn flag(name: &str, value: bool) -> String { format!("static const bool {} = {};", name, value) }

fn typedef(typ: impl fmt::Display, alias: &str) -> String { format!("typedef {} {};", typ, alias) }

fn activation_alias(alias: &str, config: &ActivationConfig) -> Vec<String> {
    vec![
        "template<class x_T, class y_T, class config_T>".to_string(),
        format!("using {} = nnet::activation::{}<x_T, y_T, config_T>;", alias, config.kind()),
    ]
}

impl fmt::Display for MultiplierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members = vec![
            constant("n_in", self.n_in),
            constant("n_out", self.n_out),
            constant("strategy", format!("nnet::{}", self.strategy)),
            constant("reuse_factor", self.reuse_factor),
            constant("n_zeros", self.n_zeros),
            constant("n_nonzeros", self.n_nonzeros),
            constant("multiplier_limit", "DIV_ROUNDUP(n_in * n_out, reuse_factor) - n_zeros / reuse_factor"),
            flag("store_weights_in_bram", false),
            typedef(&self.accum_type, "accum_t"),
            typedef(&self.bias_type, "bias_t"),
            typedef(&self.weight_type, "weight_t"),
            typedef(format!("ap_uint<{}>", self.index_type_width), "index_t"),
            "template<class x_T, class y_T>".to_string(),
            format!("using product = nnet::product::{}<x_T, y_T>;", self.product_type),
        ];
        f.write_str(&gen_struct(&self.name, "dense_config", members))
    }
}

impl fmt::Display for ActivationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(config) => {
                let members = vec![
                    constant("n_in", config.n_in),
                    constant("table_size", config.table_size),
                    constant("io_type", format!("nnet::{}", config.io_type)),
                    constant("reuse_factor", config.reuse_factor),
                    typedef(&config.table_precision, "table_t"),
                ];
                f.write_str(&gen_struct(&config.name, "activ_config", members))
            }
            Self::Hard(config) => {
                let members = vec![
                    constant("n_in", config.n_in),
                    format!("static const {} slope;", config.slope.typ),
                    format!("static const {} shift;", config.shift.typ),
                    constant("io_type", format!("nnet::{}", config.io_type)),
                    constant("reuse_factor", config.reuse_factor),
                ];
                writeln!(f, "{}", gen_struct(&config.name, "hard_activ_config", members))?;
                writeln!(f, "const {} {}::slope = {};", config.slope.typ, config.name, config.slope.value)?;
                write!(f, "const {} {}::shift = {};", config.shift.typ, config.name, config.shift.value)
            }
        }
    }
}

impl fmt::Display for PerDirectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members = [
            vec![
                typedef(&self.accum_dense_type, "accum_dense_t"),
                typedef(&self.accum_type, "accum_t"),
                typedef(&self.weight_type, "weight_t"),
                typedef(&self.bias_type, "bias_t"),
                typedef(&self.input_multiplier.name, "mult_config1"),
                typedef(&self.state_multiplier.name, "mult_config2"),
                typedef(
                    self.recurrent_activation.name(),
                    &format!("ACT_CONFIG_{}", self.cell_kind.as_str().to_uppercase()),
                ),
            ],
            activation_alias("activation_recr", &self.recurrent_activation),
            vec![typedef(self.activation.name(), "ACT_CONFIG_T")],
            activation_alias("activation", &self.activation),
            vec![
                constant("n_in", self.n_in),
                constant("n_out", self.n_out),
                constant("n_state", self.n_state),
                constant("n_sequence", self.n_sequence),
                constant("n_sequence_out", self.n_sequence_out),
                constant("io_type", format!("nnet::{}", self.io_type)),
                constant("strategy", format!("nnet::{}", self.strategy)),
                constant("reuse_factor", self.reuse_factor),
                flag("store_weights_in_bram", false),
                flag("use_static", self.use_static_reuse),
                typedef(&self.state_type, "state_t"),
                typedef(&self.act_type, "act_t"),
                typedef(&self.recr_act_type, "recr_act_t"),
                constant("merge_mode", format!("nnet::{}", self.merge_mode)),
            ],
        ]
        .concat();
        f.write_str(&gen_struct(&self.name, &format!("{}_config", self.cell_kind), members))
    }
}

impl fmt::Display for BidirectionalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members = vec![
            typedef(&self.accum_dense_type, "accum_dense_t"),
            typedef(&self.accum_type, "accum_t"),
            typedef(&self.weight_type, "weight_t"),
            typedef(&self.bias_type, "bias_t"),
            typedef(&self.forward.name, "config_rnn_layer_f"),
            typedef(&self.backward.name, "config_rnn_layer_b"),
            constant("n_in", self.n_in),
            constant("n_out", self.n_out),
            constant("n_state", self.n_state),
            constant("n_sequence", self.n_sequence),
            constant("n_sequence_out", self.n_sequence_out),
            constant("io_type", format!("nnet::{}", self.io_type)),
            constant("strategy", format!("nnet::{}", self.strategy)),
            constant("reuse_factor", self.reuse_factor),
            flag("store_weights_in_bram", false),
            constant("merge_mode", format!("nnet::{}", self.merge_mode)),
        ];
        f.write_str(&gen_struct(&self.name, "bidirectional_config", members))
    }
}

impl fmt::Display for ConfigRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multiplier(config) => fmt::Display::fmt(config, f),
            Self::Activation(config) => fmt::Display::fmt(config, f),
            Self::Direction(config) => fmt::Display::fmt(config, f),
            Self::Bidirectional(config) => fmt::Display::fmt(config, f),
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nnet::{}<{}>({});", self.kernel, self.type_params.iter().join(", "), self.args.iter().join(", "))
    }
}

impl LayerBundle {
    /// Generates the typedefs of the types the layer introduces.
    pub fn gen_types(&self) -> String { self.types().iter().map(|typ| typedef(&typ.precision, &typ.name)).join("\n") }

    /// Generates the config structs of the layer, in definition order.
    pub fn gen_config(&self) -> String { self.records().iter().map(|record| record.to_string()).join("\n\n") }
}

/// Generates a header defining the types and configs of all given layers.
pub fn gen_header(guard: &str, bundles: &[LayerBundle]) -> String {
    let includes = INCLUDES.iter().map(|include| format!("#include \"{}\"", include)).join("\n");
    let configs = bundles
        .iter()
        .map(|bundle| format!("// layer {}\n{}\n\n{}", bundle.index, bundle.gen_types(), bundle.gen_config()))
        .join("\n\n");
    format!("#ifndef {guard}\n#define {guard}\n\n{}\n\n{}\n\n#endif", includes, configs, guard = guard)
}
