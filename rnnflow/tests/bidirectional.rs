mod common;

use common::*;
use rnnflow::config::*;
use rnnflow::layer::*;
use rnnflow::{derive_layer, ConfigError, LayerError, Model, ModelError, VivadoRegistry};

/// Provider whose backward direction sees different attributes than its forward direction.
#[derive(Debug)]
struct SkewedProvider {
    node: LayerNode,
    backward: RecurrentAttributes,
}

impl LayerProvider for SkewedProvider {
    fn index(&self) -> usize { self.node.index }

    fn input(&self) -> &Variable { &self.node.input }

    fn output(&self) -> &Variable { &self.node.output }

    fn attributes(&self, direction: Direction) -> &RecurrentAttributes {
        match direction {
            Direction::Forward => &self.node.attributes,
            Direction::Backward => &self.backward,
        }
    }

    fn weight(&self, name: WeightName) -> Option<&WeightTensor> { self.node.weight(name) }
}

fn all_multipliers(bundle: &LayerBundle) -> [&MultiplierConfig; 4] {
    let (forward, backward) = (&bundle.config.forward, &bundle.config.backward);
    [&forward.input_multiplier, &forward.state_multiplier, &backward.input_multiplier, &backward.state_multiplier]
}

#[test]
fn lstm_with_sequences() {
    let node = layer(attrs(CellKind::Lstm).with_return_sequences(true), &[20, 16])
        .with_weight(WeightName::ForwardWeight, tensor(WeightName::ForwardWeight, 128, 32));
    let bundle = derive_layer(&node, &VivadoRegistry).unwrap();

    let mult = &bundle.config.forward.input_multiplier;
    assert_eq!(mult.n_in, 8);
    assert_eq!(mult.n_out, 32);
    assert_eq!(mult.reuse_factor, 8);
    assert_eq!(mult.n_zeros, 32);
    assert_eq!(mult.n_nonzeros, 96);
    assert_eq!(mult.multiplier_limit, 28);

    assert_eq!(bundle.config.n_state, 8);
    assert_eq!(bundle.config.n_out, 16);
    assert_eq!(bundle.config.n_sequence, 20);
    assert_eq!(bundle.config.n_sequence_out, 20);
}

#[test]
fn gate_count_scales_every_multiplier() {
    for (cell_kind, gates) in [(CellKind::Lstm, 4), (CellKind::Gru, 3)] {
        let bundle = derive_layer(&layer(attrs(cell_kind), &[16]), &VivadoRegistry).unwrap();

        for mult in all_multipliers(&bundle) {
            assert_eq!(mult.n_out, 8 * gates, "{}", mult.name);
        }
        for direction in [&bundle.config.forward, &bundle.config.backward] {
            assert_eq!(direction.cell_kind, cell_kind);
            assert_eq!(direction.state_multiplier.n_in, 8);
            assert_eq!(direction.state_multiplier.reuse_factor, 8);
            assert_eq!(direction.activation.n_in(), 8);
            assert_eq!(direction.recurrent_activation.n_in(), 8 * (gates - 1));
        }
    }
}

#[test]
fn return_sequences_selects_dimension_branch() {
    let with = derive_layer(&layer(attrs(CellKind::Gru).with_return_sequences(true), &[12, 10]), &VivadoRegistry).unwrap();
    assert_eq!((with.config.n_sequence_out, with.config.n_out, with.config.n_state), (12, 10, 5));

    let without = derive_layer(&layer(attrs(CellKind::Gru), &[10]), &VivadoRegistry).unwrap();
    assert_eq!((without.config.n_sequence_out, without.config.n_out, without.config.n_state), (1, 10, 5));

    // Only the leading output dim is read when the sequence is not returned.
    let leading = derive_layer(&layer(attrs(CellKind::Gru), &[10, 3]), &VivadoRegistry).unwrap();
    assert_eq!((leading.config.n_sequence_out, leading.config.n_out), (1, 10));
}

#[test]
fn odd_output_is_rejected() {
    let err = derive_layer(&layer(attrs(CellKind::Gru), &[7]), &VivadoRegistry).unwrap_err();
    assert_eq!(err.index, INDEX);
    assert!(matches!(err.error, ConfigError::InvalidDimension(_)));

    let bundle = derive_layer(&layer(attrs(CellKind::Gru), &[8]), &VivadoRegistry).unwrap();
    assert_eq!(bundle.config.n_state, 4);
}

#[test]
fn directions_share_layer_attributes() {
    let node = layer(attrs(CellKind::Lstm).with_merge_mode(MergeMode::Sum).with_static_reuse(false), &[16]);
    let bundle = derive_layer(&node, &VivadoRegistry).unwrap();
    let (forward, backward) = (&bundle.config.forward, &bundle.config.backward);

    assert_eq!(forward.direction, Direction::Forward);
    assert_eq!(backward.direction, Direction::Backward);
    assert_eq!(forward.n_in, backward.n_in);
    assert_eq!(forward.n_sequence, backward.n_sequence);
    assert_eq!(forward.strategy, backward.strategy);
    assert_eq!(forward.reuse_factor, backward.reuse_factor);
    assert_eq!(forward.cell_kind, backward.cell_kind);
    assert_eq!(forward.merge_mode, MergeMode::Sum);
    assert_eq!(backward.merge_mode, MergeMode::Sum);
    assert!(!forward.use_static_reuse && !backward.use_static_reuse);
    assert!(check_consistency(forward, backward).is_ok());
}

#[test]
fn skewed_merge_mode_is_inconsistent() {
    let node = layer(attrs(CellKind::Gru), &[16]);
    let backward = node.attributes.clone().with_merge_mode(MergeMode::Mul);
    let provider = SkewedProvider { node, backward };

    let err = derive_layer(&provider, &VivadoRegistry).unwrap_err();
    assert_eq!(
        err,
        LayerError::new(
            INDEX,
            ConfigError::ConsistencyMismatch {
                field: "merge_mode",
                forward: "Concat".to_string(),
                backward: "Mul".to_string(),
            }
        )
    );
}

#[test]
fn skewed_cell_kind_is_inconsistent() {
    let node = layer(attrs(CellKind::Gru), &[16]);
    let mut backward = node.attributes.clone();
    backward.cell_kind = CellKind::Lstm;
    let provider = SkewedProvider { node, backward };

    let err = derive_layer(&provider, &VivadoRegistry).unwrap_err();
    assert!(matches!(err.error, ConfigError::ConsistencyMismatch { field: "cell_kind", .. }));
}

#[test]
fn activation_variants_are_chosen_independently() {
    let node = layer(
        RecurrentAttributes::new(CellKind::Lstm, ActivationKind::Tanh, ActivationKind::HardSigmoid),
        &[16],
    );
    let bundle = derive_layer(&node, &VivadoRegistry).unwrap();

    for direction in [&bundle.config.forward, &bundle.config.backward] {
        let ActivationConfig::Table(activation) = &direction.activation else {
            panic!("expected table activation: {:?}", direction.activation)
        };
        assert_eq!(activation.table_size, 1024);

        let ActivationConfig::Hard(recurrent) = &direction.recurrent_activation else {
            panic!("expected hard activation: {:?}", direction.recurrent_activation)
        };
        assert_eq!(recurrent.slope.value, 0.2);
        assert_eq!(recurrent.shift.value, 0.5);
    }

    let (forward, backward) = (&bundle.config.forward, &bundle.config.backward);
    assert_ne!(forward.recurrent_activation.name(), backward.recurrent_activation.name());
}

#[test]
fn call_binds_weights_in_kernel_order() {
    let bundle = derive_layer(&layer(attrs(CellKind::Gru), &[16]), &VivadoRegistry).unwrap();

    assert_eq!(bundle.call.kernel, "bidirectional_array");
    assert_eq!(bundle.call.type_params, ["layer3_t".to_string(), "result_t".to_string(), "config4".to_string()]);
    assert_eq!(
        bundle.call.args.as_slice(),
        ["layer3_out", "layer4_out", "w4_b", "wr4_b", "b4_b", "br4_b", "w4_f", "wr4_f", "b4_f", "br4_f"]
    );
    for (arg, slot) in bundle.call.args[2..].iter().zip(CALL_WEIGHT_ORDER) {
        assert_eq!(*arg, var_name(slot));
    }
}

#[test]
fn parent_types_bind_backward_tensors() {
    let bundle = derive_layer(&layer(attrs(CellKind::Lstm), &[16]), &VivadoRegistry).unwrap();

    assert_eq!(bundle.config.weight_type.name, "w4_b_t");
    assert_eq!(bundle.config.bias_type.name, "b4_b_t");
    assert_eq!(bundle.config.forward.weight_type.name, "w4_f_t");
    assert_eq!(bundle.config.forward.bias_type.name, "b4_f_t");
    assert_eq!(bundle.config.backward.weight_type.name, "w4_b_t");
}

#[test]
fn missing_tensor_is_attributed() {
    let mut node = layer(attrs(CellKind::Gru), &[16]);
    let _ = node.weights.remove(&WeightName::BackwardBias);

    assert_eq!(
        derive_layer(&node, &VivadoRegistry),
        Err(LayerError::new(INDEX, ConfigError::MissingWeightTensor(WeightName::BackwardBias)))
    );
}

#[test]
fn excess_zeros_make_limit_negative() {
    let node = layer(attrs(CellKind::Lstm), &[16])
        .with_weight(WeightName::BackwardWeight, tensor(WeightName::BackwardWeight, 512, 300));

    let err = derive_layer(&node, &VivadoRegistry).unwrap_err();
    assert_eq!(
        err.error,
        ConfigError::NegativeMultiplierLimit { config: "config4_b_1".to_string(), limit: -5 }
    );
}

#[test]
fn literal_tensor_with_excess_zeros_is_an_error() {
    let mut weight = tensor(WeightName::ForwardWeight, 0, 0);
    weight.zero_count = 1;
    let node = layer(attrs(CellKind::Lstm), &[16]).with_weight(WeightName::ForwardWeight, weight);

    assert_eq!(
        derive_layer(&node, &VivadoRegistry),
        Err(LayerError::new(
            INDEX,
            ConfigError::InvalidWeightStatistics { name: var_name(WeightName::ForwardWeight), elements: 0, zeros: 1 }
        ))
    );
}

#[test]
fn records_are_in_definition_order() {
    let bundle = derive_layer(&layer(attrs(CellKind::Gru), &[16]), &VivadoRegistry).unwrap();
    let names = bundle.records().iter().map(|record| record.name().to_string()).collect::<Vec<_>>();

    assert_eq!(
        names,
        [
            "config4_f_1",
            "config4_f_2",
            "sigmoid_config4_f_recr",
            "tanh_config4_f",
            "config4_b_1",
            "config4_b_2",
            "sigmoid_config4_b_recr",
            "tanh_config4_b",
            "config4_f",
            "config4_b",
            "config4",
        ]
    );
}

#[test]
fn model_derives_layers_in_order() {
    let mut model = Model::default();
    model.add(layer(attrs(CellKind::Gru), &[16]));

    let mut second = layer(attrs(CellKind::Lstm), &[8]);
    second.index = 6;
    model.add(second);

    let bundles = model.derive(&VivadoRegistry).unwrap();
    assert_eq!(bundles.iter().map(|bundle| bundle.index).collect::<Vec<_>>(), [4, 6]);
    assert_eq!(bundles[1].config.name, "config6");
}

#[test]
fn model_rejects_duplicate_index() {
    let mut model = Model::default();
    model.add(layer(attrs(CellKind::Gru), &[16]));
    model.add(layer(attrs(CellKind::Gru), &[16]));

    assert_eq!(model.derive(&VivadoRegistry), Err(ModelError::DuplicateIndex { index: INDEX }));
}

#[test]
fn model_attributes_layer_errors() {
    let mut model = Model::default();
    model.add(layer(attrs(CellKind::Gru), &[7]));

    assert!(matches!(
        model.derive(&VivadoRegistry),
        Err(ModelError::Layer(LayerError { index: INDEX, error: ConfigError::InvalidDimension(_) }))
    ));
}
