//! Layer fixtures shared by the integration tests.

#![allow(dead_code)]

use rnnflow::layer::*;
use rnnflow::precision::{NamedType, PrecisionType};

pub const INDEX: usize = 4;

pub fn var(name: &str, typ: &str, dims: &[usize]) -> Variable {
    Variable::new(
        name,
        dims.iter().enumerate().map(|(i, size)| Dim::new(format!("N_{}_{}", name.to_uppercase(), i), *size)).collect(),
        NamedType::new(typ, PrecisionType::fixed(16, 6)),
    )
}

/// Variable name of the tensor in `slot`, e.g. `wr4_b` for the backward recurrent weight.
pub fn var_name(slot: WeightName) -> String {
    let stem = match slot {
        WeightName::ForwardWeight | WeightName::BackwardWeight => "w",
        WeightName::ForwardBias | WeightName::BackwardBias => "b",
        WeightName::ForwardRecurrentWeight | WeightName::BackwardRecurrentWeight => "wr",
        WeightName::ForwardRecurrentBias | WeightName::BackwardRecurrentBias => "br",
    };
    let direction = if slot.as_str().starts_with("forward") { "f" } else { "b" };
    format!("{}{}_{}", stem, INDEX, direction)
}

pub fn tensor(slot: WeightName, elements: usize, zeros: usize) -> WeightTensor {
    let var_name = var_name(slot);
    let typ = NamedType::new(format!("{}_t", var_name), PrecisionType::fixed(16, 6));
    WeightTensor::new(var_name, elements, zeros, typ).unwrap()
}

pub fn attrs(cell_kind: CellKind) -> RecurrentAttributes {
    RecurrentAttributes::new(cell_kind, ActivationKind::Tanh, ActivationKind::Sigmoid)
}

/// Layer reading `[20, 8]` from `layer3_out` with dense weights sized for the given output dims.
pub fn layer(attrs: RecurrentAttributes, output_dims: &[usize]) -> LayerNode {
    let feature = if attrs.return_sequences { output_dims.get(1) } else { output_dims.first() };
    let n_state = feature.copied().unwrap_or(0) / 2;
    let n_gates = n_state * attrs.cell_kind.gate_count();

    let mut node = LayerNode::new(
        INDEX,
        "bidirectional",
        var("layer3_out", "layer3_t", &[20, 8]),
        var("layer4_out", "result_t", output_dims),
        attrs,
    )
    .unwrap();

    for slot in WeightName::ALL {
        let elements = match slot {
            WeightName::ForwardWeight | WeightName::BackwardWeight => 8 * n_gates,
            WeightName::ForwardRecurrentWeight | WeightName::BackwardRecurrentWeight => n_state * n_gates,
            _ => n_gates,
        };
        node = node.with_weight(slot, tensor(slot, elements, 0));
    }
    node
}
