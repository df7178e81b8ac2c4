//! Configuration synthesis.
//!
//! Each layer is derived bottom-up: two multipliers and two activations per direction, one config per
//! direction, and the parent bidirectional config that binds both directions to the kernel call.

mod activation;
mod bidirectional;
mod dense;
mod recurrent;

pub use activation::*;
pub use bidirectional::*;
pub use dense::*;
pub use recurrent::*;

use crate::join_options;
use crate::layer::{ActivationKind, Direction};

/// Generated symbol names of one layer, optionally scoped to a direction.
///
/// Forward and backward symbols never collide, and neither collides with another layer's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbols {
    index: usize,
    direction: Option<Direction>,
}

impl Symbols {
    /// Symbols shared by the whole layer.
    pub fn layer(index: usize) -> Self { Self { index, direction: None } }

    /// Symbols of one direction of the layer.
    pub fn direction(index: usize, direction: Direction) -> Self { Self { index, direction: Some(direction) } }

    fn scoped(&self, stem: String, tail: Option<String>) -> String {
        join_options("_", [Some(stem), self.direction.map(|d| d.suffix().to_string()), tail]).unwrap_or_default()
    }

    /// Config struct name, e.g. `config2_f`.
    pub fn config(&self) -> String { self.scoped(format!("config{}", self.index), None) }

    /// Multiplier config struct name, e.g. `config2_f_1`.
    pub fn multiplier(&self, n: usize) -> String { self.scoped(format!("config{}", self.index), Some(n.to_string())) }

    /// Activation config struct name, e.g. `tanh_config2_f`.
    pub fn activation(&self, kind: ActivationKind) -> String {
        self.scoped(format!("{}_config{}", kind, self.index), None)
    }

    /// Recurrent activation config struct name, e.g. `sigmoid_config2_f_recr`.
    pub fn recurrent_activation(&self, kind: ActivationKind) -> String {
        self.scoped(format!("{}_config{}", kind, self.index), Some("recr".to_string()))
    }

    /// Typedef name, e.g. `state2_f_t` for stem `state`.
    pub fn typ(&self, stem: &str) -> String { self.scoped(format!("{}{}", stem, self.index), Some("t".to_string())) }
}
