//! Model: a collection of bidirectional layers compiled together.

use std::collections::HashSet;

use log::info;
use thiserror::Error;

use crate::config::{derive_layer, LayerBundle};
use crate::layer::LayerNode;
use crate::precision::PrecisionRegistry;
use crate::LayerError;

#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("layer index {index} is used by more than one layer")]
    DuplicateIndex { index: usize },

    #[error(transparent)]
    Layer(#[from] LayerError),
}

/// Model.
#[derive(Debug, Default)]
pub struct Model {
    /// Layers, in the order they are emitted.
    pub layers: Vec<LayerNode>,
}

impl Model {
    /// Adds the given layer to the model.
    pub fn add(&mut self, layer: LayerNode) { self.layers.push(layer); }

    /// Derives the configuration bundle of every layer, in insertion order.
    ///
    /// Layers are independent of each other; the first failing layer aborts the derivation.
    pub fn derive<R: PrecisionRegistry + ?Sized>(&self, registry: &R) -> Result<Vec<LayerBundle>, ModelError> {
        let mut indices = HashSet::new();
        for layer in self.layers.iter() {
            if !indices.insert(layer.index) {
                return Err(ModelError::DuplicateIndex { index: layer.index });
            }
        }

        let bundles = self.layers.iter().map(|layer| derive_layer(layer, registry)).collect::<Result<Vec<_>, _>>()?;
        info!("derived configurations of {} layer(s)", bundles.len());
        Ok(bundles)
    }
}
