//! RnnFlow: configuration synthesis for fixed-point bidirectional recurrent layers in HLS.
//!
//! Given the shapes, attributes and weight statistics of a bidirectional LSTM/GRU layer, derives a complete
//! and internally consistent set of `nnet` kernel configurations and the call binding the layer's weights.

// # Tries to deny all lints (`rustc -W help`).
#![deny(absolute_paths_not_starting_with_crate)]
#![deny(anonymous_parameters)]
#![deny(explicit_outlives_requirements)]
#![deny(keyword_idents)]
#![deny(macro_use_extern_crate)]
#![deny(missing_debug_implementations)]
#![deny(non_ascii_idents)]
#![deny(rust_2018_idioms)]
#![deny(trivial_numeric_casts)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_extern_crates)]
#![deny(unused_import_braces)]
//
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::bare_urls)]
//
#![allow(elided_lifetimes_in_paths)]

pub mod config;
mod error;
pub mod hls;
pub mod layer;
pub mod model;
pub mod precision;
pub mod utils;

pub use config::{derive_layer, LayerBundle};
pub use error::*;
pub use model::{Model, ModelError};
pub use precision::{PrecisionRegistry, VivadoRegistry};
pub use utils::*;
