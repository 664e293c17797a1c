//! A YAML emitter for trees of scalar/sequence/mapping nodes that may carry
//! a free-form comment and/or a conditional template block.
//!
//! This crate does not parse YAML; it only emits it. The tree is built up by
//! a caller (typically from `serde_yaml::Value` via [`Node::from_value`]),
//! decorated with comments/template blocks where desired, and handed to an
//! [`Encoder`] for serialization.

#[macro_use]
extern crate failure;

mod encoder;
mod error;
mod node;
mod wrap;

pub use encoder::{Encoder, EncoderConfig};
pub use error::{EmitError, Result};
pub use node::{Annotation, Mapping, Node, Sequence};
