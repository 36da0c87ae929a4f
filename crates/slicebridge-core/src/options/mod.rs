//! # Options Module
//!
//! Configuration values as they travel through the bridge:
//! - [`OptionValue`]: the tagged value carried on the config bus
//! - [`ConfigOption`] / [`PrintConfig`]: typed options stored in presets
//! - [`OptionMetadata`] / [`SchemaRegistry`]: per-key labels, units and bounds

mod config;
mod schema;
mod value;

pub use config::{ConfigOption, PrintConfig};
pub use schema::{OptionMetadata, SchemaRegistry, StaticSchemaRegistry};
pub use value::OptionValue;
