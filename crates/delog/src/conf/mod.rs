//! Conf module: configuration model and loading from file and environment.

pub mod load;
pub mod model;

pub use model::{DelogConfig, OutputFormat};
