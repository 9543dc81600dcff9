//! EDSR (Enhanced Deep Super-Resolution) network.
//!
//! [`model::build_graph`] assembles the symbolic layer graph used for
//! summaries and diagrams, while [`model::Edsr`] is the same network as
//! `candle` modules, parameterised inside an [`context::ExecutionContext`].

pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod model;
pub mod utils;

pub use error::{Error, Result};
