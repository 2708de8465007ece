//! Core functionality: configuration, data model, errors, and the
//! waterfall controller itself.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
