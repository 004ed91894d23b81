//! CLI library components for regrep.

pub mod logging;
pub mod pipeline;
