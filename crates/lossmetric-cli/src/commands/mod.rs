//! CLI command implementations

pub mod external;
pub mod plugins;
pub mod reporting;
pub mod stat;
