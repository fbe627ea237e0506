pub mod cli;
pub mod config;
pub mod dax;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod filter;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod sink;
pub mod summary;
pub mod tree;
pub mod usage;
pub mod util;
pub mod visual;
pub mod walker;
