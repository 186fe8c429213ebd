pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod naming;
pub mod output;
pub mod run_info;
pub mod run_stats;
pub mod sample_sheet;
