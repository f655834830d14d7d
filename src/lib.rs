// Energy Forecast Library
// 地域ごとのエネルギー消費量予測

pub mod api;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod display;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod predict;
pub mod result;
pub mod series;

pub use commands::{Cli, run};
