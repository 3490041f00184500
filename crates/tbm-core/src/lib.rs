pub mod config;
pub mod logging;

// Core modules
pub mod batch;
pub mod pacing;
pub mod retry;
pub mod runner;
