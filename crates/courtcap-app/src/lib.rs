// Library root: re-exports all modules so integration tests and the binary
// share one public API.

pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod names;
pub mod report;
pub mod sources;
