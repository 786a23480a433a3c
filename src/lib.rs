pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod mount;
pub mod orchestrator;
pub mod outputs;
pub mod push;
pub mod state;
pub mod tags;
pub mod tools;
