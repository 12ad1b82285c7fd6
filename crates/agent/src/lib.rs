pub mod actor;
pub mod alert;
pub mod bus;
pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod evaluator;
pub mod logging;
pub mod matcher;
pub mod rule;
pub mod run;
pub mod script;
pub mod shutdown;
