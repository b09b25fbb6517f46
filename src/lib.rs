pub mod auditor;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod naming;
pub mod runner;
pub mod secret;
pub mod server;
pub mod util;
