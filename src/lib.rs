// Library for tests to access modules

pub mod alerts;
pub mod commands;
pub mod config;
pub mod error;
pub mod guard;
pub mod history;
pub mod host;
pub mod models;
pub mod ranker;
pub mod reporter;
pub mod routes;
pub mod sampler;
pub mod snapshot_registry;
pub mod stats;
pub mod version;
pub mod watchdog;
