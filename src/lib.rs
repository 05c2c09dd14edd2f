// Library for tests to access modules

pub mod analysis;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod expr;
pub mod models;
pub mod report;
pub mod snapshot_repo;
pub mod version;
