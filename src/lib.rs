pub mod api;
pub mod archive;
pub mod bundle;
pub mod config;
pub mod humanize;
pub mod job;
pub mod observability;
pub mod retrieval;
pub mod workspace;
