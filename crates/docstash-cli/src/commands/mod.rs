//! Command handlers

pub mod config;
pub mod get;
pub mod query;
