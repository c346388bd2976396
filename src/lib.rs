//! Larder: tag-scoped cache invalidation for statically rendered recipe sites.

pub mod application;
pub mod cache;
pub mod config;
pub mod infra;
