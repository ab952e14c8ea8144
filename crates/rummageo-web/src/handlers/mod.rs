//! HTTP handlers for all routes.

pub mod downloads;
pub mod enrich;
pub mod gene_set;
pub mod health;
pub mod hypothesis;
pub mod proxy;
pub mod terms;
