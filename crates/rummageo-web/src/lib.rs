//! rummageo-web - HTTP front end for the RummaGEO enrichment pipeline.
//! Serves:
//!   - Paginated gene-set enrichment with URL-encoded table state
//!   - Key-term and Enrichr-term tables with charts and TSV export
//!   - LLM hypotheses for a selected signature
//!   - Gene-set views, term search and G2SG hand-off
//!   - Pass-through to the upstream GraphQL API and bulk downloads

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
