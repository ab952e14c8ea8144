//! rummageo-query - client side of the RummaGEO GraphQL API.
//! - GraphQL transport and operation documents
//! - Paginated, filterable, sortable enrichment queries
//! - Term-enrichment aggregation (tables, bar charts, word clouds)
//! - Gene-set views, term search, GMT and TSV export

pub mod graphql;
pub mod documents;
pub mod backgrounds;
pub mod enrichment;
pub mod rows;
pub mod terms;
pub mod gene_sets;
pub mod gmt;
pub mod export;

pub use enrichment::{EnrichmentQueryState, EnrichmentService, QueryOutcome, SortColumn, SortDirection, PAGE_SIZE};
pub use graphql::{GraphQlClient, GraphQlExecutor};

#[cfg(test)]
pub(crate) mod mock;
