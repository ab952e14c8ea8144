//! rummageo-sources - clients for the external services around RummaGEO.
//!
//!   enrichr - gene list upload and library enrichment (hypothesis context)
//!   pubmed  - E-utilities search and abstract fetch
//!   g2sg    - gene set registration for knowledge-graph analysis

pub mod enrichr;
pub mod g2sg;
pub mod pubmed;

pub use enrichr::{EnrichrClient, EnrichrRow, EnrichrSource, UserList};
pub use g2sg::G2sgClient;
pub use pubmed::{LiteratureSource, PubMedArticle, PubMedClient};
