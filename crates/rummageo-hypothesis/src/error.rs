use std::time::Duration;

use thiserror::Error;

use rummageo_common::RummageoError;
use rummageo_llm::LlmError;

use crate::validation::DescriptionError;

#[derive(Debug, Error)]
pub enum HypothesisError {
    #[error("{0}")]
    InvalidDescription(#[from] DescriptionError),

    #[error("Error fetching enrichment results: {0}")]
    Enrichr(#[source] RummageoError),

    #[error("Error fetching study summary: {0}")]
    Summary(#[source] RummageoError),

    #[error("Error generating hypothesis: {0}")]
    Llm(#[from] LlmError),

    #[error("{step} timed out after {}s", .after.as_secs())]
    Timeout { step: &'static str, after: Duration },
}

impl HypothesisError {
    /// Banner text shown to the user. Validation messages stand alone;
    /// failed calls invite a retry.
    pub fn banner_message(&self) -> String {
        match self {
            HypothesisError::InvalidDescription(e) => e.to_string(),
            other => format!("{other}. Please try again."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_messages() {
        let e = HypothesisError::from(DescriptionError::TooShort { words: 3 });
        assert_eq!(e.banner_message(), "The gene set description must be at least 100 words");

        let e = HypothesisError::Timeout { step: "Enrichr", after: Duration::from_secs(30) };
        assert_eq!(e.banner_message(), "Enrichr timed out after 30s. Please try again.");
    }
}
