//! Prompt composition.

use rummageo_llm::{LlmRequest, Message};

use crate::enriched::EnrichedTerms;

pub const SYSTEM_PROMPT: &str = "You are an AI hypothesis generator for RummaGEO (automatically generated signatures from GEO). You should act as a biologist in hypothesizing why a high overlap may exist between the users gene set (which they will provide a description of) and the automatically generated gene set from GEO (Gene expression omnibus).";

pub struct PromptInput<'a> {
    pub term: &'a str,
    pub gse_summary: &'a str,
    pub user_description: &'a str,
    pub enriched: &'a EnrichedTerms,
}

pub fn user_prompt(input: &PromptInput<'_>) -> String {
    format!(
        "Here are two gene sets that highly overlap. The first is from a user-submitted gene set. \
The second is a gene set automatically computed between two conditions in a study from the Gene Expression Omnibus (GEO). \
Based upon the term name (formatted as condition 1 vs. condition 2) and the abstract of the GEO gene set, and the user submitted description of their gene set, please hypothesize about why these two gene sets have a significant high overlap.
You should mention both the abstract of the GEO gene set and the user submitted description of their gene set in your hypothesis. You will also be provided with enrichment results from the Enrichr database to help you generate your hypothesis which shows significantly overlapping functional terms from the overlapping genes of the two sets.
For each enrichment term that appears in your response, the term should appear in the exact form it was given to you (do not exclude any words or characters from a term. For example, \
Complement And Coagulation Cascades WP558 should appear as Complement And Coagulation Cascades WP558, not Complement And Coagulation Cascades). Also, please don't use quotes around the enriched term names.
Gene set term 1 (from GEO): {term}
\"up\" or \"dn\" in this term name indicates if the genes were upregulated or downregulated in the signature
abstract of paper for gene set term 1: {summary}

Gene set term 2: user submitted gene set
abstract of paper for gene set term 2: {description}

Enriched Terms from overlapping genes of the two sets:
{enriched}",
        term = input.term,
        summary = input.gse_summary,
        description = input.user_description,
        enriched = input.enriched.prompt_lines(),
    )
}

/// Chat request with deterministic sampling.
pub fn completion_request(input: &PromptInput<'_>, model: &str, max_tokens: u32, temperature: f32) -> LlmRequest {
    LlmRequest {
        messages: vec![Message::system(SYSTEM_PROMPT), Message::user(user_prompt(input))],
        model: Some(model.to_string()),
        max_tokens: Some(max_tokens),
        temperature: Some(temperature),
    }
}
