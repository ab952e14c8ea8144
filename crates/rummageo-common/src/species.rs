//! Species detection for user gene lists and signature terms.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Human,
    Mouse,
}

impl Species {
    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Human => "human",
            Species::Mouse => "mouse",
        }
    }

    /// Human symbols are all upper case (`STAT3`), mouse symbols are not (`Stat3`).
    pub fn from_gene(symbol: &str) -> Self {
        let has_lower = symbol.chars().any(|c| c.is_lowercase());
        if has_lower { Species::Mouse } else { Species::Human }
    }

    /// Species of a gene list, decided by its first symbol.
    pub fn from_genes(genes: &[String]) -> Self {
        Self::from_gene(genes.first().map(String::as_str).unwrap_or(""))
    }

    /// Species encoded in a signature term; anything not naming human is mouse.
    pub fn from_term(term: &str) -> Self {
        if term.contains("human") { Species::Human } else { Species::Mouse }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Species {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(Species::Human),
            "mouse" => Ok(Species::Mouse),
            other => Err(format!("unknown species: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_species_from_gene_case() {
        assert_eq!(Species::from_gene("STAT3"), Species::Human);
        assert_eq!(Species::from_gene("Stat3"), Species::Mouse);
        assert_eq!(Species::from_gene("HLA-DRB1"), Species::Human);
        assert_eq!(Species::from_genes(&[]), Species::Human);
    }

    #[test]
    fn test_species_from_term() {
        assert_eq!(Species::from_term("GSE1-a-vs-b-human-up"), Species::Human);
        assert_eq!(Species::from_term("GSE1-a-vs-b-mouse-up"), Species::Mouse);
        assert_eq!("Mouse".parse::<Species>().unwrap(), Species::Mouse);
        assert!("rat".parse::<Species>().is_err());
    }
}
