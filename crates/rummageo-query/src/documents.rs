//! GraphQL operation documents used by the service.

/// A named GraphQL operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub document: &'static str,
}

pub const GET_BACKGROUNDS: Operation = Operation {
    name: "GetBackgrounds",
    document: r#"query GetBackgrounds {
  backgrounds {
    nodes {
      id
      species
    }
  }
}"#,
};

pub const ENRICHMENT_QUERY: Operation = Operation {
    name: "EnrichmentQuery",
    document: r#"query EnrichmentQuery($genes: [String]!, $filterTerm: String = "", $offset: Int = 0, $first: Int = 10, $filterScoreLe: Float = -1, $sortBy: String = "pvalue", $sortByDir: String = "asc", $id: UUID!) {
  background(id: $id) {
    id
    species
    enrich(
      genes: $genes
      filterTerm: $filterTerm
      offset: $offset
      first: $first
      filterScoreLe: $filterScoreLe
      sortBy: $sortBy
      sortByDir: $sortByDir
    ) {
      nodes {
        pvalue
        adjPvalue
        oddsRatio
        nOverlap
        geneSet {
          id
          term
          nGeneIds
          geneSetPmidsById {
            nodes {
              gse
              gseId
              pmid
              sampleGroups
              platform
              publishedDate
              title
              silhouetteScore
            }
          }
        }
      }
      totalCount
      enrichedTerms
      topEnrichedSigs
    }
  }
}"#,
};

pub const TERM_ENRICHMENT: Operation = Operation {
    name: "TermEnrichment",
    document: r#"query TermEnrichment($enrichedTerms: [String]!, $sourceType: String!, $species: String!) {
  enrichedFunctionalTerms(enrichedTerms: $enrichedTerms, sourceType: $sourceType, species: $species) {
    term
    count
    oddsRatio
    pvalue
    adjPvalue
  }
}"#,
};

pub const ENRICHR_TERM_ENRICHMENT: Operation = Operation {
    name: "EnrichrTermEnrichment",
    document: r#"query EnrichrTermEnrichment($enrichedSigs: [String]!, $species: String!) {
  enrichedEnrichrTerms(enrichedSigs: $enrichedSigs, species: $species) {
    term
    count
    oddsRatio
    pvalue
    adjPvalue
  }
}"#,
};

pub const ENRICHR_STATS: Operation = Operation {
    name: "EnrichrStats",
    document: r#"query EnrichrStats($sig: String!, $organism: String!) {
  enrichrTermBySigAndOrganism(sig: $sig, organism: $organism) {
    enrichrStats
  }
}"#,
};

pub const FETCH_USER_GENE_SET: Operation = Operation {
    name: "FetchUserGeneSet",
    document: r#"query FetchUserGeneSet($id: UUID!) {
  userGeneSet(id: $id) {
    genes
    description
  }
}"#,
};

pub const ADD_USER_GENE_SET: Operation = Operation {
    name: "AddUserGeneSet",
    document: r#"mutation AddUserGeneSet($genes: [String], $description: String = "") {
  addUserGeneSet(input: {genes: $genes, description: $description}) {
    userGeneSet {
      id
    }
  }
}"#,
};

pub const VIEW_GENE_SET: Operation = Operation {
    name: "ViewGeneSet",
    document: r#"query ViewGeneSet($id: UUID!) {
  geneSet(id: $id) {
    id
    term
    nGeneIds
    genes {
      nodes {
        symbol
      }
    }
  }
}"#,
};

pub const OVERLAP_QUERY: Operation = Operation {
    name: "OverlapQuery",
    document: r#"query OverlapQuery($id: UUID!, $genes: [String]!) {
  geneSet(id: $id) {
    id
    term
    nGeneIds
    overlap(genes: $genes) {
      nodes {
        symbol
      }
    }
  }
}"#,
};

pub const QUERY_GSE_SUMMARY: Operation = Operation {
    name: "QueryGseSummary",
    document: r#"query QueryGseSummary($id: String!) {
  gseInfo(id: $id) {
    summary
  }
}"#,
};

pub const TERM_SEARCH: Operation = Operation {
    name: "GeneSetLibraryTermSearch",
    document: r#"query GeneSetLibraryTermSearch($terms: [String]!, $first: Int = 100) {
  geneSetTermSearch(terms: $terms, first: $first) {
    nodes {
      id
      term
      nGeneIds
    }
    totalCount
  }
}"#,
};

/// Every operation the service knows, for introspection and the GraphiQL page.
pub const ALL: &[Operation] = &[
    GET_BACKGROUNDS,
    ENRICHMENT_QUERY,
    TERM_ENRICHMENT,
    ENRICHR_TERM_ENRICHMENT,
    ENRICHR_STATS,
    FETCH_USER_GENE_SET,
    ADD_USER_GENE_SET,
    VIEW_GENE_SET,
    OVERLAP_QUERY,
    QUERY_GSE_SUMMARY,
    TERM_SEARCH,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_declares_its_operation_name() {
        for op in ALL {
            assert!(
                op.document.contains(op.name),
                "{} missing from its own document",
                op.name
            );
        }
    }

    #[test]
    fn test_operation_names_are_unique() {
        let mut names: Vec<_> = ALL.iter().map(|o| o.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }
}
