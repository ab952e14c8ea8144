//! GMT gene-set files: `term<TAB>description<TAB>gene<TAB>gene...`.
//!
//! Used for single gene-set downloads and for user gene sets uploaded as GMT.

use rummageo_common::error::{Result, RummageoError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmtEntry {
    pub term: String,
    pub description: String,
    pub genes: Vec<String>,
}

/// Parse GMT text. Blank lines are skipped; a line without a term is an error.
pub fn parse(text: &str) -> Result<Vec<GmtEntry>> {
    let mut entries = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let term = fields.next().unwrap_or_default().trim();
        if term.is_empty() {
            return Err(RummageoError::Other(anyhow::anyhow!(
                "GMT line {} has no term",
                lineno + 1
            )));
        }
        let description = fields.next().unwrap_or_default().to_string();
        let genes = fields
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect();
        entries.push(GmtEntry { term: term.to_string(), description, genes });
    }
    Ok(entries)
}

pub fn write(entries: &[GmtEntry]) -> String {
    let mut out = String::new();
    for e in entries {
        out.push_str(&e.term);
        out.push('\t');
        out.push_str(&e.description);
        for g in &e.genes {
            out.push('\t');
            out.push_str(g);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank_lines_and_empty_genes() {
        let text = "GSE1-a-vs-b-human-up\t\tSTAT3\tMYC\t\n\nGSE2-c-vs-d-mouse-dn\tdesc\tStat3\r\n";
        let entries = parse(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].genes, vec!["STAT3", "MYC"]);
        assert_eq!(entries[1].description, "desc");
        assert_eq!(entries[1].genes, vec!["Stat3"]);
    }

    #[test]
    fn test_write_then_parse_preserves_entries() {
        let entries = vec![GmtEntry {
            term: "GSE3-x-vs-y-human-up".to_string(),
            description: String::new(),
            genes: vec!["A".to_string(), "B".to_string()],
        }];
        let text = write(&entries);
        assert_eq!(text, "GSE3-x-vs-y-human-up\t\tA\tB\n");
        assert_eq!(parse(&text).unwrap(), entries);
    }

    #[test]
    fn test_line_without_term_is_rejected() {
        assert!(parse("\tdesc\tA\n").is_err());
    }
}
