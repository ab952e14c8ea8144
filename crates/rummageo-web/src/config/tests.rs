#[cfg(test)]
mod tests {
    use super::super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.max_tokens, 1000);
        assert_eq!(config.hypothesis.libraries.len(), 4);
        assert_eq!(config.hypothesis.libraries[0], "WikiPathway_2023_Human");
        assert!(config.sources.pubmed_fallback);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 8080

            [llm]
            base_url = "http://localhost:11434"
            api_key = "sk-local"

            [hypothesis]
            library_delay_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.api_key.as_ref().map(|k| k.expose_secret().to_string()), Some("sk-local".to_string()));
        assert_eq!(config.hypothesis.top_terms, 3);

        let wf = config.workflow();
        assert_eq!(wf.library_delay, Duration::from_millis(250));
        assert_eq!(wf.step_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_default_delay_matches_enrichr_courtesy_pause() {
        assert_eq!(Config::default().workflow().library_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_unknown_types_are_rejected() {
        assert!(Config::from_toml_str("[server]\nport = \"eighty\"").is_err());
    }
}
