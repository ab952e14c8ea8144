//! Axum router: maps all URL paths to handlers.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use std::sync::Arc;
use crate::state::{AppState, SharedState};
use crate::handlers::{
    downloads::downloads,
    enrich::{add_user_gene_set_handler, enrich, enrich_download, upload_user_gene_set_gmt},
    gene_set::{gene_set, gene_set_gmt, gene_set_overlap, search_terms, submit_g2sg, user_gene_set},
    health::health,
    hypothesis::{cached_hypothesis, generate_hypothesis},
    proxy::{download_gmt, graphiql, graphql},
    terms::{download_terms, enrichr_stats, enrichr_terms, key_terms},
};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Upstream pass-through
        .route("/graphql",      post(graphql))
        .route("/graphiql",     get(graphiql).post(graphiql))
        .route("/download.gmt", get(download_gmt))
        .route("/downloads",    get(downloads))

        // Enrichment
        .route("/api/enrich",                 post(enrich))
        .route("/api/enrich/download",        post(enrich_download))
        .route("/api/enrich/terms",           post(key_terms))
        .route("/api/enrich/enrichr-terms",   post(enrichr_terms))
        .route("/api/enrich/terms/download",  post(download_terms))
        .route("/api/enrichr-stats",          get(enrichr_stats))
        .route("/api/user-gene-set",          post(add_user_gene_set_handler))
        .route("/api/user-gene-set/gmt",      post(upload_user_gene_set_gmt))
        .route("/api/user-gene-set/{id}",     get(user_gene_set))

        // Gene sets
        .route("/api/gene-set/{id}",              get(gene_set))
        .route("/api/gene-set/{id}/download.gmt", get(gene_set_gmt))
        .route("/api/gene-set/{id}/overlap",      post(gene_set_overlap))
        .route("/api/term-search",            get(search_terms))
        .route("/gene_set/{id}/submit/g2sg",  get(submit_g2sg))

        // Hypothesis
        .route("/api/hypothesis",       post(generate_hypothesis))
        .route("/api/hypothesis/{key}", get(cached_hypothesis))

        .route("/health", get(health))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use rummageo_common::sandbox::SandboxClient;
    use rummageo_common::RummageoError;
    use rummageo_hypothesis::workflow::SummarySource;
    use rummageo_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};
    use rummageo_query::documents::{
        Operation, ADD_USER_GENE_SET, ENRICHMENT_QUERY, GET_BACKGROUNDS, VIEW_GENE_SET,
    };
    use rummageo_query::GraphQlExecutor;
    use rummageo_sources::enrichr::{EnrichrRow, EnrichrSource, UserList};

    use crate::config::Config;

    #[derive(Default)]
    struct CannedGraphQl {
        responses: HashMap<&'static str, Value>,
        calls: Arc<Mutex<Vec<(&'static str, Value)>>>,
        /// Queries whose gene list contains this gene answer 200ms late.
        slow_gene: Option<&'static str>,
    }

    impl CannedGraphQl {
        fn with(mut self, op: &Operation, data: Value) -> Self {
            self.responses.insert(op.name, data);
            self
        }

        fn slow_for(mut self, gene: &'static str) -> Self {
            self.slow_gene = Some(gene);
            self
        }
    }

    #[async_trait]
    impl GraphQlExecutor for CannedGraphQl {
        async fn execute(&self, operation: &Operation, variables: Value) -> Result<Value, RummageoError> {
            let slow = self.slow_gene.is_some_and(|gene| {
                variables["genes"].as_array().is_some_and(|genes| genes.iter().any(|g| g == gene))
            });
            self.calls.lock().unwrap().push((operation.name, variables));
            if slow {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            self.responses
                .get(operation.name)
                .cloned()
                .ok_or_else(|| RummageoError::GraphQl(format!("no canned response for {}", operation.name)))
        }
    }

    struct NoEnrichr;

    #[async_trait]
    impl EnrichrSource for NoEnrichr {
        async fn add_list(&self, _genes: &[String], _description: &str) -> Result<UserList, RummageoError> {
            Ok(UserList { user_list_id: 1, short_id: "s".into() })
        }
        async fn enrich(&self, _id: u64, _library: &str) -> Result<Vec<EnrichrRow>, RummageoError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct EchoLlm {
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmBackend for EchoLlm {
        async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(user) = req.messages.last() {
                self.prompts.lock().unwrap().push(user.content.clone());
            }
            Ok(LlmResponse {
                content: "A hypothesis.".into(),
                model: "test".into(),
                prompt_tokens: 10,
                completion_tokens: 3,
            })
        }
        fn model_id(&self) -> &str { "test" }
        fn is_local(&self) -> bool { true }
        fn max_output_tokens(&self) -> usize { 1000 }
    }

    struct EmptySummaries;

    #[async_trait]
    impl SummarySource for EmptySummaries {
        async fn summary(&self, _gse: &str, _pmids: &[String]) -> Result<String, RummageoError> {
            Ok(String::new())
        }
    }

    fn app(graphql: CannedGraphQl) -> Router {
        app_with_llm(graphql, Arc::new(EchoLlm::default()))
    }

    fn app_with_llm(graphql: CannedGraphQl, llm: Arc<EchoLlm>) -> Router {
        let mut config = Config::default();
        config.hypothesis.library_delay_ms = 0;
        config.sources.g2sg_url = "https://g2sg.invalid".into();
        let state = AppState::with_clients(
            config,
            SandboxClient::new().unwrap(),
            Arc::new(graphql),
            Arc::new(NoEnrichr),
            llm,
            Arc::new(EmptySummaries),
        );
        build_router(state)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(CannedGraphQl::default()), Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_enrich_without_genes_is_skipped() {
        let graphql = CannedGraphQl::default();
        let (status, body) = send(app(graphql), post_json("/api/enrich", json!({ "genes": ["", "  "] }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "skipped");
        assert_eq!(body["rows"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_enrich_loads_a_page() {
        let graphql = CannedGraphQl::default()
            .with(&GET_BACKGROUNDS, json!({ "backgrounds": { "nodes": [
                { "id": "bg-human", "species": "human" },
                { "id": "bg-mouse", "species": "mouse" }
            ]}}))
            .with(&ENRICHMENT_QUERY, json!({ "background": { "enrich": {
                "nodes": [{
                    "pvalue": 1e-10, "adjPvalue": 1e-8, "oddsRatio": 12.5, "nOverlap": 7,
                    "geneSet": { "id": "gs1", "term": "GSE1-ctl-vs-kd-human-up", "nGeneIds": 250 }
                }],
                "totalCount": 17,
                "enrichedTerms": ["liver"],
                "topEnrichedSigs": ["GSE1-ctl-vs-kd-human-up"]
            }}}));
        let (status, body) = send(
            app(graphql),
            post_json("/api/enrich?page=2&sortBy=odds_ratio", json!({ "genes": ["STAT3", "ACE2"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "loaded");
        assert_eq!(body["species"], "human");
        assert_eq!(body["totalCount"], 17);
        assert_eq!(body["pageCount"], 3);
        assert_eq!(body["query"]["page"], 2);
        assert_eq!(body["rows"].as_array().unwrap().len(), 1);
        assert_eq!(body["enrichedTerms"][0], "liver");
    }

    fn enrichment_data() -> Value {
        json!({ "background": { "enrich": {
            "nodes": [{
                "pvalue": 1e-10, "adjPvalue": 1e-8, "oddsRatio": 12.5, "nOverlap": 7,
                "geneSet": { "id": "gs1", "term": "GSE1-ctl-vs-kd-human-up", "nGeneIds": 250 }
            }],
            "totalCount": 1
        }}})
    }

    #[tokio::test]
    async fn test_concurrent_users_enrichments_both_load() {
        let graphql = CannedGraphQl::default()
            .with(&GET_BACKGROUNDS, json!({ "backgrounds": { "nodes": [{ "id": "bg", "species": "human" }] }}))
            .with(&ENRICHMENT_QUERY, enrichment_data())
            .slow_for("STAT3");
        let app = app(graphql);

        let slow = send(app.clone(), post_json("/api/enrich", json!({ "genes": ["STAT3", "IL6"] })));
        let fast = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            send(app.clone(), post_json("/api/enrich", json!({ "genes": ["MYC", "TP53"] }))).await
        };
        let ((slow_status, slow_body), (fast_status, fast_body)) = tokio::join!(slow, fast);

        assert_eq!(slow_status, StatusCode::OK);
        assert_eq!(fast_status, StatusCode::OK);
        assert_eq!(slow_body["status"], "loaded");
        assert_eq!(fast_body["status"], "loaded");
    }

    #[tokio::test]
    async fn test_newer_fetch_in_one_session_supersedes() {
        let graphql = CannedGraphQl::default()
            .with(&GET_BACKGROUNDS, json!({ "backgrounds": { "nodes": [{ "id": "bg", "species": "human" }] }}))
            .with(&ENRICHMENT_QUERY, enrichment_data())
            .slow_for("STAT3");
        let app = app(graphql);

        let slow = send(app.clone(), post_json("/api/enrich", json!({ "genes": ["STAT3"], "session": "tab-1" })));
        let fast = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            send(app.clone(), post_json("/api/enrich", json!({ "genes": ["MYC"], "session": "tab-1" }))).await
        };
        let ((_, slow_body), (_, fast_body)) = tokio::join!(slow, fast);

        assert_eq!(slow_body["status"], "superseded");
        assert_eq!(fast_body["status"], "loaded");
    }

    #[tokio::test]
    async fn test_enrich_failure_reports_no_valid_genes() {
        let graphql = CannedGraphQl::default()
            .with(&GET_BACKGROUNDS, json!({ "backgrounds": { "nodes": [{ "id": "bg", "species": "human" }] }}));
        let (status, body) = send(app(graphql), post_json("/api/enrich", json!({ "genes": ["STAT3"] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No valid genes identified");
        assert_eq!(body["dismissAfterMs"], 3000);
    }

    #[tokio::test]
    async fn test_g2sg_unknown_gene_set_is_not_found() {
        let graphql = CannedGraphQl::default().with(&VIEW_GENE_SET, json!({ "geneSet": null }));
        let req = Request::get("/gene_set/missing/submit/g2sg").body(Body::empty()).unwrap();
        let (status, body) = send(app(graphql), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
    }

    #[tokio::test]
    async fn test_g2sg_registration_failure_is_a_server_error() {
        let graphql = CannedGraphQl::default().with(&VIEW_GENE_SET, json!({ "geneSet": {
            "id": "gs1", "term": "GSE1-ctl-vs-kd-human-up",
            "genes": { "nodes": [{ "symbol": "STAT3" }] }
        }}));
        // g2sg.invalid is not allowlisted, so the registration call is refused.
        let req = Request::get("/gene_set/gs1/submit/g2sg").body(Body::empty()).unwrap();
        let (status, body) = send(app(graphql), req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to Register Gene Set");
    }

    #[tokio::test]
    async fn test_short_description_is_rejected() {
        let req = post_json("/api/hypothesis", json!({
            "term": "GSE1-ctl-vs-kd-human-up",
            "description": "too short",
            "genes": ["STAT3"]
        }));
        let (status, body) = send(app(CannedGraphQl::default()), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("at least 100 words"));
    }

    #[tokio::test]
    async fn test_hypothesis_is_generated_then_cached() {
        let description = vec!["word"; 120].join(" ");
        let app = app(CannedGraphQl::default());
        let req = post_json("/api/hypothesis", json!({
            "term": "GSE1-ctl-vs-kd-human-up",
            "description": description,
            "genes": ["STAT3"]
        }));
        let (status, body) = send(app.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["states"], json!(["fetching", "composing", "annotating", "done"]));
        assert_eq!(body["hypothesis"]["plainText"], "A hypothesis.");

        let key = body["hypothesis"]["key"].as_str().unwrap().to_string();
        let req = Request::get(format!("/api/hypothesis/{key}")).body(Body::empty()).unwrap();
        let (status, body) = send(app.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["states"], json!(["done"]));
        assert_eq!(body["term"], "GSE1-ctl-vs-kd-human-up");

        let req = Request::get("/api/hypothesis/GSE1-ctl-vs-kd-human-up").body(Body::empty()).unwrap();
        let (status, _) = send(app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_hypotheses_for_one_term_stay_per_user() {
        let llm = Arc::new(EchoLlm::default());
        let app = app_with_llm(CannedGraphQl::default(), llm.clone());
        let term = "GSE1-ctl-vs-kd-human-up";

        let alice = post_json("/api/hypothesis", json!({
            "term": term,
            "description": vec!["alice"; 120].join(" "),
            "genes": ["STAT3"]
        }));
        let (status, alice) = send(app.clone(), alice).await;
        assert_eq!(status, StatusCode::OK);

        let bob = post_json("/api/hypothesis", json!({
            "term": term,
            "description": vec!["bob"; 120].join(" "),
            "genes": ["MYC"]
        }));
        let (status, bob) = send(app, bob).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(bob["states"][0], "fetching");
        assert_ne!(alice["hypothesis"]["key"], bob["hypothesis"]["key"]);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[1].contains("bob") && !prompts[1].contains("alice"));
    }

    #[tokio::test]
    async fn test_gene_set_downloads_as_gmt() {
        let graphql = CannedGraphQl::default().with(&VIEW_GENE_SET, json!({ "geneSet": {
            "id": "gs1", "term": "GSE1-ctl-vs-kd-human-up",
            "genes": { "nodes": [{ "symbol": "STAT3" }, { "symbol": "IL6" }] }
        }}));
        let req = Request::get("/api/gene-set/gs1/download.gmt").body(Body::empty()).unwrap();
        let resp = app(graphql).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["content-disposition"],
            "attachment; filename=\"GSE1-ctl-vs-kd-human-up.gmt\""
        );
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"GSE1-ctl-vs-kd-human-up\t\tSTAT3\tIL6\n");
    }

    #[tokio::test]
    async fn test_gmt_upload_stores_first_entry() {
        let graphql = CannedGraphQl::default()
            .with(&ADD_USER_GENE_SET, json!({ "addUserGeneSet": { "userGeneSet": { "id": "u-1" } } }));
        let calls = graphql.calls.clone();
        let req = Request::post("/api/user-gene-set/gmt")
            .header("content-type", "text/plain")
            .body(Body::from("my-set\t\tSTAT3\tIL6\nother\t\tMYC\n"))
            .unwrap();
        let (status, body) = send(app(graphql), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "u-1");

        let calls = calls.lock().unwrap();
        let (_, variables) = calls.iter().find(|(name, _)| *name == ADD_USER_GENE_SET.name).unwrap();
        assert_eq!(variables["genes"], json!(["STAT3", "IL6"]));
        assert_eq!(variables["description"], "my-set");
    }

    #[tokio::test]
    async fn test_malformed_gmt_upload_is_rejected() {
        let req = Request::post("/api/user-gene-set/gmt")
            .header("content-type", "text/plain")
            .body(Body::from("\tdesc\tSTAT3\n"))
            .unwrap();
        let (status, _) = send(app(CannedGraphQl::default()), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_downloads_lists_archives() {
        let (status, body) = send(app(CannedGraphQl::default()), Request::get("/downloads").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 8);
    }
}
