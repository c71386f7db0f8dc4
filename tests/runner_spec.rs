mod support;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use ideaflow::gate::Gate;
use ideaflow::models::*;
use ideaflow::runner::{RunState, RunStep, RunnerRegistry};

use support::*;

fn registry(url: &str) -> RunnerRegistry {
    RunnerRegistry::new(Arc::new(client(url, session_with_token("tok-1"))))
}

/// Evaluation endpoints for `abc123`: nothing stored, generation returns a score.
fn evaluation_app(reads: Hits, generates: Hits, delay: Duration) -> Router {
    Router::new()
        .route(
            "/ideas/abc123/evaluation",
            get(move || async move {
                reads.hit();
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "detail": "Evaluation not found" })),
                )
            }),
        )
        .route(
            "/ideas/abc123/evaluate",
            post(move || async move {
                generates.hit();
                tokio::time::sleep(delay).await;
                Json(json!({
                    "idea_id": "abc123",
                    "module_scores": { "final_viability_score": 72.5 }
                }))
            }),
        )
}

mod fetch_or_generate {
    use super::*;

    #[tokio::test]
    async fn generates_when_nothing_is_stored() {
        let (reads, generates) = (Hits::default(), Hits::default());
        let url = serve(evaluation_app(reads.clone(), generates.clone(), Duration::ZERO)).await;
        let runner = registry(&url).runner(ResultKey::new("abc123", AgentKind::Validation));

        let state = runner.load().await;

        let result = state.result().expect("validation should succeed");
        assert_eq!(result.status, Outcome::Completed);
        assert_eq!(result.final_score(), Some(72.5));
        assert_eq!(reads.count(), 1);
        assert_eq!(generates.count(), 1);
    }

    #[tokio::test]
    async fn stored_report_is_returned_without_generating() {
        let generates = Hits::default();
        let app = {
            let generates = generates.clone();
            Router::new()
                .route(
                    "/pitch-deck/idea/abc123",
                    get(|| async {
                        Json(json!({
                            "id": "p-1",
                            "idea_id": "abc123",
                            "title": "LabSwap",
                            "status": "completed"
                        }))
                    }),
                )
                .route(
                    "/pitch-deck/generate",
                    post(move || async move {
                        generates.hit();
                        Json(json!({}))
                    }),
                )
        };
        let url = serve(app).await;
        let runner = registry(&url).runner(ResultKey::new("abc123", AgentKind::PitchDeck));

        let state = runner.load().await;

        let deck: PitchDeckRecord = state.result().unwrap().payload_as().unwrap();
        assert_eq!(deck.title, "LabSwap");
        assert_eq!(generates.count(), 0);
    }

    #[tokio::test]
    async fn failed_read_does_not_generate() {
        let generates = Hits::default();
        let app = {
            let generates = generates.clone();
            Router::new()
                .route(
                    "/market-research/idea/abc123",
                    get(|| async {
                        (
                            StatusCode::SERVICE_UNAVAILABLE,
                            Json(json!({ "detail": "Database unavailable" })),
                        )
                    }),
                )
                .route(
                    "/market-research/generate",
                    post(move || async move {
                        generates.hit();
                        Json(json!({}))
                    }),
                )
        };
        let url = serve(app).await;
        let runner = registry(&url).runner(ResultKey::new("abc123", AgentKind::MarketResearch));

        let state = runner.load().await;

        let failure = state.failure().expect("read failure should surface");
        assert_eq!(failure.step, RunStep::Read);
        assert_eq!(failure.status, Some(503));
        assert_eq!(failure.message, "Database unavailable");
        assert!(failure.retryable);
        assert_eq!(generates.count(), 0);
    }

    #[tokio::test]
    async fn generate_rejection_is_not_retryable() {
        let app = Router::new()
            .route(
                "/mvp/idea/abc123",
                get(|| async { (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found" }))) }),
            )
            .route(
                "/mvp/generate",
                post(|| async {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "detail": "Market research must be completed first" })),
                    )
                }),
            );
        let url = serve(app).await;
        let runner = registry(&url).runner(ResultKey::new("abc123", AgentKind::Mvp));

        let state = runner.load().await;

        let failure = state.failure().unwrap();
        assert_eq!(failure.step, RunStep::Generate);
        assert_eq!(failure.message, "Market research must be completed first");
        assert!(!failure.retryable);
    }
}

mod fresh_load {
    use super::*;

    #[tokio::test]
    async fn generates_once_when_nothing_is_stored() {
        let (reads, generates) = (Hits::default(), Hits::default());
        let url = serve(evaluation_app(reads.clone(), generates.clone(), Duration::ZERO)).await;
        let runner = registry(&url).runner(ResultKey::new("abc123", AgentKind::Validation));

        let state = runner.load_fresh().await;

        assert_eq!(state.result().unwrap().final_score(), Some(72.5));
        assert_eq!(reads.count(), 1);
        assert_eq!(generates.count(), 1);
    }

    #[tokio::test]
    async fn replaces_a_stored_report() {
        let generates = Hits::default();
        let app = {
            let generates = generates.clone();
            Router::new()
                .route(
                    "/mvp/idea/abc123",
                    get(|| async {
                        Json(json!({ "id": "m-1", "idea_id": "abc123", "status": "completed" }))
                    }),
                )
                .route(
                    "/mvp/generate",
                    post(move || async move {
                        generates.hit();
                        Json(json!({ "id": "m-2", "idea_id": "abc123", "status": "completed" }))
                    }),
                )
        };
        let url = serve(app).await;
        let runner = registry(&url).runner(ResultKey::new("abc123", AgentKind::Mvp));

        let state = runner.load_fresh().await;

        let payload = state.result().unwrap().payload.clone().unwrap();
        assert_eq!(payload["id"], "m-2");
        assert_eq!(generates.count(), 1);
    }
}

mod reentrancy {
    use super::*;

    #[tokio::test]
    async fn concurrent_loads_share_one_generate() {
        let (reads, generates) = (Hits::default(), Hits::default());
        let app = evaluation_app(reads.clone(), generates.clone(), Duration::from_millis(200));
        let url = serve(app).await;
        let registry = registry(&url);
        let key = ResultKey::new("abc123", AgentKind::Validation);

        let first = registry.runner(key.clone());
        let second = registry.runner(key);
        let (a, b) = tokio::join!(first.load(), second.load());

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reads.count(), 1);
        assert_eq!(generates.count(), 1);
        // The loser of the race returns the busy state it observed.
        assert!(a.result().is_some() || b.result().is_some());
        assert!(first.state().result().is_some());
    }

    #[tokio::test]
    async fn regenerate_while_generating_is_ignored() {
        let (reads, generates) = (Hits::default(), Hits::default());
        let app = evaluation_app(reads.clone(), generates.clone(), Duration::from_millis(200));
        let url = serve(app).await;
        let runner = registry(&url).runner(ResultKey::new("abc123", AgentKind::Validation));

        let loading = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.load().await })
        };
        let mut updates = runner.subscribe();
        updates
            .wait_for(|s| matches!(s, RunState::Generating))
            .await
            .unwrap();

        assert_eq!(runner.regenerate().await, RunState::Generating);
        loading.await.unwrap();
        assert_eq!(generates.count(), 1);
    }

    #[tokio::test]
    async fn cancel_returns_to_idle_and_drops_the_call() {
        let (reads, generates) = (Hits::default(), Hits::default());
        let app = evaluation_app(reads.clone(), generates.clone(), Duration::from_secs(5));
        let url = serve(app).await;
        let runner = registry(&url).runner(ResultKey::new("abc123", AgentKind::Validation));

        let loading = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.load().await })
        };
        runner
            .subscribe()
            .wait_for(|s| matches!(s, RunState::Generating))
            .await
            .unwrap();
        runner.cancel();

        let finished = tokio::time::timeout(Duration::from_secs(1), loading)
            .await
            .expect("load should stop once cancelled")
            .unwrap();
        assert_eq!(finished, RunState::Idle);
        assert_eq!(runner.state(), RunState::Idle);
    }
}

mod legal_documents {
    use super::*;

    fn legal_app(generated_bodies: Arc<Mutex<Vec<Value>>>) -> Router {
        Router::new()
            .route(
                "/legal/idea/abc123",
                get(|| async {
                    Json(json!({
                        "records": [
                            { "id": "l-1", "idea_id": "abc123", "document_type": "nda", "status": "generated" },
                            { "id": "l-2", "idea_id": "abc123", "document_type": "privacy_policy", "status": "failed" }
                        ]
                    }))
                }),
            )
            .route(
                "/legal/generate",
                post(move |Json(body): Json<Value>| async move {
                    let document_type = body["document_type"].clone();
                    generated_bodies.lock().unwrap().push(body);
                    Json(json!({
                        "id": "l-3",
                        "idea_id": "abc123",
                        "document_type": document_type,
                        "status": "generated"
                    }))
                }),
            )
    }

    #[tokio::test]
    async fn results_are_keyed_by_document_type() {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let url = serve(legal_app(bodies.clone())).await;
        let registry = registry(&url);

        let nda = registry
            .runner(ResultKey::legal("abc123", LegalDocumentType::Nda))
            .load()
            .await;
        let privacy = registry
            .runner(ResultKey::legal("abc123", LegalDocumentType::PrivacyPolicy))
            .load()
            .await;

        assert_eq!(
            nda.result().unwrap().document_type,
            Some(LegalDocumentType::Nda)
        );
        assert_eq!(
            privacy.result().unwrap().document_type,
            Some(LegalDocumentType::PrivacyPolicy)
        );
        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["document_type"], "privacy_policy");
    }
}

mod gates {
    use super::*;

    #[tokio::test]
    async fn observed_results_unlock_dependents() {
        let (reads, generates) = (Hits::default(), Hits::default());
        let url = serve(evaluation_app(reads, generates, Duration::ZERO)).await;
        let registry = registry(&url);

        let before = registry.gates("abc123", &HashMap::new());
        assert_eq!(
            before[&AgentKind::MarketResearch],
            Gate::Locked { reason: AgentKind::Validation }
        );

        registry
            .runner(ResultKey::new("abc123", AgentKind::Validation))
            .load()
            .await;
        let after = registry.gates("abc123", &HashMap::new());

        assert!(after[&AgentKind::MarketResearch].is_enabled());
        assert!(after[&AgentKind::Chat].is_enabled());
        assert_eq!(after[&AgentKind::Mvp].reason(), Some("market_research"));
        assert!(registry.gates("other", &HashMap::new())[&AgentKind::PitchDeck] != Gate::Enabled);
    }

    #[tokio::test]
    async fn dashboard_outcomes_feed_the_gate() {
        let url = dead_url().await;
        let registry = registry(&url);
        let known = HashMap::from([
            (AgentKind::Validation, Outcome::Completed),
            (AgentKind::MarketResearch, Outcome::Pending),
        ]);

        let gates = registry.gates("abc123", &known);

        assert!(gates[&AgentKind::PitchDeck].is_enabled());
        assert_eq!(
            gates[&AgentKind::Mvp],
            Gate::Locked { reason: AgentKind::MarketResearch }
        );
    }
}

mod eviction {
    use super::*;

    #[tokio::test]
    async fn forgotten_runner_is_replaced_with_a_fresh_one() {
        let (reads, generates) = (Hits::default(), Hits::default());
        let url = serve(evaluation_app(reads.clone(), generates, Duration::ZERO)).await;
        let registry = registry(&url);
        let key = ResultKey::new("abc123", AgentKind::Validation);

        let first = registry.runner(key.clone());
        first.load().await;
        assert!(registry.statuses("abc123").contains_key(&AgentKind::Validation));

        let removed = registry.forget(&key).expect("runner was registered");
        assert!(Arc::ptr_eq(&first, &removed));
        assert!(registry.forget(&key).is_none());
        assert!(registry.statuses("abc123").is_empty());

        let second = registry.runner(key);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.state(), RunState::Idle);
        // Handles given out earlier keep their result.
        assert!(first.state().result().is_some());
    }

    #[tokio::test]
    async fn forget_idea_only_drops_that_idea() {
        let url = dead_url().await;
        let registry = registry(&url);
        registry.runner(ResultKey::new("abc123", AgentKind::Validation));
        registry.runner(ResultKey::legal("abc123", LegalDocumentType::Nda));
        let kept = registry.runner(ResultKey::new("other", AgentKind::Validation));

        assert_eq!(registry.forget_idea("abc123"), 2);
        assert_eq!(registry.forget_idea("abc123"), 0);
        assert!(Arc::ptr_eq(
            &kept,
            &registry.runner(ResultKey::new("other", AgentKind::Validation))
        ));
    }
}
