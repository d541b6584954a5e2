//! End-to-end acceptance scenarios against the assembled HTTP router.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::CONTENT_TYPE}
};
use config::Config;
use errors::ConfigError;
use gateway::{AppState, BreakerState, create_router};
use lex_core::{EnvironmentTier, ProviderErrorKind};
use serde_json::{Value, json};
use testing::{
    FixedGrounding, ScriptedProvider, TEST_API_KEY, bearer, cite, fedlex_candidate,
    grounded_answer, hardened_config, local_config, production_config, slot
};
use tower::ServiceExt;

struct Harness {
    app: Router,
    state: AppState,
    providers: Vec<Arc<ScriptedProvider>>
}

fn harness(config: Config, providers: Vec<(ScriptedProvider, Duration)>) -> Harness {
    let providers: Vec<(Arc<ScriptedProvider>, Duration)> = providers
        .into_iter()
        .map(|(p, timeout)| (Arc::new(p), timeout))
        .collect();
    let state = AppState::builder(config)
        .providers(
            providers
                .iter()
                .map(|(p, timeout)| slot(p.clone(), *timeout))
                .collect()
        )
        .grounding(Arc::new(FixedGrounding::new(vec![fedlex_candidate()])))
        .build()
        .expect("state builds");
    Harness {
        app: create_router(state.clone()),
        state,
        providers: providers.into_iter().map(|(p, _)| p).collect()
    }
}

fn answering(name: &str) -> ScriptedProvider {
    ScriptedProvider::answering(name, grounded_answer(), vec![cite(&fedlex_candidate())])
}

fn chat(message: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/chat")
        .header(CONTENT_TYPE, "application/json")
        .header("authorization", bearer(TEST_API_KEY))
        .header("x-client-id", "scenario-client")
        .body(Body::from(
            json!({"session_id": "scenario", "message": message, "locale": "en"}).to_string()
        ))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let trace_id = response.headers()["x-trace-id"]
        .to_str()
        .unwrap()
        .to_string();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, trace_id, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn scenario_a_representation_request_is_refused_without_provider_calls() {
    let h = harness(
        production_config(),
        vec![(answering("primary"), Duration::from_secs(1))]
    );

    let (status, _, body) = send(&h.app, chat("Please represent me and file my application")).await;

    assert_eq!(status, StatusCode::OK, "refusal is a success status");
    assert_eq!(body["fallback_used"]["reason"], "policy_block");
    assert_eq!(body["citations"], json!([]));
    assert_eq!(body["confidence"], "low");
    assert!(
        !body["disclaimer"].as_str().unwrap_or_default().is_empty(),
        "refusals keep the disclaimer"
    );
    assert_eq!(h.providers[0].calls(), 0, "no provider may be called");
}

#[tokio::test]
async fn scenario_b_primary_timeout_falls_back_to_secondary() {
    let h = harness(
        production_config(),
        vec![
            (ScriptedProvider::hanging("primary"), Duration::from_millis(100)),
            (answering("secondary"), Duration::from_secs(1)),
        ]
    );

    let (status, _, body) = send(&h.app, chat("What notice period applies?")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["fallback_used"],
        json!({"used": true, "provider": "secondary", "reason": "timeout"})
    );
    assert!(!body["citations"].as_array().unwrap().is_empty());

    let primary = h.state.router.breaker("primary").unwrap();
    assert_eq!(primary.consecutive_failures(), 1, "exactly one failure recorded");
    assert_eq!(primary.state(), BreakerState::Closed);

    let telemetry = h.state.telemetry.snapshot();
    assert_eq!(telemetry.providers["primary"].timeouts, 1);
    assert_eq!(telemetry.providers["secondary"].fallback_success, 1);
}

#[tokio::test]
async fn scenario_c_exhausted_chain_reports_provider_error_with_consistent_trace_id() {
    let h = harness(
        production_config(),
        vec![
            (
                ScriptedProvider::failing("primary", ProviderErrorKind::RateLimit),
                Duration::from_secs(1)
            ),
            (
                ScriptedProvider::failing("secondary", ProviderErrorKind::ProviderError),
                Duration::from_secs(1)
            ),
        ]
    );

    let (status, header_trace_id, body) = send(&h.app, chat("What notice period applies?")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "PROVIDER_ERROR");
    assert_eq!(body["error"]["trace_id"], header_trace_id.as_str());
    assert_eq!(h.providers[0].calls(), 1);
    assert_eq!(h.providers[1].calls(), 1);
}

#[test]
fn scenario_d_synthetic_citations_in_hardened_tiers_fail_startup() {
    for environment in [
        EnvironmentTier::Ci,
        EnvironmentTier::Staging,
        EnvironmentTier::Production
    ] {
        let mut config = hardened_config(environment);
        config.policy.synthetic_citations_enabled = true;

        let result = AppState::builder(config)
            .grounding(Arc::new(FixedGrounding::new(vec![fedlex_candidate()])))
            .build();

        assert!(
            matches!(result, Err(ConfigError::SyntheticCitationsInHardened { .. })),
            "{environment} must refuse to start"
        );
    }
}

#[tokio::test]
async fn scenario_e_twenty_first_request_is_rate_limited_before_providers() {
    let mut config = production_config();
    config.rate_limit.requests_per_window = 20;
    config.rate_limit.window_secs = 60;
    let h = harness(config, vec![(answering("primary"), Duration::from_secs(1))]);

    // A window boundary inside the burst would reset the counter.
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    if now % 60 > 50 {
        tokio::time::sleep(Duration::from_secs(61 - now % 60)).await;
    }

    for i in 0..20 {
        let (status, _, _) = send(&h.app, chat("What notice period applies?")).await;
        assert_eq!(status, StatusCode::OK, "request {} should be admitted", i + 1);
    }
    let calls_before = h.providers[0].calls();
    let providers_before = h.state.telemetry.snapshot().providers;

    let (status, trace_id, body) = send(&h.app, chat("What notice period applies?")).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
    assert_eq!(body["error"]["trace_id"], trace_id.as_str());
    assert_eq!(h.providers[0].calls(), calls_before, "no provider call");
    assert_eq!(
        h.state.telemetry.snapshot().providers,
        providers_before,
        "provider counters unchanged"
    );
}

#[tokio::test]
async fn local_tier_with_synthetic_citations_substitutes_and_flags() {
    let mut config = local_config();
    config.policy.synthetic_citations_enabled = true;
    let h = harness(
        config,
        vec![(
            ScriptedProvider::answering("primary", "An answer without sources.", Vec::new()),
            Duration::from_secs(1)
        )]
    );

    let (status, _, body) = send(&h.app, chat("What is a lease?")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback_used"]["reason"], "synthetic_grounding");
    assert_eq!(body["confidence"], "low");
    assert!(!body["citations"].as_array().unwrap().is_empty());
}
