use std::sync::Arc;
use std::time::Duration;

use adapters::{ProviderSlot, build_chain, build_grounding, http_client};
use config::Config;
use errors::ConfigError;
use lex_core::{CounterStore, GroundingRetriever};
use metrics_exporter_prometheus::PrometheusHandle;
use observability::TelemetryRecorder;
use storage::RedisCounterStore;
use tracing::info;

use crate::auth::AuthState;
use crate::chat::{ChatService, ChatSettings};
use crate::circuit_breaker::BreakerSettings;
use crate::policy::PolicyComplianceEngine;
use crate::rate_limit::RateLimiter;
use crate::router::ProviderRouter;

const COUNTER_STORE_TIMEOUT: Duration = Duration::from_millis(250);

/// Shared, cheaply clonable handle to everything a request needs.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthState>,
    pub limiter: Arc<RateLimiter>,
    pub chat: Arc<ChatService>,
    pub router: Arc<ProviderRouter>,
    pub telemetry: Arc<TelemetryRecorder>,
    pub prometheus: Option<PrometheusHandle>
}

impl AppState {
    pub fn builder(config: Config) -> AppStateBuilder {
        AppStateBuilder {
            config,
            providers: None,
            grounding: None,
            counter_store: None,
            prometheus: None
        }
    }
}

/// Assembles an [`AppState`] from configuration. Collaborators can be
/// injected in place of the configured ones.
pub struct AppStateBuilder {
    config: Config,
    providers: Option<Vec<ProviderSlot>>,
    grounding: Option<Arc<dyn GroundingRetriever>>,
    counter_store: Option<Arc<dyn CounterStore>>,
    prometheus: Option<PrometheusHandle>
}

impl AppStateBuilder {
    pub fn providers(mut self, providers: Vec<ProviderSlot>) -> Self {
        self.providers = Some(providers);
        self
    }

    pub fn grounding(mut self, grounding: Arc<dyn GroundingRetriever>) -> Self {
        self.grounding = Some(grounding);
        self
    }

    pub fn counter_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.counter_store = Some(store);
        self
    }

    pub fn prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Runs the startup guard and wires the request pipeline. Any error is
    /// fatal for the process.
    pub fn build(self) -> Result<AppState, ConfigError> {
        let config = self.config;
        config::enforce(&config)?;

        let observability = &config.observability;
        let telemetry = Arc::new(
            TelemetryRecorder::new(
                observability.telemetry_window_secs,
                observability.latency_sample_capacity
            )
            .with_metrics(observability.metrics_enabled)
        );

        let client = http_client()?;
        let slots = match self.providers {
            Some(slots) => slots,
            None => build_chain(&config, &client)?
        };
        let grounding = match self.grounding {
            Some(grounding) => grounding,
            None => build_grounding(&config.grounding, &client)?
        };

        let router = Arc::new(ProviderRouter::new(
            slots,
            config.environment,
            &BreakerSettings::from_config(&config.circuit_breaker, config.router.last_resort_probe),
            Duration::from_millis(config.router.hard_timeout_ms),
            telemetry.clone()
        )?);

        let counter_store = match (self.counter_store, &config.rate_limit.redis_url) {
            (Some(store), _) => Some(store),
            (None, Some(url)) => {
                let store = RedisCounterStore::lazy(url, COUNTER_STORE_TIMEOUT)
                    .map_err(|e| ConfigError::invalid(format!("rate_limit.redis_url: {e}")))?;
                Some(Arc::new(store) as Arc<dyn CounterStore>)
            }
            (None, None) => None
        };
        let limiter = Arc::new(RateLimiter::new(
            counter_store,
            &config.rate_limit,
            telemetry.clone()
        ));

        let policy = Arc::new(PolicyComplianceEngine::from_config(&config)?);
        let chat = Arc::new(ChatService::new(
            policy,
            router.clone(),
            grounding,
            telemetry.clone(),
            ChatSettings::from_config(&config)
        ));

        info!(
            environment = %config.environment,
            providers = ?router.provider_names(),
            rate_limit_backend = limiter.backend(),
            "Gateway state assembled"
        );

        Ok(AppState {
            auth: Arc::new(AuthState::from_config(&config.auth, config.environment)),
            config: Arc::new(config),
            limiter,
            chat,
            router,
            telemetry,
            prometheus: self.prometheus
        })
    }
}
