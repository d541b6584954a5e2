use lex_core::{ProviderCallResult, ProviderErrorKind};
use reqwest::StatusCode;
use std::time::Instant;

const MAX_ERROR_BODY_CHARS: usize = 200;

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

pub(crate) fn classify_status(status: StatusCode) -> ProviderErrorKind {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderErrorKind::RateLimit,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderErrorKind::Timeout,
        _ => ProviderErrorKind::ProviderError
    }
}

pub(crate) fn classify_transport(error: &reqwest::Error) -> ProviderErrorKind {
    if error.is_timeout() {
        ProviderErrorKind::Timeout
    } else if error.status() == Some(StatusCode::TOO_MANY_REQUESTS) {
        ProviderErrorKind::RateLimit
    } else {
        ProviderErrorKind::ProviderError
    }
}

pub(crate) fn transport_failure(
    provider: &str,
    error: &reqwest::Error,
    start: Instant
) -> ProviderCallResult {
    let kind = classify_transport(error);
    tracing::warn!(provider, kind = %kind, error = %error, "Provider request failed");
    ProviderCallResult::failure(provider, kind, error.to_string(), elapsed_ms(start))
}

pub(crate) async fn status_failure(
    provider: &str,
    response: reqwest::Response,
    start: Instant
) -> ProviderCallResult {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let kind = classify_status(status);
    let detail: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    tracing::warn!(provider, kind = %kind, status = %status, "Provider returned error status");
    ProviderCallResult::failure(
        provider,
        kind,
        format!("HTTP {status}: {detail}"),
        elapsed_ms(start)
    )
}

pub(crate) fn parse_failure(provider: &str, reason: String, start: Instant) -> ProviderCallResult {
    tracing::warn!(provider, reason = %reason, "Provider output could not be parsed");
    ProviderCallResult::failure(
        provider,
        ProviderErrorKind::ProviderError,
        reason,
        elapsed_ms(start)
    )
}
