use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response
};
use observability::{TRACE_ID_HEADER, TraceId};
use tracing::{Instrument, info_span};

/// Trace id assigned to this request, or a fresh one when the trace layer
/// did not run.
pub fn trace_id_of(request: &Request) -> TraceId {
    request
        .extensions()
        .get::<TraceId>()
        .cloned()
        .unwrap_or_else(TraceId::generate)
}

/// Honours a well-formed inbound `x-trace-id`, otherwise assigns one. Every
/// response carries the header and all logs of the request sit in its span.
pub async fn trace_id_middleware(mut request: Request, next: Next) -> Response {
    let inbound = request
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok());
    let trace_id = TraceId::from_inbound_or_generate(inbound);
    request.extensions_mut().insert(trace_id.clone());

    let span = info_span!(
        "request",
        trace_id = %trace_id,
        method = %request.method(),
        path = %request.uri().path()
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(trace_id.as_str()) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}
