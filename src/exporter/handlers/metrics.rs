use crate::collectors::{ScrapeRegistry, scrape};
use crate::exporter::ScrapeContext;
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
};
use prometheus::{Encoder, TextEncoder};
use tracing::{debug, error, warn};

/// Run one scrape and expose it next to the exporter's own metrics.
///
/// Always 200 unless encoding fails: a broken console shows up as
/// `odyssey_exporter_up 0` plus whatever the healthy steps produced.
pub async fn metrics(Extension(context): Extension<ScrapeContext>) -> impl IntoResponse {
    let mut families = Vec::new();

    match ScrapeRegistry::new() {
        Ok(mut registry) => {
            let outcome = scrape(&context.options, context.timeout, &mut registry).await;

            match &outcome.result {
                Ok(()) => debug!(elapsed = ?outcome.elapsed, "scrape finished"),
                Err(err) => warn!(elapsed = ?outcome.elapsed, error = %err, "scrape finished with errors"),
            }

            context.metrics.observe(&outcome);
            families.extend(registry.gather());
        }
        Err(err) => error!(error = %err, "failed to build scrape registry"),
    }

    families.extend(context.metrics.gather());

    let encoder = TextEncoder::new();
    let mut headers = HeaderMap::new();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut buffer) {
        error!(error = %err, "failed to encode metrics");
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            headers,
            format!("Error encoding metrics: {err}").into_bytes(),
        );
    }

    if let Ok(content_type) = HeaderValue::from_str(encoder.format_type()) {
        headers.insert(CONTENT_TYPE, content_type);
    }

    (StatusCode::OK, headers, buffer)
}
