use crate::collectors::console::{AdminConsole, PgConsole};
use crate::collectors::error::StepError;
use crate::collectors::steps::{self, Step};
use crate::exporter::{GIT_COMMIT_HASH, ScrapeContext};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    odyssey: String,
}

// Open a console connection and ask for the version
async fn check_odyssey(context: &ScrapeContext) -> Result<String, StepError> {
    let deadline = context.timeout.map(|timeout| Instant::now() + timeout);

    let console = PgConsole::connect(&context.options, deadline).await?;

    let command = Step::Version.command();
    let result = match deadline {
        Some(deadline) => match timeout_at(deadline, console.query(command)).await {
            Ok(result) => result.map_err(StepError::from),
            Err(_) => Err(StepError::DeadlineExceeded),
        },
        None => console.query(command).await.map_err(StepError::from),
    };

    console.close().await;

    Ok(steps::version::parse(&result?)?)
}

fn create_health_response(odyssey: &Result<String, StepError>) -> Health {
    Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        odyssey: if odyssey.is_ok() {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    }
}

fn create_response_body(method: &Method, health: &Health) -> Body {
    if method == Method::GET {
        Json(health).into_response().into_body()
    } else {
        Body::empty()
    }
}

// X-App: name:version:shorthash
fn create_app_headers(health: &Health) -> HeaderMap {
    let short_hash = if health.commit.len() > 7 {
        health.commit.get(..7).unwrap_or_default()
    } else {
        ""
    };

    let header_value = format!("{}:{}:{}", health.name, health.version, short_hash);

    let mut headers = HeaderMap::new();
    match header_value.parse::<HeaderValue>() {
        Ok(value) => {
            headers.insert("X-App", value);
        }
        Err(err) => debug!("Failed to parse X-App header: {}", err),
    }
    headers
}

pub async fn health(method: Method, Extension(context): Extension<ScrapeContext>) -> impl IntoResponse {
    let odyssey = check_odyssey(&context).await;
    let health = create_health_response(&odyssey);
    let body = create_response_body(&method, &health);
    let headers = create_app_headers(&health);

    match odyssey {
        Ok(version) => {
            debug!(odyssey = %version, "Odyssey console is healthy");
            (StatusCode::OK, headers, body)
        }
        Err(err) => {
            error!(error = %err, "Odyssey console is unhealthy");
            (StatusCode::SERVICE_UNAVAILABLE, headers, body)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_health_response() {
        let ok = create_health_response(&Ok("1.4".to_string()));
        assert_eq!(ok.odyssey, "ok");
        assert_eq!(ok.name, env!("CARGO_PKG_NAME"));

        let down = create_health_response(&Err(StepError::Failed(anyhow!("refused"))));
        assert_eq!(down.odyssey, "error");
    }

    #[test]
    fn test_health_json_fields() {
        let health = create_health_response(&Err(StepError::DeadlineExceeded));
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["odyssey"], "error");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(json.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_app_header() {
        let health = Health {
            commit: "0123456789abcdef".to_string(),
            name: "odyssey_exporter".to_string(),
            version: "0.1.0".to_string(),
            odyssey: "ok".to_string(),
        };
        let headers = create_app_headers(&health);
        assert_eq!(
            headers.get("X-App").unwrap(),
            "odyssey_exporter:0.1.0:0123456"
        );
    }

    #[test]
    fn test_app_header_without_commit() {
        let health = Health {
            commit: ":-(".to_string(),
            name: "odyssey_exporter".to_string(),
            version: "0.1.0".to_string(),
            odyssey: "error".to_string(),
        };
        let headers = create_app_headers(&health);
        assert_eq!(headers.get("X-App").unwrap(), "odyssey_exporter:0.1.0:");
    }

    #[test]
    fn test_options_has_empty_body() {
        let health = create_health_response(&Ok("1.4".to_string()));
        let body = create_response_body(&Method::OPTIONS, &health);
        assert_eq!(axum::body::HttpBody::size_hint(&body).exact(), Some(0));
    }
}
