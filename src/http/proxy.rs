//! Request-forwarding pipeline.
//!
//! ```text
//! inbound request
//!     → TokenGate        (401 on missing/invalid token)
//!     → TargetResolver   (400 on missing host / bad URL)
//!     → HeaderSanitizer
//!     → UpstreamDispatcher (504 on deadline, 502 on transport, mirrored non-2xx)
//!     → ResponseRelay    (413 over the size cap, 502 on corrupt gzip)
//!     → caller
//! ```
//!
//! Any stage may short-circuit to `PendingResponse::fail`. Nothing here is
//! shared mutably between requests.

use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, Response};
use futures_util::stream;

use crate::config::{ConfigError, ProxyConfig};
use crate::config::validation::ValidationError;
use crate::error::ProxyError;
use crate::http::relay::{RelayBody, Relayed, ResponseRelay};
use crate::http::request::request_id;
use crate::http::response::PendingResponse;
use crate::http::upstream::{forwards_body, UpstreamClient, UpstreamDispatcher};
use crate::observability::metrics;
use crate::routing::{HostSource, TargetResolver};
use crate::security::{HeaderSanitizer, TokenGate};

/// All pipeline stages, built once from the configuration.
#[derive(Clone)]
pub struct ProxyPipeline {
    gate: TokenGate,
    resolver: TargetResolver,
    sanitizer: HeaderSanitizer,
    dispatcher: UpstreamDispatcher,
    relay: ResponseRelay,
}

impl ProxyPipeline {
    pub fn from_config(config: &ProxyConfig, client: UpstreamClient) -> Result<Self, ConfigError> {
        let token_header = header_name("auth.token_header", &config.auth.token_header)?;
        let host_header = header_name("upstream.host_header", &config.upstream.host_header)?;
        let credential = match &config.upstream.credential {
            Some(value) => {
                let name =
                    header_name("upstream.credential_header", &config.upstream.credential_header)?;
                let value = HeaderValue::from_str(value).map_err(|_| {
                    ConfigError::Validation(vec![ValidationError::InvalidHeaderValue(
                        "upstream.credential",
                    )])
                })?;
                Some((name, value))
            }
            None => None,
        };

        Ok(Self {
            gate: TokenGate::new(token_header.clone(), config.auth.token.clone()),
            resolver: TargetResolver::new(
                config.upstream.scheme.clone(),
                host_header.clone(),
                config.upstream.default_host.clone(),
            ),
            sanitizer: HeaderSanitizer::new(token_header, host_header, credential),
            dispatcher: UpstreamDispatcher::new(client, config.upstream.timeout()),
            relay: ResponseRelay::new(
                config.upstream.max_body_size,
                config.upstream.relay_timeout(),
            ),
        })
    }

    pub fn gate(&self) -> &TokenGate {
        &self.gate
    }

    /// Handle one request end to end. Always produces a response.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let request_id = request_id(request.headers());
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            "Proxying request"
        );

        let pending = PendingResponse::new(request_id.clone());
        let mut resolved: Option<(String, HostSource)> = None;

        let result = self.forward(request, &mut resolved).await;
        let (host, route) = match &resolved {
            Some((host, source)) => (host.as_str(), source.label()),
            None => ("none", "none"),
        };

        match result {
            Ok(relayed) => {
                metrics::record_request(&method, relayed.status.as_u16(), route, start);
                metrics::record_upstream_bytes(route, relayed.upstream_bytes);
                tracing::debug!(
                    request_id = %request_id,
                    upstream = %host,
                    status = relayed.status.as_u16(),
                    bytes = relayed.upstream_bytes,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Relaying response"
                );

                let started = pending.begin(relayed.status);
                match relayed.body {
                    RelayBody::Verbatim(bytes) => started.finish(bytes),
                    RelayBody::Gunzip(chunks) => started.finish_stream(stream::iter(chunks)),
                }
            }
            Err(err) => {
                metrics::record_request(&method, err.status().as_u16(), route, start);
                metrics::record_error(err.kind());
                tracing::debug!(request_id = %request_id, upstream = %host, "Request failed");
                pending.fail(&err)
            }
        }
    }

    async fn forward(
        &self,
        request: Request<Body>,
        resolved: &mut Option<(String, HostSource)>,
    ) -> Result<Relayed, ProxyError> {
        let (parts, body) = request.into_parts();

        self.gate.check(&parts.headers)?;

        let target = self.resolver.resolve(&parts.headers, &parts.uri)?;
        *resolved = Some((target.host.clone(), target.source));

        let headers = self
            .sanitizer
            .sanitize(&parts.headers, forwards_body(&parts.method));

        let ctx = self.dispatcher.context(parts.method, target, headers);
        let response = self.dispatcher.dispatch(ctx, body).await?;

        self.relay.relay(response).await
    }
}

fn header_name(field: &'static str, value: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::from_bytes(value.as_bytes()).map_err(|_| {
        ConfigError::Validation(vec![ValidationError::InvalidHeaderName {
            field,
            value: value.to_string(),
        }])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::upstream::build_client;
    use ::metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use axum::http::StatusCode;
    use std::sync::Mutex;

    fn config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.auth.token = Some("s3cret".into());
        config
    }

    async fn envelope(response: Response<Body>) -> crate::error::ErrorEnvelope {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_rejects_without_token() {
        let pipeline = ProxyPipeline::from_config(&config(), build_client()).unwrap();
        let request = Request::builder().uri("/x").body(Body::empty()).unwrap();
        let response = pipeline.handle(request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(envelope(response).await.message, "Unauthorized: missing token");
    }

    #[tokio::test]
    async fn test_missing_host_after_auth() {
        let pipeline = ProxyPipeline::from_config(&config(), build_client()).unwrap();
        let request = Request::builder()
            .uri("/x")
            .header("x-proxy-token", "s3cret")
            .body(Body::empty())
            .unwrap();
        let response = pipeline.handle(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(envelope(response).await.code, 400);
    }

    #[derive(Default)]
    struct LabelRecorder {
        labels: Mutex<Vec<(String, String)>>,
    }

    impl LabelRecorder {
        fn capture(&self, key: &Key) {
            let mut labels = self.labels.lock().unwrap();
            for label in key.labels() {
                labels.push((label.key().to_string(), label.value().to_string()));
            }
        }
    }

    impl Recorder for LabelRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            self.capture(key);
            Counter::noop()
        }

        fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
            self.capture(key);
            Gauge::noop()
        }

        fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
            self.capture(key);
            Histogram::noop()
        }
    }

    #[tokio::test]
    async fn test_metrics_labels_never_carry_caller_host() {
        let recorder = LabelRecorder::default();
        let _guard = ::metrics::set_default_local_recorder(&recorder);

        let mut config = config();
        config.upstream.scheme = "http".into();
        let pipeline = ProxyPipeline::from_config(&config, build_client()).unwrap();
        let request = Request::builder()
            .uri("/x")
            .header("x-proxy-token", "s3cret")
            .header("x-proxy-host", "127.0.0.1:1")
            .body(Body::empty())
            .unwrap();
        pipeline.handle(request).await;

        let labels = recorder.labels.lock().unwrap().clone();
        assert!(labels.contains(&("route".to_string(), "override".to_string())));
        assert!(labels.iter().all(|(_, value)| !value.contains("127.0.0.1")));
    }

    #[test]
    fn test_bad_credential_value_rejected() {
        let mut config = config();
        config.upstream.credential = Some("line\nbreak".into());
        assert!(matches!(
            ProxyPipeline::from_config(&config, build_client()),
            Err(ConfigError::Validation(_))
        ));
    }
}
