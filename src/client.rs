//! Client for the hosted disease-risk model.
//!
//! A prediction is a two-step exchange: submit the positional arguments and
//! receive an `event_id`, then read the result stream for that id. Both steps
//! share one deadline.

use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::error::{truncate_body, PredictionError};
use crate::html;
use crate::mapper;
use crate::models::{DiseasePredictionInput, DiseasePredictionResult, HealthStatus};
use crate::normalize;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport seam so the invoker can be driven without a network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, PredictionError>;

    async fn get(&self, url: &str) -> Result<HttpReply, PredictionError>;
}

pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, PredictionError> {
        let inner = reqwest::Client::builder()
            .user_agent(concat!("vetlink-risk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, PredictionError> {
        let response = self.inner.post(url).json(body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }

    async fn get(&self, url: &str) -> Result<HttpReply, PredictionError> {
        let response = self.inner.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    event_id: Option<String>,
}

pub struct DiseaseRiskClient<T = ReqwestTransport> {
    config: ServiceConfig,
    transport: T,
}

impl DiseaseRiskClient<ReqwestTransport> {
    pub fn new(config: ServiceConfig) -> Result<Self, PredictionError> {
        Ok(Self::with_transport(config, ReqwestTransport::new()?))
    }
}

impl<T: Transport> DiseaseRiskClient<T> {
    pub fn with_transport(config: ServiceConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Runs one analysis end to end. Any failure aborts the whole call; there
    /// is no retry.
    pub async fn predict(
        &self,
        input: &DiseasePredictionInput,
    ) -> Result<DiseasePredictionResult, PredictionError> {
        mapper::validate_input(input)?;

        let started = Instant::now();
        let secs = self.config.timeout.as_secs();
        let sse_body = match tokio::time::timeout(self.config.timeout, self.exchange(input)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(timeout_secs = secs, "prediction exchange timed out");
                return Err(PredictionError::Timeout { secs });
            }
        };

        let conditions = html::parse_risk_result(&sse_body)?;
        let result = normalize::normalize(&conditions, input);
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            conditions = conditions.len(),
            has_risk = result.has_risk,
            "prediction completed"
        );
        Ok(result)
    }

    async fn exchange(&self, input: &DiseasePredictionInput) -> Result<String, PredictionError> {
        let payload = serde_json::to_value(mapper::to_payload(input))
            .map_err(|e| PredictionError::InvalidInput(e.to_string()))?;

        let submit_url = self.config.submit_url();
        tracing::info!(url = %submit_url, "submitting prediction");
        let submitted = self.transport.post_json(&submit_url, &payload).await?;
        if !submitted.is_success() {
            tracing::warn!(status = submitted.status, "prediction submit rejected");
            return Err(PredictionError::Submit {
                status: submitted.status,
                body: truncate_body(&submitted.body),
            });
        }

        let event_id = serde_json::from_str::<SubmitResponse>(&submitted.body)
            .ok()
            .and_then(|r| r.event_id)
            .filter(|id| !id.is_empty())
            .ok_or(PredictionError::MissingEventId)?;
        tracing::debug!(event_id = %event_id, "prediction queued");

        let fetched = self.transport.get(&self.config.result_url(&event_id)).await?;
        if !fetched.is_success() {
            tracing::warn!(status = fetched.status, event_id = %event_id, "prediction result fetch failed");
            return Err(PredictionError::ResultFetch {
                status: fetched.status,
                body: truncate_body(&fetched.body),
            });
        }
        tracing::debug!(bytes = fetched.body.len(), "received result stream");

        Ok(fetched.body)
    }

    /// Reports `unhealthy` on any failure instead of erroring.
    pub async fn health_check(&self) -> HealthStatus {
        let reply = match self.transport.get(&self.config.health_url()).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(error = %err, "health check failed");
                return HealthStatus::unhealthy();
            }
        };
        if !reply.is_success() {
            tracing::warn!(status = reply.status, "health check returned error status");
            return HealthStatus::unhealthy();
        }
        serde_json::from_str(&reply.body).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "health check body was not a status object");
            HealthStatus::unhealthy()
        })
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::mock::{MockResponse, MockTransport};
    use super::*;
    use crate::html::tests::fixture;
    use crate::mapper::tests::sample_input;
    use crate::models::{DiseaseType, RiskLevel};

    const BASE: &str = "http://model.test";
    const SUBMIT: &str = "http://model.test/gradio_api/call/predict_diseases";
    const RESULT: &str = "http://model.test/gradio_api/call/predict_diseases/evt-1";

    fn config() -> ServiceConfig {
        ServiceConfig::new(BASE, Duration::from_secs(120))
    }

    fn sse_body() -> String {
        let html = fixture(&[
            ("Tick Borne Disease", "MODERATE RISK", "52.0"),
            ("Filariasis", "HIGH RISK", "77.1"),
            ("Diabetes Mellitus Type 2", "HIGH RISK", "64.0"),
            ("Obesity Related Metabolic Dysfunction", "HIGH RISK", "70.0"),
            ("Urolithiasis", "LOW RISK", "18.2"),
        ]);
        format!(
            "event: complete\ndata: {}\n\n",
            serde_json::to_string(&vec![html]).unwrap()
        )
    }

    #[tokio::test]
    async fn runs_both_phases_and_normalizes() {
        let transport = MockTransport::new()
            .with_reply(SUBMIT, 200, r#"{"event_id": "evt-1"}"#)
            .with_reply(RESULT, 200, &sse_body());
        let client = DiseaseRiskClient::with_transport(config(), transport);

        let result = client.predict(&sample_input()).await.unwrap();

        assert_eq!(result.predictions.len(), 6);
        assert!(result.has_risk);
        assert_eq!(result.highest_risk_disease, Some(DiseaseType::Filariasis));
        let healthy = result.prediction(DiseaseType::Healthy).unwrap();
        assert!((healthy.probability - 22.9).abs() < 1e-9);
        assert_eq!(
            result.prediction(DiseaseType::Urolithiasis).unwrap().risk_level,
            RiskLevel::Low
        );

        let requests = client.transport.requests();
        assert_eq!(
            requests,
            vec![
                ("POST".to_string(), SUBMIT.to_string()),
                ("GET".to_string(), RESULT.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn submit_failure_embeds_status_and_truncated_body() {
        let transport = MockTransport::new().with_reply(SUBMIT, 503, &"x".repeat(500));
        let client = DiseaseRiskClient::with_transport(config(), transport);

        match client.predict(&sample_input()).await {
            Err(PredictionError::Submit { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body.len(), 200);
            }
            other => panic!("expected submit error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_event_id_is_reported() {
        let transport = MockTransport::new().with_reply(SUBMIT, 200, r#"{"queued": true}"#);
        let client = DiseaseRiskClient::with_transport(config(), transport);

        let err = client.predict(&sample_input()).await.unwrap_err();
        assert!(matches!(err, PredictionError::MissingEventId));
        assert_eq!(client.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn result_fetch_failure_embeds_status() {
        let transport = MockTransport::new()
            .with_reply(SUBMIT, 200, r#"{"event_id": "evt-1"}"#)
            .with_reply(RESULT, 404, "unknown event");
        let client = DiseaseRiskClient::with_transport(config(), transport);

        let err = client.predict(&sample_input()).await.unwrap_err();
        assert!(matches!(err, PredictionError::ResultFetch { status: 404, .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_result_stream_times_out() {
        let transport = MockTransport::new()
            .with_reply(SUBMIT, 200, r#"{"event_id": "evt-1"}"#)
            .with_response(
                RESULT,
                MockResponse::Delayed(Duration::from_secs(121), 200, sse_body()),
            );
        let client = DiseaseRiskClient::with_transport(config(), transport);

        let err = client.predict(&sample_input()).await.unwrap_err();
        assert!(matches!(err, PredictionError::Timeout { secs: 120 }));
        let message = err.to_string();
        assert!(message.to_lowercase().contains("timeout"));
        assert!(message.contains("120"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_covers_submit_and_fetch_together() {
        let transport = MockTransport::new()
            .with_response(
                SUBMIT,
                MockResponse::Delayed(
                    Duration::from_secs(70),
                    200,
                    r#"{"event_id": "evt-1"}"#.to_string(),
                ),
            )
            .with_response(
                RESULT,
                MockResponse::Delayed(Duration::from_secs(70), 200, sse_body()),
            );
        let client = DiseaseRiskClient::with_transport(config(), transport);

        let err = client.predict(&sample_input()).await.unwrap_err();
        assert!(matches!(err, PredictionError::Timeout { secs: 120 }));
        assert_eq!(client.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn unparseable_model_output_fails() {
        let transport = MockTransport::new()
            .with_reply(SUBMIT, 200, r#"{"event_id": "evt-1"}"#)
            .with_reply(RESULT, 200, "event: complete\ndata: [\"<p>Model warming up</p>\"]\n");
        let client = DiseaseRiskClient::with_transport(config(), transport);

        let err = client.predict(&sample_input()).await.unwrap_err();
        assert!(matches!(err, PredictionError::Parse(_)));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_network() {
        let client = DiseaseRiskClient::with_transport(config(), MockTransport::new());
        let mut input = sample_input();
        input.body_condition_score = 12;

        let err = client.predict(&input).await.unwrap_err();
        assert!(matches!(err, PredictionError::InvalidInput(_)));
        assert_eq!(client.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn health_check_reports_status_or_unhealthy() {
        let healthy = DiseaseRiskClient::with_transport(
            config(),
            MockTransport::new().with_reply("http://model.test/", 200, r#"{"status": "ok"}"#),
        );
        assert_eq!(healthy.health_check().await.status, "ok");

        let down = DiseaseRiskClient::with_transport(
            config(),
            MockTransport::new().with_response(
                "http://model.test/",
                MockResponse::Error("connection refused".to_string()),
            ),
        );
        assert_eq!(down.health_check().await, HealthStatus::unhealthy());

        let html_page = DiseaseRiskClient::with_transport(
            config(),
            MockTransport::new().with_reply("http://model.test/", 200, "<html></html>"),
        );
        assert_eq!(html_page.health_check().await.status, "unhealthy");
    }
}
