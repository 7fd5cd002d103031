use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://maleesha29-disease-risk-prediction.hf.space";
pub const BASE_URL_ENV: &str = "NEXT_PUBLIC_MULTI_DISEASE_API_URL";

/// Budget for the submit + result exchange. Generous because the hosted
/// model sleeps when idle and needs a cold start.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl ServiceConfig {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_env() -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                Self::new(url.trim(), Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            }
            _ => Self::default(),
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn submit_url(&self) -> String {
        format!("{}/gradio_api/call/predict_diseases", self.base_url)
    }

    pub fn result_url(&self, event_id: &str) -> String {
        format!("{}/gradio_api/call/predict_diseases/{}", self.base_url, event_id)
    }

    pub fn health_url(&self) -> String {
        format!("{}/", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_endpoint_urls_without_double_slashes() {
        let config = ServiceConfig::new("http://localhost:7860/", Duration::from_secs(5));
        assert_eq!(
            config.submit_url(),
            "http://localhost:7860/gradio_api/call/predict_diseases"
        );
        assert_eq!(
            config.result_url("abc123"),
            "http://localhost:7860/gradio_api/call/predict_diseases/abc123"
        );
        assert_eq!(config.health_url(), "http://localhost:7860/");
    }

    #[test]
    fn default_uses_hosted_space_and_two_minute_budget() {
        let config = ServiceConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }
}
