//! Mirror discovery
//!
//! Candidates are probed in configured order on every request. Probe outcomes
//! are never remembered, so a mirror that recovers is used again at once.

use std::time::Duration;

use crate::config::Config;
use crate::metrics::Metrics;

/// A mirror that answered its liveness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyInstance {
    base_url: String,
}

impl ProxyInstance {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Probe one candidate; any 2xx answer within the probe budget counts as live
async fn probe(instance: &ProxyInstance, config: &Config, client: &reqwest::Client) -> bool {
    let url = instance.url_for(&config.proxy.probe_path);
    let timeout = Duration::from_secs(config.timeouts.probe());

    match tokio::time::timeout(timeout, client.get(&url).send()).await {
        Ok(Ok(response)) => {
            let is_success = response.status().is_success();
            tracing::debug!(
                url = %url,
                status = %response.status(),
                healthy = is_success,
                "Mirror probe completed"
            );
            is_success
        }
        Ok(Err(e)) => {
            tracing::debug!(url = %url, error = %e, "Mirror probe failed");
            false
        }
        Err(_) => {
            tracing::debug!(
                url = %url,
                timeout_seconds = timeout.as_secs(),
                "Mirror probe timed out"
            );
            false
        }
    }
}

/// First live mirror in configured order, or `None` when every probe fails
///
/// Candidates after the first live one are not contacted.
pub async fn discover_instance(
    config: &Config,
    client: &reqwest::Client,
    metrics: &Metrics,
) -> Option<ProxyInstance> {
    for base_url in &config.proxy.instances {
        let instance = ProxyInstance::new(base_url.as_str());
        let healthy = probe(&instance, config, client).await;
        metrics.record_mirror_probe(instance.base_url(), healthy);

        if healthy {
            tracing::debug!(instance = %instance.base_url(), "Selected mirror instance");
            return Some(instance);
        }
    }

    tracing::warn!(
        candidates = config.proxy.instances.len(),
        "No mirror instance passed its liveness probe"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn config_with_instances(instances: &[String]) -> Config {
        let list = instances
            .iter()
            .map(|i| format!("\"{}\"", i))
            .collect::<Vec<_>>()
            .join(", ");
        Config::from_str(&format!(
            r#"
[server]
host = "127.0.0.1"
port = 3000

[upstream]
base_url = "http://localhost:1234/v1"

[proxy]
instances = [{list}]
"#
        ))
        .unwrap()
    }

    async fn mirror(status: u16, expected_probes: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/stats"))
            .respond_with(ResponseTemplate::new(status))
            .expect(expected_probes)
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_instance_trims_trailing_slash() {
        let instance = ProxyInstance::new("https://mirror.example/");
        assert_eq!(instance.base_url(), "https://mirror.example");
        assert_eq!(
            instance.url_for("/api/v1/stats"),
            "https://mirror.example/api/v1/stats"
        );
    }

    #[tokio::test]
    async fn test_first_live_mirror_wins_and_later_ones_are_not_probed() {
        let down = mirror(503, 1).await;
        let up = mirror(200, 1).await;
        let never = mirror(200, 0).await;

        let config = config_with_instances(&[down.uri(), up.uri(), never.uri()]);
        let metrics = Metrics::new().unwrap();

        let selected = discover_instance(&config, &reqwest::Client::new(), &metrics)
            .await
            .expect("second mirror should be selected");

        assert_eq!(selected.base_url(), up.uri());
        assert_eq!(metrics.mirror_probes_count(&down.uri(), false), 1);
        assert_eq!(metrics.mirror_probes_count(&up.uri(), true), 1);
    }

    #[tokio::test]
    async fn test_no_live_mirror_returns_none() {
        let config = config_with_instances(&[
            "http://127.0.0.1:9".to_string(),
            "http://127.0.0.1:9/".to_string(),
        ]);
        let metrics = Metrics::new().unwrap();
        assert!(
            discover_instance(&config, &reqwest::Client::new(), &metrics)
                .await
                .is_none()
        );
    }
}
