pub mod domain;
pub mod gateway;
pub mod llm;
pub mod market;
pub mod session;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub gemini_api_key: Option<String>,
        pub gemini_model: Option<String>,
        pub gemini_base_url: Option<String>,
        pub gemini_timeout_secs: Option<u64>,
        pub sentry_dsn: Option<String>,
        pub mock_latency_ms: Option<u64>,
        pub port: Option<u16>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                // API_KEY is what the dashboard build used; GEMINI_API_KEY wins when both are set.
                gemini_api_key: env_non_empty("GEMINI_API_KEY").or_else(|| env_non_empty("API_KEY")),
                gemini_model: env_non_empty("GEMINI_MODEL"),
                gemini_base_url: env_non_empty("GEMINI_BASE_URL"),
                gemini_timeout_secs: env_parsed("GEMINI_TIMEOUT_SECS")?,
                sentry_dsn: env_non_empty("SENTRY_DSN"),
                mock_latency_ms: env_parsed("MOCK_LATENCY_MS")?,
                port: env_parsed("PORT")?,
            })
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY (or API_KEY) is required")
        }

        pub fn mock_latency(&self) -> Option<Duration> {
            self.mock_latency_ms.map(Duration::from_millis)
        }
    }

    fn env_non_empty(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn env_parsed<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        parse_setting(key, env_non_empty(key))
    }

    fn parse_setting<T>(key: &str, raw: Option<String>) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        raw.map(|s| s.parse::<T>().with_context(|| format!("invalid {key}: {s}")))
            .transpose()
    }

}
