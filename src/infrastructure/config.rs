use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChartConfig {
    #[serde(default)]
    pub chart: ChartSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_series")]
    pub default_series: String,
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            default_series: default_series(),
            update_interval_ms: default_update_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            window_size: default_window_size(),
            lookback_days: default_lookback_days(),
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.coingecko.com".to_string()
}

fn default_series() -> String {
    "bitcoin".to_string()
}

fn default_update_interval_ms() -> u64 {
    30_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_window_size() -> usize {
    10
}

fn default_lookback_days() -> u32 {
    1
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

pub fn load_chart_config() -> anyhow::Result<ChartConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/chart").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}
