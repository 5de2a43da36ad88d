// CoinGecko market data client
use crate::application::market_data::{FetchError, MarketDataSource};
use crate::domain::series::{Lookback, Sample, SeriesId};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    /// Ordered `[timestamp_ms, value]` pairs. Absent when upstream breaks
    /// the contract.
    #[serde(default)]
    prices: Option<Vec<(f64, f64)>>,
}

impl CoinGeckoClient {
    pub fn new(base_url: String, request_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn market_chart_url(&self, series_id: &SeriesId, lookback: Lookback) -> String {
        format!(
            "{}/api/v3/coins/{}/market_chart?vs_currency=usd&days={}",
            self.base_url,
            urlencoding::encode(series_id.as_str()),
            lookback.days
        )
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn fetch_market_chart(
        &self,
        series_id: &SeriesId,
        lookback: Lookback,
    ) -> Result<Vec<Sample>, FetchError> {
        let url = self.market_chart_url(series_id, lookback);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(FetchError::Transport)?;
        parse_market_chart(&body)
    }
}

/// Parse a market_chart body into raw samples, exactly as reported upstream.
/// Anything that is not a JSON object carrying `prices` is a contract
/// violation, not a network fault.
fn parse_market_chart(body: &[u8]) -> Result<Vec<Sample>, FetchError> {
    let parsed: MarketChartResponse = serde_json::from_slice(body)
        .map_err(|err| FetchError::Schema(format!("unparseable body: {err}")))?;

    let prices = parsed
        .prices
        .ok_or_else(|| FetchError::Schema("missing `prices` field".to_string()))?;

    Ok(prices
        .into_iter()
        .map(|(timestamp_ms, value)| Sample::new(timestamp_ms as i64, value))
        .collect())
}
