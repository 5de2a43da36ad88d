// Market data source trait - the seam between the scheduler and the upstream API
use crate::domain::series::{Lookback, Sample, SeriesId};
use async_trait::async_trait;
use thiserror::Error;

/// Failure kinds for one fetch. The kinds are deliberately distinct: a
/// transport fault and an upstream data-contract violation are logged and
/// reasoned about differently, and must never be conflated.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS or timeout failure before any response arrived.
    #[error("transport failure talking to market data API: {0}")]
    Transport(#[source] reqwest::Error),
    /// A response arrived, but with a non-success status code.
    #[error("market data API returned status {status}")]
    HttpStatus { status: u16 },
    /// A response arrived and parsed, but did not carry the expected price
    /// series. This is an upstream contract violation, not a network fault.
    #[error("market data response violated the expected schema: {0}")]
    Schema(String),
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the raw price series for one instrument over the given lookback
    /// window, exactly as reported upstream: ordered, unfiltered, duplicates
    /// included. One network call, no caching, no internal retries - the next
    /// scheduled tick is the retry.
    async fn fetch_market_chart(
        &self,
        series_id: &SeriesId,
        lookback: Lookback,
    ) -> Result<Vec<Sample>, FetchError>;
}
