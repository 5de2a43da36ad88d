// Infrastructure layer - External dependencies and adapters
pub mod bridge;
pub mod coingecko;
pub mod config;
