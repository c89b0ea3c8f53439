//! Latest price endpoint.

use serde::Deserialize;

use crate::client::ChartApiClient;
use crate::constants::PRICE_PATH;
use crate::error::Result;

/// Response of `GET /price/{symbol}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceResponse {
    /// Last traded price.
    pub price: f64,
}

impl ChartApiClient {
    /// Retrieve the last traded price of `symbol`.
    ///
    /// **Endpoint:** `GET /price/{symbol}`
    pub async fn get_latest_price(&self, symbol: &str) -> Result<f64> {
        let url = self.segment_url(&[PRICE_PATH.trim_start_matches('/'), symbol])?;
        let resp: PriceResponse = self.get_url(url).await?;
        Ok(resp.price)
    }
}
