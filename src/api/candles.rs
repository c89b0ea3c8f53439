//! Candle history endpoint.

use crate::client::ChartApiClient;
use crate::constants::CANDLES_PATH;
use crate::error::Result;
use crate::types::candle::{Candle, Interval};
use crate::types::lenient::Lenient;

impl ChartApiClient {
    /// Retrieve up to `limit` candles for `symbol`, most recent last.
    ///
    /// Candles that fail to parse are skipped.
    ///
    /// With `end_time_ms` set, only candles opening at or before that
    /// instant are returned. Used to page history backwards.
    ///
    /// **Endpoint:** `GET /candles?symbol&interval&limit[&endTimeMs]`
    pub async fn get_candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: u32,
        end_time_ms: Option<i64>,
    ) -> Result<Vec<Candle>> {
        let mut query = vec![
            ("symbol", symbol.to_owned()),
            ("interval", interval.as_str().to_owned()),
            ("limit", limit.to_string()),
        ];
        if let Some(end) = end_time_ms {
            query.push(("endTimeMs", end.to_string()));
        }
        let candles: Lenient<Candle> = self.get_with_query(CANDLES_PATH, &query).await?;
        Ok(candles.into_inner())
    }
}
