use serde::Deserialize;
use serde_json::Value;

use super::super::{ExchangeError, TickerPrice};
use super::BinanceFuturesClient;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerTime {
    server_time: u64,
}

impl BinanceFuturesClient {
    /// GET /fapi/v1/time
    pub async fn fetch_server_time(&self) -> Result<u64, ExchangeError> {
        let time: ServerTime = self.send_public("/fapi/v1/time", &[]).await?;
        Ok(time.server_time)
    }

    /// GET /fapi/v1/exchangeInfo
    pub async fn fetch_exchange_info(&self) -> Result<Value, ExchangeError> {
        self.send_public("/fapi/v1/exchangeInfo", &[]).await
    }

    /// GET /fapi/v1/ticker/price
    pub async fn fetch_symbol_price(&self, symbol: &str) -> Result<TickerPrice, ExchangeError> {
        self.send_public("/fapi/v1/ticker/price", &[("symbol", symbol.to_string())])
            .await
    }
}
