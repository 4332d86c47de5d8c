use reqwest::Method;
use serde_json::Value;

use super::super::ExchangeError;
use super::BinanceFuturesClient;

impl BinanceFuturesClient {
    /// GET /fapi/v2/account
    pub async fn fetch_account(&self) -> Result<Value, ExchangeError> {
        self.send_signed(Method::GET, "/fapi/v2/account", &[], false)
            .await
    }

    /// GET /fapi/v2/balance
    pub async fn fetch_balances(&self) -> Result<Value, ExchangeError> {
        self.send_signed(Method::GET, "/fapi/v2/balance", &[], false)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binance::{has_api_credentials, TESTNET_BASE_URL};

    #[tokio::test]
    #[ignore = "needs testnet credentials"]
    async fn test_fetch_balances_testnet() {
        if !has_api_credentials() {
            println!("Skipping test: BINANCE_API_KEY and BINANCE_API_SECRET not set");
            return;
        }

        let client = BinanceFuturesClient::with_credentials().unwrap();
        assert_eq!(client.base_url(), TESTNET_BASE_URL);

        let balances = client.fetch_balances().await.unwrap();
        let entries = balances.as_array().expect("balance list");
        for entry in entries.iter().take(5) {
            println!("{} {}", entry["asset"], entry["balance"]);
        }
    }
}
