use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub use interface::ExchangeError;
use interface::OrderRequest;

pub mod binance;

/// Latest traded price of one symbol, as the exchange reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: String,
}

/// Authenticated futures REST operations consumed by the trading facade.
///
/// Payloads other than server time and ticker price are passed through as raw
/// JSON; callers present them without reshaping.
#[async_trait]
pub trait FuturesExchange: Send + Sync {
    /// Exchange server time in milliseconds.
    async fn server_time(&self) -> Result<u64, ExchangeError>;

    async fn account(&self) -> Result<Value, ExchangeError>;

    async fn balances(&self) -> Result<Value, ExchangeError>;

    async fn create_order(&self, order: &OrderRequest) -> Result<Value, ExchangeError>;

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<Value, ExchangeError>;

    /// Open orders, all symbols when `symbol` is `None`.
    async fn open_orders(&self, symbol: Option<&str>) -> Result<Value, ExchangeError>;

    async fn exchange_info(&self) -> Result<Value, ExchangeError>;

    async fn symbol_price(&self, symbol: &str) -> Result<TickerPrice, ExchangeError>;
}

pub use binance::BinanceFuturesClient;
