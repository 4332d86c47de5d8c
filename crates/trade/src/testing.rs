//! Scripted exchange used by the facade tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use exchanges::{ExchangeError, FuturesExchange, TickerPrice};
use interface::OrderRequest;

pub(crate) struct FakeExchange {
    calls: Mutex<Vec<&'static str>>,
    orders: Mutex<Vec<OrderRequest>>,
    scripted: Mutex<HashMap<&'static str, VecDeque<Result<Value, ExchangeError>>>>,
}

impl FakeExchange {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            orders: Mutex::new(Vec::new()),
            scripted: Mutex::new(HashMap::new()),
        }
    }

    /// Queue the next result of `operation`; unscripted calls get a default payload.
    pub(crate) fn script(&self, operation: &'static str, result: Result<Value, ExchangeError>) {
        self.scripted
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(result);
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| **c == operation).count()
    }

    pub(crate) fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }

    fn next(&self, operation: &'static str, default: Value) -> Result<Value, ExchangeError> {
        self.calls.lock().unwrap().push(operation);
        self.scripted
            .lock()
            .unwrap()
            .get_mut(operation)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(default))
    }
}

pub(crate) fn api_error(code: i64, message: &str) -> ExchangeError {
    ExchangeError::Api {
        code,
        message: message.to_string(),
        retry_after: None,
    }
}

#[async_trait]
impl FuturesExchange for FakeExchange {
    async fn server_time(&self) -> Result<u64, ExchangeError> {
        let value = self.next("server_time", json!(1_700_000_000_000u64))?;
        value
            .as_u64()
            .ok_or_else(|| ExchangeError::Other(format!("bad server time: {}", value)))
    }

    async fn account(&self) -> Result<Value, ExchangeError> {
        self.next("account", json!({"totalWalletBalance": "15000.00000000"}))
    }

    async fn balances(&self) -> Result<Value, ExchangeError> {
        self.next(
            "balances",
            json!([{
                "asset": "USDT",
                "balance": "15000.00000000",
                "availableBalance": "12.50000000",
            }]),
        )
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<Value, ExchangeError> {
        self.orders.lock().unwrap().push(order.clone());
        self.next("create_order", json!({"orderId": 1, "status": "NEW"}))
    }

    async fn cancel_order(&self, _symbol: &str, order_id: u64) -> Result<Value, ExchangeError> {
        self.next(
            "cancel_order",
            json!({"orderId": order_id, "status": "CANCELED"}),
        )
    }

    async fn open_orders(&self, _symbol: Option<&str>) -> Result<Value, ExchangeError> {
        self.next("open_orders", json!([]))
    }

    async fn exchange_info(&self) -> Result<Value, ExchangeError> {
        self.next(
            "exchange_info",
            json!({"symbols": [
                {"symbol": "BTCUSDT", "pricePrecision": 2, "quantityPrecision": 3},
                {"symbol": "ETHUSDT", "pricePrecision": 2, "quantityPrecision": 3},
            ]}),
        )
    }

    async fn symbol_price(&self, symbol: &str) -> Result<TickerPrice, ExchangeError> {
        let value = self.next(
            "symbol_price",
            json!({"symbol": symbol, "price": "43250.10"}),
        )?;
        serde_json::from_value(value).map_err(|e| ExchangeError::Other(e.to_string()))
    }
}
