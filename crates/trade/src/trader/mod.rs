//! Validated trading operations over a [`FuturesExchange`].

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info};

use exchanges::FuturesExchange;
use interface::{ErrorKind, OrderRequest, TradingError};

use crate::audit::{AuditEntry, AuditSink, TradeRecord};
use crate::retry::{ApiCall, RetryPolicy};
use crate::validation::{build_order, validate_symbol};

const TIME: &str = "/fapi/v1/time";
const ACCOUNT: &str = "/fapi/v2/account";
const BALANCE: &str = "/fapi/v2/balance";
const ORDER: &str = "/fapi/v1/order";
const OPEN_ORDERS: &str = "/fapi/v1/openOrders";
const EXCHANGE_INFO: &str = "/fapi/v1/exchangeInfo";
const TICKER_PRICE: &str = "/fapi/v1/ticker/price";

/// Futures trading facade.
///
/// Inputs are validated before anything is sent, every exchange call goes
/// through the retry policy, and every failure is written to the audit sink
/// before it is returned.
pub struct FuturesTrader {
    exchange: Arc<dyn FuturesExchange>,
    retry: RetryPolicy,
    audit: Arc<dyn AuditSink>,
}

impl FuturesTrader {
    pub fn new(
        exchange: Arc<dyn FuturesExchange>,
        retry: RetryPolicy,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            exchange,
            retry,
            audit,
        }
    }

    /// Checks server reachability and that the credentials can read the account.
    ///
    /// Never fails: problems are logged and reported as `false`.
    pub async fn test_connection(&self) -> bool {
        let result = async {
            let server_time = self
                .retry
                .execute(&ApiCall::new("GET", TIME), self.audit.as_ref(), || {
                    self.exchange.server_time()
                })
                .await?;
            info!(server_time, "Connected to Binance Futures");

            self.retry
                .execute(&ApiCall::new("GET", ACCOUNT), self.audit.as_ref(), || {
                    self.exchange.account()
                })
                .await?;
            Ok::<_, TradingError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!("Connection test successful");
                true
            }
            Err(e) => {
                error!("Connection test failed: {}", e);
                self.report("test_connection", e, None);
                false
            }
        }
    }

    /// Full account payload: wallet totals, assets and positions.
    pub async fn account_snapshot(&self) -> Result<Value, TradingError> {
        self.retry
            .execute(&ApiCall::new("GET", ACCOUNT), self.audit.as_ref(), || {
                self.exchange.account()
            })
            .await
            .map_err(|e| self.report("account_snapshot", e, None))
    }

    /// Per-asset balances, as the exchange returns them.
    pub async fn get_account_balance(&self) -> Result<Value, TradingError> {
        let balances = self
            .retry
            .execute(&ApiCall::new("GET", BALANCE), self.audit.as_ref(), || {
                self.exchange.balances()
            })
            .await
            .map_err(|e| self.report("get_account_balance", e, None))?;
        info!("Account balance retrieved successfully");
        Ok(balances)
    }

    pub async fn place_market_order(
        &self,
        symbol: &str,
        side: &str,
        quantity: f64,
    ) -> Result<Value, TradingError> {
        let order = build_order(symbol, side, "MARKET", quantity, None, None).map_err(|e| {
            self.report(
                "place_market_order",
                e,
                Some(json!({"symbol": symbol, "side": side, "quantity": quantity})),
            )
        })?;
        self.submit("place_market_order", order).await
    }

    pub async fn place_limit_order(
        &self,
        symbol: &str,
        side: &str,
        quantity: f64,
        price: f64,
    ) -> Result<Value, TradingError> {
        let order =
            build_order(symbol, side, "LIMIT", quantity, Some(price), None).map_err(|e| {
                self.report(
                    "place_limit_order",
                    e,
                    Some(json!({
                        "symbol": symbol,
                        "side": side,
                        "quantity": quantity,
                        "price": price,
                    })),
                )
            })?;
        self.submit("place_limit_order", order).await
    }

    /// Any supported order type, from raw user input.
    ///
    /// `price` and `stop_price` must be present exactly when the order type
    /// uses them.
    pub async fn place_order(
        &self,
        symbol: &str,
        side: &str,
        order_type: &str,
        quantity: f64,
        price: Option<f64>,
        stop_price: Option<f64>,
    ) -> Result<Value, TradingError> {
        let order =
            build_order(symbol, side, order_type, quantity, price, stop_price).map_err(|e| {
                self.report(
                    "place_order",
                    e,
                    Some(json!({
                        "symbol": symbol,
                        "side": side,
                        "order_type": order_type,
                        "quantity": quantity,
                        "price": price,
                        "stop_price": stop_price,
                    })),
                )
            })?;
        self.submit("place_order", order).await
    }

    async fn submit(&self, operation: &str, order: OrderRequest) -> Result<Value, TradingError> {
        let params = order_params(&order);
        let call = ApiCall::new("POST", ORDER).with_params(params.clone());

        let response = match self
            .retry
            .execute(&call, self.audit.as_ref(), || {
                self.exchange.create_order(&order)
            })
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let e = self.balance_details(e, &order).await;
                return Err(self.report(operation, e, Some(params)));
            }
        };

        let order_id = response.get("orderId").and_then(Value::as_u64);
        self.audit.record(&AuditEntry::TradeExecuted(TradeRecord {
            symbol: order.symbol.clone(),
            side: order.side,
            order_type: order.order_type,
            quantity: order.quantity,
            price: order.price,
            order_id,
        }));
        match order_id {
            Some(id) => info!("{} order placed successfully: Order ID {}", order.order_type, id),
            None => info!("{} order placed successfully", order.order_type),
        }

        Ok(response)
    }

    /// Fills in the order notional and the free balance of its quote asset.
    ///
    /// The balance lookup is a single unretried call; when it fails the
    /// amount stays unknown.
    async fn balance_details(&self, err: TradingError, order: &OrderRequest) -> TradingError {
        if err.kind() != ErrorKind::InsufficientBalance {
            return err;
        }
        let required = order.price.map(|price| price * order.quantity);
        let available = match self.exchange.balances().await {
            Ok(balances) => available_for(&balances, &order.symbol),
            Err(e) => {
                debug!("Balance lookup after rejected order failed: {}", e);
                None
            }
        };
        err.with_balance(required, available)
    }

    /// Cancels one open order.
    ///
    /// An `OrderRejected` failure carries the order id it was about.
    pub async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<Value, TradingError> {
        let context = json!({"symbol": symbol, "order_id": order_id});
        let symbol = validate_symbol(symbol)
            .and_then(|symbol| {
                if order_id == 0 {
                    Err(TradingError::invalid_field(
                        "order_id",
                        order_id,
                        "Symbol and order_id are required",
                    ))
                } else {
                    Ok(symbol)
                }
            })
            .map_err(|e| self.report("cancel_order", e, Some(context.clone())))?;

        let call = ApiCall::new("DELETE", ORDER)
            .with_params(json!({"symbol": symbol, "orderId": order_id}));
        let response = self
            .retry
            .execute(&call, self.audit.as_ref(), || {
                self.exchange.cancel_order(&symbol, order_id)
            })
            .await
            .map_err(|e| {
                let e = match e {
                    TradingError::OrderRejected { message, code, .. } => {
                        TradingError::OrderRejected {
                            message,
                            code,
                            order_id: Some(order_id),
                        }
                    }
                    other => other,
                };
                self.report("cancel_order", e, Some(context))
            })?;

        info!("Order {} cancelled successfully", order_id);
        Ok(response)
    }

    /// Open orders for `symbol`, or for every symbol when `None`.
    pub async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Value, TradingError> {
        let symbol = symbol
            .map(validate_symbol)
            .transpose()
            .map_err(|e| self.report("get_open_orders", e, None))?;

        let mut call = ApiCall::new("GET", OPEN_ORDERS);
        if let Some(symbol) = &symbol {
            call = call.with_params(json!({"symbol": symbol}));
        }

        let orders = self
            .retry
            .execute(&call, self.audit.as_ref(), || {
                self.exchange.open_orders(symbol.as_deref())
            })
            .await
            .map_err(|e| self.report("get_open_orders", e, call.params.clone()))?;

        let count = orders.as_array().map(Vec::len).unwrap_or_default();
        info!("Retrieved {} open orders", count);
        Ok(orders)
    }

    /// Trading rules of one symbol, taken from the exchange info listing.
    pub async fn get_symbol_info(&self, symbol: &str) -> Result<Value, TradingError> {
        let symbol = validate_symbol(symbol)
            .map_err(|e| self.report("get_symbol_info", e, None))?;

        let info = self
            .retry
            .execute(
                &ApiCall::new("GET", EXCHANGE_INFO),
                self.audit.as_ref(),
                || self.exchange.exchange_info(),
            )
            .await
            .map_err(|e| self.report("get_symbol_info", e, None))?;

        find_symbol(&info, &symbol)
            .cloned()
            .ok_or_else(|| {
                TradingError::invalid_field(
                    "symbol",
                    &symbol,
                    format!("Symbol {} not found", symbol),
                )
            })
            .map_err(|e| self.report("get_symbol_info", e, None))
    }

    /// Latest traded price of `symbol`.
    pub async fn get_current_price(&self, symbol: &str) -> Result<f64, TradingError> {
        let symbol = validate_symbol(symbol)
            .map_err(|e| self.report("get_current_price", e, None))?;

        let call = ApiCall::new("GET", TICKER_PRICE).with_params(json!({"symbol": symbol}));
        let ticker = self
            .retry
            .execute(&call, self.audit.as_ref(), || {
                self.exchange.symbol_price(&symbol)
            })
            .await
            .map_err(|e| self.report("get_current_price", e, None))?;

        ticker
            .price
            .parse::<f64>()
            .map_err(|_| TradingError::Unclassified {
                message: format!("Unparseable price for {}: {}", symbol, ticker.price),
                code: None,
            })
            .map_err(|e| self.report("get_current_price", e, None))
    }

    /// Writes the failure to the audit sink and hands it back unchanged.
    fn report(&self, operation: &str, err: TradingError, context: Option<Value>) -> TradingError {
        self.audit.record(&AuditEntry::Error {
            operation: operation.to_string(),
            kind: err.kind(),
            code: err.code(),
            message: err.message().to_string(),
            context,
        });
        err
    }
}

fn order_params(order: &OrderRequest) -> Value {
    json!({
        "symbol": order.symbol,
        "side": order.side.as_str(),
        "type": order.order_type.as_str(),
        "quantity": order.quantity,
        "price": order.price,
        "stopPrice": order.stop_price,
        "timeInForce": order.time_in_force.map(|t| t.as_str()),
    })
}

/// `availableBalance` of the asset `symbol` is quoted in.
fn available_for(balances: &Value, symbol: &str) -> Option<f64> {
    balances
        .as_array()?
        .iter()
        .filter(|b| {
            b.get("asset")
                .and_then(Value::as_str)
                .is_some_and(|asset| !asset.is_empty() && symbol.ends_with(asset))
        })
        .find_map(|b| b.get("availableBalance")?.as_str()?.parse().ok())
}

fn find_symbol<'a>(info: &'a Value, symbol: &str) -> Option<&'a Value> {
    info.get("symbols")?
        .as_array()?
        .iter()
        .find(|s| s.get("symbol").and_then(Value::as_str) == Some(symbol))
}
