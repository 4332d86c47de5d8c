use reqwest::Method;
use serde_json::Value;

use interface::OrderRequest;

use super::super::ExchangeError;
use super::BinanceFuturesClient;

const ORDER_ENDPOINT: &str = "/fapi/v1/order";
const OPEN_ORDERS_ENDPOINT: &str = "/fapi/v1/openOrders";

/// Query parameters for POST /fapi/v1/order, without the signing suffix.
pub fn order_params(order: &OrderRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("symbol", order.symbol.clone()),
        ("side", order.side.as_str().to_string()),
        ("type", order.order_type.as_str().to_string()),
    ];
    if let Some(tif) = order.time_in_force {
        params.push(("timeInForce", tif.as_str().to_string()));
    }
    params.push(("quantity", order.quantity.to_string()));
    if let Some(price) = order.price {
        params.push(("price", price.to_string()));
    }
    if let Some(stop_price) = order.stop_price {
        params.push(("stopPrice", stop_price.to_string()));
    }
    params
}

impl BinanceFuturesClient {
    /// POST /fapi/v1/order
    pub async fn submit_order(&self, order: &OrderRequest) -> Result<Value, ExchangeError> {
        let params = order_params(order);
        self.send_signed(Method::POST, ORDER_ENDPOINT, &params, true)
            .await
    }

    /// DELETE /fapi/v1/order
    pub async fn delete_order(&self, symbol: &str, order_id: u64) -> Result<Value, ExchangeError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        self.send_signed(Method::DELETE, ORDER_ENDPOINT, &params, false)
            .await
    }

    /// GET /fapi/v1/openOrders
    pub async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Value, ExchangeError> {
        let params: Vec<(&str, String)> = symbol
            .map(|s| vec![("symbol", s.to_string())])
            .unwrap_or_default();
        self.send_signed(Method::GET, OPEN_ORDERS_ENDPOINT, &params, false)
            .await
    }
}
