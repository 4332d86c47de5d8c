use std::env;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::debug;

use interface::OrderRequest;

use super::{ExchangeError, FuturesExchange, TickerPrice};

pub mod account;
pub mod market;
pub mod orders;

pub const MAINNET_BASE_URL: &str = "https://fapi.binance.com";
pub const TESTNET_BASE_URL: &str = "https://testnet.binancefuture.com";
pub const DEFAULT_RECV_WINDOW: u64 = 5000;

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Binance USDⓈ-M Futures REST client.
#[derive(Clone)]
pub struct BinanceFuturesClient {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) api_secret: Option<String>,
    pub(crate) recv_window: u64,
}

impl BinanceFuturesClient {
    /// Public endpoints only (server time, exchange info, ticker)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: None,
            api_secret: None,
            recv_window: DEFAULT_RECV_WINDOW,
        }
    }

    pub fn with_keys(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_key: Some(api_key.into()),
            api_secret: Some(api_secret.into()),
            ..Self::new(base_url)
        }
    }

    /// Testnet client with `BINANCE_API_KEY` / `BINANCE_API_SECRET` from the environment.
    pub fn with_credentials() -> Result<Self, ExchangeError> {
        let (api_key, api_secret) = get_api_credentials()?;
        Ok(Self::with_keys(TESTNET_BASE_URL, api_key, api_secret))
    }

    pub fn with_recv_window(mut self, recv_window: u64) -> Self {
        self.recv_window = recv_window;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn send_public<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let query_string = build_query(params)?;
        let url = if query_string.is_empty() {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}{}?{}", self.base_url, endpoint, query_string)
        };
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        decode_response(response, false).await
    }

    /// Signed request; `timestamp`, `recvWindow` and `signature` are appended to `params`.
    pub(crate) async fn send_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, String)],
        order_endpoint: bool,
    ) -> Result<T, ExchangeError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ExchangeError::Other(
                "API key not set. Use BinanceFuturesClient::with_credentials()".to_string(),
            )
        })?;
        let api_secret = self.api_secret.as_ref().ok_or_else(|| {
            ExchangeError::Other(
                "API secret not set. Use BinanceFuturesClient::with_credentials()".to_string(),
            )
        })?;

        let mut query_string = build_query(params)?;
        if !query_string.is_empty() {
            query_string.push('&');
        }
        query_string.push_str(&format!(
            "timestamp={}&recvWindow={}",
            get_timestamp(),
            self.recv_window
        ));
        let signature = generate_signature(&query_string, api_secret);
        debug!("{} {} {}", method, endpoint, query_string);

        let url = format!(
            "{}{}?{}&signature={}",
            self.base_url, endpoint, query_string, signature
        );

        let response = self
            .http
            .request(method, &url)
            .header(API_KEY_HEADER, api_key.as_str())
            .send()
            .await?;

        decode_response(response, order_endpoint).await
    }
}

#[async_trait]
impl FuturesExchange for BinanceFuturesClient {
    async fn server_time(&self) -> Result<u64, ExchangeError> {
        self.fetch_server_time().await
    }

    async fn account(&self) -> Result<Value, ExchangeError> {
        self.fetch_account().await
    }

    async fn balances(&self) -> Result<Value, ExchangeError> {
        self.fetch_balances().await
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<Value, ExchangeError> {
        self.submit_order(order).await
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<Value, ExchangeError> {
        self.delete_order(symbol, order_id).await
    }

    async fn open_orders(&self, symbol: Option<&str>) -> Result<Value, ExchangeError> {
        self.fetch_open_orders(symbol).await
    }

    async fn exchange_info(&self) -> Result<Value, ExchangeError> {
        self.fetch_exchange_info().await
    }

    async fn symbol_price(&self, symbol: &str) -> Result<TickerPrice, ExchangeError> {
        self.fetch_symbol_price(symbol).await
    }
}

/// Error body of a rejected request: `{"code": -1121, "msg": "Invalid symbol."}`
#[derive(Debug, Deserialize)]
struct BinanceErrorBody {
    code: i64,
    msg: String,
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
    order_endpoint: bool,
) -> Result<T, ExchangeError> {
    let status = response.status();
    let retry_after = parse_retry_after(response.headers());
    let response_text = response.text().await?;

    if !status.is_success() {
        return Err(parse_error_body(
            status,
            &response_text,
            retry_after,
            order_endpoint,
        ));
    }

    serde_json::from_str(&response_text).map_err(|e| {
        ExchangeError::Other(format!(
            "Failed to parse Binance response: {}, response: {}",
            e,
            truncate(&response_text)
        ))
    })
}

/// Turns a non-2xx response into an [`ExchangeError`].
///
/// Bodies carrying a Binance error code become `Api`. Without a code, a bare
/// 429/418 is treated as `-1003` on every endpoint, and other order endpoint
/// failures report `Order`.
pub(crate) fn parse_error_body(
    status: StatusCode,
    body: &str,
    retry_after: Option<Duration>,
    order_endpoint: bool,
) -> ExchangeError {
    if let Ok(err) = serde_json::from_str::<BinanceErrorBody>(body) {
        return ExchangeError::Api {
            code: err.code,
            message: err.msg,
            retry_after,
        };
    }

    if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
        return ExchangeError::Api {
            code: -1003,
            message: "Too many requests".to_string(),
            retry_after,
        };
    }

    if order_endpoint {
        return ExchangeError::Order(format!("status {}, response: {}", status, truncate(body)));
    }

    ExchangeError::Other(format!(
        "Binance API HTTP error: status {}, response: {}",
        status,
        truncate(body)
    ))
}

/// `Retry-After` in whole seconds; HTTP-date values are ignored.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn truncate(text: &str) -> String {
    text.chars().take(200).collect()
}

/// Form-encoded `key=value` pairs joined with `&`, in the given order.
///
/// The signature is computed over exactly this string, so values are encoded
/// here rather than by the HTTP client.
pub fn build_query(params: &[(&str, String)]) -> Result<String, ExchangeError> {
    serde_urlencoded::to_string(params)
        .map_err(|e| ExchangeError::Other(format!("Failed to encode query: {}", e)))
}

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of the query string, hex encoded
pub fn generate_signature(query_string: &str, api_secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(api_secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(query_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Milliseconds since the unix epoch
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

pub fn get_api_credentials() -> Result<(String, String), ExchangeError> {
    let api_key = env::var("BINANCE_API_KEY")
        .map_err(|e| ExchangeError::Other(format!("BINANCE_API_KEY not found: {}", e)))?;
    let api_secret = env::var("BINANCE_API_SECRET")
        .map_err(|e| ExchangeError::Other(format!("BINANCE_API_SECRET not found: {}", e)))?;
    Ok((api_key, api_secret))
}

pub fn has_api_credentials() -> bool {
    env::var("BINANCE_API_KEY").is_ok() && env::var("BINANCE_API_SECRET").is_ok()
}
