use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use interface::{ErrorKind, OrderSide, OrderType, TradingError};

/// A successfully submitted order.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: Option<f64>,
    pub order_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuditEntry {
    /// One attempt is about to hit the exchange.
    ApiRequest {
        method: &'static str,
        endpoint: &'static str,
        params: Option<Value>,
        attempt: u32,
    },
    /// Outcome of one attempt; `error` is `None` on success.
    ApiResponse {
        endpoint: &'static str,
        attempt: u32,
        error: Option<TradingError>,
    },
    RetryScheduled {
        endpoint: &'static str,
        attempt: u32,
        delay: Duration,
    },
    TradeExecuted(TradeRecord),
    Error {
        operation: String,
        kind: ErrorKind,
        code: Option<i64>,
        message: String,
        context: Option<Value>,
    },
}

/// Append-only destination for audit entries.
///
/// `record` cannot fail: a sink that loses an entry must not abort the
/// operation that produced it.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Writes entries as structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: &AuditEntry) {
        match entry {
            AuditEntry::ApiRequest {
                method,
                endpoint,
                params,
                attempt,
            } => {
                debug!(%method, %endpoint, ?params, attempt, "API request");
            }
            AuditEntry::ApiResponse {
                endpoint,
                attempt,
                error: None,
            } => {
                debug!(%endpoint, attempt, "API response ok");
            }
            AuditEntry::ApiResponse {
                endpoint,
                attempt,
                error: Some(err),
            } => {
                warn!(%endpoint, attempt, kind = %err.kind(), code = ?err.code(), "API response failed: {}", err.message());
            }
            AuditEntry::RetryScheduled {
                endpoint,
                attempt,
                delay,
            } => {
                info!(%endpoint, attempt, delay_ms = delay.as_millis() as u64, "Retrying in {:?}", delay);
            }
            AuditEntry::TradeExecuted(trade) => {
                let price_info = trade
                    .price
                    .map(|p| format!(" @ {}", p))
                    .unwrap_or_default();
                info!(
                    symbol = %trade.symbol,
                    side = %trade.side,
                    order_type = %trade.order_type,
                    quantity = trade.quantity,
                    price = ?trade.price,
                    order_id = ?trade.order_id,
                    "TRADE: {} {} {} {}{}",
                    trade.side,
                    trade.quantity,
                    trade.symbol,
                    trade.order_type,
                    price_info
                );
            }
            AuditEntry::Error {
                operation,
                kind,
                code,
                message,
                context,
            } => {
                error!(%operation, %kind, ?code, ?context, "ERROR: {}", message);
            }
        }
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn trades(&self) -> Vec<TradeRecord> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                AuditEntry::TradeExecuted(trade) => Some(trade),
                _ => None,
            })
            .collect()
    }

    /// Delays of every scheduled retry, in order.
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                AuditEntry::RetryScheduled { delay, .. } => Some(delay),
                _ => None,
            })
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.entries()
            .iter()
            .filter(|e| matches!(e, AuditEntry::ApiRequest { .. }))
            .count()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: &AuditEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry.clone()),
            Err(poisoned) => poisoned.into_inner().push(entry.clone()),
        }
    }
}
