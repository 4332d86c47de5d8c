pub mod audit;
pub mod classifier;
pub mod config;
pub mod logger;
pub mod retry;
pub mod trader;
pub mod validation;

#[cfg(test)]
mod testing;

pub use audit::{AuditEntry, AuditSink, MemoryAuditSink, TracingAuditSink, TradeRecord};
pub use classifier::{classify, translate, Classification};
pub use config::{ConfigError, TradeConfig};
pub use interface::{ErrorKind, TradingError};
pub use retry::{ApiCall, RetryPolicy};
pub use trader::FuturesTrader;

use std::sync::Once;

static INIT: Once = Once::new();

/// Loads `.env` into the process environment, once.
fn init() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
    });
}

#[ctor::ctor]
fn setup() {
    init();
}
