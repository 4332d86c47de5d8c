//! Binance error code → [`ErrorKind`] lookup.
//!
//! The table is the single source of truth for retry eligibility: the retry
//! wrapper only ever looks at the kind produced here.

use std::collections::HashMap;
use std::sync::LazyLock;

use interface::{ErrorKind, ExchangeError, TradingError};

use ErrorKind::*;

/// Every exchange code the client knows about, with its default message.
pub const ERROR_TABLE: &[(i64, ErrorKind, &str)] = &[
    // server / connectivity
    (-1000, Unclassified, "Unknown error occurred"),
    (-1001, ConnectionFailure, "Internal error; unable to process request"),
    (-1002, ConnectionFailure, "Unauthorized request"),
    (-1003, RateLimited, "Too many requests"),
    (-1006, Unclassified, "Unexpected response received"),
    (-1007, ConnectionFailure, "Request timeout"),
    (-1008, RateLimited, "Server overloaded"),
    (-1014, Unclassified, "Unsupported order combination"),
    (-1015, RateLimited, "Too many orders"),
    (-1016, ConnectionFailure, "Service shutting down"),
    (-1020, Unclassified, "Unsupported operation"),
    (-1021, ConnectionFailure, "Timestamp outside recv window"),
    (-1022, ConnectionFailure, "Invalid signature"),
    // request parameters
    (-1100, InvalidRequest, "Illegal characters found in parameter"),
    (-1101, InvalidRequest, "Too many parameters sent"),
    (-1102, InvalidRequest, "Mandatory parameter was not sent"),
    (-1103, InvalidRequest, "Unknown parameter was sent"),
    (-1104, InvalidRequest, "Not all parameters were read"),
    (-1105, InvalidRequest, "Parameter was empty"),
    (-1106, InvalidRequest, "Parameter was not required"),
    (-1111, InvalidRequest, "Precision is over the maximum defined"),
    (-1112, OrderRejected, "No orders on book for symbol"),
    (-1114, InvalidRequest, "TimeInForce parameter sent when not required"),
    (-1115, InvalidRequest, "Invalid timeInForce"),
    (-1116, InvalidRequest, "Invalid orderType"),
    (-1117, InvalidRequest, "Invalid side"),
    (-1118, InvalidRequest, "New client order ID was empty"),
    (-1119, InvalidRequest, "Original client order ID was empty"),
    (-1120, InvalidRequest, "Invalid interval"),
    (-1121, InvalidRequest, "Invalid symbol"),
    (-1125, ConnectionFailure, "Invalid listen key"),
    (-1127, InvalidRequest, "Lookup interval is too big"),
    (-1128, InvalidRequest, "Combination of optional parameters invalid"),
    (-1130, InvalidRequest, "Invalid data sent for parameter"),
    (-1131, InvalidRequest, "recvWindow must be less than 60000"),
    // orders and account
    (-2010, InsufficientBalance, "Account has insufficient balance"),
    (-2011, OrderRejected, "Unknown order sent"),
    (-2013, OrderRejected, "Order does not exist"),
    (-2014, ConnectionFailure, "API-key format invalid"),
    (-2015, ConnectionFailure, "Invalid API-key, IP, or permissions"),
    (-2016, Unclassified, "No trading window could be found"),
    (-2018, InsufficientBalance, "Balance is insufficient"),
    (-2019, InsufficientBalance, "Margin is insufficient"),
    (-2020, OrderRejected, "Unable to fill"),
    (-2021, OrderRejected, "Order would immediately trigger"),
    (-2022, InvalidRequest, "ReduceOnly order is rejected"),
];

static INDEX: LazyLock<HashMap<i64, (ErrorKind, &'static str)>> = LazyLock::new(|| {
    ERROR_TABLE
        .iter()
        .map(|&(code, kind, message)| (code, (kind, message)))
        .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kind and default message for an exchange error code.
///
/// Unknown codes are `Unclassified` and keep the raw code in the message.
pub fn classify(code: i64) -> Classification {
    match INDEX.get(&code) {
        Some(&(kind, message)) => Classification {
            kind,
            message: message.to_string(),
        },
        None => Classification {
            kind: Unclassified,
            message: format!("Binance API error {}", code),
        },
    }
}

/// Classifies a raw exchange failure.
///
/// Order submission failures without a code become `OrderPlacement`;
/// transport and decoding failures are treated as connectivity problems.
pub fn translate(err: ExchangeError) -> TradingError {
    match err {
        ExchangeError::Api {
            code,
            message,
            retry_after,
        } => {
            let classification = classify(code);
            let message = if message.trim().is_empty() {
                classification.message
            } else {
                message
            };
            from_kind(classification.kind, message, Some(code), retry_after)
        }
        ExchangeError::Order(message) => TradingError::OrderPlacement {
            message: format!("Order failed: {}", message),
        },
        ExchangeError::Http(e) => TradingError::ConnectionFailure {
            message: e.to_string(),
            code: None,
        },
        ExchangeError::Other(message) => TradingError::ConnectionFailure {
            message,
            code: None,
        },
    }
}

fn from_kind(
    kind: ErrorKind,
    message: String,
    code: Option<i64>,
    retry_after: Option<std::time::Duration>,
) -> TradingError {
    match kind {
        ConnectionFailure => TradingError::ConnectionFailure { message, code },
        RateLimited => TradingError::RateLimited {
            message,
            code,
            retry_after,
        },
        InvalidRequest => TradingError::InvalidRequest {
            message,
            code,
            field: None,
            value: None,
        },
        InsufficientBalance => TradingError::InsufficientBalance {
            message,
            code,
            required: None,
            available: None,
        },
        OrderRejected => TradingError::OrderRejected {
            message,
            code,
            order_id: None,
        },
        OrderPlacementFailure => TradingError::OrderPlacement { message },
        Unclassified => TradingError::Unclassified { message, code },
    }
}
