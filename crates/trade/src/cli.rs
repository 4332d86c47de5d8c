//! Console rendering for the `trade` binary.

use serde_json::Value;

use trade::{ErrorKind, TradingError};

const RULE: &str = "==================================================";

/// Renders a JSON scalar the way the exchange sent it, without quotes.
fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn first<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| value.get(*k).filter(|v| !v.is_null()))
}

pub fn format_order(order: &Value) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "ORDER EXECUTED SUCCESSFULLY".to_string(),
        RULE.to_string(),
        format!("Order ID     : {}", text(order.get("orderId"))),
        format!("Symbol       : {}", text(order.get("symbol"))),
        format!("Side         : {}", text(order.get("side"))),
        format!("Type         : {}", text(order.get("type"))),
        format!(
            "Quantity     : {}",
            text(first(order, &["origQty", "quantity"]))
        ),
    ];

    let price = text(order.get("price"));
    if !price.is_empty() && price.parse::<f64>().map(|p| p != 0.0).unwrap_or(true) {
        lines.push(format!("Price        : {}", price));
    }
    lines.push(format!("Status       : {}", text(order.get("status"))));
    lines.push(format!(
        "Time         : {}",
        text(first(order, &["updateTime", "transactTime"]))
    ));
    lines.push(RULE.to_string());
    lines.join("\n")
}

/// Non-zero balances only.
pub fn format_balances(balances: &Value) -> String {
    let mut lines = vec![RULE.to_string(), "ACCOUNT BALANCE".to_string(), RULE.to_string()];

    let active: Vec<(String, f64)> = balances
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|b| {
            let amount = text(b.get("balance")).parse::<f64>().ok()?;
            (amount > 0.0).then(|| (text(b.get("asset")), amount))
        })
        .collect();

    if active.is_empty() {
        lines.push("No balances found".to_string());
        return lines.join("\n");
    }

    for (asset, amount) in active {
        lines.push(format!("{:<10} : {:.8}", asset, amount));
    }
    lines.push(RULE.to_string());
    lines.join("\n")
}

pub fn format_open_orders(orders: &Value) -> String {
    let mut lines = vec![RULE.to_string(), "OPEN ORDERS".to_string(), RULE.to_string()];

    let orders = orders.as_array().cloned().unwrap_or_default();
    if orders.is_empty() {
        lines.push("No open orders found".to_string());
        return lines.join("\n");
    }

    lines.push(format!(
        "{:<12} {:<12} {:<4} {:<6} {:<12} {:<12} {}",
        "Order ID", "Symbol", "Side", "Type", "Quantity", "Price", "Status"
    ));
    lines.push("-".repeat(80));

    for order in &orders {
        let mut price = text(order.get("price"));
        if price.parse::<f64>().map(|p| p == 0.0).unwrap_or(price.is_empty()) {
            price = "MARKET".to_string();
        }
        lines.push(format!(
            "{:<12} {:<12} {:<4} {:<6} {:<12} {:<12} {}",
            text(order.get("orderId")),
            text(order.get("symbol")),
            text(order.get("side")),
            text(order.get("type")),
            text(order.get("origQty")),
            price,
            text(order.get("status")),
        ));
    }
    lines.push(RULE.to_string());
    lines.join("\n")
}

pub fn format_symbol_info(info: &Value) -> String {
    let mut lines = vec![
        RULE.to_string(),
        format!("SYMBOL {}", text(info.get("symbol"))),
        RULE.to_string(),
    ];
    for (label, key) in [
        ("Status", "status"),
        ("Base asset", "baseAsset"),
        ("Quote asset", "quoteAsset"),
        ("Price prec.", "pricePrecision"),
        ("Qty prec.", "quantityPrecision"),
    ] {
        if let Some(v) = info.get(key) {
            lines.push(format!("{:<12} : {}", label, text(Some(v))));
        }
    }
    lines.push(RULE.to_string());
    lines.join("\n")
}

/// One-line failure message, prefixed by what went wrong.
pub fn describe_error(action: &str, err: &TradingError) -> String {
    match err.kind() {
        ErrorKind::InvalidRequest => format!("Invalid Order: {}", err),
        ErrorKind::InsufficientBalance => {
            let mut out = format!("Insufficient Balance: {}", err);
            if let Some((required, available)) = err.balance() {
                if let Some(required) = required {
                    out.push_str(&format!(" (required {}", required));
                    out.push_str(&match available {
                        Some(available) => format!(", available {})", available),
                        None => ")".to_string(),
                    });
                } else if let Some(available) = available {
                    out.push_str(&format!(" (available {})", available));
                }
            }
            out
        }
        _ => format!("{}: {}", action, err),
    }
}
