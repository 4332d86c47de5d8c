use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A string that does not name any variant of an order enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl FromStr for OrderSide {
    type Err = UnknownVariant;

    /// Case-insensitive: "buy", "Buy" and "BUY" all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            _ => Err(UnknownVariant {
                kind: "side",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Futures order types accepted by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    TakeProfit,
    StopMarket,
    TakeProfitMarket,
}

impl OrderType {
    pub const ALL: [OrderType; 6] = [
        OrderType::Market,
        OrderType::Limit,
        OrderType::Stop,
        OrderType::TakeProfit,
        OrderType::StopMarket,
        OrderType::TakeProfitMarket,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::Stop => "STOP",
            OrderType::TakeProfit => "TAKE_PROFIT",
            OrderType::StopMarket => "STOP_MARKET",
            OrderType::TakeProfitMarket => "TAKE_PROFIT_MARKET",
        }
    }

    /// Types that rest on the book at a limit price.
    pub fn requires_price(&self) -> bool {
        matches!(self, OrderType::Limit | OrderType::Stop | OrderType::TakeProfit)
    }

    /// Conditional types that trigger at a stop price.
    pub fn requires_stop_price(&self) -> bool {
        matches!(
            self,
            OrderType::Stop
                | OrderType::TakeProfit
                | OrderType::StopMarket
                | OrderType::TakeProfitMarket
        )
    }
}

impl FromStr for OrderType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        OrderType::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| UnknownVariant {
                kind: "order type",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeInForce {
    /// Good till cancelled
    Gtc,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
        }
    }
}

/// A validated order, ready to be submitted.
///
/// `symbol` is already uppercased, `price` is present whenever the type rests
/// on the book and `stop_price` whenever the type is conditional.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: Option<f64>,
    pub stop_price: Option<f64>,
    pub time_in_force: Option<TimeInForce>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parse_is_case_insensitive() {
        assert_eq!("buy".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!(" Sell ".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        let err = "hold".parse::<OrderSide>().unwrap_err();
        assert_eq!(err.kind, "side");
        assert_eq!(err.value, "hold");
    }

    #[test]
    fn test_order_type_parse() {
        assert_eq!("limit".parse::<OrderType>().unwrap(), OrderType::Limit);
        assert_eq!(
            "take_profit_market".parse::<OrderType>().unwrap(),
            OrderType::TakeProfitMarket
        );
        assert!("iceberg".parse::<OrderType>().is_err());
    }

    #[test]
    fn test_price_requirements() {
        assert!(OrderType::Limit.requires_price());
        assert!(!OrderType::Limit.requires_stop_price());
        assert!(!OrderType::Market.requires_price());
        assert!(!OrderType::StopMarket.requires_price());
        assert!(OrderType::StopMarket.requires_stop_price());
        assert!(OrderType::Stop.requires_price() && OrderType::Stop.requires_stop_price());
    }
}
