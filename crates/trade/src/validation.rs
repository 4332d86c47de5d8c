use interface::{OrderRequest, OrderSide, OrderType, TimeInForce, TradingError};

/// Trimmed, uppercased symbol. Only ASCII letters and digits are accepted.
pub fn validate_symbol(symbol: &str) -> Result<String, TradingError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(TradingError::invalid_field(
            "symbol",
            trimmed,
            "Symbol must be a non-empty string",
        ));
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(TradingError::invalid_field(
            "symbol",
            symbol,
            "Symbol may only contain letters and digits",
        ));
    }
    Ok(trimmed.to_ascii_uppercase())
}

pub fn parse_side(side: &str) -> Result<OrderSide, TradingError> {
    side.parse::<OrderSide>()
        .map_err(|_| TradingError::invalid_field("side", side, "Side must be 'BUY' or 'SELL'"))
}

pub fn parse_order_type(order_type: &str) -> Result<OrderType, TradingError> {
    order_type.parse::<OrderType>().map_err(|_| {
        let valid: Vec<&str> = OrderType::ALL.iter().map(|t| t.as_str()).collect();
        TradingError::invalid_field(
            "order_type",
            order_type,
            format!("Order type must be one of {:?}", valid),
        )
    })
}

fn validate_positive(field: &str, value: f64, what: &str) -> Result<f64, TradingError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TradingError::invalid_field(
            field,
            value,
            format!("{} must be a positive number", what),
        ));
    }
    Ok(value)
}

pub fn validate_quantity(quantity: f64) -> Result<f64, TradingError> {
    validate_positive("quantity", quantity, "Quantity")
}

pub fn validate_price(price: f64) -> Result<f64, TradingError> {
    validate_positive("price", price, "Price")
}

/// Builds a submit-ready order from raw user input.
///
/// Price-carrying types must have a price and are sent GTC; conditional types
/// must have a stop price. A price on a type that does not use one is
/// rejected rather than silently dropped.
pub fn build_order(
    symbol: &str,
    side: &str,
    order_type: &str,
    quantity: f64,
    price: Option<f64>,
    stop_price: Option<f64>,
) -> Result<OrderRequest, TradingError> {
    let symbol = validate_symbol(symbol)?;
    let side = parse_side(side)?;
    let order_type = parse_order_type(order_type)?;
    let quantity = validate_quantity(quantity)?;

    let price = match (order_type.requires_price(), price) {
        (true, Some(p)) => Some(validate_price(p)?),
        (true, None) => {
            return Err(TradingError::InvalidRequest {
                message: format!("Price is required for {} orders", order_type),
                code: None,
                field: Some("price".to_string()),
                value: None,
            })
        }
        (false, Some(p)) => {
            return Err(TradingError::invalid_field(
                "price",
                p,
                format!("Price is not accepted for {} orders", order_type),
            ))
        }
        (false, None) => None,
    };

    let stop_price = match (order_type.requires_stop_price(), stop_price) {
        (true, Some(p)) => Some(validate_positive("stop_price", p, "Stop price")?),
        (true, None) => {
            return Err(TradingError::InvalidRequest {
                message: format!("Stop price is required for {} orders", order_type),
                code: None,
                field: Some("stop_price".to_string()),
                value: None,
            })
        }
        (false, Some(p)) => {
            return Err(TradingError::invalid_field(
                "stop_price",
                p,
                format!("Stop price is not accepted for {} orders", order_type),
            ))
        }
        (false, None) => None,
    };

    let time_in_force = order_type.requires_price().then_some(TimeInForce::Gtc);

    Ok(OrderRequest {
        symbol,
        side,
        order_type,
        quantity,
        price,
        stop_price,
        time_in_force,
    })
}
