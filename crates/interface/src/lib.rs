mod error;
mod order;

pub use error::{ErrorKind, ExchangeError, TradingError};
pub use order::{OrderRequest, OrderSide, OrderType, TimeInForce, UnknownVariant};
