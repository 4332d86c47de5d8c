use std::sync::Arc;

use color_eyre::eyre;
use serde_json::Value;
use structopt::StructOpt;
use tracing::info;

mod cli;

use exchanges::BinanceFuturesClient;
use trade::{logger, FuturesTrader, TradeConfig, TracingAuditSink};

// .env is loaded by the library on startup

#[derive(Debug, StructOpt)]
#[structopt(name = "trade", about = "Binance USDⓈ-M Futures trading client")]
struct Opt {
    /// Talk to mainnet instead of the testnet
    #[structopt(long)]
    mainnet: bool,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Place an order
    Order {
        #[structopt(long)]
        symbol: String,
        /// BUY or SELL
        #[structopt(long)]
        side: String,
        /// MARKET, LIMIT, STOP, TAKE_PROFIT, STOP_MARKET or TAKE_PROFIT_MARKET
        #[structopt(long = "type", default_value = "MARKET")]
        order_type: String,
        #[structopt(long)]
        quantity: f64,
        /// Required for LIMIT, STOP and TAKE_PROFIT
        #[structopt(long)]
        price: Option<f64>,
        /// Required for the conditional order types
        #[structopt(long)]
        stop_price: Option<f64>,
    },
    /// Show non-zero asset balances
    Balance,
    /// List open orders
    Orders {
        #[structopt(long)]
        symbol: Option<String>,
    },
    /// Cancel an open order
    Cancel {
        #[structopt(long)]
        symbol: String,
        #[structopt(long)]
        order_id: u64,
    },
    /// Show the latest price of a symbol
    Price {
        #[structopt(long)]
        symbol: String,
    },
    /// Show the trading rules of a symbol
    Info {
        #[structopt(long)]
        symbol: String,
    },
    /// Check connectivity and credentials
    Test,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let guards = logger::init_tracing()?;

    let opt = Opt::from_args();
    let mut config = TradeConfig::from_env()?;
    if opt.mainnet {
        config.testnet = false;
    }

    let ok = run(opt.cmd, config).await;

    // flush the log writers before exiting
    drop(guards);
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cmd: Command, config: TradeConfig) -> bool {
    let environment = if config.testnet { "Testnet" } else { "Mainnet" };
    info!(base_url = config.base_url(), "Binance Futures trading client starting");

    let client = BinanceFuturesClient::with_keys(
        config.base_url(),
        config.api_key.as_str(),
        config.api_secret.as_str(),
    )
    .with_recv_window(config.recv_window);
    let trader = FuturesTrader::new(
        Arc::new(client),
        config.retry.clone(),
        Arc::new(TracingAuditSink),
    );

    println!("Binance Futures Trading Client");
    println!("Initializing connection...");
    if !trader.test_connection().await {
        println!("Failed to connect to Binance {}", environment);
        return false;
    }
    println!("Connected to Binance {} successfully", environment);

    match cmd {
        Command::Order {
            symbol,
            side,
            order_type,
            quantity,
            price,
            stop_price,
        } => {
            let result = match (order_type.trim().to_uppercase().as_str(), price) {
                ("MARKET", None) => trader.place_market_order(&symbol, &side, quantity).await,
                ("LIMIT", Some(price)) => {
                    trader
                        .place_limit_order(&symbol, &side, quantity, price)
                        .await
                }
                _ => {
                    trader
                        .place_order(&symbol, &side, &order_type, quantity, price, stop_price)
                        .await
                }
            };
            report(result.map(|order| cli::format_order(&order)), "Order Failed")
        }
        Command::Balance => report(
            trader
                .get_account_balance()
                .await
                .map(|b| cli::format_balances(&b)),
            "Failed to get balance",
        ),
        Command::Orders { symbol } => report(
            trader
                .get_open_orders(symbol.as_deref())
                .await
                .map(|o| cli::format_open_orders(&o)),
            "Failed to get orders",
        ),
        Command::Cancel { symbol, order_id } => report(
            trader
                .cancel_order(&symbol, order_id)
                .await
                .map(|_| format!("Order {} cancelled successfully", order_id)),
            "Failed to cancel order",
        ),
        Command::Price { symbol } => report(
            trader
                .get_current_price(&symbol)
                .await
                .map(|p| format!("Current Price for {}: {}", symbol.to_uppercase(), p)),
            "Failed to get price",
        ),
        Command::Info { symbol } => report(
            trader
                .get_symbol_info(&symbol)
                .await
                .map(|i| cli::format_symbol_info(&i)),
            "Failed to get symbol info",
        ),
        Command::Test => report(
            trader.get_account_balance().await.map(|balances| {
                let usdt = balances
                    .as_array()
                    .into_iter()
                    .flatten()
                    .find(|b| b.get("asset").and_then(Value::as_str) == Some("USDT"))
                    .and_then(|b| b.get("balance").and_then(Value::as_str))
                    .and_then(|b| b.parse::<f64>().ok());
                let mut out = vec!["Account Status: Active".to_string()];
                if let Some(usdt) = usdt {
                    out.push(format!("USDT Balance: {:.2}", usdt));
                }
                out.push(format!("Environment: {}", environment));
                out.join("\n")
            }),
            "Connection error",
        ),
    }
}

fn report(result: Result<String, trade::TradingError>, action: &str) -> bool {
    match result {
        Ok(out) => {
            println!("{}", out);
            true
        }
        Err(e) => {
            println!("{}", cli::describe_error(action, &e));
            false
        }
    }
}
