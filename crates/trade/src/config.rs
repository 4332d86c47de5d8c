use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use exchanges::binance::{DEFAULT_RECV_WINDOW, MAINNET_BASE_URL, TESTNET_BASE_URL};

use crate::retry::{
    RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_RETRIES,
};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set (environment or .env)")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from the environment.
///
/// `.env` is loaded when the library is first initialized, so its values show
/// up here like any other variable.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeConfig {
    pub api_key: String,
    pub api_secret: String,
    pub testnet: bool,
    /// Overrides the testnet/mainnet endpoint when set.
    pub base_url: Option<String>,
    pub recv_window: u64,
    pub retry: RetryPolicy,
}

impl TradeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("BINANCE_API_KEY").ok_or(ConfigError::Missing("BINANCE_API_KEY"))?;
        let api_secret =
            get("BINANCE_API_SECRET").ok_or(ConfigError::Missing("BINANCE_API_SECRET"))?;

        let testnet = match get("BINANCE_TESTNET") {
            Some(v) => parse_bool("BINANCE_TESTNET", &v)?,
            None => true,
        };

        let retry = RetryPolicy::new(
            parse_or("TRADE_MAX_RETRIES", get("TRADE_MAX_RETRIES"), DEFAULT_MAX_RETRIES)?,
            match get("TRADE_RETRY_DELAY_MS") {
                Some(v) => Duration::from_millis(parse("TRADE_RETRY_DELAY_MS", &v)?),
                None => DEFAULT_INITIAL_DELAY,
            },
            parse_or(
                "TRADE_RETRY_BACKOFF",
                get("TRADE_RETRY_BACKOFF"),
                DEFAULT_BACKOFF_MULTIPLIER,
            )?,
        );
        if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                name: "TRADE_RETRY_BACKOFF",
                value: retry.backoff_multiplier.to_string(),
            });
        }

        Ok(Self {
            api_key,
            api_secret,
            testnet,
            base_url: get("BINANCE_BASE_URL"),
            recv_window: parse_or(
                "BINANCE_RECV_WINDOW",
                get("BINANCE_RECV_WINDOW"),
                DEFAULT_RECV_WINDOW,
            )?,
            retry,
        })
    }

    /// Endpoint the client should talk to.
    pub fn base_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url,
            None if self.testnet => TESTNET_BASE_URL,
            None => MAINNET_BASE_URL,
        }
    }
}

fn parse<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn parse_or<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => parse(name, &v),
        None => Ok(default),
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    const KEYS: [(&str, &str); 2] = [("BINANCE_API_KEY", "key"), ("BINANCE_API_SECRET", "secret")];

    #[test]
    fn test_defaults() {
        let config = TradeConfig::from_lookup(lookup(&KEYS)).unwrap();
        assert!(config.testnet);
        assert_eq!(config.base_url(), TESTNET_BASE_URL);
        assert_eq!(config.recv_window, 5000);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_missing_credentials() {
        let err = TradeConfig::from_lookup(lookup(&[("BINANCE_API_KEY", "key")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("BINANCE_API_SECRET"));

        let err = TradeConfig::from_lookup(lookup(&[
            ("BINANCE_API_KEY", "  "),
            ("BINANCE_API_SECRET", "secret"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("BINANCE_API_KEY"));
    }

    #[test]
    fn test_overrides() {
        let mut vars = KEYS.to_vec();
        vars.extend([
            ("BINANCE_TESTNET", "false"),
            ("BINANCE_RECV_WINDOW", "10000"),
            ("TRADE_MAX_RETRIES", "5"),
            ("TRADE_RETRY_DELAY_MS", "250"),
            ("TRADE_RETRY_BACKOFF", "1.5"),
        ]);
        let config = TradeConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.base_url(), MAINNET_BASE_URL);
        assert_eq!(config.recv_window, 10000);
        assert_eq!(
            config.retry,
            RetryPolicy::new(5, Duration::from_millis(250), 1.5)
        );

        vars.push(("BINANCE_BASE_URL", "http://127.0.0.1:9000"));
        let config = TradeConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_invalid_values() {
        for (name, value) in [
            ("BINANCE_TESTNET", "maybe"),
            ("TRADE_MAX_RETRIES", "-1"),
            ("TRADE_RETRY_BACKOFF", "0.5"),
            ("BINANCE_RECV_WINDOW", "soon"),
        ] {
            let mut vars = KEYS.to_vec();
            vars.push((name, value));
            let err = TradeConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { name: n, .. } if n == name),
                "{:?}",
                err
            );
        }
    }
}
