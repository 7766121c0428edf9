use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    /// How long a quote (and the reservations taken from it) stays valid.
    pub quote_ttl_secs: u64,
    /// Upper bound on a payment provider settlement call.
    pub settle_timeout_ms: u64,
    /// Flat tax rate in basis points applied over subtotal + shipping.
    pub tax_rate_bps: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = env::var("SERVER_PORT").unwrap_or_else(|_| "3000".into());
        let database_url = env::var("DATABASE_URL").ok();
        let quote_ttl_secs = parse_env("QUOTE_TTL_SECS", 900)?;
        let settle_timeout_ms = parse_env("SETTLE_TIMEOUT_MS", 5_000)?;
        let tax_rate_bps = parse_env("TAX_RATE_BPS", 0)?;
        Ok(Self {
            server_port,
            database_url,
            quote_ttl_secs,
            settle_timeout_ms,
            tax_rate_bps,
        })
    }

    pub fn quote_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.quote_ttl_secs as i64)
    }

    pub fn settle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.settle_timeout_ms)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}
