//! Process settings.
//!
//! Defaults first, then `WEFT_*` environment variables:
//!
//! | Variable | Key | Default |
//! |---|---|---|
//! | `WEFT_BIND` | `bind` | `0.0.0.0:3000` |
//! | `WEFT_LOG` | `log` | `info` |
//! | `WEFT_TRACE_ORDER` | `trace_order` | `2` |
//!
//! `RUST_LOG`, when set, takes precedence over `log`.

use ::config::{Config, Environment};
use serde::Deserialize;

use crate::error::Error;

pub const ENV_PREFIX: &str = "WEFT";

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    /// Listen address, `host:port`.
    pub bind: String,
    /// Default `tracing` filter directive.
    pub log: String,
    /// Priority of the built-in trace aspect's bindings.
    pub trace_order: i32,
}

impl Settings {
    pub fn load() -> Result<Self, Error> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(env: Environment) -> Result<Self, Error> {
        let settings = Config::builder()
            .set_default("bind", "0.0.0.0:3000")?
            .set_default("log", "info")?
            .set_default("trace_order", 2)?
            .add_source(env.try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
