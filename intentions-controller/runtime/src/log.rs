use anyhow::{anyhow, Error, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How log lines are rendered.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

// === impl LogFormat ===

impl LogFormat {
    /// Installs a global subscriber filtered by `filter`, an `EnvFilter` directive string.
    pub fn try_init(self, filter: &str) -> Result<()> {
        let filter = EnvFilter::try_new(filter)?;
        let registry = tracing_subscriber::registry().with(filter);
        match self {
            Self::Plain => registry.with(fmt::layer()).try_init()?,
            Self::Json => registry
                .with(fmt::layer().json().with_current_span(false))
                .try_init()?,
        }
        Ok(())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            s => Err(anyhow!("invalid log format: {:?}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => "plain".fmt(f),
            Self::Json => "json".fmt(f),
        }
    }
}
