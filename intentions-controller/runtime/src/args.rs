use crate::{
    index::{Index, IndexMetrics},
    DefaultDecision, Endpoint, LogFormat,
};
use anyhow::Result;
use clap::Parser;
use prometheus_client::registry::Registry;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[clap(name = "intentions", about = "A service intentions controller")]
pub struct Args {
    #[clap(
        long,
        default_value = "intentions=info,warn",
        env = "INTENTIONS_CONTROLLER_LOG"
    )]
    log_level: String,

    #[clap(long, default_value = "plain")]
    log_format: LogFormat,

    /// The datacenter served by this controller.
    #[clap(long, default_value = "dc1")]
    datacenter: String,

    /// The decision applied to connections that no intention covers.
    #[clap(long, default_value = "allow")]
    default_decision: DefaultDecision,

    /// A JSON array of intentions created at startup.
    #[clap(long)]
    seed: Option<PathBuf>,
}

/// A configured endpoint and the registry its metrics are exported through.
pub struct Runtime {
    pub endpoint: Endpoint,
    pub registry: Registry,
}

impl Args {
    /// Parses arguments from the process, installs logging and builds the runtime.
    pub fn parse_and_build() -> Result<Runtime> {
        let args = Self::parse();
        args.log_format.try_init(&args.log_level)?;
        args.build()
    }

    pub fn build(self) -> Result<Runtime> {
        let Self {
            log_level: _,
            log_format: _,
            datacenter,
            default_decision,
            seed,
        } = self;

        let mut prom = <Registry>::default();
        let metrics = IndexMetrics::register(prom.sub_registry_with_prefix("index"));
        let index = Index::shared(metrics);
        let endpoint = Endpoint::new(index, datacenter, default_decision);

        if let Some(path) = seed {
            endpoint.load_seed(&path)?;
        }

        info!(
            datacenter = %endpoint.datacenter(),
            %default_decision,
            intentions = endpoint.index().read().len(),
            "Intentions controller ready"
        );
        Ok(Runtime {
            endpoint,
            registry: prom,
        })
    }
}
