use clap::Parser;
use tracing_subscriber::EnvFilter;
use twinview_viewer::{app, AppConfig, Args};

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    tracing::debug!(?args, "Starting twinview");
    app::run(AppConfig::from(args))
}
