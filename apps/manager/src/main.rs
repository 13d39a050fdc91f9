use anyhow::Context;
use clap::Parser;
use pim_kernel::config::load_config;
use pim_kernel::domain::config::ManagerConfig;
use pim_logger::Logger;
use pim_manager::App;
use std::path::PathBuf;

/// Hosts inventory objects on the bus and keeps them across restarts.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file (`.toml`, `.json`, `.yaml`); `PIM__*` variables override it.
    #[arg(short, long, env = "PIM_CONFIG")]
    config: Option<PathBuf>,
}

#[pim_runtime::main(current_thread)]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg: ManagerConfig =
        load_config(cli.config.as_deref()).context("Critical: Configuration is malformed")?;

    let _log = Logger::from_config(env!("CARGO_PKG_NAME"), &cfg.logging)?;

    App::builder().config(cfg).build()?.run().await
}
