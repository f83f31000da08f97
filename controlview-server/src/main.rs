//! controlview: serves a YAML wiki store over HTTP, restricting what each
//! space host can see to the contents of that space.

use anyhow::Result;
use clap::Parser;

use controlview_server::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    controlview_server::run_with_cli(Cli::parse()).await
}
