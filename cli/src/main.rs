use clap::Parser;
use kritikos_cli::Cli;
use kritikos_cli::run_main;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_main(cli).await
}
