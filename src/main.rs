use anyhow::Result;
use clap::Parser;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() {
    if let Err(err) = dispatch().await {
        eprintln!("\u{001b}[31merror:\u{001b}[0m {err:?}");
        std::process::exit(1);
    }
}

async fn dispatch() -> Result<()> {
    cli::run(Cli::parse()).await
}
