use clap::Parser;
use radix_search::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the JSON output
    radix_search::logging::init();

    let cli = Cli::parse();
    let output = cli.command.execute().await.inspect_err(|e| {
        tracing::error!("Command failed: {:?}", e);
    })?;
    println!("{}", output);

    Ok(())
}
