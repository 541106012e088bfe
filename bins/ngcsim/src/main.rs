use anyhow::Context;
use clap::Parser as ClapParser;
use config::Config;
use ngcsim::Args;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_current_dir().with_context(|| "invalid configuration")?;
    let summary = ngcsim::run(args, config).await?;
    println!("{}", summary);

    Ok(())
}
