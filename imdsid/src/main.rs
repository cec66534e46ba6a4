use std::process;

use anyhow::Result;
use clap::Parser;
use imdsid::Cli;
use tracing_log::AsTrace;
use tracing_subscriber::FmtSubscriber;

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let subscriber = FmtSubscriber::builder()
    .with_max_level(cli.verbose.log_level_filter().as_trace())
    .without_time()
    .with_ansi(!cli.no_color)
    .with_writer(std::io::stderr)
    .finish();
  tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

  eprintln!("Starting instance identity lookup");

  match cli.run(imdsid::default_transport()).await {
    Ok(_) => Ok(()),
    Err(err) => {
      // Include the source chain so the underlying cause is visible
      eprintln!("{err:#}");
      process::exit(2);
    }
  }
}
