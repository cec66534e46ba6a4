use anyhow::Result;
use aws_smithy_runtime_api::client::http::SharedHttpClient;
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::Verbosity;

use crate::{config::Settings, fetch, imds::ImdsClient};

/// Styles for CLI
fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .literal(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::BrightCyan))),
    )
    .usage(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
}

/// Print the ID of the EC2 instance as reported by the instance metadata service
#[derive(Debug, Parser)]
#[command(author, about, version)]
#[command(styles=get_styles())]
pub struct Cli {
  #[clap(flatten)]
  pub settings: Settings,

  /// What to print once the identity document is retrieved
  #[arg(long, value_enum, default_value_t)]
  pub output: Output,

  /// Disable colored log output
  #[arg(long)]
  pub no_color: bool,

  #[clap(flatten)]
  pub verbose: Verbosity,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Output {
  /// The instance ID only
  #[default]
  Id,
  /// The entire instance identity document as JSON
  Json,
}

impl Cli {
  /// Look up the instance identity document and print the requested output
  pub async fn run(&self, transport: SharedHttpClient) -> Result<()> {
    match self.output {
      Output::Id => {
        let instance_id = fetch::fetch_instance_id(transport, &self.settings, ImdsClient::from_config).await?;
        println!("{instance_id}");
      }
      Output::Json => {
        let document =
          fetch::fetch_instance_identity_document(transport, &self.settings, ImdsClient::from_config).await?;
        println!("{}", serde_json::to_string_pretty(&document)?);
      }
    }

    Ok(())
  }
}
