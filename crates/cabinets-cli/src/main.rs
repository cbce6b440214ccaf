//! Cabinets command line interface
//!
//! Thin front end over the `cabinets` library: every subcommand resolves a
//! URI and performs one operation against the registered backends.

use anyhow::{Context, Result};
use cabinets::{Cabinets, Content, Kind, Options, ParserSelector};
use clap::Parser;
use std::io::Write;
use tracing::info;

mod cli_args;

use cli_args::{Cli, Commands, CommonArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cabinets=info".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cabinets = Cabinets::from_env().context("Failed to load plugins")?;

    match cli.command {
        Commands::Read { uri, common } => {
            let (parser, options) = common.resolve(&cabinets)?;
            let content = cabinets.read_with(uri.as_str(), &parser, &options).await?;
            print_content(content)?;
        }
        Commands::Create {
            uri,
            data,
            file,
            common,
        } => {
            let (parser, options) = common.resolve(&cabinets)?;
            let content = match (data, file) {
                (Some(data), _) => {
                    Content::Value(serde_json::from_str(&data).context("--data is not valid JSON")?)
                }
                (None, Some(file)) => {
                    // Raw copies stay raw; otherwise decode by the source extension
                    let source_parser = match parser {
                        ParserSelector::Raw => ParserSelector::Raw,
                        _ => ParserSelector::Default,
                    };
                    cabinets
                        .read_with(&file, &source_parser, &Options::new())
                        .await
                        .with_context(|| format!("Failed to read {}", file.display()))?
                }
                (None, None) => anyhow::bail!("create needs --data or --file"),
            };
            cabinets
                .create_with(uri.as_str(), content, &parser, &options)
                .await?;
            info!("Created {}", uri);
        }
        Commands::Delete { uri, common } => {
            let (_, options) = common.resolve(&cabinets)?;
            cabinets.delete_with(uri.as_str(), &options).await?;
            info!("Deleted {}", uri);
        }
        Commands::List { uri, common } => {
            let (_, options) = common.resolve(&cabinets)?;
            for name in cabinets.list_with(uri.as_str(), &options).await? {
                println!("{name}");
            }
        }
        Commands::Keys => {
            let registry = cabinets.registry();
            println!("protocols: {}", registry.keys(Kind::Backend).join(", "));
            println!("extensions: {}", registry.keys(Kind::Parser).join(", "));
        }
    }

    Ok(())
}

impl CommonArgs {
    fn resolve(&self, cabinets: &Cabinets) -> Result<(ParserSelector, Options)> {
        let parser = cabinets.parser_selector(&self.parser)?;
        let options = self
            .options
            .iter()
            .map(|pair| Options::parse_pair(pair))
            .collect::<cabinets::Result<Options>>()?;
        Ok((parser, options))
    }
}

fn print_content(content: Content) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    match content {
        Content::Value(value) => {
            serde_json::to_writer_pretty(&mut stdout, &value)?;
            writeln!(stdout)?;
        }
        Content::Bytes(bytes) => stdout.write_all(&bytes)?,
    }
    stdout.flush()?;
    Ok(())
}
