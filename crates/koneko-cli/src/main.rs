use anyhow::{Context, Result};
use clap::Parser;
use koneko_config::Config;
use koneko_markup::{Diagnostics, Document, Renderer, lex, parse_batch};
use log::{debug, info};
use std::path::PathBuf;
use std::process::ExitCode;

mod outline;
mod sources;

use outline::Outline;

/// Check koneko markup sources and inspect how they parse.
#[derive(Debug, Parser)]
#[command(name = "koneko", version, about)]
struct Cli {
    /// Source files, or directories to search for sources
    #[arg(required = true, value_name = "PATHS")]
    paths: Vec<PathBuf>,

    /// Config file to use instead of ~/.config/koneko/config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the token stream of each source
    #[arg(long)]
    tokens: bool,

    /// Print the parsed tree of each source
    #[arg(long)]
    ast: bool,

    /// Print the section outline of each valid source
    #[arg(long)]
    outline: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = load_config(cli.config.clone())?;
    let files = sources::collect(&cli.paths, &config.sources)?;
    let inputs = sources::read_all(&files)?;

    let mut failed = 0;
    for (result, (name, _)) in parse_batch(&inputs).into_iter().zip(&inputs) {
        match result {
            Ok(doc) => {
                if !report(&cli, doc) {
                    failed += 1;
                }
            }
            Err(violation) => {
                eprint!("{}", Diagnostics::internal(name.as_str(), &violation));
                failed += 1;
            }
        }
    }

    info!("checked {} sources, {failed} with errors", inputs.len());
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(Config::config_path);
    let config = match Config::load_from_path(&path)
        .with_context(|| format!("Failed to load config '{}'", path.display()))?
    {
        Some(config) => config,
        None => {
            debug!("no config at {}, using defaults", path.display());
            Config::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Prints the requested dumps and any diagnostics. Returns whether the
/// document was free of errors.
fn report(cli: &Cli, doc: Document) -> bool {
    if cli.tokens {
        println!("== tokens: {}", doc.name);
        for token in lex(&doc.source).tokens {
            println!("{token}");
        }
    }
    if cli.ast {
        println!("== ast: {}", doc.name);
        println!("{:#?}", doc.blog);
    }

    if doc.has_errors() {
        eprint!("{}", doc.diagnostics());
        return false;
    }

    if cli.outline {
        match doc.into_validated() {
            Ok(post) => match Outline.render(&post) {
                Ok(outline) => print!("{outline}"),
                Err(never) => match never {},
            },
            Err(diagnostics) => {
                eprint!("{diagnostics}");
                return false;
            }
        }
    }
    true
}
