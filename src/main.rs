use clap::Parser;
use mdtodocu::config::{self, ConvertConfig};
use mdtodocu::convert::{self, ConvertError};
use mdtodocu::output;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "mdtodocu")]
#[command(about = "Convert an mdbook-style book into a Docusaurus docs tree")]
#[command(long_about = "\
Convert an mdbook-style book into a Docusaurus docs tree

The book's SUMMARY.md outline drives the output: nested entries become
directories with a _category_.json, outline order becomes sidebar order, and
every page gets title and sidebar_position frontmatter.

Layout (defaults, see mdtodocu.toml):

  ../books/<BOOK>/
  ├── SUMMARY.md                  # Outline
  ├── intro.md
  └── pics/diagram.png
  docu_book/<BOOK>/
  ├── intro/
  │   ├── _category_.json         # {\"label\": \"Intro\", \"position\": 1}
  │   ├── intro.md                # sidebar_position: 1
  │   └── img/diagram.png         # Images copied beside their page
  └── ...

Missing files, images and includes do not stop the run. They are listed in
mdtodocu.log, which is rewritten on every run.")]
#[command(version)]
struct Cli {
    /// Book directory name under the books directory
    book: String,

    /// Config file (default: mdtodocu.toml in the working directory, if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), ConvertError> {
    let config = load_config(cli)?;
    let report = convert::convert(&config, &cli.book)?;
    output::print_convert_output(&report);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ConvertConfig, config::ConfigError> {
    match &cli.config {
        Some(path) => config::load_config_file(path),
        None => config::load_config(&std::env::current_dir()?),
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    // Only fails if a subscriber is already installed.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
