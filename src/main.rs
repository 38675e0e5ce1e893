use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use depstub::cli::OutputArgs;
use depstub::logging::{self, LogConfig};
use depstub::models::StubConfig;
use depstub::Result;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "depstub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate behavior-free stubs of Go dependencies from their exported API", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    output: OutputArgs,

    /// Configuration file (default: ./depstub.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Diagnostic output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Stub the named types and functions of one package
    ///
    /// Examples:
    ///   depstub gen database/sql/driver Conn,Driver
    ///   depstub gen github.com/Masterminds/squirrel '' Expr
    Gen {
        /// Import path of the package to stub (`.` for the current directory)
        package: String,

        /// Comma-separated type names
        types: Option<String>,

        /// Comma-separated function, variable and constant names
        values: Option<String>,
    },

    /// Detect and stub every external package used by the package tree in the current directory
    Auto,

    /// Print a `go:generate` directive for every external package in use
    Print {
        /// Print the usage index as JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Write a stub vendor/modules.txt for the stubs already vendored
    #[command(name = "module-txt")]
    ModuleTxt,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    logging::init(&LogConfig::verbosity(cli.verbose))?;

    if let Commands::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "depstub", &mut io::stdout());
        return Ok(());
    }

    let work_dir = std::env::current_dir()?;
    let config = StubConfig::load(cli.config.as_deref(), &work_dir)?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Commands::Gen {
            package,
            types,
            values,
        } => {
            depstub::cli::generate::run(
                &package,
                types.as_deref(),
                values.as_deref(),
                &cli.output,
                &config,
                &work_dir,
            )?;
        }

        Commands::Auto => {
            depstub::cli::auto::run(&cli.output, &config, &work_dir)?;
        }

        Commands::Print { json } => {
            depstub::cli::print::run(&config, &work_dir, json)?;
        }

        Commands::ModuleTxt => {
            depstub::cli::module_txt::run(&config, &work_dir)?;
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}
