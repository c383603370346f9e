mod commands;
mod output;

use clap::{Args, Parser, Subcommand, ValueEnum};
use page_align::ConfigError;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "page-align")]
#[command(about = "Align the pages of two translations of a comic chapter")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    #[arg(
        long,
        short = 't',
        global = true,
        value_name = "BITS",
        allow_negative_numbers = true,
        help = "Maximum fingerprint distance for a match (1-64, default 20)"
    )]
    pub threshold: Option<i64>,
    #[arg(long, global = true, conflicts_with = "cross_group", help = "Preset for two scans of the same release (threshold 12)")]
    pub same_source: bool,
    #[arg(long, global = true, help = "Preset for releases by different scanlation groups (threshold 25)")]
    pub cross_group: bool,
    #[arg(long, global = true, value_name = "SECONDS", help = "Abort a chapter after this many seconds")]
    pub timeout: Option<u32>,
    #[arg(long, short = 'j', global = true, value_name = "N", help = "Worker threads (default: one per core)")]
    pub jobs: Option<usize>,
    #[arg(long, short, global = true, conflicts_with = "verbose", help = "Quiet mode: only show warnings and the summary")]
    pub quiet: bool,
    #[arg(long, short, global = true, help = "Verbose mode: show per-page details")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Align two chapter archives and print the alignment")]
    Align {
        #[arg(help = "Path to the English chapter archive")]
        en: PathBuf,
        #[arg(help = "Path to the Spanish chapter archive")]
        es: PathBuf,
        #[arg(long, short, value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
        #[arg(long, help = "Chapter label (default: parsed from the EN file name)")]
        chapter: Option<String>,
    },
    #[command(about = "Align a chapter and write renumbered archives plus a manifest")]
    Prepare {
        #[arg(help = "Path to the English chapter archive")]
        en: PathBuf,
        #[arg(help = "Path to the Spanish chapter archive")]
        es: PathBuf,
        #[arg(long, short, value_name = "DIR", help = "Output directory")]
        output: PathBuf,
        #[arg(long, help = "Chapter label (default: parsed from the EN file name)")]
        chapter: Option<String>,
        #[arg(long, value_name = "SLUG", help = "Write under <DIR>/<SLUG>/chapters/")]
        manga: Option<String>,
    },
    #[command(about = "Prepare every {chapter}_en.zip / {chapter}_es.zip pair in a directory")]
    Batch {
        #[arg(help = "Directory containing chapter archives")]
        dir: PathBuf,
        #[arg(long, short, value_name = "DIR", help = "Output directory")]
        output: PathBuf,
        #[arg(long, value_name = "SLUG", help = "Write under <DIR>/<SLUG>/chapters/")]
        manga: Option<String>,
        #[arg(long, short, value_enum, default_value = "text", help = "Summary format")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl GlobalArgs {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbosity());

    if let Some(jobs) = cli.global.jobs {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
        {
            eprintln!("Error: failed to configure worker pool: {e}");
            return ExitCode::from(2);
        }
    }

    let result = match cli.command {
        Commands::Align {
            en,
            es,
            format,
            chapter,
        } => commands::align::run(&cli.global, &en, &es, format, chapter.as_deref()),
        Commands::Prepare {
            en,
            es,
            output,
            chapter,
            manga,
        } => commands::prepare::run(&cli.global, en, es, output, chapter, manga),
        Commands::Batch {
            dir,
            output,
            manga,
            format,
        } => commands::batch::run(&cli.global, &dir, output, manga, format),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for_error(&e)
        }
    }
}

fn init_tracing(verbosity: Verbosity) {
    let default_level = match verbosity {
        Verbosity::Quiet => "warn",
        Verbosity::Normal => "info",
        Verbosity::Verbose => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn exit_code_for_error(err: &anyhow::Error) -> ExitCode {
    if is_usage_error(err) {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

fn is_usage_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<ConfigError>())
}
