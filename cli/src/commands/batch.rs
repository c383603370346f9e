use crate::commands::build_config;
use crate::output::{json, text};
use crate::{GlobalArgs, OutputFormat};
use anyhow::{bail, Context, Result};
use page_align::{find_chapter_pairs, run_batch, BatchOptions, CancelToken};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub fn run(
    global: &GlobalArgs,
    dir: &Path,
    output_dir: PathBuf,
    manga: Option<String>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let config = build_config(global)?;

    if !dir.is_dir() {
        bail!("Directory not found: {}", dir.display());
    }

    let pairs = find_chapter_pairs(dir)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;

    let options = BatchOptions { output_dir, manga };
    let summary = run_batch(&pairs, &options, &config, &CancelToken::new())
        .with_context(|| format!("Failed to write batch summary to {}", options.output_dir.display()))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match format {
        OutputFormat::Text => text::write_batch_summary(&mut handle, &summary, global.verbosity())?,
        OutputFormat::Json => json::write_json(&mut handle, &summary)?,
    }

    if summary.exit_ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}
