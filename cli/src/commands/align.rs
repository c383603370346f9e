use crate::commands::{build_config, print_warnings_to_stderr};
use crate::output::{json, text};
use crate::{GlobalArgs, OutputFormat};
use anyhow::{Context, Result};
use page_align::{align_chapter_files, AlignmentReport, CancelToken, RunGuard};
use std::io;
use std::path::Path;
use std::process::ExitCode;

pub fn run(
    global: &GlobalArgs,
    en_path: &Path,
    es_path: &Path,
    format: OutputFormat,
    chapter: Option<&str>,
) -> Result<ExitCode> {
    let config = build_config(global)?;
    let guard = RunGuard::new(CancelToken::new(), config.timeout_seconds);

    let (_, _, alignment) = align_chapter_files(en_path, es_path, chapter, &config, &guard)
        .with_context(|| {
            format!(
                "Failed to align {} with {}",
                en_path.display(),
                es_path.display()
            )
        })?;

    print_warnings_to_stderr(&alignment.warnings);

    let report = AlignmentReport::build(
        &alignment,
        en_path.display().to_string(),
        es_path.display().to_string(),
        config.threshold,
    );

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match format {
        OutputFormat::Text => text::write_alignment(&mut handle, &report, global.verbosity())?,
        OutputFormat::Json => json::write_json(&mut handle, &report)?,
    }

    Ok(ExitCode::SUCCESS)
}
