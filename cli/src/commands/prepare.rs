use crate::commands::{build_config, print_warnings_to_stderr};
use crate::output::text;
use crate::GlobalArgs;
use anyhow::{Context, Result};
use page_align::{prepare_chapter, CancelToken, PrepareRequest};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

pub fn run(
    global: &GlobalArgs,
    en_path: PathBuf,
    es_path: PathBuf,
    output_dir: PathBuf,
    chapter: Option<String>,
    manga: Option<String>,
) -> Result<ExitCode> {
    let config = build_config(global)?;
    let request = PrepareRequest {
        en_path,
        es_path,
        output_dir,
        chapter,
        manga,
    };

    let prepared = prepare_chapter(&request, &config, &CancelToken::new()).with_context(|| {
        format!(
            "Failed to prepare chapter from {} and {}",
            request.en_path.display(),
            request.es_path.display()
        )
    })?;

    print_warnings_to_stderr(&prepared.warnings);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    text::write_prepared(&mut handle, &prepared, global.verbosity())?;

    Ok(ExitCode::SUCCESS)
}
