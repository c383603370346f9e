pub mod align;
pub mod batch;
pub mod prepare;

use crate::GlobalArgs;
use anyhow::{Context, Result};
use page_align::{checked_threshold, AlignConfig, AlignConfigBuilder};

/// Resolves the preset flags, then applies explicit overrides.
pub fn build_config(global: &GlobalArgs) -> Result<AlignConfig> {
    let preset = if global.same_source {
        AlignConfig::same_source()
    } else if global.cross_group {
        AlignConfig::cross_group()
    } else {
        AlignConfig::balanced()
    };

    let mut builder = AlignConfigBuilder::from_config(preset).timeout_seconds(global.timeout);
    if let Some(raw) = global.threshold {
        let threshold = checked_threshold(raw).context("Invalid --threshold")?;
        builder = builder.threshold(threshold);
    }

    let config = builder.build().context("Invalid configuration")?;
    tracing::debug!(?config, "resolved configuration");
    Ok(config)
}

pub fn print_warnings_to_stderr(warnings: &[String]) {
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
}
