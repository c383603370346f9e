use crate::Verbosity;
use anyhow::Result;
use page_align::{
    AlignmentReport, BatchSummary, ChapterOutcome, ChapterStatus, PairType, PreparedChapter,
    ReportSide,
};
use std::io::Write;

const NAME_WIDTH: usize = 15;

pub fn write_alignment<W: Write>(
    w: &mut W,
    report: &AlignmentReport,
    verbosity: Verbosity,
) -> Result<()> {
    writeln!(w, "Chapter {}", report.chapter)?;
    writeln!(w, "EN: {} ({} pages)", report.en_source, report.en_pages)?;
    writeln!(w, "ES: {} ({} pages)", report.es_source, report.es_pages)?;
    writeln!(w)?;

    if verbosity != Verbosity::Quiet {
        writeln!(
            w,
            "{:<4} {:<15} {:<15} {:<6} {}",
            "#", "EN", "ES", "Dist", "Status"
        )?;
        writeln!(w, "{}", "-".repeat(52))?;
        for page in &report.pages {
            let distance = page
                .distance
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            let status = match page.page_type {
                PairType::Matched => page.quality.map(|q| q.as_str()).unwrap_or("matched"),
                PairType::EnOnly => "EN only",
                PairType::EsOnly => "ES only",
            };
            writeln!(
                w,
                "{:<4} {:<15} {:<15} {:<6} {}",
                page.index,
                side_name(page.en.as_ref()),
                side_name(page.es.as_ref()),
                distance,
                status
            )?;
            if verbosity == Verbosity::Verbose {
                for side in [page.en.as_ref(), page.es.as_ref()].into_iter().flatten() {
                    writeln!(
                        w,
                        "     {} {} {}x{}",
                        side.name, side.fingerprint, side.width, side.height
                    )?;
                }
            }
        }
        writeln!(w)?;
    }

    writeln!(
        w,
        "Summary: {} pages, {} matched, {} EN only, {} ES only, avg distance {:.1}",
        report.total_pages, report.matched, report.en_only, report.es_only, report.avg_distance
    )?;
    if verbosity == Verbosity::Verbose {
        writeln!(
            w,
            "Quality: {} good, {} weak, {} poor (threshold {})",
            report.quality.good, report.quality.weak, report.quality.poor, report.threshold
        )?;
    }

    Ok(())
}

fn side_name(side: Option<&ReportSide>) -> String {
    match side {
        Some(side) => truncate(&side.name, NAME_WIDTH),
        None => "---".to_string(),
    }
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let head: String = name.chars().take(width - 2).collect();
    format!("{head}..")
}

pub fn write_prepared<W: Write>(
    w: &mut W,
    prepared: &PreparedChapter,
    verbosity: Verbosity,
) -> Result<()> {
    let result = &prepared.result;
    writeln!(
        w,
        "Chapter {}: {} pages ({} matched, {} EN only, {} ES only)",
        prepared.chapter, result.total_pages, result.matched, result.en_only, result.es_only
    )?;
    if verbosity != Verbosity::Quiet {
        writeln!(w, "  {}", prepared.en_archive.display())?;
        writeln!(w, "  {}", prepared.es_archive.display())?;
        writeln!(w, "  {}", prepared.manifest_path.display())?;
    }
    Ok(())
}

pub fn write_batch_summary<W: Write>(
    w: &mut W,
    summary: &BatchSummary,
    verbosity: Verbosity,
) -> Result<()> {
    writeln!(w, "Total chapters:   {}", summary.total_chapters)?;
    writeln!(w, "Perfect matches:  {}", summary.perfect_matches)?;
    writeln!(w, "Has differences:  {}", summary.has_insertions)?;
    writeln!(w, "Failed:           {}", summary.failed)?;

    if verbosity == Verbosity::Quiet || summary.chapters.is_empty() {
        return Ok(());
    }

    writeln!(w)?;
    writeln!(
        w,
        "{:<8} {:<6} {:<6} {:<6} {:<5} {:<5} {}",
        "Ch", "EN", "ES", "Match", "+EN", "+ES", "Status"
    )?;
    writeln!(w, "{}", "-".repeat(55))?;
    for outcome in &summary.chapters {
        match outcome {
            ChapterOutcome::Done(stats) => {
                let status = match stats.status {
                    ChapterStatus::Perfect => "PERFECT",
                    ChapterStatus::Diff => "DIFF",
                };
                writeln!(
                    w,
                    "{:<8} {:<6} {:<6} {:<6} {:<5} {:<5} {}",
                    stats.chapter,
                    stats.pages_en,
                    stats.pages_es,
                    stats.matched,
                    stats.en_only,
                    stats.es_only,
                    status
                )?;
            }
            ChapterOutcome::Failed(failure) => {
                writeln!(w, "{:<8} ERROR: {}", failure.chapter, failure.error)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(truncate("short.jpg", 15), "short.jpg");
        assert_eq!(truncate("a_really_long_page_name.jpg", 15), "a_really_long..");
    }
}
