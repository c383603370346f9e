mod common;

use common::{chapter_pages, translated_chapter, walsh, write_zip};
use page_align::{
    error_codes, find_chapter_pairs, run_batch, AlignConfig, BatchOptions, CancelToken,
    ChapterOutcome, ChapterStatus, SUMMARY_FILE_NAME,
};
use std::fs;

#[test]
fn batch_continues_past_a_failing_chapter() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("downloads");
    fs::create_dir_all(&input).expect("mkdir");

    let (en1, es1) = translated_chapter(1, 3);
    write_zip(&input, "1_en.zip", &chapter_pages("", &en1, 64, 96));
    write_zip(&input, "1_es.zip", &chapter_pages("", &es1, 64, 96));

    fs::write(input.join("2_en.zip"), b"truncated download, definitely not a zip").expect("write");
    let (_, es2) = translated_chapter(10, 2);
    write_zip(&input, "2_es.zip", &chapter_pages("", &es2, 64, 96));

    let (en10, mut es10) = translated_chapter(20, 4);
    es10.push(walsh(63));
    write_zip(&input, "10_en.zip", &chapter_pages("", &en10, 64, 96));
    write_zip(&input, "10_es.zip", &chapter_pages("", &es10, 64, 96));

    // only one language: ignored
    write_zip(&input, "11_en.zip", &chapter_pages("", &en1, 64, 96));

    let pairs = find_chapter_pairs(&input).expect("scan");
    assert_eq!(
        pairs.iter().map(|p| p.chapter.as_str()).collect::<Vec<_>>(),
        vec!["1", "2", "10"]
    );

    let output = dir.path().join("upload");
    let summary = run_batch(
        &pairs,
        &BatchOptions {
            output_dir: output.clone(),
            manga: None,
        },
        &AlignConfig::default(),
        &CancelToken::new(),
    )
    .expect("batch");

    assert_eq!(summary.total_chapters, 3);
    assert_eq!((summary.succeeded, summary.failed), (2, 1));
    assert_eq!((summary.perfect_matches, summary.has_insertions), (1, 1));
    assert!(!summary.exit_ok());

    assert_eq!(
        summary
            .chapters
            .iter()
            .map(ChapterOutcome::chapter)
            .collect::<Vec<_>>(),
        vec!["1", "2", "10"]
    );
    match &summary.chapters[1] {
        ChapterOutcome::Failed(failure) => assert_eq!(failure.code, error_codes::ARCHIVE_NOT_ZIP),
        other => panic!("chapter 2 should fail, got {other:?}"),
    }
    match &summary.chapters[2] {
        ChapterOutcome::Done(stats) => {
            assert_eq!(stats.status, ChapterStatus::Diff);
            assert_eq!((stats.pages_en, stats.pages_es), (4, 5));
            assert_eq!(stats.es_only, 1);
        }
        other => panic!("chapter 10 should succeed, got {other:?}"),
    }

    assert!(output.join("1_alignment.json").exists());
    assert!(output.join("10_es.zip").exists());
    assert!(!output.join("2_alignment.json").exists());

    let written: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(output.join(SUMMARY_FILE_NAME)).expect("read summary"),
    )
    .expect("parse summary");
    assert_eq!(written["total_chapters"], 3);
    assert_eq!(written["failed"], 1);
    assert_eq!(written["chapters"][0]["status"], "perfect");
    assert_eq!(written["chapters"][1]["code"], error_codes::ARCHIVE_NOT_ZIP);
}

#[test]
fn empty_directory_yields_empty_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pairs = find_chapter_pairs(dir.path()).expect("scan");
    assert!(pairs.is_empty());

    let output = dir.path().join("out");
    let summary = run_batch(
        &pairs,
        &BatchOptions {
            output_dir: output.clone(),
            manga: Some("beelzebub".to_string()),
        },
        &AlignConfig::default(),
        &CancelToken::new(),
    )
    .expect("batch");

    assert_eq!(summary.total_chapters, 0);
    assert!(summary.exit_ok());
    assert!(output.join(SUMMARY_FILE_NAME).exists());
}
