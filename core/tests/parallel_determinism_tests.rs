#![cfg(feature = "parallel")]

mod common;

use common::{chapter_pages, retouch, walsh, write_zip};
use page_align::{prepare_chapter, AlignConfig, AlignmentManifest, CancelToken, PrepareRequest};
use rayon::ThreadPoolBuilder;
use std::path::Path;

fn run_in_pool<T>(threads: usize, f: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .expect("build pool");
    pool.install(f)
}

fn prepare_manifest(en: &Path, es: &Path, out: &Path) -> AlignmentManifest {
    let request = PrepareRequest {
        en_path: en.to_path_buf(),
        es_path: es.to_path_buf(),
        output_dir: out.to_path_buf(),
        chapter: None,
        manga: None,
    };
    let prepared =
        prepare_chapter(&request, &AlignConfig::default(), &CancelToken::new()).expect("prepare");
    let json = std::fs::read_to_string(prepared.manifest_path).expect("read manifest");
    AlignmentManifest::from_json(&json).expect("parse manifest")
}

#[test]
fn manifests_are_identical_across_thread_counts() {
    let dir = tempfile::tempdir().expect("tempdir");

    let en: Vec<_> = (1..=40).map(walsh).collect();
    let mut es: Vec<_> = en
        .iter()
        .enumerate()
        .map(|(i, fp)| retouch(*fp, (i % 9) as u32))
        .collect();
    es.remove(17);
    es.insert(3, walsh(62));
    es.insert(30, walsh(61));

    let en_zip = write_zip(dir.path(), "33_en.zip", &chapter_pages("", &en, 64, 96));
    let es_zip = write_zip(dir.path(), "33_es.zip", &chapter_pages("", &es, 96, 144));

    let single = run_in_pool(1, || prepare_manifest(&en_zip, &es_zip, &dir.path().join("one")));
    let many = run_in_pool(4, || prepare_manifest(&en_zip, &es_zip, &dir.path().join("four")));

    assert_eq!(single, many);
    assert_eq!((single.en_only, single.es_only), (1, 2));
}
