//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use page_align::Fingerprint;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const DARK: u8 = 20;
const BRIGHT: u8 = 230;

/// Row `k` of the 64x64 Hadamard matrix as a fingerprint. Distinct non-zero
/// rows are exactly 32 bits apart.
pub fn walsh(k: u32) -> Fingerprint {
    let bits = (0..64u32).fold(0u64, |acc, p| acc | ((((p & k).count_ones() & 1) as u64) << p));
    Fingerprint::from_bits(bits)
}

/// `fp` with its lowest `nbits` bits inverted, i.e. the last `nbits` grid
/// cells of the page changed.
pub fn retouch(fp: Fingerprint, nbits: u32) -> Fingerprint {
    let mask = if nbits == 0 { 0 } else { u64::MAX >> (64 - nbits) };
    Fingerprint::from_bits(fp.bits() ^ mask)
}

/// Renders a two-tone page whose average hash is exactly `fp` (for any `fp`
/// that is neither all zeros nor all ones). `width` and `height` must be
/// multiples of 8.
pub fn render_page(fp: Fingerprint, width: u32, height: u32) -> GrayImage {
    let cell_w = width / 8;
    let cell_h = height / 8;
    GrayImage::from_fn(width, height, |x, y| {
        let cell = (y / cell_h) * 8 + x / cell_w;
        if fp.cell(cell) {
            Luma([BRIGHT])
        } else {
            Luma([DARK])
        }
    })
}

pub fn encode_png(image: GrayImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}

pub fn page_png(fp: Fingerprint, width: u32, height: u32) -> Vec<u8> {
    encode_png(render_page(fp, width, height))
}

pub fn zip_bytes(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(name.as_str(), options).expect("start file");
        writer.write_all(data).expect("write entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

pub fn write_zip(dir: &Path, file_name: &str, entries: &[(String, Vec<u8>)]) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, zip_bytes(entries)).expect("write zip");
    path
}

/// Archive entries `{prefix}{NN}.png`, one page per fingerprint.
pub fn chapter_pages(prefix: &str, pages: &[Fingerprint], width: u32, height: u32) -> Vec<(String, Vec<u8>)> {
    pages
        .iter()
        .enumerate()
        .map(|(i, fp)| (format!("{prefix}{:02}.png", i + 1), page_png(*fp, width, height)))
        .collect()
}

/// An EN chapter of `pages` Walsh pages starting at row `first`, and its ES
/// translation with a few retouched cells per page at a different resolution.
pub fn translated_chapter(first: u32, pages: u32) -> (Vec<Fingerprint>, Vec<Fingerprint>) {
    let en: Vec<_> = (first..first + pages).map(walsh).collect();
    let es: Vec<_> = en.iter().enumerate().map(|(i, fp)| retouch(*fp, (i % 4) as u32)).collect();
    (en, es)
}

pub fn read_zip_names(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).expect("open output zip");
    let archive = zip::ZipArchive::new(file).expect("read output zip");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}
