//! Shared test utilities: synthetic source images and directory listings.
//!
//! Every fixture is generated on the fly into a `TempDir`, so tests never
//! depend on checked-in binaries.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::path::Path;

// =========================================================================
// Source images
// =========================================================================

/// Write a gradient JPEG of the given size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write an RGBA PNG whose top-left quadrant is fully transparent and the
/// rest fully opaque.
pub fn create_test_png_rgba(path: &Path, width: u32, height: u32) {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        let alpha = if x < width / 2 && y < height / 2 { 0 } else { 255 };
        image::Rgba([200, (x % 256) as u8, (y % 256) as u8, alpha])
    });
    write_png(path, img.as_raw(), width, height, ExtendedColorType::Rgba8);
}

/// Write a greyscale+alpha PNG with the same transparent quadrant layout.
pub fn create_test_png_grey_alpha(path: &Path, width: u32, height: u32) {
    let img = image::GrayAlphaImage::from_fn(width, height, |x, y| {
        let alpha = if x < width / 2 && y < height / 2 { 0 } else { 255 };
        image::LumaA([((x + y) % 256) as u8, alpha])
    });
    write_png(path, img.as_raw(), width, height, ExtendedColorType::La8);
}

/// Write a 2-entry palette PNG with a tRNS chunk: entry 0 is fully
/// transparent and fills the top-left quadrant, entry 1 is opaque.
pub fn create_test_png_palette(path: &Path, width: u32, height: u32) {
    let indices: Vec<u8> = (0..height)
        .flat_map(|y| (0..width).map(move |x| u8::from(!(x < width / 2 && y < height / 2))))
        .collect();
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(vec![255, 0, 255, 20, 120, 220]);
    encoder.set_trns(vec![0u8, 255]);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&indices).unwrap();
}

fn write_png(path: &Path, raw: &[u8], width: u32, height: u32, color: ExtendedColorType) {
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    PngEncoder::new(writer)
        .write_image(raw, width, height, color)
        .unwrap();
}

// =========================================================================
// Filesystem inspection
// =========================================================================

/// Sorted file names directly inside `dir`.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
