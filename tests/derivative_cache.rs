//! End-to-end behavior of the derivative cache against a real filesystem.
//!
//! Run with logs: RUST_LOG=derivative_cache=debug cargo test --test derivative_cache -- --nocapture

use derivative_cache::config::DerivativesConfig;
use derivative_cache::imaging::{ConversionError, ConvertParams};
use derivative_cache::{
    ConversionOutcome, DerivativeCache, DerivativeFormat, FailureReason, ImageConverter, Quality,
    RustConverter, SourceImageRef,
};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let file = fs::File::create(path).unwrap();
    JpegEncoder::new(std::io::BufWriter::new(file))
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// PNG with a fully transparent 4x4 block in the top-left corner.
fn write_png_with_transparent_corner(path: &Path, width: u32, height: u32) {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        if x < 4 && y < 4 {
            image::Rgba([255, 0, 255, 0])
        } else {
            image::Rgba([20, 120, 220, 255])
        }
    });
    let file = fs::File::create(path).unwrap();
    PngEncoder::new(std::io::BufWriter::new(file))
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
}

fn leftover_temp_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".tmp"))
        .collect()
}

/// Wraps the real converter, counting conversions and optionally reporting
/// the encoder as unavailable.
struct CountingConverter {
    inner: RustConverter,
    available: bool,
    converts: AtomicUsize,
}

impl CountingConverter {
    fn new(available: bool) -> Self {
        Self {
            inner: RustConverter::new(),
            available,
            converts: AtomicUsize::new(0),
        }
    }
}

impl ImageConverter for CountingConverter {
    fn supports(&self, format: DerivativeFormat) -> bool {
        self.available && self.inner.supports(format)
    }

    fn convert(&self, params: &ConvertParams) -> Result<(), ConversionError> {
        self.converts.fetch_add(1, Ordering::SeqCst);
        self.inner.convert(params)
    }
}

#[test]
fn second_request_reuses_first_derivative() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("photo.jpeg");
    write_jpeg(&source, 200, 100);
    let cache = DerivativeCache::with_converter(
        CountingConverter::new(true),
        &DerivativesConfig::default(),
    );
    let src = SourceImageRef::new(&source);

    let first = cache.get_or_create(&src, Quality::default());
    let created_bytes = fs::read(tmp.path().join("photo.webp")).unwrap();
    let second = cache.get_or_create(&src, Quality::default());

    assert!(matches!(first, ConversionOutcome::Created(_)));
    assert!(matches!(second, ConversionOutcome::AlreadyExists(_)));
    assert_eq!(first.derivative(), second.derivative());
    assert_eq!(fs::read(tmp.path().join("photo.webp")).unwrap(), created_bytes);
    assert_eq!(cache.converter().converts.load(Ordering::SeqCst), 1);
}

#[test]
fn png_transparency_is_preserved() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("badge.png");
    write_png_with_transparent_corner(&source, 32, 32);
    let cache = DerivativeCache::new(&DerivativesConfig::default());

    let outcome = cache.get_or_create(&SourceImageRef::new(&source), Quality::new(80));
    let derivative = outcome.derivative().unwrap().path().to_path_buf();

    let decoded = image::open(&derivative).unwrap().to_rgba8();
    assert!(decoded.get_pixel(0, 0)[3] <= 5, "transparent corner was flattened");
    assert!(decoded.get_pixel(31, 31)[3] >= 250);
}

/// Indexed PNG whose palette entry 0 is transparent via tRNS.
fn write_palette_png(path: &Path, width: u32, height: u32) {
    let indices: Vec<u8> = (0..height)
        .flat_map(|y| (0..width).map(move |x| u8::from(!(x < 2 && y < 2))))
        .collect();
    let file = fs::File::create(path).unwrap();
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(vec![0, 0, 0, 240, 200, 40]);
    encoder.set_trns(vec![0u8, 255]);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&indices).unwrap();
}

#[test]
fn palette_png_transparency_is_preserved() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("icon.png");
    write_palette_png(&source, 8, 8);
    let cache = DerivativeCache::new(&DerivativesConfig::default());

    let outcome = cache.get_or_create(&SourceImageRef::new(&source), Quality::default());
    let derivative = outcome.derivative().unwrap().path().to_path_buf();

    let decoded = image::open(&derivative).unwrap().to_rgba8();
    assert!(decoded.get_pixel(0, 0)[3] <= 5, "palette transparency was flattened");
    assert!(decoded.get_pixel(7, 7)[3] >= 250);
}

#[test]
fn capability_absence_skips_all_decoding() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let jpg = tmp.path().join("a.jpg");
    let png = tmp.path().join("b.png");
    write_jpeg(&jpg, 16, 16);
    write_png_with_transparent_corner(&png, 16, 16);
    let cache = DerivativeCache::with_converter(
        CountingConverter::new(false),
        &DerivativesConfig::default(),
    );

    for source in [&jpg, &png] {
        let outcome = cache.get_or_create(&SourceImageRef::new(source), Quality::default());
        assert_eq!(outcome, ConversionOutcome::Unsupported);
    }
    assert_eq!(cache.converter().converts.load(Ordering::SeqCst), 0);
    assert!(!tmp.path().join("a.webp").exists());
}

#[test]
fn missing_source_performs_no_writes() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let cache = DerivativeCache::new(&DerivativesConfig::default());

    let outcome = cache.get_or_create(
        &SourceImageRef::new(tmp.path().join("deep/nested/missing.png")),
        Quality::default(),
    );

    assert_eq!(outcome, ConversionOutcome::Failed(FailureReason::MissingSource));
    assert!(!tmp.path().join("deep").exists());
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn unsupported_extension_is_not_probed() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    // A real JPEG hiding behind a .gif name is still ineligible
    let source = tmp.path().join("file.gif");
    write_jpeg(&source, 16, 16);
    let cache = DerivativeCache::with_converter(
        CountingConverter::new(true),
        &DerivativesConfig::default(),
    );

    let outcome = cache.get_or_create(&SourceImageRef::new(&source), Quality::default());

    assert_eq!(outcome, ConversionOutcome::Unsupported);
    assert_eq!(cache.converter().converts.load(Ordering::SeqCst), 0);
}

#[test]
fn concurrent_requests_never_expose_partial_file() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("large.jpg");
    let derivative = tmp.path().join("large.webp");
    write_jpeg(&source, 640, 480);
    let cache = DerivativeCache::new(&DerivativesConfig::default());
    let barrier = Barrier::new(3);
    let writers_done = AtomicBool::new(false);

    let (cache, barrier, writers_done) = (&cache, &barrier, &writers_done);
    let (source, derivative) = (source.as_path(), derivative.as_path());

    let (outcomes, reads) = thread::scope(|s| {
        let writers: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(move || {
                    barrier.wait();
                    cache.get_or_create(&SourceImageRef::new(source), Quality::default())
                })
            })
            .collect();

        let reader = s.spawn(move || {
            barrier.wait();
            let check = |bytes: &[u8]| {
                image::load_from_memory_with_format(bytes, ImageFormat::WebP)
                    .expect("reader observed a partial derivative");
            };
            let mut reads = 0usize;
            while !writers_done.load(Ordering::SeqCst) {
                if let Ok(bytes) = fs::read(derivative) {
                    check(&bytes);
                    reads += 1;
                }
            }
            // One read after both writers returned, so the file is always checked
            check(&fs::read(derivative).expect("derivative missing after writers finished"));
            reads + 1
        });

        let outcomes: Vec<_> = writers.into_iter().map(|w| w.join().unwrap()).collect();
        writers_done.store(true, Ordering::SeqCst);
        (outcomes, reader.join().unwrap())
    });

    for outcome in &outcomes {
        assert!(
            matches!(
                outcome,
                ConversionOutcome::Created(_) | ConversionOutcome::AlreadyExists(_)
            ),
            "unexpected outcome {outcome:?}"
        );
        assert_eq!(outcome.derivative().unwrap().path(), derivative);
    }
    let decoded = image::open(derivative).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (640, 480));
    assert!(leftover_temp_files(tmp.path()).is_empty());
    assert!(reads > 0);
}

#[test]
fn avif_derivatives_when_configured() {
    init_tracing();
    let converter = RustConverter::new();
    if !converter.supports(DerivativeFormat::Avif) {
        return;
    }
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("photo.jpg");
    write_jpeg(&source, 64, 64);
    let config = DerivativesConfig {
        format: DerivativeFormat::Avif,
        ..DerivativesConfig::default()
    };
    let cache = DerivativeCache::with_converter(converter, &config);

    let outcome = cache.get_or_create(&SourceImageRef::new(&source), Quality::new(60));

    let derivative = outcome.derivative().unwrap();
    assert_eq!(derivative.path(), tmp.path().join("photo.avif"));
    assert_eq!(derivative.format(), DerivativeFormat::Avif);
    let bytes = fs::read(derivative.path()).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Avif);
}
