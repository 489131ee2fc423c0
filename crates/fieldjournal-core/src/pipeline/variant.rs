//! Image variant generation: AI proxy, square thumbnails and previews.
//!
//! Every entry point degrades instead of failing: if the buffer cannot be
//! decoded or encoded, the original bytes come back with a zero reduction so
//! enrichment never blocks an upload.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageResult};
use std::sync::Arc;

use crate::config::VariantConfig;

/// Resize bounds and encoder quality for a fit-inside variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality, 1-100
    pub quality: u8,
}

/// An encoded variant and its size metrics.
#[derive(Debug, Clone)]
pub struct Variant {
    pub data: Vec<u8>,
    /// Output width, 0 when degraded
    pub width: u32,
    /// Output height, 0 when degraded
    pub height: u32,
    pub original_size: usize,
    pub variant_size: usize,
    /// `round((1 - variant/original) * 100)`; negative if the variant grew
    pub reduction_percent: i32,
    /// True when the original bytes were returned unchanged
    pub degraded: bool,
}

impl Variant {
    fn encoded(data: Vec<u8>, width: u32, height: u32, original_size: usize) -> Self {
        let variant_size = data.len();
        Self {
            reduction_percent: reduction_percent(original_size, variant_size),
            data,
            width,
            height,
            original_size,
            variant_size,
            degraded: false,
        }
    }

    fn passthrough(original: &[u8]) -> Self {
        Self {
            data: original.to_vec(),
            width: 0,
            height: 0,
            original_size: original.len(),
            variant_size: original.len(),
            reduction_percent: 0,
            degraded: true,
        }
    }

    /// MIME type of `data`: JPEG unless degraded.
    pub fn mime_type<'a>(&self, original_mime: &'a str) -> &'a str {
        if self.degraded {
            original_mime
        } else {
            "image/jpeg"
        }
    }
}

/// Thumbnail, preview and AI proxy for one upload.
#[derive(Debug, Clone)]
pub struct ImageSet {
    pub thumbnail: Variant,
    pub preview: Variant,
    pub proxy: Variant,
}

/// Size reduction as a signed whole percentage.
pub fn reduction_percent(original_size: usize, variant_size: usize) -> i32 {
    if original_size == 0 {
        return 0;
    }
    ((1.0 - variant_size as f64 / original_size as f64) * 100.0).round() as i32
}

/// Fit-inside dimensions: never enlarges, preserves aspect ratio.
///
/// Width is bounded first, then height is re-checked against the original
/// aspect ratio.
pub fn fit_inside(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let (w, h) = (width as f64, height as f64);
    let mut new_width = width;
    let mut new_height = height;

    if width > max_width {
        new_width = max_width;
        new_height = (h / w * max_width as f64).round() as u32;
    }
    if new_height > max_height {
        new_height = max_height;
        new_width = (w / h * max_height as f64).round() as u32;
    }
    (new_width.max(1), new_height.max(1))
}

/// Generates image variants from raw upload buffers.
#[derive(Debug, Clone)]
pub struct VariantGenerator {
    config: VariantConfig,
}

impl Default for VariantGenerator {
    fn default() -> Self {
        Self::new(VariantConfig::default())
    }
}

impl VariantGenerator {
    pub fn new(config: VariantConfig) -> Self {
        Self { config }
    }

    /// AI proxy options from configuration.
    pub fn proxy_options(&self) -> VariantOptions {
        VariantOptions {
            max_width: self.config.proxy_max_width,
            max_height: self.config.proxy_max_height,
            quality: self.config.proxy_quality,
        }
    }

    /// Fit-inside resize and JPEG encode. Returns the original on failure.
    pub fn create_variant(&self, data: &[u8], options: VariantOptions) -> Variant {
        match image::load_from_memory(data).and_then(|img| encode_fit(&img, options, data.len())) {
            Ok(variant) => variant,
            Err(e) => {
                tracing::warn!("Variant generation failed, using original: {e}");
                Variant::passthrough(data)
            }
        }
    }

    /// Square center-cropped ("cover") JPEG. Returns the original on failure.
    pub fn create_thumbnail(&self, data: &[u8], size: u32, quality: u8) -> Variant {
        match image::load_from_memory(data).and_then(|img| encode_cover(&img, size, quality, data.len()))
        {
            Ok(variant) => variant,
            Err(e) => {
                tracing::warn!("Thumbnail creation failed, using original: {e}");
                Variant::passthrough(data)
            }
        }
    }

    /// Grid thumbnail with configured size and quality.
    pub fn grid_thumbnail(&self, data: &[u8]) -> Variant {
        self.create_thumbnail(data, self.config.thumbnail_size, self.config.thumbnail_quality)
    }

    /// Thumbnail, preview and AI proxy, encoded concurrently on the blocking pool.
    ///
    /// The source is decoded once and shared by the three encoders.
    pub async fn create_image_set(&self, data: Arc<Vec<u8>>) -> ImageSet {
        let decode_src = Arc::clone(&data);
        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&decode_src)).await;

        let img = match decoded {
            Ok(Ok(img)) => Arc::new(img),
            Ok(Err(e)) => {
                tracing::warn!("Image set decode failed, using original for all variants: {e}");
                return self.passthrough_set(&data);
            }
            Err(e) => {
                tracing::warn!("Image set decode task failed: {e}");
                return self.passthrough_set(&data);
            }
        };

        let original_size = data.len();
        let cfg = self.config.clone();
        let proxy_options = self.proxy_options();

        let thumb_img = Arc::clone(&img);
        let preview_img = Arc::clone(&img);
        let proxy_img = img;

        let (thumbnail, preview, proxy) = tokio::join!(
            tokio::task::spawn_blocking(move || {
                encode_cover(&thumb_img, cfg.thumbnail_size, cfg.thumbnail_quality, original_size)
            }),
            tokio::task::spawn_blocking(move || {
                encode_cover(&preview_img, cfg.preview_size, cfg.preview_quality, original_size)
            }),
            tokio::task::spawn_blocking(move || encode_fit(&proxy_img, proxy_options, original_size)),
        );

        let settle = |result: Result<ImageResult<Variant>, tokio::task::JoinError>, what: &str| match result {
            Ok(Ok(variant)) => variant,
            Ok(Err(e)) => {
                tracing::warn!("{what} encode failed, using original: {e}");
                Variant::passthrough(&data)
            }
            Err(e) => {
                tracing::warn!("{what} task failed, using original: {e}");
                Variant::passthrough(&data)
            }
        };

        ImageSet {
            thumbnail: settle(thumbnail, "Thumbnail"),
            preview: settle(preview, "Preview"),
            proxy: settle(proxy, "AI proxy"),
        }
    }

    fn passthrough_set(&self, data: &[u8]) -> ImageSet {
        ImageSet {
            thumbnail: Variant::passthrough(data),
            preview: Variant::passthrough(data),
            proxy: Variant::passthrough(data),
        }
    }
}

fn encode_fit(img: &DynamicImage, options: VariantOptions, original_size: usize) -> ImageResult<Variant> {
    let (width, height) = fit_inside(img.width(), img.height(), options.max_width, options.max_height);
    let resized = if (width, height) == (img.width(), img.height()) {
        None
    } else {
        Some(img.resize_exact(width, height, FilterType::Triangle))
    };
    let out = resized.as_ref().unwrap_or(img);
    let data = encode_jpeg(out, options.quality)?;
    Ok(Variant::encoded(data, width, height, original_size))
}

fn encode_cover(img: &DynamicImage, size: u32, quality: u8, original_size: usize) -> ImageResult<Variant> {
    let cropped = img.resize_to_fill(size, size, FilterType::Triangle);
    let data = encode_jpeg(&cropped, quality)?;
    Ok(Variant::encoded(data, cropped.width(), cropped.height(), original_size))
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)?;
    Ok(buf)
}
