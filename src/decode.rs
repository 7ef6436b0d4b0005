//! Two-phase bounded image decoding
//!
//! 1. Probe the header for the native dimensions without touching pixels.
//! 2. Pick the largest power-of-two subsample factor that keeps the result at
//!    least as large as the requested target in both dimensions.
//! 3. Decode with that factor applied, into an RGBA8 buffer.

use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;
use tracing::debug;

use crate::config::DecodeConfig;
use crate::errors::{LoaderError, LoaderResult};

/// An immutable decoded RGBA8 pixel buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    sample_factor: u32,
}

impl DecodedImage {
    /// Wrap raw RGBA8 pixels
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels,
            sample_factor: 1,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Power-of-two factor the source was reduced by
    pub fn sample_factor(&self) -> u32 {
        self.sample_factor
    }

    /// Memory footprint of the pixel data in bytes
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    /// Pixel at (x, y), if in bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize * self.width as usize) + x as usize) * 4;
        self.pixels
            .get(idx..idx + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Requested output size for a decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Resolve the decode target for a request.
    ///
    /// Explicit sizes win. Otherwise width comes from the target's measured
    /// width (falling back to a third of the display width) and height from
    /// the measured height (falling back to the configured fixed height).
    pub fn resolve(
        requested_width: Option<u32>,
        requested_height: Option<u32>,
        measured: Option<(u32, u32)>,
        config: &DecodeConfig,
    ) -> Self {
        let measured_width = measured.map(|(w, _)| w).filter(|w| *w > 0);
        let measured_height = measured.map(|(_, h)| h).filter(|h| *h > 0);

        let width = requested_width
            .filter(|w| *w > 0)
            .or(measured_width)
            .unwrap_or(config.display_width / 3);
        let height = requested_height
            .filter(|h| *h > 0)
            .or(measured_height)
            .unwrap_or(config.fallback_height);

        Self::new(width, height)
    }
}

/// Largest power of two such that `native / factor` stays at least `target`
/// in both dimensions. Never less than 1.
pub fn subsample_factor(native_width: u32, native_height: u32, target: TargetSize) -> u32 {
    let target_width = target.width.max(1);
    let target_height = target.height.max(1);
    let mut factor: u32 = 1;

    if native_width > target_width || native_height > target_height {
        let half_width = native_width / 2;
        let half_height = native_height / 2;
        while half_width / factor >= target_width && half_height / factor >= target_height {
            match factor.checked_mul(2) {
                Some(next) => factor = next,
                None => break,
            }
        }
    }

    factor
}

/// Read only the image header and return its native dimensions
pub fn probe_dimensions(bytes: &[u8], locator: &str) -> LoaderResult<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| LoaderError::decode(locator, e.to_string()))?
        .into_dimensions()
        .map_err(|e| LoaderError::decode(locator, e.to_string()))
}

/// Probe, compute the subsample factor, then decode into a buffer roughly
/// the size of `target`.
///
/// PNG and JPEG apply the factor while decoding, so peak memory tracks the
/// output size rather than the source size. Interlaced or unusual PNGs,
/// CMYK/16-bit JPEGs and other formats fall back to a full decode followed
/// by a reduction.
pub fn decode_subsampled(
    bytes: &[u8],
    target: TargetSize,
    locator: &str,
) -> LoaderResult<DecodedImage> {
    let (native_width, native_height) = probe_dimensions(bytes, locator)?;
    let factor = subsample_factor(native_width, native_height, target);
    let out = OutputSize {
        width: (native_width / factor).max(1),
        height: (native_height / factor).max(1),
    };

    let streamed = match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => decode_png_rows(bytes, factor, out, locator)?,
        Ok(ImageFormat::Jpeg) => decode_jpeg_scaled(bytes, factor, out, locator)?,
        _ => None,
    };
    let pixels = match streamed {
        Some(pixels) => pixels,
        None => {
            debug!("Full decode fallback for {}", locator);
            decode_full(bytes, out, locator)?
        }
    };

    debug!(
        "Decoded {} {}x{} -> {}x{} (factor {})",
        locator, native_width, native_height, out.width, out.height, factor
    );

    Ok(DecodedImage {
        width: out.width,
        height: out.height,
        pixels,
        sample_factor: factor,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OutputSize {
    width: u32,
    height: u32,
}

impl OutputSize {
    fn rgba_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Stream PNG rows, keeping every `factor`-th row and column. Only one source
/// row is held at a time.
fn decode_png_rows(
    bytes: &[u8],
    factor: u32,
    out: OutputSize,
    locator: &str,
) -> LoaderResult<Option<Vec<u8>>> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| LoaderError::decode(locator, e.to_string()))?;

    if reader.info().interlaced {
        return Ok(None);
    }
    let channels = match reader.output_color_type().0 {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        png::ColorType::Indexed => return Ok(None),
    };

    let factor = factor as usize;
    let out_width = out.width as usize;
    let kept_rows = out.height as usize * factor;
    let mut pixels = Vec::with_capacity(out.rgba_len());
    let mut y = 0usize;

    while y < kept_rows {
        let Some(row) = reader
            .next_row()
            .map_err(|e| LoaderError::decode(locator, e.to_string()))?
        else {
            break;
        };
        if y % factor == 0 {
            let data = row.data();
            for x in 0..out_width {
                let start = x * factor * channels;
                let Some(px) = data.get(start..start + channels) else {
                    return Err(LoaderError::decode(locator, "PNG row shorter than its header width"));
                };
                pixels.extend_from_slice(&to_rgba(px));
            }
        }
        y += 1;
    }

    if pixels.len() != out.rgba_len() {
        return Err(LoaderError::decode(locator, "PNG ended before all rows were read"));
    }
    Ok(Some(pixels))
}

/// Decode a JPEG with DCT scaling (down to 1/8), then finish any remaining
/// reduction on the already-small buffer
fn decode_jpeg_scaled(
    bytes: &[u8],
    factor: u32,
    out: OutputSize,
    locator: &str,
) -> LoaderResult<Option<Vec<u8>>> {
    let jpeg_error = |e: jpeg_decoder::Error| LoaderError::decode(locator, e.to_string());

    let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(bytes));
    decoder.read_info().map_err(jpeg_error)?;
    let Some(info) = decoder.info() else {
        return Ok(None);
    };

    let scale = factor.min(8) as u16;
    let (scaled_width, scaled_height) = decoder
        .scale(
            (info.width / scale).max(1),
            (info.height / scale).max(1),
        )
        .map_err(jpeg_error)?;
    let raw = decoder.decode().map_err(jpeg_error)?;
    let Some(info) = decoder.info() else {
        return Ok(None);
    };

    let area = scaled_width as usize * scaled_height as usize;
    let rgba = match info.pixel_format {
        jpeg_decoder::PixelFormat::L8 if raw.len() == area => {
            raw.iter().flat_map(|&g| [g, g, g, 255]).collect::<Vec<u8>>()
        }
        jpeg_decoder::PixelFormat::RGB24 if raw.len() == area * 3 => raw
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect::<Vec<u8>>(),
        _ => return Ok(None),
    };
    drop(raw);

    if (u32::from(scaled_width), u32::from(scaled_height)) == (out.width, out.height) {
        return Ok(Some(rgba));
    }

    let scaled = RgbaImage::from_raw(u32::from(scaled_width), u32::from(scaled_height), rgba)
        .ok_or_else(|| LoaderError::decode(locator, "scaled JPEG buffer size mismatch"))?;
    let reduced = DynamicImage::ImageRgba8(scaled).thumbnail_exact(out.width, out.height);
    Ok(Some(reduced.into_rgba8().into_raw()))
}

/// Last resort: decode at native size, then reduce
fn decode_full(bytes: &[u8], out: OutputSize, locator: &str) -> LoaderResult<Vec<u8>> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| LoaderError::decode(locator, e.to_string()))?
        .decode()
        .map_err(|e| LoaderError::decode(locator, e.to_string()))?;

    let image = if (image.width(), image.height()) == (out.width, out.height) {
        image
    } else {
        image.thumbnail_exact(out.width, out.height)
    };
    Ok(image.into_rgba8().into_raw())
}

fn to_rgba(px: &[u8]) -> [u8; 4] {
    match *px {
        [g] => [g, g, g, 255],
        [g, a] => [g, g, g, a],
        [r, g, b] => [r, g, b, 255],
        [r, g, b, a, ..] => [r, g, b, a],
        [] => [0, 0, 0, 0],
    }
}
