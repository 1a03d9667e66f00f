//! 16-bit RGB images for Hald tables.
//!
//! Hald tables only need the RGB channels of an image at full precision.
//! Decoding goes through the [`ImageLoader`] trait; [`PngLoader`] covers the
//! format Hald tables are distributed in.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::{LutError, LutResult};

/// Decoded image: `width * height` interleaved RGB samples on the 0..65535 scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rgb16Image {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `r g b` per pixel, row-major.
    pub data: Vec<u16>,
}

impl Rgb16Image {
    /// Identity Hald image of the given level (side `level^3`).
    ///
    /// Pixel `r + g*N + b*N^2` with `N = level^2` holds the color
    /// `(r, g, b) * 65535 / (N - 1)`.
    pub fn identity_hald(level: u32) -> Self {
        let n = (level * level) as usize;
        let side = level * level * level;
        let scale = 65535.0 / (n - 1) as f64;
        let mut data = Vec::with_capacity(n * n * n * 3);
        for b in 0..n {
            for g in 0..n {
                for r in 0..n {
                    for c in [r, g, b] {
                        data.push((c as f64 * scale).round() as u16);
                    }
                }
            }
        }
        Self {
            width: side,
            height: side,
            data,
        }
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Decodes images into 16-bit RGB.
pub trait ImageLoader: Send + Sync {
    /// Loads the image at `path`. 8-bit sources are widened by 257.
    fn load(&self, path: &Path) -> LutResult<Rgb16Image>;
}

/// [`ImageLoader`] for PNG files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngLoader;

impl ImageLoader for PngLoader {
    fn load(&self, path: &Path) -> LutResult<Rgb16Image> {
        let file = File::open(path)?;
        let mut decoder = png::Decoder::new(BufReader::new(file));
        decoder.set_transformations(png::Transformations::EXPAND);
        let mut reader = decoder.read_info()?;

        let buf_size = reader
            .output_buffer_size()
            .ok_or_else(|| LutError::UnsupportedFormat("cannot determine PNG buffer size".into()))?;
        let mut buf = vec![0u8; buf_size];
        let info = reader.next_frame(&mut buf)?;
        let bytes = &buf[..info.buffer_size()];

        let channels = match info.color_type {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            other => {
                return Err(LutError::UnsupportedFormat(format!("PNG color type {other:?}")));
            }
        };
        let samples: Vec<u16> = match info.bit_depth {
            png::BitDepth::Eight => bytes.iter().map(|&v| v as u16 * 257).collect(),
            png::BitDepth::Sixteen => bytes
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect(),
            other => {
                return Err(LutError::UnsupportedFormat(format!("PNG bit depth {other:?}")));
            }
        };

        let data = samples
            .chunks_exact(channels)
            .flat_map(|px| match channels {
                1 | 2 => [px[0]; 3],
                _ => [px[0], px[1], px[2]],
            })
            .collect();

        Ok(Rgb16Image {
            width: info.width,
            height: info.height,
            data,
        })
    }
}

/// Writes a 16-bit RGB PNG.
pub fn write_png16(path: &Path, image: &Rgb16Image) -> LutResult<()> {
    if image.data.len() != image.pixel_count() * 3 {
        return Err(LutError::InvalidSize(format!(
            "{} samples for a {}x{} RGB image",
            image.data.len(),
            image.width,
            image.height
        )));
    }
    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(writer, image.width, image.height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Sixteen);

    let encode_err = |e: png::EncodingError| LutError::UnsupportedFormat(e.to_string());
    let mut png_writer = encoder.write_header().map_err(encode_err)?;
    let bytes: Vec<u8> = image.data.iter().flat_map(|v| v.to_be_bytes()).collect();
    png_writer.write_image_data(&bytes).map_err(encode_err)?;
    png_writer.finish().map_err(encode_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_hald_corners() {
        let img = Rgb16Image::identity_hald(2);
        assert_eq!((img.width, img.height), (8, 8));
        assert_eq!(img.data.len(), 64 * 3);
        assert_eq!(&img.data[..3], &[0, 0, 0]);
        assert_eq!(&img.data[3..6], &[21845, 0, 0]);
        assert_eq!(&img.data[63 * 3..], &[65535, 65535, 65535]);
    }

    #[test]
    fn test_png_16bit_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hald.png");
        let img = Rgb16Image::identity_hald(2);
        write_png16(&path, &img).unwrap();
        assert_eq!(PngLoader.load(&path).unwrap(), img);
    }

    #[test]
    fn test_png_8bit_is_widened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgba8.png");
        {
            let file = File::create(&path).unwrap();
            let mut enc = png::Encoder::new(BufWriter::new(file), 1, 1);
            enc.set_color(png::ColorType::Rgba);
            enc.set_depth(png::BitDepth::Eight);
            let mut w = enc.write_header().unwrap();
            w.write_image_data(&[255, 128, 0, 7]).unwrap();
        }
        let img = PngLoader.load(&path).unwrap();
        assert_eq!(img.data, vec![65535, 128 * 257, 0]);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            PngLoader.load(Path::new("/nonexistent/hald.png")),
            Err(LutError::Io(_))
        ));
    }
}
