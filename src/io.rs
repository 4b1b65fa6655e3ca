use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{DynamicImage, ImageEncoder, ImageError, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Quality used for JPEG output.
pub const JPEG_QUALITY: u8 = 90;

#[derive(Debug)]
pub enum CanvasError {
    /// The bytes could not be decoded as a supported raster image
    Decode(ImageError),
    /// The buffer could not be encoded in the requested format
    Encode(ImageError),
    Io(std::io::Error),
    /// A font file was not a usable TTF/OTF face
    Font(String),
}

impl std::fmt::Display for CanvasError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CanvasError::Decode(e) => write!(f, "Decode error: {}", e),
            CanvasError::Encode(e) => write!(f, "Encode error: {}", e),
            CanvasError::Io(e) => write!(f, "I/O error: {}", e),
            CanvasError::Font(e) => write!(f, "Invalid font: {}", e),
        }
    }
}

impl std::error::Error for CanvasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CanvasError::Decode(e) | CanvasError::Encode(e) => Some(e),
            CanvasError::Io(e) => Some(e),
            CanvasError::Font(_) => None,
        }
    }
}

impl From<std::io::Error> for CanvasError {
    fn from(e: std::io::Error) -> Self {
        CanvasError::Io(e)
    }
}

/// Raster formats the canvas can be exported to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Tga,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
        }
    }

    /// Parse a format name or file extension (case-insensitive).
    pub fn from_name(name: &str) -> Option<SaveFormat> {
        match name.trim().trim_start_matches('.').to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "bmp" => Some(SaveFormat::Bmp),
            "tga" => Some(SaveFormat::Tga),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<SaveFormat> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(SaveFormat::from_name)
    }

    /// An explicit hint wins, then the file extension, then PNG.
    pub fn resolve(hint: Option<SaveFormat>, path: &Path) -> SaveFormat {
        hint.or_else(|| SaveFormat::from_path(path)).unwrap_or_default()
    }
}

/// Decode an in-memory encoded image into straight-alpha RGBA.
pub fn decode_bytes(bytes: &[u8]) -> Result<RgbaImage, CanvasError> {
    let img = image::load_from_memory(bytes).map_err(CanvasError::Decode)?;
    Ok(img.to_rgba8())
}

/// Read and decode an image file.
pub fn read_image(path: &Path) -> Result<RgbaImage, CanvasError> {
    let bytes = std::fs::read(path)?;
    decode_bytes(&bytes)
}

/// Encode `image` as `format` into any writer.
pub fn encode<W: Write>(image: &RgbaImage, format: SaveFormat, writer: &mut W) -> Result<(), CanvasError> {
    let (w, h) = image.dimensions();
    let result = match format {
        SaveFormat::Png => {
            PngEncoder::new(&mut *writer).write_image(image.as_raw(), w, h, image::ColorType::Rgba8)
        }
        SaveFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut *writer, JPEG_QUALITY);
            encoder.encode(rgb_image.as_raw(), w, h, image::ColorType::Rgb8)
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut *writer);
            encoder.encode(image.as_raw(), w, h, image::ColorType::Rgba8)
        }
        SaveFormat::Tga => {
            TgaEncoder::new(&mut *writer).encode(image.as_raw(), w, h, image::ColorType::Rgba8)
        }
    };
    result.map_err(CanvasError::Encode)
}

/// Encode into a fresh byte vector.
pub fn encode_to_vec(image: &RgbaImage, format: SaveFormat) -> Result<Vec<u8>, CanvasError> {
    let mut out = Vec::new();
    encode(image, format, &mut out)?;
    Ok(out)
}

/// Encode and write an image to a file.
pub fn encode_and_write(image: &RgbaImage, path: &Path, format: SaveFormat) -> Result<(), CanvasError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode(image, format, &mut writer)?;
    writer.flush()?;
    Ok(())
}
