use std::path::Path;

use anyhow::Context;
use image::GenericImageView;

/// Decoded RGBA8 pixels of an image file, shared between every node that
/// references the same path.
#[derive(Debug)]
pub struct TextureData {
    pub path: String,
    image: image::RgbaImage,
}

impl TextureData {
    pub fn new(path: impl Into<String>, image: image::RgbaImage) -> Self {
        Self {
            path: path.into(),
            image,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/// Decode `bytes` into RGBA8. The file extension of `file_name` is used as a
/// format hint when it is one the image crate knows; otherwise the format is guessed.
pub fn decode_texture(file_name: &str, bytes: &[u8]) -> anyhow::Result<TextureData> {
    let hint = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(image::ImageFormat::from_extension);
    let img = match hint {
        Some(format) => image::load_from_memory_with_format(bytes, format),
        None => image::load_from_memory(bytes),
    }
    .with_context(|| format!("could not decode image {file_name}"))?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        anyhow::bail!("image {file_name} is empty");
    }
    Ok(TextureData::new(file_name, img.to_rgba8()))
}
