//! Decoded block atlas images.

use anyhow::{ensure, Context};

use crate::engine_state::voxels::voxel::block_type::ATLAS_TILES;

/// Path of the atlas, relative to the working directory on native and to the
/// page origin on the web.
pub const ATLAS_PATH: &str = "assets/textures/atlas.png";

/// Color bound before the atlas arrives.
pub const PLACEHOLDER_PIXEL: [u8; 4] = [0, 0, 255, 255];

/// An RGBA8 image ready for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtlasImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl AtlasImage {
    /// The 1×1 image shown until the real atlas is loaded.
    pub fn placeholder() -> Self {
        AtlasImage {
            width: 1,
            height: 1,
            rgba: PLACEHOLDER_PIXEL.to_vec(),
        }
    }

    /// Decodes a PNG atlas.
    ///
    /// # Returns
    /// An error if the bytes are not a PNG or the width does not split into
    /// whole tiles.
    pub fn decode_png(bytes: &[u8]) -> anyhow::Result<Self> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .context("Atlas is not a valid PNG")?
            .to_rgba8();
        let (width, height) = image.dimensions();
        ensure!(
            width > 0 && height > 0 && width % ATLAS_TILES == 0,
            "Atlas is {width}x{height}, width must be a positive multiple of {ATLAS_TILES}"
        );

        Ok(AtlasImage {
            width,
            height,
            rgba: image.into_raw(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_fn(width, height, |x, _| image::Rgba([x as u8, 0, 0, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn decodes_tiled_png() {
        let atlas = AtlasImage::decode_png(&encode_png(8, 2)).unwrap();
        assert_eq!((atlas.width, atlas.height), (8, 2));
        assert_eq!(atlas.rgba.len(), 8 * 2 * 4);
        assert_eq!(&atlas.rgba[4..8], &[1, 0, 0, 255]);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(AtlasImage::decode_png(b"not a png").is_err());
        assert!(AtlasImage::decode_png(&encode_png(6, 2)).is_err());
    }

    #[test]
    fn placeholder_is_one_blue_pixel() {
        let placeholder = AtlasImage::placeholder();
        assert_eq!((placeholder.width, placeholder.height), (1, 1));
        assert_eq!(placeholder.rgba, PLACEHOLDER_PIXEL.to_vec());
    }
}
