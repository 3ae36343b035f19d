//! # Unique Face ID Codec
//!
//! Maps face ids onto the channels of a color target and back. The id is split
//! positionally across the channels with red the most significant and alpha the
//! least, using as many bits per channel as the target format stores.

use anyhow::{bail, ensure};
use wgpu::TextureFormat;

use crate::engine_state::voxels::voxel::FaceId;

/// Bit depth of each channel of a render target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelBits {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub alpha: u32,
}

impl ChannelBits {
    pub const RGBA8: ChannelBits = ChannelBits {
        red: 8,
        green: 8,
        blue: 8,
        alpha: 8,
    };

    /// Reads the channel depths of a pick target format.
    ///
    /// Only formats whose stored values survive the round trip exactly are
    /// accepted, which excludes sRGB encodings.
    pub fn from_format(format: TextureFormat) -> anyhow::Result<Self> {
        match format {
            TextureFormat::Rgba8Unorm => Ok(Self::RGBA8),
            other => bail!("{other:?} cannot carry face ids"),
        }
    }

    pub fn total(&self) -> u32 {
        self.red + self.green + self.blue + self.alpha
    }
}

/// Encodes face ids as flat colors and decodes read-back pixels.
#[derive(Copy, Clone, Debug)]
pub struct ColorIdCodec {
    bits: ChannelBits,
    /// `2^bits` per channel, in RGBA order.
    scale: [u64; 4],
    shift_r: u64,
    shift_g: u64,
    shift_b: u64,
    capacity: u64,
}

impl ColorIdCodec {
    /// Builds the codec for the given channel depths.
    ///
    /// # Returns
    /// An error if the channels hold more than 32 bits in total.
    pub fn new(bits: ChannelBits) -> anyhow::Result<Self> {
        ensure!(
            bits.total() <= 32,
            "Pick target channels hold {} bits, at most 32 are supported",
            bits.total()
        );

        let pow = |exp: u32| 1u64 << exp;
        Ok(ColorIdCodec {
            bits,
            scale: [pow(bits.red), pow(bits.green), pow(bits.blue), pow(bits.alpha)],
            shift_r: pow(bits.green + bits.blue + bits.alpha),
            shift_g: pow(bits.blue + bits.alpha),
            shift_b: pow(bits.alpha),
            capacity: pow(bits.total()),
        })
    }

    /// Number of distinct ids the target can carry, including 0.
    #[cfg(test)]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Splits `id` into raw channel values.
    pub fn channels(&self, id: FaceId) -> anyhow::Result<[u32; 4]> {
        ensure!(
            id < self.capacity,
            "Face id {id} does not fit in {} pick bits",
            self.bits.total()
        );

        let [_, scale_g, scale_b, scale_a] = self.scale;
        Ok([
            (id / self.shift_r) as u32,
            ((id / self.shift_g) % scale_g) as u32,
            ((id / self.shift_b) % scale_b) as u32,
            (id % scale_a) as u32,
        ])
    }

    /// Encodes `id` as a normalized color for the flat-color shader.
    pub fn encode(&self, id: FaceId) -> anyhow::Result<[f32; 4]> {
        let channels = self.channels(id)?;
        Ok(std::array::from_fn(|i| {
            let max = self.scale[i] - 1;
            if max == 0 {
                0.0
            } else {
                channels[i] as f32 / max as f32
            }
        }))
    }

    /// Encodes `id` as raw 8-bit channel values.
    #[cfg(test)]
    pub fn encode_bytes(&self, id: FaceId) -> anyhow::Result<[u8; 4]> {
        let channels = self.channels(id)?;
        let mut bytes = [0u8; 4];
        for (byte, value) in bytes.iter_mut().zip(channels) {
            *byte = u8::try_from(value)?;
        }
        Ok(bytes)
    }

    /// Reassembles an id from raw channel values.
    pub fn decode(&self, r: u32, g: u32, b: u32, a: u32) -> FaceId {
        r as u64 * self.shift_r + g as u64 * self.shift_g + b as u64 * self.shift_b + a as u64
    }

    pub fn decode_rgba8(&self, pixel: [u8; 4]) -> FaceId {
        let [r, g, b, a] = pixel;
        self.decode(r.into(), g.into(), b.into(), a.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn rgba8() -> ColorIdCodec {
        ColorIdCodec::new(ChannelBits::RGBA8).unwrap()
    }

    #[test]
    fn derived_values() {
        let codec = rgba8();
        assert_eq!(codec.capacity(), 1 << 32);
        assert_eq!(codec.shift_r, 1 << 24);
        assert_eq!(codec.shift_g, 1 << 16);
        assert_eq!(codec.shift_b, 1 << 8);
    }

    #[test]
    fn round_trip_in_range() {
        let codec = rgba8();
        for id in [0, 1, 255, 256, 65_535, 1_000_003, 0xDEAD_BEEF, u32::MAX as u64] {
            let bytes = codec.encode_bytes(id).unwrap();
            assert_eq!(codec.decode_rgba8(bytes), id);
        }
    }

    #[test]
    fn red_is_most_significant() {
        let codec = rgba8();
        assert_eq!(codec.encode_bytes(1).unwrap(), [0, 0, 0, 1]);
        assert_eq!(codec.encode_bytes(0x0102_0304).unwrap(), [1, 2, 3, 4]);
    }

    #[test]
    fn normalized_colors_quantize_back() {
        let codec = rgba8();
        let id = 0x00AB_CD12;
        let color = codec.encode(id).unwrap();
        let bytes = color.map(|c| (c * 255.0).round() as u8);
        assert_eq!(codec.decode_rgba8(bytes), id);
        assert_approx_eq!(color[1], 0xAB as f32 / 255.0);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let codec = ColorIdCodec::new(ChannelBits {
            red: 4,
            green: 4,
            blue: 4,
            alpha: 0,
        })
        .unwrap();
        assert_eq!(codec.capacity(), 4096);
        assert!(codec.encode(4095).is_ok());
        assert!(codec.encode(4096).is_err());
        assert!(codec.encode_bytes(u64::MAX).is_err());
    }

    #[test]
    fn zero_bit_channel_encodes_zero() {
        let codec = ColorIdCodec::new(ChannelBits {
            red: 8,
            green: 8,
            blue: 8,
            alpha: 0,
        })
        .unwrap();
        let color = codec.encode(0x0001_0203).unwrap();
        assert_approx_eq!(color[3], 0.0);
        let bytes = codec.encode_bytes(0x0001_0203).unwrap();
        assert_eq!(bytes, [1, 2, 3, 0]);
        assert_eq!(codec.decode_rgba8(bytes), 0x0001_0203);
    }

    #[test]
    fn formats() {
        assert_eq!(
            ChannelBits::from_format(TextureFormat::Rgba8Unorm).unwrap(),
            ChannelBits::RGBA8
        );
        assert!(ChannelBits::from_format(TextureFormat::Rgba8UnormSrgb).is_err());
        assert!(ColorIdCodec::new(ChannelBits {
            red: 16,
            green: 16,
            blue: 8,
            alpha: 0
        })
        .is_err());
    }
}
