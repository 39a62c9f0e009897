//! Materials (`.mat`)
//!
//! A material is either a set of flat colors (cels pointing into the palette) or a set of
//! texture frames. Texture pixels are palette indices or direct colors described by the
//! header's color format. Only the first mip level of each frame is decoded.

use crate::{cmp::read_block, cmp::ColorMap, ContentError, ContentResult};
use holocron_proc::{ext_repr, PackedData};
use holocron_utils::{color::RGBA8, packed::PackedReadExt, string_as_u32, AsciiDisplay, EnumParseError};
use log::*;
use rayon::prelude::*;
use std::io::{self, Read};

pub const MAT_MAGIC: u32 = string_as_u32("MAT ");

/// Size of the swatch generated for every color cel
pub const COLOR_SWATCH_SIZE: u32 = 64;

/// Textures bigger than this are assumed to come from a corrupt header
pub const MAX_TEXTURE_SIZE: u32 = 4096;

#[ext_repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PackedData)]
#[parse_as(u32)]
pub enum MaterialKind {
    Color = 0,
    Texture = 2,
}

#[ext_repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PackedData)]
#[parse_as(u32)]
pub enum ColorMode {
    Indexed = 0,
    Rgb = 1,
    Rgba = 2,
}

/// Layout of a direct color pixel. Each channel is `(pixel >> shift) & mask(bits)`, then
/// shifted left by its expand value to fill 8 bits.
#[derive(Debug, Clone, PartialEq, PackedData)]
pub struct ColorFormat {
    pub mode: ColorMode,
    pub bits_per_pixel: u32,
    pub red_bits: u32,
    pub green_bits: u32,
    pub blue_bits: u32,
    pub red_shift: u32,
    pub green_shift: u32,
    pub blue_shift: u32,
    pub red_expand: u32,
    pub green_expand: u32,
    pub blue_expand: u32,
    pub alpha_bits: u32,
    pub alpha_shift: u32,
    pub alpha_expand: u32,
}

/// Everything after the magic
#[derive(Debug, Clone, PackedData)]
pub struct MaterialHeader {
    pub version: u32,
    pub kind: MaterialKind,
    pub cel_count: u32,
    pub texture_count: u32,
    pub format: ColorFormat,
}

#[derive(Debug, Clone, PackedData)]
pub struct CelRecord {
    pub kind: u32,
    pub color_index: u32,
    pub unknown: [u32; 4],
}

/// Extra fields of texture cels
#[derive(Debug, Clone, PackedData)]
pub struct TextureCelRecord {
    pub unknown: [u32; 2],
    pub marker: u32,
    pub texture_index: u32,
}

#[derive(Debug, Clone, PackedData)]
pub struct TextureHeader {
    pub width: u32,
    pub height: u32,
    /// `1` if palette index 0 is transparent
    pub transparent: u32,
    pub padding: [u32; 2],
    pub mip_levels: u32,
}

/// A decoded image, rows top to bottom
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<RGBA8>,
}

impl Texture {
    pub fn pixel(&self, x: u32, y: u32) -> Option<RGBA8> {
        if x >= self.width {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub version: u32,
    pub kind: MaterialKind,
    pub format: ColorFormat,
    /// One per cel for color materials, one per frame for textures
    pub textures: Vec<Texture>,
}

impl Material {
    /// Decodes a material. Indexed and color materials need the palette of a colormap.
    pub fn parse(name: &str, mut reader: impl Read, colormap: Option<&ColorMap>) -> ContentResult<Material> {
        let r = &mut reader;

        let magic: u32 = r
            .read_packed()
            .map_err(|e| ContentError::corrupt(name, format!("couldn't read the magic: {e}")))?;
        if magic != MAT_MAGIC {
            return Err(ContentError::unsupported(
                name,
                format!("invalid magic `{}`", AsciiDisplay(&magic.to_le_bytes())),
            ));
        }

        let header: MaterialHeader = r.read_packed().map_err(|e| {
            if e.downcast_ref::<EnumParseError>().is_some() {
                ContentError::unsupported(name, "unknown material type or color mode")
            } else {
                ContentError::corrupt(name, format!("couldn't read the header: {e}"))
            }
        })?;

        let format = header.format;
        let bpp_valid = match format.mode {
            ColorMode::Indexed => format.bits_per_pixel == 8,
            ColorMode::Rgb | ColorMode::Rgba => matches!(format.bits_per_pixel, 16 | 24 | 32),
        };
        if !bpp_valid {
            return Err(ContentError::unsupported(
                name,
                format!("{} bits per pixel in {:?} mode", format.bits_per_pixel, format.mode),
            ));
        }

        let palette = || {
            colormap.ok_or_else(|| ContentError::reference(name, "the material needs a colormap"))
        };

        let mut cels = Vec::with_capacity(header.cel_count as usize);
        for index in 0..header.cel_count {
            let cel: CelRecord = r
                .read_packed()
                .map_err(|e| ContentError::corrupt(name, format!("couldn't read cel {index}: {e}")))?;
            if header.kind == MaterialKind::Texture {
                let _: TextureCelRecord = r.read_packed().map_err(|e| {
                    ContentError::corrupt(name, format!("couldn't read cel {index}: {e}"))
                })?;
            }
            cels.push(cel);
        }

        let textures: Vec<_> = match header.kind {
            MaterialKind::Color => {
                let palette = palette()?;
                cels.iter()
                    .map(|cel| color_swatch(palette.color(cel.color_index as u8)))
                    .collect()
            }
            MaterialKind::Texture => {
                let palette = match format.mode {
                    ColorMode::Indexed => Some(palette()?),
                    ColorMode::Rgb | ColorMode::Rgba => None,
                };
                let mut textures = Vec::with_capacity(header.texture_count as usize);
                for index in 0..header.texture_count {
                    textures.push(read_texture(r, name, index, &format, palette)?);
                }
                textures
            }
        };

        trace!(
            "Decoded material `{name}`: {:?}, {:?}, {} textures",
            header.kind,
            format.mode,
            textures.len()
        );

        Ok(Material {
            name: name.to_string(),
            version: header.version,
            kind: header.kind,
            format,
            textures,
        })
    }

    /// Size of the first frame, which texture coordinates are scaled by
    pub fn size(&self) -> Option<(u32, u32)> {
        self.textures.first().map(|t| (t.width, t.height))
    }

    pub fn has_alpha(&self) -> bool {
        self.format.mode == ColorMode::Rgba
    }
}

fn color_swatch(color: RGBA8) -> Texture {
    Texture {
        width: COLOR_SWATCH_SIZE,
        height: COLOR_SWATCH_SIZE,
        pixels: vec![color; (COLOR_SWATCH_SIZE * COLOR_SWATCH_SIZE) as usize],
    }
}

/// Reads a texture frame, decoding its first mip level and skipping the rest. The palette is
/// only given for indexed textures.
fn read_texture(
    r: &mut impl Read,
    name: &str,
    index: u32,
    format: &ColorFormat,
    palette: Option<&ColorMap>,
) -> ContentResult<Texture> {
    let header: TextureHeader = r
        .read_packed()
        .map_err(|e| ContentError::corrupt(name, format!("couldn't read texture {index}: {e}")))?;

    let (mut width, mut height) = (header.width, header.height);
    if width == 0 || height == 0 || width > MAX_TEXTURE_SIZE || height > MAX_TEXTURE_SIZE {
        return Err(ContentError::corrupt(
            name,
            format!("texture {index} has an invalid size {width}x{height}"),
        ));
    }

    let pixel_size = (format.bits_per_pixel / 8) as usize;
    let level_size = |width: u32, height: u32| width as usize * height as usize * pixel_size;

    let mut data = vec![0u8; level_size(width, height)];
    read_block(r, &mut data, name, "texture data")?;
    let pixels = match palette {
        Some(palette) => decode_indexed(&data, header.transparent == 1, palette),
        None => decode_direct(&data, width as usize, format),
    };
    let texture = Texture {
        width,
        height,
        pixels,
    };

    for level in 1..header.mip_levels {
        width >>= 1;
        height >>= 1;
        if width == 0 || height == 0 {
            break;
        }

        let size = level_size(width, height) as u64;
        let skipped = io::copy(&mut r.by_ref().take(size), &mut io::sink())
            .map_err(|e| ContentError::io(name, e))?;
        if skipped != size {
            return Err(ContentError::corrupt(name, format!("mip level {level} is truncated")));
        }
    }

    Ok(texture)
}

fn decode_indexed(data: &[u8], transparent: bool, palette: &ColorMap) -> Vec<RGBA8> {
    data.iter()
        .map(|&index| match index {
            0 if transparent => RGBA8::TRANSPARENT,
            _ => palette.color(index),
        })
        .collect()
}

/// Decodes direct color pixels, one scanline per task.
fn decode_direct(data: &[u8], width: usize, format: &ColorFormat) -> Vec<RGBA8> {
    let pixel_size = (format.bits_per_pixel / 8) as usize;
    let mut pixels = vec![RGBA8::default(); data.len() / pixel_size];

    pixels
        .par_chunks_mut(width)
        .zip(data.par_chunks(width * pixel_size))
        .for_each(|(row, source)| {
            for (pixel, bytes) in row.iter_mut().zip(source.chunks_exact(pixel_size)) {
                let mut raw = [0u8; 4];
                raw[..pixel_size].copy_from_slice(bytes);
                *pixel = decode_pixel(u32::from_le_bytes(raw), format);
            }
        });

    pixels
}

fn channel(pixel: u32, bits: u32, shift: u32, expand: u32) -> u8 {
    let mask = match bits {
        0 => 0,
        n if n >= 32 => u32::MAX,
        n => u32::MAX >> (32 - n),
    };
    let value = pixel.checked_shr(shift).unwrap_or(0) & mask;
    value.checked_shl(expand).unwrap_or(0).min(255) as u8
}

fn decode_pixel(pixel: u32, format: &ColorFormat) -> RGBA8 {
    let alpha = match format.alpha_bits {
        0 => 255,
        1 => match channel(pixel, 1, format.alpha_shift, 0) {
            0 => 0,
            _ => 255,
        },
        bits => channel(pixel, bits, format.alpha_shift, format.alpha_expand),
    };

    RGBA8 {
        r: channel(pixel, format.red_bits, format.red_shift, format.red_expand),
        g: channel(pixel, format.green_bits, format.green_shift, format.green_expand),
        b: channel(pixel, format.blue_bits, format.blue_shift, format.blue_expand),
        a: alpha,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cmp::tests::colormap;
    use holocron_utils::packed::PackedWriteExt;
    use std::io::{Cursor, Write};

    pub fn indexed_format() -> ColorFormat {
        ColorFormat {
            mode: ColorMode::Indexed,
            bits_per_pixel: 8,
            red_bits: 0,
            green_bits: 0,
            blue_bits: 0,
            red_shift: 0,
            green_shift: 0,
            blue_shift: 0,
            red_expand: 0,
            green_expand: 0,
            blue_expand: 0,
            alpha_bits: 0,
            alpha_shift: 0,
            alpha_expand: 0,
        }
    }

    /// 16-bit 565 colors
    fn rgb565_format() -> ColorFormat {
        ColorFormat {
            mode: ColorMode::Rgb,
            bits_per_pixel: 16,
            red_bits: 5,
            green_bits: 6,
            blue_bits: 5,
            red_shift: 11,
            green_shift: 5,
            blue_shift: 0,
            red_expand: 3,
            green_expand: 2,
            blue_expand: 3,
            ..indexed_format()
        }
    }

    /// 16-bit 5551 colors
    fn rgba5551_format() -> ColorFormat {
        ColorFormat {
            mode: ColorMode::Rgba,
            red_bits: 5,
            green_bits: 5,
            red_shift: 11,
            green_shift: 6,
            blue_shift: 1,
            green_expand: 3,
            alpha_bits: 1,
            alpha_shift: 0,
            ..rgb565_format()
        }
    }

    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub transparent: bool,
        pub mip_levels: u32,
        /// Every stored mip level, largest first
        pub data: Vec<u8>,
    }

    pub fn material_bytes(format: ColorFormat, frames: &[Frame]) -> Vec<u8> {
        let mut data = vec![];
        data.write_packed(MAT_MAGIC).unwrap();
        data.write_packed(MaterialHeader {
            version: 0x32,
            kind: MaterialKind::Texture,
            cel_count: frames.len() as u32,
            texture_count: frames.len() as u32,
            format,
        })
        .unwrap();

        for index in 0..frames.len() {
            data.write_packed(CelRecord {
                kind: 8,
                color_index: 0,
                unknown: [0x3F800000; 4],
            })
            .unwrap();
            data.write_packed(TextureCelRecord {
                unknown: [0; 2],
                marker: 0xBFF78482,
                texture_index: index as u32,
            })
            .unwrap();
        }

        for frame in frames {
            data.write_packed(TextureHeader {
                width: frame.width,
                height: frame.height,
                transparent: frame.transparent as u32,
                padding: [0; 2],
                mip_levels: frame.mip_levels,
            })
            .unwrap();
            data.write_all(&frame.data).unwrap();
        }

        data
    }

    fn parse(data: Vec<u8>) -> ContentResult<Material> {
        Material::parse("test.mat", Cursor::new(data), Some(&colormap()))
    }

    #[test]
    fn indexed_pixel_zero_transparency() {
        let frame = |transparent| Frame {
            width: 2,
            height: 2,
            transparent,
            mip_levels: 2,
            data: vec![0, 1, 2, 3, 7],
        };

        let material = parse(material_bytes(indexed_format(), &[frame(true)])).unwrap();
        let texture = &material.textures[0];
        assert_eq!(material.size(), Some((2, 2)));
        assert_eq!(texture.pixel(0, 0), Some(RGBA8::TRANSPARENT));
        assert_eq!(texture.pixel(1, 1), Some(colormap().color(3)));

        let material = parse(material_bytes(indexed_format(), &[frame(false)])).unwrap();
        let zero = material.textures[0].pixel(0, 0).unwrap();
        assert_eq!(zero, colormap().color(0));
        assert_eq!(zero.a, 255);
    }

    #[test]
    fn mip_levels_are_skipped() {
        let frames = [
            Frame {
                width: 4,
                height: 2,
                transparent: false,
                // The third level would be 1x0, so it's never stored
                mip_levels: 3,
                data: [vec![1u8; 8], vec![9; 2]].concat(),
            },
            Frame {
                width: 1,
                height: 1,
                transparent: false,
                mip_levels: 1,
                data: vec![5],
            },
        ];

        let material = parse(material_bytes(indexed_format(), &frames)).unwrap();
        assert_eq!(material.textures.len(), 2);
        assert_eq!(material.textures[0].pixels, vec![colormap().color(1); 8]);
        assert_eq!(material.textures[1].pixels, [colormap().color(5)]);
    }

    #[test]
    fn direct_colors() {
        // 2 rows, so both run through the parallel row decode
        let pixels: [u16; 4] = [0xF800, 0x07E0, 0x001F, 0xFFFF];
        let level = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();
        let frame = Frame {
            width: 2,
            height: 2,
            transparent: false,
            mip_levels: 1,
            data: level,
        };

        let material = Material::parse(
            "test.mat",
            Cursor::new(material_bytes(rgb565_format(), &[frame])),
            None,
        )
        .unwrap();
        let texture = &material.textures[0];
        assert!(!material.has_alpha());
        assert_eq!(texture.pixel(0, 0), Some(RGBA8 { r: 248, g: 0, b: 0, a: 255 }));
        assert_eq!(texture.pixel(1, 0), Some(RGBA8 { r: 0, g: 252, b: 0, a: 255 }));
        assert_eq!(texture.pixel(0, 1), Some(RGBA8 { r: 0, g: 0, b: 248, a: 255 }));
        assert_eq!(texture.pixel(1, 1), Some(RGBA8 { r: 248, g: 252, b: 248, a: 255 }));
    }

    #[test]
    fn one_bit_alpha_expands() {
        let pixels: [u16; 2] = [0xF801, 0xF800];
        let level = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();
        let frame = Frame {
            width: 2,
            height: 1,
            transparent: false,
            mip_levels: 1,
            data: level,
        };

        let material = parse(material_bytes(rgba5551_format(), &[frame])).unwrap();
        assert!(material.has_alpha());
        assert_eq!(material.textures[0].pixels[0], RGBA8 { r: 248, g: 0, b: 0, a: 255 });
        assert_eq!(material.textures[0].pixels[1].a, 0);
    }

    #[test]
    fn color_cels_become_swatches() {
        let mut data = vec![];
        data.write_packed(MAT_MAGIC).unwrap();
        data.write_packed(MaterialHeader {
            version: 0x32,
            kind: MaterialKind::Color,
            cel_count: 2,
            texture_count: 0,
            format: indexed_format(),
        })
        .unwrap();
        for color_index in [4, 9] {
            data.write_packed(CelRecord {
                kind: 0,
                color_index,
                unknown: [0x3F800000; 4],
            })
            .unwrap();
        }

        let material = parse(data).unwrap();
        assert_eq!(material.kind, MaterialKind::Color);
        assert_eq!(material.size(), Some((64, 64)));
        assert_eq!(material.textures[1].pixel(63, 63), Some(colormap().color(9)));
    }

    #[test]
    fn unsupported_materials() {
        let frame = || Frame {
            width: 1,
            height: 1,
            transparent: false,
            mip_levels: 1,
            data: vec![0],
        };

        let mut bad_magic = material_bytes(indexed_format(), &[frame()]);
        bad_magic[3] = b'X';

        // Type lives right after the magic and the version
        let mut bad_type = material_bytes(indexed_format(), &[frame()]);
        bad_type[8] = 1;

        let mut bad_mode = material_bytes(indexed_format(), &[frame()]);
        bad_mode[20] = 7;

        let bad_bpp = material_bytes(
            ColorFormat {
                bits_per_pixel: 12,
                ..rgb565_format()
            },
            &[frame()],
        );

        for data in [bad_magic, bad_type, bad_mode, bad_bpp] {
            assert!(matches!(parse(data), Err(ContentError::UnsupportedFormat { .. })));
        }
    }

    #[test]
    fn broken_materials() {
        let frame = Frame {
            width: 2,
            height: 2,
            transparent: false,
            mip_levels: 1,
            data: vec![0, 1],
        };
        let truncated = material_bytes(indexed_format(), &[frame]);
        assert!(matches!(parse(truncated), Err(ContentError::CorruptAsset { .. })));

        let frame = Frame {
            width: 1,
            height: 1,
            transparent: false,
            mip_levels: 1,
            data: vec![0],
        };
        let data = material_bytes(indexed_format(), &[frame]);
        assert!(matches!(
            Material::parse("test.mat", Cursor::new(data), None),
            Err(ContentError::ReferenceError { .. })
        ));
    }
}
