//! Colormaps (`.cmp`): the 256 color palette of a level, plus lighting and blending tables

use crate::{ContentError, ContentResult};
use bitflags::bitflags;
use holocron_proc::PackedData;
use holocron_utils::{color::RGBA8, packed::PackedReadExt, string_as_u32, AsciiDisplay};
use log::*;
use std::io::{self, Read};

pub const CMP_MAGIC: u32 = string_as_u32("CMP ");
pub const PALETTE_SIZE: usize = 256;
pub const LIGHT_LEVELS: usize = 64;

bitflags! {
    #[derive(Default)]
    pub struct ColorMapFlags: u32 {
        /// A 256x256 blending table follows the light levels
        const TRANSPARENCY = 0x01;
        /// Marks an extra block whose layout isn't known
        const EXTENDED = 0x04;
    }
}

#[derive(Debug, Clone, PackedData)]
pub struct ColorMapHeader {
    pub magic: u32,
    pub version: u32,
    pub flags: u32,
    /// Tint and fields nobody uses
    pub reserved: [u8; 52],
}

/// Maps a palette index to another palette index
pub type ColorRow = [u8; PALETTE_SIZE];

#[derive(Debug, Clone)]
pub struct ColorMap {
    pub name: String,
    pub version: u32,
    pub flags: ColorMapFlags,
    pub palette: Vec<RGBA8>,
    /// From darkest to brightest
    pub light_levels: Vec<ColorRow>,
    /// Result of blending color `x` over color `y`, at `[x][y]`
    pub transparency: Option<Vec<ColorRow>>,
    /// Bytes after the known tables, kept as they are
    pub unsupported_tail: Vec<u8>,
}

impl ColorMap {
    pub fn parse(name: &str, mut reader: impl Read) -> ContentResult<ColorMap> {
        let r = &mut reader;
        let header: ColorMapHeader = r
            .read_packed()
            .map_err(|e| ContentError::corrupt(name, format!("couldn't read the header: {e}")))?;

        if header.magic != CMP_MAGIC {
            return Err(ContentError::unsupported(
                name,
                format!("invalid magic `{}`", AsciiDisplay(&header.magic.to_le_bytes())),
            ));
        }

        let flags = ColorMapFlags::from_bits_truncate(header.flags);

        let mut palette_data = [0u8; PALETTE_SIZE * 3];
        read_block(r, &mut palette_data, name, "palette")?;
        let palette = palette_data
            .chunks_exact(3)
            .map(|rgb| RGBA8 {
                r: rgb[0],
                g: rgb[1],
                b: rgb[2],
                a: 255,
            })
            .collect();

        let light_levels = read_rows(r, LIGHT_LEVELS, name, "light levels")?;

        let transparency = if flags.contains(ColorMapFlags::TRANSPARENCY) {
            Some(read_rows(r, PALETTE_SIZE, name, "transparency table")?)
        } else {
            None
        };

        let mut unsupported_tail = vec![];
        r.read_to_end(&mut unsupported_tail)
            .map_err(|e| ContentError::io(name, e))?;
        if !unsupported_tail.is_empty() {
            warn!(
                "Colormap `{name}` has {} undecoded bytes (flags {:#x}), keeping them as they are",
                unsupported_tail.len(),
                header.flags
            );
        }

        Ok(ColorMap {
            name: name.to_string(),
            version: header.version,
            flags,
            palette,
            light_levels,
            transparency,
            unsupported_tail,
        })
    }

    /// Colormap with a gray ramp palette, for when a level doesn't name one
    pub fn grayscale() -> ColorMap {
        let identity: ColorRow = std::array::from_fn(|i| i as u8);
        ColorMap {
            name: String::from("<grayscale>"),
            version: 0,
            flags: ColorMapFlags::empty(),
            palette: (0..PALETTE_SIZE)
                .map(|i| RGBA8 {
                    r: i as u8,
                    g: i as u8,
                    b: i as u8,
                    a: 255,
                })
                .collect(),
            light_levels: vec![identity; LIGHT_LEVELS],
            transparency: None,
            unsupported_tail: vec![],
        }
    }

    pub fn color(&self, index: u8) -> RGBA8 {
        self.palette
            .get(usize::from(index))
            .copied()
            .unwrap_or_default()
    }
}

fn read_rows(r: &mut impl Read, count: usize, name: &str, what: &str) -> ContentResult<Vec<ColorRow>> {
    let mut rows = vec![[0u8; PALETTE_SIZE]; count];
    for row in &mut rows {
        read_block(r, row, name, what)?;
    }
    Ok(rows)
}

/// Reads exactly `buffer.len()` bytes, a short read means the file is truncated.
pub(crate) fn read_block(r: &mut impl Read, buffer: &mut [u8], name: &str, what: &str) -> ContentResult<()> {
    r.read_exact(buffer).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ContentError::corrupt(name, format!("{what} is truncated")),
        _ => ContentError::io(name, e),
    })
}
