//! Sprite descriptors (`.spr`), a single line describing a camera-facing textured quad

use crate::{
    flags::{clamp_mode, GeoMode, LightMode},
    tokenizer::LineReader,
    ContentError, ContentResult,
};
use glam::{Vec2, Vec3};
use holocron_proc::ext_repr;
use holocron_utils::color::RGBAf;
use log::*;
use std::io::BufRead;

#[ext_repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteType {
    FaceCamera = 0,
    /// Jumps to a random position while animating
    RandomPosition = 1,
    Normal = 2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub name: String,
    pub material: String,
    pub kind: SpriteType,
    pub size: Vec2,
    pub geo_mode: GeoMode,
    pub light_mode: LightMode,
    pub texture_mode: i32,
    pub extra_light: RGBAf,
    pub offset: Vec3,
}

impl Sprite {
    /// Parses a sprite. The record has either 11 tokens (intensity light) or 14 (RGBA light).
    pub fn parse(name: &str, reader: impl BufRead) -> ContentResult<Sprite> {
        let mut lines = LineReader::new(name, reader);
        let line = lines
            .next_line()?
            .ok_or_else(|| ContentError::corrupt(name, "the file is empty"))?;
        let args = line.args();

        let rgb = match args.len() {
            11 => false,
            14 => true,
            n => {
                return Err(ContentError::corrupt(
                    name,
                    format!("expected 11 or 14 values, found {n}"),
                ))
            }
        };

        let raw_kind = args.int(1)?;
        let kind = u32::try_from(raw_kind)
            .ok()
            .and_then(|raw| SpriteType::try_from(raw).ok())
            .ok_or_else(|| ContentError::corrupt(name, format!("invalid sprite type {raw_kind}")))?;

        let size = args.vec2(2)?;
        if size.x <= 0.0 || size.y <= 0.0 {
            return Err(ContentError::corrupt(name, format!("invalid sprite size {size}")));
        }

        let (extra_light, offset_at) = if rgb {
            let c = args.vec4(7)?;
            (RGBAf::new(c.x, c.y, c.z, c.w), 11)
        } else {
            (RGBAf::from_intensity(args.float(7)?), 8)
        };

        let sprite = Sprite {
            name: name.to_string(),
            material: args.str(0)?.to_string(),
            kind,
            size,
            geo_mode: clamp_mode(args.uint(4)?, GeoMode::LAST, name),
            light_mode: clamp_mode(args.uint(5)?, LightMode::LAST, name),
            texture_mode: args.int(6)?,
            extra_light: extra_light.clamped(),
            offset: args.vec3(offset_at)?,
        };

        trace!("Parsed sprite `{name}` using `{}`", sprite.material);
        Ok(sprite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> ContentResult<Sprite> {
        Sprite::parse("test.spr", Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn intensity_sprite() {
        let sprite = parse("# torch flame\nflame.mat 0 0.05 0.1 4 0 0 2.0 0.0 0.0 0.01\n").unwrap();
        assert_eq!(sprite.material, "flame.mat");
        assert_eq!(sprite.kind, SpriteType::FaceCamera);
        assert_eq!(sprite.size, Vec2::new(0.05, 0.1));
        assert_eq!(sprite.geo_mode, GeoMode::Textured);
        assert_eq!(sprite.light_mode, LightMode::Unlit);
        assert_eq!(sprite.extra_light, RGBAf::WHITE);
        assert_eq!(sprite.offset, Vec3::new(0.0, 0.0, 0.01));
    }

    #[test]
    fn rgba_sprite() {
        let sprite =
            parse("spark.mat 2 0.1 0.1 9 1 0 0.5 0.25 0.0 1.0 0.0 0.1 0.0\n").unwrap();
        assert_eq!(sprite.kind, SpriteType::Normal);
        assert_eq!(sprite.geo_mode, GeoMode::Textured);
        assert_eq!(sprite.extra_light, RGBAf::new(0.5, 0.25, 0.0, 1.0));
        assert_eq!(sprite.offset, Vec3::new(0.0, 0.1, 0.0));
    }

    #[test]
    fn invalid_sprites() {
        for text in [
            "",
            "flame.mat 0 0.05 0.1 4 0 0 2.0 0.0 0.0\n",
            "flame.mat 3 0.05 0.1 4 0 0 2.0 0.0 0.0 0.01\n",
            "flame.mat -1 0.05 0.1 4 0 0 2.0 0.0 0.0 0.01\n",
            "flame.mat 0 0.0 0.1 4 0 0 2.0 0.0 0.0 0.01\n",
        ] {
            assert!(
                matches!(parse(text), Err(ContentError::CorruptAsset { .. })),
                "{text:?} should be rejected"
            );
        }
    }
}
