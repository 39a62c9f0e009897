//! Rendering modes and flag sets shared by levels, models and sprites

use bitflags::bitflags;
use holocron_proc::ext_repr;
use log::*;
use std::fmt::{Debug, Display};

/// Which game a level comes from. Decided by the level's version and color encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorldType {
    #[default]
    Jkdf2,
    Mots,
    Ijim,
}

#[ext_repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum GeoMode {
    NotDrawn = 0,
    Vertex = 1,
    Wireframe = 2,
    Solid = 3,
    #[default]
    Textured = 4,
}

#[ext_repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LightMode {
    Unlit = 0,
    Lit = 1,
    Diffuse = 2,
    #[default]
    Gouraud = 3,
}

/// Converts a raw mode value, clamping anything out of range to the last valid mode.
pub fn clamp_mode<T>(raw: u32, last: T, context: impl Display) -> T
where
    T: TryFrom<u32> + Copy + Debug,
{
    T::try_from(raw).unwrap_or_else(|_| {
        warn!("Invalid mode value {raw} for {context}, clamping to {last:?}");
        last
    })
}

bitflags! {
    /// Per-face rendering flags
    #[derive(Default)]
    pub struct FaceFlags: u32 {
        /// Disables backface culling
        const DOUBLE_SIDED = 0x01;
        /// Translucent texture (adjoins and model faces)
        const TRANSLUCENT = 0x02;
        const TEX_CLAMP_X = 0x04;
        const TEX_CLAMP_Y = 0x08;
        /// Point filtering
        const TEX_FILTER_NONE = 0x10;
        const ZWRITE_OFF = 0x20;
        /// Set on every IJIM surface except the sky
        const IJIM_FOG_ENABLED = 0x100;
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SurfaceFlags: u32 {
        const FLOOR = 0x01;
        const COG_LINKED = 0x02;
        const COLLISION = 0x04;
        const AI_CANNOT_WALK = 0x08;
        const DOUBLE_TEX_SCALE = 0x10;
        const HALF_TEX_SCALE = 0x20;
        const EIGHTH_TEX_SCALE = 0x40;
        const NO_FALLING_DAMAGE = 0x80;
        const HORIZON_SKY = 0x200;
        const CEILING_SKY = 0x400;
        const SCROLLING = 0x800;
        const ICY = 0x1000;
        const VERY_ICY = 0x2000;
        const MAG_SEALED = 0x4000;
        const METAL = 0x10000;
        const DEEP_WATER = 0x20000;
        const SHALLOW_WATER = 0x40000;
        const DIRT = 0x80000;
        const VERY_DEEP_WATER = 0x100000;

        const SKY = Self::HORIZON_SKY.bits | Self::CEILING_SKY.bits;
    }
}

bitflags! {
    #[derive(Default)]
    pub struct AdjoinFlags: u32 {
        const VISIBLE = 0x01;
        const ALLOW_MOVEMENT = 0x02;
        const ALLOW_SOUND = 0x04;
        const PLAYER_ONLY = 0x08;
        const AI_ONLY = 0x10;
    }
}
