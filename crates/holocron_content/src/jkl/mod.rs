//! Level files (`.jkl` for Jedi Knight and Mysteries of the Sith, `.ndy` for Infernal Machine)
//!
//! A level is a sequence of `SECTION:` blocks. Geometry is stored as flat world arrays
//! (vertices, texture vertices, adjoins, surfaces) that sectors reference by index ranges.

use crate::{
    flags::{AdjoinFlags, FaceFlags, GeoMode, LightMode, SurfaceFlags, WorldType},
    tokenizer::{lookup_section, Args, LineReader},
    ContentError, ContentResult,
};
use ahash::AHashMap;
use glam::{Vec2, Vec3, Vec4};
use holocron_utils::color::RGBAf;
use log::*;
use smallvec::SmallVec;
use std::{io::BufRead, ops::Range, sync::Arc};

mod georesource;
mod header;
mod resources;
mod sectors;
mod things;

#[derive(Debug, Clone, PartialEq)]
pub struct LevelMaterial {
    /// File name, including the `.mat` extension
    pub name: String,
    /// Texture tiling factors (version 1 levels only, otherwise `1, 1`)
    pub tile: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fog {
    pub enabled: bool,
    pub color: RGBAf,
    pub start: f32,
    pub end: f32,
}

#[derive(Debug, Clone, Default)]
pub struct LevelHeader {
    /// `1` for Jedi Knight/MotS, anything else for Infernal Machine
    pub version: i32,
    pub gravity: f32,
    pub ceiling_sky_z: f32,
    pub horizon_distance: f32,
    pub horizon_pixels_per_rev: f32,
    pub horizon_sky_offset: Vec2,
    pub ceiling_sky_offset: Vec2,
    pub mipmap_distances: Vec4,
    pub lod_distances: Vec4,
    pub perspective_distance: f32,
    pub gouraud_distance: f32,
    pub fog: Option<Fog>,
}

/// A portal between two sectors, attached to exactly one surface.
#[derive(Debug, Clone, Default)]
pub struct Adjoin {
    pub flags: AdjoinFlags,
    /// The adjoin on the other side of the portal
    pub mirror: Option<usize>,
    pub distance: f32,
    /// The surface this adjoin belongs to, set when that surface is parsed
    pub surface: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceVertex {
    /// Index into [`Level::vertices`]
    pub vertex: usize,
    /// Index into [`Level::texture_vertices`]
    pub texture_vertex: Option<usize>,
    pub uv: Option<Vec2>,
    pub color: RGBAf,
}

#[derive(Debug, Clone, Default)]
pub struct Surface {
    /// Material index as written in the file, `-1` for none
    pub material_index: i32,
    pub material: Option<LevelMaterial>,
    pub surface_flags: SurfaceFlags,
    pub face_flags: FaceFlags,
    pub geo_mode: GeoMode,
    pub light_mode: LightMode,
    pub texture_mode: i32,
    /// Index into [`Level::adjoins`]
    pub adjoin: Option<usize>,
    pub extra_light: RGBAf,
    pub vertices: SmallVec<[SurfaceVertex; 4]>,
    pub normal: Vec3,
    /// Owning sector, set by the sector's `SURFACES` entry
    pub sector: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmbientSound {
    pub file: String,
    pub volume: f32,
}

#[derive(Debug, Clone, Default)]
pub struct Sector {
    pub id: usize,
    pub flags: u32,
    pub ambient_light: RGBAf,
    pub extra_light: RGBAf,
    pub tint: Option<RGBAf>,
    pub average_light_intensity: Option<RGBAf>,
    pub average_light_position: Option<Vec3>,
    pub average_light_falloff: Option<Vec2>,
    pub bounds: Option<Aabb>,
    /// Collision box, sized by `COLLIDEBOX` and centered on `bounds`
    pub collide_bounds: Option<Aabb>,
    pub center: Option<Vec3>,
    pub radius: f32,
    pub sound: Option<AmbientSound>,
    pub thrust: Option<Vec3>,
    /// Indices into [`Level::vertices`]
    pub vertex_indices: Vec<usize>,
    /// Range of [`Level::surfaces`] owned by this sector
    pub surfaces: Range<usize>,
}

/// A placed entity, or a template other things derive from.
#[derive(Debug, Clone, Default)]
pub struct Thing {
    pub name: String,
    pub position: Vec3,
    /// Pitch, yaw and roll, in degrees
    pub orientation: Vec3,
    pub sector: Option<usize>,
    /// Lowercase keys and values
    pub params: AHashMap<String, String>,
    /// The template this thing was created from, kept for diagnostics
    pub template: Option<Arc<Thing>>,
}

impl Thing {
    /// Creates a thing from a template, copying all of its parameters. Changes to the new
    /// thing never affect the template.
    pub fn from_template(template: Option<&Arc<Thing>>) -> Self {
        match template {
            Some(template) => Thing {
                template: Some(template.clone()),
                ..Thing::clone(template)
            },
            None => Thing::default(),
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Names of the templates this thing derives from, closest first
    pub fn template_chain(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::successors(self.template.as_deref(), |t| t.template.as_deref())
            .map(|t| t.name.as_str())
    }

    /// Parses `key=value` pairs into the parameter map. Entries without a single `=` are
    /// ignored, MotS puts a light index before the parameters.
    fn apply_params(&mut self, args: Args<'_>) {
        for token in args.tokens() {
            let mut parts = token.split('=');
            if let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) {
                self.params
                    .insert(key.to_ascii_lowercase(), value.to_ascii_lowercase());
            }
        }
    }
}

/// A fully parsed level
#[derive(Debug, Clone, Default)]
pub struct Level {
    pub name: String,
    pub world_type: WorldType,
    pub header: LevelHeader,
    pub sounds: Vec<String>,
    /// Material table, indexed by the numbers surfaces use
    pub materials: Vec<Option<LevelMaterial>>,
    /// Number of materials actually listed before the `end` marker
    pub material_count: usize,
    pub colormaps: Vec<String>,
    pub vertices: Vec<Vec3>,
    pub texture_vertices: Vec<Vec2>,
    pub adjoins: Vec<Adjoin>,
    pub surfaces: Vec<Surface>,
    pub sectors: Vec<Sector>,
    pub models: Vec<String>,
    /// Templates by lowercase name
    pub templates: AHashMap<String, Arc<Thing>>,
    pub things: Vec<Thing>,
}

impl Level {
    /// Parses a level file.
    pub fn parse(name: &str, reader: impl BufRead) -> ContentResult<Level> {
        let mut parser = Parser {
            lines: LineReader::new(name, reader),
            level: Level {
                name: name.to_string(),
                ..Default::default()
            },
            version_declared: false,
        };

        parser.run()?;

        let level = parser.level;
        debug!(
            "Parsed level `{name}`: {:?}, {} sectors, {} surfaces, {} things",
            level.world_type,
            level.sectors.len(),
            level.surfaces.len(),
            level.things.len()
        );
        Ok(level)
    }

    pub fn sector_surfaces(&self, sector: &Sector) -> &[Surface] {
        self.surfaces.get(sector.surfaces.clone()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy)]
enum LevelSection {
    Skipped,
    Header,
    Sounds,
    Materials,
    GeoResource,
    Sectors,
    Models,
    Templates,
    Things,
}

const SECTIONS: &[(&str, LevelSection)] = &[
    ("JK", LevelSection::Skipped),
    ("COPYRIGHT", LevelSection::Skipped),
    ("HEADER", LevelSection::Header),
    ("SOUNDS", LevelSection::Sounds),
    ("MATERIALS", LevelSection::Materials),
    ("GEORESOURCE", LevelSection::GeoResource),
    ("SECTORS", LevelSection::Sectors),
    ("MODELS", LevelSection::Models),
    ("TEMPLATES", LevelSection::Templates),
    ("THINGS", LevelSection::Things),
];

pub(crate) struct Parser<R> {
    lines: LineReader<R>,
    level: Level,
    version_declared: bool,
}

impl<R: BufRead> Parser<R> {
    fn run(&mut self) -> ContentResult<()> {
        while let Some(line) = self.lines.next_line()? {
            // Anything outside of a section is ignored
            let Some(name) = line.section_name() else {
                continue;
            };

            match lookup_section(&name, SECTIONS) {
                Some(LevelSection::Header) => self.parse_header()?,
                Some(LevelSection::Sounds) => self.parse_sounds()?,
                Some(LevelSection::Materials) => self.parse_materials()?,
                Some(LevelSection::GeoResource) => self.parse_georesource()?,
                Some(LevelSection::Sectors) => self.parse_sectors()?,
                Some(LevelSection::Models) => self.parse_models()?,
                Some(LevelSection::Templates) => self.parse_templates()?,
                Some(LevelSection::Things) => self.parse_things()?,
                Some(LevelSection::Skipped) => self.lines.skip_section()?,
                None => {
                    trace!("Skipping section `{name}` of `{}`", self.lines.file());
                    self.lines.skip_section()?;
                }
            }
        }

        Ok(())
    }

    fn file(&self) -> String {
        self.lines.file().to_string()
    }

    /// Level version, which has to be known before sections whose layout depends on it.
    fn version(&self, section: &str) -> ContentResult<i32> {
        if self.version_declared {
            Ok(self.level.header.version)
        } else {
            Err(ContentError::corrupt(
                self.lines.file(),
                format!("section {section} appears before the level version is declared"),
            ))
        }
    }

    /// Reads `count` records of the form `index: values...`, in any order.
    fn read_records(
        &mut self,
        count: usize,
        what: &str,
        mut store: impl FnMut(&mut Level, usize, Args<'_>) -> ContentResult<()>,
    ) -> ContentResult<()> {
        let level = &mut self.level;
        self.lines
            .read_indexed(count, what, |index, args| store(level, index, args))
    }

    /// Reads lines until an `end` marker (or the end of the section).
    fn read_until_end(
        &mut self,
        mut store: impl FnMut(&mut Level, Args<'_>) -> ContentResult<()>,
    ) -> ContentResult<()> {
        while let Some(line) = self.lines.next_in_section()? {
            if line.is_end() {
                break;
            }
            store(&mut self.level, line.args())?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub fn parse(text: &str) -> ContentResult<Level> {
        Level::parse("test.jkl", Cursor::new(text.as_bytes().to_vec()))
    }

    /// Two box-like sectors sharing one adjoined wall
    pub const TWO_SECTORS: &str = r#"
# Two sectors, joined by an adjoin
SECTION: JK
Some text that would break the parser if it wasn't skipped

SECTION: COPYRIGHT
................................

SECTION: HEADER
Version 1
World Gravity 4.00
Ceiling Sky Z 15.000000
Horizon Distance 200.000000
Horizon Pixels per Rev 768.000000
Horizon Sky Offset 0.000000 0.000000
Ceiling Sky Offset 0.000000 0.000000
MipMap Distances 1.0 2.0 3.0 4.0
LOD Distances 0.3 0.6 0.9 1.2
Perspective distance 2.000000
Gouraud distance 2.000000

SECTION: SOUNDS
World sounds 2
ambient.wav
end

SECTION: MATERIALS
World materials 3
1:  wall.mat  2.000000  2.000000
0:  floor.mat 1.000000  1.000000
end

SECTION: GEORESOURCE
World Colormaps 1
0: dflt.cmp

World vertices 6
0: 0.0 0.0 0.0
1: 1.0 0.0 0.0
2: 1.0 1.0 0.0
3: 0.0 1.0 0.0
4: 2.0 0.0 0.0
5: 2.0 1.0 0.0

World texture vertices 4
0: 0.0 0.0
1: 64.0 0.0
2: 64.0 64.0
3: 0.0 64.0

World adjoins 2
0: 0x7 1 0.00
1: 0x7 0 0.00

World surfaces 3
0: 0 0x4 0x0 4 3 4 -1 0.0 4 0,0 1,1 2,2 3,3 0.1 0.2 0.3 0.4
1: 1 0x4 0x2 4 3 4 0 0.0 3 1,0 4,1 5,2 0.5 0.5 0.5
2: 1 0x4 0x2 4 3 4 1 0.0 3 1, 0 5,2 2,3 1.0 1.0 1.0
0: 0.0 0.0 1.0
1: 0.0 0.0 1.0
2: 0.0 0.0 1.0

SECTION: SECTORS
World sectors 2

SECTOR 0
FLAGS 0x0
AMBIENT LIGHT 0.5
EXTRA LIGHT 0.0
COLORMAP 0
TINT 0.1 0.2 0.3
BOUNDBOX 0.0 0.0 0.0 1.0 1.0 0.0
CENTER 0.5 0.5 0.0
RADIUS 0.7
VERTICES 4
0: 0
1: 1
2: 2
3: 3
SURFACES 0 2

SECTOR 1
FLAGS 0x2
AMBIENT LIGHT 2.0
EXTRA LIGHT 0.0
SOUND ambient.wav 0.8
THRUST 0.0 0.0 1.0
VERTICES 3
0: 1
1: 4
2: 5
SURFACES 2 1

SECTION: MODELS
World models 1
0: crate.3do
end

SECTION: TEMPLATES
World templates 4
_base none type=actor mass=50
_walkplayer _base model3d=ky.3do size=0.065
player _walkplayer thingflags=0x400 mass=150
_base dup=1
end

SECTION: THINGS
World things 2
0: player player 0.5 0.5 0.0 0.0 90.0 0.0 0 thingflags=0x1 sector=0
1: _walkplayer guard 1.5 0.5 0.0 0.0 0.0 0.0 1 mass=99
end

SECTION: UNKNOWN
whatever
"#;

    #[test]
    fn full_level_parses() {
        let level = parse(TWO_SECTORS).unwrap();

        assert_eq!(level.world_type, WorldType::Jkdf2);
        assert_eq!(level.header.version, 1);
        assert_eq!(level.header.gravity, 4.0);
        assert_eq!(level.header.mipmap_distances, Vec4::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(level.sounds, ["ambient.wav"]);
        assert_eq!(level.colormaps, ["dflt.cmp"]);
        assert_eq!(level.models, ["crate.3do"]);
        assert_eq!(level.vertices.len(), 6);
        assert_eq!(level.sectors.len(), 2);
        assert_eq!(level.things.len(), 2);
    }

    #[test]
    fn mutual_adjoin_links() {
        let level = parse(TWO_SECTORS).unwrap();

        for (surface_index, adjoin_index) in [(1, 0), (2, 1)] {
            let surface = &level.surfaces[surface_index];
            assert_eq!(surface.adjoin, Some(adjoin_index));
            assert_eq!(level.adjoins[adjoin_index].surface, Some(surface_index));
        }

        assert_eq!(level.adjoins[0].mirror, Some(1));
        assert_eq!(level.adjoins[1].mirror, Some(0));
        assert!(level.surfaces[0].adjoin.is_none());
    }
}
