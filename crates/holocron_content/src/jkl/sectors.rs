use super::{Aabb, AmbientSound, Parser, Sector};
use crate::{tokenizer::Args, ContentError, ContentResult};
use holocron_utils::color::RGBAf;
use log::*;
use std::io::BufRead;

#[derive(Debug, Clone, Copy)]
enum SectorKey {
    Count,
    Sector,
    Flags,
    AmbientLight,
    ExtraLight,
    Tint,
    AverageLightIntensity,
    AverageLightPosition,
    AverageLightFalloff,
    BoundBox,
    CollideBox,
    Sound,
    Thrust,
    Center,
    Radius,
    Vertices,
    Surfaces,
}

const SECTOR_KEYS: &[(&str, SectorKey)] = &[
    ("WORLD SECTORS", SectorKey::Count),
    ("SECTOR", SectorKey::Sector),
    ("FLAGS", SectorKey::Flags),
    ("AMBIENT LIGHT", SectorKey::AmbientLight),
    ("EXTRA LIGHT", SectorKey::ExtraLight),
    ("TINT", SectorKey::Tint),
    ("AVERAGE LIGHT INTENSITY", SectorKey::AverageLightIntensity),
    ("AVERAGE LIGHT POSITION", SectorKey::AverageLightPosition),
    ("AVERAGE LIGHT FALLOFF", SectorKey::AverageLightFalloff),
    ("BOUNDBOX", SectorKey::BoundBox),
    ("COLLIDEBOX", SectorKey::CollideBox),
    ("SOUND", SectorKey::Sound),
    ("THRUST", SectorKey::Thrust),
    ("CENTER", SectorKey::Center),
    ("RADIUS", SectorKey::Radius),
    ("VERTICES", SectorKey::Vertices),
    ("SURFACES", SectorKey::Surfaces),
];

/// Version 1 levels store a single light intensity, later ones an RGB triple.
fn read_light(args: Args<'_>, version: i32) -> ContentResult<RGBAf> {
    if version == 1 {
        Ok(RGBAf::from_intensity(args.float(0)?).clamped())
    } else {
        read_rgb(args)
    }
}

fn read_rgb(args: Args<'_>) -> ContentResult<RGBAf> {
    let rgb = args.vec3(0)?;
    Ok(RGBAf::new(rgb.x, rgb.y, rgb.z, 1.0).clamped())
}

impl<R: BufRead> Parser<R> {
    pub(super) fn parse_sectors(&mut self) -> ContentResult<()> {
        let version = self.version("SECTORS")?;
        let mut current: Option<Sector> = None;

        while let Some(line) = self.lines.next_in_section()? {
            let Some((key, args)) = line.keyword(SECTOR_KEYS) else {
                trace!("Unknown sector entry `{}` in `{}`", line.text(), self.lines.file());
                continue;
            };

            match key {
                SectorKey::Count => {
                    self.level.sectors = vec![Sector::default(); args.uint(0)? as usize];
                    continue;
                }
                SectorKey::Sector => {
                    self.store_sector(current.take())?;

                    let id = args.index(0)?;
                    if id >= self.level.sectors.len() {
                        return Err(line.error(format!(
                            "sector {id} is out of range ({})",
                            self.level.sectors.len()
                        )));
                    }
                    current = Some(Sector {
                        id,
                        ..Default::default()
                    });
                    continue;
                }
                _ => {}
            }

            let Some(sector) = current.as_mut() else {
                return Err(line.error("sector property outside of a SECTOR block"));
            };

            match key {
                SectorKey::Count | SectorKey::Sector => {}
                SectorKey::Flags => sector.flags = args.hex(0)?,
                SectorKey::AmbientLight => sector.ambient_light = read_light(args, version)?,
                SectorKey::ExtraLight => sector.extra_light = read_light(args, version)?,
                SectorKey::Tint => sector.tint = Some(read_rgb(args)?),
                SectorKey::AverageLightIntensity => {
                    sector.average_light_intensity = Some(read_rgb(args)?)
                }
                SectorKey::AverageLightPosition => {
                    sector.average_light_position = Some(args.vec3(0)?)
                }
                SectorKey::AverageLightFalloff => sector.average_light_falloff = Some(args.vec2(0)?),
                SectorKey::BoundBox => {
                    sector.bounds = Some(Aabb {
                        min: args.vec3(0)?,
                        max: args.vec3(3)?,
                    })
                }
                SectorKey::CollideBox => {
                    // Only the size is taken from the file, the box sits on the render bounds
                    let size = args.vec3(3)? - args.vec3(0)?;
                    let center = sector.bounds.map(|b| b.center()).unwrap_or_default();
                    sector.collide_bounds = Some(Aabb::from_center_size(center, size));
                }
                SectorKey::Sound => {
                    sector.sound = Some(AmbientSound {
                        file: args.str(0)?.to_string(),
                        volume: args.float(1)?.clamp(0.0, 1.0),
                    })
                }
                SectorKey::Thrust => sector.thrust = Some(args.vec3(0)?),
                SectorKey::Center => sector.center = Some(args.vec3(0)?),
                SectorKey::Radius => sector.radius = args.float(0)?,
                SectorKey::Vertices => {
                    let count = args.uint(0)? as usize;
                    let mut indices = vec![0; count];
                    let vertex_count = self.level.vertices.len();

                    for _ in 0..count {
                        let line = self.lines.expect_in_section("a sector vertex")?;
                        let args = line.args();
                        let slot = args.index(0)?;
                        let vertex = args.uint(1)? as usize;

                        if slot >= count {
                            return Err(line.error(format!("sector vertex {slot} is out of range ({count})")));
                        }
                        if vertex >= vertex_count {
                            return Err(ContentError::reference(
                                self.lines.file(),
                                format!("sector {} uses vertex {vertex}, but only {vertex_count} exist", sector.id),
                            ));
                        }
                        indices[slot] = vertex;
                    }

                    sector.vertex_indices = indices;
                }
                SectorKey::Surfaces => {
                    let start = args.uint(0)? as usize;
                    let count = args.uint(1)? as usize;
                    let surface_count = self.level.surfaces.len();

                    if start + count > surface_count {
                        return Err(ContentError::reference(
                            self.lines.file(),
                            format!(
                                "sector {} owns surfaces {start}..{}, but only {surface_count} exist",
                                sector.id,
                                start + count
                            ),
                        ));
                    }

                    for surface in &mut self.level.surfaces[start..start + count] {
                        surface.sector = Some(sector.id);
                    }
                    sector.surfaces = start..start + count;
                }
            }
        }

        self.store_sector(current)
    }

    fn store_sector(&mut self, sector: Option<Sector>) -> ContentResult<()> {
        let Some(sector) = sector else {
            return Ok(());
        };

        match self.level.sectors.get_mut(sector.id) {
            Some(slot) => {
                *slot = sector;
                Ok(())
            }
            None => Err(ContentError::corrupt(
                self.lines.file(),
                format!("sector {} doesn't fit the declared sector count", sector.id),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        jkl::tests::{parse, TWO_SECTORS},
        ContentError,
    };
    use glam::Vec3;

    #[test]
    fn sectors_own_their_surfaces() {
        let level = parse(TWO_SECTORS).unwrap();

        let first = &level.sectors[0];
        assert_eq!(first.surfaces, 0..2);
        assert_eq!(first.vertex_indices, [0, 1, 2, 3]);
        assert_eq!(first.ambient_light.r, 0.5);
        assert_eq!(first.center, Some(Vec3::new(0.5, 0.5, 0.0)));
        assert_eq!(first.bounds.unwrap().center(), Vec3::new(0.5, 0.5, 0.0));

        let second = &level.sectors[1];
        assert_eq!(second.flags, 0x2);
        assert_eq!(second.ambient_light.r, 1.0);
        assert_eq!(second.sound.as_ref().unwrap().file, "ambient.wav");
        assert_eq!(second.thrust, Some(Vec3::Z));

        assert_eq!(level.surfaces[0].sector, Some(0));
        assert_eq!(level.surfaces[1].sector, Some(0));
        assert_eq!(level.surfaces[2].sector, Some(1));
    }

    #[test]
    fn collide_boxes_follow_the_render_bounds() {
        let text = TWO_SECTORS
            .replace("CENTER 0.5 0.5 0.0", "COLLIDEBOX 10.0 10.0 10.0 11.0 12.0 10.0\nCENTER 0.5 0.5 0.0")
            .replace("THRUST 0.0 0.0 1.0", "COLLIDEBOX 1.0 1.0 1.0 3.0 3.0 3.0\nTHRUST 0.0 0.0 1.0");
        let level = parse(&text).unwrap();

        let first = level.sectors[0].collide_bounds.unwrap();
        assert_eq!(first.min, Vec3::new(0.0, -0.5, 0.0));
        assert_eq!(first.max, Vec3::new(1.0, 1.5, 0.0));

        // No BOUNDBOX, so the box is centered on the origin
        let second = level.sectors[1].collide_bounds.unwrap();
        assert_eq!(second.min, Vec3::splat(-1.0));
        assert_eq!(second.max, Vec3::ONE);
    }

    #[test]
    fn surface_range_must_fit() {
        let broken = TWO_SECTORS.replace("SURFACES 2 1", "SURFACES 2 2");
        assert!(matches!(parse(&broken), Err(ContentError::ReferenceError { .. })));
    }
}
