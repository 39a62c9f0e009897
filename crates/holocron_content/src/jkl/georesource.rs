use super::{Adjoin, Level, LevelMaterial, Parser, Surface, SurfaceVertex};
use crate::{
    flags::{clamp_mode, AdjoinFlags, FaceFlags, GeoMode, LightMode, SurfaceFlags, WorldType},
    tokenizer::Args,
    ContentError, ContentResult,
};
use glam::Vec2;
use holocron_utils::color::RGBAf;
use log::*;
use smallvec::SmallVec;
use std::io::BufRead;

#[derive(Debug, Clone, Copy)]
enum GeoKey {
    Colormaps,
    Vertices,
    TextureVertices,
    Adjoins,
    Surfaces,
}

const GEO_KEYS: &[(&str, GeoKey)] = &[
    ("WORLD COLORMAPS", GeoKey::Colormaps),
    ("WORLD VERTICES", GeoKey::Vertices),
    ("WORLD TEXTURE VERTICES", GeoKey::TextureVertices),
    ("WORLD ADJOINS", GeoKey::Adjoins),
    ("WORLD SURFACES", GeoKey::Surfaces),
];

/// Materials Infernal Machine levels use without listing them. Their indices point past the
/// level's own table.
const STATIC_MATERIALS: &[(i32, &str)] = &[
    (32969, "kit_ptch_sde.mat"),
    (32970, "kit_ptch_top.mat"),
    (33092, "dflt.mat"),
    (33105, "vol_wall_logs_weathered.mat"),
];

impl<R: BufRead> Parser<R> {
    pub(super) fn parse_georesource(&mut self) -> ContentResult<()> {
        let version = self.version("GEORESOURCE")?;

        while let Some(line) = self.lines.next_in_section()? {
            let Some((key, args)) = line.keyword(GEO_KEYS) else {
                trace!("Unknown georesource entry `{}` in `{}`", line.text(), self.lines.file());
                continue;
            };
            let count = args.uint(0)? as usize;

            match key {
                GeoKey::Colormaps => {
                    self.level.colormaps = vec![String::new(); count];
                    self.read_records(count, "colormap", |level, index, args| {
                        level.colormaps[index] = args.str(0)?.to_string();
                        Ok(())
                    })?;
                }
                GeoKey::Vertices => {
                    self.level.vertices = vec![Default::default(); count];
                    self.read_records(count, "vertex", |level, index, args| {
                        level.vertices[index] = args.vec3(0)?;
                        Ok(())
                    })?;
                }
                GeoKey::TextureVertices => {
                    self.level.texture_vertices = vec![Default::default(); count];
                    self.read_records(count, "texture vertex", |level, index, args| {
                        level.texture_vertices[index] = args.vec2(0)?;
                        Ok(())
                    })?;
                }
                GeoKey::Adjoins => {
                    self.level.adjoins = vec![Adjoin::default(); count];
                    self.read_records(count, "adjoin", |level, index, args| {
                        level.adjoins[index] = Adjoin {
                            flags: AdjoinFlags::from_bits_truncate(args.hex(0)?),
                            mirror: args.optional_index(1)?,
                            distance: if args.len() > 2 { args.float(2)? } else { 0.0 },
                            surface: None,
                        };
                        Ok(())
                    })?;
                }
                GeoKey::Surfaces => {
                    self.level.surfaces = vec![Surface::default(); count];
                    self.read_records(count, "surface", |level, index, args| {
                        let surface = parse_surface(level, version, index, args)?;
                        if let Some(adjoin) = surface.adjoin {
                            level.adjoins[adjoin].surface = Some(index);
                        }
                        level.surfaces[index] = surface;
                        Ok(())
                    })?;

                    // Followed by one normal per surface
                    self.read_records(count, "surface normal", |level, index, args| {
                        level.surfaces[index].normal = args.vec3(0)?;
                        Ok(())
                    })?;
                }
            }
        }

        Ok(())
    }
}

fn parse_surface(level: &mut Level, version: i32, index: usize, args: Args<'_>) -> ContentResult<Surface> {
    let line = args.line();
    let file = line.file();

    let material_index = args.int(0)?;
    let surface_flags = SurfaceFlags::from_bits_truncate(args.hex(1)?);
    let face_flags = FaceFlags::from_bits_truncate(args.hex(2)?);
    let mut geo_mode = clamp_mode(args.uint(3)?, GeoMode::LAST, format_args!("surface {index}"));
    let light_mode = clamp_mode(args.uint(4)?, LightMode::LAST, format_args!("surface {index}"));
    let texture_mode = args.int(5)?;

    let adjoin = args.optional_index(6)?;
    if let Some(adjoin) = adjoin {
        if adjoin >= level.adjoins.len() {
            return Err(ContentError::reference(
                file,
                format!("surface {index} uses adjoin {adjoin}, but only {} exist", level.adjoins.len()),
            ));
        }
    }

    let mut pos = 7;
    let extra_light = if version == 1 {
        pos += 1;
        RGBAf::from_intensity(args.float(pos - 1)?).clamped()
    } else {
        pos += 4;
        let v = args.vec4(pos - 4)?;
        RGBAf::new(v.x, v.y, v.z, v.w).clamped()
    };

    let material = resolve_material(level, version, material_index, index);
    if material.is_none() && geo_mode > GeoMode::Solid {
        geo_mode = GeoMode::Solid;
    }

    let vertex_count = args.uint(pos)? as usize;
    pos += 1;

    let mut vertices = SmallVec::<[SurfaceVertex; 4]>::with_capacity(vertex_count);
    for _ in 0..vertex_count {
        // Written as `v,tv`, though some files put whitespace around the comma
        let group = args.str(pos)?;
        pos += 1;

        let mut parts = group.split(',').filter(|part| !part.is_empty());
        let vertex_token = parts.next().unwrap_or(group);
        let texture_token = match parts.next() {
            Some(token) => token,
            None => {
                pos += 1;
                args.str(pos - 1)?
            }
        };

        let vertex: i32 = vertex_token
            .parse()
            .map_err(|_| line.error(format!("`{group}` isn't a valid vertex reference")))?;
        let texture_vertex: i32 = texture_token
            .parse()
            .map_err(|_| line.error(format!("`{group}` isn't a valid texture vertex reference")))?;

        if vertex < 0 {
            return Err(line.error(format!("surface {index} references a null vertex")));
        }
        let vertex = vertex as usize;
        if vertex >= level.vertices.len() {
            return Err(ContentError::reference(
                file,
                format!("surface {index} uses vertex {vertex}, but only {} exist", level.vertices.len()),
            ));
        }

        let (texture_vertex, uv) = match texture_vertex {
            -1 => (None, None),
            tv => {
                let uv = usize::try_from(tv)
                    .ok()
                    .and_then(|tv| level.texture_vertices.get(tv))
                    .copied()
                    .ok_or_else(|| {
                        ContentError::reference(
                            file,
                            format!("surface {index} uses missing texture vertex {tv}"),
                        )
                    })?;
                (Some(tv as usize), Some(uv))
            }
        };

        vertices.push(SurfaceVertex {
            vertex,
            texture_vertex,
            uv,
            color: RGBAf::WHITE,
        });
    }

    // One intensity per vertex, or several channels when the count doesn't match
    let rgb = args.len().saturating_sub(pos) != vertex_count;
    if rgb && version == 1 {
        level.world_type = WorldType::Mots;
    }

    for vertex in vertices.iter_mut() {
        vertex.color = if rgb {
            let alpha = if level.world_type == WorldType::Mots {
                pos += 1;
                args.float(pos - 1)?.clamp(0.0, 1.0)
            } else {
                extra_light.a
            };
            let rgb = args.vec3(pos)?;
            pos += 3;
            RGBAf::new(rgb.x, rgb.y, rgb.z, alpha).clamped()
        } else {
            pos += 1;
            RGBAf::from_intensity(args.float(pos - 1)?).clamped()
        };
    }

    Ok(Surface {
        material_index,
        material,
        surface_flags,
        face_flags,
        geo_mode,
        light_mode,
        texture_mode,
        adjoin,
        extra_light,
        vertices,
        normal: Default::default(),
        sector: None,
    })
}

/// Looks a surface's material up. Indices outside the table mean "no material", except for the
/// static Infernal Machine materials.
fn resolve_material(level: &Level, version: i32, material_index: i32, surface: usize) -> Option<LevelMaterial> {
    let in_table = usize::try_from(material_index)
        .ok()
        .filter(|&index| index < level.materials.len());

    let material = match in_table {
        Some(index) => level.materials[index].clone(),
        None if version != 1 => STATIC_MATERIALS
            .iter()
            .find(|&&(index, _)| index == material_index)
            .map(|&(_, name)| LevelMaterial {
                name: name.to_string(),
                tile: Vec2::ONE,
            }),
        None => None,
    };

    match material {
        Some(material) if !material.name.to_ascii_lowercase().ends_with(".mat") => {
            error!(
                "Surface {surface} of `{}` uses material `{}`, which isn't a .mat file",
                level.name, material.name
            );
            None
        }
        None if material_index > -1 => {
            warn!(
                "Surface {surface} of `{}` uses material {material_index}, which isn't listed",
                level.name
            );
            None
        }
        material => material,
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        flags::{FaceFlags, GeoMode, LightMode, WorldType},
        jkl::tests::{parse, TWO_SECTORS},
        ContentError,
    };
    use glam::{Vec2, Vec3};

    fn level_with_surface(version: i32, materials: &str, surface: &str) -> String {
        format!(
            "SECTION: HEADER\nVersion {version}\n\
             SECTION: MATERIALS\nWorld materials 1\n{materials}\nend\n\
             SECTION: GEORESOURCE\n\
             World vertices 3\n0: 0 0 0\n1: 1 0 0\n2: 1 1 0\n\
             World texture vertices 1\n0: 32 16\n\
             World adjoins 0\n\
             World surfaces 1\n{surface}\n0: 0 0 1\n"
        )
    }

    #[test]
    fn surfaces_resolve_references() {
        let level = parse(TWO_SECTORS).unwrap();

        let floor = &level.surfaces[0];
        assert_eq!(floor.material.as_ref().unwrap().name, "floor.mat");
        assert_eq!(floor.vertices.len(), 4);
        assert_eq!(floor.vertices[2].uv, Some(Vec2::new(64.0, 64.0)));
        assert_eq!(floor.vertices[3].color.r, 0.4);
        assert_eq!(floor.normal, Vec3::Z);

        let wall = &level.surfaces[2];
        assert!(wall.face_flags.contains(FaceFlags::TRANSLUCENT));
        assert_eq!(wall.vertices[0].vertex, 1);
        assert_eq!(wall.vertices[0].texture_vertex, Some(0));
    }

    #[test]
    fn out_of_range_modes_are_clamped() {
        let text = level_with_surface(1, "0: a.mat 1 1", "0: 0 0x0 0x0 9 8 4 -1 0.5 3 0,0 1,0 2,0 1 1 1");
        let surface = &parse(&text).unwrap().surfaces[0];
        assert_eq!(surface.geo_mode, GeoMode::Textured);
        assert_eq!(surface.light_mode, LightMode::Gouraud);
    }

    #[test]
    fn missing_materials_drop_to_solid() {
        let text = level_with_surface(1, "0: a.mat 1 1", "0: 5 0x0 0x0 4 3 4 -1 0.5 3 0,-1 1,-1 2,-1 1 1 1");
        let surface = &parse(&text).unwrap().surfaces[0];
        assert!(surface.material.is_none());
        assert_eq!(surface.geo_mode, GeoMode::Solid);
        assert_eq!(surface.vertices[0].uv, None);
    }

    #[test]
    fn ijim_static_materials() {
        let text = level_with_surface(
            3,
            "0: a.mat",
            "0: 33092 0x0 0x100 4 3 4 -1 0 0 0 0.5 3 0,0 1,0 2,0 1 0 0 0 1 0 0 0 1",
        );
        let level = parse(&text).unwrap();
        let surface = &level.surfaces[0];

        assert_eq!(surface.material.as_ref().unwrap().name, "dflt.mat");
        assert_eq!(surface.vertices[1].color.g, 1.0);
        // IJIM takes vertex alpha from the extra light
        assert_eq!(surface.vertices[1].color.a, 0.5);
        assert_eq!(level.world_type, WorldType::Ijim);
    }

    #[test]
    fn rgb_colors_in_version_one_mean_mots() {
        let text = level_with_surface(
            1,
            "0: a.mat 1 1",
            "0: 0 0x0 0x0 4 3 4 -1 0.5 3 0,0 1,0 2,0 0.5 1 0 0 0.5 0 1 0 0.5 0 0 1",
        );
        let level = parse(&text).unwrap();
        assert_eq!(level.world_type, WorldType::Mots);
        assert_eq!(level.surfaces[0].vertices[2].color.b, 1.0);
        assert_eq!(level.surfaces[0].vertices[2].color.a, 0.5);
    }

    #[test]
    fn broken_references_fail() {
        let null_vertex = level_with_surface(1, "0: a.mat 1 1", "0: 0 0x0 0x0 4 3 4 -1 0.5 3 -1,0 1,0 2,0 1 1 1");
        assert!(matches!(parse(&null_vertex), Err(ContentError::MalformedRecord { .. })));

        let bad_adjoin = level_with_surface(1, "0: a.mat 1 1", "0: 0 0x0 0x0 4 3 4 2 0.5 3 0,0 1,0 2,0 1 1 1");
        assert!(matches!(parse(&bad_adjoin), Err(ContentError::ReferenceError { .. })));

        let bad_vertex = level_with_surface(1, "0: a.mat 1 1", "0: 0 0x0 0x0 4 3 4 -1 0.5 3 0,0 7,0 2,0 1 1 1");
        assert!(matches!(parse(&bad_vertex), Err(ContentError::ReferenceError { .. })));
    }
}
