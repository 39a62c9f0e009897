use super::{coords, triangulate::triangulate, MaterialProvider, MeshData, Submesh, WorldBuilder};
use ahash::AHashMap;
use anyhow::anyhow;
use glam::{Vec2, Vec3};
use holocron_content::{
    flags::{FaceFlags, GeoMode, LightMode, SurfaceFlags, WorldType},
    jkl::{AmbientSound, Sector},
};
use holocron_utils::{color::RGBAf, AnyResult};
use log::*;

/// Sky drawn on ceiling surfaces, as a plane at a fixed height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CeilingSky {
    pub height: f32,
    pub offset: Vec2,
}

/// How one level surface ended up in its sector's mesh
#[derive(Debug, Clone, PartialEq)]
pub struct SectorSurface {
    /// Index into the level's surfaces
    pub surface: usize,
    /// Index into the mesh's submeshes
    pub submesh: usize,
    /// Index into the level's adjoins
    pub adjoin: Option<usize>,
    pub surface_flags: SurfaceFlags,
    pub face_flags: FaceFlags,
    pub geo_mode: GeoMode,
    pub light_mode: LightMode,
    pub extra_light: RGBAf,
    pub ceiling_sky: Option<CeilingSky>,
}

/// Point light approximating the lighting of an Infernal Machine sector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// Scene position, scaled
    pub position: Vec3,
    pub color: RGBAf,
    pub range: f32,
    pub intensity: f32,
}

#[derive(Debug, Clone)]
pub struct SectorMesh<M> {
    /// Index into the level's sectors
    pub index: usize,
    pub id: usize,
    pub flags: u32,
    pub mesh: MeshData<M>,
    pub surfaces: Vec<SectorSurface>,
    pub ambient_light: RGBAf,
    pub extra_light: RGBAf,
    pub tint: Option<RGBAf>,
    pub sound: Option<AmbientSound>,
    pub thrust: Option<Vec3>,
    pub point_light: Option<PointLight>,
}

/// Bit pattern of a position, positions shared by surfaces are exactly equal
fn position_key(p: Vec3) -> [u32; 3] {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

impl<P: MaterialProvider> WorldBuilder<'_, P> {
    /// Builds the mesh of a sector.
    ///
    /// Every surface becomes one submesh. Vertex normals are the average of the normals of all
    /// surfaces sharing the vertex position.
    pub fn build_sector(&mut self, index: usize) -> AnyResult<SectorMesh<P::Material>> {
        let level = self.level;
        let sector = level
            .sectors
            .get(index)
            .ok_or_else(|| anyhow!("sector {index} doesn't exist in `{}`", level.name))?;
        let surfaces = level.surfaces.get(sector.surfaces.clone()).ok_or_else(|| {
            anyhow!(
                "sector {index} of `{}` uses surfaces {:?}, but there are only {}",
                level.name,
                sector.surfaces,
                level.surfaces.len()
            )
        })?;

        let mut mesh = MeshData::default();
        let mut slots = AHashMap::new();
        let mut built_surfaces = Vec::with_capacity(surfaces.len());
        let mut normal_sums: AHashMap<[u32; 3], (Vec3, u32)> = AHashMap::new();

        for (offset, surface) in surfaces.iter().enumerate() {
            let light_mode = if surface.surface_flags.intersects(SurfaceFlags::SKY) {
                LightMode::Unlit
            } else {
                surface.light_mode
            };
            let alpha_hint =
                surface.adjoin.is_some() && surface.face_flags.contains(FaceFlags::TRANSLUCENT);

            let material = surface.material.as_ref().and_then(|m| {
                self.material(&m.name, light_mode, surface.face_flags, alpha_hint)
                    .map(|material| (m.name.to_ascii_lowercase(), material))
            });

            let mut texture_scale = Vec2::ONE;
            if level.header.version == 1 {
                if let Some((_, material)) = &material {
                    if let Some(size) = self.provider.texture_size(material) {
                        texture_scale = Vec2::ONE / size.as_vec2();
                    }
                }
            }

            let slot = material.map(|(name, material)| {
                *slots
                    .entry((name, light_mode, surface.face_flags, alpha_hint))
                    .or_insert_with(|| {
                        mesh.materials.push(material);
                        mesh.materials.len() - 1
                    })
            });

            let normal = coords::to_scene(surface.normal);
            let start = mesh.positions.len() as u32;
            for vertex in &surface.vertices {
                let position = level.vertices.get(vertex.vertex).copied().ok_or_else(|| {
                    anyhow!("surface {} uses a missing vertex {}", sector.surfaces.start + offset, vertex.vertex)
                })?;
                let position = coords::to_scene(position);

                let sum = normal_sums.entry(position_key(position)).or_insert((Vec3::ZERO, 0));
                sum.0 += normal;
                sum.1 += 1;

                mesh.positions.push(position);
                mesh.colors.push(vertex.color);
                mesh.uvs.push(match (vertex.uv, slot) {
                    (Some(uv), Some(_)) => uv * texture_scale,
                    _ => Vec2::ZERO,
                });
            }

            let mut indices = Vec::with_capacity(surface.vertices.len().saturating_sub(2) * 3);
            triangulate(start, surface.vertices.len(), &mut indices);
            mesh.submeshes.push(Submesh {
                material: slot,
                indices,
            });

            built_surfaces.push(SectorSurface {
                surface: sector.surfaces.start + offset,
                submesh: mesh.submeshes.len() - 1,
                adjoin: surface.adjoin,
                surface_flags: surface.surface_flags,
                face_flags: surface.face_flags,
                geo_mode: surface.geo_mode,
                light_mode,
                extra_light: surface.extra_light,
                ceiling_sky: surface
                    .surface_flags
                    .contains(SurfaceFlags::CEILING_SKY)
                    .then(|| CeilingSky {
                        height: level.header.ceiling_sky_z,
                        offset: level.header.ceiling_sky_offset,
                    }),
            });
        }

        mesh.normals = mesh
            .positions
            .iter()
            .map(|&p| match normal_sums.get(&position_key(p)) {
                Some(&(sum, count)) if count > 0 => sum / count as f32,
                _ => Vec3::ZERO,
            })
            .collect();

        let point_light = match level.world_type {
            WorldType::Ijim => point_light(sector, &mesh),
            _ => None,
        };

        trace!(
            "Built sector {index}: {} vertices, {} triangles, {} materials",
            mesh.vertex_count(),
            mesh.triangle_count(),
            mesh.materials.len()
        );

        Ok(SectorMesh {
            index,
            id: sector.id,
            flags: sector.flags,
            surfaces: built_surfaces,
            ambient_light: sector.ambient_light,
            extra_light: sector.extra_light,
            tint: sector.tint,
            sound: sector.sound.clone(),
            thrust: sector.thrust.map(coords::to_scene),
            point_light,
            mesh,
        })
    }
}

/// Needs both the average light intensity and position. Without a falloff, the range covers
/// the sector and the intensity is `1`.
fn point_light<M>(sector: &Sector, mesh: &MeshData<M>) -> Option<PointLight> {
    let color = sector.average_light_intensity?;
    let position = sector.average_light_position?;

    let (range, intensity) = match sector.average_light_falloff {
        Some(falloff) => (falloff.x / 4.0, falloff.y),
        None => (mesh.extents().length() / 2.0, 1.0),
    };

    Some(PointLight {
        position: coords::to_scene_scaled(position),
        color,
        range: coords::scale(range),
        intensity,
    })
}
