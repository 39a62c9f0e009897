//! Turns a parsed level into scene data: sector meshes, model hierarchies and placed things
//!
//! Everything produced here is plain data. Materials come from a [`MaterialProvider`] and model
//! nodes are created through a [`SceneGraph`], so the output can be fed to any engine. The crate
//! ships [`StoreMaterials`] and [`NodeTree`], which keep everything as data.
//!
//! Geometry is converted into a Y-up space (see [`coords`]). Sector meshes and model meshes stay
//! in game units; the scale is applied by [`World::scale`] for sectors, and by the root node of
//! every model instance.

use crate::assets::AssetStore;
use ahash::AHashMap;
use glam::{Vec2, Vec3};
use holocron_content::{
    cmp::ColorMap,
    flags::{FaceFlags, LightMode, WorldType},
    jkl::Level,
};
use holocron_utils::{color::RGBAf, AnyResult};
use log::*;
use std::sync::Arc;

pub mod animation;
pub mod coords;
pub mod graph;
pub mod model;
pub mod provider;
pub mod sector;
pub mod thing;
pub mod triangulate;

pub use graph::{NodeDesc, NodeTree, SceneGraph};
pub use provider::{MaterialProvider, MaterialRequest, StoreMaterials};

/// Triangles of a mesh drawn with one material
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submesh {
    /// Index into [`MeshData::materials`]
    pub material: Option<usize>,
    pub indices: Vec<u32>,
}

/// Vertex streams of equal length, plus the submeshes indexing into them
#[derive(Debug, Clone)]
pub struct MeshData<M> {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<RGBAf>,
    pub materials: Vec<M>,
    pub submeshes: Vec<Submesh>,
}

impl<M> Default for MeshData<M> {
    fn default() -> Self {
        Self {
            positions: vec![],
            normals: vec![],
            uvs: vec![],
            colors: vec![],
            materials: vec![],
            submeshes: vec![],
        }
    }
}

impl<M> MeshData<M> {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.indices.len() / 3).sum()
    }

    /// Half the size of the box around every position
    pub fn extents(&self) -> Vec3 {
        let Some(&first) = self.positions.first() else {
            return Vec3::ZERO;
        };
        let (min, max) = self
            .positions
            .iter()
            .fold((first, first), |(min, max), &p| (min.min(p), max.max(p)));
        (max - min) * 0.5
    }
}

/// Identifies a material request, for memoization
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MaterialKey {
    name: String,
    light_mode: LightMode,
    face_flags: FaceFlags,
    alpha_hint: bool,
}

/// A built level
#[derive(Debug)]
pub struct World<M, N> {
    pub name: String,
    pub world_type: WorldType,
    /// Scale of sector geometry in the scene
    pub scale: f32,
    pub palette: Arc<ColorMap>,
    pub sectors: Vec<sector::SectorMesh<M>>,
    pub things: Vec<thing::PlacedThing<M, N>>,
}

/// Builds the scene data of one level.
///
/// Materials and models are memoized for the duration of the build.
pub struct WorldBuilder<'a, P: MaterialProvider> {
    store: &'a mut AssetStore,
    provider: &'a mut P,
    level: &'a Level,
    palette: Arc<ColorMap>,
    materials: AHashMap<MaterialKey, Option<P::Material>>,
    models: AHashMap<String, Option<Arc<model::ModelTemplate<P::Material>>>>,
}

impl<'a, P: MaterialProvider> WorldBuilder<'a, P> {
    /// Prepares a build. The level's first colormap becomes the palette, a missing one is
    /// replaced by a gray ramp.
    pub fn new(store: &'a mut AssetStore, provider: &'a mut P, level: &'a Level) -> Self {
        let palette = match level.colormaps.first() {
            Some(name) => store.load_colormap(name).unwrap_or_else(|e| {
                error!("Couldn't load colormap `{name}` of `{}`: {e}", level.name);
                Arc::new(ColorMap::grayscale())
            }),
            None => {
                warn!("Level `{}` has no colormaps, using a grayscale palette", level.name);
                Arc::new(ColorMap::grayscale())
            }
        };

        Self {
            store,
            provider,
            level,
            palette,
            materials: AHashMap::new(),
            models: AHashMap::new(),
        }
    }

    pub fn palette(&self) -> &Arc<ColorMap> {
        &self.palette
    }

    /// Builds every sector and thing. A sector that can't be built fails the whole build,
    /// things that can't be placed are skipped.
    pub fn build<G: SceneGraph<P::Material>>(mut self, graph: &mut G) -> AnyResult<World<P::Material, G::Node>> {
        let sectors = (0..self.level.sectors.len())
            .map(|index| self.build_sector(index))
            .collect::<AnyResult<Vec<_>>>()?;
        let things = self.build_things(graph);

        info!(
            "Built `{}`: {} sectors, {} of {} things placed, {} materials",
            self.level.name,
            sectors.len(),
            things.len(),
            self.level.things.len(),
            self.materials.values().flatten().count()
        );

        Ok(World {
            name: self.level.name.clone(),
            world_type: self.level.world_type,
            scale: coords::WORLD_SCALE,
            palette: self.palette.clone(),
            sectors,
            things,
        })
    }

    /// Gets a material from the provider, or from earlier requests. Failures are logged once
    /// and remembered.
    pub(crate) fn material(
        &mut self,
        name: &str,
        light_mode: LightMode,
        face_flags: FaceFlags,
        alpha_hint: bool,
    ) -> Option<P::Material> {
        let key = MaterialKey {
            name: name.to_ascii_lowercase(),
            light_mode,
            face_flags,
            alpha_hint,
        };
        if let Some(material) = self.materials.get(&key) {
            return material.clone();
        }

        let request = MaterialRequest {
            name,
            light_mode,
            face_flags,
            palette: &self.palette,
            alpha_hint,
        };
        let material = match self.provider.provide(self.store, &request) {
            Ok(material) => Some(material),
            Err(e) => {
                warn!("Couldn't create material `{name}`: {e:#}");
                None
            }
        };

        self.materials.insert(key, material.clone());
        material
    }
}

/// Builds a level with the data-only material provider and scene graph.
pub fn build_level_data(
    store: &mut AssetStore,
    level: &Level,
) -> AnyResult<(World<crate::assets::MaterialInstance, usize>, NodeTree<crate::assets::MaterialInstance>)> {
    let mut provider = StoreMaterials;
    let mut tree = NodeTree::new();
    let world = WorldBuilder::new(store, &mut provider, level).build(&mut tree)?;
    Ok((world, tree))
}
