use super::{
    coords, graph::NodeDesc, triangulate::triangulate, MaterialProvider, MeshData, SceneGraph, Submesh,
    WorldBuilder,
};
use anyhow::anyhow;
use glam::{Quat, Vec2, Vec3};
use holocron_content::{
    flags::WorldType,
    model::{HierarchyNode, Mesh, Model, MIN_VERSION},
};
use holocron_utils::{color::RGBAf, AnyResult};
use log::*;
use std::sync::Arc;

/// The mesh attached to one hierarchy node, already offset by the node's pivot
#[derive(Debug, Clone)]
pub struct ModelMesh<M> {
    pub name: String,
    pub mesh: MeshData<M>,
}

/// A model with its meshes built, instantiated once per thing using it
#[derive(Debug)]
pub struct ModelTemplate<M> {
    pub model: Arc<Model>,
    /// One entry per hierarchy node
    pub meshes: Vec<Option<Arc<ModelMesh<M>>>>,
}

impl<P: MaterialProvider> WorldBuilder<'_, P> {
    /// Loads a model and builds its meshes. Results are kept for the rest of the build, failures
    /// included.
    pub fn model_template(&mut self, name: &str) -> Option<Arc<ModelTemplate<P::Material>>> {
        let key = name.to_ascii_lowercase();
        if let Some(template) = self.models.get(&key) {
            return template.clone();
        }

        let template = match self.store.load::<Model>(&key) {
            Ok(model) => Some(Arc::new(self.build_template(model))),
            Err(e) => {
                error!("Couldn't load model `{key}`: {e}");
                None
            }
        };
        self.models.insert(key, template.clone());
        template
    }

    fn build_template(&mut self, model: Arc<Model>) -> ModelTemplate<P::Material> {
        let meshes = match model.geosets.first() {
            Some(geoset) => model
                .hierarchy
                .iter()
                .map(|node| {
                    let mesh = geoset.meshes.get(node.mesh?)?;
                    Some(Arc::new(self.build_model_mesh(&model, mesh, node)))
                })
                .collect(),
            None => {
                warn!("Model `{}` has no geosets", model.name);
                vec![None; model.hierarchy.len()]
            }
        };

        ModelTemplate { model, meshes }
    }

    /// Builds a node's mesh, with one submesh per material.
    fn build_model_mesh(&mut self, model: &Model, source: &Mesh, node: &HierarchyNode) -> ModelMesh<P::Material> {
        let divide_uvs =
            self.level.world_type != WorldType::Ijim && (model.version - MIN_VERSION).abs() < 1e-4;

        let mut mesh = MeshData::default();
        // Material name and its submesh, in order of first use
        let mut groups: Vec<(Option<&str>, usize)> = vec![];

        for face in &source.faces {
            let material_name = face.material.and_then(|i| model.materials.get(i)).map(String::as_str);

            let submesh = match groups.iter().find(|(name, _)| *name == material_name) {
                Some(&(_, submesh)) => submesh,
                None => {
                    let material = material_name.and_then(|name| {
                        self.material(name, face.light_mode, face.face_flags, true)
                    });
                    let slot = material.map(|material| {
                        mesh.materials.push(material);
                        mesh.materials.len() - 1
                    });
                    mesh.submeshes.push(Submesh {
                        material: slot,
                        indices: vec![],
                    });
                    groups.push((material_name, mesh.submeshes.len() - 1));
                    mesh.submeshes.len() - 1
                }
            };

            let texture_size = mesh.submeshes[submesh]
                .material
                .and_then(|slot| self.provider.texture_size(&mesh.materials[slot]))
                .filter(|_| divide_uvs)
                .map(|size| size.as_vec2());

            let start = mesh.positions.len() as u32;
            for vertex in &face.vertices {
                let position = source.vertices.get(vertex.vertex).copied().unwrap_or_default();
                mesh.positions.push(coords::to_scene(position + node.pivot));
                mesh.normals.push(
                    source
                        .vertex_normals
                        .get(vertex.vertex)
                        .copied()
                        .map(coords::to_scene)
                        .unwrap_or_default(),
                );
                mesh.colors
                    .push(source.vertex_colors.get(vertex.vertex).copied().unwrap_or(RGBAf::WHITE));

                let uv = vertex
                    .texture_vertex
                    .and_then(|tv| source.texture_vertices.get(tv))
                    .copied()
                    .unwrap_or(Vec2::ZERO);
                mesh.uvs.push(match texture_size {
                    Some(size) => uv / size,
                    None => uv,
                });
            }

            triangulate(start, face.vertices.len(), &mut mesh.submeshes[submesh].indices);
        }

        ModelMesh {
            name: source.name.clone(),
            mesh,
        }
    }
}

/// Creates the nodes of a model in a scene graph and returns its root.
///
/// The root is named after the model and carries the scene scale. All nodes are created first,
/// then attached to their parents.
pub fn instantiate<M, G: SceneGraph<M>>(template: &ModelTemplate<M>, graph: &mut G) -> AnyResult<G::Node> {
    let model = &template.model;
    let root = graph.create_node(NodeDesc {
        name: model.name.clone(),
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: coords::WORLD_SCALE,
        mesh: None,
    })?;

    let nodes = model
        .hierarchy
        .iter()
        .zip(&template.meshes)
        .map(|(node, mesh)| {
            graph.create_node(NodeDesc {
                name: node.name.clone(),
                position: coords::to_scene(node.position),
                rotation: coords::orientation(node.orientation),
                scale: 1.0,
                mesh: mesh.clone(),
            })
        })
        .collect::<AnyResult<Vec<_>>>()?;

    for (node, created) in model.hierarchy.iter().zip(&nodes) {
        let parent = match node.parent {
            Some(parent) => nodes
                .get(parent)
                .ok_or_else(|| anyhow!("node `{}` of `{}` has a missing parent", node.name, model.name))?,
            None => &root,
        };
        graph.attach(created, parent)?;
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{fixture_level, fixture_store},
        world::{NodeTree, StoreMaterials},
    };

    #[test]
    fn model_hierarchy_instantiates() {
        let mut store = fixture_store();
        let level = fixture_level(&mut store);
        let mut provider = StoreMaterials;
        let mut builder = WorldBuilder::new(&mut store, &mut provider, &level);

        let template = builder.model_template("CRATE.3DO").unwrap();
        let again = builder.model_template("crate.3do").unwrap();
        assert!(Arc::ptr_eq(&template, &again));
        assert!(template.meshes[0].is_none());

        let mut tree = NodeTree::new();
        let root = instantiate(&template, &mut tree).unwrap();
        let second = instantiate(&template, &mut tree).unwrap();
        assert_ne!(root, second);
        assert_eq!(tree.nodes().len(), 6);

        let lid = tree.find(root, "root/lid").unwrap();
        let desc = &tree.get(lid).unwrap().desc;
        assert_eq!(desc.position, Vec3::new(0.0, 1.0, 0.0));
        assert!(desc.rotation.abs_diff_eq(coords::orientation(Vec3::new(0.0, 90.0, 0.0)), 1e-6));
        assert_eq!(tree.world_scale(lid), 10.0);
        assert_eq!(tree.get(root).unwrap().desc.name, "crate.3do");
    }

    #[test]
    fn model_meshes_use_pivots_and_texture_size() {
        let mut store = fixture_store();
        let level = fixture_level(&mut store);
        let mut provider = StoreMaterials;
        let mut builder = WorldBuilder::new(&mut store, &mut provider, &level);

        let template = builder.model_template("crate.3do").unwrap();
        let quad = template.meshes[1].as_ref().unwrap();
        assert_eq!(quad.name, "quad");

        let mesh = &quad.mesh;
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.submeshes.len(), 1);
        assert_eq!(mesh.submeshes[0].material, Some(0));
        assert_eq!(mesh.submeshes[0].indices, [1, 0, 3, 2, 1, 3]);
        assert_eq!(mesh.materials[0].name, "crate.mat");
        assert!(mesh.materials[0].shading.transparent);

        // Vertex 1 is (1, 0, 0), the pivot adds 0.1 on X
        assert_eq!(mesh.positions[1], Vec3::new(1.1, 0.0, 0.0));
        assert_eq!(mesh.normals[1], Vec3::new(0.0, 1.0, 0.0));
        // 2.1 models divide texture coordinates by the 32x32 texture
        assert_eq!(mesh.uvs[2], Vec2::new(1.0, 1.0));
        assert_eq!(mesh.colors[0], RGBAf::from_intensity(0.5));
    }

    #[test]
    fn missing_models_are_remembered() {
        let mut store = fixture_store();
        let level = fixture_level(&mut store);
        let mut provider = StoreMaterials;
        let mut builder = WorldBuilder::new(&mut store, &mut provider, &level);
        assert!(builder.model_template("nothing.3do").is_none());
        assert!(builder.models.contains_key("nothing.3do"));
    }
}
