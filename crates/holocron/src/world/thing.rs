use super::{animation::AnimationClip, coords, model, MaterialProvider, SceneGraph, WorldBuilder};
use glam::{Quat, Vec2, Vec3};
use holocron_content::{
    flags::{FaceFlags, WorldType},
    jkl::Thing,
    key::Animation,
    model::Model,
    puppet::Puppet,
    sprite::{Sprite, SpriteType},
};
use holocron_utils::color::RGBAf;
use log::*;
use std::sync::Arc;

/// Size of things that don't say otherwise, and the radius of things without a model
const DEFAULT_SIZE: f32 = 0.05;
const DEFAULT_MODEL_RADIUS: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    /// Upright capsule, in scene units
    Capsule { radius: f32, height: f32 },
    /// Collides with the faces of the thing's model
    Mesh,
}

#[derive(Debug, Clone)]
pub struct SpriteInstance<M> {
    pub sprite: Arc<Sprite>,
    pub material: M,
    /// Scene units
    pub size: Vec2,
    pub face_camera: bool,
}

/// Lighting of the sector a thing stands in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorLighting {
    pub ambient: RGBAf,
    pub extra: RGBAf,
    /// Infernal Machine levels don't tint their things
    pub tint: Option<RGBAf>,
}

#[derive(Debug, Clone)]
pub struct PlacedThing<M, N> {
    /// Index into the level's things
    pub index: usize,
    pub name: String,
    /// The `type` parameter
    pub kind: Option<String>,
    /// Templates the thing derives from, closest first
    pub templates: Vec<String>,
    pub sector: usize,
    /// Scene position, scaled
    pub position: Vec3,
    pub rotation: Quat,
    /// Root node of the model instance
    pub model: Option<N>,
    pub sprite: Option<SpriteInstance<M>>,
    pub collider: Option<Collider>,
    /// Standing animation of the thing's puppet
    pub animation: Option<AnimationClip>,
    /// Things that never move (`move` absent or `none`)
    pub is_static: bool,
    pub lighting: SectorLighting,
}

impl<P: MaterialProvider> WorldBuilder<'_, P> {
    /// Places every thing of the level. Things that can't be placed are logged and left out.
    pub fn build_things<G: SceneGraph<P::Material>>(&mut self, graph: &mut G) -> Vec<PlacedThing<P::Material, G::Node>> {
        let level = self.level;
        level
            .things
            .iter()
            .enumerate()
            .filter_map(|(index, thing)| self.place_thing(index, thing, graph))
            .collect()
    }

    /// Places a thing. Returns `None` if it isn't in a valid sector; anything else that fails
    /// to load is left out of the thing.
    pub fn place_thing<G: SceneGraph<P::Material>>(
        &mut self,
        index: usize,
        thing: &Thing,
        graph: &mut G,
    ) -> Option<PlacedThing<P::Material, G::Node>> {
        let level = self.level;
        let Some((sector_index, sector)) = thing
            .sector
            .and_then(|s| level.sectors.get(s).map(|sector| (s, sector)))
        else {
            error!(
                "Thing {index} (`{}`) is in sector {:?}, which doesn't exist, skipping",
                thing.name, thing.sector
            );
            return None;
        };

        let kind = thing.param("type");

        let mut model_root = None;
        let mut model_data: Option<Arc<Model>> = None;
        if let Some(model_name) = thing.param("model3d") {
            if let Some(template) = self.model_template(model_name) {
                match model::instantiate(&template, graph) {
                    Ok(root) => {
                        model_root = Some(root);
                        model_data = Some(template.model.clone());
                    }
                    Err(e) => error!("Couldn't create model `{model_name}` of thing `{}`: {e:#}", thing.name),
                }
            }
        }

        let sprite = match (model_root.is_none(), kind) {
            (true, Some("sprite")) => self.sprite_instance(thing),
            _ => None,
        };

        let mut model_radius = model_data.as_ref().map_or(DEFAULT_MODEL_RADIUS, |m| m.radius);
        if level.header.version == 1 {
            model_radius /= 2.0;
        }

        let collider = match thing.param("collide").and_then(|c| c.parse::<i32>().ok()) {
            Some(1) => Some(Collider::Capsule {
                radius: coords::scale(param_or(thing, "size", DEFAULT_SIZE)),
                height: coords::scale(model_radius * 2.0),
            }),
            Some(3) if model_root.is_some() => Some(Collider::Mesh),
            _ => None,
        };

        let animation = match (&model_data, thing.param("puppet")) {
            (Some(model), Some(puppet)) => self.standing_animation(model, puppet),
            _ => None,
        };

        let is_static = matches!(thing.param("move"), None | Some("none"));

        Some(PlacedThing {
            index,
            name: thing.name.clone(),
            kind: kind.map(str::to_string),
            templates: thing.template_chain().map(str::to_string).collect(),
            sector: sector_index,
            position: coords::to_scene_scaled(thing.position),
            rotation: coords::orientation(thing.orientation),
            model: model_root,
            sprite,
            collider,
            animation,
            is_static,
            lighting: SectorLighting {
                ambient: sector.ambient_light,
                extra: sector.extra_light,
                tint: match level.world_type {
                    WorldType::Ijim => None,
                    _ => sector.tint,
                },
            },
        })
    }

    fn sprite_instance(&mut self, thing: &Thing) -> Option<SpriteInstance<P::Material>> {
        let Some(name) = thing.param("sprite") else {
            warn!("Sprite thing `{}` has no sprite parameter", thing.name);
            return None;
        };

        let sprite = match self.store.load::<Sprite>(name) {
            Ok(sprite) => sprite,
            Err(e) => {
                error!("Couldn't load sprite `{name}` of thing `{}`: {e}", thing.name);
                return None;
            }
        };

        let material = self.material(&sprite.material, sprite.light_mode, FaceFlags::TRANSLUCENT, true)?;
        Some(SpriteInstance {
            size: sprite.size * coords::WORLD_SCALE,
            face_camera: sprite.kind == SpriteType::FaceCamera,
            material,
            sprite,
        })
    }

    /// Finds the `stand` submode of puppet mode 0 and builds its animation.
    fn standing_animation(&mut self, model: &Model, puppet_name: &str) -> Option<AnimationClip> {
        let puppet = match self.store.load::<Puppet>(puppet_name) {
            Ok(puppet) => puppet,
            Err(e) => {
                error!("Couldn't load puppet `{puppet_name}`: {e}");
                return None;
            }
        };

        let Some(submode) = puppet.submode(0, "stand") else {
            debug!("Puppet `{puppet_name}` has no standing animation");
            return None;
        };

        match self.store.load::<Animation>(&submode.key_file) {
            Ok(animation) => Some(AnimationClip::new(&animation, model)),
            Err(e) => {
                error!("Couldn't load animation `{}` of `{puppet_name}`: {e}", submode.key_file);
                None
            }
        }
    }
}

fn param_or(thing: &Thing, key: &str, default: f32) -> f32 {
    thing
        .param(key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{fixture_level, fixture_store},
        world::{NodeTree, StoreMaterials},
    };

    fn placed(level: &holocron_content::jkl::Level) -> (Vec<PlacedThing<crate::assets::MaterialInstance, usize>>, NodeTree<crate::assets::MaterialInstance>) {
        let mut store = fixture_store();
        let mut provider = StoreMaterials;
        let mut tree = NodeTree::new();
        let mut builder = WorldBuilder::new(&mut store, &mut provider, level);
        let things = builder.build_things(&mut tree);
        (things, tree)
    }

    fn find<'a, M, N>(things: &'a [PlacedThing<M, N>], name: &str) -> &'a PlacedThing<M, N> {
        things.iter().find(|t| t.name == name).unwrap()
    }

    #[test]
    fn model_things() {
        let mut store = fixture_store();
        let level = fixture_level(&mut store);
        let (things, tree) = placed(&level);

        let crate_thing = find(&things, "crate");
        assert_eq!(crate_thing.kind.as_deref(), Some("cog"));
        assert_eq!(crate_thing.sector, 0);
        assert_eq!(crate_thing.position, Vec3::new(5.0, 0.0, 5.0));
        assert!(crate_thing.is_static);

        let root = crate_thing.model.unwrap();
        assert_eq!(tree.get(root).unwrap().desc.name, "crate.3do");
        assert!(tree.find(root, "root/lid").is_some());

        // Version 1 levels halve the model radius
        assert_eq!(
            crate_thing.collider,
            Some(Collider::Capsule {
                radius: 1.0,
                height: 5.0
            })
        );

        let clip = crate_thing.animation.as_ref().unwrap();
        assert_eq!(clip.name, "lidopen.key");
        assert_eq!(clip.curves[0].path, "root/lid");

        assert_eq!(crate_thing.lighting.ambient, RGBAf::from_intensity(0.5));
        assert_eq!(crate_thing.lighting.tint, Some(RGBAf::new(0.1, 0.2, 0.3, 1.0)));
    }

    #[test]
    fn templates_and_overrides() {
        let mut store = fixture_store();
        let level = fixture_level(&mut store);
        let (things, _) = placed(&level);

        let guard = find(&things, "guard");
        assert_eq!(guard.templates, ["_walker", "_base"]);
        assert_eq!(guard.kind.as_deref(), Some("actor"));
        assert!(!guard.is_static);
        assert_eq!(level.things[guard.index].param("mass"), Some("99"));
        assert_eq!(level.templates["_walker"].param("mass"), Some("50"));

        // No model, so the default radius is used; mesh collision needs a model
        assert_eq!(
            guard.collider,
            Some(Collider::Capsule {
                radius: coords::scale(0.065),
                height: coords::scale(DEFAULT_MODEL_RADIUS),
            })
        );
        assert!(guard.model.is_none());
        assert!(guard.animation.is_none());
    }

    #[test]
    fn sprite_things() {
        let mut store = fixture_store();
        let level = fixture_level(&mut store);
        let (things, _) = placed(&level);

        let torch = find(&things, "torch");
        let sprite = torch.sprite.as_ref().unwrap();
        assert!(sprite.face_camera);
        assert_eq!(sprite.size, Vec2::new(0.5, 1.0));
        assert_eq!(sprite.material.name, "gray.mat");
        assert!(!sprite.material.shading.z_write);
        assert!(torch.model.is_none());

        // Missing sprite parameter, still placed
        let broken = find(&things, "nosprite");
        assert!(broken.sprite.is_none());
    }

    #[test]
    fn invalid_sectors_and_failed_loads() {
        let mut store = fixture_store();
        let level = fixture_level(&mut store);
        let (things, _) = placed(&level);

        assert!(things.iter().all(|t| t.name != "lost"));
        assert_eq!(things.len(), level.things.len() - 1);

        let ghost = find(&things, "ghost");
        assert!(ghost.model.is_none());
        assert_eq!(ghost.collider, None);
    }

    #[test]
    fn infernal_machine_things_are_not_tinted() {
        let mut store = fixture_store();
        let mut level = fixture_level(&mut store);
        level.world_type = WorldType::Ijim;
        let (things, _) = placed(&level);
        assert_eq!(find(&things, "crate").lighting.tint, None);
    }
}
