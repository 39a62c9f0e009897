use crate::assets::{AssetStore, MaterialInstance};
use glam::UVec2;
use holocron_content::{
    cmp::ColorMap,
    flags::{FaceFlags, LightMode},
};
use holocron_utils::AnyResult;

/// Everything needed to create a material for a surface, a model face or a sprite
#[derive(Debug, Clone, Copy)]
pub struct MaterialRequest<'a> {
    pub name: &'a str,
    pub light_mode: LightMode,
    pub face_flags: FaceFlags,
    pub palette: &'a ColorMap,
    /// Asks for a shader that blends or tests alpha
    pub alpha_hint: bool,
}

/// Creates the materials a built world refers to.
///
/// The builder calls this once per distinct request and keeps the result, so implementations
/// don't need their own cache.
pub trait MaterialProvider {
    type Material: Clone;

    fn provide(&mut self, store: &mut AssetStore, request: &MaterialRequest<'_>) -> AnyResult<Self::Material>;

    /// Texture size in texels, texture coordinates of some meshes are divided by it
    fn texture_size(&self, material: &Self::Material) -> Option<UVec2>;
}

/// Provides the decoded materials of the [`AssetStore`] as they are.
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreMaterials;

impl MaterialProvider for StoreMaterials {
    type Material = MaterialInstance;

    fn provide(&mut self, store: &mut AssetStore, request: &MaterialRequest<'_>) -> AnyResult<MaterialInstance> {
        Ok(store.load_material(
            request.name,
            request.light_mode,
            request.face_flags,
            request.palette,
            request.alpha_hint,
        )?)
    }

    fn texture_size(&self, material: &MaterialInstance) -> Option<UVec2> {
        material
            .material
            .size()
            .map(|(width, height)| UVec2::new(width, height))
    }
}
