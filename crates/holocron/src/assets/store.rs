use super::{AssetError, AssetResult};
use ahash::AHashMap;
use holocron_content::{
    cmp::ColorMap,
    flags::{FaceFlags, LightMode},
    jkl::Level,
    key::Animation,
    mat::Material,
    model::Model,
    puppet::Puppet,
    sprite::Sprite,
    ContentResult,
};
use holocron_gob::{normalize_name, GobError, Vfs, VfsStream};
use log::*;
use std::{io::BufReader, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Sprite,
    Model,
    Puppet,
    ColorMap,
    Animation,
    Material,
    Level,
    Sound,
}

impl AssetKind {
    /// Directories searched for assets of this kind, in order
    pub fn directories(self) -> &'static [&'static str] {
        match self {
            AssetKind::Sprite => &["misc/spr"],
            AssetKind::Model => &["3do"],
            AssetKind::Puppet => &["misc/pup"],
            AssetKind::ColorMap => &["misc/cmp"],
            AssetKind::Animation => &["3do/key"],
            AssetKind::Material => &["mat", "3do/mat"],
            AssetKind::Level => &["jkl", "ndy"],
            AssetKind::Sound => &["sound"],
        }
    }
}

/// An asset type with its own cache in the [`AssetStore`].
pub trait StoredAsset: Sized + 'static {
    const KIND: AssetKind;

    fn parse(name: &str, stream: VfsStream) -> ContentResult<Self>;
    fn cache(store: &mut AssetStore) -> &mut AHashMap<String, Arc<Self>>;
}

macro_rules! stored_text_asset {
    ($t:ty, $kind:ident, $cache:ident) => {
        impl StoredAsset for $t {
            const KIND: AssetKind = AssetKind::$kind;

            fn parse(name: &str, stream: VfsStream) -> ContentResult<Self> {
                <$t>::parse(name, BufReader::new(stream))
            }

            fn cache(store: &mut AssetStore) -> &mut AHashMap<String, Arc<Self>> {
                &mut store.$cache
            }
        }
    };
}

stored_text_asset!(Sprite, Sprite, sprites);
stored_text_asset!(Model, Model, models);
stored_text_asset!(Puppet, Puppet, puppets);
stored_text_asset!(Animation, Animation, animations);

impl StoredAsset for ColorMap {
    const KIND: AssetKind = AssetKind::ColorMap;

    fn parse(name: &str, stream: VfsStream) -> ContentResult<Self> {
        ColorMap::parse(name, BufReader::new(stream))
    }

    fn cache(store: &mut AssetStore) -> &mut AHashMap<String, Arc<Self>> {
        &mut store.colormaps
    }
}

/// Result of [`AssetStore::load_kind`]
#[derive(Debug, Clone)]
pub enum LoadedAsset {
    Sprite(Arc<Sprite>),
    Model(Arc<Model>),
    Puppet(Arc<Puppet>),
    ColorMap(Arc<ColorMap>),
    Animation(Arc<Animation>),
}

impl LoadedAsset {
    pub fn kind(&self) -> AssetKind {
        match self {
            LoadedAsset::Sprite(_) => AssetKind::Sprite,
            LoadedAsset::Model(_) => AssetKind::Model,
            LoadedAsset::Puppet(_) => AssetKind::Puppet,
            LoadedAsset::ColorMap(_) => AssetKind::ColorMap,
            LoadedAsset::Animation(_) => AssetKind::Animation,
        }
    }
}

/// How a material should be drawn. Built fresh for every [`AssetStore::load_material`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shading {
    pub light_mode: LightMode,
    /// Alpha tested/blended shader variant was asked for
    pub transparent: bool,
    /// Drawn after the opaque geometry (RGBA textures and translucent faces)
    pub render_late: bool,
    pub z_write: bool,
    pub double_sided: bool,
}

impl Shading {
    pub fn new(material: &Material, light_mode: LightMode, face_flags: FaceFlags, transparent: bool) -> Self {
        Self {
            light_mode,
            transparent,
            render_late: material.has_alpha() || face_flags.contains(FaceFlags::TRANSLUCENT),
            z_write: !face_flags.intersects(FaceFlags::TRANSLUCENT | FaceFlags::ZWRITE_OFF),
            double_sided: face_flags.contains(FaceFlags::DOUBLE_SIDED),
        }
    }
}

/// A decoded material with the shading it was requested with
#[derive(Debug, Clone)]
pub struct MaterialInstance {
    pub name: String,
    pub material: Arc<Material>,
    pub face_flags: FaceFlags,
    pub shading: Shading,
}

/// Loads assets through a [`Vfs`] and caches them by lowercase file name.
///
/// Every asset kind has its own cache. Decoded materials are cached per palette, since indexed
/// textures are resolved through it.
pub struct AssetStore {
    vfs: Vfs,
    sprites: AHashMap<String, Arc<Sprite>>,
    models: AHashMap<String, Arc<Model>>,
    puppets: AHashMap<String, Arc<Puppet>>,
    colormaps: AHashMap<String, Arc<ColorMap>>,
    animations: AHashMap<String, Arc<Animation>>,
    /// (palette, material) -> decoded material
    materials: AHashMap<(String, String), Arc<Material>>,
}

impl AssetStore {
    pub fn new(vfs: Vfs) -> Self {
        Self {
            vfs,
            sprites: AHashMap::new(),
            models: AHashMap::new(),
            puppets: AHashMap::new(),
            colormaps: AHashMap::new(),
            animations: AHashMap::new(),
            materials: AHashMap::new(),
        }
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    /// Finds the logical path of an asset, trying each directory of its kind in order. Names that
    /// already include a directory are accepted as they are.
    pub fn resolve(&self, kind: AssetKind, name: &str) -> AssetResult<String> {
        let name = normalize_name(name);
        kind.directories()
            .iter()
            .map(|dir| format!("{dir}/{name}"))
            .chain(std::iter::once(name.clone()))
            .find(|path| self.vfs.exists(path))
            .ok_or_else(|| GobError::NotFound(name).into())
    }

    /// Loads an asset, or returns the cached copy.
    pub fn load<T: StoredAsset>(&mut self, name: &str) -> AssetResult<Arc<T>> {
        let key = normalize_name(name);
        if let Some(asset) = T::cache(self).get(&key) {
            return Ok(asset.clone());
        }

        let path = self.resolve(T::KIND, &key)?;
        trace!("Loading {:?} `{key}` from `{path}`", T::KIND);
        let asset = Arc::new(T::parse(&key, self.vfs.open(&path)?)?);
        T::cache(self).insert(key, asset.clone());
        Ok(asset)
    }

    /// Dynamic form of [`AssetStore::load`]. Materials, levels and sounds need more than a name
    /// and fail with [`AssetError::UnsupportedAssetKind`].
    pub fn load_kind(&mut self, kind: AssetKind, name: &str) -> AssetResult<LoadedAsset> {
        Ok(match kind {
            AssetKind::Sprite => LoadedAsset::Sprite(self.load(name)?),
            AssetKind::Model => LoadedAsset::Model(self.load(name)?),
            AssetKind::Puppet => LoadedAsset::Puppet(self.load(name)?),
            AssetKind::ColorMap => LoadedAsset::ColorMap(self.load(name)?),
            AssetKind::Animation => LoadedAsset::Animation(self.load(name)?),
            AssetKind::Material | AssetKind::Level | AssetKind::Sound => {
                return Err(AssetError::UnsupportedAssetKind(kind))
            }
        })
    }

    pub fn load_colormap(&mut self, name: &str) -> AssetResult<Arc<ColorMap>> {
        self.load(name)
    }

    /// Parses a level from `jkl/` or `ndy/`. Levels aren't cached, every call parses the file
    /// again.
    pub fn load_level(&mut self, name: &str) -> AssetResult<Level> {
        let path = self.resolve(AssetKind::Level, name)?;
        info!("Loading level `{path}`");
        let stream = self.vfs.open(&path)?;
        Ok(Level::parse(&normalize_name(name), BufReader::new(stream))?)
    }

    /// Loads a material, searching `mat/` and then `3do/mat/`.
    ///
    /// The decoded material is cached; the returned shading is built for this request.
    pub fn load_material(
        &mut self,
        name: &str,
        light_mode: LightMode,
        face_flags: FaceFlags,
        palette: &ColorMap,
        transparent: bool,
    ) -> AssetResult<MaterialInstance> {
        let key = (palette.name.to_ascii_lowercase(), normalize_name(name));

        let material = match self.materials.get(&key) {
            Some(material) => material.clone(),
            None => {
                let path = self.resolve(AssetKind::Material, &key.1)?;
                trace!("Decoding material `{path}` with palette `{}`", palette.name);
                let stream = BufReader::new(self.vfs.open(&path)?);
                let material = Arc::new(Material::parse(&key.1, stream, Some(palette))?);
                self.materials.insert(key.clone(), material.clone());
                material
            }
        };

        Ok(MaterialInstance {
            name: key.1,
            shading: Shading::new(&material, light_mode, face_flags, transparent),
            material,
            face_flags,
        })
    }

    /// Drops every cached asset.
    pub fn clear(&mut self) {
        self.sprites.clear();
        self.models.clear();
        self.puppets.clear();
        self.colormaps.clear();
        self.animations.clear();
        self.materials.clear();
    }
}
