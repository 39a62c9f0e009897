//! Game install configuration
//!
//! A configuration names the game root, the overlay directories whose loose files shadow
//! archived ones, and the containers to mount. Paths are relative to the root. Without a
//! configuration file, [`GameConfig::classic`] describes the retail installs of the supported
//! games.

use holocron_gob::Vfs;
use holocron_utils::{AnyResult, AnyhowResultExt};
use log::*;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Containers of Dark Forces II, Mysteries of the Sith and Infernal Machine installs, in mount
/// order. Most installs only have a few of them.
const CLASSIC_CONTAINERS: &[&str] = &[
    "Resource/Res1hi.gob",
    "Resource/Res2.gob",
    "Episode/JK1.GOB",
    "Episode/JK1CTF.GOB",
    "Episode/JK1MP.GOB",
    "Resource/JKMRES.GOO",
    "Resource/JKMsndLO.goo",
    "Episode/JKM.GOO",
    "Episode/JKM_KFY.GOO",
    "Episode/JKM_MP.GOO",
    "Episode/Jkm_saber.GOO",
    "Resource/cd1.gob",
    "Resource/cd2.gob",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub root: PathBuf,
    /// Searched before any container, in order
    pub overlays: Vec<PathBuf>,
    /// Mounted in order, the first container with a record wins
    pub containers: Vec<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::classic(".")
    }
}

impl GameConfig {
    /// The retail install layout under `root`
    pub fn classic(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overlays: vec![PathBuf::from("Resource")],
            containers: CLASSIC_CONTAINERS.iter().map(PathBuf::from).collect(),
        }
    }

    /// Reads a TOML configuration. A relative root is resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> AnyResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).otherwise(format!("couldn't read `{}`", path.display()))?;
        let mut config: GameConfig =
            toml::from_str(&text).otherwise(format!("couldn't parse `{}`", path.display()))?;

        if config.root.is_relative() {
            if let Some(parent) = path.parent() {
                config.root = parent.join(&config.root);
            }
        }

        debug!("Loaded configuration `{}`, game root `{}`", path.display(), config.root.display());
        Ok(config)
    }

    /// Builds a file system over the configured overlays and containers. Containers that
    /// don't exist are skipped; corrupt ones fail the whole mount.
    pub fn mount(&self) -> AnyResult<Vfs> {
        let mut vfs = Vfs::new();

        for overlay in &self.overlays {
            let path = self.root.join(overlay);
            if path.is_dir() {
                vfs.add_overlay_directory(path);
            } else {
                debug!("Overlay directory `{}` doesn't exist, skipping", path.display());
            }
        }

        for container in &self.containers {
            let path = self.root.join(container);
            if vfs
                .add_container(&path)
                .otherwise(format!("couldn't mount `{}`", path.display()))?
            {
                info!("Mounted `{}`", path.display());
            }
        }

        if vfs.containers().is_empty() && vfs.overlays().is_empty() {
            warn!("Nothing was mounted from `{}`", self.root.display());
        }

        Ok(vfs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_gob;

    #[test]
    fn partial_configs_use_defaults() {
        let config: GameConfig = toml::from_str("root = \"C:/Games/Jedi Knight\"").unwrap();
        assert_eq!(config.root, PathBuf::from("C:/Games/Jedi Knight"));
        assert_eq!(config.overlays, [PathBuf::from("Resource")]);
        assert_eq!(config.containers.len(), CLASSIC_CONTAINERS.len());
        assert_eq!(config.containers[0], PathBuf::from("Resource/Res1hi.gob"));
    }

    #[test]
    fn relative_roots_follow_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holocron.toml");
        fs::write(&path, "root = \"install\"\ncontainers = [\"Resource/test.gob\"]\n").unwrap();

        let config = GameConfig::load(&path).unwrap();
        assert_eq!(config.root, dir.path().join("install"));
        assert_eq!(config.containers, [PathBuf::from("Resource/test.gob")]);
    }

    #[test]
    fn broken_files_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holocron.toml");
        fs::write(&path, "root = [").unwrap();
        assert!(GameConfig::load(&path).is_err());
        assert!(GameConfig::load(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn mounting_skips_missing_containers() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Resource/mat")).unwrap();
        fs::write(dir.path().join("Resource/Res2.gob"), fixture_gob()).unwrap();
        fs::write(dir.path().join("Resource/mat/loose.mat"), b"loose").unwrap();

        let vfs = GameConfig::classic(dir.path()).mount().unwrap();
        assert_eq!(vfs.containers().len(), 1);
        assert_eq!(vfs.overlays().len(), 1);
        assert!(vfs.exists("jkl/test.jkl"));
        assert_eq!(vfs.read("mat/loose.mat").unwrap(), b"loose");
    }

    #[test]
    fn corrupt_containers_fail_the_mount() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Resource")).unwrap();
        fs::write(dir.path().join("Resource/Res1hi.gob"), b"not a container").unwrap();
        assert!(GameConfig::classic(dir.path()).mount().is_err());
    }
}
