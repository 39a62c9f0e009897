use super::{matches_pattern, GameArgs};
use anyhow::bail;
use clap::Args;
use holocron_gob::Vfs;
use holocron_utils::{ok, AnyResult, AnyhowResultExt};
use log::*;
use std::{fs, path::PathBuf};

#[derive(Args)]
pub struct ExtractCommand {
    #[command(flatten)]
    pub game: GameArgs,
    /// Output directory, records keep their archive paths under it
    #[clap(long, short = 'o')]
    pub output: PathBuf,
    /// Records to extract (`jkl/01narshadda.jkl`, `mat/`, `*.cmp`)
    #[arg(required = true)]
    pub patterns: Vec<String>,
}

impl ExtractCommand {
    /// Writes every selected record and returns how many there were. Overlay files are read
    /// instead of archived records of the same name.
    pub fn extract(&self, vfs: &Vfs) -> AnyResult<usize> {
        let mut names: Vec<String> = vfs
            .entries()
            .map(|(name, _)| name)
            .filter(|name| self.patterns.iter().any(|p| matches_pattern(name, p)))
            .map(str::to_string)
            .collect();
        names.sort();

        if names.is_empty() {
            bail!("no records match {:?}", self.patterns);
        }

        for name in &names {
            let path = self.output.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).otherwise(format!("couldn't create `{}`", parent.display()))?;
            }

            let data = vfs.read(name).otherwise(format!("couldn't read `{name}`"))?;
            fs::write(&path, &data).otherwise(format!("couldn't write `{}`", path.display()))?;
            debug!("Extracted `{name}` ({} bytes)", data.len());
        }

        Ok(names.len())
    }
}

impl crate::Command for ExtractCommand {
    fn run(self) -> AnyResult {
        let vfs = self.game.mount()?;
        let count = self.extract(&vfs)?;
        println!("Extracted {count} records into {}", self.output.display());
        ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_store, QUAD_3DO};

    fn command(output: PathBuf, patterns: &[&str]) -> ExtractCommand {
        ExtractCommand {
            game: GameArgs::default(),
            output,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn records_keep_their_paths() {
        let store = fixture_store();
        let dir = tempfile::tempdir().unwrap();

        let count = command(dir.path().to_path_buf(), &["3do/*.3do", "misc/cmp/"])
            .extract(store.vfs())
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(fs::read_to_string(dir.path().join("3do/crate.3do")).unwrap(), QUAD_3DO);
        assert!(dir.path().join("misc/cmp/dflt.cmp").is_file());
        assert!(!dir.path().join("mat").exists());
    }

    #[test]
    fn nothing_selected_is_an_error() {
        let store = fixture_store();
        let dir = tempfile::tempdir().unwrap();
        assert!(command(dir.path().to_path_buf(), &["*.wav"]).extract(store.vfs()).is_err());
    }
}
