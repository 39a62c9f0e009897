use crate::config::GameConfig;
use clap::Args;
use glob::{MatchOptions, Pattern};
use holocron_gob::Vfs;
use holocron_utils::AnyResult;
use log::*;
use std::path::PathBuf;

pub mod extract;
pub mod level;
pub mod list;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Where the game data comes from, shared by every command
#[derive(Debug, Clone, Default, Args)]
pub struct GameArgs {
    #[clap(long, short = 'r')]
    /// Overrides the game root, the directory with `Resource` and `Episode` in it
    pub root: Option<PathBuf>,

    #[clap(long, short = 'c')]
    /// TOML file describing the game install. The classic layout is used without one.
    pub config: Option<PathBuf>,
}

impl GameArgs {
    pub fn config(&self) -> AnyResult<GameConfig> {
        let mut config = match &self.config {
            Some(path) => GameConfig::load(path)?,
            None => GameConfig::default(),
        };
        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        Ok(config)
    }

    pub fn mount(&self) -> AnyResult<Vfs> {
        self.config()?.mount()
    }
}

/// Whether a normalized record name is selected by a glob pattern, ignoring case. A pattern
/// ending with `/` selects a whole directory. Malformed patterns select nothing.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    let mut pattern = holocron_gob::normalize_name(pattern);
    if pattern.ends_with('/') {
        pattern.push('*');
    }

    match Pattern::new(&pattern) {
        Ok(pattern) => pattern.matches_with(name, MATCH_OPTIONS),
        Err(error) => {
            debug!("Bad pattern `{pattern}`: {error}");
            false
        }
    }
}
