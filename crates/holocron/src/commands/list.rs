use super::{matches_pattern, GameArgs};
use clap::Args;
use holocron_gob::Vfs;
use holocron_utils::{ok, AnyResult};
use itertools::Itertools;

#[derive(Args)]
pub struct ListCommand {
    #[command(flatten)]
    pub game: GameArgs,
    /// Only lists records matching one of these patterns (`mat/`, `*.jkl`)
    pub patterns: Vec<String>,
}

/// One line of the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub length: u64,
    pub container: String,
}

impl ListCommand {
    /// Selected records, sorted by name
    pub fn entries(&self, vfs: &Vfs) -> Vec<ListEntry> {
        vfs.entries()
            .filter(|(name, _)| self.patterns.is_empty() || self.patterns.iter().any(|p| matches_pattern(name, p)))
            .map(|(name, record)| ListEntry {
                name: name.to_string(),
                length: record.length,
                container: vfs
                    .record(name)
                    .map(|(container, _)| container.label().to_string())
                    .unwrap_or_default(),
            })
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect()
    }
}

impl crate::Command for ListCommand {
    fn run(self) -> AnyResult {
        let vfs = self.game.mount()?;
        let entries = self.entries(&vfs);

        for entry in &entries {
            println!("{:>10}  {}  ({})", entry.length, entry.name, entry.container);
        }
        println!(
            "{} records, {} bytes",
            entries.len(),
            entries.iter().map(|e| e.length).sum::<u64>()
        );

        ok()
    }
}
