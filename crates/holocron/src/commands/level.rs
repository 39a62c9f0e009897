use super::GameArgs;
use crate::{
    assets::{AssetStore, MaterialInstance},
    world::{build_level_data, World},
};
use clap::Args;
use holocron_content::flags::WorldType;
use holocron_utils::{ok, AnyResult};

#[derive(Args)]
pub struct LevelCommand {
    #[command(flatten)]
    pub game: GameArgs,
    /// Level file, with or without its `jkl/` or `ndy/` directory
    pub level: String,
    /// Also lists every placed thing
    #[clap(long)]
    pub things: bool,
}

/// Counts printed once a level is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSummary {
    pub name: String,
    pub world_type: WorldType,
    pub sectors: usize,
    pub surfaces: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub materials: usize,
    pub things: usize,
    pub skipped_things: usize,
    pub models: usize,
    pub sprites: usize,
    pub animations: usize,
}

impl LevelSummary {
    pub fn new(world: &World<MaterialInstance, usize>, level_things: usize) -> Self {
        let mut material_names: Vec<&str> = world
            .sectors
            .iter()
            .flat_map(|s| s.mesh.materials.iter().map(|m| m.name.as_str()))
            .collect();
        material_names.sort_unstable();
        material_names.dedup();

        Self {
            name: world.name.clone(),
            world_type: world.world_type,
            sectors: world.sectors.len(),
            surfaces: world.sectors.iter().map(|s| s.surfaces.len()).sum(),
            vertices: world.sectors.iter().map(|s| s.mesh.vertex_count()).sum(),
            triangles: world.sectors.iter().map(|s| s.mesh.triangle_count()).sum(),
            materials: material_names.len(),
            things: world.things.len(),
            skipped_things: level_things.saturating_sub(world.things.len()),
            models: world.things.iter().filter(|t| t.model.is_some()).count(),
            sprites: world.things.iter().filter(|t| t.sprite.is_some()).count(),
            animations: world.things.iter().filter(|t| t.animation.is_some()).count(),
        }
    }
}

impl crate::Command for LevelCommand {
    fn run(self) -> AnyResult {
        let mut store = AssetStore::new(self.game.mount()?);
        let level = store.load_level(&self.level)?;
        let (world, tree) = build_level_data(&mut store, &level)?;
        let summary = LevelSummary::new(&world, level.things.len());

        println!("{} ({:?}, version {})", summary.name, summary.world_type, level.header.version);
        println!("  palette:   {}", world.palette.name);
        println!(
            "  sectors:   {} ({} surfaces, {} vertices, {} triangles)",
            summary.sectors, summary.surfaces, summary.vertices, summary.triangles
        );
        println!("  materials: {}", summary.materials);
        println!(
            "  things:    {} placed, {} skipped ({} models, {} sprites, {} animated)",
            summary.things, summary.skipped_things, summary.models, summary.sprites, summary.animations
        );
        println!("  nodes:     {}", tree.nodes().len());

        if self.things {
            for thing in &world.things {
                println!(
                    "  {:>5} {:<24} {:<10} sector {:<4} at ({:.2}, {:.2}, {:.2})",
                    thing.index,
                    thing.name,
                    thing.kind.as_deref().unwrap_or("-"),
                    thing.sector,
                    thing.position.x,
                    thing.position.y,
                    thing.position.z
                );
            }
        }

        ok()
    }
}
