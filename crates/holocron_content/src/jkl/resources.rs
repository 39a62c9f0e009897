use super::{LevelMaterial, Parser};
use crate::{tokenizer::Line, ContentResult};
use glam::Vec2;
use std::io::BufRead;

const WORLD_SOUNDS: &[(&str, ())] = &[("WORLD SOUNDS", ())];
const WORLD_MATERIALS: &[(&str, ())] = &[("WORLD MATERIALS", ())];
const WORLD_MODELS: &[(&str, ())] = &[("WORLD MODELS", ())];

impl<R: BufRead> Parser<R> {
    /// Reads the first line of a list section, which must be the given count declaration.
    pub(super) fn expect_count(&mut self, table: &[(&str, ())], what: &str) -> ContentResult<Option<usize>> {
        let Some(line) = self.lines.next_in_section()? else {
            return Ok(None);
        };
        match line.keyword(table) {
            Some((_, args)) => Ok(Some(args.uint(0)? as usize)),
            None => Err(line.error(format!("expected the {what} count"))),
        }
    }

    pub(super) fn parse_sounds(&mut self) -> ContentResult<()> {
        if let Some(count) = self.expect_count(WORLD_SOUNDS, "sound")? {
            self.level.sounds.reserve(count);
            self.read_until_end(|level, args| {
                level.sounds.push(args.line().text().to_string());
                Ok(())
            })?;
        }
        self.lines.skip_section()
    }

    pub(super) fn parse_materials(&mut self) -> ContentResult<()> {
        let version = self.version("MATERIALS")?;
        let Some(count) = self.expect_count(WORLD_MATERIALS, "material")? else {
            return Ok(());
        };

        self.level.materials = vec![None; count];
        self.level.material_count = count;

        for sequence in 0..count {
            let line = self.lines.expect_in_section("a material entry")?;
            if line.is_end() {
                self.level.material_count = sequence;
                break;
            }

            let (index, material) = parse_material(&line, sequence, version)?;
            let slot = self
                .level
                .materials
                .get_mut(index)
                .ok_or_else(|| line.error(format!("material index {index} is out of range ({count})")))?;
            *slot = Some(material);
        }

        self.lines.skip_section()
    }

    pub(super) fn parse_models(&mut self) -> ContentResult<()> {
        if let Some(count) = self.expect_count(WORLD_MODELS, "model")? {
            self.level.models.reserve(count);
            self.read_until_end(|level, args| {
                let name = args.str(args.len().saturating_sub(1))?;
                level.models.push(name.to_string());
                Ok(())
            })?;
        }
        self.lines.skip_section()
    }
}

/// Parses `index: name.mat [xtile ytile]`. The index is optional, in which case the entry's
/// position in the list is used.
fn parse_material(line: &Line, sequence: usize, version: i32) -> ContentResult<(usize, LevelMaterial)> {
    let text = line.text();
    let (index, entry) = match text.split_once(':') {
        Some((index, entry)) => {
            let index = index
                .trim()
                .parse()
                .map_err(|_| line.error(format!("`{index}` isn't a valid material index")))?;
            (index, entry)
        }
        None => (sequence, text),
    };

    let name_end = entry
        .to_ascii_lowercase()
        .find(".mat")
        .map(|position| position + ".mat".len())
        .ok_or_else(|| line.error("material entry doesn't name a .mat file"))?;

    let name = entry[..name_end].trim().to_string();

    let tile = if version == 1 {
        let mut values = entry[name_end..].split_whitespace().map(|token| {
            token
                .parse::<f32>()
                .map_err(|_| line.error(format!("`{token}` isn't a valid tiling factor")))
        });
        let mut next = || values.next().unwrap_or_else(|| Err(line.error("missing tiling factor")));
        Vec2::new(next()?, next()?)
    } else {
        Vec2::ONE
    };

    Ok((index, LevelMaterial { name, tile }))
}
