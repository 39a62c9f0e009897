use super::{Parser, Thing};
use crate::{ContentError, ContentResult};
use log::*;
use std::{io::BufRead, sync::Arc};

const WORLD_TEMPLATES: &[(&str, ())] = &[("WORLD TEMPLATES", ())];
const WORLD_THINGS: &[(&str, ())] = &[("WORLD THINGS", ())];

impl<R: BufRead> Parser<R> {
    pub(super) fn parse_templates(&mut self) -> ContentResult<()> {
        if self.expect_count(WORLD_TEMPLATES, "template")?.is_some() {
            let file = self.file();
            self.read_until_end(|level, args| {
                let name = args.str(0)?.to_ascii_lowercase();
                if level.templates.contains_key(&name) {
                    warn!("Template `{name}` is defined twice in `{file}`, skipping");
                    return Ok(());
                }

                let base = args.str(1)?.to_ascii_lowercase();
                let base = match base.as_str() {
                    "none" => None,
                    _ => Some(level.templates.get(&base).ok_or_else(|| {
                        ContentError::reference(
                            &file,
                            format!("template `{name}` is based on unknown template `{base}`"),
                        )
                    })?),
                };

                let mut template = Thing::from_template(base);
                template.name = name.clone();
                template.apply_params(args.skip(2));

                level.templates.insert(name, Arc::new(template));
                Ok(())
            })?;
        }
        self.lines.skip_section()
    }

    pub(super) fn parse_things(&mut self) -> ContentResult<()> {
        if let Some(count) = self.expect_count(WORLD_THINGS, "thing")? {
            self.level.things.reserve(count);

            let file = self.file();
            self.read_until_end(|level, args| {
                let template_name = args.str(1)?.to_ascii_lowercase();
                let template = level.templates.get(&template_name).ok_or_else(|| {
                    ContentError::reference(
                        &file,
                        format!("line {}: unknown template `{template_name}`", args.line().number()),
                    )
                })?;

                let mut thing = Thing::from_template(Some(template));
                thing.name = args.str(2)?.to_string();
                thing.position = args.vec3(3)?;
                thing.orientation = args.vec3(6)?;
                thing.sector = usize::try_from(args.int(9)?).ok();
                thing.apply_params(args.skip(10));

                level.things.push(thing);
                Ok(())
            })?;
        }
        self.lines.skip_section()
    }
}
