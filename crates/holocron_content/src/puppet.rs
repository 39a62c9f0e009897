//! Puppets (`.pup`), which map movement modes to keyframe animations
//!
//! ```text
//! mode=0
//! stand    kystand0.key  0x00  1  0
//! mode=1, basedon=0
//! walk     kywalk1.key   0x04  1  1
//! joints
//! 0  4
//! end
//! ```
//!
//! A mode that is `basedon` another one inherits every submode it doesn't define itself.

use crate::{
    tokenizer::{parse_hex, Args, Line, LineReader, COMMA_SEPARATED},
    ContentError, ContentResult,
};
use ahash::AHashMap;
use log::*;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq)]
pub struct Submode {
    pub key_file: String,
    pub flags: u32,
    pub low_priority: i32,
    pub high_priority: i32,
}

#[derive(Debug, Clone, Default)]
pub struct PuppetMode {
    pub based_on: Option<u32>,
    /// Submodes by lowercase name
    pub submodes: AHashMap<String, Submode>,
}

#[derive(Debug, Clone, Default)]
pub struct Puppet {
    pub name: String,
    pub modes: AHashMap<u32, PuppetMode>,
    /// Joint number to model hierarchy node
    pub joints: AHashMap<u32, usize>,
}

impl Puppet {
    pub fn parse(name: &str, reader: impl BufRead) -> ContentResult<Puppet> {
        let mut lines = LineReader::new(name, reader).with_separators(COMMA_SEPARATED);
        let mut puppet = Puppet {
            name: name.to_string(),
            ..Default::default()
        };

        let mut block = Block::None;
        while let Some(line) = lines.next_line()? {
            let args = line.args();
            let first = args.str(0)?;

            if let Some(mode) = first.strip_prefix("mode=") {
                let mode = parse_number(&line, mode)?;
                let based_on = match args.tokens().get(1) {
                    Some(token) => {
                        let value = token
                            .strip_prefix("basedon=")
                            .ok_or_else(|| line.error(format!("unexpected `{token}`")))?;
                        Some(parse_number(&line, value)?)
                    }
                    None => None,
                };

                if puppet.modes.contains_key(&mode) {
                    warn!("Mode {mode} of `{name}` is defined twice, the last one is kept");
                }
                puppet.modes.insert(
                    mode,
                    PuppetMode {
                        based_on,
                        submodes: AHashMap::new(),
                    },
                );
                block = Block::Mode(mode);
            } else if first.eq_ignore_ascii_case("joints") {
                block = Block::Joints;
            } else if line.is_end() {
                block = Block::None;
            } else {
                match block {
                    Block::Mode(mode) => {
                        let (submode_name, submode) = parse_submode(args)?;
                        if let Some(mode) = puppet.modes.get_mut(&mode) {
                            mode.submodes.insert(submode_name, submode);
                        }
                    }
                    Block::Joints => {
                        puppet
                            .joints
                            .insert(args.uint(0)?, args.uint(1)? as usize);
                    }
                    Block::None => {
                        trace!("Ignoring `{}` outside of a block in `{name}`", line.text());
                    }
                }
            }
        }

        puppet.validate()?;
        debug!("Parsed puppet `{name}`: {} modes", puppet.modes.len());
        Ok(puppet)
    }

    /// Looks a submode up, falling back to the modes the given one is based on.
    pub fn submode(&self, mode: u32, name: &str) -> Option<&Submode> {
        let name = name.to_ascii_lowercase();
        let mut current = Some(mode);
        let mut steps = 0;

        while let Some(mode) = current {
            let entry = self.modes.get(&mode)?;
            if let Some(submode) = entry.submodes.get(&name) {
                return Some(submode);
            }

            steps += 1;
            if steps > self.modes.len() {
                return None;
            }
            current = entry.based_on;
        }

        None
    }

    /// Every `basedon` has to name an existing mode, without cycles.
    fn validate(&self) -> ContentResult<()> {
        for (&mode, entry) in &self.modes {
            let mut steps = 0;
            let mut current = entry.based_on;
            while let Some(parent) = current {
                let parent_entry = self.modes.get(&parent).ok_or_else(|| {
                    ContentError::reference(
                        self.name.as_str(),
                        format!("mode {mode} is based on an undefined mode {parent}"),
                    )
                })?;

                steps += 1;
                if steps > self.modes.len() {
                    return Err(ContentError::reference(
                        self.name.as_str(),
                        format!("mode {mode} is based on itself"),
                    ));
                }
                current = parent_entry.based_on;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Block {
    None,
    Mode(u32),
    Joints,
}

fn parse_number(line: &Line, token: &str) -> ContentResult<u32> {
    token
        .parse()
        .map_err(|_| line.error(format!("`{token}` isn't a valid mode number")))
}

/// `name keyfile flags lowpri highpri`
fn parse_submode(args: Args<'_>) -> ContentResult<(String, Submode)> {
    let flags = args.str(2)?;
    let flags = parse_hex(flags)
        .ok_or_else(|| args.line().error(format!("`{flags}` isn't a valid hex value")))?;

    Ok((
        args.str(0)?.to_ascii_lowercase(),
        Submode {
            key_file: args.str(1)?.to_string(),
            flags,
            low_priority: args.int(3)?,
            high_priority: args.int(4)?,
        },
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub fn parse(text: &str) -> ContentResult<Puppet> {
        Puppet::parse("test.pup", Cursor::new(text.as_bytes().to_vec()))
    }

    pub const CRATE_PUP: &str = r#"
# Puppet for the lid crate
mode=0
# submode  keyfile      flags   lo hi
stand      lidopen.key  0x0000  0  0
walk       lidwalk.key  0x0004  1  1

mode=1, basedon=0
walk       lidrun.key   0x0004  1  2

mode=2, basedon=1

joints
0  0
1  1
end
"#;

    #[test]
    fn modes_inherit_submodes() {
        let puppet = parse(CRATE_PUP).unwrap();
        assert_eq!(puppet.modes.len(), 3);
        assert_eq!(puppet.modes[&1].based_on, Some(0));

        assert_eq!(puppet.submode(0, "STAND").unwrap().key_file, "lidopen.key");
        assert_eq!(puppet.submode(1, "walk").unwrap().key_file, "lidrun.key");
        assert_eq!(puppet.submode(2, "walk").unwrap().high_priority, 2);
        assert_eq!(puppet.submode(2, "stand").unwrap().key_file, "lidopen.key");
        assert_eq!(puppet.submode(0, "walk").unwrap().flags, 4);
        assert!(puppet.submode(0, "fly").is_none());
        assert!(puppet.submode(7, "stand").is_none());

        assert_eq!(puppet.joints[&1], 1);
    }

    #[test]
    fn broken_inheritance_fails() {
        let unknown = CRATE_PUP.replace("mode=2, basedon=1", "mode=2, basedon=5");
        assert!(matches!(parse(&unknown), Err(ContentError::ReferenceError { .. })));

        let cycle = CRATE_PUP.replace("mode=0", "mode=0, basedon=2");
        assert!(matches!(parse(&cycle), Err(ContentError::ReferenceError { .. })));

        let malformed = CRATE_PUP.replace("mode=2, basedon=1", "mode=two");
        assert!(matches!(parse(&malformed), Err(ContentError::MalformedRecord { .. })));
    }
}
