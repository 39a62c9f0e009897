//! Keyframe animations (`.key`)
//!
//! Every animated hierarchy node gets a list of keyframes. Each keyframe takes two lines: the
//! absolute pose and the per-frame deltas used to interpolate towards the next one.

use crate::{
    tokenizer::{lookup_section, Args, LineReader, COMMA_SEPARATED},
    ContentError, ContentResult,
};
use glam::Vec3;
use log::*;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationHeader {
    pub flags: u32,
    pub kind: u32,
    pub frames: u32,
    pub fps: f32,
    pub joints: u32,
}

impl Default for AnimationHeader {
    fn default() -> Self {
        Self {
            flags: 0,
            kind: 0,
            frames: 0,
            fps: 1.0,
            joints: 0,
        }
    }
}

/// Event attached to a frame, like a footstep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub frame: f32,
    pub kind: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keyframe {
    pub frame: u32,
    pub flags: u32,
    pub position: Vec3,
    /// Pitch, yaw and roll, in degrees
    pub orientation: Vec3,
    pub delta_position: Vec3,
    pub delta_orientation: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct KeyframeNode {
    /// Index of the animated model hierarchy node
    pub node: usize,
    pub mesh_name: String,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, Clone, Default)]
pub struct Animation {
    pub name: String,
    pub header: AnimationHeader,
    pub markers: Vec<Marker>,
    pub nodes: Vec<KeyframeNode>,
}

impl Animation {
    pub fn parse(name: &str, reader: impl BufRead) -> ContentResult<Animation> {
        let mut lines = LineReader::new(name, reader).with_separators(COMMA_SEPARATED);
        let mut animation = Animation {
            name: name.to_string(),
            ..Default::default()
        };

        while let Some(line) = lines.next_line()? {
            let Some(section) = line.section_name() else {
                continue;
            };

            match lookup_section(&section, SECTIONS) {
                Some(KeySection::Header) => parse_header(&mut lines, &mut animation.header)?,
                Some(KeySection::Markers) => parse_markers(&mut lines, &mut animation.markers)?,
                Some(KeySection::Nodes) => parse_nodes(&mut lines, &mut animation.nodes)?,
                None => {
                    trace!("Skipping section `{section}` of `{name}`");
                    lines.skip_section()?;
                }
            }
        }

        if animation.header.fps <= 0.0 {
            return Err(ContentError::corrupt(
                name,
                format!("invalid frame rate {}", animation.header.fps),
            ));
        }

        debug!(
            "Parsed animation `{name}`: {} frames, {} nodes",
            animation.header.frames,
            animation.nodes.len()
        );
        Ok(animation)
    }

    /// Length of the animation in seconds
    pub fn duration(&self) -> f32 {
        self.header.frames as f32 / self.header.fps
    }
}

#[derive(Debug, Clone, Copy)]
enum KeySection {
    Header,
    Markers,
    Nodes,
}

const SECTIONS: &[(&str, KeySection)] = &[
    ("HEADER", KeySection::Header),
    ("MARKERS", KeySection::Markers),
    ("KEYFRAME NODES", KeySection::Nodes),
];

#[derive(Debug, Clone, Copy)]
enum HeaderKey {
    Flags,
    Type,
    Frames,
    Fps,
    Joints,
}

const HEADER_KEYS: &[(&str, HeaderKey)] = &[
    ("FLAGS", HeaderKey::Flags),
    ("TYPE", HeaderKey::Type),
    ("FRAMES", HeaderKey::Frames),
    ("FPS", HeaderKey::Fps),
    ("JOINTS", HeaderKey::Joints),
];

#[derive(Debug, Clone, Copy)]
enum NodeKey {
    Nodes,
    Node,
    MeshName,
    Entries,
}

const NODE_KEYS: &[(&str, NodeKey)] = &[
    ("NODES", NodeKey::Nodes),
    ("NODE", NodeKey::Node),
    ("MESH NAME", NodeKey::MeshName),
    ("ENTRIES", NodeKey::Entries),
];

fn parse_header<R: BufRead>(
    lines: &mut LineReader<R>,
    header: &mut AnimationHeader,
) -> ContentResult<()> {
    while let Some(line) = lines.next_in_section()? {
        let Some((key, args)) = line.keyword(HEADER_KEYS) else {
            trace!("Unknown header entry `{}` in `{}`", line.text(), lines.file());
            continue;
        };

        match key {
            HeaderKey::Flags => header.flags = args.hex(0)?,
            HeaderKey::Type => header.kind = args.hex(0)?,
            HeaderKey::Frames => header.frames = args.uint(0)?,
            HeaderKey::Fps => header.fps = args.float(0)?,
            HeaderKey::Joints => header.joints = args.uint(0)?,
        }
    }
    Ok(())
}

fn parse_markers<R: BufRead>(
    lines: &mut LineReader<R>,
    markers: &mut Vec<Marker>,
) -> ContentResult<()> {
    while let Some(line) = lines.next_in_section()? {
        let Some((_, args)) = line.keyword(&[("MARKERS", ())]) else {
            continue;
        };

        let count = args.uint(0)? as usize;
        markers.reserve(count);
        for _ in 0..count {
            let line = lines.expect_in_section("marker")?;
            let args = line.args();
            markers.push(Marker {
                frame: args.float(0)?,
                kind: args.uint(1)?,
            });
        }
    }
    Ok(())
}

fn parse_nodes<R: BufRead>(
    lines: &mut LineReader<R>,
    nodes: &mut Vec<KeyframeNode>,
) -> ContentResult<()> {
    while let Some(line) = lines.next_in_section()? {
        let Some((key, args)) = line.keyword(NODE_KEYS) else {
            trace!("Unknown keyframe entry `{}` in `{}`", line.text(), lines.file());
            continue;
        };

        match key {
            NodeKey::Nodes => nodes.reserve(args.uint(0)? as usize),
            NodeKey::Node => nodes.push(KeyframeNode {
                node: args.uint(0)? as usize,
                ..Default::default()
            }),
            NodeKey::MeshName => {
                let node = nodes
                    .last_mut()
                    .ok_or_else(|| line.error("mesh name appears outside of a node"))?;
                node.mesh_name = args.str(0)?.to_string();
            }
            NodeKey::Entries => {
                let node = nodes
                    .last_mut()
                    .ok_or_else(|| line.error("entries appear outside of a node"))?;
                node.keyframes = read_keyframes(lines, args.uint(0)? as usize)?;
            }
        }
    }
    Ok(())
}

/// `idx: frame flags x y z pitch yaw roll`, followed by `dx dy dz dpitch dyaw droll`
fn read_keyframes<R: BufRead>(
    lines: &mut LineReader<R>,
    count: usize,
) -> ContentResult<Vec<Keyframe>> {
    let mut keyframes = vec![Keyframe::default(); count];

    for _ in 0..count {
        let line = lines.expect_in_section("keyframe")?;
        let args = line.args();
        let index = args.index(0)?;
        let keyframe = keyframes
            .get_mut(index)
            .ok_or_else(|| line.error(format!("keyframe index {index} is out of range ({count})")))?;

        let pose = args.skip(1);
        keyframe.frame = pose.uint(0)?;
        keyframe.flags = pose.hex(1)?;
        keyframe.position = pose.vec3(2)?;
        keyframe.orientation = pose.vec3(5)?;

        let delta = lines.expect_in_section("keyframe delta")?;
        read_delta(delta.args(), keyframe)?;
    }

    Ok(keyframes)
}

fn read_delta(args: Args<'_>, keyframe: &mut Keyframe) -> ContentResult<()> {
    keyframe.delta_position = args.vec3(0)?;
    keyframe.delta_orientation = args.vec3(3)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub fn parse(text: &str) -> ContentResult<Animation> {
        Animation::parse("test.key", Cursor::new(text.as_bytes().to_vec()))
    }

    /// Lifts the `lid` node of the quad model and turns it around
    pub const LID_OPEN: &str = r#"
SECTION: HEADER
FLAGS 0x0000
TYPE 0xFFFF
FRAMES 20
FPS 10.000
JOINTS 2

SECTION: MARKERS
MARKERS 1
10.000000 1

SECTION: KEYFRAME NODES
NODES 1

NODE 1
MESH NAME lid
ENTRIES 2
# num: frame flags x y z p y r
#      dx dy dz dp dy dr
1: 10 0x0000 0.0 0.0 1.5 0.0 270.0 0.0
       0.0 0.0 0.0 0.0 0.0 0.0
0: 0 0x0001 0.0, 0.0, 1.0 0.0 90.0 0.0
       0.0 0.0 0.05 0.0 18.0 0.0
"#;

    #[test]
    fn animation_parses() {
        let animation = parse(LID_OPEN).unwrap();
        assert_eq!(animation.header.frames, 20);
        assert_eq!(animation.header.fps, 10.0);
        assert_eq!(animation.header.kind, 0xFFFF);
        assert_eq!(animation.header.joints, 2);
        assert_eq!(animation.duration(), 2.0);
        assert_eq!(animation.markers, [Marker { frame: 10.0, kind: 1 }]);

        let node = &animation.nodes[0];
        assert_eq!(node.node, 1);
        assert_eq!(node.mesh_name, "lid");

        let first = &node.keyframes[0];
        assert_eq!(first.frame, 0);
        assert_eq!(first.flags, 1);
        assert_eq!(first.position, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(first.orientation, Vec3::new(0.0, 90.0, 0.0));
        assert_eq!(first.delta_position, Vec3::new(0.0, 0.0, 0.05));
        assert_eq!(first.delta_orientation, Vec3::new(0.0, 18.0, 0.0));
        assert_eq!(node.keyframes[1].frame, 10);
    }

    #[test]
    fn frame_rate_defaults_to_one() {
        let animation = parse(&LID_OPEN.replace("FPS 10.000\n", "")).unwrap();
        assert_eq!(animation.header.fps, 1.0);

        let zero = LID_OPEN.replace("FPS 10.000", "FPS 0");
        assert!(matches!(parse(&zero), Err(ContentError::CorruptAsset { .. })));
    }

    #[test]
    fn missing_delta_lines_fail() {
        let text = LID_OPEN.replace("       0.0 0.0 0.05 0.0 18.0 0.0\n", "");
        assert!(matches!(parse(&text), Err(ContentError::MalformedRecord { .. })));
    }
}
