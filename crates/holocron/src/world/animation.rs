//! Animation curves built from keyframe animations, ready to be sampled by an engine

use super::coords;
use glam::{Quat, Vec3};
use holocron_content::{key::Animation, model::Model};
use itertools::Itertools;
use log::*;

/// Keys of one model node. Times are in seconds, values are local to the parent node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCurves {
    /// Index of the model hierarchy node
    pub node: usize,
    /// Slash-separated node names from the model root down to the node
    pub path: String,
    pub translation: Vec<(f32, Vec3)>,
    pub rotation: Vec<(f32, Quat)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Length in seconds
    pub duration: f32,
    pub looping: bool,
    /// Marker times in seconds, with their kinds
    pub markers: Vec<(f32, u32)>,
    pub curves: Vec<NodeCurves>,
}

impl AnimationClip {
    /// Builds curves for every keyframed node of `model`. Nodes the model doesn't have are
    /// skipped with a warning.
    pub fn new(animation: &Animation, model: &Model) -> Self {
        let fps = animation.header.fps;

        let curves = animation
            .nodes
            .iter()
            .filter_map(|node| {
                let Some(path) = model.node_path(node.node) else {
                    warn!(
                        "Animation `{}` moves node {}, which `{}` doesn't have",
                        animation.name, node.node, model.name
                    );
                    return None;
                };

                let keyframes = node.keyframes.iter().sorted_by_key(|k| k.frame).collect_vec();
                let translation = keyframes
                    .iter()
                    .map(|k| (k.frame as f32 / fps, coords::to_scene(k.position)))
                    .collect();

                let mut previous: Option<Quat> = None;
                let rotation = keyframes
                    .iter()
                    .map(|k| {
                        let mut rotation = coords::orientation(k.orientation);
                        if let Some(previous) = previous {
                            if previous.dot(rotation) < 0.0 {
                                rotation = -rotation;
                            }
                        }
                        previous = Some(rotation);
                        (k.frame as f32 / fps, rotation)
                    })
                    .collect();

                Some(NodeCurves {
                    node: node.node,
                    path,
                    translation,
                    rotation,
                })
            })
            .collect();

        Self {
            name: animation.name.clone(),
            duration: animation.duration(),
            looping: true,
            markers: animation
                .markers
                .iter()
                .map(|m| (m.frame / fps, m.kind))
                .collect(),
            curves,
        }
    }
}
