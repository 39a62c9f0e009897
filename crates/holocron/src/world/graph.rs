use super::model::ModelMesh;
use anyhow::{anyhow, bail};
use glam::{Quat, Vec3};
use holocron_utils::{ok, AnyResult};
use std::sync::Arc;

/// A node to be created in a scene graph. Transforms are relative to the parent.
#[derive(Debug)]
pub struct NodeDesc<M> {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: f32,
    pub mesh: Option<Arc<ModelMesh<M>>>,
}

impl<M> Clone for NodeDesc<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
            mesh: self.mesh.clone(),
        }
    }
}

/// Node factory that model hierarchies are instantiated through.
///
/// All nodes of a model are created before any of them is attached, so `attach` never sees a
/// parent that doesn't exist yet.
pub trait SceneGraph<M> {
    type Node: Clone;

    fn create_node(&mut self, desc: NodeDesc<M>) -> AnyResult<Self::Node>;
    fn attach(&mut self, child: &Self::Node, parent: &Self::Node) -> AnyResult;
}

#[derive(Debug)]
pub struct TreeNode<M> {
    pub desc: NodeDesc<M>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// A plain [`SceneGraph`], nodes are indices into a vector.
#[derive(Debug)]
pub struct NodeTree<M> {
    nodes: Vec<TreeNode<M>>,
}

impl<M> Default for NodeTree<M> {
    fn default() -> Self {
        Self { nodes: vec![] }
    }
}

impl<M> NodeTree<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[TreeNode<M>] {
        &self.nodes
    }

    pub fn get(&self, node: usize) -> Option<&TreeNode<M>> {
        self.nodes.get(node)
    }

    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(|&i| self.nodes[i].parent.is_none())
    }

    /// Finds a node by its slash-separated path of names, starting below `root`.
    pub fn find(&self, root: usize, path: &str) -> Option<usize> {
        path.split('/').try_fold(root, |current, name| {
            self.nodes
                .get(current)?
                .children
                .iter()
                .copied()
                .find(|&child| self.nodes[child].desc.name.eq_ignore_ascii_case(name))
        })
    }

    /// Scale of a node in the scene, with every ancestor's scale applied
    pub fn world_scale(&self, node: usize) -> f32 {
        std::iter::successors(Some(node), |&n| self.nodes.get(n).and_then(|n| n.parent))
            .filter_map(|n| self.nodes.get(n))
            .map(|n| n.desc.scale)
            .product()
    }

    fn is_ancestor(&self, ancestor: usize, node: usize) -> bool {
        std::iter::successors(Some(node), |&n| self.nodes[n].parent).any(|n| n == ancestor)
    }
}

impl<M> SceneGraph<M> for NodeTree<M> {
    type Node = usize;

    fn create_node(&mut self, desc: NodeDesc<M>) -> AnyResult<usize> {
        self.nodes.push(TreeNode {
            desc,
            parent: None,
            children: vec![],
        });
        Ok(self.nodes.len() - 1)
    }

    fn attach(&mut self, child: &usize, parent: &usize) -> AnyResult {
        let (child, parent) = (*child, *parent);
        let count = self.nodes.len();
        if child >= count || parent >= count {
            bail!("can't attach node {child} to node {parent}, only {count} nodes exist");
        }

        if self.is_ancestor(child, parent) {
            bail!("attaching node {child} to node {parent} would create a cycle");
        }

        let node = &mut self.nodes[child];
        if let Some(previous) = node.parent {
            return Err(anyhow!("node {child} is already attached to node {previous}"));
        }
        node.parent = Some(parent);
        self.nodes[parent].children.push(child);
        ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> NodeDesc<()> {
        NodeDesc {
            name: name.to_string(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: 2.0,
            mesh: None,
        }
    }

    #[test]
    fn tree_wiring() {
        let mut tree = NodeTree::new();
        let root = tree.create_node(node("root")).unwrap();
        let arm = tree.create_node(node("arm")).unwrap();
        let hand = tree.create_node(node("Hand")).unwrap();

        tree.attach(&hand, &arm).unwrap();
        tree.attach(&arm, &root).unwrap();

        assert_eq!(tree.roots().collect::<Vec<_>>(), [root]);
        assert_eq!(tree.find(root, "arm/hand"), Some(hand));
        assert_eq!(tree.find(root, "hand"), None);
        assert_eq!(tree.world_scale(hand), 8.0);

        assert!(tree.attach(&root, &hand).is_err());
        assert!(tree.attach(&hand, &root).is_err());
        assert!(tree.attach(&hand, &17).is_err());
    }
}
