//! Minimal retained scene the menu draws into.
//!
//! [`SceneHost`] is the seam towards whatever engine displays the menu: it
//! only needs textured quads with opacity, one programmable surface with named
//! uniforms, parenting, and per-frame transforms. [`SceneGraph`] is the
//! in-process implementation used by the headless driver and the still export.

use std::collections::BTreeMap;
use std::sync::Arc;

use image::RgbaImage;

use crate::panel::PanelGeometry;

/// Decoded texture shared between the scene and its consumers.
pub type TextureData = Arc<RgbaImage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Float(f32),
    Vec4([f32; 4]),
}

impl Uniform {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Uniform::Float(value) => Some(*value),
            Uniform::Vec4(_) => None,
        }
    }

    pub fn as_vec4(&self) -> Option<[f32; 4]> {
        match self {
            Uniform::Vec4(value) => Some(*value),
            Uniform::Float(_) => None,
        }
    }
}

/// Translation plus a rotation about the local y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation_y: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation_y: 0.0,
        }
    }
}

impl Transform {
    /// Applies `self` as the parent transform of `local`.
    pub fn compose(&self, local: &Transform) -> Transform {
        let (sin, cos) = self.rotation_y.sin_cos();
        let [x, y, z] = local.position;
        Transform {
            position: [
                self.position[0] + cos * x + sin * z,
                self.position[1] + y,
                self.position[2] - sin * x + cos * z,
            ],
            rotation_y: self.rotation_y + local.rotation_y,
        }
    }

    /// Column-major model matrix.
    pub fn matrix(&self) -> [[f32; 4]; 4] {
        let (sin, cos) = self.rotation_y.sin_cos();
        let [x, y, z] = self.position;
        [
            [cos, 0.0, -sin, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [sin, 0.0, cos, 0.0],
            [x, y, z, 1.0],
        ]
    }
}

#[derive(Debug, Clone)]
pub struct TexturedSurface {
    pub size: [f32; 2],
    pub texture: Option<TextureData>,
    pub opacity: f32,
}

#[derive(Debug, Clone)]
pub struct ProgramSurface {
    /// WGSL source of the program.
    pub source: &'static str,
    pub geometry: Arc<PanelGeometry>,
    pub uniforms: BTreeMap<String, Uniform>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Textured(TexturedSurface),
    Program(ProgramSurface),
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub label: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

pub trait SceneHost {
    fn create_group(&mut self, label: &str) -> NodeId;
    fn create_textured_surface(
        &mut self,
        label: &str,
        size: [f32; 2],
        texture: Option<TextureData>,
    ) -> NodeId;
    fn create_program_surface(
        &mut self,
        label: &str,
        source: &'static str,
        geometry: Arc<PanelGeometry>,
    ) -> NodeId;
    fn add_child(&mut self, parent: NodeId, child: NodeId);
    fn set_transform(&mut self, node: NodeId, transform: Transform);
    fn set_position(&mut self, node: NodeId, position: [f32; 3]);
    fn set_opacity(&mut self, node: NodeId, opacity: f32);
    fn set_texture(&mut self, node: NodeId, texture: TextureData);
    fn set_uniform(&mut self, node: NodeId, name: &str, value: Uniform);
}

/// Arena-backed scene graph.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn textured(&self, id: NodeId) -> Option<&TexturedSurface> {
        match &self.node(id)?.kind {
            NodeKind::Textured(surface) => Some(surface),
            _ => None,
        }
    }

    pub fn program(&self, id: NodeId) -> Option<&ProgramSurface> {
        match &self.node(id)?.kind {
            NodeKind::Program(surface) => Some(surface),
            _ => None,
        }
    }

    pub fn uniform(&self, id: NodeId, name: &str) -> Option<Uniform> {
        self.program(id)?.uniforms.get(name).copied()
    }

    /// Transform of `id` relative to the scene root, folding in every ancestor.
    pub fn world_transform(&self, id: NodeId) -> Option<Transform> {
        let node = self.node(id)?;
        match node.parent {
            Some(parent) => Some(self.world_transform(parent)?.compose(&node.transform)),
            None => Some(node.transform),
        }
    }

    /// `root` followed by all its descendants, depth first, parents before children.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut ordered = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            ordered.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        ordered
    }

    fn push(&mut self, label: &str, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            label: label.to_string(),
            transform: Transform::default(),
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }
}

impl SceneHost for SceneGraph {
    fn create_group(&mut self, label: &str) -> NodeId {
        self.push(label, NodeKind::Group)
    }

    fn create_textured_surface(
        &mut self,
        label: &str,
        size: [f32; 2],
        texture: Option<TextureData>,
    ) -> NodeId {
        self.push(
            label,
            NodeKind::Textured(TexturedSurface {
                size,
                texture,
                opacity: 1.0,
            }),
        )
    }

    fn create_program_surface(
        &mut self,
        label: &str,
        source: &'static str,
        geometry: Arc<PanelGeometry>,
    ) -> NodeId {
        self.push(
            label,
            NodeKind::Program(ProgramSurface {
                source,
                geometry,
                uniforms: BTreeMap::new(),
            }),
        )
    }

    fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(parent).is_none() || self.node(child).is_none() {
            tracing::warn!(?parent, ?child, "ignoring invalid scene attachment");
            return;
        }
        if let Some(previous) = self.nodes[child.0].parent.replace(parent) {
            self.nodes[previous.0].children.retain(|id| *id != child);
        }
        self.nodes[parent.0].children.push(child);
    }

    fn set_transform(&mut self, node: NodeId, transform: Transform) {
        if let Some(entry) = self.nodes.get_mut(node.0) {
            entry.transform = transform;
        }
    }

    fn set_position(&mut self, node: NodeId, position: [f32; 3]) {
        if let Some(entry) = self.nodes.get_mut(node.0) {
            entry.transform.position = position;
        }
    }

    fn set_opacity(&mut self, node: NodeId, opacity: f32) {
        if let Some(SceneNode {
            kind: NodeKind::Textured(surface),
            ..
        }) = self.nodes.get_mut(node.0)
        {
            surface.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    fn set_texture(&mut self, node: NodeId, texture: TextureData) {
        if let Some(SceneNode {
            kind: NodeKind::Textured(surface),
            ..
        }) = self.nodes.get_mut(node.0)
        {
            surface.texture = Some(texture);
        }
    }

    fn set_uniform(&mut self, node: NodeId, name: &str, value: Uniform) {
        if let Some(SceneNode {
            kind: NodeKind::Program(surface),
            ..
        }) = self.nodes.get_mut(node.0)
        {
            surface.uniforms.insert(name.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    #[test]
    fn children_inherit_parent_transform() {
        let mut scene = SceneGraph::new();
        let parent = scene.create_group("parent");
        let child = scene.create_group("child");
        scene.add_child(parent, child);
        scene.set_position(parent, [1.0, 2.0, 3.0]);
        scene.set_transform(
            child,
            Transform {
                position: [0.0, 0.0, -0.5],
                rotation_y: PI,
            },
        );

        let world = scene.world_transform(child).unwrap();
        assert!((world.position[0] - 1.0).abs() < 1e-6);
        assert!((world.position[1] - 2.0).abs() < 1e-6);
        assert!((world.position[2] - 2.5).abs() < 1e-6);
        assert!((world.rotation_y - PI).abs() < 1e-6);
    }

    #[test]
    fn reparenting_moves_the_child() {
        let mut scene = SceneGraph::new();
        let a = scene.create_group("a");
        let b = scene.create_group("b");
        let leaf = scene.create_group("leaf");
        scene.add_child(a, leaf);
        scene.add_child(b, leaf);
        assert!(scene.node(a).unwrap().children.is_empty());
        assert_eq!(scene.node(b).unwrap().children, vec![leaf]);
        assert_eq!(scene.node(leaf).unwrap().parent, Some(b));
    }

    #[test]
    fn descendants_list_parents_first() {
        let mut scene = SceneGraph::new();
        let root = scene.create_group("root");
        let first = scene.create_textured_surface("first", [1.0, 1.0], None);
        let nested = scene.create_textured_surface("nested", [1.0, 1.0], None);
        let second = scene.create_textured_surface("second", [1.0, 1.0], None);
        scene.add_child(root, first);
        scene.add_child(first, nested);
        scene.add_child(root, second);
        assert_eq!(scene.descendants(root), vec![root, first, nested, second]);
    }

    #[test]
    fn opacity_only_applies_to_textured_surfaces() {
        let mut scene = SceneGraph::new();
        let group = scene.create_group("group");
        let quad = scene.create_textured_surface("quad", [1.0, 1.0], None);
        scene.set_opacity(group, 0.5);
        scene.set_opacity(quad, 1.5);
        assert_eq!(scene.textured(quad).unwrap().opacity, 1.0);
        assert!(scene.textured(group).is_none());
    }

    #[test]
    fn rotated_matrix_mirrors_x() {
        let transform = Transform {
            position: [0.0; 3],
            rotation_y: PI,
        };
        let m = transform.matrix();
        assert!((m[0][0] + 1.0).abs() < 1e-6);
        assert!((m[2][2] + 1.0).abs() < 1e-6);
    }
}
