/// Scene graph consumed by the scene recorder
///
/// Nodes form a forest reachable from `roots`. Meshes and textures are
/// referenced by index; the asset collaborator fills these tables from
/// whatever file format it parses.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use crate::error::{Error, Result};
use crate::renderer::{
    BufferFormat, VertexAttribute, VertexBinding, VertexInputRate, VertexLayout,
};

// ===== NODES =====

/// One node of the scene forest
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Explicit local matrix; takes precedence over the decomposed fields
    pub matrix: Option<Mat4>,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Index into `Scene::meshes`
    pub mesh: Option<usize>,
    /// Indices into `Scene::nodes`
    pub children: Vec<usize>,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            matrix: None,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            mesh: None,
            children: Vec::new(),
        }
    }
}

impl SceneNode {
    /// Node placed by an explicit matrix
    pub fn with_matrix(matrix: Mat4) -> Self {
        Self { matrix: Some(matrix), ..Self::default() }
    }

    /// Local transform: `matrix` if set, else `T * R * S`
    pub fn local_transform(&self) -> Mat4 {
        self.matrix.unwrap_or_else(|| {
            Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
        })
    }
}

// ===== TEXTURES =====

/// Named texture slots of a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Color,
    Normal,
    MetallicRoughness,
    Emissive,
}

/// Texture index per slot (`None` = unbound, falls back to the default texture)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureSlots {
    pub color: Option<usize>,
    pub normal: Option<usize>,
    pub metallic_roughness: Option<usize>,
    pub emissive: Option<usize>,
}

impl TextureSlots {
    pub fn get(&self, slot: TextureSlot) -> Option<usize> {
        match slot {
            TextureSlot::Color => self.color,
            TextureSlot::Normal => self.normal,
            TextureSlot::MetallicRoughness => self.metallic_roughness,
            TextureSlot::Emissive => self.emissive,
        }
    }
}

// ===== MESHES =====

/// Index buffer with its element count (32-bit indices)
pub struct IndexBuffer<B> {
    pub buffer: Arc<B>,
    pub count: u32,
}

/// Drawable unit: vertex buffer, optional index buffer, texture slots
pub struct Primitive<B> {
    pub vertex_buffer: Arc<B>,
    pub vertex_count: u32,
    pub index_buffer: Option<IndexBuffer<B>>,
    pub textures: TextureSlots,
}

/// A mesh; only its first primitive is drawn
pub struct Mesh<B> {
    pub primitives: Vec<Primitive<B>>,
}

// ===== SCENE =====

/// Scene forest with mesh table
pub struct Scene<B> {
    pub nodes: Vec<SceneNode>,
    pub meshes: Vec<Mesh<B>>,
    pub roots: Vec<usize>,
}

impl<B> Default for Scene<B> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            meshes: Vec::new(),
            roots: Vec::new(),
        }
    }
}

impl<B> Scene<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its index
    pub fn add_node(&mut self, node: SceneNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Append a mesh and return its index
    pub fn add_mesh(&mut self, mesh: Mesh<B>) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    /// Node by index
    pub fn node(&self, index: usize) -> Result<&SceneNode> {
        self.nodes.get(index).ok_or_else(|| {
            Error::InvalidResource(format!(
                "node index {} out of range ({} nodes)",
                index,
                self.nodes.len()
            ))
        })
    }

    /// Mesh by index
    pub fn mesh(&self, index: usize) -> Result<&Mesh<B>> {
        self.meshes.get(index).ok_or_else(|| {
            Error::InvalidResource(format!(
                "mesh index {} out of range ({} meshes)",
                index,
                self.meshes.len()
            ))
        })
    }
}

// ===== VERTEX FORMAT =====

/// Mesh vertex as produced by the asset collaborator
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub texcoord: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 4],
}

impl Vertex {
    /// Vertex layout matching this struct at binding 0, locations 0..=4
    pub fn layout() -> VertexLayout {
        let attribute = |location, format, offset: usize| VertexAttribute {
            location,
            binding: 0,
            format,
            offset: offset as u32,
        };

        VertexLayout {
            bindings: vec![VertexBinding {
                binding: 0,
                stride: std::mem::size_of::<Vertex>() as u32,
                input_rate: VertexInputRate::Vertex,
            }],
            attributes: vec![
                attribute(0, BufferFormat::R32G32B32_SFLOAT, std::mem::offset_of!(Vertex, position)),
                attribute(1, BufferFormat::R32G32B32_SFLOAT, std::mem::offset_of!(Vertex, color)),
                attribute(2, BufferFormat::R32G32_SFLOAT, std::mem::offset_of!(Vertex, texcoord)),
                attribute(3, BufferFormat::R32G32B32_SFLOAT, std::mem::offset_of!(Vertex, normal)),
                attribute(4, BufferFormat::R32G32B32A32_SFLOAT, std::mem::offset_of!(Vertex, tangent)),
            ],
        }
    }
}

/// Widen 8/16/32-bit indices to the 32-bit format the recorder binds
pub fn widen_indices<I: Copy + Into<u32>>(indices: &[I]) -> Vec<u32> {
    indices.iter().map(|&i| i.into()).collect()
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
