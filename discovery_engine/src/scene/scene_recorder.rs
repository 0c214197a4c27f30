/// Scene-graph command recording
///
/// Walks the scene forest depth-first (pre-order), accumulating transforms,
/// and emits one draw per mesh node. Descriptor resources come from a
/// `SceneBindings` implementation; the recorder only decides what is bound
/// where and caches per-texture bindings.

use std::collections::hash_map::Entry;
use glam::Mat4;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::error::{Error, Result};
use crate::renderer::{ClearValue, CommandList};
use crate::engine_warn;
use super::scene::{Primitive, Scene, TextureSlot};

/// Descriptor set index of each scene binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneBindingLayout {
    /// Set receiving the view/projection uniform
    pub view_projection: u32,
    /// Set receiving the per-node transform uniform
    pub node_transform: u32,
    /// Set per texture slot; slots not listed are not bound
    pub textures: Vec<(TextureSlot, u32)>,
}

impl Default for SceneBindingLayout {
    fn default() -> Self {
        Self {
            view_projection: 0,
            node_transform: 1,
            textures: vec![(TextureSlot::Color, 2), (TextureSlot::Normal, 3)],
        }
    }
}

/// Source of the descriptor groups bound while recording
pub trait SceneBindings {
    /// Bindable group, as accepted by the command list
    type Group: Clone;
    /// Cached per-texture binding
    type TextureBinding;

    /// View/projection group of `image_index`
    fn view_projection(&mut self, image_index: u32) -> Result<Self::Group>;

    /// Default-texture group used for an unbound `slot`
    fn default_texture(&mut self, slot: TextureSlot, image_index: u32) -> Result<Self::Group>;

    /// Create the binding for `texture_index`, laid out for set `set`
    fn create_texture_binding(&mut self, texture_index: usize, set: u32) -> Result<Self::TextureBinding>;

    /// Group of `binding` for `image_index`
    fn texture_group(&self, binding: &Self::TextureBinding, image_index: u32) -> Self::Group;

    /// Write `world` into the transform uniform of `node_index` for `image_index` and return its group
    fn node_transform(&mut self, node_index: usize, image_index: u32, world: &Mat4) -> Result<Self::Group>;
}

/// Counters of one recording pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordStats {
    pub nodes_visited: u32,
    pub draws: u32,
    pub indexed_draws: u32,
}

/// Depth-first scene drawer with a per-texture binding cache
pub struct SceneRecorder<T> {
    layout: SceneBindingLayout,
    texture_cache: FxHashMap<usize, T>,
    warned_meshes: FxHashSet<usize>,
}

impl<T> SceneRecorder<T> {
    pub fn new(layout: SceneBindingLayout) -> Self {
        Self {
            layout,
            texture_cache: FxHashMap::default(),
            warned_meshes: FxHashSet::default(),
        }
    }

    pub fn layout(&self) -> &SceneBindingLayout {
        &self.layout
    }

    /// Cached binding of `texture_index`, if it was created already
    pub fn cached_texture_binding(&self, texture_index: usize) -> Option<&T> {
        self.texture_cache.get(&texture_index)
    }

    /// Number of cached texture bindings
    pub fn cached_texture_count(&self) -> usize {
        self.texture_cache.len()
    }

    /// Drop all cached texture bindings
    pub fn clear_cache(&mut self) {
        self.texture_cache.clear();
    }

    /// Record `scene` for `image_index`
    ///
    /// begin render pass, bind `pipeline`, visit every root with the identity
    /// transform, end render pass. Any failing call aborts the recording.
    pub fn record<C, S>(
        &mut self,
        cmd: &mut C,
        bindings: &mut S,
        pipeline: &C::Pipeline,
        scene: &Scene<C::Buffer>,
        image_index: u32,
        clear_values: &[ClearValue],
    ) -> Result<RecordStats>
    where
        C: CommandList<Group = S::Group>,
        S: SceneBindings<TextureBinding = T>,
    {
        let mut stats = RecordStats::default();

        cmd.begin_render_pass(clear_values)?;
        cmd.bind_pipeline(pipeline)?;

        for &root in &scene.roots {
            let mut visit = Visit {
                cmd: &mut *cmd,
                bindings: &mut *bindings,
                pipeline,
                scene,
                image_index,
                stats: &mut stats,
            };
            self.visit(&mut visit, root, Mat4::IDENTITY, 0)?;
        }

        cmd.end_render_pass()?;
        Ok(stats)
    }

    fn visit<C, S>(
        &mut self,
        ctx: &mut Visit<'_, C, S>,
        node_index: usize,
        parent: Mat4,
        depth: usize,
    ) -> Result<()>
    where
        C: CommandList<Group = S::Group>,
        S: SceneBindings<TextureBinding = T>,
    {
        let scene = ctx.scene;
        if depth > scene.nodes.len() {
            return Err(Error::InvalidResource(format!(
                "node {} reached at depth {}: scene graph has a cycle",
                node_index, depth
            )));
        }

        let node = scene.node(node_index)?;
        let world = parent * node.local_transform();
        ctx.stats.nodes_visited += 1;

        if let Some(mesh_index) = node.mesh {
            let mesh = scene.mesh(mesh_index)?;
            if mesh.primitives.len() > 1 && self.warned_meshes.insert(mesh_index) {
                engine_warn!(
                    "discovery::recorder",
                    "Mesh {} has {} primitives, only the first is drawn",
                    mesh_index,
                    mesh.primitives.len()
                );
            }
            if let Some(primitive) = mesh.primitives.first() {
                self.draw_primitive(ctx, node_index, &world, primitive)?;
            }
        }

        for &child in &node.children {
            self.visit(ctx, child, world, depth + 1)?;
        }
        Ok(())
    }

    fn draw_primitive<C, S>(
        &mut self,
        ctx: &mut Visit<'_, C, S>,
        node_index: usize,
        world: &Mat4,
        primitive: &Primitive<C::Buffer>,
    ) -> Result<()>
    where
        C: CommandList<Group = S::Group>,
        S: SceneBindings<TextureBinding = T>,
    {
        let image_index = ctx.image_index;
        let mut groups: Vec<(u32, S::Group)> = Vec::with_capacity(2 + self.layout.textures.len());

        groups.push((self.layout.view_projection, ctx.bindings.view_projection(image_index)?));
        groups.push((
            self.layout.node_transform,
            ctx.bindings.node_transform(node_index, image_index, world)?,
        ));

        for &(slot, set) in &self.layout.textures {
            let group = match primitive.textures.get(slot) {
                None => ctx.bindings.default_texture(slot, image_index)?,
                Some(texture_index) => {
                    let binding = match self.texture_cache.entry(texture_index) {
                        Entry::Occupied(entry) => entry.into_mut(),
                        Entry::Vacant(entry) => {
                            entry.insert(ctx.bindings.create_texture_binding(texture_index, set)?)
                        }
                    };
                    ctx.bindings.texture_group(binding, image_index)
                }
            };
            groups.push((set, group));
        }

        groups.sort_by_key(|(set, _)| *set);
        for (set, group) in &groups {
            ctx.cmd.bind_binding_group(ctx.pipeline, *set, group)?;
        }

        ctx.cmd.bind_vertex_buffer(&*primitive.vertex_buffer, 0)?;
        match &primitive.index_buffer {
            Some(indices) => {
                ctx.cmd.bind_index_buffer(&*indices.buffer, 0)?;
                ctx.cmd.draw_indexed(indices.count, 0, 0)?;
                ctx.stats.indexed_draws += 1;
            }
            None => {
                ctx.cmd.draw(primitive.vertex_count, 0)?;
                ctx.stats.draws += 1;
            }
        }
        Ok(())
    }
}

/// Per-recording borrowed state threaded through the walk
struct Visit<'a, C: CommandList, S> {
    cmd: &'a mut C,
    bindings: &'a mut S,
    pipeline: &'a C::Pipeline,
    scene: &'a Scene<C::Buffer>,
    image_index: u32,
    stats: &'a mut RecordStats,
}

#[cfg(test)]
#[path = "scene_recorder_tests.rs"]
mod tests;
