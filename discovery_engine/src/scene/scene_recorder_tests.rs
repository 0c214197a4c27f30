//! Unit tests for scene_recorder.rs
//!
//! Records small scenes into the mock command list and checks transforms,
//! bind order, draw calls and the texture binding cache.

use std::sync::Arc;
use glam::{Mat4, Vec3};
use crate::error::{Error, Result};
use crate::renderer::ClearValue;
use crate::renderer::mock_renderer::{MockBuffer, MockCommandList, MockGroup, MockPipeline};
use crate::scene::scene::*;
use crate::scene::scene_recorder::*;

// ============================================================================
// TEST HELPERS
// ============================================================================

fn group(label: String) -> Arc<MockGroup> {
    Arc::new(MockGroup { label })
}

/// Bindings that log node transforms and count texture binding creations
#[derive(Default)]
struct MockBindings {
    node_worlds: Vec<(usize, u32, Mat4)>,
    created_textures: Vec<(usize, u32)>,
    texture_count: usize,
}

impl SceneBindings for MockBindings {
    type Group = Arc<MockGroup>;
    type TextureBinding = Arc<MockGroup>;

    fn view_projection(&mut self, image_index: u32) -> Result<Arc<MockGroup>> {
        Ok(group(format!("vp{}", image_index)))
    }

    fn default_texture(&mut self, slot: TextureSlot, _image_index: u32) -> Result<Arc<MockGroup>> {
        Ok(group(format!("default_{:?}", slot)))
    }

    fn create_texture_binding(&mut self, texture_index: usize, set: u32) -> Result<Arc<MockGroup>> {
        if texture_index >= self.texture_count {
            return Err(Error::InvalidResource(format!("texture {}", texture_index)));
        }
        self.created_textures.push((texture_index, set));
        Ok(group(format!("tex{}", texture_index)))
    }

    fn texture_group(&self, binding: &Arc<MockGroup>, _image_index: u32) -> Arc<MockGroup> {
        binding.clone()
    }

    fn node_transform(&mut self, node_index: usize, image_index: u32, world: &Mat4) -> Result<Arc<MockGroup>> {
        self.node_worlds.push((node_index, image_index, *world));
        Ok(group(format!("node{}", node_index)))
    }
}

fn primitive(vertex_count: u32, index_count: Option<u32>, textures: TextureSlots) -> Primitive<MockBuffer> {
    Primitive {
        vertex_buffer: Arc::new(MockBuffer::new(60 * vertex_count as u64)),
        vertex_count,
        index_buffer: index_count.map(|count| IndexBuffer {
            buffer: Arc::new(MockBuffer::new(4 * count as u64)),
            count,
        }),
        textures,
    }
}

fn mesh(primitives: Vec<Primitive<MockBuffer>>) -> Mesh<MockBuffer> {
    Mesh { primitives }
}

fn clears() -> Vec<ClearValue> {
    vec![
        ClearValue::Color([0.11, 0.12, 0.15, 1.0]),
        ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
    ]
}

fn record(
    recorder: &mut SceneRecorder<Arc<MockGroup>>,
    bindings: &mut MockBindings,
    scene: &Scene<MockBuffer>,
    image_index: u32,
) -> (MockCommandList, Result<RecordStats>) {
    let mut cmd = MockCommandList::new();
    let pipeline = MockPipeline { name: "mesh".to_string() };
    let result = recorder.record(&mut cmd, bindings, &pipeline, scene, image_index, &clears());
    (cmd, result)
}

// ============================================================================
// TRANSFORMS
// ============================================================================

#[test]
fn test_meshless_parent_propagates_transform() {
    let mut scene = Scene::new();
    let m = scene.add_mesh(mesh(vec![primitive(3, None, TextureSlots::default())]));
    let c1 = SceneNode {
        translation: Vec3::new(1.0, 0.0, 0.0),
        mesh: Some(m),
        ..SceneNode::default()
    };
    let c2 = SceneNode {
        scale: Vec3::splat(3.0),
        mesh: Some(m),
        ..SceneNode::default()
    };
    let c1_local = c1.local_transform();
    let c2_local = c2.local_transform();
    let c1 = scene.add_node(c1);
    let c2 = scene.add_node(c2);
    let parent_matrix = Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0));
    let parent = scene.add_node(SceneNode {
        children: vec![c1, c2],
        ..SceneNode::with_matrix(parent_matrix)
    });
    scene.roots.push(parent);

    let mut recorder = SceneRecorder::new(SceneBindingLayout::default());
    let mut bindings = MockBindings::default();
    let (cmd, result) = record(&mut recorder, &mut bindings, &scene, 0);

    let stats = result.unwrap();
    assert_eq!(stats.nodes_visited, 3);
    assert_eq!(bindings.node_worlds, vec![
        (c1, 0, parent_matrix * c1_local),
        (c2, 0, parent_matrix * c2_local),
    ]);
    assert_eq!(cmd.draws(), vec!["draw 3 0", "draw 3 0"]);
}

#[test]
fn test_depth_first_preorder() {
    let mut scene: Scene<MockBuffer> = Scene::new();
    let m = scene.add_mesh(mesh(vec![primitive(3, None, TextureSlots::default())]));
    let grandchild = scene.add_node(SceneNode { mesh: Some(m), ..SceneNode::default() });
    let child_a = scene.add_node(SceneNode { mesh: Some(m), children: vec![grandchild], ..SceneNode::default() });
    let child_b = scene.add_node(SceneNode { mesh: Some(m), ..SceneNode::default() });
    let root = scene.add_node(SceneNode { mesh: Some(m), children: vec![child_a, child_b], ..SceneNode::default() });
    let second_root = scene.add_node(SceneNode { mesh: Some(m), ..SceneNode::default() });
    scene.roots = vec![root, second_root];

    let mut recorder = SceneRecorder::new(SceneBindingLayout::default());
    let mut bindings = MockBindings::default();
    record(&mut recorder, &mut bindings, &scene, 1).1.unwrap();

    let order: Vec<usize> = bindings.node_worlds.iter().map(|(n, _, _)| *n).collect();
    assert_eq!(order, vec![root, child_a, grandchild, child_b, second_root]);
    assert!(bindings.node_worlds.iter().all(|(_, image, _)| *image == 1));
}

// ============================================================================
// DRAW CALLS
// ============================================================================

#[test]
fn test_non_indexed_and_indexed_draws() {
    let mut scene = Scene::new();
    let plain = scene.add_mesh(mesh(vec![primitive(36, None, TextureSlots::default())]));
    let indexed = scene.add_mesh(mesh(vec![primitive(24, Some(36), TextureSlots::default())]));
    let a = scene.add_node(SceneNode { mesh: Some(plain), ..SceneNode::default() });
    let b = scene.add_node(SceneNode { mesh: Some(indexed), ..SceneNode::default() });
    scene.roots = vec![a, b];

    let mut recorder = SceneRecorder::new(SceneBindingLayout::default());
    let mut bindings = MockBindings::default();
    let (cmd, result) = record(&mut recorder, &mut bindings, &scene, 0);

    let stats = result.unwrap();
    assert_eq!(stats.draws, 1);
    assert_eq!(stats.indexed_draws, 1);
    assert_eq!(cmd.draws(), vec!["draw 36 0", "draw_indexed 36 0 0"]);
    assert_eq!(cmd.commands.iter().filter(|c| c.starts_with("bind_index_buffer")).count(), 1);
}

#[test]
fn test_command_sequence_and_bind_order() {
    let mut scene = Scene::new();
    let textures = TextureSlots { color: Some(0), ..TextureSlots::default() };
    let m = scene.add_mesh(mesh(vec![primitive(3, None, textures)]));
    let n = scene.add_node(SceneNode { mesh: Some(m), ..SceneNode::default() });
    scene.roots.push(n);

    let mut recorder = SceneRecorder::new(SceneBindingLayout::default());
    let mut bindings = MockBindings { texture_count: 1, ..MockBindings::default() };
    let (cmd, result) = record(&mut recorder, &mut bindings, &scene, 2);
    result.unwrap();

    assert_eq!(cmd.commands, vec![
        "begin_render_pass clears=2",
        "bind_pipeline mesh",
        "bind_group 0 vp2",
        "bind_group 1 node0",
        "bind_group 2 tex0",
        "bind_group 3 default_Normal",
        "bind_vertex_buffer 0",
        "draw 3 0",
        "end_render_pass",
    ]);
}

#[test]
fn test_custom_layout_binds_in_set_order() {
    let mut scene = Scene::new();
    let m = scene.add_mesh(mesh(vec![primitive(3, None, TextureSlots::default())]));
    let n = scene.add_node(SceneNode { mesh: Some(m), ..SceneNode::default() });
    scene.roots.push(n);

    let layout = SceneBindingLayout {
        view_projection: 2,
        node_transform: 0,
        textures: vec![(TextureSlot::Emissive, 1)],
    };
    let mut recorder = SceneRecorder::new(layout);
    let mut bindings = MockBindings::default();
    let (cmd, _) = record(&mut recorder, &mut bindings, &scene, 0);

    let binds: Vec<&String> = cmd.commands.iter().filter(|c| c.starts_with("bind_group")).collect();
    assert_eq!(binds, vec!["bind_group 0 node0", "bind_group 1 default_Emissive", "bind_group 2 vp0"]);
}

#[test]
fn test_only_first_primitive_drawn() {
    let mut scene = Scene::new();
    let m = scene.add_mesh(mesh(vec![
        primitive(3, None, TextureSlots::default()),
        primitive(6, None, TextureSlots::default()),
    ]));
    let n = scene.add_node(SceneNode { mesh: Some(m), ..SceneNode::default() });
    scene.roots.push(n);

    let mut recorder = SceneRecorder::new(SceneBindingLayout::default());
    let mut bindings = MockBindings::default();
    let (cmd, _) = record(&mut recorder, &mut bindings, &scene, 0);

    assert_eq!(cmd.draws(), vec!["draw 3 0"]);
}

// ============================================================================
// TEXTURE CACHE
// ============================================================================

#[test]
fn test_same_texture_resolves_to_same_binding() {
    let mut scene = Scene::new();
    let textures = TextureSlots { color: Some(1), ..TextureSlots::default() };
    let m1 = scene.add_mesh(mesh(vec![primitive(3, None, textures)]));
    let m2 = scene.add_mesh(mesh(vec![primitive(3, Some(3), textures)]));
    let a = scene.add_node(SceneNode { mesh: Some(m1), ..SceneNode::default() });
    let b = scene.add_node(SceneNode { mesh: Some(m2), ..SceneNode::default() });
    scene.roots = vec![a, b];

    let mut recorder = SceneRecorder::new(SceneBindingLayout::default());
    let mut bindings = MockBindings { texture_count: 2, ..MockBindings::default() };
    record(&mut recorder, &mut bindings, &scene, 0).1.unwrap();
    let first = recorder.cached_texture_binding(1).unwrap().clone();
    record(&mut recorder, &mut bindings, &scene, 1).1.unwrap();

    assert_eq!(bindings.created_textures, vec![(1, 2)]);
    assert_eq!(recorder.cached_texture_count(), 1);
    assert!(Arc::ptr_eq(&first, recorder.cached_texture_binding(1).unwrap()));

    recorder.clear_cache();
    assert!(recorder.cached_texture_binding(1).is_none());
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn test_missing_texture_aborts_recording() {
    let mut scene = Scene::new();
    let textures = TextureSlots { normal: Some(9), ..TextureSlots::default() };
    let m = scene.add_mesh(mesh(vec![primitive(3, None, textures)]));
    let n = scene.add_node(SceneNode { mesh: Some(m), ..SceneNode::default() });
    scene.roots.push(n);

    let mut recorder = SceneRecorder::new(SceneBindingLayout::default());
    let mut bindings = MockBindings::default();
    let (cmd, result) = record(&mut recorder, &mut bindings, &scene, 0);

    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert!(cmd.draws().is_empty());
    assert!(!cmd.commands.contains(&"end_render_pass".to_string()));
}

#[test]
fn test_bad_indices_are_errors() {
    let mut scene: Scene<MockBuffer> = Scene::new();
    let n = scene.add_node(SceneNode { mesh: Some(4), ..SceneNode::default() });
    scene.roots = vec![n];

    let mut recorder = SceneRecorder::new(SceneBindingLayout::default());
    let mut bindings = MockBindings::default();
    assert!(matches!(record(&mut recorder, &mut bindings, &scene, 0).1, Err(Error::InvalidResource(_))));

    scene.roots = vec![42];
    assert!(matches!(record(&mut recorder, &mut bindings, &scene, 0).1, Err(Error::InvalidResource(_))));
}

#[test]
fn test_cycle_is_detected() {
    let mut scene: Scene<MockBuffer> = Scene::new();
    let a = scene.add_node(SceneNode::default());
    let b = scene.add_node(SceneNode { children: vec![a], ..SceneNode::default() });
    scene.nodes[a].children.push(b);
    scene.roots = vec![a];

    let mut recorder = SceneRecorder::new(SceneBindingLayout::default());
    let mut bindings = MockBindings::default();
    let result = record(&mut recorder, &mut bindings, &scene, 0).1;

    assert!(matches!(result, Err(Error::InvalidResource(msg)) if msg.contains("cycle")));
}

#[test]
fn test_command_failure_aborts_frame() {
    let mut scene = Scene::new();
    let m = scene.add_mesh(mesh(vec![primitive(3, None, TextureSlots::default())]));
    let n = scene.add_node(SceneNode { mesh: Some(m), ..SceneNode::default() });
    scene.roots.push(n);

    let mut recorder = SceneRecorder::new(SceneBindingLayout::default());
    let mut bindings = MockBindings::default();
    let mut cmd = MockCommandList::failing_at(1);
    let pipeline = MockPipeline { name: "mesh".to_string() };

    let result = recorder.record(&mut cmd, &mut bindings, &pipeline, &scene, 0, &clears());

    assert!(matches!(result, Err(Error::BackendError(_))));
    assert_eq!(cmd.commands.len(), 1);
}
