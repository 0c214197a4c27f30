//! Scene module
//!
//! Provides the scene graph consumed from the asset collaborator and the
//! depth-first recorder that turns it into draw commands.

pub mod scene;
pub mod scene_recorder;

pub use scene::{
    IndexBuffer, Mesh, Primitive, Scene, SceneNode, TextureSlot, TextureSlots, Vertex,
    widen_indices,
};
pub use scene_recorder::{RecordStats, SceneBindingLayout, SceneBindings, SceneRecorder};
