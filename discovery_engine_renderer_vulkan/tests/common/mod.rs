//! Shared helpers for the GPU tests

#![allow(dead_code)]

pub mod shaders;

use discovery_engine::discovery::render::{
    BindingDeclaration, DynamicState, PipelineVariant, ShaderStage, ShaderStageDesc,
    ShaderStageFlags, VertexLayout,
};
use discovery_engine::discovery::scene::Vertex;
use winit::event_loop::EventLoop;
use winit::window::Window;

/// Helper to create a hidden test window for Vulkan
///
/// Only one event loop may exist per process, so every GPU scenario shares it.
#[allow(deprecated)]
pub fn create_test_window(width: u32, height: u32) -> (Window, EventLoop<()>) {
    let mut builder = EventLoop::builder();
    #[cfg(target_os = "linux")]
    winit::platform::x11::EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    let event_loop = builder.build().unwrap();

    let window_attrs = Window::default_attributes()
        .with_title("Discovery Vulkan Test")
        .with_inner_size(winit::dpi::PhysicalSize::new(width, height))
        .with_visible(false); // Hidden window for tests
    let window = event_loop.create_window(window_attrs).unwrap();
    (window, event_loop)
}

/// Mesh pipeline with the default scene binding layout
///
/// set 0: view/projection, set 1: node transform, set 2: color, set 3: normal
pub struct MeshVariant;

impl PipelineVariant for MeshVariant {
    fn vertex_layout(&self) -> VertexLayout {
        Vertex::layout()
    }

    fn shader_stages(&self) -> Vec<ShaderStageDesc> {
        vec![
            ShaderStageDesc::from_words(ShaderStage::Vertex, shaders::VERTEX_SPIRV.to_vec()),
            ShaderStageDesc::from_words(ShaderStage::Fragment, shaders::FRAGMENT_SPIRV.to_vec()),
        ]
    }

    fn dynamic_states(&self) -> Vec<DynamicState> {
        vec![DynamicState::Viewport, DynamicState::Scissor]
    }

    fn binding_declarations(&self) -> Vec<BindingDeclaration> {
        vec![
            BindingDeclaration::sampler(3, 0, ShaderStageFlags::FRAGMENT),
            BindingDeclaration::uniform(0, 0, ShaderStageFlags::VERTEX),
            BindingDeclaration::sampler(2, 0, ShaderStageFlags::FRAGMENT),
            BindingDeclaration::uniform(1, 0, ShaderStageFlags::VERTEX),
        ]
    }
}

/// Pipeline without descriptor bindings and with a static viewport
pub struct FlatVariant;

impl PipelineVariant for FlatVariant {
    fn vertex_layout(&self) -> VertexLayout {
        Vertex::layout()
    }

    fn shader_stages(&self) -> Vec<ShaderStageDesc> {
        MeshVariant.shader_stages()
    }

    fn dynamic_states(&self) -> Vec<DynamicState> {
        Vec::new()
    }

    fn binding_declarations(&self) -> Vec<BindingDeclaration> {
        Vec::new()
    }
}

/// Triangle in normalized device coordinates
pub fn triangle() -> Vec<Vertex> {
    [[0.0, -0.5, 0.0], [0.5, 0.5, 0.0], [-0.5, 0.5, 0.0]]
        .into_iter()
        .map(|position| Vertex { position, ..Vertex::default() })
        .collect()
}

/// `width` x `height` RGBA8 checkerboard
pub fn checkerboard(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let v = if (x + y) % 2 == 0 { 255 } else { 0 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    pixels
}
