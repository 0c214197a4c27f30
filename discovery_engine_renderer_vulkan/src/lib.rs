/*!
# Discovery Engine - Vulkan Backend

Vulkan implementation of the Discovery rendering core.

This crate implements the `discovery_engine` traits using the Ash library for
Vulkan bindings and gpu-allocator for memory management:

- `VulkanRenderer`: device context, swapchain, frame loop and resource registry
- `Pipeline`: a `PipelineVariant` compiled into native pipeline objects
- `CommandRecorder`: one command buffer per swapchain image, filled by a
  `RecordCommands` implementation such as `SceneDraw`
- `UniformBuffer` / `SamplerBinding`: descriptor-backed resources replicated
  once per swapchain image

# Example

```no_run
use discovery_engine::discovery::render::Config;
use discovery_engine_renderer_vulkan::VulkanRenderer;
# fn run(window: &winit::window::Window) -> discovery_engine::discovery::Result<()> {
let mut renderer = VulkanRenderer::new(window, Config::default())?;
// create pipelines and recorders, then per frame:
// if renderer.submit(&recorder)? { renderer.present()?; }
renderer.wait_idle()?;
# Ok(())
# }
```
*/

// Device context and presentation
mod vulkan;
mod vulkan_context;
mod vulkan_device;
mod vulkan_swapchain;
mod vulkan_frame;

// Resources
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_sampler;
mod vulkan_shader;
mod vulkan_descriptor;
mod vulkan_pipeline;

// Recording
mod vulkan_command_list;
mod vulkan_recorder;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan::VulkanRenderer;
pub use vulkan_context::GpuContext;
pub use vulkan_buffer::Buffer;
pub use vulkan_texture::Texture;
pub use vulkan_sampler::Sampler;
pub use vulkan_shader::ShaderModule;
pub use vulkan_descriptor::{DescriptorInfo, DescriptorSets, SamplerBinding, UniformBuffer};
pub use vulkan_pipeline::Pipeline;
pub use vulkan_command_list::{RenderTarget, VulkanCommandList};
pub use vulkan_recorder::{CommandRecorder, RecordCommands, RecordTarget, SceneDraw};

// Re-export debug utilities
#[cfg(feature = "vulkan-validation")]
pub use debug::{get_validation_stats, print_validation_stats_report, reset_validation_stats};
