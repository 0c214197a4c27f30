/// CommandList - Vulkan implementation of the CommandList trait
///
/// A command list borrows one per-image command buffer and the framebuffer of
/// that image for the duration of a recording.

use discovery_engine::discovery::{Result, Error};
use discovery_engine::discovery::render::{
    CommandBufferLevel,
    CommandList as RendererCommandList,
    Viewport, Rect2D, ClearValue,
};
use ash::vk;

use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_buffer::Buffer;

/// Convert an engine clear value to its Vulkan union
pub fn clear_value_to_vk(value: &ClearValue) -> vk::ClearValue {
    match value {
        ClearValue::Color(color) => vk::ClearValue {
            color: vk::ClearColorValue {
                float32: *color,
            },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: *depth,
                stencil: *stencil,
            },
        },
    }
}

/// Render pass and framebuffer a command list draws into
#[derive(Debug, Clone, Copy)]
pub struct RenderTarget {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
}

/// Vulkan command list over a borrowed command buffer
pub struct VulkanCommandList<'a> {
    device: &'a ash::Device,
    command_buffer: vk::CommandBuffer,
    target: RenderTarget,
    level: CommandBufferLevel,
    one_time_submit: bool,
    /// Whether the command list is currently recording
    is_recording: bool,
    /// Whether we're inside a render pass
    in_render_pass: bool,
}

impl<'a> VulkanCommandList<'a> {
    pub fn new(
        device: &'a ash::Device,
        command_buffer: vk::CommandBuffer,
        target: RenderTarget,
        level: CommandBufferLevel,
        one_time_submit: bool,
    ) -> Self {
        Self {
            device,
            command_buffer,
            target,
            level,
            one_time_submit,
            is_recording: false,
            in_render_pass: false,
        }
    }

    /// Get the underlying Vulkan command buffer
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.target.extent
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    fn ensure_recording(&self) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }
        Ok(())
    }

    fn ensure_in_render_pass(&self) -> Result<()> {
        self.ensure_recording()?;
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }
        Ok(())
    }
}

impl RendererCommandList for VulkanCommandList<'_> {
    type Pipeline = Pipeline;
    type Group = vk::DescriptorSet;
    type Buffer = Buffer;

    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            return Err(Error::BackendError("Command list already recording".to_string()));
        }

        unsafe {
            // Reset command buffer
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| Error::BackendError(format!("Failed to reset command buffer: {:?}", e)))?;

            let mut flags = vk::CommandBufferUsageFlags::empty();
            if self.one_time_submit {
                flags |= vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT;
            }

            // Secondary buffers continue the render pass of the primary that executes them
            let inheritance_info = vk::CommandBufferInheritanceInfo::default()
                .render_pass(self.target.render_pass)
                .subpass(0)
                .framebuffer(self.target.framebuffer);

            let mut begin_info = vk::CommandBufferBeginInfo::default();
            if self.level == CommandBufferLevel::Secondary {
                flags |= vk::CommandBufferUsageFlags::RENDER_PASS_CONTINUE;
                begin_info = begin_info.inheritance_info(&inheritance_info);
            }
            begin_info = begin_info.flags(flags);

            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| Error::BackendError(format!("Failed to begin command buffer: {:?}", e)))?;
        }

        self.is_recording = true;
        self.in_render_pass = false;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.ensure_recording()?;

        if self.in_render_pass {
            return Err(Error::BackendError("Render pass not ended before ending command list".to_string()));
        }

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| Error::BackendError(format!("Failed to end command buffer: {:?}", e)))?;
        }

        self.is_recording = false;
        Ok(())
    }

    fn begin_render_pass(&mut self, clear_values: &[ClearValue]) -> Result<()> {
        self.ensure_recording()?;

        if self.in_render_pass {
            return Err(Error::BackendError("Already inside a render pass".to_string()));
        }

        // A secondary buffer is already inside the inherited render pass
        if self.level == CommandBufferLevel::Primary {
            let vk_clear_values: Vec<vk::ClearValue> = clear_values.iter().map(clear_value_to_vk).collect();

            let render_pass_info = vk::RenderPassBeginInfo::default()
                .render_pass(self.target.render_pass)
                .framebuffer(self.target.framebuffer)
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: self.target.extent,
                })
                .clear_values(&vk_clear_values);

            unsafe {
                self.device.cmd_begin_render_pass(
                    self.command_buffer,
                    &render_pass_info,
                    vk::SubpassContents::INLINE,
                );
            }
        }

        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.ensure_in_render_pass()?;

        if self.level == CommandBufferLevel::Primary {
            unsafe { self.device.cmd_end_render_pass(self.command_buffer); }
        }

        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_recording()?;

        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);

        unsafe { self.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]); }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.ensure_recording()?;

        let vk_scissor = vk::Rect2D::default()
            .offset(vk::Offset2D { x: scissor.x, y: scissor.y })
            .extent(vk::Extent2D { width: scissor.width, height: scissor.height });

        unsafe { self.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]); }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Pipeline) -> Result<()> {
        self.ensure_recording()?;

        if !pipeline.is_built() {
            return Err(Error::BackendError("Pipeline is released".to_string()));
        }

        unsafe {
            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.handle(),
            );
        }
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        pipeline: &Pipeline,
        set_index: u32,
        group: &vk::DescriptorSet,
    ) -> Result<()> {
        self.ensure_recording()?;

        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout(),
                set_index,
                std::slice::from_ref(group),
                &[], // dynamic_offsets
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Buffer, offset: u64) -> Result<()> {
        self.ensure_recording()?;

        unsafe {
            self.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                0,
                &[buffer.handle()],
                &[offset],
            );
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Buffer, offset: u64) -> Result<()> {
        self.ensure_recording()?;

        unsafe {
            self.device.cmd_bind_index_buffer(
                self.command_buffer,
                buffer.handle(),
                offset,
                vk::IndexType::UINT32,
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.ensure_in_render_pass()?;

        unsafe {
            self.device.cmd_draw(
                self.command_buffer,
                vertex_count,
                1, // instance_count
                first_vertex,
                0, // first_instance
            );
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.ensure_in_render_pass()?;

        unsafe {
            self.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                1, // instance_count
                first_index,
                vertex_offset,
                0, // first_instance
            );
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "vulkan_command_list_tests.rs"]
mod tests;
