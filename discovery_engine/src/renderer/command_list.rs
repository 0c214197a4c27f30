/// CommandList trait - for recording rendering commands

use crate::error::Result;

/// Command list for recording rendering commands into one per-image command buffer
///
/// The backend binds the list to a swapchain image before handing it out, so
/// `begin_render_pass` needs no render pass or framebuffer argument: it always
/// targets the framebuffer of that image.
pub trait CommandList {
    /// Pipeline type accepted by `bind_pipeline`
    type Pipeline;
    /// Descriptor group type accepted by `bind_binding_group`
    type Group;
    /// Buffer type accepted by the vertex/index binding calls
    type Buffer;

    /// Begin recording commands
    ///
    /// Fails when the buffer is already recording.
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Begin the render pass on this image's framebuffer
    ///
    /// # Arguments
    ///
    /// * `clear_values` - Clear values for attachments (color, then depth)
    fn begin_render_pass(&mut self, clear_values: &[ClearValue]) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: &Self::Pipeline) -> Result<()>;

    /// Bind a descriptor group at the given set index
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline whose layout the group is bound against
    /// * `set_index` - Set index (0 = view/projection, 1 = node transform, ...)
    /// * `group` - The group to bind
    fn bind_binding_group(
        &mut self,
        pipeline: &Self::Pipeline,
        set_index: u32,
        group: &Self::Group,
    ) -> Result<()>;

    /// Bind a vertex buffer at binding 0
    ///
    /// # Arguments
    ///
    /// * `buffer` - Buffer to bind
    /// * `offset` - Offset into the buffer in bytes
    fn bind_vertex_buffer(&mut self, buffer: &Self::Buffer, offset: u64) -> Result<()>;

    /// Bind a 32-bit index buffer
    fn bind_index_buffer(&mut self, buffer: &Self::Buffer, offset: u64) -> Result<()>;

    /// Draw vertices
    ///
    /// # Arguments
    ///
    /// * `vertex_count` - Number of vertices to draw
    /// * `first_vertex` - Index of first vertex
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Draw indexed vertices
    ///
    /// # Arguments
    ///
    /// * `index_count` - Number of indices to draw
    /// * `first_index` - Index of first index
    /// * `vertex_offset` - Value added to vertex index before indexing into the vertex buffer
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-surface viewport with depth range [0, 1]
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    /// Rectangle anchored at the origin
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}
