/// Buffer - Vulkan implementation of the host-visible Buffer trait

use discovery_engine::discovery::{
    Result,
    Error,
    render::{check_range, Buffer as RendererBuffer},
};
use discovery_engine::engine_error;
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::{vk_error, GpuContext};

/// Host-visible Vulkan buffer
pub struct Buffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Buffer size
    pub(crate) size: u64,
    usage: vk::BufferUsageFlags,
}

impl Buffer {
    /// Create a mapped buffer of `size` bytes
    pub fn new(ctx: Arc<GpuContext>, size: u64, usage: vk::BufferUsageFlags) -> Result<Self> {
        if size == 0 {
            engine_error!("discovery::vulkan", "Refusing to create a zero-sized buffer ({:?})", usage);
            return Err(Error::InvalidResource("buffer size must be non-zero".to_string()));
        }

        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx
                .device
                .create_buffer(&buffer_info, None)
                .map_err(|e| vk_error("create buffer", e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = match ctx.allocate("buffer", requirements, MemoryLocation::CpuToGpu, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            {
                ctx.free(allocation);
                ctx.device.destroy_buffer(buffer, None);
                return Err(vk_error("bind buffer memory", e));
            }

            Ok(Self {
                ctx,
                buffer,
                allocation: Some(allocation),
                size,
                usage,
            })
        }
    }

    /// Create a buffer holding `data`
    pub fn from_slice<T: bytemuck::Pod>(
        ctx: Arc<GpuContext>,
        data: &[T],
        usage: vk::BufferUsageFlags,
    ) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let buffer = Self::new(ctx, bytes.len() as u64, usage)?;
        buffer.update(0, bytes)?;
        Ok(buffer)
    }

    /// Native handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Usage flags the buffer was created with
    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }

    fn mapped_ptr(&self) -> Result<*mut u8> {
        let allocation = self.allocation.as_ref().ok_or_else(|| {
            engine_error!("discovery::vulkan", "Buffer access failed: no GPU allocation");
            Error::BackendError("Buffer has no allocation".to_string())
        })?;

        allocation
            .mapped_ptr()
            .map(|ptr| ptr.as_ptr() as *mut u8)
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))
    }
}

impl RendererBuffer for Buffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        check_range(self.size, offset, data.len() as u64)?;
        let mapped_ptr = self.mapped_ptr()?;

        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped_ptr.add(offset as usize),
                data.len(),
            );
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_back(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        check_range(self.size, offset, len)?;
        let mapped_ptr = self.mapped_ptr()?;

        let mut bytes = vec![0u8; len as usize];
        unsafe {
            std::ptr::copy_nonoverlapping(
                mapped_ptr.add(offset as usize),
                bytes.as_mut_ptr(),
                bytes.len(),
            );
        }
        Ok(bytes)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                self.ctx.free(allocation);
            }

            // Destroy buffer
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
