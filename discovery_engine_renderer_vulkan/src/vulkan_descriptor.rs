/// Descriptor-backed resources
///
/// Each resource owns one descriptor pool sized for `K` sets (`K` = swapchain
/// image count at creation) and `K` sets allocated from a caller-supplied
/// layout. Dropping one waits for device idle first.

use ash::vk;
use bytemuck::Pod;
use std::sync::Arc;
use discovery_engine::discovery::render::UniformSlots;
use discovery_engine::discovery::{Error, Result};
use discovery_engine::{engine_err, engine_error};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::{vk_error, GpuContext};
use crate::vulkan_sampler::Sampler;
use crate::vulkan_texture::Texture;

/// Payload of one descriptor write
#[derive(Debug, Clone, Copy)]
pub enum DescriptorInfo {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

impl DescriptorInfo {
    /// Descriptor type written by this payload
    pub fn descriptor_type(&self) -> vk::DescriptorType {
        match self {
            DescriptorInfo::Buffer(_) => vk::DescriptorType::UNIFORM_BUFFER,
            DescriptorInfo::Image(_) => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        }
    }

    /// Write of this payload into `set` at `binding`
    pub fn write(&self, set: vk::DescriptorSet, binding: u32) -> vk::WriteDescriptorSet<'_> {
        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(self.descriptor_type());

        match self {
            DescriptorInfo::Buffer(info) => write.buffer_info(std::slice::from_ref(info)),
            DescriptorInfo::Image(info) => write.image_info(std::slice::from_ref(info)),
        }
    }
}

/// Pool holding one descriptor set per swapchain image
pub struct DescriptorSets {
    ctx: Arc<GpuContext>,
    pool: vk::DescriptorPool,
    sets: Vec<vk::DescriptorSet>,
}

impl DescriptorSets {
    /// Allocate `count` sets of `layout`, each holding one descriptor of type `ty`
    pub fn new(
        ctx: Arc<GpuContext>,
        layout: vk::DescriptorSetLayout,
        ty: vk::DescriptorType,
        count: usize,
    ) -> Result<Self> {
        if count == 0 {
            engine_error!("discovery::vulkan", "Descriptor sets requested for zero images");
            return Err(Error::InvalidResource("descriptor set count must be non-zero".to_string()));
        }

        unsafe {
            let pool_sizes = [vk::DescriptorPoolSize {
                ty,
                descriptor_count: count as u32,
            }];
            let pool_info = vk::DescriptorPoolCreateInfo::default()
                .max_sets(count as u32)
                .pool_sizes(&pool_sizes);

            let pool = ctx
                .device
                .create_descriptor_pool(&pool_info, None)
                .map_err(|e| vk_error("create descriptor pool", e))?;

            let layouts = vec![layout; count];
            let allocate_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(pool)
                .set_layouts(&layouts);

            let sets = match ctx.device.allocate_descriptor_sets(&allocate_info) {
                Ok(sets) => sets,
                Err(e) => {
                    ctx.device.destroy_descriptor_pool(pool, None);
                    return Err(vk_error("allocate descriptor sets", e));
                }
            };

            Ok(Self { ctx, pool, sets })
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Set of `image_index`
    pub fn get(&self, image_index: u32) -> Result<vk::DescriptorSet> {
        self.sets.get(image_index as usize).copied().ok_or_else(|| {
            engine_err!(
                "discovery::vulkan",
                "Image index {} out of range ({} descriptor sets)",
                image_index,
                self.sets.len()
            )
        })
    }

    /// Point the set of `image_index` at `info`
    pub fn write(&self, image_index: u32, binding: u32, info: &DescriptorInfo) -> Result<()> {
        let set = self.get(image_index)?;
        unsafe {
            self.ctx.device.update_descriptor_sets(&[info.write(set, binding)], &[]);
        }
        Ok(())
    }
}

impl Drop for DescriptorSets {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
            // Sets are freed with their pool
            self.ctx.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

// ===== UNIFORM BUFFER =====

/// A uniform value with one host-visible buffer and descriptor set per image
pub struct UniformBuffer<T: Pod> {
    /// Dropped first: waits for device idle before the buffers go
    sets: DescriptorSets,
    slots: UniformSlots<T, Buffer>,
    binding: u32,
}

impl<T: Pod> UniformBuffer<T> {
    /// Create `image_count` slots holding `value`, bound at `binding` of `layout`
    pub fn new(
        ctx: Arc<GpuContext>,
        binding: u32,
        layout: vk::DescriptorSetLayout,
        image_count: usize,
        value: T,
    ) -> Result<Self> {
        let size = std::mem::size_of::<T>() as u64;
        let buffers = (0..image_count)
            .map(|_| Buffer::new(Arc::clone(&ctx), size, vk::BufferUsageFlags::UNIFORM_BUFFER))
            .collect::<Result<Vec<_>>>()?;

        let slots = UniformSlots::new(value, buffers)?;
        let sets = DescriptorSets::new(ctx, layout, vk::DescriptorType::UNIFORM_BUFFER, image_count)?;

        for (index, buffer) in slots.slots().iter().enumerate() {
            let info = DescriptorInfo::Buffer(
                vk::DescriptorBufferInfo::default()
                    .buffer(buffer.handle())
                    .offset(0)
                    .range(size),
            );
            sets.write(index as u32, binding, &info)?;
            slots.write_slot(index as u32)?;
        }

        Ok(Self { sets, slots, binding })
    }

    /// Replace the CPU-side value; call `update` to publish it
    pub fn set(&mut self, value: T) {
        self.slots.set(value);
    }

    pub fn value(&self) -> &T {
        self.slots.value()
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    pub fn image_count(&self) -> usize {
        self.slots.slot_count()
    }

    /// Write the current value into the slot of `image_index` only
    pub fn update(&self, image_index: u32) -> Result<()> {
        self.slots.write_slot(image_index)
    }

    /// Value stored in the slot of `image_index`
    pub fn read(&self, image_index: u32) -> Result<T> {
        self.slots.read_slot(image_index)
    }

    pub fn descriptor_set(&self, image_index: u32) -> Result<vk::DescriptorSet> {
        self.sets.get(image_index)
    }
}

// ===== SAMPLER BINDING =====

/// A combined image/sampler, the same texture in every per-image set
pub struct SamplerBinding {
    sets: DescriptorSets,
    binding: u32,
    texture: Arc<Texture>,
    sampler: Arc<Sampler>,
}

impl SamplerBinding {
    /// Create `image_count` sets sampling `texture` at `binding` of `layout`
    pub fn new(
        ctx: Arc<GpuContext>,
        binding: u32,
        layout: vk::DescriptorSetLayout,
        image_count: usize,
        texture: Arc<Texture>,
        sampler: Arc<Sampler>,
    ) -> Result<Self> {
        let sets = DescriptorSets::new(
            ctx,
            layout,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            image_count,
        )?;
        let binding = Self { sets, binding, texture, sampler };
        binding.update()?;
        Ok(binding)
    }

    /// Swap the sampled texture; call `update` to publish it
    pub fn set_texture(&mut self, texture: Arc<Texture>) {
        self.texture = texture;
    }

    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    /// Rewrite every set with the current texture and sampler
    pub fn update(&self) -> Result<()> {
        let info = DescriptorInfo::Image(
            vk::DescriptorImageInfo::default()
                .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .image_view(self.texture.view())
                .sampler(self.sampler.handle()),
        );
        for image_index in 0..self.sets.len() {
            self.sets.write(image_index as u32, self.binding, &info)?;
        }
        Ok(())
    }

    /// Set of `image_index`
    pub fn descriptor_set(&self, image_index: u32) -> vk::DescriptorSet {
        // Every set holds the same descriptor
        self.sets.sets[image_index as usize % self.sets.sets.len()]
    }
}

#[cfg(test)]
#[path = "vulkan_descriptor_tests.rs"]
mod tests;
