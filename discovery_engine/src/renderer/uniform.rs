/// Per-image uniform storage

use bytemuck::Pod;
use crate::error::{Error, Result};
use crate::renderer::buffer::Buffer;

/// A uniform value replicated once per swapchain image
///
/// Holds the CPU-side value and `K` backing buffers, one per swapchain image.
/// `write_slot` only touches the buffer of the given image, so a frame still
/// in flight on another image keeps reading its own copy.
pub struct UniformSlots<T: Pod, B: Buffer> {
    value: T,
    slots: Vec<B>,
}

impl<T: Pod, B: Buffer> UniformSlots<T, B> {
    /// Wrap `slots` (one per swapchain image) around an initial value
    ///
    /// Every slot must be at least `size_of::<T>()` bytes.
    pub fn new(value: T, slots: Vec<B>) -> Result<Self> {
        let needed = std::mem::size_of::<T>() as u64;
        if let Some((index, slot)) = slots.iter().enumerate().find(|(_, s)| s.size() < needed) {
            return Err(Error::InvalidResource(format!(
                "uniform slot {} holds {} bytes, value needs {}",
                index,
                slot.size(),
                needed
            )));
        }
        Ok(Self { value, slots })
    }

    /// Replace the CPU-side value (not yet visible to the GPU)
    pub fn set(&mut self, value: T) {
        self.value = value;
    }

    /// Current CPU-side value
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Number of slots (swapchain image count at creation time)
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Backing buffers, indexed by image
    pub fn slots(&self) -> &[B] {
        &self.slots
    }

    /// Copy the current value into the slot of `image_index`
    pub fn write_slot(&self, image_index: u32) -> Result<()> {
        self.slot(image_index)?.update(0, bytemuck::bytes_of(&self.value))
    }

    /// Read the value stored in the slot of `image_index`
    pub fn read_slot(&self, image_index: u32) -> Result<T> {
        let bytes = self
            .slot(image_index)?
            .read_back(0, std::mem::size_of::<T>() as u64)?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }

    fn slot(&self, image_index: u32) -> Result<&B> {
        self.slots.get(image_index as usize).ok_or_else(|| {
            Error::InvalidResource(format!(
                "image index {} out of range ({} uniform slots)",
                image_index,
                self.slots.len()
            ))
        })
    }
}

#[cfg(test)]
#[path = "uniform_tests.rs"]
mod tests;
