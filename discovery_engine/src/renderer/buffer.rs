/// Buffer trait

use crate::error::Result;

/// Host-visible buffer resource
///
/// Implemented by backend-specific buffer types (e.g., the Vulkan `Buffer`).
/// The buffer is automatically destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Update buffer data
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write
    ///
    /// Writing past `size()` is an `InvalidResource` error.
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Copy `len` bytes starting at `offset` back to the host
    fn read_back(&self, offset: u64, len: u64) -> Result<Vec<u8>>;
}

/// Check that `[offset, offset + len)` fits in a buffer of `size` bytes
pub fn check_range(size: u64, offset: u64, len: u64) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(crate::error::Error::InvalidResource(format!(
            "buffer range {}..{} exceeds size {}",
            offset,
            offset.saturating_add(len),
            size
        ))),
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
