/// Frame-in-flight pacing
///
/// CPU and GPU are decoupled by `MAX_FRAMES_IN_FLIGHT` frame slots. Each slot
/// owns an image-available semaphore, a render-finished semaphore and an
/// in-flight fence (created signalled). The pacer decides which fence to wait
/// on and when; the backend only implements the primitive operations.

use crate::error::Result;

/// Number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Swapchain state reported by acquire and present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapchainStatus {
    /// Swapchain matches the surface
    Optimal,
    /// Still usable, but should be rebuilt
    Suboptimal,
    /// Unusable until rebuilt
    OutOfDate,
}

impl SwapchainStatus {
    /// Whether the swapchain must be rebuilt after this result
    pub fn needs_recreate(&self) -> bool {
        !matches!(self, SwapchainStatus::Optimal)
    }
}

/// Primitive synchronization operations of a backend
///
/// `frame` is always a frame slot in `0..MAX_FRAMES_IN_FLIGHT`. Waits use an
/// infinite timeout.
pub trait FrameSync {
    /// Recorded work handed to `submit`
    type Commands: ?Sized;

    /// Block until the in-flight fence of `frame` is signalled
    fn wait_for_fence(&self, frame: usize) -> Result<()>;

    /// Unsignal the in-flight fence of `frame`
    fn reset_fence(&self, frame: usize) -> Result<()>;

    /// Acquire the next presentable image, signalling the image-available semaphore of `frame`
    ///
    /// The index is meaningless when the status is `OutOfDate`.
    fn acquire_image(&self, frame: usize) -> Result<(u32, SwapchainStatus)>;

    /// Submit `commands` for `image_index`
    ///
    /// Waits on the image-available semaphore of `frame` at color-attachment
    /// output, signals its render-finished semaphore and its in-flight fence.
    fn submit(&self, frame: usize, image_index: u32, commands: &Self::Commands) -> Result<()>;

    /// Present `image_index`, waiting on the render-finished semaphore of `frame`
    fn present(&self, frame: usize, image_index: u32) -> Result<SwapchainStatus>;
}

/// Frame slot and acquired-image bookkeeping
///
/// Invariants:
/// - the fence of slot `f` is waited on before slot `f` is submitted again
/// - an image still owned by another slot is waited on before being reused
/// - at most one image is acquired per frame, and it is released by `present`
/// - at most one submit per acquired image
#[derive(Debug)]
pub struct FramePacer {
    current_frame: usize,
    acquired_image: Option<u32>,
    submitted: bool,
    images_in_flight: Vec<Option<usize>>,
}

impl FramePacer {
    /// Create a pacer for a swapchain of `image_count` images
    pub fn new(image_count: usize) -> Self {
        Self {
            current_frame: 0,
            acquired_image: None,
            submitted: false,
            images_in_flight: vec![None; image_count],
        }
    }

    /// Current frame slot
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Image acquired for the current frame, if any
    pub fn acquired_image(&self) -> Option<u32> {
        self.acquired_image
    }

    /// Whether work was already submitted for the acquired image
    pub fn submitted(&self) -> bool {
        self.submitted
    }

    /// Forget per-image ownership after a swapchain rebuild
    pub fn reset_images(&mut self, image_count: usize) {
        self.images_in_flight = vec![None; image_count];
        self.acquired_image = None;
        self.submitted = false;
    }

    /// Acquire an image for the current frame
    ///
    /// Returns the cached index when an image was already acquired this frame,
    /// and `Ok(None)` when the swapchain is out of date.
    pub fn acquire<S: FrameSync>(&mut self, sync: &S) -> Result<Option<u32>> {
        if let Some(image_index) = self.acquired_image {
            return Ok(Some(image_index));
        }

        sync.wait_for_fence(self.current_frame)?;

        let (image_index, status) = sync.acquire_image(self.current_frame)?;
        if status == SwapchainStatus::OutOfDate {
            return Ok(None);
        }

        if let Some(owner) = self.images_in_flight.get(image_index as usize).copied().flatten() {
            if owner != self.current_frame {
                sync.wait_for_fence(owner)?;
            }
        }

        self.acquired_image = Some(image_index);
        Ok(Some(image_index))
    }

    /// Submit recorded work for the acquired image
    ///
    /// The image-available semaphore is consumed by the first submit, so a
    /// second submit before `present` is an error.
    pub fn submit<S: FrameSync>(&mut self, sync: &S, commands: &S::Commands) -> Result<u32> {
        let Some(image_index) = self.acquired_image else {
            crate::engine_bail!("discovery::frame", "submit called without an acquired image");
        };
        if self.submitted {
            crate::engine_bail!(
                "discovery::frame",
                "image {} already submitted this frame; present before submitting again",
                image_index
            );
        }

        sync.wait_for_fence(self.current_frame)?;
        sync.reset_fence(self.current_frame)?;
        sync.submit(self.current_frame, image_index, commands)?;
        self.submitted = true;

        if let Some(slot) = self.images_in_flight.get_mut(image_index as usize) {
            *slot = Some(self.current_frame);
        }
        Ok(image_index)
    }

    /// Present the acquired image and advance to the next frame slot
    ///
    /// The frame slot advances even when presentation fails.
    pub fn present<S: FrameSync>(&mut self, sync: &S) -> Result<SwapchainStatus> {
        let Some(image_index) = self.acquired_image.take() else {
            crate::engine_bail!("discovery::frame", "present called without an acquired image");
        };
        self.submitted = false;

        let status = sync.present(self.current_frame, image_index);
        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
        status
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
