/// Window collaborator

use winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// A surface target the device context can render into
///
/// Provides raw handles for surface creation and the current drawable size,
/// queried on demand at every swapchain (re)build.
pub trait RenderWindow: HasDisplayHandle + HasWindowHandle {
    /// Current drawable size in physical pixels
    fn drawable_size(&self) -> (u32, u32);
}

impl RenderWindow for winit::window::Window {
    fn drawable_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}
