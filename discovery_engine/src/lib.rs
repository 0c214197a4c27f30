/*!
# Discovery Engine

Backend-agnostic core of the Discovery renderer.

This crate holds everything that can be expressed without touching the GPU API:
the swapchain recreation protocol, frame-in-flight pacing, the declarative
pipeline model and the scene-graph recording walk. The Vulkan backend
(`discovery_engine_renderer_vulkan`) implements the traits defined here.

## Architecture

- **ResourceRegistry**: ordered list of pipelines and recorders driven through
  swapchain recreation
- **FramePacer**: acquire/submit/present bookkeeping over `N` frames in flight
- **PipelineVariant**: capability trait describing a pipeline declaratively
- **UniformSlots**: a value replicated once per swapchain image
- **SceneRecorder**: depth-first scene walk that emits draw commands
- **CommandList**: the command-recording surface used by the recorder
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod renderer;
pub mod scene;

// Main discovery namespace module
pub mod discovery {
    // Error types
    pub use crate::error::{Error, Result};

    // Logger host
    pub use crate::engine::Engine;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;
