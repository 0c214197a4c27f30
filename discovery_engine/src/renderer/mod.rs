/// Renderer module - backend-agnostic rendering types and traits

// Module declarations
pub mod buffer;
pub mod command_list;
pub mod config;
pub mod frame;
pub mod pipeline;
pub mod registry;
pub mod uniform;
pub mod window;

#[cfg(test)]
pub mod mock_renderer;

// Re-export from modules
pub use buffer::*;
pub use command_list::*;
pub use config::*;
pub use frame::*;
pub use pipeline::*;
pub use registry::*;
pub use uniform::*;
pub use window::*;
