//! Error types for the Discovery engine
//!
//! This module defines the error type shared by the core and the Vulkan backend:
//! setup failures, resource exhaustion and backend call failures.

use std::fmt;

/// Result type for Discovery engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Discovery engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (a failed Vulkan call, a poisoned lock, ...)
    BackendError(String),

    /// Out of GPU or host memory (allocator or driver)
    OutOfMemory,

    /// Invalid resource (bad index, missing buffer, unloaded texture, ...)
    InvalidResource(String),

    /// Initialization failed (instance, device, swapchain, pipeline, descriptors)
    InitializationFailed(String),

    /// No physical device supports graphics + present + swapchain
    NoSuitableDevice,

    /// None of the depth format candidates supports optimal-tiling depth attachments
    NoSupportedDepthFormat,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::NoSuitableDevice => write!(f, "No suitable physical device found"),
            Error::NoSupportedDepthFormat => write!(f, "No supported depth format found"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
