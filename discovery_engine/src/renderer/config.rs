/// Renderer configuration

use crate::renderer::command_list::ClearValue;

/// Which validation messages are forwarded to the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Errors only
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything, including info and verbose
    All,
}

/// Where validation messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    /// Logger only
    Console,
    /// Append to a file only
    File(String),
    /// Logger and file
    Both(String),
}

/// Validation message categories to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Counters of validation messages received so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    /// Sum of all counters
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// Device context configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Request the validation layer (only honoured with the `vulkan-validation` feature)
    pub enable_validation: bool,
    /// Application name reported to the driver
    pub app_name: String,
    /// Application version reported to the driver
    pub app_version: (u32, u32, u32),
    /// Minimum severity of forwarded validation messages
    pub debug_severity: DebugSeverity,
    /// Destination of validation messages
    pub debug_output: DebugOutput,
    /// Message categories to keep
    pub debug_message_filter: DebugMessageFilter,
    /// Abort the process on a validation error (debugger break point)
    pub break_on_validation_error: bool,
    /// Panic on a validation error
    pub panic_on_error: bool,
    /// Count validation messages in `ValidationStats`
    pub enable_validation_stats: bool,
    /// Color attachment clear value
    pub clear_color: [f32; 4],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Discovery".to_string(),
            app_version: (1, 0, 0),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            debug_message_filter: DebugMessageFilter::default(),
            break_on_validation_error: false,
            panic_on_error: false,
            enable_validation_stats: false,
            clear_color: [0.11, 0.12, 0.15, 1.0],
        }
    }
}

/// Command buffer level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferLevel {
    /// Submitted directly to a queue
    Primary,
    /// Executed from a primary buffer
    Secondary,
}

/// Command recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Record with the one-time-submit usage flag (buffers are re-recorded each frame)
    pub one_time_submit: bool,
    /// Level of the allocated command buffers
    pub level: CommandBufferLevel,
    /// Clear values for the color and depth attachments, in attachment order
    pub clear_values: Vec<ClearValue>,
}

impl RecorderConfig {
    /// Default recorder configuration clearing color to `clear_color`
    pub fn with_clear_color(clear_color: [f32; 4]) -> Self {
        Self {
            one_time_submit: false,
            level: CommandBufferLevel::Primary,
            clear_values: vec![
                ClearValue::Color(clear_color),
                ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
            ],
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self::with_clear_color(Config::default().clear_color)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
