//! Unit tests for config.rs

use crate::renderer::config::*;
use crate::renderer::command_list::ClearValue;

#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert_eq!(config.enable_validation, cfg!(debug_assertions));
    assert_eq!(config.app_name, "Discovery");
    assert_eq!(config.debug_severity, DebugSeverity::ErrorsAndWarnings);
    assert_eq!(config.debug_output, DebugOutput::Console);
    assert!(!config.panic_on_error);
    assert!(!config.break_on_validation_error);
    assert_eq!(config.clear_color, [0.11, 0.12, 0.15, 1.0]);
}

#[test]
fn test_message_filter_keeps_everything_by_default() {
    let filter = DebugMessageFilter::default();
    assert!(filter.show_general && filter.show_validation && filter.show_performance);
}

#[test]
fn test_validation_stats_total() {
    let stats = ValidationStats { errors: 2, warnings: 3, info: 0, verbose: 5 };
    assert_eq!(stats.total(), 10);
    assert_eq!(ValidationStats::default().total(), 0);
}

#[test]
fn test_config_override() {
    let config = Config {
        debug_output: DebugOutput::Both("validation.log".to_string()),
        ..Config::default()
    };
    assert_eq!(config.debug_output, DebugOutput::Both("validation.log".to_string()));
    assert_eq!(config.app_version, (1, 0, 0));
}

#[test]
fn test_recorder_config_defaults() {
    let config = RecorderConfig::default();
    assert!(!config.one_time_submit);
    assert_eq!(config.level, CommandBufferLevel::Primary);
    assert_eq!(config.clear_values.len(), 2);
    assert!(matches!(config.clear_values[0], ClearValue::Color(c) if c == [0.11, 0.12, 0.15, 1.0]));
    assert!(matches!(
        config.clear_values[1],
        ClearValue::DepthStencil { depth, stencil: 0 } if depth == 1.0
    ));
}
