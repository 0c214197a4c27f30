//! Unit tests for vulkan_device.rs
//!
//! Device selection runs on plain capability records, no GPU needed.

use ash::vk;
use crate::vulkan_device::*;

fn capable(name: &str, anisotropy: bool) -> DeviceCandidate {
    DeviceCandidate {
        name: name.to_string(),
        queue_families: vec![(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, true)],
        supports_swapchain: true,
        surface_format_count: 2,
        present_mode_count: 1,
        sampler_anisotropy: anisotropy,
        max_sampler_anisotropy: if anisotropy { 16.0 } else { 1.0 },
    }
}

// ============================================================================
// QUEUE FAMILIES
// ============================================================================

#[test]
fn test_shared_family_preferred() {
    let families = [
        (vk::QueueFlags::GRAPHICS, false),
        (vk::QueueFlags::TRANSFER, true),
        (vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, true),
    ];

    let indices = find_queue_families(&families).unwrap();
    assert_eq!(indices, QueueFamilyIndices { graphics: 2, present: 2 });
    assert!(indices.is_shared());
    assert_eq!(indices.unique(), vec![2]);
}

#[test]
fn test_split_families() {
    let families = [
        (vk::QueueFlags::COMPUTE, true),
        (vk::QueueFlags::GRAPHICS, false),
    ];

    let indices = find_queue_families(&families).unwrap();
    assert_eq!(indices, QueueFamilyIndices { graphics: 1, present: 0 });
    assert!(!indices.is_shared());
    assert_eq!(indices.unique(), vec![1, 0]);
}

#[test]
fn test_missing_family() {
    assert!(find_queue_families(&[(vk::QueueFlags::GRAPHICS, false)]).is_none());
    assert!(find_queue_families(&[(vk::QueueFlags::COMPUTE, true)]).is_none());
    assert!(find_queue_families(&[]).is_none());
}

// ============================================================================
// SUITABILITY
// ============================================================================

#[test]
fn test_unsuitable_without_swapchain_or_surface_support() {
    let mut candidate = capable("gpu", true);
    assert!(candidate.is_suitable());

    candidate.supports_swapchain = false;
    assert!(!candidate.is_suitable());

    let mut candidate = capable("gpu", true);
    candidate.surface_format_count = 0;
    assert!(!candidate.is_suitable());

    let mut candidate = capable("gpu", true);
    candidate.present_mode_count = 0;
    assert_eq!(candidate.score(), None);
}

// ============================================================================
// PICKING
// ============================================================================

#[test]
fn test_pick_prefers_anisotropy() {
    let candidates = [capable("basic", false), capable("aniso", true)];
    assert_eq!(pick_device(&candidates), Some(1));
}

#[test]
fn test_pick_first_on_tie() {
    let candidates = [capable("a", true), capable("b", true)];
    assert_eq!(pick_device(&candidates), Some(0));
}

#[test]
fn test_pick_skips_unsuitable() {
    let mut broken = capable("broken", true);
    broken.supports_swapchain = false;
    let candidates = [broken, capable("plain", false)];

    assert_eq!(pick_device(&candidates), Some(1));
}

#[test]
fn test_pick_none() {
    let mut broken = capable("broken", true);
    broken.queue_families.clear();

    assert_eq!(pick_device(&[broken]), None);
    assert_eq!(pick_device(&[]), None);
}

#[test]
fn test_device_failing_query_is_skipped() {
    let results = vec![
        ("lost", Err(discovery_engine::discovery::Error::BackendError("DEVICE_LOST".to_string()))),
        ("discrete", Ok(capable("discrete", true))),
    ];

    let devices = queryable_devices(results);

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].0, "discrete");
    let candidates: Vec<_> = devices.into_iter().map(|(_, c)| c).collect();
    assert_eq!(pick_device(&candidates), Some(0));
}

#[test]
fn test_all_queries_failing_leaves_no_candidate() {
    let results = vec![(0u32, Err(discovery_engine::discovery::Error::OutOfMemory))];

    assert!(queryable_devices(results).is_empty());
}
