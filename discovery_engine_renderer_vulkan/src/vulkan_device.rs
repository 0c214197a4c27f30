/// Physical device selection and logical device creation

use ash::vk;
use discovery_engine::discovery::{Error, Result};
use discovery_engine::{engine_debug, engine_error, engine_info, engine_warn};

/// Queue families used for rendering and presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    /// Whether one family serves both graphics and present
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Distinct family indices, graphics first
    pub fn unique(&self) -> Vec<u32> {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Capabilities of one physical device relevant to selection
#[derive(Debug, Clone, Default)]
pub struct DeviceCandidate {
    pub name: String,
    /// Per queue family: (queue flags, can present to the surface)
    pub queue_families: Vec<(vk::QueueFlags, bool)>,
    pub supports_swapchain: bool,
    pub surface_format_count: usize,
    pub present_mode_count: usize,
    pub sampler_anisotropy: bool,
    pub max_sampler_anisotropy: f32,
}

impl DeviceCandidate {
    /// Graphics and present families of this device, if it has both
    pub fn queue_family_indices(&self) -> Option<QueueFamilyIndices> {
        find_queue_families(&self.queue_families)
    }

    /// Graphics + present queues, the swapchain extension, and at least one
    /// surface format and present mode
    pub fn is_suitable(&self) -> bool {
        self.queue_family_indices().is_some()
            && self.supports_swapchain
            && self.surface_format_count > 0
            && self.present_mode_count > 0
    }

    /// Selection score, `None` for unsuitable devices
    pub fn score(&self) -> Option<u32> {
        if !self.is_suitable() {
            return None;
        }
        Some(if self.sampler_anisotropy { 2 } else { 1 })
    }
}

/// Find graphics and present families
///
/// A family supporting both wins; otherwise the first graphics family and the
/// first presenting family are used.
pub fn find_queue_families(families: &[(vk::QueueFlags, bool)]) -> Option<QueueFamilyIndices> {
    let shared = families
        .iter()
        .position(|(flags, present)| flags.contains(vk::QueueFlags::GRAPHICS) && *present);
    if let Some(index) = shared {
        return Some(QueueFamilyIndices { graphics: index as u32, present: index as u32 });
    }

    let graphics = families
        .iter()
        .position(|(flags, _)| flags.contains(vk::QueueFlags::GRAPHICS))?;
    let present = families.iter().position(|(_, present)| *present)?;
    Some(QueueFamilyIndices { graphics: graphics as u32, present: present as u32 })
}

/// Index of the best candidate: the first suitable device, preferring sampler anisotropy
pub fn pick_device(candidates: &[DeviceCandidate]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        if let Some(score) = candidate.score() {
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }
    }
    best.map(|(index, _)| index)
}

/// Query everything `pick_device` needs about `physical_device`
pub(crate) fn query_candidate(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> Result<DeviceCandidate> {
    unsafe {
        let properties = instance.get_physical_device_properties(physical_device);
        let features = instance.get_physical_device_features(physical_device);

        let name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let queue_families = instance
            .get_physical_device_queue_family_properties(physical_device)
            .iter()
            .enumerate()
            .map(|(index, family)| {
                let present = surface_loader
                    .get_physical_device_surface_support(physical_device, index as u32, surface)
                    .unwrap_or(false);
                (family.queue_flags, present)
            })
            .collect();

        let extensions = instance
            .enumerate_device_extension_properties(physical_device)
            .map_err(|e| {
                engine_error!("discovery::vulkan", "Failed to enumerate device extensions of {}: {:?}", name, e);
                Error::InitializationFailed(format!("Failed to enumerate device extensions: {:?}", e))
            })?;
        let supports_swapchain = extensions
            .iter()
            .any(|ext| ext.extension_name_as_c_str() == Ok(ash::khr::swapchain::NAME));

        // Surface queries only make sense with the extension present
        let (surface_format_count, present_mode_count) = if supports_swapchain {
            let formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .unwrap_or_default();
            let modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .unwrap_or_default();
            (formats.len(), modes.len())
        } else {
            (0, 0)
        };

        Ok(DeviceCandidate {
            name,
            queue_families,
            supports_swapchain,
            surface_format_count,
            present_mode_count,
            sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
            max_sampler_anisotropy: properties.limits.max_sampler_anisotropy,
        })
    }
}

/// Selected physical device
pub(crate) struct SelectedDevice {
    pub physical_device: vk::PhysicalDevice,
    pub queue_families: QueueFamilyIndices,
    pub max_anisotropy: Option<f32>,
}

/// Keep the devices whose capabilities could be queried
///
/// A device that fails to report its capabilities is logged and skipped.
pub fn queryable_devices<D>(
    results: impl IntoIterator<Item = (D, Result<DeviceCandidate>)>,
) -> Vec<(D, DeviceCandidate)> {
    results
        .into_iter()
        .enumerate()
        .filter_map(|(index, (device, result))| match result {
            Ok(candidate) => Some((device, candidate)),
            Err(e) => {
                engine_warn!("discovery::vulkan", "Skipping physical device {}: {}", index, e);
                None
            }
        })
        .collect()
}

/// Pick the physical device to render with
///
/// Fails with `Error::NoSuitableDevice` when no device qualifies.
pub(crate) fn select_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<SelectedDevice> {
    let physical_devices = unsafe {
        instance.enumerate_physical_devices().map_err(|e| {
            engine_error!("discovery::vulkan", "Failed to enumerate physical devices: {:?}", e);
            Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
        })?
    };

    let (devices, candidates): (Vec<_>, Vec<_>) = queryable_devices(
        physical_devices
            .iter()
            .map(|&pd| (pd, query_candidate(instance, surface_loader, surface, pd))),
    )
    .into_iter()
    .unzip();

    for candidate in &candidates {
        engine_debug!(
            "discovery::vulkan",
            "Device '{}': suitable={}, anisotropy={}",
            candidate.name,
            candidate.is_suitable(),
            candidate.sampler_anisotropy
        );
    }

    let index = pick_device(&candidates).ok_or_else(|| {
        engine_error!("discovery::vulkan", "No suitable GPU among {} device(s)", candidates.len());
        Error::NoSuitableDevice
    })?;

    let candidate = &candidates[index];
    let queue_families = candidate.queue_family_indices().ok_or(Error::NoSuitableDevice)?;
    engine_info!(
        "discovery::vulkan",
        "Selected GPU '{}' (graphics family {}, present family {})",
        candidate.name,
        queue_families.graphics,
        queue_families.present
    );

    Ok(SelectedDevice {
        physical_device: devices[index],
        queue_families,
        max_anisotropy: candidate
            .sampler_anisotropy
            .then_some(candidate.max_sampler_anisotropy),
    })
}

/// Create the logical device with one queue per distinct family
///
/// Sampler anisotropy is enabled only when the device supports it.
pub(crate) fn create_logical_device(
    instance: &ash::Instance,
    selected: &SelectedDevice,
) -> Result<ash::Device> {
    let queue_priorities = [1.0];
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = selected
        .queue_families
        .unique()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&queue_priorities)
        })
        .collect();

    let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

    let device_features = vk::PhysicalDeviceFeatures::default()
        .sampler_anisotropy(selected.max_anisotropy.is_some());

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&device_extension_names)
        .enabled_features(&device_features);

    unsafe {
        instance
            .create_device(selected.physical_device, &device_create_info, None)
            .map_err(|e| {
                engine_error!("discovery::vulkan", "Failed to create logical device: {:?}", e);
                Error::InitializationFailed(format!("Failed to create device: {:?}", e))
            })
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
