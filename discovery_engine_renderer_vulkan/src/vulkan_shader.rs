/// Shader modules loaded from SPIR-V, with binding reflection

use ash::vk;
use std::ffi::CString;
use std::sync::Arc;
use discovery_engine::discovery::render::{
    BindingDeclaration, ShaderSource, ShaderStage, ShaderStageDesc, ShaderStageFlags,
};
use discovery_engine::discovery::{Error, Result};
use discovery_engine::{engine_debug, engine_err, engine_error, engine_warn};

use crate::vulkan_context::GpuContext;

/// Convert a shader stage to its Vulkan stage bit
pub fn stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    match stage {
        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
    }
}

/// Convert a stage mask to Vulkan stage flags
pub fn stage_flags_to_vk(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stages.contains(ShaderStageFlags::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stages.contains(ShaderStageFlags::FRAGMENT) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    flags
}

/// (set, binding) pairs of every descriptor the module's entry points use
pub fn reflect_bindings(words: &[u32]) -> Result<Vec<(u32, u32)>> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(words)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| engine_err!("discovery::vulkan", "SPIR-V reflection failed: {:?}", e))?;

    let mut bindings = Vec::new();
    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            if let spirq::var::Variable::Descriptor { desc_bind, .. } = var {
                let pair = (desc_bind.set(), desc_bind.bind());
                if !bindings.contains(&pair) {
                    bindings.push(pair);
                }
            }
        }
    }
    bindings.sort_unstable();
    Ok(bindings)
}

/// Reflected (set, binding) pairs missing from `declarations`
pub fn undeclared_bindings(
    reflected: &[(u32, u32)],
    declarations: &[BindingDeclaration],
) -> Vec<(u32, u32)> {
    reflected
        .iter()
        .copied()
        .filter(|&(set, binding)| {
            !declarations.iter().any(|d| d.set == set && d.binding == binding)
        })
        .collect()
}

/// SPIR-V words of a stage source
fn load_words(source: &ShaderSource) -> Result<Vec<u32>> {
    match source {
        ShaderSource::Spirv(words) => Ok(words.clone()),
        ShaderSource::Path(path) => {
            let mut file = std::fs::File::open(path).map_err(|e| {
                engine_error!("discovery::vulkan", "Failed to open shader {}: {}", path.display(), e);
                Error::InvalidResource(format!("Failed to open shader {}: {}", path.display(), e))
            })?;
            ash::util::read_spv(&mut file).map_err(|e| {
                engine_error!("discovery::vulkan", "Invalid SPIR-V in {}: {}", path.display(), e);
                Error::InvalidResource(format!("Invalid SPIR-V in {}: {}", path.display(), e))
            })
        }
    }
}

/// Compiled shader stage, kept for the lifetime of its pipeline
pub struct ShaderModule {
    ctx: Arc<GpuContext>,
    module: vk::ShaderModule,
    stage: ShaderStage,
    entry_point: CString,
    /// Reflected (set, binding) pairs, empty when reflection failed
    bindings: Vec<(u32, u32)>,
}

impl ShaderModule {
    /// Load and compile one stage
    pub fn load(ctx: Arc<GpuContext>, desc: &ShaderStageDesc) -> Result<Self> {
        let entry_point = CString::new(desc.entry_point.as_str()).map_err(|_| {
            engine_error!("discovery::vulkan", "Entry point {:?} contains a NUL byte", desc.entry_point);
            Error::InvalidResource(format!("invalid entry point {:?}", desc.entry_point))
        })?;

        let words = load_words(&desc.source)?;

        let bindings = reflect_bindings(&words).unwrap_or_else(|e| {
            engine_warn!("discovery::vulkan", "Skipping binding checks for {:?} shader: {}", desc.stage, e);
            Vec::new()
        });

        let create_info = vk::ShaderModuleCreateInfo::default().code(&words);
        let module = unsafe {
            ctx.device
                .create_shader_module(&create_info, None)
                .map_err(|e| engine_err!("discovery::vulkan", "Failed to create shader module: {:?}", e))?
        };

        engine_debug!(
            "discovery::vulkan",
            "Loaded {:?} shader ({} words, {} bindings)",
            desc.stage,
            words.len(),
            bindings.len()
        );

        Ok(Self {
            ctx,
            module,
            stage: desc.stage,
            entry_point,
            bindings,
        })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Reflected (set, binding) pairs
    pub fn bindings(&self) -> &[(u32, u32)] {
        &self.bindings
    }

    /// Stage create info borrowing this module's entry point
    pub fn stage_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(stage_to_vk(self.stage))
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe { self.ctx.device.destroy_shader_module(self.module, None); }
    }
}

#[cfg(test)]
#[path = "vulkan_shader_tests.rs"]
mod tests;
