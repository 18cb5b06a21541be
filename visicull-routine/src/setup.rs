use std::sync::Arc;

use wgpu::{
    Adapter, AdapterInfo, Backend, Backends, Device, DeviceDescriptor, DeviceType, DownlevelFlags, Features, Instance,
    InstanceDescriptor, Limits, Queue,
};

use crate::{culler::WORKGROUP_SIZE, DeviceInitializationError, LimitType};

/// Features the culling pass cannot run without.
pub const REQUIRED_FEATURES: Features = Features::empty();

/// Features used if the adapter has them.
///
/// `MULTI_DRAW_INDIRECT_COUNT` lets the draw stage use the visible counter as
/// the draw count directly. `INDIRECT_FIRST_INSTANCE` is needed for the
/// object index in `first_instance` to reach the vertex shader.
pub const OPTIONAL_FEATURES: Features = Features::from_bits_truncate(
    Features::MULTI_DRAW_INDIRECT.bits()
        | Features::MULTI_DRAW_INDIRECT_COUNT.bits()
        | Features::INDIRECT_FIRST_INSTANCE.bits(),
);

/// Check that all required features are present in the feature set given.
pub fn check_features(device: Features) -> Result<Features, DeviceInitializationError> {
    let optional = OPTIONAL_FEATURES & device;
    let missing = REQUIRED_FEATURES - device;
    if !missing.is_empty() {
        Err(DeviceInitializationError::MissingDeviceFeatures { features: missing })
    } else {
        Ok(REQUIRED_FEATURES | optional)
    }
}

/// Downlevel capabilities the culling pass cannot run without.
pub const REQUIRED_DOWNLEVEL_FLAGS: DownlevelFlags = DownlevelFlags::COMPUTE_SHADERS;

/// Check that the adapter's backend can compile the culling shader.
///
/// The GL backend is rejected outright: its shader translation has no
/// equivalent for the result of `atomicCompareExchangeWeak`.
pub fn check_adapter(backend: Backend, downlevel: DownlevelFlags) -> Result<(), DeviceInitializationError> {
    if backend == Backend::Gl {
        return Err(DeviceInitializationError::UnsupportedBackend { backend });
    }
    let missing = REQUIRED_DOWNLEVEL_FLAGS - downlevel;
    if !missing.is_empty() {
        return Err(DeviceInitializationError::MissingDownlevelFlags { flags: missing });
    }
    Ok(())
}

fn check_limit(device_limit: u32, required_limit: u32, ty: LimitType) -> Result<u32, DeviceInitializationError> {
    if device_limit < required_limit {
        Err(DeviceInitializationError::LowDeviceLimit {
            ty,
            device_limit: device_limit as u64,
            required_limit: required_limit as u64,
        })
    } else {
        Ok(device_limit)
    }
}

/// Check that the adapter can run the culling shader, returning the limits to request.
pub fn check_limits(device_limits: &Limits) -> Result<Limits, DeviceInitializationError> {
    check_limit(
        device_limits.max_storage_buffers_per_shader_stage,
        3,
        LimitType::StorageBuffersPerShaderStages,
    )?;
    check_limit(
        device_limits.max_compute_invocations_per_workgroup,
        WORKGROUP_SIZE,
        LimitType::MaxComputeInvocationsPerWorkgroup,
    )?;
    check_limit(
        device_limits.max_compute_workgroup_size_x,
        WORKGROUP_SIZE,
        LimitType::MaxComputeWorkgroupSizeX,
    )?;
    check_limit(
        device_limits.max_compute_workgroups_per_dimension,
        1,
        LimitType::MaxComputeWorkgroupsPerDimension,
    )?;
    check_limit(
        device_limits.max_storage_buffer_binding_size,
        1 << 20,
        LimitType::MaxStorageBufferBindingSize,
    )?;

    Ok(device_limits.clone())
}

/// Container for Instance/Adapter/Device/Queue.
///
/// Create these yourself, or call [`create_iad`].
#[derive(Clone)]
pub struct InstanceAdapterDevice {
    pub instance: Arc<Instance>,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    pub info: AdapterInfo,
}

impl InstanceAdapterDevice {
    /// The visible counter can be handed to the draw stage as an indirect count.
    pub fn supports_indirect_count(&self) -> bool {
        self.device.features().contains(Features::MULTI_DRAW_INDIRECT_COUNT)
    }
}

fn device_type_rank(ty: DeviceType) -> u8 {
    match ty {
        DeviceType::DiscreteGpu => 0,
        DeviceType::IntegratedGpu => 1,
        DeviceType::VirtualGpu => 2,
        DeviceType::Cpu => 3,
        DeviceType::Other => 4,
    }
}

/// Creates an Instance/Adapter/Device/Queue using the given choices. Tries to get the best combination.
///
/// Without a desired backend, `WGPU_BACKEND` narrows the backends searched.
pub async fn create_iad(
    desired_backend: Option<Backend>,
    desired_device: Option<String>,
) -> Result<InstanceAdapterDevice, DeviceInitializationError> {
    let backends = match desired_backend {
        Some(backend) => Backends::from(backend),
        None => wgpu::util::backend_bits_from_env().unwrap_or_else(Backends::all),
    };

    let instance = Instance::new(InstanceDescriptor {
        backends,
        ..Default::default()
    });

    let desired_device = desired_device.map(|d| d.to_lowercase());

    let mut potential_adapters = Vec::new();
    for (idx, adapter) in instance.enumerate_adapters(backends).into_iter().enumerate() {
        let info = adapter.get_info();
        log::debug!("Adapter {}: {:#?}", idx, info);

        if let Some(ref desired_device) = desired_device {
            if !info.name.to_lowercase().contains(desired_device) {
                log::debug!("Skipping unwanted device {:?}", info.name);
                continue;
            }
        }

        if let Err(e) = check_adapter(info.backend, adapter.get_downlevel_capabilities().flags) {
            log::debug!("Adapter not usable: {}", e);
            continue;
        }

        let features = check_features(adapter.features());
        let limits = check_limits(&adapter.limits());
        match (features, limits) {
            (Ok(features), Ok(limits)) => {
                log::debug!("Adapter usable");
                potential_adapters.push((adapter, info, features, limits));
            }
            (Err(e), _) | (_, Err(e)) => log::debug!("Adapter not usable: {}", e),
        }
    }

    potential_adapters.sort_by_key(|(_, info, _, _)| device_type_rank(info.device_type));

    let (adapter, info, features, limits) = potential_adapters
        .into_iter()
        .next()
        .ok_or(DeviceInitializationError::MissingAdapter)?;

    log::debug!("Chosen adapter: {:#?}", info);
    log::debug!("Chosen features: {:#?}", features);
    log::debug!("Chosen limits: {:#?}", limits);

    if !features.contains(Features::INDIRECT_FIRST_INSTANCE) {
        log::warn!("Adapter lacks INDIRECT_FIRST_INSTANCE, object indices will not reach the vertex stage");
    }

    let (device, queue) = adapter
        .request_device(
            &DeviceDescriptor {
                label: Some("visicull device"),
                required_features: features,
                required_limits: limits,
            },
            None,
        )
        .await
        .map_err(DeviceInitializationError::RequestDeviceFailed)?;

    Ok(InstanceAdapterDevice {
        instance: Arc::new(instance),
        adapter: Arc::new(adapter),
        device: Arc::new(device),
        queue: Arc::new(queue),
        info,
    })
}
