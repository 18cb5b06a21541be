use thiserror::Error;
use wgpu::{Backend, DownlevelFlags, Features};

/// Device limit the culling pass depends on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LimitType {
    StorageBuffersPerShaderStages,
    MaxStorageBufferBindingSize,
    MaxComputeInvocationsPerWorkgroup,
    MaxComputeWorkgroupSizeX,
    MaxComputeWorkgroupsPerDimension,
}

/// Reason why a device for the culling pass could not be created.
#[derive(Error, Debug)]
pub enum DeviceInitializationError {
    #[error("No supported adapter found")]
    MissingAdapter,
    #[error("The device limit of {:?} is {} but culling requires at least {}", ty, device_limit, required_limit)]
    LowDeviceLimit {
        ty: LimitType,
        device_limit: u64,
        required_limit: u64,
    },
    #[error("Device is missing required features: {:?}", features)]
    MissingDeviceFeatures { features: Features },
    #[error("The {:?} backend cannot run the culling shader", backend)]
    UnsupportedBackend { backend: Backend },
    #[error("Adapter is missing required downlevel capabilities: {:?}", flags)]
    MissingDownlevelFlags { flags: DownlevelFlags },
    #[error("Requesting a device failed")]
    RequestDeviceFailed(#[source] wgpu::RequestDeviceError),
}

/// Reason why the culling pipeline could not be built on a device.
#[derive(Error, Debug)]
pub enum PipelineCreationError {
    #[error("Culling pipeline failed validation: {description}")]
    Validation { description: String },
    #[error("Device ran out of memory building the culling pipeline")]
    OutOfMemory,
}

/// Reason why culling buffers could not be created for a given shape.
#[derive(Error, Debug)]
pub enum BufferCreationError {
    #[error("Object capacity must be at least 1")]
    EmptyObjectCapacity,
    #[error("Capacity {requested} does not fit in a 32 bit count")]
    CapacityOverflow { requested: usize },
    #[error("Culling {objects} objects needs {workgroups} workgroups, the device allows {limit}")]
    TooManyWorkgroups { objects: u32, workgroups: u32, limit: u32 },
    #[error("{label} needs {size} bytes, the device allows bindings of {limit} bytes")]
    BufferTooLarge { label: &'static str, size: u64, limit: u64 },
    #[error("Uploading {count} objects into a buffer sized for {capacity}")]
    TooManyObjects { count: usize, capacity: u32 },
}

/// Reason why culling results could not be read back to the CPU.
#[derive(Error, Debug)]
pub enum ReadbackError {
    #[error("Mapping the readback buffer failed")]
    MapFailed(#[source] wgpu::BufferAsyncError),
    #[error("Device dropped the map callback before it ran")]
    CallbackDropped,
}
