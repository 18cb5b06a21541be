use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use visicull::{
    types::{DrawCommand, ObjectRecord},
    util::{frustum::Frustum, math::round_up_div},
};
use wgpu::{Buffer, BufferAddress, BufferDescriptor, BufferUsages, Device, Limits, Queue};

use crate::{culler::WORKGROUP_SIZE, BufferCreationError};

/// Uniform block of the culling shader.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GpuCullingUniforms {
    pub planes: [Vec4; 6],
    pub object_count: u32,
    pub capacity: u32,
    pub _padding: [u32; 2],
}

impl GpuCullingUniforms {
    pub fn new(frustum: &Frustum, object_count: u32, capacity: u32) -> Self {
        Self {
            planes: frustum.planes().map(|plane| plane.to_vec4()),
            object_count,
            capacity,
            _padding: [0; 2],
        }
    }
}

/// GPU side storage for one culling pass.
///
/// `commands` and `counter` are usable as indirect buffers, so the draw stage
/// can consume them without a round trip to the CPU.
pub struct CullingBuffers {
    pub objects: Buffer,
    pub uniforms: Buffer,
    pub commands: Buffer,
    pub counter: Buffer,
    object_capacity: u32,
    command_capacity: u32,
    object_count: u32,
}

impl CullingBuffers {
    pub fn new(device: &Device, object_capacity: usize, command_capacity: usize) -> Result<Self, BufferCreationError> {
        let BufferShape {
            object_capacity,
            command_capacity,
            object_bytes,
            command_bytes,
        } = check_shape(&device.limits(), object_capacity, command_capacity)?;

        log::debug!(
            "Allocating culling buffers for {} objects and {} commands",
            object_capacity,
            command_capacity
        );

        let objects = device.create_buffer(&BufferDescriptor {
            label: Some("culling objects"),
            size: object_bytes,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniforms = device.create_buffer(&BufferDescriptor {
            label: Some("culling uniforms"),
            size: std::mem::size_of::<GpuCullingUniforms>() as BufferAddress,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let commands = device.create_buffer(&BufferDescriptor {
            label: Some("culling draw commands"),
            size: command_bytes,
            usage: BufferUsages::STORAGE | BufferUsages::INDIRECT | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let counter = device.create_buffer(&BufferDescriptor {
            label: Some("culling visible counter"),
            size: 4,
            usage: BufferUsages::STORAGE | BufferUsages::INDIRECT | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            objects,
            uniforms,
            commands,
            counter,
            object_capacity,
            command_capacity,
            object_count: 0,
        })
    }

    /// Writes the candidate objects and the frustum for the next pass.
    ///
    /// The objects' order defines the object index each command refers back to.
    pub fn upload(&mut self, queue: &Queue, objects: &[ObjectRecord], frustum: &Frustum) -> Result<(), BufferCreationError> {
        profiling::scope!("Culling Upload");

        if objects.len() > self.object_capacity as usize {
            return Err(BufferCreationError::TooManyObjects {
                count: objects.len(),
                capacity: self.object_capacity,
            });
        }
        // Checked above against a u32 capacity.
        self.object_count = objects.len() as u32;

        if !objects.is_empty() {
            queue.write_buffer(&self.objects, 0, bytemuck::cast_slice(objects));
        }
        let uniforms = GpuCullingUniforms::new(frustum, self.object_count, self.command_capacity);
        queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));

        Ok(())
    }

    pub fn object_capacity(&self) -> u32 {
        self.object_capacity
    }

    pub fn command_capacity(&self) -> u32 {
        self.command_capacity
    }

    /// Number of objects written by the last [`upload`](Self::upload).
    pub fn object_count(&self) -> u32 {
        self.object_count
    }

    /// Workgroups needed to cover the uploaded objects.
    pub fn dispatch_size(&self) -> u32 {
        dispatch_size(self.object_count)
    }
}

struct BufferShape {
    object_capacity: u32,
    command_capacity: u32,
    object_bytes: BufferAddress,
    command_bytes: BufferAddress,
}

/// Checks a buffer shape against the device limits before anything is allocated.
fn check_shape(
    limits: &Limits,
    object_capacity: usize,
    command_capacity: usize,
) -> Result<BufferShape, BufferCreationError> {
    if object_capacity == 0 {
        return Err(BufferCreationError::EmptyObjectCapacity);
    }
    let object_capacity = u32::try_from(object_capacity).map_err(|_| BufferCreationError::CapacityOverflow {
        requested: object_capacity,
    })?;
    let command_capacity = u32::try_from(command_capacity).map_err(|_| BufferCreationError::CapacityOverflow {
        requested: command_capacity,
    })?;

    let workgroups = dispatch_size(object_capacity);
    if workgroups > limits.max_compute_workgroups_per_dimension {
        return Err(BufferCreationError::TooManyWorkgroups {
            objects: object_capacity,
            workgroups,
            limit: limits.max_compute_workgroups_per_dimension,
        });
    }

    let object_bytes = object_capacity as BufferAddress * ObjectRecord::SIZE;
    // A zero sized binding is invalid, so an empty output still gets one slot.
    let command_bytes = command_capacity.max(1) as BufferAddress * DrawCommand::SIZE;
    let binding_limit = limits.max_storage_buffer_binding_size as u64;
    for (label, size) in [("object buffer", object_bytes), ("command buffer", command_bytes)] {
        if size > binding_limit {
            return Err(BufferCreationError::BufferTooLarge {
                label,
                size,
                limit: binding_limit,
            });
        }
    }

    Ok(BufferShape {
        object_capacity,
        command_capacity,
        object_bytes,
        command_bytes,
    })
}

pub(crate) fn dispatch_size(object_count: u32) -> u32 {
    round_up_div(object_count, WORKGROUP_SIZE)
}
