//! GPU buffer management.

use wgpu::util::DeviceExt;

use crate::backend::BufferUsage;

impl BufferUsage {
    pub fn to_wgpu(self) -> wgpu::BufferUsages {
        match self {
            Self::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            Self::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        }
    }
}

/// Creates a buffer initialized with `contents`.
pub fn create_buffer(
    device: &wgpu::Device,
    contents: &[u8],
    usage: BufferUsage,
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents,
        usage: usage.to_wgpu(),
    })
}

/// Updates a buffer with new data.
pub fn update_buffer(queue: &wgpu::Queue, buffer: &wgpu::Buffer, data: &[u8]) {
    queue.write_buffer(buffer, 0, data);
}
