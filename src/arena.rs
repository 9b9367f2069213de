//! GPU geometry arena
//!
//! Mesh data, indirect draw commands, the material table and the uniform
//! blocks all live in one large device buffer carved by a bump allocator.
//! Regions are never freed; running out of space is fatal at load time.

use crate::error::{ViewerError, ViewerResult};
use std::sync::Arc;

/// Default arena capacity (128 MiB)
pub const DEFAULT_ARENA_CAPACITY: u64 = 128 * 1024 * 1024;

/// A region of the arena buffer
#[derive(Clone, Debug)]
pub struct SubBuffer {
    buffer: Arc<wgpu::Buffer>,
    offset: u64,
    size: u64,
}

impl SubBuffer {
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bind group binding covering exactly this region
    pub fn binding(&self) -> wgpu::BindingResource {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: self.offset,
            size: wgpu::BufferSize::new(self.size),
        })
    }

    /// Buffer slice covering exactly this region, for vertex/index bindings
    pub fn slice(&self) -> wgpu::BufferSlice {
        self.buffer.slice(self.offset..self.offset + self.size)
    }

    /// Scoped write of one POD value at the start of this region
    pub fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, value: &T) {
        self.write_slice(queue, std::slice::from_ref(value));
    }

    /// Scoped write of a POD slice at the start of this region.
    ///
    /// The staging view lives only for the duration of the copy; the data
    /// reaches the buffer with the next queue submission.
    pub fn write_slice<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, data: &[T]) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        debug_assert!(
            bytes.len() as u64 <= self.size,
            "write of {} bytes into a {} byte region",
            bytes.len(),
            self.size
        );
        debug_assert_eq!(bytes.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT, 0);

        let Some(size) = wgpu::BufferSize::new(bytes.len() as u64) else {
            return;
        };
        if let Some(mut view) = queue.write_buffer_with(&self.buffer, self.offset, size) {
            view.copy_from_slice(bytes);
        }
    }
}

/// Offset bookkeeping for the bump allocator, kept apart from the device
/// buffer so the carving logic can be exercised without a GPU.
#[derive(Debug)]
struct BumpState {
    capacity: u64,
    cursor: u64,
}

impl BumpState {
    fn new(capacity: u64) -> Self {
        Self {
            capacity,
            cursor: 0,
        }
    }

    fn allocate(&mut self, size: u64, alignment: u64) -> ViewerResult<u64> {
        if size == 0 {
            // An empty region would bind as "offset to end of buffer".
            return Err(ViewerError::ZeroSizeAllocation);
        }
        if alignment > 1 && !alignment.is_power_of_two() {
            return Err(ViewerError::InvalidAlignment(alignment));
        }

        let offset = if alignment > 1 {
            align_up(self.cursor, alignment)
        } else {
            self.cursor
        };

        let end = offset.saturating_add(size);
        if end > self.capacity {
            return Err(ViewerError::ArenaExhausted {
                requested: size,
                remaining: self.capacity - self.cursor,
            });
        }

        self.cursor = end;
        Ok(offset)
    }
}

fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

/// Bump allocator over a single device buffer
pub struct GpuArena {
    buffer: Arc<wgpu::Buffer>,
    state: BumpState,
    uniform_alignment: u64,
    storage_alignment: u64,
}

impl GpuArena {
    pub fn new(device: &wgpu::Device, capacity: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Geometry Arena"),
            size: capacity,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::INDEX
                | wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::UNIFORM
                | wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let limits = device.limits();
        Self {
            buffer: Arc::new(buffer),
            state: BumpState::new(capacity),
            uniform_alignment: limits.min_uniform_buffer_offset_alignment as u64,
            storage_alignment: limits.min_storage_buffer_offset_alignment as u64,
        }
    }

    /// Carve a region of `size` bytes. Alignment 0 or 1 means packed;
    /// anything else must be a power of two. Offsets are kept 4 byte
    /// aligned regardless so queue copies stay legal.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> ViewerResult<SubBuffer> {
        let alignment = alignment.max(wgpu::COPY_BUFFER_ALIGNMENT);
        let offset = self.state.allocate(size, alignment)?;
        Ok(SubBuffer {
            buffer: Arc::clone(&self.buffer),
            offset,
            size,
        })
    }

    /// Region aligned for binding as a uniform block
    pub fn allocate_uniform(&mut self, size: u64) -> ViewerResult<SubBuffer> {
        self.allocate(size, self.uniform_alignment)
    }

    /// Region aligned for binding as a storage block
    pub fn allocate_storage(&mut self, size: u64) -> ViewerResult<SubBuffer> {
        self.allocate(size, self.storage_alignment)
    }

    pub fn used(&self) -> u64 {
        self.state.cursor
    }

    pub fn capacity(&self) -> u64 {
        self.state.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(255, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
        assert_eq!(align_up(100, 4), 100);
        assert_eq!(align_up(101, 4), 104);
    }

    #[test]
    fn test_sequential_allocations() {
        let mut state = BumpState::new(1024);
        let a = state.allocate(100, 1).unwrap();
        let b = state.allocate(100, 1).unwrap();
        let c = state.allocate(100, 1).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 100);
        assert_eq!(c, 200);
    }

    #[test]
    fn test_alignment_respected() {
        let mut state = BumpState::new(4096);
        state.allocate(10, 1).unwrap();
        let aligned = state.allocate(64, 256).unwrap();
        assert_eq!(aligned, 256);
        assert_eq!(aligned % 256, 0);
    }

    #[test]
    fn test_zero_and_one_alignment_pack() {
        let mut state = BumpState::new(1024);
        state.allocate(3, 0).unwrap();
        let b = state.allocate(5, 0).unwrap();
        assert_eq!(b, 3);
        let c = state.allocate(7, 1).unwrap();
        assert_eq!(c, 8);
    }

    #[test]
    fn test_exhaustion_reports_remaining() {
        let mut state = BumpState::new(256);
        state.allocate(200, 1).unwrap();
        match state.allocate(100, 1) {
            Err(ViewerError::ArenaExhausted {
                requested,
                remaining,
            }) => {
                assert_eq!(requested, 100);
                assert_eq!(remaining, 56);
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_fit() {
        let mut state = BumpState::new(256);
        assert!(state.allocate(256, 1).is_ok());
        assert!(state.allocate(1, 1).is_err());
    }

    #[test]
    fn test_invalid_alignment() {
        let mut state = BumpState::new(1024);
        match state.allocate(16, 3) {
            Err(ViewerError::InvalidAlignment(3)) => {}
            other => panic!("expected invalid alignment, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_size_rejected() {
        let mut state = BumpState::new(1024);
        assert!(matches!(
            state.allocate(0, 1),
            Err(ViewerError::ZeroSizeAllocation)
        ));
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn test_alignment_padding_not_reusable() {
        // Padding skipped for alignment stays dead; later packed
        // allocations start after the aligned region.
        let mut state = BumpState::new(4096);
        state.allocate(10, 1).unwrap();
        let aligned = state.allocate(32, 1024).unwrap();
        assert_eq!(aligned, 1024);
        let next = state.allocate(8, 1).unwrap();
        assert_eq!(next, 1056);
    }

    #[test]
    fn test_regions_never_overlap() {
        let mut state = BumpState::new(1 << 20);
        let sizes = [100u64, 7, 4096, 1, 333, 256];
        let alignments = [1u64, 256, 4, 16, 1, 64];
        let mut regions = Vec::new();
        for (&size, &alignment) in sizes.iter().zip(alignments.iter()) {
            let offset = state.allocate(size, alignment).unwrap();
            regions.push((offset, size));
        }
        for (i, &(offset_a, size_a)) in regions.iter().enumerate() {
            assert!(offset_a + size_a <= 1 << 20);
            for &(offset_b, size_b) in regions.iter().skip(i + 1) {
                assert!(
                    offset_a + size_a <= offset_b || offset_b + size_b <= offset_a,
                    "regions overlap: ({}, {}) and ({}, {})",
                    offset_a,
                    size_a,
                    offset_b,
                    size_b
                );
            }
        }
    }
}
