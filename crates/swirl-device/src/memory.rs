//! Device memory: word-aligned buffers addressed by generational ids.
//!
//! Buffers are backed by `u32` words so any buffer can be viewed in place
//! as a slice of 4-byte-aligned [`Pod`] values (`f32`, `Cell`,
//! `SimulationConstants`). Ids are generational: a freed id never aliases
//! a later allocation, and freeing twice is reported instead of corrupting
//! the allocator.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use bytemuck::Pod;
use swirl_core::{SlotKey, SlotTable};

use crate::error::DeviceError;

/// Handle to a device buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(SlotKey);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.0.slot(), self.0.generation())
    }
}

struct Allocation {
    words: Vec<u32>,
    len: usize,
    checked_out: bool,
}

/// The memory of one compute device.
pub struct DeviceMemory {
    buffers: SlotTable<Allocation>,
    limit: usize,
    in_use: usize,
}

impl DeviceMemory {
    /// Empty device memory that refuses allocations beyond `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            buffers: SlotTable::new(),
            limit,
            in_use: 0,
        }
    }

    /// Allocate `bytes` zero-initialised bytes.
    pub fn alloc_zeroed(&mut self, bytes: usize) -> Result<BufferId, DeviceError> {
        let oom = DeviceError::OutOfMemory {
            requested: bytes,
            in_use: self.in_use,
            limit: self.limit,
        };
        match self.in_use.checked_add(bytes) {
            Some(total) if total <= self.limit => {}
            _ => return Err(oom),
        }
        let word_count = bytes.div_ceil(4);
        let mut words = Vec::new();
        if words.try_reserve_exact(word_count).is_err() {
            return Err(oom);
        }
        words.resize(word_count, 0);
        self.in_use += bytes;
        Ok(BufferId(self.buffers.insert(Allocation {
            words,
            len: bytes,
            checked_out: false,
        })))
    }

    /// Release a buffer.
    pub fn free(&mut self, buffer: BufferId) -> Result<(), DeviceError> {
        if self.buffers.get(buffer.0).is_some_and(|a| a.checked_out) {
            return Err(DeviceError::Aliased { buffer });
        }
        let alloc = self
            .buffers
            .remove(buffer.0)
            .ok_or(DeviceError::InvalidBuffer { buffer })?;
        self.in_use -= alloc.len;
        Ok(())
    }

    /// Whether `buffer` is a live allocation.
    pub fn contains(&self, buffer: BufferId) -> bool {
        self.buffers.contains(buffer.0)
    }

    /// Size of a live buffer in bytes.
    pub fn size_of(&self, buffer: BufferId) -> Result<usize, DeviceError> {
        self.buffers
            .get(buffer.0)
            .map(|a| a.len)
            .ok_or(DeviceError::InvalidBuffer { buffer })
    }

    /// Number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Bytes currently allocated.
    pub fn bytes_in_use(&self) -> usize {
        self.in_use
    }

    fn allocation(&self, buffer: BufferId) -> Result<&Allocation, DeviceError> {
        let alloc = self
            .buffers
            .get(buffer.0)
            .ok_or(DeviceError::InvalidBuffer { buffer })?;
        if alloc.checked_out {
            return Err(DeviceError::Aliased { buffer });
        }
        Ok(alloc)
    }

    fn allocation_mut(&mut self, buffer: BufferId) -> Result<&mut Allocation, DeviceError> {
        let alloc = self
            .buffers
            .get_mut(buffer.0)
            .ok_or(DeviceError::InvalidBuffer { buffer })?;
        if alloc.checked_out {
            return Err(DeviceError::Aliased { buffer });
        }
        Ok(alloc)
    }

    /// Raw contents of a buffer.
    pub fn bytes(&self, buffer: BufferId) -> Result<&[u8], DeviceError> {
        let alloc = self.allocation(buffer)?;
        Ok(&bytemuck::cast_slice::<u32, u8>(&alloc.words)[..alloc.len])
    }

    /// Mutable raw contents of a buffer.
    pub fn bytes_mut(&mut self, buffer: BufferId) -> Result<&mut [u8], DeviceError> {
        let alloc = self.allocation_mut(buffer)?;
        let len = alloc.len;
        Ok(&mut bytemuck::cast_slice_mut::<u32, u8>(&mut alloc.words)[..len])
    }

    /// View a buffer as a slice of `T`.
    pub fn view<T: Pod>(&self, buffer: BufferId) -> Result<&[T], DeviceError> {
        let bytes = self.bytes(buffer)?;
        bytemuck::try_cast_slice(bytes).map_err(|_| DeviceError::TypeMismatch {
            buffer,
            size: bytes.len(),
            elem: std::mem::size_of::<T>(),
        })
    }

    /// Copy `data` into a buffer at `offset`.
    pub fn write(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<(), DeviceError> {
        let bytes = self.bytes_mut(buffer)?;
        let size = bytes.len();
        let dst = offset
            .checked_add(data.len())
            .and_then(|end| bytes.get_mut(offset..end))
            .ok_or(DeviceError::OutOfBounds {
                buffer,
                offset,
                len: data.len(),
                size,
            })?;
        dst.copy_from_slice(data);
        Ok(())
    }

    /// Copy bytes starting at `offset` into `out`.
    pub fn read(&self, buffer: BufferId, offset: usize, out: &mut [u8]) -> Result<(), DeviceError> {
        let bytes = self.bytes(buffer)?;
        let src = offset
            .checked_add(out.len())
            .and_then(|end| bytes.get(offset..end))
            .ok_or(DeviceError::OutOfBounds {
                buffer,
                offset,
                len: out.len(),
                size: bytes.len(),
            })?;
        out.copy_from_slice(src);
        Ok(())
    }

    /// Copy the whole of `src` into `dst`; both must have the same size.
    pub fn copy(&mut self, src: BufferId, dst: BufferId) -> Result<(), DeviceError> {
        if src == dst {
            return self.allocation(src).map(|_| ());
        }
        let data = self.allocation(src)?.words.clone();
        let src_len = self.size_of(src)?;
        let target = self.allocation_mut(dst)?;
        if target.len != src_len {
            return Err(DeviceError::OutOfBounds {
                buffer: dst,
                offset: 0,
                len: src_len,
                size: target.len,
            });
        }
        target.words.copy_from_slice(&data);
        Ok(())
    }

    /// Run `f` with exclusive access to `output` while the rest of memory
    /// stays readable.
    ///
    /// `output` is checked out for the duration of the call: reading it
    /// through the shared `DeviceMemory` reports [`DeviceError::Aliased`],
    /// so a kernel cannot observe its own partial writes.
    ///
    /// The buffer is checked back in even if `f` panics; the panic then
    /// continues to unwind.
    pub fn with_output<R>(
        &mut self,
        output: BufferId,
        f: impl FnOnce(&mut [u8], &DeviceMemory) -> Result<R, DeviceError>,
    ) -> Result<R, DeviceError> {
        let alloc = self.allocation_mut(output)?;
        let mut words = std::mem::take(&mut alloc.words);
        let len = alloc.len;
        alloc.checked_out = true;

        let shared: &DeviceMemory = self;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            f(
                &mut bytemuck::cast_slice_mut::<u32, u8>(&mut words)[..len],
                shared,
            )
        }));

        if let Some(alloc) = self.buffers.get_mut(output.0) {
            alloc.words = words;
            alloc.checked_out = false;
        }
        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

impl fmt::Debug for DeviceMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceMemory")
            .field("live_buffers", &self.buffers.len())
            .field("bytes_in_use", &self.in_use)
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn allocations_are_zeroed_and_counted() {
        let mut mem = DeviceMemory::new(1024);
        let a = mem.alloc_zeroed(10).unwrap();
        assert_eq!(mem.bytes(a).unwrap(), &[0u8; 10]);
        assert_eq!(mem.bytes_in_use(), 10);
        assert_eq!(mem.live_buffers(), 1);
        mem.free(a).unwrap();
        assert_eq!(mem.bytes_in_use(), 0);
        assert_eq!(mem.live_buffers(), 0);
    }

    #[test]
    fn limit_is_enforced() {
        let mut mem = DeviceMemory::new(16);
        let _a = mem.alloc_zeroed(12).unwrap();
        assert!(matches!(
            mem.alloc_zeroed(8),
            Err(DeviceError::OutOfMemory { requested: 8, in_use: 12, limit: 16 })
        ));
    }

    #[test]
    fn double_free_is_reported() {
        let mut mem = DeviceMemory::new(64);
        let a = mem.alloc_zeroed(4).unwrap();
        mem.free(a).unwrap();
        assert_eq!(mem.free(a), Err(DeviceError::InvalidBuffer { buffer: a }));
        assert_eq!(mem.bytes_in_use(), 0);
    }

    #[test]
    fn write_and_read_respect_bounds() {
        let mut mem = DeviceMemory::new(64);
        let a = mem.alloc_zeroed(8).unwrap();
        mem.write(a, 4, &[1, 2, 3, 4]).unwrap();
        let mut out = [0u8; 8];
        mem.read(a, 0, &mut out).unwrap();
        assert_eq!(out, [0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(matches!(
            mem.write(a, 6, &[0; 4]),
            Err(DeviceError::OutOfBounds { .. })
        ));
        assert!(matches!(
            mem.read(a, usize::MAX, &mut out),
            Err(DeviceError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn view_requires_whole_elements() {
        let mut mem = DeviceMemory::new(64);
        let a = mem.alloc_zeroed(8).unwrap();
        assert_eq!(mem.view::<f32>(a).unwrap().len(), 2);
        let b = mem.alloc_zeroed(6).unwrap();
        assert!(matches!(
            mem.view::<f32>(b),
            Err(DeviceError::TypeMismatch { elem: 4, .. })
        ));
    }

    #[test]
    fn copy_requires_equal_sizes() {
        let mut mem = DeviceMemory::new(64);
        let a = mem.alloc_zeroed(4).unwrap();
        let b = mem.alloc_zeroed(4).unwrap();
        let c = mem.alloc_zeroed(8).unwrap();
        mem.write(a, 0, &[9, 8, 7, 6]).unwrap();
        mem.copy(a, b).unwrap();
        assert_eq!(mem.bytes(b).unwrap(), &[9, 8, 7, 6]);
        assert!(mem.copy(a, c).is_err());
    }

    #[test]
    fn output_is_hidden_while_checked_out() {
        let mut mem = DeviceMemory::new(64);
        let src = mem.alloc_zeroed(4).unwrap();
        let dst = mem.alloc_zeroed(4).unwrap();
        mem.write(src, 0, &[5, 5, 5, 5]).unwrap();
        mem.with_output(dst, |out, mem| {
            assert_eq!(mem.bytes(dst), Err(DeviceError::Aliased { buffer: dst }));
            out.copy_from_slice(mem.bytes(src)?);
            Ok(())
        })
        .unwrap();
        assert_eq!(mem.bytes(dst).unwrap(), &[5, 5, 5, 5]);
    }

    #[test]
    fn output_is_restored_after_error() {
        let mut mem = DeviceMemory::new(64);
        let dst = mem.alloc_zeroed(4).unwrap();
        let r: Result<(), _> = mem.with_output(dst, |out, _| {
            out[0] = 1;
            Err(DeviceError::Lost)
        });
        assert_eq!(r, Err(DeviceError::Lost));
        assert_eq!(mem.bytes(dst).unwrap(), &[1, 0, 0, 0]);
    }

    #[test]
    fn output_is_restored_after_panic() {
        let mut mem = DeviceMemory::new(64);
        let dst = mem.alloc_zeroed(8).unwrap();
        let unwound = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), _> = mem.with_output(dst, |out, _| {
                out[0] = 2;
                panic!("writer bug");
            });
        }));
        assert!(unwound.is_err());
        assert_eq!(mem.bytes(dst).unwrap(), &[2, 0, 0, 0, 0, 0, 0, 0]);
        mem.free(dst).unwrap();
        assert_eq!(mem.live_buffers(), 0);
        assert_eq!(mem.bytes_in_use(), 0);
    }

    proptest! {
        #[test]
        fn writes_within_bounds_read_back(
            size in 1usize..256,
            offset in 0usize..256,
            data in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let mut mem = DeviceMemory::new(1024);
            let b = mem.alloc_zeroed(size).unwrap();
            let fits = offset + data.len() <= size;
            prop_assert_eq!(mem.write(b, offset, &data).is_ok(), fits);
            if fits {
                let mut out = vec![0u8; data.len()];
                mem.read(b, offset, &mut out).unwrap();
                prop_assert_eq!(out, data);
            }
            prop_assert_eq!(mem.bytes_in_use(), size);
        }
    }
}
