//! A synchronous device for deterministic tests.

use swirl_device::{BufferId, ComputeDevice, DeviceError, DeviceMemory, Kernel};

/// Executes every kernel inside `launch`, on the calling thread.
///
/// Execution faults are still reported through the sticky-fault protocol:
/// `launch` succeeds, and the fault comes back from the next `last_error`
/// or `synchronize`. Kernels launched while a fault is pending are skipped.
pub struct InlineDevice {
    memory: DeviceMemory,
    fault: Option<DeviceError>,
}

impl InlineDevice {
    pub fn new(memory_limit: usize) -> Self {
        Self {
            memory: DeviceMemory::new(memory_limit),
            fault: None,
        }
    }

    /// Direct access to device memory.
    pub fn memory(&self) -> &DeviceMemory {
        &self.memory
    }
}

impl ComputeDevice for InlineDevice {
    fn name(&self) -> &str {
        "inline"
    }

    fn alloc_zeroed(&mut self, bytes: usize) -> Result<BufferId, DeviceError> {
        self.memory.alloc_zeroed(bytes)
    }

    fn free(&mut self, buffer: BufferId) -> Result<(), DeviceError> {
        self.memory.free(buffer)
    }

    fn upload(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<(), DeviceError> {
        self.memory.write(buffer, offset, data)
    }

    fn download(
        &mut self,
        buffer: BufferId,
        offset: usize,
        out: &mut [u8],
    ) -> Result<(), DeviceError> {
        self.memory.read(buffer, offset, out)
    }

    fn copy(&mut self, src: BufferId, dst: BufferId) -> Result<(), DeviceError> {
        self.memory.copy(src, dst)
    }

    fn launch(&mut self, kernel: Box<dyn Kernel>) -> Result<(), DeviceError> {
        if let Some(unbound) = kernel.bindings().into_iter().find(|b| !self.memory.contains(*b)) {
            return Err(DeviceError::LaunchFailed {
                kernel: kernel.name(),
                reason: format!("binding {unbound} is not a live buffer"),
            });
        }
        if self.fault.is_none() {
            if let Err(e) = kernel.run(&mut self.memory) {
                self.fault = Some(e);
            }
        }
        Ok(())
    }

    fn last_error(&mut self) -> Result<(), DeviceError> {
        self.fault.take().map_or(Ok(()), Err)
    }

    fn synchronize(&mut self) -> Result<(), DeviceError> {
        self.last_error()
    }
}
