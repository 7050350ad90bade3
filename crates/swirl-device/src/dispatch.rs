//! Status-checked access to a compute device.
//!
//! Every [`Dispatcher`] method checks the status of the underlying device
//! call and, on failure, returns a [`DeviceFault`] naming the call and the
//! source location of the *caller*. Kernel launches are followed by the
//! configured [`SyncStrategy`].

use std::panic::Location;

use crate::device::ComputeDevice;
use crate::error::{DeviceError, DeviceFault};
use crate::kernel::Kernel;
use crate::memory::BufferId;
use crate::sync::{SyncMode, SyncStrategy};

/// A compute device plus the fault-detection discipline applied to it.
pub struct Dispatcher {
    device: Box<dyn ComputeDevice>,
    strategy: Box<dyn SyncStrategy>,
    dispatches: u64,
}

#[track_caller]
fn check<T>(call: &'static str, result: Result<T, DeviceError>) -> Result<T, DeviceFault> {
    let site = Location::caller();
    result.map_err(|e| DeviceFault::new(call, site, e))
}

impl Dispatcher {
    /// Wrap `device` with the strategy for `mode`.
    pub fn new(device: Box<dyn ComputeDevice>, mode: SyncMode) -> Self {
        Self::with_strategy(device, mode.strategy())
    }

    /// Wrap `device` with a custom strategy.
    pub fn with_strategy(device: Box<dyn ComputeDevice>, strategy: Box<dyn SyncStrategy>) -> Self {
        tracing::debug!(device = device.name(), mode = %strategy.mode(), "dispatcher ready");
        Self {
            device,
            strategy,
            dispatches: 0,
        }
    }

    /// Active synchronization mode.
    pub fn mode(&self) -> SyncMode {
        self.strategy.mode()
    }

    /// Name of the wrapped device.
    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    /// Kernels dispatched so far.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches
    }

    /// Allocate a zeroed buffer.
    #[track_caller]
    pub fn alloc_zeroed(&mut self, bytes: usize) -> Result<BufferId, DeviceFault> {
        check("alloc", self.device.alloc_zeroed(bytes))
    }

    /// Release a buffer.
    #[track_caller]
    pub fn free(&mut self, buffer: BufferId) -> Result<(), DeviceFault> {
        check("free", self.device.free(buffer))
    }

    /// Host-to-device copy.
    #[track_caller]
    pub fn upload(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<(), DeviceFault> {
        check("upload", self.device.upload(buffer, offset, data))
    }

    /// Device-to-host copy.
    #[track_caller]
    pub fn download(
        &mut self,
        buffer: BufferId,
        offset: usize,
        out: &mut [u8],
    ) -> Result<(), DeviceFault> {
        check("download", self.device.download(buffer, offset, out))
    }

    /// Device-to-device copy.
    #[track_caller]
    pub fn copy(&mut self, src: BufferId, dst: BufferId) -> Result<(), DeviceFault> {
        check("copy", self.device.copy(src, dst))
    }

    /// Enqueue a kernel, then apply the sync strategy.
    #[track_caller]
    pub fn launch(&mut self, kernel: Box<dyn Kernel>) -> Result<(), DeviceFault> {
        let name = kernel.name();
        check("launch", self.device.launch(kernel))?;
        self.dispatches += 1;
        tracing::trace!(kernel = name, dispatch = self.dispatches, "kernel dispatched");
        check("sync", self.strategy.after_dispatch(self.device.as_mut()))
    }

    /// Wait for the device to go idle and report any pending fault.
    #[track_caller]
    pub fn barrier(&mut self) -> Result<(), DeviceFault> {
        check("synchronize", self.device.synchronize())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("device", &self.device.name())
            .field("mode", &self.strategy.mode())
            .field("dispatches", &self.dispatches)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostDevice, HostDeviceConfig};
    use crate::memory::DeviceMemory;
    use std::time::Duration;

    struct LateFault;

    impl Kernel for LateFault {
        fn name(&self) -> &'static str {
            "late_fault"
        }
        fn bindings(&self) -> Vec<BufferId> {
            Vec::new()
        }
        fn run(&self, _memory: &mut DeviceMemory) -> Result<(), DeviceError> {
            std::thread::sleep(Duration::from_millis(50));
            Err(DeviceError::KernelFault {
                kernel: "late_fault",
                reason: "misaligned access".into(),
            })
        }
    }

    fn dispatcher(mode: SyncMode) -> Dispatcher {
        let device = HostDevice::new(HostDeviceConfig {
            worker_threads: Some(1),
            memory_limit: 1 << 16,
        })
        .unwrap();
        Dispatcher::new(Box::new(device), mode)
    }

    #[test]
    fn strict_mode_reports_fault_at_dispatch() {
        let mut d = dispatcher(SyncMode::Strict);
        let fault = d.launch(Box::new(LateFault)).unwrap_err();
        assert_eq!(fault.call, "sync");
        assert!(fault.file.ends_with("dispatch.rs"));
        assert!(matches!(fault.source, DeviceError::KernelFault { kernel: "late_fault", .. }));
    }

    #[test]
    fn deferred_mode_reports_fault_at_barrier() {
        let mut d = dispatcher(SyncMode::Deferred);
        d.launch(Box::new(LateFault)).unwrap();
        assert_eq!(d.dispatch_count(), 1);
        let fault = d.barrier().unwrap_err();
        assert_eq!(fault.call, "synchronize");
        assert!(matches!(fault.source, DeviceError::KernelFault { .. }));
    }

    #[test]
    fn fault_records_caller_line() {
        let mut d = dispatcher(SyncMode::Deferred);
        let line = line!() + 1;
        let fault = d.alloc_zeroed(1 << 20).unwrap_err();
        assert_eq!(fault.line, line);
        assert_eq!(fault.call, "alloc");
    }
}
