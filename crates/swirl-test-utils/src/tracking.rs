//! Allocation tracking and fault injection around a real device.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use swirl_device::{BufferId, ComputeDevice, DeviceError, DeviceMemory, Kernel};

#[derive(Default)]
struct LedgerState {
    live: HashMap<BufferId, usize>,
    allocs: u64,
    frees: u64,
    failed_frees: u64,
    peak_live: usize,
    launches: u64,
    syncs: u64,
}

/// Shared record of everything a [`TrackingDevice`] did.
///
/// Clone the `Arc` before boxing the device into a pipeline, then inspect
/// the ledger after cleanup.
#[derive(Default)]
pub struct DeviceLedger {
    state: Mutex<LedgerState>,
}

impl DeviceLedger {
    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // A test that panicked mid-update still leaves readable counters.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Buffers allocated and not yet freed.
    pub fn live_buffers(&self) -> usize {
        self.lock().live.len()
    }

    /// Bytes allocated and not yet freed.
    pub fn live_bytes(&self) -> usize {
        self.lock().live.values().sum()
    }

    /// Successful allocations.
    pub fn allocs(&self) -> u64 {
        self.lock().allocs
    }

    /// Successful frees.
    pub fn frees(&self) -> u64 {
        self.lock().frees
    }

    /// Frees the device rejected (double free, unknown id).
    pub fn failed_frees(&self) -> u64 {
        self.lock().failed_frees
    }

    /// Largest number of simultaneously live buffers.
    pub fn peak_live(&self) -> usize {
        self.lock().peak_live
    }

    /// Kernels accepted by `launch`.
    pub fn launches(&self) -> u64 {
        self.lock().launches
    }

    /// Calls to `synchronize`.
    pub fn syncs(&self) -> u64 {
        self.lock().syncs
    }

    /// Every allocation has been freed exactly once.
    pub fn is_balanced(&self) -> bool {
        let s = self.lock();
        s.live.is_empty() && s.allocs == s.frees && s.failed_frees == 0
    }
}

impl std::fmt::Debug for DeviceLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.lock();
        f.debug_struct("DeviceLedger")
            .field("live", &s.live.len())
            .field("allocs", &s.allocs)
            .field("frees", &s.frees)
            .field("failed_frees", &s.failed_frees)
            .field("launches", &s.launches)
            .field("syncs", &s.syncs)
            .finish()
    }
}

/// Faults a [`TrackingDevice`] injects.
#[derive(Clone, Debug, Default)]
pub struct FaultPlan {
    /// Fail the allocation with this zero-based index with out-of-memory.
    pub fail_alloc_at: Option<u64>,
    /// Refuse the free with this zero-based index. The buffer stays live.
    pub fail_free_at: Option<u64>,
    /// Refuse to launch kernels with this name.
    pub fail_launch_of: Option<&'static str>,
    /// Make the launch with this zero-based index fault while executing.
    /// The fault surfaces through `last_error`/`synchronize` like a real
    /// asynchronous execution fault.
    pub fault_execution_at: Option<u64>,
}

struct Faulting {
    name: &'static str,
    bindings: Vec<BufferId>,
}

impl Kernel for Faulting {
    fn name(&self) -> &'static str {
        self.name
    }

    fn bindings(&self) -> Vec<BufferId> {
        self.bindings.clone()
    }

    fn run(&self, _memory: &mut DeviceMemory) -> Result<(), DeviceError> {
        Err(DeviceError::KernelFault {
            kernel: self.name,
            reason: "injected execution fault".into(),
        })
    }
}

/// A device wrapper that records allocations and injects faults.
pub struct TrackingDevice<D> {
    inner: D,
    ledger: Arc<DeviceLedger>,
    plan: FaultPlan,
    alloc_calls: u64,
    free_calls: u64,
    launch_calls: u64,
}

impl<D: ComputeDevice> TrackingDevice<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            ledger: Arc::new(DeviceLedger::default()),
            plan: FaultPlan::default(),
            alloc_calls: 0,
            free_calls: 0,
            launch_calls: 0,
        }
    }

    /// Inject the faults in `plan`.
    pub fn with_faults(mut self, plan: FaultPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Shared handle to the ledger.
    pub fn ledger(&self) -> Arc<DeviceLedger> {
        Arc::clone(&self.ledger)
    }
}

impl<D: ComputeDevice> ComputeDevice for TrackingDevice<D> {
    fn name(&self) -> &str {
        "tracking"
    }

    fn alloc_zeroed(&mut self, bytes: usize) -> Result<BufferId, DeviceError> {
        let call = self.alloc_calls;
        self.alloc_calls += 1;
        if self.plan.fail_alloc_at == Some(call) {
            return Err(DeviceError::OutOfMemory {
                requested: bytes,
                in_use: self.ledger.live_bytes(),
                limit: self.ledger.live_bytes(),
            });
        }
        let buffer = self.inner.alloc_zeroed(bytes)?;
        let mut s = self.ledger.lock();
        s.live.insert(buffer, bytes);
        s.allocs += 1;
        s.peak_live = s.peak_live.max(s.live.len());
        Ok(buffer)
    }

    fn free(&mut self, buffer: BufferId) -> Result<(), DeviceError> {
        let call = self.free_calls;
        self.free_calls += 1;
        let result = if self.plan.fail_free_at == Some(call) {
            Err(DeviceError::Lost)
        } else {
            self.inner.free(buffer)
        };
        let mut s = self.ledger.lock();
        match result {
            Ok(()) => {
                s.live.remove(&buffer);
                s.frees += 1;
            }
            Err(_) => s.failed_frees += 1,
        }
        result
    }

    fn upload(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<(), DeviceError> {
        self.inner.upload(buffer, offset, data)
    }

    fn download(
        &mut self,
        buffer: BufferId,
        offset: usize,
        out: &mut [u8],
    ) -> Result<(), DeviceError> {
        self.inner.download(buffer, offset, out)
    }

    fn copy(&mut self, src: BufferId, dst: BufferId) -> Result<(), DeviceError> {
        self.inner.copy(src, dst)
    }

    fn launch(&mut self, kernel: Box<dyn Kernel>) -> Result<(), DeviceError> {
        let call = self.launch_calls;
        self.launch_calls += 1;
        if self.plan.fail_launch_of == Some(kernel.name()) {
            return Err(DeviceError::LaunchFailed {
                kernel: kernel.name(),
                reason: "injected launch failure".into(),
            });
        }
        let kernel: Box<dyn Kernel> = if self.plan.fault_execution_at == Some(call) {
            Box::new(Faulting {
                name: kernel.name(),
                bindings: kernel.bindings(),
            })
        } else {
            kernel
        };
        self.inner.launch(kernel)?;
        self.ledger.lock().launches += 1;
        Ok(())
    }

    fn last_error(&mut self) -> Result<(), DeviceError> {
        self.inner.last_error()
    }

    fn synchronize(&mut self) -> Result<(), DeviceError> {
        self.ledger.lock().syncs += 1;
        self.inner.synchronize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inline::InlineDevice;

    #[test]
    fn ledger_balances_after_frees() {
        let mut dev = TrackingDevice::new(InlineDevice::new(1 << 10));
        let ledger = dev.ledger();
        let a = dev.alloc_zeroed(16).unwrap();
        let b = dev.alloc_zeroed(32).unwrap();
        assert_eq!(ledger.live_bytes(), 48);
        dev.free(a).unwrap();
        assert!(!ledger.is_balanced());
        dev.free(b).unwrap();
        assert!(ledger.is_balanced());
        assert_eq!(ledger.peak_live(), 2);
        assert!(dev.free(b).is_err());
        assert_eq!(ledger.failed_frees(), 1);
        assert!(!ledger.is_balanced());
    }

    #[test]
    fn injected_alloc_failure_hits_requested_call() {
        let mut dev = TrackingDevice::new(InlineDevice::new(1 << 10)).with_faults(FaultPlan {
            fail_alloc_at: Some(1),
            ..FaultPlan::default()
        });
        dev.alloc_zeroed(4).unwrap();
        assert!(matches!(dev.alloc_zeroed(4), Err(DeviceError::OutOfMemory { .. })));
        dev.alloc_zeroed(4).unwrap();
        assert_eq!(dev.ledger().allocs(), 2);
    }
}
