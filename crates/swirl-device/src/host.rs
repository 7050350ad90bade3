//! Host-backed compute device with an asynchronous launch queue.
//!
//! [`HostDevice`] emulates a discrete accelerator on the CPU. Launches are
//! pushed onto an unbounded crossbeam channel and executed in order by a
//! dedicated queue thread, which runs each kernel inside a private rayon
//! pool so kernels can spread per-cell work across every worker. The host
//! thread only blocks when it synchronizes or transfers memory.
//!
//! Execution errors and kernel panics are recorded as a sticky fault that
//! the next [`last_error`](ComputeDevice::last_error) or
//! [`synchronize`](ComputeDevice::synchronize) reports; until then, later
//! kernels are skipped rather than run against suspect state.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::device::ComputeDevice;
use crate::error::DeviceError;
use crate::kernel::Kernel;
use crate::memory::{BufferId, DeviceMemory};

/// Configuration for [`HostDevice::new`].
#[derive(Clone, Debug)]
pub struct HostDeviceConfig {
    /// Worker threads in the kernel pool. `None` = rayon's default (one
    /// per logical CPU).
    pub worker_threads: Option<usize>,
    /// Device memory limit in bytes. Default: 2 GiB.
    pub memory_limit: usize,
}

impl Default for HostDeviceConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            memory_limit: 2 << 30,
        }
    }
}

enum QueueOp {
    Launch(Box<dyn Kernel>),
    Fence(Sender<()>),
}

struct Shared {
    memory: Mutex<DeviceMemory>,
    fault: Mutex<Option<DeviceError>>,
}

impl Shared {
    fn record_fault(&self, error: DeviceError) {
        if let Ok(mut slot) = self.fault.lock() {
            // Keep the first fault: later ones are usually consequences.
            slot.get_or_insert(error);
        }
    }

    fn has_fault(&self) -> bool {
        self.fault.lock().map(|f| f.is_some()).unwrap_or(true)
    }

    fn take_fault(&self) -> Result<(), DeviceError> {
        match self.fault.lock() {
            Ok(mut slot) => slot.take().map_or(Ok(()), Err),
            Err(_) => Err(DeviceError::Lost),
        }
    }
}

/// CPU-emulated compute device with an asynchronous in-order queue.
pub struct HostDevice {
    shared: Arc<Shared>,
    queue: Option<Sender<QueueOp>>,
    worker: Option<JoinHandle<()>>,
}

impl HostDevice {
    /// Bring up the device: build the kernel pool and spawn the queue thread.
    pub fn new(config: HostDeviceConfig) -> Result<Self, DeviceError> {
        let mut pool = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("swirl-device-worker-{i}"));
        if let Some(n) = config.worker_threads {
            pool = pool.num_threads(n);
        }
        let pool = pool.build().map_err(|e| DeviceError::InitFailed {
            reason: e.to_string(),
        })?;

        let shared = Arc::new(Shared {
            memory: Mutex::new(DeviceMemory::new(config.memory_limit)),
            fault: Mutex::new(None),
        });
        let (tx, rx) = crossbeam_channel::unbounded();
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("swirl-device-queue".into())
            .spawn(move || run_queue(rx, worker_shared, pool))
            .map_err(|e| DeviceError::InitFailed {
                reason: format!("queue thread: {e}"),
            })?;

        tracing::debug!(
            memory_limit = config.memory_limit,
            worker_threads = ?config.worker_threads,
            "host device up"
        );
        Ok(Self {
            shared,
            queue: Some(tx),
            worker: Some(worker),
        })
    }

    fn memory(&self) -> Result<MutexGuard<'_, DeviceMemory>, DeviceError> {
        self.shared.memory.lock().map_err(|_| DeviceError::Lost)
    }

    /// Wait for every queued operation to finish, without consuming faults.
    fn drain(&self) -> Result<(), DeviceError> {
        let queue = self.queue.as_ref().ok_or(DeviceError::Lost)?;
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        queue
            .send(QueueOp::Fence(done_tx))
            .map_err(|_| DeviceError::Lost)?;
        done_rx.recv().map_err(|_| DeviceError::Lost)
    }

    /// Bytes currently allocated on the device.
    pub fn bytes_in_use(&self) -> usize {
        self.memory().map(|m| m.bytes_in_use()).unwrap_or(0)
    }

    /// Number of live device buffers.
    pub fn live_buffers(&self) -> usize {
        self.memory().map(|m| m.live_buffers()).unwrap_or(0)
    }
}

fn run_queue(rx: Receiver<QueueOp>, shared: Arc<Shared>, pool: rayon::ThreadPool) {
    for op in rx {
        match op {
            QueueOp::Launch(kernel) => {
                if shared.has_fault() {
                    tracing::trace!(kernel = kernel.name(), "skipping kernel on faulted device");
                    continue;
                }
                let result = match shared.memory.lock() {
                    Ok(mut guard) => {
                        let memory: &mut DeviceMemory = &mut guard;
                        let kernel = &kernel;
                        pool.install(|| catch_unwind(AssertUnwindSafe(|| kernel.run(memory))))
                            .unwrap_or_else(|_| {
                                Err(DeviceError::KernelFault {
                                    kernel: kernel.name(),
                                    reason: "kernel panicked".into(),
                                })
                            })
                    }
                    Err(_) => Err(DeviceError::Lost),
                };
                if let Err(e) = result {
                    tracing::trace!(kernel = kernel.name(), error = %e, "kernel fault recorded");
                    shared.record_fault(e);
                }
            }
            QueueOp::Fence(done) => {
                let _ = done.send(());
            }
        }
    }
}

impl ComputeDevice for HostDevice {
    fn name(&self) -> &str {
        "host"
    }

    fn alloc_zeroed(&mut self, bytes: usize) -> Result<BufferId, DeviceError> {
        self.memory()?.alloc_zeroed(bytes)
    }

    fn free(&mut self, buffer: BufferId) -> Result<(), DeviceError> {
        self.drain()?;
        self.memory()?.free(buffer)
    }

    fn upload(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<(), DeviceError> {
        self.drain()?;
        self.memory()?.write(buffer, offset, data)
    }

    fn download(
        &mut self,
        buffer: BufferId,
        offset: usize,
        out: &mut [u8],
    ) -> Result<(), DeviceError> {
        self.drain()?;
        self.memory()?.read(buffer, offset, out)
    }

    fn copy(&mut self, src: BufferId, dst: BufferId) -> Result<(), DeviceError> {
        self.drain()?;
        self.memory()?.copy(src, dst)
    }

    fn launch(&mut self, kernel: Box<dyn Kernel>) -> Result<(), DeviceError> {
        {
            let memory = self.memory()?;
            if let Some(unbound) = kernel.bindings().into_iter().find(|b| !memory.contains(*b)) {
                return Err(DeviceError::LaunchFailed {
                    kernel: kernel.name(),
                    reason: format!("binding {unbound} is not a live buffer"),
                });
            }
        }
        let name = kernel.name();
        self.queue
            .as_ref()
            .ok_or(DeviceError::Lost)?
            .send(QueueOp::Launch(kernel))
            .map_err(|_| DeviceError::LaunchFailed {
                kernel: name,
                reason: "device queue closed".into(),
            })
    }

    fn last_error(&mut self) -> Result<(), DeviceError> {
        self.shared.take_fault()
    }

    fn synchronize(&mut self) -> Result<(), DeviceError> {
        self.drain()?;
        self.shared.take_fault()
    }
}

impl Drop for HostDevice {
    fn drop(&mut self) {
        // Closing the channel ends the queue loop once pending work is done.
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("device queue thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for HostDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostDevice")
            .field("live_buffers", &self.live_buffers())
            .field("bytes_in_use", &self.bytes_in_use())
            .finish()
    }
}
