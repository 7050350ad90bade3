//! Codec doubles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use swirl_codec::{CodecError, ImageCodec, JpegCodec};
use swirl_core::Quality;

/// Counters shared by a [`CountingCodec`] and the test that built it.
#[derive(Debug, Default)]
pub struct CodecLedger {
    calls: AtomicU64,
    bytes: AtomicU64,
}

impl CodecLedger {
    /// Successful compressions.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Total bytes produced.
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// The real JPEG codec plus call and byte counters.
#[derive(Debug, Default)]
pub struct CountingCodec {
    inner: JpegCodec,
    ledger: Arc<CodecLedger>,
}

impl CountingCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> Arc<CodecLedger> {
        Arc::clone(&self.ledger)
    }
}

impl ImageCodec for CountingCodec {
    fn name(&self) -> &'static str {
        "counting-jpeg"
    }

    fn compress(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
        quality: Quality,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        self.inner.compress(rgb, width, height, quality, out)?;
        self.ledger.calls.fetch_add(1, Ordering::Relaxed);
        self.ledger.bytes.fetch_add(out.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

/// Encodes `succeed` frames as JPEG, then fails every call.
#[derive(Debug)]
pub struct FailingCodec {
    succeed: u64,
    calls: u64,
}

impl FailingCodec {
    pub fn after(succeed: u64) -> Self {
        Self { succeed, calls: 0 }
    }
}

impl ImageCodec for FailingCodec {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn compress(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
        quality: Quality,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        self.calls += 1;
        if self.calls > self.succeed {
            // Leave garbage behind: callers must discard `out` on error.
            out.extend_from_slice(&[0xFF, 0xD8]);
            return Err(CodecError::Compression {
                codec: "failing",
                reason: format!("injected failure on call {}", self.calls),
            });
        }
        JpegCodec.compress(rgb, width, height, quality, out)
    }
}
