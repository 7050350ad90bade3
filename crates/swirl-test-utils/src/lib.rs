//! Test utilities for Swirl development.
//!
//! - [`TrackingDevice`] wraps any [`ComputeDevice`](swirl_device::ComputeDevice)
//!   and records every allocation, free, launch and synchronization in a
//!   shared [`DeviceLedger`], optionally injecting faults from a
//!   [`FaultPlan`].
//! - [`InlineDevice`] executes kernels synchronously on the calling thread.
//! - [`CountingCodec`] and [`FailingCodec`] stand in for the JPEG backend.
//! - [`fixtures`] builds fields, pixel buffers and devices for tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod codec;
pub mod fixtures;
pub mod inline;
pub mod tracking;

pub use codec::{CodecLedger, CountingCodec, FailingCodec};
pub use inline::InlineDevice;
pub use tracking::{DeviceLedger, FaultPlan, TrackingDevice};
