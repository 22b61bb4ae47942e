//! I/O events
//!
//! An [`Event`] is one host request (or one internal flash operation) moving
//! through the simulator. The translation layer fills in the physical
//! address, the controller performs it and accumulates simulated time.

use crate::types::{IoKind, PhysicalAddress};
use bytes::Bytes;

/// Record of a dependent operation folded into a parent event
#[derive(Clone, Debug, PartialEq)]
pub struct SubOp {
    pub kind: IoKind,
    pub address: Option<PhysicalAddress>,
    pub time_taken: f64,
}

/// A simulated I/O request
#[derive(Clone, Debug)]
pub struct Event {
    kind: IoKind,
    logical_address: u64,
    address: Option<PhysicalAddress>,
    payload: Option<Bytes>,
    start_time: f64,
    time_taken: f64,
    noop: bool,
    sub_ops: Vec<SubOp>,
}

impl Event {
    /// Create a new event with no resolved physical address
    #[must_use]
    pub const fn new(kind: IoKind, logical_address: u64, start_time: f64) -> Self {
        Self {
            kind,
            logical_address,
            address: None,
            payload: None,
            start_time,
            time_taken: 0.0,
            noop: false,
            sub_ops: Vec::new(),
        }
    }

    #[must_use]
    pub const fn read(logical_address: u64, start_time: f64) -> Self {
        Self::new(IoKind::Read, logical_address, start_time)
    }

    #[must_use]
    pub fn write(logical_address: u64, payload: impl Into<Bytes>, start_time: f64) -> Self {
        let mut event = Self::new(IoKind::Write, logical_address, start_time);
        event.payload = Some(payload.into());
        event
    }

    #[must_use]
    pub const fn trim(logical_address: u64, start_time: f64) -> Self {
        Self::new(IoKind::Trim, logical_address, start_time)
    }

    pub const fn kind(&self) -> IoKind {
        self.kind
    }

    pub const fn logical_address(&self) -> u64 {
        self.logical_address
    }

    /// Resolved physical page, `None` when the request maps nowhere
    pub const fn address(&self) -> Option<PhysicalAddress> {
        self.address
    }

    pub const fn set_address(&mut self, address: Option<PhysicalAddress>) {
        self.address = address;
    }

    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    pub fn set_payload(&mut self, payload: Option<Bytes>) {
        self.payload = payload;
    }

    pub fn take_payload(&mut self) -> Option<Bytes> {
        self.payload.take()
    }

    pub const fn start_time(&self) -> f64 {
        self.start_time
    }

    pub const fn time_taken(&self) -> f64 {
        self.time_taken
    }

    /// Simulated completion time
    pub fn end_time(&self) -> f64 {
        self.start_time + self.time_taken
    }

    /// Charge simulated time to this event
    pub fn incr_time_taken(&mut self, delta: f64) {
        self.time_taken += delta;
    }

    pub const fn is_noop(&self) -> bool {
        self.noop
    }

    pub const fn set_noop(&mut self, noop: bool) {
        self.noop = noop;
    }

    /// Operations performed on behalf of this request (merge copies, erases)
    pub fn sub_ops(&self) -> &[SubOp] {
        &self.sub_ops
    }

    /// Fold a dependent event into this one
    ///
    /// The sub-event's time is charged to this event so latency accounting
    /// includes the background work the request triggered.
    pub fn consolidate(&mut self, sub: &Self) {
        self.time_taken += sub.time_taken;
        self.sub_ops.push(SubOp {
            kind: sub.kind,
            address: sub.address,
            time_taken: sub.time_taken,
        });
    }

    /// Number of consolidated sub-operations of the given kind
    pub fn count_sub_ops(&self, kind: IoKind) -> usize {
        self.sub_ops.iter().filter(|op| op.kind == kind).count()
    }
}
