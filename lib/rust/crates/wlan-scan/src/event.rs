// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Callbacks through which the scanner reports the outcome of accepted requests.
//!
//! Handlers are invoked while the scanner's lock is held, so they must not call back into the
//! scanner. The channel-backed sinks in this module forward every notification to a stream and
//! are the simplest way to consume events from another task.

use {
    crate::driver::{ReasonCode, ScanResult},
    futures::channel::mpsc,
    log::debug,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanStatus {
    ResultsAvailable,
}

pub trait ScanEventHandler: Send {
    fn on_scan_status(&mut self, status: ScanStatus);

    /// Every admitted result, unsorted, delivered before the status notification when any
    /// bucket asked for full results.
    fn on_full_scan_results(&mut self, results: &[ScanResult], buckets_scanned: i32);

    fn on_scan_request_failed(&mut self, reason: ReasonCode);
}

pub trait PnoEventHandler: Send {
    fn on_pno_network_found(&mut self, results: &[ScanResult]);

    fn on_pno_scan_failed(&mut self);
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScanEvent {
    Status(ScanStatus),
    FullResults { results: Vec<ScanResult>, buckets_scanned: i32 },
    Failed(ReasonCode),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PnoEvent {
    NetworkFound(Vec<ScanResult>),
    Failed,
}

pub struct UnboundedSink<T> {
    sink: mpsc::UnboundedSender<T>,
}

impl<T> UnboundedSink<T> {
    pub fn send(&self, msg: T) {
        if let Err(e) = self.sink.unbounded_send(msg) {
            // If the other side has disconnected, we can still technically function,
            // so ignore the error.
            debug!("Dropping scan event, receiver is gone: {}", e);
        }
    }
}

pub type ScanEventSink = UnboundedSink<ScanEvent>;
pub type ScanEventStream = mpsc::UnboundedReceiver<ScanEvent>;
pub type PnoEventSink = UnboundedSink<PnoEvent>;
pub type PnoEventStream = mpsc::UnboundedReceiver<PnoEvent>;

pub fn scan_event_channel() -> (ScanEventSink, ScanEventStream) {
    let (sink, stream) = mpsc::unbounded();
    (UnboundedSink { sink }, stream)
}

pub fn pno_event_channel() -> (PnoEventSink, PnoEventStream) {
    let (sink, stream) = mpsc::unbounded();
    (UnboundedSink { sink }, stream)
}

impl ScanEventHandler for ScanEventSink {
    fn on_scan_status(&mut self, status: ScanStatus) {
        self.send(ScanEvent::Status(status));
    }

    fn on_full_scan_results(&mut self, results: &[ScanResult], buckets_scanned: i32) {
        self.send(ScanEvent::FullResults { results: results.to_vec(), buckets_scanned });
    }

    fn on_scan_request_failed(&mut self, reason: ReasonCode) {
        self.send(ScanEvent::Failed(reason));
    }
}

impl PnoEventHandler for PnoEventSink {
    fn on_pno_network_found(&mut self, results: &[ScanResult]) {
        self.send(PnoEvent::NetworkFound(results.to_vec()));
    }

    fn on_pno_scan_failed(&mut self) {
        self.send(PnoEvent::Failed);
    }
}
