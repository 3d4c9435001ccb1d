// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        driver::{
            DriverScanRequest, PnoSettings, ReasonCode, ScanDetail, ScanDriver, ScanResult,
        },
        timer::{Clock, Scheduler, TaskCallback, TaskHandle},
    },
    futures::{channel::mpsc, FutureExt, StreamExt},
    parking_lot::{Mutex, MutexGuard},
    std::{
        sync::atomic::{AtomicI64, Ordering},
        time::Duration,
    },
};

pub struct FakeDriverState {
    pub scan_status: Result<(), ReasonCode>,
    pub scan_requests: Vec<DriverScanRequest>,
    pub scan_results: Vec<ScanDetail>,
    pub scan_result_fetches: usize,
    pub pno_scan_results: Vec<ScanDetail>,
    pub pno_start_status: Result<(), ReasonCode>,
    pub pno_starts: Vec<PnoSettings>,
    pub pno_stops: usize,
    pub max_ssids_per_scan: i32,
    pub max_ssids_queries: usize,
}

pub struct FakeDriver {
    state: Mutex<FakeDriverState>,
}

impl FakeDriver {
    pub fn new() -> Self {
        FakeDriver {
            state: Mutex::new(FakeDriverState {
                scan_status: Ok(()),
                scan_requests: vec![],
                scan_results: vec![],
                scan_result_fetches: 0,
                pno_scan_results: vec![],
                pno_start_status: Ok(()),
                pno_starts: vec![],
                pno_stops: 0,
                max_ssids_per_scan: 0,
                max_ssids_queries: 0,
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeDriverState> {
        self.state.lock()
    }
}

impl ScanDriver for FakeDriver {
    fn scan(&self, _iface_name: &str, request: &DriverScanRequest) -> Result<(), ReasonCode> {
        let mut state = self.state.lock();
        state.scan_requests.push(request.clone());
        state.scan_status
    }

    fn get_scan_results(&self, _iface_name: &str) -> Vec<ScanDetail> {
        let mut state = self.state.lock();
        state.scan_result_fetches += 1;
        state.scan_results.clone()
    }

    fn get_pno_scan_results(&self, _iface_name: &str) -> Vec<ScanDetail> {
        self.state.lock().pno_scan_results.clone()
    }

    fn start_pno_scan(&self, _iface_name: &str, settings: &PnoSettings) -> Result<(), ReasonCode> {
        let mut state = self.state.lock();
        state.pno_starts.push(settings.clone());
        state.pno_start_status
    }

    fn stop_pno_scan(&self, _iface_name: &str) -> Result<(), ReasonCode> {
        self.state.lock().pno_stops += 1;
        Ok(())
    }

    fn get_max_ssids_per_scan(&self, _iface_name: &str) -> i32 {
        let mut state = self.state.lock();
        state.max_ssids_queries += 1;
        state.max_ssids_per_scan
    }
}

struct FakeTask {
    handle: TaskHandle,
    delay: Duration,
    tag: &'static str,
    callback: TaskCallback,
}

/// Holds scheduled tasks until the test fires them.
pub struct FakeScheduler {
    next_handle: Mutex<u64>,
    tasks: Mutex<Vec<FakeTask>>,
}

impl FakeScheduler {
    pub fn new() -> Self {
        FakeScheduler { next_handle: Mutex::new(0), tasks: Mutex::new(vec![]) }
    }

    pub fn pending_tags(&self) -> Vec<&'static str> {
        self.tasks.lock().iter().map(|task| task.tag).collect()
    }

    pub fn pending_delays(&self, tag: &str) -> Vec<Duration> {
        self.tasks.lock().iter().filter(|task| task.tag == tag).map(|task| task.delay).collect()
    }

    /// Removes the oldest task with `tag` without running it, as if its timer already expired
    /// and the callback is on its way.
    pub fn take_task(&self, tag: &str) -> Option<TaskCallback> {
        let mut tasks = self.tasks.lock();
        let index = tasks.iter().position(|task| task.tag == tag)?;
        Some(tasks.remove(index).callback)
    }

    /// Runs the oldest task with `tag`. Returns false if there is none.
    pub fn fire_next(&self, tag: &str) -> bool {
        // The callback may schedule or cancel tasks, so it runs without the lock held.
        match self.take_task(tag) {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl Scheduler for FakeScheduler {
    fn schedule(&self, delay: Duration, tag: &'static str, callback: TaskCallback) -> TaskHandle {
        let mut next_handle = self.next_handle.lock();
        *next_handle += 1;
        let handle = TaskHandle(*next_handle);
        self.tasks.lock().push(FakeTask { handle, delay, tag, callback });
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        self.tasks.lock().retain(|task| task.handle != handle);
    }
}

pub struct FakeClock {
    nanos: AtomicI64,
}

impl FakeClock {
    pub fn new(nanos: i64) -> Self {
        FakeClock { nanos: AtomicI64::new(nanos) }
    }

    pub fn set_nanos(&self, nanos: i64) {
        self.nanos.store(nanos, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn elapsed_since_boot_nanos(&self) -> i64 {
        self.nanos.load(Ordering::SeqCst)
    }
}

/// Collects every item currently queued on `stream` without blocking.
pub fn drain<T>(stream: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut items = vec![];
    while let Some(Some(item)) = stream.next().now_or_never() {
        items.push(item);
    }
    items
}

pub fn fake_scan_result(
    ssid: &[u8],
    frequency: u32,
    rssi: i32,
    timestamp_micros: i64,
) -> ScanResult {
    ScanResult {
        ssid: ssid.to_vec(),
        bssid: [0x02, 0x00, 0x00, 0x00, 0x00, ssid.len() as u8],
        frequency,
        rssi,
        timestamp_micros,
        capabilities: "[ESS]".to_string(),
    }
}

pub fn fake_scan_detail(
    ssid: &[u8],
    frequency: u32,
    rssi: i32,
    timestamp_micros: i64,
) -> ScanDetail {
    ScanDetail { result: fake_scan_result(ssid, frequency, rssi, timestamp_micros), ies: None }
}
