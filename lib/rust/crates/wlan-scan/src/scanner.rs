// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        channel::ChannelHelper,
        config::{ScanPolicy, ScannerConfig},
        driver::{DriverEvent, PnoNetwork, PnoSettings, ScanData, ScanDriver, ScanSettings},
        dump,
        error::Error,
        event::{PnoEventHandler, ScanEventHandler},
        pno::PnoSession,
        scan::{Env, SingleScanSession, TimedEvent},
        timer::{Clock, EventId, Scheduler, Timer},
    },
    log::{info, warn},
    parking_lot::Mutex,
    std::{
        fmt,
        sync::{Arc, Weak},
    },
};

pub const MAX_SCAN_BUCKETS: i32 = 16;
pub const MAX_APS_PER_SCAN: i32 = 32;
pub const MAX_RSSI_SAMPLE_SIZE: i32 = 8;
pub const SCAN_BUFFER_CAPACITY: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanCapabilities {
    pub max_scan_cache_size: i32,
    pub max_scan_buckets: i32,
    pub max_ap_cache_per_scan: i32,
    pub max_rssi_sample_size: i32,
    pub max_scan_reporting_threshold: i32,
}

/// Services the scanner is built on.
pub struct Collaborators {
    pub driver: Arc<dyn ScanDriver>,
    pub channel_helper: Arc<dyn ChannelHelper>,
    /// Runs timeouts and deferred failure reports. Callbacks must not run on the thread that
    /// scheduled them.
    pub scheduler: Arc<dyn Scheduler>,
    pub clock: Arc<dyn Clock>,
    pub policy: Arc<dyn ScanPolicy>,
}

struct State {
    timer: Timer<TimedEvent>,
    single: SingleScanSession,
    pno: PnoSession,
}

struct Inner {
    iface_name: String,
    driver: Arc<dyn ScanDriver>,
    channel_helper: Arc<dyn ChannelHelper>,
    clock: Arc<dyn Clock>,
    policy: Arc<dyn ScanPolicy>,
    state: Mutex<State>,
}

impl Inner {
    fn env(&self) -> Env<'_> {
        Env {
            iface_name: &self.iface_name,
            driver: &*self.driver,
            clock: &*self.clock,
            channel_helper: &*self.channel_helper,
        }
    }

    fn handle_timer_event(&self, event_id: EventId) {
        let mut state = self.state.lock();
        let State { timer, single, .. } = &mut *state;
        // Events that were canceled, e.g. a timeout that lost the race against the results,
        // are gone from the timer by the time their callback runs.
        if let Some(event) = timer.triggered(&event_id) {
            single.on_timer_event(timer, event_id, event);
        }
    }
}

/// Coordinates single scans and hardware PNO scans on one interface.
///
/// At most one single scan and one PNO scan are tracked at a time. Every accepted single scan
/// ends with exactly one call to its handler: results, a failure, or a timeout. All state lives
/// behind one lock which is held while handlers run, so handlers must not call back into the
/// scanner.
#[derive(Clone)]
pub struct Scanner {
    inner: Arc<Inner>,
}

impl Scanner {
    pub fn new<S: Into<String>>(
        iface_name: S,
        config: &ScannerConfig,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators { driver, channel_helper, scheduler, clock, policy } = collaborators;
        let inner = Arc::new_cyclic(|inner: &Weak<Inner>| {
            let inner = inner.clone();
            let on_fire: Arc<dyn Fn(EventId) + Send + Sync> = Arc::new(move |event_id| {
                if let Some(inner) = inner.upgrade() {
                    inner.handle_timer_event(event_id);
                }
            });
            Inner {
                iface_name: iface_name.into(),
                driver,
                channel_helper,
                clock,
                policy,
                state: Mutex::new(State {
                    timer: Timer::new(scheduler, on_fire),
                    single: SingleScanSession::new(config.default_hidden_networks_per_scan),
                    pno: PnoSession::new(),
                }),
            }
        });
        Scanner { inner }
    }

    pub fn iface_name(&self) -> &str {
        &self.inner.iface_name
    }

    pub fn scan_capabilities(&self) -> ScanCapabilities {
        ScanCapabilities {
            max_scan_cache_size: i32::MAX,
            max_scan_buckets: MAX_SCAN_BUCKETS,
            max_ap_cache_per_scan: MAX_APS_PER_SCAN,
            max_rssi_sample_size: MAX_RSSI_SAMPLE_SIZE,
            max_scan_reporting_threshold: SCAN_BUFFER_CAPACITY,
        }
    }

    /// Starts a single scan. `Ok` means the request was accepted and `handler` will hear about
    /// its outcome exactly once, even if the scan could not be issued to the driver.
    pub fn start_single_scan(
        &self,
        settings: &ScanSettings,
        handler: Box<dyn ScanEventHandler>,
    ) -> Result<(), Error> {
        let mut state = self.inner.state.lock();
        let State { timer, single, .. } = &mut *state;
        single.start(&self.inner.env(), timer, settings, handler)
    }

    pub fn get_latest_single_scan_results(&self) -> ScanData {
        self.inner.state.lock().single.latest().clone()
    }

    pub fn start_batched_scan(
        &self,
        _settings: &ScanSettings,
        _handler: Box<dyn ScanEventHandler>,
    ) -> Result<(), Error> {
        warn!("start_batched_scan() is not supported");
        Err(Error::NotSupported("batched scan"))
    }

    pub fn stop_batched_scan(&self) {
        warn!("stop_batched_scan() is not supported");
    }

    pub fn pause_batched_scan(&self) {
        warn!("pause_batched_scan() is not supported");
    }

    pub fn restart_batched_scan(&self) {
        warn!("restart_batched_scan() is not supported");
    }

    pub fn get_latest_batched_scan_results(&self, _flush: bool) -> Option<Vec<ScanData>> {
        None
    }

    /// Starts a hardware PNO scan for `settings.networks`. Fails without touching the driver
    /// if a PNO scan is running or if hardware PNO does not apply to this connection mode.
    pub fn set_hw_pno_list(
        &self,
        settings: &PnoSettings,
        handler: Box<dyn PnoEventHandler>,
    ) -> Result<(), Error> {
        let mut state = self.inner.state.lock();
        state.pno.start(&self.inner.env(), &*self.inner.policy, settings, handler)
    }

    /// Stops the running PNO scan. The driver has been told to stop by the time this returns.
    pub fn reset_hw_pno_list(&self) -> Result<(), Error> {
        let mut state = self.inner.state.lock();
        state.pno.reset(&self.inner.env())
    }

    pub fn is_hw_pno_supported(&self, is_connected: bool) -> bool {
        self.inner.policy.is_hw_pno_scan_required(is_connected)
    }

    /// Networks of the running PNO scan.
    pub fn hw_pno_networks(&self) -> Option<Vec<PnoNetwork>> {
        self.inner.state.lock().pno.requested_networks().map(|networks| networks.to_vec())
    }

    pub fn handle_driver_event(&self, event: DriverEvent) {
        let env = self.inner.env();
        let mut state = self.inner.state.lock();
        let State { timer, single, pno } = &mut *state;
        match event {
            DriverEvent::ScanFailed(reason) => single.on_scan_failed(timer, reason),
            DriverEvent::ScanResultsAvailable => single.on_scan_results_available(&env, timer),
            DriverEvent::PnoScanResultsAvailable => pno.on_pno_results_available(&env),
            DriverEvent::PnoScanFailed => {
                warn!("PNO scan failed");
                pno.report_failure();
            }
        }
    }

    /// Fails any running single scan, stops PNO and forgets everything learned from the
    /// driver. The scanner can be used again afterwards.
    pub fn cleanup(&self) {
        let env = self.inner.env();
        let mut state = self.inner.state.lock();
        let State { timer, single, pno } = &mut *state;
        single.cleanup(timer);
        timer.cancel_all();
        pno.cleanup(&env);
        info!("Scanner for iface {} cleaned up", env.iface_name);
    }

    pub fn write_dump<W: fmt::Write>(&self, w: &mut W) -> fmt::Result {
        let state = self.inner.state.lock();
        dump::write_report(
            w,
            self.inner.clock.elapsed_since_boot_millis(),
            state.single.native_scan_results(),
            state.pno.native_pno_scan_results(),
        )
    }

    pub fn dump(&self) -> String {
        let mut report = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_dump(&mut report);
        report
    }
}
