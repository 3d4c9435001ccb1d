// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        channel::{ChannelCollection, ChannelHelper},
        driver::{DriverScanRequest, ReasonCode, ScanData, ScanDetail, ScanDriver, ScanSettings},
        error::Error,
        event::{ScanEventHandler, ScanStatus},
        filter::{filter_single_scan_results, scanned_bands, sort_scan_results, FilteredResults},
        hidden::HiddenNetworkRotator,
        scanner::MAX_SCAN_BUCKETS,
        timer::{Clock, EventId, Timer},
    },
    log::{debug, error, info, warn},
    std::{mem, time::Duration},
};

pub const SCAN_TIMEOUT: Duration = Duration::from_secs(15);
pub const SCAN_TIMEOUT_TAG: &str = "wlan-scan scan timeout";
pub const SCAN_FAILURE_TAG: &str = "wlan-scan report failure";

// Borrowed view of the scanner's collaborators, handed to the sessions while the state lock
// is held.
pub struct Env<'a> {
    pub iface_name: &'a str,
    pub driver: &'a dyn ScanDriver,
    pub clock: &'a dyn Clock,
    pub channel_helper: &'a dyn ChannelHelper,
}

/// Deferred work of the scanner, run from the scheduler rather than from the caller's stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimedEvent {
    SingleScanTimeout,
    ReportScanFailure(ReasonCode),
}

struct ActiveSingleScan {
    start_time_nanos: i64,
    report_full_results: bool,
    requested_channels: Box<dyn ChannelCollection>,
    handler: Box<dyn ScanEventHandler>,
}

enum SingleScanState {
    Idle,
    // The driver accepted the scan. Results, a failure event or the timeout end it.
    Scanning { scan: ActiveSingleScan, timeout_id: EventId },
    // The scan could not be issued. The failure is reported once `report_id` fires, unless
    // another terminal event gets here first.
    StartFailed { scan: ActiveSingleScan, report_id: EventId },
}

pub struct SingleScanSession {
    state: SingleScanState,
    rotator: HiddenNetworkRotator,
    latest: ScanData,
    native_scan_results: Option<Vec<ScanDetail>>,
}

impl SingleScanSession {
    pub fn new(default_hidden_networks_per_scan: usize) -> Self {
        SingleScanSession {
            state: SingleScanState::Idle,
            rotator: HiddenNetworkRotator::new(default_hidden_networks_per_scan),
            latest: ScanData::default(),
            native_scan_results: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, SingleScanState::Idle)
    }

    pub fn latest(&self) -> &ScanData {
        &self.latest
    }

    /// Raw results of the last fetch from the driver, if any.
    pub fn native_scan_results(&self) -> Option<&[ScanDetail]> {
        self.native_scan_results.as_ref().map(|results| &results[..])
    }

    // Accepting a request always occupies the session, even when the scan cannot be issued:
    // the handler then learns about the failure from a deferred event.
    pub fn start(
        &mut self,
        env: &Env<'_>,
        timer: &mut Timer<TimedEvent>,
        settings: &ScanSettings,
        handler: Box<dyn ScanEventHandler>,
    ) -> Result<(), Error> {
        if self.is_active() {
            warn!("A single scan is already running");
            return Err(Error::SingleScanInProgress);
        }
        if settings.buckets.len() > MAX_SCAN_BUCKETS as usize {
            warn!("Rejecting scan with {} buckets", settings.buckets.len());
            return Err(Error::InvalidRequest("too many buckets"));
        }

        let mut requested_channels = env.channel_helper.create_channel_collection();
        let mut report_full_results = false;
        for bucket in &settings.buckets {
            report_full_results |= bucket.reports_full_results();
            requested_channels.add_channels(bucket);
        }

        let hidden_ssids = match &settings.hidden_networks {
            Some(hidden_networks) => self
                .rotator
                .select(hidden_networks, || env.driver.get_max_ssids_per_scan(env.iface_name)),
            None => vec![],
        };

        let scan = ActiveSingleScan {
            start_time_nanos: env.clock.elapsed_since_boot_nanos(),
            report_full_results,
            requested_channels,
            handler,
        };

        let status = if scan.requested_channels.is_empty() {
            error!("Failed to start scan because there is no available channel to scan");
            Err(ReasonCode::Unspecified)
        } else {
            let request = DriverScanRequest {
                scan_type: settings.scan_type,
                freqs: scan.requested_channels.scan_freqs(),
                hidden_ssids,
                enable_6ghz_rnr: settings.enable_6ghz_rnr,
                vendor_ies: settings.vendor_ies.clone(),
            };
            match env.driver.scan(env.iface_name, &request) {
                Ok(()) => Ok(request),
                Err(reason) => {
                    error!("Failed to start scan, freqs={:?} status: {:?}", request.freqs, reason);
                    Err(reason)
                }
            }
        };

        self.state = match status {
            Ok(request) => {
                info!("Starting scan for freqs={:?} on iface {}", request.freqs, env.iface_name);
                let timeout_id = timer.schedule_event(
                    SCAN_TIMEOUT,
                    SCAN_TIMEOUT_TAG,
                    TimedEvent::SingleScanTimeout,
                );
                SingleScanState::Scanning { scan, timeout_id }
            }
            Err(reason) => {
                let report_id = timer.schedule_event(
                    Duration::from_secs(0),
                    SCAN_FAILURE_TAG,
                    TimedEvent::ReportScanFailure(reason),
                );
                SingleScanState::StartFailed { scan, report_id }
            }
        };
        Ok(())
    }

    /// Handles an event retrieved from `timer`. Events left over from an earlier scan are
    /// ignored.
    pub fn on_timer_event(
        &mut self,
        timer: &mut Timer<TimedEvent>,
        event_id: EventId,
        event: TimedEvent,
    ) {
        let current = match &self.state {
            SingleScanState::Idle => None,
            SingleScanState::Scanning { timeout_id, .. } => Some(*timeout_id),
            SingleScanState::StartFailed { report_id, .. } => Some(*report_id),
        };
        if current != Some(event_id) {
            debug!("Ignoring stale timer event {:?}", event);
            return;
        }
        match event {
            TimedEvent::SingleScanTimeout => {
                error!("Timed out waiting for scan results from the driver");
                self.report_failure(timer, ReasonCode::Timeout);
            }
            TimedEvent::ReportScanFailure(reason) => self.report_failure(timer, reason),
        }
    }

    pub fn on_scan_failed(&mut self, timer: &mut Timer<TimedEvent>, reason: ReasonCode) {
        warn!("Scan failed: {:?}", reason);
        self.report_failure(timer, reason);
    }

    pub fn on_scan_results_available(&mut self, env: &Env<'_>, timer: &mut Timer<TimedEvent>) {
        let mut scan = match self.finish(timer) {
            Some(scan) => scan,
            None => {
                // Results of a scan we did not start, or of one that already ended.
                debug!("Ignoring scan results, no single scan running");
                return;
            }
        };

        let native_scan_results = env.driver.get_scan_results(env.iface_name);
        let FilteredResults { mut admitted, num_filtered } = filter_single_scan_results(
            &native_scan_results,
            scan.start_time_nanos,
            &*scan.requested_channels,
        );
        self.native_scan_results = Some(native_scan_results);
        if num_filtered != 0 {
            debug!("Filtering out {} scan results", num_filtered);
        }

        if scan.report_full_results {
            scan.handler.on_full_scan_results(&admitted, 0);
        }
        sort_scan_results(&mut admitted);
        self.latest = ScanData {
            scanned_bands: scanned_bands(&*scan.requested_channels),
            results: admitted,
            ..Default::default()
        };
        scan.handler.on_scan_status(ScanStatus::ResultsAvailable);
    }

    /// Fails any running scan and forgets the hidden network rotation.
    pub fn cleanup(&mut self, timer: &mut Timer<TimedEvent>) {
        self.report_failure(timer, ReasonCode::Unspecified);
        self.rotator.reset();
    }

    fn report_failure(&mut self, timer: &mut Timer<TimedEvent>, reason: ReasonCode) {
        if let Some(mut scan) = self.finish(timer) {
            scan.handler.on_scan_request_failed(reason);
        }
    }

    // Returns the session to Idle. Whatever was pending for the old scan is canceled, so at
    // most one terminal event per scan ever reaches its handler.
    fn finish(&mut self, timer: &mut Timer<TimedEvent>) -> Option<ActiveSingleScan> {
        match mem::replace(&mut self.state, SingleScanState::Idle) {
            SingleScanState::Idle => None,
            SingleScanState::Scanning { scan, timeout_id } => {
                timer.cancel_event(timeout_id);
                Some(scan)
            }
            SingleScanState::StartFailed { scan, report_id } => {
                timer.cancel_event(report_id);
                Some(scan)
            }
        }
    }
}
