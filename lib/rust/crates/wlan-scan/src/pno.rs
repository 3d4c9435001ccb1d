// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        config::ScanPolicy,
        driver::{PnoNetwork, PnoSettings, ScanDetail},
        error::Error,
        event::PnoEventHandler,
        filter::{filter_pno_scan_results, FilteredResults},
        scan::Env,
    },
    log::{debug, error, info, warn},
};

struct ActivePnoScan {
    start_time_nanos: i64,
    requested_networks: Vec<PnoNetwork>,
    handler: Box<dyn PnoEventHandler>,
}

/// Hardware offloaded PNO scan. Unlike a single scan it has no timeout; it keeps reporting
/// networks until it is reset or the driver reports a failure.
pub struct PnoSession {
    active: Option<ActivePnoScan>,
    native_pno_scan_results: Option<Vec<ScanDetail>>,
}

impl PnoSession {
    pub fn new() -> Self {
        PnoSession { active: None, native_pno_scan_results: None }
    }

    pub fn requested_networks(&self) -> Option<&[PnoNetwork]> {
        self.active.as_ref().map(|active| &active.requested_networks[..])
    }

    pub fn native_pno_scan_results(&self) -> Option<&[ScanDetail]> {
        self.native_pno_scan_results.as_ref().map(|results| &results[..])
    }

    pub fn start(
        &mut self,
        env: &Env<'_>,
        policy: &dyn ScanPolicy,
        settings: &PnoSettings,
        handler: Box<dyn PnoEventHandler>,
    ) -> Result<(), Error> {
        if self.active.is_some() {
            warn!("Already running a PNO scan");
            return Err(Error::PnoScanInProgress);
        }
        if !policy.is_hw_pno_scan_required(settings.is_connected) {
            return Err(Error::PnoNotRequired { is_connected: settings.is_connected });
        }

        self.active = Some(ActivePnoScan {
            start_time_nanos: env.clock.elapsed_since_boot_nanos(),
            requested_networks: settings.networks.clone(),
            handler,
        });
        match env.driver.start_pno_scan(env.iface_name, settings) {
            Ok(()) => info!("Started PNO scan for {} networks", settings.networks.len()),
            Err(reason) => {
                error!("Failed to start PNO scan: {:?}", reason);
                self.report_failure();
            }
        }
        Ok(())
    }

    /// Forgets the running PNO scan and stops it in the driver before returning.
    pub fn reset(&mut self, env: &Env<'_>) -> Result<(), Error> {
        if self.active.take().is_none() {
            warn!("No PNO scan running");
            return Err(Error::NoPnoScanRunning);
        }
        stop_pno_scan(env);
        Ok(())
    }

    pub fn report_failure(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.handler.on_pno_scan_failed();
        }
    }

    pub fn on_pno_results_available(&mut self, env: &Env<'_>) {
        let active = match self.active.as_mut() {
            Some(active) => active,
            None => {
                debug!("Ignoring PNO scan results, no PNO scan running");
                return;
            }
        };

        let native_pno_scan_results = env.driver.get_pno_scan_results(env.iface_name);
        let FilteredResults { admitted, num_filtered } =
            filter_pno_scan_results(&native_pno_scan_results, active.start_time_nanos);
        self.native_pno_scan_results = Some(native_pno_scan_results);
        if num_filtered != 0 {
            debug!("Filtering out {} pno scan results", num_filtered);
        }
        active.handler.on_pno_network_found(&admitted);
    }

    pub fn cleanup(&mut self, env: &Env<'_>) {
        stop_pno_scan(env);
        self.active = None;
    }
}

fn stop_pno_scan(env: &Env<'_>) {
    if let Err(reason) = env.driver.stop_pno_scan(env.iface_name) {
        warn!("Failed to stop PNO scan: {:?}", reason);
    }
}
