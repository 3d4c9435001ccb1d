// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Types exchanged with the scan-capable driver, and the `ScanDriver` capability itself.

use {crate::channel::WifiBand, std::collections::BTreeSet};

pub type Ssid = Vec<u8>;
pub type Bssid = [u8; 6];

pub const REPORT_EVENT_AFTER_EACH_SCAN: u32 = 1 << 0;
pub const REPORT_EVENT_FULL_SCAN_RESULT: u32 = 1 << 1;
pub const REPORT_EVENT_NO_BATCH: u32 = 1 << 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanType {
    LowLatency,
    LowPower,
    HighAccuracy,
}

impl Default for ScanType {
    fn default() -> Self {
        ScanType::LowLatency
    }
}

/// Channels requested by one bucket. When `band` is unspecified, `channels` lists the
/// frequencies (MHz) to scan explicitly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BucketSettings {
    pub band: WifiBand,
    pub channels: Vec<u32>,
    pub report_events: u32,
}

impl BucketSettings {
    pub fn reports_full_results(&self) -> bool {
        self.report_events & REPORT_EVENT_FULL_SCAN_RESULT != 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HiddenNetwork {
    pub ssid: Ssid,
}

/// A single scan request as handed to the scanner by its caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanSettings {
    pub scan_type: ScanType,
    pub buckets: Vec<BucketSettings>,
    /// Networks that require a directed probe. `None` skips hidden network selection entirely.
    pub hidden_networks: Option<Vec<HiddenNetwork>>,
    pub enable_6ghz_rnr: bool,
    pub vendor_ies: Vec<u8>,
}

/// What the scanner asks the driver to do for a single scan.
#[derive(Clone, Debug, PartialEq)]
pub struct DriverScanRequest {
    pub scan_type: ScanType,
    pub freqs: BTreeSet<u32>,
    pub hidden_ssids: Vec<Ssid>,
    pub enable_6ghz_rnr: bool,
    pub vendor_ies: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PnoNetwork {
    pub ssid: Ssid,
    pub flags: u8,
    pub auth_bit_field: u8,
    pub frequencies: Vec<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PnoSettings {
    pub is_connected: bool,
    pub period_ms: u32,
    pub min_2g_rssi: i32,
    pub min_5g_rssi: i32,
    pub min_6g_rssi: i32,
    pub networks: Vec<PnoNetwork>,
}

/// A reportable scan result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub ssid: Ssid,
    pub bssid: Bssid,
    pub frequency: u32,
    pub rssi: i32,
    /// Time the BSS was last seen, in microseconds since boot (driver clock domain).
    pub timestamp_micros: i64,
    pub capabilities: String,
}

/// A scan result as returned by the driver, with the raw information elements it was built from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanDetail {
    pub result: ScanResult,
    pub ies: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanData {
    pub id: i32,
    pub flags: i32,
    pub buckets_scanned: i32,
    pub scanned_bands: WifiBand,
    pub results: Vec<ScanResult>,
}

/// Why a scan did not produce results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReasonCode {
    Unspecified,
    InvalidListener,
    InvalidRequest,
    NotAuthorized,
    DuplicateRequest,
    Busy,
    Aborted,
    NoDevice,
    InvalidArgs,
    Timeout,
    Other(i32),
}

pub const REASON_SUCCEEDED: i32 = 0;

impl ReasonCode {
    /// Interprets a raw driver status. Returns `None` for success.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            REASON_SUCCEEDED => return None,
            -1 => ReasonCode::Unspecified,
            -2 => ReasonCode::InvalidListener,
            -3 => ReasonCode::InvalidRequest,
            -4 => ReasonCode::NotAuthorized,
            -5 => ReasonCode::DuplicateRequest,
            -6 => ReasonCode::Busy,
            -7 => ReasonCode::Aborted,
            -8 => ReasonCode::NoDevice,
            -9 => ReasonCode::InvalidArgs,
            -10 => ReasonCode::Timeout,
            other => ReasonCode::Other(other),
        })
    }

    pub fn into_raw(self) -> i32 {
        match self {
            ReasonCode::Unspecified => -1,
            ReasonCode::InvalidListener => -2,
            ReasonCode::InvalidRequest => -3,
            ReasonCode::NotAuthorized => -4,
            ReasonCode::DuplicateRequest => -5,
            ReasonCode::Busy => -6,
            ReasonCode::Aborted => -7,
            ReasonCode::NoDevice => -8,
            ReasonCode::InvalidArgs => -9,
            ReasonCode::Timeout => -10,
            ReasonCode::Other(raw) => raw,
        }
    }
}

/// Asynchronous notifications from the driver for one interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverEvent {
    ScanFailed(ReasonCode),
    ScanResultsAvailable,
    PnoScanResultsAvailable,
    PnoScanFailed,
}

/// The radio scan capability. Calls return promptly; completion of a scan is signaled later
/// with a `DriverEvent`.
pub trait ScanDriver: Send + Sync {
    fn scan(&self, iface_name: &str, request: &DriverScanRequest) -> Result<(), ReasonCode>;

    /// Results of the last completed single scan.
    fn get_scan_results(&self, iface_name: &str) -> Vec<ScanDetail>;

    fn get_pno_scan_results(&self, iface_name: &str) -> Vec<ScanDetail>;

    fn start_pno_scan(&self, iface_name: &str, settings: &PnoSettings) -> Result<(), ReasonCode>;

    fn stop_pno_scan(&self, iface_name: &str) -> Result<(), ReasonCode>;

    /// Maximum number of SSIDs a single scan request can carry, including the broadcast probe.
    /// Non-positive values mean the limit is unknown.
    fn get_max_ssids_per_scan(&self, iface_name: &str) -> i32;
}
