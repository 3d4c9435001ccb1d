// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Reconciles raw driver results with the request that produced them.

use {
    crate::{
        channel::{is_6ghz, ChannelCollection, WifiBand, WIFI_BAND_COUNT, WIFI_BAND_UNSPECIFIED},
        driver::{ScanDetail, ScanResult},
    },
    std::cmp::Ordering,
};

#[derive(Debug, Default, PartialEq)]
pub struct FilteredResults {
    pub admitted: Vec<ScanResult>,
    pub num_filtered: usize,
}

/// Results are timestamped in microseconds, requests in nanoseconds.
fn seen_since(result: &ScanResult, start_time_nanos: i64) -> bool {
    result.timestamp_micros >= start_time_nanos.div_euclid(1_000)
}

/// Keeps results seen since the scan started on a requested channel. 6 GHz results are kept
/// even when not requested since they may have been discovered through a reduced neighbor
/// report on another band.
pub fn filter_single_scan_results(
    details: &[ScanDetail],
    start_time_nanos: i64,
    requested: &dyn ChannelCollection,
) -> FilteredResults {
    filter_results(details, |result| {
        seen_since(result, start_time_nanos)
            && (requested.contains_channel(result.frequency) || is_6ghz(result.frequency))
    })
}

/// PNO scans are not tied to a channel set; only staleness is checked.
pub fn filter_pno_scan_results(details: &[ScanDetail], start_time_nanos: i64) -> FilteredResults {
    filter_results(details, |result| seen_since(result, start_time_nanos))
}

fn filter_results<F>(details: &[ScanDetail], admit: F) -> FilteredResults
where
    F: Fn(&ScanResult) -> bool,
{
    let mut filtered = FilteredResults::default();
    for detail in details {
        if admit(&detail.result) {
            filtered.admitted.push(detail.result.clone());
        } else {
            filtered.num_filtered += 1;
        }
    }
    filtered
}

/// Strongest signal first; ties broken by frequency, SSID, then BSSID.
pub fn compare_scan_results(a: &ScanResult, b: &ScanResult) -> Ordering {
    b.rssi
        .cmp(&a.rssi)
        .then_with(|| a.frequency.cmp(&b.frequency))
        .then_with(|| a.ssid.cmp(&b.ssid))
        .then_with(|| a.bssid.cmp(&b.bssid))
}

pub fn sort_scan_results(results: &mut [ScanResult]) {
    results.sort_by(compare_scan_results);
}

/// Union of the bands fully covered by `channels`.
pub fn scanned_bands(channels: &dyn ChannelCollection) -> WifiBand {
    (0..WIFI_BAND_COUNT)
        .map(|i| (1 as WifiBand) << i)
        .filter(|band| channels.contains_band(*band))
        .fold(WIFI_BAND_UNSPECIFIED, |bands, band| bands | band)
}
