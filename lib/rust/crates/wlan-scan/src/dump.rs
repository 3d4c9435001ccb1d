// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Text report of the raw results most recently fetched from the driver.

use {
    crate::driver::{Bssid, ScanDetail, ScanResult},
    std::fmt::{self, Write},
};

const TABLE_HEADER: &str =
    "    BSSID              Frequency      RSSI           Age(sec)     SSID";

pub fn format_bssid(bssid: &Bssid) -> String {
    bssid.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(":")
}

fn write_result<W: Write>(w: &mut W, result: &ScanResult, now_ms: i64) -> fmt::Result {
    let age_ms = now_ms - result.timestamp_micros / 1_000;
    writeln!(
        w,
        "  {:17}  {:>9}      {:>5}      {:>12.3}      {}",
        format_bssid(&result.bssid),
        result.frequency,
        result.rssi,
        age_ms as f64 / 1_000.0,
        String::from_utf8_lossy(&result.ssid),
    )
}

fn write_table<W: Write>(w: &mut W, details: &[ScanDetail], now_ms: i64) -> fmt::Result {
    writeln!(w, "{}", TABLE_HEADER)?;
    for detail in details {
        write_result(w, &detail.result, now_ms)?;
    }
    Ok(())
}

/// Writes the report. `None` sections have never been fetched and are left empty.
pub fn write_report<W: Write>(
    w: &mut W,
    now_ms: i64,
    native_scan_results: Option<&[ScanDetail]>,
    native_pno_scan_results: Option<&[ScanDetail]>,
) -> fmt::Result {
    writeln!(w, "Latest native scan results:")?;
    if let Some(details) = native_scan_results {
        write_table(w, details, now_ms)?;
    }
    writeln!(w, "Latest native pno scan results:")?;
    if let Some(details) = native_pno_scan_results {
        write_table(w, details, now_ms)?;
    }
    writeln!(w, "Latest native scan results IEs:")?;
    for ies in native_scan_results.into_iter().flatten().filter_map(|d| d.ies.as_ref()) {
        writeln!(w, "{}", hex::encode_upper(ies))?;
    }
    writeln!(w)
}
