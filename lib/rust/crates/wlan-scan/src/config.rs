// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    serde_derive::{Deserialize, Serialize},
    std::{fs::File, io::BufReader, path::Path},
};

/// Number of hidden networks requested per scan when the driver cannot report its own limit.
pub const DEFAULT_NUM_HIDDEN_NETWORK_IDS_PER_SCAN: usize = 16;

/// Platform signals consumed by the scanner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Whether the platform supports firmware background (PNO) scanning.
    pub background_scan_supported: bool,
    /// Fallback hidden network batch size. Rotation across requests is disabled when this
    /// value is in effect.
    pub default_hidden_networks_per_scan: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            background_scan_supported: false,
            default_hidden_networks_per_scan: DEFAULT_NUM_HIDDEN_NETWORK_IDS_PER_SCAN,
        }
    }
}

impl ScannerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Decides whether PNO scans are offloaded to hardware. Lives outside the scanner because the
/// answer depends on platform state that may change at runtime.
pub trait ScanPolicy: Send + Sync {
    fn is_background_scan_supported(&self) -> bool;

    /// Hardware PNO is only used for disconnected PNO, and only when the platform supports
    /// background scanning.
    fn is_hw_pno_scan_required(&self, is_connected_pno: bool) -> bool {
        !is_connected_pno && self.is_background_scan_supported()
    }
}

impl ScanPolicy for ScannerConfig {
    fn is_background_scan_supported(&self) -> bool {
        self.background_scan_supported
    }
}
