// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::driver::{HiddenNetwork, Ssid},
    log::debug,
    std::cmp,
};

/// Picks which hidden networks to probe for on each scan.
///
/// When the caller's list does not fit in one scan request, consecutive requests walk through it
/// round-robin so that every network is probed once per full cycle, in list order.
#[derive(Debug)]
pub struct HiddenNetworkRotator {
    // Number of directed SSIDs the driver accepts per scan, excluding the broadcast probe.
    // Non-positive until the driver has reported a usable limit.
    max_ssids_per_scan: i32,
    next_index: usize,
    default_batch_size: usize,
}

impl HiddenNetworkRotator {
    pub fn new(default_batch_size: usize) -> Self {
        HiddenNetworkRotator { max_ssids_per_scan: -1, next_index: 0, default_batch_size }
    }

    /// Returns the SSIDs to probe for this scan and advances the cursor. `query_max_ssids` is
    /// only consulted while the driver limit is still unknown.
    pub fn select<F>(&mut self, hidden_networks: &[HiddenNetwork], query_max_ssids: F) -> Vec<Ssid>
    where
        F: FnOnce() -> i32,
    {
        let mut round_robin = true;
        let batch_limit = if self.max_ssids_per_scan > 0 {
            self.max_ssids_per_scan as usize
        } else {
            // One slot is taken by the broadcast probe the driver always adds.
            self.max_ssids_per_scan = query_max_ssids().saturating_sub(1);
            if self.max_ssids_per_scan > 0 {
                self.max_ssids_per_scan as usize
            } else {
                round_robin = false;
                self.default_batch_size
            }
        };

        let len = hidden_networks.len();
        let batch_size = cmp::min(len, batch_limit);
        if batch_size == len || self.next_index >= len || !round_robin {
            self.next_index = 0;
        }
        debug!(
            "Scanning for {} out of {} hidden networks, starting at {}",
            batch_size, len, self.next_index
        );

        let start = self.next_index;
        let selected =
            (0..batch_size).map(|i| hidden_networks[(start + i) % len].ssid.clone()).collect();
        self.next_index = if len == 0 { 0 } else { (start + batch_size) % len };
        selected
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Forgets the driver limit and restarts rotation from the head of the list.
    pub fn reset(&mut self) {
        self.max_ssids_per_scan = -1;
        self.next_index = 0;
    }
}
