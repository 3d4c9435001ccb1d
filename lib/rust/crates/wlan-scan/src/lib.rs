// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Scan coordination for one WLAN interface on top of a scan-capable driver.
//!
//! The [`Scanner`] tracks at most one single scan and one hardware PNO scan at a time, rotates
//! hidden networks across successive scan requests, bounds single scans with a timeout, and
//! reconciles the results the driver delivers against the request that produced them. The
//! driver, the timer service and the channel tables are consumed through the traits in
//! [`driver`], [`timer`] and [`channel`].
//!
//! [`Scanner`]: crate::scanner::Scanner

pub mod channel;
pub mod config;
pub mod driver;
pub mod dump;
pub mod error;
pub mod event;
pub mod filter;
pub mod hidden;
mod pno;
mod scan;
pub mod scanner;
#[cfg(test)]
mod test_utils;
pub mod timer;

pub use {
    config::{ScanPolicy, ScannerConfig},
    error::Error,
    scan::SCAN_TIMEOUT,
    scanner::{Collaborators, ScanCapabilities, Scanner},
};
