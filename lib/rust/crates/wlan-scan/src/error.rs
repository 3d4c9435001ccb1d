// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use thiserror::Error;

/// Synchronous rejection of a scanner request. A rejected request never changes scanner state
/// and never produces a handler callback.
///
/// Outcomes of accepted requests (driver failures, timeouts) are not errors of this kind; they
/// are reported through the request's handler as a `ReasonCode`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid scan request: {0}")]
    InvalidRequest(&'static str),
    #[error("a single scan is already running")]
    SingleScanInProgress,
    #[error("a PNO scan is already running")]
    PnoScanInProgress,
    #[error("hardware PNO scan is not required (connected: {is_connected})")]
    PnoNotRequired { is_connected: bool },
    #[error("no PNO scan running")]
    NoPnoScanRunning,
    #[error("{0} is not supported")]
    NotSupported(&'static str),
}
