// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::driver::BucketSettings,
    std::{collections::BTreeSet, sync::Arc},
};

/// Bitmask of radio bands.
pub type WifiBand = u32;

pub const WIFI_BAND_UNSPECIFIED: WifiBand = 0;
pub const WIFI_BAND_24_GHZ: WifiBand = 1 << 0;
pub const WIFI_BAND_5_GHZ: WifiBand = 1 << 1;
pub const WIFI_BAND_5_GHZ_DFS_ONLY: WifiBand = 1 << 2;
pub const WIFI_BAND_6_GHZ: WifiBand = 1 << 3;
pub const WIFI_BAND_60_GHZ: WifiBand = 1 << 4;
pub const WIFI_BAND_5_GHZ_WITH_DFS: WifiBand = WIFI_BAND_5_GHZ | WIFI_BAND_5_GHZ_DFS_ONLY;
pub const WIFI_BAND_COUNT: usize = 5;

const BAND_6_GHZ_START_FREQ_MHZ: u32 = 5925;
const BAND_6_GHZ_END_FREQ_MHZ: u32 = 7125;

pub fn is_6ghz(freq: u32) -> bool {
    freq >= BAND_6_GHZ_START_FREQ_MHZ && freq <= BAND_6_GHZ_END_FREQ_MHZ
}

/// A set of channels to scan, built up from bucket specifications.
pub trait ChannelCollection: Send {
    fn add_channels(&mut self, bucket: &BucketSettings);

    fn is_empty(&self) -> bool;

    fn contains_channel(&self, freq: u32) -> bool;

    /// True if every band in `band` is fully covered by this collection.
    fn contains_band(&self, band: WifiBand) -> bool;

    fn scan_freqs(&self) -> BTreeSet<u32>;
}

pub trait ChannelHelper: Send + Sync {
    fn create_channel_collection(&self) -> Box<dyn ChannelCollection>;
}

#[rustfmt::skip]
const CHANNELS_24_GHZ: &[u32] = &[
    2412, 2417, 2422, 2427, 2432, 2437, 2442, 2447, 2452, 2457, 2462, 2467, 2472,
];

#[rustfmt::skip]
const CHANNELS_5_GHZ: &[u32] = &[
    5180, 5200, 5220, 5240, // UNII-1
    5745, 5765, 5785, 5805, 5825, // UNII-3
];

#[rustfmt::skip]
const CHANNELS_5_GHZ_DFS: &[u32] = &[
    5260, 5280, 5300, 5320, // UNII-2
    5500, 5520, 5540, 5560, 5580, 5600, 5620, 5640, 5660, 5680, 5700, 5720, // UNII-2 extended
];

const CHANNELS_60_GHZ: &[u32] = &[58320, 60480, 62640, 64800, 66960, 69120];

fn channels_6ghz() -> Vec<u32> {
    (0..59).map(|i| 5955 + 20 * i).collect()
}

/// Channel tables indexed by band bit position.
type BandTables = [Vec<u32>; WIFI_BAND_COUNT];

/// A `ChannelHelper` backed by static per-band channel tables.
#[derive(Clone, Debug)]
pub struct KnownBandsChannelHelper {
    tables: Arc<BandTables>,
}

impl KnownBandsChannelHelper {
    pub fn new() -> Self {
        KnownBandsChannelHelper {
            tables: Arc::new([
                CHANNELS_24_GHZ.to_vec(),
                CHANNELS_5_GHZ.to_vec(),
                CHANNELS_5_GHZ_DFS.to_vec(),
                channels_6ghz(),
                CHANNELS_60_GHZ.to_vec(),
            ]),
        }
    }

    /// Restricts the channels available for a single band bit, e.g. to follow regulatory limits.
    pub fn with_available_channels(mut self, band: WifiBand, channels: Vec<u32>) -> Self {
        if let Some(index) = band_index(band) {
            let mut tables = (*self.tables).clone();
            tables[index] = channels;
            self.tables = Arc::new(tables);
        }
        self
    }

    pub fn available_channels(&self, band: WifiBand) -> Vec<u32> {
        band_bits(band).flat_map(|index| self.tables[index].iter().cloned()).collect()
    }
}

impl Default for KnownBandsChannelHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHelper for KnownBandsChannelHelper {
    fn create_channel_collection(&self) -> Box<dyn ChannelCollection> {
        Box::new(KnownBandsChannelCollection {
            tables: Arc::clone(&self.tables),
            channels: BTreeSet::new(),
        })
    }
}

fn band_index(band: WifiBand) -> Option<usize> {
    if band.count_ones() == 1 && (band.trailing_zeros() as usize) < WIFI_BAND_COUNT {
        Some(band.trailing_zeros() as usize)
    } else {
        None
    }
}

fn band_bits(band: WifiBand) -> impl Iterator<Item = usize> {
    (0..WIFI_BAND_COUNT).filter(move |i| band & (1 << i) != 0)
}

pub struct KnownBandsChannelCollection {
    tables: Arc<BandTables>,
    channels: BTreeSet<u32>,
}

impl ChannelCollection for KnownBandsChannelCollection {
    fn add_channels(&mut self, bucket: &BucketSettings) {
        if bucket.band == WIFI_BAND_UNSPECIFIED {
            self.channels.extend(bucket.channels.iter().cloned());
        } else {
            for index in band_bits(bucket.band) {
                self.channels.extend(self.tables[index].iter().cloned());
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    fn contains_channel(&self, freq: u32) -> bool {
        self.channels.contains(&freq)
    }

    fn contains_band(&self, band: WifiBand) -> bool {
        if band == WIFI_BAND_UNSPECIFIED {
            return false;
        }
        band_bits(band).all(|index| {
            let table = &self.tables[index];
            !table.is_empty() && table.iter().all(|freq| self.channels.contains(freq))
        })
    }

    fn scan_freqs(&self) -> BTreeSet<u32> {
        self.channels.clone()
    }
}
