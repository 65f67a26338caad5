// Licensed under the Apache-2.0 license

use arrayvec::ArrayVec;
use video_common::VideoMode;

pub const MAX_SINKS: usize = 16;
pub const MAX_RELATIVE_ADDRESS_LEN: usize = 15;

/// A sink found by topology discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkNode {
    /// Port numbers from the transmitter down to the sink.
    pub relative_address: ArrayVec<u8, MAX_RELATIVE_ADDRESS_LEN>,
    pub link_count_total: u8,
}

#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub sinks: ArrayVec<SinkNode, MAX_SINKS>,
    pub node_total: u8,
}

impl Topology {
    pub fn clear(&mut self) {
        self.sinks.clear();
        self.node_total = 0;
    }

    pub fn sink_total(&self) -> usize {
        self.sinks.len()
    }
}

/// Outcome of [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyDecision {
    pub reorder_requested: bool,
    pub adjusted_mode: VideoMode,
}

/// Decides whether discovered sinks belong to a tiled display and must be
/// reordered by tile group before streams are assigned.
///
/// Four sinks driven at the per-tile 4K mode are treated as a quad-tiled
/// panel and drop to 1080p per tile. Two sinks at or below the per-tile 4K
/// mode are reordered without changing the mode.
pub fn normalize(sink_total: usize, mode: VideoMode) -> TopologyDecision {
    match sink_total {
        4 if mode == VideoMode::PER_TILE_UHD => TopologyDecision {
            reorder_requested: true,
            adjusted_mode: VideoMode::Fhd1080p60,
        },
        2 if mode <= VideoMode::PER_TILE_UHD => TopologyDecision {
            reorder_requested: true,
            adjusted_mode: mode,
        },
        _ => TopologyDecision {
            reorder_requested: false,
            adjusted_mode: mode,
        },
    }
}
