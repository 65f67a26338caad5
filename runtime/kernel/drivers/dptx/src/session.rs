// Licensed under the Apache-2.0 license

use crate::bandwidth::PayloadAllocation;
use crate::config::DpTxCoreConfig;
use crate::link::LinkConfig;
use crate::stream::{Bpc, StreamDescriptor, MAX_STREAMS};
use crate::topology::Topology;
use video_common::VideoModeRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    SingleStream,
    MultiStream,
}

/// Non-fatal observations from the last configuration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionDiagnostics {
    /// Link establishment settled below the parameters it was asked for.
    pub downshift_detected: bool,
    /// The first training attempt failed and the link was trained at maximum.
    pub trained_at_maximum: bool,
    /// Admission failed once and the link was retrained at maximum.
    pub retrained_for_bandwidth: bool,
    pub sink_edid_valid: bool,
    pub link_status_ok: bool,
}

/// State of one transmitter instance. Owned by the subsystem and borrowed
/// exclusively for the duration of a configuration pass.
#[derive(Debug, Clone)]
pub struct LinkSession {
    pub transport_mode: TransportMode,
    pub bpc: Bpc,
    pub video_mode: VideoModeRequest,
    pub link_config: LinkConfig,
    pub topology: Topology,
    pub streams: [StreamDescriptor; MAX_STREAMS],
    /// Streams driven in the current pass.
    pub num_streams: u8,
    pub payload: Option<PayloadAllocation>,
    pub diagnostics: SessionDiagnostics,
}

impl LinkSession {
    pub fn new(config: &DpTxCoreConfig) -> Self {
        Self {
            transport_mode: TransportMode::SingleStream,
            bpc: Bpc::Eight,
            video_mode: VideoModeRequest::EdidPreferred,
            link_config: LinkConfig::new(config.max_lane_count, config.max_link_rate),
            topology: Topology::default(),
            streams: [StreamDescriptor::default(); MAX_STREAMS],
            num_streams: 1,
            payload: None,
            diagnostics: SessionDiagnostics::default(),
        }
    }

    pub fn is_mst(&self) -> bool {
        self.transport_mode == TransportMode::MultiStream
    }
}
