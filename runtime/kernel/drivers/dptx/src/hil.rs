// Licensed under the Apache-2.0 license

//! Interfaces to the DisplayPort TX core and its AUX/sideband plumbing.
//!
//! The engine drives link bring-up through these traits and never touches
//! AUX transactions, PHY equalization or topology discovery internals itself.

use crate::bandwidth::PayloadAllocation;
use crate::link::LinkConfig;
use crate::stream::{StreamDescriptor, StreamId};
use crate::topology::{SinkNode, Topology};
use video_common::edid::EDID_BLOCK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HilError {
    /// No sink is attached, or the sink stopped answering.
    NotConnected,
    /// The transmitter or sink lacks the requested capability.
    NotCapable,
    Timeout,
    AuxFailure,
    InvalidParameter,
    Failure,
}

pub type EdidBlock = [u8; EDID_BLOCK_SIZE];

/// Main link control.
pub trait DpTxLink {
    fn is_connected(&self) -> bool;

    /// Reads the sink capabilities and stores the common maximum lane count
    /// and link rate of sink and transmitter in `config`.
    fn get_rx_capabilities(&mut self, config: &mut LinkConfig) -> Result<(), HilError>;

    /// Sets the active lane count and link rate to the common maximum.
    fn cfg_main_link_max(&mut self, config: &mut LinkConfig) -> Result<(), HilError>;

    /// Runs clock recovery and channel equalization with the parameters in
    /// `config`.
    ///
    /// # Arguments
    /// * `config` - Requested link parameters. When training adaptive mode is
    ///   enabled the collaborator may lower the lane count or rate; the values
    ///   it settled on are written back.
    ///
    /// # Returns
    /// `Ok(())` once the link is trained.
    fn establish_link(&mut self, config: &mut LinkConfig) -> Result<(), HilError>;

    fn set_downspread(&mut self, enable: bool) -> Result<(), HilError>;
    fn set_enhanced_framing(&mut self, enable: bool) -> Result<(), HilError>;
    fn set_training_adaptive(&mut self, enable: bool);
    fn enable_main_link(&mut self);
    /// Stops video and forces idle patterns on the main link.
    fn disable_main_link(&mut self);
    fn check_link_status(&mut self, lane_count: u8) -> Result<(), HilError>;
    fn read_local_edid(&mut self) -> Result<EdidBlock, HilError>;
    fn set_aux_delays(&mut self, aux_delay_us: u32, sideband_delay_us: u32);
}

/// Multi-stream transport control.
pub trait DpTxMst {
    fn is_mst_capable(&mut self) -> Result<(), HilError>;
    /// Enables MST in both the transmitter and the sink.
    fn enable_mst(&mut self) -> Result<(), HilError>;
    fn disable_mst(&mut self) -> Result<(), HilError>;
    /// Fills `topology` with every sink reachable from the transmitter.
    fn discover_topology(&mut self, topology: &mut Topology) -> Result<(), HilError>;
    /// Reorders `topology.sinks` so sinks of one tiled display are adjacent
    /// and in tile order.
    fn sort_sinks_by_tiling(&mut self, topology: &mut Topology);
    fn read_remote_edid(&mut self, sink: &SinkNode) -> Result<EdidBlock, HilError>;
    fn clear_payload_table(&mut self) -> Result<(), HilError>;
    fn allocate_payload_streams(&mut self, allocation: &PayloadAllocation) -> Result<(), HilError>;
}

/// Per-stream slot and main stream attribute control.
pub trait DpTxStreams {
    fn enable_stream(&mut self, stream: StreamId);
    fn disable_stream(&mut self, stream: StreamId);
    fn is_stream_enabled(&self, stream: StreamId) -> bool;
    fn select_sink_for_stream(&mut self, stream: StreamId, sink_index: usize);
    fn clear_stream_attributes(&mut self, stream: StreamId);
    /// Programs the main stream attributes of `stream` from `descriptor`.
    fn set_video_mode(
        &mut self,
        stream: StreamId,
        descriptor: &StreamDescriptor,
    ) -> Result<(), HilError>;
}

/// Raw access to the transmitter register space.
pub trait DpTxRegisters {
    fn read_reg(&self, offset: u32) -> u32;
    fn write_reg(&mut self, offset: u32, value: u32);
}

/// Everything the engine needs from one transmitter instance.
pub trait DpTxHw: DpTxLink + DpTxMst + DpTxStreams + DpTxRegisters {}

impl<T: DpTxLink + DpTxMst + DpTxStreams + DpTxRegisters> DpTxHw for T {}
