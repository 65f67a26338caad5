// Licensed under the Apache-2.0 license
#![allow(dead_code)]

use dptx_driver::bandwidth::PayloadAllocation;
use dptx_driver::config::DpTxCoreConfig;
use dptx_driver::hil::{DpTxLink, DpTxMst, DpTxRegisters, DpTxStreams, EdidBlock, HilError};
use dptx_driver::link::{LaneCount, LinkConfig, LinkRate};
use dptx_driver::regs::{
    INTERRUPT_MASK, LANE_COUNT_SET, LINK_BW_SET, PHY_POSTCURSOR_LANE_0, PHY_VOLTAGE_DIFF_LANE_0,
};
use dptx_driver::stream::{StreamDescriptor, StreamId, MAX_STREAMS};
use dptx_driver::topology::{SinkNode, Topology};
use dptx_driver::DpTxSubsystem;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::collections::{HashMap, VecDeque};
use video_common::edid::{EDID_BLOCK_SIZE, EDID_HEADER, PREFERRED_TIMING_OFFSET};
use video_common::VideoMode;

pub const INITIAL_INTERRUPT_MASK: u32 = 0x3;
pub const TRAINED_VS_LEVEL: u32 = 2;
pub const TRAINED_PE_LEVEL: u32 = 1;

pub fn init_logger() {
    let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
}

/// Outcome of one scripted `establish_link` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingScript {
    Success,
    Fail,
    /// Trains, but settles on fewer lanes or a lower rate.
    Downshift(LaneCount, LinkRate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    EstablishLink {
        lanes: LaneCount,
        rate: LinkRate,
        interrupt_mask: u32,
    },
    SetAuxDelays(u32, u32),
    EnableMst,
    SortSinks,
    SelectSink(StreamId, usize),
    ClearStreamAttributes(StreamId),
    SetVideoMode(StreamId),
    ClearPayloadTable,
    AllocatePayload(PayloadAllocation),
    WriteReg(u32, u32),
    EnableMainLink,
    DisableMainLink,
}

/// Register-file backed transmitter with a scriptable sink.
pub struct EmulatedDpTx {
    pub connected: bool,
    pub mst_capable: bool,
    pub sink_lanes: LaneCount,
    pub sink_rate: LinkRate,
    pub capability_failure: bool,
    pub training_script: VecDeque<TrainingScript>,
    pub local_edid: Option<EdidBlock>,
    /// EDIDs of the sinks found by topology discovery, in discovery order.
    pub remote_edids: Vec<Option<EdidBlock>>,
    pub payload_failure: bool,
    pub regs: HashMap<u32, u32>,
    pub streams_enabled: [bool; MAX_STREAMS],
    pub programmed: [Option<StreamDescriptor>; MAX_STREAMS],
    pub mst_enabled: bool,
    pub main_link_enabled: bool,
    pub journal: Vec<Op>,
}

impl EmulatedDpTx {
    pub fn new(sink_lanes: LaneCount, sink_rate: LinkRate) -> Self {
        let mut regs = HashMap::new();
        regs.insert(INTERRUPT_MASK, INITIAL_INTERRUPT_MASK);
        Self {
            connected: true,
            mst_capable: false,
            sink_lanes,
            sink_rate,
            capability_failure: false,
            training_script: VecDeque::new(),
            local_edid: None,
            remote_edids: Vec::new(),
            payload_failure: false,
            regs,
            streams_enabled: [false; MAX_STREAMS],
            programmed: [None; MAX_STREAMS],
            mst_enabled: false,
            main_link_enabled: false,
            journal: Vec::new(),
        }
    }

    pub fn sst(sink_lanes: LaneCount, sink_rate: LinkRate, edid: Option<EdidBlock>) -> Self {
        let mut hw = Self::new(sink_lanes, sink_rate);
        hw.local_edid = edid;
        hw
    }

    /// A branch device with `sinks` identical monitors behind it.
    pub fn mst(sink_lanes: LaneCount, sink_rate: LinkRate, sinks: usize, edid: EdidBlock) -> Self {
        let mut hw = Self::new(sink_lanes, sink_rate);
        hw.mst_capable = true;
        hw.remote_edids = vec![Some(edid); sinks];
        hw
    }

    pub fn script(mut self, attempts: &[TrainingScript]) -> Self {
        self.training_script.extend(attempts.iter().copied());
        self
    }

    pub fn writes_to(&self, offset: u32) -> Vec<u32> {
        self.journal
            .iter()
            .filter_map(|op| match op {
                Op::WriteReg(reg, value) if *reg == offset => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Lane count and rate of every training attempt that reached link
    /// establishment.
    pub fn training_attempts(&self) -> Vec<(LaneCount, LinkRate)> {
        self.journal
            .iter()
            .filter_map(|op| match op {
                Op::EstablishLink { lanes, rate, .. } => Some((*lanes, *rate)),
                _ => None,
            })
            .collect()
    }

    pub fn masks_during_training(&self) -> Vec<u32> {
        self.journal
            .iter()
            .filter_map(|op| match op {
                Op::EstablishLink { interrupt_mask, .. } => Some(*interrupt_mask),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, wanted: &Op) -> Option<usize> {
        self.journal.iter().position(|op| op == wanted)
    }
}

impl DpTxLink for EmulatedDpTx {
    fn is_connected(&self) -> bool {
        self.connected
    }

    /// Clamps the reported maxima to the sink. Maxima only narrow across reads, so a test
    /// that widens the sink between starts must reset the link config first.
    fn get_rx_capabilities(&mut self, config: &mut LinkConfig) -> Result<(), HilError> {
        if !self.connected {
            return Err(HilError::NotConnected);
        }
        if self.capability_failure {
            return Err(HilError::AuxFailure);
        }
        config.max_lane_count = config.max_lane_count.min(self.sink_lanes);
        config.max_link_rate = config.max_link_rate.min(self.sink_rate);
        Ok(())
    }

    fn cfg_main_link_max(&mut self, config: &mut LinkConfig) -> Result<(), HilError> {
        config.use_maximum();
        Ok(())
    }

    fn establish_link(&mut self, config: &mut LinkConfig) -> Result<(), HilError> {
        let interrupt_mask = self.read_reg(INTERRUPT_MASK);
        self.journal.push(Op::EstablishLink {
            lanes: config.lane_count,
            rate: config.link_rate,
            interrupt_mask,
        });
        if config.lane_count > self.sink_lanes || config.link_rate > self.sink_rate {
            return Err(HilError::Failure);
        }
        let step = self.training_script.pop_front();
        match step.unwrap_or(TrainingScript::Success) {
            TrainingScript::Success => {}
            TrainingScript::Fail => return Err(HilError::Failure),
            TrainingScript::Downshift(lanes, rate) => {
                config.lane_count = lanes;
                config.link_rate = rate;
            }
        }
        self.regs.insert(LINK_BW_SET, config.link_rate.code() as u32);
        self.regs.insert(LANE_COUNT_SET, config.lane_count.count() as u32);
        self.regs.insert(PHY_VOLTAGE_DIFF_LANE_0, TRAINED_VS_LEVEL);
        self.regs.insert(PHY_POSTCURSOR_LANE_0, TRAINED_PE_LEVEL);
        Ok(())
    }

    fn set_downspread(&mut self, _enable: bool) -> Result<(), HilError> {
        Ok(())
    }

    fn set_enhanced_framing(&mut self, _enable: bool) -> Result<(), HilError> {
        Ok(())
    }

    fn set_training_adaptive(&mut self, _enable: bool) {}

    fn enable_main_link(&mut self) {
        self.main_link_enabled = true;
        self.journal.push(Op::EnableMainLink);
    }

    fn disable_main_link(&mut self) {
        self.main_link_enabled = false;
        self.journal.push(Op::DisableMainLink);
    }

    fn check_link_status(&mut self, lane_count: u8) -> Result<(), HilError> {
        if !self.connected {
            return Err(HilError::NotConnected);
        }
        if lane_count != self.regs.get(&LANE_COUNT_SET).copied().unwrap_or(0) as u8 {
            return Err(HilError::Failure);
        }
        Ok(())
    }

    fn read_local_edid(&mut self) -> Result<EdidBlock, HilError> {
        self.local_edid.ok_or(HilError::AuxFailure)
    }

    fn set_aux_delays(&mut self, aux_delay_us: u32, sideband_delay_us: u32) {
        self.journal
            .push(Op::SetAuxDelays(aux_delay_us, sideband_delay_us));
    }
}

impl DpTxMst for EmulatedDpTx {
    fn is_mst_capable(&mut self) -> Result<(), HilError> {
        if self.mst_capable {
            Ok(())
        } else {
            Err(HilError::NotCapable)
        }
    }

    fn enable_mst(&mut self) -> Result<(), HilError> {
        if !self.connected {
            return Err(HilError::NotConnected);
        }
        self.is_mst_capable()?;
        self.mst_enabled = true;
        self.journal.push(Op::EnableMst);
        Ok(())
    }

    fn disable_mst(&mut self) -> Result<(), HilError> {
        self.mst_enabled = false;
        Ok(())
    }

    fn discover_topology(&mut self, topology: &mut Topology) -> Result<(), HilError> {
        if !self.mst_enabled {
            return Err(HilError::NotCapable);
        }
        for port in 0..self.remote_edids.len() {
            let mut sink = SinkNode {
                link_count_total: 2,
                ..Default::default()
            };
            sink.relative_address.push(1);
            sink.relative_address.push(port as u8);
            topology.sinks.push(sink);
        }
        topology.node_total = self.remote_edids.len() as u8 + 1;
        Ok(())
    }

    fn sort_sinks_by_tiling(&mut self, _topology: &mut Topology) {
        self.journal.push(Op::SortSinks);
    }

    fn read_remote_edid(&mut self, sink: &SinkNode) -> Result<EdidBlock, HilError> {
        let port = *sink
            .relative_address
            .last()
            .ok_or(HilError::InvalidParameter)?;
        self.remote_edids
            .get(port as usize)
            .copied()
            .flatten()
            .ok_or(HilError::AuxFailure)
    }

    fn clear_payload_table(&mut self) -> Result<(), HilError> {
        self.journal.push(Op::ClearPayloadTable);
        Ok(())
    }

    fn allocate_payload_streams(&mut self, allocation: &PayloadAllocation) -> Result<(), HilError> {
        if self.payload_failure {
            return Err(HilError::Timeout);
        }
        self.journal.push(Op::AllocatePayload(*allocation));
        Ok(())
    }
}

impl DpTxStreams for EmulatedDpTx {
    fn enable_stream(&mut self, stream: StreamId) {
        self.streams_enabled[stream.index()] = true;
    }

    fn disable_stream(&mut self, stream: StreamId) {
        self.streams_enabled[stream.index()] = false;
    }

    fn is_stream_enabled(&self, stream: StreamId) -> bool {
        self.streams_enabled[stream.index()]
    }

    fn select_sink_for_stream(&mut self, stream: StreamId, sink_index: usize) {
        self.journal.push(Op::SelectSink(stream, sink_index));
    }

    fn clear_stream_attributes(&mut self, stream: StreamId) {
        self.programmed[stream.index()] = None;
        self.journal.push(Op::ClearStreamAttributes(stream));
    }

    fn set_video_mode(
        &mut self,
        stream: StreamId,
        descriptor: &StreamDescriptor,
    ) -> Result<(), HilError> {
        self.programmed[stream.index()] = Some(*descriptor);
        self.journal.push(Op::SetVideoMode(stream));
        Ok(())
    }
}

impl DpTxRegisters for EmulatedDpTx {
    fn read_reg(&self, offset: u32) -> u32 {
        self.regs.get(&offset).copied().unwrap_or(0)
    }

    fn write_reg(&mut self, offset: u32, value: u32) {
        self.regs.insert(offset, value);
        self.journal.push(Op::WriteReg(offset, value));
    }
}

pub fn subsystem(hw: EmulatedDpTx) -> DpTxSubsystem<EmulatedDpTx> {
    subsystem_with(hw, DpTxCoreConfig::default())
}

pub fn subsystem_with(hw: EmulatedDpTx, config: DpTxCoreConfig) -> DpTxSubsystem<EmulatedDpTx> {
    init_logger();
    DpTxSubsystem::new(hw, config).unwrap()
}

/// Base EDID block whose preferred timing is the given raster.
pub fn edid_with_timing(pixel_clock_10khz: u16, h: [u16; 4], v: [u16; 4]) -> EdidBlock {
    let mut edid = [0u8; EDID_BLOCK_SIZE];
    edid[..8].copy_from_slice(&EDID_HEADER);
    let [h_active, h_fp, h_sync, h_bp] = h;
    let [v_active, v_fp, v_sync, v_bp] = v;
    let h_blank = h_fp + h_sync + h_bp;
    let v_blank = v_fp + v_sync + v_bp;

    let dtd = &mut edid[PREFERRED_TIMING_OFFSET..PREFERRED_TIMING_OFFSET + 18];
    dtd[0..2].copy_from_slice(&pixel_clock_10khz.to_le_bytes());
    dtd[2] = h_active as u8;
    dtd[3] = h_blank as u8;
    dtd[4] = (((h_active >> 8) as u8) << 4) | (h_blank >> 8) as u8;
    dtd[5] = v_active as u8;
    dtd[6] = v_blank as u8;
    dtd[7] = (((v_active >> 8) as u8) << 4) | (v_blank >> 8) as u8;
    dtd[8] = h_fp as u8;
    dtd[9] = h_sync as u8;
    dtd[10] = (((v_fp & 0xF) as u8) << 4) | (v_sync & 0xF) as u8;
    dtd[11] = (((h_fp >> 8) as u8) << 6)
        | (((h_sync >> 8) as u8) << 4)
        | (((v_fp >> 4) as u8) << 2)
        | (v_sync >> 4) as u8;
    dtd[17] = 0x1E;

    let sum = edid[..EDID_BLOCK_SIZE - 1]
        .iter()
        .fold(0u8, |acc, &byte| acc.wrapping_add(byte));
    edid[EDID_BLOCK_SIZE - 1] = 0u8.wrapping_sub(sum);
    edid
}

pub fn edid_for_mode(mode: VideoMode) -> EdidBlock {
    let t = mode.timing();
    edid_with_timing(
        (mode.pixel_clock_hz() / 10_000) as u16,
        [t.h_active, t.h_front_porch, t.h_sync_width, t.h_back_porch],
        [
            t.v_active,
            t.f0_pv_front_porch,
            t.f0_pv_sync_width,
            t.f0_pv_back_porch,
        ],
    )
}
