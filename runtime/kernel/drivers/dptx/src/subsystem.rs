// Licensed under the Apache-2.0 license

use crate::config::DpTxCoreConfig;
use crate::error::DpTxError;
use crate::hil::{DpTxHw, EdidBlock};
use crate::link::{LaneCount, LinkConfig, LinkRate};
use crate::regs::{SoftReset, SOFT_RESET};
use crate::session::{LinkSession, TransportMode};
use crate::stream::{Bpc, ComponentFormat, StreamId, UserPixelWidth};
use crate::training::{LinkTrainingController, TrainingOutcome, TrainingTarget};
use log::{debug, error, info, warn};
use tock_registers::LocalRegisterCopy;
use video_common::msa::CustomMsa;
use video_common::{VideoMode, VideoModeRequest};

/// DisplayPort TX subsystem: user options plus the configuration passes that
/// apply them to one transmitter instance.
pub struct DpTxSubsystem<H: DpTxHw> {
    pub(crate) hw: H,
    pub(crate) config: DpTxCoreConfig,
    pub(crate) session: LinkSession,
}

impl<H: DpTxHw> DpTxSubsystem<H> {
    pub fn new(hw: H, config: DpTxCoreConfig) -> Result<Self, DpTxError> {
        config.validate().map_err(|err| {
            error!("Invalid core configuration: {}", err);
            DpTxError::InvalidParameter
        })?;
        Ok(Self {
            hw,
            session: LinkSession::new(&config),
            config,
        })
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn config(&self) -> &DpTxCoreConfig {
        &self.config
    }

    pub fn session(&self) -> &LinkSession {
        &self.session
    }

    pub fn is_connected(&self) -> bool {
        self.hw.is_connected()
    }

    pub fn is_mst_capable(&mut self) -> bool {
        self.config.mst_supported && self.hw.is_mst_capable().is_ok()
    }

    pub fn set_bpc(&mut self, bpc: u8) -> Result<(), DpTxError> {
        let bpc = Bpc::try_from(bpc)?;
        if bpc > self.config.max_bits_per_color {
            warn!(
                "{} bpc exceeds core maximum of {} bpc",
                bpc.bits(),
                self.config.max_bits_per_color.bits()
            );
            return Err(DpTxError::InvalidParameter);
        }
        self.session.bpc = bpc;
        Ok(())
    }

    pub fn set_component_format(&mut self, format: ComponentFormat) {
        for stream in self.session.streams.iter_mut() {
            stream.component_format = format;
        }
    }

    /// Selects the video mode used by the next configuration pass. In MST
    /// mode 3840x2160@60 is carried as two 1920x2160 tiles.
    pub fn set_video_mode(&mut self, request: VideoModeRequest) {
        let request = match request {
            VideoModeRequest::Standard(VideoMode::Uhd2160p60) if self.session.is_mst() => {
                VideoModeRequest::Standard(VideoMode::PER_TILE_UHD)
            }
            other => other,
        };
        self.session.video_mode = request;
    }

    /// Sets the requested link rate, clamped to the core maximum.
    pub fn set_link_rate(&mut self, rate: LinkRate) {
        let rate = rate.min(self.config.max_link_rate);
        self.session.link_config.link_rate = rate;
        debug!("Requested link rate {:?}", rate);
    }

    /// Sets the requested lane count, clamped to the core maximum.
    pub fn set_lane_count(&mut self, lanes: LaneCount) {
        let lanes = lanes.min(self.config.max_lane_count);
        self.session.link_config.lane_count = lanes;
        debug!("Requested lane count {}", lanes.count());
    }

    pub fn set_transport_mode(&mut self, mode: TransportMode) -> Result<(), DpTxError> {
        match mode {
            TransportMode::MultiStream if !self.config.mst_supported => {
                error!("MST requested but the core does not support MST");
                Err(DpTxError::InvalidParameter)
            }
            TransportMode::MultiStream if self.hw.is_mst_capable().is_err() => {
                warn!("Sink is not MST capable, falling back to SST");
                self.session.transport_mode = TransportMode::SingleStream;
                self.session.num_streams = 1;
                Ok(())
            }
            TransportMode::MultiStream => {
                self.session.transport_mode = TransportMode::MultiStream;
                self.session.num_streams = self.config.num_mst_streams;
                Ok(())
            }
            TransportMode::SingleStream => {
                self.session.transport_mode = TransportMode::SingleStream;
                self.session.num_streams = 1;
                Ok(())
            }
        }
    }

    /// Picks MST when both ends support it, SST otherwise.
    pub fn check_rx_device_mode(&mut self) -> Result<TransportMode, DpTxError> {
        if !self.hw.is_connected() {
            error!("No sink connected");
            return Err(DpTxError::DeviceNotFound);
        }
        if self.is_mst_capable() {
            self.session.transport_mode = TransportMode::MultiStream;
            self.session.num_streams = self.config.num_mst_streams;
        } else {
            self.session.transport_mode = TransportMode::SingleStream;
            self.session.num_streams = 1;
        }
        info!(
            "Sink operating in {:?} with {} stream(s)",
            self.session.transport_mode, self.session.num_streams
        );
        Ok(self.session.transport_mode)
    }

    /// Pins the user pixel width of one stream.
    pub fn set_user_pixel_width(&mut self, width: u8, stream: u8) -> Result<(), DpTxError> {
        let width = UserPixelWidth::try_from(width)?;
        let stream = StreamId::new(stream).ok_or(DpTxError::InvalidParameter)?;
        let desc = &mut self.session.streams[stream.index()];
        desc.user_pixel_width = width;
        desc.override_user_pixel_width = true;
        Ok(())
    }

    /// Loads a custom MSA into one stream descriptor. The pixel clock and
    /// porches are derived at the current link rate.
    pub fn set_custom_msa(&mut self, stream: StreamId, msa: &CustomMsa) -> Result<(), DpTxError> {
        let derived = msa
            .derive(self.session.link_config.link_rate.code())
            .map_err(|err| {
                warn!("Rejected custom MSA for stream {}: {:?}", stream.id(), err);
                DpTxError::InvalidParameter
            })?;
        let desc = &mut self.session.streams[stream.index()];
        desc.clear();
        desc.apply_custom_msa(&derived);
        desc.m_vid = msa.m_vid;
        desc.n_vid = msa.n_vid;
        desc.h_start = msa.h_start;
        desc.v_start = msa.v_start;
        debug!(
            "Stream {} custom MSA: {}x{} at {} Hz, pixel clock {} Hz",
            stream.id(),
            derived.timing.h_active,
            derived.timing.v_active,
            derived.frame_rate,
            derived.pixel_clock_hz
        );
        Ok(())
    }

    /// Applies the same custom MSA to every active stream and runs a
    /// configuration pass with it.
    pub fn start_custom_msa(&mut self, msa: &CustomMsa, bpc: u8) -> Result<(), DpTxError> {
        self.check_rx_device_mode()?;
        self.set_bpc(bpc)?;
        for id in StreamId::ALL
            .into_iter()
            .take(self.session.num_streams as usize)
        {
            self.set_custom_msa(id, msa)?;
        }
        self.session.video_mode = VideoModeRequest::Custom;
        self.start()
    }

    /// Runs a single training attempt without the retry policy.
    pub fn start_link(&mut self, train_max: bool) -> Result<TrainingOutcome, DpTxError> {
        let target = if train_max {
            TrainingTarget::Maximum
        } else {
            TrainingTarget::Requested
        };
        LinkTrainingController::new(&mut self.hw).train(&mut self.session.link_config, target)
    }

    /// Reads the EDID of the sole sink in SST, or of sink `sink` of the last
    /// discovered topology in MST.
    pub fn read_edid(&mut self, sink: usize) -> Result<EdidBlock, DpTxError> {
        if self.session.is_mst() {
            let node = self
                .session
                .topology
                .sinks
                .get(sink)
                .ok_or(DpTxError::InvalidParameter)?;
            Ok(self.hw.read_remote_edid(node)?)
        } else {
            Ok(self.hw.read_local_edid()?)
        }
    }

    /// Re-reads the sink capabilities into the session link config and
    /// returns it.
    pub fn rx_capabilities(&mut self) -> Result<LinkConfig, DpTxError> {
        self.hw.get_rx_capabilities(&mut self.session.link_config)?;
        debug!(
            "Sink maximum {} lanes at {:?}",
            self.session.link_config.max_lane_count.count(),
            self.session.link_config.max_link_rate
        );
        Ok(self.session.link_config)
    }

    /// Pulses the soft reset of every video stream and of HDCP.
    pub fn reset(&mut self) {
        let mut reset = LocalRegisterCopy::<u32, SoftReset::Register>::new(0);
        reset.modify(
            SoftReset::VIDEO_STREAM1::SET
                + SoftReset::VIDEO_STREAM2::SET
                + SoftReset::VIDEO_STREAM3::SET
                + SoftReset::VIDEO_STREAM4::SET
                + SoftReset::HDCP::SET,
        );
        self.hw.write_reg(SOFT_RESET, reset.get());
        self.hw.write_reg(SOFT_RESET, 0);
        info!("Video streams reset");
    }

    pub fn check_link_status(&mut self) -> Result<(), DpTxError> {
        let lanes = self.session.link_config.lane_count.count();
        Ok(self.hw.check_link_status(lanes)?)
    }

    /// Stops video output and releases every stream slot.
    pub fn stop(&mut self) -> Result<(), DpTxError> {
        self.hw.disable_main_link();
        if self.session.is_mst() {
            for id in StreamId::ALL {
                self.hw.disable_stream(id);
            }
            self.hw.disable_mst()?;
        }
        self.session.payload = None;
        info!("DisplayPort TX stopped");
        Ok(())
    }
}
