// Licensed under the Apache-2.0 license

//! Configuration pass: topology, training, admission, stream programming
//! and payload allocation, ending with the main link enabled.

use crate::bandwidth::{self, Admission, AdmissionRequest, PayloadAllocation};
use crate::error::DpTxError;
use crate::hil::{DpTxHw, EdidBlock, HilError};
use crate::packing::packing_clock_slower;
use crate::regs::{AudioControl, PackingClockControl, AUDIO_CONTROL, VIDEO_PACKING_CLOCK_CONTROL};
use crate::session::TransportMode;
use crate::stream::{bits_per_pixel, Bpc, StreamId, UserPixelWidth, MAX_STREAMS};
use crate::subsystem::DpTxSubsystem;
use crate::topology;
use crate::training::{LinkTrainingController, TrainingTarget};
use crate::training_sm::{new_retry_policy, Events, RetryContext, StateMachine, States};
use log::{debug, error, info, warn};
use tock_registers::LocalRegisterCopy;
use video_common::edid::{self, preferred_video_mode};
use video_common::{VideoMode, VideoModeRequest};

const MST_AUX_DELAY_US: u32 = 30_000;
const MST_SIDEBAND_DELAY_US: u32 = 30_000;

/// Streams at or below this pixel clock with a very wide raster need two
/// pixels per clock so the total-width field does not overflow.
const NARROW_PIXEL_WIDTH_MAX_CLOCK_HZ: u64 = 75_000_000;
const NARROW_PIXEL_WIDTH_MAX_H_TOTAL: u16 = 4095;

type RetryPolicy = StateMachine<RetryContext>;

impl<H: DpTxHw> DpTxSubsystem<H> {
    /// Selects the transport mode, color depth and video mode, then runs a
    /// configuration pass.
    pub fn start_with(
        &mut self,
        mode: TransportMode,
        bpc: Bpc,
        request: VideoModeRequest,
    ) -> Result<(), DpTxError> {
        self.set_transport_mode(mode)?;
        self.set_bpc(bpc.into())?;
        self.set_video_mode(request);
        self.start()
    }

    /// Runs a configuration pass with the current user options.
    pub fn start(&mut self) -> Result<(), DpTxError> {
        if self.session.video_mode == VideoModeRequest::Custom
            && self.session.streams[0].pixel_clock_hz == 0
        {
            error!("Custom video mode requested without a custom MSA");
            return Err(DpTxError::InvalidParameter);
        }

        self.session.diagnostics = Default::default();
        self.session.payload = None;

        match self.session.transport_mode {
            TransportMode::MultiStream => self.start_mst()?,
            TransportMode::SingleStream => self.start_sst()?,
        }

        self.enable_output();
        Ok(())
    }

    fn start_mst(&mut self) -> Result<(), DpTxError> {
        info!("Starting MST configuration");
        self.hw.enable_mst().map_err(|err| {
            match err {
                HilError::NotConnected => {
                    error!("MST: no connection exists, verify cable and monitor")
                }
                other => error!(
                    "MST: verify MST capabilities of the transmitter and sink: {:?}",
                    other
                ),
            }
            DpTxError::DeviceNotFound
        })?;
        self.hw.set_aux_delays(MST_AUX_DELAY_US, MST_SIDEBAND_DELAY_US);

        self.discover_topology()?;

        self.hw.set_training_adaptive(true);
        self.hw.disable_main_link();

        let mut policy = new_retry_policy();
        self.train_until_settled(&mut policy)?;
        self.report_link_status();

        let edid = self.read_sink_edid();
        let mut mode = self.resolve_video_mode(edid.as_ref());
        if let Some(requested) = mode {
            let decision = topology::normalize(self.session.topology.sink_total(), requested);
            if decision.reorder_requested {
                info!("MST: reordering sinks by tile group");
                self.hw.sort_sinks_by_tiling(&mut self.session.topology);
            }
            if decision.adjusted_mode != requested {
                info!(
                    "MST: driving each tile at {}",
                    decision.adjusted_mode.name()
                );
            }
            mode = Some(decision.adjusted_mode);
        }

        self.assign_streams_to_sinks();

        let pixel_clock_hz = self.pixel_clock_for(mode);
        let admission = self.admit_with_retrain(&mut policy, pixel_clock_hz)?;
        self.configure_mst_streams(mode)?;
        if let Admission::MultiStream(allocation) = admission {
            self.commit_payload(allocation)?;
        }
        Ok(())
    }

    fn start_sst(&mut self) -> Result<(), DpTxError> {
        info!("Starting SST configuration");
        if let Err(err) = self.hw.disable_mst() {
            debug!("Ignoring MST disable failure: {:?}", err);
        }
        self.hw.set_aux_delays(0, 0);
        self.session.num_streams = 1;

        self.hw.set_training_adaptive(true);
        self.hw.disable_main_link();

        let mut policy = new_retry_policy();
        self.train_until_settled(&mut policy)?;
        self.report_link_status();

        let edid = self.read_sink_edid();
        let mode = self.resolve_video_mode(edid.as_ref());

        let pixel_clock_hz = self.pixel_clock_for(mode);
        self.admit_with_retrain(&mut policy, pixel_clock_hz)?;

        for id in StreamId::ALL {
            self.hw.clear_stream_attributes(id);
        }
        let bpc = self.session.bpc;
        match mode {
            Some(mode) => {
                for desc in self.session.streams.iter_mut() {
                    desc.clear();
                }
                let desc = &mut self.session.streams[0];
                desc.dynamic_range = 0;
                desc.colorimetry = 0;
                desc.synchronous_clock_mode = false;
                desc.bpc = bpc;
                desc.apply_standard_mode(mode);
                if mode == VideoMode::PER_TILE_UHD {
                    desc.default_user_pixel_width(UserPixelWidth::Four);
                }
            }
            None => {
                let desc = &mut self.session.streams[0];
                desc.synchronous_clock_mode = true;
                desc.bpc = bpc;
            }
        }
        let desc = &mut self.session.streams[0];
        if desc.pixel_clock_hz <= NARROW_PIXEL_WIDTH_MAX_CLOCK_HZ
            && desc.timing.h_total > NARROW_PIXEL_WIDTH_MAX_H_TOTAL
            && desc.user_pixel_width == UserPixelWidth::One
        {
            desc.user_pixel_width = UserPixelWidth::Two;
        }

        self.hw.set_video_mode(StreamId::STREAM1, &self.session.streams[0])?;
        self.reset();
        Ok(())
    }

    fn discover_topology(&mut self) -> Result<(), DpTxError> {
        info!("MST: discovering topology");
        self.session.topology.clear();
        self.hw
            .discover_topology(&mut self.session.topology)
            .map_err(|err| {
                error!("MST: topology discovery failed: {:?}", err);
                DpTxError::DeviceNotFound
            })?;

        let sinks = self.session.topology.sink_total();
        if sinks == 0 {
            error!("MST: no sinks found");
            return Err(DpTxError::DeviceNotFound);
        }
        let limit = (self.config.mst_stream_limit() as usize).min(MAX_STREAMS);
        self.session.num_streams = sinks.min(limit) as u8;
        info!(
            "MST: {} sink(s) found, driving {} stream(s)",
            sinks, self.session.num_streams
        );
        Ok(())
    }

    /// Trains until the policy reports a trained link or gives up.
    fn train_until_settled(&mut self, policy: &mut RetryPolicy) -> Result<(), DpTxError> {
        let mut last_error = DpTxError::TrainingFailed;
        loop {
            let target = match *policy.state() {
                States::TrainAtRequested => TrainingTarget::Requested,
                States::TrainAtMaximum => TrainingTarget::Maximum,
                States::Trained | States::Admitted => return Ok(()),
                States::Terminal => {
                    error!("Link training failed: {}", last_error);
                    return Err(last_error);
                }
            };

            let event = match LinkTrainingController::new(&mut self.hw)
                .train(&mut self.session.link_config, target)
            {
                Ok(outcome) => {
                    let diagnostics = &mut self.session.diagnostics;
                    diagnostics.downshift_detected |= outcome.downshifted;
                    if target == TrainingTarget::Maximum {
                        diagnostics.trained_at_maximum = true;
                    }
                    Events::AttemptSucceeded
                }
                Err(err) => {
                    last_error = err;
                    Events::AttemptFailed
                }
            };
            policy
                .process_event(event)
                .map_err(|_| DpTxError::TrainingFailed)?;
        }
    }

    /// Admits the video configuration, retraining at maximum once if the link
    /// is oversubscribed. Admission always runs against the link as trained.
    fn admit_with_retrain(
        &mut self,
        policy: &mut RetryPolicy,
        pixel_clock_hz: u64,
    ) -> Result<Admission, DpTxError> {
        loop {
            let request = self.admission_request(pixel_clock_hz);
            match bandwidth::admit(
                &self.session.link_config,
                self.session.transport_mode,
                &request,
            ) {
                Ok(admission) => {
                    policy
                        .process_event(Events::AdmissionAccepted)
                        .map_err(|_| DpTxError::Oversubscribed)?;
                    return Ok(admission);
                }
                Err(err) => {
                    if policy.process_event(Events::AdmissionRejected).is_err() {
                        error!("Link oversubscribed after retraining at maximum: {}", err);
                        return Err(DpTxError::Oversubscribed);
                    }
                    warn!("{}; retraining at maximum link parameters", err);
                    self.session.diagnostics.retrained_for_bandwidth = true;
                    self.train_until_settled(policy)?;
                }
            }
        }
    }

    fn admission_request(&self, pixel_clock_hz: u64) -> AdmissionRequest {
        let mut enabled_streams = [false; MAX_STREAMS];
        for (enabled, id) in enabled_streams.iter_mut().zip(StreamId::ALL) {
            *enabled = self.hw.is_stream_enabled(id);
        }
        AdmissionRequest {
            bits_per_pixel: bits_per_pixel(
                self.session.streams[0].component_format,
                self.session.bpc,
            ),
            pixel_clock_hz,
            payload_data_width: self.config.payload_data_width,
            enabled_streams,
        }
    }

    /// Pixel clock of the resolved mode, or of the custom stream 1 timing.
    fn pixel_clock_for(&self, mode: Option<VideoMode>) -> u64 {
        match mode {
            Some(mode) => mode.pixel_clock_hz(),
            None => self.session.streams[0].pixel_clock_hz,
        }
    }

    /// Reads the EDID of the first sink. Failures are reported and leave the
    /// preferred mode undecodable.
    fn read_sink_edid(&mut self) -> Option<EdidBlock> {
        let result = if self.session.is_mst() {
            match self.session.topology.sinks.first() {
                Some(sink) => self.hw.read_remote_edid(sink),
                None => Err(HilError::NotConnected),
            }
        } else {
            self.hw.read_local_edid()
        };

        match result {
            Ok(block) => {
                let valid =
                    edid::verify_header(&block).is_ok() && edid::verify_checksum(&block).is_ok();
                if !valid {
                    warn!("Sink EDID failed header or checksum validation");
                }
                self.session.diagnostics.sink_edid_valid = valid;
                Some(block)
            }
            Err(err) => {
                warn!("Failed to read sink EDID: {:?}", err);
                None
            }
        }
    }

    /// Returns the standard mode to drive, or `None` for a custom timing.
    fn resolve_video_mode(&self, edid: Option<&EdidBlock>) -> Option<VideoMode> {
        match self.session.video_mode {
            VideoModeRequest::Custom => {
                info!("Using custom video timing");
                None
            }
            VideoModeRequest::Standard(mode) => {
                info!("Using requested video mode {}", mode.name());
                Some(mode)
            }
            VideoModeRequest::EdidPreferred => {
                let mode = edid
                    .and_then(|block| preferred_video_mode(block))
                    .unwrap_or_else(|| {
                        warn!("Preferred timing not in the mode table, using 640x480");
                        VideoMode::Vga60
                    });
                info!("Using EDID preferred video mode {}", mode.name());
                Some(mode)
            }
        }
    }

    fn assign_streams_to_sinks(&mut self) {
        let active = self.session.num_streams as usize;
        for (index, id) in StreamId::ALL.into_iter().enumerate() {
            if index < active {
                debug!("MST: enabling stream {}", id.id());
                self.hw.enable_stream(id);
                self.hw.select_sink_for_stream(id, index);
            } else {
                debug!("MST: disabling stream {}", id.id());
                self.hw.disable_stream(id);
            }
        }
    }

    fn configure_mst_streams(&mut self, mode: Option<VideoMode>) -> Result<(), DpTxError> {
        let bpc = self.session.bpc;
        for id in StreamId::ALL {
            if !self.hw.is_stream_enabled(id) {
                continue;
            }
            let desc = &mut self.session.streams[id.index()];
            match mode {
                None => {
                    desc.bpc = bpc;
                    desc.synchronous_clock_mode = true;
                    if desc.timing.h_active == 1920 && desc.timing.v_active == 2160 {
                        desc.default_user_pixel_width(UserPixelWidth::Four);
                    }
                }
                Some(mode) => {
                    self.hw.clear_stream_attributes(id);
                    desc.clear();
                    desc.bpc = bpc;
                    desc.synchronous_clock_mode = false;
                    desc.apply_standard_mode(mode);
                    if mode == VideoMode::PER_TILE_UHD {
                        desc.default_user_pixel_width(UserPixelWidth::Four);
                    }
                }
            }
            debug!(
                "MST: stream {} at {} bpc, pixel clock {} Hz",
                id.id(),
                bpc.bits(),
                desc.pixel_clock_hz
            );
            self.hw.set_video_mode(id, desc)?;
        }
        Ok(())
    }

    fn commit_payload(&mut self, allocation: PayloadAllocation) -> Result<(), DpTxError> {
        self.hw.clear_payload_table().map_err(|err| {
            error!("MST: clearing payload table failed: {:?}", err);
            DpTxError::DataLost
        })?;
        self.hw
            .allocate_payload_streams(&allocation)
            .map_err(|err| {
                error!("MST: payload allocation failed: {:?}", err);
                DpTxError::DataLost
            })?;
        info!(
            "MST: allocated {} time slots {:?}",
            allocation.total_time_slots, allocation.per_stream_time_slots
        );
        self.session.payload = Some(allocation);
        Ok(())
    }

    fn configure_packing_clock(&mut self) {
        let desc = &self.session.streams[0];
        let Some(slower) = packing_clock_slower(
            self.config.payload_data_width,
            self.session.bpc,
            desc.pixel_clock_hz,
            desc.user_pixel_width,
            self.session.link_config.link_rate,
        ) else {
            return;
        };
        let mut control = LocalRegisterCopy::<u32, PackingClockControl::Register>::new(0);
        if slower {
            control.modify(PackingClockControl::PACKING_CLOCK_SLOWER::SET);
        }
        self.hw.write_reg(VIDEO_PACKING_CLOCK_CONTROL, control.get());
    }

    fn report_link_status(&mut self) {
        let lanes = self.session.link_config.lane_count.count();
        let ok = self.hw.check_link_status(lanes).is_ok();
        if ok {
            info!("Link is up with {} lane(s)", lanes);
        } else {
            warn!("Link status check failed");
        }
        self.session.diagnostics.link_status_ok = ok;
    }

    fn enable_output(&mut self) {
        self.configure_packing_clock();
        self.hw.enable_main_link();
        self.report_link_status();
        if self.config.audio_enable {
            let mut audio = LocalRegisterCopy::<u32, AudioControl::Register>::new(0);
            audio.modify(AudioControl::ENABLE::SET);
            self.hw.write_reg(AUDIO_CONTROL, audio.get());
        }
        info!("DisplayPort TX started");
    }
}
