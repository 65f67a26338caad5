// Licensed under the Apache-2.0 license

use crate::error::DpTxError;
use crate::hil::{DpTxHw, DpTxRegisters};
use crate::link::LinkConfig;
use crate::regs::{
    InterruptMask, PhyPostcursor, PhyVoltageDiff, INTERRUPT_MASK, PHY_POSTCURSOR_LANE_0,
    PHY_VOLTAGE_DIFF_LANE_0,
};
use core::ops::{Deref, DerefMut};
use log::{debug, error, info, warn};
use tock_registers::LocalRegisterCopy;

/// Which link parameters a training attempt uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingTarget {
    /// Whatever lane count and rate the session currently holds.
    Requested,
    /// The common maximum of sink and transmitter.
    Maximum,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainingOutcome {
    pub downshifted: bool,
}

/// Masks the HPD pulse interrupt while alive and restores the previous mask
/// when dropped.
struct HpdPulseMask<'a, H: DpTxRegisters> {
    hw: &'a mut H,
    saved: u32,
}

impl<'a, H: DpTxRegisters> HpdPulseMask<'a, H> {
    fn new(hw: &'a mut H) -> Self {
        let saved = hw.read_reg(INTERRUPT_MASK);
        let mut mask = LocalRegisterCopy::<u32, InterruptMask::Register>::new(saved);
        mask.modify(InterruptMask::HPD_PULSE_DETECTED::SET);
        hw.write_reg(INTERRUPT_MASK, mask.get());
        Self { hw, saved }
    }
}

impl<H: DpTxRegisters> Deref for HpdPulseMask<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.hw
    }
}

impl<H: DpTxRegisters> DerefMut for HpdPulseMask<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.hw
    }
}

impl<H: DpTxRegisters> Drop for HpdPulseMask<'_, H> {
    fn drop(&mut self) {
        self.hw.write_reg(INTERRUPT_MASK, self.saved);
    }
}

/// Runs a single link training attempt. Retry escalation belongs to the
/// caller.
pub struct LinkTrainingController<'a, H: DpTxHw> {
    hw: &'a mut H,
}

impl<'a, H: DpTxHw> LinkTrainingController<'a, H> {
    pub fn new(hw: &'a mut H) -> Self {
        Self { hw }
    }

    /// Trains the main link.
    ///
    /// # Arguments
    /// * `link` - Session link parameters. Updated with the sink maxima, the
    ///   parameters the link settled on and the drive levels in use.
    /// * `target` - Parameters to attempt.
    ///
    /// # Returns
    /// `DeviceNotFound` if the sink does not answer the capability queries,
    /// `TrainingFailed` if the link could not be established.
    pub fn train(
        &mut self,
        link: &mut LinkConfig,
        target: TrainingTarget,
    ) -> Result<TrainingOutcome, DpTxError> {
        let mut hw = HpdPulseMask::new(&mut *self.hw);
        info!("Starting link training at {:?} parameters", target);

        hw.get_rx_capabilities(link).map_err(|err| {
            error!("Failed to read sink capabilities: {:?}", err);
            DpTxError::DeviceNotFound
        })?;

        hw.set_downspread(true)?;
        hw.set_enhanced_framing(true)?;

        if target == TrainingTarget::Maximum {
            hw.cfg_main_link_max(link).map_err(|err| {
                error!("Failed to configure maximum link parameters: {:?}", err);
                DpTxError::DeviceNotFound
            })?;
        }

        let requested = *link;
        hw.establish_link(link).map_err(|err| {
            warn!(
                "Link training failed with {} lanes at {:?}: {:?}",
                requested.lane_count.count(),
                requested.link_rate,
                err
            );
            DpTxError::TrainingFailed
        })?;

        if !link.within_maxima() {
            error!(
                "Link settled at {} lanes at {:?}, above the maximum of {} lanes at {:?}",
                link.lane_count.count(),
                link.link_rate,
                link.max_lane_count.count(),
                link.max_link_rate
            );
            return Err(DpTxError::TrainingFailed);
        }

        let downshifted = link.is_downshift_from(&requested);
        if link.link_rate != requested.link_rate {
            warn!(
                "Link rate downshifted from {:?} to {:?}",
                requested.link_rate, link.link_rate
            );
        }
        if link.lane_count != requested.lane_count {
            warn!(
                "Lane count downshifted from {} to {}",
                requested.lane_count.count(),
                link.lane_count.count()
            );
        }

        let vs = LocalRegisterCopy::<u32, PhyVoltageDiff::Register>::new(
            hw.read_reg(PHY_VOLTAGE_DIFF_LANE_0),
        );
        let pe = LocalRegisterCopy::<u32, PhyPostcursor::Register>::new(
            hw.read_reg(PHY_POSTCURSOR_LANE_0),
        );
        link.vs_level = vs.read(PhyVoltageDiff::LEVEL) as u8;
        link.pe_level = pe.read(PhyPostcursor::LEVEL) as u8;
        debug!(
            "Link trained: {} lanes at {:?}, VS level {}, PE level {}",
            link.lane_count.count(),
            link.link_rate,
            link.vs_level,
            link.pe_level
        );

        Ok(TrainingOutcome { downshifted })
    }
}
