// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Scan and background scan request sources.
//!
//! Both keep a select mask of channels. A load event copies the select mask
//! into the pending mask; pending channels are converted highest number
//! first. With autoscan the pending mask is reloaded when it runs empty,
//! otherwise every pass needs a new load event.
//!
//! The background scan is a single module-wide source with one select mask
//! per group. It only accepts channels marked as background channels, and
//! the group scan only accepts the others.

use super::group::Group;
use super::registers::{self, CHASS, CHSEL, SRCMR};
use super::trigger::TriggerConfig;
use super::{Error, GroupId, Vadc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanConfig {
    /// Reload the pending channels at the end of every pass.
    pub autoscan: bool,
    pub trigger: TriggerConfig,
}

impl ScanConfig {
    pub const fn new() -> ScanConfig {
        ScanConfig {
            autoscan: false,
            trigger: TriggerConfig::new(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanStatus {
    Idle,
    ChannelsPending,
}

/// `select` with the bits in `mask` replaced by those of `channels`.
pub const fn apply_mask(select: u16, channels: u16, mask: u16) -> u16 {
    (select & !mask) | (channels & mask)
}

impl Group<'_, '_> {
    /// Updates the scan select mask. Only bits set in `mask` change; they
    /// take the value of the matching bit of `channels`.
    pub fn set_scan(&self, channels: u16, mask: u16) -> Result<(), Error> {
        self.check_live()?;
        let g = self.id.index();
        let priority = registers::chass(g).read(self.vadc.bus, CHASS::ASSCH) as u16;
        let background = self.vadc.configured_channels[g].get() & !priority;
        if channels & mask & background != 0 {
            log::warn!(
                "vadc: group {} scan refused background channels {:#06x}",
                g,
                channels & mask & background
            );
            return Err(Error::ChannelConflict);
        }
        let reg = registers::assel(g);
        let select = reg.read(self.vadc.bus, CHSEL::CH) as u16;
        reg.write(self.vadc.bus, CHSEL::CH.val(apply_mask(select, channels, mask) as u32));
        Ok(())
    }

    pub fn scan_select(&self) -> u16 {
        registers::assel(self.id.index()).read(self.vadc.bus, CHSEL::CH) as u16
    }

    /// Load event: every selected channel becomes pending.
    pub fn start_scan(&self) -> Result<(), Error> {
        self.check_live()?;
        registers::asmr(self.id.index()).modify(self.vadc.bus, SRCMR::LDEV::SET);
        Ok(())
    }

    /// Drops the pending channels of the current pass.
    pub fn stop_scan(&self) -> Result<(), Error> {
        self.check_live()?;
        registers::asmr(self.id.index()).modify(self.vadc.bus, SRCMR::CLRPND::SET);
        Ok(())
    }

    pub fn scan_status(&self) -> ScanStatus {
        if registers::aspnd(self.id.index()).read(self.vadc.bus, CHSEL::CH) != 0 {
            ScanStatus::ChannelsPending
        } else {
            ScanStatus::Idle
        }
    }

    pub fn set_autoscan(&self, enable: bool) -> Result<(), Error> {
        self.check_live()?;
        registers::asmr(self.id.index()).modify(self.vadc.bus, SRCMR::SCAN.val(enable as u32));
        Ok(())
    }

    /// Raise the scan source event at the end of each pass.
    pub fn enable_scan_source_interrupt(&self, enable: bool) -> Result<(), Error> {
        self.check_live()?;
        registers::asmr(self.id.index()).modify(self.vadc.bus, SRCMR::ENSI.val(enable as u32));
        Ok(())
    }
}

impl Vadc<'_> {
    /// Updates the background select mask of `group`, like
    /// [`Group::set_scan`]. Only background channels are accepted.
    pub fn set_background_scan(
        &self,
        group: &Group,
        channels: u16,
        mask: u16,
    ) -> Result<(), Error> {
        group.check_live()?;
        let g = group.id().index();
        let priority = registers::chass(g).read(self.bus, CHASS::ASSCH) as u16;
        if channels & mask & priority != 0 {
            log::warn!(
                "vadc: group {} background scan refused priority channels {:#06x}",
                g,
                channels & mask & priority
            );
            return Err(Error::ChannelConflict);
        }
        let reg = registers::brssel(g);
        let select = reg.read(self.bus, CHSEL::CH) as u16;
        reg.write(self.bus, CHSEL::CH.val(apply_mask(select, channels, mask) as u32));
        Ok(())
    }

    pub fn background_scan_select(&self, group: GroupId) -> u16 {
        registers::brssel(group.index()).read(self.bus, CHSEL::CH) as u16
    }

    /// Load event for the background scan of every group.
    pub fn start_background_scan(&self) {
        registers::brsmr().modify(self.bus, SRCMR::LDEV::SET);
    }

    pub fn stop_background_scan(&self) {
        registers::brsmr().modify(self.bus, SRCMR::CLRPND::SET);
    }

    pub fn background_scan_status(&self) -> ScanStatus {
        let pending = GroupId::ALL
            .iter()
            .any(|id| registers::brspnd(id.index()).read(self.bus, CHSEL::CH) != 0);
        if pending {
            ScanStatus::ChannelsPending
        } else {
            ScanStatus::Idle
        }
    }

    pub fn set_background_autoscan(&self, enable: bool) {
        registers::brsmr().modify(self.bus, SRCMR::SCAN.val(enable as u32));
    }

    pub fn enable_background_source_interrupt(&self, enable: bool) {
        registers::brsmr().modify(self.bus, SRCMR::ENSI.val(enable as u32));
    }
}

#[cfg(test)]
mod tests {
    use super::apply_mask;

    #[test]
    fn mask_leaves_other_channels_alone() {
        assert_eq!(apply_mask(0b1000_0001, 0b0010_0100, 0b0010_0100), 0b1010_0101);
        assert_eq!(apply_mask(0b1111, 0b0000, 0b0101), 0b1010);
        assert_eq!(apply_mask(0b1111, 0b1111_0000, 0), 0b1111);
    }
}
