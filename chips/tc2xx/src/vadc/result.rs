// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Conversion results.
//!
//! Reads never block. A result whose valid flag is clear has not been
//! produced yet (or was already read); callers poll or wait for
//! [`crate::hil::Client::result_ready`]. Without wait-for-read a new
//! conversion may replace an unread one, which sets the overrun flag.

use tock_registers::LocalRegisterCopy;

use super::group::Group;
use super::registers::{self, GLOBEFLAG, GLOBRCR, GLOBRES, RCR, RES, VFR};
use super::{Channel, ChannelId, Error, GroupId, RequestSource, ResultRegister, Vadc};

/// Where a result was stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultSlot {
    Group(GroupId, ResultRegister),
    Global,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversionResult {
    pub value: u16,
    /// The payload is a new conversion that had not been read before.
    pub valid: bool,
    /// At least one earlier result in this slot was replaced unread.
    pub overrun: bool,
    pub channel: ChannelId,
    pub source: RequestSource,
    /// External multiplexer select the sample was taken with.
    pub emux: u8,
    /// Result of a fast compare: at or above the boundary.
    pub fast_compare: bool,
    /// Group the sample came from, for results in the global register.
    pub group: Option<GroupId>,
}

impl Default for ConversionResult {
    /// An empty, invalid result.
    fn default() -> Self {
        ConversionResult {
            value: 0,
            valid: false,
            overrun: false,
            channel: ChannelId::Channel0,
            source: RequestSource::Queue,
            emux: 0,
            fast_compare: false,
            group: None,
        }
    }
}

impl ConversionResult {
    pub(crate) fn from_group(raw: u32, overrun: bool) -> ConversionResult {
        let res = LocalRegisterCopy::<u32, RES::Register>::new(raw);
        ConversionResult {
            value: res.read(RES::RESULT) as u16,
            valid: res.is_set(RES::VF),
            overrun,
            channel: ChannelId::from_index(res.read(RES::CHNR) as usize)
                .unwrap_or(ChannelId::Channel0),
            source: RequestSource::from_slot(res.read(RES::CRS)).unwrap_or(RequestSource::Queue),
            emux: res.read(RES::EMUX) as u8,
            fast_compare: res.is_set(RES::FCR),
            group: None,
        }
    }

    pub(crate) fn from_global(raw: u32, overrun: bool) -> ConversionResult {
        let res = LocalRegisterCopy::<u32, GLOBRES::Register>::new(raw);
        ConversionResult {
            value: res.read(GLOBRES::RESULT) as u16,
            valid: res.is_set(GLOBRES::VF),
            overrun,
            channel: ChannelId::from_index(res.read(GLOBRES::CHNR) as usize)
                .unwrap_or(ChannelId::Channel0),
            source: RequestSource::from_slot(res.read(GLOBRES::CRS))
                .unwrap_or(RequestSource::Background),
            emux: res.read(GLOBRES::EMUX) as u8,
            fast_compare: res.is_set(GLOBRES::FCR),
            group: GroupId::from_index(res.read(GLOBRES::GNR) as usize),
        }
    }
}

impl Group<'_, '_> {
    /// Reads and consumes the latest result of `channel`: the valid and
    /// overrun flags are cleared afterwards.
    pub fn result(&self, channel: &Channel) -> Result<ConversionResult, Error> {
        self.check_owner(channel)?;
        if channel.uses_global_result() {
            Ok(self.vadc.take_global_result())
        } else {
            Ok(self.vadc.take_group_result(self.id, channel.result_register()))
        }
    }

    /// Debug view of the latest result of `channel`; flags stay as they are.
    pub fn peek_result(&self, channel: &Channel) -> Result<ConversionResult, Error> {
        self.check_owner(channel)?;
        let bus = self.vadc.bus;
        if channel.uses_global_result() {
            let overrun = registers::globeflag().is_set(bus, GLOBEFLAG::OVGLB);
            Ok(ConversionResult::from_global(registers::globresd().get(bus), overrun))
        } else {
            let g = self.id.index();
            let r = channel.result_register().index();
            let overrun = registers::vfr(g).read(bus, VFR::OV) & (1 << r) != 0;
            Ok(ConversionResult::from_group(registers::resd(g, r).get(bus), overrun))
        }
    }

    /// Result of `channel` as produced by `source`. Only background
    /// conversions of global-result channels are stored globally.
    pub fn result_for_source(
        &self,
        channel: &Channel,
        source: RequestSource,
    ) -> Result<ConversionResult, Error> {
        self.check_owner(channel)?;
        if source == RequestSource::Background && channel.uses_global_result() {
            Ok(self.vadc.take_global_result())
        } else {
            Ok(self.vadc.take_group_result(self.id, channel.result_register()))
        }
    }

    /// Reads consecutive result registers starting at `first` into `out`.
    /// Returns how many were read.
    pub fn group_results(&self, first: ResultRegister, out: &mut [ConversionResult]) -> usize {
        let mut count = 0;
        for (slot, register) in out.iter_mut().zip(&ResultRegister::ALL[first.index()..]) {
            *slot = self.vadc.take_group_result(self.id, *register);
            count += 1;
        }
        count
    }

    /// Drops an unread result without reading it.
    pub fn clear_result(&self, channel: &Channel) -> Result<(), Error> {
        self.check_owner(channel)?;
        if channel.uses_global_result() {
            // Reading is the only way to clear the global valid flag.
            let _ = self.vadc.take_global_result();
        } else {
            let r = channel.result_register().index();
            registers::vfr(self.id.index()).set(self.vadc.bus, (1 << r) | (1 << (16 + r)));
        }
        Ok(())
    }

    /// With wait-for-read the converter holds a finished conversion until
    /// the previous result in the channel's register has been read.
    pub fn configure_wait_for_read(&self, channel: &Channel, enabled: bool) -> Result<(), Error> {
        self.check_owner(channel)?;
        if channel.uses_global_result() {
            self.vadc.configure_global_wait_for_read(enabled);
        } else {
            registers::rcr(self.id.index(), channel.result_register().index())
                .modify(self.vadc.bus, RCR::WFR.val(enabled as u32));
        }
        Ok(())
    }

    fn check_owner(&self, channel: &Channel) -> Result<(), Error> {
        self.check_live()?;
        if channel.group() == self.id {
            Ok(())
        } else {
            Err(Error::WrongGroup)
        }
    }
}

impl Vadc<'_> {
    /// Reads and consumes the global result register.
    pub fn global_result(&self) -> ConversionResult {
        self.take_global_result()
    }

    pub fn configure_global_wait_for_read(&self, enabled: bool) {
        registers::globrcr().modify(self.bus, GLOBRCR::WFR.val(enabled as u32));
    }

    pub(crate) fn take_group_result(
        &self,
        id: GroupId,
        register: ResultRegister,
    ) -> ConversionResult {
        let g = id.index();
        let r = register.index();
        let overrun = registers::vfr(g).read(self.bus, VFR::OV) & (1 << r) != 0;
        let raw = registers::res(g, r).get(self.bus);
        if overrun {
            registers::vfr(g).set(self.bus, 1 << (16 + r));
        }
        ConversionResult::from_group(raw, overrun)
    }

    pub(crate) fn take_global_result(&self) -> ConversionResult {
        let overrun = registers::globeflag().is_set(self.bus, GLOBEFLAG::OVGLB);
        let raw = registers::globres().get(self.bus);
        if overrun {
            registers::globeflag().write(self.bus, GLOBEFLAG::OVGLBCLR::SET);
        }
        ConversionResult::from_global(raw, overrun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_group_result() {
        let raw = (1 << 31) | (1 << 28) | (5 << 20) | 0x0ABC;
        let result = ConversionResult::from_group(raw, true);
        assert_eq!(result.value, 0x0ABC);
        assert!(result.valid);
        assert!(result.overrun);
        assert_eq!(result.channel, ChannelId::Channel5);
        assert_eq!(result.source, RequestSource::Scan);
        assert_eq!(result.group, None);
    }

    #[test]
    fn decode_global_result() {
        let raw = (2 << 28) | (6 << 16) | (3 << 20) | 0x0123;
        let result = ConversionResult::from_global(raw, false);
        assert!(!result.valid);
        assert_eq!(result.group, Some(GroupId::Group6));
        assert_eq!(result.channel, ChannelId::Channel3);
        assert_eq!(result.source, RequestSource::Background);
    }
}
