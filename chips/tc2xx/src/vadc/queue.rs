// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Queued request source.
//!
//! Entries are converted in the order they were added. An open gate lets the
//! arbiter start on the first entry while later ones are still being added,
//! so filling with the gate open can interleave other sources (or refilled
//! entries) between them. Fill the queue between [`Group::hold_queue_gate`]
//! and [`Group::restore_queue_gate`] to get strict insertion order.

use super::channel::Channel;
use super::group::Group;
use super::registers::{self, QENTRY, QMR, QSR, QUEUE_DEPTH, SRCCTRL};
use super::trigger::{GatingMode, InputSelector, TriggerConfig};
use super::{Error, RequestSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// Drop entries and pending events during `init_group`.
    pub flush_after_init: bool,
    pub trigger: TriggerConfig,
}

impl QueueConfig {
    pub const fn new() -> QueueConfig {
        QueueConfig {
            flush_after_init: true,
            trigger: TriggerConfig::new(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-entry flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueEntryOptions {
    /// Put the entry back at the tail after it has been converted.
    pub refill: bool,
    /// Raise the queue's source event when the entry is converted.
    pub source_interrupt: bool,
    /// Hold the entry until a trigger event arrives.
    pub external_trigger: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueStatus {
    Empty,
    /// Number of valid entries.
    Filled(usize),
    Full,
}

/// Gate state saved by [`Group::hold_queue_gate`].
#[must_use = "the queue gate stays closed until the hold is restored"]
#[derive(Debug)]
pub struct QueueGateHold {
    mode: GatingMode,
    input: InputSelector,
}

impl Group<'_, '_> {
    /// Appends `channel` to the queue.
    pub fn add_to_queue(
        &self,
        channel: &Channel,
        options: QueueEntryOptions,
    ) -> Result<(), Error> {
        self.check_live()?;
        self.check_priority_channel(channel)?;
        if self.queue_status() == QueueStatus::Full {
            log::warn!("vadc: group {} queue full", self.id.index());
            return Err(Error::QueueFull);
        }
        registers::qinr0(self.id.index()).write(
            self.vadc.bus,
            QENTRY::REQCHNR.val(channel.id().index() as u32)
                + QENTRY::RF.val(options.refill as u32)
                + QENTRY::ENSI.val(options.source_interrupt as u32)
                + QENTRY::EXTR.val(options.external_trigger as u32),
        );
        Ok(())
    }

    /// Software trigger: lets the entry at the head of the queue start.
    pub fn start_queue(&self) -> Result<(), Error> {
        self.check_live()?;
        registers::qmr0(self.id.index()).modify(self.vadc.bus, QMR::TREV::SET);
        Ok(())
    }

    /// Drops every queued entry. With `flush`, a pending trigger event and
    /// the started state are dropped too, so a wait-for-start queue needs a
    /// new start.
    pub fn clear_queue(&self, flush: bool) -> Result<(), Error> {
        self.check_live()?;
        self.write_queue_clear(flush);
        Ok(())
    }

    pub(super) fn write_queue_clear(&self, flush: bool) {
        let reg = registers::qmr0(self.id.index());
        if flush {
            reg.modify(self.vadc.bus, QMR::FLUSH::SET + QMR::CLRV::SET + QMR::CEV::SET);
        } else {
            reg.modify(self.vadc.bus, QMR::FLUSH::SET);
        }
    }

    pub fn queue_status(&self) -> QueueStatus {
        let qsr = registers::qsr0(self.id.index()).extract(self.vadc.bus);
        let fill = qsr.read(QSR::FILL) as usize;
        if qsr.is_set(QSR::EMPTY) || fill == 0 {
            QueueStatus::Empty
        } else if fill >= QUEUE_DEPTH {
            QueueStatus::Full
        } else {
            QueueStatus::Filled(fill)
        }
    }

    /// Closes the queue gate and returns what it was set to.
    ///
    /// First half of filling the queue in order: hold, add entries, then
    /// [`Group::restore_queue_gate`].
    pub fn hold_queue_gate(&self) -> Result<QueueGateHold, Error> {
        self.check_live()?;
        let gtsel = registers::qctrl0(self.id.index()).read(self.vadc.bus, SRCCTRL::GTSEL);
        let hold = QueueGateHold {
            mode: self.read_gating_mode(RequestSource::Queue),
            input: InputSelector::from_raw(gtsel),
        };
        self.write_gating_mode(RequestSource::Queue, GatingMode::Disabled);
        Ok(hold)
    }

    /// Reopens the queue gate as it was before the matching hold.
    pub fn restore_queue_gate(&self, hold: QueueGateHold) -> Result<(), Error> {
        self.check_live()?;
        registers::qctrl0(self.id.index()).modify(
            self.vadc.bus,
            SRCCTRL::GTSEL.val(hold.input.index() as u32) + SRCCTRL::GTWC::SET,
        );
        self.write_gating_mode(RequestSource::Queue, hold.mode);
        Ok(())
    }

    /// Queue and scan only take channels assigned to the group's priority
    /// path.
    pub(crate) fn check_priority_channel(&self, channel: &Channel) -> Result<(), Error> {
        if channel.group() != self.id {
            return Err(Error::WrongGroup);
        }
        if channel.is_background() {
            return Err(Error::ChannelConflict);
        }
        Ok(())
    }
}
