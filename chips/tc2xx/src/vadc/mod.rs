// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Versatile Analog-to-Digital Converter (VADC).
//!
//! The peripheral has eight conversion groups. Each group owns one analog
//! converter that three request sources compete for: a queue, a scan
//! source, and the module-wide background scan. The group arbiter picks a
//! winner in fixed-length arbitration rounds, groups can be chained into
//! synchronized clusters, and completed conversions land in result
//! registers that software polls or receives through [`Client`].
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let vadc = Vadc::new(&bus, &router);
//! vadc.init_module(&ModuleConfig::new())?;
//!
//! let mut config = GroupConfig::new(GroupId::Group3);
//! config.arbiter.scan.enabled = true;
//! config.scan.trigger.gating_mode = GatingMode::Always;
//! let group = vadc.init_group(&config)?;
//!
//! let mut ch = ChannelConfig::new(ChannelId::Channel2);
//! ch.result_register = ResultRegister::Result2;
//! let channel = group.init_channel(&ch)?;
//!
//! group.set_scan(0b100100, 0b100100)?;
//! group.start_scan()?;
//! ```

use core::cell::Cell;

use tock_registers::fields::Field;

use crate::bus::RegisterBus;
use crate::hil::{Client, InterruptRouter};

pub mod arbiter;
pub mod channel;
pub mod clock;
pub mod emulator;
pub mod emux;
pub mod group;
pub mod interrupt;
pub mod module;
pub mod queue;
pub(crate) mod registers;
pub mod result;
pub mod scan;
pub mod sync;
pub mod trigger;

pub use arbiter::{
    ArbiterConfig, ArbitrationRound, RequestSlotConfig, RequestSlotPriority, RequestSource,
    StartMode,
};
pub use channel::{
    BoundaryMode, BoundarySelect, Channel, ChannelConfig, InputClass, LimitCheck, Reference,
};
pub use emulator::{Emulator, SignalTarget};
pub use emux::{
    EmuxCoding, EmuxConfig, EmuxInterface, EmuxMode, EmuxPinConfig, EmuxSampleTime,
    EmuxSelectionStyle,
};
pub use group::{Group, GroupConfig};
pub use interrupt::{InterruptBinding, ServiceNode, ServiceRequest};
pub use module::{InputClassConfig, ModuleConfig, Resolution, SupplyVoltage};
pub use queue::{QueueConfig, QueueEntryOptions, QueueGateHold, QueueStatus};
pub use result::{ConversionResult, ResultSlot};
pub use scan::{ScanConfig, ScanStatus};
pub use trigger::{GatingMode, InputSelector, TriggerConfig, TriggerMode};

use registers::{ACCPROT0, CHANNEL_COUNT, GROUP_COUNT};

/// Failures of configuration calls.
///
/// Conversions still in flight and overwritten results are not errors; they
/// are reported by the valid and overrun flags of [`ConversionResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// A clock, divider or sample time has no hardware representation.
    ConfigurationInfeasible,
    /// Master and slave are not in the same synchronization domain.
    TopologyInvalid,
    /// A slave group was initialised before its master.
    MasterNotInitialized,
    /// The group or channel is already configured. Deinitialise first.
    AlreadyInitialized,
    /// Background channels may only be background scanned, priority channels
    /// never.
    ChannelConflict,
    /// The channel belongs to another group.
    WrongGroup,
    /// The queue already holds eight entries.
    QueueFull,
    /// Gating is implied by the extended trigger input.
    GatingAliased,
    /// The handle outlived a `deinit` or module reset of its group.
    NotInitialized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupId {
    Group0 = 0,
    Group1 = 1,
    Group2 = 2,
    Group3 = 3,
    Group4 = 4,
    Group5 = 5,
    Group6 = 6,
    Group7 = 7,
}

impl GroupId {
    pub const ALL: [GroupId; GROUP_COUNT] = [
        GroupId::Group0,
        GroupId::Group1,
        GroupId::Group2,
        GroupId::Group3,
        GroupId::Group4,
        GroupId::Group5,
        GroupId::Group6,
        GroupId::Group7,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<GroupId> {
        GroupId::ALL.get(index).copied()
    }

    /// Synchronization domain: groups 0-3 are domain 0, groups 4-7 domain 1.
    pub const fn domain(self) -> usize {
        self.index() / 4
    }

    const fn bit(self) -> u8 {
        1 << self.index()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChannelId {
    Channel0 = 0,
    Channel1 = 1,
    Channel2 = 2,
    Channel3 = 3,
    Channel4 = 4,
    Channel5 = 5,
    Channel6 = 6,
    Channel7 = 7,
    Channel8 = 8,
    Channel9 = 9,
    Channel10 = 10,
    Channel11 = 11,
    Channel12 = 12,
    Channel13 = 13,
    Channel14 = 14,
    Channel15 = 15,
}

impl ChannelId {
    pub const ALL: [ChannelId; CHANNEL_COUNT] = [
        ChannelId::Channel0,
        ChannelId::Channel1,
        ChannelId::Channel2,
        ChannelId::Channel3,
        ChannelId::Channel4,
        ChannelId::Channel5,
        ChannelId::Channel6,
        ChannelId::Channel7,
        ChannelId::Channel8,
        ChannelId::Channel9,
        ChannelId::Channel10,
        ChannelId::Channel11,
        ChannelId::Channel12,
        ChannelId::Channel13,
        ChannelId::Channel14,
        ChannelId::Channel15,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<ChannelId> {
        ChannelId::ALL.get(index).copied()
    }

    pub const fn mask(self) -> u16 {
        1 << self.index()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResultRegister {
    Result0 = 0,
    Result1 = 1,
    Result2 = 2,
    Result3 = 3,
    Result4 = 4,
    Result5 = 5,
    Result6 = 6,
    Result7 = 7,
    Result8 = 8,
    Result9 = 9,
    Result10 = 10,
    Result11 = 11,
    Result12 = 12,
    Result13 = 13,
    Result14 = 14,
    Result15 = 15,
}

impl ResultRegister {
    pub const ALL: [ResultRegister; registers::RESULT_COUNT] = [
        ResultRegister::Result0,
        ResultRegister::Result1,
        ResultRegister::Result2,
        ResultRegister::Result3,
        ResultRegister::Result4,
        ResultRegister::Result5,
        ResultRegister::Result6,
        ResultRegister::Result7,
        ResultRegister::Result8,
        ResultRegister::Result9,
        ResultRegister::Result10,
        ResultRegister::Result11,
        ResultRegister::Result12,
        ResultRegister::Result13,
        ResultRegister::Result14,
        ResultRegister::Result15,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<ResultRegister> {
        ResultRegister::ALL.get(index).copied()
    }
}

/// Handle on the converter. All configuration and queries go through it or
/// through the [`Group`] handles it hands out.
pub struct Vadc<'a> {
    bus: &'a dyn RegisterBus,
    router: &'a dyn InterruptRouter,
    module_frequency: Cell<u32>,
    analog_frequency: Cell<u32>,
    startup_calibration: Cell<bool>,
    initialized_groups: Cell<u8>,
    configured_channels: [Cell<u16>; GROUP_COUNT],
    /// Bumped on every teardown of a group.
    generations: [Cell<u32>; GROUP_COUNT],
    client: Cell<Option<&'a dyn Client>>,
}

impl<'a> Vadc<'a> {
    pub const fn new(bus: &'a dyn RegisterBus, router: &'a dyn InterruptRouter) -> Vadc<'a> {
        Vadc {
            bus,
            router,
            module_frequency: Cell::new(module::DEFAULT_MODULE_FREQUENCY),
            analog_frequency: Cell::new(module::DEFAULT_ANALOG_FREQUENCY),
            startup_calibration: Cell::new(false),
            initialized_groups: Cell::new(0),
            configured_channels: [
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
            ],
            generations: [
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
                Cell::new(0),
            ],
            client: Cell::new(None),
        }
    }

    pub fn set_client(&self, client: &'a dyn Client) {
        self.client.set(Some(client));
    }

    /// Handle for a group that has been initialised.
    pub fn group(&self, id: GroupId) -> Option<Group<'_, 'a>> {
        if self.is_initialized(id) {
            Some(Group::new(self, id))
        } else {
            None
        }
    }

    pub fn is_initialized(&self, id: GroupId) -> bool {
        self.initialized_groups.get() & id.bit() != 0
    }

    fn mark_initialized(&self, id: GroupId, initialized: bool) {
        let groups = self.initialized_groups.get();
        self.initialized_groups.set(if initialized {
            groups | id.bit()
        } else {
            groups & !id.bit()
        });
        if !initialized {
            self.retire_handles(id);
        }
    }

    fn reset_tracking(&self) {
        self.initialized_groups.set(0);
        self.configured_channels.iter().for_each(|c| c.set(0));
        GroupId::ALL.iter().for_each(|id| self.retire_handles(*id));
    }

    fn generation(&self, id: GroupId) -> u32 {
        self.generations[id.index()].get()
    }

    fn retire_handles(&self, id: GroupId) {
        let generation = &self.generations[id.index()];
        generation.set(generation.get().wrapping_add(1));
    }

    /// Runs `f` with the group's initialisation registers unlocked.
    fn with_group_access<T>(&self, id: GroupId, f: impl FnOnce() -> T) -> T {
        self.unlock(ACCPROT0::APGC, id);
        let ret = f();
        self.lock(ACCPROT0::APGC, id);
        ret
    }

    /// Runs `f` with the group's channel control registers unlocked.
    fn with_channel_access<T>(&self, id: GroupId, f: impl FnOnce() -> T) -> T {
        self.unlock(ACCPROT0::APC, id);
        let ret = f();
        self.lock(ACCPROT0::APC, id);
        ret
    }

    fn unlock(&self, field: Field<u32, ACCPROT0::Register>, id: GroupId) {
        let reg = registers::accprot0();
        let bits = reg.read(self.bus, field) & !(1 << id.index());
        reg.modify(self.bus, field.val(bits));
    }

    fn lock(&self, field: Field<u32, ACCPROT0::Register>, id: GroupId) {
        let reg = registers::accprot0();
        let bits = reg.read(self.bus, field) | (1 << id.index());
        reg.modify(self.bus, field.val(bits));
    }
}
