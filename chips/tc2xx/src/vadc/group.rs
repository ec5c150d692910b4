// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Group initialisation and teardown.
//!
//! `init_group` is the only way to obtain a [`Group`] handle, and a group
//! cannot be initialised twice without `deinit` in between. This keeps
//! partial reconfiguration of a running arbiter off the API.

use super::arbiter::{
    ArbiterConfig, ArbitrationRound, RequestSlotConfig, RequestSlotPriority, StartMode,
};
use super::module::{check_boundary, InputClassConfig};
use super::queue::QueueConfig;
use super::registers::{
    self, ARBCFG, ARBPR, BOUND, EMUXCTR, GLOBCFG, QMR, SEFLAG, SRCCTRL, SRCMR, SYNCTR,
    CHANNEL_COUNT, RESULT_COUNT,
};
use super::scan::ScanConfig;
use super::{sync, Error, GroupId, RequestSource, Vadc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupConfig {
    pub id: GroupId,
    /// Group whose start signal this group follows. `id` makes the group the
    /// master of its own cluster.
    pub master: GroupId,
    pub arbiter: ArbiterConfig,
    pub queue: QueueConfig,
    pub scan: ScanConfig,
    /// Module-wide background scan as seen from this group.
    pub background: ScanConfig,
    pub input_classes: [InputClassConfig; 2],
    pub disable_post_calibration: bool,
}

impl GroupConfig {
    /// Own master, four slot rounds, every request source disabled and
    /// untriggered, queue flushed on init, 12 bit / 1 us input classes.
    pub const fn new(id: GroupId) -> GroupConfig {
        GroupConfig {
            id,
            master: id,
            arbiter: ArbiterConfig::new(),
            queue: QueueConfig::new(),
            scan: ScanConfig::new(),
            background: ScanConfig::new(),
            input_classes: [InputClassConfig::new(), InputClassConfig::new()],
            disable_post_calibration: false,
        }
    }
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self::new(GroupId::Group0)
    }
}

/// An initialised conversion group.
///
/// A handle goes stale once its group is deinitialised or the module is
/// reset. Configuration calls on a stale handle fail with
/// [`Error::NotInitialized`] and leave the registers alone.
pub struct Group<'v, 'a> {
    pub(super) vadc: &'v Vadc<'a>,
    pub(super) id: GroupId,
    generation: u32,
}

impl<'a> Vadc<'a> {
    /// Programs a group's arbiter, request sources, synchronization and
    /// input classes.
    ///
    /// The converter is held off throughout and only switched to normal
    /// operation when the group is its own master. Slaves stay off and run
    /// from their master's start signal, so the master has to be initialised
    /// first.
    pub fn init_group(&self, config: &GroupConfig) -> Result<Group<'_, 'a>, Error> {
        let id = config.id;
        if self.is_initialized(id) {
            return Err(Error::AlreadyInitialized);
        }
        let master_index = sync::resolve_master_index(id, config.master).inspect_err(|_| {
            log::warn!(
                "vadc: group {} cannot follow group {}",
                id.index(),
                config.master.index()
            )
        })?;
        if config.master != id {
            if !self.is_initialized(config.master) {
                return Err(Error::MasterNotInitialized);
            }
            let upstream = registers::synctr(config.master.index()).read(self.bus, SYNCTR::STSEL);
            if upstream != 0 {
                log::warn!(
                    "vadc: group {} cannot follow slave group {}",
                    id.index(),
                    config.master.index()
                );
                return Err(Error::TopologyInvalid);
            }
        }
        let analog_frequency = self.analog_frequency.get();
        let classes = [
            config.input_classes[0].standard_fields(analog_frequency)?,
            config.input_classes[1].standard_fields(analog_frequency)?,
        ];

        let group = Group::new(self, id);
        let g = id.index();
        let arbiter = &config.arbiter;
        self.with_group_access(id, || {
            let (p0, s0, e0) = slot_fields(&arbiter.queue);
            let (p1, s1, e1) = slot_fields(&arbiter.scan);
            let (p2, s2, e2) = slot_fields(&arbiter.background);
            registers::arbpr(g).write(
                self.bus,
                ARBPR::PRIO0.val(p0)
                    + ARBPR::CSM0.val(s0)
                    + ARBPR::ASEN0.val(e0)
                    + ARBPR::PRIO1.val(p1)
                    + ARBPR::CSM1.val(s1)
                    + ARBPR::ASEN1.val(e1)
                    + ARBPR::PRIO2.val(p2)
                    + ARBPR::CSM2.val(s2)
                    + ARBPR::ASEN2.val(e2),
            );
            registers::synctr(g).write(self.bus, SYNCTR::STSEL.val(master_index as u32));
            registers::arbcfg(g).write(
                self.bus,
                ARBCFG::ANONC::Off + ARBCFG::ARBRND.val(arbiter.round_length as u32),
            );
        });

        if arbiter.queue.enabled {
            group.program_trigger(RequestSource::Queue, &config.queue.trigger);
            if config.queue.flush_after_init {
                group.write_queue_clear(true);
            }
        }
        if arbiter.scan.enabled {
            group.program_trigger(RequestSource::Scan, &config.scan.trigger);
            registers::asmr(g).modify(self.bus, SRCMR::SCAN.val(config.scan.autoscan as u32));
        }
        if arbiter.background.enabled {
            group.program_trigger(RequestSource::Background, &config.background.trigger);
            registers::brsmr().modify(self.bus, SRCMR::SCAN.val(config.background.autoscan as u32));
        }

        self.with_group_access(id, || {
            if config.master == id {
                registers::arbcfg(g).modify(self.bus, ARBCFG::ANONC::NormalOperation);
            }
            for (index, class) in classes.iter().enumerate() {
                registers::iclass(g, index).modify(self.bus, *class);
            }
        });
        group.write_post_calibration(!config.disable_post_calibration);

        self.mark_initialized(id, true);
        log::debug!(
            "vadc: group {} up, master {}, {} slot rounds",
            g,
            config.master.index(),
            arbiter.round_length.slots()
        );
        Ok(group)
    }
}

fn slot_fields(slot: &RequestSlotConfig) -> (u32, u32, u32) {
    if slot.enabled {
        (slot.priority as u32, slot.start_mode as u32, 1)
    } else {
        (RequestSlotPriority::Lowest as u32, StartMode::WaitForStart as u32, 0)
    }
}

impl<'v, 'a> Group<'v, 'a> {
    pub(super) fn new(vadc: &'v Vadc<'a>, id: GroupId) -> Group<'v, 'a> {
        Group {
            vadc,
            id,
            generation: vadc.generation(id),
        }
    }

    /// Fails once the group has been torn down behind this handle.
    pub(super) fn check_live(&self) -> Result<(), Error> {
        if self.vadc.is_initialized(self.id) && self.vadc.generation(self.id) == self.generation {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Returns every group register to its reset value, drops queued and
    /// pending requests, and forgets the group's channels.
    pub fn deinit(self) -> Result<(), Error> {
        self.check_live()?;
        let bus = self.vadc.bus;
        let g = self.id.index();
        self.vadc.with_group_access(self.id, || {
            registers::arbcfg(g).write(bus, ARBCFG::ANONC::Off);
            registers::arbpr(g).set(bus, 0);
            registers::chass(g).set(bus, 0);
            registers::iclass(g, 0).set(bus, 0);
            registers::iclass(g, 1).set(bus, 0);
            registers::synctr(g).set(bus, 0);
        });
        registers::bound(g).set(bus, 0);
        registers::qmr0(g).write(bus, QMR::FLUSH::SET + QMR::CLRV::SET + QMR::CEV::SET);
        registers::qctrl0(g).write(bus, SRCCTRL::XTWC::SET + SRCCTRL::GTWC::SET);
        registers::asctrl(g).write(bus, SRCCTRL::XTWC::SET + SRCCTRL::GTWC::SET);
        registers::asmr(g).write(bus, SRCMR::CLRPND::SET);
        registers::assel(g).set(bus, 0);
        registers::brssel(g).set(bus, 0);
        registers::brspnd(g).set(bus, 0);
        registers::cefclr(g).set(bus, 0xFFFF);
        registers::refclr(g).set(bus, 0xFFFF);
        registers::sefclr(g).write(bus, SEFLAG::SEV0::SET + SEFLAG::SEV1::SET);
        for half in 0..2 {
            registers::cevnp(g, half).set(bus, 0);
            registers::revnp(g, half).set(bus, 0);
        }
        registers::sevnp(g).set(bus, 0);
        registers::emuxctr(g).write(bus, EMUXCTR::EMXWC::SET);
        registers::vfr(g).set(bus, 0xFFFF_FFFF);
        self.vadc.with_channel_access(self.id, || {
            for channel in 0..CHANNEL_COUNT {
                registers::chctr(g, channel).set(bus, 0);
            }
        });
        for result in 0..RESULT_COUNT {
            registers::rcr(g, result).set(bus, 0);
        }
        self.write_post_calibration(true);
        self.vadc.configured_channels[g].set(0);
        self.vadc.mark_initialized(self.id, false);
        log::debug!("vadc: group {} reset", g);
        Ok(())
    }

    /// Group configuration reconstructed from the registers.
    ///
    /// `queue.flush_after_init` only acts during init and reads back as its
    /// default.
    pub fn config(&self) -> GroupConfig {
        let bus = self.vadc.bus;
        let g = self.id.index();
        let arbpr = registers::arbpr(g).extract(bus);
        let slot = |prio, csm, asen| RequestSlotConfig {
            enabled: arbpr.is_set(asen),
            priority: RequestSlotPriority::from_raw(arbpr.read(prio)),
            start_mode: if arbpr.is_set(csm) {
                StartMode::AutoStart
            } else {
                StartMode::WaitForStart
            },
        };
        let arbiter = ArbiterConfig {
            round_length: ArbitrationRound::from_raw(
                registers::arbcfg(g).read(bus, ARBCFG::ARBRND),
            ),
            queue: slot(ARBPR::PRIO0, ARBPR::CSM0, ARBPR::ASEN0),
            scan: slot(ARBPR::PRIO1, ARBPR::CSM1, ARBPR::ASEN1),
            background: slot(ARBPR::PRIO2, ARBPR::CSM2, ARBPR::ASEN2),
        };
        let analog_frequency = self.vadc.analog_frequency.get();
        let dpcal = registers::globcfg().read(bus, GLOBCFG::DPCAL);
        let input_class = |index| {
            InputClassConfig::from_standard(analog_frequency, registers::iclass(g, index).get(bus))
        };
        GroupConfig {
            id: self.id,
            master: self.master(),
            arbiter,
            queue: QueueConfig {
                trigger: self.trigger_config(RequestSource::Queue),
                ..QueueConfig::new()
            },
            scan: ScanConfig {
                autoscan: registers::asmr(g).is_set(bus, SRCMR::SCAN),
                trigger: self.trigger_config(RequestSource::Scan),
            },
            background: ScanConfig {
                autoscan: registers::brsmr().is_set(bus, SRCMR::SCAN),
                trigger: self.trigger_config(RequestSource::Background),
            },
            input_classes: [input_class(0), input_class(1)],
            disable_post_calibration: dpcal & (1 << g) != 0,
        }
    }

    /// Master of the group's cluster, the group itself when unsynchronized.
    pub fn master(&self) -> GroupId {
        let index = registers::synctr(self.id.index()).read(self.vadc.bus, SYNCTR::STSEL);
        sync::resolve_master_group(self.id, index as u8).unwrap_or(self.id)
    }

    /// Programs the group's two boundaries (12 bit).
    pub fn set_boundaries(&self, boundary0: u16, boundary1: u16) -> Result<(), Error> {
        self.check_live()?;
        let b0 = check_boundary(boundary0)?;
        let b1 = check_boundary(boundary1)?;
        registers::bound(self.id.index()).write(
            self.vadc.bus,
            BOUND::BOUNDARY0.val(b0) + BOUND::BOUNDARY1.val(b1),
        );
        Ok(())
    }

    pub fn set_input_class(&self, index: usize, config: &InputClassConfig) -> Result<(), Error> {
        self.check_live()?;
        if index > 1 {
            return Err(Error::ConfigurationInfeasible);
        }
        let fields = config.standard_fields(self.vadc.analog_frequency.get())?;
        self.vadc.with_group_access(self.id, || {
            registers::iclass(self.id.index(), index).modify(self.vadc.bus, fields)
        });
        Ok(())
    }

    fn write_post_calibration(&self, enabled: bool) {
        let reg = registers::globcfg();
        let bit = 1 << self.id.index();
        let dpcal = reg.read(self.vadc.bus, GLOBCFG::DPCAL);
        let dpcal = if enabled { dpcal & !bit } else { dpcal | bit };
        reg.modify(self.vadc.bus, GLOBCFG::DPCAL.val(dpcal));
    }

    pub(crate) fn post_calibration(&self) -> bool {
        registers::globcfg().read(self.vadc.bus, GLOBCFG::DPCAL) & (1 << self.id.index()) == 0
    }
}
