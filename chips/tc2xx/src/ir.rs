// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Interrupt router service request control (SRC) registers of the VADC.
//!
//! Each VADC service request line has one SRC register holding its priority
//! (SRPN), its service provider (TOS) and its enable bit (SRE). Offsets are
//! relative to [`crate::SRC_BASE`].

use tock_registers::register_bitfields;

use crate::bus::{Reg, RegisterBus};
use crate::hil::{InterruptRouter, ServiceProvider};
use crate::vadc::ServiceRequest;

register_bitfields![u32,
    pub SRC [
        /// Service request priority number, 0 never wins arbitration
        SRPN OFFSET(0) NUMBITS(8) [],
        /// Service request enable
        SRE OFFSET(10) NUMBITS(1) [],
        /// Type of service
        TOS OFFSET(11) NUMBITS(2) [],
        SRR OFFSET(24) NUMBITS(1) [],
        CLRR OFFSET(25) NUMBITS(1) [],
        SETR OFFSET(26) NUMBITS(1) []
    ]
];

const GROUP_LINES: usize = 0x980;
const COMMON_LINES: usize = 0xA00;
const LINE_STRIDE: usize = 0x10;

/// Span of the VADC part of the SRC block, from [`crate::SRC_BASE`].
pub const SRC_BLOCK_SIZE: usize = COMMON_LINES + 2 * LINE_STRIDE;

const fn src(request: ServiceRequest) -> Reg<SRC::Register> {
    let offset = match request {
        ServiceRequest::Group { group, index } => {
            GROUP_LINES + LINE_STRIDE * group.index() + 4 * (index as usize % 4)
        }
        ServiceRequest::Common { cluster, index } => {
            COMMON_LINES + LINE_STRIDE * (cluster as usize % 2) + 4 * (index as usize % 4)
        }
    };
    Reg::at(offset)
}

pub struct SrcRouter<'a> {
    bus: &'a dyn RegisterBus,
}

impl<'a> SrcRouter<'a> {
    pub const fn new(bus: &'a dyn RegisterBus) -> SrcRouter<'a> {
        SrcRouter { bus }
    }

    pub fn is_pending(&self, request: ServiceRequest) -> bool {
        src(request).is_set(self.bus, SRC::SRR)
    }

    /// Clears a pending request.
    pub fn acknowledge(&self, request: ServiceRequest) {
        src(request).modify(self.bus, SRC::CLRR::SET);
    }

    pub fn disable(&self, request: ServiceRequest) {
        src(request).modify(self.bus, SRC::SRE::CLEAR);
    }
}

impl InterruptRouter for SrcRouter<'_> {
    fn install_handler(&self, request: ServiceRequest, priority: u8, target: ServiceProvider) {
        src(request).modify(
            self.bus,
            SRC::SRPN.val(priority as u32) + SRC::TOS.val(target as u32) + SRC::CLRR::SET,
        );
    }

    fn enable(&self, request: ServiceRequest) {
        src(request).modify(self.bus, SRC::SRE::SET);
    }

    fn installed(&self, request: ServiceRequest) -> Option<(u8, ServiceProvider)> {
        let reg = src(request).extract(self.bus);
        match reg.read(SRC::SRPN) {
            0 => None,
            priority => Some((priority as u8, ServiceProvider::from_tos(reg.read(SRC::TOS)))),
        }
    }
}
