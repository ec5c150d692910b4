// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! VADC register map.
//!
//! The module block sits at offset 0, group `g` at `0x400 + g * 0x400`.

use tock_registers::register_bitfields;

use crate::bus::Reg;

pub(crate) const GROUP_COUNT: usize = 8;
pub(crate) const CHANNEL_COUNT: usize = 16;
pub(crate) const RESULT_COUNT: usize = 16;
pub(crate) const QUEUE_DEPTH: usize = 8;

const GROUP_BASE: usize = 0x400;
const GROUP_STRIDE: usize = 0x400;

/// Bytes spanned by the whole register block.
pub(crate) const BLOCK_SIZE: usize = GROUP_BASE + GROUP_COUNT * GROUP_STRIDE;

register_bitfields![u32,
    pub CLC [
        /// Module disable request
        DISR OFFSET(0) NUMBITS(1) [],
        /// Module disable status
        DISS OFFSET(1) NUMBITS(1) [],
        EDIS OFFSET(3) NUMBITS(1) []
    ],
    pub KRST [
        RST OFFSET(0) NUMBITS(1) [],
        RSTSTAT OFFSET(1) NUMBITS(1) []
    ],
    /// Access protection. A set bit blocks writes for that group.
    pub ACCPROT0 [
        /// Channel control registers of group n
        APC OFFSET(0) NUMBITS(8) [],
        /// Initialisation registers of group n
        APGC OFFSET(16) NUMBITS(8) []
    ],
    pub GLOBCFG [
        /// Analog clock divider, fADCI = fADC / (DIVA + 1)
        DIVA OFFSET(0) NUMBITS(5) [],
        DCMSB OFFSET(7) NUMBITS(1) [],
        /// Arbiter clock divider, fADCD = fADC / (DIVD + 1)
        DIVD OFFSET(8) NUMBITS(2) [],
        /// Write control for DIVA, DCMSB, DIVD
        DIVWC OFFSET(15) NUMBITS(1) [],
        /// Disable post calibration, one bit per group
        DPCAL OFFSET(16) NUMBITS(8) [],
        /// Supply voltage class
        LOSUP OFFSET(30) NUMBITS(1) [
            Supply5V = 0,
            Supply3V3 = 1
        ],
        /// Start-up calibration request
        SUCAL OFFSET(31) NUMBITS(1) []
    ],
    /// Input class (GLOBICLASSx, GxICLASSx)
    pub ICLASS [
        /// Sample time control, standard conversions
        STCS OFFSET(0) NUMBITS(5) [],
        /// Conversion mode, standard conversions
        CMS OFFSET(8) NUMBITS(3) [
            Resolution12 = 0,
            Resolution10 = 1,
            Resolution8 = 2,
            FastCompare = 5
        ],
        /// Sample time control, external multiplexer conversions
        STCE OFFSET(16) NUMBITS(5) [],
        /// Conversion mode, external multiplexer conversions
        CME OFFSET(24) NUMBITS(3) []
    ],
    pub BOUND [
        BOUNDARY0 OFFSET(0) NUMBITS(12) [],
        BOUNDARY1 OFFSET(16) NUMBITS(12) []
    ],
    pub GLOBEFLAG [
        /// Background source event
        SEVGLB OFFSET(0) NUMBITS(1) [],
        /// Global result event
        REVGLB OFFSET(8) NUMBITS(1) [],
        /// Global result overrun
        OVGLB OFFSET(9) NUMBITS(1) [],
        SEVGLBCLR OFFSET(16) NUMBITS(1) [],
        REVGLBCLR OFFSET(24) NUMBITS(1) [],
        OVGLBCLR OFFSET(25) NUMBITS(1) []
    ],
    pub GLOBEVNP [
        SEV0NP OFFSET(0) NUMBITS(4) [],
        REV0NP OFFSET(16) NUMBITS(4) []
    ],
    /// Channel select or pending bits (ASSEL, ASPND, BRSSELx, BRSPNDx)
    pub CHSEL [
        CH OFFSET(0) NUMBITS(16) []
    ],
    /// Request source control (QCTRL0, ASCTRL, BRSCTRL)
    pub SRCCTRL [
        SRCRESREG OFFSET(0) NUMBITS(4) [],
        /// Trigger input select, 15 routes the gate input to the trigger
        XTSEL OFFSET(8) NUMBITS(4) [],
        XTLVL OFFSET(12) NUMBITS(1) [],
        XTMODE OFFSET(13) NUMBITS(2) [
            NoTrigger = 0,
            FallingEdge = 1,
            RisingEdge = 2,
            AnyEdge = 3
        ],
        /// Write control for XTSEL, XTMODE
        XTWC OFFSET(15) NUMBITS(1) [],
        GTSEL OFFSET(16) NUMBITS(4) [],
        GTLVL OFFSET(20) NUMBITS(1) [],
        /// Write control for GTSEL
        GTWC OFFSET(23) NUMBITS(1) []
    ],
    /// Queue mode
    pub QMR [
        ENGT OFFSET(0) NUMBITS(2) [
            Disabled = 0,
            Always = 1,
            GateHigh = 2,
            GateLow = 3
        ],
        ENTR OFFSET(2) NUMBITS(1) [],
        /// Clear valid bit of the entry in stage 0
        CLRV OFFSET(8) NUMBITS(1) [],
        /// Software trigger event
        TREV OFFSET(9) NUMBITS(1) [],
        /// Drop all entries
        FLUSH OFFSET(10) NUMBITS(1) [],
        /// Clear a pending trigger event
        CEV OFFSET(11) NUMBITS(1) [],
        RPTDIS OFFSET(16) NUMBITS(1) []
    ],
    /// Scan mode (ASMR, BRSMR)
    pub SRCMR [
        ENGT OFFSET(0) NUMBITS(2) [
            Disabled = 0,
            Always = 1,
            GateHigh = 2,
            GateLow = 3
        ],
        ENTR OFFSET(2) NUMBITS(1) [],
        /// Source interrupt at the end of each pass
        ENSI OFFSET(3) NUMBITS(1) [],
        /// Autoscan
        SCAN OFFSET(4) NUMBITS(1) [],
        /// Load mode, 1 combines the select bits into the pending bits
        LDM OFFSET(5) NUMBITS(1) [],
        REQGT OFFSET(7) NUMBITS(1) [],
        CLRPND OFFSET(8) NUMBITS(1) [],
        /// Software load event
        LDEV OFFSET(9) NUMBITS(1) [],
        RPTDIS OFFSET(16) NUMBITS(1) []
    ],
    pub QSR [
        /// Number of valid queue entries
        FILL OFFSET(0) NUMBITS(4) [],
        EMPTY OFFSET(5) NUMBITS(1) [],
        REQGT OFFSET(7) NUMBITS(1) [],
        /// Trigger event pending for stage 0
        EV OFFSET(8) NUMBITS(1) []
    ],
    /// Queue input (QINR0) and stage 0 (Q0R0)
    pub QENTRY [
        REQCHNR OFFSET(0) NUMBITS(5) [],
        /// Refill
        RF OFFSET(5) NUMBITS(1) [],
        /// Source interrupt
        ENSI OFFSET(6) NUMBITS(1) [],
        /// Wait for an external trigger
        EXTR OFFSET(7) NUMBITS(1) [],
        /// Stage 0 holds an entry (Q0R0 only)
        V OFFSET(8) NUMBITS(1) []
    ],
    pub GLOBRCR [
        DRCTR OFFSET(16) NUMBITS(4) [],
        WFR OFFSET(24) NUMBITS(1) [],
        SRGEN OFFSET(31) NUMBITS(1) []
    ],
    pub GLOBRES [
        RESULT OFFSET(0) NUMBITS(16) [],
        /// Group of the converted channel
        GNR OFFSET(16) NUMBITS(4) [],
        CHNR OFFSET(20) NUMBITS(5) [],
        EMUX OFFSET(25) NUMBITS(3) [],
        CRS OFFSET(28) NUMBITS(2) [],
        FCR OFFSET(30) NUMBITS(1) [],
        VF OFFSET(31) NUMBITS(1) []
    ],
    pub EMUXSEL [
        EMUXGRP0 OFFSET(0) NUMBITS(4) [],
        EMUXGRP1 OFFSET(4) NUMBITS(4) []
    ],
    pub ARBCFG [
        /// Analog converter control
        ANONC OFFSET(0) NUMBITS(2) [
            Off = 0,
            Standby = 1,
            NormalOperation = 3
        ],
        /// Arbitration round length
        ARBRND OFFSET(4) NUMBITS(2) [
            Slots4 = 0,
            Slots8 = 1,
            Slots16 = 2,
            Slots20 = 3
        ],
        ARBM OFFSET(7) NUMBITS(1) [],
        /// Calibration in progress
        CAL OFFSET(28) NUMBITS(1) [],
        BUSY OFFSET(30) NUMBITS(1) [],
        SAMPLE OFFSET(31) NUMBITS(1) []
    ],
    /// Arbitration priority, slot 0 queue, slot 1 scan, slot 2 background
    pub ARBPR [
        PRIO0 OFFSET(0) NUMBITS(2) [],
        CSM0 OFFSET(3) NUMBITS(1) [],
        PRIO1 OFFSET(4) NUMBITS(2) [],
        CSM1 OFFSET(7) NUMBITS(1) [],
        PRIO2 OFFSET(8) NUMBITS(2) [],
        CSM2 OFFSET(11) NUMBITS(1) [],
        ASEN0 OFFSET(24) NUMBITS(1) [],
        ASEN1 OFFSET(25) NUMBITS(1) [],
        ASEN2 OFFSET(26) NUMBITS(1) []
    ],
    /// Channel assignment, a set bit marks a priority channel
    pub CHASS [
        ASSCH OFFSET(0) NUMBITS(16) []
    ],
    pub SYNCTR [
        /// Master-select index, 0 selects the group itself
        STSEL OFFSET(0) NUMBITS(2) [],
        EVALR1 OFFSET(4) NUMBITS(1) [],
        EVALR2 OFFSET(5) NUMBITS(1) [],
        EVALR3 OFFSET(6) NUMBITS(1) []
    ],
    /// Event flags, one bit per channel or result register (CEFLAG, REFLAG,
    /// CEFCLR, REFCLR)
    pub EVFLAG [
        EV OFFSET(0) NUMBITS(16) []
    ],
    /// Source event flags, SEV0 queue and SEV1 scan (SEFLAG, SEFCLR)
    pub SEFLAG [
        SEV0 OFFSET(0) NUMBITS(1) [],
        SEV1 OFFSET(1) NUMBITS(1) []
    ],
    /// Event node pointers, eight 4-bit pointers (CEVNPx, REVNPx)
    pub EVNP [
        NP0 OFFSET(0) NUMBITS(4) [],
        NP1 OFFSET(4) NUMBITS(4) [],
        NP2 OFFSET(8) NUMBITS(4) [],
        NP3 OFFSET(12) NUMBITS(4) [],
        NP4 OFFSET(16) NUMBITS(4) [],
        NP5 OFFSET(20) NUMBITS(4) [],
        NP6 OFFSET(24) NUMBITS(4) [],
        NP7 OFFSET(28) NUMBITS(4) []
    ],
    pub SEVNP [
        SEV0NP OFFSET(0) NUMBITS(4) [],
        SEV1NP OFFSET(4) NUMBITS(4) []
    ],
    pub EMUXCTR [
        /// Select value to start from
        EMUXSET OFFSET(0) NUMBITS(3) [],
        /// Select value currently driven
        EMUXACT OFFSET(8) NUMBITS(3) [],
        EMUXCH OFFSET(16) NUMBITS(10) [],
        EMUXMODE OFFSET(26) NUMBITS(2) [
            SoftwareControl = 0,
            Steady = 1,
            SingleStep = 2,
            Sequence = 3
        ],
        /// Gray coded select
        EMXCOD OFFSET(28) NUMBITS(1) [],
        /// Use the extended sample time on every conversion
        EMXST OFFSET(29) NUMBITS(1) [],
        /// EMUXCH is a channel enable mask
        EMXCSS OFFSET(30) NUMBITS(1) [],
        /// Write control for everything except EMUXSET
        EMXWC OFFSET(31) NUMBITS(1) []
    ],
    /// Valid flags mirrored from the result registers, overrun in the top half
    pub VFR [
        VF OFFSET(0) NUMBITS(16) [],
        OV OFFSET(16) NUMBITS(16) []
    ],
    pub CHCTR [
        ICLSEL OFFSET(0) NUMBITS(2) [
            Group0 = 0,
            Group1 = 1,
            Global0 = 2,
            Global1 = 3
        ],
        BNDSELL OFFSET(4) NUMBITS(2) [],
        BNDSELU OFFSET(6) NUMBITS(2) [],
        CHEVMODE OFFSET(8) NUMBITS(2) [
            Never = 0,
            InBound = 1,
            OutBound = 2,
            Always = 3
        ],
        SYNC OFFSET(10) NUMBITS(1) [],
        REFSEL OFFSET(11) NUMBITS(1) [],
        /// 0 standard boundaries, 1 fast compare against the upper boundary
        BNDSELX OFFSET(12) NUMBITS(4) [],
        RESREG OFFSET(16) NUMBITS(4) [],
        /// Background results go to the global result register
        RESTBS OFFSET(20) NUMBITS(1) [],
        /// Right aligned result
        RESPOS OFFSET(21) NUMBITS(1) [],
        BWDCH OFFSET(28) NUMBITS(2) [],
        BWDEN OFFSET(30) NUMBITS(1) []
    ],
    pub RCR [
        DRCTR OFFSET(16) NUMBITS(4) [],
        DMM OFFSET(20) NUMBITS(2) [],
        /// Wait-for-read
        WFR OFFSET(24) NUMBITS(1) [],
        FEN OFFSET(25) NUMBITS(2) [],
        /// Service request on each new result
        SRGEN OFFSET(31) NUMBITS(1) []
    ],
    pub RES [
        RESULT OFFSET(0) NUMBITS(16) [],
        DRC OFFSET(16) NUMBITS(4) [],
        CHNR OFFSET(20) NUMBITS(5) [],
        EMUX OFFSET(25) NUMBITS(3) [],
        /// Request source of the conversion
        CRS OFFSET(28) NUMBITS(2) [],
        /// Fast compare result
        FCR OFFSET(30) NUMBITS(1) [],
        VF OFFSET(31) NUMBITS(1) []
    ]
];

const fn group_offset(group: usize, offset: usize) -> usize {
    GROUP_BASE + group * GROUP_STRIDE + offset
}

/// Index of group `group` given a byte offset inside its block, if any.
pub(crate) const fn group_of(offset: usize) -> Option<(usize, usize)> {
    if offset < GROUP_BASE || offset >= BLOCK_SIZE {
        None
    } else {
        let rel = offset - GROUP_BASE;
        Some((rel / GROUP_STRIDE, rel % GROUP_STRIDE))
    }
}

// Module scope.

pub(crate) const fn clc() -> Reg<CLC::Register> {
    Reg::at(0x000)
}

pub(crate) const fn krst1() -> Reg<KRST::Register> {
    Reg::at(0x030)
}

pub(crate) const fn krst0() -> Reg<KRST::Register> {
    Reg::at(0x034)
}

pub(crate) const fn accprot0() -> Reg<ACCPROT0::Register> {
    Reg::at(0x088)
}

pub(crate) const fn globcfg() -> Reg<GLOBCFG::Register> {
    Reg::at(0x080)
}

pub(crate) const fn globiclass(index: usize) -> Reg<ICLASS::Register> {
    Reg::at(0x0A0 + 4 * index)
}

pub(crate) const fn globbound() -> Reg<BOUND::Register> {
    Reg::at(0x0B8)
}

pub(crate) const fn globeflag() -> Reg<GLOBEFLAG::Register> {
    Reg::at(0x0E0)
}

pub(crate) const fn globevnp() -> Reg<GLOBEVNP::Register> {
    Reg::at(0x140)
}

pub(crate) const fn brssel(group: usize) -> Reg<CHSEL::Register> {
    Reg::at(0x180 + 4 * group)
}

pub(crate) const fn brspnd(group: usize) -> Reg<CHSEL::Register> {
    Reg::at(0x1C0 + 4 * group)
}

pub(crate) const fn brsctrl() -> Reg<SRCCTRL::Register> {
    Reg::at(0x200)
}

pub(crate) const fn brsmr() -> Reg<SRCMR::Register> {
    Reg::at(0x204)
}

pub(crate) const fn globrcr() -> Reg<GLOBRCR::Register> {
    Reg::at(0x280)
}

pub(crate) const fn globres() -> Reg<GLOBRES::Register> {
    Reg::at(0x300)
}

pub(crate) const fn globresd() -> Reg<GLOBRES::Register> {
    Reg::at(0x380)
}

pub(crate) const fn emuxsel() -> Reg<EMUXSEL::Register> {
    Reg::at(0x3F0)
}

// Group scope.

pub(crate) const fn arbcfg(group: usize) -> Reg<ARBCFG::Register> {
    Reg::at(group_offset(group, 0x080))
}

pub(crate) const fn arbpr(group: usize) -> Reg<ARBPR::Register> {
    Reg::at(group_offset(group, 0x084))
}

pub(crate) const fn chass(group: usize) -> Reg<CHASS::Register> {
    Reg::at(group_offset(group, 0x088))
}

pub(crate) const fn iclass(group: usize, index: usize) -> Reg<ICLASS::Register> {
    Reg::at(group_offset(group, 0x0A0 + 4 * index))
}

pub(crate) const fn bound(group: usize) -> Reg<BOUND::Register> {
    Reg::at(group_offset(group, 0x0B8))
}

pub(crate) const fn synctr(group: usize) -> Reg<SYNCTR::Register> {
    Reg::at(group_offset(group, 0x0C0))
}

pub(crate) const fn qctrl0(group: usize) -> Reg<SRCCTRL::Register> {
    Reg::at(group_offset(group, 0x100))
}

pub(crate) const fn qmr0(group: usize) -> Reg<QMR::Register> {
    Reg::at(group_offset(group, 0x104))
}

pub(crate) const fn qsr0(group: usize) -> Reg<QSR::Register> {
    Reg::at(group_offset(group, 0x108))
}

pub(crate) const fn q0r0(group: usize) -> Reg<QENTRY::Register> {
    Reg::at(group_offset(group, 0x10C))
}

pub(crate) const fn qinr0(group: usize) -> Reg<QENTRY::Register> {
    Reg::at(group_offset(group, 0x110))
}

pub(crate) const fn asctrl(group: usize) -> Reg<SRCCTRL::Register> {
    Reg::at(group_offset(group, 0x120))
}

pub(crate) const fn asmr(group: usize) -> Reg<SRCMR::Register> {
    Reg::at(group_offset(group, 0x124))
}

pub(crate) const fn assel(group: usize) -> Reg<CHSEL::Register> {
    Reg::at(group_offset(group, 0x128))
}

pub(crate) const fn aspnd(group: usize) -> Reg<CHSEL::Register> {
    Reg::at(group_offset(group, 0x12C))
}

pub(crate) const fn ceflag(group: usize) -> Reg<EVFLAG::Register> {
    Reg::at(group_offset(group, 0x180))
}

pub(crate) const fn reflag(group: usize) -> Reg<EVFLAG::Register> {
    Reg::at(group_offset(group, 0x184))
}

pub(crate) const fn seflag(group: usize) -> Reg<SEFLAG::Register> {
    Reg::at(group_offset(group, 0x188))
}

pub(crate) const fn cefclr(group: usize) -> Reg<EVFLAG::Register> {
    Reg::at(group_offset(group, 0x190))
}

pub(crate) const fn refclr(group: usize) -> Reg<EVFLAG::Register> {
    Reg::at(group_offset(group, 0x194))
}

pub(crate) const fn sefclr(group: usize) -> Reg<SEFLAG::Register> {
    Reg::at(group_offset(group, 0x198))
}

/// Channel event node pointers for channels `8 * half .. 8 * half + 8`.
pub(crate) const fn cevnp(group: usize, half: usize) -> Reg<EVNP::Register> {
    Reg::at(group_offset(group, 0x1A0 + 4 * half))
}

/// Result event node pointers for result registers `8 * half ..`.
pub(crate) const fn revnp(group: usize, half: usize) -> Reg<EVNP::Register> {
    Reg::at(group_offset(group, 0x1B0 + 4 * half))
}

pub(crate) const fn sevnp(group: usize) -> Reg<SEVNP::Register> {
    Reg::at(group_offset(group, 0x1C0))
}

pub(crate) const fn emuxctr(group: usize) -> Reg<EMUXCTR::Register> {
    Reg::at(group_offset(group, 0x1F0))
}

pub(crate) const fn vfr(group: usize) -> Reg<VFR::Register> {
    Reg::at(group_offset(group, 0x1F8))
}

pub(crate) const fn chctr(group: usize, channel: usize) -> Reg<CHCTR::Register> {
    Reg::at(group_offset(group, 0x200 + 4 * channel))
}

pub(crate) const fn rcr(group: usize, result: usize) -> Reg<RCR::Register> {
    Reg::at(group_offset(group, 0x280 + 4 * result))
}

pub(crate) const fn res(group: usize, result: usize) -> Reg<RES::Register> {
    Reg::at(group_offset(group, 0x300 + 4 * result))
}

pub(crate) const fn resd(group: usize, result: usize) -> Reg<RES::Register> {
    Reg::at(group_offset(group, 0x380 + 4 * result))
}

/// The 4-bit node pointer of entry `index` inside an EVNP register.
pub(crate) const fn node_pointer(value: u32, index: usize) -> u32 {
    (value >> (4 * (index % 8))) & 0xF
}

pub(crate) const fn with_node_pointer(value: u32, index: usize, pointer: u32) -> u32 {
    let shift = 4 * (index % 8);
    (value & !(0xF << shift)) | ((pointer & 0xF) << shift)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_blocks_do_not_overlap() {
        assert_eq!(arbcfg(0).offset(), 0x480);
        assert_eq!(arbcfg(7).offset(), 0x2080);
        assert!(resd(7, 15).offset() < BLOCK_SIZE);
        assert_eq!(group_of(res(3, 2).offset()), Some((3, 0x308)));
        assert_eq!(group_of(globres().offset()), None);
    }

    #[test]
    fn node_pointer_fields() {
        let v = with_node_pointer(0, 3, 0x5);
        let v = with_node_pointer(v, 14, 0x7);
        assert_eq!(node_pointer(v, 3), 0x5);
        assert_eq!(node_pointer(v, 6), 0x7);
        assert_eq!(node_pointer(v, 0), 0);
    }
}
