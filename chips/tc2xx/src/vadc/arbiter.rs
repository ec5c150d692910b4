// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Group arbiter: request slots and the arbitration rule.
//!
//! Every group has three request slots wired to its queue (slot 0), its scan
//! source (slot 1) and the background scan (slot 2). Readiness is sampled
//! once per round; within the round the arbiter grants up to
//! [`ArbitrationRound::slots`] conversions to the highest priority source
//! that is still ready. Equal priorities fall back to slot order.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestSource {
    Queue = 0,
    Scan = 1,
    Background = 2,
}

impl RequestSource {
    /// Slot order, which is also the tie-break order.
    pub const ALL: [RequestSource; 3] = [
        RequestSource::Queue,
        RequestSource::Scan,
        RequestSource::Background,
    ];

    pub const fn slot(self) -> usize {
        self as usize
    }

    pub(crate) fn from_slot(slot: u32) -> Option<RequestSource> {
        RequestSource::ALL.get(slot as usize).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestSlotPriority {
    Lowest = 0,
    Low = 1,
    High = 2,
    Highest = 3,
}

impl RequestSlotPriority {
    pub(crate) fn from_raw(raw: u32) -> RequestSlotPriority {
        match raw & 0x3 {
            0 => RequestSlotPriority::Lowest,
            1 => RequestSlotPriority::Low,
            2 => RequestSlotPriority::High,
            _ => RequestSlotPriority::Highest,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartMode {
    /// Conversions begin only after a software start or trigger event.
    WaitForStart = 0,
    /// Populating the source starts it.
    AutoStart = 1,
}

/// Number of slots in one arbitration round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArbitrationRound {
    Slots4 = 0,
    Slots8 = 1,
    Slots16 = 2,
    Slots20 = 3,
}

impl ArbitrationRound {
    pub const fn slots(self) -> usize {
        match self {
            ArbitrationRound::Slots4 => 4,
            ArbitrationRound::Slots8 => 8,
            ArbitrationRound::Slots16 => 16,
            ArbitrationRound::Slots20 => 20,
        }
    }

    pub(crate) fn from_raw(raw: u32) -> ArbitrationRound {
        match raw & 0x3 {
            0 => ArbitrationRound::Slots4,
            1 => ArbitrationRound::Slots8,
            2 => ArbitrationRound::Slots16,
            _ => ArbitrationRound::Slots20,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestSlotConfig {
    pub enabled: bool,
    pub priority: RequestSlotPriority,
    pub start_mode: StartMode,
}

impl RequestSlotConfig {
    /// Disabled, lowest priority, wait for start.
    pub const fn new() -> RequestSlotConfig {
        RequestSlotConfig {
            enabled: false,
            priority: RequestSlotPriority::Lowest,
            start_mode: StartMode::WaitForStart,
        }
    }
}

impl Default for RequestSlotConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArbiterConfig {
    pub round_length: ArbitrationRound,
    pub queue: RequestSlotConfig,
    pub scan: RequestSlotConfig,
    pub background: RequestSlotConfig,
}

impl ArbiterConfig {
    /// Four slot rounds, every request slot disabled.
    pub const fn new() -> ArbiterConfig {
        ArbiterConfig {
            round_length: ArbitrationRound::Slots4,
            queue: RequestSlotConfig::new(),
            scan: RequestSlotConfig::new(),
            background: RequestSlotConfig::new(),
        }
    }

    pub fn slot(&self, source: RequestSource) -> &RequestSlotConfig {
        match source {
            RequestSource::Queue => &self.queue,
            RequestSource::Scan => &self.scan,
            RequestSource::Background => &self.background,
        }
    }

    pub fn slot_mut(&mut self, source: RequestSource) -> &mut RequestSlotConfig {
        match source {
            RequestSource::Queue => &mut self.queue,
            RequestSource::Scan => &mut self.scan,
            RequestSource::Background => &mut self.background,
        }
    }
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks the winner among ready sources. `candidates` is indexed by slot and
/// holds the priority of each source that is ready.
pub fn arbitrate(candidates: [Option<RequestSlotPriority>; 3]) -> Option<RequestSource> {
    let mut winner: Option<(RequestSource, RequestSlotPriority)> = None;
    for source in RequestSource::ALL {
        if let Some(priority) = candidates[source.slot()] {
            match winner {
                Some((_, best)) if best >= priority => {}
                _ => winner = Some((source, priority)),
            }
        }
    }
    winner.map(|(source, _)| source)
}

/// One arbitration round in progress.
///
/// Only sources that were ready when the round started compete in it, and
/// no more than the round length of slots is granted.
pub struct RoundPlan {
    remaining: usize,
    eligible: [bool; 3],
}

impl RoundPlan {
    pub fn new(length: ArbitrationRound, ready: [Option<RequestSlotPriority>; 3]) -> RoundPlan {
        RoundPlan {
            remaining: length.slots(),
            eligible: [ready[0].is_some(), ready[1].is_some(), ready[2].is_some()],
        }
    }

    /// Grants the next slot, given what is ready now.
    pub fn next(&mut self, mut ready: [Option<RequestSlotPriority>; 3]) -> Option<RequestSource> {
        if self.remaining == 0 {
            return None;
        }
        for (slot, candidate) in ready.iter_mut().enumerate() {
            if !self.eligible[slot] {
                *candidate = None;
            }
        }
        let winner = arbitrate(ready)?;
        self.remaining -= 1;
        Some(winner)
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestSlotPriority::*;

    #[test]
    fn higher_priority_wins() {
        assert_eq!(
            arbitrate([Some(Low), Some(High), None]),
            Some(RequestSource::Scan)
        );
        assert_eq!(
            arbitrate([Some(Lowest), Some(Low), Some(Highest)]),
            Some(RequestSource::Background)
        );
        assert_eq!(arbitrate([None, None, None]), None);
    }

    #[test]
    fn every_priority_pair_orders_correctly() {
        let levels = [Lowest, Low, High, Highest];
        for a in levels {
            for b in levels {
                let expect = if b > a {
                    RequestSource::Scan
                } else {
                    RequestSource::Queue
                };
                assert_eq!(arbitrate([Some(a), Some(b), None]), Some(expect));
            }
        }
    }

    #[test]
    fn ties_follow_slot_order() {
        assert_eq!(
            arbitrate([Some(Low), Some(Low), Some(Low)]),
            Some(RequestSource::Queue)
        );
        assert_eq!(
            arbitrate([None, Some(High), Some(High)]),
            Some(RequestSource::Scan)
        );
    }

    #[test]
    fn round_is_bounded() {
        let ready = [Some(Low), None, None];
        let mut round = RoundPlan::new(ArbitrationRound::Slots4, ready);
        for _ in 0..4 {
            assert_eq!(round.next(ready), Some(RequestSource::Queue));
        }
        assert_eq!(round.next(ready), None);
    }

    #[test]
    fn late_sources_wait_for_the_next_round() {
        let mut round = RoundPlan::new(ArbitrationRound::Slots8, [None, Some(Low), None]);
        assert_eq!(
            round.next([Some(Highest), Some(Low), None]),
            Some(RequestSource::Scan)
        );
        assert_eq!(round.next([Some(Highest), None, None]), None);
        assert_eq!(round.remaining(), 7);
    }

    #[test]
    fn round_lengths() {
        assert_eq!(ArbitrationRound::from_raw(3).slots(), 20);
        assert_eq!(ArbitrationRound::Slots16.slots(), 16);
    }
}
