// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Master/slave synchronization topology.
//!
//! A slave group does not name its master directly. Its SYNCTR.STSEL field
//! holds a 2-bit index into the ready inputs wired from the other three
//! groups of its domain, where index 0 always means "myself". The wiring is
//! fixed in silicon and only reachable through [`resolve_master_index`] and
//! [`resolve_master_group`].
//!
//! Groups 0-3 and 4-7 form two independent domains with the same shape: for
//! a slave at position `s` inside its domain, the other groups are numbered
//! 1, 2, 3 in ascending order, skipping `s`.

use super::{Error, GroupId};

/// `MASTER_INDEX[slave][master]` is the STSEL value a slave uses to follow
/// `master`. Zero off the diagonal marks a cross-domain pair.
const MASTER_INDEX: [[u8; 8]; 8] = [
    [0, 1, 2, 3, 0, 0, 0, 0],
    [1, 0, 2, 3, 0, 0, 0, 0],
    [1, 2, 0, 3, 0, 0, 0, 0],
    [1, 2, 3, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 1, 2, 3],
    [0, 0, 0, 0, 1, 0, 2, 3],
    [0, 0, 0, 0, 1, 2, 0, 3],
    [0, 0, 0, 0, 1, 2, 3, 0],
];

/// STSEL value that makes `slave` follow `master`.
pub fn resolve_master_index(slave: GroupId, master: GroupId) -> Result<u8, Error> {
    if slave == master {
        return Ok(0);
    }
    if slave.domain() != master.domain() {
        return Err(Error::TopologyInvalid);
    }
    match MASTER_INDEX[slave.index()][master.index()] {
        0 => Err(Error::TopologyInvalid),
        index => Ok(index),
    }
}

/// Group that `slave` follows when its STSEL holds `index`.
pub fn resolve_master_group(slave: GroupId, index: u8) -> Result<GroupId, Error> {
    if index == 0 {
        return Ok(slave);
    }
    if index > 3 {
        return Err(Error::TopologyInvalid);
    }
    let base = slave.domain() * 4;
    MASTER_INDEX[slave.index()][base..base + 4]
        .iter()
        .position(|&i| i == index)
        .and_then(|pos| GroupId::from_index(base + pos))
        .ok_or(Error::TopologyInvalid)
}
