//! Rolling checksum used by WAL records and snapshots
//!
//! A base-31 polynomial hash with wrapping arithmetic. Not
//! collision-resistant against an adversary; it exists to catch torn
//! writes and bit rot, and it is part of the on-disk format, so it must
//! not change.

/// Checksum of `data`: `acc = acc * 31 + byte` over every byte, wrapping.
pub fn rolling_checksum(data: &[u8]) -> u64 {
    data.iter()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(*b as u64))
}
