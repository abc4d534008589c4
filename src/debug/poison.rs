//! Payload poisoning for debugging.
//!
//! Fills released payloads with a known pattern so that stale raw pointers
//! taken from a payload show up as `0xCD` garbage instead of plausible data.

/// Pattern used to poison freed memory.
pub const FREED_PATTERN: u8 = 0xCD;

/// Poison a payload with the freed pattern.
pub fn poison_freed(payload: &mut [u8]) {
    payload.fill(FREED_PATTERN);
}
