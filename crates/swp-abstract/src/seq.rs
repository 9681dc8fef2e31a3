//! Modular sequence-number arithmetic.
//!
//! Sequence numbers live in `0..=MAX_SEQ` and wrap. The window size is fixed at
//! half the sequence space; a larger window lets an old retransmission alias a
//! new frame on the receiving side.

/// Sequence number as carried in a frame header.
pub type SeqNr = u32;

/// Largest sequence number. Must be odd.
pub const MAX_SEQ: SeqNr = 7;

/// Number of buffer slots per direction (and the window size).
pub const NR_BUFS: usize = ((MAX_SEQ + 1) / 2) as usize;

const MODULUS: SeqNr = MAX_SEQ + 1;

/// Next sequence number, wrapping after `MAX_SEQ`.
#[inline]
pub fn inc(seq: SeqNr) -> SeqNr {
    (seq + 1) % MODULUS
}

/// True iff `b` lies in the cyclic half-open interval `[a, c)`.
///
/// Handles the plain case `a <= b < c` as well as both wrapped cases, where the
/// interval crosses the modulus boundary and `b` sits either at the top
/// (`c < a <= b`) or at the bottom (`b < c < a`). Equal bounds give an empty
/// interval.
#[inline]
pub fn between(a: SeqNr, b: SeqNr, c: SeqNr) -> bool {
    (a <= b && b < c) || (c < a && a <= b) || (b < c && c < a)
}

/// Buffer slot a sequence number occupies.
#[inline]
pub fn slot(seq: SeqNr) -> usize {
    (seq % NR_BUFS as SeqNr) as usize
}

/// Forward distance from `from` to `to` around the sequence space.
#[inline]
pub fn distance(from: SeqNr, to: SeqNr) -> SeqNr {
    (to + MODULUS - from % MODULUS) % MODULUS
}
