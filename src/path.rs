//! Bit level helpers over paths and bit masks.
//!
//! Bits are numbered most significant bit first: bit `i` lives in byte `i / 8`
//! under the mask `0x80 >> (i % 8)`. Proofs and compact proof bit masks depend
//! on this ordering.

use bitvec::{order::Msb0, view::BitView};

/// Returns the bit at `position`. `false` is left, `true` is right.
///
/// Panics if `position` is out of range, callers check bounds first.
#[inline]
pub fn get_path_bit(data: &[u8], position: usize) -> bool {
    data.view_bits::<Msb0>()[position]
}

/// Sets the bit at `position` to 1.
#[inline]
pub fn set_path_bit(data: &mut [u8], position: usize) {
    data.view_bits_mut::<Msb0>().set(position, true);
}

/// Flips the bit at `position`.
#[inline]
pub fn flip_path_bit(data: &mut [u8], position: usize) {
    let bits = data.view_bits_mut::<Msb0>();
    let bit = bits[position];
    bits.set(position, !bit);
}

/// Counts the bits set to 1.
#[inline]
pub fn count_set_bits(data: &[u8]) -> usize {
    data.view_bits::<Msb0>().count_ones()
}

/// Returns the index of the first bit at or after `from` where `a` and `b`
/// differ, or `a.len() * 8` if they agree on every remaining bit.
pub fn first_diff_bit(a: &[u8], b: &[u8], from: usize) -> usize {
    let (a, b) = (a.view_bits::<Msb0>(), b.view_bits::<Msb0>());
    let len = a.len().min(b.len());
    (from..len).find(|&i| a[i] != b[i]).unwrap_or(len)
}

/// Clears every bit outside of `[start, end)`.
pub fn clear_outside(data: &mut [u8], start: usize, end: usize) {
    let bits = data.view_bits_mut::<Msb0>();
    bits[..start].fill(false);
    bits[end..].fill(false);
}
