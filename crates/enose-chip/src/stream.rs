//! AXI-Stream spike word format.
//!
//! One 32-bit word carries one timestep: bit `i` set means input channel `i`
//! spiked. Bits at or above the configured channel count are reserved and
//! must be zero; the core masks them off. TLAST accompanies the final word
//! of a frame.

/// Width of a stream word in bits.
pub const WORD_BITS: u32 = 32;

/// Largest channel count a single stream word can carry.
pub const MAX_CHANNELS: usize = WORD_BITS as usize;

/// One beat on the spike stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beat {
    /// TDATA: spike mask for one timestep.
    pub data: u32,
    /// TLAST: end-of-frame marker.
    pub last: bool,
}

impl Beat {
    /// Beat without TLAST.
    #[must_use]
    pub const fn word(data: u32) -> Self {
        Self { data, last: false }
    }

    /// Final beat of a frame.
    #[must_use]
    pub const fn last(data: u32) -> Self {
        Self { data, last: true }
    }
}

/// Mask selecting the low `channels` bits of a word.
#[must_use]
pub const fn channel_mask(channels: usize) -> u32 {
    if channels >= MAX_CHANNELS {
        u32::MAX
    } else {
        (1u32 << channels) - 1
    }
}

/// Bits of `word` that fall outside the first `channels` channels.
#[must_use]
pub const fn reserved_bits(word: u32, channels: usize) -> u32 {
    word & !channel_mask(channels)
}

/// Pack one timestep of channel activity into a spike word.
///
/// Channels beyond [`MAX_CHANNELS`] are ignored.
#[must_use]
pub fn pack(active: &[bool]) -> u32 {
    active
        .iter()
        .take(MAX_CHANNELS)
        .enumerate()
        .filter(|&(_, &on)| on)
        .fold(0, |mask, (i, _)| mask | (1 << i))
}

/// True if channel `ch` spiked in `word`.
#[must_use]
pub const fn is_active(word: u32, ch: usize) -> bool {
    ch < MAX_CHANNELS && (word >> ch) & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_mask_widths() {
        assert_eq!(channel_mask(12), 0xFFF);
        assert_eq!(channel_mask(1), 0x1);
        assert_eq!(channel_mask(32), u32::MAX);
    }

    #[test]
    fn reserved_bits_outside_channels() {
        assert_eq!(reserved_bits(0xFFFF_FFFF, 12), 0xFFFF_F000);
        assert_eq!(reserved_bits(0x0FFF, 12), 0);
    }

    #[test]
    fn pack_sets_channel_bits() {
        assert_eq!(pack(&[true, false, true]), 0b101);
        assert_eq!(pack(&[]), 0);
        assert!(is_active(0b100, 2));
        assert!(!is_active(0b100, 1));
    }
}
