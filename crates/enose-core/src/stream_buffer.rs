//! Stream ingestion buffer.
//!
//! Captures at most one spike word per cycle into the next free slot. The
//! frame ends when the receive counter reaches the window length or the
//! accepted beat carries TLAST, whichever comes first. An early TLAST
//! silently truncates the window to the words actually received.

use enose_chip::stream::{self, Beat};

/// Outcome of accepting one beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// More words expected
    Continue,
    /// Frame complete; `truncated` if TLAST arrived before the window filled
    Complete {
        /// TLAST ended the frame early
        truncated: bool,
    },
}

/// Bounded, ordered store of one window of spike masks.
#[derive(Debug, Clone)]
pub struct StreamBuffer {
    words: Vec<u32>,
    capacity: usize,
    channel_mask: u32,
    window_length: usize,
    ended: bool,
    reserved_seen: u32,
}

impl StreamBuffer {
    /// Empty buffer of `capacity` slots keeping the low `n_in` bits of each word
    pub fn new(capacity: usize, n_in: usize) -> Self {
        Self {
            words: Vec::with_capacity(capacity),
            capacity,
            channel_mask: stream::channel_mask(n_in),
            window_length: 0,
            ended: true,
            reserved_seen: 0,
        }
    }

    /// Discard contents and open a new frame of `window_length` words
    pub fn open(&mut self, window_length: usize) {
        self.words.clear();
        self.window_length = window_length.min(self.capacity);
        self.ended = self.window_length == 0;
        self.reserved_seen = 0;
    }

    /// Discard contents and stop accepting words
    pub fn close(&mut self) {
        self.words.clear();
        self.window_length = 0;
        self.ended = true;
        self.reserved_seen = 0;
    }

    /// TREADY: a frame is open and has free slots
    pub fn is_ready(&self) -> bool {
        !self.ended && self.words.len() < self.window_length
    }

    /// Store one beat. Returns `None` if the buffer was not ready.
    pub fn accept(&mut self, beat: Beat) -> Option<Ingest> {
        if !self.is_ready() {
            return None;
        }
        self.reserved_seen |= beat.data & !self.channel_mask;
        self.words.push(beat.data & self.channel_mask);

        let full = self.words.len() >= self.window_length;
        if full || beat.last {
            self.ended = true;
            Some(Ingest::Complete {
                truncated: !full,
            })
        } else {
            Some(Ingest::Continue)
        }
    }

    /// Receive counter
    pub fn received(&self) -> usize {
        self.words.len()
    }

    /// Words of the current frame, masked to the input channels
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Mask for timestep `t`, zero past the end of the frame
    pub fn word(&self, t: usize) -> u32 {
        self.words.get(t).copied().unwrap_or(0)
    }

    /// Union of reserved bits seen on accepted beats
    pub const fn reserved_seen(&self) -> u32 {
        self.reserved_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_buffer_refuses_beats() {
        let mut b = StreamBuffer::new(8, 12);
        assert!(!b.is_ready());
        assert_eq!(b.accept(Beat::word(1)), None);
    }

    #[test]
    fn fills_to_window_length() {
        let mut b = StreamBuffer::new(8, 12);
        b.open(3);
        assert_eq!(b.accept(Beat::word(1)), Some(Ingest::Continue));
        assert_eq!(b.accept(Beat::word(2)), Some(Ingest::Continue));
        assert_eq!(
            b.accept(Beat::word(3)),
            Some(Ingest::Complete { truncated: false })
        );
        assert!(!b.is_ready(), "extra words are back-pressured");
        assert_eq!(b.accept(Beat::word(4)), None);
        assert_eq!(b.words(), &[1, 2, 3]);
    }

    #[test]
    fn tlast_truncates_silently() {
        let mut b = StreamBuffer::new(8, 12);
        b.open(5);
        b.accept(Beat::word(0xA));
        assert_eq!(
            b.accept(Beat::last(0xB)),
            Some(Ingest::Complete { truncated: true })
        );
        assert_eq!(b.received(), 2);
        assert_eq!(b.word(4), 0);
    }

    #[test]
    fn tlast_on_final_word_is_not_truncation() {
        let mut b = StreamBuffer::new(8, 12);
        b.open(1);
        assert_eq!(
            b.accept(Beat::last(0x1)),
            Some(Ingest::Complete { truncated: false })
        );
    }

    #[test]
    fn reserved_bits_masked_and_recorded() {
        let mut b = StreamBuffer::new(8, 12);
        b.open(2);
        b.accept(Beat::word(0xFFFF_FFFF));
        assert_eq!(b.words(), &[0xFFF]);
        assert_eq!(b.reserved_seen(), 0xFFFF_F000);
    }

    #[test]
    fn window_clamped_to_capacity() {
        let mut b = StreamBuffer::new(2, 12);
        b.open(10);
        b.accept(Beat::word(1));
        assert_eq!(
            b.accept(Beat::word(1)),
            Some(Ingest::Complete { truncated: false })
        );
    }
}
