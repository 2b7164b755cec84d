//! Circular delay line shared by the echo and reverb stages
//!
//! The capacity is rounded up to a power of two so the write cursor wraps
//! with a mask. Content is stored as saturated 16-bit samples, which also
//! bounds any feedback loop built on top of the line.

use super::fixed_point::clamp_sample;

/// Fixed-capacity circular sample buffer.
///
/// `write` stores a sample at the cursor and advances it, overwriting the
/// oldest sample. `read(d)` returns the sample written `d` writes ago, where
/// `d == 1` is the most recent one.
#[derive(Clone)]
pub struct DelayLine {
    buffer: Vec<i16>,
    /// Next slot to be written
    position: usize,
    mask: usize,
}

impl DelayLine {
    /// Create a delay line able to hold at least `min_capacity` samples.
    pub fn new(min_capacity: usize) -> Self {
        let capacity = min_capacity.max(2).next_power_of_two();
        Self {
            buffer: vec![0; capacity],
            position: 0,
            mask: capacity - 1,
        }
    }

    /// Number of samples the line holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Largest delay `read` can serve.
    #[inline]
    pub fn max_delay(&self) -> usize {
        self.capacity() - 1
    }

    /// Store a sample at the cursor (saturated to 16 bits) and advance.
    #[inline]
    pub fn write(&mut self, sample: i32) {
        self.buffer[self.position] = clamp_sample(sample);
        self.position = (self.position + 1) & self.mask;
    }

    /// Sample written `delay` writes ago.
    ///
    /// A delay of zero (nothing written yet for this slot) or one at or beyond
    /// the capacity is a caller misconfiguration and yields silence.
    #[inline]
    pub fn read(&self, delay: usize) -> i32 {
        if delay == 0 || delay >= self.capacity() {
            return 0;
        }
        i32::from(self.buffer[(self.position.wrapping_sub(delay)) & self.mask])
    }

    /// Zero all content and rewind the cursor.
    pub fn clear(&mut self) {
        self.buffer.fill(0);
        self.position = 0;
    }

    /// Reallocate for a new minimum capacity. Content is discarded.
    pub fn resize(&mut self, min_capacity: usize) {
        let capacity = min_capacity.max(2).next_power_of_two();
        if capacity != self.capacity() {
            self.buffer = vec![0; capacity];
            self.mask = capacity - 1;
        }
        self.clear();
    }

    /// True when every stored sample is zero.
    pub fn is_silent(&self) -> bool {
        self.buffer.iter().all(|&s| s == 0)
    }
}

impl Default for DelayLine {
    fn default() -> Self {
        Self::new(2)
    }
}

impl std::fmt::Debug for DelayLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayLine")
            .field("capacity", &self.capacity())
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        assert_eq!(DelayLine::new(5000).capacity(), 8192);
        assert_eq!(DelayLine::new(4096).capacity(), 4096);
        assert_eq!(DelayLine::new(0).capacity(), 2);
    }

    #[test]
    fn test_read_returns_sample_written_delay_ago() {
        let mut line = DelayLine::new(8);
        for s in 1..=5 {
            line.write(s);
        }
        assert_eq!(line.read(1), 5);
        assert_eq!(line.read(3), 3);
        assert_eq!(line.read(5), 1);
        // never written
        assert_eq!(line.read(6), 0);
    }

    #[test]
    fn test_wraps_and_overwrites_oldest() {
        let mut line = DelayLine::new(4);
        for s in 1..=6 {
            line.write(s);
        }
        assert_eq!(line.read(1), 6);
        assert_eq!(line.read(3), 4);
    }

    #[test]
    fn test_out_of_range_delay_is_silent() {
        let mut line = DelayLine::new(4);
        for _ in 0..4 {
            line.write(1000);
        }
        assert_eq!(line.read(0), 0);
        assert_eq!(line.read(4), 0);
        assert_eq!(line.read(100), 0);
    }

    #[test]
    fn test_write_saturates() {
        let mut line = DelayLine::new(4);
        line.write(100_000);
        line.write(-100_000);
        assert_eq!(line.read(2), i32::from(i16::MAX));
        assert_eq!(line.read(1), i32::from(i16::MIN));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut line = DelayLine::new(16);
        for s in 0..20 {
            line.write(s * 7);
        }
        line.clear();
        assert!(line.is_silent());
        line.clear();
        assert!(line.is_silent());
        assert_eq!(line.read(1), 0);
    }

    #[test]
    fn test_resize_discards_content() {
        let mut line = DelayLine::new(8);
        line.write(42);
        line.resize(100);
        assert_eq!(line.capacity(), 128);
        assert!(line.is_silent());
    }
}
