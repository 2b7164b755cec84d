//! Voice accumulation buffers and output mixers
//!
//! Synthesizer voices write samples into per-type accumulation buffers
//! through a [`VoiceSink`]. Once a frame is complete, [`MixBuffer::end_frame`]
//! makes the samples readable and [`MixBuffer::read_samples`] drains them as
//! interleaved 16-bit stereo.
//!
//! Two mixers are provided:
//! - [`EffectsMixer`]: seven buffers with panning, echo and reverb
//! - [`StereoMixer`]: plain center/left/right downmix

pub mod delay_line;
pub mod effects;
pub mod fixed_point;
pub mod router;
pub mod stereo;

pub use delay_line::DelayLine;
pub use effects::{EffectsMixer, MixerConfig};
pub use router::{BufferRole, ChannelOutputs, Effect, Pan, Router, Side};
pub use stereo::StereoMixer;

use crate::constants::{MAX_BUFFER_LENGTH_MS, STEREO};
use crate::{PlayerError, Result};
use bitflags::bitflags;

bitflags! {
    /// Set of physical accumulation buffers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BufferMask: u8 {
        /// Buffer 0
        const BUF_0 = 1 << 0;
        /// Buffer 1
        const BUF_1 = 1 << 1;
        /// Buffer 2
        const BUF_2 = 1 << 2;
        /// Buffer 3
        const BUF_3 = 1 << 3;
        /// Buffer 4
        const BUF_4 = 1 << 4;
        /// Buffer 5
        const BUF_5 = 1 << 5;
        /// Buffer 6
        const BUF_6 = 1 << 6;
        /// Left/right buffers of the plain layout
        const PLAIN_STEREO = Self::BUF_1.bits() | Self::BUF_2.bits();
        /// Left/right buffers of the effects layout
        const EFFECTS_STEREO = Self::BUF_3.bits()
            | Self::BUF_4.bits()
            | Self::BUF_5.bits()
            | Self::BUF_6.bits();
    }
}

impl BufferMask {
    /// Mask containing only buffer `index`.
    pub fn single(index: usize) -> Self {
        Self::from_bits_truncate(1u8 << index.min(7))
    }
}

/// Mono accumulation buffer written by voices and drained by a mixer.
///
/// Voices add samples at frame offsets relative to the end of the readable
/// region. `end_frame` extends the readable region; `remove_samples` drops
/// drained samples from the front.
#[derive(Debug, Clone, Default)]
pub struct VoiceBuffer {
    samples: Vec<i32>,
    /// Readable frames at the front of `samples`
    avail: usize,
    modified: bool,
}

impl VoiceBuffer {
    /// Create an empty buffer holding `frames` frames.
    pub fn new(frames: usize) -> Self {
        Self {
            samples: vec![0; frames],
            avail: 0,
            modified: false,
        }
    }

    /// Capacity in frames.
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Readable frames.
    pub fn samples_avail(&self) -> usize {
        self.avail
    }

    /// Add `amplitude` at `offset` frames past the readable region.
    ///
    /// Writes past the capacity are dropped; the controller never asks a
    /// synthesizer for more frames than fit.
    #[inline]
    pub fn add(&mut self, offset: usize, amplitude: i32) {
        let index = self.avail + offset;
        debug_assert!(index < self.samples.len(), "voice write past buffer end");
        if let Some(slot) = self.samples.get_mut(index) {
            *slot = slot.wrapping_add(amplitude);
            self.modified = true;
        }
    }

    /// Readable sample at `index`.
    #[inline]
    pub fn sample(&self, index: usize) -> i32 {
        self.samples[index]
    }

    /// Make `frames` more frames readable.
    pub fn end_frame(&mut self, frames: usize) {
        self.avail = (self.avail + frames).min(self.samples.len());
    }

    /// Drop `count` drained frames from the front.
    pub fn remove_samples(&mut self, count: usize) {
        let count = count.min(self.avail);
        if count == 0 {
            return;
        }
        let remain = self.avail - count;
        self.samples.copy_within(count..self.avail, 0);
        self.samples[remain..self.avail].fill(0);
        self.avail = remain;
    }

    /// Return and reset the "written since last check" flag.
    pub fn take_modified(&mut self) -> bool {
        std::mem::take(&mut self.modified)
    }

    /// Discard all content.
    pub fn clear(&mut self) {
        self.samples.fill(0);
        self.avail = 0;
        self.modified = false;
    }
}

/// Write access to the accumulation buffers for one synthesis frame.
///
/// Muted voices are dropped here, so muting works even for synthesizers
/// that ignore their mute hook.
pub struct VoiceSink<'a> {
    buffers: &'a mut [VoiceBuffer],
    router: &'a Router,
    mute_mask: u32,
}

impl<'a> VoiceSink<'a> {
    /// Create a sink over a buffer bank.
    pub fn new(buffers: &'a mut [VoiceBuffer], router: &'a Router, mute_mask: u32) -> Self {
        Self {
            buffers,
            router,
            mute_mask,
        }
    }

    /// Check whether output from `voice` is being discarded.
    pub fn is_muted(&self, voice: usize) -> bool {
        voice < 32 && self.mute_mask & (1 << voice) != 0
    }

    /// Buffers assigned to `voice`.
    pub fn outputs(&self, voice: usize) -> ChannelOutputs {
        self.router.channel(voice)
    }

    /// Add mono output of `voice` at frame `offset`.
    #[inline]
    pub fn add(&mut self, voice: usize, offset: usize, amplitude: i32) {
        if self.is_muted(voice) {
            return;
        }
        let outputs = self.router.channel(voice);
        self.buffers[outputs.center].add(offset, amplitude);
    }

    /// Add stereo output of `voice` at frame `offset`.
    #[inline]
    pub fn add_stereo(&mut self, voice: usize, offset: usize, left: i32, right: i32) {
        if self.is_muted(voice) {
            return;
        }
        let outputs = self.router.channel(voice);
        self.buffers[outputs.left].add(offset, left);
        self.buffers[outputs.right].add(offset, right);
    }
}

/// Multi-buffer output stage driven by the track controller.
///
/// Implemented by [`EffectsMixer`] and [`StereoMixer`]; a caller may supply
/// its own implementation to the controller.
pub trait MixBuffer {
    /// Size the buffers for `rate` Hz holding `length_ms` of audio.
    ///
    /// Clears all buffered audio.
    fn set_sample_rate(&mut self, rate: u32, length_ms: u32) -> Result<()>;

    /// Configured sample rate, or 0 before `set_sample_rate`.
    fn sample_rate(&self) -> u32;

    /// Capacity of each accumulation buffer in frames.
    fn length_frames(&self) -> usize;

    /// Discard all buffered audio and effect tails.
    fn clear(&mut self);

    /// Buffers assigned to `voice`.
    fn channel(&self, voice: usize) -> ChannelOutputs;

    /// Write access for the next frame of voice output.
    fn voice_sink(&mut self, mute_mask: u32) -> VoiceSink<'_>;

    /// Mark `frames` frames of voice output as complete.
    fn end_frame(&mut self, frames: usize);

    /// Interleaved samples ready to be read.
    fn samples_avail(&self) -> usize;

    /// Drain up to `out.len()` interleaved samples, returning how many were
    /// written. `out.len()` must be even.
    fn read_samples(&mut self, out: &mut [i16]) -> usize;

    /// Adjust stereo depth. Mixers without effects ignore this.
    fn set_stereo_depth(&mut self, _depth: f64) {}

    /// Frames that can still be written before the buffers are full.
    fn free_frames(&self) -> usize {
        self.length_frames()
            .saturating_sub(self.samples_avail() / STEREO)
    }
}

/// Accumulation buffers plus their routing, shared by both mixers.
#[derive(Debug, Clone)]
pub(crate) struct BufferBank {
    pub(crate) buffers: Vec<VoiceBuffer>,
    pub(crate) router: Router,
    pub(crate) sample_rate: u32,
    pub(crate) length_ms: u32,
}

impl BufferBank {
    pub(crate) fn new(router: Router) -> Self {
        Self {
            buffers: vec![VoiceBuffer::default(); router.buffer_count()],
            router,
            sample_rate: 0,
            length_ms: 0,
        }
    }

    pub(crate) fn set_sample_rate(&mut self, rate: u32, length_ms: u32) -> Result<()> {
        if rate == 0 {
            return Err(PlayerError::ConfigurationRejected(
                "sample rate must be non-zero".into(),
            ));
        }
        if length_ms == 0 || length_ms > MAX_BUFFER_LENGTH_MS {
            return Err(PlayerError::ConfigurationRejected(format!(
                "buffer length {length_ms} ms outside 1..={MAX_BUFFER_LENGTH_MS}"
            )));
        }
        let frames = (u64::from(rate) * u64::from(length_ms)).div_ceil(1000) as usize;
        for buffer in &mut self.buffers {
            *buffer = VoiceBuffer::new(frames);
        }
        self.sample_rate = rate;
        self.length_ms = length_ms;
        Ok(())
    }

    pub(crate) fn length_frames(&self) -> usize {
        self.buffers.first().map_or(0, VoiceBuffer::capacity)
    }

    pub(crate) fn avail_frames(&self) -> usize {
        self.buffers.first().map_or(0, VoiceBuffer::samples_avail)
    }

    pub(crate) fn sink(&mut self, mute_mask: u32) -> VoiceSink<'_> {
        VoiceSink::new(&mut self.buffers, &self.router, mute_mask)
    }

    /// End a frame on every buffer, returning the buffers written during it.
    pub(crate) fn end_frame(&mut self, frames: usize) -> BufferMask {
        let mut used = BufferMask::empty();
        for (index, buffer) in self.buffers.iter_mut().enumerate() {
            if buffer.take_modified() {
                used |= BufferMask::single(index);
            }
            buffer.end_frame(frames);
        }
        used
    }

    pub(crate) fn remove_samples(&mut self, frames: usize) {
        for buffer in &mut self.buffers {
            buffer.remove_samples(frames);
        }
    }

    pub(crate) fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_buffer_end_frame_and_remove() {
        let mut buf = VoiceBuffer::new(8);
        buf.add(0, 10);
        buf.add(2, 30);
        buf.end_frame(4);
        assert_eq!(buf.samples_avail(), 4);
        assert_eq!(buf.sample(0), 10);
        assert_eq!(buf.sample(2), 30);

        buf.remove_samples(2);
        assert_eq!(buf.samples_avail(), 2);
        assert_eq!(buf.sample(0), 30);
        assert_eq!(buf.sample(1), 0);
    }

    #[test]
    fn test_voice_buffer_writes_after_readable_region() {
        let mut buf = VoiceBuffer::new(8);
        buf.end_frame(3);
        buf.add(0, 7);
        buf.end_frame(1);
        assert_eq!(buf.sample(3), 7);
    }

    #[test]
    fn test_voice_buffer_modified_flag() {
        let mut buf = VoiceBuffer::new(4);
        assert!(!buf.take_modified());
        buf.add(1, 1);
        assert!(buf.take_modified());
        assert!(!buf.take_modified());
    }

    #[test]
    fn test_sink_drops_muted_voices() {
        let router = Router::new(false);
        let mut buffers = vec![VoiceBuffer::new(4); router.buffer_count()];
        {
            let mut sink = VoiceSink::new(&mut buffers, &router, 0b01);
            sink.add(0, 0, 100);
            sink.add(1, 0, 200);
        }
        for buffer in &mut buffers {
            buffer.end_frame(1);
        }
        // both voices route to center in the plain layout
        assert_eq!(buffers[0].sample(0), 200);
    }

    #[test]
    fn test_buffer_mask_constants() {
        assert_eq!(BufferMask::PLAIN_STEREO.bits(), 0x06);
        assert_eq!(BufferMask::EFFECTS_STEREO.bits(), 0x78);
        assert_eq!(BufferMask::single(3), BufferMask::BUF_3);
    }

    #[test]
    fn test_bank_rejects_bad_rates() {
        let mut bank = BufferBank::new(Router::default());
        assert!(bank.set_sample_rate(0, 100).is_err());
        assert!(bank.set_sample_rate(44_100, 0).is_err());
        assert!(bank.set_sample_rate(44_100, MAX_BUFFER_LENGTH_MS + 1).is_err());
        assert_eq!(bank.sample_rate, 0);

        bank.set_sample_rate(44_100, 100).unwrap();
        assert_eq!(bank.length_frames(), 4410);
    }
}
