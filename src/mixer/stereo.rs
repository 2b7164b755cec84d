//! Plain center/left/right downmix
//!
//! Used directly as a lightweight [`MixBuffer`], and by the effects mixer
//! whenever its effects are switched off.

use super::fixed_point::clamp_sample;
use super::router::Router;
use super::{BufferBank, BufferMask, ChannelOutputs, MixBuffer, VoiceSink};
use crate::constants::STEREO;
use crate::Result;

/// Write `count` frames of the center buffer to both output channels.
pub(crate) fn mix_mono(bank: &BufferBank, out: &mut [i16], start: usize, count: usize) {
    let center = &bank.buffers[0];
    for (i, frame) in out.chunks_exact_mut(STEREO).take(count).enumerate() {
        let s = clamp_sample(center.sample(start + i));
        frame[0] = s;
        frame[1] = s;
    }
}

/// Write `count` frames of center + left/right to the output.
pub(crate) fn mix_stereo(bank: &BufferBank, out: &mut [i16], start: usize, count: usize) {
    let center = &bank.buffers[0];
    let left = &bank.buffers[1];
    let right = &bank.buffers[2];
    for (i, frame) in out.chunks_exact_mut(STEREO).take(count).enumerate() {
        let idx = start + i;
        let c = center.sample(idx);
        frame[0] = clamp_sample(c.saturating_add(left.sample(idx)));
        frame[1] = clamp_sample(c.saturating_add(right.sample(idx)));
    }
}

/// Three-buffer stereo mixer without effects.
///
/// Frames in which no voice wrote stereo output are mixed from the center
/// buffer alone.
#[derive(Debug, Clone)]
pub struct StereoMixer {
    bank: BufferBank,
    /// Frames that still need the stereo path
    stereo_remain: usize,
}

impl StereoMixer {
    /// Create an unconfigured mixer. Call [`MixBuffer::set_sample_rate`]
    /// before use.
    pub fn new() -> Self {
        Self {
            bank: BufferBank::new(Router::new(false)),
            stereo_remain: 0,
        }
    }
}

impl Default for StereoMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl MixBuffer for StereoMixer {
    fn set_sample_rate(&mut self, rate: u32, length_ms: u32) -> Result<()> {
        self.bank.set_sample_rate(rate, length_ms)?;
        self.clear();
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.bank.sample_rate
    }

    fn length_frames(&self) -> usize {
        self.bank.length_frames()
    }

    fn clear(&mut self) {
        self.stereo_remain = 0;
        self.bank.clear();
    }

    fn channel(&self, voice: usize) -> ChannelOutputs {
        self.bank.router.channel(voice)
    }

    fn voice_sink(&mut self, mute_mask: u32) -> VoiceSink<'_> {
        self.bank.sink(mute_mask)
    }

    fn end_frame(&mut self, frames: usize) {
        let used = self.bank.end_frame(frames);
        if used.intersects(BufferMask::PLAIN_STEREO) {
            self.stereo_remain = self.bank.avail_frames();
        }
    }

    fn samples_avail(&self) -> usize {
        self.bank.avail_frames() * STEREO
    }

    fn read_samples(&mut self, out: &mut [i16]) -> usize {
        let frames = self.bank.avail_frames().min(out.len() / STEREO);
        let mut done = 0;
        while done < frames {
            let mut count = frames - done;
            let span = &mut out[done * STEREO..];
            if self.stereo_remain > 0 {
                count = count.min(self.stereo_remain);
                mix_stereo(&self.bank, span, done, count);
            } else {
                mix_mono(&self.bank, span, done, count);
            }
            self.stereo_remain = self.stereo_remain.saturating_sub(count);
            done += count;
        }
        self.bank.remove_samples(frames);
        frames * STEREO
    }
}
