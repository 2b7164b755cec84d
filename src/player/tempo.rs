//! Tempo scaling
//!
//! Output frame `k` of a track plays synthesizer frame `⌊k · tempo⌋`, with
//! tempo held in 16.16 fixed point. The source position is a running integer,
//! so the frames pulled from the synthesizer do not depend on how output is
//! split across `play` calls. Tempo below 1.0 repeats source frames, above
//! 1.0 drops them.

use super::TrackPlayer;
use crate::constants::{FIXED_UNIT, MAX_TEMPO, MIN_TEMPO, STEREO, TEMPO_SHIFT};
use crate::mixer::fixed_point::{clamp_sample, fmul};
use crate::mixer::MixBuffer;
use crate::synth::{SynthStatus, VoiceSynthesizer};
use crate::Result;

const TEMPO_UNIT: u64 = 1 << TEMPO_SHIFT;

/// Fixed-point frame resampler.
#[derive(Debug, Clone)]
pub struct TempoResampler {
    /// Source frames advanced per output frame, 16.16 fixed point
    step: u64,
    /// Source position of the next output frame, 16.16 fixed point
    pos: u64,
    /// Source frames pulled from the synthesizer so far
    generated: u64,
    /// Most recent source frame, for output frames that repeat it
    last: [i16; STEREO],
}

impl TempoResampler {
    /// Resampler at normal speed.
    pub fn new() -> Self {
        Self {
            step: TEMPO_UNIT,
            pos: 0,
            generated: 0,
            last: [0; STEREO],
        }
    }

    /// Set the tempo, clamped to [`MIN_TEMPO`]..=[`MAX_TEMPO`]. Returns the
    /// tempo in effect.
    pub fn set_tempo(&mut self, tempo: f64) -> f64 {
        let tempo = if tempo.is_finite() {
            tempo.clamp(MIN_TEMPO, MAX_TEMPO)
        } else {
            1.0
        };
        self.step = (tempo * TEMPO_UNIT as f64).round() as u64;
        self.tempo()
    }

    /// Tempo in effect.
    pub fn tempo(&self) -> f64 {
        self.step as f64 / TEMPO_UNIT as f64
    }

    /// Rewind to the start of a track, keeping the tempo.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.generated = 0;
        self.last = [0; STEREO];
    }

    /// Source frames pulled so far.
    pub fn source_frames(&self) -> u64 {
        self.generated
    }

    /// True when output frames map one-to-one onto new source frames.
    pub fn is_passthrough(&self) -> bool {
        self.step == TEMPO_UNIT && self.pos == self.generated << TEMPO_SHIFT
    }

    /// New source frames needed to produce `out_frames` output frames.
    pub fn source_frames_needed(&self, out_frames: usize) -> usize {
        if out_frames == 0 {
            return 0;
        }
        let last = (self.pos + (out_frames as u64 - 1) * self.step) >> TEMPO_SHIFT;
        (last + 1).saturating_sub(self.generated) as usize
    }

    /// Record `out` as passed through unchanged.
    pub fn advance_passthrough(&mut self, out: &[i16]) {
        let frames = (out.len() / STEREO) as u64;
        if let Some(last) = out.chunks_exact(STEREO).last() {
            self.last.copy_from_slice(last);
        }
        self.pos += frames << TEMPO_SHIFT;
        self.generated += frames;
    }

    /// Fill `out` from `source`, which holds exactly
    /// [`source_frames_needed`](Self::source_frames_needed) new frames.
    pub fn resample(&mut self, source: &[i16], out: &mut [i16]) {
        let source_frames = (source.len() / STEREO) as u64;
        for frame in out.chunks_exact_mut(STEREO) {
            let index = self.pos >> TEMPO_SHIFT;
            if index < self.generated {
                frame.copy_from_slice(&self.last);
            } else {
                let at = ((index - self.generated) as usize) * STEREO;
                match source.get(at..at + STEREO) {
                    Some(src) => frame.copy_from_slice(src),
                    None => frame.fill(0),
                }
            }
            self.pos += self.step;
        }
        if let Some(last) = source.chunks_exact(STEREO).last() {
            self.last.copy_from_slice(last);
        }
        self.generated += source_frames;
    }
}

impl Default for TempoResampler {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: VoiceSynthesizer, M: MixBuffer> TrackPlayer<S, M> {
    /// Produce `out.len()` samples of track audio at the current tempo.
    ///
    /// On a synthesizer error the samples not yet produced are zeroed.
    pub(super) fn generate(&mut self, out: &mut [i16]) -> Result<()> {
        if self.tempo.is_passthrough() {
            let result = self.pull_source(out);
            self.tempo.advance_passthrough(out);
            return result;
        }

        let needed = self.tempo.source_frames_needed(out.len() / STEREO);
        let mut source = std::mem::take(&mut self.tempo_buf);
        source.clear();
        source.resize(needed * STEREO, 0);
        let result = self.pull_source(&mut source);
        self.tempo.resample(&source, out);
        self.tempo_buf = source;
        result
    }

    /// Run the synthesizer and drain the mixer until `out` is full.
    fn pull_source(&mut self, out: &mut [i16]) -> Result<()> {
        let mut pos = 0;
        while pos < out.len() {
            if self.mixer.samples_avail() > 0 {
                pos += self.mixer.read_samples(&mut out[pos..]);
                continue;
            }
            if self.emu_track_ended {
                out[pos..].fill(0);
                break;
            }

            let frames = ((out.len() - pos) / STEREO)
                .min(self.mixer.free_frames())
                .max(1);
            let status = {
                let mut sink = self.mixer.voice_sink(self.mute_mask);
                self.synth.generate(frames, &mut sink)
            };
            match status {
                Ok(status) => {
                    self.mixer.end_frame(frames);
                    log::trace!("generated {frames} frames");
                    if status == SynthStatus::Ended {
                        log::debug!("synthesizer reached end of track");
                        self.emu_track_ended = true;
                    }
                }
                Err(e) => {
                    out[pos..].fill(0);
                    self.apply_gain(&mut out[..pos]);
                    return Err(e);
                }
            }
        }

        self.apply_gain(out);
        Ok(())
    }

    fn apply_gain(&self, out: &mut [i16]) {
        if self.gain_fixed != FIXED_UNIT {
            for s in out.iter_mut() {
                *s = clamp_sample(fmul(i32::from(*s), self.gain_fixed));
            }
        }
    }
}
