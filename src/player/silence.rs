//! Silence lookahead and the `play` core
//!
//! While output is silent the emulator runs ahead of playback by the
//! lookahead factor. Silence found ahead of time is replayed from a counter
//! instead of from the emulator; the first non-silent lookahead block is kept
//! in `buf` and replayed once the counter is exhausted. `out_time` therefore
//! always reflects logical track time, while `emu_time` may run ahead.
//!
//! ```text
//!   out_time                  silence.time            emu_time
//!      |---- silence.count ------|--- buf_remain ---|
//! ```

use super::TrackPlayer;
use crate::constants::{SILENCE_BUF_SIZE, SILENCE_THRESHOLD, STEREO};
use crate::mixer::MixBuffer;
use crate::synth::VoiceSynthesizer;
use crate::{PlayerError, Result};

const BUF_SIZE: i64 = SILENCE_BUF_SIZE as i64;

/// True when `sample` lies within the silence threshold around zero.
#[inline]
fn is_silent(sample: i16) -> bool {
    (i32::from(sample) + SILENCE_THRESHOLD / 2) as u32 <= SILENCE_THRESHOLD as u32
}

/// Number of consecutive silent samples at the end of `samples`.
///
/// The first sample is never counted on its own: a block whose only loud
/// sample is the first one counts as entirely silent.
pub(crate) fn count_silence(samples: &[i16]) -> usize {
    match samples.iter().skip(1).rposition(|&s| !is_silent(s)) {
        Some(pos) => samples.len() - (pos + 2),
        None => samples.len(),
    }
}

impl<S: VoiceSynthesizer, M: MixBuffer> TrackPlayer<S, M> {
    /// Generate `out.len()` samples of emulator output, or silence once the
    /// emulator has ended.
    pub(super) fn emu_play(&mut self, out: &mut [i16]) {
        self.emu_time += out.len() as i64;
        if self.current_track.is_some() && !self.emu_track_ended {
            let result = self.generate(out);
            self.end_track_if_error(result);
        } else {
            out.fill(0);
        }
    }

    /// A synthesizer error ends emulation for this track and becomes the
    /// current warning.
    pub(super) fn end_track_if_error(&mut self, result: Result<()>) {
        if let Err(e) = result {
            self.emu_track_ended = true;
            let message = match e {
                PlayerError::SynthesisFailure(msg) => msg,
                other => other.to_string(),
            };
            self.set_warning(format!("synthesis failure, track ended: {message}"));
        }
    }

    /// Fill the lookahead buffer and check it for silence.
    pub(super) fn fill_buf(&mut self) {
        debug_assert_eq!(self.silence.buf_remain, 0);
        if !self.emu_track_ended {
            let mut buf = std::mem::take(&mut self.silence.buf);
            self.emu_play(&mut buf);
            let silence = count_silence(&buf) as i64;
            self.silence.buf = buf;
            if silence < BUF_SIZE {
                self.silence.time = self.emu_time - silence;
                self.silence.buf_remain = BUF_SIZE;
                return;
            }
        }
        self.silence.count += BUF_SIZE;
    }

    /// Run the emulator until it produces sound, for at most the configured
    /// initial-silence budget. Returns the number of silent samples dropped.
    pub(super) fn skip_initial_silence(&mut self) -> i64 {
        let end = i64::from(self.config.max_initial_silence_secs)
            * STEREO as i64
            * i64::from(self.sample_rate);
        while self.emu_time < end {
            self.fill_buf();
            if self.silence.buf_remain != 0 || self.emu_track_ended {
                break;
            }
        }
        let skipped = self.emu_time - self.silence.buf_remain;
        self.emu_time = self.silence.buf_remain;
        self.out_time = 0;
        self.silence.time = 0;
        self.silence.count = 0;
        skipped
    }

    /// Play `out.len()` samples of the current track.
    ///
    /// Once the track has ended the output is silence. A synthesizer error
    /// ends the track and zeroes the rest of `out`; it is reported through
    /// [`warning`](Self::warning), not as an error.
    pub fn play(&mut self, out: &mut [i16]) -> Result<()> {
        self.require_sample_rate()?;
        if self.current_track.is_none() {
            return Err(PlayerError::NoTrackStarted);
        }
        if out.len() % STEREO != 0 {
            return Err(PlayerError::OddSampleCount(out.len()));
        }
        let count = out.len() as i64;

        if self.track_ended {
            out.fill(0);
        } else {
            debug_assert!(self.emu_time >= self.out_time);
            let mut pos = 0usize;

            if self.silence.count != 0 {
                // during a run of silence, run the emulator ahead of playback
                let lookahead = i64::from(self.config.silence_lookahead);
                let ahead_time = lookahead * (self.out_time + count - self.silence.time)
                    + self.silence.time;
                while self.emu_time < ahead_time
                    && self.silence.buf_remain == 0
                    && !self.emu_track_ended
                {
                    self.fill_buf();
                }

                let n = self.silence.count.min(count) as usize;
                out[..n].fill(0);
                pos = n;
                self.silence.count -= n as i64;

                let silence_max = i64::from(self.config.silence_max_secs)
                    * STEREO as i64
                    * i64::from(self.sample_rate);
                if self.emu_time - self.silence.time > silence_max {
                    log::debug!("silence run ended track at {} samples", self.out_time);
                    self.track_ended = true;
                    self.emu_track_ended = true;
                    self.silence.count = 0;
                    self.silence.buf_remain = 0;
                }
            }

            if self.silence.buf_remain != 0 {
                // replay the lookahead block
                let n = (self.silence.buf_remain as usize).min(out.len() - pos);
                let start = SILENCE_BUF_SIZE - self.silence.buf_remain as usize;
                out[pos..pos + n].copy_from_slice(&self.silence.buf[start..start + n]);
                self.silence.buf_remain -= n as i64;
                pos += n;
            }

            let remain = out.len() - pos;
            if remain != 0 {
                self.emu_play(&mut out[pos..]);
                self.track_ended |= self.emu_track_ended;

                if !self.ignore_silence || self.out_time > self.fade.start() {
                    // check the end for a new run of silence
                    let silence = count_silence(&out[pos..]);
                    if silence < remain {
                        self.silence.time = self.emu_time - silence as i64;
                    }
                    if self.emu_time - self.silence.time >= BUF_SIZE {
                        // silence detection resumes on the next call
                        self.fill_buf();
                    }
                }
            }

            if self.fade.covers(self.out_time, out.len()) && self.fade.apply(self.out_time, out) {
                self.track_ended = true;
                self.emu_track_ended = true;
            }
        }

        self.out_time += count;
        Ok(())
    }
}
