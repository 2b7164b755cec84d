//! Track position: tell, seek and skip
//!
//! Seeking backwards restarts the track and skips forward; there is no
//! cheaper way to rewind an emulator. Forward seeks run the emulator
//! without producing audible output.

use super::TrackPlayer;
use crate::constants::{LONG_SKIP_THRESHOLD, SILENCE_BUF_SIZE, STEREO};
use crate::mixer::MixBuffer;
use crate::synth::VoiceSynthesizer;
use crate::{PlayerError, Result};

impl<S: VoiceSynthesizer, M: MixBuffer> TrackPlayer<S, M> {
    /// Milliseconds to interleaved samples at the current rate.
    pub(crate) fn msec_to_samples(&self, msec: u64) -> i64 {
        let rate = i64::from(self.sample_rate);
        let msec = msec.min(i64::MAX as u64 / 4 / rate.max(1) as u64) as i64;
        let sec = msec / 1000;
        let rem = msec - sec * 1000;
        (sec * rate + rem * rate / 1000) * STEREO as i64
    }

    /// Milliseconds played since the start of the track.
    pub fn tell(&self) -> u64 {
        let rate = i64::from(self.sample_rate) * STEREO as i64;
        if rate == 0 {
            return 0;
        }
        let sec = self.out_time / rate;
        (sec * 1000 + (self.out_time - sec * rate) * 1000 / rate) as u64
    }

    /// Samples played since the start of the track.
    pub fn tell_samples(&self) -> u64 {
        self.out_time as u64
    }

    /// Seek to `msec` milliseconds into the track.
    ///
    /// Seeking backwards or far forward can take a while.
    pub fn seek(&mut self, msec: u64) -> Result<()> {
        self.require_sample_rate()?;
        let time = self.msec_to_samples(msec);
        self.seek_to(time)
    }

    /// Seek to sample `n`; equivalent to restarting the track and skipping
    /// `n` samples.
    pub fn seek_samples(&mut self, n: u64) -> Result<()> {
        self.require_sample_rate()?;
        self.seek_to(i64::try_from(n).unwrap_or(i64::MAX / 2))
    }

    fn seek_to(&mut self, time: i64) -> Result<()> {
        let track = self.current_track.ok_or(PlayerError::NoTrackStarted)?;
        if time < self.out_time {
            // a restart keeps the caller's fade
            let (fade, fade_set) = (self.fade, self.fade_set);
            self.start_track(track)?;
            self.fade = fade;
            self.fade_set = fade_set;
        }
        self.skip_to(time - self.out_time);
        Ok(())
    }

    /// Skip `count` samples without producing output.
    ///
    /// Silence and fade bookkeeping continue, so a later `play` resumes at
    /// exactly the skipped position.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        self.require_sample_rate()?;
        if self.current_track.is_none() {
            return Err(PlayerError::NoTrackStarted);
        }
        if count % STEREO as u64 != 0 {
            return Err(PlayerError::OddSampleCount(count as usize));
        }
        self.skip_to(i64::try_from(count).unwrap_or(i64::MAX / 2));
        Ok(())
    }

    fn skip_to(&mut self, mut count: i64) {
        if count <= 0 {
            return;
        }
        self.out_time += count;

        // consume buffered silence and lookahead first
        let n = count.min(self.silence.count);
        self.silence.count -= n;
        count -= n;

        let n = count.min(self.silence.buf_remain);
        self.silence.buf_remain -= n;
        count -= n;

        if count != 0 && !self.emu_track_ended {
            self.emu_time += count;
            let result = self.skip_emu(count);
            self.end_track_if_error(result);
        }

        if self.silence.count == 0 && self.silence.buf_remain == 0 {
            // caught up to the emulator
            self.track_ended |= self.emu_track_ended;
        }

        if !self.track_ended && self.out_time - self.fade.start() >= self.fade.length() {
            log::debug!("skipped past end of fade");
            self.track_ended = true;
            self.emu_track_ended = true;
        }
    }

    /// Run the emulator for `count` samples, discarding the output.
    ///
    /// Long skips run with every voice muted.
    fn skip_emu(&mut self, mut count: i64) -> Result<()> {
        const BUF_SIZE: i64 = SILENCE_BUF_SIZE as i64;
        let threshold = LONG_SKIP_THRESHOLD as i64;
        let mut scratch = vec![0i16; SILENCE_BUF_SIZE];

        if count > threshold {
            log::debug!("long skip of {count} samples");
            let saved = self.mute_mask;
            self.apply_mute_mask(u32::MAX);
            let mut result = Ok(());
            while count > threshold / 2 && !self.emu_track_ended {
                result = self.generate(&mut scratch);
                if result.is_err() {
                    break;
                }
                count -= BUF_SIZE;
            }
            self.apply_mute_mask(saved);
            result?;
        }

        while count > 0 && !self.emu_track_ended {
            let n = count.min(BUF_SIZE);
            count -= n;
            self.generate(&mut scratch[..n as usize])?;
        }
        Ok(())
    }
}
