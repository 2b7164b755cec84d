//! Track playback controller
//!
//! [`TrackPlayer`] owns a [`VoiceSynthesizer`] and a [`MixBuffer`] and turns
//! them into a track-oriented player: it keeps track time, skips leading
//! silence, detects the end of a track, fades out, seeks and scales tempo.
//!
//! The implementation is split across submodules:
//! - `silence`: lookahead buffer and the `play` core
//! - `fade`: fade-out envelope
//! - `tempo`: fixed-point tempo resampling and synthesizer driving
//! - `timing`: tell, seek and skip

mod fade;
mod silence;
mod tempo;
mod timing;

pub use fade::{Fade, FadeCurve};
pub use tempo::TempoResampler;

use crate::constants::{
    DEFAULT_BUFFER_LENGTH_MS, DEFAULT_FADE_LENGTH_MS, DEFAULT_MAX_INITIAL_SILENCE_SECS,
    DEFAULT_SILENCE_LOOKAHEAD, DEFAULT_SILENCE_MAX_SECS, FIXED_UNIT, MAX_BUFFER_LENGTH_MS,
    SILENCE_BUF_SIZE,
};
use crate::mixer::fixed_point::{to_fixed, Fixed};
use crate::mixer::{EffectsMixer, MixBuffer, MixerConfig};
use crate::synth::{Equalizer, TrackInfo, VoiceSynthesizer};
use crate::{PlayerError, Result};
use serde::{Deserialize, Serialize};

/// Controller tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Length of the mixer's accumulation buffers in milliseconds
    pub buffer_length_ms: u32,
    /// Leading silence skipped by `start_track`, in seconds
    pub max_initial_silence_secs: u32,
    /// Emulator speed multiplier while looking ahead through silence
    pub silence_lookahead: u32,
    /// Continuous silence that ends a track, in seconds
    pub silence_max_secs: u32,
    /// Length of the automatic fade-out in milliseconds
    pub fade_length_ms: u32,
    /// Fade out at the track's declared length when `start_track` runs
    pub autoload_playback_limit: bool,
    /// Shape of the fade-out
    pub fade_curve: FadeCurve,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            buffer_length_ms: DEFAULT_BUFFER_LENGTH_MS,
            max_initial_silence_secs: DEFAULT_MAX_INITIAL_SILENCE_SECS,
            silence_lookahead: DEFAULT_SILENCE_LOOKAHEAD,
            silence_max_secs: DEFAULT_SILENCE_MAX_SECS,
            fade_length_ms: DEFAULT_FADE_LENGTH_MS,
            autoload_playback_limit: true,
            fade_curve: FadeCurve::Linear,
        }
    }
}

impl PlayerConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PlayerError::ConfigurationRejected(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field against its accepted range.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_length_ms == 0 || self.buffer_length_ms > MAX_BUFFER_LENGTH_MS {
            return Err(PlayerError::ConfigurationRejected(format!(
                "buffer_length_ms = {} outside 1..={MAX_BUFFER_LENGTH_MS}",
                self.buffer_length_ms
            )));
        }
        if self.silence_lookahead == 0 {
            return Err(PlayerError::ConfigurationRejected(
                "silence_lookahead must be at least 1".into(),
            ));
        }
        if self.silence_max_secs == 0 {
            return Err(PlayerError::ConfigurationRejected(
                "silence_max_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Silence lookahead state.
#[derive(Debug, Clone)]
pub(crate) struct SilenceState {
    /// Emulator time at which the most recent silence began
    pub(crate) time: i64,
    /// Samples of silence to emit before using `buf`
    pub(crate) count: i64,
    /// Samples left at the end of `buf`
    pub(crate) buf_remain: i64,
    pub(crate) buf: Vec<i16>,
}

impl SilenceState {
    fn new() -> Self {
        Self {
            time: 0,
            count: 0,
            buf_remain: 0,
            buf: vec![0; SILENCE_BUF_SIZE],
        }
    }

    fn reset(&mut self) {
        self.time = 0;
        self.count = 0;
        self.buf_remain = 0;
    }
}

/// Track playback controller.
///
/// Generic over the synthesizer and the output mixer; the mixer defaults to
/// [`EffectsMixer`] and is default-constructed by [`TrackPlayer::new`].
///
/// All sample counts are interleaved stereo samples, two per frame.
///
/// # Lifecycle
///
/// 1. Optional: [`set_gain`](Self::set_gain), [`set_config`](Self::set_config)
/// 2. [`set_sample_rate`](Self::set_sample_rate), exactly once
/// 3. [`start_track`](Self::start_track)
/// 4. [`play`](Self::play) until [`track_ended`](Self::track_ended)
pub struct TrackPlayer<S, M = EffectsMixer> {
    pub(crate) synth: S,
    pub(crate) mixer: M,
    pub(crate) config: PlayerConfig,

    // settings kept across tracks
    pub(crate) sample_rate: u32,
    pub(crate) gain: f64,
    pub(crate) gain_fixed: Fixed,
    pub(crate) equalizer: Equalizer,
    pub(crate) mute_mask: u32,
    pub(crate) ignore_silence: bool,
    pub(crate) tempo: TempoResampler,
    pub(crate) tempo_buf: Vec<i16>,

    // per-track state
    pub(crate) current_track: Option<usize>,
    /// Samples played since the start of the track
    pub(crate) out_time: i64,
    /// Samples the emulator has generated since the start of the track
    pub(crate) emu_time: i64,
    pub(crate) emu_track_ended: bool,
    pub(crate) track_ended: bool,
    pub(crate) fade: Fade,
    /// A fade was set by the caller since the last `start_track`
    pub(crate) fade_set: bool,
    pub(crate) silence: SilenceState,
    pub(crate) warning: Option<String>,
}

impl<S: VoiceSynthesizer, M: MixBuffer + Default> TrackPlayer<S, M> {
    /// Create a player with a default-constructed mixer.
    pub fn new(synth: S) -> Self {
        Self::with_mixer(synth, M::default())
    }
}

impl<S: VoiceSynthesizer, M: MixBuffer> TrackPlayer<S, M> {
    /// Create a player that mixes through `mixer`.
    pub fn with_mixer(synth: S, mixer: M) -> Self {
        let config = PlayerConfig::default();
        Self {
            synth,
            mixer,
            config,
            sample_rate: 0,
            gain: 1.0,
            gain_fixed: FIXED_UNIT,
            equalizer: Equalizer::DEFAULT,
            mute_mask: 0,
            ignore_silence: false,
            tempo: TempoResampler::new(),
            tempo_buf: Vec::new(),
            current_track: None,
            out_time: 0,
            emu_time: 0,
            emu_track_ended: true,
            track_ended: true,
            fade: Fade::new(config.fade_curve),
            fade_set: false,
            silence: SilenceState::new(),
            warning: None,
        }
    }

    /// Replace the controller tunables.
    ///
    /// The buffer length can only change before the sample rate is set.
    pub fn set_config(&mut self, config: PlayerConfig) -> Result<()> {
        config.validate()?;
        if self.sample_rate != 0 && config.buffer_length_ms != self.config.buffer_length_ms {
            return Err(PlayerError::AlreadyConfigured);
        }
        self.config = config;
        self.fade.set_curve(config.fade_curve);
        Ok(())
    }

    /// Controller tunables.
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Set the output sample rate. Must be called exactly once, before any
    /// track is started.
    pub fn set_sample_rate(&mut self, rate: u32) -> Result<()> {
        if self.sample_rate != 0 {
            return Err(PlayerError::AlreadyConfigured);
        }
        self.mixer.set_sample_rate(rate, self.config.buffer_length_ms)?;
        self.synth.set_sample_rate(rate)?;
        self.synth.set_equalizer(&self.equalizer);
        self.sample_rate = rate;
        log::debug!(
            "sample rate {rate} Hz, {} frame buffers",
            self.mixer.length_frames()
        );
        Ok(())
    }

    /// Output sample rate, or 0 before [`set_sample_rate`](Self::set_sample_rate).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Change overall output amplitude, where 1.0 is unity.
    ///
    /// Must be called before [`set_sample_rate`](Self::set_sample_rate).
    pub fn set_gain(&mut self, gain: f64) -> Result<()> {
        if self.sample_rate != 0 {
            return Err(PlayerError::AlreadyConfigured);
        }
        if !gain.is_finite() || gain < 0.0 || gain > 64.0 {
            return Err(PlayerError::ConfigurationRejected(format!(
                "gain {gain} outside 0..=64"
            )));
        }
        self.gain = gain;
        self.gain_fixed = to_fixed(gain);
        Ok(())
    }

    /// Output amplitude factor.
    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub(crate) fn require_sample_rate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            Err(PlayerError::NotConfigured)
        } else {
            Ok(())
        }
    }

    fn clear_track_vars(&mut self) {
        self.current_track = None;
        self.out_time = 0;
        self.emu_time = 0;
        self.emu_track_ended = true;
        self.track_ended = true;
        self.fade.reset();
        self.fade_set = false;
        self.silence.reset();
        self.tempo.reset();
        self.warning = None;
    }

    /// Start `track`, where 0 is the first track.
    ///
    /// Mute mask, tempo and equalizer carry over from the previous track.
    /// Leading silence is skipped unless silence detection is disabled.
    ///
    /// A fade set with [`set_fade`](Self::set_fade) since the previous
    /// `start_track` is kept; otherwise the track gets the default fade.
    /// If the synthesizer rejects the track, the previous track keeps
    /// playing untouched.
    pub fn start_track(&mut self, track: usize) -> Result<()> {
        self.require_sample_rate()?;
        let count = self.synth.track_count();
        if track >= count {
            return Err(PlayerError::InvalidTrackIndex {
                index: track,
                count,
            });
        }

        self.synth.mute_voices(self.mute_mask);
        self.synth.start_track(track)?;

        let explicit_fade = self.fade_set.then_some(self.fade);
        self.clear_track_vars();
        self.mixer.clear();

        self.current_track = Some(track);
        self.emu_track_ended = false;
        self.track_ended = false;

        if let Some(fade) = explicit_fade {
            self.fade = fade;
        } else if self.config.autoload_playback_limit {
            let length_ms = self.synth.track_info(track).play_length_ms();
            self.apply_fade(u64::from(length_ms), u64::from(self.config.fade_length_ms));
        }

        let skipped = if self.ignore_silence {
            0
        } else {
            self.skip_initial_silence()
        };
        log::debug!("started track {track}, {skipped} samples of leading silence skipped");
        Ok(())
    }

    /// Index of the current track, or `None` before a track is started.
    pub fn current_track(&self) -> Option<usize> {
        self.current_track
    }

    /// True once the track has reached its end. Stays true until the next
    /// [`start_track`](Self::start_track).
    pub fn track_ended(&self) -> bool {
        self.track_ended
    }

    /// Fade out starting at `start_ms` over `length_ms`. Once the fade
    /// completes, [`track_ended`](Self::track_ended) returns true.
    ///
    /// May be called while the track is playing. Called before
    /// [`start_track`](Self::start_track), it replaces the default fade of
    /// the track being started.
    pub fn set_fade(&mut self, start_ms: u64, length_ms: u64) -> Result<()> {
        self.require_sample_rate()?;
        self.apply_fade(start_ms, length_ms);
        self.fade_set = true;
        Ok(())
    }

    fn apply_fade(&mut self, start_ms: u64, length_ms: u64) {
        let start = self.msec_to_samples(start_ms);
        let length = self.msec_to_samples(length_ms);
        self.fade.set(start, length);
    }

    /// Fade out starting at `start_ms` with the configured fade length.
    pub fn set_fade_start(&mut self, start_ms: u64) -> Result<()> {
        self.set_fade(start_ms, u64::from(self.config.fade_length_ms))
    }

    /// Select the shape of the fade-out.
    pub fn set_fade_curve(&mut self, curve: FadeCurve) {
        self.config.fade_curve = curve;
        self.fade.set_curve(curve);
    }

    /// Current fade, in samples.
    pub fn fade(&self) -> &Fade {
        &self.fade
    }

    /// Disable leading-silence skipping and silence-based end detection.
    pub fn ignore_silence(&mut self, ignore: bool) {
        self.ignore_silence = ignore;
    }

    /// Adjust tempo, where 1.0 is normal speed, 0.5 half speed and 2.0
    /// double speed. Clamped to 0.02..=4.0.
    ///
    /// Declared track lengths assume a tempo of 1.0.
    pub fn set_tempo(&mut self, tempo: f64) -> Result<()> {
        self.require_sample_rate()?;
        let applied = self.tempo.set_tempo(tempo);
        log::debug!("tempo {applied:.3}");
        Ok(())
    }

    /// Tempo in effect.
    pub fn tempo(&self) -> f64 {
        self.tempo.tempo()
    }

    /// Mute or unmute voice `index`.
    pub fn mute_voice(&mut self, index: usize, mute: bool) -> Result<()> {
        self.require_sample_rate()?;
        let count = self.synth.voice_count();
        if index >= count || index >= 32 {
            return Err(PlayerError::InvalidVoice { index, count });
        }
        let bit = 1u32 << index;
        let mask = if mute {
            self.mute_mask | bit
        } else {
            self.mute_mask & !bit
        };
        self.mute_voices(mask)
    }

    /// Set the mute state of all voices at once. Bit `i` mutes voice `i`;
    /// `u32::MAX` mutes everything.
    pub fn mute_voices(&mut self, mask: u32) -> Result<()> {
        self.require_sample_rate()?;
        self.apply_mute_mask(mask);
        Ok(())
    }

    pub(crate) fn apply_mute_mask(&mut self, mask: u32) {
        self.mute_mask = mask;
        self.synth.mute_voices(mask);
    }

    /// Current mute mask.
    pub fn mute_mask(&self) -> u32 {
        self.mute_mask
    }

    /// Set treble/bass equalization.
    pub fn set_equalizer(&mut self, equalizer: Equalizer) {
        self.equalizer = equalizer;
        self.synth.set_equalizer(&equalizer);
    }

    /// Current equalization.
    pub fn equalizer(&self) -> Equalizer {
        self.equalizer
    }

    /// Enable slower but more accurate emulation, if the synthesizer has it.
    pub fn enable_accuracy(&mut self, enable: bool) {
        self.synth.enable_accuracy(enable);
    }

    /// Adjust stereo depth between 0.0 (effects off) and 1.0. Mixers
    /// without effects ignore it.
    pub fn set_stereo_depth(&mut self, depth: f64) {
        self.mixer.set_stereo_depth(depth);
    }

    /// Number of voices.
    pub fn voice_count(&self) -> usize {
        self.synth.voice_count()
    }

    /// Display names of the voices.
    pub fn voice_names(&self) -> Vec<String> {
        self.synth.voice_names()
    }

    /// Number of tracks.
    pub fn track_count(&self) -> usize {
        self.synth.track_count()
    }

    /// Declared timing of `track`.
    pub fn track_info(&self, track: usize) -> Result<TrackInfo> {
        let count = self.synth.track_count();
        if track >= count {
            return Err(PlayerError::InvalidTrackIndex {
                index: track,
                count,
            });
        }
        Ok(self.synth.track_info(track))
    }

    /// Most recent warning, cleared by [`start_track`](Self::start_track).
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Take the most recent warning, clearing it.
    pub fn take_warning(&mut self) -> Option<String> {
        self.warning.take()
    }

    pub(crate) fn set_warning(&mut self, warning: String) {
        log::warn!("{warning}");
        self.warning = Some(warning);
    }

    /// Play `count` samples into a new buffer.
    pub fn render(&mut self, count: usize) -> Result<Vec<i16>> {
        let mut out = vec![0; count];
        self.play(&mut out)?;
        Ok(out)
    }

    /// The synthesizer.
    pub fn synth(&self) -> &S {
        &self.synth
    }

    /// Mutable access to the synthesizer.
    pub fn synth_mut(&mut self) -> &mut S {
        &mut self.synth
    }

    /// The output mixer.
    pub fn mixer(&self) -> &M {
        &self.mixer
    }

    /// Mutable access to the output mixer.
    pub fn mixer_mut(&mut self) -> &mut M {
        &mut self.mixer
    }
}

impl<S: VoiceSynthesizer> TrackPlayer<S, EffectsMixer> {
    /// Apply an effects configuration to the mixer. On error the previous
    /// configuration stays in effect.
    pub fn configure(&mut self, config: MixerConfig) -> Result<()> {
        self.mixer.configure(config)
    }
}

impl<S, M> std::fmt::Debug for TrackPlayer<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackPlayer")
            .field("sample_rate", &self.sample_rate)
            .field("current_track", &self.current_track)
            .field("out_time", &self.out_time)
            .field("emu_time", &self.emu_time)
            .field("track_ended", &self.track_ended)
            .field("tempo", &self.tempo.tempo())
            .field("mute_mask", &format_args!("{:#x}", self.mute_mask))
            .finish_non_exhaustive()
    }
}
