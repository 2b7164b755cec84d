//! Multi-channel effects mixer with panning, echo and reverb
//!
//! Seven accumulation buffers feed one output stereo pair:
//!
//! - buffers 0/1 are reverb sends panned by `pan_1`/`pan_2`
//! - buffers 3/4 are left/right output of the reverb voices
//! - buffer 2 is the echo send (center)
//! - buffers 5/6 are left/right output of the echo voices, mixed dry
//!
//! The echo is a single feedback tap on its own delay line. The reverb is one
//! stereo-interleaved delay line without feedback, read at two offsets
//! (`reverb_delay ± variance / 2`) so the left and right tails decorrelate.
//!
//! All gain math runs in 15-bit fixed point; identical input and
//! configuration produce identical output on every platform.

use super::delay_line::DelayLine;
use super::fixed_point::{clamp_sample, fmul, to_fixed, Fixed};
use super::router::{Router, MAX_BUF_COUNT};
use super::stereo::{mix_mono, mix_stereo};
use super::{BufferBank, BufferMask, ChannelOutputs, MixBuffer, VoiceSink};
use crate::constants::{
    MAX_DELAY_VARIANCE_MS, MAX_ECHO_DELAY_MS, MAX_REVERB_DELAY_MS, STEREO,
};
use crate::{PlayerError, Result};
use serde::{Deserialize, Serialize};

/// Effects mixer configuration.
///
/// Levels are converted to fixed-point gains once, when the configuration
/// is applied, never per sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Pan of the first reverb voice: -1.0 = left, 0.0 = center, 1.0 = right
    pub pan_1: f64,
    /// Pan of the second reverb voice
    pub pan_2: f64,
    /// Echo delay in milliseconds
    pub echo_delay_ms: f64,
    /// Echo feedback level (0.0 to 1.0)
    pub echo_level: f64,
    /// Reverb delay in milliseconds
    pub reverb_delay_ms: f64,
    /// Difference between left and right reverb delays in milliseconds
    pub reverb_delay_variance_ms: f64,
    /// Reverb level (0.0 to 1.0)
    pub reverb_level: f64,
    /// When false, the plain downmix path is used
    pub effects_enabled: bool,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            pan_1: -0.15,
            pan_2: 0.15,
            echo_delay_ms: 61.0,
            echo_level: 0.10,
            reverb_delay_ms: 88.0,
            reverb_delay_variance_ms: 18.0,
            reverb_level: 0.12,
            effects_enabled: false,
        }
    }
}

impl MixerConfig {
    /// Preset for a stereo depth between 0.0 (effects off) and 1.0.
    ///
    /// Levels stop growing above a depth of 0.5 to keep the echo and
    /// reverb from swamping the dry signal.
    pub fn from_depth(depth: f64) -> Self {
        let depth = if depth.is_finite() {
            depth.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let level_depth = depth.min(0.5);
        Self {
            pan_1: -0.6 * depth,
            pan_2: 0.6 * depth,
            echo_delay_ms: 61.0,
            echo_level: 0.30 * level_depth,
            reverb_delay_ms: 88.0,
            reverb_delay_variance_ms: 18.0,
            reverb_level: 0.5 * level_depth,
            effects_enabled: depth > 0.0,
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PlayerError::ConfigurationRejected(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field against its accepted range.
    pub fn validate(&self) -> Result<()> {
        check_range("pan_1", self.pan_1, -1.0, 1.0)?;
        check_range("pan_2", self.pan_2, -1.0, 1.0)?;
        check_range("echo_delay_ms", self.echo_delay_ms, 0.0, MAX_ECHO_DELAY_MS)?;
        check_range("echo_level", self.echo_level, 0.0, 1.0)?;
        check_range(
            "reverb_delay_ms",
            self.reverb_delay_ms,
            0.0,
            MAX_REVERB_DELAY_MS,
        )?;
        check_range(
            "reverb_delay_variance_ms",
            self.reverb_delay_variance_ms,
            0.0,
            MAX_DELAY_VARIANCE_MS,
        )?;
        check_range("reverb_level", self.reverb_level, 0.0, 1.0)?;
        Ok(())
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PlayerError::ConfigurationRejected(format!(
            "{name} = {value} outside {min}..={max}"
        )))
    }
}

/// Milliseconds to whole frames at `rate`, truncated.
fn ms_to_frames(ms: f64, rate: u32) -> i64 {
    (ms * f64::from(rate) / 1000.0) as i64
}

/// Configuration converted to fixed-point gains and frame delays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixerGains {
    /// Left/right gains of the `pan_1` send
    pub pan_1_levels: [Fixed; 2],
    /// Left/right gains of the `pan_2` send
    pub pan_2_levels: [Fixed; 2],
    /// Echo delay in frames
    pub echo_delay: usize,
    /// Echo feedback gain
    pub echo_level: Fixed,
    /// Left reverb delay in frames
    pub reverb_delay_l: usize,
    /// Right reverb delay in frames
    pub reverb_delay_r: usize,
    /// Reverb gain
    pub reverb_level: Fixed,
}

impl MixerGains {
    /// Derive gains for `config` at `rate`, pinning delays into what the
    /// delay lines can serve.
    fn derive(config: &MixerConfig, rate: u32, echo_max: usize, reverb_max: usize) -> Self {
        let pan_levels = |pan: f64| {
            let left = to_fixed(1.0) - to_fixed(pan);
            [left, to_fixed(2.0) - left]
        };
        let pin = |frames: i64, max: usize| frames.clamp(1, max.max(1) as i64) as usize;

        let offset = (config.reverb_delay_variance_ms * f64::from(rate) / 2000.0) as i64;
        let reverb = ms_to_frames(config.reverb_delay_ms, rate);

        Self {
            pan_1_levels: pan_levels(config.pan_1),
            pan_2_levels: pan_levels(config.pan_2),
            echo_delay: pin(ms_to_frames(config.echo_delay_ms, rate), echo_max),
            echo_level: to_fixed(config.echo_level),
            reverb_delay_l: pin(reverb - offset, reverb_max),
            reverb_delay_r: pin(reverb + offset, reverb_max),
            reverb_level: to_fixed(config.reverb_level),
        }
    }
}

/// Effects mixer with panning, echo and reverb.
///
/// # Example
///
/// ```
/// use chiptrack::mixer::{EffectsMixer, MixBuffer, MixerConfig};
///
/// let mut mixer = EffectsMixer::new(false);
/// mixer.set_sample_rate(44_100, 250).unwrap();
/// mixer.configure(MixerConfig::from_depth(0.5)).unwrap();
///
/// mixer.voice_sink(0).add(2, 0, 8000);
/// mixer.end_frame(64);
///
/// let mut out = vec![0i16; 128];
/// assert_eq!(mixer.read_samples(&mut out), 128);
/// ```
#[derive(Debug, Clone)]
pub struct EffectsMixer {
    bank: BufferBank,
    config: MixerConfig,
    gains: MixerGains,
    echo: DelayLine,
    /// Stereo interleaved: left then right per frame
    reverb: DelayLine,
    stereo_remain: usize,
}

impl EffectsMixer {
    /// Create an unconfigured mixer.
    ///
    /// Center-only mode allocates three buffers instead of seven; stereo
    /// voice output then folds into the center.
    pub fn new(center_only: bool) -> Self {
        let config = MixerConfig::default();
        let mut router = Router::new(center_only);
        router.set_effects_enabled(config.effects_enabled);
        Self {
            bank: BufferBank::new(router),
            config,
            gains: MixerGains::default(),
            echo: DelayLine::default(),
            reverb: DelayLine::default(),
            stereo_remain: 0,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    /// Fixed-point gains derived from the current configuration.
    pub fn gains(&self) -> &MixerGains {
        &self.gains
    }

    /// Echo delay in frames at the current sample rate.
    pub fn echo_delay_frames(&self) -> usize {
        self.gains.echo_delay
    }

    /// Left and right reverb delays in frames at the current sample rate.
    pub fn reverb_delay_frames(&self) -> (usize, usize) {
        (self.gains.reverb_delay_l, self.gains.reverb_delay_r)
    }

    /// True in the three-buffer configuration.
    pub fn is_center_only(&self) -> bool {
        self.bank.router.is_center_only()
    }

    /// Apply a new configuration.
    ///
    /// On error the previous configuration stays in effect. Toggling
    /// `effects_enabled` changes the buffer layout, so all buffered audio
    /// and effect tails are discarded.
    pub fn configure(&mut self, config: MixerConfig) -> Result<()> {
        config.validate()?;

        let toggled = config.effects_enabled != self.config.effects_enabled;
        self.config = config;
        self.bank.router.set_effects_enabled(config.effects_enabled);
        self.rederive();
        if toggled {
            self.clear();
        }
        log::debug!(
            "mixer configured: effects={} echo={}f reverb={}/{}f",
            config.effects_enabled,
            self.gains.echo_delay,
            self.gains.reverb_delay_l,
            self.gains.reverb_delay_r
        );
        Ok(())
    }

    fn rederive(&mut self) {
        // reverb reads at 2 * delay, so half the line is usable per side
        let reverb_max = self.reverb.max_delay() / STEREO;
        self.gains = MixerGains::derive(
            &self.config,
            self.bank.sample_rate,
            self.echo.max_delay(),
            reverb_max,
        );
    }

    fn has_stereo_buffers(&self) -> bool {
        self.bank.buffers.len() == MAX_BUF_COUNT
    }

    fn mix_enhanced(&mut self, out: &mut [i16], start: usize, count: usize) {
        let g = self.gains;
        let full = self.has_stereo_buffers();
        let bufs = &self.bank.buffers;
        let side = |buffer: usize, idx: usize| if full { bufs[buffer].sample(idx) } else { 0 };

        for (i, frame) in out.chunks_exact_mut(STEREO).take(count).enumerate() {
            let idx = start + i;
            let send_1 = bufs[0].sample(idx);
            let send_2 = bufs[1].sample(idx);
            let echo_in = bufs[2].sample(idx);

            // voices may write any i32, so every sum saturates
            let dry_l = fmul(send_1, g.pan_1_levels[0])
                .saturating_add(fmul(send_2, g.pan_2_levels[0]))
                .saturating_add(side(3, idx));
            let dry_r = fmul(send_1, g.pan_1_levels[1])
                .saturating_add(fmul(send_2, g.pan_2_levels[1]))
                .saturating_add(side(4, idx));

            // left of frame n-d sits 2d back, right 2d-1 back
            let wet_l = fmul(self.reverb.read(2 * g.reverb_delay_l), g.reverb_level);
            let wet_r = fmul(self.reverb.read(2 * g.reverb_delay_r - 1), g.reverb_level);
            self.reverb.write(dry_l);
            self.reverb.write(dry_r);

            let echo = fmul(self.echo.read(g.echo_delay), g.echo_level);
            let shared = echo_in.saturating_add(echo);
            self.echo.write(shared);

            frame[0] = clamp_sample(
                dry_l
                    .saturating_add(wet_l)
                    .saturating_add(shared)
                    .saturating_add(side(5, idx)),
            );
            frame[1] = clamp_sample(
                dry_r
                    .saturating_add(wet_r)
                    .saturating_add(shared)
                    .saturating_add(side(6, idx)),
            );
        }
    }
}

impl Default for EffectsMixer {
    fn default() -> Self {
        Self::new(false)
    }
}

impl MixBuffer for EffectsMixer {
    fn set_sample_rate(&mut self, rate: u32, length_ms: u32) -> Result<()> {
        self.bank.set_sample_rate(rate, length_ms)?;

        let echo_frames = ms_to_frames(MAX_ECHO_DELAY_MS, rate) as usize;
        let reverb_frames =
            ms_to_frames(MAX_REVERB_DELAY_MS + MAX_DELAY_VARIANCE_MS / 2.0, rate) as usize;
        self.echo.resize(echo_frames + 2);
        self.reverb.resize((reverb_frames + 2) * STEREO);

        self.rederive();
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
        self.echo.clear();
        self.reverb.clear();
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
        let stereo_mask = if self.config.effects_enabled {
            BufferMask::EFFECTS_STEREO
        } else {
            BufferMask::PLAIN_STEREO
        };
        if used.intersects(stereo_mask) && self.has_stereo_buffers() {
            self.stereo_remain = self.bank.avail_frames();
        }
        log::trace!("mixer frame: {frames} frames, buffers {:?}", used);
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
            if self.config.effects_enabled {
                self.mix_enhanced(span, done, count);
            } else if self.stereo_remain > 0 {
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

    fn set_stereo_depth(&mut self, depth: f64) {
        // from_depth always yields a valid configuration
        if let Err(e) = self.configure(MixerConfig::from_depth(depth)) {
            log::warn!("stereo depth {depth} rejected: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FIXED_UNIT;

    const RATE: u32 = 44_100;

    fn configured(config: MixerConfig) -> EffectsMixer {
        let mut mixer = EffectsMixer::new(false);
        mixer.set_sample_rate(RATE, 250).unwrap();
        mixer.configure(config).unwrap();
        mixer
    }

    fn echo_only(delay_ms: f64, level: f64) -> MixerConfig {
        MixerConfig {
            echo_delay_ms: delay_ms,
            echo_level: level,
            reverb_level: 0.0,
            effects_enabled: true,
            ..MixerConfig::default()
        }
    }

    /// Run `frames` frames of silence (after an optional impulse on `voice`)
    /// through the mixer and return the left channel.
    fn render_left(
        mixer: &mut EffectsMixer,
        voice: Option<(usize, i32)>,
        frames: usize,
    ) -> Vec<i32> {
        let mut left = Vec::with_capacity(frames);
        let chunk = 1024;
        let mut first = true;
        while left.len() < frames {
            let n = chunk.min(frames - left.len());
            if first {
                if let Some((v, amp)) = voice {
                    mixer.voice_sink(0).add(v, 0, amp);
                }
                first = false;
            }
            mixer.end_frame(n);
            let mut out = vec![0i16; n * STEREO];
            assert_eq!(mixer.read_samples(&mut out), n * STEREO);
            left.extend(out.chunks_exact(2).map(|f| i32::from(f[0])));
        }
        left
    }

    #[test]
    fn test_default_config_is_valid() {
        MixerConfig::default().validate().unwrap();
        MixerConfig::from_depth(1.0).validate().unwrap();
    }

    #[test]
    fn test_depth_preset() {
        let c = MixerConfig::from_depth(0.0);
        assert!(!c.effects_enabled);
        let c = MixerConfig::from_depth(1.0);
        assert!(c.effects_enabled);
        assert!((c.pan_1 + 0.6).abs() < 1e-12);
        assert!((c.echo_level - 0.15).abs() < 1e-12);
        assert!((c.reverb_level - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_rejected_config_keeps_previous() {
        let mut mixer = configured(echo_only(120.0, 0.3));
        let before = *mixer.gains();

        let bad = MixerConfig {
            echo_level: 1.5,
            ..echo_only(50.0, 0.3)
        };
        assert!(matches!(
            mixer.configure(bad),
            Err(PlayerError::ConfigurationRejected(_))
        ));
        assert_eq!(*mixer.gains(), before);
        assert!((mixer.config().echo_delay_ms - 120.0).abs() < 1e-12);

        let nan = MixerConfig {
            pan_1: f64::NAN,
            ..MixerConfig::default()
        };
        assert!(mixer.configure(nan).is_err());
    }

    #[test]
    fn test_pan_levels() {
        let mixer = configured(MixerConfig {
            pan_1: -1.0,
            pan_2: 0.0,
            effects_enabled: true,
            ..MixerConfig::default()
        });
        assert_eq!(mixer.gains().pan_1_levels, [2 * FIXED_UNIT, 0]);
        assert_eq!(mixer.gains().pan_2_levels, [FIXED_UNIT, FIXED_UNIT]);
    }

    #[test]
    fn test_delay_round_trip_within_one_frame() {
        for ms in [1.0, 17.5, 40.0, 61.0, 120.0, 333.3, 999.0] {
            let mixer = configured(echo_only(ms, 0.2));
            let frames = mixer.echo_delay_frames() as f64;
            let back = frames * 1000.0 / f64::from(RATE);
            assert!((back - ms).abs() <= 1000.0 / f64::from(RATE) + 1e-9, "{ms} ms -> {frames}");
        }
    }

    #[test]
    fn test_reverb_delays_straddle_base() {
        let mixer = configured(MixerConfig {
            reverb_delay_ms: 40.0,
            reverb_delay_variance_ms: 10.0,
            reverb_level: 0.5,
            effects_enabled: true,
            ..MixerConfig::default()
        });
        let (l, r) = mixer.reverb_delay_frames();
        assert_eq!(l, 1764 - 220);
        assert_eq!(r, 1764 + 220);
    }

    #[test]
    fn test_echo_impulse_train() {
        let mut mixer = configured(echo_only(120.0, 0.3));
        assert_eq!(mixer.echo_delay_frames(), 5292);

        let left = render_left(&mut mixer, Some((2, 10_000)), 5292 * 3 + 10);
        assert_eq!(left[0], 10_000);
        assert!(left[1..5292].iter().all(|&s| s == 0));
        assert_eq!(left[5292], 2999);
        assert!(left[5293..10_584].iter().all(|&s| s == 0));
        assert_eq!(left[10_584], fmul(2999, to_fixed(0.3)));
        assert_eq!(left[15_876], fmul(left[10_584], to_fixed(0.3)));
    }

    #[test]
    fn test_reverb_has_no_feedback() {
        let mut mixer = configured(MixerConfig {
            pan_1: 0.0,
            reverb_delay_ms: 10.0,
            reverb_delay_variance_ms: 0.0,
            reverb_level: 0.5,
            echo_level: 0.0,
            effects_enabled: true,
            ..MixerConfig::default()
        });
        let d = mixer.reverb_delay_frames().0;
        let left = render_left(&mut mixer, Some((0, 10_000)), d * 3);
        assert_eq!(left[0], 10_000);
        assert_eq!(left[d], 5000);
        // one tap only
        assert!(left[d + 1..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_effect_tails_decay_to_zero() {
        let mut mixer = configured(MixerConfig {
            echo_level: 0.5,
            reverb_level: 0.9,
            ..MixerConfig::from_depth(1.0)
        });
        let left = render_left(&mut mixer, Some((2, 20_000)), RATE as usize * 2);
        let peak = left.iter().map(|s| s.abs()).max().unwrap();
        assert!(peak <= 20_000);
        assert_eq!(*left.last().unwrap(), 0);
    }

    #[test]
    fn test_saturation_with_all_channels_at_max() {
        let mut mixer = configured(MixerConfig::from_depth(1.0));
        {
            let mut sink = mixer.voice_sink(0);
            for voice in 0..8 {
                sink.add(voice, 0, i32::from(i16::MAX));
                sink.add_stereo(voice, 0, i32::from(i16::MAX), i32::from(i16::MAX));
            }
        }
        mixer.end_frame(1);
        let mut out = [0i16; 2];
        mixer.read_samples(&mut out);
        assert_eq!(out, [i16::MAX, i16::MAX]);

        let mut mixer = configured(MixerConfig::from_depth(1.0));
        {
            let mut sink = mixer.voice_sink(0);
            for voice in 0..8 {
                sink.add(voice, 0, i32::from(i16::MIN));
            }
        }
        mixer.end_frame(1);
        mixer.read_samples(&mut out);
        assert_eq!(out, [i16::MIN, i16::MIN]);
    }

    #[test]
    fn test_oversized_voice_sums_saturate() {
        let mut mixer = configured(MixerConfig::from_depth(1.0));
        {
            let mut sink = mixer.voice_sink(0);
            sink.add(2, 0, i32::MAX / 2);
            sink.add_stereo(2, 0, i32::MAX / 2 + 10, i32::MAX / 2 + 10);
            sink.add(0, 0, i32::MAX);
            sink.add(1, 0, i32::MAX);
        }
        mixer.end_frame(1);
        let mut out = [0i16; 2];
        mixer.read_samples(&mut out);
        assert_eq!(out, [i16::MAX, i16::MAX]);

        let mut mixer = configured(MixerConfig::from_depth(1.0));
        {
            let mut sink = mixer.voice_sink(0);
            sink.add(2, 0, i32::MIN / 2);
            sink.add_stereo(2, 0, i32::MIN / 2 - 10, i32::MIN / 2 - 10);
            sink.add(0, 0, i32::MIN);
        }
        mixer.end_frame(1);
        mixer.read_samples(&mut out);
        assert_eq!(out, [i16::MIN, i16::MIN]);
    }

    #[test]
    fn test_right_reverb_tap_lands_at_right_delay() {
        let mut mixer = configured(MixerConfig {
            pan_1: 1.0,
            reverb_delay_ms: 40.0,
            reverb_delay_variance_ms: 10.0,
            reverb_level: 0.5,
            echo_level: 0.0,
            effects_enabled: true,
            ..MixerConfig::default()
        });
        let (dl, dr) = mixer.reverb_delay_frames();
        assert_eq!((dl, dr), (1544, 1984));

        mixer.voice_sink(0).add(0, 0, 5000);
        let frames = dr + 100;
        mixer.end_frame(frames);
        let mut out = vec![0i16; frames * STEREO];
        assert_eq!(mixer.read_samples(&mut out), frames * STEREO);

        let taps = |channel: usize| -> Vec<(usize, i16)> {
            out.chunks_exact(STEREO)
                .enumerate()
                .filter(|&(_, f)| f[channel] != 0)
                .map(|(i, f)| (i, f[channel]))
                .collect()
        };
        // pan fully right: the dry impulse and its tail are right-only
        assert!(taps(0).is_empty());
        assert_eq!(taps(1), vec![(0, 10_000), (dr, 5000)]);
    }

    #[test]
    fn test_left_reverb_tap_lands_at_left_delay() {
        let mut mixer = configured(MixerConfig {
            pan_1: -1.0,
            reverb_delay_ms: 40.0,
            reverb_delay_variance_ms: 10.0,
            reverb_level: 0.5,
            echo_level: 0.0,
            effects_enabled: true,
            ..MixerConfig::default()
        });
        let (dl, _) = mixer.reverb_delay_frames();
        let left = render_left(&mut mixer, Some((0, 5000)), dl + 100);
        let taps: Vec<(usize, i32)> = left
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s != 0)
            .map(|(i, &s)| (i, s))
            .collect();
        assert_eq!(taps, vec![(0, 10_000), (dl, 5000)]);
    }

    #[test]
    fn test_clear_twice_equals_once() {
        let mut mixer = configured(MixerConfig::from_depth(1.0));
        render_left(&mut mixer, Some((2, 12_000)), 2000);
        mixer.clear();
        mixer.clear();
        assert_eq!(mixer.samples_avail(), 0);
        let left = render_left(&mut mixer, None, 30_000);
        assert!(left.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_toggling_effects_discards_buffered_audio() {
        let mut mixer = configured(MixerConfig::default());
        mixer.voice_sink(0).add(0, 0, 1000);
        mixer.end_frame(10);
        mixer.configure(MixerConfig::from_depth(0.5)).unwrap();
        assert_eq!(mixer.samples_avail(), 0);
    }

    #[test]
    fn test_center_only_mixes_three_buffers() {
        let mut mixer = EffectsMixer::new(true);
        mixer.set_sample_rate(RATE, 100).unwrap();
        mixer.configure(echo_only(10.0, 0.0)).unwrap();
        assert!(mixer.is_center_only());
        mixer.voice_sink(0).add_stereo(3, 0, 100, 300);
        mixer.end_frame(1);
        let mut out = [0i16; 2];
        mixer.read_samples(&mut out);
        assert_eq!(out, [400, 400]);
    }

    #[test]
    fn test_config_from_json_fills_defaults() {
        let config = MixerConfig::from_json_str(r#"{ "echo_level": 0.4, "effects_enabled": true }"#)
            .unwrap();
        assert!((config.echo_level - 0.4).abs() < 1e-12);
        assert!((config.reverb_delay_ms - 88.0).abs() < 1e-12);
        assert!(MixerConfig::from_json_str(r#"{ "reverb_level": 3.0 }"#).is_err());
        assert!(MixerConfig::from_json_str("not json").is_err());
    }
}
