//! Voice synthesizer interface
//!
//! The track controller drives any chip emulator through [`VoiceSynthesizer`].
//! A synthesizer renders per-voice output into the mixer's accumulation
//! buffers via a [`VoiceSink`]; it never sees the final stereo signal.
//!
//! Only [`VoiceSynthesizer::voice_count`], [`VoiceSynthesizer::track_count`],
//! [`VoiceSynthesizer::start_track`] and [`VoiceSynthesizer::generate`] are
//! required. The remaining hooks have no-op defaults.

use crate::constants::DEFAULT_TRACK_LENGTH_MS;
use crate::mixer::VoiceSink;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Outcome of one [`VoiceSynthesizer::generate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthStatus {
    /// More output follows.
    #[default]
    Playing,
    /// The frames just generated are the last ones of the track.
    Ended,
}

/// Declared timing of one track.
///
/// All fields are optional; formats without timing metadata leave them unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Total length in milliseconds
    pub length_ms: Option<u32>,
    /// Length of the non-looping intro in milliseconds
    pub intro_ms: Option<u32>,
    /// Length of one loop iteration in milliseconds
    pub loop_ms: Option<u32>,
}

impl TrackInfo {
    /// Info with only a declared total length.
    pub fn with_length(length_ms: u32) -> Self {
        Self {
            length_ms: Some(length_ms),
            ..Self::default()
        }
    }

    /// Length to play before fading out.
    ///
    /// The declared length wins; otherwise intro plus two loops; otherwise
    /// [`DEFAULT_TRACK_LENGTH_MS`].
    pub fn play_length_ms(&self) -> u32 {
        if let Some(length) = self.length_ms.filter(|&l| l > 0) {
            return length;
        }
        match self.loop_ms.filter(|&l| l > 0) {
            Some(loop_ms) => self
                .intro_ms
                .unwrap_or(0)
                .saturating_add(loop_ms.saturating_mul(2)),
            None => DEFAULT_TRACK_LENGTH_MS,
        }
    }
}

/// Treble/bass equalization passed through to the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equalizer {
    /// Treble level in dB; -50.0 = muffled, 0 = flat, +5.0 = extra crisp
    pub treble: f64,
    /// Bass cutoff in Hz; 1 = full bass, 90 = average, 16000 = tinny
    pub bass: f64,
}

impl Equalizer {
    /// Default equalization.
    pub const DEFAULT: Self = Self {
        treble: -1.0,
        bass: 60.0,
    };

    /// Equalization approximating a TV speaker.
    pub const TV: Self = Self {
        treble: -8.0,
        bass: 180.0,
    };

    /// Create an equalizer from treble and bass settings.
    pub const fn new(treble: f64, bass: f64) -> Self {
        Self { treble, bass }
    }
}

impl Default for Equalizer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Chip emulator driven by the track controller.
///
/// # Example
///
/// ```
/// use chiptrack::mixer::VoiceSink;
/// use chiptrack::{Result, SynthStatus, VoiceSynthesizer};
///
/// /// One square-wave voice.
/// struct Square {
///     phase: usize,
/// }
///
/// impl VoiceSynthesizer for Square {
///     fn voice_count(&self) -> usize {
///         1
///     }
///
///     fn track_count(&self) -> usize {
///         1
///     }
///
///     fn start_track(&mut self, _track: usize) -> Result<()> {
///         self.phase = 0;
///         Ok(())
///     }
///
///     fn generate(&mut self, frames: usize, sink: &mut VoiceSink<'_>) -> Result<SynthStatus> {
///         for offset in 0..frames {
///             let amp = if (self.phase / 50) % 2 == 0 { 4000 } else { -4000 };
///             sink.add(0, offset, amp);
///             self.phase += 1;
///         }
///         Ok(SynthStatus::Playing)
///     }
/// }
/// ```
pub trait VoiceSynthesizer {
    /// Number of voices the loaded file uses.
    fn voice_count(&self) -> usize;

    /// Display names of the voices.
    fn voice_names(&self) -> Vec<String> {
        (1..=self.voice_count())
            .map(|i| format!("Voice {i}"))
            .collect()
    }

    /// Number of tracks in the loaded file.
    fn track_count(&self) -> usize;

    /// Declared timing of `track`.
    fn track_info(&self, _track: usize) -> TrackInfo {
        TrackInfo::default()
    }

    /// Called once with the output sample rate before any track starts.
    fn set_sample_rate(&mut self, _rate: u32) -> Result<()> {
        Ok(())
    }

    /// Reset to the beginning of `track`. The index is already validated.
    fn start_track(&mut self, track: usize) -> Result<()>;

    /// Render `frames` frames of voice output at offsets `0..frames`.
    ///
    /// Output of muted voices is discarded by the sink; this call is only
    /// a hint that lets a synthesizer skip work.
    fn generate(&mut self, frames: usize, sink: &mut VoiceSink<'_>) -> Result<SynthStatus>;

    /// Notification of the current mute mask (bit `i` mutes voice `i`).
    fn mute_voices(&mut self, _mask: u32) {}

    /// Apply treble/bass settings.
    fn set_equalizer(&mut self, _equalizer: &Equalizer) {}

    /// Enable slower but more accurate emulation, if supported.
    fn enable_accuracy(&mut self, _enable: bool) {}
}
