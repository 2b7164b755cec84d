//! Chip-Music Track Playback and Effects Mixing
//!
//! Turns per-voice output of a chip emulator into finished 16-bit stereo,
//! while managing the lifecycle of a track inside a multi-track music file.
//!
//! # Features
//! - Track controller with sample-accurate timing, seek and skip
//! - Leading-silence skip and end-of-track detection by silence lookahead
//! - Linear or logarithmic fade-out that ends the track
//! - Tempo scaling by fixed-point resampling
//! - Per-voice muting
//! - Fixed-point effects mixer: per-voice panning, echo, stereo reverb
//! - Bit-reproducible, saturating output
//!
//! # Quick start
//! ```
//! use chiptrack::mixer::VoiceSink;
//! use chiptrack::{Result, SynthStatus, TrackInfo, TrackPlayer, VoiceSynthesizer};
//!
//! struct Buzz;
//!
//! impl VoiceSynthesizer for Buzz {
//!     fn voice_count(&self) -> usize {
//!         1
//!     }
//!     fn track_count(&self) -> usize {
//!         1
//!     }
//!     fn track_info(&self, _track: usize) -> TrackInfo {
//!         TrackInfo::with_length(2000)
//!     }
//!     fn start_track(&mut self, _track: usize) -> Result<()> {
//!         Ok(())
//!     }
//!     fn generate(&mut self, frames: usize, sink: &mut VoiceSink<'_>) -> Result<SynthStatus> {
//!         for offset in 0..frames {
//!             sink.add(0, offset, if offset % 40 < 20 { 3000 } else { -3000 });
//!         }
//!         Ok(SynthStatus::Playing)
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let mut player: TrackPlayer<Buzz> = TrackPlayer::new(Buzz);
//! player.set_sample_rate(44_100)?;
//! player.start_track(0)?;
//!
//! let mut buf = [0i16; 1024];
//! while !player.track_ended() {
//!     player.play(&mut buf)?;
//!     // hand `buf` to an audio device or encoder
//! }
//! assert!(player.tell() >= 10_000);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod constants;
pub mod mixer;
pub mod player;
pub mod synth;

/// Error types for playback and mixing operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// Track index outside the loaded file
    #[error("Invalid track index {index} (file has {count} tracks)")]
    InvalidTrackIndex {
        /// Requested track
        index: usize,
        /// Tracks in the file
        count: usize,
    },

    /// Voice index outside the synthesizer's voices
    #[error("Invalid voice index {index} (synthesizer has {count} voices)")]
    InvalidVoice {
        /// Requested voice
        index: usize,
        /// Voices available
        count: usize,
    },

    /// The synthesizer failed; fatal to the current track only
    #[error("Synthesis failure: {0}")]
    SynthesisFailure(String),

    /// Out-of-range configuration value; the previous configuration is kept
    #[error("Configuration rejected: {0}")]
    ConfigurationRejected(String),

    /// Operation requires `set_sample_rate` first
    #[error("Sample rate not set")]
    NotConfigured,

    /// Operation must happen before `set_sample_rate`
    #[error("Sample rate already set")]
    AlreadyConfigured,

    /// Operation requires `start_track` first
    #[error("No track started")]
    NoTrackStarted,

    /// Sample counts must cover whole stereo frames
    #[error("Sample count {0} is not a multiple of 2")]
    OddSampleCount(usize),
}

impl From<String> for PlayerError {
    /// Converts a String into `PlayerError::SynthesisFailure`.
    ///
    /// Intended for synthesizer implementations reporting emulation errors
    /// with `?` on string results.
    fn from(msg: String) -> Self {
        PlayerError::SynthesisFailure(msg)
    }
}

impl From<&str> for PlayerError {
    /// Converts a string slice into `PlayerError::SynthesisFailure`.
    fn from(msg: &str) -> Self {
        PlayerError::SynthesisFailure(msg.to_string())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlayerError>;

// Public API exports
pub use mixer::{EffectsMixer, MixBuffer, MixerConfig, StereoMixer};
pub use player::{FadeCurve, PlayerConfig, TrackPlayer};
pub use synth::{Equalizer, SynthStatus, TrackInfo, VoiceSynthesizer};
