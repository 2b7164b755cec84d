//! Playback and Mixer Constants
//!
//! Shared constants used by the track controller and the effects mixer.
//! Sample counts are interleaved stereo samples (two per frame) unless the
//! name says `FRAMES`.

/// Number of output channels (interleaved left/right).
pub const STEREO: usize = 2;

/// Default output sample rate (44.1 kHz).
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default length of the per-voice accumulation buffers in milliseconds.
pub const DEFAULT_BUFFER_LENGTH_MS: u32 = 1000 / 4;

/// Maximum accepted accumulation buffer length in milliseconds.
pub const MAX_BUFFER_LENGTH_MS: u32 = 2000;

// ============================================================================
// Fixed-point mixing
// ============================================================================

/// Fractional bits of the mixer's fixed-point gains.
pub const FIXED_SHIFT: u32 = 15;

/// Fixed-point representation of a gain of 1.0.
pub const FIXED_UNIT: i32 = 1 << FIXED_SHIFT;

/// Longest echo delay the echo line is sized for.
pub const MAX_ECHO_DELAY_MS: f64 = 1000.0;

/// Longest reverb delay the reverb line is sized for (variance excluded).
pub const MAX_REVERB_DELAY_MS: f64 = 500.0;

/// Largest accepted difference between left and right reverb delays.
pub const MAX_DELAY_VARIANCE_MS: f64 = 100.0;

// ============================================================================
// Silence detection
// ============================================================================

/// Samples within `±SILENCE_THRESHOLD / 2` count as silence.
pub const SILENCE_THRESHOLD: i32 = 0x10;

/// Size of the lookahead buffer used while searching for silence.
pub const SILENCE_BUF_SIZE: usize = 2048;

/// Seconds of continuous silence after which a track is considered over.
pub const DEFAULT_SILENCE_MAX_SECS: u32 = 6;

/// Seconds of leading silence skipped by `start_track`.
pub const DEFAULT_MAX_INITIAL_SILENCE_SECS: u32 = 2;

/// Speed multiplier of the emulator while running ahead through silence.
pub const DEFAULT_SILENCE_LOOKAHEAD: u32 = 3;

// ============================================================================
// Fading
// ============================================================================

/// Samples processed with one gain value while fading.
pub const FADE_BLOCK_SIZE: usize = 512;

/// Logarithmic fades end once the gain drops below `1 / (1 << FADE_SHIFT)`.
pub const FADE_SHIFT: u32 = 8;

/// Fractional bits of the fade gain.
pub const FADE_GAIN_SHIFT: u32 = 14;

/// Fade gain of 1.0.
pub const FADE_GAIN_UNIT: i32 = 1 << FADE_GAIN_SHIFT;

/// Default fade-out length in milliseconds.
pub const DEFAULT_FADE_LENGTH_MS: u32 = 8000;

/// Track length assumed when the synthesizer declares none.
pub const DEFAULT_TRACK_LENGTH_MS: u32 = 150_000;

// ============================================================================
// Tempo and skipping
// ============================================================================

/// Slowest accepted tempo.
pub const MIN_TEMPO: f64 = 0.02;

/// Fastest accepted tempo.
pub const MAX_TEMPO: f64 = 4.0;

/// Fractional bits of the tempo resampler's position.
pub const TEMPO_SHIFT: u32 = 16;

/// Skips longer than this run with every voice muted.
pub const LONG_SKIP_THRESHOLD: usize = 30_000;
