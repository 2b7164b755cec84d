//! Deterministic synthesizers shared by the integration tests.

#![allow(dead_code)]

use chiptrack::mixer::VoiceSink;
use chiptrack::{PlayerError, Result, SynthStatus, TrackInfo, VoiceSynthesizer};

pub const RATE: u32 = 44_100;

/// Constant amplitude on one voice for the whole track.
#[derive(Debug, Clone)]
pub struct ToneSynth {
    pub voice: usize,
    pub amplitude: i32,
    pub length_ms: Option<u32>,
    pub frames: u64,
    pub mute_mask: u32,
}

impl ToneSynth {
    pub fn new(voice: usize, amplitude: i32) -> Self {
        Self {
            voice,
            amplitude,
            length_ms: None,
            frames: 0,
            mute_mask: 0,
        }
    }

    pub fn with_length(mut self, length_ms: u32) -> Self {
        self.length_ms = Some(length_ms);
        self
    }
}

impl VoiceSynthesizer for ToneSynth {
    fn voice_count(&self) -> usize {
        5
    }

    fn track_count(&self) -> usize {
        2
    }

    fn track_info(&self, _track: usize) -> TrackInfo {
        TrackInfo {
            length_ms: self.length_ms,
            ..TrackInfo::default()
        }
    }

    fn start_track(&mut self, _track: usize) -> Result<()> {
        self.frames = 0;
        Ok(())
    }

    fn generate(&mut self, frames: usize, sink: &mut VoiceSink<'_>) -> Result<SynthStatus> {
        for offset in 0..frames {
            sink.add(self.voice, offset, self.amplitude);
        }
        self.frames += frames as u64;
        Ok(SynthStatus::Playing)
    }

    fn mute_voices(&mut self, mask: u32) {
        self.mute_mask = mask;
    }
}

/// Silence for `delay_frames`, then a tone until `end_frames` (if set).
#[derive(Debug, Clone)]
pub struct DelayedToneSynth {
    pub delay_frames: u64,
    pub end_frames: Option<u64>,
    pub amplitude: i32,
    pub frames: u64,
}

impl DelayedToneSynth {
    pub fn new(delay_frames: u64, amplitude: i32) -> Self {
        Self {
            delay_frames,
            end_frames: None,
            amplitude,
            frames: 0,
        }
    }
}

impl VoiceSynthesizer for DelayedToneSynth {
    fn voice_count(&self) -> usize {
        1
    }

    fn track_count(&self) -> usize {
        1
    }

    fn start_track(&mut self, _track: usize) -> Result<()> {
        self.frames = 0;
        Ok(())
    }

    fn generate(&mut self, frames: usize, sink: &mut VoiceSink<'_>) -> Result<SynthStatus> {
        for offset in 0..frames {
            let t = self.frames + offset as u64;
            let audible = t >= self.delay_frames && self.end_frames.map_or(true, |end| t < end);
            if audible {
                sink.add(0, offset, self.amplitude);
            }
        }
        self.frames += frames as u64;
        Ok(SynthStatus::Playing)
    }
}

/// A tone that reports the end of the track after `frames` frames.
#[derive(Debug, Clone)]
pub struct FiniteSynth {
    pub length_frames: u64,
    pub frames: u64,
}

impl VoiceSynthesizer for FiniteSynth {
    fn voice_count(&self) -> usize {
        1
    }

    fn track_count(&self) -> usize {
        1
    }

    fn start_track(&mut self, _track: usize) -> Result<()> {
        self.frames = 0;
        Ok(())
    }

    fn generate(&mut self, frames: usize, sink: &mut VoiceSink<'_>) -> Result<SynthStatus> {
        let remain = self.length_frames.saturating_sub(self.frames) as usize;
        for offset in 0..frames.min(remain) {
            sink.add(0, offset, 3000);
        }
        self.frames += frames as u64;
        if self.frames >= self.length_frames {
            Ok(SynthStatus::Ended)
        } else {
            Ok(SynthStatus::Playing)
        }
    }
}

/// A tone that fails when asked to run past `fail_after` frames.
#[derive(Debug, Clone)]
pub struct FailingSynth {
    pub fail_after: u64,
    pub frames: u64,
}

impl VoiceSynthesizer for FailingSynth {
    fn voice_count(&self) -> usize {
        1
    }

    fn track_count(&self) -> usize {
        1
    }

    fn start_track(&mut self, _track: usize) -> Result<()> {
        self.frames = 0;
        Ok(())
    }

    fn generate(&mut self, frames: usize, sink: &mut VoiceSink<'_>) -> Result<SynthStatus> {
        if self.frames + frames as u64 > self.fail_after {
            return Err(PlayerError::SynthesisFailure("emulation fault".into()));
        }
        for offset in 0..frames {
            sink.add(0, offset, 5000);
        }
        self.frames += frames as u64;
        Ok(SynthStatus::Playing)
    }
}

/// One impulse on `voice` at frame zero, silence afterwards.
#[derive(Debug, Clone)]
pub struct ImpulseSynth {
    pub voice: usize,
    pub amplitude: i32,
    pub frames: u64,
}

impl ImpulseSynth {
    pub fn new(voice: usize, amplitude: i32) -> Self {
        Self {
            voice,
            amplitude,
            frames: 0,
        }
    }
}

impl VoiceSynthesizer for ImpulseSynth {
    fn voice_count(&self) -> usize {
        5
    }

    fn track_count(&self) -> usize {
        1
    }

    fn start_track(&mut self, _track: usize) -> Result<()> {
        self.frames = 0;
        Ok(())
    }

    fn generate(&mut self, frames: usize, sink: &mut VoiceSink<'_>) -> Result<SynthStatus> {
        if self.frames == 0 && frames > 0 {
            sink.add(self.voice, 0, self.amplitude);
        }
        self.frames += frames as u64;
        Ok(SynthStatus::Playing)
    }
}

/// Sawtooth on voice 0 with a 100-frame period; never silent for long.
#[derive(Debug, Clone, Default)]
pub struct SawSynth {
    pub frames: u64,
}

impl VoiceSynthesizer for SawSynth {
    fn voice_count(&self) -> usize {
        1
    }

    fn track_count(&self) -> usize {
        1
    }

    fn start_track(&mut self, _track: usize) -> Result<()> {
        self.frames = 0;
        Ok(())
    }

    fn generate(&mut self, frames: usize, sink: &mut VoiceSink<'_>) -> Result<SynthStatus> {
        for offset in 0..frames {
            let t = self.frames + offset as u64;
            sink.add(0, offset, (t % 100) as i32 * 200 - 10_000);
        }
        self.frames += frames as u64;
        Ok(SynthStatus::Playing)
    }
}

/// Left channel of an interleaved buffer.
pub fn left(samples: &[i16]) -> Vec<i16> {
    samples.chunks_exact(2).map(|f| f[0]).collect()
}
