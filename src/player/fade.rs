//! Fade-out envelope
//!
//! The fade is applied in blocks of [`FADE_BLOCK_SIZE`] samples, each block
//! scaled by one gain. Gains only ever decrease with track time, whatever
//! the size of the `play` calls that cover the fade.

use crate::constants::{FADE_BLOCK_SIZE, FADE_GAIN_SHIFT, FADE_GAIN_UNIT, FADE_SHIFT};
use serde::{Deserialize, Serialize};

/// Shape of the fade-out envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// Gain ramps from 1.0 to 0.0 across the fade length.
    #[default]
    Linear,
    /// Gain halves in equal steps, reaching 1/256 at the fade length.
    Logarithmic,
}

/// `unit / 2^(x / step)` in integer arithmetic.
fn int_log(x: i64, step: i64, unit: i32) -> i32 {
    let shift = x / step;
    if shift >= 31 {
        return 0;
    }
    let fraction = (x - shift * step) * i64::from(unit) / step;
    let fraction = fraction as i32;
    ((unit - fraction) + (fraction >> 1)) >> shift
}

/// Fade position and length in interleaved samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fade {
    start: i64,
    length: i64,
    /// Blocks per halving of the logarithmic curve
    step: i64,
    curve: FadeCurve,
}

impl Fade {
    /// Start position meaning "never fade".
    pub const NEVER: i64 = i64::MAX / 2;

    /// A fade that never starts.
    pub fn new(curve: FadeCurve) -> Self {
        Self {
            start: Self::NEVER,
            length: 0,
            step: 1,
            curve,
        }
    }

    /// Place the fade at `start` lasting `length` samples.
    pub fn set(&mut self, start: i64, length: i64) {
        self.start = start;
        self.length = length.max(0);
        let blocks = self.length / FADE_BLOCK_SIZE as i64;
        self.step = ((blocks + i64::from(FADE_SHIFT) - 1) / i64::from(FADE_SHIFT)).max(1);
    }

    /// Cancel the fade, keeping the curve.
    pub fn reset(&mut self) {
        *self = Self::new(self.curve);
    }

    /// Select the envelope shape.
    pub fn set_curve(&mut self, curve: FadeCurve) {
        self.curve = curve;
    }

    /// Envelope shape.
    pub fn curve(&self) -> FadeCurve {
        self.curve
    }

    /// Fade start in samples.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Fade length in samples.
    pub fn length(&self) -> i64 {
        self.length
    }

    /// True when any of the `count` samples starting at `time` lie at or
    /// after the fade start.
    pub fn covers(&self, time: i64, count: usize) -> bool {
        time.saturating_add(count as i64) > self.start
    }

    /// Gain for a block `elapsed` samples into the fade, or `None` once the
    /// fade has completed.
    fn gain(&self, elapsed: i64) -> Option<i32> {
        match self.curve {
            FadeCurve::Linear => {
                if elapsed >= self.length {
                    return None;
                }
                let remain = self.length - elapsed;
                Some((i64::from(FADE_GAIN_UNIT) * remain / self.length) as i32)
            }
            FadeCurve::Logarithmic => {
                let gain = int_log(elapsed / FADE_BLOCK_SIZE as i64, self.step, FADE_GAIN_UNIT);
                if gain < FADE_GAIN_UNIT >> FADE_SHIFT {
                    None
                } else {
                    Some(gain)
                }
            }
        }
    }

    /// Scale `out`, whose first sample sits at track time `time`.
    ///
    /// Returns true when a block reached the end of the fade; that block and
    /// everything after it is silenced.
    pub fn apply(&self, time: i64, out: &mut [i16]) -> bool {
        let mut ended = false;
        for (i, block) in out.chunks_mut(FADE_BLOCK_SIZE).enumerate() {
            let elapsed = time + (i * FADE_BLOCK_SIZE) as i64 - self.start;
            if elapsed < 0 {
                continue;
            }
            let gain = if ended {
                0
            } else {
                match self.gain(elapsed) {
                    Some(gain) => gain,
                    None => {
                        ended = true;
                        0
                    }
                }
            };
            for s in block.iter_mut() {
                *s = ((i32::from(*s) * gain) >> FADE_GAIN_SHIFT) as i16;
            }
        }
        ended
    }
}

impl Default for Fade {
    fn default() -> Self {
        Self::new(FadeCurve::default())
    }
}
