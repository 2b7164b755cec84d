//! Voice-to-buffer routing
//!
//! Every synthesizer voice writes into one of three channel types, and each
//! type resolves to a center/left/right triple of physical accumulation
//! buffers. The table below is static; only the resolution changes when
//! effects are toggled or the mixer runs in center-only mode.
//!
//! ```text
//!  Voice    Type  Effect   Pan
//!  -----------------------------
//!  0, 5     0     reverb   pan_1
//!  1, 6     1     reverb   pan_2
//!  2, 3, 4  2     echo     -
//!  7        2     echo     -
//! ```

/// Maximum number of physical accumulation buffers.
pub const MAX_BUF_COUNT: usize = 7;

/// Buffers allocated in center-only mode.
pub const CENTER_ONLY_BUF_COUNT: usize = 3;

/// Number of channel types voices are folded onto.
pub const CHANNEL_TYPE_COUNT: usize = 3;

/// Voice index period of the routing table.
const VOICE_PERIOD: usize = 5;

/// Effect applied to a physical buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Mixed straight into the output
    None,
    /// Summed with the echo line's feedback tap
    Echo,
    /// Sent through the reverb line
    Reverb,
}

/// Pan control governing a physical buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pan {
    /// Not panned (center or already left/right)
    None,
    /// Panned by `pan_1`
    Pan1,
    /// Panned by `pan_2`
    Pan2,
}

/// Output side a physical buffer contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Both output channels
    Center,
    /// Left output only
    Left,
    /// Right output only
    Right,
}

/// Role of one physical accumulation buffer in the effects path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRole {
    /// Effect applied
    pub effect: Effect,
    /// Pan control applied
    pub pan: Pan,
    /// Output side
    pub side: Side,
}

const fn role(effect: Effect, pan: Pan, side: Side) -> BufferRole {
    BufferRole { effect, pan, side }
}

/// Channel mapping table for the effects path, indexed by physical buffer.
pub const CHANNEL_TABLE: [BufferRole; MAX_BUF_COUNT] = [
    role(Effect::Reverb, Pan::Pan1, Side::Center),
    role(Effect::Reverb, Pan::Pan2, Side::Center),
    role(Effect::Echo, Pan::None, Side::Center),
    role(Effect::Reverb, Pan::None, Side::Left),
    role(Effect::Reverb, Pan::None, Side::Right),
    role(Effect::None, Pan::None, Side::Left),
    role(Effect::None, Pan::None, Side::Right),
];

/// Channel type for each voice index modulo 5.
const VOICE_TYPES: [usize; VOICE_PERIOD] = [0, 1, 2, 2, 2];

/// Physical buffers one voice writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOutputs {
    /// Buffer receiving mono output
    pub center: usize,
    /// Buffer receiving the left half of stereo output
    pub left: usize,
    /// Buffer receiving the right half of stereo output
    pub right: usize,
}

impl ChannelOutputs {
    const fn new(center: usize, left: usize, right: usize) -> Self {
        Self {
            center,
            left,
            right,
        }
    }
}

/// Resolves voices to physical accumulation buffers.
#[derive(Debug, Clone)]
pub struct Router {
    buf_count: usize,
    effects_enabled: bool,
    types: [ChannelOutputs; CHANNEL_TYPE_COUNT],
}

impl Router {
    /// Create a router. Center-only mode allocates three buffers and sends
    /// stereo output to the center buffer.
    pub fn new(center_only: bool) -> Self {
        let buf_count = if center_only {
            CENTER_ONLY_BUF_COUNT
        } else {
            MAX_BUF_COUNT
        };
        let mut router = Self {
            buf_count,
            effects_enabled: false,
            types: [ChannelOutputs::new(0, 1, 2); CHANNEL_TYPE_COUNT],
        };
        router.rebuild();
        router
    }

    /// Number of physical buffers to allocate.
    pub fn buffer_count(&self) -> usize {
        self.buf_count
    }

    /// True in the memory-constrained three-buffer configuration.
    pub fn is_center_only(&self) -> bool {
        self.buf_count < MAX_BUF_COUNT
    }

    /// Whether the effects layout is active.
    pub fn effects_enabled(&self) -> bool {
        self.effects_enabled
    }

    /// Switch between the effects layout and the plain center/left/right
    /// layout. All assignments are re-derived.
    pub fn set_effects_enabled(&mut self, enabled: bool) {
        self.effects_enabled = enabled;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        if self.effects_enabled {
            self.types = [
                ChannelOutputs::new(0, 3, 4),
                ChannelOutputs::new(1, 3, 4),
                ChannelOutputs::new(2, 5, 6),
            ];
        } else {
            self.types = [ChannelOutputs::new(0, 1, 2); CHANNEL_TYPE_COUNT];
        }

        if self.is_center_only() {
            for outputs in &mut self.types {
                outputs.left = outputs.center;
                outputs.right = outputs.center;
            }
        }
    }

    /// Channel type a voice is folded onto.
    pub fn channel_type(voice: usize) -> usize {
        VOICE_TYPES[voice % VOICE_PERIOD]
    }

    /// Buffers assigned to a voice.
    pub fn channel(&self, voice: usize) -> ChannelOutputs {
        self.types[Self::channel_type(voice)]
    }

    /// Buffers assigned to each of `voice_count` voices.
    pub fn routes(&self, voice_count: usize) -> Vec<ChannelOutputs> {
        (0..voice_count).map(|voice| self.channel(voice)).collect()
    }

    /// Effects role of a physical buffer, if the buffer exists.
    pub fn role(&self, buffer: usize) -> Option<BufferRole> {
        if buffer < self.buf_count {
            Some(CHANNEL_TABLE[buffer])
        } else {
            None
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(false)
    }
}
