//! Tone parameter records.

/// Middle A.
pub const DEFAULT_FREQ: u32 = 440;
/// Milliseconds.
pub const DEFAULT_LENGTH: u32 = 200;
pub const DEFAULT_REPS: u32 = 1;
/// Milliseconds.
pub const DEFAULT_DELAY: u32 = 100;

/// Highest frequency accepted from the command line or config (Hz).
pub const MAX_FREQ: f32 = 20000.0;
/// Upper bound for lengths, delays and repetitions.
pub const MAX_COUNT: u32 = 300_000;

/// Whether playback is driven by standard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdinMode {
    /// Just beep and terminate.
    #[default]
    None,
    /// Beep after each line of input, echoing the line.
    PerLine,
    /// Beep after each character of input, echoing the character.
    PerChar,
}

/// One beep specification as given between `-n` separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneParams {
    /// Tone frequency in Hz. 0 only while parsing, meaning "use default".
    pub frequency_hz: u32,
    /// Tone length in ms.
    pub length_ms: u32,
    /// Number of repetitions.
    pub repeat_count: u32,
    /// Delay between repetitions in ms.
    pub delay_ms: u32,
    /// Whether to delay after the last repetition as well.
    pub end_delay: bool,
    pub stdin_mode: StdinMode,
}

impl ToneParams {
    /// Frequency as handed to the drivers.
    pub fn driver_frequency(&self) -> u16 {
        (self.frequency_hz & 0xffff) as u16
    }

    /// Whether the inter-repeat delay follows repetition `index` (0-based).
    pub fn delay_after(&self, index: u32) -> bool {
        self.end_delay || index + 1 < self.repeat_count
    }
}

impl Default for ToneParams {
    fn default() -> Self {
        Self {
            frequency_hz: 0,
            length_ms: DEFAULT_LENGTH,
            repeat_count: DEFAULT_REPS,
            delay_ms: DEFAULT_DELAY,
            end_delay: false,
            stdin_mode: StdinMode::None,
        }
    }
}

/// Tone records in playback order.
pub type ToneChain = Vec<ToneParams>;
