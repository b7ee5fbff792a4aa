// ── Command dispatch API ──
//
// Every remote action is one `RemoteKey` variant with one protocol code.
// Adding a key means adding a variant and its `code()` arm.

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::CoreError;

/// All keys the remote can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[non_exhaustive]
pub enum RemoteKey {
    // ── Navigation ───────────────────────────────────────────────────
    Up,
    Down,
    Left,
    Right,
    #[strum(to_string = "enter", serialize = "ok")]
    Enter,
    #[strum(to_string = "return", serialize = "back")]
    Return,
    Home,
    Exit,
    Menu,
    Source,
    Info,
    Guide,

    // ── Power & volume ───────────────────────────────────────────────
    Power,
    Mute,
    #[strum(to_string = "volume-up", serialize = "volup")]
    VolumeUp,
    #[strum(to_string = "volume-down", serialize = "voldown")]
    VolumeDown,
    ChannelUp,
    ChannelDown,

    // ── Numeric keypad ───────────────────────────────────────────────
    #[strum(serialize = "0")]
    Number0,
    #[strum(serialize = "1")]
    Number1,
    #[strum(serialize = "2")]
    Number2,
    #[strum(serialize = "3")]
    Number3,
    #[strum(serialize = "4")]
    Number4,
    #[strum(serialize = "5")]
    Number5,
    #[strum(serialize = "6")]
    Number6,
    #[strum(serialize = "7")]
    Number7,
    #[strum(serialize = "8")]
    Number8,
    #[strum(serialize = "9")]
    Number9,

    // ── Content & playback ───────────────────────────────────────────
    #[strum(to_string = "contents", serialize = "search")]
    Contents,
    Play,
    Pause,
    Stop,
    Rewind,
    FastForward,
}

impl RemoteKey {
    /// The `DataOfCmd` value sent to the TV.
    pub fn code(self) -> &'static str {
        match self {
            Self::Up => "KEY_UP",
            Self::Down => "KEY_DOWN",
            Self::Left => "KEY_LEFT",
            Self::Right => "KEY_RIGHT",
            Self::Enter => "KEY_ENTER",
            Self::Return => "KEY_RETURN",
            Self::Home => "KEY_HOME",
            Self::Exit => "KEY_EXIT",
            Self::Menu => "KEY_MENU",
            Self::Source => "KEY_SOURCE",
            Self::Info => "KEY_INFO",
            Self::Guide => "KEY_GUIDE",
            Self::Power => "KEY_POWER",
            Self::Mute => "KEY_MUTE",
            Self::VolumeUp => "KEY_VOLUP",
            Self::VolumeDown => "KEY_VOLDOWN",
            Self::ChannelUp => "KEY_CHUP",
            Self::ChannelDown => "KEY_CHDOWN",
            Self::Number0 => "KEY_0",
            Self::Number1 => "KEY_1",
            Self::Number2 => "KEY_2",
            Self::Number3 => "KEY_3",
            Self::Number4 => "KEY_4",
            Self::Number5 => "KEY_5",
            Self::Number6 => "KEY_6",
            Self::Number7 => "KEY_7",
            Self::Number8 => "KEY_8",
            Self::Number9 => "KEY_9",
            Self::Contents => "KEY_CONTENTS",
            Self::Play => "KEY_PLAY",
            Self::Pause => "KEY_PAUSE",
            Self::Stop => "KEY_STOP",
            Self::Rewind => "KEY_REWIND",
            Self::FastForward => "KEY_FF",
        }
    }

    /// Numeric keypad key for `n` in `0..=9`.
    pub fn digit(n: u8) -> Result<Self, CoreError> {
        let key = match n {
            0 => Self::Number0,
            1 => Self::Number1,
            2 => Self::Number2,
            3 => Self::Number3,
            4 => Self::Number4,
            5 => Self::Number5,
            6 => Self::Number6,
            7 => Self::Number7,
            8 => Self::Number8,
            9 => Self::Number9,
            _ => {
                return Err(CoreError::InvalidInput {
                    message: format!("no keypad key for {n}, expected 0-9"),
                });
            }
        };
        Ok(key)
    }

    /// Every key, in declaration order.
    pub fn catalogue() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}
