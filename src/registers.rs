//! FT6336U register map and raw register decoders.
//!
//! The FT6336U reports each touch as a six byte block. The upper bits of the
//! coordinate high bytes are shared with other fields:
//!
//! | Offset | Bits 7..6 | Bits 5..4 | Bits 3..0    |
//! |--------|-----------|-----------|--------------|
//! | 0 (XH) | event     | reserved  | X bits 11..8 |
//! | 1 (XL) | X bits 7..0                          |
//! | 2 (YH) | touch id              | Y bits 11..8 |
//! | 3 (YL) | Y bits 7..0                          |
//! | 4      | weight                               |
//! | 5      | misc (area)           | reserved     |
//!
//! Every decoder here works on bytes that were already fetched and never fails.
//! Out-of-range values such as a touch id above 1 are passed through as-is.

/// Touch status register. Holds the number of active touches.
pub const FT6336U_TD_STATUS: u8 = 0x02;

pub const FT6336U_TOUCH1_XH: u8 = 0x03;
pub const FT6336U_TOUCH1_XL: u8 = 0x04;
pub const FT6336U_TOUCH1_YH: u8 = 0x05;
pub const FT6336U_TOUCH1_YL: u8 = 0x06;
pub const FT6336U_TOUCH1_WEIGHT: u8 = 0x07;
pub const FT6336U_TOUCH1_MISC: u8 = 0x08;

pub const FT6336U_TOUCH2_XH: u8 = 0x09;
pub const FT6336U_TOUCH2_XL: u8 = 0x0A;
pub const FT6336U_TOUCH2_YH: u8 = 0x0B;
pub const FT6336U_TOUCH2_YL: u8 = 0x0C;
pub const FT6336U_TOUCH2_WEIGHT: u8 = 0x0D;
pub const FT6336U_TOUCH2_MISC: u8 = 0x0E;

/// Firmware ID register, read once during identification.
pub const FT6336U_FIRMWARE_ID: u8 = 0xA6;

/// Firmware ID byte reported by a responding FT6336U.
pub const FT6336U_EXPECTED_FIRMWARE_ID: u8 = 0x10;

/// Size of one touch record block (XH through MISC).
pub const TOUCH_RECORD_LEN: usize = 6;

/// One of the two touch report channels of the chip.
///
/// Channels are positional: channel 1 always holds the first reported touch.
/// The persistent slot a touch belongs to is given by the id inside the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchChannel {
    First,
    Second,
}

impl TouchChannel {
    /// First register of this channel's record block.
    pub const fn base_register(self) -> u8 {
        match self {
            TouchChannel::First => FT6336U_TOUCH1_XH,
            TouchChannel::Second => FT6336U_TOUCH2_XH,
        }
    }
}

/// Event flag reported with each touch record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Event {
    PressDown = 0b00,
    LiftUp = 0b01,
    Contact = 0b10,
    NoEvent = 0b11,
}

impl Event {
    /// Maps a 2-bit event code. Only the two low bits are considered.
    pub const fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0b00 => Event::PressDown,
            0b01 => Event::LiftUp,
            0b10 => Event::Contact,
            _ => Event::NoEvent,
        }
    }

    /// Raw 2-bit code of this event.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// One contact as reported by the chip for a single poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchRecord {
    pub event: Event,
    /// Hardware assigned slot id. Expected to be 0 or 1 but not validated here.
    pub id: u8,
    pub x: u16,
    pub y: u16,
    pub weight: u8,
    pub misc: u8,
}

impl TouchRecord {
    /// Decodes a record block as read from a channel's base register.
    pub fn from_bytes(buf: &[u8; TOUCH_RECORD_LEN]) -> Self {
        TouchRecord {
            event: decode_event(buf[0]),
            id: decode_id(buf[2]),
            x: decode_coordinate(buf[0], buf[1]),
            y: decode_coordinate(buf[2], buf[3]),
            weight: decode_weight(buf[4]),
            misc: decode_misc(buf[5]),
        }
    }
}

/// Combines a 4-bit high part and an 8-bit low part into a 12-bit coordinate.
/// The upper nibble of `high` carries other fields and is masked off.
pub const fn decode_coordinate(high: u8, low: u8) -> u16 {
    ((high as u16 & 0x0F) << 8) | low as u16
}

pub const fn decode_event(byte: u8) -> Event {
    Event::from_code(byte >> 6)
}

pub const fn decode_id(byte: u8) -> u8 {
    byte >> 4
}

pub const fn decode_weight(byte: u8) -> u8 {
    byte
}

pub const fn decode_misc(byte: u8) -> u8 {
    byte >> 4
}
