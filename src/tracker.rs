//! Two-slot touch tracking.
//!
//! The chip only reports what is touching the panel right now. The tracker keeps
//! one slot per hardware touch id and derives the lifecycle of each contact by
//! comparing the current report with the slot's previous status.

use heapless::Vec;

use crate::registers::TouchRecord;

/// Number of touch slots supported by the FT6336U.
pub const MAX_TOUCH_POINTS: usize = 2;

/// Lifecycle status of a touch slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchStatus {
    /// No contact is assigned to the slot. Coordinates are stale.
    #[default]
    Released,
    /// First poll in which the slot is active.
    TouchDown,
    /// The slot has been active for more than one consecutive poll.
    Streaming,
}

impl TouchStatus {
    /// Status after a poll that reports this slot as active.
    pub const fn next_active(self) -> Self {
        match self {
            TouchStatus::Released => TouchStatus::TouchDown,
            TouchStatus::TouchDown | TouchStatus::Streaming => TouchStatus::Streaming,
        }
    }

    pub const fn is_active(self) -> bool {
        !matches!(self, TouchStatus::Released)
    }
}

/// Persistent state of one hardware touch id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchSlot {
    pub status: TouchStatus,
    /// Last known X coordinate. Not updated while released.
    pub x: u16,
    /// Last known Y coordinate. Not updated while released.
    pub y: u16,
}

impl TouchSlot {
    pub const fn new() -> Self {
        TouchSlot {
            status: TouchStatus::Released,
            x: 0,
            y: 0,
        }
    }

    fn press(&mut self, record: &TouchRecord) {
        self.status = self.status.next_active();
        self.x = record.x;
        self.y = record.y;
    }

    fn release(&mut self) {
        self.status = TouchStatus::Released;
    }
}

impl Default for TouchSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// An active contact, as returned by [`TouchPointSnapshot::active_touches`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchPoint {
    pub id: u8,
    pub status: TouchStatus,
    pub x: u16,
    pub y: u16,
}

/// Decoded records of one poll, one per reported touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchReport {
    NoTouch,
    Single(TouchRecord),
    Dual(TouchRecord, TouchRecord),
}

/// A touch record carried an id outside the two supported slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidTouchId(pub u8);

/// Touch count and both slots after the latest poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchPointSnapshot {
    /// Raw value of the touch status register.
    pub touch_count: u8,
    pub slots: [TouchSlot; MAX_TOUCH_POINTS],
}

impl TouchPointSnapshot {
    /// Both slots released, no touches reported.
    pub const fn new() -> Self {
        TouchPointSnapshot {
            touch_count: 0,
            slots: [TouchSlot::new(), TouchSlot::new()],
        }
    }

    /// Returns the slot for a hardware touch id.
    pub fn slot(&self, id: u8) -> Option<&TouchSlot> {
        self.slots.get(id as usize)
    }

    /// Returns all slots that are currently active, ordered by id.
    pub fn active_touches(&self) -> Vec<TouchPoint, MAX_TOUCH_POINTS> {
        let mut touches = Vec::new();
        for (id, slot) in self.slots.iter().enumerate() {
            if slot.status.is_active() {
                touches
                    .push(TouchPoint {
                        id: id as u8,
                        status: slot.status,
                        x: slot.x,
                        y: slot.y,
                    })
                    .ok(); // Capacity matches the slot count
            }
        }
        touches
    }

    /// Applies one poll's report to the slots.
    ///
    /// Ids are checked before any slot is touched, so a rejected report leaves
    /// the snapshot unchanged. A single reported touch releases the other slot.
    /// If both records carry the same id, the second record wins.
    pub fn apply(&mut self, touch_count: u8, report: &TouchReport) -> Result<(), InvalidTouchId> {
        match report {
            TouchReport::NoTouch => {
                self.slots.iter_mut().for_each(TouchSlot::release);
            }
            TouchReport::Single(first) => {
                let id = slot_index(first.id)?;
                self.slots[id].press(first);
                self.slots[1 - id].release();
            }
            TouchReport::Dual(first, second) => {
                let id1 = slot_index(first.id)?;
                let id2 = slot_index(second.id)?;
                #[cfg(feature = "defmt")]
                if id1 == id2 {
                    defmt::warn!("both touch channels report id {}", first.id);
                }
                self.slots[id1].press(first);
                self.slots[id2].press(second);
            }
        }
        self.touch_count = touch_count;
        Ok(())
    }

    /// Releases both slots and clears the touch count.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for TouchPointSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

fn slot_index(id: u8) -> Result<usize, InvalidTouchId> {
    if (id as usize) < MAX_TOUCH_POINTS {
        Ok(id as usize)
    } else {
        Err(InvalidTouchId(id))
    }
}
