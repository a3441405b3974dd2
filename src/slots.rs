//! Multitouch slot tracking (`ABS_MT_*`, protocol B).
//!
//! The table has a fixed capacity of [`MAX_SLOTS`]. A slot index outside it is
//! rejected and leaves no slot selected, so the per-slot fields that follow it
//! are dropped until the device selects a valid slot again.

use bitflags::bitflags;
use tracing::debug;

/// Slot table capacity.
pub const MAX_SLOTS: usize = 16;

bitflags! {
    /// Per-slot changes waiting for the next flush.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SlotPending: u8 {
        const DOWN = 1 << 0;
        const MOTION = 1 << 1;
        const UP = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Slot {
    /// Last remapped position, screen space.
    pub x: i32,
    pub y: i32,
    /// A non-negative tracking id has been seen and not yet ended.
    pub active: bool,
    pub pending: SlotPending,
}

#[derive(Clone, Debug)]
pub struct SlotTable {
    slots: [Slot; MAX_SLOTS],
    current: Option<usize>,
}

impl Default for SlotTable {
    fn default() -> Self {
        Self {
            slots: [Slot::default(); MAX_SLOTS],
            current: Some(0),
        }
    }
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected slot, if the last `ABS_MT_SLOT` was in range.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// `ABS_MT_SLOT`. Returns `false` when the index was rejected.
    pub fn select(&mut self, value: i32) -> bool {
        match usize::try_from(value) {
            Ok(index) if index < MAX_SLOTS => {
                self.current = Some(index);
                true
            }
            _ => {
                debug!(slot = value, capacity = MAX_SLOTS, "[mt] slot index out of range");
                self.current = None;
                false
            }
        }
    }

    /// `ABS_MT_TRACKING_ID`.
    ///
    /// Non-negative ids mark a pending down every time they are seen; negative
    /// ids end the contact.
    pub fn set_tracking_id(&mut self, id: i32) {
        let Some(slot) = self.current_mut() else {
            return;
        };
        if id >= 0 {
            slot.active = true;
            slot.pending |= SlotPending::DOWN;
        } else {
            slot.active = false;
            slot.pending |= SlotPending::UP;
        }
    }

    /// `ABS_MT_POSITION_X`, already remapped.
    pub fn set_x(&mut self, x: i32) {
        if let Some(slot) = self.current_mut() {
            slot.x = x;
            slot.pending |= SlotPending::MOTION;
        }
    }

    /// `ABS_MT_POSITION_Y`, already remapped.
    pub fn set_y(&mut self, y: i32) {
        if let Some(slot) = self.current_mut() {
            slot.y = y;
            slot.pending |= SlotPending::MOTION;
        }
    }

    pub fn has_pending(&self) -> bool {
        self.slots.iter().any(|s| !s.pending.is_empty())
    }

    /// Any slot with a position update not yet flushed.
    pub fn has_pending_motion(&self) -> bool {
        self.slots.iter().any(|s| s.pending.contains(SlotPending::MOTION))
    }

    /// Mutable iteration for the flush engine.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Slot)> {
        self.slots.iter_mut().enumerate()
    }

    /// Indices of slots holding an ongoing contact.
    pub fn active(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, _)| i)
            .collect()
    }

    fn current_mut(&mut self) -> Option<&mut Slot> {
        let index = self.current?;
        self.slots.get_mut(index)
    }
}
