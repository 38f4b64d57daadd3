//! Sound trigger dispatch.
//!
//! The CPU's `OUT 3`/`OUT 5` handlers translate port-bit edges into logical
//! sound ids and hand them to a [`SoundDispatch`] implementation. The core
//! never touches audio hardware; the reference engine lives in the frontend
//! crate.

/// UFO drone, the only looping sound (port 3 bit 0).
pub const SOUND_UFO: u8 = 0;
/// Player shot (port 3 bit 1).
pub const SOUND_SHOT: u8 = 1;
/// Player explosion (port 3 bit 2).
pub const SOUND_PLAYER_DIE: u8 = 2;
/// Invader explosion (port 3 bit 3).
pub const SOUND_INVADER_DIE: u8 = 3;
/// Fleet movement notes 1-4 (port 5 bits 0-3).
pub const SOUND_FLEET_1: u8 = 4;
pub const SOUND_FLEET_2: u8 = 5;
pub const SOUND_FLEET_3: u8 = 6;
pub const SOUND_FLEET_4: u8 = 7;
/// UFO hit (port 5 bit 4).
pub const SOUND_UFO_HIT: u8 = 8;

/// Capability handle the CPU uses to emit sound triggers.
///
/// Starting an already-running loop and stopping a loop that is not running
/// must both be no-ops.
pub trait SoundDispatch {
    fn play_once(&mut self, id: u8);
    fn start_loop(&mut self, id: u8);
    fn stop_loop(&mut self, id: u8);
}

/// Dispatcher that drops every trigger, for headless and muted runs.
pub struct NullSound;

impl SoundDispatch for NullSound {
    fn play_once(&mut self, _id: u8) {}
    fn start_loop(&mut self, _id: u8) {}
    fn stop_loop(&mut self, _id: u8) {}
}

/// Test dispatcher that records every trigger in order.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSound {
    pub events: Vec<SoundEvent>,
}

#[cfg(test)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SoundEvent {
    Once(u8),
    LoopStart(u8),
    LoopStop(u8),
}

#[cfg(test)]
impl SoundDispatch for RecordingSound {
    fn play_once(&mut self, id: u8) {
        self.events.push(SoundEvent::Once(id));
    }

    fn start_loop(&mut self, id: u8) {
        self.events.push(SoundEvent::LoopStart(id));
    }

    fn stop_loop(&mut self, id: u8) {
        self.events.push(SoundEvent::LoopStop(id));
    }
}
