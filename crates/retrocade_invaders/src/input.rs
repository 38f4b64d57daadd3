//! Host key translation.
//!
//! Maps the host-agnostic [`Key`] vocabulary onto cabinet input-port bits
//! and emulator lifecycle commands. The machine applies port bits on both
//! key edges (except latched ones) and lifecycle commands on press only.

use retrocade_common::Key;

/// Emulator lifecycle action bound to a key.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Command {
    Reset,
    TogglePause,
    SaveState,
    LoadState,
    Quit,
}

/// What a key does when pressed or released.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InputEvent {
    /// Drive an input-port bit. A latched bit is only ever set on press and
    /// left for the game program to clear (the tilt switch works this way).
    Port { port: u8, bit: u8, latched: bool },
    Lifecycle(Command),
}

const fn port(port: u8, bit: u8) -> Option<InputEvent> {
    Some(InputEvent::Port {
        port,
        bit,
        latched: false,
    })
}

/// Cabinet key map:
///
/// - `5`/`C`  coin (port 1 bit 0)
/// - `1`/`2`  start 1P / 2P (port 1 bits 2 / 1)
/// - arrows + space (or `A`/`D`/`S`) player 1 (port 1 bits 5 / 6 / 4)
/// - `J`/`L`/`K` player 2 (port 2 bits 5 / 6 / 4)
/// - `T` tilt (port 2 bit 2, latched)
/// - `R` reset, `P` pause, `9` load state, `0` save state
pub fn map_key(key: Key) -> Option<InputEvent> {
    match key {
        Key::Num5 | Key::C => port(1, 0),
        Key::Num1 => port(1, 2),
        Key::Num2 => port(1, 1),
        Key::Left | Key::A => port(1, 5),
        Key::Right | Key::D => port(1, 6),
        Key::Space | Key::S => port(1, 4),
        Key::J => port(2, 5),
        Key::L => port(2, 6),
        Key::K => port(2, 4),
        Key::T => Some(InputEvent::Port {
            port: 2,
            bit: 2,
            latched: true,
        }),
        Key::R => Some(InputEvent::Lifecycle(Command::Reset)),
        Key::P => Some(InputEvent::Lifecycle(Command::TogglePause)),
        Key::Num9 => Some(InputEvent::Lifecycle(Command::LoadState)),
        Key::Num0 => Some(InputEvent::Lifecycle(Command::SaveState)),
        Key::Escape => Some(InputEvent::Lifecycle(Command::Quit)),
        _ => None,
    }
}
