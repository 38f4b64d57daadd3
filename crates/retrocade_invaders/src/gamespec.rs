//! Game descriptors: ROM part layout, colour overlays/PROMs and initial
//! input-port bits, keyed by game name.
//!
//! Built-in descriptors cover the two supported ROM sets; a JSON config file
//! with the same schema can override the table.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};
use retrocade_common::Color;

/// One ROM image inside a zip set and where it maps in memory.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RomPart {
    pub file_name: String,
    pub start_addr: u16,
    pub expected_size: u16,
}

/// One colour-PROM image inside a zip set. Multiple PROMs are concatenated
/// in declaration order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorProm {
    pub file_name: String,
    pub expected_size: u16,
}

/// Axis-aligned rectangle assigning a foreground colour.
///
/// An axis with `min == max == 0` matches every coordinate on that axis, so
/// full-width or full-height bands need only one pair of bounds.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorOverlay {
    #[serde(default)]
    pub x_min: u16,
    #[serde(default)]
    pub x_max: u16,
    #[serde(default)]
    pub y_min: u16,
    #[serde(default)]
    pub y_max: u16,
    /// ARGB8888.
    pub color: u32,
}

impl ColorOverlay {
    pub fn contains(&self, x: u16, y: u16) -> bool {
        let x_match = (self.x_min == 0 && self.x_max == 0) || (x >= self.x_min && x <= self.x_max);
        let y_match = (self.y_min == 0 && self.y_max == 0) || (y >= self.y_min && y <= self.y_max);
        x_match && y_match
    }
}

/// Input-port bit wired to a fixed level at power-on (DIP switches and
/// always-high cabinet lines).
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortBit {
    pub port: u8,
    pub bit: u8,
    pub active: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSpec {
    pub rom_parts: Vec<RomPart>,
    #[serde(default)]
    pub color_overlays: Vec<ColorOverlay>,
    #[serde(default)]
    pub color_proms: Vec<ColorProm>,
    #[serde(default)]
    pub in_ports: Vec<PortBit>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    game_specs: HashMap<String, GameSpec>,
}

fn part(file_name: &str, start_addr: u16, expected_size: u16) -> RomPart {
    RomPart {
        file_name: file_name.to_string(),
        start_addr,
        expected_size,
    }
}

fn invaders() -> GameSpec {
    GameSpec {
        rom_parts: vec![
            part("invaders.h", 0x0000, 0x0800),
            part("invaders.g", 0x0800, 0x0800),
            part("invaders.f", 0x1000, 0x0800),
            part("invaders.e", 0x1800, 0x0800),
        ],
        color_overlays: vec![
            ColorOverlay {
                x_min: 0,
                x_max: 0,
                y_min: 32,
                y_max: 63,
                color: Color::RED.to_argb8888(),
            },
            ColorOverlay {
                x_min: 0,
                x_max: 0,
                y_min: 180,
                y_max: 240,
                color: Color::GREEN.to_argb8888(),
            },
            ColorOverlay {
                x_min: 16,
                x_max: 128,
                y_min: 241,
                y_max: SCREEN_HEIGHT as u16,
                color: Color::GREEN.to_argb8888(),
            },
        ],
        color_proms: Vec::new(),
        // Port 1 bit 3 is wired high on the Midway board.
        in_ports: vec![PortBit {
            port: 1,
            bit: 3,
            active: true,
        }],
    }
}

fn invadpt2() -> GameSpec {
    GameSpec {
        rom_parts: vec![
            part("pv01", 0x0000, 0x0800),
            part("pv02", 0x0800, 0x0800),
            part("pv03", 0x1000, 0x0800),
            part("pv04", 0x1800, 0x0800),
            part("pv05", 0x4000, 0x0800),
        ],
        color_overlays: Vec::new(),
        color_proms: vec![
            ColorProm {
                file_name: "pv06.1".to_string(),
                expected_size: 0x0400,
            },
            ColorProm {
                file_name: "pv07.2".to_string(),
                expected_size: 0x0400,
            },
        ],
        in_ports: vec![PortBit {
            port: 1,
            bit: 3,
            active: true,
        }],
    }
}

/// Built-in descriptor for a game name (the ROM file stem).
pub fn builtin(game_name: &str) -> Option<GameSpec> {
    match game_name {
        "invaders" => Some(invaders()),
        "invadpt2" => Some(invadpt2()),
        _ => None,
    }
}

/// Resolve and validate the descriptor for `game_name`, preferring the JSON
/// config text when one is supplied.
pub fn load(config: Option<&str>, game_name: &str) -> Result<GameSpec> {
    let spec = match config {
        Some(text) => {
            let file: ConfigFile =
                serde_json::from_str(text).context("failed to parse game specs")?;
            file.game_specs
                .get(game_name)
                .cloned()
                .with_context(|| format!("no specs for game: {game_name}"))?
        }
        None => builtin(game_name)
            .with_context(|| format!("no built-in specs for game: {game_name}"))?,
    };
    validate(&spec)?;
    Ok(spec)
}

/// Startup validation: ROM parts must be declared in ascending, disjoint
/// address ranges, and no two overlays may claim the same pixel.
pub fn validate(spec: &GameSpec) -> Result<()> {
    if spec.rom_parts.is_empty() {
        bail!("missing game parts");
    }

    for pair in spec.rom_parts.windows(2) {
        let (prev, current) = (&pair[0], &pair[1]);
        if current.start_addr <= prev.start_addr {
            bail!(
                "game parts: start address {:x} of part {} is higher than start address {:x} of part {}",
                prev.start_addr,
                prev.file_name,
                current.start_addr,
                current.file_name,
            );
        }
        let prev_end = u32::from(prev.start_addr) + u32::from(prev.expected_size);
        if prev_end > u32::from(current.start_addr) {
            bail!(
                "game parts: part {} (start: {:x}, end: {:x}) overlaps with part {} (start: {:x}, end: {:x})",
                prev.file_name,
                prev.start_addr,
                prev_end,
                current.file_name,
                current.start_addr,
                u32::from(current.start_addr) + u32::from(current.expected_size),
            );
        }
    }

    if spec.color_overlays.len() >= 2 {
        for x in 0..SCREEN_WIDTH as u16 {
            for y in 0..SCREEN_HEIGHT as u16 {
                let mut matching: Option<usize> = None;
                for (i, overlay) in spec.color_overlays.iter().enumerate() {
                    if overlay.contains(x, y) {
                        if let Some(first) = matching {
                            bail!(
                                "color overlays: overlays {first} and {i} are overlapping at pixel x: {x}, y: {y}"
                            );
                        }
                        matching = Some(i);
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_specs_validate() {
        for name in ["invaders", "invadpt2"] {
            let spec = builtin(name).unwrap();
            validate(&spec).unwrap();
        }
        assert!(builtin("pacman").is_none());
    }

    #[test]
    fn load_rejects_unknown_games() {
        assert!(load(None, "unknown").is_err());
    }

    #[test]
    fn overlapping_parts_are_rejected() {
        let spec = GameSpec {
            rom_parts: vec![part("a", 0x0000, 0x1000), part("b", 0x0800, 0x0800)],
            ..GameSpec::default()
        };
        let err = validate(&spec).unwrap_err().to_string();
        assert!(err.contains("overlaps"), "{err}");
    }

    #[test]
    fn unordered_parts_are_rejected() {
        let spec = GameSpec {
            rom_parts: vec![part("a", 0x0800, 0x0800), part("b", 0x0000, 0x0800)],
            ..GameSpec::default()
        };
        assert!(validate(&spec).is_err());
    }

    #[test]
    fn overlapping_overlays_are_rejected() {
        let mut spec = invaders();
        spec.color_overlays.push(ColorOverlay {
            x_min: 0,
            x_max: 0,
            y_min: 60,
            y_max: 70,
            color: 0xFFFFFFFF,
        });
        let err = validate(&spec).unwrap_err().to_string();
        assert!(err.contains("overlapping"), "{err}");
    }

    #[test]
    fn wildcard_axis_matches_everything() {
        let overlay = ColorOverlay {
            x_min: 0,
            x_max: 0,
            y_min: 10,
            y_max: 20,
            color: 0xFFFF0000,
        };
        assert!(overlay.contains(0, 15));
        assert!(overlay.contains(223, 15));
        assert!(!overlay.contains(0, 21));
    }

    #[test]
    fn config_file_overrides_builtin_table() {
        let config = r#"{
            "gameSpecs": {
                "custom": {
                    "romParts": [
                        {"fileName": "custom.rom", "startAddr": 0, "expectedSize": 2048}
                    ],
                    "colorOverlays": [
                        {"yMin": 10, "yMax": 20, "color": 4294901760}
                    ],
                    "inPorts": [
                        {"port": 1, "bit": 3, "active": true}
                    ]
                }
            }
        }"#;
        let spec = load(Some(config), "custom").unwrap();
        assert_eq!(spec.rom_parts[0].file_name, "custom.rom");
        assert_eq!(spec.color_overlays[0].color, 0xFFFF0000);
        assert!(spec.in_ports[0].active);

        assert!(load(Some(config), "invaders").is_err());
    }
}
