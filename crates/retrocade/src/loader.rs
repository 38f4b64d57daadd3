//! ROM loading: flat binaries and zip sets described by a game spec.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::Path;

use anyhow::{ensure, Context, Result};

use retrocade_invaders::arcade::Arcade;
use retrocade_invaders::gamespec;
use retrocade_invaders::video::ColorScheme;

/// Game name: the ROM file name without its extension.
pub fn game_name(rom_path: &Path) -> String {
    rom_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_zip(rom_path: &Path) -> bool {
    rom_path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

fn read_config(config_path: Option<&Path>) -> Result<Option<String>> {
    match config_path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            Ok(Some(text))
        }
        None => Ok(None),
    }
}

/// Load a ROM into the machine: a flat binary goes to the mode's base
/// address; a zip set is mapped part by part per its game spec, which also
/// supplies the colour scheme and input-port defaults.
pub fn load_into(arcade: &mut Arcade, rom_path: &Path, config_path: Option<&Path>) -> Result<()> {
    let bytes = fs::read(rom_path)
        .with_context(|| format!("failed to read rom {}", rom_path.display()))?;
    ensure!(!bytes.is_empty(), "no rom passed to emulator");

    if !is_zip(rom_path) {
        return arcade.load_flat_rom(&bytes);
    }

    let config = read_config(config_path)?;
    let spec = gamespec::load(config.as_deref(), &game_name(rom_path))?;
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).context("failed to open zip archive")?;

    for part in &spec.rom_parts {
        let data = member_bytes(&mut archive, &part.file_name)?;
        arcade
            .load_rom_part(part, &data)
            .with_context(|| format!("failed to load {}", part.file_name))?;
    }

    let mut prom = Vec::new();
    for p in &spec.color_proms {
        let data = member_bytes(&mut archive, &p.file_name)?;
        ensure!(
            data.len() == p.expected_size as usize,
            "unexpected size difference when loading {}, expected: {}, actual: {}",
            p.file_name,
            p.expected_size,
            data.len(),
        );
        prom.extend_from_slice(&data);
    }

    if !prom.is_empty() {
        arcade.set_color_scheme(ColorScheme::Prom(prom));
    } else if !spec.color_overlays.is_empty() {
        arcade.set_color_scheme(ColorScheme::Overlays(spec.color_overlays.clone()));
    }
    arcade.set_input_defaults(&spec.in_ports);

    Ok(())
}

/// ROM bytes for disassembly: a flat file as-is, a zip set concatenated in
/// part order.
pub fn rom_listing_bytes(rom_path: &Path, config_path: Option<&Path>) -> Result<Vec<u8>> {
    let bytes = fs::read(rom_path)
        .with_context(|| format!("failed to read rom {}", rom_path.display()))?;
    ensure!(!bytes.is_empty(), "no rom passed to emulator");

    if !is_zip(rom_path) {
        return Ok(bytes);
    }

    let config = read_config(config_path)?;
    let spec = gamespec::load(config.as_deref(), &game_name(rom_path))?;
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).context("failed to open zip archive")?;

    let mut out = Vec::new();
    for part in &spec.rom_parts {
        out.extend(member_bytes(&mut archive, &part.file_name)?);
    }
    Ok(out)
}

fn member_bytes<R: Read + io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>> {
    let mut file = archive
        .by_name(name)
        .with_context(|| format!("bad zip member: {name}"))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrocade_invaders::apu::NullSound;
    use retrocade_invaders::arcade::Options;
    use retrocade_invaders::Bus;
    use std::io::Write;

    /// Build an in-memory invaders.zip with recognisable part contents.
    fn fake_invaders_zip() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, fill) in [
            ("invaders.h", 0x11u8),
            ("invaders.g", 0x22),
            ("invaders.f", 0x33),
            ("invaders.e", 0x44),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(&vec![fill; 0x800]).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn temp_file(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("retrocade-{}-{name}", std::process::id()));
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn zip_set_maps_parts_and_overlay_scheme() {
        let rom_path = temp_file("invaders.zip", &fake_invaders_zip());
        // The game-spec lookup keys on the file stem; a config override keyed
        // by the actual stem keeps the test independent of temp file naming.
        let stem = game_name(&rom_path);
        let config = format!(
            r#"{{"gameSpecs": {{"{stem}": {{
                "romParts": [
                    {{"fileName": "invaders.h", "startAddr": 0, "expectedSize": 2048}},
                    {{"fileName": "invaders.g", "startAddr": 2048, "expectedSize": 2048}},
                    {{"fileName": "invaders.f", "startAddr": 4096, "expectedSize": 2048}},
                    {{"fileName": "invaders.e", "startAddr": 6144, "expectedSize": 2048}}
                ],
                "inPorts": [{{"port": 1, "bit": 3, "active": true}}]
            }}}}}}"#
        );
        let config_path = temp_file("config.json", config.as_bytes());

        let mut arcade = Arcade::new(&rom_path, Box::new(NullSound), Options::default());
        load_into(&mut arcade, &rom_path, Some(&config_path)).unwrap();

        assert_eq!(arcade.memory_mut().read(0x0000), 0x11);
        assert_eq!(arcade.memory_mut().read(0x0800), 0x22);
        assert_eq!(arcade.memory_mut().read(0x1000), 0x33);
        assert_eq!(arcade.memory_mut().read(0x1FFF), 0x44);
        assert_eq!(arcade.cpu().io_ports[1] & 0x08, 0x08);

        fs::remove_file(&rom_path).ok();
        fs::remove_file(&config_path).ok();
    }

    #[test]
    fn size_mismatch_is_a_startup_error() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer.start_file("short.rom", options).unwrap();
        writer.write_all(&[0u8; 16]).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let rom_path = temp_file("short.zip", &bytes);
        let stem = game_name(&rom_path);
        let config = format!(
            r#"{{"gameSpecs": {{"{stem}": {{
                "romParts": [{{"fileName": "short.rom", "startAddr": 0, "expectedSize": 2048}}]
            }}}}}}"#
        );
        let config_path = temp_file("short-config.json", config.as_bytes());

        let mut arcade = Arcade::new(&rom_path, Box::new(NullSound), Options::default());
        let err = load_into(&mut arcade, &rom_path, Some(&config_path))
            .unwrap_err()
            .to_string();
        assert!(err.contains("failed to load short.rom"), "{err}");

        fs::remove_file(&rom_path).ok();
        fs::remove_file(&config_path).ok();
    }

    #[test]
    fn flat_rom_loads_at_the_base_address() {
        let rom_path = temp_file("flat.bin", &[0xC3, 0x00, 0x00]);
        let mut arcade = Arcade::new(&rom_path, Box::new(NullSound), Options::default());
        load_into(&mut arcade, &rom_path, None).unwrap();
        assert_eq!(arcade.memory_mut().read(0x0000), 0xC3);
        fs::remove_file(&rom_path).ok();
    }

    #[test]
    fn missing_zip_member_is_reported() {
        let rom_path = temp_file("empty.zip", &{
            let writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
            writer.finish().unwrap().into_inner()
        });
        let stem = game_name(&rom_path);
        let config = format!(
            r#"{{"gameSpecs": {{"{stem}": {{
                "romParts": [{{"fileName": "nope.rom", "startAddr": 0, "expectedSize": 16}}]
            }}}}}}"#
        );
        let config_path = temp_file("empty-config.json", config.as_bytes());

        let mut arcade = Arcade::new(&rom_path, Box::new(NullSound), Options::default());
        let err = load_into(&mut arcade, &rom_path, Some(&config_path))
            .unwrap_err()
            .to_string();
        assert!(err.contains("bad zip member"), "{err}");

        fs::remove_file(&rom_path).ok();
        fs::remove_file(&config_path).ok();
    }
}
