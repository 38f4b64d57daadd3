//! Emulator frontend wiring: ROM/zip loading, sound engine selection and
//! the run entry point used by the CLI.
//!
//! Window hosts are external to this repository; runs here always use the
//! core's [`HeadlessHost`], so `--headless` only affects audio selection.

#[cfg(feature = "audio")]
pub mod audio;
pub mod loader;

use std::path::PathBuf;

use anyhow::Result;
use retrocade_invaders::apu::{NullSound, SoundDispatch};
use retrocade_invaders::arcade::{Arcade, HeadlessHost, Options};

/// Everything the CLI collects for a run.
#[derive(Clone, Debug, Default)]
pub struct RunConfig {
    pub rom: PathBuf,
    pub cpm: bool,
    pub headless: bool,
    pub unthrottle: bool,
    pub mute: bool,
    pub debug: bool,
    pub sound_dir: Option<PathBuf>,
    pub state: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Load the ROM and drive the machine until it halts or is shut down.
pub fn run(config: RunConfig) -> Result<()> {
    let options = Options {
        cpm: config.cpm,
        unthrottle: config.unthrottle,
        debug: config.debug,
        state_path: config.state.clone(),
    };
    let apu = make_sound(&config);

    let mut arcade = Arcade::new(&config.rom, apu, options);
    loader::load_into(&mut arcade, &config.rom, config.config.as_deref())?;

    if config.state.is_some() {
        arcade.load_state_file()?;
    }

    let mut host = HeadlessHost;
    arcade.run(&mut host)
}

#[cfg(feature = "audio")]
fn make_sound(config: &RunConfig) -> Box<dyn SoundDispatch> {
    use log::warn;

    if config.mute || config.headless {
        return Box::new(NullSound);
    }
    let Some(dir) = &config.sound_dir else {
        warn!("sound files not loaded, audio disabled");
        return Box::new(NullSound);
    };
    match audio::WavSound::new(dir) {
        Some(engine) => Box::new(engine),
        None => Box::new(NullSound),
    }
}

#[cfg(not(feature = "audio"))]
fn make_sound(config: &RunConfig) -> Box<dyn SoundDispatch> {
    use log::warn;

    if config.sound_dir.is_some() && !config.mute && !config.headless {
        warn!("built without the 'audio' feature, ignoring --sound-dir");
    }
    Box::new(NullSound)
}
