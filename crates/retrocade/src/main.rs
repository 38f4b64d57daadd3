use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use retrocade::{loader, RunConfig};
use retrocade_invaders::dasm;

#[derive(Parser)]
#[command(name = "retrocade", about = "Intel 8080 arcade emulator", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Cmd>,

    /// ROM file: a flat binary or a supported .zip set.
    rom: Option<PathBuf>,

    /// Trace every executed instruction (visible with RUST_LOG=trace).
    #[arg(long, short)]
    debug: bool,

    /// Run without video, audio and host events.
    #[arg(long)]
    headless: bool,

    /// CP/M compatibility mode: load at 0x0100 and stub the BDOS calls.
    #[arg(long)]
    cpm: bool,

    /// Run the CPU as fast as possible instead of throttling to 60 fps.
    #[arg(long)]
    unthrottle: bool,

    /// Disable audio output.
    #[arg(long)]
    mute: bool,

    /// Directory of WAV files for the discrete sounds.
    #[arg(long)]
    sound_dir: Option<PathBuf>,

    /// Save-state file to restore on startup (and to write on save).
    #[arg(long)]
    state: Option<PathBuf>,

    /// JSON game-spec file overriding the built-in game table.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Disassemble a ROM to standard output.
    Dasm {
        /// ROM file: a flat binary or a supported .zip set.
        rom: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Cmd::Dasm { rom }) => {
            let bytes = loader::rom_listing_bytes(&rom, cli.config.as_deref())?;
            print!("{}", dasm::disassemble(&bytes));
            Ok(())
        }
        None => {
            let rom = cli.rom.context("missing rom path")?;
            retrocade::run(RunConfig {
                rom,
                cpm: cli.cpm,
                headless: cli.headless,
                unthrottle: cli.unthrottle,
                mute: cli.mute,
                debug: cli.debug,
                sound_dir: cli.sound_dir,
                state: cli.state,
                config: cli.config,
            })
        }
    }
}
