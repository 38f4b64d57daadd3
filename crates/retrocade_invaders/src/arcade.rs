//! Machine assembly and the frame scheduler.
//!
//! [`Arcade`] wires the CPU, memory, video and sound dispatch together and
//! drives them at the cabinet's pace: a 2 MHz CPU sliced into 60 frame
//! budgets per second, with the rasterizer (and its two interrupts) run once
//! per frame. Hosts stay behind the [`Host`] trait; the built-in
//! [`HeadlessHost`] discards frames and produces no events.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{info, warn};
use retrocade_common::Key;

use crate::apu::SoundDispatch;
use crate::cpu::{Cpu, CpuOptions};
use crate::gamespec::{PortBit, RomPart};
use crate::input::{self, Command, InputEvent};
use crate::memory::{Memory, CPM_LOAD_ADDR};
use crate::state::{self, SaveState};
use crate::video::{ColorScheme, Video};

/// 8080 clock of the Taito board.
pub const CPU_HZ: u32 = 2_000_000;
/// Host frame rate.
pub const FPS: u32 = 60;
/// CPU cycle budget per frame.
pub const CYCLES_PER_FRAME: u32 = CPU_HZ / FPS;

/// Event delivered by the host between frames.
pub enum HostEvent {
    Key(Key, bool),
    Quit,
}

/// Narrow interface the scheduler needs from a windowing host.
pub trait Host {
    /// Collect pending events into `events`.
    fn poll_events(&mut self, events: &mut Vec<HostEvent>);
    /// Present one ARGB8888 frame. A host that cannot present at all should
    /// return an error, which aborts the run.
    fn present(&mut self, framebuffer: &[u32]) -> Result<()>;
}

/// Host for `--headless` runs and CPU test harnesses.
pub struct HeadlessHost;

impl Host for HeadlessHost {
    fn poll_events(&mut self, _events: &mut Vec<HostEvent>) {}

    fn present(&mut self, _framebuffer: &[u32]) -> Result<()> {
        Ok(())
    }
}

/// Machine construction options.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// CP/M compatibility: load at 0x0100, stub BDOS, halt on `OUT 0`.
    pub cpm: bool,
    /// Run flat out instead of throttling to 60 fps.
    pub unthrottle: bool,
    /// Per-instruction CPU trace.
    pub debug: bool,
    /// Explicit save-state file (defaults to the ROM path with `.state`).
    pub state_path: Option<PathBuf>,
}

/// The assembled machine.
pub struct Arcade {
    cpu: Cpu,
    memory: Memory,
    video: Video,
    apu: Box<dyn SoundDispatch>,
    scheme: ColorScheme,
    input_defaults: Vec<PortBit>,
    options: Options,
    rom_path: PathBuf,
    paused: bool,
    shutdown: Arc<AtomicBool>,
}

impl Arcade {
    pub fn new(rom_path: impl Into<PathBuf>, apu: Box<dyn SoundDispatch>, options: Options) -> Self {
        let scheme = ColorScheme::Monochrome;
        let mut arcade = Self {
            cpu: Cpu::new(),
            memory: Memory::new(),
            video: Video::new(&scheme),
            apu,
            scheme,
            input_defaults: Vec::new(),
            options,
            rom_path: rom_path.into(),
            paused: false,
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        arcade.reset();
        arcade
    }

    /// Flag the host can set (from a signal handler or window close) to stop
    /// the scheduler at the next frame boundary.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    // --- loading ---------------------------------------------------------

    /// Load a flat ROM image at the mode's base address. In CP/M mode this
    /// also injects the exit and BDOS stubs.
    pub fn load_flat_rom(&mut self, bytes: &[u8]) -> Result<()> {
        anyhow::ensure!(!bytes.is_empty(), "no rom passed to emulator");
        let start = if self.options.cpm { CPM_LOAD_ADDR } else { 0x0000 };
        self.memory.load(start, bytes);
        if self.options.cpm {
            self.apply_cpm_patch();
        }
        Ok(())
    }

    /// Load one ROM part from a zip set, validating its declared size.
    pub fn load_rom_part(&mut self, part: &RomPart, bytes: &[u8]) -> Result<()> {
        anyhow::ensure!(
            bytes.len() == part.expected_size as usize,
            "unexpected size difference when loading {}, expected: {}, actual: {}",
            part.file_name,
            part.expected_size,
            bytes.len(),
        );
        self.memory.load(part.start_addr, bytes);
        Ok(())
    }

    /// Select the foreground colour source and rebuild the video LUT.
    pub fn set_color_scheme(&mut self, scheme: ColorScheme) {
        self.scheme = scheme;
        self.video.recompute_lut(&self.scheme);
    }

    /// Port bits wired to fixed levels at power-on; re-applied on reset.
    pub fn set_input_defaults(&mut self, ports: &[PortBit]) {
        self.input_defaults = ports.to_vec();
        self.apply_input_defaults();
    }

    fn apply_input_defaults(&mut self) {
        for p in &self.input_defaults {
            self.cpu.send_input(p.port, p.bit, p.active);
        }
    }

    fn apply_cpm_patch(&mut self) {
        // OUT 0,A at 0x0000 ends the test; OUT 1,A / RET at 0x0005 is the
        // BDOS console stub.
        self.memory.load(0x0000, &[0xD3, 0x00]);
        self.memory.load(0x0005, &[0xD3, 0x01, 0xC9]);
    }

    // --- lifecycle -------------------------------------------------------

    /// Reset the CPU (memory is preserved) and recompute the colour LUT.
    pub fn reset(&mut self) {
        let pc = if self.options.cpm { CPM_LOAD_ADDR } else { 0x0000 };
        self.cpu.init(
            pc,
            CpuOptions {
                cpm: self.options.cpm,
                debug: self.options.debug,
            },
        );
        self.apply_input_defaults();
        self.video.recompute_lut(&self.scheme);
        self.paused = false;
    }

    pub fn running(&self) -> bool {
        self.cpu.running
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn framebuffer(&self) -> &[u32] {
        self.video.framebuffer()
    }

    pub fn video(&self) -> &Video {
        &self.video
    }

    /// Run one frame: spend the CPU budget (unless paused), then rasterize
    /// and deliver the frame interrupt.
    pub fn step_frame(&mut self) {
        let mut cycles: u32 = 0;
        while !self.paused && self.cpu.running && cycles < CYCLES_PER_FRAME {
            cycles += u32::from(self.cpu.step(&mut self.memory, self.apu.as_mut()));
        }
        self.video.step(&mut self.cpu, &mut self.memory, self.paused);
    }

    /// Drive the machine until the CPU halts or the host shuts it down.
    pub fn run(&mut self, host: &mut dyn Host) -> Result<()> {
        let result = if self.options.unthrottle {
            self.run_unthrottled(host)
        } else {
            self.run_throttled(host)
        };
        self.flush_console();
        result
    }

    fn run_throttled(&mut self, host: &mut dyn Host) -> Result<()> {
        let frame = Duration::from_secs(1) / FPS;
        let mut next_frame = Instant::now() + frame;
        let mut events = Vec::new();

        while self.cpu.running && !self.shutdown.load(Ordering::Relaxed) {
            let now = Instant::now();
            if next_frame > now {
                std::thread::sleep(next_frame - now);
            }
            next_frame += frame;

            self.step_frame();
            host.present(self.video.framebuffer())?;
            host.poll_events(&mut events);
            self.handle_events(&mut events);
            self.flush_console();
        }
        Ok(())
    }

    fn run_unthrottled(&mut self, host: &mut dyn Host) -> Result<()> {
        let mut events = Vec::new();
        let mut cycles: u32 = 0;

        while self.cpu.running {
            cycles += u32::from(self.cpu.step(&mut self.memory, self.apu.as_mut()));

            // The cancellation flag is only polled at frame-budget
            // boundaries to keep it off the per-instruction path.
            if cycles >= CYCLES_PER_FRAME {
                cycles = 0;
                if self.shutdown.load(Ordering::Relaxed) {
                    break;
                }
                self.video.step(&mut self.cpu, &mut self.memory, self.paused);
                host.present(self.video.framebuffer())?;
                host.poll_events(&mut events);
                self.handle_events(&mut events);
                self.flush_console();
            }
        }
        Ok(())
    }

    fn handle_events(&mut self, events: &mut Vec<HostEvent>) {
        for event in events.drain(..) {
            match event {
                HostEvent::Quit => self.shutdown.store(true, Ordering::Relaxed),
                HostEvent::Key(key, pressed) => match input::map_key(key) {
                    Some(InputEvent::Port { port, bit, latched }) => {
                        if pressed {
                            self.cpu.send_input(port, bit, true);
                        } else if !latched {
                            self.cpu.send_input(port, bit, false);
                        }
                    }
                    Some(InputEvent::Lifecycle(command)) if pressed => self.run_command(command),
                    _ => {}
                },
            }
        }
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::Reset => {
                info!("reset");
                self.reset();
            }
            Command::TogglePause => {
                self.paused = !self.paused;
                info!("{}", if self.paused { "paused" } else { "unpaused" });
            }
            Command::SaveState => {
                if let Err(e) = self.save_state_file() {
                    warn!("failed to save state: {e:#}");
                }
            }
            Command::LoadState => {
                if let Err(e) = self.load_state_file() {
                    warn!("failed to load state: {e:#}");
                }
            }
            Command::Quit => self.shutdown.store(true, Ordering::Relaxed),
        }
    }

    fn flush_console(&mut self) {
        let bytes = self.cpu.take_console();
        if bytes.is_empty() {
            return;
        }
        let mut stdout = io::stdout();
        let _ = stdout.write_all(&bytes);
        let _ = stdout.flush();
    }

    // --- save states -----------------------------------------------------

    pub fn save_state(&self) -> SaveState {
        SaveState {
            cpu: self.cpu.save_state(),
            memory: self.memory.image().to_vec(),
        }
    }

    pub fn load_state(&mut self, state: &SaveState) {
        self.cpu.load_state(&state.cpu);
        self.memory.restore(&state.memory);
    }

    fn state_path(&self) -> PathBuf {
        self.options
            .state_path
            .clone()
            .unwrap_or_else(|| state::state_file_path(&self.rom_path))
    }

    pub fn save_state_file(&self) -> Result<()> {
        let path = self.state_path();
        let bytes = self.save_state().to_bytes()?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write state file {}", path.display()))?;
        info!("saved state file: {}", path.display());
        Ok(())
    }

    pub fn load_state_file(&mut self) -> Result<()> {
        let path = self.state_path();
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read state file {}", path.display()))?;
        let state = SaveState::from_bytes(&bytes)?;
        self.load_state(&state);
        info!("loaded state file: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apu::NullSound;
    use crate::cpu::Bus;
    use retrocade_common::Color;

    /// Minimal cabinet program: enable interrupts and idle; the VBLANK
    /// handler samples the coin bit and, when set, lights one VRAM pixel.
    ///
    /// ```text
    /// 0000: LXI SP,$2400
    /// 0003: EI
    /// 0004: NOP              ; idle loop
    /// 0005: JMP $0004
    /// 0008: EI               ; RST 1 handler
    /// 0009: RET
    /// 0010: IN $01           ; RST 2 handler
    /// 0012: ANI $01
    /// 0014: JZ $001a
    /// 0017: STA $2405        ; lights pixel (0, 215)
    /// 001a: EI
    /// 001b: RET
    /// ```
    const COIN_DEMO: [u8; 0x1C] = [
        0x31, 0x00, 0x24, // LXI SP,$2400
        0xFB, // EI
        0x00, // NOP
        0xC3, 0x04, 0x00, // JMP $0004
        0xFB, 0xC9, // RST 1 handler
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // padding up to 0x0010
        0xDB, 0x01, // IN 1
        0xE6, 0x01, // ANI $01
        0xCA, 0x1A, 0x00, // JZ $001a
        0x32, 0x05, 0x24, // STA $2405
        0xFB, // EI
        0xC9, // RET
    ];

    fn demo_arcade() -> Arcade {
        let mut arcade = Arcade::new("demo.rom", Box::new(NullSound), Options::default());
        arcade.load_flat_rom(&COIN_DEMO).unwrap();
        arcade
    }

    #[test]
    fn coin_input_reaches_the_game_loop_and_the_framebuffer() {
        let mut arcade = demo_arcade();
        arcade.cpu_mut().send_input(1, 0, true);
        for _ in 0..4 {
            arcade.step_frame();
        }
        assert_eq!(arcade.video().pixel(0, 215), Color::WHITE.to_argb8888());

        // Without a coin the pixel stays dark.
        let mut idle = demo_arcade();
        for _ in 0..4 {
            idle.step_frame();
        }
        assert_eq!(idle.video().pixel(0, 215), Color::BLACK.to_argb8888());
    }

    #[test]
    fn pause_stops_the_cpu_but_not_the_scan() {
        let mut arcade = demo_arcade();
        arcade.step_frame();
        let cyc = arcade.cpu().cyc;

        arcade.paused = true;
        arcade.step_frame();
        assert_eq!(arcade.cpu().cyc, cyc, "no CPU work while paused");

        arcade.paused = false;
        arcade.step_frame();
        assert!(arcade.cpu().cyc > cyc);
    }

    #[test]
    fn save_load_restores_execution_byte_exact() {
        let mut arcade = demo_arcade();
        arcade.cpu_mut().send_input(1, 0, true);
        for _ in 0..10 {
            arcade.step_frame();
        }
        let snapshot = arcade.save_state();
        for _ in 0..6 {
            arcade.step_frame();
        }
        let reference = arcade.framebuffer().to_vec();
        let reference_cyc = arcade.cpu().cyc;

        // The input latch travels inside the snapshot, so the second machine
        // needs no coin of its own.
        let mut resumed = demo_arcade();
        resumed.load_state(&snapshot);
        for _ in 0..6 {
            resumed.step_frame();
        }
        assert_eq!(resumed.cpu().cyc, reference_cyc);
        assert_eq!(resumed.framebuffer(), &reference[..]);
    }

    #[test]
    fn reset_preserves_memory_and_reapplies_port_defaults() {
        let mut arcade = demo_arcade();
        arcade.set_input_defaults(&[PortBit {
            port: 1,
            bit: 3,
            active: true,
        }]);
        arcade.step_frame();
        arcade.reset();
        assert_eq!(arcade.cpu().pc, 0x0000);
        assert_eq!(arcade.cpu().cyc, 0);
        assert_eq!(arcade.cpu().io_ports[1] & 0x08, 0x08);
        // ROM contents survive a reset.
        assert_eq!(arcade.memory_mut().read(0x0000), 0x31);
    }

    #[test]
    fn key_events_latch_and_release_port_bits() {
        let mut arcade = demo_arcade();
        let mut events = vec![
            HostEvent::Key(Key::C, true),
            HostEvent::Key(Key::T, true),
        ];
        arcade.handle_events(&mut events);
        assert_eq!(arcade.cpu().io_ports[1] & 0x01, 0x01);
        assert_eq!(arcade.cpu().io_ports[2] & 0x04, 0x04);

        let mut events = vec![
            HostEvent::Key(Key::C, false),
            HostEvent::Key(Key::T, false),
        ];
        arcade.handle_events(&mut events);
        assert_eq!(arcade.cpu().io_ports[1] & 0x01, 0x00, "coin releases");
        assert_eq!(arcade.cpu().io_ports[2] & 0x04, 0x04, "tilt stays latched");
    }

    #[test]
    fn quit_event_trips_the_shutdown_flag() {
        let mut arcade = demo_arcade();
        let flag = arcade.shutdown_handle();
        let mut events = vec![HostEvent::Quit];
        arcade.handle_events(&mut events);
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn cpm_program_prints_and_halts() {
        let mut arcade = Arcade::new(
            "hello.com",
            Box::new(NullSound),
            Options {
                cpm: true,
                ..Options::default()
            },
        );
        // MVI C,9 / LXI D,$0120 / CALL 5 / JMP 0, message at 0x0120.
        let mut program = vec![
            0x0E, 0x09, // MVI C,9
            0x11, 0x20, 0x01, // LXI DE,$0120
            0xCD, 0x05, 0x00, // CALL $0005
            0xC3, 0x00, 0x00, // JMP $0000
        ];
        program.resize(0x20, 0);
        program.extend_from_slice(b"HI$");
        arcade.load_flat_rom(&program).unwrap();

        while arcade.running() {
            arcade.step_frame();
        }
        assert_eq!(arcade.cpu_mut().take_console(), b"HI".to_vec());
    }
}
