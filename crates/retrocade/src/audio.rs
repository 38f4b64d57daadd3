//! Reference sound engine: WAV playback through rodio.
//!
//! Sound ids index the WAV files of the sound directory in name order, one
//! mixing sink per id. One-shots are queued on their sink; the UFO loop is
//! an infinitely repeating source that `stop_loop` cuts off. All sources are
//! pre-scaled so three simultaneous sounds cannot clip.

use std::fs;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};

use log::{error, warn};
use rodio::{Decoder, OutputStream, Sink, Source};

use retrocade_invaders::apu::SoundDispatch;

/// Per-sink volume so up to three simultaneous sources stay in range.
const VOLUME: f32 = 0.33;

pub struct WavSound {
    // Keeps the output device alive for the sinks.
    _stream: OutputStream,
    sinks: Vec<Sink>,
    sounds: Vec<Vec<u8>>,
    looping: Vec<bool>,
}

impl WavSound {
    /// Open the default output device and load every WAV file in
    /// `sound_dir`. Returns `None` (audio disabled) when the directory has
    /// no usable files or no output device is available.
    pub fn new(sound_dir: &Path) -> Option<Self> {
        let mut files: Vec<PathBuf> = match fs::read_dir(sound_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|x| x.eq_ignore_ascii_case("wav")))
                .collect(),
            Err(e) => {
                warn!(
                    "failed to read sound directory {}: {e}, disabling audio",
                    sound_dir.display()
                );
                return None;
            }
        };
        files.sort();
        if files.is_empty() {
            warn!("no wav files in {}, disabling audio", sound_dir.display());
            return None;
        }

        let Ok((stream, handle)) = OutputStream::try_default() else {
            error!("failed to open default audio output stream, disabling audio");
            return None;
        };

        let mut sinks = Vec::with_capacity(files.len());
        let mut sounds = Vec::with_capacity(files.len());
        for path in &files {
            match fs::read(path) {
                Ok(bytes) => {
                    let Ok(sink) = Sink::try_new(&handle) else {
                        error!("failed to create audio sink, disabling audio");
                        return None;
                    };
                    sink.set_volume(VOLUME);
                    sinks.push(sink);
                    sounds.push(bytes);
                }
                Err(e) => warn!("failed to load sound {}: {e}", path.display()),
            }
        }

        let looping = vec![false; sinks.len()];
        Some(Self {
            _stream: stream,
            sinks,
            sounds,
            looping,
        })
    }

    fn decode(&self, id: usize) -> Option<Decoder<BufReader<Cursor<Vec<u8>>>>> {
        let bytes = self.sounds.get(id)?.clone();
        match Decoder::new(BufReader::new(Cursor::new(bytes))) {
            Ok(source) => Some(source),
            Err(e) => {
                error!("failed to decode sound {id}: {e}");
                None
            }
        }
    }
}

impl SoundDispatch for WavSound {
    fn play_once(&mut self, id: u8) {
        let id = id as usize;
        if id >= self.sinks.len() {
            warn!("no audio data for sound {id}");
            return;
        }
        if let Some(source) = self.decode(id) {
            self.sinks[id].append(source);
        }
    }

    fn start_loop(&mut self, id: u8) {
        let id = id as usize;
        if id >= self.sinks.len() || self.looping[id] {
            return;
        }
        if let Some(source) = self.decode(id) {
            self.sinks[id].append(source.repeat_infinite());
            self.looping[id] = true;
        }
    }

    fn stop_loop(&mut self, id: u8) {
        let id = id as usize;
        if id >= self.sinks.len() || !self.looping[id] {
            return;
        }
        self.sinks[id].stop();
        self.sinks[id].play();
        self.looping[id] = false;
    }
}
