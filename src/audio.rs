//! Ambient soundtrack control.
//!
//! Playback is held back until the first user gesture (click or scroll);
//! after that the track loops. Volume and mute only change what the output
//! is told, never the stored volume.
//!
//! The track is fetched on a worker thread (local file or HTTP) and handed
//! to the output once it arrives, so a slow download never stalls a frame.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AudioError;

/// Track streamed when nothing else is configured.
pub const AMBIENT_TRACK_URL: &str = "https://pub-6738c828bef548d69b3f13bdd680b5b0.r2.dev/space.wav";

/// Sink for the ambient track.
pub trait AudioOutput {
    fn play(&mut self);
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f32);
}

/// Output that discards everything. Used until the track is ready, or when
/// it cannot be played.
#[derive(Debug, Default)]
pub struct SilentOutput;

impl AudioOutput for SilentOutput {
    fn play(&mut self) {}
    fn pause(&mut self) {}
    fn set_volume(&mut self, _volume: f32) {}
}

/// Where the ambient track comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    File(PathBuf),
    Url(String),
}

impl AudioSource {
    /// `http://` and `https://` are URLs, anything else is a path. Blank is no track.
    pub fn parse(track: &str) -> Option<Self> {
        let track = track.trim();
        if track.is_empty() {
            None
        } else if track.starts_with("http://") || track.starts_with("https://") {
            Some(AudioSource::Url(track.to_string()))
        } else {
            Some(AudioSource::File(PathBuf::from(track)))
        }
    }

    /// Read the whole encoded track.
    pub fn fetch(&self, timeout: Duration) -> Result<Vec<u8>, AudioError> {
        match self {
            AudioSource::File(path) => Ok(std::fs::read(path)?),
            AudioSource::Url(url) => {
                let http = reqwest::blocking::Client::builder().timeout(timeout).build()?;
                let resp = http.get(url).send()?;
                if !resp.status().is_success() {
                    return Err(AudioError::Status(resp.status().as_u16()));
                }
                Ok(resp.bytes()?.to_vec())
            }
        }
    }
}

impl std::fmt::Display for AudioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioSource::File(path) => write!(f, "{}", path.display()),
            AudioSource::Url(url) => f.write_str(url),
        }
    }
}

/// Audio settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Looping ambient track, a path or an http(s) URL. Also read from
    /// `COSMOS_AUDIO`. Empty disables the soundtrack.
    pub track: String,
    pub volume: f32,
    pub muted: bool,
    pub timeout_secs: u64,
}

impl AudioConfig {
    pub fn source(&self) -> Option<AudioSource> {
        AudioSource::parse(&self.track)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            track: AMBIENT_TRACK_URL.to_string(),
            volume: 0.4,
            muted: false,
            timeout_secs: 60,
        }
    }
}

/// Volume, mute and gesture-unlock state in front of an [`AudioOutput`].
pub struct AmbientAudio {
    output: Box<dyn AudioOutput>,
    pending: Option<Receiver<Result<Vec<u8>, AudioError>>>,
    volume: f32,
    muted: bool,
    unlocked: bool,
}

impl AmbientAudio {
    pub fn new(output: Box<dyn AudioOutput>, volume: f32, muted: bool) -> Self {
        let mut audio = Self {
            output,
            pending: None,
            volume: volume.clamp(0.0, 1.0),
            muted,
            unlocked: false,
        };
        audio.apply();
        audio
    }

    pub fn silent() -> Self {
        Self::new(Box::new(SilentOutput), 0.4, false)
    }

    /// Start fetching the configured track. Silent until [`poll`](Self::poll)
    /// installs it.
    pub fn from_config(config: &AudioConfig) -> Self {
        let mut audio = Self::new(Box::new(SilentOutput), config.volume, config.muted);
        match config.source() {
            Some(source) if cfg!(feature = "audio") => {
                audio.pending = Some(spawn_fetch(source, Duration::from_secs(config.timeout_secs)));
            }
            Some(source) => log::info!("Built without the `audio` feature; ignoring {}", source),
            None => log::info!("No ambient track configured"),
        }
        audio
    }

    /// Install the track once its bytes have arrived. Call once per frame.
    pub fn poll(&mut self) {
        let Some(rx) = &self.pending else {
            return;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err(AudioError::Playback("track loader exited".to_string())),
        };
        self.pending = None;

        match result.and_then(open_output) {
            Ok(output) => self.install(output),
            Err(e) => log::warn!("Ambient audio disabled: {}", e),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Swap in a ready output, catching it up with volume and unlock state.
    fn install(&mut self, output: Box<dyn AudioOutput>) {
        self.output = output;
        self.apply();
        if self.unlocked {
            self.output.play();
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Volume actually sent to the output.
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.apply();
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
        self.apply();
    }

    /// First click or scroll starts playback.
    pub fn on_user_gesture(&mut self) {
        if self.unlocked {
            return;
        }
        self.unlocked = true;
        self.output.play();
        log::debug!("Ambient audio unlocked");
    }

    fn apply(&mut self) {
        let volume = self.effective_volume();
        self.output.set_volume(volume);
    }
}

impl Drop for AmbientAudio {
    fn drop(&mut self) {
        self.output.pause();
    }
}

fn spawn_fetch(source: AudioSource, timeout: Duration) -> Receiver<Result<Vec<u8>, AudioError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        log::info!("Fetching ambient track {}", source);
        let _ = tx.send(source.fetch(timeout));
    });
    rx
}

#[cfg(feature = "audio")]
fn open_output(bytes: Vec<u8>) -> Result<Box<dyn AudioOutput>, AudioError> {
    Ok(Box::new(rodio_output::RodioOutput::from_bytes(bytes)?))
}

#[cfg(not(feature = "audio"))]
fn open_output(_bytes: Vec<u8>) -> Result<Box<dyn AudioOutput>, AudioError> {
    Ok(Box::new(SilentOutput))
}

#[cfg(feature = "audio")]
mod rodio_output {
    use std::io::Cursor;

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

    use super::AudioOutput;
    use crate::error::AudioError;

    fn playback(e: impl std::fmt::Display) -> AudioError {
        AudioError::Playback(e.to_string())
    }

    pub struct RodioOutput {
        sink: Sink,
        // Dropping the stream stops playback.
        _stream: OutputStream,
        _handle: OutputStreamHandle,
    }

    impl RodioOutput {
        pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, AudioError> {
            let (stream, handle) = OutputStream::try_default().map_err(playback)?;
            let sink = Sink::try_new(&handle).map_err(playback)?;
            let source = Decoder::new(Cursor::new(bytes)).map_err(playback)?;
            sink.pause();
            sink.append(source.repeat_infinite());
            log::info!("Ambient track ready");
            Ok(Self {
                sink,
                _stream: stream,
                _handle: handle,
            })
        }
    }

    impl AudioOutput for RodioOutput {
        fn play(&mut self) {
            self.sink.play();
        }

        fn pause(&mut self) {
            self.sink.pause();
        }

        fn set_volume(&mut self, volume: f32) {
            self.sink.set_volume(volume);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Log {
        plays: u32,
        pauses: u32,
        volume: f32,
    }

    struct Recorder(Arc<Mutex<Log>>);

    impl AudioOutput for Recorder {
        fn play(&mut self) {
            self.0.lock().unwrap().plays += 1;
        }
        fn pause(&mut self) {
            self.0.lock().unwrap().pauses += 1;
        }
        fn set_volume(&mut self, volume: f32) {
            self.0.lock().unwrap().volume = volume;
        }
    }

    fn recorded() -> (AmbientAudio, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        (AmbientAudio::new(Box::new(Recorder(log.clone())), 0.4, false), log)
    }

    #[test]
    fn test_default_volume_applied() {
        let (audio, log) = recorded();
        assert_eq!(audio.volume(), 0.4);
        assert_eq!(log.lock().unwrap().volume, 0.4);
    }

    #[test]
    fn test_first_gesture_unlocks_once() {
        let (mut audio, log) = recorded();
        assert!(!audio.is_unlocked());
        audio.on_user_gesture();
        audio.on_user_gesture();
        assert!(audio.is_unlocked());
        assert_eq!(log.lock().unwrap().plays, 1);
        drop(audio);
        assert_eq!(log.lock().unwrap().pauses, 1);
    }

    #[test]
    fn test_mute_keeps_volume() {
        let (mut audio, log) = recorded();
        audio.set_volume(0.7);
        audio.toggle_mute();
        assert_eq!(audio.effective_volume(), 0.0);
        assert_eq!(log.lock().unwrap().volume, 0.0);
        assert_eq!(audio.volume(), 0.7);
        audio.toggle_mute();
        assert_eq!(log.lock().unwrap().volume, 0.7);
    }

    #[test]
    fn test_default_config_streams_ambient_track() {
        let config = AudioConfig::default();
        assert_eq!(config.source(), Some(AudioSource::Url(AMBIENT_TRACK_URL.to_string())));
    }

    #[test]
    fn test_track_parsing() {
        assert_eq!(AudioSource::parse("space.ogg"), Some(AudioSource::File("space.ogg".into())));
        assert_eq!(
            AudioSource::parse(" http://host/a.wav "),
            Some(AudioSource::Url("http://host/a.wav".to_string()))
        );
        assert_eq!(AudioSource::parse("  "), None);
    }

    #[test]
    fn test_local_track_is_fetched() {
        let path = std::env::temp_dir().join(format!("cosmos-track-{}.bin", std::process::id()));
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let bytes = AudioSource::File(path.clone()).fetch(Duration::from_secs(1)).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        std::fs::remove_file(&path).unwrap();

        let missing = AudioSource::File(path).fetch(Duration::from_secs(1));
        assert!(matches!(missing, Err(AudioError::Io(_))));
    }

    #[test]
    fn test_late_track_catches_up() {
        let mut audio = AmbientAudio::silent();
        audio.set_volume(0.6);
        audio.on_user_gesture();

        let log = Arc::new(Mutex::new(Log::default()));
        audio.install(Box::new(Recorder(log.clone())));
        assert_eq!(log.lock().unwrap().plays, 1);
        assert_eq!(log.lock().unwrap().volume, 0.6);
    }

    #[test]
    fn test_failed_fetch_stays_silent() {
        let (tx, rx) = mpsc::channel();
        let mut audio = AmbientAudio::silent();
        audio.pending = Some(rx);
        audio.poll();
        assert!(audio.is_loading());

        tx.send(Err(AudioError::Status(404))).unwrap();
        audio.poll();
        assert!(!audio.is_loading());
    }

    #[test]
    fn test_volume_clamped() {
        let (mut audio, _) = recorded();
        audio.set_volume(3.0);
        assert_eq!(audio.volume(), 1.0);
        audio.set_volume(-1.0);
        assert_eq!(audio.volume(), 0.0);
    }
}
