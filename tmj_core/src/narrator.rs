//! Spoken narration over an OS text-to-speech program.
//!
//! [`SpeechNarrator`] guarantees at most one utterance in flight: every new
//! utterance cancels whatever is still playing. Utterances start without
//! blocking and are waited on in short slices, so the caller can stop one
//! part way through. [`CommandEngine`] drives `espeak-ng` or macOS `say` as a
//! child process.

use crate::config::{EngineChoice, NarrationConfig};
use crate::{Error, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Default speaking rate of both engines, in words per minute
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// How often a waiting [`CommandEngine`] checks on its child
const CHILD_POLL: Duration = Duration::from_millis(10);

/// Slice used by the blocking [`Narrator::speak`]
const SPEAK_SLICE: Duration = Duration::from_millis(50);

/// Narration as seen by the session controller
pub trait Narrator {
    /// Whether `speak` can produce audio at all
    fn is_ready(&self) -> bool;

    /// Start speaking `text` and return at once
    ///
    /// Whatever is still playing is cut off first.
    fn begin(&mut self, text: &str) -> Result<()>;

    /// Wait at most `limit` for the current utterance
    ///
    /// `Ok(true)` once nothing is playing, `Ok(false)` if it is still going.
    fn wait_idle(&mut self, limit: Duration) -> Result<bool>;

    /// Cancel any in-flight utterance; a no-op when idle
    fn stop(&mut self);

    /// Speak `text`, returning once the utterance has finished
    fn speak(&mut self, text: &str) -> Result<()> {
        self.begin(text)?;
        while !self.wait_idle(SPEAK_SLICE)? {}
        Ok(())
    }
}

impl<N: Narrator + ?Sized> Narrator for Box<N> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn begin(&mut self, text: &str) -> Result<()> {
        (**self).begin(text)
    }

    fn wait_idle(&mut self, limit: Duration) -> Result<bool> {
        (**self).wait_idle(limit)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// A voice reported by a speech engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// Language tag, e.g. `en-us` or `en_US`
    pub lang: String,
    /// Value passed to the engine to select this voice
    pub identifier: String,
    pub is_default: bool,
}

/// Per-utterance speech parameters
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<Voice>,
}

impl Default for Utterance {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            volume: 0.8,
            voice: None,
        }
    }
}

/// Low-level speech capability
pub trait SpeechEngine {
    /// Voices the engine can speak with
    fn list_voices(&mut self) -> Result<Vec<Voice>>;

    /// Begin speaking without waiting for the end
    fn start(&mut self, text: &str, utterance: &Utterance) -> Result<()>;

    /// Wait at most `limit` for the utterance started last
    ///
    /// `Ok(true)` once it has finished or when nothing was started.
    fn wait_timeout(&mut self, limit: Duration) -> Result<bool>;

    /// Abort the current utterance, if any
    fn cancel(&mut self);
}

/// Pick a voice: exact configured name first, then a natural sounding voice
/// in the wanted language, then `None` for the engine default
pub fn select_voice(voices: &[Voice], locale: &str, preferred_name: Option<&str>) -> Option<Voice> {
    if let Some(name) = preferred_name {
        if let Some(voice) = voices.iter().find(|v| v.name.eq_ignore_ascii_case(name)) {
            return Some(voice.clone());
        }
        tracing::warn!("Configured voice {:?} not found, picking automatically", name);
    }

    let locale = locale.to_lowercase();
    voices
        .iter()
        .find(|v| {
            v.lang.to_lowercase().starts_with(&locale)
                && (v.name.contains("Natural") || v.name.contains("Enhanced") || v.is_default)
        })
        .cloned()
}

/// Narrator backed by a [`SpeechEngine`]
///
/// An absent engine is a normal state: the narrator simply never becomes ready.
pub struct SpeechNarrator<E: SpeechEngine> {
    engine: Option<E>,
    initialized: bool,
    locale: String,
    preferred_voice: Option<String>,
    utterance: Utterance,
}

impl<E: SpeechEngine> SpeechNarrator<E> {
    pub fn new(engine: Option<E>, config: &NarrationConfig) -> Self {
        Self {
            engine,
            initialized: false,
            locale: config.locale.clone(),
            preferred_voice: config.voice.clone(),
            utterance: Utterance {
                rate: config.rate,
                pitch: config.pitch,
                volume: config.volume,
                voice: None,
            },
        }
    }

    /// Query the engine's voices and become ready
    ///
    /// Returns `false` without failing when there is no engine or the voice
    /// list cannot be read.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return true;
        }

        let Some(engine) = self.engine.as_mut() else {
            tracing::info!("No speech engine available, narration disabled");
            return false;
        };

        match engine.list_voices() {
            Ok(voices) => {
                self.utterance.voice =
                    select_voice(&voices, &self.locale, self.preferred_voice.as_deref());
                match &self.utterance.voice {
                    Some(v) => tracing::info!("Narrating with voice {} ({})", v.name, v.lang),
                    None => tracing::info!(
                        "No preferred voice among {} voices, using engine default",
                        voices.len()
                    ),
                }
                self.initialized = true;
                true
            }
            Err(e) => {
                tracing::warn!("Failed to list speech voices: {}", e);
                false
            }
        }
    }

    /// The voice chosen during initialization
    pub fn voice(&self) -> Option<&Voice> {
        self.utterance.voice.as_ref()
    }
}

impl<E: SpeechEngine> Narrator for SpeechNarrator<E> {
    fn is_ready(&self) -> bool {
        self.engine.is_some() && self.initialized
    }

    fn begin(&mut self, text: &str) -> Result<()> {
        if !self.initialized {
            return Err(Error::SpeechUnavailable);
        }
        let engine = self.engine.as_mut().ok_or(Error::SpeechUnavailable)?;

        engine.cancel();
        tracing::debug!("Speaking: {}", text);
        engine.start(text, &self.utterance)
    }

    fn wait_idle(&mut self, limit: Duration) -> Result<bool> {
        match self.engine.as_mut() {
            Some(engine) => engine.wait_timeout(limit),
            None => Ok(true),
        }
    }

    fn stop(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.cancel();
        }
    }
}

// ============================================================================
// Command-line speech engines
// ============================================================================

/// Supported speech programs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineKind {
    EspeakNg,
    Say,
}

impl EngineKind {
    fn program(&self) -> &'static str {
        match self {
            EngineKind::EspeakNg => "espeak-ng",
            EngineKind::Say => "say",
        }
    }
}

/// Speech engine that shells out to `espeak-ng` or `say`
#[derive(Debug)]
pub struct CommandEngine {
    kind: EngineKind,
    program: PathBuf,
    child: Option<Child>,
}

impl CommandEngine {
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            program: PathBuf::from(kind.program()),
            child: None,
        }
    }

    /// Find the engine the configuration asks for
    ///
    /// Returns `None` when narration is off or the program is not installed.
    pub fn detect(config: &NarrationConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let kind = match config.engine {
            EngineChoice::None => return None,
            EngineChoice::EspeakNg => EngineKind::EspeakNg,
            EngineChoice::Say => EngineKind::Say,
            EngineChoice::Auto if cfg!(target_os = "macos") => EngineKind::Say,
            EngineChoice::Auto => EngineKind::EspeakNg,
        };

        let engine = Self::new(kind);
        if engine.probe() {
            Some(engine)
        } else {
            tracing::info!("Speech program {} not found", kind.program());
            None
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    fn probe(&self) -> bool {
        let args: &[&str] = match self.kind {
            EngineKind::EspeakNg => &["--version"],
            EngineKind::Say => &["-v", "?"],
        };
        Command::new(&self.program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn speech_args(&self, text: &str, utterance: &Utterance) -> Vec<String> {
        let wpm = (BASE_WORDS_PER_MINUTE * utterance.rate).round() as u32;
        let mut args = Vec::new();
        match self.kind {
            EngineKind::EspeakNg => {
                if let Some(voice) = &utterance.voice {
                    args.push("-v".to_string());
                    args.push(voice.identifier.clone());
                }
                let pitch = (50.0 * utterance.pitch).round().clamp(0.0, 99.0) as u32;
                let amplitude = (100.0 * utterance.volume).round().clamp(0.0, 200.0) as u32;
                args.extend([
                    "-s".to_string(),
                    wpm.to_string(),
                    "-p".to_string(),
                    pitch.to_string(),
                    "-a".to_string(),
                    amplitude.to_string(),
                ]);
            }
            EngineKind::Say => {
                if let Some(voice) = &utterance.voice {
                    args.push("-v".to_string());
                    args.push(voice.identifier.clone());
                }
                args.extend(["-r".to_string(), wpm.to_string()]);
            }
        }
        args.push(text.to_string());
        args
    }
}

impl SpeechEngine for CommandEngine {
    fn list_voices(&mut self) -> Result<Vec<Voice>> {
        let args: &[&str] = match self.kind {
            EngineKind::EspeakNg => &["--voices"],
            EngineKind::Say => &["-v", "?"],
        };
        let output = Command::new(&self.program).args(args).output()?;
        if !output.status.success() {
            return Err(Error::Speech(format!(
                "{} exited with {} while listing voices",
                self.kind.program(),
                output.status
            )));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(match self.kind {
            EngineKind::EspeakNg => parse_espeak_voices(&listing),
            EngineKind::Say => parse_say_voices(&listing),
        })
    }

    fn start(&mut self, text: &str, utterance: &Utterance) -> Result<()> {
        let child = Command::new(&self.program)
            .args(self.speech_args(text, utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        self.child = Some(child);
        Ok(())
    }

    fn wait_timeout(&mut self, limit: Duration) -> Result<bool> {
        let deadline = Instant::now() + limit;
        loop {
            let Some(child) = self.child.as_mut() else {
                return Ok(true);
            };
            if let Some(status) = child.try_wait()? {
                self.child = None;
                if status.success() {
                    return Ok(true);
                }
                return Err(Error::Speech(format!(
                    "{} exited with {}",
                    self.kind.program(),
                    status
                )));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(CHILD_POLL.min(deadline - now));
        }
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            tracing::debug!("Cancelled in-flight utterance");
        }
    }
}

impl Drop for CommandEngine {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Parse `espeak-ng --voices`
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  2  en-gb           --/M      English_(Great_Britain) gmw/en           (en 2)
/// ```
///
/// espeak-ng falls back to the plain `en` voice, so that one is flagged default.
fn parse_espeak_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 5 {
                return None;
            }
            Some(Voice {
                name: cols[3].replace('_', " "),
                lang: cols[1].to_string(),
                identifier: cols[1].to_string(),
                is_default: cols[1] == "en",
            })
        })
        .collect()
}

/// Parse `say -v ?`
///
/// ```text
/// Alex                en_US    # Most people recognize me by my voice.
/// Bad News            en_US    # The light you see at the end of the tunnel...
/// ```
fn parse_say_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .filter_map(|line| {
            let head = line.split('#').next()?.trim_end();
            let (name, lang) = head.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() || !lang.contains('_') {
                return None;
            }
            Some(Voice {
                name: name.to_string(),
                lang: lang.to_string(),
                identifier: name.to_string(),
                is_default: false,
            })
        })
        .collect()
}
