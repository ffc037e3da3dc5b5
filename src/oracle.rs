//! The oracle: free-text questions answered by a generative language model.
//!
//! [`ask_the_cosmos`] is the only entry point the UI needs and it never
//! fails; every upstream problem becomes [`ORACLE_FALLBACK`]. [`OracleDesk`]
//! owns the single in-flight request and runs it on a worker thread so the
//! frame loop keeps rendering while the answer is on its way.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OracleError;

/// Answer shown whenever the backend cannot produce one.
pub const ORACLE_FALLBACK: &str = "The stars are currently silent. The connection to the infinite is flickering. Please try querying another node.";

/// A question together with the theme it is asked under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OraclePrompt {
    pub question: String,
    pub theme: String,
}

impl OraclePrompt {
    pub fn new(question: impl Into<String>, theme: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            theme: theme.into(),
        }
    }

    /// User turn sent to the model.
    pub fn user_text(&self) -> String {
        format!(
            "User Question: {}\n\nContext: You are an entity with infinite wisdom regarding {}.",
            self.question, self.theme
        )
    }

    /// System instruction constraining tone, topic and length.
    pub fn system_text(&self) -> String {
        format!(
            "You are the manifestation of Cosmic Intelligence. Provide a profound, scientifically \
             grounded yet philosophically deep response. Focus strictly on the theme of {}. Keep \
             your response between 40 and 65 words. Do not use flowery introductions or \
             conclusions. Just the wisdom.",
            self.theme
        )
    }
}

/// Backend that turns a prompt into text.
pub trait TextGenerator {
    fn generate(&self, prompt: &OraclePrompt) -> Result<String, OracleError>;
}

/// Ask a question; always returns displayable text.
pub fn ask_the_cosmos<G: TextGenerator + ?Sized>(generator: &G, question: &str, theme: &str) -> String {
    match generator.generate(&OraclePrompt::new(question, theme)) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            log::warn!("Cosmic connection error: {}", OracleError::EmptyResponse);
            ORACLE_FALLBACK.to_string()
        }
        Err(e) => {
            log::warn!("Cosmic connection error: {}", e);
            ORACLE_FALLBACK.to_string()
        }
    }
}

/// Oracle backend settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub endpoint: String,
    pub model: String,
    /// Read from `GEMINI_API_KEY` when not set in the config file.
    pub api_key: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key: None,
            temperature: 0.8,
            top_p: 0.95,
            timeout_secs: 30,
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Gemini `generateContent` over HTTPS.
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    config: OracleConfig,
}

impl GeminiClient {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &OraclePrompt) -> Result<String, OracleError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(OracleError::MissingApiKey)?;

        let user = prompt.user_text();
        let system = prompt.system_text();
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: &user }],
            }],
            system_instruction: Content {
                parts: vec![Part { text: &system }],
            },
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
            },
        };

        let resp = self
            .http
            .post(self.url())
            .header("x-goog-api-key", key)
            .json(&body)
            .send()?;

        if !resp.status().is_success() {
            return Err(OracleError::Status(resp.status().as_u16()));
        }

        let parsed: GenerateResponse = resp.json()?;
        parsed.text().ok_or(OracleError::EmptyResponse)
    }
}

/// Generator used without an API key, or when no HTTP client could be
/// built. Every answer falls back.
pub struct OfflineOracle;

impl TextGenerator for OfflineOracle {
    fn generate(&self, _prompt: &OraclePrompt) -> Result<String, OracleError> {
        Err(OracleError::MissingApiKey)
    }
}

/// Pick the generator for `config`: Gemini when a key is set, offline otherwise.
pub fn connect(config: &OracleConfig) -> Arc<dyn TextGenerator + Send + Sync> {
    if config.api_key.as_deref().map_or(true, str::is_empty) {
        log::warn!("No {} set; the oracle is offline", crate::config::API_KEY_ENV);
        return Arc::new(OfflineOracle);
    }
    match GeminiClient::new(config.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            log::warn!("Oracle offline: {}", e);
            Arc::new(OfflineOracle)
        }
    }
}

/// Why a submission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The question is blank.
    EmptyQuestion,
    /// A previous question is still being answered.
    Busy,
}

/// A finished oracle exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleAnswer {
    pub question: String,
    pub answer: String,
}

/// Owns at most one in-flight oracle request.
pub struct OracleDesk {
    generator: Arc<dyn TextGenerator + Send + Sync>,
    pending: Option<Receiver<OracleAnswer>>,
}

impl OracleDesk {
    pub fn new(generator: Arc<dyn TextGenerator + Send + Sync>) -> Self {
        Self {
            generator,
            pending: None,
        }
    }

    pub fn is_asking(&self) -> bool {
        self.pending.is_some()
    }

    /// Start answering `question` under `theme`.
    pub fn submit(&mut self, question: &str, theme: &str) -> Result<(), SubmitError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SubmitError::EmptyQuestion);
        }
        if self.is_asking() {
            return Err(SubmitError::Busy);
        }

        let (tx, rx) = mpsc::channel();
        let generator = Arc::clone(&self.generator);
        let question = question.to_string();
        let theme = theme.to_string();
        log::info!("Asking the oracle about {}", theme);
        thread::spawn(move || {
            let answer = ask_the_cosmos(generator.as_ref(), &question, &theme);
            let _ = tx.send(OracleAnswer { question, answer });
        });
        self.pending = Some(rx);
        Ok(())
    }

    /// Collect a finished answer. Clears the in-flight flag when it returns `Some`.
    pub fn poll(&mut self) -> Option<OracleAnswer> {
        let rx = self.pending.as_ref()?;
        match rx.try_recv() {
            Ok(answer) => {
                self.pending = None;
                Some(answer)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                Some(OracleAnswer {
                    question: String::new(),
                    answer: ORACLE_FALLBACK.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Condvar, Mutex};
    use std::time::Instant;

    struct Failing;

    impl TextGenerator for Failing {
        fn generate(&self, _: &OraclePrompt) -> Result<String, OracleError> {
            Err(OracleError::Status(503))
        }
    }

    #[test]
    fn test_offline_oracle_falls_back() {
        assert_eq!(ask_the_cosmos(&OfflineOracle, "why?", "Alien Life"), ORACLE_FALLBACK);
    }

    #[test]
    fn test_connect_without_key_stays_offline() {
        let prompt = OraclePrompt::new("why?", "Alien Life");
        let offline = connect(&OracleConfig::default());
        assert!(matches!(offline.generate(&prompt), Err(OracleError::MissingApiKey)));

        // With a key, requests go out (and fail against a closed port).
        let config = OracleConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: Some("key".to_string()),
            timeout_secs: 2,
            ..OracleConfig::default()
        };
        let online = connect(&config);
        assert!(matches!(online.generate(&prompt), Err(OracleError::Http(_))));
    }

    struct Echo;

    impl TextGenerator for Echo {
        fn generate(&self, prompt: &OraclePrompt) -> Result<String, OracleError> {
            Ok(format!("{} / {}", prompt.theme, prompt.question))
        }
    }

    /// Blocks until released, to keep a request in flight.
    struct Gate {
        open: Mutex<bool>,
        cv: Condvar,
    }

    impl Gate {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                open: Mutex::new(false),
                cv: Condvar::new(),
            })
        }

        fn release(&self) {
            *self.open.lock().unwrap() = true;
            self.cv.notify_all();
        }
    }

    impl TextGenerator for Gate {
        fn generate(&self, _: &OraclePrompt) -> Result<String, OracleError> {
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.cv.wait(open).unwrap();
            }
            Ok("released".into())
        }
    }

    fn wait_for(desk: &mut OracleDesk) -> OracleAnswer {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(answer) = desk.poll() {
                return answer;
            }
            assert!(Instant::now() < deadline, "oracle timed out");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_failure_yields_fallback() {
        assert_eq!(ask_the_cosmos(&Failing, "why?", "Alien Life"), ORACLE_FALLBACK);
    }

    #[test]
    fn test_blank_response_yields_fallback() {
        struct Blank;
        impl TextGenerator for Blank {
            fn generate(&self, _: &OraclePrompt) -> Result<String, OracleError> {
                Ok("  \n".into())
            }
        }
        assert_eq!(ask_the_cosmos(&Blank, "why?", "Alien Life"), ORACLE_FALLBACK);
    }

    #[test]
    fn test_prompt_mentions_theme_and_question() {
        let prompt = OraclePrompt::new("Are we alone?", "Alien Life");
        assert!(prompt.user_text().starts_with("User Question: Are we alone?"));
        assert!(prompt.user_text().ends_with("regarding Alien Life."));
        assert!(prompt.system_text().contains("between 40 and 65 words"));
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let client = GeminiClient::new(OracleConfig::default()).unwrap();
        let err = client.generate(&OraclePrompt::new("q", "t")).unwrap_err();
        assert!(matches!(err, OracleError::MissingApiKey));
    }

    #[test]
    fn test_response_text_extraction() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Light "},{"text":"bends."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Light bends."));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.text().is_none());
    }

    #[test]
    fn test_desk_rejects_blank_and_busy() {
        let gate = Gate::new();
        let mut desk = OracleDesk::new(gate.clone());
        assert_eq!(desk.submit("   ", "Mars"), Err(SubmitError::EmptyQuestion));
        assert!(!desk.is_asking());

        desk.submit("first", "Mars").unwrap();
        assert!(desk.is_asking());
        assert_eq!(desk.submit("second", "Mars"), Err(SubmitError::Busy));

        gate.release();
        let answer = wait_for(&mut desk);
        assert_eq!(answer.question, "first");
        assert_eq!(answer.answer, "released");
        assert!(!desk.is_asking());
    }

    #[test]
    fn test_desk_failure_clears_flag() {
        let mut desk = OracleDesk::new(Arc::new(Failing));
        desk.submit("hello", "Neural Links").unwrap();
        let answer = wait_for(&mut desk);
        assert_eq!(answer.answer, ORACLE_FALLBACK);
        assert!(!desk.is_asking());

        let mut echo = OracleDesk::new(Arc::new(Echo));
        echo.submit("  trimmed  ", "Megastructures").unwrap();
        assert_eq!(wait_for(&mut echo).answer, "Megastructures / trimmed");
    }
}
