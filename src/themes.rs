//! Theme data: the question/answer lists hung around each galaxy.
//!
//! A [`ThemeSource`] returns the ordered node list of one galaxy. The
//! built-in catalog ships with the binary; a JSON file in the same shape can
//! replace it (see [`StaticThemes::from_path`]).
//!
//! ```json
//! { "1": [ { "question": "...", "answer": "..." }, ... ], "2": [ ... ] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use crate::error::{ConfigError, ThemeError};
use crate::galaxy::GalaxyId;
use crate::nodes::NodeContent;

const BUILTIN_THEMES: &str = include_str!("data/themes.json");

/// Provider of per-galaxy node content.
pub trait ThemeSource {
    /// Ordered node list for `galaxy`. Order is stable across calls.
    fn theme_nodes(&self, galaxy: GalaxyId) -> Result<Vec<NodeContent>, ThemeError>;
}

/// Theme lists held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticThemes {
    entries: BTreeMap<u32, Vec<NodeContent>>,
}

impl StaticThemes {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Self {
        match Self::from_json(BUILTIN_THEMES) {
            Ok(themes) => themes,
            Err(e) => {
                log::error!("Built-in theme catalog is malformed: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            entries: serde_json::from_str(json)?,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }

    /// Number of galaxies with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ThemeSource for StaticThemes {
    fn theme_nodes(&self, galaxy: GalaxyId) -> Result<Vec<NodeContent>, ThemeError> {
        self.entries
            .get(&galaxy.get())
            .cloned()
            .ok_or(ThemeError::Unknown(galaxy))
    }
}

/// Loaded node lists, one entry per galaxy that delivered data.
pub type ThemeSet = Vec<(GalaxyId, Vec<NodeContent>)>;

/// Load every galaxy's theme in id order.
///
/// `on_progress` receives the completed fraction after each galaxy. A galaxy
/// whose source fails is logged and left out; its core stays focusable but
/// carries no nodes.
pub fn load_all<S, F>(source: &S, mut on_progress: F) -> ThemeSet
where
    S: ThemeSource + ?Sized,
    F: FnMut(f32),
{
    let total = GalaxyId::all().count() as f32;
    let mut loaded = Vec::new();
    for (i, galaxy) in GalaxyId::all().enumerate() {
        match source.theme_nodes(galaxy) {
            Ok(nodes) => loaded.push((galaxy, nodes)),
            Err(e) => log::warn!("Skipping nodes for galaxy {}: {}", galaxy, e),
        }
        on_progress((i + 1) as f32 / total);
    }
    loaded
}

/// Progress of a background [`ThemeLoader`].
#[derive(Debug)]
pub enum LoadStatus {
    Loading(f32),
    Done(ThemeSet),
}

enum LoadMessage {
    Progress(f32),
    Done(ThemeSet),
}

/// Runs [`load_all`] on a worker thread so the window can show progress.
pub struct ThemeLoader {
    rx: Receiver<LoadMessage>,
    progress: f32,
}

impl ThemeLoader {
    pub fn spawn(source: Arc<dyn ThemeSource + Send + Sync>) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let progress_tx = tx.clone();
            let set = load_all(source.as_ref(), |p| {
                let _ = progress_tx.send(LoadMessage::Progress(p));
            });
            let _ = tx.send(LoadMessage::Done(set));
        });
        Self { rx, progress: 0.0 }
    }

    /// Drain pending messages. Returns `Done` exactly once.
    pub fn poll(&mut self) -> LoadStatus {
        loop {
            match self.rx.try_recv() {
                Ok(LoadMessage::Progress(p)) => self.progress = p,
                Ok(LoadMessage::Done(set)) => return LoadStatus::Done(set),
                Err(TryRecvError::Empty) => return LoadStatus::Loading(self.progress),
                Err(TryRecvError::Disconnected) => {
                    log::warn!("Theme loader exited without results");
                    return LoadStatus::Done(Vec::new());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    struct Flaky;

    impl ThemeSource for Flaky {
        fn theme_nodes(&self, galaxy: GalaxyId) -> Result<Vec<NodeContent>, ThemeError> {
            if galaxy.get() == 4 {
                Err(ThemeError::Unavailable {
                    galaxy,
                    reason: "timeout".into(),
                })
            } else {
                Ok(vec![NodeContent::new("q", "a")])
            }
        }
    }

    #[test]
    fn test_builtin_catalog_complete() {
        let themes = StaticThemes::builtin();
        assert_eq!(themes.len(), 10);
        for galaxy in GalaxyId::all() {
            let nodes = themes.theme_nodes(galaxy).unwrap();
            assert_eq!(nodes.len(), 12, "galaxy {}", galaxy);
            assert!(nodes.iter().all(|n| !n.question.is_empty() && !n.answer.is_empty()));
        }
    }

    #[test]
    fn test_first_question_and_stable_order() {
        let themes = StaticThemes::builtin();
        let g1 = GalaxyId::new(1).unwrap();
        let first = themes.theme_nodes(g1).unwrap();
        assert_eq!(first[0].question, "How did the universe begin?");
        assert_eq!(first, themes.theme_nodes(g1).unwrap());

        let last = themes.theme_nodes(GalaxyId::new(10).unwrap()).unwrap();
        assert_eq!(last[11].question, "Can life survive the end?");
    }

    #[test]
    fn test_unknown_galaxy() {
        let themes = StaticThemes::from_json(r#"{"2": []}"#).unwrap();
        let g1 = GalaxyId::new(1).unwrap();
        assert_eq!(themes.theme_nodes(g1), Err(ThemeError::Unknown(g1)));
        assert!(themes.theme_nodes(GalaxyId::new(2).unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_load_all_skips_failures_and_reports_progress() {
        let mut progress = Vec::new();
        let set = load_all(&Flaky, |p| progress.push(p));
        assert_eq!(set.len(), 9);
        assert!(set.iter().all(|(g, _)| g.get() != 4));
        assert_eq!(progress.len(), 10);
        assert!((progress[0] - 0.1).abs() < 1e-6);
        assert_eq!(progress[9], 1.0);
    }

    #[test]
    fn test_loader_finishes() {
        let mut loader = ThemeLoader::spawn(Arc::new(StaticThemes::builtin()));
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match loader.poll() {
                LoadStatus::Done(set) => {
                    assert_eq!(set.len(), 10);
                    break;
                }
                LoadStatus::Loading(p) => {
                    assert!((0.0..=1.0).contains(&p));
                    assert!(Instant::now() < deadline, "loader timed out");
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        }
    }
}
