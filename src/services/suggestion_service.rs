//! Debounced value suggestions for free-text condition inputs
//!
//! Every scheduled fetch carries a generation number and its own cancellation
//! token. Scheduling again cancels the previous fetch, and updates whose
//! generation is no longer current are dropped on both sides of the channel,
//! so a slow response can never overwrite a newer one.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::ServiceError;

/// One suggested value; hosts may answer with bare strings or full items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSuggestion")]
pub struct Suggestion {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSuggestion {
    Plain(String),
    Item {
        value: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        icon: Option<String>,
    },
}

impl From<RawSuggestion> for Suggestion {
    fn from(raw: RawSuggestion) -> Self {
        match raw {
            RawSuggestion::Plain(value) => Suggestion::plain(value),
            RawSuggestion::Item {
                value,
                label,
                color,
                icon,
            } => Suggestion {
                label: label.unwrap_or_else(|| value.clone()),
                value,
                color,
                icon,
            },
        }
    }
}

impl Suggestion {
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
            color: None,
            icon: None,
        }
    }
}

/// Asynchronous provider of suggestions for `(field, search)`
pub trait SuggestionSource: Send + Sync {
    fn fetch(&self, field: &str, search: &str) -> BoxFuture<'static, Result<Vec<Suggestion>, ServiceError>>;
}

impl<F, Fut> SuggestionSource for F
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Suggestion>, ServiceError>> + Send + 'static,
{
    fn fetch(&self, field: &str, search: &str) -> BoxFuture<'static, Result<Vec<Suggestion>, ServiceError>> {
        Box::pin(self(field.to_string(), search.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionSettings {
    pub debounce: Duration,
    pub limit: usize,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            limit: 10,
        }
    }
}

/// Statics first, then dynamic results; first occurrence of a value wins;
/// only entries containing `search` (case-insensitive) survive; at most `limit`.
pub fn merge_suggestions(
    statics: &[String],
    dynamic: Vec<Suggestion>,
    search: &str,
    limit: usize,
) -> Vec<Suggestion> {
    let needle = search.trim().to_lowercase();
    let mut seen = HashSet::new();
    statics
        .iter()
        .map(Suggestion::plain)
        .chain(dynamic)
        .filter(|s| {
            needle.is_empty()
                || s.value.to_lowercase().contains(&needle)
                || s.label.to_lowercase().contains(&needle)
        })
        .filter(|s| seen.insert(s.value.clone()))
        .take(limit)
        .collect()
}

#[derive(Debug)]
struct SuggestionUpdate {
    generation: u64,
    items: Vec<Suggestion>,
}

/// Per-row suggestion fetcher
pub struct SuggestionService {
    source: Option<Arc<dyn SuggestionSource>>,
    settings: SuggestionSettings,
    generation: u64,
    cancel: Option<CancellationToken>,
    tx: UnboundedSender<SuggestionUpdate>,
    rx: UnboundedReceiver<SuggestionUpdate>,
}

impl std::fmt::Debug for SuggestionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionService")
            .field("has_source", &self.source.is_some())
            .field("settings", &self.settings)
            .field("generation", &self.generation)
            .finish()
    }
}

impl SuggestionService {
    pub fn new(source: Option<Arc<dyn SuggestionSource>>, settings: SuggestionSettings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            settings,
            generation: 0,
            cancel: None,
            tx,
            rx,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel any pending fetch and schedule a new one after the debounce delay
    ///
    /// Without a source (or outside a tokio runtime) the static suggestions are
    /// delivered right away.
    pub fn schedule(&mut self, field: &str, search: &str, statics: &[String]) -> u64 {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let limit = self.settings.limit;

        let Some(source) = self.source.clone() else {
            self.deliver(generation, merge_suggestions(statics, Vec::new(), search, limit));
            return generation;
        };
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("No async runtime for suggestion fetch: {}", e);
                self.deliver(generation, merge_suggestions(statics, Vec::new(), search, limit));
                return generation;
            }
        };

        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        let tx = self.tx.clone();
        let debounce = self.settings.debounce;
        let field = field.to_string();
        let search = search.to_string();
        let statics = statics.to_vec();

        handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }
            let dynamic = tokio::select! {
                _ = token.cancelled() => return,
                result = source.fetch(&field, &search) => match result {
                    Ok(items) => items,
                    Err(e) => {
                        warn!("Suggestion fetch for '{}' failed: {}", field, e);
                        Vec::new()
                    }
                },
            };
            if token.is_cancelled() {
                debug!("Dropping suggestions of cancelled generation {}", generation);
                return;
            }
            let items = merge_suggestions(&statics, dynamic, &search, limit);
            if tx.send(SuggestionUpdate { generation, items }).is_err() {
                debug!("Suggestion receiver dropped before generation {} arrived", generation);
            }
        });
        generation
    }

    fn deliver(&self, generation: u64, items: Vec<Suggestion>) {
        // the receiver lives in self, so this cannot fail
        let _ = self.tx.send(SuggestionUpdate { generation, items });
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }

    /// Latest current-generation result received so far, if any
    pub fn try_latest(&mut self) -> Option<Vec<Suggestion>> {
        let mut latest = None;
        while let Ok(update) = self.rx.try_recv() {
            if update.generation == self.generation {
                latest = Some(update.items);
            } else {
                debug!(
                    "Discarding stale suggestions (generation {} < {})",
                    update.generation, self.generation
                );
            }
        }
        latest
    }

    /// Wait for the result of the current generation
    pub async fn next_update(&mut self) -> Option<Vec<Suggestion>> {
        while let Some(update) = self.rx.recv().await {
            if update.generation == self.generation {
                return Some(update.items);
            }
        }
        None
    }
}

impl Drop for SuggestionService {
    fn drop(&mut self) {
        self.cancel();
    }
}
