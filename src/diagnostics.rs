use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::registry::RuleSource;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Diagnostic {
    UnreadableFile { path: PathBuf, message: String },
    RuleOverride {
        pattern: String,
        winner: RuleSource,
        loser: RuleSource,
    },
    UnknownIcon {
        candidate: String,
        collection: String,
        icon: String,
    },
    CollectionLoad { collection: String, message: String },
    ConflictingVariants {
        candidate: String,
        variants: Vec<String>,
    },
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnreadableFile { .. } => "unreadable-file",
            Self::RuleOverride { .. } => "rule-override",
            Self::UnknownIcon { .. } => "unknown-icon",
            Self::CollectionLoad { .. } => "collection-load",
            Self::ConflictingVariants { .. } => "conflicting-variants",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreadableFile { path, message } => {
                write!(f, "skipped unreadable file {}: {}", path.display(), message)
            }
            Self::RuleOverride {
                pattern,
                winner,
                loser,
            } => write!(
                f,
                "rule '{}' from {} overridden by {}",
                pattern, loser, winner
            ),
            Self::UnknownIcon {
                candidate,
                collection,
                icon,
            } => write!(
                f,
                "unknown icon '{}' in collection '{}' (from '{}')",
                icon, collection, candidate
            ),
            Self::CollectionLoad {
                collection,
                message,
            } => write!(f, "icon collection '{}' unavailable: {}", collection, message),
            Self::ConflictingVariants {
                candidate,
                variants,
            } => write!(
                f,
                "conflicting variants [{}] in '{}'",
                variants.join(", "),
                candidate
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct DiagnosticSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::RuleOverride { .. } => {
                tracing::debug!(kind = diagnostic.kind(), "{}", diagnostic)
            }
            _ => tracing::warn!(kind = diagnostic.kind(), "{}", diagnostic),
        }
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        match self.events.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_sorted(self) -> Vec<Diagnostic> {
        let mut events = match self.events.into_inner() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.sort();
        events
    }
}
