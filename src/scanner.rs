use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::candidate::is_plausible;
use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{ConfigError, PipelineError};
use crate::pipeline::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Inline { name: PathBuf, content: String },
}

impl Source {
    pub fn path(&self) -> &Path {
        match self {
            Self::File(path) => path,
            Self::Inline { name, .. } => name,
        }
    }

    fn read(&self) -> io::Result<Cow<'_, str>> {
        match self {
            Self::File(path) => {
                let bytes = fs::read(path)?;
                String::from_utf8(bytes)
                    .map(Cow::Owned)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
            }
            Self::Inline { content, .. } => Ok(Cow::Borrowed(content)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanResult {
    pub candidates: BTreeSet<String>,
    pub files_scanned: usize,
    pub files_skipped: usize,
}

impl ScanResult {
    fn merge(mut self, other: ScanResult) -> ScanResult {
        if self.candidates.len() < other.candidates.len() {
            return other.merge(self);
        }
        self.candidates.extend(other.candidates);
        self.files_scanned += other.files_scanned;
        self.files_skipped += other.files_skipped;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    text: &'a str,
    idx: usize,
}

pub fn tokens(text: &str) -> Tokens<'_> {
    Tokens { text, idx: 0 }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            let start = self.skip_delimiters()?;
            let mut bracket_depth = 0usize;
            while let Some((ch, size)) = next_char(self.text, self.idx) {
                if ch.is_whitespace() {
                    break;
                }
                if bracket_depth > 0 {
                    match ch {
                        '[' => bracket_depth += 1,
                        ']' => bracket_depth -= 1,
                        _ => {}
                    }
                } else if ch == '[' {
                    if !opens_bracket(self.text, self.idx, self.idx == start) {
                        break;
                    }
                    bracket_depth = 1;
                } else if !is_token_char(ch) {
                    break;
                }
                self.idx += size;
            }

            let token = self.text[start..self.idx].trim_end_matches(['.', ':']);
            if !token.is_empty() {
                return Some(token);
            }
        }
    }
}

impl Tokens<'_> {
    fn skip_delimiters(&mut self) -> Option<usize> {
        while let Some((ch, size)) = next_char(self.text, self.idx) {
            if is_token_char(ch) || (ch == '[' && opens_bracket(self.text, self.idx, true)) {
                return Some(self.idx);
            }
            self.idx += size;
        }
        None
    }
}

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '/' | ':' | '.' | '!')
}

/// A bare `[` opens an arbitrary variant only as `[&` or `[@`; after a token
/// character it opens an arbitrary value unless a quote or space follows, so
/// `["p-4", 'm-2']` array literals split on their quotes.
fn opens_bracket(text: &str, idx: usize, at_start: bool) -> bool {
    match next_char(text, idx + 1) {
        Some(('&' | '@', _)) => true,
        Some((ch, _)) if !at_start => {
            !ch.is_whitespace() && !matches!(ch, '"' | '\'' | '`' | ']')
        }
        _ => false,
    }
}

fn next_char(text: &str, idx: usize) -> Option<(char, usize)> {
    text[idx..].chars().next().map(|ch| (ch, ch.len_utf8()))
}

pub fn scan_sources(
    sources: &[Source],
    sink: &DiagnosticSink,
    cancel: &CancellationToken,
) -> Result<ScanResult, PipelineError> {
    sources
        .par_iter()
        .try_fold(ScanResult::default, |mut acc, source| {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            match source.read() {
                Ok(content) => {
                    acc.candidates.extend(
                        tokens(&content)
                            .filter(|token| is_plausible(token))
                            .map(str::to_string),
                    );
                    acc.files_scanned += 1;
                    tracing::debug!(path = %source.path().display(), "scanned source");
                }
                Err(err) => {
                    acc.files_skipped += 1;
                    sink.record(Diagnostic::UnreadableFile {
                        path: source.path().to_path_buf(),
                        message: err.to_string(),
                    });
                }
            }
            Ok(acc)
        })
        .try_reduce(ScanResult::default, |left, right| Ok(left.merge(right)))
}

pub fn discover_paths(config: &Config) -> Result<Vec<PathBuf>, ConfigError> {
    let globset = build_globset(&config.content)?;
    let base = &config.base_dir;

    let mut builder = WalkBuilder::new(base);
    builder
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false);

    let mut paths = BTreeSet::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping walk entry");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        if path
            .components()
            .any(|component| component.as_os_str() == "node_modules")
        {
            continue;
        }
        let relative = path.strip_prefix(base).unwrap_or(path);
        if globset.is_match(relative) || globset.is_match(path) {
            paths.insert(path.to_path_buf());
        }
    }

    tracing::debug!(files = paths.len(), "discovered content files");
    Ok(paths.into_iter().collect())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|err| ConfigError::InvalidGlob {
            pattern: pattern.clone(),
            message: err.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|err| ConfigError::InvalidGlob {
        pattern: patterns.join(", "),
        message: err.to_string(),
    })
}
