use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use crate::config::{IconMode, IconOptions};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::CollectionLoadError;
use crate::registry::{Layer, Pattern, Rule, RuleSource, RuleTemplate};

const MAX_ALIAS_DEPTH: usize = 8;
const DEFAULT_ICON_SIZE: f64 = 16.0;

#[derive(Debug, Clone, PartialEq)]
pub struct IconCollection {
    pub name: String,
    width: f64,
    height: f64,
    icons: BTreeMap<String, IconData>,
    aliases: BTreeMap<String, IconAlias>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct IconData {
    body: String,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct IconAlias {
    parent: String,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct IconifyDocument {
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    icons: BTreeMap<String, IconData>,
    #[serde(default)]
    aliases: BTreeMap<String, IconAlias>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    pub body: String,
    pub width: f64,
    pub height: f64,
}

impl IconCollection {
    pub fn from_json(name: &str, json: &str) -> Result<Self, CollectionLoadError> {
        let document: IconifyDocument =
            serde_json::from_str(json).map_err(|err| CollectionLoadError::Parse {
                name: name.to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            name: name.to_string(),
            width: document.width.unwrap_or(DEFAULT_ICON_SIZE),
            height: document.height.unwrap_or(DEFAULT_ICON_SIZE),
            icons: document.icons,
            aliases: document.aliases,
        })
    }

    pub fn len(&self) -> usize {
        self.icons.len() + self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, name: &str) -> Option<Icon> {
        let mut current = name;
        let mut width = None;
        let mut height = None;

        for _ in 0..MAX_ALIAS_DEPTH {
            if let Some(icon) = self.icons.get(current) {
                return Some(Icon {
                    body: icon.body.clone(),
                    width: width.or(icon.width).unwrap_or(self.width),
                    height: height.or(icon.height).unwrap_or(self.height),
                });
            }
            let alias = self.aliases.get(current)?;
            width = width.or(alias.width);
            height = height.or(alias.height);
            current = alias.parent.as_str();
        }

        None
    }
}

/// Where collections come from. Implementations must be callable from any
/// thread; a load may be abandoned by the caller once its timeout expires.
pub trait CollectionSource: Send + Sync {
    fn load(&self, name: &str) -> Result<IconCollection, CollectionLoadError>;
}

/// Reads `<root>/<name>.json`, falling back to `<root>/<name>/icons.json`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl CollectionSource for DirectorySource {
    fn load(&self, name: &str) -> Result<IconCollection, CollectionLoadError> {
        let candidates = [
            self.root.join(format!("{}.json", name)),
            self.root.join(name).join("icons.json"),
        ];
        let Some(path) = candidates.iter().find(|path| path.is_file()) else {
            return Err(CollectionLoadError::NotFound {
                name: name.to_string(),
            });
        };
        let text = fs::read_to_string(path).map_err(|err| CollectionLoadError::Io {
            name: name.to_string(),
            message: format!("{}: {}", path.display(), err),
        })?;
        IconCollection::from_json(name, &text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    documents: BTreeMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, name: &str, json: &str) -> Self {
        self.documents.insert(name.to_string(), json.to_string());
        self
    }
}

impl CollectionSource for StaticSource {
    fn load(&self, name: &str) -> Result<IconCollection, CollectionLoadError> {
        let json = self
            .documents
            .get(name)
            .ok_or_else(|| CollectionLoadError::NotFound {
                name: name.to_string(),
            })?;
        IconCollection::from_json(name, json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconClaim {
    NotIcon,
    Resolved(Arc<Rule>),
    Unresolved,
}

type CollectionSlot = Arc<OnceLock<Option<Arc<IconCollection>>>>;

pub struct IconRuleGenerator {
    prefix: String,
    collections: BTreeSet<String>,
    mode: IconMode,
    scale: f32,
    timeout: Duration,
    source: Arc<dyn CollectionSource>,
    cache: Mutex<HashMap<String, CollectionSlot>>,
    loads_started: AtomicUsize,
}

impl IconRuleGenerator {
    pub fn new(options: &IconOptions, source: Arc<dyn CollectionSource>) -> Self {
        Self {
            prefix: options.prefix.clone(),
            collections: options.collections.iter().cloned().collect(),
            mode: options.mode,
            scale: options.scale,
            timeout: Duration::from_millis(options.load_timeout_ms),
            source,
            cache: Mutex::new(HashMap::new()),
            loads_started: AtomicUsize::new(0),
        }
    }

    pub fn loads_started(&self) -> usize {
        self.loads_started.load(Ordering::SeqCst)
    }

    pub fn claim(&self, base: &str, sink: &DiagnosticSink) -> IconClaim {
        let Some(rest) = base
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
        else {
            return IconClaim::NotIcon;
        };
        let Some((collection_name, icon_part)) = self.split_collection(rest) else {
            return IconClaim::NotIcon;
        };
        let Some((icon_name, size_override)) = split_size_suffix(icon_part) else {
            return IconClaim::NotIcon;
        };

        let Some(collection) = self.collection(collection_name, sink) else {
            return IconClaim::Unresolved;
        };
        let Some(icon) = collection.get(icon_name) else {
            sink.record(Diagnostic::UnknownIcon {
                candidate: base.to_string(),
                collection: collection_name.to_string(),
                icon: icon_name.to_string(),
            });
            return IconClaim::Unresolved;
        };

        let size = size_override.unwrap_or_else(|| format!("{}em", self.scale));
        IconClaim::Resolved(Arc::new(Rule {
            pattern: Pattern::exact(base),
            source: RuleSource::IconPlugin,
            ordinal: 0,
            template: synthesize_template(&icon, self.mode, &size),
        }))
    }

    fn split_collection<'a>(&self, rest: &'a str) -> Option<(&'a str, &'a str)> {
        self.collections
            .iter()
            .filter_map(|name| {
                let icon = rest.strip_prefix(name.as_str())?.strip_prefix('-')?;
                (!icon.is_empty()).then(|| (&rest[..name.len()], icon))
            })
            .max_by_key(|(name, _)| name.len())
    }

    fn collection(&self, name: &str, sink: &DiagnosticSink) -> Option<Arc<IconCollection>> {
        let slot = {
            let mut cache = match self.cache.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(cache.entry(name.to_string()).or_default())
        };
        slot.get_or_init(|| self.load_with_timeout(name, sink))
            .clone()
    }

    fn load_with_timeout(&self, name: &str, sink: &DiagnosticSink) -> Option<Arc<IconCollection>> {
        self.loads_started.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(collection = name, "loading icon collection");

        let (tx, rx) = channel();
        let source = Arc::clone(&self.source);
        let owned_name = name.to_string();
        let spawned = thread::Builder::new()
            .name(format!("icon-load-{}", name))
            .spawn(move || {
                let _ = tx.send(source.load(&owned_name));
            });

        let result = match spawned {
            Ok(_) => match rx.recv_timeout(self.timeout) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => Err(CollectionLoadError::TimedOut {
                    name: name.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                }),
                Err(RecvTimeoutError::Disconnected) => Err(CollectionLoadError::LoaderPanicked {
                    name: name.to_string(),
                }),
            },
            Err(err) => Err(CollectionLoadError::Io {
                name: name.to_string(),
                message: err.to_string(),
            }),
        };

        match result {
            Ok(collection) => {
                tracing::debug!(
                    collection = name,
                    icons = collection.len(),
                    "icon collection loaded"
                );
                Some(Arc::new(collection))
            }
            Err(err) => {
                sink.record(Diagnostic::CollectionLoad {
                    collection: name.to_string(),
                    message: err.to_string(),
                });
                None
            }
        }
    }
}

fn split_size_suffix(icon_part: &str) -> Option<(&str, Option<String>)> {
    if !icon_part.ends_with(']') {
        return Some((icon_part, None));
    }
    let open = icon_part.rfind("-[")?;
    let name = &icon_part[..open];
    let raw = &icon_part[open + 2..icon_part.len() - 1];
    if name.is_empty() || raw.is_empty() || raw.contains(['{', '}', ';', '[', ']']) {
        return None;
    }
    Some((name, Some(raw.replace('_', " "))))
}

fn synthesize_template(icon: &Icon, mode: IconMode, size: &str) -> RuleTemplate {
    let url = svg_data_url(icon);
    let use_mask = match mode {
        IconMode::Mask => true,
        IconMode::Background => false,
        IconMode::Auto => icon.body.contains("currentColor"),
    };

    if use_mask {
        RuleTemplate::new(
            Layer::Icons,
            &[
                ("--svg", url.as_str()),
                ("-webkit-mask", "var(--svg) no-repeat"),
                ("mask", "var(--svg) no-repeat"),
                ("-webkit-mask-size", "100% 100%"),
                ("mask-size", "100% 100%"),
                ("background-color", "currentColor"),
                ("display", "inline-block"),
                ("width", size),
                ("height", size),
            ],
        )
    } else {
        let background = format!("{} no-repeat", url);
        RuleTemplate::new(
            Layer::Icons,
            &[
                ("background", background.as_str()),
                ("background-size", "100% 100%"),
                ("background-color", "transparent"),
                ("display", "inline-block"),
                ("width", size),
                ("height", size),
            ],
        )
    }
}

fn svg_data_url(icon: &Icon) -> String {
    let svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">{body}</svg>",
        w = icon.width,
        h = icon.height,
        body = icon.body
    );
    format!("url(\"data:image/svg+xml;utf8,{}\")", encode_svg_for_css(&svg))
}

fn encode_svg_for_css(svg: &str) -> String {
    let mut encoded = String::with_capacity(svg.len() + svg.len() / 4);
    let mut last_was_space = false;
    for ch in svg.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                encoded.push(' ');
            }
            last_was_space = true;
            continue;
        }
        last_was_space = false;
        match ch {
            '"' => encoded.push('\''),
            '%' => encoded.push_str("%25"),
            '#' => encoded.push_str("%23"),
            '<' => encoded.push_str("%3C"),
            '>' => encoded.push_str("%3E"),
            '{' => encoded.push_str("%7B"),
            '}' => encoded.push_str("%7D"),
            _ => encoded.push(ch),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::{
        CollectionSource, DirectorySource, IconClaim, IconCollection, IconRuleGenerator,
        StaticSource,
    };
    use crate::config::{IconMode, IconOptions};
    use crate::diagnostics::{Diagnostic, DiagnosticSink};
    use crate::error::CollectionLoadError;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    const MDI: &str = r##"{
        "prefix": "mdi",
        "width": 24,
        "height": 24,
        "icons": {
            "home": { "body": "<path fill=\"currentColor\" d=\"M10 20v-6h4v6h5v-8h3L12 3L2 12h3v8z\"/>" },
            "logo": { "body": "<path fill=\"#ff0000\" d=\"M0 0h24v24H0z\"/>", "width": 32 }
        },
        "aliases": {
            "house": { "parent": "home" }
        }
    }"##;

    fn options(collections: &[&str]) -> IconOptions {
        IconOptions {
            collections: collections.iter().map(|name| name.to_string()).collect(),
            ..IconOptions::default()
        }
    }

    fn generator(collections: &[&str]) -> IconRuleGenerator {
        IconRuleGenerator::new(
            &options(collections),
            Arc::new(StaticSource::new().with_json("mdi", MDI)),
        )
    }

    fn declaration(claim: &IconClaim, property: &str) -> String {
        let IconClaim::Resolved(rule) = claim else {
            panic!("expected a resolved icon, got {:?}", claim);
        };
        rule.template.blocks[0]
            .declarations
            .iter()
            .find(|decl| decl.property == property)
            .map(|decl| decl.value.clone())
            .unwrap_or_default()
    }

    struct SlowSource {
        inner: StaticSource,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CollectionSource for SlowSource {
        fn load(&self, name: &str) -> Result<IconCollection, CollectionLoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.inner.load(name)
        }
    }

    #[test]
    fn resolves_alias_and_defaults() {
        let collection = IconCollection::from_json("mdi", MDI).expect("valid json");
        let house = collection.get("house").expect("alias resolves");
        assert!(house.body.contains("M10 20v-6h4v6h5v-8h3"));
        assert_eq!(house.width, 24.0);
        assert_eq!(collection.get("logo").expect("logo").width, 32.0);
        assert!(collection.get("nope").is_none());
    }

    #[test]
    fn embeds_vector_source_in_mask_for_current_color_icons() {
        let icons = generator(&["ic", "mdi"]);
        let sink = DiagnosticSink::new();
        let claim = icons.claim("i-mdi-home", &sink);

        let svg = declaration(&claim, "--svg");
        assert!(svg.starts_with("url(\"data:image/svg+xml;utf8,%3Csvg"));
        assert!(svg.contains("M10 20v-6h4v6h5v-8h3L12 3L2 12h3v8z"));
        assert!(svg.contains("viewBox='0 0 24 24'"));
        assert_eq!(declaration(&claim, "width"), "1em");
        assert_eq!(declaration(&claim, "background-color"), "currentColor");
        assert!(sink.is_empty());
    }

    #[test]
    fn colored_icons_use_background_in_auto_mode() {
        let icons = generator(&["mdi"]);
        let sink = DiagnosticSink::new();
        let claim = icons.claim("i-mdi-logo", &sink);
        let background = declaration(&claim, "background");
        assert!(background.contains("%23ff0000"));
        assert!(background.ends_with("no-repeat"));
    }

    #[test]
    fn mode_can_be_forced() {
        let mut opts = options(&["mdi"]);
        opts.mode = IconMode::Background;
        let icons =
            IconRuleGenerator::new(&opts, Arc::new(StaticSource::new().with_json("mdi", MDI)));
        let sink = DiagnosticSink::new();
        let claim = icons.claim("i-mdi-home", &sink);
        assert!(declaration(&claim, "background").contains("data:image/svg+xml"));
        assert_eq!(declaration(&claim, "--svg"), "");
    }

    #[test]
    fn size_suffix_overrides_default() {
        let icons = generator(&["mdi"]);
        let sink = DiagnosticSink::new();
        let claim = icons.claim("i-mdi-home-[2.5rem]", &sink);
        assert_eq!(declaration(&claim, "width"), "2.5rem");
        assert_eq!(declaration(&claim, "height"), "2.5rem");
    }

    #[test]
    fn synthesis_is_byte_identical() {
        let icons = generator(&["mdi"]);
        let sink = DiagnosticSink::new();
        let first = icons.claim("i-mdi-home-[20px]", &sink);
        let second = icons.claim("i-mdi-home-[20px]", &sink);
        assert_eq!(first, second);
        assert_eq!(icons.loads_started(), 1);
    }

    #[test]
    fn unknown_icon_is_reported() {
        let icons = generator(&["mdi"]);
        let sink = DiagnosticSink::new();
        assert_eq!(icons.claim("i-mdi-nonexistent", &sink), IconClaim::Unresolved);
        assert_eq!(
            sink.into_sorted(),
            vec![Diagnostic::UnknownIcon {
                candidate: "i-mdi-nonexistent".to_string(),
                collection: "mdi".to_string(),
                icon: "nonexistent".to_string(),
            }]
        );
    }

    #[test]
    fn unconfigured_prefixes_are_not_icons() {
        let icons = generator(&["mdi"]);
        let sink = DiagnosticSink::new();
        assert_eq!(icons.claim("i-fa-home", &sink), IconClaim::NotIcon);
        assert_eq!(icons.claim("text-red-500", &sink), IconClaim::NotIcon);
        assert_eq!(icons.claim("i-mdi-", &sink), IconClaim::NotIcon);
        assert_eq!(icons.loads_started(), 0);
    }

    #[test]
    fn missing_collection_is_reported_once() {
        let icons = generator(&["ic", "mdi"]);
        let sink = DiagnosticSink::new();
        assert_eq!(icons.claim("i-ic-baseline-home", &sink), IconClaim::Unresolved);
        assert_eq!(icons.claim("i-ic-outline-star", &sink), IconClaim::Unresolved);

        let events = sink.into_sorted();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            Diagnostic::CollectionLoad { collection, .. } if collection == "ic"
        ));
        assert_eq!(icons.loads_started(), 1);
    }

    #[test]
    fn concurrent_requests_share_one_load() {
        let source = Arc::new(SlowSource {
            inner: StaticSource::new().with_json("mdi", MDI),
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(50),
        });
        let icons = Arc::new(IconRuleGenerator::new(
            &options(&["mdi"]),
            Arc::clone(&source) as Arc<dyn CollectionSource>,
        ));
        let sink = Arc::new(DiagnosticSink::new());

        let handles = (0..8)
            .map(|_| {
                let icons = Arc::clone(&icons);
                let sink = Arc::clone(&sink);
                thread::spawn(move || icons.claim("i-mdi-home", &sink))
            })
            .collect::<Vec<_>>();
        for handle in handles {
            let claim = handle.join().expect("worker should finish");
            assert!(matches!(claim, IconClaim::Resolved(_)));
        }

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(icons.loads_started(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn hung_load_times_out() {
        let source = Arc::new(SlowSource {
            inner: StaticSource::new().with_json("mdi", MDI),
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(500),
        });
        let mut opts = options(&["mdi"]);
        opts.load_timeout_ms = 20;
        let icons = IconRuleGenerator::new(&opts, source);
        let sink = DiagnosticSink::new();

        assert_eq!(icons.claim("i-mdi-home", &sink), IconClaim::Unresolved);
        let events = sink.into_sorted();
        assert!(matches!(
            &events[..],
            [Diagnostic::CollectionLoad { message, .. }] if message.contains("timed out")
        ));
    }

    #[test]
    fn directory_source_reads_both_layouts() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("mdi.json"), MDI).expect("write flat");
        fs::create_dir_all(dir.path().join("ic")).expect("mkdir");
        fs::write(dir.path().join("ic").join("icons.json"), MDI).expect("write nested");

        let source = DirectorySource::new(dir.path());
        assert!(source.load("mdi").is_ok());
        assert!(source.load("ic").is_ok());
        assert!(matches!(
            source.load("fa"),
            Err(CollectionLoadError::NotFound { .. })
        ));
    }

    #[test]
    fn hyphenated_collection_names_match_longest() {
        let icons = IconRuleGenerator::new(
            &options(&["material", "material-symbols"]),
            Arc::new(StaticSource::new().with_json("material-symbols", MDI)),
        );
        let sink = DiagnosticSink::new();
        assert!(matches!(
            icons.claim("i-material-symbols-home", &sink),
            IconClaim::Resolved(_)
        ));
    }
}
