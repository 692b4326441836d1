use rayon::prelude::*;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::candidate::parse_candidate;
use crate::components;
use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::emitter::{self, BaseRule, EmitOptions};
use crate::error::{ConfigError, PipelineError};
use crate::generator;
use crate::icons::{CollectionSource, DirectorySource, IconRuleGenerator};
use crate::registry::{Registry, RegistryBuilder};
use crate::resolver::Resolver;
use crate::scanner::{self, Source};
use crate::theme;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildStats {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub candidates: usize,
    pub utilities: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub css: String,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: BuildStats,
}

/// State for exactly one run. The registry and the icon cache are built by
/// [`Engine::new`] and dropped with the engine.
pub struct Engine {
    config: Config,
    registry: Registry,
    screens: Vec<(String, String)>,
    base_rules: Vec<BaseRule>,
    template: Option<String>,
    pool: Option<rayon::ThreadPool>,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let source = config.icon_options().map(|options| {
            Arc::new(DirectorySource::new(config.resolve_path(&options.collections_dir)))
                as Arc<dyn CollectionSource>
        });
        Self::build_engine(config, source)
    }

    pub fn with_collection_source(
        config: Config,
        source: Arc<dyn CollectionSource>,
    ) -> Result<Self, ConfigError> {
        Self::build_engine(config, Some(source))
    }

    fn build_engine(
        config: Config,
        source: Option<Arc<dyn CollectionSource>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let template = match &config.input_css {
            Some(path) => {
                let path = config.resolve_path(path);
                let text = fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Template { path, source })?;
                Some(text)
            }
            None => None,
        };

        let pool = if config.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .thread_name(|idx| format!("ironweave-scan-{}", idx))
                .build()
                .map_err(|err| ConfigError::InvalidValue {
                    field: "threads".to_string(),
                    message: err.to_string(),
                })?;
            Some(pool)
        } else {
            None
        };

        let mut builder = RegistryBuilder::new();
        generator::register_core_rules(&mut builder);
        let mut base_rules = Vec::new();
        if config.preflight {
            base_rules.extend(emitter::preflight());
        }
        if let Some(options) = config.component_options() {
            components::register_components(&mut builder, options);
            base_rules.extend(components::theme_variables(options, config.dark_mode));
        }
        if let (Some(options), Some(source)) = (config.icon_options(), source) {
            builder.with_icons(IconRuleGenerator::new(options, source));
        }
        theme::register_extensions(&mut builder, &config.theme.extend);
        let registry = builder.build();
        let screens = theme::screens(&config.theme.extend);

        Ok(Self {
            config,
            registry,
            screens,
            base_rules,
            template,
            pool,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn build(self, cancel: &CancellationToken) -> Result<BuildOutput, PipelineError> {
        let paths = scanner::discover_paths(&self.config)?;
        let sources = paths.into_iter().map(Source::File).collect::<Vec<_>>();
        self.build_sources(&sources, cancel)
    }

    pub fn build_sources(
        self,
        sources: &[Source],
        cancel: &CancellationToken,
    ) -> Result<BuildOutput, PipelineError> {
        match &self.pool {
            Some(pool) => pool.install(|| self.run(sources, cancel)),
            None => self.run(sources, cancel),
        }
    }

    fn run(&self, sources: &[Source], cancel: &CancellationToken) -> Result<BuildOutput, PipelineError> {
        let started = Instant::now();
        let sink = DiagnosticSink::new();
        for notice in self.registry.override_notices() {
            sink.record(notice.clone());
        }

        let scanned = scanner::scan_sources(sources, &sink, cancel)?;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let resolver = Resolver::new(&self.registry, self.screens.clone(), self.config.dark_mode);
        let resolved = scanned
            .candidates
            .par_iter()
            .filter_map(|raw| {
                let candidate = parse_candidate(raw)?;
                let utility = resolver.resolve(&candidate, &sink)?;
                Some((raw.clone(), utility))
            })
            .collect::<Vec<_>>();
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let utilities = resolved.len();
        let layered = emitter::emit(
            &self.base_rules,
            resolved,
            EmitOptions {
                minify: self.config.minify,
                cascade_layers: self.config.cascade_layers,
            },
        );
        let css = match &self.template {
            Some(template) => layered.render_template(template),
            None => layered.to_css(),
        };

        let stats = BuildStats {
            files_scanned: scanned.files_scanned,
            files_skipped: scanned.files_skipped,
            candidates: scanned.candidates.len(),
            utilities,
        };
        let diagnostics = sink.into_sorted();
        tracing::info!(
            files = stats.files_scanned,
            skipped = stats.files_skipped,
            candidates = stats.candidates,
            utilities = stats.utilities,
            diagnostics = diagnostics.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stylesheet generated"
        );

        Ok(BuildOutput {
            css,
            diagnostics,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BuildOutput, CancellationToken, Engine};
    use crate::config::{
        ComponentOptions, Config, DarkModeStrategy, IconOptions, PluginDescriptor, ThemeValue,
    };
    use crate::diagnostics::Diagnostic;
    use crate::error::{CollectionLoadError, ConfigError, PipelineError};
    use crate::icons::{CollectionSource, IconCollection, StaticSource};
    use crate::registry::RuleSource;
    use crate::scanner::Source;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    const MDI: &str = r#"{
        "prefix": "mdi",
        "width": 24,
        "height": 24,
        "icons": {
            "home": { "body": "<path fill=\"currentColor\" d=\"M10 20v-6h4v6h5v-8h3L12 3L2 12h3v8z\"/>" }
        }
    }"#;

    fn config() -> Config {
        Config {
            content: vec!["**/*.templ".to_string()],
            preflight: false,
            ..Config::default()
        }
    }

    fn icon_config() -> Config {
        Config {
            plugins: vec![PluginDescriptor::Icons(IconOptions {
                collections: vec!["mdi".to_string()],
                ..IconOptions::default()
            })],
            ..config()
        }
    }

    fn inline(name: &str, content: &str) -> Source {
        Source::Inline {
            name: PathBuf::from(name),
            content: content.to_string(),
        }
    }

    fn run(config: Config, sources: &[Source]) -> BuildOutput {
        let source = Arc::new(StaticSource::new().with_json("mdi", MDI));
        Engine::with_collection_source(config, source)
            .expect("engine")
            .build_sources(sources, &CancellationToken::new())
            .expect("build")
    }

    fn pages() -> Vec<Source> {
        vec![
            inline("a.templ", r#"<div class="p-4 md:p-2 hover:bg-blue-500">"#),
            inline("b.templ", r#"<span class="text-sm font-bold dark:text-white">"#),
            inline("c.templ", r#"<i class="i-mdi-home"></i><p class="flex gap-2">"#),
        ]
    }

    #[test]
    fn repeated_runs_are_byte_identical() {
        let first = run(icon_config(), &pages());
        let second = run(icon_config(), &pages());
        assert_eq!(first.css, second.css);
        assert_eq!(first.diagnostics, second.diagnostics);
        assert!(!first.css.is_empty());
    }

    #[test]
    fn traversal_order_does_not_change_output() {
        let forward = pages();
        let mut backward = pages();
        backward.reverse();
        assert_eq!(run(icon_config(), &forward).css, run(icon_config(), &backward).css);
    }

    #[test]
    fn variant_spellings_collapse_to_one_rule() {
        let output = run(
            Config {
                dark_mode: DarkModeStrategy::Class,
                ..config()
            },
            &[inline("a.templ", "hover:dark:text-red-500 dark:hover:text-red-500")],
        );
        assert_eq!(output.stats.utilities, 2);
        assert_eq!(output.css.matches('{').count(), 1);
        assert_eq!(output.css.matches("color: #ef4444;").count(), 1);
    }

    #[test]
    fn theme_extension_beats_core_for_same_token() {
        let mut spacing = BTreeMap::new();
        spacing.insert("4".to_string(), ThemeValue::Text("3rem".to_string()));
        let mut config = config();
        config.theme.extend.insert("spacing".to_string(), spacing);

        let output = run(config, &[inline("a.templ", "p-4")]);
        assert!(output.css.contains("padding: 3rem;"));
        assert!(!output.css.contains("padding: 1rem;"));
    }

    #[test]
    fn responsive_variants_follow_extended_base() {
        let mut spacing = BTreeMap::new();
        spacing.insert("4".to_string(), ThemeValue::Text("3rem".to_string()));
        let mut fonts = BTreeMap::new();
        fonts.insert(
            "mono".to_string(),
            ThemeValue::List(vec!["Courier Prime".to_string(), "monospace".to_string()]),
        );
        let mut config = config();
        config.theme.extend.insert("spacing".to_string(), spacing);
        config.theme.extend.insert("fontFamily".to_string(), fonts);

        let output = run(
            config,
            &[inline("a.templ", "px-2 p-4 md:p-2 font-mono md:font-sans")],
        );
        let base = output.css.find(".p-4 {").expect("p-4");
        let axis = output.css.find(".px-2 {").expect("px-2");
        assert!(base < axis);
        let font = output.css.find(".font-mono {").expect("font-mono");
        let media = output.css.find("@media (min-width: 768px)").expect("md");
        assert!(base < media);
        assert!(font < media);
        assert!(output.css.contains("padding: 3rem;"));
        assert!(output.css.contains(".md\\:font-sans {"));
    }

    #[test]
    fn important_utilities_come_after_variants() {
        let output = run(config(), &[inline("a.templ", "!p-1 md:p-2")]);
        let media = output.css.find("@media (min-width: 768px)").expect("md");
        let important = output.css.find(".\\!p-1 {").expect("important");
        assert!(media < important);
        assert!(output.css.contains("padding: 0.25rem !important;"));
    }

    #[test]
    fn class_arrays_in_script_are_scanned() {
        let output = run(
            config(),
            &[inline("a.js", r#"const cls = ["p-4","m-2"]; clsx(['flex'])"#)],
        );
        assert!(output.css.contains(".p-4 {"));
        assert!(output.css.contains(".m-2 {"));
        assert!(output.css.contains(".flex {"));
    }

    #[test]
    fn unknown_variant_skips_icon_lookup() {
        let output = run(icon_config(), &[inline("a.templ", "wobble:i-mdi-nope")]);
        assert!(output.css.is_empty());
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn override_notices_reach_diagnostics() {
        let mut colors = BTreeMap::new();
        colors.insert("btn".to_string(), ThemeValue::Text("#111111".to_string()));
        let mut config = config();
        config.theme.extend.insert("colors".to_string(), colors);
        config.plugins = vec![PluginDescriptor::Components(ComponentOptions {
            themes: Vec::new(),
            prefix: "bg-".to_string(),
        })];

        let output = run(config, &[inline("a.templ", "bg-btn")]);
        assert!(output.css.contains("background-color: #111111;"));
        assert!(output.diagnostics.iter().any(|diag| matches!(
            diag,
            Diagnostic::RuleOverride {
                winner: RuleSource::ThemeExtension,
                loser: RuleSource::ComponentPlugin,
                ..
            }
        )));
    }

    #[test]
    fn icon_resolves_and_unknown_icon_is_reported() {
        let output = run(icon_config(), &[inline("a.templ", "i-mdi-home i-mdi-nonexistent")]);
        assert_eq!(output.stats.utilities, 1);
        assert!(output.css.contains(".i-mdi-home {"));
        assert!(output.css.contains("M10 20v-6h4v6h5v-8h3L12 3L2 12h3v8z"));
        assert!(!output.css.contains("nonexistent"));
        assert_eq!(
            output.diagnostics,
            vec![Diagnostic::UnknownIcon {
                candidate: "i-mdi-nonexistent".to_string(),
                collection: "mdi".to_string(),
                icon: "nonexistent".to_string(),
            }]
        );
    }

    #[test]
    fn one_unreadable_file_among_ten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sources = Vec::new();
        for idx in 0..9 {
            let path = dir.path().join(format!("page{}.templ", idx));
            fs::write(&path, format!("<div class=\"m-{}\">", idx + 1)).expect("write");
            sources.push(Source::File(path));
        }
        sources.push(Source::File(dir.path().join("missing.templ")));

        let output = run(config(), &sources);
        for idx in 1..=9 {
            assert!(output.css.contains(&format!(".m-{} {{", idx)), "m-{}", idx);
        }
        assert_eq!(output.stats.files_scanned, 9);
        assert_eq!(output.diagnostics.len(), 1);
        assert!(matches!(
            &output.diagnostics[0],
            Diagnostic::UnreadableFile { path, .. } if path.ends_with("missing.templ")
        ));
    }

    #[test]
    fn prose_produces_nothing() {
        let output = run(config(), &[inline("a.templ", "just-some-prose")]);
        assert_eq!(output.css, "");
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn cancellation_returns_no_output() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = Engine::new(config())
            .expect("engine")
            .build_sources(&pages(), &cancel);
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    struct HangingSource;

    impl CollectionSource for HangingSource {
        fn load(&self, name: &str) -> Result<IconCollection, CollectionLoadError> {
            thread::sleep(Duration::from_secs(2));
            IconCollection::from_json(name, MDI)
        }
    }

    #[test]
    fn hung_collection_load_times_out() {
        let config = Config {
            plugins: vec![PluginDescriptor::Icons(IconOptions {
                collections: vec!["mdi".to_string()],
                load_timeout_ms: 50,
                ..IconOptions::default()
            })],
            ..config()
        };
        let output = Engine::with_collection_source(config, Arc::new(HangingSource))
            .expect("engine")
            .build_sources(&[inline("a.templ", "i-mdi-home p-1")], &CancellationToken::new())
            .expect("build");
        assert!(output.css.contains(".p-1 {"));
        assert!(!output.css.contains("i-mdi-home"));
        assert!(matches!(
            output.diagnostics.as_slice(),
            [Diagnostic::CollectionLoad { collection, .. }] if collection == "mdi"
        ));
    }

    #[test]
    fn invalid_config_fails_before_scanning() {
        let err = Engine::new(Config {
            content: Vec::new(),
            ..Config::default()
        })
        .err()
        .expect("empty content is fatal");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn missing_template_is_a_config_error() {
        let config = Config {
            input_css: Some(PathBuf::from("does/not/exist.css")),
            base_dir: Path::new("/nonexistent-ironweave").to_path_buf(),
            ..config()
        };
        assert!(matches!(
            Engine::new(config).err(),
            Some(ConfigError::Template { .. })
        ));
    }

    #[test]
    fn builds_from_disk_with_template_and_components() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("views")).expect("mkdir");
        fs::create_dir_all(dir.path().join("icons")).expect("mkdir");
        fs::write(
            dir.path().join("views/index.templ"),
            r#"<button class="btn btn-primary font-mono i-mdi-home">Go</button>"#,
        )
        .expect("write");
        fs::write(dir.path().join("icons/mdi.json"), MDI).expect("write");
        fs::write(
            dir.path().join("tailwind.css"),
            "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n",
        )
        .expect("write");
        fs::write(
            dir.path().join("ironweave.toml"),
            r#"
content = ["**/*.templ"]
dark_mode = "class"
input_css = "tailwind.css"
preflight = false

[theme.extend.fontFamily]
mono = ["Courier Prime", "monospace"]

[[plugins]]
kind = "components"

[[plugins]]
kind = "icons"
collections = ["ic", "mdi"]
"#,
        )
        .expect("write");

        let config = crate::config::load(&dir.path().join("ironweave.toml")).expect("config");
        let output = Engine::new(config)
            .expect("engine")
            .build(&CancellationToken::new())
            .expect("build");

        let css = &output.css;
        assert!(!css.contains("@tailwind"));
        let theme_vars = css.find("[data-theme=dark], .dark {").expect("dark theme vars");
        let btn = css.find(".btn {").expect("btn");
        let primary = css.find(".btn-primary {").expect("btn-primary");
        let icon = css.find(".i-mdi-home {").expect("icon");
        let mono = css.find(".font-mono {").expect("font override");
        assert!(theme_vars < btn && btn < primary && primary < mono && mono < icon);
        assert!(css.contains("font-family: \"Courier Prime\", monospace;"));
        assert!(output.diagnostics.is_empty());
    }
}
