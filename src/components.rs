use crate::config::{ComponentOptions, DarkModeStrategy};
use crate::emitter::BaseRule;
use crate::registry::{Declaration, Layer, Pattern, RegistryBuilder, RuleSource, RuleTemplate};

type Palette = &'static [(&'static str, &'static str)];

const LIGHT: Palette = &[
    ("--iw-base-100", "#ffffff"),
    ("--iw-base-200", "#f2f2f2"),
    ("--iw-base-300", "#e5e6e6"),
    ("--iw-base-content", "#1f2937"),
    ("--iw-primary", "#570df8"),
    ("--iw-primary-content", "#ffffff"),
    ("--iw-secondary", "#f000b8"),
    ("--iw-secondary-content", "#ffffff"),
    ("--iw-accent", "#37cdbe"),
    ("--iw-accent-content", "#163835"),
    ("--iw-neutral", "#3d4451"),
    ("--iw-neutral-content", "#ffffff"),
    ("--iw-info", "#3abff8"),
    ("--iw-success", "#36d399"),
    ("--iw-warning", "#fbbd23"),
    ("--iw-error", "#f87272"),
];

const DARK: Palette = &[
    ("--iw-base-100", "#1d232a"),
    ("--iw-base-200", "#191e24"),
    ("--iw-base-300", "#15191e"),
    ("--iw-base-content", "#a6adbb"),
    ("--iw-primary", "#661ae6"),
    ("--iw-primary-content", "#ffffff"),
    ("--iw-secondary", "#d926aa"),
    ("--iw-secondary-content", "#ffffff"),
    ("--iw-accent", "#1fb2a5"),
    ("--iw-accent-content", "#ffffff"),
    ("--iw-neutral", "#2a323c"),
    ("--iw-neutral-content", "#a6adbb"),
    ("--iw-info", "#3abff8"),
    ("--iw-success", "#36d399"),
    ("--iw-warning", "#fbbd23"),
    ("--iw-error", "#f87272"),
];

const THEMES: &[(&str, Palette)] = &[("light", LIGHT), ("dark", DARK)];

pub fn is_known_theme(name: &str) -> bool {
    THEMES.iter().any(|(known, _)| *known == name)
}

fn palette(name: &str) -> Option<Palette> {
    THEMES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, palette)| *palette)
}

struct Component {
    name: &'static str,
    declarations: &'static [(&'static str, &'static str)],
    states: &'static [(&'static str, &'static [(&'static str, &'static str)])],
}

const COMPONENTS: &[Component] = &[
    Component {
        name: "btn",
        declarations: &[
            ("display", "inline-flex"),
            ("align-items", "center"),
            ("justify-content", "center"),
            ("gap", "0.5rem"),
            ("height", "3rem"),
            ("padding", "0 1rem"),
            ("border", "1px solid transparent"),
            ("border-radius", "0.5rem"),
            ("font-size", "0.875rem"),
            ("font-weight", "600"),
            ("cursor", "pointer"),
            ("user-select", "none"),
            ("background-color", "var(--iw-neutral)"),
            ("color", "var(--iw-neutral-content)"),
            ("transition", "background-color 0.2s, filter 0.2s"),
        ],
        states: &[
            (":hover", &[("filter", "brightness(0.92)")]),
            (":disabled", &[("opacity", "0.5"), ("cursor", "not-allowed")]),
        ],
    },
    Component {
        name: "btn-primary",
        declarations: &[
            ("background-color", "var(--iw-primary)"),
            ("color", "var(--iw-primary-content)"),
        ],
        states: &[],
    },
    Component {
        name: "btn-secondary",
        declarations: &[
            ("background-color", "var(--iw-secondary)"),
            ("color", "var(--iw-secondary-content)"),
        ],
        states: &[],
    },
    Component {
        name: "btn-accent",
        declarations: &[
            ("background-color", "var(--iw-accent)"),
            ("color", "var(--iw-accent-content)"),
        ],
        states: &[],
    },
    Component {
        name: "btn-ghost",
        declarations: &[
            ("background-color", "transparent"),
            ("color", "currentColor"),
        ],
        states: &[(":hover", &[("background-color", "var(--iw-base-200)")])],
    },
    Component {
        name: "btn-outline",
        declarations: &[
            ("background-color", "transparent"),
            ("border-color", "currentColor"),
            ("color", "var(--iw-base-content)"),
        ],
        states: &[],
    },
    Component {
        name: "btn-sm",
        declarations: &[("height", "2rem"), ("padding", "0 0.75rem")],
        states: &[],
    },
    Component {
        name: "btn-lg",
        declarations: &[
            ("height", "4rem"),
            ("padding", "0 1.5rem"),
            ("font-size", "1.125rem"),
        ],
        states: &[],
    },
    Component {
        name: "card",
        declarations: &[
            ("position", "relative"),
            ("display", "flex"),
            ("flex-direction", "column"),
            ("border-radius", "1rem"),
            ("background-color", "var(--iw-base-100)"),
            ("color", "var(--iw-base-content)"),
        ],
        states: &[],
    },
    Component {
        name: "card-body",
        declarations: &[
            ("display", "flex"),
            ("flex", "1 1 auto"),
            ("flex-direction", "column"),
            ("gap", "0.5rem"),
            ("padding", "2rem"),
        ],
        states: &[],
    },
    Component {
        name: "card-title",
        declarations: &[
            ("display", "flex"),
            ("align-items", "center"),
            ("gap", "0.5rem"),
            ("font-size", "1.25rem"),
            ("font-weight", "600"),
        ],
        states: &[],
    },
    Component {
        name: "badge",
        declarations: &[
            ("display", "inline-flex"),
            ("align-items", "center"),
            ("height", "1.25rem"),
            ("padding", "0 0.5rem"),
            ("border-radius", "9999px"),
            ("font-size", "0.875rem"),
            ("background-color", "var(--iw-base-200)"),
            ("color", "var(--iw-base-content)"),
        ],
        states: &[],
    },
    Component {
        name: "badge-primary",
        declarations: &[
            ("background-color", "var(--iw-primary)"),
            ("color", "var(--iw-primary-content)"),
        ],
        states: &[],
    },
    Component {
        name: "alert",
        declarations: &[
            ("display", "grid"),
            ("grid-auto-flow", "column"),
            ("align-items", "center"),
            ("gap", "1rem"),
            ("padding", "1rem"),
            ("border-radius", "1rem"),
            ("background-color", "var(--iw-base-200)"),
        ],
        states: &[],
    },
    Component {
        name: "alert-info",
        declarations: &[("background-color", "var(--iw-info)")],
        states: &[],
    },
    Component {
        name: "alert-success",
        declarations: &[("background-color", "var(--iw-success)")],
        states: &[],
    },
    Component {
        name: "alert-warning",
        declarations: &[("background-color", "var(--iw-warning)")],
        states: &[],
    },
    Component {
        name: "alert-error",
        declarations: &[("background-color", "var(--iw-error)")],
        states: &[],
    },
    Component {
        name: "navbar",
        declarations: &[
            ("display", "flex"),
            ("align-items", "center"),
            ("min-height", "4rem"),
            ("padding", "0.5rem"),
        ],
        states: &[],
    },
    Component {
        name: "link",
        declarations: &[("cursor", "pointer"), ("text-decoration-line", "underline")],
        states: &[(":hover", &[("color", "var(--iw-primary)")])],
    },
    Component {
        name: "input",
        declarations: &[
            ("height", "3rem"),
            ("padding", "0 1rem"),
            ("border", "1px solid transparent"),
            ("border-radius", "0.5rem"),
            ("font-size", "1rem"),
            ("background-color", "var(--iw-base-100)"),
            ("color", "var(--iw-base-content)"),
        ],
        states: &[(
            ":focus",
            &[
                ("outline", "2px solid var(--iw-base-300)"),
                ("outline-offset", "2px"),
            ],
        )],
    },
    Component {
        name: "input-bordered",
        declarations: &[("border-color", "var(--iw-base-300)")],
        states: &[],
    },
];

pub fn register_components(builder: &mut RegistryBuilder, options: &ComponentOptions) {
    for component in COMPONENTS {
        let mut template = RuleTemplate::new(Layer::Components, component.declarations);
        for (suffix, declarations) in component.states {
            template = template.with_block(suffix, declarations);
        }
        let name = format!("{}{}", options.prefix, component.name);
        builder.register(RuleSource::ComponentPlugin, Pattern::Exact(name), template);
    }
}

pub fn theme_variables(options: &ComponentOptions, dark_mode: DarkModeStrategy) -> Vec<BaseRule> {
    let mut rules = Vec::new();
    for (idx, name) in options.themes.iter().enumerate() {
        let Some(palette) = palette(name) else {
            continue;
        };
        let declarations = palette
            .iter()
            .map(|(property, value)| Declaration::new(property, value))
            .collect::<Vec<_>>();

        let mut selectors = Vec::new();
        if idx == 0 {
            selectors.push(":root".to_string());
        }
        selectors.push(format!("[data-theme={}]", name));
        if name == "dark" && idx > 0 && dark_mode == DarkModeStrategy::Class {
            selectors.push(".dark".to_string());
        }
        rules.push(BaseRule {
            wrapper: None,
            selector: selectors.join(", "),
            declarations: declarations.clone(),
        });

        if name == "dark" && idx > 0 && dark_mode == DarkModeStrategy::Media {
            rules.push(BaseRule {
                wrapper: Some("@media (prefers-color-scheme: dark)".to_string()),
                selector: ":root:not([data-theme])".to_string(),
                declarations,
            });
        }
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::{is_known_theme, register_components, theme_variables};
    use crate::config::{ComponentOptions, DarkModeStrategy};
    use crate::diagnostics::DiagnosticSink;
    use crate::registry::{Layer, RegistryBuilder, RuleSource};

    #[test]
    fn knows_bundled_themes() {
        assert!(is_known_theme("light"));
        assert!(is_known_theme("dark"));
        assert!(!is_known_theme("retro"));
    }

    #[test]
    fn registers_prefixed_components() {
        let options = ComponentOptions {
            prefix: "ui-".to_string(),
            ..ComponentOptions::default()
        };
        let mut builder = RegistryBuilder::new();
        register_components(&mut builder, &options);
        let registry = builder.build();
        let sink = DiagnosticSink::new();

        assert!(registry.lookup("btn", &sink).is_none());
        let hit = registry.lookup("ui-btn", &sink).expect("ui-btn resolves");
        assert_eq!(hit.rule.source, RuleSource::ComponentPlugin);
        assert_eq!(hit.rule.layer(), Layer::Components);
        let suffixes = hit
            .blocks()
            .iter()
            .map(|block| block.selector_suffix.clone())
            .collect::<Vec<_>>();
        assert_eq!(suffixes, vec!["", ":hover", ":disabled"]);
    }

    #[test]
    fn dark_theme_follows_class_strategy() {
        let rules = theme_variables(&ComponentOptions::default(), DarkModeStrategy::Class);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].selector, ":root, [data-theme=light]");
        assert_eq!(rules[1].selector, "[data-theme=dark], .dark");
        assert!(rules.iter().all(|rule| rule.wrapper.is_none()));
    }

    #[test]
    fn dark_theme_follows_media_strategy() {
        let rules = theme_variables(&ComponentOptions::default(), DarkModeStrategy::Media);
        assert_eq!(rules.len(), 3);
        assert_eq!(
            rules[2].wrapper.as_deref(),
            Some("@media (prefers-color-scheme: dark)")
        );
        assert!(
            rules[2]
                .declarations
                .iter()
                .any(|decl| decl.property == "--iw-base-100" && decl.value == "#1d232a")
        );
    }

    #[test]
    fn single_dark_theme_becomes_root() {
        let options = ComponentOptions {
            themes: vec!["dark".to_string()],
            prefix: String::new(),
        };
        let rules = theme_variables(&options, DarkModeStrategy::Media);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selector, ":root, [data-theme=dark]");
    }
}
