use std::collections::BTreeMap;

use crate::config::ThemeValue;
use crate::generator::{FAMILIES, Family, functional_template};
use crate::registry::{
    Declaration, DeclarationBlock, Layer, Pattern, RegistryBuilder, RuleSource, RuleTemplate,
    ValueSpec,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThemeCategory {
    Spacing,
    Colors,
    FontFamily,
    FontSize,
    BorderRadius,
    Screens,
}

impl ThemeCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        let category = match raw {
            "spacing" => Self::Spacing,
            "colors" => Self::Colors,
            "fontFamily" | "font-family" | "font_family" => Self::FontFamily,
            "fontSize" | "font-size" | "font_size" => Self::FontSize,
            "borderRadius" | "border-radius" | "border_radius" => Self::BorderRadius,
            "screens" => Self::Screens,
            _ => return None,
        };
        Some(category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    Spacing,
    Margin,
    Sizing,
    Colors,
    FontFamily,
    FontSize,
    BorderRadius,
    BorderWidth,
    LineHeight,
    Opacity,
    ZIndex,
}

impl ScaleKind {
    pub fn category(self) -> Option<ThemeCategory> {
        match self {
            Self::Spacing | Self::Margin | Self::Sizing => Some(ThemeCategory::Spacing),
            Self::Colors => Some(ThemeCategory::Colors),
            Self::FontFamily => Some(ThemeCategory::FontFamily),
            Self::FontSize => Some(ThemeCategory::FontSize),
            Self::BorderRadius => Some(ThemeCategory::BorderRadius),
            Self::BorderWidth | Self::LineHeight | Self::Opacity | Self::ZIndex => None,
        }
    }

    pub fn default_scale(self) -> BTreeMap<String, String> {
        match self {
            Self::Spacing => spacing_scale(),
            Self::Margin => {
                let mut scale = spacing_scale();
                scale.insert("auto".to_string(), "auto".to_string());
                scale
            }
            Self::Sizing => {
                let mut scale = spacing_scale();
                for (key, value) in [
                    ("auto", "auto"),
                    ("full", "100%"),
                    ("min", "min-content"),
                    ("max", "max-content"),
                    ("fit", "fit-content"),
                    ("1/2", "50%"),
                    ("1/3", "33.333333%"),
                    ("2/3", "66.666667%"),
                    ("1/4", "25%"),
                    ("3/4", "75%"),
                ] {
                    scale.insert(key.to_string(), value.to_string());
                }
                scale
            }
            Self::Colors => color_palette(),
            Self::FontFamily => table(&[
                (
                    "sans",
                    "ui-sans-serif, system-ui, sans-serif, \"Apple Color Emoji\", \"Segoe UI Emoji\"",
                ),
                (
                    "serif",
                    "ui-serif, Georgia, Cambria, \"Times New Roman\", Times, serif",
                ),
                (
                    "mono",
                    "ui-monospace, SFMono-Regular, Menlo, Monaco, Consolas, \"Liberation Mono\", \"Courier New\", monospace",
                ),
            ]),
            Self::FontSize => table(&[
                ("xs", "0.75rem"),
                ("sm", "0.875rem"),
                ("base", "1rem"),
                ("lg", "1.125rem"),
                ("xl", "1.25rem"),
                ("2xl", "1.5rem"),
                ("3xl", "1.875rem"),
                ("4xl", "2.25rem"),
                ("5xl", "3rem"),
                ("6xl", "3.75rem"),
            ]),
            Self::BorderRadius => table(&[
                ("none", "0px"),
                ("sm", "0.125rem"),
                ("DEFAULT", "0.25rem"),
                ("md", "0.375rem"),
                ("lg", "0.5rem"),
                ("xl", "0.75rem"),
                ("2xl", "1rem"),
                ("3xl", "1.5rem"),
                ("full", "9999px"),
            ]),
            Self::BorderWidth => table(&[
                ("DEFAULT", "1px"),
                ("0", "0px"),
                ("2", "2px"),
                ("4", "4px"),
                ("8", "8px"),
            ]),
            Self::LineHeight => table(&[
                ("none", "1"),
                ("tight", "1.25"),
                ("snug", "1.375"),
                ("normal", "1.5"),
                ("relaxed", "1.625"),
                ("loose", "2"),
                ("3", "0.75rem"),
                ("4", "1rem"),
                ("5", "1.25rem"),
                ("6", "1.5rem"),
                ("7", "1.75rem"),
                ("8", "2rem"),
                ("9", "2.25rem"),
                ("10", "2.5rem"),
            ]),
            Self::Opacity => [0, 5, 10, 20, 25, 30, 40, 50, 60, 70, 75, 80, 90, 95, 100]
                .into_iter()
                .map(|step| (step.to_string(), format!("{}", f64::from(step) / 100.0)))
                .collect(),
            Self::ZIndex => table(&[
                ("0", "0"),
                ("10", "10"),
                ("20", "20"),
                ("30", "30"),
                ("40", "40"),
                ("50", "50"),
                ("auto", "auto"),
            ]),
        }
    }
}

const SPACING_STEPS: [f64; 34] = [
    0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 14.0, 16.0,
    20.0, 24.0, 28.0, 32.0, 36.0, 40.0, 44.0, 48.0, 52.0, 56.0, 60.0, 64.0, 72.0, 80.0, 96.0, 0.0,
];

const PALETTE: [(&str, [&str; 10]); 8] = [
    (
        "gray",
        [
            "#f9fafb", "#f3f4f6", "#e5e7eb", "#d1d5db", "#9ca3af", "#6b7280", "#4b5563", "#374151",
            "#1f2937", "#111827",
        ],
    ),
    (
        "red",
        [
            "#fef2f2", "#fee2e2", "#fecaca", "#fca5a5", "#f87171", "#ef4444", "#dc2626", "#b91c1c",
            "#991b1b", "#7f1d1d",
        ],
    ),
    (
        "yellow",
        [
            "#fefce8", "#fef9c3", "#fef08a", "#fde047", "#facc15", "#eab308", "#ca8a04", "#a16207",
            "#854d0e", "#713f12",
        ],
    ),
    (
        "green",
        [
            "#f0fdf4", "#dcfce7", "#bbf7d0", "#86efac", "#4ade80", "#22c55e", "#16a34a", "#15803d",
            "#166534", "#14532d",
        ],
    ),
    (
        "blue",
        [
            "#eff6ff", "#dbeafe", "#bfdbfe", "#93c5fd", "#60a5fa", "#3b82f6", "#2563eb", "#1d4ed8",
            "#1e40af", "#1e3a8a",
        ],
    ),
    (
        "indigo",
        [
            "#eef2ff", "#e0e7ff", "#c7d2fe", "#a5b4fc", "#818cf8", "#6366f1", "#4f46e5", "#4338ca",
            "#3730a3", "#312e81",
        ],
    ),
    (
        "purple",
        [
            "#faf5ff", "#f3e8ff", "#e9d5ff", "#d8b4fe", "#c084fc", "#a855f7", "#9333ea", "#7e22ce",
            "#6b21a8", "#581c87",
        ],
    ),
    (
        "pink",
        [
            "#fdf2f8", "#fce7f3", "#fbcfe8", "#f9a8d4", "#f472b6", "#ec4899", "#db2777", "#be185d",
            "#9d174d", "#831843",
        ],
    ),
];

const SHADES: [&str; 10] = [
    "50", "100", "200", "300", "400", "500", "600", "700", "800", "900",
];

fn spacing_scale() -> BTreeMap<String, String> {
    let mut scale = BTreeMap::new();
    scale.insert("px".to_string(), "1px".to_string());
    for step in SPACING_STEPS {
        let value = if step == 0.0 {
            "0px".to_string()
        } else {
            format!("{}rem", step * 0.25)
        };
        scale.insert(format!("{}", step), value);
    }
    scale
}

fn color_palette() -> BTreeMap<String, String> {
    let mut colors = table(&[
        ("inherit", "inherit"),
        ("current", "currentColor"),
        ("transparent", "transparent"),
        ("black", "#000"),
        ("white", "#fff"),
    ]);
    for (name, shades) in PALETTE {
        for (shade, hex) in SHADES.iter().zip(shades) {
            colors.insert(format!("{}-{}", name, shade), hex.to_string());
        }
    }
    colors
}

fn table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub fn default_screens() -> Vec<(String, String)> {
    vec![
        ("sm".to_string(), "640px".to_string()),
        ("md".to_string(), "768px".to_string()),
        ("lg".to_string(), "1024px".to_string()),
        ("xl".to_string(), "1280px".to_string()),
        ("2xl".to_string(), "1536px".to_string()),
    ]
}

pub fn screens(extend: &BTreeMap<String, BTreeMap<String, ThemeValue>>) -> Vec<(String, String)> {
    let mut screens = default_screens();
    if let Some(values) = extend.get("screens") {
        for (name, value) in flatten_values(ThemeCategory::Screens, values) {
            match screens.iter_mut().find(|(existing, _)| *existing == name) {
                Some(entry) => entry.1 = value,
                None => screens.push((name, value)),
            }
        }
    }
    sort_breakpoints_by_length(&mut screens);
    screens
}

fn sort_breakpoints_by_length(breakpoints: &mut [(String, String)]) {
    breakpoints.sort_by(|a, b| {
        if let (Some(a_px), Some(b_px)) = (length_in_px(&a.1), length_in_px(&b.1)) {
            return a_px
                .partial_cmp(&b_px)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0));
        }
        a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0))
    });
}

fn length_in_px(raw: &str) -> Option<f64> {
    let value = raw.trim();
    let split_idx = value
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit() && *ch != '.')
        .map(|(idx, _)| idx)?;
    let number = value[..split_idx].parse::<f64>().ok()?;
    match value[split_idx..].trim() {
        "px" => Some(number),
        "rem" | "em" => Some(number * 16.0),
        _ => None,
    }
}

pub fn register_extensions(
    builder: &mut RegistryBuilder,
    extend: &BTreeMap<String, BTreeMap<String, ThemeValue>>,
) {
    for (raw_category, values) in extend {
        let Some(category) = ThemeCategory::parse(raw_category) else {
            continue;
        };
        if category == ThemeCategory::Screens {
            continue;
        }
        let tokens = flatten_values(category, values);
        for family in FAMILIES
            .iter()
            .filter(|family| family.scale.category() == Some(category))
        {
            for (key, value) in &tokens {
                register_override(builder, family, key, value, false);
                if family.negatable {
                    register_override(builder, family, key, value, true);
                }
            }
            if family.scale == ScaleKind::Colors {
                register_color_modifiers(builder, family, &tokens);
            }
        }
    }
}

fn register_override(
    builder: &mut RegistryBuilder,
    family: &Family,
    key: &str,
    value: &str,
    negative: bool,
) {
    let mut token = if key == "DEFAULT" {
        family.prefix.to_string()
    } else {
        format!("{}-{}", family.prefix, key)
    };
    let value = if negative {
        token.insert(0, '-');
        format!("calc({} * -1)", value)
    } else {
        value.to_string()
    };
    let template = RuleTemplate {
        layer: Layer::Utilities,
        blocks: vec![DeclarationBlock {
            selector_suffix: String::new(),
            declarations: family
                .properties
                .iter()
                .map(|property| Declaration::new(property, &value))
                .collect(),
        }],
    };
    builder.register_within(
        family.family,
        RuleSource::ThemeExtension,
        Pattern::Exact(token),
        template,
    );
}

fn register_color_modifiers(
    builder: &mut RegistryBuilder,
    family: &Family,
    tokens: &[(String, String)],
) {
    let scale = tokens.iter().cloned().collect();
    builder.register(
        RuleSource::ThemeExtension,
        Pattern::functional(
            &format!("{}-extend", family.family),
            family.prefix,
            ValueSpec::scale(scale).with_opacity_modifier(),
        ),
        functional_template(family.properties),
    );
}

fn flatten_values(
    category: ThemeCategory,
    values: &BTreeMap<String, ThemeValue>,
) -> Vec<(String, String)> {
    let mut flat = Vec::new();
    for (key, value) in values {
        match value {
            ThemeValue::Text(text) => flat.push((key.clone(), text.clone())),
            ThemeValue::List(items) => flat.push((key.clone(), join_list(category, items))),
            ThemeValue::Table(nested) => {
                for (sub_key, text) in nested {
                    let token = if sub_key == "DEFAULT" {
                        key.clone()
                    } else {
                        format!("{}-{}", key, sub_key)
                    };
                    flat.push((token, text.clone()));
                }
            }
        }
    }
    flat
}

fn join_list(category: ThemeCategory, items: &[String]) -> String {
    items
        .iter()
        .map(|item| {
            let quoted = item.starts_with('"') || item.starts_with('\'');
            if category == ThemeCategory::FontFamily && !quoted && item.contains(' ') {
                format!("\"{}\"", item)
            } else {
                item.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
