use std::collections::{BTreeMap, BTreeSet};

use crate::registry::{Declaration, Layer};
use crate::resolver::{ResolvedUtility, SELF_PLACEHOLDER, UtilityKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRule {
    pub wrapper: Option<String>,
    pub selector: String,
    pub declarations: Vec<Declaration>,
}

impl BaseRule {
    fn new(selector: &str, declarations: &[(&str, &str)]) -> Self {
        Self {
            wrapper: None,
            selector: selector.to_string(),
            declarations: declarations
                .iter()
                .map(|(property, value)| Declaration::new(property, value))
                .collect(),
        }
    }
}

pub fn preflight() -> Vec<BaseRule> {
    vec![
        BaseRule::new(
            "*, ::before, ::after",
            &[
                ("box-sizing", "border-box"),
                ("border-width", "0"),
                ("border-style", "solid"),
                ("border-color", "currentColor"),
            ],
        ),
        BaseRule::new(
            "html",
            &[
                ("line-height", "1.5"),
                ("-webkit-text-size-adjust", "100%"),
                ("tab-size", "4"),
                (
                    "font-family",
                    "ui-sans-serif, system-ui, sans-serif, \"Apple Color Emoji\", \"Segoe UI Emoji\"",
                ),
            ],
        ),
        BaseRule::new("body", &[("margin", "0"), ("line-height", "inherit")]),
        BaseRule::new(
            "h1, h2, h3, h4, h5, h6",
            &[("font-size", "inherit"), ("font-weight", "inherit")],
        ),
        BaseRule::new("a", &[("color", "inherit"), ("text-decoration", "inherit")]),
        BaseRule::new(
            "button, input, select, textarea",
            &[
                ("font-family", "inherit"),
                ("font-size", "100%"),
                ("line-height", "inherit"),
                ("color", "inherit"),
                ("margin", "0"),
                ("padding", "0"),
            ],
        ),
        BaseRule::new(
            "blockquote, dl, dd, h1, h2, h3, h4, h5, h6, hr, figure, p, pre",
            &[("margin", "0")],
        ),
        BaseRule::new("ol, ul, menu", &[("list-style", "none"), ("margin", "0"), ("padding", "0")]),
        BaseRule::new(
            "img, svg, video, canvas, audio, iframe, embed, object",
            &[("display", "block"), ("vertical-align", "middle")],
        ),
        BaseRule::new("img, video", &[("max-width", "100%"), ("height", "auto")]),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmitOptions {
    pub minify: bool,
    pub cascade_layers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayeredCss {
    layers: Vec<(Layer, String)>,
    options: EmitOptions,
}

impl LayeredCss {
    pub fn layer(&self, layer: Layer) -> &str {
        self.layers
            .iter()
            .find(|(candidate, _)| *candidate == layer)
            .map(|(_, css)| css.as_str())
            .unwrap_or("")
    }

    fn join(&self, layers: &[Layer]) -> String {
        let mut parts = Vec::new();
        for layer in layers {
            let css = self.layer(*layer);
            if css.is_empty() {
                continue;
            }
            if self.options.cascade_layers {
                parts.push(wrap_layer_block(layer.name(), css, self.options.minify));
            } else {
                parts.push(css.to_string());
            }
        }
        parts.join(self.separator())
    }

    fn separator(&self) -> &'static str {
        if self.options.minify { "" } else { "\n" }
    }

    fn layer_statement(&self) -> Option<String> {
        if !self.options.cascade_layers {
            return None;
        }
        let names = Layer::ALL
            .iter()
            .map(|layer| layer.name())
            .collect::<Vec<_>>();
        let sep = if self.options.minify { "," } else { ", " };
        Some(format!("@layer {};", names.join(sep)))
    }

    pub fn to_css(&self) -> String {
        let body = self.join(&Layer::ALL);
        let mut css = match self.layer_statement() {
            Some(statement) if body.is_empty() => statement,
            Some(statement) => format!("{}{}{}", statement, self.separator(), body),
            None => body,
        };
        if !self.options.minify && !css.is_empty() {
            css.push('\n');
        }
        css
    }

    /// Substitutes `@tailwind base|components|utilities;` directives in an
    /// input stylesheet. `utilities` also receives icons and overrides.
    /// Without any directive the generated CSS is appended.
    pub fn render_template(&self, template: &str) -> String {
        let mut out = Vec::new();
        let mut replaced = false;
        for line in template.lines() {
            let directive = line
                .trim()
                .strip_prefix("@tailwind")
                .map(|rest| rest.trim().trim_end_matches(';').trim());
            let layers: &[Layer] = match directive {
                Some("base") => &[Layer::Base],
                Some("components") => &[Layer::Components],
                Some("utilities") => &[Layer::Utilities, Layer::Icons, Layer::Overrides],
                _ => {
                    out.push(line.to_string());
                    continue;
                }
            };
            if !replaced {
                if let Some(statement) = self.layer_statement() {
                    out.push(statement);
                }
            }
            replaced = true;
            let css = self.join(layers);
            if !css.is_empty() {
                out.push(css);
            }
        }

        if !replaced {
            let generated = self.to_css();
            if generated.is_empty() {
                return template.to_string();
            }
            let mut text = template.trim_end().to_string();
            if !text.is_empty() {
                text.push_str(if self.options.minify { "\n" } else { "\n\n" });
            }
            text.push_str(&generated);
            return text;
        }

        let mut text = out.join("\n");
        if template.ends_with('\n') {
            text.push('\n');
        }
        text
    }
}

pub fn emit(
    base: &[BaseRule],
    utilities: Vec<(String, ResolvedUtility)>,
    options: EmitOptions,
) -> LayeredCss {
    let mut unique: BTreeMap<UtilityKey, (ResolvedUtility, BTreeSet<String>)> = BTreeMap::new();
    for (spelling, utility) in utilities {
        unique
            .entry(utility.key.clone())
            .or_insert_with(|| (utility, BTreeSet::new()))
            .1
            .insert(spelling);
    }

    let mut grouped: BTreeMap<Layer, Vec<(ResolvedUtility, BTreeSet<String>)>> = BTreeMap::new();
    for (_, entry) in unique {
        grouped.entry(entry.0.layer()).or_default().push(entry);
    }

    let mut layers = Vec::with_capacity(Layer::ALL.len());
    for layer in Layer::ALL {
        let mut rules = Vec::new();
        if layer == Layer::Base {
            rules.extend(base.iter().map(|rule| serialize_base_rule(rule, options.minify)));
        }
        if let Some(mut entries) = grouped.remove(&layer) {
            entries.sort_by(|a, b| a.0.sort_key.cmp(&b.0.sort_key));
            rules.extend(
                entries
                    .iter()
                    .map(|(utility, spellings)| serialize_utility(utility, spellings, options.minify)),
            );
        }
        let sep = if options.minify { "" } else { "\n" };
        layers.push((layer, rules.join(sep)));
    }

    LayeredCss { layers, options }
}

fn serialize_base_rule(rule: &BaseRule, minify: bool) -> String {
    let css = format_rule(&rule.selector, &rule.declarations, minify);
    match &rule.wrapper {
        Some(wrapper) => wrap_rule(wrapper, &css, minify),
        None => css,
    }
}

fn serialize_utility(utility: &ResolvedUtility, spellings: &BTreeSet<String>, minify: bool) -> String {
    let sep = if minify { "" } else { "\n" };
    let selector_sep = if minify { "," } else { ", " };
    let css = utility
        .blocks
        .iter()
        .filter(|block| !block.declarations.is_empty())
        .map(|block| {
            let selector = spellings
                .iter()
                .map(|spelling| {
                    let class = format!(".{}{}", escape_selector(spelling), block.selector_suffix);
                    utility.selector.replace(SELF_PLACEHOLDER, &class)
                })
                .collect::<Vec<_>>()
                .join(selector_sep);
            format_rule(&selector, &block.declarations, minify)
        })
        .collect::<Vec<_>>()
        .join(sep);

    utility
        .wrappers
        .iter()
        .rev()
        .fold(css, |inner, wrapper| wrap_rule(wrapper, &inner, minify))
}

fn format_rule(selector: &str, declarations: &[Declaration], minify: bool) -> String {
    if minify {
        let body = declarations
            .iter()
            .map(|decl| format!("{}:{}", decl.property, decl.value))
            .collect::<Vec<_>>()
            .join(";");
        return format!("{}{{{}}}", selector, body);
    }
    let lines = declarations
        .iter()
        .map(|decl| format!("  {}: {};", decl.property, decl.value))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{} {{\n{}\n}}", selector, lines)
}

fn wrap_rule(wrapper: &str, rule: &str, minify: bool) -> String {
    if minify {
        format!("{}{{{}}}", wrapper, rule)
    } else {
        format!("{} {{\n{}\n}}", wrapper, indent_css_block(rule, 2))
    }
}

fn wrap_layer_block(layer: &str, css: &str, minify: bool) -> String {
    let content = css.trim();
    if minify {
        format!("@layer {}{{{}}}", layer, content)
    } else {
        format!("@layer {} {{\n{}\n}}", layer, indent_css_block(content, 2))
    }
}

fn indent_css_block(css: &str, spaces: usize) -> String {
    let padding = " ".repeat(spaces);
    css.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", padding, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn escape_selector(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() * 2);
    for (idx, ch) in class.chars().enumerate() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ':' | '/' | '[' | ']' | '(' | ')' | '&' | '>' | '+' | ',' | '%' | '=' | '!' | '*'
            | '@' | '#' | '\'' | '"' | '.' | '~' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '0'..='9' if idx == 0 => {
                escaped.push_str(&format!("\\3{} ", ch));
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}
