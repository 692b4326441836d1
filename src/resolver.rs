use std::sync::Arc;

use crate::candidate::Candidate;
use crate::config::DarkModeStrategy;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::registry::{DeclarationBlock, Layer, Registry, Rule};

pub const SELF_PLACEHOLDER: char = '&';

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariantKind {
    State,
    Structural,
    Responsive,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Shape {
    Suffix(&'static str),
    PseudoElement(&'static str),
    Ancestor(&'static str),
    Arbitrary(String),
    MinWidth(String),
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Variant {
    kind: VariantKind,
    rank: usize,
    name: String,
    shape: Shape,
}

const STATE_VARIANTS: &[(&str, &str)] = &[
    ("hover", ":hover"),
    ("focus-within", ":focus-within"),
    ("focus", ":focus"),
    ("focus-visible", ":focus-visible"),
    ("active", ":active"),
    ("visited", ":visited"),
    ("target", ":target"),
    ("checked", ":checked"),
    ("indeterminate", ":indeterminate"),
    ("required", ":required"),
    ("valid", ":valid"),
    ("invalid", ":invalid"),
    ("placeholder-shown", ":placeholder-shown"),
    ("read-only", ":read-only"),
    ("enabled", ":enabled"),
    ("disabled", ":disabled"),
];

const GROUP_VARIANTS: &[(&str, &str)] = &[
    ("group-hover", ".group:hover"),
    ("group-focus", ".group:focus"),
    ("group-active", ".group:active"),
    ("peer-hover", ".peer:hover ~"),
    ("peer-focus", ".peer:focus ~"),
    ("peer-checked", ".peer:checked ~"),
    ("peer-invalid", ".peer:invalid ~"),
];

const STRUCTURAL_VARIANTS: &[(&str, &str)] = &[
    ("first", ":first-child"),
    ("last", ":last-child"),
    ("only", ":only-child"),
    ("odd", ":nth-child(odd)"),
    ("even", ":nth-child(even)"),
    ("first-of-type", ":first-of-type"),
    ("last-of-type", ":last-of-type"),
    ("empty", ":empty"),
];

const PSEUDO_ELEMENTS: &[(&str, &str)] = &[
    ("before", "::before"),
    ("after", "::after"),
    ("placeholder", "::placeholder"),
    ("selection", "::selection"),
    ("marker", "::marker"),
    ("file", "::file-selector-button"),
    ("first-letter", "::first-letter"),
    ("first-line", "::first-line"),
    ("backdrop", "::backdrop"),
];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtilityKey {
    pub base: String,
    pub variants: Vec<String>,
    pub important: bool,
}

impl UtilityKey {
    pub fn canonical_name(&self) -> String {
        let mut name = String::new();
        for variant in &self.variants {
            name.push_str(variant);
            name.push(':');
        }
        if self.important {
            name.push('!');
        }
        name.push_str(&self.base);
        name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey {
    /// 0 without a breakpoint, otherwise 1 + the breakpoint's index.
    pub breakpoint: usize,
    pub dark: bool,
    pub variant_count: usize,
    pub ordinal: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUtility {
    pub key: UtilityKey,
    pub rule: Arc<Rule>,
    pub selector: String,
    pub wrappers: Vec<String>,
    pub blocks: Vec<DeclarationBlock>,
    pub sort_key: SortKey,
}

impl ResolvedUtility {
    /// Important utilities move to the overrides layer.
    pub fn layer(&self) -> Layer {
        match self.rule.layer() {
            Layer::Utilities if self.key.important => Layer::Overrides,
            layer => layer,
        }
    }
}

pub struct Resolver<'a> {
    registry: &'a Registry,
    screens: Vec<(String, String)>,
    dark_mode: DarkModeStrategy,
}

impl<'a> Resolver<'a> {
    pub fn new(
        registry: &'a Registry,
        screens: Vec<(String, String)>,
        dark_mode: DarkModeStrategy,
    ) -> Self {
        Self {
            registry,
            screens,
            dark_mode,
        }
    }

    pub fn resolve(&self, candidate: &Candidate, sink: &DiagnosticSink) -> Option<ResolvedUtility> {
        let mut variants = candidate
            .variants
            .iter()
            .map(|name| self.classify(name))
            .collect::<Option<Vec<_>>>()?;
        variants.sort_by(|a, b| {
            (a.kind, a.rank, &a.name).cmp(&(b.kind, b.rank, &b.name))
        });

        let hit = self.registry.lookup(&candidate.base, sink)?;

        if let Some(conflict) = find_conflict(&variants) {
            sink.record(Diagnostic::ConflictingVariants {
                candidate: candidate.raw.clone(),
                variants: conflict,
            });
            return None;
        }

        let mut selector = SELF_PLACEHOLDER.to_string();
        let mut wrappers = Vec::new();
        let mut breakpoint = 0;
        let mut dark = false;
        for variant in &variants {
            match &variant.shape {
                Shape::Suffix(suffix) | Shape::PseudoElement(suffix) => selector.push_str(suffix),
                Shape::Ancestor(ancestor) => selector = format!("{} {}", ancestor, selector),
                Shape::Arbitrary(template) => {
                    selector = template.replace(SELF_PLACEHOLDER, &selector);
                }
                Shape::MinWidth(width) => {
                    breakpoint = variant.rank + 1;
                    wrappers.push(format!("@media (min-width: {})", width));
                }
                Shape::Dark => {
                    dark = true;
                    match self.dark_mode {
                        DarkModeStrategy::Class => selector = format!(".dark {}", selector),
                        DarkModeStrategy::Media => {
                            wrappers.push("@media (prefers-color-scheme: dark)".to_string())
                        }
                    }
                }
            }
        }

        let mut blocks = hit.blocks();
        if candidate.important {
            for block in &mut blocks {
                for decl in &mut block.declarations {
                    decl.value.push_str(" !important");
                }
            }
        }

        let key = UtilityKey {
            base: candidate.base.clone(),
            variants: variants.iter().map(|variant| variant.name.clone()).collect(),
            important: candidate.important,
        };
        let sort_key = SortKey {
            breakpoint,
            dark,
            variant_count: variants.len(),
            ordinal: hit.rule.ordinal,
            name: key.canonical_name(),
        };
        Some(ResolvedUtility {
            key,
            rule: hit.rule,
            selector,
            wrappers,
            blocks,
            sort_key,
        })
    }

    fn classify(&self, name: &str) -> Option<Variant> {
        let variant = |kind, rank, shape| Variant {
            kind,
            rank,
            name: name.to_string(),
            shape,
        };

        if name == "dark" {
            return Some(variant(VariantKind::Dark, 0, Shape::Dark));
        }
        if let Some(idx) = self.screens.iter().position(|(screen, _)| screen == name) {
            let width = self.screens[idx].1.clone();
            return Some(variant(VariantKind::Responsive, idx, Shape::MinWidth(width)));
        }
        if let Some(idx) = STATE_VARIANTS.iter().position(|(state, _)| *state == name) {
            let suffix = STATE_VARIANTS[idx].1;
            return Some(variant(VariantKind::State, idx, Shape::Suffix(suffix)));
        }
        if let Some(idx) = GROUP_VARIANTS.iter().position(|(group, _)| *group == name) {
            let ancestor = GROUP_VARIANTS[idx].1;
            let rank = STATE_VARIANTS.len() + idx;
            return Some(variant(VariantKind::State, rank, Shape::Ancestor(ancestor)));
        }
        if let Some(idx) = STRUCTURAL_VARIANTS.iter().position(|(s, _)| *s == name) {
            let suffix = STRUCTURAL_VARIANTS[idx].1;
            return Some(variant(VariantKind::Structural, idx, Shape::Suffix(suffix)));
        }
        if let Some(inner) = name.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            let template = decode_arbitrary_selector(inner)?;
            let rank = STRUCTURAL_VARIANTS.len();
            return Some(variant(
                VariantKind::Structural,
                rank,
                Shape::Arbitrary(template),
            ));
        }
        if let Some(idx) = PSEUDO_ELEMENTS.iter().position(|(p, _)| *p == name) {
            let suffix = PSEUDO_ELEMENTS[idx].1;
            let rank = STRUCTURAL_VARIANTS.len() + 1 + idx;
            return Some(variant(
                VariantKind::Structural,
                rank,
                Shape::PseudoElement(suffix),
            ));
        }
        None
    }
}

fn find_conflict(variants: &[Variant]) -> Option<Vec<String>> {
    for pair in variants.windows(2) {
        if pair[0].name == pair[1].name {
            return Some(vec![pair[0].name.clone(), pair[1].name.clone()]);
        }
    }

    let exclusive = |pick: fn(&Variant) -> bool| {
        let names = variants
            .iter()
            .filter(|variant| pick(variant))
            .map(|variant| variant.name.clone())
            .collect::<Vec<_>>();
        (names.len() > 1).then_some(names)
    };
    exclusive(|variant: &Variant| variant.kind == VariantKind::Responsive).or_else(|| {
        exclusive(|variant: &Variant| matches!(variant.shape, Shape::PseudoElement(_)))
    })
}

fn decode_arbitrary_selector(inner: &str) -> Option<String> {
    if !inner.contains(SELF_PLACEHOLDER) || inner.contains(['{', '}', ';', '@']) {
        return None;
    }
    let mut selector = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'_') => {
                selector.push('_');
                chars.next();
            }
            '_' => selector.push(' '),
            _ => selector.push(ch),
        }
    }
    Some(selector)
}
