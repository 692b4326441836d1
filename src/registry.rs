use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::icons::{IconClaim, IconRuleGenerator};

pub const VALUE_PLACEHOLDER: &str = "{value}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleSource {
    Core,
    ComponentPlugin,
    IconPlugin,
    ThemeExtension,
}

impl RuleSource {
    pub fn precedence(self) -> u8 {
        match self {
            Self::Core => 0,
            Self::ComponentPlugin => 1,
            Self::IconPlugin => 2,
            Self::ThemeExtension => 3,
        }
    }
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Core => "core",
            Self::ComponentPlugin => "component plugin",
            Self::IconPlugin => "icon plugin",
            Self::ThemeExtension => "theme extension",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Base,
    Components,
    Utilities,
    Icons,
    Overrides,
}

impl Layer {
    pub const ALL: [Layer; 5] = [
        Layer::Base,
        Layer::Components,
        Layer::Utilities,
        Layer::Icons,
        Layer::Overrides,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Components => "components",
            Self::Utilities => "utilities",
            Self::Icons => "icons",
            Self::Overrides => "overrides",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            property: property.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclarationBlock {
    pub selector_suffix: String,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArbitraryKind {
    Any,
    Length,
    Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueSpec {
    pub scale: BTreeMap<String, String>,
    pub arbitrary: Option<ArbitraryKind>,
    pub negatable: bool,
    pub opacity_modifier: bool,
}

impl ValueSpec {
    pub fn scale(scale: BTreeMap<String, String>) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    pub fn with_arbitrary(mut self, kind: ArbitraryKind) -> Self {
        self.arbitrary = Some(kind);
        self
    }

    pub fn negatable(mut self) -> Self {
        self.negatable = true;
        self
    }

    pub fn with_opacity_modifier(mut self) -> Self {
        self.opacity_modifier = true;
        self
    }

    fn resolve(&self, raw: &str, negative: bool) -> Option<String> {
        if negative && !self.negatable {
            return None;
        }
        let value = self.resolve_positive(raw)?;
        if negative {
            return Some(format!("calc({} * -1)", value));
        }
        Some(value)
    }

    fn resolve_positive(&self, raw: &str) -> Option<String> {
        if let Some(value) = self.scale.get(raw) {
            return Some(value.clone());
        }
        if let Some(inner) = raw.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            let kind = self.arbitrary?;
            let value = decode_arbitrary_value(inner)?;
            return arbitrary_matches(kind, &value).then_some(value);
        }
        if self.opacity_modifier {
            let (color, alpha) = raw.rsplit_once('/')?;
            let color = self.scale.get(color)?;
            let alpha = alpha.parse::<u8>().ok().filter(|alpha| *alpha <= 100)?;
            return Some(format!(
                "color-mix(in srgb, {} {}%, transparent)",
                color, alpha
            ));
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Exact(String),
    /// Matches `<prefix>-<value>` (or the bare prefix for `DEFAULT`).
    /// `family` names the slot so several families may share a prefix.
    Functional {
        family: String,
        prefix: String,
        values: ValueSpec,
    },
}

impl Pattern {
    pub fn exact(token: &str) -> Self {
        Self::Exact(token.to_string())
    }

    pub fn functional(family: &str, prefix: &str, values: ValueSpec) -> Self {
        Self::Functional {
            family: family.to_string(),
            prefix: prefix.to_string(),
            values,
        }
    }

    pub fn key(&self) -> String {
        match self {
            Self::Exact(token) => token.clone(),
            Self::Functional { family, .. } => format!("{}-*", family),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTemplate {
    pub layer: Layer,
    pub blocks: Vec<DeclarationBlock>,
}

impl RuleTemplate {
    pub fn new(layer: Layer, declarations: &[(&str, &str)]) -> Self {
        Self {
            layer,
            blocks: vec![DeclarationBlock {
                selector_suffix: String::new(),
                declarations: declarations
                    .iter()
                    .map(|(property, value)| Declaration::new(property, value))
                    .collect(),
            }],
        }
    }

    pub fn with_block(mut self, selector_suffix: &str, declarations: &[(&str, &str)]) -> Self {
        self.blocks.push(DeclarationBlock {
            selector_suffix: selector_suffix.to_string(),
            declarations: declarations
                .iter()
                .map(|(property, value)| Declaration::new(property, value))
                .collect(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: Pattern,
    pub source: RuleSource,
    pub ordinal: u32,
    pub template: RuleTemplate,
}

impl Rule {
    pub fn layer(&self) -> Layer {
        self.template.layer
    }

    pub fn instantiate(&self, value: Option<&str>) -> Vec<DeclarationBlock> {
        self.template
            .blocks
            .iter()
            .map(|block| DeclarationBlock {
                selector_suffix: block.selector_suffix.clone(),
                declarations: block
                    .declarations
                    .iter()
                    .map(|decl| Declaration {
                        property: decl.property.clone(),
                        value: match value {
                            Some(value) => decl.value.replace(VALUE_PLACEHOLDER, value),
                            None => decl.value.clone(),
                        },
                    })
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: Arc<Rule>,
    pub value: Option<String>,
}

impl RuleMatch {
    pub fn blocks(&self) -> Vec<DeclarationBlock> {
        self.rule.instantiate(self.value.as_deref())
    }
}

pub struct RegistryBuilder {
    exact: HashMap<String, Arc<Rule>>,
    functional: Vec<Arc<Rule>>,
    functional_slots: HashMap<String, usize>,
    next_ordinal: u32,
    notices: Vec<Diagnostic>,
    icons: Option<IconRuleGenerator>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            exact: HashMap::new(),
            functional: Vec::new(),
            functional_slots: HashMap::new(),
            next_ordinal: 0,
            notices: Vec::new(),
            icons: None,
        }
    }

    pub fn register(&mut self, source: RuleSource, pattern: Pattern, template: RuleTemplate) {
        self.register_with(source, pattern, template, None);
    }

    /// Like [`register`](Self::register), but a new exact token takes the
    /// ordinal of functional `family`'s slot when that family exists.
    pub fn register_within(
        &mut self,
        family: &str,
        source: RuleSource,
        pattern: Pattern,
        template: RuleTemplate,
    ) {
        let slot_ordinal = self
            .functional_slots
            .get(&format!("{}-*", family))
            .map(|slot| self.functional[*slot].ordinal);
        self.register_with(source, pattern, template, slot_ordinal);
    }

    fn register_with(
        &mut self,
        source: RuleSource,
        pattern: Pattern,
        template: RuleTemplate,
        slot_ordinal: Option<u32>,
    ) {
        let key = pattern.key();
        match &pattern {
            Pattern::Exact(token) => {
                let token = token.clone();
                let existing = self.exact.get(&token).map(|rule| (rule.source, rule.ordinal));
                let ordinal = match existing {
                    Some((existing_source, ordinal)) => {
                        if !self.contest(&key, existing_source, source) {
                            return;
                        }
                        ordinal
                    }
                    None => match slot_ordinal {
                        Some(ordinal) => ordinal,
                        None => self.take_ordinal(),
                    },
                };
                self.exact.insert(
                    token,
                    Arc::new(Rule {
                        pattern,
                        source,
                        ordinal,
                        template,
                    }),
                );
            }
            Pattern::Functional { .. } => match self.functional_slots.get(&key).copied() {
                Some(slot) => {
                    let existing_source = self.functional[slot].source;
                    let ordinal = self.functional[slot].ordinal;
                    if !self.contest(&key, existing_source, source) {
                        return;
                    }
                    self.functional[slot] = Arc::new(Rule {
                        pattern,
                        source,
                        ordinal,
                        template,
                    });
                }
                None => {
                    let ordinal = self.take_ordinal();
                    self.functional_slots.insert(key, self.functional.len());
                    self.functional.push(Arc::new(Rule {
                        pattern,
                        source,
                        ordinal,
                        template,
                    }));
                }
            },
        }
    }

    pub fn with_icons(&mut self, icons: IconRuleGenerator) {
        self.icons = Some(icons);
    }

    pub fn build(mut self) -> Registry {
        self.functional
            .sort_by_key(|rule| std::cmp::Reverse(rule.source.precedence()));
        tracing::debug!(
            exact = self.exact.len(),
            functional = self.functional.len(),
            overrides = self.notices.len(),
            "rule registry built"
        );
        Registry {
            exact: self.exact,
            functional: self.functional,
            icons: self.icons,
            notices: self.notices,
        }
    }

    fn take_ordinal(&mut self) -> u32 {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        ordinal
    }

    /// Returns true when `incoming` replaces `existing`. Ties go to the later
    /// registration.
    fn contest(&mut self, key: &str, existing: RuleSource, incoming: RuleSource) -> bool {
        let replace = incoming.precedence() >= existing.precedence();
        let (winner, loser) = if replace {
            (incoming, existing)
        } else {
            (existing, incoming)
        };
        self.notices.push(Diagnostic::RuleOverride {
            pattern: key.to_string(),
            winner,
            loser,
        });
        replace
    }
}

pub struct Registry {
    exact: HashMap<String, Arc<Rule>>,
    functional: Vec<Arc<Rule>>,
    icons: Option<IconRuleGenerator>,
    notices: Vec<Diagnostic>,
}

impl Registry {
    /// Exact match, then icon generation, then functional rules by source
    /// precedence and registration order.
    pub fn lookup(&self, base: &str, sink: &DiagnosticSink) -> Option<RuleMatch> {
        if let Some(rule) = self.exact.get(base) {
            return Some(RuleMatch {
                rule: Arc::clone(rule),
                value: None,
            });
        }

        if let Some(icons) = &self.icons {
            match icons.claim(base, sink) {
                IconClaim::Resolved(rule) => return Some(RuleMatch { rule, value: None }),
                IconClaim::Unresolved => return None,
                IconClaim::NotIcon => {}
            }
        }

        let (negative, unsigned) = match base.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, base),
        };
        self.functional.iter().find_map(|rule| {
            let Pattern::Functional { prefix, values, .. } = &rule.pattern else {
                return None;
            };
            let key = functional_value_key(unsigned, prefix)?;
            let value = values.resolve(key, negative)?;
            Some(RuleMatch {
                rule: Arc::clone(rule),
                value: Some(value),
            })
        })
    }

    pub fn override_notices(&self) -> &[Diagnostic] {
        &self.notices
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.functional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn functional_value_key<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = token.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some("DEFAULT");
    }
    let key = rest.strip_prefix('-')?;
    (!key.is_empty()).then_some(key)
}

fn decode_arbitrary_value(inner: &str) -> Option<String> {
    if inner.trim().is_empty() {
        return None;
    }
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'_') => {
                value.push('_');
                chars.next();
            }
            '_' => value.push(' '),
            _ => value.push(ch),
        }
    }
    if value.contains(['{', '}', ';']) {
        return None;
    }
    Some(value)
}

fn arbitrary_matches(kind: ArbitraryKind, value: &str) -> bool {
    match kind {
        ArbitraryKind::Any => true,
        ArbitraryKind::Color => is_color_like_value(value),
        ArbitraryKind::Length => !is_color_like_value(value),
    }
}

pub(crate) fn is_color_like_value(raw: &str) -> bool {
    let value = raw.trim().to_ascii_lowercase();
    value.starts_with('#')
        || value.starts_with("rgb(")
        || value.starts_with("rgba(")
        || value.starts_with("hsl(")
        || value.starts_with("hsla(")
        || value.starts_with("oklch(")
        || value.starts_with("oklab(")
        || value.starts_with("color-mix(")
        || value.starts_with("color:")
        || matches!(
            value.as_str(),
            "transparent" | "currentcolor" | "black" | "white" | "inherit"
        )
}
