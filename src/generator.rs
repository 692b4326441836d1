use crate::registry::{
    ArbitraryKind, Declaration, DeclarationBlock, Layer, Pattern, RegistryBuilder, RuleSource,
    RuleTemplate, VALUE_PLACEHOLDER, ValueSpec,
};
use crate::theme::ScaleKind;

#[derive(Debug, Clone, Copy)]
pub struct Family {
    pub family: &'static str,
    pub prefix: &'static str,
    pub scale: ScaleKind,
    pub properties: &'static [&'static str],
    pub arbitrary: Option<ArbitraryKind>,
    pub negatable: bool,
}

const fn family(
    family: &'static str,
    prefix: &'static str,
    scale: ScaleKind,
    properties: &'static [&'static str],
    arbitrary: Option<ArbitraryKind>,
    negatable: bool,
) -> Family {
    Family {
        family,
        prefix,
        scale,
        properties,
        arbitrary,
        negatable,
    }
}

const LENGTH: Option<ArbitraryKind> = Some(ArbitraryKind::Length);
const COLOR: Option<ArbitraryKind> = Some(ArbitraryKind::Color);
const ANY: Option<ArbitraryKind> = Some(ArbitraryKind::Any);

pub const FAMILIES: &[Family] = &[
    family("padding", "p", ScaleKind::Spacing, &["padding"], LENGTH, false),
    family("padding-x", "px", ScaleKind::Spacing, &["padding-left", "padding-right"], LENGTH, false),
    family("padding-y", "py", ScaleKind::Spacing, &["padding-top", "padding-bottom"], LENGTH, false),
    family("padding-top", "pt", ScaleKind::Spacing, &["padding-top"], LENGTH, false),
    family("padding-right", "pr", ScaleKind::Spacing, &["padding-right"], LENGTH, false),
    family("padding-bottom", "pb", ScaleKind::Spacing, &["padding-bottom"], LENGTH, false),
    family("padding-left", "pl", ScaleKind::Spacing, &["padding-left"], LENGTH, false),
    family("margin", "m", ScaleKind::Margin, &["margin"], LENGTH, true),
    family("margin-x", "mx", ScaleKind::Margin, &["margin-left", "margin-right"], LENGTH, true),
    family("margin-y", "my", ScaleKind::Margin, &["margin-top", "margin-bottom"], LENGTH, true),
    family("margin-top", "mt", ScaleKind::Margin, &["margin-top"], LENGTH, true),
    family("margin-right", "mr", ScaleKind::Margin, &["margin-right"], LENGTH, true),
    family("margin-bottom", "mb", ScaleKind::Margin, &["margin-bottom"], LENGTH, true),
    family("margin-left", "ml", ScaleKind::Margin, &["margin-left"], LENGTH, true),
    family("gap", "gap", ScaleKind::Spacing, &["gap"], LENGTH, false),
    family("column-gap", "gap-x", ScaleKind::Spacing, &["column-gap"], LENGTH, false),
    family("row-gap", "gap-y", ScaleKind::Spacing, &["row-gap"], LENGTH, false),
    family("width", "w", ScaleKind::Sizing, &["width"], LENGTH, false),
    family("height", "h", ScaleKind::Sizing, &["height"], LENGTH, false),
    family("size", "size", ScaleKind::Sizing, &["width", "height"], LENGTH, false),
    family("min-width", "min-w", ScaleKind::Sizing, &["min-width"], LENGTH, false),
    family("min-height", "min-h", ScaleKind::Sizing, &["min-height"], LENGTH, false),
    family("inset", "inset", ScaleKind::Margin, &["inset"], LENGTH, true),
    family("top", "top", ScaleKind::Margin, &["top"], LENGTH, true),
    family("right", "right", ScaleKind::Margin, &["right"], LENGTH, true),
    family("bottom", "bottom", ScaleKind::Margin, &["bottom"], LENGTH, true),
    family("left", "left", ScaleKind::Margin, &["left"], LENGTH, true),
    family("text-color", "text", ScaleKind::Colors, &["color"], COLOR, false),
    family("font-size", "text", ScaleKind::FontSize, &["font-size"], LENGTH, false),
    family("background-color", "bg", ScaleKind::Colors, &["background-color"], COLOR, false),
    family("border-color", "border", ScaleKind::Colors, &["border-color"], COLOR, false),
    family("border-width", "border", ScaleKind::BorderWidth, &["border-width"], LENGTH, false),
    family("border-radius", "rounded", ScaleKind::BorderRadius, &["border-radius"], LENGTH, false),
    family("font-family", "font", ScaleKind::FontFamily, &["font-family"], ANY, false),
    family("line-height", "leading", ScaleKind::LineHeight, &["line-height"], LENGTH, false),
    family("opacity", "opacity", ScaleKind::Opacity, &["opacity"], ANY, false),
    family("z-index", "z", ScaleKind::ZIndex, &["z-index"], ANY, true),
];

type StaticUtility = (&'static str, &'static [(&'static str, &'static str)]);

const STATIC_UTILITIES: &[StaticUtility] = &[
    ("block", &[("display", "block")]),
    ("inline-block", &[("display", "inline-block")]),
    ("inline", &[("display", "inline")]),
    ("flex", &[("display", "flex")]),
    ("inline-flex", &[("display", "inline-flex")]),
    ("grid", &[("display", "grid")]),
    ("contents", &[("display", "contents")]),
    ("hidden", &[("display", "none")]),
    ("static", &[("position", "static")]),
    ("fixed", &[("position", "fixed")]),
    ("absolute", &[("position", "absolute")]),
    ("relative", &[("position", "relative")]),
    ("sticky", &[("position", "sticky")]),
    ("flex-row", &[("flex-direction", "row")]),
    ("flex-col", &[("flex-direction", "column")]),
    ("flex-wrap", &[("flex-wrap", "wrap")]),
    ("flex-1", &[("flex", "1 1 0%")]),
    ("flex-auto", &[("flex", "1 1 auto")]),
    ("flex-none", &[("flex", "none")]),
    ("grow", &[("flex-grow", "1")]),
    ("shrink-0", &[("flex-shrink", "0")]),
    ("items-start", &[("align-items", "flex-start")]),
    ("items-center", &[("align-items", "center")]),
    ("items-end", &[("align-items", "flex-end")]),
    ("items-stretch", &[("align-items", "stretch")]),
    ("justify-start", &[("justify-content", "flex-start")]),
    ("justify-center", &[("justify-content", "center")]),
    ("justify-end", &[("justify-content", "flex-end")]),
    ("justify-between", &[("justify-content", "space-between")]),
    ("w-screen", &[("width", "100vw")]),
    ("h-screen", &[("height", "100vh")]),
    ("min-h-screen", &[("min-height", "100vh")]),
    ("text-left", &[("text-align", "left")]),
    ("text-center", &[("text-align", "center")]),
    ("text-right", &[("text-align", "right")]),
    ("text-justify", &[("text-align", "justify")]),
    ("font-thin", &[("font-weight", "100")]),
    ("font-light", &[("font-weight", "300")]),
    ("font-normal", &[("font-weight", "400")]),
    ("font-medium", &[("font-weight", "500")]),
    ("font-semibold", &[("font-weight", "600")]),
    ("font-bold", &[("font-weight", "700")]),
    ("font-extrabold", &[("font-weight", "800")]),
    ("italic", &[("font-style", "italic")]),
    ("not-italic", &[("font-style", "normal")]),
    ("underline", &[("text-decoration-line", "underline")]),
    ("line-through", &[("text-decoration-line", "line-through")]),
    ("no-underline", &[("text-decoration-line", "none")]),
    ("uppercase", &[("text-transform", "uppercase")]),
    ("lowercase", &[("text-transform", "lowercase")]),
    ("capitalize", &[("text-transform", "capitalize")]),
    (
        "truncate",
        &[
            ("overflow", "hidden"),
            ("text-overflow", "ellipsis"),
            ("white-space", "nowrap"),
        ],
    ),
    ("whitespace-nowrap", &[("white-space", "nowrap")]),
    ("overflow-hidden", &[("overflow", "hidden")]),
    ("overflow-auto", &[("overflow", "auto")]),
    ("overflow-x-auto", &[("overflow-x", "auto")]),
    ("overflow-y-auto", &[("overflow-y", "auto")]),
    ("cursor-pointer", &[("cursor", "pointer")]),
    ("cursor-not-allowed", &[("cursor", "not-allowed")]),
    ("select-none", &[("user-select", "none")]),
    ("pointer-events-none", &[("pointer-events", "none")]),
    ("border-solid", &[("border-style", "solid")]),
    ("border-dashed", &[("border-style", "dashed")]),
    (
        "shadow-sm",
        &[("box-shadow", "0 1px 2px 0 rgb(0 0 0 / 0.05)")],
    ),
    (
        "shadow",
        &[(
            "box-shadow",
            "0 1px 3px 0 rgb(0 0 0 / 0.1), 0 1px 2px -1px rgb(0 0 0 / 0.1)",
        )],
    ),
    (
        "shadow-md",
        &[(
            "box-shadow",
            "0 4px 6px -1px rgb(0 0 0 / 0.1), 0 2px 4px -2px rgb(0 0 0 / 0.1)",
        )],
    ),
    (
        "shadow-lg",
        &[(
            "box-shadow",
            "0 10px 15px -3px rgb(0 0 0 / 0.1), 0 4px 6px -4px rgb(0 0 0 / 0.1)",
        )],
    ),
    ("shadow-none", &[("box-shadow", "0 0 #0000")]),
    (
        "transition",
        &[
            (
                "transition-property",
                "color, background-color, border-color, text-decoration-color, fill, stroke, opacity, box-shadow, transform, filter",
            ),
            ("transition-timing-function", "cubic-bezier(0.4, 0, 0.2, 1)"),
            ("transition-duration", "150ms"),
        ],
    ),
    (
        "sr-only",
        &[
            ("position", "absolute"),
            ("width", "1px"),
            ("height", "1px"),
            ("padding", "0"),
            ("margin", "-1px"),
            ("overflow", "hidden"),
            ("clip", "rect(0, 0, 0, 0)"),
            ("white-space", "nowrap"),
            ("border-width", "0"),
        ],
    ),
];

pub fn register_core_rules(builder: &mut RegistryBuilder) {
    for (token, declarations) in STATIC_UTILITIES {
        builder.register(
            RuleSource::Core,
            Pattern::exact(token),
            RuleTemplate::new(Layer::Utilities, declarations),
        );
    }

    for family in FAMILIES {
        let mut values = ValueSpec::scale(family.scale.default_scale());
        if let Some(kind) = family.arbitrary {
            values = values.with_arbitrary(kind);
        }
        if family.negatable {
            values = values.negatable();
        }
        if family.scale == ScaleKind::Colors {
            values = values.with_opacity_modifier();
        }
        builder.register(
            RuleSource::Core,
            Pattern::functional(family.family, family.prefix, values),
            functional_template(family.properties),
        );
    }
}

pub(crate) fn functional_template(properties: &[&str]) -> RuleTemplate {
    RuleTemplate {
        layer: Layer::Utilities,
        blocks: vec![DeclarationBlock {
            selector_suffix: String::new(),
            declarations: properties
                .iter()
                .map(|property| Declaration::new(property, VALUE_PLACEHOLDER))
                .collect(),
        }],
    }
}
