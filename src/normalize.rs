// attendance-record: rich-text HTML normalizer
//
// Rewrites editor HTML into a print-safe form before rasterization:
// images are constrained to the page width, paragraph spacing is made uniform,
// and the content always sits under one rich-text container.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::{RenderConfig, DEFAULT_PARAGRAPH_SPACING_PX, DEFAULT_WRAPPER_CLASS};

static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<img\b([^>]*)>").unwrap());

/// `<p>` and `<p ...>` only; `<pre>`, `<param>` and friends are left alone.
static P_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<p(\s[^>]*)?>").unwrap());

static STYLE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(^|\s)style\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static DIV_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<(/?)div\b([^>]*)>").unwrap());

static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(?:^|\s)class\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

const VERTICAL_MARGIN_PROPERTIES: [&str; 5] = [
    "margin-top",
    "margin-bottom",
    "margin-block",
    "margin-block-start",
    "margin-block-end",
];

const IMG_MAX_WIDTH: &str = "max-width: 100%";
const IMG_HEIGHT: &str = "height: auto";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlNormalizer {
    wrapper_class: String,
    paragraph_spacing_px: u32,
}

impl Default for HtmlNormalizer {
    fn default() -> Self {
        Self {
            wrapper_class: DEFAULT_WRAPPER_CLASS.to_string(),
            paragraph_spacing_px: DEFAULT_PARAGRAPH_SPACING_PX,
        }
    }
}

impl From<&RenderConfig> for HtmlNormalizer {
    fn from(config: &RenderConfig) -> Self {
        Self {
            wrapper_class: config.wrapper_class.clone(),
            paragraph_spacing_px: config.paragraph_spacing_px,
        }
    }
}

/// Normalize with the default wrapper class and paragraph spacing.
pub fn normalize(raw_html: &str) -> String {
    HtmlNormalizer::default().normalize(raw_html)
}

impl HtmlNormalizer {
    /// Pure and idempotent: `normalize(normalize(x)) == normalize(x)`.
    pub fn normalize(&self, raw_html: &str) -> String {
        let with_images = IMG_TAG.replace_all(raw_html, |caps: &Captures| {
            normalize_img(caps.get(1).map_or("", |m| m.as_str()))
        });

        let with_paragraphs = P_TAG.replace_all(&with_images, |caps: &Captures| {
            self.normalize_paragraph(caps.get(1).map_or("", |m| m.as_str()))
        });

        if self.is_wrapped(&with_paragraphs) {
            with_paragraphs.into_owned()
        } else {
            format!(
                r#"<div class="{}">{}</div>"#,
                self.wrapper_class, with_paragraphs
            )
        }
    }

    fn normalize_paragraph(&self, attrs: &str) -> String {
        let spacing = [
            "margin-top: 0".to_string(),
            format!("margin-bottom: {}px", self.paragraph_spacing_px),
        ];
        let attrs = rewrite_style(attrs, |decls| {
            for decl in std::mem::take(decls) {
                match property_name(&decl).as_str() {
                    "margin" => decls.extend(horizontal_margins(&decl)),
                    name if VERTICAL_MARGIN_PROPERTIES.contains(&name) => {}
                    _ => decls.push(decl),
                }
            }
            decls.extend(spacing.iter().cloned());
        });
        format!("<p{}>", attrs)
    }

    /// True when the fragment opens with a container carrying the wrapper
    /// class. Only the leading tag is checked, so unbalanced markup stays
    /// wrapped once.
    fn is_wrapped(&self, html: &str) -> bool {
        let Some(caps) = DIV_TAG.captures(html.trim_start()) else {
            return false;
        };
        let at_start = caps.get(0).is_some_and(|tag| tag.start() == 0);
        let opening = caps.get(1).is_some_and(|m| m.as_str().is_empty());
        at_start && opening && has_class(caps.get(2).map_or("", |m| m.as_str()), &self.wrapper_class)
    }
}

fn normalize_img(attrs: &str) -> String {
    let (attrs, self_closing) = match attrs.trim_end().strip_suffix('/') {
        Some(rest) => (rest.trim_end(), true),
        None => (attrs, false),
    };

    let attrs = rewrite_style(attrs, |decls| {
        let names: Vec<String> = decls.iter().map(|d| property_name(d)).collect();
        let constrains_width = names.iter().any(|n| n == "width" || n == "max-width");
        let constrains_height = names.iter().any(|n| n == "height" || n == "max-height");
        if !constrains_width {
            decls.push(IMG_MAX_WIDTH.to_string());
        }
        if !constrains_height {
            decls.push(IMG_HEIGHT.to_string());
        }
    });

    if self_closing {
        format!("<img{} />", attrs)
    } else {
        format!("<img{}>", attrs)
    }
}

/// Left and right components of a `margin` shorthand, as longhands in
/// place of the shorthand. Values with functions are not expanded.
fn horizontal_margins(declaration: &str) -> Vec<String> {
    let value = declaration.split_once(':').map_or("", |(_, v)| v.trim());
    let (value, priority) = match value.strip_suffix("!important") {
        Some(v) => (v.trim_end(), " !important"),
        None => (value, ""),
    };
    if value.contains('(') {
        return Vec::new();
    }
    let parts: Vec<&str> = value.split_whitespace().collect();
    let (right, left) = match parts.as_slice() {
        [all] => (*all, *all),
        [_, h] | [_, h, _] => (*h, *h),
        [_, r, _, l] => (*r, *l),
        _ => return Vec::new(),
    };
    vec![
        format!("margin-right: {right}{priority}"),
        format!("margin-left: {left}{priority}"),
    ]
}

/// Apply `edit` to the inline style declarations of a tag's attribute string,
/// adding a `style` attribute when there is none.
fn rewrite_style<F>(attrs: &str, edit: F) -> String
where
    F: FnOnce(&mut Vec<String>),
{
    match STYLE_ATTR.captures(attrs) {
        Some(caps) => {
            let (value, quote) = match (caps.get(2), caps.get(3)) {
                (Some(v), _) => (v.as_str(), '"'),
                (None, Some(v)) => (v.as_str(), '\''),
                (None, None) => ("", '"'),
            };
            let lead = caps.get(1).map_or("", |m| m.as_str());
            let mut decls = split_declarations(value);
            edit(&mut decls);

            let Some(whole) = caps.get(0) else {
                return attrs.to_string();
            };
            format!(
                "{}{}style={}{}{}{}",
                &attrs[..whole.start()],
                lead,
                quote,
                decls.join("; "),
                quote,
                &attrs[whole.end()..]
            )
        }
        None => {
            let mut decls = Vec::new();
            edit(&mut decls);
            format!(r#"{} style="{}""#, attrs.trim_end(), decls.join("; "))
        }
    }
}

fn split_declarations(style: &str) -> Vec<String> {
    style
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

fn property_name(declaration: &str) -> String {
    declaration
        .split(':')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

fn has_class(attrs: &str, class: &str) -> bool {
    CLASS_ATTR.captures_iter(attrs).any(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .is_some_and(|v| v.as_str().split_whitespace().any(|c| c == class))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "plain text",
        r#"<p>Dor lombar</p><p style="margin: 10px; color: red">PA 12x8</p>"#,
        r#"<p class="x" style='margin-top:4px;font-weight:bold;'>a</p>"#,
        r#"<img src="a.png"><img src="b.png"/><img src="c.png" style="border: 1px solid">"#,
        r#"<div class="ql-editor"><p>já embrulhado</p></div>"#,
        r#"<div class="ql-editor">a</div><div class="ql-editor">b</div>"#,
        r#"<pre>code</pre><P>upper</P>"#,
        "  <div class=\"other\"><img src='x'></div>  ",
        "<div>x",
        "a</div>",
        "a</div>b<div>",
        r#"<div class="ql-editor">abc"#,
    ];

    #[test]
    fn normalize_is_idempotent() {
        for sample in SAMPLES {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn images_get_size_constraints() {
        let out = normalize(r#"<img src="a.png">"#);
        assert_eq!(
            out,
            r#"<div class="ql-editor"><img src="a.png" style="max-width: 100%; height: auto"></div>"#
        );
    }

    #[test]
    fn image_styles_are_extended_not_replaced() {
        let out = normalize(r#"<img src="a.png" style="border: 1px solid; float: left">"#);
        assert!(out.contains(
            r#"style="border: 1px solid; float: left; max-width: 100%; height: auto""#
        ));
    }

    #[test]
    fn existing_image_constraints_are_untouched() {
        let out = normalize(r#"<img src="a.png" style="width: 50px; height: 20px">"#);
        assert!(out.contains(r#"style="width: 50px; height: 20px""#));

        let out = normalize(r#"<img src="a.png" style="max-width: 300px">"#);
        assert!(out.contains(r#"style="max-width: 300px; height: auto""#));
    }

    #[test]
    fn self_closing_images_stay_self_closing() {
        let out = normalize(r#"<img src="b.png"/>"#);
        assert!(out.contains(r#"<img src="b.png" style="max-width: 100%; height: auto" />"#));
    }

    #[test]
    fn paragraph_margins_are_replaced() {
        let out = normalize(
            r#"<p style="margin: 10px; color: red; margin-bottom: 30px; margin-left: 2em">x</p>"#,
        );
        assert!(out.contains(
            r#"<p style="margin-right: 10px; margin-left: 10px; color: red; margin-left: 2em; margin-top: 0; margin-bottom: 8px">"#
        ));
    }

    #[test]
    fn margin_shorthand_keeps_horizontal_sides() {
        let cases = [
            ("margin: 0 auto", "margin-right: auto; margin-left: auto"),
            ("margin: 1px 2px 3px", "margin-right: 2px; margin-left: 2px"),
            ("margin: 1px 2px 3px 4px", "margin-right: 2px; margin-left: 4px"),
            ("margin: 5px !important", "margin-right: 5px !important; margin-left: 5px !important"),
        ];
        for (style, expected) in cases {
            let out = normalize(&format!(r#"<p style="{style}">x</p>"#));
            assert!(
                out.contains(&format!(r#"<p style="{expected}; margin-top: 0; margin-bottom: 8px">"#)),
                "unexpected output for {style:?}: {out}"
            );
        }

        let out = normalize(r#"<p style="margin: calc(1px + 2px)">x</p>"#);
        assert!(out.contains(r#"<p style="margin-top: 0; margin-bottom: 8px">"#));
    }

    #[test]
    fn bare_paragraphs_get_spacing() {
        let out = normalize("<p>x</p><p class=\"lead\">y</p>");
        assert!(out.contains(r#"<p style="margin-top: 0; margin-bottom: 8px">x</p>"#));
        assert!(out.contains(r#"<p class="lead" style="margin-top: 0; margin-bottom: 8px">y</p>"#));
    }

    #[test]
    fn non_paragraph_p_tags_are_ignored() {
        let out = normalize("<pre>code</pre><param name=\"a\">");
        assert_eq!(
            out,
            r#"<div class="ql-editor"><pre>code</pre><param name="a"></div>"#
        );
    }

    #[test]
    fn single_quoted_style_is_preserved() {
        let out = normalize("<p style='font-weight:bold;margin-top:4px'>a</p>");
        assert!(out.contains("<p style='font-weight:bold; margin-top: 0; margin-bottom: 8px'>"));
    }

    #[test]
    fn data_style_attribute_is_not_a_style() {
        let out = normalize(r#"<p data-style="margin: 3px">a</p>"#);
        assert!(out.contains(
            r#"<p data-style="margin: 3px" style="margin-top: 0; margin-bottom: 8px">"#
        ));
    }

    #[test]
    fn existing_wrapper_is_kept() {
        let input = r#"<div class="ql-editor big">text</div>"#;
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn leading_wrapper_counts_as_wrapped() {
        let siblings = r#"<div class="ql-editor">a</div><div class="ql-editor">b</div>"#;
        assert_eq!(normalize(siblings), siblings);

        let unclosed = r#"<div class="ql-editor">abc"#;
        assert_eq!(normalize(unclosed), unclosed);
    }

    #[test]
    fn unbalanced_divs_are_wrapped_once() {
        let once = normalize("<div>x");
        assert_eq!(once, r#"<div class="ql-editor"><div>x</div>"#);
        assert_eq!(normalize(&once), once);

        let once = normalize("a</div>");
        assert_eq!(once, r#"<div class="ql-editor">a</div></div>"#);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn custom_spacing_from_config() {
        let config = RenderConfig::default().with_paragraph_spacing(12);
        let out = HtmlNormalizer::from(&config).normalize("<p>x</p>");
        assert!(out.contains("margin-bottom: 12px"));
    }
}
