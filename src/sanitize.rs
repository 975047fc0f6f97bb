use regex::Regex;
use std::sync::OnceLock;

// Reversible stand-ins for literal curly braces in prose. U+FDD0/U+FDD1
// are Unicode noncharacters and cannot occur in interchanged text, so
// they are unambiguous until the final pass turns them into numeric
// character references.
pub const OPEN_BRACE_SENTINEL: char = '\u{FDD0}';
pub const CLOSE_BRACE_SENTINEL: char = '\u{FDD1}';

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[a-zA-Z]+[^>]*>").unwrap())
}

fn mso_if_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)\[if[^\]]*\].*?\[endif\]").unwrap())
}

fn mso_if_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[if[^\]]*\]").unwrap())
}

fn mso_endif_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[endif\]").unwrap())
}

// .className { ... }  or  .a, .b { ... }
fn css_class_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.([A-Za-z0-9_-]+)\s*[,{]").unwrap())
}

fn style_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<style[^>]*>(.*?)</style>").unwrap())
}

// Attribute values may be double- or single-quoted; the value lands in
// capture 1 or 2 respectively (read back via attr_value).
fn class_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\s+class=(?:"([^"]*)"|'([^']*)')"#).unwrap())
}

fn style_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\s+style=(?:"([^"]*)"|'([^']*)')"#).unwrap())
}

fn br_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").unwrap())
}

fn block_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</?(p|div|h[1-6]|section|article|blockquote)[^>]*>").unwrap())
}

fn any_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn cloze_span_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<span\b([^>]*)>(.*?)</span>").unwrap())
}

fn data_text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"data-text=(?:"([^"]*)"|'([^']*)')"#).unwrap())
}

fn attr_value<'t>(caps: &regex::Captures<'t>) -> &'t str {
    caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str())
}

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_{2,}").unwrap())
}

fn numeric_entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap())
}

// Phase one of the brace escaping: swap every literal `{` and `}` in
// text nodes for the sentinel characters, leaving tags, attributes and
// the contents of <style>/<script> elements untouched. Bare text with
// no markup is wrapped in a paragraph first so the downstream parser
// always sees an element.
pub fn mask_braces(raw: &str) -> String {
    let html;
    let mut rest = if tag_re().is_match(raw) {
        raw
    } else {
        html = format!("<p>{}</p>", raw.trim());
        &html
    };

    let mut out = String::with_capacity(rest.len());
    while !rest.is_empty() {
        if let Some(tag_end) = rest.starts_with('<').then(|| rest.find('>')).flatten() {
            let tag = &rest[..=tag_end];
            out.push_str(tag);
            rest = &rest[tag_end + 1..];

            // Raw-text elements keep their braces (CSS selectors and
            // script bodies use them structurally).
            if let Some(name) = raw_text_element(tag) {
                let close = format!("</{name}");
                match find_case_insensitive(rest, &close) {
                    Some(pos) => {
                        out.push_str(&rest[..pos]);
                        rest = &rest[pos..];
                    }
                    None => {
                        out.push_str(rest);
                        rest = "";
                    }
                }
            }
        } else {
            // A stray '<' with no closing '>' is treated as text.
            let text_end = match rest.find('<') {
                Some(0) | None => rest.len(),
                Some(i) => i,
            };
            for ch in rest[..text_end].chars() {
                match ch {
                    '{' => out.push(OPEN_BRACE_SENTINEL),
                    '}' => out.push(CLOSE_BRACE_SENTINEL),
                    other => out.push(other),
                }
            }
            rest = &rest[text_end..];
        }
    }
    out
}

fn raw_text_element(tag: &str) -> Option<&'static str> {
    let name: String = tag
        .trim_start_matches('<')
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();
    if tag.starts_with("</") || tag.ends_with("/>") {
        return None;
    }
    match name.as_str() {
        "style" => Some("style"),
        "script" => Some("script"),
        _ => None,
    }
}

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

// Strip the word-processor artifacts that leak into pasted markup:
// conditional [if]/[endif] sections, CSS classes not declared in an
// inline <style> block, and vendor-private `mso-` style properties.
// Phase two of the brace escaping happens here as well: sentinels from
// mask_braces become numeric character references. Idempotent, and a
// no-op on plain text without sentinels.
pub fn clean_text(html: &str) -> String {
    if html.is_empty() || !html.contains('<') {
        return finalize_sentinels(html);
    }

    let mut text = mso_if_block_re().replace_all(html, "").into_owned();
    text = mso_if_token_re().replace_all(&text, "").into_owned();
    text = mso_endif_re().replace_all(&text, "").into_owned();

    let declared = declared_classes(&text);
    text = rewrite_tags(&text, &declared);

    finalize_sentinels(&text)
}

fn finalize_sentinels(text: &str) -> String {
    text.replace(OPEN_BRACE_SENTINEL, "&#123;")
        .replace(CLOSE_BRACE_SENTINEL, "&#125;")
}

// Classes referenced by an inline <style> element are the only ones
// worth keeping; everything else is word-processor residue.
fn declared_classes(html: &str) -> Vec<String> {
    let mut declared = Vec::new();
    for block in style_block_re().captures_iter(html) {
        for class in css_class_name_re().captures_iter(&block[1]) {
            let name = class[1].to_string();
            if !declared.contains(&name) {
                declared.push(name);
            }
        }
    }
    declared
}

// Rewrites class/style attributes inside element tags only, leaving
// text nodes alone.
fn rewrite_tags(html: &str, declared: &[String]) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while !rest.is_empty() {
        if let Some(tag_end) = rest.starts_with('<').then(|| rest.find('>')).flatten() {
            let tag = &rest[..=tag_end];
            out.push_str(&clean_tag(tag, declared));
            rest = &rest[tag_end + 1..];

            if let Some(name) = raw_text_element(tag) {
                let close = format!("</{name}");
                match find_case_insensitive(rest, &close) {
                    Some(pos) => {
                        out.push_str(&rest[..pos]);
                        rest = &rest[pos..];
                    }
                    None => {
                        out.push_str(rest);
                        rest = "";
                    }
                }
            }
        } else {
            let text_end = match rest.find('<') {
                Some(0) | None => rest.len(),
                Some(i) => i,
            };
            out.push_str(&rest[..text_end]);
            rest = &rest[text_end..];
        }
    }
    out
}

fn clean_tag(tag: &str, declared: &[String]) -> String {
    let with_classes = class_attr_re().replace_all(tag, |caps: &regex::Captures| {
        let kept: Vec<&str> = attr_value(caps)
            .split_whitespace()
            .filter(|cls| declared.iter().any(|d| d == cls))
            .collect();
        if kept.is_empty() {
            String::new()
        } else {
            format!(r#" class="{}""#, kept.join(" "))
        }
    });

    style_attr_re()
        .replace_all(&with_classes, |caps: &regex::Captures| {
            let kept: Vec<&str> = attr_value(caps)
                .split(';')
                .map(str::trim)
                .filter(|prop| {
                    !prop.is_empty() && !prop.to_ascii_lowercase().starts_with("mso-")
                })
                .collect();
            if kept.is_empty() {
                String::new()
            } else {
                format!(r#" style="{}""#, kept.join("; "))
            }
        })
        .into_owned()
}

// Reduce a raw QuestionReference value (which may contain markup,
// entities and line breaks) to one clean heading. Deeper breadcrumbs in
// the reference are too granular to be useful as a category, so only
// the first non-blank line survives. Blank or literal "0" means no
// category.
pub fn standardize_reference(reference: &str) -> String {
    if reference.trim().is_empty() || reference.trim() == "0" {
        return String::new();
    }

    let mut text = unescape_entities(reference);
    text = br_re().replace_all(&text, "\n").into_owned();
    text = block_tag_re().replace_all(&text, "\n").into_owned();
    text = any_tag_re().replace_all(&text, "").into_owned();

    for line in text.split(['\r', '\n']) {
        let clean = whitespace_re().replace_all(line, " ").trim().to_string();
        if !clean.is_empty() {
            return clean;
        }
    }

    String::new()
}

// Minimal entity unescape covering what the export actually contains.
fn unescape_entities(text: &str) -> String {
    let named = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    numeric_entity_re()
        .replace_all(&named, |caps: &regex::Captures| {
            let body = &caps[1];
            let value = if let Some(hex) = body.strip_prefix('x') {
                u32::from_str_radix(hex, 16).ok()
            } else {
                body.parse::<u32>().ok()
            };
            match value.and_then(char::from_u32) {
                Some(ch) => ch.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

// Replace each draggable-blank span (class ext-questions, data-text
// attribute) with the `{correct text}` placeholder convention. Spans
// missing either marker are left alone.
pub fn replace_cloze_spans(html: &str) -> String {
    cloze_span_re()
        .replace_all(html, |caps: &regex::Captures| {
            let attrs = &caps[1];
            let has_marker_class = class_attr_re()
                .captures(&format!(" {}", attrs.trim_start()))
                .map(|c| {
                    attr_value(&c)
                        .split_whitespace()
                        .any(|cls| cls == "ext-questions")
                })
                .unwrap_or(false);
            match data_text_re().captures(attrs) {
                Some(data) if has_marker_class => format!("{{{}}}", attr_value(&data)),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

// Substitute the first run of 2+ underscores with the placeholder; if
// the prompt carries no blank, append the placeholder as a trailing
// paragraph instead. NoExpand keeps `$` in answer text literal instead
// of being read as a capture-group reference.
pub fn fill_blank_run(text: &str, placeholder: &str) -> String {
    if blank_run_re().is_match(text) {
        blank_run_re()
            .replace(text, regex::NoExpand(placeholder))
            .into_owned()
    } else {
        format!("{}<p>{}</p>", text.trim(), placeholder)
    }
}
