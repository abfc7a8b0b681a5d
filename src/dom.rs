//! HTML text extraction for the native backend.
//!
//! The native converter does not build a full DOM. It walks the markup once
//! and produces a flat list of [`TextBlock`]s, one per block-level element
//! that carries text. Supported styling:
//! - headings `h1`–`h6`, `b`/`strong`, `i`/`em`, `<center>`
//! - inline `style`: `font-size`, `font-weight`, `font-style`, `text-align`,
//!   `color`
//! - `align="..."` attributes and `text-center`/`text-right` classes
//!
//! `<head>`, `<style>`, `<script>` and `<title>` content is skipped.

/// Horizontal alignment of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// One run of text laid out as a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    /// Font size in points.
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub align: Align,
    pub color: [f32; 3],
    /// Extra space above the block, in points.
    pub space_before: f32,
}

/// Default body font size in points.
pub const BASE_FONT_PT: f32 = 12.0;

const SKIP_CONTENT: &[&str] = &["head", "style", "script", "title"];
const VOID: &[&str] = &["br", "hr", "img", "meta", "link", "input", "col", "source", "wbr"];
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "center", "dd", "div", "dl",
    "dt", "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "html", "li", "main", "nav", "ol", "p", "section", "table", "tbody", "td", "th", "thead",
    "tr", "ul",
];

/// Style state inherited down the element stack.
#[derive(Debug, Clone, Copy)]
struct Inherited {
    font_size: f32,
    bold: bool,
    italic: bool,
    align: Align,
    color: [f32; 3],
    heading: bool,
}

impl Default for Inherited {
    fn default() -> Self {
        Self {
            font_size: BASE_FONT_PT,
            bold: false,
            italic: false,
            align: Align::Left,
            color: [0.0, 0.0, 0.0],
            heading: false,
        }
    }
}

struct Frame {
    tag: String,
    style: Inherited,
}

/// Extract styled text blocks from `html` in document order.
pub fn extract_blocks(html: &str) -> Vec<TextBlock> {
    let mut out = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut buf = String::new();
    let mut block_style: Option<Inherited> = None;
    let mut pending_space = 0.0f32;
    let mut rest = html;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            push_text(&mut buf, &mut block_style, current(&stack), rest);
            break;
        };
        if lt > 0 {
            push_text(&mut buf, &mut block_style, current(&stack), &rest[..lt]);
        }
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map(|i| &after[i + 3..]).unwrap_or("");
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = rest.find('>').map(|i| &rest[i + 1..]).unwrap_or("");
            continue;
        }

        let Some(gt) = find_tag_end(rest) else {
            push_text(&mut buf, &mut block_style, current(&stack), rest);
            break;
        };
        let tag = parse_tag(&rest[1..gt]);
        rest = &rest[gt + 1..];

        let Some(tag) = tag else { continue };

        if !tag.closing && SKIP_CONTENT.contains(&tag.name.as_str()) && !tag.self_closing {
            let close = format!("</{}", tag.name);
            rest = find_ci(rest, &close)
                .and_then(|i| rest[i..].find('>').map(|j| &rest[i + j + 1..]))
                .unwrap_or("");
            continue;
        }

        let flushed = BLOCK.contains(&tag.name.as_str())
            && flush(&mut out, &mut buf, &mut block_style, &mut pending_space);

        if tag.closing {
            if let Some(pos) = stack.iter().rposition(|f| f.tag == tag.name) {
                let style = stack[pos].style;
                stack.truncate(pos);
                if style.heading {
                    pending_space = pending_space.max(style.font_size * 0.4);
                }
            }
            continue;
        }

        let parent = current(&stack);
        let style = apply_tag(&tag, parent);
        if style.heading {
            pending_space = pending_space.max(style.font_size * 0.5);
        } else if tag.name == "p" {
            pending_space = pending_space.max(parent.font_size * 0.5);
        }

        if tag.name == "br" {
            // A break right after another break (or a block end) is a blank line.
            if !flushed {
                pending_space += parent.font_size;
            }
            continue;
        }
        if tag.self_closing || VOID.contains(&tag.name.as_str()) {
            continue;
        }
        stack.push(Frame {
            tag: tag.name,
            style,
        });
    }

    flush(&mut out, &mut buf, &mut block_style, &mut pending_space);
    out
}

fn current(stack: &[Frame]) -> Inherited {
    stack.last().map(|f| f.style).unwrap_or_default()
}

fn push_text(buf: &mut String, block_style: &mut Option<Inherited>, style: Inherited, raw: &str) {
    let text = decode_entities(raw);
    for (i, word) in text.split_whitespace().enumerate() {
        if i == 0 && !text.starts_with(char::is_whitespace) && !buf.is_empty() {
            buf.push_str(word);
        } else {
            if !buf.is_empty() && !buf.ends_with(' ') {
                buf.push(' ');
            }
            buf.push_str(word);
        }
        if block_style.is_none() {
            *block_style = Some(style);
        }
    }
    if text.ends_with(char::is_whitespace) && !buf.is_empty() && !buf.ends_with(' ') {
        buf.push(' ');
    }
}

/// Emit the buffered text as a block. Returns whether a block was emitted.
fn flush(
    out: &mut Vec<TextBlock>,
    buf: &mut String,
    block_style: &mut Option<Inherited>,
    pending_space: &mut f32,
) -> bool {
    let text = buf.trim();
    let mut emitted = false;
    if let (false, Some(style)) = (text.is_empty(), *block_style) {
        out.push(TextBlock {
            text: text.to_string(),
            font_size: style.font_size,
            bold: style.bold,
            italic: style.italic,
            align: style.align,
            color: style.color,
            space_before: *pending_space,
        });
        *pending_space = 0.0;
        emitted = true;
    }
    buf.clear();
    *block_style = None;
    emitted
}

struct Tag {
    name: String,
    closing: bool,
    self_closing: bool,
    attrs: Vec<(String, String)>,
}

impl Tag {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Index of the `>` closing the tag at the start of `s`, honouring quotes.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_tag(inner: &str) -> Option<Tag> {
    let (closing, inner) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };
    let (self_closing, inner) = match inner.trim_end().strip_suffix('/') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };
    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return None;
    }
    Some(Tag {
        name,
        closing,
        self_closing,
        attrs: parse_attrs(&inner[name_end..]),
    })
}

fn parse_attrs(mut s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    loop {
        s = s.trim_start();
        if s.is_empty() {
            break;
        }
        let key_end = s
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(s.len());
        let key = s[..key_end].to_ascii_lowercase();
        s = s[key_end..].trim_start();
        let value = if let Some(after) = s.strip_prefix('=') {
            let after = after.trim_start();
            match after.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after[1..];
                    let end = body.find(q).unwrap_or(body.len());
                    s = body.get(end + 1..).unwrap_or("");
                    decode_entities(&body[..end])
                }
                _ => {
                    let end = after
                        .find(char::is_whitespace)
                        .unwrap_or(after.len());
                    s = &after[end..];
                    decode_entities(&after[..end])
                }
            }
        } else {
            String::new()
        };
        if !key.is_empty() {
            attrs.push((key, value));
        }
    }
    attrs
}

fn apply_tag(tag: &Tag, parent: Inherited) -> Inherited {
    let mut style = parent;
    match tag.name.as_str() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let scale = match tag.name.as_bytes()[1] {
                b'1' => 2.0,
                b'2' => 1.5,
                b'3' => 1.17,
                b'4' => 1.0,
                b'5' => 0.83,
                _ => 0.67,
            };
            style.font_size = BASE_FONT_PT * scale;
            style.bold = true;
            style.heading = true;
        }
        "b" | "strong" | "th" => style.bold = true,
        "i" | "em" => style.italic = true,
        "center" => style.align = Align::Center,
        _ => {}
    }

    if let Some(align) = tag.attr("align").and_then(parse_align) {
        style.align = align;
    }
    if let Some(classes) = tag.attr("class") {
        for class in classes.split_whitespace() {
            match class {
                "text-center" | "center" => style.align = Align::Center,
                "text-right" | "right" => style.align = Align::Right,
                "text-left" => style.align = Align::Left,
                _ => {}
            }
        }
    }
    if let Some(css) = tag.attr("style") {
        apply_inline_style(css, parent, &mut style);
    }
    style
}

fn apply_inline_style(css: &str, parent: Inherited, style: &mut Inherited) {
    for decl in css.split(';') {
        let Some((prop, value)) = decl.split_once(':') else {
            continue;
        };
        let value = value.trim().to_ascii_lowercase();
        match prop.trim().to_ascii_lowercase().as_str() {
            "font-size" => {
                if let Some(size) = parse_font_size(&value, parent.font_size) {
                    style.font_size = size;
                }
            }
            "font-weight" => {
                style.bold = value == "bold"
                    || value == "bolder"
                    || value.parse::<u32>().map(|w| w >= 600).unwrap_or(false);
            }
            "font-style" => style.italic = value == "italic" || value == "oblique",
            "text-align" => {
                if let Some(align) = parse_align(&value) {
                    style.align = align;
                }
            }
            "color" => {
                if let Some(color) = parse_hex_color(&value) {
                    style.color = color;
                }
            }
            _ => {}
        }
    }
}

fn parse_align(value: &str) -> Option<Align> {
    match value.trim().to_ascii_lowercase().as_str() {
        "center" => Some(Align::Center),
        "right" => Some(Align::Right),
        "left" | "start" | "justify" => Some(Align::Left),
        _ => None,
    }
}

/// Font size in points from a CSS length. Pixels are converted at 96 dpi.
fn parse_font_size(value: &str, parent: f32) -> Option<f32> {
    let num = |suffix: &str| value.strip_suffix(suffix)?.trim().parse::<f32>().ok();
    let size = if let Some(v) = num("px") {
        v * 0.75
    } else if let Some(v) = num("pt") {
        v
    } else if let Some(v) = num("rem") {
        v * BASE_FONT_PT
    } else if let Some(v) = num("em") {
        v * parent
    } else if let Some(v) = num("%") {
        v / 100.0 * parent
    } else {
        return None;
    };
    (size > 0.0).then_some(size)
}

fn parse_hex_color(value: &str) -> Option<[f32; 3]> {
    let hex = value.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expand = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| {
        u8::from_str_radix(&expand[i..i + 2], 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    Some([channel(0)?, channel(2)?, channel(4)?])
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

/// Decode the entities Tera's escaping and typical templates produce.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{00A0}'),
                "copy" => Some('\u{00A9}'),
                "reg" => Some('\u{00AE}'),
                "mdash" => Some('\u{2014}'),
                "ndash" => Some('\u{2013}'),
                _ => {
                    let code = if let Some(hex) = entity
                        .strip_prefix("#x")
                        .or_else(|| entity.strip_prefix("#X"))
                    {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        entity.strip_prefix('#').and_then(|d| d.parse().ok())
                    };
                    code.and_then(char::from_u32)
                }
            };
            ch.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
