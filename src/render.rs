//! Native PDF backend – lays out the text of a rendered certificate and
//! emits PDF bytes using `printpdf` (v0.8 ops-based API).
//!
//! This backend needs no external program. It honours page size,
//! orientation and margins from [`PageOptions`], but only draws text:
//! images, backgrounds and CSS layout are not reproduced.

use printpdf::*;

use crate::convert::{ConvertError, PageOptions, PdfConverter};
use crate::dom::{extract_blocks, Align, TextBlock};

/// Inner padding used when the page margin is smaller, so text never
/// touches the paper edge.
pub const CONTENT_INSET_PT: f32 = 54.0;

const DOC_TITLE: &str = "Certificate";
const LINE_HEIGHT_FACTOR: f32 = 1.25;
const PT_TO_MM: f32 = 0.352778;

/// In-process converter backed by `printpdf`.
#[derive(Debug, Clone, Default)]
pub struct NativeConverter;

impl NativeConverter {
    pub fn new() -> Self {
        Self
    }
}

impl PdfConverter for NativeConverter {
    fn name(&self) -> &str {
        "native"
    }

    fn render_pdf(&self, html: &str, options: &PageOptions) -> Result<Vec<u8>, ConvertError> {
        let blocks = extract_blocks(html);
        let pages = layout_pages(&blocks, options);
        let bytes = write_pdf(&pages, options);
        if bytes.is_empty() {
            return Err(ConvertError::EmptyOutput);
        }
        Ok(bytes)
    }
}

/// A single line of text positioned on a page (origin top-left, points).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: [f32; 3],
}

/// Wrap and paginate blocks for the page described by `options`.
pub fn layout_pages(blocks: &[TextBlock], options: &PageOptions) -> Vec<Vec<PlacedText>> {
    let (page_w, page_h) = options.effective_size_pt();
    let inset = options.margin_pt().max(CONTENT_INSET_PT);
    let max_width = (page_w - 2.0 * inset).max(1.0);
    let bottom = page_h - inset;

    let mut pages: Vec<Vec<PlacedText>> = Vec::new();
    let mut current: Vec<PlacedText> = Vec::new();
    let mut y = inset;

    for block in blocks {
        if !current.is_empty() {
            y += block.space_before;
        }
        let line_h = block.font_size * LINE_HEIGHT_FACTOR;
        for line in wrap_text(&block.text, block.font_size, block.bold, max_width) {
            if y + line_h > bottom && !current.is_empty() {
                pages.push(std::mem::take(&mut current));
                y = inset;
            }
            let width = text_width(&line, block.font_size, block.bold);
            let x = match block.align {
                Align::Left => inset,
                Align::Center => inset + (max_width - width).max(0.0) / 2.0,
                Align::Right => inset + (max_width - width).max(0.0),
            };
            current.push(PlacedText {
                text: line,
                x,
                y,
                font_size: block.font_size,
                bold: block.bold,
                italic: block.italic,
                color: block.color,
            });
            y += line_h;
        }
    }

    if !current.is_empty() || pages.is_empty() {
        pages.push(current);
    }
    pages
}

/// Approximate Helvetica advance widths, in points.
pub fn text_width(text: &str, font_size: f32, bold: bool) -> f32 {
    let em: f32 = text
        .chars()
        .map(|c| match c {
            'i' | 'j' | 'l' | '.' | ',' | '\'' | '!' | '|' | ':' | ';' => 0.25,
            ' ' | 'f' | 't' | 'r' | 'I' | '(' | ')' | '-' => 0.32,
            'm' | 'w' | 'M' | 'W' => 0.85,
            c if c.is_ascii_uppercase() => 0.68,
            c if c.is_ascii_digit() => 0.556,
            _ => 0.52,
        })
        .sum();
    let weight = if bold { 1.06 } else { 1.0 };
    em * font_size * weight
}

/// Greedy word wrap. A single word wider than the line stays on its own line.
pub fn wrap_text(text: &str, font_size: f32, bold: bool, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let candidate = format!("{line} {word}");
        if text_width(&candidate, font_size, bold) > max_width {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn write_pdf(pages: &[Vec<PlacedText>], options: &PageOptions) -> Vec<u8> {
    let (page_w, page_h) = options.effective_size_pt();
    let mut doc = PdfDocument::new(DOC_TITLE);

    let pdf_pages: Vec<PdfPage> = pages
        .iter()
        .map(|lines| {
            let mut ops = Vec::new();
            for line in lines {
                push_line_ops(&mut ops, line, page_h);
            }
            PdfPage::new(Mm(page_w * PT_TO_MM), Mm(page_h * PT_TO_MM), ops)
        })
        .collect();

    doc.with_pages(pdf_pages);
    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        log::debug!("printpdf reported {} warnings", warnings.len());
    }
    bytes
}

fn push_line_ops(ops: &mut Vec<Op>, line: &PlacedText, page_height: f32) {
    let font = match (line.bold, line.italic) {
        (true, true) => BuiltinFont::HelveticaBoldOblique,
        (true, false) => BuiltinFont::HelveticaBold,
        (false, true) => BuiltinFont::HelveticaOblique,
        (false, false) => BuiltinFont::Helvetica,
    };
    // PDF origin is bottom-left; baseline sits ~0.75 em below the line top.
    let baseline = page_height - line.y - line.font_size * 0.75;

    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(line.x),
            y: Pt(baseline),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(line.font_size),
        font,
    });
    ops.push(Op::SetFillColor {
        col: Color::Rgb(Rgb {
            r: line.color[0],
            g: line.color[1],
            b: line.color[2],
            icc_profile: None,
        }),
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(fold_to_ascii(&line.text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

/// Fold text to ASCII for the builtin Helvetica faces.
///
/// printpdf writes builtin-font strings as their raw UTF-8 bytes while the
/// font dictionary declares WinAnsiEncoding, so anything outside ASCII would
/// print as mojibake. Accented Latin letters lose their accent; other
/// characters without a close ASCII form become `?`.
fn fold_to_ascii(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        let folded = match c {
            'À'..='Å' => "A",
            'à'..='å' => "a",
            'Æ' => "AE",
            'æ' => "ae",
            'Ç' => "C",
            'ç' => "c",
            'È'..='Ë' => "E",
            'è'..='ë' => "e",
            'Ì'..='Ï' => "I",
            'ì'..='ï' => "i",
            'Ð' => "D",
            'ð' => "d",
            'Ñ' => "N",
            'ñ' => "n",
            'Ò'..='Ö' | 'Ø' => "O",
            'ò'..='ö' | 'ø' => "o",
            'Ù'..='Ü' => "U",
            'ù'..='ü' => "u",
            'Ý' | 'Ÿ' => "Y",
            'ý' | 'ÿ' => "y",
            'Þ' => "Th",
            'þ' => "th",
            'ß' => "ss",
            'Œ' => "OE",
            'œ' => "oe",
            'Š' => "S",
            'š' => "s",
            'Ž' => "Z",
            'ž' => "z",
            '\u{2018}' | '\u{2019}' => "'",
            '\u{201C}' | '\u{201D}' => "\"",
            '\u{2013}' | '\u{2014}' => "-",
            '\u{2026}' => "...",
            '\u{2022}' => "*",
            '\u{00A0}' => " ",
            '\u{00A9}' => "(c)",
            '\u{00AE}' => "(R)",
            '\u{2122}' => "(TM)",
            _ => "?",
        };
        out.push_str(folded);
    }
    out
}
