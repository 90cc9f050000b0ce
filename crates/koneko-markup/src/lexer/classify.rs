use std::ops::Range;

/// What a line opens when it appears at a block boundary.
///
/// Decided from the line alone, without reference to surrounding context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Blank,
    HorizontalRule,
    /// Number of leading `#`.
    Heading(usize),
    HtmlOpen,
    HtmlClose,
    Fence,
    Image,
    Blockquote,
    SidenoteDef,
    LinkDef,
    Paragraph,
}

impl LineClass {
    pub fn of(line: &str) -> Self {
        let body = line.trim_start();
        if body.trim_end().is_empty() {
            return LineClass::Blank;
        }
        if body.trim_end() == "---" {
            return LineClass::HorizontalRule;
        }
        if let Some(level) = heading_level(body) {
            return LineClass::Heading(level);
        }
        if let Some(rest) = body.strip_prefix("</")
            && tag_name_len(rest) > 0
        {
            return LineClass::HtmlClose;
        }
        if let Some(rest) = body.strip_prefix('<')
            && tag_name_len(rest) > 0
        {
            return LineClass::HtmlOpen;
        }
        if body.starts_with("```") {
            return LineClass::Fence;
        }
        if image_parts(body).is_some() {
            return LineClass::Image;
        }
        if body.starts_with('>') {
            return LineClass::Blockquote;
        }
        if definition_name(body, true).is_some() {
            return LineClass::SidenoteDef;
        }
        if definition_name(body, false).is_some() {
            return LineClass::LinkDef;
        }
        LineClass::Paragraph
    }
}

/// Counts leading `#` when they are followed by a space or tab.
pub fn heading_level(body: &str) -> Option<usize> {
    let level = body.bytes().take_while(|&b| b == b'#').count();
    match body.as_bytes().get(level) {
        Some(b' ' | b'\t') if level > 0 => Some(level),
        _ => None,
    }
}

/// Length of the tag name at the start of `s`, 0 if there is none.
///
/// Names start with an ASCII letter and continue with letters, digits, `-`
/// and `_`.
pub fn tag_name_len(s: &str) -> usize {
    match s.bytes().next() {
        Some(b) if b.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    s.bytes()
        .position(|b| !(b.is_ascii_alphanumeric() || b == b'-' || b == b'_'))
        .unwrap_or(s.len())
}

/// Name of a `[name]:` (or `[^name]:` when `sidenote`) definition.
pub fn definition_name(body: &str, sidenote: bool) -> Option<&str> {
    let rest = body.strip_prefix('[')?;
    let rest = if sidenote {
        rest.strip_prefix('^')?
    } else if rest.starts_with('^') {
        return None;
    } else {
        rest
    };
    let close = rest.find(']')?;
    let name = &rest[..close];
    if name.is_empty() || name.contains('[') {
        return None;
    }
    rest[close + 1..].starts_with(':').then_some(name)
}

/// Byte ranges of a whole-line `![Title](path "Alt")`, relative to the
/// line body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageParts {
    pub title: Range<usize>,
    pub path: Range<usize>,
    /// Literal text (leading space and quotes included) and the quoted value.
    pub alt: Option<(Range<usize>, Range<usize>)>,
    /// Offset of the closing `)`.
    pub close: usize,
}

pub fn image_parts(body: &str) -> Option<ImageParts> {
    if !body.starts_with("![") {
        return None;
    }
    let trimmed = body.trim_end();
    if !trimmed.ends_with(')') {
        return None;
    }
    let close = trimmed.len() - 1;
    let mid = trimmed.find("](")?;
    let inner_start = mid + 2;
    if inner_start > close {
        return None;
    }
    let inner = &trimmed[inner_start..close];
    let path_len = inner.find(char::is_whitespace).unwrap_or(inner.len());
    if path_len == 0 {
        return None;
    }
    let path = inner_start..inner_start + path_len;

    let rest = &inner[path_len..];
    let alt = if rest.is_empty() {
        None
    } else {
        let quoted = rest.trim_start();
        if quoted.len() < 2 || !quoted.starts_with('"') || !quoted.ends_with('"') {
            return None;
        }
        let value_start = close - quoted.len() + 1;
        Some((path.end..close, value_start..close - 1))
    };

    Some(ImageParts {
        title: 2..mid,
        path,
        alt,
        close,
    })
}

/// Splits a trailing `{#id}` off heading text.
///
/// Returns the offset of `{#` and the id.
pub fn heading_id(text: &str) -> Option<(usize, &str)> {
    let trimmed = text.trim_end();
    let inner = trimmed.strip_suffix('}')?;
    let open = inner.rfind("{#")?;
    let id = &inner[open + 2..];
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_');
    valid.then_some((open, id))
}
