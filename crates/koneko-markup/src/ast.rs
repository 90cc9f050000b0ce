//! Document tree produced by the parser.
//!
//! The node set is closed: blocks and inlines are plain enums and consumers
//! match on them exhaustively (or walk them with [`crate::visit::Visitor`]).

use std::collections::BTreeMap;
use std::fmt;

/// Root of a parsed post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blog {
    pub meta: Meta,
    /// Set by the `<Abstract>` tag.
    pub abstract_text: Option<Vec<Inline>>,
    /// Blocks that appear before the first section, plus level-2 sections
    /// that had no level-1 parent.
    pub top_level: Vec<Block>,
    /// Level-1 sections in document order.
    pub sections: Vec<Section>,
    pub link_definitions: BTreeMap<String, LinkDefinition>,
    pub sidenote_definitions: BTreeMap<String, SidenoteDefinition>,
}

/// Raw metadata table. Keys keep every value they were given so duplicates
/// can be reported later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    entries: BTreeMap<String, Vec<MetaValue>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaValue {
    pub content: Vec<Inline>,
    /// Offset of the key.
    pub pos: usize,
}

impl MetaValue {
    pub fn text(&self) -> String {
        plain_text(&self.content).trim().to_string()
    }
}

impl Meta {
    pub fn insert(&mut self, key: impl Into<String>, value: MetaValue) {
        self.entries.entry(key.into()).or_default().push(value);
    }

    /// All values recorded for `key`, in document order.
    pub fn get(&self, key: &str) -> &[MetaValue] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Text of the first value for `key`.
    pub fn first_text(&self, key: &str) -> Option<String> {
        self.get(key).first().map(MetaValue::text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MetaValue])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SectionLevel {
    One,
    Two,
}

impl SectionLevel {
    pub fn number(self) -> u8 {
        match self {
            SectionLevel::One => 1,
            SectionLevel::Two => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub level: SectionLevel,
    /// Anchor id. Explicit `{#id}` ids are set by the parser, the rest by
    /// the resolution pass.
    pub id: Option<String>,
    pub heading: Vec<Inline>,
    pub content: Vec<Block>,
    pub pos: usize,
}

impl Section {
    /// Level-2 sections directly inside this one.
    pub fn subsections(&self) -> impl Iterator<Item = &Section> {
        self.content.iter().filter_map(|block| match block {
            Block::Section(section) => Some(section),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Section(Section),
    Paragraph(Paragraph),
    CodeBlock(CodeBlock),
    Image(Image),
    Blockquote(Blockquote),
    HorizontalRule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub content: Vec<Inline>,
}

/// Inclusive range of highlighted source lines, from `L:first-last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub first: u32,
    pub last: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBlock {
    pub lang: Option<String>,
    /// Link to where the snippet came from.
    pub source: Option<String>,
    pub lines: Option<LineRange>,
    /// Literal lines, never re-lexed.
    pub content: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub path: String,
    pub title: Vec<Inline>,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blockquote {
    pub content: Vec<Inline>,
    pub author: Vec<Inline>,
    pub source: Vec<Inline>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    AmpSpecial(AmpSpecial),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    EmphasisStrong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Marker(Vec<Inline>),
    Mono(String),
    Link(Link),
    Sidenote(Sidenote),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub name: Vec<Inline>,
    pub target: LinkTarget,
    pub pos: usize,
}

impl Link {
    /// The href, once known.
    pub fn href(&self) -> Option<&str> {
        match &self.target {
            LinkTarget::Href(href) => Some(href),
            LinkTarget::Reference { href, .. } => href.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Href(String),
    /// `[name][ref]`; `href` is filled in by the resolution pass.
    Reference { name: String, href: Option<String> },
}

/// `[word][^reference]`. The body is copied from the matching definition
/// during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sidenote {
    pub reference: String,
    pub word: Vec<Inline>,
    pub id: Option<String>,
    pub content: Option<Vec<Inline>>,
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDefinition {
    pub href: String,
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidenoteDefinition {
    pub content: Vec<Inline>,
    pub pos: usize,
}

/// Typographic specials and named entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmpSpecial {
    NoBreakSpace,
    EnDash,
    EmDash,
    Ellipsis,
    LeftDoubleQuote,
    RightDoubleQuote,
    LeftAngleQuote,
    RightAngleQuote,
    Prime,
    DoublePrime,
    TriplePrime,
    QuadruplePrime,
    ReversedPrime,
}

impl AmpSpecial {
    /// Looks up a named entity (without `&` and `;`).
    pub fn from_entity(name: &str) -> Option<Self> {
        Some(match name {
            "nbsp" => AmpSpecial::NoBreakSpace,
            "ndash" => AmpSpecial::EnDash,
            "mdash" => AmpSpecial::EmDash,
            "hellip" => AmpSpecial::Ellipsis,
            "ldquo" => AmpSpecial::LeftDoubleQuote,
            "rdquo" => AmpSpecial::RightDoubleQuote,
            "laquo" => AmpSpecial::LeftAngleQuote,
            "raquo" => AmpSpecial::RightAngleQuote,
            "prime" => AmpSpecial::Prime,
            "Prime" => AmpSpecial::DoublePrime,
            "tprime" => AmpSpecial::TriplePrime,
            "qprime" => AmpSpecial::QuadruplePrime,
            "bprime" => AmpSpecial::ReversedPrime,
            _ => return None,
        })
    }

    /// Maps the literal text of an `AmpSpecial` token.
    pub fn from_source(text: &str) -> Option<Self> {
        match text {
            "~" | "\u{a0}" => Some(AmpSpecial::NoBreakSpace),
            "--" => Some(AmpSpecial::EnDash),
            "---" => Some(AmpSpecial::EmDash),
            "..." | "…" => Some(AmpSpecial::Ellipsis),
            _ => text
                .strip_prefix('&')
                .and_then(|rest| rest.strip_suffix(';'))
                .and_then(Self::from_entity),
        }
    }

    /// The character this special stands for.
    pub fn as_str(self) -> &'static str {
        match self {
            AmpSpecial::NoBreakSpace => "\u{a0}",
            AmpSpecial::EnDash => "–",
            AmpSpecial::EmDash => "—",
            AmpSpecial::Ellipsis => "…",
            AmpSpecial::LeftDoubleQuote => "“",
            AmpSpecial::RightDoubleQuote => "”",
            AmpSpecial::LeftAngleQuote => "«",
            AmpSpecial::RightAngleQuote => "»",
            AmpSpecial::Prime => "′",
            AmpSpecial::DoublePrime => "″",
            AmpSpecial::TriplePrime => "‴",
            AmpSpecial::QuadruplePrime => "⁗",
            AmpSpecial::ReversedPrime => "‵",
        }
    }
}

impl fmt::Display for AmpSpecial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flattens inline content to its visible text.
pub fn plain_text(content: &[Inline]) -> String {
    let mut out = String::new();
    push_plain_text(&mut out, content);
    out
}

fn push_plain_text(out: &mut String, content: &[Inline]) {
    for inline in content {
        match inline {
            Inline::Text(text) | Inline::Mono(text) => out.push_str(text),
            Inline::AmpSpecial(special) => out.push_str(special.as_str()),
            Inline::Emphasis(inner)
            | Inline::Strong(inner)
            | Inline::EmphasisStrong(inner)
            | Inline::Strikethrough(inner)
            | Inline::Marker(inner) => push_plain_text(out, inner),
            Inline::Link(link) => push_plain_text(out, &link.name),
            Inline::Sidenote(sidenote) => push_plain_text(out, &sidenote.word),
        }
    }
}
