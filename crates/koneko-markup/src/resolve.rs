//! # Reference resolution
//!
//! Second pass over a parsed [`Blog`]. Definitions may come after their
//! uses, so the parser only records reference names; this pass fills in
//! link hrefs and sidenote bodies from the definition tables, assigns anchor
//! ids, and checks the metadata table.
//!
//! Ids are allocated from a [`ResolveContext`] owned by the caller, one per
//! document, so documents resolved in parallel never share a counter.
//!
//! Sidenote bodies may contain links but not further sidenotes: a nested
//! sidenote is replaced by its word. Sidenotes produced by a `<Sidenote>` tag
//! already carry their body and only get an id here.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use log::{debug, warn};

use crate::ast::{
    Blog, Inline, LinkDefinition, LinkTarget, Section, SidenoteDefinition, plain_text,
};
use crate::error::{ParseError, ParseErrorKind};
use crate::meta::PostMeta;
use crate::visit::{VisitorMut, walk_blog_mut, walk_inline_mut, walk_inlines_mut, walk_section_mut};

/// Per-document id allocation.
#[derive(Debug, Default)]
pub struct ResolveContext {
    sidenotes: usize,
    section_ids: HashSet<String>,
}

impl ResolveContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// `sn-1`, `sn-2`, ... in document order.
    pub fn next_sidenote_id(&mut self) -> String {
        self.sidenotes += 1;
        format!("sn-{}", self.sidenotes)
    }

    /// Claims `id` exactly. Returns false if it is already taken.
    pub fn reserve_section_id(&mut self, id: &str) -> bool {
        self.section_ids.insert(id.to_string())
    }

    /// A free id derived from `heading`, suffixed `-2`, `-3`, ... when the
    /// slug is already taken.
    pub fn section_id(&mut self, heading: &str) -> String {
        let base = slug(heading);
        let mut id = base.clone();
        let mut n = 1;
        while !self.section_ids.insert(id.clone()) {
            n += 1;
            id = format!("{base}-{n}");
        }
        id
    }
}

/// Lowercases `text` and joins its words with `-`.
pub fn slug(text: &str) -> String {
    let mut slug = String::new();
    for word in text.split_whitespace() {
        let word: String = word
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .flat_map(char::to_lowercase)
            .collect();
        if word.is_empty() {
            continue;
        }
        if !slug.is_empty() {
            slug.push('-');
        }
        slug.push_str(&word);
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Typed metadata, present when the table had no problems.
    pub meta: Option<PostMeta>,
    pub errors: Vec<ParseError>,
}

/// Resolves every reference in `blog` and validates its metadata.
pub fn resolve(blog: &mut Blog, ctx: &mut ResolveContext) -> Resolution {
    let links = std::mem::take(&mut blog.link_definitions);
    let mut sidenotes = std::mem::take(&mut blog.sidenote_definitions);
    let mut errors = Vec::new();

    reserve_explicit_ids(blog, ctx, &mut errors);

    let mut resolver = Resolver {
        links: &links,
        sidenotes: None,
        ctx,
        used_links: BTreeSet::new(),
        used_sidenotes: BTreeSet::new(),
        errors,
    };

    // Bodies first, so the copies made below are already resolved.
    for (name, definition) in sidenotes.iter_mut() {
        let nested = flatten_sidenotes(&mut definition.content);
        if nested > 0 {
            warn!("sidenote `{name}` contains {nested} nested sidenote(s), kept as plain text");
        }
        walk_inlines_mut(&mut resolver, &mut definition.content);
    }

    resolver.sidenotes = Some(&sidenotes);
    walk_blog_mut(&mut resolver, blog);

    let Resolver {
        used_links,
        used_sidenotes,
        mut errors,
        ..
    } = resolver;

    for name in links.keys().filter(|name| !used_links.contains(*name)) {
        warn!("link definition `{name}` is never used");
    }
    for name in sidenotes.keys().filter(|name| !used_sidenotes.contains(*name)) {
        warn!("sidenote definition `{name}` is never used");
    }

    let meta = match PostMeta::extract(&blog.meta) {
        Ok(meta) => Some(meta),
        Err(meta_errors) => {
            errors.extend(meta_errors);
            None
        }
    };

    debug!(
        "resolved {} link and {} sidenote references with {} errors",
        used_links.len(),
        used_sidenotes.len(),
        errors.len()
    );

    blog.link_definitions = links;
    blog.sidenote_definitions = sidenotes;
    Resolution { meta, errors }
}

/// Claims explicit `{#id}`s before any generated id can take them.
fn reserve_explicit_ids(blog: &Blog, ctx: &mut ResolveContext, errors: &mut Vec<ParseError>) {
    fn reserve(section: &Section, ctx: &mut ResolveContext, errors: &mut Vec<ParseError>) {
        if let Some(id) = &section.id
            && !ctx.reserve_section_id(id)
        {
            errors.push(ParseError::new(
                section.pos,
                ParseErrorKind::DuplicateSectionId(id.clone()),
            ));
        }
        for sub in section.subsections() {
            reserve(sub, ctx, errors);
        }
    }

    for block in &blog.top_level {
        if let crate::ast::Block::Section(section) = block {
            reserve(section, ctx, errors);
        }
    }
    for section in &blog.sections {
        reserve(section, ctx, errors);
    }
}

struct Resolver<'d, 'c> {
    links: &'d BTreeMap<String, LinkDefinition>,
    /// `None` while resolving the sidenote bodies themselves.
    sidenotes: Option<&'d BTreeMap<String, SidenoteDefinition>>,
    ctx: &'c mut ResolveContext,
    used_links: BTreeSet<String>,
    used_sidenotes: BTreeSet<String>,
    errors: Vec<ParseError>,
}

impl VisitorMut for Resolver<'_, '_> {
    fn visit_section_mut(&mut self, section: &mut Section) {
        if section.id.is_none() {
            section.id = Some(self.ctx.section_id(&plain_text(&section.heading)));
        }
        walk_section_mut(self, section);
    }

    fn visit_inline_mut(&mut self, inline: &mut Inline) {
        match inline {
            Inline::Link(link) => {
                if let LinkTarget::Reference { name, href } = &mut link.target {
                    match self.links.get(name.as_str()) {
                        Some(definition) => {
                            *href = Some(definition.href.clone());
                            self.used_links.insert(name.clone());
                        }
                        None => self.errors.push(ParseError::new(
                            link.pos,
                            ParseErrorKind::UnresolvedLink(name.clone()),
                        )),
                    }
                }
            }
            Inline::Sidenote(sidenote) if sidenote.content.is_some() => {
                // body written in place by a <Sidenote> tag
                if let Some(content) = sidenote.content.as_mut() {
                    let nested = flatten_sidenotes(content);
                    if nested > 0 {
                        warn!(
                            "sidenote at offset {} contains {nested} nested sidenote(s), kept as plain text",
                            sidenote.pos
                        );
                    }
                    walk_inlines_mut(self, content);
                }
                sidenote.id = Some(self.ctx.next_sidenote_id());
                walk_inlines_mut(self, &mut sidenote.word);
                return;
            }
            Inline::Sidenote(sidenote) => {
                if let Some(definitions) = self.sidenotes {
                    match definitions.get(&sidenote.reference) {
                        Some(definition) => {
                            sidenote.content = Some(definition.content.clone());
                            sidenote.id = Some(self.ctx.next_sidenote_id());
                            self.used_sidenotes.insert(sidenote.reference.clone());
                        }
                        None => self.errors.push(ParseError::new(
                            sidenote.pos,
                            ParseErrorKind::UnresolvedSidenote(sidenote.reference.clone()),
                        )),
                    }
                }
                // the copied body is resolved already
                walk_inlines_mut(self, &mut sidenote.word);
                return;
            }
            _ => {}
        }
        walk_inline_mut(self, inline);
    }
}

/// Replaces sidenotes inside `content` by their word. Returns how many were
/// replaced.
fn flatten_sidenotes(content: &mut Vec<Inline>) -> usize {
    let mut replaced = 0;
    let mut flat = Vec::with_capacity(content.len());
    for inline in content.drain(..) {
        match inline {
            Inline::Sidenote(sidenote) => {
                let mut word = sidenote.word;
                replaced += 1 + flatten_sidenotes(&mut word);
                flat.extend(word);
            }
            mut other => {
                if let Some(inner) = children_mut(&mut other) {
                    replaced += flatten_sidenotes(inner);
                }
                flat.push(other);
            }
        }
    }
    *content = flat;
    replaced
}

fn children_mut(inline: &mut Inline) -> Option<&mut Vec<Inline>> {
    match inline {
        Inline::Emphasis(inner)
        | Inline::Strong(inner)
        | Inline::EmphasisStrong(inner)
        | Inline::Strikethrough(inner)
        | Inline::Marker(inner) => Some(inner),
        Inline::Link(link) => Some(&mut link.name),
        Inline::Sidenote(sidenote) => Some(&mut sidenote.word),
        Inline::Text(_) | Inline::Mono(_) | Inline::AmpSpecial(_) => None,
    }
}
