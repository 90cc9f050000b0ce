//! Depth-first traversal of a [`Blog`].
//!
//! Implement [`Visitor`] (or [`VisitorMut`]) and override the hooks you care
//! about; the default for every hook is to keep walking. Call the matching
//! `walk_*` function from an override to continue into the children.
//!
//! Definition tables are not walked: their content reaches the tree through
//! the resolved [`Sidenote`](crate::ast::Sidenote) uses.

use crate::ast::{Block, Blog, CodeBlock, Inline, Section};

pub trait Visitor {
    fn visit_blog(&mut self, blog: &Blog) {
        walk_blog(self, blog);
    }

    fn visit_section(&mut self, section: &Section) {
        walk_section(self, section);
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_code_block(&mut self, _code: &CodeBlock) {}

    fn visit_inline(&mut self, inline: &Inline) {
        walk_inline(self, inline);
    }

    /// Visible text: text runs, code spans and typographic specials.
    fn visit_text(&mut self, _text: &str) {}
}

pub fn walk_blog<V: Visitor + ?Sized>(visitor: &mut V, blog: &Blog) {
    if let Some(abstract_text) = &blog.abstract_text {
        walk_inlines(visitor, abstract_text);
    }
    for block in &blog.top_level {
        visitor.visit_block(block);
    }
    for section in &blog.sections {
        visitor.visit_section(section);
    }
}

pub fn walk_section<V: Visitor + ?Sized>(visitor: &mut V, section: &Section) {
    walk_inlines(visitor, &section.heading);
    for block in &section.content {
        visitor.visit_block(block);
    }
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &Block) {
    match block {
        Block::Section(section) => visitor.visit_section(section),
        Block::Paragraph(paragraph) => walk_inlines(visitor, &paragraph.content),
        Block::CodeBlock(code) => visitor.visit_code_block(code),
        Block::Image(image) => walk_inlines(visitor, &image.title),
        Block::Blockquote(quote) => {
            walk_inlines(visitor, &quote.content);
            walk_inlines(visitor, &quote.author);
            walk_inlines(visitor, &quote.source);
        }
        Block::HorizontalRule => {}
    }
}

pub fn walk_inline<V: Visitor + ?Sized>(visitor: &mut V, inline: &Inline) {
    match inline {
        Inline::Text(text) | Inline::Mono(text) => visitor.visit_text(text),
        Inline::AmpSpecial(special) => visitor.visit_text(special.as_str()),
        Inline::Emphasis(inner)
        | Inline::Strong(inner)
        | Inline::EmphasisStrong(inner)
        | Inline::Strikethrough(inner)
        | Inline::Marker(inner) => walk_inlines(visitor, inner),
        Inline::Link(link) => walk_inlines(visitor, &link.name),
        Inline::Sidenote(sidenote) => {
            walk_inlines(visitor, &sidenote.word);
            if let Some(content) = &sidenote.content {
                walk_inlines(visitor, content);
            }
        }
    }
}

pub fn walk_inlines<V: Visitor + ?Sized>(visitor: &mut V, content: &[Inline]) {
    for inline in content {
        visitor.visit_inline(inline);
    }
}

/// Like [`Visitor`], but with mutable access to every node.
pub trait VisitorMut {
    fn visit_blog_mut(&mut self, blog: &mut Blog) {
        walk_blog_mut(self, blog);
    }

    fn visit_section_mut(&mut self, section: &mut Section) {
        walk_section_mut(self, section);
    }

    fn visit_block_mut(&mut self, block: &mut Block) {
        walk_block_mut(self, block);
    }

    fn visit_inline_mut(&mut self, inline: &mut Inline) {
        walk_inline_mut(self, inline);
    }
}

pub fn walk_blog_mut<V: VisitorMut + ?Sized>(visitor: &mut V, blog: &mut Blog) {
    if let Some(abstract_text) = &mut blog.abstract_text {
        walk_inlines_mut(visitor, abstract_text);
    }
    for block in &mut blog.top_level {
        visitor.visit_block_mut(block);
    }
    for section in &mut blog.sections {
        visitor.visit_section_mut(section);
    }
}

pub fn walk_section_mut<V: VisitorMut + ?Sized>(visitor: &mut V, section: &mut Section) {
    walk_inlines_mut(visitor, &mut section.heading);
    for block in &mut section.content {
        visitor.visit_block_mut(block);
    }
}

pub fn walk_block_mut<V: VisitorMut + ?Sized>(visitor: &mut V, block: &mut Block) {
    match block {
        Block::Section(section) => visitor.visit_section_mut(section),
        Block::Paragraph(paragraph) => walk_inlines_mut(visitor, &mut paragraph.content),
        Block::Image(image) => walk_inlines_mut(visitor, &mut image.title),
        Block::Blockquote(quote) => {
            walk_inlines_mut(visitor, &mut quote.content);
            walk_inlines_mut(visitor, &mut quote.author);
            walk_inlines_mut(visitor, &mut quote.source);
        }
        Block::CodeBlock(_) | Block::HorizontalRule => {}
    }
}

pub fn walk_inline_mut<V: VisitorMut + ?Sized>(visitor: &mut V, inline: &mut Inline) {
    match inline {
        Inline::Emphasis(inner)
        | Inline::Strong(inner)
        | Inline::EmphasisStrong(inner)
        | Inline::Strikethrough(inner)
        | Inline::Marker(inner) => walk_inlines_mut(visitor, inner),
        Inline::Link(link) => walk_inlines_mut(visitor, &mut link.name),
        Inline::Sidenote(sidenote) => {
            walk_inlines_mut(visitor, &mut sidenote.word);
            if let Some(content) = &mut sidenote.content {
                walk_inlines_mut(visitor, content);
            }
        }
        Inline::Text(_) | Inline::Mono(_) | Inline::AmpSpecial(_) => {}
    }
}

pub fn walk_inlines_mut<V: VisitorMut + ?Sized>(visitor: &mut V, content: &mut [Inline]) {
    for inline in content {
        visitor.visit_inline_mut(inline);
    }
}
