//! Registry of recognised HTML tags.
//!
//! The parser collects a tag's attributes and content into an [`HtmlTag`] and
//! hands it to the handler registered under the tag's name. Handlers either
//! produce a block or inline for the current section or update the document
//! directly. A handler may take the nested tags it understands out of
//! [`HtmlTag::children`]; the parser dispatches whatever is left.

use std::collections::HashMap;
use std::mem;

use log::{info, warn};

use crate::ast::{Block, Blog, CodeBlock, Inline, Sidenote, plain_text};
use crate::parser::line_range;

/// A parsed tag with everything between its open and close.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlTag {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Raw lines, for tags whose content is not lexed.
    pub lines: Vec<String>,
    pub content: Vec<Inline>,
    pub children: Vec<HtmlTag>,
    pub pos: usize,
}

impl HtmlTag {
    pub fn new(name: impl Into<String>, pos: usize) -> Self {
        Self {
            name: name.into(),
            pos,
            ..Self::default()
        }
    }

    /// Value of the first attribute named `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// What a handler contributes to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOutput {
    Nothing,
    Block(Block),
    /// Placed in a paragraph of its own.
    Inline(Inline),
}

/// Handler for one tag name. Errors are reported as parse errors at the
/// tag's position.
pub type TagHandler = fn(&mut Blog, &mut HtmlTag) -> Result<TagOutput, String>;

#[derive(Debug, Clone)]
pub struct TagRegistry {
    handlers: HashMap<String, TagHandler>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("Abstract", abstract_tag);
        registry.register("Code", code_tag);
        registry.register("Todo", todo_tag);
        registry.register("Sidenote", sidenote_tag);
        registry
    }
}

impl TagRegistry {
    /// A registry that recognises no tags at all.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for `name`, replacing any previous handler.
    pub fn register(&mut self, name: impl Into<String>, handler: TagHandler) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Runs the handler for `tag`. Unknown tags are dropped with a warning.
    pub fn dispatch(&self, blog: &mut Blog, tag: &mut HtmlTag) -> Result<TagOutput, String> {
        match self.handlers.get(&tag.name) {
            Some(handler) => handler(blog, tag),
            None => {
                warn!("no handler for html tag <{}> at offset {}", tag.name, tag.pos);
                Ok(TagOutput::Nothing)
            }
        }
    }
}

fn abstract_tag(blog: &mut Blog, tag: &mut HtmlTag) -> Result<TagOutput, String> {
    if blog.abstract_text.is_some() {
        return Err("abstract is already defined".to_string());
    }
    blog.abstract_text = Some(mem::take(&mut tag.content));
    Ok(TagOutput::Nothing)
}

fn code_tag(_blog: &mut Blog, tag: &mut HtmlTag) -> Result<TagOutput, String> {
    let lines = match tag.attribute("Lines") {
        Some(range) => Some(line_range(range).ok_or_else(|| format!("invalid line range `{range}`"))?),
        None => None,
    };
    Ok(TagOutput::Block(Block::CodeBlock(CodeBlock {
        lang: tag.attribute("Lang").map(str::to_string),
        source: tag.attribute("Source").map(str::to_string),
        lines,
        content: mem::take(&mut tag.lines),
    })))
}

fn todo_tag(_blog: &mut Blog, tag: &mut HtmlTag) -> Result<TagOutput, String> {
    info!("todo at offset {}: {}", tag.pos, plain_text(&tag.content).trim());
    Ok(TagOutput::Nothing)
}

/// `<Sidenote Word="w">body</Sidenote>`, or the long form with `<Word>` and
/// `<Content>` children in that order.
fn sidenote_tag(_blog: &mut Blog, tag: &mut HtmlTag) -> Result<TagOutput, String> {
    let (word, content) = match tag.attribute("Word").map(str::to_string) {
        Some(word) => (vec![Inline::Text(word)], mem::take(&mut tag.content)),
        None => {
            let parts = match tag.children.as_mut_slice() {
                [word, content] if word.name == "Word" && content.name == "Content" => {
                    (mem::take(&mut word.content), mem::take(&mut content.content))
                }
                _ => {
                    return Err(
                        "sidenote needs a `Word` attribute or <Word> and <Content> children"
                            .to_string(),
                    );
                }
            };
            tag.children.clear();
            parts
        }
    };
    Ok(TagOutput::Inline(Inline::Sidenote(Sidenote {
        reference: String::new(),
        word,
        id: None,
        content: Some(content),
        pos: tag.pos,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::LineRange;
    use pretty_assertions::assert_eq;

    fn tag(name: &str, attributes: &[(&str, &str)]) -> HtmlTag {
        HtmlTag {
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..HtmlTag::new(name, 0)
        }
    }

    #[test]
    fn code_tag_builds_code_block() {
        let mut blog = Blog::default();
        let mut code = tag("Code", &[("Lang", "go"), ("Lines", "2-3")]);
        code.lines = vec!["a := 1".into(), "b := 2".into()];

        let output = TagRegistry::default().dispatch(&mut blog, &mut code);
        assert_eq!(
            output,
            Ok(TagOutput::Block(Block::CodeBlock(CodeBlock {
                lang: Some("go".into()),
                source: None,
                lines: Some(LineRange { first: 2, last: 3 }),
                content: vec!["a := 1".into(), "b := 2".into()],
            })))
        );
    }

    #[test]
    fn code_tag_rejects_bad_range() {
        let mut blog = Blog::default();
        let output =
            TagRegistry::default().dispatch(&mut blog, &mut tag("Code", &[("Lines", "x")]));
        assert_eq!(output, Err("invalid line range `x`".to_string()));
    }

    #[test]
    fn abstract_only_once() {
        let registry = TagRegistry::default();
        let mut blog = Blog::default();
        let mut first = tag("Abstract", &[]);
        first.content = vec![Inline::Text("Short.".into())];

        assert_eq!(registry.dispatch(&mut blog, &mut first), Ok(TagOutput::Nothing));
        assert_eq!(
            blog.abstract_text,
            Some(vec![Inline::Text("Short.".into())])
        );
        assert!(registry.dispatch(&mut blog, &mut tag("Abstract", &[])).is_err());
    }

    #[test]
    fn unknown_tags_are_ignored() {
        let mut blog = Blog::default();
        let output = TagRegistry::default().dispatch(&mut blog, &mut tag("Marquee", &[]));
        assert_eq!(output, Ok(TagOutput::Nothing));
        assert_eq!(blog, Blog::default());
    }

    #[test]
    fn custom_handlers() {
        fn rule(_: &mut Blog, _: &mut HtmlTag) -> Result<TagOutput, String> {
            Ok(TagOutput::Block(Block::HorizontalRule))
        }
        let mut registry = TagRegistry::empty();
        assert!(!registry.is_registered("Break"));
        registry.register("Break", rule);
        let output = registry.dispatch(&mut Blog::default(), &mut tag("Break", &[]));
        assert_eq!(output, Ok(TagOutput::Block(Block::HorizontalRule)));
    }

    fn with_content(mut tag: HtmlTag, text: &str) -> HtmlTag {
        tag.content = vec![Inline::Text(text.into())];
        tag
    }

    #[test]
    fn sidenote_tag_with_word_attribute() {
        let mut note = with_content(tag("Sidenote", &[("Word", "cat")]), "A small animal.");
        note.pos = 7;

        let output = TagRegistry::default().dispatch(&mut Blog::default(), &mut note);
        assert_eq!(
            output,
            Ok(TagOutput::Inline(Inline::Sidenote(Sidenote {
                reference: String::new(),
                word: vec![Inline::Text("cat".into())],
                id: None,
                content: Some(vec![Inline::Text("A small animal.".into())]),
                pos: 7,
            })))
        );
    }

    #[test]
    fn sidenote_tag_with_children() {
        let mut note = tag("Sidenote", &[]);
        note.children = vec![
            with_content(tag("Word", &[]), "cat"),
            with_content(tag("Content", &[]), "A small animal."),
        ];

        let output = TagRegistry::default().dispatch(&mut Blog::default(), &mut note);
        match output {
            Ok(TagOutput::Inline(Inline::Sidenote(sidenote))) => {
                assert_eq!(plain_text(&sidenote.word), "cat");
                assert_eq!(
                    sidenote.content,
                    Some(vec![Inline::Text("A small animal.".into())])
                );
            }
            other => panic!("expected sidenote, got {other:?}"),
        }
        // consumed, so the parser does not dispatch them again
        assert!(note.children.is_empty());
    }

    #[test]
    fn sidenote_tag_needs_a_word() {
        let mut note = tag("Sidenote", &[]);
        note.children = vec![with_content(tag("Content", &[]), "body")];

        let output = TagRegistry::default().dispatch(&mut Blog::default(), &mut note);
        assert!(output.is_err());
        assert_eq!(note.children.len(), 1);
    }
}
