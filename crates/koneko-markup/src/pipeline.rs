//! Whole-document entry points: lex, parse and resolve in one call, and the
//! hand-off type renderers accept.

use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use log::{debug, warn};

use crate::ast::Blog;
use crate::diagnostics::Diagnostics;
use crate::error::{InvariantViolation, LexError, ParseError};
use crate::html::TagRegistry;
use crate::lexer::lex;
use crate::meta::PostMeta;
use crate::parser::parse_with;
use crate::resolve::{ResolveContext, resolve};

/// A fully processed document, problems included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub source: String,
    pub blog: Blog,
    /// Typed metadata, when the metadata table was valid.
    pub meta: Option<PostMeta>,
    pub lex_errors: Vec<LexError>,
    pub parse_errors: Vec<ParseError>,
}

impl Document {
    pub fn has_errors(&self) -> bool {
        !self.lex_errors.is_empty() || !self.parse_errors.is_empty() || self.meta.is_none()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::collect(&self.name, &self.source, &self.lex_errors, &self.parse_errors)
    }

    /// The post, if it had no problems at all.
    pub fn into_validated(self) -> Result<ValidatedPost, Diagnostics> {
        if !self.lex_errors.is_empty() || !self.parse_errors.is_empty() {
            return Err(self.diagnostics());
        }
        match self.meta {
            Some(meta) => Ok(ValidatedPost {
                name: self.name,
                blog: self.blog,
                meta,
            }),
            // metadata problems are always reported as parse errors, so
            // this only happens for a hand-built document
            None => Err(Diagnostics::collect(&self.name, &self.source, &[], &[])),
        }
    }
}

/// A post with complete metadata and every reference resolved.
///
/// Only [`Document::into_validated`] creates one, so a [`Renderer`] never
/// has to check either property again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPost {
    name: String,
    blog: Blog,
    meta: PostMeta,
}

impl ValidatedPost {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blog(&self) -> &Blog {
        &self.blog
    }

    pub fn meta(&self) -> &PostMeta {
        &self.meta
    }

    pub fn into_parts(self) -> (Blog, PostMeta) {
        (self.blog, self.meta)
    }
}

/// Turns a validated post into output, e.g. HTML.
pub trait Renderer {
    type Output;
    type Error;

    fn render(&mut self, post: &ValidatedPost) -> Result<Self::Output, Self::Error>;
}

/// Lexes, parses and resolves one document with the default tags.
pub fn parse_document(
    name: impl Into<String>,
    source: impl Into<String>,
) -> Result<Document, InvariantViolation> {
    parse_document_with(name, source, &TagRegistry::default())
}

pub fn parse_document_with(
    name: impl Into<String>,
    source: impl Into<String>,
    registry: &TagRegistry,
) -> Result<Document, InvariantViolation> {
    let name = name.into();
    let source = source.into();

    let lexed = lex(&source);
    debug!(
        "{name}: {} tokens, {} lex errors",
        lexed.tokens.len(),
        lexed.errors.len()
    );
    let parsed = parse_with(&lexed.tokens, registry)?;
    let mut blog = parsed.blog;
    let mut parse_errors = parsed.errors;

    let resolution = resolve(&mut blog, &mut ResolveContext::new());
    parse_errors.extend(resolution.errors);
    parse_errors.sort_by_key(|e| e.pos);

    let lex_errors = lexed.errors;
    Ok(Document {
        name,
        source,
        blog,
        meta: resolution.meta,
        lex_errors,
        parse_errors,
    })
}

/// Processes independent documents on scoped worker threads. Results are in
/// input order, one per input; a failure in one document, even a panic, does
/// not affect the others.
pub fn parse_batch<N, S>(sources: &[(N, S)]) -> Vec<Result<Document, InvariantViolation>>
where
    N: AsRef<str> + Sync,
    S: AsRef<str> + Sync,
{
    parse_batch_with(sources, &TagRegistry::default())
}

pub fn parse_batch_with<N, S>(
    sources: &[(N, S)],
    registry: &TagRegistry,
) -> Vec<Result<Document, InvariantViolation>>
where
    N: AsRef<str> + Sync,
    S: AsRef<str> + Sync,
{
    if sources.is_empty() {
        return Vec::new();
    }
    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(sources.len());
    let chunk_size = sources.len().div_ceil(workers);
    debug!(
        "parsing {} documents on {workers} threads",
        sources.len()
    );

    thread::scope(|scope| {
        let handles: Vec<_> = sources
            .chunks(chunk_size)
            .map(|chunk| {
                let handle = scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|(name, source)| {
                            parse_isolated(name.as_ref(), source.as_ref(), registry)
                        })
                        .collect::<Vec<_>>()
                });
                (chunk.len(), handle)
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|(len, handle)| match handle.join() {
                Ok(results) => results,
                Err(_) => (0..len)
                    .map(|_| Err(InvariantViolation::new("parser thread panicked")))
                    .collect(),
            })
            .collect()
    })
}

/// Parses one document, turning a panic into an [`InvariantViolation`] so
/// the rest of its batch is unaffected.
fn parse_isolated(
    name: &str,
    source: &str,
    registry: &TagRegistry,
) -> Result<Document, InvariantViolation> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        parse_document_with(name, source, registry)
    }))
    .unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown cause".to_string());
        warn!("{name}: parser panicked: {reason}");
        Err(InvariantViolation::new(format!("parser panicked: {reason}")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, plain_text};
    use crate::error::ParseErrorKind;
    use crate::html::{HtmlTag, TagOutput};
    use pretty_assertions::assert_eq;

    const POST: &str = "---\nurl-path: hello\ntitle: Hi\nauthor: X\nlang: en\n---\n# S1\n\nBody.\n";

    #[test]
    fn valid_document_becomes_a_validated_post() {
        let doc = parse_document("hello.md", POST).expect("no invariant violation");
        assert!(!doc.has_errors());
        let post = doc.into_validated().expect("valid");
        assert_eq!(post.name(), "hello.md");
        assert_eq!(post.meta().url_path, "hello");
        assert_eq!(plain_text(&post.blog().sections[0].heading), "S1");
    }

    #[test]
    fn errors_block_validation() {
        let doc = parse_document("bad.md", "# S\n[x][^missing]\n").expect("no invariant violation");
        assert!(doc.has_errors());
        assert!(
            doc.parse_errors
                .iter()
                .any(|e| e.kind == ParseErrorKind::UnresolvedSidenote("missing".into()))
        );
        let diagnostics = doc.into_validated().expect_err("invalid");
        assert_eq!(diagnostics.name(), "bad.md");
        assert_eq!(diagnostics.len(), 5);
    }

    #[test]
    fn batch_keeps_input_order() {
        let sources: Vec<(String, String)> = (0..9)
            .map(|i| (format!("{i}.md"), format!("{POST}\nPost {i}.\n")))
            .collect();
        let docs = parse_batch(&sources);
        assert_eq!(docs.len(), 9);
        for (i, doc) in docs.into_iter().enumerate() {
            let doc = doc.expect("parsed");
            assert_eq!(doc.name, format!("{i}.md"));
            match doc.blog.sections[0].content.last() {
                Some(Block::Paragraph(p)) => assert_eq!(plain_text(&p.content), format!("Post {i}.")),
                other => panic!("unexpected block {other:?}"),
            }
        }
    }

    #[test]
    fn a_panicking_document_only_fails_itself() {
        fn explode(_: &mut Blog, _: &mut HtmlTag) -> Result<TagOutput, String> {
            panic!("handler bug");
        }
        let mut registry = TagRegistry::default();
        registry.register("Explode", explode);

        let sources: Vec<(String, String)> = (0..8)
            .map(|i| {
                let body = if i == 1 { "<Explode/>\n" } else { "Fine.\n" };
                (format!("{i}.md"), format!("{POST}\n{body}"))
            })
            .collect();
        let docs = parse_batch_with(&sources, &registry);

        assert_eq!(docs.len(), 8);
        for (i, doc) in docs.iter().enumerate() {
            match doc {
                Err(violation) => {
                    assert_eq!(i, 1);
                    assert!(violation.message.contains("handler bug"));
                }
                Ok(doc) => assert_eq!(doc.name, format!("{i}.md")),
            }
        }
        assert!(docs[1].is_err());
    }

    #[test]
    fn empty_batch() {
        let sources: [(&str, &str); 0] = [];
        assert!(parse_batch(&sources).is_empty());
    }

    struct HeadingCount;

    impl Renderer for HeadingCount {
        type Output = usize;
        type Error = std::convert::Infallible;

        fn render(&mut self, post: &ValidatedPost) -> Result<usize, Self::Error> {
            Ok(post.blog().sections.len())
        }
    }

    #[test]
    fn renderers_take_validated_posts() {
        let post = parse_document("p.md", POST)
            .expect("parsed")
            .into_validated()
            .expect("valid");
        assert_eq!(HeadingCount.render(&post), Ok(1));
    }
}
