//! # koneko-markup
//!
//! Lexer, parser and reference resolver for the koneko blog markup: a small
//! markdown-like language with a metadata header, two levels of sections,
//! sidenotes and a handful of HTML tags.
//!
//! ## Architecture Overview
//!
//! ```text
//! Source Text → Lexer → Tokens → Parser → Blog → Resolver → Blog + PostMeta
//!              (Scanner)          (two section slots,      (links, sidenotes,
//!                                  inline frame stack)      ids, metadata)
//! ```
//!
//! 1. The [`lexer`] walks the source with a [`scanner::Scanner`] and emits a
//!    flat [`token::Token`] stream that covers every byte of the input.
//! 2. The [`parser`] builds the [`ast::Blog`] tree in one forward pass.
//!    Recognised HTML tags are handed to the [`html::TagRegistry`].
//! 3. [`resolve()`] fills in references whose definitions came later, assigns
//!    anchor ids and converts the metadata table into a [`meta::PostMeta`].
//!
//! Problems are collected rather than raised, so one run reports all of
//! them. [`diagnostics::Diagnostics`] formats them with line and column.
//!
//! ## Usage
//!
//! ```
//! use koneko_markup::parse_document;
//!
//! let source = "---\nurl-path: hello\ntitle: Hi\nauthor: X\nlang: en\n---\n# S1\n\nBody.\n";
//! let doc = parse_document("hello.md", source).unwrap();
//! let post = doc.into_validated().unwrap();
//! assert_eq!(post.meta().url_path, "hello");
//! assert_eq!(post.blog().sections.len(), 1);
//! ```

pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod html;
pub mod lexer;
pub mod meta;
pub mod parser;
pub mod pipeline;
pub mod resolve;
pub mod scanner;
pub mod stats;
pub mod token;
pub mod visit;

pub use ast::{Block, Blog, Inline, Section};
pub use diagnostics::{Diagnostics, LineIndex};
pub use error::{ErrorCategory, InvariantViolation, LexError, ParseError};
pub use html::{HtmlTag, TagOutput, TagRegistry};
pub use lexer::lex;
pub use meta::PostMeta;
pub use parser::parse;
pub use pipeline::{
    Document, Renderer, ValidatedPost, parse_batch, parse_batch_with, parse_document,
    parse_document_with,
};
pub use resolve::{ResolveContext, resolve};
pub use stats::estimate_reading_minutes;
pub use token::{Token, TokenKind, reconstruct};
