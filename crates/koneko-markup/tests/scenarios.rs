use koneko_markup::ast::{Block, Inline, plain_text};
use koneko_markup::error::{ErrorCategory, LexErrorKind, ParseErrorKind};
use koneko_markup::{TokenKind, lex, parse_document};
use pretty_assertions::assert_eq;

fn dump(src: &str) -> String {
    lex(src)
        .tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn scenario_a_minimal_post() {
    let src = "---\nurl-path: hello\ntitle: Hi\nauthor: X\nlang: en\n---\n# S1\n\nBody.\n";
    let doc = parse_document("a.md", src).unwrap();
    assert!(!doc.has_errors(), "{}", doc.diagnostics());

    let meta = &doc.blog.meta;
    assert_eq!(meta.len(), 4);
    for (key, value) in [("url-path", "hello"), ("title", "Hi"), ("author", "X"), ("lang", "en")] {
        assert_eq!(meta.first_text(key).as_deref(), Some(value), "{key}");
    }

    assert_eq!(doc.blog.sections.len(), 1);
    let section = &doc.blog.sections[0];
    assert_eq!(plain_text(&section.heading), "S1");
    match section.content.as_slice() {
        [Block::Paragraph(p)] => assert_eq!(p.content, vec![Inline::Text("Body.".into())]),
        other => panic!("unexpected content {other:?}"),
    }
}

#[test]
fn scenario_b_code_span_splits_text() {
    let kinds: Vec<_> = lex("Some `code` here.\n")
        .tokens
        .iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::ParagraphBegin,
            TokenKind::Text,
            TokenKind::Mono,
            TokenKind::Text,
            TokenKind::ParagraphEnd,
            TokenKind::Whitespace,
            TokenKind::Eof,
        ]
    );

    insta::assert_snapshot!(dump("Some `code` here.\n"), @r#"
    ParagraphBegin@0..0
    Text@0..5 "Some "
    Mono@5..11 "`code`" => "code"
    Text@11..17 " here."
    ParagraphEnd@17..17
    Whitespace@17..18 "\n"
    Eof@18..18
    "#);
}

#[test]
fn scenario_c_sidenote_defined_after_use() {
    let src = "# S\n\nA [word][^sn1] here.\n\n[^sn1]: body\n";
    let doc = parse_document("c.md", src).unwrap();
    assert!(
        doc.parse_errors
            .iter()
            .all(|e| e.category() != ErrorCategory::Resolution)
    );

    let Block::Paragraph(p) = &doc.blog.sections[0].content[0] else {
        panic!("expected paragraph");
    };
    match &p.content[1] {
        Inline::Sidenote(note) => {
            assert_eq!(note.reference, "sn1");
            assert_eq!(plain_text(&note.word), "word");
            assert_eq!(note.content, Some(vec![Inline::Text("body".into())]));
        }
        other => panic!("expected sidenote, got {other:?}"),
    }
}

#[test]
fn scenario_c_missing_definition() {
    let doc = parse_document("c.md", "# S\n\nA [word][^sn1] here.\n").unwrap();
    let resolution: Vec<_> = doc
        .parse_errors
        .iter()
        .filter(|e| e.category() == ErrorCategory::Resolution)
        .collect();
    assert_eq!(resolution.len(), 1);
    assert_eq!(
        resolution[0].kind,
        ParseErrorKind::UnresolvedSidenote("sn1".into())
    );
    assert_eq!(resolution[0].pos, 7);
}

#[test]
fn scenario_d_unterminated_metadata() {
    let src = "---\ntitle: x\n";
    let out = lex(src);
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].kind, LexErrorKind::UnterminatedMeta);

    insta::assert_snapshot!(dump(src), @r#"
    MetaBegin@0..3 "---"
    Whitespace@3..4 "\n"
    MetaKey@4..11 "title: " => "title"
    Text@11..12 "x"
    Whitespace@12..13 "\n"
    MetaEnd@13..13
    Eof@13..13
    "#);

    // the document still parses, with the metadata it did get
    let doc = parse_document("d.md", src).unwrap();
    assert_eq!(doc.blog.meta.first_text("title").as_deref(), Some("x"));
    assert_eq!(doc.lex_errors.len(), 1);
}
