use koneko_markup::ast::{Section, SectionLevel, plain_text};
use koneko_markup::{Renderer, ValidatedPost};
use std::convert::Infallible;
use std::fmt::Write;

/// Renders a post's title line followed by its section tree, one heading per
/// line with its anchor id.
#[derive(Debug, Default)]
pub struct Outline;

impl Renderer for Outline {
    type Output = String;
    type Error = Infallible;

    fn render(&mut self, post: &ValidatedPost) -> Result<String, Infallible> {
        let meta = post.meta();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} [/{}] ({} min)",
            plain_text(&meta.title),
            meta.url_path,
            meta.reading_minutes(post.blog())
        );
        for section in &post.blog().sections {
            write_section(&mut out, section);
        }
        Ok(out)
    }
}

fn write_section(out: &mut String, section: &Section) {
    let indent = match section.level {
        SectionLevel::One => "",
        SectionLevel::Two => "  ",
    };
    let marker = "#".repeat(usize::from(section.level.number()));
    let _ = writeln!(
        out,
        "{indent}{marker} {} {{#{}}}",
        plain_text(&section.heading),
        section.id.as_deref().unwrap_or_default()
    );
    for sub in section.subsections() {
        write_section(out, sub);
    }
}
