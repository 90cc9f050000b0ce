//! Typed view of a post's metadata block.
//!
//! The parser keeps the raw `key: value` table as written. [`PostMeta::extract`]
//! checks it against the fixed key set and converts the values, collecting
//! every problem as a configuration error instead of stopping at the first.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{Blog, Inline, Meta, MetaValue};
use crate::error::{ParseError, ParseErrorKind};
use crate::stats::estimate_reading_minutes;

/// Keys every post must define with a non-empty value.
pub const MANDATORY_KEYS: [&str; 4] = ["url-path", "author", "title", "lang"];

const OPTIONAL_KEYS: [&str; 16] = [
    "email",
    "rel-me",
    "fedi-creator",
    "description",
    "alt-title",
    "published",
    "revised",
    "est-reading",
    "series",
    "series-prev",
    "series-prev-link",
    "series-next",
    "series-next-link",
    "enable-revision-warning",
    "tags",
    "template",
];

/// Keys holding URLs, paths, dates or plain words. Their values are taken
/// verbatim: `&` or `--` in a link is not markup.
pub const VERBATIM_KEYS: [&str; 12] = [
    "url-path",
    "lang",
    "email",
    "rel-me",
    "fedi-creator",
    "published",
    "revised",
    "est-reading",
    "series-prev-link",
    "series-next-link",
    "enable-revision-warning",
    "template",
];

/// Keys that may appear more than once; their values are concatenated.
const REPEATABLE_KEYS: [&str; 1] = ["tags"];

pub fn is_known_key(key: &str) -> bool {
    MANDATORY_KEYS.contains(&key) || OPTIONAL_KEYS.contains(&key)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMeta {
    pub url_path: String,
    pub author: String,
    pub title: Vec<Inline>,
    pub lang: String,
    pub email: Option<String>,
    pub rel_me: Option<String>,
    pub fedi_creator: Option<String>,
    pub description: Option<String>,
    pub alt_title: Option<Vec<Inline>>,
    pub published: Option<Date>,
    pub revised: Option<Date>,
    /// Reading time in minutes, when the author gave one.
    pub est_reading: Option<u32>,
    pub series: Option<Series>,
    pub enable_revision_warning: bool,
    pub tags: Vec<String>,
    pub template: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Series {
    pub name: Option<String>,
    pub prev: Option<SeriesItem>,
    pub next: Option<SeriesItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesItem {
    pub title: Vec<Inline>,
    pub link: Option<String>,
}

impl PostMeta {
    pub fn extract(meta: &Meta) -> Result<PostMeta, Vec<ParseError>> {
        let mut ex = Extractor {
            meta,
            errors: Vec::new(),
        };

        for (key, values) in meta.iter() {
            if !is_known_key(key) {
                let pos = values.first().map(|v| v.pos).unwrap_or(0);
                ex.error(pos, ParseErrorKind::UnknownMetaKey(key.to_string()));
            }
        }

        let url_path = ex.mandatory("url-path").map(|v| v.text());
        let author = ex.mandatory("author").map(|v| v.text());
        let title = ex.mandatory("title").map(|v| v.content.clone());
        let lang = ex.mandatory("lang").map(|v| v.text());

        let email = ex.text("email");
        let rel_me = ex.text("rel-me");
        let fedi_creator = ex.text("fedi-creator");
        let description = ex.text("description");
        let alt_title = ex.single("alt-title").map(|v| v.content.clone());
        let template = ex.text("template");
        let published = ex.parsed("published", |text| {
            text.parse::<Date>().map_err(|e| e.to_string())
        });
        let revised = ex.parsed("revised", |text| {
            text.parse::<Date>().map_err(|e| e.to_string())
        });
        let est_reading = ex.parsed("est-reading", |text| {
            text.parse::<u32>()
                .map_err(|_| "expected a whole number of minutes".to_string())
        });
        let enable_revision_warning = ex
            .parsed("enable-revision-warning", |text| match text {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(format!("invalid option `{other}`, expected one of true, false")),
            })
            .unwrap_or(false);
        let series = ex.series();

        let tags = meta
            .get("tags")
            .iter()
            .flat_map(|value| {
                value
                    .text()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();

        match (url_path, author, title, lang) {
            (Some(url_path), Some(author), Some(title), Some(lang)) if ex.errors.is_empty() => {
                Ok(PostMeta {
                    url_path,
                    author,
                    title,
                    lang,
                    email,
                    rel_me,
                    fedi_creator,
                    description,
                    alt_title,
                    published,
                    revised,
                    est_reading,
                    series,
                    enable_revision_warning,
                    tags,
                    template,
                })
            }
            _ => Err(ex.errors),
        }
    }

    /// The author's estimate, or one computed from the post's word count.
    pub fn reading_minutes(&self, blog: &Blog) -> u32 {
        self.est_reading
            .unwrap_or_else(|| estimate_reading_minutes(blog))
    }
}

struct Extractor<'m> {
    meta: &'m Meta,
    errors: Vec<ParseError>,
}

impl<'m> Extractor<'m> {
    fn error(&mut self, pos: usize, kind: ParseErrorKind) {
        self.errors.push(ParseError::new(pos, kind));
    }

    /// The first value of a single-valued key, reporting any repeats.
    fn single(&mut self, key: &str) -> Option<&'m MetaValue> {
        let values = self.meta.get(key);
        if values.len() > 1 && !REPEATABLE_KEYS.contains(&key) {
            self.error(values[1].pos, ParseErrorKind::DuplicateMetaKey(key.to_string()));
        }
        values.first()
    }

    fn mandatory(&mut self, key: &'static str) -> Option<&'m MetaValue> {
        match self.single(key) {
            Some(value) if !value.text().is_empty() => Some(value),
            Some(value) => {
                self.error(value.pos, ParseErrorKind::MissingMetaKey(key));
                None
            }
            None => {
                self.error(0, ParseErrorKind::MissingMetaKey(key));
                None
            }
        }
    }

    fn text(&mut self, key: &str) -> Option<String> {
        self.single(key).map(MetaValue::text)
    }

    fn parsed<T>(&mut self, key: &str, parse: impl Fn(&str) -> Result<T, String>) -> Option<T> {
        let value = self.single(key)?;
        match parse(&value.text()) {
            Ok(parsed) => Some(parsed),
            Err(message) => {
                self.error(
                    value.pos,
                    ParseErrorKind::InvalidMetaValue {
                        key: key.to_string(),
                        message,
                    },
                );
                None
            }
        }
    }

    fn series(&mut self) -> Option<Series> {
        let name = self.text("series");
        let prev = self.series_item("series-prev", "series-prev-link");
        let next = self.series_item("series-next", "series-next-link");
        if name.is_none() && prev.is_none() && next.is_none() {
            return None;
        }
        Some(Series { name, prev, next })
    }

    fn series_item(&mut self, title_key: &str, link_key: &str) -> Option<SeriesItem> {
        let title = self.single(title_key).map(|v| v.content.clone());
        let link = self.single(link_key);
        match (title, link) {
            (Some(title), link) => Some(SeriesItem {
                title,
                link: link.map(MetaValue::text),
            }),
            (None, Some(link)) => {
                self.error(
                    link.pos,
                    ParseErrorKind::InvalidMetaValue {
                        key: link_key.to_string(),
                        message: format!("requires `{title_key}` to be set"),
                    },
                );
                None
            }
            (None, None) => None,
        }
    }
}

/// A calendar date from `YYYY-MM-DD` or an RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub time: Option<TimeOfDay>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// UTC offset as written, e.g. `Z` or `+02:00`.
    pub offset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("invalid date format, use 2006-01-02 or RFC 3339")]
    Format,
    #[error("date {0} does not exist")]
    OutOfRange(String),
}

fn date_regex() -> &'static Regex {
    static DATE_REGEX: OnceLock<Regex> = OnceLock::new();
    DATE_REGEX.get_or_init(|| {
        Regex::new(
            r"^(\d{4})-(\d{2})-(\d{2})(?:[Tt ](\d{2}):(\d{2}):(\d{2})(?:\.\d+)?([Zz]|[+-]\d{2}:\d{2}))?$",
        )
        .expect("invalid date regex")
    })
}

impl FromStr for Date {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = date_regex().captures(s.trim()).ok_or(DateError::Format)?;
        let num = |i: usize| -> u16 {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };

        let (year, month, day) = (num(1), num(2) as u8, num(3) as u8);
        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return Err(DateError::OutOfRange(format!("{year:04}-{month:02}-{day:02}")));
        }

        let time = match caps.get(7) {
            Some(offset) => {
                let (hour, minute, second) = (num(4) as u8, num(5) as u8, num(6) as u8);
                if hour > 23 || minute > 59 || second > 60 {
                    return Err(DateError::OutOfRange(s.trim().to_string()));
                }
                Some(TimeOfDay {
                    hour,
                    minute,
                    second,
                    offset: offset.as_str().to_uppercase(),
                })
            }
            None => None,
        };

        Ok(Date {
            year,
            month,
            day,
            time,
        })
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn meta(body: &str) -> Meta {
        let src = format!("---\n{body}---\n");
        parse(&lex(&src).tokens).expect("parse").blog.meta
    }

    fn error_kinds(errors: &[ParseError]) -> Vec<ParseErrorKind> {
        errors.iter().map(|e| e.kind.clone()).collect()
    }

    const REQUIRED: &str = "url-path: hello\nauthor: X\ntitle: Hi\nlang: en\n";

    #[test]
    fn minimal_post() {
        let post = PostMeta::extract(&meta(REQUIRED)).expect("valid meta");
        assert_eq!(post.url_path, "hello");
        assert_eq!(post.author, "X");
        assert_eq!(post.title, vec![Inline::Text("Hi".into())]);
        assert_eq!(post.lang, "en");
        assert_eq!(post.series, None);
        assert!(!post.enable_revision_warning);
    }

    #[test]
    fn link_values_are_taken_verbatim() {
        let src = format!(
            "---\n{REQUIRED}rel-me: https://x.org/?a=1&b=2\nseries-next: Part *two*\nseries-next-link: /posts/part--two\n---\n"
        );
        let lexed = lex(&src);
        assert!(lexed.errors.is_empty(), "{:?}", lexed.errors);

        let meta = parse(&lexed.tokens).expect("parse").blog.meta;
        let post = PostMeta::extract(&meta).expect("valid meta");
        assert_eq!(post.rel_me.as_deref(), Some("https://x.org/?a=1&b=2"));
        let next = post.series.and_then(|s| s.next).expect("next part");
        assert_eq!(next.link.as_deref(), Some("/posts/part--two"));
        // titles are still markup
        assert_eq!(
            next.title,
            vec![
                Inline::Text("Part ".into()),
                Inline::Emphasis(vec![Inline::Text("two".into())]),
            ]
        );
    }

    #[test]
    fn every_missing_key_is_reported() {
        let errors = PostMeta::extract(&meta("title: Hi\n")).expect_err("missing keys");
        assert_eq!(
            error_kinds(&errors),
            vec![
                ParseErrorKind::MissingMetaKey("url-path"),
                ParseErrorKind::MissingMetaKey("author"),
                ParseErrorKind::MissingMetaKey("lang"),
            ]
        );
    }

    #[test]
    fn optional_values_are_typed() {
        let body = format!(
            "{REQUIRED}published: 2019-11-15\nrevised: 2020-12-13T10:00:00+01:00\n\
             est-reading: 7\nenable-revision-warning: true\ntags: rust parsing\ntags: blog\n\
             series: Parsers\nseries-next: Part *two*\nseries-next-link: /part-2\n"
        );
        let post = PostMeta::extract(&meta(&body)).expect("valid meta");

        assert_eq!(post.published.as_ref().map(Date::to_string).as_deref(), Some("2019-11-15"));
        let revised = post.revised.expect("revised");
        assert_eq!(revised.time.map(|t| t.offset).as_deref(), Some("+01:00"));
        assert_eq!(post.est_reading, Some(7));
        assert!(post.enable_revision_warning);
        assert_eq!(post.tags, vec!["rust", "parsing", "blog"]);

        let series = post.series.expect("series");
        assert_eq!(series.name.as_deref(), Some("Parsers"));
        let next = series.next.expect("next");
        assert_eq!(crate::ast::plain_text(&next.title), "Part two");
        assert_eq!(next.link.as_deref(), Some("/part-2"));
        assert_eq!(series.prev, None);
    }

    #[test]
    fn duplicate_and_unknown_keys() {
        let body = format!("{REQUIRED}lang: de\ncolour: blue\n");
        let errors = PostMeta::extract(&meta(&body)).expect_err("bad meta");
        let mut kinds = error_kinds(&errors);
        kinds.sort_by_key(|k| k.to_string());
        assert_eq!(
            kinds,
            vec![
                ParseErrorKind::DuplicateMetaKey("lang".into()),
                ParseErrorKind::UnknownMetaKey("colour".into()),
            ]
        );
    }

    #[rstest]
    #[case("est-reading: soon\n", "est-reading")]
    #[case("published: 15.11.2019\n", "published")]
    #[case("enable-revision-warning: yes\n", "enable-revision-warning")]
    #[case("series-prev-link: /p1\n", "series-prev-link")]
    fn invalid_values(#[case] line: &str, #[case] key: &str) {
        let body = format!("{REQUIRED}{line}");
        let errors = PostMeta::extract(&meta(&body)).expect_err("invalid value");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0].kind,
            ParseErrorKind::InvalidMetaValue { key: k, .. } if k == key
        ));
    }

    #[rstest]
    #[case("2024-02-29", true)]
    #[case("2023-02-29", false)]
    #[case("2019-13-01", false)]
    #[case("2019-11-15T08:30:00Z", true)]
    #[case("2019-11-15T08:30:00.123-05:00", true)]
    #[case("2019-11-15T25:00:00Z", false)]
    #[case("2019-11-15T08:30:00", false)]
    fn dates(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(input.parse::<Date>().is_ok(), valid, "{input}");
    }
}
