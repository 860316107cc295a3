//! Matching for patterns with groups and extglob operators.
//!
//! `globset` has neither `(a|b)` groups nor the `@ ? * + !` extglob
//! operators, so patterns using them are compiled here. Every path segment
//! becomes an anchored regex. `regex` has no lookaround, so a segment
//! containing `!(..)` is matched by trying each split around the negated
//! part.

use regex::{Regex, RegexBuilder};

use crate::error::GlobError;
use crate::matcher::MatcherOptions;

/// Matcher for a pattern with group or extglob syntax.
#[derive(Debug, Clone)]
pub(crate) struct ExtendedMatcher {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    /// `**`, any number of path segments.
    Globstar,
    Part(SegmentMatcher),
}

#[derive(Debug, Clone)]
enum SegmentMatcher {
    Plain(Regex),
    /// `prefix`, then anything that is not `excluded`, then `rest`.
    Negated {
        prefix: Regex,
        excluded: Regex,
        rest: Box<SegmentMatcher>,
    },
}

enum Token {
    Regex(String),
    Negation(String),
}

impl ExtendedMatcher {
    pub(crate) fn new(
        source: &str,
        options: &MatcherOptions,
        pattern: &str,
    ) -> Result<Self, GlobError> {
        let segments = split_segments(source)
            .into_iter()
            .map(|segment| compile_segment(segment, options, pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }

    pub(crate) fn is_match(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').collect();
        match_segments(&self.segments, &parts)
    }
}

fn match_segments(segments: &[Segment], path: &[&str]) -> bool {
    match segments.split_first() {
        None => path.is_empty(),
        // A trailing `**` needs at least one segment, as in globset.
        Some((Segment::Globstar, [])) => !path.is_empty(),
        Some((Segment::Globstar, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((Segment::Part(part), rest)) => match path.split_first() {
            Some((head, tail)) => part.is_match(head) && match_segments(rest, tail),
            None => false,
        },
    }
}

impl SegmentMatcher {
    fn is_match(&self, segment: &str) -> bool {
        match self {
            SegmentMatcher::Plain(regex) => regex.is_match(segment),
            SegmentMatcher::Negated {
                prefix,
                excluded,
                rest,
            } => {
                let bounds: Vec<usize> = segment
                    .char_indices()
                    .map(|(index, _)| index)
                    .chain(std::iter::once(segment.len()))
                    .collect();

                bounds.iter().enumerate().any(|(i, &start)| {
                    prefix.is_match(&segment[..start])
                        && bounds[i..].iter().any(|&end| {
                            !excluded.is_match(&segment[start..end])
                                && rest.is_match(&segment[end..])
                        })
                })
            }
        }
    }
}

/// Split on `/` outside groups, braces and escapes.
fn split_segments(source: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut escaped = false;
    let mut start = 0;

    for (index, c) in source.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' | '{' => depth += 1,
            ')' | '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                segments.push(&source[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }

    segments.push(&source[start..]);
    segments
}

fn compile_segment(
    segment: &str,
    options: &MatcherOptions,
    pattern: &str,
) -> Result<Segment, GlobError> {
    if options.globstar && segment == "**" {
        return Ok(Segment::Globstar);
    }

    let mut parser = Parser {
        chars: segment.chars().collect(),
        pos: 0,
        options,
        pattern,
    };
    let tokens = parser.sequence(&[])?;
    build(tokens, options, pattern).map(Segment::Part)
}

fn build(
    tokens: Vec<Token>,
    options: &MatcherOptions,
    pattern: &str,
) -> Result<SegmentMatcher, GlobError> {
    let mut prefix = String::new();
    let mut tokens = tokens.into_iter();

    while let Some(token) = tokens.next() {
        match token {
            Token::Regex(regex) => prefix.push_str(&regex),
            Token::Negation(excluded) => {
                let rest = build(tokens.by_ref().collect(), options, pattern)?;
                return Ok(SegmentMatcher::Negated {
                    prefix: anchored(&prefix, options, pattern)?,
                    excluded: anchored(&excluded, options, pattern)?,
                    rest: Box::new(rest),
                });
            }
        }
    }

    anchored(&prefix, options, pattern).map(SegmentMatcher::Plain)
}

fn anchored(body: &str, options: &MatcherOptions, pattern: &str) -> Result<Regex, GlobError> {
    RegexBuilder::new(&format!("^(?:{body})$"))
        .case_insensitive(!options.case_sensitive)
        .build()
        .map_err(|err| invalid(pattern, err.to_string()))
}

fn invalid(pattern: &str, message: impl Into<String>) -> GlobError {
    GlobError::InvalidExtglob {
        pattern: pattern.to_string(),
        message: message.into(),
    }
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    options: &'a MatcherOptions,
    pattern: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Parse up to the end of input or the first of `stops`, which is left
    /// unread.
    fn sequence(&mut self, stops: &[char]) -> Result<Vec<Token>, GlobError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            if stops.contains(&c) {
                break;
            }
            self.pos += 1;

            let token = match c {
                '\\' => match self.peek() {
                    Some(escaped) => {
                        self.pos += 1;
                        literal(escaped)
                    }
                    None => literal('\\'),
                },
                '!' | '@' | '?' | '*' | '+'
                    if self.options.extglob && self.peek() == Some('(') =>
                {
                    self.extglob(c)?
                }
                '(' => self
                    .group(')', '|')?
                    .map(Token::Regex)
                    .unwrap_or_else(|| literal('(')),
                '{' if self.options.brace_expansion => self
                    .group('}', ',')?
                    .map(Token::Regex)
                    .unwrap_or_else(|| literal('{')),
                '[' => self
                    .class()
                    .map(Token::Regex)
                    .unwrap_or_else(|| literal('[')),
                '*' => {
                    while self.peek() == Some('*') {
                        self.pos += 1;
                    }
                    wildcard(c)
                }
                '?' => wildcard(c),
                _ => literal(c),
            };
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// `op(a|b)`, positioned on the `(`. An unterminated group leaves the
    /// operator with its plain meaning.
    fn extglob(&mut self, op: char) -> Result<Token, GlobError> {
        let start = self.pos;
        self.pos += 1;

        let Some(alternatives) = self.group(')', '|')? else {
            self.pos = start;
            return Ok(wildcard(op));
        };

        Ok(match op {
            '!' => Token::Negation(alternatives),
            '?' => Token::Regex(format!("{alternatives}?")),
            '*' => Token::Regex(format!("{alternatives}*")),
            '+' => Token::Regex(format!("{alternatives}+")),
            _ => Token::Regex(alternatives),
        })
    }

    /// Alternatives up to `close`, positioned after the opening symbol.
    /// `None` when the group is never closed.
    fn group(&mut self, close: char, separator: char) -> Result<Option<String>, GlobError> {
        let start = self.pos;
        let mut alternatives = Vec::new();

        loop {
            let mut alternative = String::new();
            for token in self.sequence(&[separator, close])? {
                match token {
                    Token::Regex(regex) => alternative.push_str(&regex),
                    Token::Negation(_) => {
                        return Err(invalid(self.pattern, "`!(..)` cannot be nested in a group"));
                    }
                }
            }
            alternatives.push(alternative);

            match self.peek() {
                Some(c) if c == separator => self.pos += 1,
                Some(_) => {
                    self.pos += 1;
                    return Ok(Some(format!("(?:{})", alternatives.join("|"))));
                }
                None => {
                    self.pos = start;
                    return Ok(None);
                }
            }
        }
    }

    /// `[...]`, positioned after the `[`. `None` when the class is never
    /// closed.
    fn class(&mut self) -> Option<String> {
        let start = self.pos;
        let mut class = String::from("[");

        if matches!(self.peek(), Some('!' | '^')) {
            class.push('^');
            self.pos += 1;
        }

        let mut first = true;
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                ']' if !first => {
                    class.push(']');
                    return Some(class);
                }
                '[' if self.peek() == Some(':') => {
                    // POSIX class such as `[:alpha:]`
                    let rest: String = self.chars[self.pos..].iter().collect();
                    match rest.find(":]") {
                        Some(end) => {
                            let name = &rest[..end + 2];
                            class.push('[');
                            class.push_str(name);
                            self.pos += name.chars().count();
                        }
                        None => push_class_char(&mut class, c),
                    }
                }
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        self.pos += 1;
                        push_class_char(&mut class, escaped);
                    }
                }
                '-' if !first => class.push('-'),
                _ => push_class_char(&mut class, c),
            }
            first = false;
        }

        self.pos = start;
        None
    }
}

fn literal(c: char) -> Token {
    Token::Regex(regex::escape(c.encode_utf8(&mut [0; 4])))
}

/// Plain glob meaning of `*` and `?`; anything else is literal.
fn wildcard(c: char) -> Token {
    match c {
        '*' => Token::Regex("[^/]*".to_string()),
        '?' => Token::Regex("[^/]".to_string()),
        _ => literal(c),
    }
}

fn push_class_char(class: &mut String, c: char) {
    if matches!(c, '[' | ']' | '\\' | '^' | '-' | '&' | '~') {
        class.push('\\');
    }
    class.push(c);
}
