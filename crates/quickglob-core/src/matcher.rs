//! Compiled pattern matchers.
//!
//! Plain globs compile with `globset`. Patterns with `(a|b)` groups or
//! extglob operators go through the segment matcher in `extglob`.

use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};

use crate::error::GlobError;
use crate::extglob::ExtendedMatcher;
use crate::pattern::{PatternOptions, escape_path, has_group_syntax, is_static_pattern};
use crate::settings::Settings;

/// Options that change how a single pattern is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherOptions {
    pub case_sensitive: bool,
    pub dot: bool,
    pub brace_expansion: bool,
    pub globstar: bool,
    pub extglob: bool,
    pub base_name_match: bool,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            dot: false,
            brace_expansion: true,
            globstar: true,
            extglob: true,
            base_name_match: false,
        }
    }
}

impl From<&Settings> for MatcherOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            case_sensitive: settings.case_sensitive_match,
            dot: settings.dot,
            brace_expansion: settings.brace_expansion,
            globstar: settings.globstar,
            extglob: settings.extglob,
            base_name_match: settings.base_name_match,
        }
    }
}

/// A compiled predicate over relative, `/`-separated paths.
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: String,
    program: Program,
    /// Match the final path segment only.
    base_name: bool,
    /// Hidden segments are matched like any other segment.
    dot: bool,
    /// Pattern segments that start with a period and may name hidden entries.
    explicit_dot_segments: Vec<Program>,
}

#[derive(Debug, Clone)]
enum Program {
    Glob(GlobMatcher),
    Extended(ExtendedMatcher),
}

impl Program {
    fn is_match(&self, path: &str) -> bool {
        match self {
            Program::Glob(glob) => glob.is_match(Path::new(path)),
            Program::Extended(extended) => extended.is_match(path),
        }
    }
}

impl Matcher {
    /// Source pattern this matcher was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Test a relative path.
    pub fn is_match(&self, path: &str) -> bool {
        let subject = if self.base_name {
            path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
        } else {
            path
        };

        if !self.program.is_match(subject) {
            return false;
        }

        self.dot || self.hidden_segments_allowed(subject)
    }

    fn hidden_segments_allowed(&self, path: &str) -> bool {
        path.split('/')
            .filter(|segment| is_hidden_segment(segment))
            .all(|segment| {
                self.explicit_dot_segments
                    .iter()
                    .any(|program| program.is_match(segment))
            })
    }
}

fn is_hidden_segment(segment: &str) -> bool {
    segment.starts_with('.') && segment != "." && segment != ".."
}

/// Compile one pattern into a matcher.
pub fn compile(pattern: &str, options: &MatcherOptions) -> Result<Matcher, GlobError> {
    let source = normalize_pattern(pattern, options);
    let program = build_program(&source, options, pattern)?;

    let explicit_dot_segments = if options.dot {
        Vec::new()
    } else {
        source
            .split('/')
            .filter(|segment| is_hidden_segment(segment))
            .map(|segment| build_program(segment, options, pattern))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(Matcher {
        pattern: pattern.to_string(),
        program,
        base_name: options.base_name_match && !source.contains('/'),
        dot: options.dot,
        explicit_dot_segments,
    })
}

/// Compile every pattern, failing on the first invalid one.
pub fn compile_many<S: AsRef<str>>(
    patterns: &[S],
    options: &MatcherOptions,
) -> Result<Vec<Matcher>, GlobError> {
    patterns
        .iter()
        .map(|p| compile(p.as_ref(), options))
        .collect()
}

/// Whether any matcher accepts the path. One leading `./` or `.\` is ignored.
pub fn match_any(path: &str, matchers: &[Matcher]) -> bool {
    let path = path
        .strip_prefix("./")
        .or_else(|| path.strip_prefix(".\\"))
        .unwrap_or(path);

    matchers.iter().any(|m| m.is_match(path))
}

fn normalize_pattern(pattern: &str, options: &MatcherOptions) -> String {
    let stripped = pattern.strip_prefix("./").unwrap_or(pattern);

    // Unterminated syntax in a static pattern is literal text.
    let classification = PatternOptions {
        brace_expansion: options.brace_expansion,
        case_sensitive_match: options.case_sensitive,
        extglob: options.extglob,
    };
    if is_static_pattern(stripped, &classification) {
        return escape_path(stripped);
    }

    let mut source = stripped.to_string();

    if !options.brace_expansion {
        source = source.replace('{', "\\{").replace('}', "\\}");
    }

    if !options.globstar {
        while source.contains("**") {
            source = source.replace("**", "*");
        }
    }

    source
}

fn build_program(
    source: &str,
    options: &MatcherOptions,
    original: &str,
) -> Result<Program, GlobError> {
    if has_group_syntax(source, options.extglob) {
        ExtendedMatcher::new(source, options, original).map(Program::Extended)
    } else {
        build_glob(source, options, original).map(Program::Glob)
    }
}

fn build_glob(source: &str, options: &MatcherOptions, original: &str) -> Result<GlobMatcher, GlobError> {
    GlobBuilder::new(source)
        .literal_separator(true)
        .backslash_escape(true)
        .empty_alternates(true)
        .case_insensitive(!options.case_sensitive)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| GlobError::InvalidPattern {
            pattern: original.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(pattern: &str) -> Matcher {
        compile(pattern, &MatcherOptions::default()).unwrap()
    }

    #[test]
    fn test_compile_and_match() {
        let m = matcher("*.js");
        assert!(m.is_match("index.js"));
        assert!(!m.is_match("src/index.js"));
        assert_eq!(m.pattern(), "*.js");
    }

    #[test]
    fn test_globstar() {
        let m = matcher("fixtures/**/*.md");
        assert!(m.is_match("fixtures/file.md"));
        assert!(m.is_match("fixtures/first/nested/file.md"));
        assert!(!m.is_match("other/file.md"));

        let flat = compile(
            "fixtures/**/*.md",
            &MatcherOptions {
                globstar: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(flat.is_match("fixtures/first/file.md"));
        assert!(!flat.is_match("fixtures/first/nested/file.md"));
    }

    #[test]
    fn test_match_any_strips_leading_dot_slash() {
        let matchers = compile_many(&["*.js"], &MatcherOptions::default()).unwrap();
        assert!(match_any("./test.js", &matchers));
        assert!(match_any(".\\test.js", &matchers));
        assert!(!match_any("./test.ts", &matchers));
    }

    #[test]
    fn test_match_any() {
        let matchers =
            compile_many(&["fixture*/**", "fixtures/nested/file*"], &MatcherOptions::default())
                .unwrap();
        assert!(match_any("fixtures/nested/file.txt", &matchers));

        let matchers = compile_many(&["fixtures/file"], &MatcherOptions::default()).unwrap();
        assert!(!match_any("fixtures/directory", &matchers));
    }

    #[test]
    fn test_pattern_with_leading_dot_slash() {
        let m = matcher("./*.js");
        assert!(m.is_match("a.js"));
    }

    #[test]
    fn test_hidden_entries_need_explicit_dot() {
        let m = matcher("**/*.md");
        assert!(m.is_match("docs/readme.md"));
        assert!(!m.is_match(".github/readme.md"));
        assert!(!m.is_match(".hidden.md"));

        let explicit = matcher(".github/*.md");
        assert!(explicit.is_match(".github/readme.md"));

        let dotted = compile(
            "**/*.md",
            &MatcherOptions {
                dot: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(dotted.is_match(".github/readme.md"));
    }

    #[test]
    fn test_parent_segments_are_not_hidden() {
        let m = matcher("../*.md");
        assert!(m.is_match("../readme.md"));
    }

    #[test]
    fn test_case_insensitive() {
        let m = compile(
            "*.MD",
            &MatcherOptions {
                case_sensitive: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(m.is_match("readme.md"));
        assert!(!matcher("*.MD").is_match("readme.md"));
    }

    #[test]
    fn test_base_name_match() {
        let options = MatcherOptions {
            base_name_match: true,
            ..Default::default()
        };
        let m = compile("*.md", &options).unwrap();
        assert!(m.is_match("a/b/readme.md"));

        // patterns with a separator still match the full path
        let full = compile("a/*.md", &options).unwrap();
        assert!(!full.is_match("x/a/readme.md"));
        assert!(full.is_match("a/readme.md"));
    }

    #[test]
    fn test_brace_expansion_toggle() {
        let m = matcher("*.{js,ts}");
        assert!(m.is_match("a.ts"));

        let literal = compile(
            "{a,b}.txt",
            &MatcherOptions {
                brace_expansion: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(literal.is_match("{a,b}.txt"));
        assert!(!literal.is_match("a.txt"));
    }

    #[test]
    fn test_static_pattern_with_unterminated_syntax() {
        let m = matcher("dir/[abc");
        assert!(m.is_match("dir/[abc"));

        let braces = matcher("{a,b");
        assert!(braces.is_match("{a,b"));
    }

    #[test]
    fn test_group_and_extglob_patterns() {
        let group = matcher("fixtures/(first|second)/*.md");
        assert!(group.is_match("fixtures/second/file.md"));

        let negated = matcher("fixtures/!(first)/*.md");
        assert!(negated.is_match("fixtures/second/file.md"));
        assert!(!negated.is_match("fixtures/first/file.md"));

        // hidden entries still need an explicit dot
        let any = matcher("@(a|.b)/*.md");
        assert!(any.is_match("a/x.md"));
        assert!(!any.is_match("a/.x.md"));
    }

    #[test]
    fn test_extglob_disabled_is_literal() {
        let options = MatcherOptions {
            extglob: false,
            ..Default::default()
        };
        let m = compile("+(a).js", &options).unwrap();
        assert!(m.is_match("+(a).js"));
        assert!(!m.is_match("a.js"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = compile("a/*[b", &MatcherOptions::default()).unwrap_err();
        assert!(matches!(err, GlobError::InvalidPattern { .. }));
    }
}
