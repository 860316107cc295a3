//! Pattern classification and structural analysis.
//!
//! Everything here is a pure function over a single pattern string. Nothing
//! parses glob syntax fully; the predicates only recognise enough structure
//! to decide whether a pattern needs a matcher, where its literal prefix
//! ends and how deep a traversal for it can usefully go.

use std::sync::LazyLock;

use regex::Regex;

use crate::settings::Settings;

/// A glob pattern.
pub type Pattern = String;

const GLOBSTAR: &str = "**";
const ESCAPE_SYMBOL: char = '\\';

static COMMON_GLOB_SYMBOLS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*?]|^!").expect("valid regex"));
static REGEX_CHARACTER_CLASS_SYMBOLS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*\]").expect("valid regex"));
static REGEX_GROUP_SYMBOLS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^!*+?@])\(.*\|.*\)").expect("valid regex"));
static GLOB_EXTENSION_SYMBOLS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!*+?@]\(.*\)").expect("valid regex"));
static BRACE_EXPANSIONS_SYMBOLS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{.*(?:,|\.\.).*\}").expect("valid regex"));

// Enclosure at the end of a pattern that may hide a path separator.
static ENCLOSURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\{\[].*/*.*[\}\]]$").expect("valid regex"));
static GLOBBY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\\])([\{\[]|\([^\)]+$)").expect("valid regex"));
static ESCAPED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([!*?|\[\](){}])").expect("valid regex"));

/// Syntax toggles that change how a pattern is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternOptions {
    pub brace_expansion: bool,
    pub case_sensitive_match: bool,
    pub extglob: bool,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            brace_expansion: true,
            case_sensitive_match: true,
            extglob: true,
        }
    }
}

impl From<&Settings> for PatternOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            brace_expansion: settings.brace_expansion,
            case_sensitive_match: settings.case_sensitive_match,
            extglob: settings.extglob,
        }
    }
}

/// Whether the pattern needs a matcher, i.e. cannot be resolved by a plain
/// existence check.
///
/// Case-insensitive matching makes every pattern dynamic. Unterminated
/// classes, groups and braces are literal text.
pub fn is_dynamic_pattern(pattern: &str, options: &PatternOptions) -> bool {
    if !options.case_sensitive_match || pattern.contains(ESCAPE_SYMBOL) {
        return true;
    }

    if COMMON_GLOB_SYMBOLS_RE.is_match(pattern)
        || REGEX_CHARACTER_CLASS_SYMBOLS_RE.is_match(pattern)
        || REGEX_GROUP_SYMBOLS_RE.is_match(pattern)
    {
        return true;
    }

    if options.extglob && GLOB_EXTENSION_SYMBOLS_RE.is_match(pattern) {
        return true;
    }

    options.brace_expansion && BRACE_EXPANSIONS_SYMBOLS_RE.is_match(pattern)
}

/// Whether the pattern uses `(a|b)` groups, or extglob operators when
/// `extglob` is on. Such patterns need more than plain glob matching.
pub fn has_group_syntax(pattern: &str, extglob: bool) -> bool {
    REGEX_GROUP_SYMBOLS_RE.is_match(pattern)
        || (extglob && GLOB_EXTENSION_SYMBOLS_RE.is_match(pattern))
}

pub fn is_static_pattern(pattern: &str, options: &PatternOptions) -> bool {
    !is_dynamic_pattern(pattern, options)
}

/// Whether the pattern is an exclusion. `!(a|b)` is an extglob negation,
/// not an exclusion.
pub fn is_negative_pattern(pattern: &str) -> bool {
    pattern.starts_with('!') && pattern.as_bytes().get(1) != Some(&b'(')
}

pub fn is_positive_pattern(pattern: &str) -> bool {
    !is_negative_pattern(pattern)
}

pub fn get_negative_patterns<S: AsRef<str>>(patterns: &[S]) -> Vec<Pattern> {
    patterns
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| is_negative_pattern(p))
        .map(str::to_string)
        .collect()
}

pub fn get_positive_patterns<S: AsRef<str>>(patterns: &[S]) -> Vec<Pattern> {
    patterns
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| is_positive_pattern(p))
        .map(str::to_string)
        .collect()
}

pub fn convert_to_positive_pattern(pattern: &str) -> Pattern {
    if is_negative_pattern(pattern) {
        pattern[1..].to_string()
    } else {
        pattern.to_string()
    }
}

pub fn convert_to_negative_pattern(pattern: &str) -> Pattern {
    format!("!{pattern}")
}

/// Deepest directory prefix of the pattern that contains no glob syntax.
///
/// Backslashes are never treated as separators, so an escaped character is
/// not mistaken for a directory boundary. Returns `"."` when the first
/// segment is already dynamic.
pub fn get_base_directory(pattern: &str) -> String {
    let mut path = pattern.to_string();
    if ENCLOSURE_RE.is_match(&path) {
        path.push('/');
    }
    // Keeps a trailing separator from being swallowed by the first dirname.
    path.push('a');

    loop {
        path = posix_dirname(&path).to_string();
        if !is_globby(&path) {
            break;
        }
    }

    ESCAPED_RE.replace_all(&path, "$1").into_owned()
}

fn is_globby(path: &str) -> bool {
    GLOBBY_RE.is_match(path) || has_unescaped_glob(path)
}

fn has_unescaped_glob(path: &str) -> bool {
    // Blank out escaped characters so they cannot trigger a match.
    let mut plain = String::with_capacity(path.len());
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE_SYMBOL {
            chars.next();
            plain.push('_');
        } else {
            plain.push(c);
        }
    }
    is_dynamic_pattern(&plain, &PatternOptions::default())
}

fn posix_dirname(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        None => ".",
        Some(0) => "/",
        Some(idx) => {
            let parent = trimmed[..idx].trim_end_matches('/');
            if parent.is_empty() { "/" } else { parent }
        }
    }
}

fn posix_basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

pub fn has_glob_star(pattern: &str) -> bool {
    pattern.contains(GLOBSTAR)
}

pub fn ends_with_slash_glob_star(pattern: &str) -> bool {
    pattern.ends_with("/**")
}

/// Whether an exclusion built from this pattern can prune whole subtrees.
///
/// True when the last segment is a literal name or the pattern ends with
/// `/**`. Wildcard-terminated patterns only reject final matches.
pub fn is_affect_depth_of_reading_pattern(pattern: &str) -> bool {
    let basename = posix_basename(pattern);

    ends_with_slash_glob_star(pattern) || is_static_pattern(basename, &PatternOptions::default())
}

/// Structural depth estimate of a pattern below its base directory.
///
/// Brace and extglob expansion are ignored; the result is a ceiling used
/// for pruning, not the exact depth of any match.
pub fn get_naive_depth(pattern: &str) -> usize {
    let base = get_base_directory(pattern);

    let pattern_depth = pattern.split('/').count();
    let base_depth = base.split('/').count();

    if base == "." {
        pattern_depth.saturating_sub(base_depth)
    } else {
        pattern_depth.saturating_sub(base_depth + 1)
    }
}

pub fn get_max_naive_patterns_depth<S: AsRef<str>>(patterns: &[S]) -> usize {
    patterns
        .iter()
        .map(|p| get_naive_depth(p.as_ref()))
        .max()
        .unwrap_or(0)
}

/// Escape characters that are significant to glob syntax so the path can
/// be embedded in a pattern as a literal.
pub fn escape_path(path: &str) -> String {
    let chars: Vec<char> = path.chars().collect();
    let mut escaped = String::with_capacity(path.len() + 8);

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ESCAPE_SYMBOL && i + 1 < chars.len() && is_escapable(&chars, i + 1) {
            escaped.push(ESCAPE_SYMBOL);
            escaped.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if is_escapable(&chars, i) {
            escaped.push(ESCAPE_SYMBOL);
        }
        escaped.push(c);
        i += 1;
    }

    escaped
}

fn is_escapable(chars: &[char], idx: usize) -> bool {
    match chars[idx] {
        '(' | ')' | '*' | '?' | '[' | ']' | '{' | '|' | '}' => true,
        '!' if idx == 0 => true,
        '!' | '+' | '@' => chars.get(idx + 1) == Some(&'('),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic(pattern: &str) -> bool {
        is_dynamic_pattern(pattern, &PatternOptions::default())
    }

    fn dynamic_with(pattern: &str, options: PatternOptions) -> bool {
        is_dynamic_pattern(pattern, &options)
    }

    #[test]
    fn test_static_pattern() {
        let opts = PatternOptions::default();
        assert!(is_static_pattern("dir", &opts));
        assert!(!is_static_pattern("*", &opts));
    }

    #[test]
    fn test_dynamic_escape_symbol() {
        assert!(dynamic("\\"));
    }

    #[test]
    fn test_dynamic_common_glob_symbols() {
        assert!(dynamic("*"));
        assert!(dynamic("abc/*"));
        assert!(dynamic("?"));
        assert!(dynamic("abc/?"));
        assert!(dynamic("!abc"));
    }

    #[test]
    fn test_dynamic_group_symbols() {
        assert!(dynamic("(a|)"));
        assert!(dynamic("(a|b)"));
        assert!(dynamic("abc/(a|b)"));
    }

    #[test]
    fn test_dynamic_character_class() {
        assert!(dynamic("[abc]"));
        assert!(dynamic("abc/[abc]"));
        assert!(dynamic("[^abc]"));
        assert!(dynamic("abc/[^abc]"));
        assert!(dynamic("[1-3]"));
        assert!(dynamic("abc/[1-3]"));
        assert!(dynamic("[[:alpha:][:digit:]]"));
        assert!(dynamic("abc/[[:alpha:][:digit:]]"));
    }

    #[test]
    fn test_dynamic_extglob() {
        assert!(dynamic("@()"));
        assert!(dynamic("@(a)"));
        assert!(dynamic("@(a|b)"));
        assert!(dynamic("abc/!(a|b)"));
        assert!(dynamic("*(a|b)"));
        assert!(dynamic("?(a|b)"));
        assert!(dynamic("+(a|b)"));
    }

    #[test]
    fn test_group_syntax() {
        assert!(has_group_syntax("fixtures/(first|second)/*.md", false));
        assert!(has_group_syntax("fixtures/@(first|second)/*.md", true));
        assert!(has_group_syntax("+(a).js", true));
        assert!(!has_group_syntax("+(a).js", false));
        assert!(!has_group_syntax("fixtures/**/*.{md,txt}", true));
    }

    #[test]
    fn test_dynamic_brace_expansion() {
        assert!(dynamic("{,}"));
        assert!(dynamic("{a,}"));
        assert!(dynamic("{,b}"));
        assert!(dynamic("{a,b}"));
        assert!(dynamic("{1..3}"));
    }

    #[test]
    fn test_exclamation_not_first_is_static() {
        assert!(!dynamic("abc!"));
    }

    #[test]
    fn test_completely_static() {
        assert!(!dynamic(""));
        assert!(!dynamic("."));
        assert!(!dynamic("abc"));
        assert!(!dynamic("~abc"));
        assert!(!dynamic("~/abc"));
        assert!(!dynamic("+~/abc"));
        assert!(!dynamic("@.(abc)"));
        assert!(!dynamic("(a b)"));
        assert!(!dynamic("[abc"));
    }

    #[test]
    fn test_unfinished_syntax_is_static() {
        // character class
        assert!(!dynamic("["));
        assert!(!dynamic("[abc"));
        // group
        assert!(!dynamic("(a|b"));
        assert!(!dynamic("abc/(a|b"));
        // extglob
        assert!(!dynamic("@("));
        assert!(!dynamic("@(a"));
        assert!(!dynamic("@(a|"));
        assert!(!dynamic("@(a|b"));
        // braces
        assert!(!dynamic("{"));
        assert!(!dynamic("{a"));
        assert!(!dynamic("{,"));
        assert!(!dynamic("{a,"));
        assert!(!dynamic("{a,b"));
    }

    #[test]
    fn test_dynamic_with_options() {
        let no_extglob = PatternOptions {
            extglob: false,
            ..Default::default()
        };
        assert!(dynamic_with("*(a|b)", no_extglob));
        assert!(dynamic_with("?(a|b)", no_extglob));
        assert!(!dynamic_with("@(a|b)", no_extglob));
        assert!(!dynamic_with("abc/!(a|b)", no_extglob));
        assert!(!dynamic_with("+(a|b)", no_extglob));

        let insensitive = PatternOptions {
            case_sensitive_match: false,
            ..Default::default()
        };
        assert!(dynamic_with("a", insensitive));

        let no_braces = PatternOptions {
            brace_expansion: false,
            ..Default::default()
        };
        assert!(!dynamic_with("{a,b}", no_braces));
        assert!(!dynamic_with("{1..3}", no_braces));
    }

    #[test]
    fn test_dynamic_is_negation_of_static() {
        let corpus = [
            "", "*", "a/b", "{a,b}", "[x]", "(a|b", "!(a)", "x\\y", "@(a)", "a/**",
        ];
        let opts = PatternOptions::default();
        for p in corpus {
            assert_eq!(is_dynamic_pattern(p, &opts), !is_static_pattern(p, &opts), "{p}");
        }
    }

    #[test]
    fn test_positive_negative_conversion() {
        assert_eq!(convert_to_positive_pattern("!*.js"), "*.js");
        assert_eq!(convert_to_positive_pattern("*.js"), "*.js");
        assert_eq!(convert_to_negative_pattern("*.js"), "!*.js");

        for p in ["*.js", "a/**", "!(a|b)", "file.txt"] {
            assert_eq!(convert_to_positive_pattern(&convert_to_negative_pattern(p)), p);
        }
    }

    #[test]
    fn test_is_negative_pattern() {
        assert!(is_negative_pattern("!*.md"));
        assert!(is_negative_pattern("!x"));
        assert!(!is_negative_pattern("*.md"));
        assert!(!is_negative_pattern("!(a|b|c)"));
        assert!(!is_negative_pattern("!(a|b)"));
        assert!(is_positive_pattern("*.md"));
        assert!(!is_positive_pattern("!*.md"));
    }

    #[test]
    fn test_split_positive_negative() {
        let patterns = ["*.js", "!*.spec.js", "*.ts"];
        assert_eq!(get_negative_patterns(&patterns), vec!["!*.spec.js"]);
        assert_eq!(get_positive_patterns(&patterns), vec!["*.js", "*.ts"]);

        assert!(get_negative_patterns(&["*.js", "*.ts"]).is_empty());
        assert!(get_positive_patterns(&["!*.js", "!*.ts"]).is_empty());
    }

    #[test]
    fn test_base_directory() {
        assert_eq!(get_base_directory("root/*.js"), "root");
        assert_eq!(get_base_directory("file-\\(suffix\\).md"), ".");
        assert_eq!(get_base_directory("*.js"), ".");
        assert_eq!(get_base_directory("./*.js"), ".");
        assert_eq!(get_base_directory("a/b/*/*.js"), "a/b");
        assert_eq!(get_base_directory("fixtures/**/*.md"), "fixtures");
        assert_eq!(get_base_directory("a/{b,c}/d"), "a");
        assert_eq!(get_base_directory("a/b/c.txt"), "a/b");
        assert_eq!(get_base_directory("dir/"), "dir");
        assert_eq!(get_base_directory("/abs/*.rs"), "/abs");
    }

    #[test]
    fn test_glob_star_helpers() {
        assert!(has_glob_star("**/*.js"));
        assert!(!has_glob_star("*.js"));

        assert!(ends_with_slash_glob_star("name/**"));
        assert!(!ends_with_slash_glob_star("**"));
        assert!(!ends_with_slash_glob_star("name/**/*"));
    }

    #[test]
    fn test_affect_depth_of_reading() {
        assert!(is_affect_depth_of_reading_pattern("name/**"));
        assert!(is_affect_depth_of_reading_pattern("**/name"));
        assert!(!is_affect_depth_of_reading_pattern("**/name/*"));
    }

    #[test]
    fn test_naive_depth() {
        // 1 (pattern) - 1 (base directory)
        assert_eq!(get_naive_depth("*.js"), 0);
        // 4 (pattern) - 2 (base directory) - 1
        assert_eq!(get_naive_depth("a/b/*/*.js"), 1);
    }

    #[test]
    fn test_max_naive_depth() {
        assert_eq!(get_max_naive_patterns_depth(&["*.js", "./*.js"]), 1);
        assert_eq!(get_max_naive_patterns_depth(&["*.js", "./*/*.js"]), 2);
        assert_eq!(get_max_naive_patterns_depth::<&str>(&[]), 0);
    }

    #[test]
    fn test_escape_path() {
        assert_eq!(escape_path("C:/Program Files (x86)"), "C:/Program Files \\(x86\\)");
        assert_eq!(escape_path("plain/path.txt"), "plain/path.txt");
        assert_eq!(escape_path("!important"), "\\!important");
        assert_eq!(escape_path("a!b"), "a!b");
        assert_eq!(escape_path("@(x)"), "\\@\\(x\\)");
        // already escaped characters are not escaped twice
        assert_eq!(escape_path("\\(x\\)"), "\\(x\\)");
    }

    #[test]
    fn test_escaped_path_is_static_base() {
        let escaped = escape_path("dir (1)/file.md");
        assert_eq!(get_base_directory(&escaped), "dir (1)");
    }
}
