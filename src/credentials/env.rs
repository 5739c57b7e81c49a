//! Parsing of decrypted documents and materialization into an environment.
//!
//! The document is `KEY=VALUE` per line, with an optional `export ` prefix,
//! `#` comments and blank lines. Values are taken literally: `$NAME` and
//! `${NAME}` are never expanded, so a stored secret reads back unchanged no
//! matter what the host process exports. One pair of surrounding quotes is
//! removed. Lines that do not parse are skipped with a warning instead of
//! rejecting the document.

use std::collections::{BTreeMap, HashMap};

/// Parsed credentials: key to value.
pub type Values = BTreeMap<String, String>;

/// Parse a decrypted document into key/value pairs.
///
/// Later assignments to the same key win, as they would when sourced.
pub fn parse_values(content: &str) -> Values {
    let mut values = Values::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line) {
            Some((key, value)) => {
                values.insert(key.to_string(), value);
            }
            None => {
                tracing::warn!("Skipping unparseable credentials line {}", index + 1);
            }
        }
    }

    values
}

/// Split one trimmed, non-comment line into its key and literal value.
fn parse_line(line: &str) -> Option<(&str, String)> {
    let line = line
        .strip_prefix("export")
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .map(str::trim_start)
        .unwrap_or(line);

    let (key, value) = line.split_once('=')?;
    let key = key.trim_end();
    if !is_valid_key(key) {
        return None;
    }

    Some((key, parse_value(value.trim())?))
}

/// Keys look like shell identifiers; `.` and `-` are tolerated.
fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn parse_value(raw: &str) -> Option<String> {
    if let Some(rest) = raw.strip_prefix('\'') {
        // Single quotes: everything up to the closing quote, verbatim
        let end = rest.find('\'')?;
        return Some(rest[..end].to_string());
    }

    if let Some(rest) = raw.strip_prefix('"') {
        let mut value = String::new();
        let mut chars = rest.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => return Some(value),
                '\\' => match chars.next()? {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                },
                _ => value.push(c),
            }
        }
        // Unterminated
        return None;
    }

    // Unquoted: a `#` after whitespace starts a comment
    let end = raw
        .char_indices()
        .find(|&(i, c)| c == '#' && i > 0 && raw[..i].ends_with(char::is_whitespace))
        .map_or(raw.len(), |(i, _)| i);
    Some(raw[..end].trim_end().to_string())
}

/// Destination for materialized credentials.
///
/// The engine never writes to the process environment directly; callers
/// hand in a sink. [`ProcessEnv`] is the adapter for the real environment.
pub trait EnvSink {
    /// Whether `key` is already defined.
    fn contains(&self, key: &str) -> bool;

    /// Define `key` as `value`.
    fn set(&mut self, key: &str, value: &str);
}

impl EnvSink for HashMap<String, String> {
    fn contains(&self, key: &str) -> bool {
        self.contains_key(key)
    }

    fn set(&mut self, key: &str, value: &str) {
        self.insert(key.to_string(), value.to_string());
    }
}

/// The current process's environment variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSink for ProcessEnv {
    fn contains(&self, key: &str) -> bool {
        std::env::var_os(key).is_some()
    }

    fn set(&mut self, key: &str, value: &str) {
        std::env::set_var(key, value);
    }
}

/// Write `values` into `sink`, leaving keys it already defines untouched.
///
/// Returns how many keys were set.
pub fn materialize(values: &Values, sink: &mut dyn EnvSink) -> usize {
    let mut applied = 0;
    for (key, value) in values {
        if sink.contains(key) {
            tracing::debug!("{} already set, keeping existing value", key);
            continue;
        }
        sink.set(key, value);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_assignments() {
        let values = parse_values("FIRST=one\nSECOND=two\n");
        assert_eq!(values.len(), 2);
        assert_eq!(values.get("FIRST").unwrap(), "one");
        assert_eq!(values.get("SECOND").unwrap(), "two");
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let values = parse_values("# Database\n\nDB_HOST=localhost\n   \n# trailing\n");
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("DB_HOST").unwrap(), "localhost");
    }

    #[test]
    fn test_parse_skips_lines_without_assignment() {
        let values = parse_values("A=1\nnot an assignment\nB=2");
        assert_eq!(values.get("A").unwrap(), "1");
        assert_eq!(values.get("B").unwrap(), "2");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_parse_quotes_and_export() {
        let values = parse_values("export TOKEN=abc\nGREETING=\"hello world\"\nRAW='a b'\n");
        assert_eq!(values.get("TOKEN").unwrap(), "abc");
        assert_eq!(values.get("GREETING").unwrap(), "hello world");
        assert_eq!(values.get("RAW").unwrap(), "a b");
    }

    #[test]
    fn test_parse_keeps_values_literal() {
        let key = format!("ENV_CREDENTIALS_EXPAND_{}", std::process::id());
        std::env::set_var(&key, "expanded");

        let document = format!(
            "A=${key}\nB=a b\nC=x=y\nD=pa$$word\nE=1\n#F=2\nG=${{{key}}}\nH=\"$HOME\"\n"
        );
        let values = parse_values(&document);

        assert_eq!(values.get("A").unwrap(), &format!("${}", key));
        assert_eq!(values.get("B").unwrap(), "a b");
        assert_eq!(values.get("C").unwrap(), "x=y");
        assert_eq!(values.get("D").unwrap(), "pa$$word");
        assert_eq!(values.get("E").unwrap(), "1");
        assert_eq!(values.get("G").unwrap(), &format!("${{{}}}", key));
        assert_eq!(values.get("H").unwrap(), "$HOME");
        assert!(!values.contains_key("F"));
        assert_eq!(values.len(), 7);

        std::env::remove_var(&key);
    }

    #[test]
    fn test_parse_unquoted_spaces_and_inline_comments() {
        let values = parse_values("NAME = John Smith\nPORT=8080 # http\nHASH=abc#def\n");
        assert_eq!(values.get("NAME").unwrap(), "John Smith");
        assert_eq!(values.get("PORT").unwrap(), "8080");
        assert_eq!(values.get("HASH").unwrap(), "abc#def");
    }

    #[test]
    fn test_parse_double_quote_escapes() {
        let values = parse_values(r#"PEM="line1\nline2"
QUOTED="say \"hi\""
SINGLE='no\nescape'
"#);
        assert_eq!(values.get("PEM").unwrap(), "line1\nline2");
        assert_eq!(values.get("QUOTED").unwrap(), "say \"hi\"");
        assert_eq!(values.get("SINGLE").unwrap(), "no\\nescape");
    }

    #[test]
    fn test_parse_rejects_invalid_keys() {
        let values = parse_values("1BAD=x\nBAD KEY=x\n=x\nUNTERMINATED=\"abc\nGOOD=y\n");
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("GOOD").unwrap(), "y");
    }

    #[test]
    fn test_parse_export_is_only_a_prefix() {
        let values = parse_values("export  TOKEN=abc\nexporter=1\n");
        assert_eq!(values.get("TOKEN").unwrap(), "abc");
        assert_eq!(values.get("exporter").unwrap(), "1");
    }

    #[test]
    fn test_parse_empty_value() {
        let values = parse_values("EMPTY=\nQUOTED_EMPTY=\"\"\n");
        assert_eq!(values.get("EMPTY").unwrap(), "");
        assert_eq!(values.get("QUOTED_EMPTY").unwrap(), "");
    }

    #[test]
    fn test_parse_lowercase_keys() {
        let values = parse_values("test=1\n");
        assert_eq!(values.get("test").unwrap(), "1");
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(parse_values("").is_empty());
    }

    #[test]
    fn test_materialize_preserves_existing_keys() {
        let values = parse_values("A=from-file\nB=from-file\n");
        let mut sink = HashMap::new();
        sink.insert("A".to_string(), "operator".to_string());

        let applied = materialize(&values, &mut sink);

        assert_eq!(applied, 1);
        assert_eq!(sink.get("A").unwrap(), "operator");
        assert_eq!(sink.get("B").unwrap(), "from-file");
    }

    #[test]
    fn test_process_env_sink() {
        let key = format!("ENV_CREDENTIALS_SINK_TEST_{}", std::process::id());
        let mut sink = ProcessEnv;

        assert!(!sink.contains(&key));
        sink.set(&key, "value");
        assert!(sink.contains(&key));
        assert_eq!(std::env::var(&key).unwrap(), "value");

        std::env::remove_var(&key);
    }
}
