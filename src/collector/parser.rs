//! Tokenizer for the `stats` response.
//!
//! The response is a sequence of `STAT <key> <value>` lines closed by a lone
//! `END`. These are pure functions so they can be tested with string inputs.

/// Line that closes a `stats` response.
pub const TERMINATOR: &str = "END";

/// Classification of a single response line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// A well-formed `STAT` line.
    Stat { key: &'a str, value: &'a str },
    /// The `END` terminator.
    End,
    /// Anything else; skipped by the collector.
    Other,
}

/// Removes one trailing `\n` or `\r\n`.
pub fn chomp(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn is_key(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn is_value(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Splits a line into `(key, value)` if it is exactly
/// `STAT`, one space, `[A-Za-z0-9_]+`, one space, `[0-9]+`.
///
/// Values that are not plain digit runs (`version 1.6.21`, `rusage_user
/// 0.123`) do not match and are skipped.
pub fn parse_stat_line(line: &str) -> Option<(&str, &str)> {
    let rest = chomp(line).strip_prefix("STAT ")?;
    let (key, value) = rest.split_once(' ')?;
    (is_key(key) && is_value(value)).then_some((key, value))
}

/// Classifies a raw line, including its line ending.
pub fn classify(line: &str) -> Line<'_> {
    if chomp(line) == TERMINATOR {
        return Line::End;
    }
    match parse_stat_line(line) {
        Some((key, value)) => Line::Stat { key, value },
        None => Line::Other,
    }
}

/// Classifies a line read off the wire.
///
/// Lines that are not valid UTF-8 cannot be `STAT` or `END` lines and are
/// classified as [`Line::Other`].
pub fn classify_bytes(line: &[u8]) -> Line<'_> {
    match std::str::from_utf8(line) {
        Ok(line) => classify(line),
        Err(_) => Line::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat_line_basic() {
        assert_eq!(parse_stat_line("STAT get_hits 42"), Some(("get_hits", "42")));
        assert_eq!(parse_stat_line("STAT get_hits 42\r\n"), Some(("get_hits", "42")));
        assert_eq!(parse_stat_line("STAT bytes 0\n"), Some(("bytes", "0")));
        assert_eq!(parse_stat_line("STAT Slab_1 7"), Some(("Slab_1", "7")));
    }

    #[test]
    fn test_parse_stat_line_rejects_non_digit_values() {
        assert_eq!(parse_stat_line("STAT version 1.6.21"), None);
        assert_eq!(parse_stat_line("STAT rusage_user 0.123456"), None);
        assert_eq!(parse_stat_line("STAT libevent 2.1.12-stable"), None);
        assert_eq!(parse_stat_line("STAT get_hits -1"), None);
        assert_eq!(parse_stat_line("STAT get_hits "), None);
    }

    #[test]
    fn test_parse_stat_line_rejects_bad_shape() {
        assert_eq!(parse_stat_line("GARBAGE not-a-stat-line"), None);
        assert_eq!(parse_stat_line("STAT get_hits"), None);
        assert_eq!(parse_stat_line("STAT  get_hits 42"), None);
        assert_eq!(parse_stat_line("STAT get_hits  42"), None);
        assert_eq!(parse_stat_line("STAT get_hits 42 7"), None);
        assert_eq!(parse_stat_line("STAT get-hits 42"), None);
        assert_eq!(parse_stat_line("stat get_hits 42"), None);
        assert_eq!(parse_stat_line("STAT\tget_hits 42"), None);
        assert_eq!(parse_stat_line(""), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("END\r\n"), Line::End);
        assert_eq!(classify("END"), Line::End);
        assert_eq!(classify("END \r\n"), Line::Other);
        assert_eq!(classify("ERROR\r\n"), Line::Other);
        assert_eq!(
            classify("STAT threads 4\r\n"),
            Line::Stat {
                key: "threads",
                value: "4"
            }
        );
    }

    #[test]
    fn test_classify_bytes() {
        assert_eq!(classify_bytes(b"END\r\n"), Line::End);
        assert_eq!(
            classify_bytes(b"STAT pid 7\n"),
            Line::Stat {
                key: "pid",
                value: "7"
            }
        );
        assert_eq!(classify_bytes(b"STAT note \xff\xfe\r\n"), Line::Other);
        assert_eq!(classify_bytes(b"STAT pid 7\xc3\r\n"), Line::Other);
    }

    #[test]
    fn test_chomp() {
        assert_eq!(chomp("END\r\n"), "END");
        assert_eq!(chomp("END\n"), "END");
        assert_eq!(chomp("END"), "END");
        assert_eq!(chomp("END\n\n"), "END\n");
    }
}
