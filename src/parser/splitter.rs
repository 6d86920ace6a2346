use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static CURL_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"curl\s").expect("valid regex"));

const TRAILING_SEPARATORS: &[&str] = &["&&", "||", ";", "|"];

/// Cuts `input` at every `curl` word that starts a line or follows whitespace
/// outside of quotes. Text before the first invocation is discarded and its
/// quotes are not tracked.
pub fn split_commands(input: &str) -> Vec<&str> {
    let mut quotes = QuoteState::default();
    let mut scanned = 0;
    let mut starts: Vec<usize> = Vec::new();
    for found in CURL_START.find_iter(input) {
        let start = found.start();
        if !starts.is_empty() {
            quotes.advance(&input[scanned..start]);
        }
        scanned = start;
        if quotes.is_open() || !is_boundary(input, start) {
            continue;
        }
        starts.push(start);
    }

    if let Some(&first) = starts.first() {
        let skipped = input[..first].trim();
        if !skipped.is_empty() {
            debug!(skipped, "ignoring text before first curl command");
        }
    }

    starts
        .iter()
        .enumerate()
        .map(|(position, &start)| {
            let end = starts.get(position + 1).copied().unwrap_or(input.len());
            strip_separators(input[start..end].trim())
        })
        .filter(|segment| segment.starts_with("curl"))
        .collect()
}

/// Shell quoting state: backslash escapes outside single quotes, nothing
/// escapes inside them.
#[derive(Debug, Default)]
struct QuoteState {
    open: Option<char>,
    escaped: bool,
}

impl QuoteState {
    fn advance(&mut self, text: &str) {
        for c in text.chars() {
            if self.escaped {
                self.escaped = false;
                continue;
            }
            match (self.open, c) {
                (Some('\''), '\'') => self.open = None,
                (Some('\''), _) => {}
                (_, '\\') => self.escaped = true,
                (Some('"'), '"') => self.open = None,
                (None, '\'' | '"') => self.open = Some(c),
                _ => {}
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

fn is_boundary(input: &str, start: usize) -> bool {
    input[..start]
        .chars()
        .next_back()
        .map_or(true, char::is_whitespace)
}

fn strip_separators(mut segment: &str) -> &str {
    loop {
        let before = segment;
        for separator in TRAILING_SEPARATORS {
            if let Some(rest) = segment.strip_suffix(*separator) {
                segment = rest.trim_end();
            }
        }
        if segment.len() == before.len() {
            return segment;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_curl_at_line_start() {
        let input = "curl https://a.example.com\n  -H 'X-One: 1'\ncurl https://b.example.com";
        let segments = split_commands(input);
        assert_eq!(
            segments,
            vec![
                "curl https://a.example.com\n  -H 'X-One: 1'",
                "curl https://b.example.com"
            ]
        );
    }

    #[test]
    fn discards_leading_text_and_prompts() {
        let segments = split_commands("Run this:\n$ curl https://example.com/ping");
        assert_eq!(segments, vec!["curl https://example.com/ping"]);
    }

    #[test]
    fn ignores_curl_inside_other_words() {
        let segments = split_commands("curl https://example.com/libcurl -H 'X-Tool: mycurl test'");
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn ignores_curl_inside_quoted_arguments() {
        let input = "curl https://e.com/a -d 'please curl this'\ncurl https://e.com/b -H \"X-Note: curl it\"";
        assert_eq!(
            split_commands(input),
            vec![
                "curl https://e.com/a -d 'please curl this'",
                "curl https://e.com/b -H \"X-Note: curl it\""
            ]
        );
    }

    #[test]
    fn multiline_quoted_body_stays_in_one_command() {
        let input = "curl https://e.com/run -d '{\n  \"cmd\": \"\n curl x\"\n}'\ncurl https://e.com/next";
        let segments = split_commands(input);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].ends_with("}'"));
        assert_eq!(segments[1], "curl https://e.com/next");
    }

    #[test]
    fn apostrophes_before_the_first_command_are_ignored() {
        let segments = split_commands("Here's the call:\ncurl https://e.com/a\ncurl https://e.com/b");
        assert_eq!(segments, vec!["curl https://e.com/a", "curl https://e.com/b"]);
    }

    #[test]
    fn escaped_quotes_do_not_open_a_span() {
        let segments = split_commands("curl https://e.com/a -H X-Q:\\'a\ncurl https://e.com/b");
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn strips_trailing_shell_separators() {
        let segments = split_commands("curl https://a.example.com && curl https://b.example.com;");
        assert_eq!(
            segments,
            vec!["curl https://a.example.com", "curl https://b.example.com"]
        );
    }

    #[test]
    fn returns_empty_without_curl() {
        assert!(split_commands("http GET https://example.com").is_empty());
    }
}
