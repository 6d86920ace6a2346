mod curl;
mod model;
mod splitter;

pub use curl::parse_command;
pub use model::ParsedRequest;
pub use splitter::split_commands;

/// Splits `input` into `curl` invocations and parses each one.
///
/// Never fails: text that is not part of a `curl` invocation is dropped and
/// fields that cannot be extracted keep their defaults.
pub fn parse_multiple(input: &str) -> Vec<ParsedRequest> {
    split_commands(input)
        .into_iter()
        .map(parse_command)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_multiple_keeps_command_order() {
        let input = "curl https://a.example.com/one\ncurl -X DELETE https://b.example.com/two";
        let requests = parse_multiple(input);

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "https://a.example.com/one");
        assert_eq!(requests[1].method, "DELETE");
        assert_eq!(requests[1].url, "https://b.example.com/two");
    }

    #[test]
    fn quoted_curl_word_stays_in_the_body() {
        let requests = parse_multiple("curl https://e.com/a -d 'please curl this'");

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, "https://e.com/a");
        assert_eq!(requests[0].body.as_deref(), Some("please curl this"));
    }

    #[test]
    fn parse_multiple_returns_nothing_without_curl() {
        assert!(parse_multiple("wget https://example.com").is_empty());
        assert!(parse_multiple("   \n ").is_empty());
    }
}
