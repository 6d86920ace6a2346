use once_cell::sync::Lazy;
use regex::Regex;
use shell_words::split;
use tracing::debug;

use super::model::ParsedRequest;

static CONTINUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\\s+").expect("valid regex"));
static BARE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s'"]+"#).expect("valid regex"));
static LOOSE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"'([^']*)'|"((?:[^"\\]|\\.)*)"|(\S+)"#).expect("valid regex")
});

const METHOD_OPTIONS: &[&str] = &["-X", "--request"];
const HEADER_OPTIONS: &[&str] = &["-H", "--header"];
const URL_OPTIONS: &[&str] = &["--url"];
const DATA_OPTIONS: &[&str] = &[
    "-d",
    "--data",
    "--data-raw",
    "--data-binary",
    "--data-ascii",
    "--data-urlencode",
];
/// Options whose argument must not be mistaken for the request URL.
const OTHER_VALUE_OPTIONS: &[&str] = &[
    "-u",
    "--user",
    "-A",
    "--user-agent",
    "-b",
    "--cookie",
    "-c",
    "--cookie-jar",
    "-e",
    "--referer",
    "-o",
    "--output",
    "-F",
    "--form",
    "-T",
    "--upload-file",
    "-w",
    "--write-out",
    "-x",
    "--proxy",
    "-m",
    "--max-time",
    "--connect-timeout",
    "--retry",
    "--resolve",
    "--cacert",
    "--cert",
    "-E",
    "--key",
];

pub fn parse_command(segment: &str) -> ParsedRequest {
    let normalized = normalize(segment);
    let tokens = tokenize(&normalized);
    let args = match tokens.first() {
        Some(first) if first.eq_ignore_ascii_case("curl") => &tokens[1..],
        _ => &tokens[..],
    };

    let body = extract_body(args);
    ParsedRequest {
        method: extract_method(args, body.is_some()),
        url: extract_url(args, &normalized),
        headers: extract_headers(args),
        body,
    }
}

fn normalize(segment: &str) -> String {
    let joined = segment
        .trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ");
    CONTINUATION.replace_all(&joined, " ").into_owned()
}

fn tokenize(command: &str) -> Vec<String> {
    match split(command) {
        Ok(tokens) => tokens,
        Err(err) => {
            debug!(error = %err, "falling back to loose tokenizer");
            loose_tokens(command)
        }
    }
}

fn loose_tokens(command: &str) -> Vec<String> {
    LOOSE_TOKEN
        .captures_iter(command)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|quoted| quoted.as_str().to_string())
                .or_else(|| {
                    caps.get(3).map(|bare| {
                        bare.as_str()
                            .trim_matches(|c| c == '\'' || c == '"')
                            .to_string()
                    })
                })
        })
        .collect()
}

fn extract_url(args: &[String], normalized: &str) -> String {
    let positional = positional_args(args);
    positional
        .iter()
        .find(|arg| arg.contains("://"))
        .or_else(|| positional.first())
        .map(|arg| arg.to_string())
        .or_else(|| option_values(args, URL_OPTIONS).into_iter().next().map(str::to_string))
        .or_else(|| BARE_URL.find(normalized).map(|found| found.as_str().to_string()))
        .unwrap_or_default()
}

fn extract_method(args: &[String], has_body: bool) -> String {
    option_values(args, METHOD_OPTIONS)
        .into_iter()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_uppercase)
        .unwrap_or_else(|| {
            if has_body {
                "POST".to_string()
            } else {
                "GET".to_string()
            }
        })
}

fn extract_headers(args: &[String]) -> Vec<(String, String)> {
    option_values(args, HEADER_OPTIONS)
        .into_iter()
        .filter_map(|raw| match parse_header(raw) {
            Some(header) => Some(header),
            None => {
                debug!(header = raw, "skipping header without a name");
                None
            }
        })
        .collect()
}

fn extract_body(args: &[String]) -> Option<String> {
    option_values(args, DATA_OPTIONS)
        .into_iter()
        .next()
        .map(str::to_string)
}

fn parse_header(value: &str) -> Option<(String, String)> {
    let (name, val) = value.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), val.trim().to_string()))
}

fn takes_value(option: &str) -> bool {
    [
        METHOD_OPTIONS,
        HEADER_OPTIONS,
        URL_OPTIONS,
        DATA_OPTIONS,
        OTHER_VALUE_OPTIONS,
    ]
    .iter()
    .any(|group| group.contains(&option))
}

/// Values given to any of `names`, in command order. Understands
/// `--opt value`, `--opt=value` and `-Ovalue`.
fn option_values<'a>(args: &'a [String], names: &[&str]) -> Vec<&'a str> {
    let mut values = Vec::new();
    let mut index = 0;

    while index < args.len() {
        let arg = args[index].as_str();
        if arg == "--" {
            break;
        }

        if names.contains(&arg) {
            if let Some(value) = args.get(index + 1) {
                values.push(value.as_str());
            }
            index += 2;
            continue;
        }

        if let Some((option, value)) = arg.split_once('=').filter(|_| arg.starts_with("--")) {
            if names.contains(&option) {
                values.push(value);
            }
        } else if !arg.starts_with("--") && arg.starts_with('-') && arg.len() > 2 {
            if let Some(short) = arg.get(..2).filter(|short| names.contains(short)) {
                values.push(&arg[short.len()..]);
            }
        } else if takes_value(arg) {
            index += 1;
        }
        index += 1;
    }

    values
}

fn positional_args(args: &[String]) -> Vec<&str> {
    let mut positional = Vec::new();
    let mut index = 0;
    let mut options_done = false;

    while index < args.len() {
        let arg = args[index].as_str();
        if options_done {
            positional.push(arg);
        } else if arg == "--" {
            options_done = true;
        } else if takes_value(arg) {
            index += 1;
        } else if !arg.starts_with('-') || arg == "-" {
            positional.push(arg);
        }
        index += 1;
    }

    positional
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header<'a>(request: &'a ParsedRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn parses_simple_get() {
        let request = parse_command("curl 'https://api.example.com/users'");
        assert_eq!(
            request,
            ParsedRequest {
                method: "GET".to_string(),
                url: "https://api.example.com/users".to_string(),
                headers: vec![],
                body: None,
            }
        );
    }

    #[test]
    fn reads_explicit_methods_in_every_spelling() {
        assert_eq!(parse_command("curl -X post https://e.com").method, "POST");
        assert_eq!(parse_command("curl --request PUT https://e.com").method, "PUT");
        assert_eq!(parse_command("curl -XPATCH https://e.com").method, "PATCH");
        assert_eq!(parse_command("curl --request=delete https://e.com").method, "DELETE");
    }

    #[test]
    fn infers_post_from_body_flags() {
        for flag in ["-d", "--data", "--data-raw", "--data-binary"] {
            let request = parse_command(&format!("curl https://e.com/items {flag} 'a=1'"));
            assert_eq!(request.method, "POST", "flag {flag}");
            assert_eq!(request.body.as_deref(), Some("a=1"));
        }
    }

    #[test]
    fn explicit_method_beats_body_inference() {
        let request = parse_command("curl -X PUT https://e.com/items -d '{}'");
        assert_eq!(request.method, "PUT");
    }

    #[test]
    fn keeps_repeated_headers_in_order() {
        let request = parse_command(
            "curl https://e.com -H 'X-Trace: one' --header \"Accept: */*\" -H 'X-Trace: two'",
        );
        assert_eq!(
            request.headers,
            vec![
                ("X-Trace".to_string(), "one".to_string()),
                ("Accept".to_string(), "*/*".to_string()),
                ("X-Trace".to_string(), "two".to_string()),
            ]
        );
    }

    #[test]
    fn header_values_may_contain_colons() {
        let request = parse_command("curl https://e.com -H 'Referer: https://other.com:8080/x'");
        assert_eq!(header(&request, "referer"), Some("https://other.com:8080/x"));
    }

    #[test]
    fn skips_headers_without_a_name() {
        let request = parse_command("curl https://e.com -H ': nothing' -H 'garbage'");
        assert!(request.headers.is_empty());
    }

    #[test]
    fn joins_line_continuations() {
        let command = "curl -X POST \\\n  'https://api.example.com/users' \\\n  -H 'Content-Type: application/json' \\\n  --data-raw '{\"name\":\"John\"}'";
        let request = parse_command(command);
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "https://api.example.com/users");
        assert_eq!(header(&request, "Content-Type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some("{\"name\":\"John\"}"));
    }

    #[test]
    fn first_body_flag_in_command_order_wins() {
        let request = parse_command("curl https://e.com -d 'first' --data-raw 'second'");
        assert_eq!(request.body.as_deref(), Some("first"));
    }

    #[test]
    fn url_may_follow_options() {
        let request = parse_command(
            "curl -s -u user:pass -A agent -H 'Accept: */*' https://e.com/after --compressed",
        );
        assert_eq!(request.url, "https://e.com/after");
    }

    #[test]
    fn url_option_is_honoured() {
        let request = parse_command("curl -X GET --url https://e.com/explicit");
        assert_eq!(request.url, "https://e.com/explicit");
    }

    #[test]
    fn unbalanced_quotes_fall_back_to_loose_tokens() {
        let request = parse_command("curl 'https://e.com/broken -H \"X-Test: yes\"");
        assert_eq!(request.url, "https://e.com/broken");
        assert_eq!(request.method, "GET");
        assert_eq!(header(&request, "X-Test"), Some("yes"));
    }

    #[test]
    fn malformed_input_keeps_defaults() {
        let request = parse_command("curl");
        assert_eq!(request, ParsedRequest::default());

        let request = parse_command("curl -H");
        assert_eq!(request.url, "");
        assert!(request.headers.is_empty());
    }
}
