//! Scrubbing and truncation for captured job output.

use regex::Regex;
use std::sync::OnceLock;

pub const TRUNCATION_MARKER: &str = "\n\n[... output truncated ...]";

struct Patterns {
    jwt: Regex,
    url_credentials: Regex,
    aws_key: Regex,
    assignment: Regex,
    long_key: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        jwt: Regex::new(r"eyJ[a-zA-Z0-9_-]+\.eyJ[a-zA-Z0-9_-]+\.[a-zA-Z0-9_-]+").unwrap(),
        url_credentials: Regex::new(r"(?i)((?:https?|postgres|postgresql|mysql)://)[^:/\s]+:[^@\s]+@")
            .unwrap(),
        aws_key: Regex::new(r"AKIA[0-9A-Z]{16}").unwrap(),
        assignment: Regex::new(r"(?i)(password|pwd|secret|token|key)\s*[=:]\s*\S+").unwrap(),
        long_key: Regex::new(r"\b[a-zA-Z0-9_-]{40,}\b").unwrap(),
    })
}

/// Mask credentials that commonly leak into job logs.
pub fn redact_output(output: &str) -> String {
    let p = patterns();
    // JWTs first so the generic key rule doesn't half-mask them.
    let s = p.jwt.replace_all(output, "eyJ***.eyJ***.***");
    let s = p.url_credentials.replace_all(&s, "${1}***:***@");
    let s = p.aws_key.replace_all(&s, "AKIA****************");
    let s = p.assignment.replace_all(&s, "${1}=***");
    let s = p.long_key.replace_all(&s, |caps: &regex::Captures<'_>| {
        let m = &caps[0];
        format!("{}***{}", &m[..8], &m[m.len() - 4..])
    });
    s.into_owned()
}

/// Cap `output` at `max_kb` KiB, cutting on a UTF-8 boundary.
pub fn truncate_output(output: &str, max_kb: u32) -> String {
    let max_bytes = max_kb as usize * 1024;
    if output.len() <= max_bytes {
        return output.to_string();
    }
    let mut end = max_bytes;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &output[..end], TRUNCATION_MARKER)
}
