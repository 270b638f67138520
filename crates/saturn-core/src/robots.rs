//! robots.txt rendering.

use std::fmt::Write;

pub const DEFAULT_SITE_URL: &str = "https://saturnmonitor.com";

/// Private paths hidden from every crawler.
const PRIVATE_PATHS: &[&str] = &[
    "/api/*",
    "/app/*",
    "/onboarding",
    "/auth/error",
    "/auth/signout",
    "/auth/verify-request",
    "/auth/device",
];

/// Crawlers that collect training data. Blocked from the whole site.
const AI_CRAWLERS: &[&str] = &[
    "GPTBot",
    "ChatGPT-User",
    "CCBot",
    "anthropic-ai",
    "Claude-Web",
    "Google-Extended",
];

pub fn render_robots(site_url: &str) -> String {
    let base = site_url.trim_end_matches('/');
    let mut out = String::new();
    out.push_str("User-agent: *\nAllow: /\n");
    for path in PRIVATE_PATHS {
        let _ = writeln!(out, "Disallow: {path}");
    }
    out.push('\n');
    for agent in AI_CRAWLERS {
        let _ = writeln!(out, "User-agent: {agent}");
    }
    out.push_str("Disallow: /\n\n");
    let _ = writeln!(out, "Sitemap: {base}/sitemap.xml");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_groups_and_sitemap() {
        let txt = render_robots("https://example.com/");
        assert!(txt.starts_with("User-agent: *\nAllow: /\n"));
        assert!(txt.contains("Disallow: /api/*\n"));
        assert!(txt.contains("Disallow: /auth/device\n"));
        assert!(txt.contains("User-agent: GPTBot\n"));
        assert!(txt.contains("User-agent: Google-Extended\nDisallow: /\n"));
        assert!(txt.ends_with("Sitemap: https://example.com/sitemap.xml\n"));
    }

    #[test]
    fn wildcard_group_does_not_block_root() {
        let txt = render_robots(DEFAULT_SITE_URL);
        let first_group = txt.split("\n\n").next().unwrap();
        assert!(!first_group.lines().any(|l| l == "Disallow: /"));
    }
}
