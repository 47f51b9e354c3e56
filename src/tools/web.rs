//! `web_search` over DuckDuckGo's HTML endpoint.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::error::ResearchError;
use crate::util::text::{collapse_whitespace, decode_entities, strip_tags};

use super::builtin::ToolContext;
use super::tool::{FnTool, Tool, ToolCallContext};
use super::types::AgentToolParameters;

pub const WEB_SEARCH: &str = "web_search";

const DEFAULT_MAX_RESULTS: usize = 5;
const USER_AGENT: &str = "Mozilla/5.0 (compatible; research-agent/0.1)";

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a([^>]*class="result__a"[^>]*)>(.*?)</a>"#)
        .expect("result title regex must compile")
});
static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<(?:a|div|td)[^>]*class="result__snippet"[^>]*>(.*?)</(?:a|div|td)>"#)
        .expect("result snippet regex must compile")
});
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]*)""#).expect("href regex must compile"));

/// One organic search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Create the `web_search` tool.
pub fn web_search_tool(ctx: &ToolContext) -> Arc<dyn Tool> {
    let http = ctx.http.clone();
    let endpoint = ctx.settings.web_search_url.clone();
    FnTool::shared(
        WEB_SEARCH,
        "Search the web for current information. Use for recent facts, papers, or sources.",
        AgentToolParameters::object()
            .string("query", "Search query.", true)
            .integer_with_default(
                "max_results",
                "Max number of results.",
                DEFAULT_MAX_RESULTS as i64,
            )
            .build(),
        move |args, _ctx: ToolCallContext| {
            let http = http.clone();
            let endpoint = endpoint.clone();
            async move {
                let query = args.get_str("query")?;
                let max_results = args.get_usize_or("max_results", DEFAULT_MAX_RESULTS)?;
                let url = format!("{endpoint}?q={}", urlencoding::encode(query));
                debug!(%url, "web search");

                let response = http
                    .get(&url)
                    .header(reqwest::header::USER_AGENT, USER_AGENT)
                    .send()
                    .await
                    .map_err(|e| ResearchError::tool(WEB_SEARCH, format!("Search error: {e}")))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ResearchError::tool(
                        WEB_SEARCH,
                        format!("Search error: HTTP {status}"),
                    ));
                }
                let html = response
                    .text()
                    .await
                    .map_err(|e| ResearchError::tool(WEB_SEARCH, format!("Search error: {e}")))?;

                let results: Vec<SearchResult> =
                    parse_results(&html).into_iter().take(max_results).collect();
                Ok(format_results(&results))
            }
        },
    )
}

/// Extract organic results from a DuckDuckGo HTML results page.
pub fn parse_results(html: &str) -> Vec<SearchResult> {
    html.split("result__body")
        .skip(1)
        .filter_map(|block| {
            let title_caps = TITLE_RE.captures(block)?;
            let title = clean(&title_caps[2]);
            if title.is_empty() {
                return None;
            }
            let href = HREF_RE
                .captures(&title_caps[1])
                .map(|c| decode_entities(&c[1]))
                .unwrap_or_default();
            let snippet = SNIPPET_RE
                .captures(block)
                .map(|c| clean(&c[1]))
                .unwrap_or_default();
            Some(SearchResult {
                title,
                snippet,
                url: resolve_redirect(&href),
            })
        })
        .collect()
}

pub fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   {}\n   Source: {}", i + 1, r.title, r.snippet, r.url))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn clean(fragment: &str) -> String {
    collapse_whitespace(&decode_entities(&strip_tags(fragment)))
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>&rut=...`.
fn resolve_redirect(href: &str) -> String {
    let target = href
        .split(['?', '&'])
        .find_map(|part| part.strip_prefix("uddg="))
        .and_then(|encoded| urlencoding::decode(encoded).ok())
        .map(|decoded| decoded.into_owned());
    match target {
        Some(url) => url,
        None if href.starts_with("//") => format!("https:{href}"),
        None => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"
<div class="result results_links results_links_deep web-result ">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust <b>Programming</b> Language</a>
    </h2>
    <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">A language empowering everyone to build reliable &amp; efficient software.</a>
  </div>
</div>
<div class="result">
  <div class="links_main result__body">
    <h2 class="result__title"><a class="result__a" href="https://doc.rust-lang.org/book/">The Book</a></h2>
  </div>
</div>
"#;

    #[test]
    fn parses_title_snippet_and_unwrapped_url() {
        let results = parse_results(PAGE);
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0],
            SearchResult {
                title: "Rust Programming Language".into(),
                snippet: "A language empowering everyone to build reliable & efficient software."
                    .into(),
                url: "https://www.rust-lang.org/".into(),
            }
        );
        assert_eq!(results[1].url, "https://doc.rust-lang.org/book/");
        assert_eq!(results[1].snippet, "");
    }

    #[test]
    fn formats_numbered_entries() {
        let formatted = format_results(&parse_results(PAGE)[..1]);
        assert_eq!(
            formatted,
            "1. Rust Programming Language\n   A language empowering everyone to build reliable & efficient software.\n   Source: https://www.rust-lang.org/"
        );
    }

    #[test]
    fn empty_page_reports_no_results() {
        assert_eq!(format_results(&parse_results("<html></html>")), "No results found.");
    }
}
