//! `search_academic_papers` over Semantic Scholar and arXiv.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::util::text::{collapse_whitespace, decode_entities, truncate_chars};

use super::builtin::ToolContext;
use super::tool::{FnTool, Tool, ToolCallContext};
use super::types::AgentToolParameters;

pub const SEARCH_ACADEMIC_PAPERS: &str = "search_academic_papers";

const DEFAULT_MAX_RESULTS: usize = 10;
const SEMANTIC_SCHOLAR_FIELDS: &str = "title,url,abstract,authors,year,citationCount";
const SOURCE_ABSTRACT_CHARS: usize = 500;
const DISPLAY_ABSTRACT_CHARS: usize = 400;
const MAX_AUTHORS: usize = 5;
const TITLE_KEY_CHARS: usize = 60;

const EMPTY_QUERY_TEXT: &str =
    "Please provide a search query (e.g. a topic or research question).";
const NO_PAPERS_TEXT: &str =
    "No academic papers found for that query. Try a different or broader search.";

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").expect("entry regex must compile"));
static AUTHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<author>.*?<name>(.*?)</name>.*?</author>").expect("author regex must compile")
});

/// Which index to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PaperSource {
    #[default]
    Both,
    SemanticScholar,
    Arxiv,
}

/// A paper normalized across sources.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paper {
    pub title: String,
    pub authors: String,
    pub abstract_text: String,
    pub url: String,
    pub year: Option<String>,
    pub citation_count: Option<u64>,
}

/// Create the `search_academic_papers` tool.
pub fn search_academic_papers_tool(ctx: &ToolContext) -> Arc<dyn Tool> {
    let client = PaperSearch {
        http: ctx.http.clone(),
        semantic_scholar_url: ctx.settings.semantic_scholar_url.clone(),
        arxiv_url: ctx.settings.arxiv_url.clone(),
    };
    FnTool::shared(
        SEARCH_ACADEMIC_PAPERS,
        "Search for academic papers by topic. Use for literature searches or to discover research \
         on a topic. source: \"semantic_scholar\" (published papers, many fields), \"arxiv\" \
         (preprints, CS/math/physics), or \"both\" (default) to search both and merge results.",
        AgentToolParameters::object()
            .string("query", "Topic or research question.", true)
            .integer_with_default(
                "max_results",
                "Max number of papers to return.",
                DEFAULT_MAX_RESULTS as i64,
            )
            .string_enum(
                "source",
                "Which index to search.",
                &["both", "semantic_scholar", "arxiv"],
                false,
            )
            .build(),
        move |args, _ctx: ToolCallContext| {
            let client = client.clone();
            async move {
                let query = args.get_str("query")?;
                let max_results = args.get_usize_or("max_results", DEFAULT_MAX_RESULTS)?;
                let source = args.get_parsed::<PaperSource>("source")?.unwrap_or_default();
                Ok(client.search(query, max_results, source).await)
            }
        },
    )
}

#[derive(Clone)]
struct PaperSearch {
    http: reqwest::Client,
    semantic_scholar_url: String,
    arxiv_url: String,
}

impl PaperSearch {
    async fn search(&self, query: &str, max_results: usize, source: PaperSource) -> String {
        if query.trim().is_empty() {
            return EMPTY_QUERY_TEXT.to_string();
        }
        let limit_each = match source {
            PaperSource::Both => ((max_results + 1) / 2).max(5),
            _ => max_results,
        };

        let mut papers = Vec::new();
        if matches!(source, PaperSource::Both | PaperSource::SemanticScholar) {
            papers.extend(self.semantic_scholar(query, limit_each).await);
        }
        if matches!(source, PaperSource::Both | PaperSource::Arxiv) {
            let arxiv = self.arxiv(query, limit_each).await;
            merge_deduplicated(&mut papers, arxiv);
        }
        debug!(query, papers = papers.len(), %source, "academic search");
        format_papers(&papers, max_results)
    }

    async fn semantic_scholar(&self, query: &str, limit: usize) -> Vec<Paper> {
        let url = format!(
            "{}/paper/search?query={}&limit={}&fields={SEMANTIC_SCHOLAR_FIELDS}",
            self.semantic_scholar_url.trim_end_matches('/'),
            urlencoding::encode(&query.trim().replace('-', " ")),
            limit.min(100),
        );
        match self.fetch(&url).await {
            Some(body) => parse_semantic_scholar(&body).unwrap_or_else(|e| {
                warn!(error = %e, "unparseable Semantic Scholar response");
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    async fn arxiv(&self, query: &str, limit: usize) -> Vec<Paper> {
        let url = format!(
            "{}?search_query=all:{}&start=0&max_results={limit}",
            self.arxiv_url,
            urlencoding::encode(query.trim()),
        );
        self.fetch(&url)
            .await
            .map(|body| parse_arxiv(&body))
            .unwrap_or_default()
    }

    /// A failing source contributes nothing rather than failing the whole search.
    async fn fetch(&self, url: &str) -> Option<String> {
        let result = async {
            let resp = self
                .http
                .get(url)
                .header(reqwest::header::USER_AGENT, "research-agent/0.1")
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, reqwest::Error>(resp.text().await?)
        }
        .await;
        match result {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(%url, error = %e, "paper source request failed");
                None
            }
        }
    }
}

#[derive(Deserialize)]
struct SemanticScholarResponse {
    #[serde(default)]
    data: Option<Vec<SemanticScholarPaper>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SemanticScholarPaper {
    paper_id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Option<Vec<SemanticScholarAuthor>>,
    year: Option<u32>,
    citation_count: Option<u64>,
}

#[derive(Deserialize)]
struct SemanticScholarAuthor {
    name: Option<String>,
}

pub fn parse_semantic_scholar(body: &str) -> Result<Vec<Paper>, serde_json::Error> {
    let response: SemanticScholarResponse = serde_json::from_str(body)?;
    Ok(response
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|p| {
            let authors = p.authors.unwrap_or_default();
            let names: Vec<String> = authors.iter().filter_map(|a| a.name.clone()).collect();
            Paper {
                title: p.title.unwrap_or_default(),
                authors: join_authors(&names, authors.len()),
                abstract_text: truncate_chars(&p.abstract_text.unwrap_or_default(), SOURCE_ABSTRACT_CHARS)
                    .0
                    .to_string(),
                url: p.url.filter(|u| !u.is_empty()).unwrap_or_else(|| {
                    format!(
                        "https://www.semanticscholar.org/paper/{}",
                        p.paper_id.unwrap_or_default()
                    )
                }),
                year: p.year.map(|y| y.to_string()),
                citation_count: p.citation_count,
            }
        })
        .collect())
}

/// Parse an arXiv Atom feed. Entries titled `Error` (arXiv's error feed) are skipped.
pub fn parse_arxiv(feed: &str) -> Vec<Paper> {
    ENTRY_RE
        .captures_iter(feed)
        .filter_map(|entry| {
            let entry = &entry[1];
            let title = atom_field(entry, "title");
            if title.is_empty() || title == "Error" {
                return None;
            }
            let names: Vec<String> = AUTHOR_RE
                .captures_iter(entry)
                .map(|c| collapse_whitespace(&decode_entities(&c[1])))
                .collect();
            let published = atom_field(entry, "published");
            let abstract_text = atom_field(entry, "summary");
            Some(Paper {
                title,
                authors: join_authors(&names, names.len()),
                abstract_text: truncate_chars(&abstract_text, SOURCE_ABSTRACT_CHARS)
                    .0
                    .to_string(),
                url: atom_field(entry, "id"),
                year: published.get(..4).map(str::to_string),
                citation_count: None,
            })
        })
        .collect()
}

fn atom_field(entry: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    entry
        .find(&open)
        .and_then(|start| {
            let rest = &entry[start..];
            let body_start = rest.find('>')? + 1;
            let body_end = rest.find(&close)?;
            rest.get(body_start..body_end)
        })
        .map(|raw| collapse_whitespace(&decode_entities(raw)))
        .unwrap_or_default()
}

fn join_authors(names: &[String], total: usize) -> String {
    let mut joined = names
        .iter()
        .take(MAX_AUTHORS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if total > MAX_AUTHORS {
        joined.push_str(" et al.");
    }
    joined
}

fn title_key(title: &str) -> String {
    title.to_lowercase().chars().take(TITLE_KEY_CHARS).collect()
}

/// Append `extra` papers whose title prefix is not already present.
pub fn merge_deduplicated(papers: &mut Vec<Paper>, extra: Vec<Paper>) {
    let mut seen: HashSet<String> = papers.iter().map(|p| title_key(&p.title)).collect();
    for paper in extra {
        if seen.insert(title_key(&paper.title)) {
            papers.push(paper);
        }
    }
}

pub fn format_papers(papers: &[Paper], max_results: usize) -> String {
    if papers.is_empty() {
        return NO_PAPERS_TEXT.to_string();
    }
    papers
        .iter()
        .take(max_results)
        .enumerate()
        .map(|(i, p)| {
            let title = if p.title.is_empty() { "No title" } else { p.title.as_str() };
            let authors = if p.authors.is_empty() { "Unknown" } else { p.authors.as_str() };
            let year = p.year.as_deref().map(|y| format!(" ({y})")).unwrap_or_default();
            let cites = p
                .citation_count
                .map(|c| format!(" [cited {c}×]"))
                .unwrap_or_default();
            let (abstract_text, _) = truncate_chars(&p.abstract_text, DISPLAY_ABSTRACT_CHARS);
            format!(
                "{}. {title}{year}{cites}\n   Authors: {authors}\n   {abstract_text}\n   {}",
                i + 1,
                p.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>  The dominant sequence transduction models are based on complex recurrent
 or convolutional neural networks.</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/api/errors</id>
    <title>Error</title>
  </entry>
</feed>"#;

    #[test]
    fn arxiv_entries_are_normalized() {
        let papers = parse_arxiv(FEED);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Attention Is All You Need");
        assert_eq!(papers[0].authors, "Ashish Vaswani, Noam Shazeer");
        assert_eq!(papers[0].year.as_deref(), Some("2017"));
        assert_eq!(papers[0].url, "http://arxiv.org/abs/1706.03762v7");
        assert!(papers[0].abstract_text.starts_with("The dominant sequence"));
    }

    #[test]
    fn semantic_scholar_caps_authors_and_falls_back_to_paper_url() {
        let body = r#"{"data":[{"paperId":"abc123","title":"Big Collab","url":null,
            "abstract":null,"year":2020,"citationCount":42,
            "authors":[{"name":"A"},{"name":"B"},{"name":"C"},{"name":"D"},{"name":"E"},{"name":"F"}]}]}"#;
        let papers = parse_semantic_scholar(body).unwrap();
        assert_eq!(papers[0].authors, "A, B, C, D, E et al.");
        assert_eq!(papers[0].url, "https://www.semanticscholar.org/paper/abc123");
        assert_eq!(papers[0].citation_count, Some(42));
    }

    #[test]
    fn duplicate_titles_are_dropped_case_insensitively() {
        let mut papers = vec![Paper {
            title: "Attention Is All You Need".into(),
            ..Default::default()
        }];
        merge_deduplicated(
            &mut papers,
            vec![
                Paper {
                    title: "ATTENTION is all you need".into(),
                    ..Default::default()
                },
                Paper {
                    title: "BERT".into(),
                    ..Default::default()
                },
            ],
        );
        let titles: Vec<&str> = papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Attention Is All You Need", "BERT"]);
    }

    #[test]
    fn formatting_includes_year_and_citations() {
        let paper = Paper {
            title: "Big Collab".into(),
            authors: String::new(),
            abstract_text: "x".repeat(450),
            url: "https://example.org/p".into(),
            year: Some("2020".into()),
            citation_count: Some(7),
        };
        let out = format_papers(&[paper], 10);
        assert!(out.starts_with("1. Big Collab (2020) [cited 7×]\n   Authors: Unknown\n   "));
        assert!(out.contains(&format!("   {}\n", "x".repeat(400))));
        assert!(out.ends_with("https://example.org/p"));
    }

    #[test]
    fn no_papers_yields_guidance() {
        assert_eq!(format_papers(&[], 5), NO_PAPERS_TEXT);
    }

    #[test]
    fn source_parses_from_snake_case() {
        assert_eq!("semantic_scholar".parse::<PaperSource>().unwrap(), PaperSource::SemanticScholar);
        assert_eq!(PaperSource::Arxiv.to_string(), "arxiv");
    }
}
