use ask_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use reqwest::Client;

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; ask-agent/0.1)";
const MAX_RESULTS: usize = 5;
const NO_RESULT: &str = "No good DuckDuckGo Search Result was found";

/// A web search tool backed by the DuckDuckGo HTML endpoint.
///
/// The output is the text of the first few result snippets.
#[derive(Clone, Debug)]
pub struct SearchTool {
    client: Client,
    endpoint: String,
}

impl SearchTool {
    /// Creates a new search tool.
    #[inline]
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Creates a search tool querying another DuckDuckGo-compatible
    /// endpoint.
    pub fn with_endpoint<S: Into<String>>(endpoint: S) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl Default for SearchTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for SearchTool {
    fn name(&self) -> &str {
        "Search"
    }

    fn description(&self) -> &str {
        "Search engine to answer questions about current events"
    }

    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let url = format!("{}?q={}", self.endpoint, urlencoding::encode(&input));
        async move {
            if input.trim().is_empty() {
                return Err(ToolError::invalid_input().with_reason("empty query"));
            }
            debug!("searching: {input}");

            let resp = client.get(&url).send().await.map_err(|err| {
                ToolError::execution_error().with_reason(format!("{err}"))
            })?;
            let status = resp.status();
            if !status.is_success() {
                return Err(ToolError::execution_error()
                    .with_reason(format!("search returned {status}")));
            }
            let html = resp.text().await.map_err(|err| {
                ToolError::execution_error().with_reason(format!("{err}"))
            })?;

            let snippets = extract_snippets(&html);
            trace!("found {} snippets", snippets.len());
            if snippets.is_empty() {
                return Ok(NO_RESULT.to_owned());
            }
            Ok(snippets.join(" "))
        }
    }
}

/// Pulls result snippets out of a DuckDuckGo HTML page.
fn extract_snippets(html: &str) -> Vec<String> {
    html.split("class=\"result__snippet\"")
        .skip(1)
        .filter_map(|chunk| {
            let (_, body) = chunk.split_once('>')?;
            let end = body.find("</a>").or_else(|| body.find("</td>"))?;
            let text = html_decode(&strip_tags(&body[..end]));
            (!text.is_empty()).then_some(text)
        })
        .take(MAX_RESULTS)
        .collect()
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
