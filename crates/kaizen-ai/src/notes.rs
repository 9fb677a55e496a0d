use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::IntegrationError;

const NOTION_API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
/// Notion caps rich text content per block.
const NOTION_TEXT_LIMIT: usize = 2000;
/// and children per create request.
const NOTION_MAX_BLOCKS: usize = 100;

static NUMBERED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s").unwrap());
static UNSAFE_FILENAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9 _\-]").unwrap());

fn text_block(kind: &str, content: &str) -> Value {
    json!({
        "object": "block",
        "type": kind,
        kind: { "rich_text": [{ "type": "text", "text": { "content": content } }] },
    })
}

/// Convert simple markdown (headings, bullets, numbered items, paragraphs)
/// into Notion blocks. Long paragraphs are split across blocks.
pub fn markdown_to_blocks(markdown: &str) -> Vec<Value> {
    let mut blocks = Vec::new();
    for line in markdown.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("### ") {
            blocks.push(text_block("heading_3", rest));
        } else if let Some(rest) = line.strip_prefix("## ") {
            blocks.push(text_block("heading_2", rest));
        } else if let Some(rest) = line.strip_prefix("# ") {
            blocks.push(text_block("heading_1", rest));
        } else if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            blocks.push(text_block("bulleted_list_item", rest));
        } else if let Some(m) = NUMBERED_RE.find(line) {
            blocks.push(text_block("numbered_list_item", &line[m.end()..]));
        } else {
            let chars: Vec<char> = line.chars().collect();
            for chunk in chars.chunks(NOTION_TEXT_LIMIT) {
                blocks.push(text_block("paragraph", &chunk.iter().collect::<String>()));
            }
        }
    }
    blocks
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    #[serde(default)]
    url: Option<String>,
    id: String,
}

pub struct NotionClient {
    client: Client,
    base_url: String,
    api_key: String,
    parent_page_id: String,
}

impl NotionClient {
    pub fn new(api_key: &str, parent_page_id: &str) -> Result<Self, IntegrationError> {
        Self::with_base_url(NOTION_API_BASE, api_key, parent_page_id)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: &str,
        parent_page_id: &str,
    ) -> Result<Self, IntegrationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IntegrationError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            parent_page_id: parent_page_id.to_string(),
        })
    }

    /// Create a child page under the configured parent. Returns the page URL.
    pub async fn create_page(&self, title: &str, markdown: &str) -> Result<String, IntegrationError> {
        let mut children = markdown_to_blocks(markdown);
        children.truncate(NOTION_MAX_BLOCKS);
        let body = json!({
            "parent": { "page_id": self.parent_page_id },
            "properties": {
                "title": { "title": [{ "text": { "content": title } }] }
            },
            "children": children,
        });

        info!(title, blocks = children_len(&body), "Creating Notion page");
        let resp = self
            .client
            .post(format!("{}/pages", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| IntegrationError::network(&e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| IntegrationError::network(&e))?;
        if !status.is_success() {
            return Err(IntegrationError::from_status(status.as_u16(), &text));
        }
        let page: CreatedPage =
            serde_json::from_str(&text).map_err(|e| IntegrationError::InvalidResponse(e.to_string()))?;
        Ok(page
            .url
            .unwrap_or_else(|| format!("https://www.notion.so/{}", page.id.replace('-', ""))))
    }
}

fn children_len(body: &Value) -> usize {
    body["children"].as_array().map_or(0, Vec::len)
}

/// Writes notes as markdown files into a folder of an Obsidian vault.
pub struct ObsidianVault {
    root: PathBuf,
    folder: String,
}

impl ObsidianVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            folder: "Kaizen".to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a new note; never overwrites an existing file.
    pub async fn write_note(
        &self,
        title: &str,
        content: &str,
        tags: &[&str],
        now: DateTime<Utc>,
    ) -> Result<PathBuf, IntegrationError> {
        if !tokio::fs::try_exists(&self.root).await? {
            return Err(IntegrationError::InvalidInput(format!(
                "Vault path does not exist: {}",
                self.root.display()
            )));
        }
        let dir = self.root.join(&self.folder);
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{} {}.md", now.format("%Y-%m-%d"), note_file_stem(title)));
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => IntegrationError::InvalidInput(format!(
                    "A note named {} already exists.",
                    path.display()
                )),
                _ => IntegrationError::Io(e),
            })?;

        let frontmatter = format!(
            "---\ncreated: {}\ntags: [{}]\n---\n\n",
            now.to_rfc3339(),
            tags.join(", ")
        );
        file.write_all(frontmatter.as_bytes()).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        info!(path = %path.display(), "Saved Obsidian note");
        Ok(path)
    }
}

fn note_file_stem(title: &str) -> String {
    let cleaned = UNSAFE_FILENAME_RE.replace_all(title, "");
    let stem: String = cleaned.trim().chars().take(80).collect();
    if stem.is_empty() {
        "Note".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn markdown_block_kinds() {
        let md = "# Title\n\n## Part\n- one\n* two\n3. three\nplain text";
        let kinds: Vec<String> = markdown_to_blocks(md)
            .iter()
            .map(|b| b["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            kinds,
            [
                "heading_1",
                "heading_2",
                "bulleted_list_item",
                "bulleted_list_item",
                "numbered_list_item",
                "paragraph"
            ]
        );
        let blocks = markdown_to_blocks("3. three");
        assert_eq!(
            blocks[0]["numbered_list_item"]["rich_text"][0]["text"]["content"],
            "three"
        );
    }

    #[test]
    fn long_paragraphs_are_chunked() {
        let line = "x".repeat(NOTION_TEXT_LIMIT * 2 + 5);
        assert_eq!(markdown_to_blocks(&line).len(), 3);
    }

    #[test]
    fn file_stems_are_sanitized() {
        assert_eq!(note_file_stem("Sleep: a/b?"), "Sleep ab");
        assert_eq!(note_file_stem("???"), "Note");
    }

    #[tokio::test]
    async fn notion_page_url_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pages"))
            .and(header("Notion-Version", NOTION_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "abc-123",
                "url": "https://www.notion.so/abc123"
            })))
            .mount(&server)
            .await;

        let notion = NotionClient::with_base_url(&server.uri(), "secret", "parent").unwrap();
        let url = notion.create_page("Sleep", "# Sleep\n\nIt matters.").await.unwrap();
        assert_eq!(url, "https://www.notion.so/abc123");
    }

    #[tokio::test]
    async fn vault_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let vault = ObsidianVault::new(dir.path());
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();

        let path = vault
            .write_note("Sleep research", "Body", &["kaizen", "research"], now)
            .await
            .unwrap();
        assert!(path.ends_with("Kaizen/2024-05-10 Sleep research.md"));
        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.starts_with("---\ncreated: 2024-05-10T09:00:00+00:00\ntags: [kaizen, research]\n---\n\nBody"));

        let again = vault.write_note("Sleep research", "Other", &[], now).await;
        assert!(matches!(again, Err(IntegrationError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn vault_must_exist() {
        let vault = ObsidianVault::new("/definitely/not/a/vault");
        let err = vault.write_note("x", "y", &[], Utc::now()).await.unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidInput(_)));
    }
}
