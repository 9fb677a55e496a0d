use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

const DEFAULT_REMINDER_HOURS: &str = "8,18,20,22";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub db_path: PathBuf,
    pub reminder_hours: Vec<u8>,
    pub session_backend: SessionBackend,
    pub health_addr: Option<SocketAddr>,

    // -- Optional integrations --
    pub groq_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
    pub calendar_token: Option<String>,
    /// API key and the page new notes are created under. Both or nothing.
    pub notion: Option<(String, String)>,
    pub obsidian_vault: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let Some(bot_token) = get("BOT_TOKEN") else {
            bail!("BOT_TOKEN is unset. Create a bot with @BotFather and put its token in .env");
        };

        let db_path = get("KAIZEN_DB_PATH").unwrap_or_else(|| "kaizen.db".into()).into();

        let reminder_hours = parse_hours(
            &get("KAIZEN_REMINDER_HOURS").unwrap_or_else(|| DEFAULT_REMINDER_HOURS.into()),
        )?;

        let session_backend = match get("KAIZEN_SESSION_BACKEND").as_deref() {
            None | Some("memory") => SessionBackend::Memory,
            Some("sqlite") => SessionBackend::Sqlite,
            Some(other) => bail!("KAIZEN_SESSION_BACKEND must be memory or sqlite, got {:?}", other),
        };

        let health_addr = get("KAIZEN_HEALTH_ADDR")
            .map(|addr| {
                addr.parse()
                    .with_context(|| format!("KAIZEN_HEALTH_ADDR {:?} is not host:port", addr))
            })
            .transpose()?;

        let notion = match (get("NOTION_API_KEY"), get("NOTION_PARENT_PAGE_ID")) {
            (Some(key), Some(page)) => Some((key, page)),
            _ => None,
        };

        Ok(Self {
            bot_token,
            db_path,
            reminder_hours,
            session_backend,
            health_addr,
            groq_api_key: get("GROQ_API_KEY"),
            perplexity_api_key: get("PERPLEXITY_API_KEY"),
            calendar_token: get("GOOGLE_CALENDAR_TOKEN"),
            notion,
            obsidian_vault: get("OBSIDIAN_VAULT_PATH").map(PathBuf::from),
        })
    }
}

/// Comma separated UTC hours, deduplicated and sorted.
fn parse_hours(raw: &str) -> anyhow::Result<Vec<u8>> {
    let mut hours = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let hour: u8 = part
            .parse()
            .with_context(|| format!("KAIZEN_REMINDER_HOURS: {:?} is not an hour", part))?;
        if hour > 23 {
            bail!("KAIZEN_REMINDER_HOURS: {} is out of range 0-23", hour);
        }
        hours.push(hour);
    }
    hours.sort_unstable();
    hours.dedup();
    if hours.is_empty() {
        bail!("KAIZEN_REMINDER_HOURS lists no hours");
    }
    Ok(hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("BOT_TOKEN", "123:abc")]).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("kaizen.db"));
        assert_eq!(cfg.reminder_hours, vec![8, 18, 20, 22]);
        assert_eq!(cfg.session_backend, SessionBackend::Memory);
        assert!(cfg.health_addr.is_none());
        assert!(cfg.groq_api_key.is_none());
    }

    #[test]
    fn token_is_required() {
        let err = config(&[("BOT_TOKEN", "  ")]).unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn hours_are_sorted_and_deduplicated() {
        assert_eq!(parse_hours("22, 8,8 ,18").unwrap(), vec![8, 18, 22]);
    }

    #[test]
    fn bad_hours_are_rejected() {
        assert!(parse_hours("8,24").is_err());
        assert!(parse_hours("eight").is_err());
        assert!(parse_hours(" , ").is_err());
    }

    #[test]
    fn notion_needs_both_values() {
        let cfg = config(&[("BOT_TOKEN", "t"), ("NOTION_API_KEY", "secret")]).unwrap();
        assert!(cfg.notion.is_none());

        let cfg = config(&[
            ("BOT_TOKEN", "t"),
            ("NOTION_API_KEY", "secret"),
            ("NOTION_PARENT_PAGE_ID", "page"),
        ])
        .unwrap();
        assert_eq!(cfg.notion, Some(("secret".into(), "page".into())));
    }

    #[test]
    fn sqlite_backend_and_health_addr() {
        let cfg = config(&[
            ("BOT_TOKEN", "t"),
            ("KAIZEN_SESSION_BACKEND", "sqlite"),
            ("KAIZEN_HEALTH_ADDR", "127.0.0.1:8080"),
        ])
        .unwrap();
        assert_eq!(cfg.session_backend, SessionBackend::Sqlite);
        assert_eq!(cfg.health_addr.unwrap().port(), 8080);
        assert!(config(&[("BOT_TOKEN", "t"), ("KAIZEN_SESSION_BACKEND", "redis")]).is_err());
    }
}
