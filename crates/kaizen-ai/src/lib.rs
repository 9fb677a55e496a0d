//! Clients for the third-party services the bot talks to: Groq for chat and
//! voice transcription, Perplexity for research, Google Calendar, Notion and
//! a local Obsidian vault, plus a plain web page scraper.
//!
//! Every service is optional. [`Integrations`] hands out a client or a
//! [`IntegrationError::MissingKey`] naming the variable to set.

pub mod calendar;
pub mod error;
pub mod groq;
pub mod notes;
pub mod openai;
pub mod research;
pub mod scrape;

pub use calendar::{CalendarClient, CalendarEvent};
pub use error::IntegrationError;
pub use groq::GroqClient;
pub use notes::{NotionClient, ObsidianVault};
pub use research::{PerplexityClient, Research};
pub use scrape::{ScrapedPage, Scraper};

#[derive(Default)]
pub struct Integrations {
    pub groq: Option<GroqClient>,
    pub perplexity: Option<PerplexityClient>,
    pub calendar: Option<CalendarClient>,
    pub notion: Option<NotionClient>,
    pub obsidian: Option<ObsidianVault>,
    pub scraper: Option<Scraper>,
}

impl Integrations {
    pub fn groq(&self) -> Result<&GroqClient, IntegrationError> {
        self.groq
            .as_ref()
            .ok_or(IntegrationError::MissingKey("GROQ_API_KEY"))
    }

    pub fn perplexity(&self) -> Result<&PerplexityClient, IntegrationError> {
        self.perplexity
            .as_ref()
            .ok_or(IntegrationError::MissingKey("PERPLEXITY_API_KEY"))
    }

    pub fn calendar(&self) -> Result<&CalendarClient, IntegrationError> {
        self.calendar
            .as_ref()
            .ok_or(IntegrationError::MissingKey("GOOGLE_CALENDAR_TOKEN"))
    }

    pub fn notion(&self) -> Result<&NotionClient, IntegrationError> {
        self.notion
            .as_ref()
            .ok_or(IntegrationError::MissingKey("NOTION_API_KEY"))
    }

    pub fn obsidian(&self) -> Result<&ObsidianVault, IntegrationError> {
        self.obsidian
            .as_ref()
            .ok_or(IntegrationError::MissingKey("OBSIDIAN_VAULT_PATH"))
    }

    pub fn scraper(&self) -> Result<&Scraper, IntegrationError> {
        self.scraper
            .as_ref()
            .ok_or_else(|| IntegrationError::Network("scraper client unavailable".into()))
    }
}
