use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::IntegrationError;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    /// RFC 3339 start, or a plain date for all-day events.
    pub start: String,
    pub location: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    html_link: Option<String>,
    #[serde(default)]
    start: Option<ApiEventTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEventList {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

impl From<ApiEvent> for CalendarEvent {
    fn from(e: ApiEvent) -> Self {
        let start = e
            .start
            .and_then(|s| s.date_time.or(s.date))
            .unwrap_or_default();
        Self {
            id: e.id,
            summary: e.summary.unwrap_or_else(|| "No title".to_string()),
            start,
            location: e.location,
            link: e.html_link,
        }
    }
}

/// Parse the `YYYY-MM-DD HH:MM` start time users type for new events (UTC).
pub fn parse_event_start(input: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(input.trim(), "%Y-%m-%d %H:%M")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Google Calendar REST client for the bot owner's primary calendar.
pub struct CalendarClient {
    client: Client,
    base_url: String,
    token: String,
}

impl CalendarClient {
    pub fn new(token: &str) -> Result<Self, IntegrationError> {
        Self::with_base_url(CALENDAR_API_BASE, token)
    }

    pub fn with_base_url(base_url: &str, token: &str) -> Result<Self, IntegrationError> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(30))
            .build()
            .map_err(|e| IntegrationError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Create a one hour event starting at `start`.
    pub async fn create_event(
        &self,
        summary: &str,
        start: DateTime<Utc>,
    ) -> Result<CalendarEvent, IntegrationError> {
        let end = start + Duration::hours(1);
        let body = json!({
            "summary": summary,
            "start": { "dateTime": start.to_rfc3339_opts(SecondsFormat::Secs, true), "timeZone": "UTC" },
            "end": { "dateTime": end.to_rfc3339_opts(SecondsFormat::Secs, true), "timeZone": "UTC" },
        });

        let url = format!("{}/calendars/primary/events", self.base_url);
        info!(summary, "Creating calendar event");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| IntegrationError::network(&e))?;
        let event: ApiEvent = decode(resp).await?;
        Ok(event.into())
    }

    /// Events in the next seven days, soonest first.
    pub async fn upcoming(&self, now: DateTime<Utc>, max: u32) -> Result<Vec<CalendarEvent>, IntegrationError> {
        let url = format!("{}/calendars/primary/events", self.base_url);
        let time_min = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = (now + Duration::days(7)).to_rfc3339_opts(SecondsFormat::Secs, true);
        let max = max.to_string();
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("maxResults", max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await
            .map_err(|e| IntegrationError::network(&e))?;
        let list: ApiEventList = decode(resp).await?;
        Ok(list.items.into_iter().map(CalendarEvent::from).collect())
    }
}

async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, IntegrationError> {
    let status = resp.status();
    let text = resp.text().await.map_err(|e| IntegrationError::network(&e))?;
    if !status.is_success() {
        return Err(IntegrationError::from_status(status.as_u16(), &text));
    }
    serde_json::from_str(&text).map_err(|e| IntegrationError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn start_time_format() {
        assert_eq!(
            parse_event_start("2024-03-20 14:30"),
            Some(Utc.with_ymd_and_hms(2024, 3, 20, 14, 30, 0).unwrap())
        );
        assert_eq!(parse_event_start("tomorrow at 3"), None);
        assert_eq!(parse_event_start("2024-02-30 10:00"), None);
    }

    #[tokio::test]
    async fn create_posts_one_hour_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(body_partial_json(serde_json::json!({
                "summary": "Deep work",
                "end": { "dateTime": "2024-03-20T15:30:00Z" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "evt1",
                "summary": "Deep work",
                "htmlLink": "https://calendar.example/evt1",
                "start": { "dateTime": "2024-03-20T14:30:00Z" }
            })))
            .mount(&server)
            .await;

        let client = CalendarClient::with_base_url(&server.uri(), "tok").unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 20, 14, 30, 0).unwrap();
        let event = client.create_event("Deep work", start).await.unwrap();
        assert_eq!(event.id, "evt1");
        assert_eq!(event.link.as_deref(), Some("https://calendar.example/evt1"));
    }

    #[tokio::test]
    async fn upcoming_maps_all_day_events() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("singleEvents", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    { "id": "a", "start": { "date": "2024-03-21" } },
                    { "id": "b", "summary": "Gym", "location": "Downtown",
                      "start": { "dateTime": "2024-03-22T07:00:00Z" } }
                ]
            })))
            .mount(&server)
            .await;

        let client = CalendarClient::with_base_url(&server.uri(), "tok").unwrap();
        let events = client.upcoming(Utc::now(), 10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary, "No title");
        assert_eq!(events[0].start, "2024-03-21");
        assert_eq!(events[1].location.as_deref(), Some("Downtown"));
    }

    #[tokio::test]
    async fn unauthorized_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;
        let client = CalendarClient::with_base_url(&server.uri(), "tok").unwrap();
        let err = client.upcoming(Utc::now(), 5).await.unwrap_err();
        assert!(matches!(err, IntegrationError::Status { status: 401, .. }));
    }
}
