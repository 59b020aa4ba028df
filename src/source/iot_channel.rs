//! IoT channel API connector (ThingSpeak-style feeds)
//!
//! The channel exposes `feeds[]` of `{created_at, field1, field2, field3}`
//! where the numbered fields map positionally to temperature, humidity and
//! pressure. Field values arrive as strings; rows with missing or
//! unparseable numbers are dropped.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::{SensorSource, SourceError, SourceId};
use crate::domain::{Reading, ReadingSeries};

const MAX_RESULTS: u32 = 8000;

pub struct IotChannelSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    channel_id: String,
}

impl IotChannelSource {
    pub fn new(
        base_url: String,
        api_key: String,
        channel_id: String,
        timeout: std::time::Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            channel_id,
        })
    }

    fn feeds_url(&self) -> String {
        format!(
            "{}/channels/{}/feeds.json",
            self.base_url.trim_end_matches('/'),
            self.channel_id
        )
    }
}

#[async_trait]
impl SensorSource for IotChannelSource {
    fn id(&self) -> SourceId {
        SourceId::IotChannelApi
    }

    async fn fetch(&self, days: u32) -> Result<ReadingSeries, SourceError> {
        if self.channel_id.is_empty() {
            return Err(SourceError::MissingCredentials("IoT channel id"));
        }

        let start = Utc::now() - Duration::days(days as i64);
        let url = self.feeds_url();
        debug!(%url, "fetching IoT channel feeds");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("start", &start.format("%Y-%m-%d %H:%M:%S").to_string()),
                ("results", &MAX_RESULTS.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SourceError::Api { status, body });
        }

        let payload: FeedsPayload =
            serde_json::from_str(&body).map_err(|e| SourceError::MalformedPayload(e.to_string()))?;

        let series = series_from_feeds(payload.feeds);
        if series.is_empty() {
            return Err(SourceError::TooShort { got: 0 });
        }

        info!(rows = series.len(), channel = %self.channel_id, "IoT channel data fetched");
        Ok(series)
    }
}

fn series_from_feeds(feeds: Vec<FeedRow>) -> ReadingSeries {
    // Channels push sub-daily entries; the series is daily with strictly
    // increasing dates, so entries collapse to one per-day mean.
    let mut daily: std::collections::BTreeMap<chrono::NaiveDate, (f64, f64, f64, u32)> =
        std::collections::BTreeMap::new();

    for row in feeds {
        let Some(temperature) = parse_field(row.field1.as_deref()) else {
            continue;
        };
        let Some(humidity) = parse_field(row.field2.as_deref()) else {
            continue;
        };
        let Some(pressure) = parse_field(row.field3.as_deref()) else {
            continue;
        };
        let entry = daily
            .entry(row.created_at.date_naive())
            .or_insert((0.0, 0.0, 0.0, 0));
        entry.0 += temperature;
        entry.1 += humidity;
        entry.2 += pressure;
        entry.3 += 1;
    }

    daily
        .into_iter()
        .map(|(date, (t, h, p, n))| {
            let n = n as f64;
            Reading {
                date,
                temperature: t / n,
                humidity: (h / n).clamp(0.0, 100.0),
                pressure: p / n,
            }
        })
        .collect()
}

fn parse_field(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
}

#[derive(Debug, Deserialize)]
struct FeedsPayload {
    feeds: Vec<FeedRow>,
}

#[derive(Debug, Deserialize)]
struct FeedRow {
    created_at: DateTime<Utc>,
    #[serde(default)]
    field1: Option<String>,
    #[serde(default)]
    field2: Option<String>,
    #[serde(default)]
    field3: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn row(created_at: &str, t: Option<&str>, h: Option<&str>, p: Option<&str>) -> FeedRow {
        FeedRow {
            created_at: created_at.parse().unwrap(),
            field1: t.map(String::from),
            field2: h.map(String::from),
            field3: p.map(String::from),
        }
    }

    #[test]
    fn test_feeds_mapped_positionally() {
        let series = series_from_feeds(vec![
            row("2024-06-01T08:00:00Z", Some("21.5"), Some("48.0"), Some("1011.2")),
            row("2024-06-02T08:00:00Z", Some("22.0"), Some("51.0"), Some("1012.0")),
        ]);

        assert_eq!(series.len(), 2);
        let first = series.first().unwrap();
        assert_eq!(first.temperature, 21.5);
        assert_eq!(first.humidity, 48.0);
        assert_eq!(first.pressure, 1011.2);
    }

    #[test]
    fn test_sub_daily_feeds_collapse_to_daily_means() {
        let series = series_from_feeds(vec![
            row("2024-06-01T08:00:00Z", Some("20.0"), Some("40.0"), Some("1010.0")),
            row("2024-06-01T14:00:00Z", Some("24.0"), Some("60.0"), Some("1012.0")),
            row("2024-06-02T08:00:00Z", Some("22.0"), Some("51.0"), Some("1011.0")),
        ]);

        assert_eq!(series.len(), 2);
        let dates: Vec<_> = series.iter().map(|r| r.date).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));

        let first = series.first().unwrap();
        assert_eq!(first.temperature, 22.0);
        assert_eq!(first.humidity, 50.0);
        assert_eq!(first.pressure, 1011.0);
    }

    #[test]
    fn test_unparseable_rows_dropped() {
        let series = series_from_feeds(vec![
            row("2024-06-01T08:00:00Z", Some("21.5"), Some("48.0"), Some("1011.2")),
            row("2024-06-02T08:00:00Z", Some("oops"), Some("51.0"), Some("1012.0")),
            row("2024-06-03T08:00:00Z", Some("22.0"), None, Some("1012.0")),
        ]);

        assert_eq!(series.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_channel_id() {
        let source = IotChannelSource::new(
            "http://localhost".into(),
            "key".into(),
            String::new(),
            std::time::Duration::from_secs(5),
        )
        .unwrap();

        let err = source.fetch(10).await.unwrap_err();
        assert!(matches!(err, SourceError::MissingCredentials(_)));
    }

    #[tokio::test]
    async fn test_fetch_parses_feeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/1234/feeds.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "feeds": [
                    {"created_at": "2024-06-01T08:00:00Z", "field1": "20.0", "field2": "50", "field3": "1010"},
                    {"created_at": "2024-06-02T08:00:00Z", "field1": "21.0", "field2": "52", "field3": "1011"},
                ]
            })))
            .mount(&server)
            .await;

        let source = IotChannelSource::new(
            server.uri(),
            "key".into(),
            "1234".into(),
            std::time::Duration::from_secs(5),
        )
        .unwrap();

        let series = source.fetch(10).await.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().temperature, 21.0);
    }

    #[tokio::test]
    async fn test_empty_feed_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"feeds": []})))
            .mount(&server)
            .await;

        let source = IotChannelSource::new(
            server.uri(),
            "key".into(),
            "1234".into(),
            std::time::Duration::from_secs(5),
        )
        .unwrap();

        let err = source.fetch(10).await.unwrap_err();
        assert!(matches!(err, SourceError::TooShort { got: 0 }));
    }
}
