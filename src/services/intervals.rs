use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;

use crate::models::slot::DATE_FORMAT;
use crate::models::BusyInterval;
use crate::services::calendar::CalendarDocument;
use crate::services::oracle::{Message, TextOracle};

pub type BusyMap = HashMap<NaiveDate, Vec<BusyInterval>>;

/// A busy event recovered by the oracle from unstructured text.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleBusyRecord {
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    #[serde(rename = "dateStr")]
    pub date_str: String,
}

/// First tier: direct parse. Content may be a JSON-encoded string or an
/// already-structured object carrying `start.dateTime` / `end.dateTime`.
/// Anything that yields no interval is returned as raw text for the
/// AI-assisted second tier.
pub fn partition_documents(docs: &[CalendarDocument]) -> (BusyMap, Vec<String>) {
    let mut busy = BusyMap::new();
    let mut unparsed = Vec::new();

    for doc in docs {
        let structured = match &doc.content {
            serde_json::Value::String(s) => serde_json::from_str::<serde_json::Value>(s).ok(),
            serde_json::Value::Object(_) => Some(doc.content.clone()),
            _ => None,
        };

        let interval = structured.as_ref().and_then(event_interval);

        match interval {
            Some((date, interval)) => {
                busy.entry(date).or_default().push(interval);
            }
            None => {
                let raw = match &doc.content {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if !raw.trim().is_empty() {
                    unparsed.push(format!("{}: {}", doc.title, raw));
                }
            }
        }
    }

    (busy, unparsed)
}

fn event_interval(event: &serde_json::Value) -> Option<(NaiveDate, BusyInterval)> {
    let start = event["start"]["dateTime"].as_str()?;
    let end = event["end"]["dateTime"].as_str()?;
    to_local_interval(start, end)
}

/// Bucket under the date of the start timestamp; both endpoints become local
/// times-of-day. An event crossing midnight is clamped to the start date.
fn to_local_interval(start: &str, end: &str) -> Option<(NaiveDate, BusyInterval)> {
    let start = DateTime::parse_from_rfc3339(start).ok()?.with_timezone(&Local);
    let end = DateTime::parse_from_rfc3339(end).ok()?.with_timezone(&Local);

    let date = start.date_naive();
    let start_time = start.time();
    let end_time = if end.date_naive() > date {
        NaiveTime::from_hms_opt(23, 59, 0)?
    } else {
        end.time()
    };

    if end_time <= start_time {
        return None;
    }

    Some((
        date,
        BusyInterval {
            start: start_time,
            end: end_time,
        },
    ))
}

/// Second tier: batch every unparsable payload into one structured-output
/// call and let the oracle recover busy events from the text.
pub async fn reparse_with_oracle(
    oracle: &dyn TextOracle,
    raw: &[String],
) -> anyhow::Result<Vec<OracleBusyRecord>> {
    let schema = json!({
        "type": "object",
        "properties": {
            "events": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "startDate": { "type": "string", "description": "ISO 8601 datetime" },
                        "endDate": { "type": "string", "description": "ISO 8601 datetime" },
                        "dateStr": { "type": "string", "description": "YYYY-MM-DD" },
                    },
                    "required": ["startDate", "endDate", "dateStr"],
                    "additionalProperties": false,
                },
            },
        },
        "required": ["events"],
        "additionalProperties": false,
    });

    let system = Message::system(
        "You extract calendar events from raw text. For each busy event found, \
         return startDate and endDate as ISO 8601 datetimes and dateStr as the \
         event's date in YYYY-MM-DD. Ignore text that describes no event.",
    );

    let prompt = format!(
        "Extract every busy calendar event from these entries:\n\n{}",
        raw.join("\n---\n")
    );

    let value = oracle
        .complete_structured(&prompt, schema, "BusyEventExtraction", &[system], 0.0, 1000)
        .await?;

    let records: Vec<OracleBusyRecord> =
        serde_json::from_value(value["events"].clone()).unwrap_or_default();
    Ok(records)
}

fn merge_oracle_records(busy: &mut BusyMap, records: Vec<OracleBusyRecord>) {
    for record in records {
        let Ok(date) = NaiveDate::parse_from_str(&record.date_str, DATE_FORMAT) else {
            tracing::warn!(date = %record.date_str, "dropping reparsed event with bad date");
            continue;
        };
        match to_local_interval(&record.start_date, &record.end_date) {
            Some((_, interval)) => busy.entry(date).or_default().push(interval),
            None => {
                tracing::warn!(
                    start = %record.start_date,
                    end = %record.end_date,
                    "dropping reparsed event with bad timestamps"
                );
            }
        }
    }
}

/// Full two-tier extraction. Events the oracle also cannot recover are
/// dropped; the corresponding time reads as free.
pub async fn extract_busy_intervals(
    oracle: &dyn TextOracle,
    docs: &[CalendarDocument],
) -> BusyMap {
    let (mut busy, unparsed) = partition_documents(docs);

    if !unparsed.is_empty() {
        match reparse_with_oracle(oracle, &unparsed).await {
            Ok(records) => merge_oracle_records(&mut busy, records),
            Err(e) => {
                tracing::warn!(error = %e, count = unparsed.len(), "AI reparse failed, dropping unparsable calendar entries");
            }
        }
    }

    busy
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doc(content: serde_json::Value) -> CalendarDocument {
        CalendarDocument {
            title: "Busy Meeting".to_string(),
            content,
            source: "google_calendar".to_string(),
        }
    }

    fn local_rfc3339(date: NaiveDate, h: u32, m: u32) -> String {
        Local
            .from_local_datetime(&date.and_hms_opt(h, m, 0).unwrap())
            .unwrap()
            .to_rfc3339()
    }

    fn event_json(date: NaiveDate, start_h: u32, end_h: u32) -> serde_json::Value {
        json!({
            "start": { "dateTime": local_rfc3339(date, start_h, 0) },
            "end": { "dateTime": local_rfc3339(date, end_h, 0) },
        })
    }

    #[test]
    fn test_partition_json_string_content() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 14).unwrap();
        let docs = [doc(serde_json::Value::String(
            event_json(date, 10, 11).to_string(),
        ))];

        let (busy, unparsed) = partition_documents(&docs);
        assert!(unparsed.is_empty());
        let intervals = &busy[&date];
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].start, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(intervals[0].end, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    }

    #[test]
    fn test_partition_object_content() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 14).unwrap();
        let docs = [doc(event_json(date, 14, 15))];

        let (busy, unparsed) = partition_documents(&docs);
        assert!(unparsed.is_empty());
        assert_eq!(busy[&date].len(), 1);
    }

    #[test]
    fn test_partition_defers_unstructured_text() {
        let docs = [doc(serde_json::Value::String(
            "Standup with the team tomorrow morning".to_string(),
        ))];

        let (busy, unparsed) = partition_documents(&docs);
        assert!(busy.is_empty());
        assert_eq!(unparsed.len(), 1);
        assert!(unparsed[0].contains("Standup with the team"));
    }

    #[test]
    fn test_partition_defers_object_without_times() {
        let docs = [doc(json!({ "summary": "Event without times" }))];

        let (busy, unparsed) = partition_documents(&docs);
        assert!(busy.is_empty());
        assert_eq!(unparsed.len(), 1);
    }

    #[test]
    fn test_partition_is_idempotent() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 14).unwrap();
        let docs = [
            doc(event_json(date, 10, 11)),
            doc(serde_json::Value::String("free text".to_string())),
        ];

        let (first, first_raw) = partition_documents(&docs);
        let (second, second_raw) = partition_documents(&docs);
        assert_eq!(first[&date], second[&date]);
        assert_eq!(first_raw, second_raw);
    }

    #[test]
    fn test_multiple_events_bucket_per_date() {
        let day_one = NaiveDate::from_ymd_opt(2025, 11, 13).unwrap();
        let day_two = NaiveDate::from_ymd_opt(2025, 11, 14).unwrap();
        let docs = [
            doc(event_json(day_one, 9, 10)),
            doc(event_json(day_one, 13, 14)),
            doc(event_json(day_two, 11, 12)),
        ];

        let (busy, _) = partition_documents(&docs);
        assert_eq!(busy[&day_one].len(), 2);
        assert_eq!(busy[&day_two].len(), 1);
    }

    #[test]
    fn test_merge_drops_invalid_records() {
        let mut busy = BusyMap::new();
        merge_oracle_records(
            &mut busy,
            vec![
                OracleBusyRecord {
                    start_date: "not a datetime".to_string(),
                    end_date: "also not".to_string(),
                    date_str: "2025-11-14".to_string(),
                },
                OracleBusyRecord {
                    start_date: local_rfc3339(NaiveDate::from_ymd_opt(2025, 11, 14).unwrap(), 10, 0),
                    end_date: local_rfc3339(NaiveDate::from_ymd_opt(2025, 11, 14).unwrap(), 11, 0),
                    date_str: "garbage".to_string(),
                },
            ],
        );
        assert!(busy.is_empty());
    }

    #[test]
    fn test_merge_uses_date_str_for_bucketing() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 14).unwrap();
        let bucket = NaiveDate::from_ymd_opt(2025, 11, 17).unwrap();
        let mut busy = BusyMap::new();
        merge_oracle_records(
            &mut busy,
            vec![OracleBusyRecord {
                start_date: local_rfc3339(date, 10, 0),
                end_date: local_rfc3339(date, 11, 0),
                date_str: "2025-11-17".to_string(),
            }],
        );
        assert_eq!(busy[&bucket].len(), 1);
    }
}
