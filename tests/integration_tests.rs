use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use chrono::{Datelike, Duration, Local, NaiveDate, TimeZone, Weekday};
use serde_json::json;
use tower::ServiceExt;

use frontdesk::config::AppConfig;
use frontdesk::handlers;
use frontdesk::models::{Inbox, ThreadMessage, User};
use frontdesk::services::calendar::{CalendarDocument, CalendarSearchResult, CalendarSource};
use frontdesk::services::directory::Directory;
use frontdesk::services::mail::{MailProvider, OutboundReply};
use frontdesk::services::oracle::{Message, TextOracle};
use frontdesk::state::AppState;

// ── Mock Providers ──

struct ScriptedOracle {
    classification: serde_json::Value,
    /// None = the selection call fails (exercises the OFFER fallback).
    selection_initial: Option<serde_json::Value>,
    selection_after: Option<serde_json::Value>,
    /// None = composition fails, replies use the deterministic template.
    email: Option<serde_json::Value>,
}

impl ScriptedOracle {
    fn reservation() -> serde_json::Value {
        json!({ "labels": ["RESERVATION"], "isSpam": false, "isReservation": true })
    }

    fn spam() -> serde_json::Value {
        json!({ "labels": ["SPAM"], "isSpam": true, "isReservation": false })
    }
}

#[async_trait]
impl TextOracle for ScriptedOracle {
    async fn complete(
        &self,
        _prompt: &str,
        _system: &[Message],
        _temperature: f32,
        _max_tokens: u32,
    ) -> anyhow::Result<String> {
        anyhow::bail!("free-form completion not scripted")
    }

    async fn complete_structured(
        &self,
        prompt: &str,
        _schema: serde_json::Value,
        schema_name: &str,
        _system: &[Message],
        _temperature: f32,
        _max_tokens: u32,
    ) -> anyhow::Result<serde_json::Value> {
        match schema_name {
            "EmailClassification" => Ok(self.classification.clone()),
            "BusyEventExtraction" => Ok(json!({ "events": [] })),
            "ActionSelection" => {
                let scripted = if prompt.contains("[Availability check]") {
                    &self.selection_after
                } else {
                    &self.selection_initial
                };
                scripted
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("selection API error"))
            }
            "email_response" => self
                .email
                .clone()
                .ok_or_else(|| anyhow::anyhow!("generation API error")),
            other => anyhow::bail!("unexpected schema: {other}"),
        }
    }
}

struct MockCalendar {
    documents: Vec<CalendarDocument>,
    fail: bool,
}

#[async_trait]
impl CalendarSource for MockCalendar {
    async fn search(
        &self,
        _query: &str,
        _user_id: &str,
        _want_answer: bool,
    ) -> anyhow::Result<CalendarSearchResult> {
        if self.fail {
            anyhow::bail!("calendar unreachable");
        }
        Ok(CalendarSearchResult {
            answer: String::new(),
            documents: self.documents.clone(),
        })
    }
}

struct MockMail {
    sent: Arc<Mutex<Vec<(String, String, OutboundReply)>>>,
}

#[async_trait]
impl MailProvider for MockMail {
    async fn reply(
        &self,
        inbox_id: &str,
        message_id: &str,
        reply: &OutboundReply,
    ) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((inbox_id.to_string(), message_id.to_string(), reply.clone()));
        Ok(())
    }

    async fn fetch_thread(&self, _thread_id: &str) -> anyhow::Result<Vec<ThreadMessage>> {
        Ok(vec![])
    }
}

struct MockDirectory;

#[async_trait]
impl Directory for MockDirectory {
    async fn get_inbox(&self, inbox_id: &str) -> anyhow::Result<Option<Inbox>> {
        if inbox_id != "inbox-1" {
            return Ok(None);
        }
        Ok(Some(Inbox {
            inbox_id: "inbox-1".to_string(),
            user: "user-1".to_string(),
            name: "Frontdesk".to_string(),
            persona: String::new(),
        }))
    }

    async fn get_user_by_id(&self, user_id: &str) -> anyhow::Result<Option<User>> {
        if user_id != "user-1" {
            return Ok(None);
        }
        Ok(Some(
            serde_json::from_value(json!({
                "id": "user-1",
                "email": "owner@example.com",
                "name": "Owner",
                "preferences": {},
            }))
            .unwrap(),
        ))
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        openai_api_key: String::new(),
        openai_model: "gpt-4o-mini".to_string(),
        hyperspell_api_key: String::new(),
        agentmail_api_key: String::new(),
        convex_url: String::new(),
        default_meeting_minutes: 60,
    }
}

type Sent = Arc<Mutex<Vec<(String, String, OutboundReply)>>>;

fn test_app(oracle: ScriptedOracle, calendar: MockCalendar) -> (Router, Sent) {
    let sent = Arc::new(Mutex::new(vec![]));
    let state = Arc::new(AppState {
        config: test_config(),
        oracle: Box::new(oracle),
        calendar: Box::new(calendar),
        mail: Box::new(MockMail {
            sent: Arc::clone(&sent),
        }),
        directory: Box::new(MockDirectory),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook/email", post(handlers::webhook::email_webhook))
        .route(
            "/webhook/email/sync",
            post(handlers::webhook::email_webhook_sync),
        )
        .with_state(state);

    (app, sent)
}

fn empty_calendar() -> MockCalendar {
    MockCalendar {
        documents: vec![],
        fail: false,
    }
}

fn webhook_request(subject: &str, text: &str) -> Request<Body> {
    webhook_request_for_inbox("inbox-1", subject, text)
}

fn webhook_request_for_inbox(inbox_id: &str, subject: &str, text: &str) -> Request<Body> {
    let payload = json!({
        "type": "event",
        "event_id": "evt-1",
        "event_type": "message.received",
        "message": {
            "message_id": "msg-1",
            "inbox_id": inbox_id,
            "from": "Alice Example <alice@example.com>",
            "to": ["desk@example.com"],
            "subject": subject,
            "text": text,
            "timestamp": "2025-11-13T09:00:00Z",
        },
    });
    Request::builder()
        .method("POST")
        .uri("/webhook/email/sync")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

/// First weekday at least `min_days` ahead of today.
fn future_weekday(min_days: i64) -> NaiveDate {
    let mut date = Local::now().date_naive() + Duration::days(min_days);
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date += Duration::days(1);
    }
    date
}

fn busy_document(date: NaiveDate, start_h: u32, end_h: u32) -> CalendarDocument {
    let rfc = |h: u32| {
        Local
            .from_local_datetime(&date.and_hms_opt(h, 0, 0).unwrap())
            .unwrap()
            .to_rfc3339()
    };
    CalendarDocument {
        title: "Busy Meeting".to_string(),
        content: json!({
            "start": { "dateTime": rfc(start_h) },
            "end": { "dateTime": rfc(end_h) },
        }),
        source: "google_calendar".to_string(),
    }
}

fn offer_decision() -> serde_json::Value {
    json!({
        "action": "OFFER",
        "confidence": 0.95,
        "reasoning": "no specific time proposed",
        "timeSuggestions": [],
    })
}

fn check_time_decision(date: NaiveDate) -> serde_json::Value {
    json!({
        "action": "CHECK_TIME",
        "confidence": 0.92,
        "reasoning": "purpose plus a specific time",
        "timeSuggestions": [{
            "date": date.format("%Y-%m-%d").to_string(),
            "startTime": "10:00",
            "endTime": "11:00",
        }],
    })
}

// ── Tests ──

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = test_app(
        ScriptedOracle {
            classification: ScriptedOracle::reservation(),
            selection_initial: None,
            selection_after: None,
            email: None,
        },
        empty_calendar(),
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_offer_flow_sends_slots() {
    let (app, sent) = test_app(
        ScriptedOracle {
            classification: ScriptedOracle::reservation(),
            selection_initial: Some(offer_decision()),
            selection_after: None,
            email: None,
        },
        empty_calendar(),
    );

    let response = app
        .oneshot(webhook_request(
            "Demo call",
            "I'd like to book a demo call sometime",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (inbox_id, message_id, reply) = &sent[0];
    assert_eq!(inbox_id, "inbox-1");
    assert_eq!(message_id, "msg-1");
    assert!(reply.text.contains("propose the following time slots"));
    // Three numbered slots from the availability calculator
    assert!(reply.text.contains("1. "));
    assert!(reply.text.contains("3. "));
    assert!(reply.ics_attachment.is_none());
    assert!(reply.text.starts_with("Dear Alice Example,"));
}

#[tokio::test]
async fn test_check_time_available_confirms_with_invite() {
    let date = future_weekday(3);
    let (app, sent) = test_app(
        ScriptedOracle {
            classification: ScriptedOracle::reservation(),
            selection_initial: Some(check_time_decision(date)),
            selection_after: Some(json!({
                "action": "CONFIRM",
                "confidence": 0.97,
                "reasoning": "the slot is free",
                "timeSuggestions": [],
            })),
            email: None,
        },
        empty_calendar(),
    );

    let response = app
        .oneshot(webhook_request(
            "Demo call",
            "Could we meet at 10am on that day?",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let reply = &sent[0].2;
    assert!(reply.text.contains("pleased to confirm"));
    assert!(reply.text.contains("Time: 10:00 - 11:00"));
    let ics = reply.ics_attachment.as_ref().expect("confirm carries an invite");
    assert!(ics.contains("BEGIN:VCALENDAR"));
    assert!(ics.contains(&format!("DTSTART:{}T100000", date.format("%Y%m%d"))));
}

#[tokio::test]
async fn test_check_time_conflict_counteroffers() {
    let date = future_weekday(3);
    let (app, sent) = test_app(
        ScriptedOracle {
            classification: ScriptedOracle::reservation(),
            selection_initial: Some(check_time_decision(date)),
            selection_after: Some(json!({
                "action": "COUNTEROFFER",
                "confidence": 0.9,
                "reasoning": "the slot conflicts",
                "timeSuggestions": [],
            })),
            email: None,
        },
        MockCalendar {
            documents: vec![busy_document(date, 10, 11)],
            fail: false,
        },
    );

    let response = app
        .oneshot(webhook_request(
            "Demo call",
            "Could we meet at 10am on that day?",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let reply = &sent[0].2;
    assert!(reply.text.contains("not available on"));
    assert!(reply.text.contains("alternative times"));
    assert!(reply.ics_attachment.is_none());
    // The conflicting 10:00 slot must not reappear among the numbered alternatives
    let listed_at_ten = format!(". {} at 10:00", date.format("%A, %B %-d, %Y"));
    assert!(!reply.text.contains(&listed_at_ten));
}

#[tokio::test]
async fn test_spam_is_ignored() {
    let (app, sent) = test_app(
        ScriptedOracle {
            classification: ScriptedOracle::spam(),
            selection_initial: Some(offer_decision()),
            selection_after: None,
            email: None,
        },
        empty_calendar(),
    );

    let response = app
        .oneshot(webhook_request("WIN BIG", "You have won a prize"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_selector_failure_still_replies_with_offer() {
    let (app, sent) = test_app(
        ScriptedOracle {
            classification: ScriptedOracle::reservation(),
            selection_initial: None, // selection API down
            selection_after: None,
            email: None,
        },
        empty_calendar(),
    );

    let response = app
        .oneshot(webhook_request("Demo call", "Let's find a time"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].2.text.contains("propose the following time slots"));
}

#[tokio::test]
async fn test_calendar_outage_degrades_to_default_slots() {
    let (app, sent) = test_app(
        ScriptedOracle {
            classification: ScriptedOracle::reservation(),
            selection_initial: Some(offer_decision()),
            selection_after: None,
            email: None,
        },
        MockCalendar {
            documents: vec![],
            fail: true,
        },
    );

    let response = app
        .oneshot(webhook_request("Demo call", "Any time next week works"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    // Degraded mode still offers up to three slots at the working-day start
    assert!(sent[0].2.text.contains("1. "));
    assert!(sent[0].2.text.contains("09:00 - 10:00"));
}

#[tokio::test]
async fn test_ai_composed_reply_is_used_when_available() {
    let (app, sent) = test_app(
        ScriptedOracle {
            classification: ScriptedOracle::reservation(),
            selection_initial: Some(offer_decision()),
            selection_after: None,
            email: Some(json!({
                "subject": "Re: Demo call",
                "emailContent": "Happy to meet! Here are some options.",
            })),
        },
        empty_calendar(),
    );

    let response = app
        .oneshot(webhook_request("Demo call", "I'd like to book a call"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = sent.lock().unwrap();
    assert_eq!(sent[0].2.subject.as_deref(), Some("Re: Demo call"));
    assert_eq!(sent[0].2.text, "Happy to meet! Here are some options.");
}

#[tokio::test]
async fn test_unknown_inbox_is_not_found() {
    let (app, sent) = test_app(
        ScriptedOracle {
            classification: ScriptedOracle::reservation(),
            selection_initial: Some(offer_decision()),
            selection_after: None,
            email: None,
        },
        empty_calendar(),
    );

    let response = app
        .oneshot(webhook_request_for_inbox("inbox-unknown", "Hi", "Hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_async_webhook_acks_immediately() {
    let (app, sent) = test_app(
        ScriptedOracle {
            classification: ScriptedOracle::reservation(),
            selection_initial: Some(offer_decision()),
            selection_after: None,
            email: None,
        },
        empty_calendar(),
    );

    let payload = json!({
        "type": "event",
        "event_id": "evt-2",
        "event_type": "message.received",
        "message": {
            "message_id": "msg-2",
            "inbox_id": "inbox-1",
            "from": "alice@example.com",
            "to": ["desk@example.com"],
            "subject": "Demo call",
            "text": "I'd like to book a call",
            "timestamp": "2025-11-13T09:00:00Z",
        },
    });
    let request = Request::builder()
        .method("POST")
        .uri("/webhook/email")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["success"], true);

    // Processing happens in a spawned task; give it a moment to land.
    for _ in 0..50 {
        if !sent.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(sent.lock().unwrap().len(), 1);
}
