use serde::Deserialize;
use serde_json::json;

use crate::models::{ActionDecision, ConversationState, EmailAction, ThreadMessage, TimeSlot};
use crate::services::oracle::{Message, TextOracle};

const FALLBACK_REASONING: &str = "Error occurred during action selection";

#[derive(Deserialize)]
struct DecisionWire {
    action: EmailAction,
    confidence: f64,
    reasoning: String,
    #[serde(rename = "timeSuggestions", default)]
    time_suggestions: Vec<SlotWire>,
}

#[derive(Deserialize)]
struct SlotWire {
    date: String,
    #[serde(rename = "startTime")]
    start_time: String,
    #[serde(rename = "endTime")]
    end_time: String,
}

/// Decide the next conversational action for one inbound email. Pure in the
/// sense that all state travels through the arguments; the only side effect
/// is the oracle call. Oracle failure falls back deterministically to OFFER
/// with zero confidence, the only action safe to take with no information.
pub async fn select_action(
    oracle: &dyn TextOracle,
    subject: &str,
    body: &str,
    state: ConversationState,
    thread_history: &[ThreadMessage],
) -> ActionDecision {
    tracing::info!(subject = %subject, state = state.as_str(), "selecting action");

    let mut context = vec![Message::system(system_prompt(state))];
    for prior in thread_history {
        context.push(Message::user(format!(
            "[earlier message from {} at {}]\n{}",
            prior.from, prior.timestamp, prior.text
        )));
    }

    let prompt = format!("Subject: {subject}\n\nBody: {body}");

    let result = oracle
        .complete_structured(
            &prompt,
            decision_schema(state),
            "ActionSelection",
            &context,
            0.3,
            200,
        )
        .await;

    match result.and_then(|value| parse_decision(value, state)) {
        Ok(decision) => {
            tracing::info!(
                action = decision.action.as_str(),
                confidence = decision.confidence,
                "action selected"
            );
            decision
        }
        Err(e) => {
            tracing::error!(error = %e, "action selection failed, falling back to OFFER");
            fallback_decision()
        }
    }
}

pub fn fallback_decision() -> ActionDecision {
    ActionDecision {
        action: EmailAction::Offer,
        confidence: 0.0,
        reasoning: FALLBACK_REASONING.to_string(),
        time_suggestions: Vec::new(),
    }
}

/// Actions the state machine permits from each stage.
pub fn permitted_actions(state: ConversationState) -> &'static [EmailAction] {
    match state {
        ConversationState::Initial => &[
            EmailAction::Offer,
            EmailAction::CheckTime,
            EmailAction::Confirm,
        ],
        ConversationState::AfterCheckTime => &[EmailAction::Confirm, EmailAction::CounterOffer],
    }
}

fn decision_schema(state: ConversationState) -> serde_json::Value {
    let actions: Vec<&str> = permitted_actions(state)
        .iter()
        .map(|a| a.as_str())
        .collect();

    json!({
        "type": "object",
        "properties": {
            "action": { "type": "string", "enum": actions },
            "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
            "reasoning": { "type": "string" },
            "timeSuggestions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "date": { "type": "string", "description": "YYYY-MM-DD" },
                        "startTime": { "type": "string", "description": "HH:MM" },
                        "endTime": { "type": "string", "description": "HH:MM" },
                    },
                    "required": ["date", "startTime", "endTime"],
                    "additionalProperties": false,
                },
            },
        },
        "required": ["action", "confidence", "reasoning", "timeSuggestions"],
        "additionalProperties": false,
    })
}

fn system_prompt(state: ConversationState) -> &'static str {
    match state {
        ConversationState::Initial => {
            "You are an AI secretary that analyzes reservation-related emails and selects the appropriate action.\n\n\
             For INITIAL emails (first contact), you can select from these actions:\n\n\
             1. OFFER - Use when:\n\
                - Email expresses interest in making a reservation\n\
                - Email has a purpose (e.g., \"I'd like to make a sales call\") but NO specific time suggestion\n\
                - Sender is inquiring about availability without proposing a time\n\
                Example: \"Hi, I'd like to book a demo call sometime next week.\"\n\n\
             2. CHECK_TIME - Use when:\n\
                - Email has both a purpose AND a specific time suggestion\n\
                - Sender proposes a specific date/time for the reservation\n\
                - Email contains phrases like \"at 7pm\", \"on Friday\", \"next Tuesday at noon\"\n\
                Example: \"Hi, I'd like to book a demo call this Friday at 7pm\"\n\n\
             3. CONFIRM - Use when:\n\
                - Email is accepting/confirming a previous offer or time suggestion\n\
                - Email has context of prior communication about time\n\
                - Contains acceptance language like \"yes\", \"confirmed\", \"that works\", \"sounds good\"\n\
                Example: \"Yes, that time works for me. See you then!\"\n\n\
             If the action is CHECK_TIME or CONFIRM, extract the proposed date and time into timeSuggestions \
             (date as YYYY-MM-DD, times as HH:MM in 24h form). Otherwise leave timeSuggestions empty."
        }
        ConversationState::AfterCheckTime => {
            "You are an AI secretary that analyzes reservation-related emails with given time-context.\n\n\
             With time context, you can select from these actions:\n\n\
             1. CONFIRM - Use when:\n\
                - You can confirm the proposed time. If no information or no schedule conflict, it can be confirmed.\n\n\
             2. COUNTEROFFER - Use when:\n\
                - You cannot confirm the proposed time and need to suggest an alternative.\n\n\
             Leave timeSuggestions empty unless a concrete alternative time is already known."
        }
    }
}

fn parse_decision(
    value: serde_json::Value,
    state: ConversationState,
) -> anyhow::Result<ActionDecision> {
    let wire: DecisionWire = serde_json::from_value(value)?;

    anyhow::ensure!(
        permitted_actions(state).contains(&wire.action),
        "action {} is not permitted from state {}",
        wire.action.as_str(),
        state.as_str()
    );

    let time_suggestions: Vec<TimeSlot> = wire
        .time_suggestions
        .iter()
        .filter_map(|s| {
            TimeSlot::parse(&s.date, &s.start_time, &s.end_time)
                .map_err(|e| tracing::warn!(error = %e, "dropping malformed time suggestion"))
                .ok()
        })
        .collect();

    Ok(ActionDecision {
        action: wire.action,
        confidence: wire.confidence.clamp(0.0, 1.0),
        reasoning: wire.reasoning,
        time_suggestions,
    })
}
