use serde::Deserialize;
use serde_json::json;

use crate::models::{EmailGenerationContext, ThreadMessage, TimeSlot};
use crate::services::oracle::{Message, TextOracle};

/// A generated reply: subject plus plain-text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedEmail {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    pub recipient_name: Option<String>,
    pub sender_name: Option<String>,
    pub meeting_purpose: Option<String>,
}

#[derive(Deserialize)]
struct EmailWire {
    subject: String,
    #[serde(rename = "emailContent")]
    email_content: String,
}

/// Generate the outbound reply for a decision context. The oracle writes the
/// email when it can; any failure lands on the deterministic template so a
/// reply is always produced.
pub async fn compose_reply(
    oracle: &dyn TextOracle,
    context: &EmailGenerationContext,
    options: &ComposeOptions,
    thread_history: &[ThreadMessage],
) -> ComposedEmail {
    tracing::info!(action = context.action().as_str(), "composing reply");

    let schema = json!({
        "type": "object",
        "properties": {
            "subject": { "type": "string", "description": "The email subject line" },
            "emailContent": { "type": "string", "description": "The email body content" },
        },
        "required": ["subject", "emailContent"],
        "additionalProperties": false,
    });

    let system = Message::system(system_prompt(context));
    let prompt = build_prompt(context, options, thread_history);

    let result = oracle
        .complete_structured(&prompt, schema, "email_response", &[system], 0.7, 1000)
        .await;

    match result.and_then(|v| Ok(serde_json::from_value::<EmailWire>(v)?)) {
        Ok(wire) => ComposedEmail {
            subject: wire.subject,
            body: wire.email_content,
        },
        Err(e) => {
            tracing::error!(error = %e, action = context.action().as_str(), "AI composition failed, using template");
            template_reply(context, options)
        }
    }
}

fn system_prompt(context: &EmailGenerationContext) -> String {
    let task = match context {
        EmailGenerationContext::Offer { .. } => {
            "offer meeting time slots. Clearly present the available time slots and ask the \
             recipient to choose or suggest alternatives"
        }
        EmailGenerationContext::Confirm { .. } => {
            "confirm a meeting time. Clearly confirm the scheduled meeting date and time and \
             offer flexibility for any changes if needed"
        }
        EmailGenerationContext::CounterOffer { .. } => {
            "propose alternative meeting times. Politely indicate that the proposed time doesn't \
             work, clearly present alternative time slots, and ask the recipient to choose or \
             suggest other alternatives"
        }
        EmailGenerationContext::CheckTime { .. } => {
            "check whether a proposed meeting time is available"
        }
    };

    format!(
        "You are a professional email assistant. Generate a polite and professional email to {task}.\n\n\
         Rules:\n\
         - Use appropriate greeting based on recipient name (formal if name provided, casual if not)\n\
         - Be professional and courteous\n\
         - Include appropriate closing and signature if sender name is provided\n\
         - Keep the tone warm but professional\n\
         - DO NOT use any special formatting like bold (**text**) or markdown\n\
         - If thread history is provided, reference the conversation context naturally\n\
         - Create a concise and professional subject line"
    )
}

fn build_prompt(
    context: &EmailGenerationContext,
    options: &ComposeOptions,
    thread_history: &[ThreadMessage],
) -> String {
    let recipient = options
        .recipient_name
        .as_deref()
        .map(|n| format!("Recipient Name: {n}"))
        .unwrap_or_else(|| "Recipient: (no specific name)".to_string());
    let sender = options
        .sender_name
        .as_deref()
        .map(|n| format!("Sender Name: {n}"))
        .unwrap_or_else(|| "Sender: (no specific name)".to_string());
    let purpose = options
        .meeting_purpose
        .as_deref()
        .map(|p| format!("Meeting Purpose: {p}"))
        .unwrap_or_else(|| "Meeting Purpose: (not specified)".to_string());

    let details = match context {
        EmailGenerationContext::Offer {
            available_time_slots,
        } => format!(
            "Action: Offer meeting time slots\n\nAvailable Time Slots:\n{}",
            format_slot_list(available_time_slots)
        ),
        EmailGenerationContext::Confirm { confirmed_time_slot } => format!(
            "Action: Confirm meeting time\n\nConfirmed Meeting Time:\nDate: {}\nTime: {} - {}",
            confirmed_time_slot.long_date(),
            confirmed_time_slot.start_string(),
            confirmed_time_slot.end_string()
        ),
        EmailGenerationContext::CounterOffer {
            proposed_time_slot,
            alternative_time_slots,
        } => format!(
            "Action: Counter-offer with alternative meeting times\n\n\
             Originally Proposed Time (that doesn't work):\nDate: {}\nTime: {} - {}\n\n\
             Alternative Time Slots:\n{}",
            proposed_time_slot.long_date(),
            proposed_time_slot.start_string(),
            proposed_time_slot.end_string(),
            format_slot_list(alternative_time_slots)
        ),
        EmailGenerationContext::CheckTime { time_suggestions } => match time_suggestions.first() {
            Some(slot) => format!(
                "Action: Check meeting time\n\nTime to Check:\nDate: {}\nTime: {} - {}",
                slot.long_date(),
                slot.start_string(),
                slot.end_string()
            ),
            None => "Action: Check meeting time\n\nTime to Check: (not provided)".to_string(),
        },
    };

    let mut prompt = format!(
        "Generate an email with subject and body for the following information:\n\n\
         {details}\n{recipient}\n{sender}\n{purpose}\n\n\
         Generate a complete email with:\n\
         1. A concise subject line\n\
         2. A professional email body"
    );

    if !thread_history.is_empty() {
        let history = thread_history
            .iter()
            .enumerate()
            .map(|(idx, msg)| {
                format!(
                    "[{}] From: {} | Time: {}\n{}",
                    idx + 1,
                    msg.from,
                    msg.timestamp,
                    msg.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        prompt = format!(
            "Thread History ({} messages):\n\n{history}\n\n---\n\n{prompt}",
            thread_history.len()
        );
    }

    prompt
}

fn format_slot_list(slots: &[TimeSlot]) -> String {
    slots
        .iter()
        .enumerate()
        .map(|(idx, slot)| {
            format!(
                "{}. {} at {} - {}",
                idx + 1,
                slot.long_date(),
                slot.start_string(),
                slot.end_string()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Deterministic plain-text fallback, one template per action.
fn template_reply(context: &EmailGenerationContext, options: &ComposeOptions) -> ComposedEmail {
    let greeting = options
        .recipient_name
        .as_deref()
        .map(|n| format!("Dear {n},"))
        .unwrap_or_else(|| "Hello,".to_string());
    let signature = options
        .sender_name
        .as_deref()
        .map(|n| format!("\n\nBest regards,\n{n}"))
        .unwrap_or_default();
    let purpose = options.meeting_purpose.as_deref();

    match context {
        EmailGenerationContext::Offer {
            available_time_slots,
        } => {
            let purpose_line = purpose
                .map(|p| format!("regarding {p}"))
                .unwrap_or_else(|| "to discuss further".to_string());
            let subject = purpose
                .map(|p| format!("Meeting Time Slots - {p}"))
                .unwrap_or_else(|| "Meeting Time Slots Available".to_string());
            ComposedEmail {
                subject,
                body: format!(
                    "{greeting}\n\n\
                     Thank you for your interest in scheduling a meeting {purpose_line}.\n\n\
                     I would like to propose the following time slots for our meeting:\n\n\
                     {}\n\n\
                     Please let me know which time works best for you, or feel free to suggest \
                     an alternative if none of these options are suitable.\n\n\
                     I look forward to hearing from you.{signature}",
                    format_slot_list(available_time_slots)
                ),
            }
        }
        EmailGenerationContext::Confirm { confirmed_time_slot } => {
            let purpose_line = purpose.map(|p| format!(" {p}")).unwrap_or_default();
            let subject = purpose
                .map(|p| format!("Meeting Confirmed - {p}"))
                .unwrap_or_else(|| "Meeting Confirmed".to_string());
            ComposedEmail {
                subject,
                body: format!(
                    "{greeting}\n\n\
                     Thank you for confirming the meeting{purpose_line}.\n\n\
                     I am pleased to confirm our meeting scheduled for:\n\n\
                     Date: {}\nTime: {} - {}\n\n\
                     I look forward to meeting with you. If you need to make any changes, \
                     please don't hesitate to let me know.{signature}",
                    confirmed_time_slot.long_date(),
                    confirmed_time_slot.start_string(),
                    confirmed_time_slot.end_string()
                ),
            }
        }
        EmailGenerationContext::CounterOffer {
            proposed_time_slot,
            alternative_time_slots,
        } => {
            let purpose_line = purpose.map(|p| format!(" regarding {p}")).unwrap_or_default();
            let subject = purpose
                .map(|p| format!("Alternative Meeting Times - {p}"))
                .unwrap_or_else(|| "Alternative Meeting Times".to_string());
            ComposedEmail {
                subject,
                body: format!(
                    "{greeting}\n\n\
                     Thank you for your message{purpose_line}.\n\n\
                     Unfortunately, I am not available on {} at {} - {}. However, I would be \
                     happy to meet at one of the following alternative times:\n\n\
                     {}\n\n\
                     Please let me know if any of these times work for you, or feel free to \
                     suggest another time that fits your schedule.\n\n\
                     I look forward to finding a suitable time for our meeting.{signature}",
                    proposed_time_slot.long_date(),
                    proposed_time_slot.start_string(),
                    proposed_time_slot.end_string(),
                    format_slot_list(alternative_time_slots)
                ),
            }
        }
        EmailGenerationContext::CheckTime { time_suggestions } => {
            let purpose_line = purpose.map(|p| format!(" regarding {p}")).unwrap_or_default();
            let subject = purpose
                .map(|p| format!("Check Meeting Time - {p}"))
                .unwrap_or_else(|| "Check Meeting Time".to_string());
            let when = time_suggestions
                .first()
                .map(|slot| {
                    format!(
                        "on {} at {} - {}",
                        slot.long_date(),
                        slot.start_string(),
                        slot.end_string()
                    )
                })
                .unwrap_or_else(|| "at the proposed time".to_string());
            ComposedEmail {
                subject,
                body: format!(
                    "{greeting}\n\n\
                     Thank you for your message{purpose_line}.\n\n\
                     I am checking if the meeting time is available {when}.\n\n\
                     I look forward to hearing from you.{signature}"
                ),
            }
        }
    }
}
