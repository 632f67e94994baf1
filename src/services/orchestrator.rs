use chrono::Local;

use crate::errors::AppError;
use crate::models::{
    ConversationState, EmailAction, EmailGenerationContext, InboundMessage, SchedulingRequest,
    TimeSlot, User,
};
use crate::services::composer::{self, ComposeOptions};
use crate::services::invite::{self, InviteDetails};
use crate::services::mail::OutboundReply;
use crate::services::scheduler::{self, SlotVerdict};
use crate::services::{classifier, selector};
use crate::state::AppState;

/// Drive one inbound email through the full pipeline: classify, decide,
/// check/compute availability, reply. Upstream failures degrade along the
/// defined fallbacks; only identity lookups, delivery, and selector contract
/// violations surface as errors.
pub async fn handle_inbound_message(
    state: &AppState,
    message: &InboundMessage,
) -> Result<(), AppError> {
    let inbox = state
        .directory
        .get_inbox(&message.inbox_id)
        .await
        .map_err(AppError::Directory)?
        .ok_or_else(|| AppError::UnknownInbox(message.inbox_id.clone()))?;
    let user = state
        .directory
        .get_user_by_id(&inbox.user)
        .await
        .map_err(AppError::Directory)?
        .ok_or_else(|| AppError::UnknownUser(inbox.user.clone()))?;

    let classification =
        classifier::classify_email(state.oracle.as_ref(), &message.subject, &message.text).await;

    if classification.is_spam || !classification.is_reservation {
        tracing::info!(
            message_id = %message.message_id,
            is_spam = classification.is_spam,
            is_reservation = classification.is_reservation,
            "not an actionable reservation email, ignoring"
        );
        return Ok(());
    }

    // Thread history is evidence, not a requirement; a fetch failure just
    // means deciding from the current message alone.
    let thread_history = match &message.thread_id {
        Some(thread_id) => match state.mail.fetch_thread(thread_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(error = %e, thread_id = %thread_id, "failed to fetch thread history");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let request = SchedulingRequest::new(state.config.default_meeting_minutes, user.working_hours());

    let decision = selector::select_action(
        state.oracle.as_ref(),
        &message.subject,
        &message.text,
        ConversationState::Initial,
        &thread_history,
    )
    .await;

    let context = match decision.action {
        EmailAction::Offer => offer_context(state, &request, &user).await,
        // COUNTEROFFER is not reachable from the initial state; treat it as
        // an offer rather than dropping the message.
        EmailAction::CounterOffer => {
            tracing::warn!("COUNTEROFFER selected from initial state, treating as OFFER");
            offer_context(state, &request, &user).await
        }
        EmailAction::Confirm => match decision.time_suggestions.into_iter().next() {
            Some(slot) => EmailGenerationContext::Confirm {
                confirmed_time_slot: slot,
            },
            None => {
                tracing::warn!("CONFIRM without an extracted time, degrading to OFFER");
                offer_context(state, &request, &user).await
            }
        },
        EmailAction::CheckTime => match decision.time_suggestions.first().cloned() {
            Some(slot) => {
                check_time_context(state, message, &thread_history, &request, &user, slot).await?
            }
            None => {
                tracing::warn!("CHECK_TIME without an extracted time, degrading to OFFER");
                offer_context(state, &request, &user).await
            }
        },
    };

    send_reply(state, message, &inbox.name, &user, context, &thread_history).await
}

async fn offer_context(
    state: &AppState,
    request: &SchedulingRequest,
    user: &User,
) -> EmailGenerationContext {
    let slots = scheduler::find_available_slots(
        state.calendar.as_ref(),
        state.oracle.as_ref(),
        request,
        &user.id,
    )
    .await;
    EmailGenerationContext::Offer {
        available_time_slots: slots,
    }
}

/// The AFTER_CHECK_TIME leg: verify the proposed slot, feed the verdict back
/// into the selector as added evidence, then branch on the second decision.
async fn check_time_context(
    state: &AppState,
    message: &InboundMessage,
    thread_history: &[crate::models::ThreadMessage],
    request: &SchedulingRequest,
    user: &User,
    proposed: TimeSlot,
) -> Result<EmailGenerationContext, AppError> {
    let verdict = scheduler::is_slot_available(
        state.calendar.as_ref(),
        state.oracle.as_ref(),
        &proposed,
        &user.id,
        &request.working_hours,
        Local::now().naive_local(),
    )
    .await;

    let verdict_line = match &verdict {
        SlotVerdict::Available => "the proposed time is available".to_string(),
        SlotVerdict::Unavailable { reason } => {
            format!("the proposed time is NOT available ({reason})")
        }
        SlotVerdict::CannotVerify { reason } => {
            format!("availability could not be verified ({reason})")
        }
    };

    let augmented = format!(
        "{}\n\n[Availability check] {} {} - {}: {}",
        message.text,
        proposed.date_string(),
        proposed.start_string(),
        proposed.end_string(),
        verdict_line
    );

    let decision = selector::select_action(
        state.oracle.as_ref(),
        &message.subject,
        &augmented,
        ConversationState::AfterCheckTime,
        thread_history,
    )
    .await;

    match decision.action {
        EmailAction::Confirm => Ok(EmailGenerationContext::Confirm {
            confirmed_time_slot: proposed,
        }),
        EmailAction::CounterOffer => {
            let alternatives = scheduler::find_available_slots(
                state.calendar.as_ref(),
                state.oracle.as_ref(),
                request,
                &user.id,
            )
            .await;
            Ok(EmailGenerationContext::CounterOffer {
                proposed_time_slot: proposed,
                alternative_time_slots: alternatives,
            })
        }
        // The selector's own failure fallback. Offering something beats
        // silence, so answer with available slots instead of erroring.
        EmailAction::Offer => {
            tracing::warn!("selector fell back to OFFER after availability check");
            Ok(offer_context(state, request, user).await)
        }
        other => Err(AppError::ContractViolation(format!(
            "action {} is not valid after a time check",
            other.as_str()
        ))),
    }
}

async fn send_reply(
    state: &AppState,
    message: &InboundMessage,
    inbox_name: &str,
    user: &User,
    context: EmailGenerationContext,
    thread_history: &[crate::models::ThreadMessage],
) -> Result<(), AppError> {
    let (recipient_name, recipient_email) = split_address(&message.from);

    let options = ComposeOptions {
        recipient_name,
        sender_name: Some(inbox_name.to_string()),
        meeting_purpose: Some(message.subject.clone()),
    };

    let email =
        composer::compose_reply(state.oracle.as_ref(), &context, &options, thread_history).await;

    let ics_attachment = match &context {
        EmailGenerationContext::Confirm { confirmed_time_slot } => {
            Some(invite::generate_ics(&InviteDetails {
                slot: confirmed_time_slot,
                summary: &message.subject,
                description: "Confirmed via scheduling assistant",
                organizer_name: &user.name,
                organizer_email: &user.email,
                attendee_email: &recipient_email,
            }))
        }
        _ => None,
    };

    let reply = OutboundReply {
        text: email.body,
        subject: Some(email.subject),
        ics_attachment,
        cc: Vec::new(),
    };

    state
        .mail
        .reply(&message.inbox_id, &message.message_id, &reply)
        .await
        .map_err(AppError::Mail)?;

    tracing::info!(
        message_id = %message.message_id,
        action = context.action().as_str(),
        "reply sent"
    );

    Ok(())
}

/// Split `Alice Example <alice@example.com>` into display name and address.
fn split_address(from: &str) -> (Option<String>, String) {
    let trimmed = from.trim();
    if let (Some(open), Some(close)) = (trimmed.find('<'), trimmed.rfind('>')) {
        if open < close {
            let name = trimmed[..open].trim().trim_matches('"');
            let email = trimmed[open + 1..close].trim();
            let name = (!name.is_empty()).then(|| name.to_string());
            return (name, email.to_string());
        }
    }
    (None, trimmed.to_string())
}
