pub mod action;
pub mod message;
pub mod slot;
pub mod user;

pub use action::{ActionDecision, ConversationState, EmailAction, EmailGenerationContext};
pub use message::{Classification, InboundMessage, ThreadMessage, WebhookPayload};
pub use slot::{BusyInterval, SchedulingRequest, TimeSlot, WorkingHours};
pub use user::{Inbox, Preferences, User};
