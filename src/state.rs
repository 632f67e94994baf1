use crate::config::AppConfig;
use crate::services::calendar::CalendarSource;
use crate::services::directory::Directory;
use crate::services::mail::MailProvider;
use crate::services::oracle::TextOracle;

/// Process-wide dependencies, built once at startup. All collaborators are
/// injected as trait objects so the engine is testable without live services.
pub struct AppState {
    pub config: AppConfig,
    pub oracle: Box<dyn TextOracle>,
    pub calendar: Box<dyn CalendarSource>,
    pub mail: Box<dyn MailProvider>,
    pub directory: Box<dyn Directory>,
}
