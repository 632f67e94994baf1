pub mod calendar;
pub mod classifier;
pub mod composer;
pub mod directory;
pub mod intervals;
pub mod invite;
pub mod mail;
pub mod oracle;
pub mod orchestrator;
pub mod scheduler;
pub mod selector;
