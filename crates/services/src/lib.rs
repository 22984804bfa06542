mod database;
mod email_notifier;
mod event_sink;
mod notifier;

pub use database::*;
pub use email_notifier::*;
pub use event_sink::*;
pub use notifier::*;
