pub mod auth;
pub mod captions;
pub mod properties;
pub mod rbac;
pub mod reminders;
pub mod rentals;
pub mod settings;
