pub mod auth;
pub mod caption;
pub mod property;
pub mod rbac;
pub mod reminder;
pub mod rental;
pub mod settings;
