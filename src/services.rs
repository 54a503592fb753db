pub mod alert_service;
pub mod auth;
pub mod caption_service;
pub mod document_service;
pub mod property_service;
pub mod rbac_service;
pub mod reminder_service;
pub mod rental_service;
