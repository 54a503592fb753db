pub mod user_repo;
pub use user_repo::UserRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod property_repo;
pub use property_repo::PropertyRepository;
pub mod reminder_repo;
pub use reminder_repo::PgReminderStore;
pub mod rental_repo;
pub use rental_repo::RentalRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
