// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- RBAC ---
        handlers::rbac::list_permissions,
        handlers::rbac::list_users,
        handlers::rbac::update_user,
        handlers::rbac::set_user_permissions,

        // --- Settings ---
        handlers::settings::get_settings,
        handlers::settings::update_settings,

        // --- Funil ---
        handlers::properties::list_stages,
        handlers::properties::create_property,
        handlers::properties::list_properties,
        handlers::properties::get_property,
        handlers::properties::update_property,
        handlers::properties::move_stage,

        // --- Lembretes ---
        handlers::reminders::list_reminders,
        handlers::reminders::get_property_reminder,
        handlers::reminders::set_custom_interval,
        handlers::reminders::disable_reminder,
        handlers::reminders::snooze_reminder,

        // --- Locação ---
        handlers::rentals::create_contract,
        handlers::rentals::list_contracts,
        handlers::rentals::get_contract,
        handlers::rentals::terminate_contract,
        handlers::rentals::renew_contract,
        handlers::rentals::list_payments,
        handlers::rentals::confirm_payment,
        handlers::rentals::cancel_payment,
        handlers::rentals::adjust_payment,
        handlers::rentals::payment_receipt,
        handlers::rentals::list_alerts,
        handlers::rentals::list_alert_configs,
        handlers::rentals::create_alert_config,
        handlers::rentals::update_alert_config,

        // --- Criativos ---
        handlers::captions::generate_captions,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- RBAC ---
            models::rbac::Permission,
            models::rbac::UserWithPermissions,
            models::rbac::UpdateUserPayload,
            models::rbac::SetPermissionsPayload,

            // --- Settings ---
            models::settings::AgencySettings,
            models::settings::UpdateSettingsRequest,

            // --- Funil ---
            models::property::PipelineKind,
            models::property::Stage,
            models::property::StageConfig,
            models::property::Property,
            handlers::properties::CreatePropertyPayload,
            handlers::properties::UpdatePropertyPayload,
            handlers::properties::MoveStagePayload,
            handlers::properties::MoveStageResponse,

            // --- Lembretes ---
            models::reminder::Reminder,
            models::reminder::ReminderStatus,
            models::reminder::ReminderWithProperty,
            models::reminder::ReminderView,
            handlers::reminders::HoursPayload,

            // --- Locação ---
            models::rental::ContractStatus,
            models::rental::PaymentStatus,
            models::rental::AlertSeverity,
            models::rental::RentalContract,
            models::rental::RentalPayment,
            models::rental::PaymentView,
            models::rental::AlertConfig,
            models::rental::RentalAlert,
            handlers::rentals::CreateContractPayload,
            handlers::rentals::ContractWithPayments,
            handlers::rentals::ConfirmPaymentPayload,
            handlers::rentals::AdjustPaymentPayload,
            handlers::rentals::CreateAlertConfigPayload,
            handlers::rentals::UpdateAlertConfigPayload,

            // --- Criativos ---
            models::caption::SocialPlatform,
            models::caption::CaptionTone,
            models::caption::Caption,
            handlers::captions::GenerateCaptionsPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "RBAC", description = "Usuários e Permissões"),
        (name = "Settings", description = "Dados da Imobiliária"),
        (name = "Pipeline", description = "Funil de Venda e Locação"),
        (name = "Reminders", description = "Lembretes de Acompanhamento"),
        (name = "Rentals", description = "Contratos, Pagamentos e Alertas"),
        (name = "Creatives", description = "Legendas para Redes Sociais")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
