// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::list_users,
        handlers::auth::create_user,

        // --- Clients ---
        handlers::clients::list_summaries,
        handlers::clients::get_summary,
        handlers::clients::list_clients,
        handlers::clients::create_client,
        handlers::clients::update_client,
        handlers::clients::list_bans,
        handlers::clients::create_ban,
        handlers::clients::list_subscribers,
        handlers::clients::create_subscriber,
        handlers::clients::update_subscriber,

        // --- Vendors ---
        handlers::clients::list_vendors,
        handlers::clients::create_vendor,

        // --- Catalog ---
        handlers::catalog::list_categories,
        handlers::catalog::create_category,
        handlers::catalog::update_category,
        handlers::catalog::list_products,
        handlers::catalog::create_product,
        handlers::catalog::update_product,

        // --- Commissions ---
        handlers::commissions::resolve_commission,
        handlers::commissions::list_tiers,
        handlers::commissions::create_tier,
        handlers::commissions::update_tier,
        handlers::commissions::delete_tier,
        handlers::commissions::tier_coverage,

        // --- Prospects ---
        handlers::prospects::list_prospects,
        handlers::prospects::create_prospect,
        handlers::prospects::get_prospect,
        handlers::prospects::update_prospect,
        handlers::prospects::delete_prospect,
        handlers::prospects::complete_prospect,
        handlers::prospects::stop_prospect,
        handlers::prospects::list_prospect_events,

        // --- Imports ---
        handlers::imports::import_rows,
        handlers::imports::simulate_import,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::UserAuth,
            models::auth::Principal,
            models::auth::LoginPayload,
            models::auth::CreateUserPayload,
            models::auth::AuthResponse,

            // --- Clients ---
            models::client::Vendor,
            models::client::Client,
            models::client::ClientContact,
            models::client::Ban,
            models::client::Subscriber,
            models::client::ExpiryStatus,
            models::client::ClientSummary,

            // --- Catalog / Commissions ---
            models::product::TierBasis,
            models::product::Category,
            models::product::Product,
            models::product::CommissionTier,
            models::product::CommissionSource,
            models::product::CommissionResolution,
            models::product::TierOverlap,
            models::product::TierGap,
            models::product::TierCoverage,
            models::product::TierInput,

            // --- Prospects ---
            models::prospect::ProspectState,
            models::prospect::FollowUpProspect,
            models::prospect::ProspectView,
            models::prospect::ProspectEventKind,
            models::prospect::ProspectEvent,
            models::prospect::ProspectPayload,
            models::prospect::UpdateProspectPayload,
            models::prospect::CompletionRequest,

            // --- Imports ---
            models::import::ClientCells,
            models::import::BanCells,
            models::import::SubscriberCells,
            models::import::ImportRow,
            models::import::ImportPayload,
            models::import::RowError,
            models::import::ImportReport,
            models::import::KeyStatus,
            models::import::RowDetail,
            models::import::SimulationReport,

            // --- Payloads ---
            handlers::clients::CreateVendorPayload,
            handlers::clients::CreateClientPayload,
            handlers::clients::UpdateClientPayload,
            handlers::clients::CreateBanPayload,
            handlers::clients::CreateSubscriberPayload,
            handlers::clients::UpdateSubscriberPayload,
            handlers::catalog::CreateCategoryPayload,
            handlers::catalog::UpdateCategoryPayload,
            handlers::catalog::CreateProductPayload,
            handlers::catalog::UpdateProductPayload,
            handlers::commissions::ResolveCommissionPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação"),
        (name = "Users", description = "Usuários e papéis"),
        (name = "Clients", description = "Carteira: clientes, BANs, assinantes e resumo de vencimentos"),
        (name = "Vendors", description = "Vendedores"),
        (name = "Catalog", description = "Categorias e produtos"),
        (name = "Commissions", description = "Faixas de comissão e resolução"),
        (name = "Prospects", description = "Acompanhamento de prospectos"),
        (name = "Imports", description = "Importação de planilhas")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented_with_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/clients/summaries"));
        assert!(doc.paths.paths.contains_key("/api/products/{id}/tiers/coverage"));
        assert!(doc.paths.paths.contains_key("/api/prospects/{id}/events"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
