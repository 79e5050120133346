//! OpenAPI specification and Swagger UI configuration.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = "Multi-tenant pharmacy storefront.\n\nEvery `/v1` route is scoped to one store, chosen by `?tenant=<slug>`, the `/s/<slug>/v1` prefix, or the request host.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Operations", description = "Health, readiness, and liveness probes"),
        (name = "Storefront", description = "Store identity, availability, support, and billing links; never blocked"),
        (name = "Catalog", description = "Products, daily offers, and store settings"),
        (name = "Cart", description = "Session cart"),
        (name = "Account", description = "Login by phone, profile, orders, cashback, favorites"),
        (name = "Checkout", description = "Pricing quotes and order submission"),
        (name = "Billing", description = "Payment provider webhooks"),
    ),
    paths(
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
        // Storefront
        crate::storefront_rest::handle_storefront,
        crate::storefront_rest::handle_support_ticket,
        crate::storefront_rest::handle_checkout_link,
        crate::storefront_rest::handle_webhook,
        // Catalog
        crate::catalog_rest::handle_products,
        crate::catalog_rest::handle_product,
        crate::catalog_rest::handle_offers,
        crate::catalog_rest::handle_settings,
        // Cart
        crate::cart_rest::handle_get_cart,
        crate::cart_rest::handle_add_item,
        crate::cart_rest::handle_update_item,
        crate::cart_rest::handle_remove_item,
        crate::cart_rest::handle_clear_cart,
        // Account
        crate::account_rest::handle_login,
        crate::account_rest::handle_logout,
        crate::account_rest::handle_update_profile,
        crate::account_rest::handle_orders,
        crate::account_rest::handle_cashback,
        crate::account_rest::handle_favorites,
        crate::account_rest::handle_toggle_favorite,
        // Checkout
        crate::checkout_rest::handle_quote,
        crate::checkout_rest::handle_submit_order,
    ),
    components(schemas(
        // Shared
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
        crate::scope::Availability,
        crate::scope::AvailabilityView,
        crate::scope::BlockedResponse,
        // Storefront
        crate::storefront_rest::StoreIdentity,
        crate::storefront_rest::StorefrontView,
        crate::storefront_rest::TicketCreated,
        crate::storefront_rest::CheckoutLink,
        crate::storefront_rest::WebhookAck,
        storefront_tenancy::AccessDecision,
        storefront_tenancy::SlugSource,
        storefront_tenancy::SupportRequest,
        storefront_licensing::LicenseStatus,
        storefront_licensing::LicenseState,
        storefront_licensing::LicenseFeatures,
        // Catalog
        storefront_core::types::Product,
        storefront_core::types::DailyOffer,
        storefront_core::settings::StoreSettings,
        storefront_core::settings::PharmacyInfo,
        storefront_core::settings::Appearance,
        storefront_core::settings::DeliveryConfig,
        storefront_core::settings::DeliveryMethods,
        storefront_core::settings::FeeType,
        storefront_core::settings::PaymentConfig,
        storefront_core::settings::VipConfig,
        storefront_core::settings::StorefrontContent,
        // Cart
        crate::cart_rest::CartView,
        crate::cart_rest::AddItemRequest,
        crate::cart_rest::UpdateQuantityRequest,
        storefront_checkout::CartItem,
        // Account
        crate::account_rest::LoginRequest,
        crate::account_rest::FavoriteToggled,
        storefront_core::types::Customer,
        storefront_core::types::ProfileUpdate,
        storefront_core::types::OrderSummary,
        storefront_core::types::OrderLine,
        storefront_core::types::CashbackWallet,
        storefront_core::types::CashbackTransaction,
        storefront_core::types::CashbackTransactionKind,
        storefront_checkout::WalletView,
        // Checkout
        crate::checkout_rest::QuoteRequest,
        storefront_core::types::DeliveryMethod,
        storefront_core::types::PaymentMethod,
        storefront_checkout::CheckoutRequest,
        storefront_checkout::OrderReceipt,
        storefront_checkout::PricingBreakdown,
    ))
)]
pub struct ApiDoc;
