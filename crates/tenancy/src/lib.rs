//! Tenant scoping for every storefront request: which tenant a request
//! belongs to, and whether that tenant's storefront may be served.

#![warn(clippy::unwrap_used)]

pub mod guard;
pub mod resolver;
pub mod support;

pub use guard::{billing_checkout_link, AccessDecision, AccessGuard};
pub use resolver::{
    AccessPredicate, RequestContext, ResolutionError, ResolvedTenant, SlugChain, SlugSource,
    SlugStrategy, TenantResolver,
};
pub use support::{SupportRequest, SupportTicketService, TicketError};
