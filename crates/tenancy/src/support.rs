//! Support tickets opened from the block screen. Reachable while the
//! storefront itself is blocked.

use serde::Deserialize;
use std::sync::Arc;
use storefront_core::types::{SupportTicket, Tenant, TicketMetadata, TicketStatus};
use storefront_core::ValidationError;
use storefront_datastore::{DatastoreError, SupportDesk};
use thiserror::Error;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

pub const BLOCK_SCREEN_ORIGIN: &str = "store_block";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SupportRequest {
    pub contact_name: String,
    pub contact_email: String,
    pub message: String,
}

impl SupportRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.contact_name.trim().is_empty() {
            return Err(ValidationError::MissingField("contact_name"));
        }
        let email = self.contact_email.trim();
        match email.split_once('@') {
            Some((user, domain)) if !user.is_empty() && domain.contains('.') => {}
            _ => return Err(ValidationError::InvalidEmail(email.to_string())),
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::MissingField("message"));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum TicketError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("could not send the support request: {0}")]
    Datastore(#[from] DatastoreError),
}

pub struct SupportTicketService {
    desk: Arc<dyn SupportDesk>,
}

impl SupportTicketService {
    pub fn new(desk: Arc<dyn SupportDesk>) -> Self {
        Self { desk }
    }

    /// Build the ticket for `tenant` without sending it.
    pub fn ticket_for(tenant: &Tenant, request: &SupportRequest) -> SupportTicket {
        SupportTicket {
            tenant_id: tenant.id,
            origin: BLOCK_SCREEN_ORIGIN.to_string(),
            subject: format!("Bloqueio de Loja - {}", tenant.display_name),
            message: request.message.trim().to_string(),
            contact_name: request.contact_name.trim().to_string(),
            contact_email: request.contact_email.trim().to_string(),
            status: TicketStatus::Open,
            metadata: TicketMetadata {
                plan: tenant.plan_label().to_string(),
                status: tenant.status,
            },
        }
    }

    pub async fn submit(&self, tenant: &Tenant, request: &SupportRequest) -> Result<Uuid, TicketError> {
        request.validate()?;

        let ticket = Self::ticket_for(tenant, request);
        match self.desk.create_ticket(&ticket).await {
            Ok(id) => {
                info!(tenant_id = %tenant.id, ticket_id = %id, "Support ticket opened");
                metrics::counter!("tenancy.support.tickets").increment(1);
                Ok(id)
            }
            Err(e) => {
                error!(tenant_id = %tenant.id, error = %e, "Support ticket submission failed");
                Err(e.into())
            }
        }
    }
}
