//! CRM Backend
//!
//! The seam between the MCP handlers and the enterprise CRM. Handlers only
//! talk to [`CrmBackend`], so a real integration can replace
//! [`PlaceholderCrm`] without touching the protocol layer.

pub mod models;
pub mod placeholder;


use async_trait::async_trait;
use thiserror::Error;

pub use models::{Customer, CustomerStatus, NewTicket, Priority, Ticket, TicketStatus};
pub use placeholder::PlaceholderCrm;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("CRM unavailable: {0}")]
    Unavailable(String),

    #[error("CRM rejected request: {0}")]
    Rejected(String),
}

pub type CrmResult<T> = Result<T, CrmError>;

/// Operations the MCP handlers need from the CRM
#[async_trait]
pub trait CrmBackend: Send + Sync {
    /// Look up a single customer. `fields` restricts the returned attributes
    /// where the backend supports it; `None` means everything.
    async fn fetch_customer(
        &self,
        customer_id: &str,
        fields: Option<&[String]>,
    ) -> CrmResult<Customer>;

    async fn create_ticket(&self, ticket: NewTicket) -> CrmResult<Ticket>;

    async fn fetch_all_customers(&self) -> CrmResult<Vec<Customer>>;

    async fn fetch_open_tickets(&self) -> CrmResult<Vec<Ticket>>;
}
