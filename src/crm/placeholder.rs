use super::{CrmBackend, CrmResult, Customer, CustomerStatus, NewTicket, Ticket};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

pub const TICKET_ID_PREFIX: &str = "TICKET-";

/// Stand-in backend returning fixed data. No network calls are made.
#[derive(Debug, Default)]
pub struct PlaceholderCrm {
    last_ticket_stamp: AtomicI64,
}

impl PlaceholderCrm {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Millisecond timestamp, bumped past the previous one so two tickets
    /// created within the same millisecond still get distinct ids.
    fn next_ticket_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut previous = self.last_ticket_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(previous + 1);
            match self.last_ticket_stamp.compare_exchange_weak(
                previous,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => previous = actual,
            }
        }
    }
}

#[async_trait]
impl CrmBackend for PlaceholderCrm {
    #[inline]
    async fn fetch_customer(
        &self,
        customer_id: &str,
        fields: Option<&[String]>,
    ) -> CrmResult<Customer> {
        debug!(
            "Placeholder customer lookup: id='{}', fields={:?}",
            customer_id, fields
        );

        Ok(Customer {
            id: customer_id.to_string(),
            name: "Example Customer".to_string(),
            email: "customer@example.com".to_string(),
            status: CustomerStatus::Active,
        })
    }

    #[inline]
    async fn create_ticket(&self, ticket: NewTicket) -> CrmResult<Ticket> {
        let id = format!("{}{}", TICKET_ID_PREFIX, self.next_ticket_stamp());
        debug!("Placeholder ticket created: {}", id);
        Ok(Ticket::open(id, ticket))
    }

    #[inline]
    async fn fetch_all_customers(&self) -> CrmResult<Vec<Customer>> {
        Ok(Vec::new())
    }

    #[inline]
    async fn fetch_open_tickets(&self) -> CrmResult<Vec<Ticket>> {
        Ok(Vec::new())
    }
}
