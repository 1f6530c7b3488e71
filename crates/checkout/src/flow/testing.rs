//! Test doubles and fixtures shared by the flow tests.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rust_decimal::Decimal;
use tokio::sync::{Notify, Semaphore};
use uuid::Uuid;

use haberdash_core::{
    CheckoutSessionId, ProductId, ProductStatus, VariantId,
};

use crate::cart::{Cart, CartLine};
use crate::config::CheckoutPolicy;
use crate::flow::form::CheckoutDraft;
use crate::platform::types::{
    ProductSummary, SessionCreated, SessionRequest, VariantRecord,
};
use crate::platform::{PlatformApi, PlatformError};

/// In-memory platform double with call counting and an optional gate
/// that parks session creation until the test releases it.
pub struct MockPlatform {
    variants: HashMap<VariantId, VariantRecord>,
    inventory: HashMap<VariantId, i64>,
    variant_lookups: AtomicUsize,
    session_calls: AtomicUsize,
    fail_sessions: bool,
    gate: Option<SessionGate>,
    paid: Mutex<Vec<CheckoutSessionId>>,
}

struct SessionGate {
    entered: Notify,
    release: Semaphore,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            variants: HashMap::new(),
            inventory: HashMap::new(),
            variant_lookups: AtomicUsize::new(0),
            session_calls: AtomicUsize::new(0),
            fail_sessions: false,
            gate: None,
            paid: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_variant(mut self, record: VariantRecord) -> Self {
        self.variants.insert(record.id, record);
        self
    }

    #[must_use]
    pub fn with_inventory(mut self, id: VariantId, available: i64) -> Self {
        self.inventory.insert(id, available);
        self
    }

    /// Every session-creation call fails with a retryable platform error.
    #[must_use]
    pub fn with_failing_sessions(mut self) -> Self {
        self.fail_sessions = true;
        self
    }

    /// Session creation parks until [`Self::release_sessions`] is called.
    #[must_use]
    pub fn with_gated_sessions(mut self) -> Self {
        self.gate = Some(SessionGate {
            entered: Notify::new(),
            release: Semaphore::new(0),
        });
        self
    }

    pub async fn wait_for_session_entry(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notified().await;
        }
    }

    pub fn release_sessions(&self) {
        if let Some(gate) = &self.gate {
            gate.release.add_permits(usize::from(u8::MAX));
        }
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    pub fn variant_lookups(&self) -> usize {
        self.variant_lookups.load(Ordering::SeqCst)
    }

    pub fn paid_sessions(&self) -> Vec<CheckoutSessionId> {
        self.paid.lock().unwrap().clone()
    }
}

impl PlatformApi for MockPlatform {
    async fn variant(&self, id: VariantId) -> Result<VariantRecord, PlatformError> {
        self.variant_lookups.fetch_add(1, Ordering::SeqCst);
        self.variants
            .get(&id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("variant {id}")))
    }

    async fn available_inventory(&self, id: VariantId) -> Result<i64, PlatformError> {
        self.inventory
            .get(&id)
            .copied()
            .ok_or_else(|| PlatformError::NotFound(format!("inventory {id}")))
    }

    async fn create_checkout_session(
        &self,
        _request: &SessionRequest,
    ) -> Result<SessionCreated, PlatformError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.acquire().await.unwrap().forget();
        }

        if self.fail_sessions {
            return Err(PlatformError::Status {
                status: 502,
                message: "upstream unavailable".to_string(),
            });
        }

        Ok(SessionCreated {
            session_id: CheckoutSessionId::new("cs_test_123"),
            url: "https://pay.example.com/session".to_string(),
        })
    }

    async fn mark_order_paid(&self, session_id: &CheckoutSessionId) -> Result<(), PlatformError> {
        self.paid.lock().unwrap().push(session_id.clone());
        Ok(())
    }
}

/// A variant record for an active product at the given live price.
pub fn variant_record(id: VariantId, price: Decimal) -> VariantRecord {
    VariantRecord {
        id,
        price,
        processor_price_id: Some("price_1OxYzA".to_string()),
        product: ProductSummary {
            id: ProductId::new(Uuid::new_v4()),
            name: "Midnight Navy Two-Piece Suit".to_string(),
            status: ProductStatus::Active,
        },
    }
}

/// A cart holding one variant line at the given remembered price.
pub fn cart_with_line(quantity: u32, remembered_price: Decimal) -> (Cart, VariantId) {
    let variant_id = VariantId::new(Uuid::new_v4());
    let mut cart = Cart::new();
    cart.add(
        CartLine::new(
            ProductId::new(Uuid::new_v4()),
            Some(variant_id),
            quantity,
            remembered_price,
            BTreeMap::new(),
        )
        .unwrap(),
    );
    (cart, variant_id)
}

/// The default policy: 30 minute TTL, 5% drift tolerance.
pub fn policy() -> CheckoutPolicy {
    CheckoutPolicy::default()
}

/// A draft that passes validation.
pub fn valid_draft() -> CheckoutDraft {
    CheckoutDraft {
        email: "shopper@example.com".to_string(),
        phone: String::new(),
        first_name: "Avery".to_string(),
        last_name: "Quinn".to_string(),
        address_line1: "12 Canal St".to_string(),
        address_line2: String::new(),
        city: "Kalamazoo".to_string(),
        state: "MI".to_string(),
        postal_code: "49007".to_string(),
        country: "US".to_string(),
    }
}
