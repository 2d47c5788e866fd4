#![allow(dead_code)]

use agricart::application::cart_service::CartService;
use agricart::application::checkout::CheckoutServices;
use agricart::domain::cart::LineItem;
use agricart::domain::checkout::CustomerInfo;
use agricart::domain::ports::CartApi;
use agricart::domain::product::ProductRef;
use agricart::domain::session::{Account, Role, SessionContext};
use agricart::error::{ApiError, ApiResult};
use agricart::infrastructure::in_memory::{
    InMemoryCartApi, InMemoryCatalog, InMemoryLocalStore, InMemoryOrderService,
    SimulatedPaymentGateway, SimulatedUpiVerifier,
};
use agricart::utils::retry::{CallPolicy, RetryPolicy};
use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

pub fn catalog() -> Arc<InMemoryCatalog> {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert_product(ProductRef::standard("rice"), "Rice", dec!(80), 50);
    catalog.insert_product(ProductRef::standard("wheat"), "Wheat", dec!(40), 50);
    catalog.insert_product(ProductRef::standard("tractor-tyre"), "Tractor tyre", dec!(5000), 2);
    catalog.insert_product(ProductRef::waste("husk"), "Rice husk", dec!(5), 500);
    catalog
}

/// Short delays so retry paths finish quickly under test.
pub fn fast_calls() -> CallPolicy {
    CallPolicy {
        retry: RetryPolicy {
            max_attempts: 2,
            delay_ms: 1,
        },
        timeout: Duration::from_secs(1),
    }
}

pub fn account(credential: &str) -> Account {
    Account {
        credential: credential.into(),
        account_id: format!("acc-{credential}"),
        role: Role::Buyer,
        display_name: "Asha".into(),
        email: "asha@example.com".into(),
    }
}

pub fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Asha".into(),
        email: "asha@example.com".into(),
        address: "12 Mill Road".into(),
        city: "Pune".into(),
        state: "Maharashtra".into(),
        postal_code: "411001".into(),
    }
}

/// Every collaborator of the engine, backed by in-memory fakes.
pub struct Harness {
    pub catalog: Arc<InMemoryCatalog>,
    pub local: Arc<InMemoryLocalStore>,
    pub api: Arc<InMemoryCartApi>,
    pub gateway: Arc<SimulatedPaymentGateway>,
    pub upi: Arc<SimulatedUpiVerifier>,
    pub orders: Arc<InMemoryOrderService>,
}

impl Harness {
    pub fn new() -> Self {
        let catalog = catalog();
        Self {
            local: Arc::new(InMemoryLocalStore::new()),
            api: Arc::new(InMemoryCartApi::new(catalog.clone())),
            gateway: Arc::new(SimulatedPaymentGateway::new()),
            upi: Arc::new(SimulatedUpiVerifier::new()),
            orders: Arc::new(InMemoryOrderService::new()),
            catalog,
        }
    }

    pub fn cart_service(&self, session: SessionContext) -> CartService {
        CartService::new(
            session,
            self.local.clone(),
            self.api.clone(),
            self.catalog.clone(),
            fast_calls(),
        )
    }

    pub fn checkout_services(&self) -> CheckoutServices {
        CheckoutServices {
            catalog: self.catalog.clone(),
            gateway: self.gateway.clone(),
            upi: self.upi.clone(),
            orders: self.orders.clone(),
            calls: fast_calls(),
            revalidate: true,
        }
    }
}

/// Cart API whose first `update` parks until released, then fails with a
/// network error, like a request that hangs and drops. Every later `update`
/// fails straight away.
pub struct GatedCartApi {
    pub inner: Arc<InMemoryCartApi>,
    pub arrived: Arc<Notify>,
    pub release: Arc<Notify>,
    gated: AtomicBool,
}

impl GatedCartApi {
    pub fn new(inner: Arc<InMemoryCartApi>) -> Self {
        Self {
            inner,
            arrived: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
            gated: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl CartApi for GatedCartApi {
    async fn fetch(&self, credential: &str) -> ApiResult<Vec<LineItem>> {
        self.inner.fetch(credential).await
    }

    async fn add(&self, credential: &str, product: &ProductRef, quantity: u32) -> ApiResult<()> {
        self.inner.add(credential, product, quantity).await
    }

    async fn update(
        &self,
        _credential: &str,
        _product: &ProductRef,
        _quantity: u32,
    ) -> ApiResult<()> {
        if self.gated.swap(false, Ordering::SeqCst) {
            self.arrived.notify_one();
            self.release.notified().await;
        }
        Err(ApiError::Network("connection reset".to_string()))
    }

    async fn remove(&self, credential: &str, product: &ProductRef) -> ApiResult<()> {
        self.inner.remove(credential, product).await
    }

    async fn clear(&self, credential: &str) -> ApiResult<()> {
        self.inner.clear(credential).await
    }
}
