use super::cart::LineItem;
use super::checkout::{CardElement, CustomerInfo};
use super::money::Money;
use super::order::{OrderLine, OrderRequest, PaymentIntent};
use super::product::{ProductRef, ProductSnapshot};
use super::session::Account;
use crate::error::{ApiResult, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Device-local persistent key-value storage.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// The authenticated, server-side cart resource.
#[async_trait]
pub trait CartApi: Send + Sync {
    async fn fetch(&self, credential: &str) -> ApiResult<Vec<LineItem>>;
    /// Adds `quantity` to the server row, creating it if needed.
    async fn add(&self, credential: &str, product: &ProductRef, quantity: u32) -> ApiResult<()>;
    async fn update(
        &self,
        credential: &str,
        product: &ProductRef,
        quantity: u32,
    ) -> ApiResult<()>;
    async fn remove(&self, credential: &str, product: &ProductRef) -> ApiResult<()>;
    async fn clear(&self, credential: &str) -> ApiResult<()>;
}

/// Standard and waste product catalogs.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn product(&self, product: &ProductRef) -> ApiResult<Option<ProductSnapshot>>;
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> ApiResult<Account>;
    async fn logout(&self, credential: &str) -> ApiResult<()>;
}

/// Hosted card payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        items: &[OrderLine],
        customer: &CustomerInfo,
    ) -> ApiResult<PaymentIntent>;
    /// Returns the provider's payment id. Provider failures come back as
    /// `ApiError::Payment` carrying the provider's message.
    async fn confirm(
        &self,
        intent: &PaymentIntent,
        element: &CardElement,
        billing: &CustomerInfo,
    ) -> ApiResult<String>;
}

#[async_trait]
pub trait UpiVerifier: Send + Sync {
    async fn verify(&self, upi_id: &str, transaction_id: &str, amount: Money) -> ApiResult<bool>;
}

#[async_trait]
pub trait OrderService: Send + Sync {
    /// Returns the new order id.
    async fn create(&self, credential: Option<&str>, order: &OrderRequest) -> ApiResult<String>;
}

/// Pub/sub channel for account notifications.
#[async_trait]
pub trait NotificationHub: Send + Sync {
    async fn join(&self, account_id: &str) -> ApiResult<()>;
    async fn leave(&self, account_id: &str) -> ApiResult<()>;
}

pub type LocalStoreRef = Arc<dyn LocalStore>;
pub type CartApiRef = Arc<dyn CartApi>;
pub type CatalogRef = Arc<dyn Catalog>;
pub type AuthServiceRef = Arc<dyn AuthService>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type UpiVerifierRef = Arc<dyn UpiVerifier>;
pub type OrderServiceRef = Arc<dyn OrderService>;
pub type NotificationHubRef = Arc<dyn NotificationHub>;
