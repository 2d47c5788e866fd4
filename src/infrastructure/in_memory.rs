//! In-memory adapters for every port.
//!
//! Used by the CLI and by tests. Besides plain storage they carry small fault
//! hooks (`fail_next`, `reject_product`, `revoke`, ...) so failure paths of the
//! engine can be driven deterministically.

use crate::domain::cart::LineItem;
use crate::domain::checkout::{CardElement, CustomerInfo};
use crate::domain::money::Money;
use crate::domain::order::{OrderLine, OrderRequest, PaymentIntent};
use crate::domain::ports::{
    AuthService, CartApi, Catalog, LocalStore, NotificationHub, OrderService, PaymentGateway,
    UpiVerifier,
};
use crate::domain::product::{ProductRef, ProductSnapshot};
use crate::domain::session::{Account, Role};
use crate::error::{ApiError, ApiResult, CartError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock as StdRwLock};
use tokio::sync::RwLock;
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Queue of errors handed out to the next calls of an adapter.
#[derive(Debug, Default)]
struct FaultPlan {
    queued: Mutex<VecDeque<ApiError>>,
}

impl FaultPlan {
    fn push(&self, error: ApiError) {
        lock(&self.queued).push_back(error);
    }

    fn check(&self) -> ApiResult<()> {
        match lock(&self.queued).pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Local store
// ============================================================================

/// Thread-safe key-value store standing in for device-local storage.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLocalStore {
    values: Arc<RwLock<HashMap<String, String>>>,
    fail_next_write: Arc<AtomicBool>,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `set` or `remove` fails with a storage error.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            Err(CartError::StorageError("local storage is full".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.check_write()?;
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.check_write()?;
        let mut values = self.values.write().await;
        values.remove(key);
        Ok(())
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: StdRwLock<HashMap<ProductRef, ProductSnapshot>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshots(snapshots: impl IntoIterator<Item = ProductSnapshot>) -> Self {
        let catalog = Self::new();
        for snapshot in snapshots {
            catalog.insert(snapshot);
        }
        catalog
    }

    /// Loads a JSON array of product snapshots.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let snapshots: Vec<ProductSnapshot> = serde_json::from_str(&raw)?;
        Ok(Self::from_snapshots(snapshots))
    }

    pub fn insert(&self, snapshot: ProductSnapshot) {
        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.product.clone(), snapshot);
    }

    pub fn insert_product(&self, product: ProductRef, name: &str, price: Decimal, stock: u32) {
        self.insert(ProductSnapshot {
            product,
            name: name.to_string(),
            price: Money::new(price),
            unit: "kg".to_string(),
            stock,
            image: None,
        });
    }

    pub fn set_price(&self, product: &ProductRef, price: Decimal) {
        if let Some(snapshot) = self
            .products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(product)
        {
            snapshot.price = Money::new(price);
        }
    }

    pub fn set_stock(&self, product: &ProductRef, stock: u32) {
        if let Some(snapshot) = self
            .products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(product)
        {
            snapshot.stock = stock;
        }
    }

    fn lookup(&self, product: &ProductRef) -> Option<ProductSnapshot> {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(product)
            .cloned()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn product(&self, product: &ProductRef) -> ApiResult<Option<ProductSnapshot>> {
        Ok(self.lookup(product))
    }
}

// ============================================================================
// Server cart
// ============================================================================

/// A call received by [`InMemoryCartApi`], for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartRequest {
    Fetch,
    Add { product: ProductRef, quantity: u32 },
    Update { product: ProductRef, quantity: u32 },
    Remove { product: ProductRef },
    Clear,
}

/// Server cart keyed by credential. Prices come from the shared catalog.
#[derive(Debug)]
pub struct InMemoryCartApi {
    catalog: Arc<InMemoryCatalog>,
    carts: RwLock<HashMap<String, Vec<LineItem>>>,
    faults: FaultPlan,
    rejected: Mutex<HashMap<ProductRef, String>>,
    revoked: Mutex<HashSet<String>>,
    requests: Mutex<Vec<CartRequest>>,
}

impl InMemoryCartApi {
    pub fn new(catalog: Arc<InMemoryCatalog>) -> Self {
        Self {
            catalog,
            carts: RwLock::new(HashMap::new()),
            faults: FaultPlan::default(),
            rejected: Mutex::new(HashMap::new()),
            revoked: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// The next call, whatever it is, fails with `error`.
    pub fn fail_next(&self, error: ApiError) {
        self.faults.push(error);
    }

    /// Adds of this product are answered with a 400 carrying `message`.
    pub fn reject_product(&self, product: ProductRef, message: &str) {
        lock(&self.rejected).insert(product, message.to_string());
    }

    /// Every later call with this credential gets a 401.
    pub fn revoke(&self, credential: &str) {
        lock(&self.revoked).insert(credential.to_string());
    }

    pub fn requests(&self) -> Vec<CartRequest> {
        lock(&self.requests).clone()
    }

    pub async fn cart_of(&self, credential: &str) -> Vec<LineItem> {
        let carts = self.carts.read().await;
        carts.get(credential).cloned().unwrap_or_default()
    }

    /// Puts a row straight into a server cart, bypassing faults and the log.
    pub async fn seed(&self, credential: &str, product: &ProductRef, quantity: u32) {
        if let Some(snapshot) = self.catalog.lookup(product) {
            let mut carts = self.carts.write().await;
            let rows = carts.entry(credential.to_string()).or_default();
            upsert(rows, LineItem::from_snapshot(&snapshot, quantity));
        }
    }

    fn admit(&self, credential: &str, request: CartRequest) -> ApiResult<()> {
        lock(&self.requests).push(request);
        if lock(&self.revoked).contains(credential) {
            return Err(ApiError::Unauthorized);
        }
        self.faults.check()
    }
}

fn upsert(rows: &mut Vec<LineItem>, item: LineItem) {
    match rows.iter_mut().find(|row| row.product == item.product) {
        Some(row) => row.quantity = row.quantity.saturating_add(item.quantity),
        None => rows.push(item),
    }
}

#[async_trait]
impl CartApi for InMemoryCartApi {
    async fn fetch(&self, credential: &str) -> ApiResult<Vec<LineItem>> {
        self.admit(credential, CartRequest::Fetch)?;
        Ok(self.cart_of(credential).await)
    }

    async fn add(&self, credential: &str, product: &ProductRef, quantity: u32) -> ApiResult<()> {
        self.admit(
            credential,
            CartRequest::Add {
                product: product.clone(),
                quantity,
            },
        )?;
        let rejection = lock(&self.rejected).get(product).cloned();
        if let Some(message) = rejection {
            return Err(ApiError::from_status(400, Some(message)));
        }
        let snapshot = self
            .catalog
            .lookup(product)
            .ok_or_else(|| ApiError::from_status(404, Some("Product not found".to_string())))?;

        let mut carts = self.carts.write().await;
        let rows = carts.entry(credential.to_string()).or_default();
        upsert(rows, LineItem::from_snapshot(&snapshot, quantity));
        Ok(())
    }

    async fn update(
        &self,
        credential: &str,
        product: &ProductRef,
        quantity: u32,
    ) -> ApiResult<()> {
        self.admit(
            credential,
            CartRequest::Update {
                product: product.clone(),
                quantity,
            },
        )?;
        let mut carts = self.carts.write().await;
        let row = carts
            .get_mut(credential)
            .and_then(|rows| rows.iter_mut().find(|row| &row.product == product))
            .ok_or_else(|| ApiError::from_status(404, Some("Item not in cart".to_string())))?;
        row.quantity = quantity.max(1);
        Ok(())
    }

    async fn remove(&self, credential: &str, product: &ProductRef) -> ApiResult<()> {
        self.admit(
            credential,
            CartRequest::Remove {
                product: product.clone(),
            },
        )?;
        let mut carts = self.carts.write().await;
        if let Some(rows) = carts.get_mut(credential) {
            rows.retain(|row| &row.product != product);
        }
        Ok(())
    }

    async fn clear(&self, credential: &str) -> ApiResult<()> {
        self.admit(credential, CartRequest::Clear)?;
        let mut carts = self.carts.write().await;
        carts.remove(credential);
        Ok(())
    }
}

// ============================================================================
// Accounts and notifications
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryAuthService {
    accounts: Mutex<HashMap<String, (String, Account)>>,
    sessions: Mutex<HashSet<String>>,
}

impl InMemoryAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, email: &str, password: &str, account_id: &str, role: Role) {
        let display_name = email.split('@').next().unwrap_or(email).to_string();
        let account = Account {
            credential: String::new(),
            account_id: account_id.to_string(),
            role,
            display_name,
            email: email.to_string(),
        };
        lock(&self.accounts).insert(email.to_string(), (password.to_string(), account));
    }

    pub fn is_active(&self, credential: &str) -> bool {
        lock(&self.sessions).contains(credential)
    }
}

#[async_trait]
impl AuthService for InMemoryAuthService {
    async fn login(&self, email: &str, password: &str) -> ApiResult<Account> {
        let mut account = match lock(&self.accounts).get(email) {
            Some((expected, account)) if expected == password => account.clone(),
            _ => {
                return Err(ApiError::from_status(
                    400,
                    Some("Invalid email or password".to_string()),
                ));
            }
        };
        account.credential = format!("tok-{}", Uuid::new_v4().simple());
        lock(&self.sessions).insert(account.credential.clone());
        Ok(account)
    }

    async fn logout(&self, credential: &str) -> ApiResult<()> {
        lock(&self.sessions).remove(credential);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryNotificationHub {
    rooms: Mutex<Vec<String>>,
}

impl InMemoryNotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rooms(&self) -> Vec<String> {
        lock(&self.rooms).clone()
    }
}

#[async_trait]
impl NotificationHub for InMemoryNotificationHub {
    async fn join(&self, account_id: &str) -> ApiResult<()> {
        let mut rooms = lock(&self.rooms);
        if !rooms.iter().any(|room| room == account_id) {
            rooms.push(account_id.to_string());
        }
        Ok(())
    }

    async fn leave(&self, account_id: &str) -> ApiResult<()> {
        lock(&self.rooms).retain(|room| room != account_id);
        Ok(())
    }
}

// ============================================================================
// Payments and orders
// ============================================================================

/// Card gateway that approves everything unless told to decline.
#[derive(Debug, Default)]
pub struct SimulatedPaymentGateway {
    decline: Mutex<Option<String>>,
    faults: FaultPlan,
    confirmed: Mutex<Vec<String>>,
}

impl SimulatedPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmations fail with this provider message until cleared.
    pub fn decline_with(&self, message: &str) {
        *lock(&self.decline) = Some(message.to_string());
    }

    pub fn approve(&self) {
        *lock(&self.decline) = None;
    }

    pub fn fail_next(&self, error: ApiError) {
        self.faults.push(error);
    }

    pub fn confirmed_payments(&self) -> Vec<String> {
        lock(&self.confirmed).clone()
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn create_intent(
        &self,
        items: &[OrderLine],
        _customer: &CustomerInfo,
    ) -> ApiResult<PaymentIntent> {
        self.faults.check()?;
        if items.is_empty() {
            return Err(ApiError::from_status(400, Some("No items to pay for".to_string())));
        }
        let id = format!("pi_{}", Uuid::new_v4().simple());
        Ok(PaymentIntent {
            client_secret: format!("{id}_secret"),
            id,
        })
    }

    async fn confirm(
        &self,
        intent: &PaymentIntent,
        _element: &CardElement,
        _billing: &CustomerInfo,
    ) -> ApiResult<String> {
        self.faults.check()?;
        if let Some(message) = lock(&self.decline).clone() {
            return Err(ApiError::Payment(message));
        }
        let payment_id = intent.id.replacen("pi_", "pay_", 1);
        lock(&self.confirmed).push(payment_id.clone());
        Ok(payment_id)
    }
}

/// A UPI verification request seen by [`SimulatedUpiVerifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpiVerification {
    pub upi_id: String,
    pub transaction_id: String,
    pub amount: Money,
}

#[derive(Debug, Default)]
pub struct SimulatedUpiVerifier {
    reject: AtomicBool,
    faults: FaultPlan,
    seen: Mutex<Vec<UpiVerification>>,
}

impl SimulatedUpiVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_all(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    pub fn fail_next(&self, error: ApiError) {
        self.faults.push(error);
    }

    pub fn verifications(&self) -> Vec<UpiVerification> {
        lock(&self.seen).clone()
    }
}

#[async_trait]
impl UpiVerifier for SimulatedUpiVerifier {
    async fn verify(&self, upi_id: &str, transaction_id: &str, amount: Money) -> ApiResult<bool> {
        lock(&self.seen).push(UpiVerification {
            upi_id: upi_id.to_string(),
            transaction_id: transaction_id.to_string(),
            amount,
        });
        self.faults.check()?;
        Ok(!self.reject.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrderService {
    orders: Mutex<Vec<OrderRequest>>,
    faults: FaultPlan,
}

impl InMemoryOrderService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, error: ApiError) {
        self.faults.push(error);
    }

    pub fn orders(&self) -> Vec<OrderRequest> {
        lock(&self.orders).clone()
    }
}

#[async_trait]
impl OrderService for InMemoryOrderService {
    async fn create(&self, _credential: Option<&str>, order: &OrderRequest) -> ApiResult<String> {
        self.faults.check()?;
        let mut orders = lock(&self.orders);
        orders.push(order.clone());
        Ok(format!("ORD-{:05}", orders.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_in_memory_local_store() {
        let store = InMemoryLocalStore::new();
        store.set("cart", "[]".to_string()).await.unwrap();
        assert_eq!(store.get("cart").await.unwrap().as_deref(), Some("[]"));

        store.fail_next_write();
        assert!(store.remove("cart").await.is_err());
        assert!(store.get("cart").await.unwrap().is_some());

        store.remove("cart").await.unwrap();
        assert!(store.get("cart").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cart_api_fault_plan_and_revocation() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.insert_product(ProductRef::standard("rice"), "Rice", dec!(80), 10);
        let api = InMemoryCartApi::new(catalog);

        api.fail_next(ApiError::Server { status: 503 });
        assert_eq!(api.fetch("tok").await, Err(ApiError::Server { status: 503 }));
        assert!(api.fetch("tok").await.unwrap().is_empty());

        api.add("tok", &ProductRef::standard("rice"), 2).await.unwrap();
        assert_eq!(api.cart_of("tok").await[0].quantity, 2);

        api.revoke("tok");
        assert_eq!(api.clear("tok").await, Err(ApiError::Unauthorized));
        assert_eq!(api.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_cart_api_rejects_unknown_products() {
        let api = InMemoryCartApi::new(Arc::new(InMemoryCatalog::new()));
        let err = api
            .add("tok", &ProductRef::waste("ghost"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_auth_issues_distinct_credentials() {
        let auth = InMemoryAuthService::new();
        auth.register("ravi@example.com", "pw", "acc-2", Role::Industry);

        let first = auth.login("ravi@example.com", "pw").await.unwrap();
        let second = auth.login("ravi@example.com", "pw").await.unwrap();
        assert_ne!(first.credential, second.credential);
        assert_eq!(first.display_name, "ravi");

        auth.logout(&first.credential).await.unwrap();
        assert!(!auth.is_active(&first.credential));
        assert!(auth.is_active(&second.credential));
    }

    #[tokio::test]
    async fn test_gateway_decline_carries_provider_message() {
        let gateway = SimulatedPaymentGateway::new();
        let line = OrderLine {
            product: ProductRef::standard("rice"),
            quantity: 1,
            unit_price: Money::new(dec!(80)),
        };
        let intent = gateway
            .create_intent(&[line], &CustomerInfo::default())
            .await
            .unwrap();

        gateway.decline_with("Your card has insufficient funds.");
        let err = gateway
            .confirm(&intent, &CardElement("el".into()), &CustomerInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Payment("Your card has insufficient funds.".into()));
        assert!(gateway.confirmed_payments().is_empty());
    }
}
