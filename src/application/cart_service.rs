use super::local_cart;
use super::session::clear_identity;
use crate::domain::cart::{Cart, CartView};
use crate::domain::ports::{CartApiRef, CatalogRef, LocalStoreRef};
use crate::domain::product::ProductRef;
use crate::domain::session::{CartIdentity, SessionContext};
use crate::error::{CartError, Result};
use crate::utils::retry::CallPolicy;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Outcome of folding the anonymous cart into the account cart at login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub merged: Vec<ProductRef>,
    /// Rejected by the server. These are gone from the local store as well.
    pub failed: Vec<ProductRef>,
}

/// Owns the displayed cart and keeps it in line with whichever store is
/// authoritative for the current session.
///
/// Mutations are optimistic: the displayed cart changes first, then the
/// authoritative store is written. If that write fails the displayed cart is
/// replaced by a fresh read of the authoritative store.
pub struct CartService {
    session: SessionContext,
    local: LocalStoreRef,
    api: CartApiRef,
    catalog: CatalogRef,
    calls: CallPolicy,
    display: watch::Sender<Cart>,
}

impl CartService {
    pub fn new(
        session: SessionContext,
        local: LocalStoreRef,
        api: CartApiRef,
        catalog: CatalogRef,
        calls: CallPolicy,
    ) -> Self {
        let (display, _) = watch::channel(Cart::new());
        Self {
            session,
            local,
            api,
            catalog,
            calls,
            display,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn identity(&self) -> CartIdentity {
        self.session.identity()
    }

    /// Receives every change to the displayed cart, optimistic ones included.
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.display.subscribe()
    }

    pub fn cart(&self) -> Cart {
        self.display.borrow().clone()
    }

    pub fn view(&self) -> CartView {
        self.display.borrow().view()
    }

    /// Replaces the displayed cart with the authoritative one.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<CartView> {
        match self.load_authoritative().await {
            Ok(cart) => {
                self.display.send_replace(cart);
                Ok(self.view())
            }
            Err(error) => {
                if error.is_unauthorized() {
                    self.expire_session().await;
                }
                Err(error)
            }
        }
    }

    #[instrument(skip(self), fields(product = %product))]
    pub async fn add_item(&mut self, product: &ProductRef, quantity: u32) -> Result<CartView> {
        let quantity = quantity.max(1);
        let snapshot = self
            .calls
            .retrying(|| self.catalog.product(product))
            .await?
            .ok_or_else(|| {
                CartError::ValidationError(format!("Product {} is no longer available", product.id))
            })?;

        self.display.send_modify(|cart| {
            cart.add(&snapshot, quantity);
        });

        let result = match self.session.credential() {
            Some(credential) => self
                .calls
                .once(|| self.api.add(credential, product, quantity))
                .await
                .map_err(CartError::from),
            None => self.persist_local().await,
        };
        self.settle(result, format!("{} added to cart", snapshot.name))
            .await
    }

    /// Sets a row's quantity, clamped to at least 1. Unknown products are ignored.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn set_quantity(&mut self, product: &ProductRef, quantity: i64) -> Result<CartView> {
        let mut stored = None;
        self.display.send_if_modified(|cart| {
            stored = cart.set_quantity(product, quantity);
            stored.is_some()
        });
        let Some(stored) = stored else {
            debug!("Quantity change for a product not in the cart, ignoring");
            return Ok(self.view());
        };

        let result = match self.session.credential() {
            Some(credential) => self
                .calls
                .retrying(|| self.api.update(credential, product, stored))
                .await
                .map_err(CartError::from),
            None => self.persist_local().await,
        };
        self.settle(result, "Cart updated").await
    }

    /// Removing a product that is not in the cart is a no-op.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn remove_item(&mut self, product: &ProductRef) -> Result<CartView> {
        let removed = self
            .display
            .send_if_modified(|cart| cart.remove(product).is_some());
        if !removed {
            return Ok(self.view());
        }

        let result = match self.session.credential() {
            Some(credential) => self
                .calls
                .retrying(|| self.api.remove(credential, product))
                .await
                .map_err(CartError::from),
            None => self.persist_local().await,
        };
        self.settle(result, "Item removed from cart").await
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&mut self) -> Result<CartView> {
        self.display.send_modify(Cart::clear);

        let result = match self.session.credential() {
            Some(credential) => self
                .calls
                .retrying(|| self.api.clear(credential))
                .await
                .map_err(CartError::from),
            None => local_cart::clear(self.local.as_ref()).await,
        };
        self.settle(result, "Cart cleared").await
    }

    /// Empties the local store and, when logged in, the server cart.
    ///
    /// Used after an order is placed, so failures are logged and swallowed:
    /// the order exists either way.
    pub async fn clear_everywhere(&mut self) {
        self.display.send_modify(Cart::clear);

        if let Err(error) = local_cart::clear(self.local.as_ref()).await {
            warn!(%error, "Could not clear local cart after order");
        }
        if let Some(credential) = self.session.credential()
            && let Err(error) = self.calls.retrying(|| self.api.clear(credential)).await
        {
            warn!(%error, "Could not clear server cart after order");
        }
    }

    /// Switches to the account cart, merging the anonymous cart into it first.
    ///
    /// Merge is best effort: each local row is sent once, in order; a rejected
    /// row is logged and skipped. The local store is emptied before the first
    /// row is sent, so a failed clear leaves the server untouched and a retry
    /// cannot add the same rows twice.
    #[instrument(skip(self, session))]
    pub async fn sign_in(&mut self, session: SessionContext) -> Result<MergeReport> {
        let Some(credential) = session.credential().map(str::to_owned) else {
            return Err(CartError::ValidationError(
                "Cannot merge the cart without a credential".to_string(),
            ));
        };

        let local = local_cart::load(self.local.as_ref()).await?;
        local_cart::clear(self.local.as_ref()).await?;
        let mut report = MergeReport::default();
        for item in local.items() {
            match self
                .calls
                .once(|| self.api.add(&credential, &item.product, item.quantity))
                .await
            {
                Ok(()) => report.merged.push(item.product.clone()),
                Err(error) => {
                    warn!(product = %item.product, %error, "Skipping cart item that failed to merge");
                    report.failed.push(item.product.clone());
                }
            }
        }

        info!(
            merged = report.merged.len(),
            failed = report.failed.len(),
            "Merged local cart into account cart"
        );

        self.session = session;
        if let Err(error) = self.refresh().await {
            warn!(%error, "Could not load account cart after login");
        }
        Ok(report)
    }

    /// Drops the account; the local store becomes authoritative again.
    pub async fn sign_out(&mut self) -> Result<CartView> {
        self.session = SessionContext::anonymous();
        self.refresh().await
    }

    /// Reacts to a rejected credential: identity keys are cleared and the
    /// engine falls back to the anonymous cart.
    pub async fn expire_session(&mut self) {
        warn!("Credential rejected, falling back to anonymous cart");
        if let Err(error) = clear_identity(self.local.as_ref()).await {
            warn!(%error, "Could not clear stored identity");
        }
        self.session = SessionContext::anonymous();
        match local_cart::load(self.local.as_ref()).await {
            Ok(cart) => {
                self.display.send_replace(cart);
            }
            Err(error) => warn!(%error, "Could not load local cart"),
        }
    }

    async fn load_authoritative(&self) -> Result<Cart> {
        match self.session.credential() {
            Some(credential) => {
                let items = self.calls.retrying(|| self.api.fetch(credential)).await?;
                Ok(Cart::from_items(items))
            }
            None => local_cart::load(self.local.as_ref()).await,
        }
    }

    async fn persist_local(&self) -> Result<()> {
        let cart = self.cart();
        local_cart::save(self.local.as_ref(), &cart).await
    }

    async fn settle(&mut self, result: Result<()>, notice: impl Into<String>) -> Result<CartView> {
        match result {
            Ok(()) => Ok(self.view().with_message(notice)),
            Err(error) => {
                warn!(%error, "Cart write failed, reloading authoritative cart");
                if error.is_unauthorized() {
                    self.expire_session().await;
                } else if let Err(reload_error) = self.refresh().await {
                    warn!(error = %reload_error, "Reload after failed write also failed");
                }
                Err(error)
            }
        }
    }
}
