//! Replays recorded shopper actions against the engine.

use super::csv::action_reader::{ActionType, ShopperAction};
use crate::application::cart_service::CartService;
use crate::application::checkout::{CheckoutFlow, CheckoutServices};
use crate::application::session::SessionManager;
use crate::config::EngineConfig;
use crate::domain::cart::Cart;
use crate::domain::checkout::{CardElement, CustomerInfo, PaymentSelection, UpiMode};
use crate::domain::ports::{CatalogRef, LocalStoreRef};
use crate::domain::session::Role;
use crate::error::{CartError, Result};
use crate::infrastructure::in_memory::{
    InMemoryAuthService, InMemoryCartApi, InMemoryCatalog, InMemoryNotificationHub,
    InMemoryOrderService, SimulatedPaymentGateway, SimulatedUpiVerifier,
};
use std::sync::Arc;
use tracing::warn;

/// Password used for accounts the replayer registers on first login.
pub const REPLAY_PASSWORD: &str = "replay";

/// Parses the `detail` column of a checkout action.
pub fn parse_payment(detail: &str) -> Result<PaymentSelection> {
    let (method, argument) = match detail.split_once(':') {
        Some((method, argument)) => (method.trim(), argument.trim()),
        None => (detail.trim(), ""),
    };
    match method.to_ascii_lowercase().as_str() {
        "cod" => Ok(PaymentSelection::CashOnDelivery),
        "card" => Ok(PaymentSelection::Card {
            element: Some(CardElement("replay-card-element".to_string())),
        }),
        "upi" => Ok(PaymentSelection::Upi {
            upi_id: argument.to_string(),
            mode: UpiMode::Direct,
        }),
        "upi-qr" => Ok(PaymentSelection::Upi {
            upi_id: argument.to_string(),
            mode: UpiMode::Qr,
        }),
        other => Err(CartError::ValidationError(format!(
            "unknown payment method: {other}"
        ))),
    }
}

/// A shopper session wired to in-memory services.
pub struct Replayer {
    auth: Arc<InMemoryAuthService>,
    api: Arc<InMemoryCartApi>,
    notifications: Arc<InMemoryNotificationHub>,
    sessions: SessionManager,
    cart: CartService,
    checkout: CheckoutServices,
    customer: CustomerInfo,
}

impl Replayer {
    pub async fn in_memory(
        catalog: Arc<InMemoryCatalog>,
        local: LocalStoreRef,
        config: &EngineConfig,
        customer: CustomerInfo,
    ) -> Result<Self> {
        let calls = config.call_policy();
        let auth = Arc::new(InMemoryAuthService::new());
        let notifications = Arc::new(InMemoryNotificationHub::new());
        let sessions = SessionManager::new(
            auth.clone(),
            local.clone(),
            notifications.clone(),
            calls.clone(),
        );
        let session = sessions.restore().await?;
        let catalog_ref: CatalogRef = catalog.clone();
        let api = Arc::new(InMemoryCartApi::new(catalog));
        let mut cart = CartService::new(
            session,
            local,
            api.clone(),
            catalog_ref.clone(),
            calls.clone(),
        );
        cart.refresh().await?;

        let checkout = CheckoutServices {
            catalog: catalog_ref,
            gateway: Arc::new(SimulatedPaymentGateway::new()),
            upi: Arc::new(SimulatedUpiVerifier::new()),
            orders: Arc::new(InMemoryOrderService::new()),
            calls,
            revalidate: config.revalidate_at_checkout,
        };

        Ok(Self {
            auth,
            api,
            notifications,
            sessions,
            cart,
            checkout,
            customer,
        })
    }

    pub fn cart(&self) -> Cart {
        self.cart.cart()
    }

    pub fn cart_api(&self) -> &InMemoryCartApi {
        &self.api
    }

    /// Accounts currently subscribed to order notifications.
    pub fn notification_rooms(&self) -> Vec<String> {
        self.notifications.rooms()
    }

    /// Applies one action and returns the notice to show the shopper.
    ///
    /// A rejected credential signs the shopper out of the session it was
    /// issued for, whichever step hit it.
    pub async fn apply(&mut self, action: &ShopperAction) -> Result<String> {
        let before = self.cart.session().clone();
        let result = self.dispatch(action).await;
        if let Err(error) = &result
            && error.is_unauthorized()
            && let Err(logout_error) = self.sessions.force_logout(&before).await
        {
            warn!(error = %logout_error, "Forced logout failed");
        }
        result
    }

    async fn dispatch(&mut self, action: &ShopperAction) -> Result<String> {
        match action.action {
            ActionType::Add => {
                let quantity = action.quantity.unwrap_or(1).clamp(1, i64::from(u32::MAX));
                let quantity = u32::try_from(quantity).unwrap_or(1);
                let view = self.cart.add_item(&action.product_ref()?, quantity).await?;
                Ok(view.badge.message.unwrap_or_default())
            }
            ActionType::Set => {
                let quantity = action.quantity.ok_or_else(|| {
                    CartError::ValidationError("set needs a quantity".to_string())
                })?;
                self.cart
                    .set_quantity(&action.product_ref()?, quantity)
                    .await?;
                Ok("Cart updated".to_string())
            }
            ActionType::Remove => {
                self.cart.remove_item(&action.product_ref()?).await?;
                Ok("Item removed from cart".to_string())
            }
            ActionType::Clear => {
                self.cart.clear_cart().await?;
                Ok("Cart cleared".to_string())
            }
            ActionType::Login => {
                let email = action.detail()?;
                let account_id = format!("acc-{}", email.split('@').next().unwrap_or(email));
                self.auth
                    .register(email, REPLAY_PASSWORD, &account_id, Role::Buyer);
                let session = self.sessions.login(email, REPLAY_PASSWORD).await?;
                let report = self.cart.sign_in(session).await?;
                Ok(format!(
                    "Welcome {email}: {} item(s) moved to your account, {} could not be added",
                    report.merged.len(),
                    report.failed.len()
                ))
            }
            ActionType::Logout => {
                self.sessions.logout(self.cart.session()).await?;
                self.cart.sign_out().await?;
                Ok("Logged out".to_string())
            }
            ActionType::Checkout => {
                let mut flow = CheckoutFlow::new(self.checkout.clone());
                flow.begin_from_cart(&self.cart.cart())?;
                self.finish(flow, action).await
            }
            ActionType::Buynow => {
                let quantity = action.quantity.unwrap_or(1).clamp(1, i64::from(u32::MAX));
                let quantity = u32::try_from(quantity).unwrap_or(1);
                let mut flow = CheckoutFlow::new(self.checkout.clone());
                flow.begin_buy_now(&action.product_ref()?, quantity).await?;
                self.finish(flow, action).await
            }
        }
    }

    async fn finish(&mut self, mut flow: CheckoutFlow, action: &ShopperAction) -> Result<String> {
        flow.set_customer(self.customer.clone())?;
        flow.select_payment(parse_payment(action.detail()?)?)?;
        let confirmation = flow.submit(&mut self.cart).await?;
        Ok(format!("{} ({})", confirmation.message, confirmation.order_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::CREDENTIAL_KEY;
    use crate::domain::ports::LocalStore;
    use crate::domain::product::{CatalogKind, ProductRef};
    use crate::infrastructure::in_memory::InMemoryLocalStore;
    use rust_decimal_macros::dec;

    fn action(
        kind: ActionType,
        product: Option<&str>,
        quantity: Option<i64>,
        detail: Option<&str>,
    ) -> ShopperAction {
        ShopperAction {
            action: kind,
            product: product.map(str::to_string),
            kind: Some(CatalogKind::Standard),
            quantity,
            detail: detail.map(str::to_string),
        }
    }

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            address: "12 Mill Road".into(),
            city: "Pune".into(),
            state: "MH".into(),
            postal_code: "411001".into(),
        }
    }

    #[test]
    fn test_parse_payment() {
        assert_eq!(parse_payment("cod").unwrap(), PaymentSelection::CashOnDelivery);
        assert_eq!(
            parse_payment("upi-qr: asha@okbank").unwrap(),
            PaymentSelection::Upi {
                upi_id: "asha@okbank".into(),
                mode: UpiMode::Qr
            }
        );
        assert!(matches!(parse_payment("CARD").unwrap(), PaymentSelection::Card { .. }));
        assert!(parse_payment("barter").is_err());
    }

    #[tokio::test]
    async fn test_replay_login_merges_then_checkout_clears() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.insert_product(ProductRef::standard("rice"), "Rice", dec!(250), 10);
        let mut replayer = Replayer::in_memory(
            catalog,
            Arc::new(InMemoryLocalStore::new()),
            &EngineConfig::default(),
            customer(),
        )
        .await
        .unwrap();

        replayer
            .apply(&action(ActionType::Add, Some("rice"), Some(2), None))
            .await
            .unwrap();
        let notice = replayer
            .apply(&action(ActionType::Login, None, None, Some("asha@example.com")))
            .await
            .unwrap();
        assert!(notice.contains("1 item(s) moved"));
        assert_eq!(replayer.cart().len(), 1);

        let notice = replayer
            .apply(&action(ActionType::Checkout, None, None, Some("cod")))
            .await
            .unwrap();
        assert!(notice.starts_with("Order placed! Please pay ₹550.00 at delivery."));
        assert!(replayer.cart().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_credential_forces_logout_and_leaves_room() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.insert_product(ProductRef::standard("rice"), "Rice", dec!(250), 10);
        let local = Arc::new(InMemoryLocalStore::new());
        let mut replayer = Replayer::in_memory(
            catalog,
            local.clone(),
            &EngineConfig::default(),
            customer(),
        )
        .await
        .unwrap();

        replayer
            .apply(&action(ActionType::Login, None, None, Some("asha@example.com")))
            .await
            .unwrap();
        assert_eq!(replayer.notification_rooms(), vec!["acc-asha".to_string()]);
        let credential = replayer.cart.session().credential().unwrap().to_string();
        replayer.cart_api().revoke(&credential);

        let error = replayer
            .apply(&action(ActionType::Add, Some("rice"), Some(1), None))
            .await
            .unwrap_err();

        assert!(error.is_unauthorized());
        assert!(replayer.notification_rooms().is_empty());
        assert!(replayer.cart.session().account().is_none());
        assert_eq!(local.get(CREDENTIAL_KEY).await.unwrap(), None);
    }
}
