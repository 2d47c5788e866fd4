use super::cart_service::CartService;
use crate::domain::cart::{Cart, LineItem};
use crate::domain::checkout::{
    CARD_FORM_NOT_READY, CheckoutSession, CheckoutSource, CheckoutState, CustomerInfo,
    PaymentSelection,
};
use crate::domain::money::Money;
use crate::domain::order::{OrderConfirmation, OrderLine, OrderRequest, PaymentProof};
use crate::domain::ports::{CatalogRef, OrderServiceRef, PaymentGatewayRef, UpiVerifierRef};
use crate::domain::product::ProductRef;
use crate::error::{ApiError, CartError, Result};
use crate::utils::retry::CallPolicy;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const UPI_VERIFICATION_FAILED: &str = "UPI verification failed. Please try again.";

/// External collaborators of a checkout.
#[derive(Clone)]
pub struct CheckoutServices {
    pub catalog: CatalogRef,
    pub gateway: PaymentGatewayRef,
    pub upi: UpiVerifierRef,
    pub orders: OrderServiceRef,
    pub calls: CallPolicy,
    /// Re-read price and stock of every item right before payment.
    pub revalidate: bool,
}

/// Drives one checkout from item selection to a placed order.
///
/// ```text
/// Idle -> CollectingInfo -> AwaitingPaymentConfirmation -> Finalizing -> Completed
///              ^                      |                        |
///              +------- Failed <------+------------------------+
/// ```
///
/// A failed attempt keeps the form and items, so the shopper can fix the
/// problem and submit again.
pub struct CheckoutFlow {
    services: CheckoutServices,
    state: CheckoutState,
    session: Option<CheckoutSession>,
}

impl CheckoutFlow {
    pub fn new(services: CheckoutServices) -> Self {
        Self {
            services,
            state: CheckoutState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn session(&self) -> Option<&CheckoutSession> {
        self.session.as_ref()
    }

    /// Total to charge under the selected method, COD surcharge included.
    pub fn charged_total(&self) -> Option<Money> {
        self.session.as_ref().map(CheckoutSession::total_amount)
    }

    /// Checks out everything in the cart.
    pub fn begin_from_cart(&mut self, cart: &Cart) -> Result<()> {
        self.begin(CheckoutSource::Cart, cart.items().to_vec())
    }

    /// Checks out a single product without reading or touching the cart.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn begin_buy_now(&mut self, product: &ProductRef, quantity: u32) -> Result<()> {
        let quantity = quantity.max(1);
        let snapshot = self
            .services
            .calls
            .retrying(|| self.services.catalog.product(product))
            .await?
            .ok_or_else(|| {
                CartError::ValidationError(format!("Product {} is no longer available", product.id))
            })?;
        if snapshot.stock < quantity {
            return Err(CartError::ValidationError(format!(
                "Only {} of {} left in stock",
                snapshot.stock, snapshot.name
            )));
        }
        self.begin(
            CheckoutSource::BuyNow,
            vec![LineItem::from_snapshot(&snapshot, quantity)],
        )
    }

    fn begin(&mut self, source: CheckoutSource, items: Vec<LineItem>) -> Result<()> {
        self.session = Some(CheckoutSession::new(source, items)?);
        self.transition(CheckoutState::CollectingInfo);
        Ok(())
    }

    pub fn set_customer(&mut self, customer: CustomerInfo) -> Result<()> {
        self.editable_session()?.customer = customer;
        Ok(())
    }

    pub fn select_payment(&mut self, selection: PaymentSelection) -> Result<()> {
        self.editable_session()?.payment = Some(selection);
        Ok(())
    }

    /// Leaves `Failed` and goes back to the form.
    pub fn resume(&mut self) {
        if matches!(self.state, CheckoutState::Failed(_)) {
            self.transition(CheckoutState::CollectingInfo);
        }
    }

    fn editable_session(&mut self) -> Result<&mut CheckoutSession> {
        self.resume();
        if self.state != CheckoutState::CollectingInfo {
            return Err(CartError::ValidationError(format!(
                "Checkout cannot be edited while {}",
                self.state.name()
            )));
        }
        self.session
            .as_mut()
            .ok_or_else(|| CartError::ValidationError("Checkout has not started".to_string()))
    }

    /// Validates the form, takes payment and places the order.
    ///
    /// On success the cart is cleared if the items came from it. Any failure
    /// after the validation gate leaves the flow in `Failed` with the reason the
    /// shopper should see; the cart is never cleared in that case.
    #[instrument(skip(self, cart))]
    pub async fn submit(&mut self, cart: &mut CartService) -> Result<OrderConfirmation> {
        self.resume();
        if self.state != CheckoutState::CollectingInfo {
            return Err(CartError::ValidationError(format!(
                "Checkout cannot be submitted while {}",
                self.state.name()
            )));
        }
        let session = self
            .session
            .clone()
            .ok_or_else(|| CartError::ValidationError("Checkout has not started".to_string()))?;
        let selection = session.validate()?.clone();
        if self.services.revalidate {
            self.revalidate(&session.items).await?;
        }

        let method = selection.method();
        let total = session.total_amount();
        let lines: Vec<OrderLine> = session.items.iter().map(OrderLine::from).collect();

        self.transition(CheckoutState::AwaitingPaymentConfirmation);
        let proof = match self
            .confirm_payment(&selection, &lines, &session.customer, total)
            .await
        {
            Ok(proof) => proof,
            Err(error) => return Err(self.fail(error, cart).await),
        };

        self.transition(CheckoutState::Finalizing);
        let request = OrderRequest {
            items: lines,
            customer: session.customer.clone(),
            total_amount: total,
            payment_method: method,
            proof,
        };
        let credential = cart.session().credential().map(str::to_owned);
        let order_id = match self
            .services
            .calls
            .once(|| self.services.orders.create(credential.as_deref(), &request))
            .await
        {
            Ok(order_id) => order_id,
            Err(error) => return Err(self.fail(error.into(), cart).await),
        };

        if session.source == CheckoutSource::Cart {
            cart.clear_everywhere().await;
        }
        let confirmation = OrderConfirmation::new(order_id, method, total);
        info!(order_id = %confirmation.order_id, %method, amount = %total, "Order placed");
        self.session = None;
        self.transition(CheckoutState::Completed(confirmation.clone()));
        Ok(confirmation)
    }

    async fn confirm_payment(
        &self,
        selection: &PaymentSelection,
        lines: &[OrderLine],
        customer: &CustomerInfo,
        total: Money,
    ) -> Result<PaymentProof> {
        let calls = &self.services.calls;
        match selection {
            PaymentSelection::Card {
                element: Some(element),
            } => {
                let intent = calls
                    .once(|| self.services.gateway.create_intent(lines, customer))
                    .await?;
                let payment_id = calls
                    .once(|| self.services.gateway.confirm(&intent, element, customer))
                    .await?;
                Ok(PaymentProof::Card { payment_id })
            }
            // Unreachable after `CheckoutSession::validate`, which rejects a card
            // selection without a mounted element.
            PaymentSelection::Card { element: None } => Err(CartError::ValidationError(
                CARD_FORM_NOT_READY.to_string(),
            )),
            PaymentSelection::Upi { upi_id, mode } => {
                let transaction_id = format!("UPI{}", Uuid::new_v4().simple()).to_uppercase();
                info!(?mode, %transaction_id, "Verifying UPI payment");
                match calls
                    .retrying(|| self.services.upi.verify(upi_id, &transaction_id, total))
                    .await
                {
                    Ok(true) => Ok(PaymentProof::Upi { transaction_id }),
                    Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
                    Ok(false) | Err(_) => {
                        Err(ApiError::Payment(UPI_VERIFICATION_FAILED.to_string()).into())
                    }
                }
            }
            PaymentSelection::CashOnDelivery => Ok(PaymentProof::None),
        }
    }

    /// Re-reads each item from the catalog so a stale price or sold-out
    /// product is caught before any money moves.
    async fn revalidate(&self, items: &[LineItem]) -> Result<()> {
        for item in items {
            let current = self
                .services
                .calls
                .retrying(|| self.services.catalog.product(&item.product))
                .await?
                .ok_or_else(|| {
                    CartError::ValidationError(format!("{} is no longer available", item.name))
                })?;
            if current.stock < item.quantity {
                return Err(CartError::ValidationError(format!(
                    "Only {} of {} left in stock",
                    current.stock, item.name
                )));
            }
            if current.price != item.unit_price {
                return Err(CartError::ValidationError(format!(
                    "The price of {} changed from {} to {}, please review your cart",
                    item.name, item.unit_price, current.price
                )));
            }
        }
        Ok(())
    }

    async fn fail(&mut self, error: CartError, cart: &mut CartService) -> CartError {
        warn!(%error, state = self.state.name(), "Checkout step failed");
        if error.is_unauthorized() {
            cart.expire_session().await;
        }
        self.transition(CheckoutState::Failed(error.user_message()));
        error
    }

    fn transition(&mut self, next: CheckoutState) {
        info!(from = self.state.name(), to = next.name(), "Checkout transition");
        self.state = next;
    }
}
