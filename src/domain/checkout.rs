use super::cart::LineItem;
use super::money::Money;
use super::order::OrderConfirmation;
use crate::error::{CartError, Result};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flat fee added to the charged total for cash on delivery.
pub const COD_SURCHARGE: Money = Money(dec!(50));

pub const CARD_FORM_NOT_READY: &str = "Card payment form is not ready yet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Upi,
    #[serde(rename = "cod")]
    CashOnDelivery,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Card => f.write_str("card"),
            PaymentMethod::Upi => f.write_str("upi"),
            PaymentMethod::CashOnDelivery => f.write_str("cod"),
        }
    }
}

/// Handle to the card input widget mounted by the payment provider SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardElement(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpiMode {
    /// Shopper typed their UPI id.
    #[default]
    Direct,
    /// Shopper scanned a QR code and confirmed their UPI id.
    Qr,
}

/// Payment method chosen on the checkout form, with its method-specific fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentSelection {
    Card { element: Option<CardElement> },
    Upi { upi_id: String, mode: UpiMode },
    CashOnDelivery,
}

impl PaymentSelection {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentSelection::Card { .. } => PaymentMethod::Card,
            PaymentSelection::Upi { .. } => PaymentMethod::Upi,
            PaymentSelection::CashOnDelivery => PaymentMethod::CashOnDelivery,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            PaymentSelection::Card { element } => match element {
                Some(CardElement(handle)) if !handle.trim().is_empty() => Ok(()),
                _ => Err(CartError::ValidationError(CARD_FORM_NOT_READY.to_string())),
            },
            PaymentSelection::Upi { upi_id, .. } => {
                if is_valid_upi_id(upi_id) {
                    Ok(())
                } else {
                    Err(CartError::ValidationError(
                        "Please enter a valid UPI ID (e.g. name@bank)".to_string(),
                    ))
                }
            }
            PaymentSelection::CashOnDelivery => Ok(()),
        }
    }
}

fn is_valid_upi_id(upi_id: &str) -> bool {
    match upi_id.trim().split_once('@') {
        Some((handle, provider)) => !handle.is_empty() && !provider.is_empty(),
        None => false,
    }
}

/// Amount actually charged for a subtotal under the given method.
pub fn charged_total(subtotal: Money, method: PaymentMethod) -> Money {
    match method {
        PaymentMethod::CashOnDelivery => subtotal + COD_SURCHARGE,
        PaymentMethod::Card | PaymentMethod::Upi => subtotal,
    }
}

/// Shipping and contact fields. Doubles as card billing details.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl CustomerInfo {
    /// Every field is required. The error lists the blank ones.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("name", &self.name),
            ("email", &self.email),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("postal code", &self.postal_code),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(label, _)| *label)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CartError::ValidationError(format!(
                "Please fill in: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Where the purchased items came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutSource {
    Cart,
    /// Single product bought straight from its page; the cart is never touched.
    BuyNow,
}

/// Ephemeral state of one checkout attempt. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub source: CheckoutSource,
    pub items: Vec<LineItem>,
    pub customer: CustomerInfo,
    pub payment: Option<PaymentSelection>,
}

impl CheckoutSession {
    pub fn new(source: CheckoutSource, items: Vec<LineItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(CartError::ValidationError(
                "There is nothing to check out".to_string(),
            ));
        }
        Ok(Self {
            source,
            items,
            customer: CustomerInfo::default(),
            payment: None,
        })
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Subtotal plus the surcharge of the selected method, if any.
    pub fn total_amount(&self) -> Money {
        match &self.payment {
            Some(selection) => charged_total(self.subtotal(), selection.method()),
            None => self.subtotal(),
        }
    }

    /// The gate in front of payment: contact fields plus method-specific fields.
    pub fn validate(&self) -> Result<&PaymentSelection> {
        self.customer.validate()?;
        let selection = self.payment.as_ref().ok_or_else(|| {
            CartError::ValidationError("Please choose a payment method".to_string())
        })?;
        selection.validate()?;
        Ok(selection)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutState {
    Idle,
    CollectingInfo,
    AwaitingPaymentConfirmation,
    Finalizing,
    Completed(OrderConfirmation),
    Failed(String),
}

impl CheckoutState {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::CollectingInfo => "collecting_info",
            CheckoutState::AwaitingPaymentConfirmation => "awaiting_payment_confirmation",
            CheckoutState::Finalizing => "finalizing",
            CheckoutState::Completed(_) => "completed",
            CheckoutState::Failed(_) => "failed",
        }
    }
}
