use super::cart::LineItem;
use super::checkout::{CustomerInfo, PaymentMethod};
use super::money::Money;
use super::product::ProductRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product: ProductRef,
    pub quantity: u32,
    pub unit_price: Money,
}

impl From<&LineItem> for OrderLine {
    fn from(item: &LineItem) -> Self {
        Self {
            product: item.product.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

/// Evidence that payment happened, attached to the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PaymentProof {
    Card { payment_id: String },
    Upi { transaction_id: String },
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<OrderLine>,
    pub customer: CustomerInfo,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub proof: PaymentProof,
}

/// Payment intent created by the gateway for a card checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub message: String,
}

impl OrderConfirmation {
    pub fn new(order_id: String, method: PaymentMethod, amount: Money) -> Self {
        let message = match method {
            PaymentMethod::CashOnDelivery => {
                format!("Order placed! Please pay {amount} at delivery.")
            }
            PaymentMethod::Card | PaymentMethod::Upi => {
                format!("Payment of {amount} received. Your order has been placed!")
            }
        };
        Self {
            order_id,
            method,
            amount,
            message,
        }
    }
}
