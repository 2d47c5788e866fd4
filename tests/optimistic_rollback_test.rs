mod common;

use agricart::application::cart_service::CartService;
use agricart::domain::product::ProductRef;
use agricart::domain::session::SessionContext;
use agricart::error::{ApiError, CartError};
use common::{GatedCartApi, Harness, account, fast_calls};
use std::sync::Arc;

#[tokio::test]
async fn test_failed_quantity_change_rolls_back_display() {
    let h = Harness::new();
    let rice = ProductRef::standard("rice");
    h.api.seed("tok-1", &rice, 3).await;

    let gated = Arc::new(GatedCartApi::new(h.api.clone()));
    let (arrived, release) = (gated.arrived.clone(), gated.release.clone());
    let mut service = CartService::new(
        SessionContext::authenticated(account("tok-1")),
        h.local.clone(),
        gated,
        h.catalog.clone(),
        fast_calls(),
    );
    service.refresh().await.unwrap();
    let display = service.subscribe();

    let (result, in_flight) = tokio::join!(service.set_quantity(&rice, 5), async {
        arrived.notified().await;
        let shown = display.borrow().get(&rice).map(|item| item.quantity);
        release.notify_one();
        shown
    });

    assert_eq!(in_flight, Some(5), "optimistic value shown while the call is pending");
    assert!(matches!(
        result,
        Err(CartError::Api(ApiError::Network(_)))
    ));
    assert_eq!(service.cart().get(&rice).unwrap().quantity, 3);
    assert_eq!(display.borrow().get(&rice).unwrap().quantity, 3);
    assert!(service.session().account().is_some());
}

#[tokio::test]
async fn test_unauthorized_write_falls_back_to_anonymous_cart() {
    let h = Harness::new();
    let rice = ProductRef::standard("rice");
    h.api.seed("tok-1", &rice, 3).await;

    let mut anonymous = h.cart_service(SessionContext::anonymous());
    anonymous
        .add_item(&ProductRef::waste("husk"), 4)
        .await
        .unwrap();

    let mut service = h.cart_service(SessionContext::authenticated(account("tok-1")));
    service.refresh().await.unwrap();
    h.api.revoke("tok-1");

    let result = service.remove_item(&rice).await;

    assert!(result.unwrap_err().is_unauthorized());
    assert!(service.session().account().is_none());
    let shown = service.cart();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown.get(&ProductRef::waste("husk")).unwrap().quantity, 4);
}
