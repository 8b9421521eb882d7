use pix_payments::domain::events::PaidEvent;
use rust_decimal_macros::dec;
use std::time::Duration;

mod common;

#[tokio::test]
async fn test_subscriber_before_confirmation_gets_one_event() {
    let fx = common::fixture();
    let payment = fx.lifecycle.create_payment(Some(dec!(12.34))).await.unwrap();
    let mut first = fx.hub.subscribe(payment.id);
    let mut second = fx.hub.subscribe(payment.id);

    let waiter = tokio::spawn(async move { first.paid().await });

    fx.lifecycle
        .confirm_payment(Some(&payment.bank_reference), Some(dec!(12.34)))
        .await
        .unwrap();

    let expected = PaidEvent {
        payment_id: payment.id,
    };
    assert_eq!(waiter.await.unwrap(), Some(expected));
    assert_eq!(second.try_paid(), Some(expected));
    assert_eq!(second.try_paid(), None);
}

#[tokio::test]
async fn test_subscriber_after_confirmation_gets_nothing() {
    let fx = common::fixture();
    let payment = fx.lifecycle.create_payment(Some(dec!(5))).await.unwrap();
    fx.lifecycle
        .confirm_payment(Some(&payment.bank_reference), Some(dec!(5)))
        .await
        .unwrap();

    let mut late = fx.hub.subscribe(payment.id);
    let received = tokio::time::timeout(Duration::from_secs(1), late.paid())
        .await
        .expect("late subscription should resolve immediately");
    assert_eq!(received, None);
}

#[tokio::test]
async fn test_rejected_confirmation_does_not_notify() {
    let fx = common::fixture();
    let payment = fx.lifecycle.create_payment(Some(dec!(5))).await.unwrap();
    let mut subscription = fx.hub.subscribe(payment.id);

    let _ = fx
        .lifecycle
        .confirm_payment(Some(&payment.bank_reference), Some(dec!(6)))
        .await;

    assert_eq!(subscription.try_paid(), None);
    assert_eq!(fx.hub.subscriber_count(payment.id), 1);
}

#[tokio::test]
async fn test_disconnected_subscriber_does_not_fail_confirmation() {
    let fx = common::fixture();
    let payment = fx.lifecycle.create_payment(Some(dec!(5))).await.unwrap();
    drop(fx.hub.subscribe(payment.id));

    let confirmed = fx
        .lifecycle
        .confirm_payment(Some(&payment.bank_reference), Some(dec!(5)))
        .await
        .unwrap();
    assert!(confirmed.paid);
}
