//! Wiring tests over the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use aggregate_store::Versioned;
use app::{Backend, Config, Services, reactor, walkthrough};
use common::AggregateId;
use domain::notification::{NotificationChannel, NotificationSender, NotificationStatus, RecordingSender};
use domain::order::OrderEvent;
use domain::user::PlainTextHasher;
use domain::{BroadcastDispatcher, Event, Money, OrderStatus, RecordingDispatcher};

fn services_with(
    dispatcher: Arc<dyn domain::EventDispatcher>,
    sender: &RecordingSender,
) -> Services {
    Services::new(
        Backend::in_memory(),
        &Config::default(),
        Arc::new(PlainTextHasher),
        dispatcher,
        vec![Arc::new(sender.clone()) as Arc<dyn NotificationSender>],
    )
}

#[tokio::test]
async fn walkthrough_drives_every_service() {
    let dispatcher = RecordingDispatcher::new();
    let sender = RecordingSender::new(NotificationChannel::Email);
    let services = services_with(Arc::new(dispatcher.clone()), &sender);

    let summary = walkthrough::run(&services).await.unwrap();

    assert_eq!(summary.order_total, Money::from_minor(150_000));
    assert_eq!(summary.balance, Money::from_minor(50_000));
    assert_eq!(summary.stock_left, 9);

    let order = services.orders.get_order(summary.order_id).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Paid);
    assert_eq!(
        services.wallets.get_balance(summary.user_id).await.unwrap(),
        Money::from_minor(50_000)
    );

    let types = dispatcher.event_types().await;
    assert_eq!(types.iter().filter(|t| **t == "FundsDeposited").count(), 1);
    assert!(types.contains(&"FundsWithdrawn"));
    assert_eq!(sender.sent().await.len(), 1);
}

#[tokio::test]
async fn wallet_currency_comes_from_config() {
    let config = Config {
        wallet_currency: "COINS".to_string(),
        ..Config::default()
    };
    let services = Services::new(
        Backend::in_memory(),
        &config,
        Arc::new(PlainTextHasher),
        Arc::new(RecordingDispatcher::new()),
        app::default_senders(),
    );

    let wallet = services.wallets.create_wallet(AggregateId::new()).await.unwrap();
    assert_eq!(wallet.currency(), "COINS");
}

#[tokio::test]
async fn reactor_sends_welcome_email_on_registration() {
    let broadcast = BroadcastDispatcher::new();
    let sender = RecordingSender::new(NotificationChannel::Email);
    let services = services_with(app::default_dispatcher(&broadcast), &sender);
    let handle = reactor::spawn(broadcast.subscribe(), Arc::clone(&services.notifications));

    services
        .users
        .register_new_user("Grace", "Hopper", "grace@example.com", "cobol-rules")
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while sender.sent().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("welcome email was not sent");

    let sent = sender.sent().await;
    assert_eq!(sent[0].recipient, "grace@example.com");
    assert_eq!(sent[0].subject, "Welcome to our store!");
    assert_eq!(sent[0].body, "Hi Grace, thanks for joining us!");

    handle.abort();
}

#[tokio::test]
async fn react_ignores_unrelated_events() {
    let sender = RecordingSender::new(NotificationChannel::Email);
    let services = services_with(Arc::new(RecordingDispatcher::new()), &sender);

    let event = Event::Order(OrderEvent::OrderCancelled {
        order_id: AggregateId::new(),
        reason: "test".to_string(),
    });
    let outcome = reactor::react(&services.notifications, &event).await.unwrap();

    assert!(outcome.is_none());
    assert!(sender.sent().await.is_empty());
}

#[tokio::test]
async fn react_records_welcome_notification() {
    let sender = RecordingSender::new(NotificationChannel::Email);
    let services = services_with(Arc::new(RecordingDispatcher::new()), &sender);
    let user_id = AggregateId::new();

    let event = Event::User(domain::UserEvent::UserRegistered {
        user_id,
        email: "ada@example.com".to_string(),
        first_name: "Ada".to_string(),
    });
    let notification = reactor::react(&services.notifications, &event)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(notification.user_id(), user_id);
    assert_eq!(notification.status(), NotificationStatus::Sent);
    let stored = services
        .notifications
        .get_notification(notification.id())
        .await
        .unwrap();
    assert_eq!(stored, notification);
}

#[test]
fn default_senders_cover_every_channel() {
    let channels: Vec<_> = app::default_senders().iter().map(|s| s.channel()).collect();
    assert_eq!(
        channels,
        vec![
            NotificationChannel::Email,
            NotificationChannel::Sms,
            NotificationChannel::Push
        ]
    );
}
