mod common;

use common::{machine, stock_of};
use std::time::Duration;
use vendomat::domain::session::PaymentMethod;

#[tokio::test(start_paused = true)]
async fn test_card_session_expires_after_thirty_ticks() {
    let (machine, sink) = machine();
    machine.insert_card().await.unwrap();

    tokio::time::sleep(Duration::from_millis(29_500)).await;
    let session = machine.session().await;
    assert_eq!(session.method(), PaymentMethod::Card);
    assert_eq!(session.card_seconds_remaining(), 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    let session = machine.session().await;
    assert_eq!(session.method(), PaymentMethod::None);
    assert_eq!(session.card_seconds_remaining(), 0);
    assert_eq!(sink.last().as_deref(), Some("card session expired"));
    assert_eq!(machine.status().await, "card session expired");
}

#[tokio::test(start_paused = true)]
async fn test_countdown_decrements_each_second() {
    let (machine, _sink) = machine();
    machine.insert_card().await.unwrap();

    // Observe halfway between ticks.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(machine.session().await.card_seconds_remaining(), 30);
    for expected in (25..30).rev() {
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(machine.session().await.card_seconds_remaining(), expected);
    }
}

#[tokio::test(start_paused = true)]
async fn test_reinserting_card_restarts_window() {
    let (machine, sink) = machine();
    machine.insert_card().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20_500)).await;
    assert_eq!(machine.session().await.card_seconds_remaining(), 10);

    machine.insert_card().await.unwrap();
    assert_eq!(machine.session().await.card_seconds_remaining(), 30);

    // Only the new countdown runs: one tick per second, no double decrement.
    tokio::time::sleep(Duration::from_millis(15_200)).await;
    assert_eq!(machine.session().await.card_seconds_remaining(), 15);
    assert!(!sink.messages().contains(&"card session expired".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_stale_tick_does_not_touch_new_session() {
    let (machine, _sink) = machine();
    machine.insert_card().await.unwrap();
    tokio::time::sleep(Duration::from_millis(5_500)).await;

    machine.reset().await;
    machine.insert_card().await.unwrap();
    tokio::time::sleep(Duration::from_millis(26_200)).await;

    // 26 ticks of the new session, none left over from the old one.
    assert_eq!(machine.session().await.card_seconds_remaining(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_expired_session_refuses_selection() {
    let (machine, _sink) = machine();
    machine.insert_card().await.unwrap();
    tokio::time::sleep(Duration::from_millis(30_500)).await;

    assert!(machine.select_drink("cola").await.is_err());
    assert_eq!(stock_of(&machine, "cola").await, 5);
    assert_eq!(machine.session().await.method(), PaymentMethod::None);
}

#[tokio::test(start_paused = true)]
async fn test_charge_in_flight_survives_countdown() {
    let (machine, sink) = machine();
    machine.insert_card().await.unwrap();
    tokio::time::sleep(Duration::from_millis(29_500)).await;
    machine.select_drink("cola").await.unwrap();

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(stock_of(&machine, "cola").await, 4);
    assert!(!sink.messages().contains(&"card session expired".to_string()));
}
