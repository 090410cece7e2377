use super::timers::SessionTimers;
use crate::config::MachineConfig;
use crate::domain::drink::Drink;
use crate::domain::event::MachineEvent;
use crate::domain::money::Money;
use crate::domain::ports::{InventoryLedgerBox, NotificationSinkBox};
use crate::domain::session::{
    CardPhase, PaymentMethod, PaymentSession, SessionEpoch, SessionState, TickOutcome,
};
use crate::error::{Result, VendingError};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// What a successful selection led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Purchase {
    /// Paid in cash; the drink was dispensed and `change` is still held.
    Dispensed { drink: Drink, change: Money },
    /// A card charge was submitted; the outcome is reported through the
    /// notification sink once the charge completes.
    Charging { drink: Drink },
}

/// Who asked for cash to be handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefundOrigin {
    /// The customer pressed the refund button; the machine resets afterwards.
    Customer,
    /// A card was inserted over a cash balance; the card session follows
    /// immediately, so no reset is scheduled.
    CardInserted,
    /// The customer pressed refund while a card charge was submitted; the
    /// charge's own reset step ends the session.
    ChargeInFlight,
}

/// Named delayed steps of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScheduledStep {
    /// The simulated card charge has come back.
    CompleteCharge { drink: String },
    /// Return to idle.
    Reset,
}

/// Point-in-time view of the machine, suitable for rendering or serializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineSnapshot {
    pub method: PaymentMethod,
    pub cash_balance: Money,
    pub card_seconds_remaining: u32,
    pub status: String,
    pub drinks: Vec<Drink>,
}

struct MachineState {
    session: PaymentSession,
    timers: SessionTimers,
    status: String,
}

struct Shared {
    config: MachineConfig,
    ledger: InventoryLedgerBox,
    sink: NotificationSinkBox,
    state: Mutex<MachineState>,
}

/// The vending machine controller.
///
/// Dispatches customer operations into the payment session, runs selections
/// against the inventory ledger, and drives timer-based work through
/// [`SessionTimers`]. Every public operation returns as soon as the state has
/// been updated; delayed outcomes arrive later through the notification sink.
///
/// Cloning is cheap and every clone controls the same machine.
#[derive(Clone)]
pub struct VendingMachine {
    shared: Arc<Shared>,
}

impl VendingMachine {
    /// Creates an idle machine.
    ///
    /// # Arguments
    ///
    /// * `config` - Timings and accepted denominations.
    /// * `ledger` - The pre-seeded inventory.
    /// * `sink` - Where status messages go.
    pub fn new(config: MachineConfig, ledger: InventoryLedgerBox, sink: NotificationSinkBox) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                ledger,
                sink,
                state: Mutex::new(MachineState {
                    session: PaymentSession::new(),
                    timers: SessionTimers::new(),
                    status: String::new(),
                }),
            }),
        }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.shared.config
    }

    /// Inserts a coin or bill and returns the new cash balance.
    pub async fn insert_cash(&self, amount: Money) -> Result<Money> {
        let mut st = self.shared.state.lock().await;
        let denominations = &self.shared.config.denominations;
        match st.session.insert_cash(amount, denominations) {
            Ok(balance) => {
                // A reset left over from an earlier transaction must not wipe
                // the new cash.
                st.timers.advance();
                info!(%amount, %balance, "cash accepted");
                self.announce(&mut st, format!("inserted total: {balance}"));
                Ok(balance)
            }
            Err(error) => self.reject(&mut st, error),
        }
    }

    /// Opens a card session, handing back any cash first.
    pub async fn insert_card(&self) -> Result<()> {
        let mut st = self.shared.state.lock().await;
        let seconds = self.shared.config.card_session_secs;
        let refunded = match st.session.begin_card(seconds) {
            Ok(refunded) => refunded,
            Err(error) => return self.reject(&mut st, error),
        };
        st.timers.advance();
        info!(seconds, "card session started");
        // The refund notice stays on display when cash was handed back.
        if refunded.is_zero() {
            self.announce(
                &mut st,
                format!("card accepted: {seconds} seconds to choose a drink"),
            );
        } else {
            self.settle_refund(&mut st, refunded, RefundOrigin::CardInserted);
        }
        self.start_countdown(&mut st);
        Ok(())
    }

    /// Attempts to buy `name` with the active payment method.
    pub async fn select_drink(&self, name: &str) -> Result<Purchase> {
        let mut st = self.shared.state.lock().await;
        if st.session.method() == PaymentMethod::None {
            return self.reject(&mut st, VendingError::PaymentMethodRequired);
        }
        let drink = match self.shared.ledger.get(name).await {
            Ok(drink) => drink,
            Err(error) => return self.reject(&mut st, error),
        };
        if !drink.in_stock() {
            return self.reject(
                &mut st,
                VendingError::OutOfStock {
                    drink: drink.name.clone(),
                },
            );
        }

        match st.session.state() {
            SessionState::Idle => self.reject(&mut st, VendingError::PaymentMethodRequired),
            SessionState::CashActive { .. } => {
                let change = match st.session.cash_change_for(drink.price) {
                    Ok(change) => change,
                    Err(error) => return self.reject(&mut st, error),
                };
                let sold = match self.shared.ledger.decrement(&drink.name).await {
                    Ok(sold) => sold,
                    Err(error) => return self.reject(&mut st, error),
                };
                st.session.settle_cash(change);
                info!(drink = %sold.name, price = %sold.price, %change, "cash sale");
                self.announce(
                    &mut st,
                    format!("{} dispensed, change: {change}", sold.name),
                );
                if change.is_zero() {
                    let delay = self.shared.config.reset_delay;
                    self.schedule(&mut st, delay, ScheduledStep::Reset);
                }
                Ok(Purchase::Dispensed {
                    drink: sold,
                    change,
                })
            }
            SessionState::CardActive { .. } => {
                if let Err(error) = st.session.begin_charge() {
                    return self.reject(&mut st, error);
                }
                // Stops the countdown and anything else issued for the
                // session before the charge.
                st.timers.advance();
                info!(drink = %drink.name, price = %drink.price, "card charge submitted");
                self.announce(&mut st, "processing card payment...".to_string());
                let delay = self.shared.config.charge_delay;
                self.schedule(
                    &mut st,
                    delay,
                    ScheduledStep::CompleteCharge {
                        drink: drink.name.clone(),
                    },
                );
                Ok(Purchase::Charging { drink })
            }
        }
    }

    /// Hands back the cash balance and schedules a return to idle.
    pub async fn refund(&self) -> Result<Money> {
        let mut st = self.shared.state.lock().await;
        let origin = match st.session.state() {
            SessionState::CardActive {
                phase: CardPhase::Charging | CardPhase::Settled,
                ..
            } => RefundOrigin::ChargeInFlight,
            SessionState::Idle
            | SessionState::CashActive { .. }
            | SessionState::CardActive { .. } => RefundOrigin::Customer,
        };
        let amount = st.session.take_refund();
        self.settle_refund(&mut st, amount, origin);
        Ok(amount)
    }

    /// Returns to idle immediately, dropping any scheduled work.
    pub async fn reset(&self) {
        let mut st = self.shared.state.lock().await;
        self.reset_locked(&mut st);
    }

    /// Whether `name` could be bought right now with the active payment
    /// method. Idle machines offer nothing.
    pub async fn is_available(&self, name: &str) -> Result<bool> {
        let st = self.shared.state.lock().await;
        let drink = self.shared.ledger.get(name).await?;
        Ok(match st.session.state() {
            SessionState::Idle => false,
            SessionState::CardActive {
                phase: CardPhase::Awaiting,
                ..
            } => drink.in_stock(),
            SessionState::CardActive { .. } => false,
            SessionState::CashActive { balance } => drink.in_stock() && balance >= drink.price,
        })
    }

    pub async fn session(&self) -> PaymentSession {
        self.shared.state.lock().await.session.clone()
    }

    pub async fn status(&self) -> String {
        self.shared.state.lock().await.status.clone()
    }

    pub async fn snapshot(&self) -> Result<MachineSnapshot> {
        let st = self.shared.state.lock().await;
        Ok(MachineSnapshot {
            method: st.session.method(),
            cash_balance: st.session.cash_balance(),
            card_seconds_remaining: st.session.card_seconds_remaining(),
            status: st.status.clone(),
            drinks: self.shared.ledger.all_drinks().await?,
        })
    }

    /// Feeds one customer event into the machine. `Wait` lets the clock run.
    pub async fn apply(&self, event: MachineEvent) -> Result<()> {
        match event {
            MachineEvent::InsertCash(amount) => self.insert_cash(amount).await.map(|_| ()),
            MachineEvent::InsertCard => self.insert_card().await,
            MachineEvent::SelectDrink(name) => self.select_drink(&name).await.map(|_| ()),
            MachineEvent::Refund => self.refund().await.map(|_| ()),
            MachineEvent::Wait(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        }
    }

    fn settle_refund(&self, st: &mut MachineState, amount: Money, origin: RefundOrigin) {
        if amount.is_zero() {
            self.announce(st, "nothing to refund".to_string());
        } else {
            info!(%amount, ?origin, "cash refunded");
            self.announce(st, format!("refunded {amount}"));
        }
        if origin == RefundOrigin::Customer {
            let delay = self.shared.config.reset_delay;
            self.schedule(st, delay, ScheduledStep::Reset);
        }
    }

    fn reset_locked(&self, st: &mut MachineState) {
        st.timers.advance();
        st.session.reset();
        info!("machine reset");
        self.announce(st, String::new());
    }

    fn start_countdown(&self, st: &mut MachineState) {
        let weak = Arc::downgrade(&self.shared);
        let period = self.shared.config.tick_interval;
        st.timers.start_tick(period, move |epoch| {
            let weak = weak.clone();
            async move {
                match upgrade(&weak) {
                    Some(machine) => machine.on_tick(epoch).await,
                    None => false,
                }
            }
        });
    }

    async fn on_tick(&self, epoch: SessionEpoch) -> bool {
        let mut st = self.shared.state.lock().await;
        if !st.timers.is_current(epoch) {
            debug!(epoch = epoch.value(), "stale tick ignored");
            return false;
        }
        match st.session.tick() {
            TickOutcome::Running(remaining) => {
                debug!(remaining, "card session tick");
                true
            }
            TickOutcome::Expired => {
                st.timers.advance();
                info!("card session expired");
                self.announce(&mut st, "card session expired".to_string());
                false
            }
            TickOutcome::Inactive => false,
        }
    }

    fn schedule(&self, st: &mut MachineState, delay: Duration, step: ScheduledStep) {
        let weak = Arc::downgrade(&self.shared);
        debug!(?step, ?delay, "step scheduled");
        st.timers.schedule(delay, move |epoch| async move {
            if let Some(machine) = upgrade(&weak) {
                machine.run_step(epoch, step).await;
            }
        });
    }

    async fn run_step(&self, epoch: SessionEpoch, step: ScheduledStep) {
        let mut st = self.shared.state.lock().await;
        if !st.timers.is_current(epoch) {
            debug!(?step, epoch = epoch.value(), "stale step ignored");
            return;
        }
        match step {
            ScheduledStep::CompleteCharge { drink } => {
                st.session.settle_charge();
                match self.shared.ledger.decrement(&drink).await {
                    Ok(sold) => {
                        info!(drink = %sold.name, "card charge approved");
                        self.announce(
                            &mut st,
                            format!("card payment approved: {} dispensed", sold.name),
                        );
                    }
                    Err(error) => {
                        warn!(%error, "card charge voided");
                        self.announce(
                            &mut st,
                            format!("card payment cancelled: {}", rejection_message(&error)),
                        );
                    }
                }
                let delay = self.shared.config.settle_delay;
                self.schedule(&mut st, delay, ScheduledStep::Reset);
            }
            ScheduledStep::Reset => self.reset_locked(&mut st),
        }
    }

    fn announce(&self, st: &mut MachineState, message: String) {
        self.shared.sink.notify(&message);
        st.status = message;
    }

    fn reject<T>(&self, st: &mut MachineState, error: VendingError) -> Result<T> {
        warn!(%error, "operation rejected");
        self.announce(st, rejection_message(&error));
        Err(error)
    }
}

fn upgrade(weak: &Weak<Shared>) -> Option<VendingMachine> {
    weak.upgrade().map(|shared| VendingMachine { shared })
}

fn rejection_message(error: &VendingError) -> String {
    match error {
        VendingError::InvalidDenomination { amount, kind } => {
            format!("invalid {kind} ({amount}), please insert another")
        }
        VendingError::PaymentMethodRequired => {
            "please choose a payment method (cash or card)".to_string()
        }
        VendingError::InsufficientFunds { .. } => {
            "insufficient balance, please insert more cash".to_string()
        }
        VendingError::OutOfStock { drink } => format!("{drink} is out of stock"),
        VendingError::CardSessionActive => {
            "a card session is active, cash cannot be accepted".to_string()
        }
        VendingError::TransactionInProgress => {
            "a card payment is already in progress".to_string()
        }
        VendingError::UnknownDrink { name } => format!("{name} is not sold here"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drink::default_catalog;
    use crate::infrastructure::in_memory::{InMemoryLedger, RecordingSink};

    fn machine() -> (VendingMachine, RecordingSink) {
        let sink = RecordingSink::new();
        let ledger = InMemoryLedger::new(default_catalog()).unwrap();
        let machine = VendingMachine::new(
            MachineConfig::default(),
            Box::new(ledger),
            Box::new(sink.clone()),
        );
        (machine, sink)
    }

    async fn stock_of(machine: &VendingMachine, name: &str) -> u32 {
        machine
            .snapshot()
            .await
            .unwrap()
            .drinks
            .into_iter()
            .find(|d| d.name == name)
            .unwrap()
            .stock
    }

    #[tokio::test(start_paused = true)]
    async fn test_cash_sale_keeps_change() {
        let (machine, sink) = machine();
        machine.insert_cash(Money::new(1000)).await.unwrap();
        machine.insert_cash(Money::new(500)).await.unwrap();

        let purchase = machine.select_drink("cola").await.unwrap();
        assert!(matches!(
            purchase,
            Purchase::Dispensed { change, .. } if change == Money::new(400)
        ));
        let session = machine.session().await;
        assert_eq!(session.method(), PaymentMethod::Cash);
        assert_eq!(session.cash_balance(), Money::new(400));
        assert_eq!(stock_of(&machine, "cola").await, 4);
        assert_eq!(
            sink.last().as_deref(),
            Some("cola dispensed, change: 400 won")
        );

        // Change is held until the customer asks for it.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(machine.session().await.cash_balance(), Money::new(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_change_resets_after_delay() {
        let (machine, _sink) = machine();
        machine.insert_cash(Money::new(500)).await.unwrap();
        machine.insert_cash(Money::new(100)).await.unwrap();
        machine.select_drink("water").await.unwrap();

        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert_eq!(machine.session().await.method(), PaymentMethod::Cash);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(machine.session().await.method(), PaymentMethod::None);
        assert_eq!(machine.status().await, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_without_payment() {
        let (machine, sink) = machine();
        let result = machine.select_drink("cola").await;
        assert!(matches!(result, Err(VendingError::PaymentMethodRequired)));
        assert_eq!(
            sink.last().as_deref(),
            Some("please choose a payment method (cash or card)")
        );
        assert_eq!(stock_of(&machine, "cola").await, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_card_charge_steps() {
        let (machine, sink) = machine();
        machine.insert_card().await.unwrap();
        let purchase = machine.select_drink("coffee").await.unwrap();
        assert!(matches!(purchase, Purchase::Charging { .. }));
        assert_eq!(sink.last().as_deref(), Some("processing card payment..."));
        assert_eq!(stock_of(&machine, "coffee").await, 1);

        // Charging
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(stock_of(&machine, "coffee").await, 0);
        assert_eq!(
            sink.last().as_deref(),
            Some("card payment approved: coffee dispensed")
        );
        assert_eq!(machine.session().await.method(), PaymentMethod::Card);

        // Settled -> Reset
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let session = machine.session().await;
        assert_eq!(session.method(), PaymentMethod::None);
        assert_eq!(session.card_seconds_remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_frozen_while_charging() {
        let (machine, _sink) = machine();
        machine.insert_card().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(machine.session().await.card_seconds_remaining(), 28);

        machine.select_drink("cola").await.unwrap();
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(machine.session().await.card_seconds_remaining(), 28);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_selection_while_charging_rejected() {
        let (machine, _sink) = machine();
        machine.insert_card().await.unwrap();
        machine.select_drink("cola").await.unwrap();
        let result = machine.select_drink("water").await;
        assert!(matches!(result, Err(VendingError::TransactionInProgress)));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(stock_of(&machine, "cola").await, 4);
        assert_eq!(stock_of(&machine, "water").await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_pending_charge() {
        let (machine, _sink) = machine();
        machine.insert_card().await.unwrap();
        machine.select_drink("cola").await.unwrap();
        machine.reset().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(stock_of(&machine, "cola").await, 5);
        assert_eq!(machine.session().await.method(), PaymentMethod::None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cash_after_refund_survives_pending_reset() {
        let (machine, _sink) = machine();
        machine.insert_cash(Money::new(1000)).await.unwrap();
        machine.refund().await.unwrap();
        machine.insert_cash(Money::new(500)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        let session = machine.session().await;
        assert_eq!(session.method(), PaymentMethod::Cash);
        assert_eq!(session.cash_balance(), Money::new(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_availability_by_method() {
        let (machine, _sink) = machine();
        assert!(!machine.is_available("water").await.unwrap());

        machine.insert_cash(Money::new(500)).await.unwrap();
        assert!(!machine.is_available("water").await.unwrap());
        machine.insert_cash(Money::new(100)).await.unwrap();
        assert!(machine.is_available("water").await.unwrap());

        machine.insert_card().await.unwrap();
        assert!(machine.is_available("cola").await.unwrap());

        machine.select_drink("cola").await.unwrap();
        assert!(!machine.is_available("water").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refund_notice_stays_when_card_inserted() {
        let (machine, sink) = machine();
        machine.insert_cash(Money::new(500)).await.unwrap();
        machine.insert_cash(Money::new(100)).await.unwrap();
        machine.insert_cash(Money::new(100)).await.unwrap();
        machine.insert_card().await.unwrap();

        assert_eq!(machine.status().await, "refunded 700 won");
        assert_eq!(sink.last().as_deref(), Some("refunded 700 won"));
        assert_eq!(machine.session().await.card_seconds_remaining(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_drink_rejected() {
        let (machine, sink) = machine();
        machine.insert_cash(Money::new(1000)).await.unwrap();
        let result = machine.select_drink("juice").await;
        assert!(matches!(result, Err(VendingError::UnknownDrink { .. })));
        assert_eq!(sink.last().as_deref(), Some("juice is not sold here"));
        assert_eq!(machine.session().await.cash_balance(), Money::new(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_machine_stops_timers() {
        let (machine, sink) = machine();
        machine.insert_card().await.unwrap();
        let before = sink.messages().len();
        drop(machine);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(sink.messages().len(), before);
    }
}
