//! Action engine for balance queries, mining and daily claims.
//!
//! Each operation follows the same path:
//! - Validate the argument (no ledger access on failure)
//! - Take the user's lock
//! - Check the relevant cooldown
//! - Apply the change inside one store update, committed only on success

use crate::account;
use crate::cooldown::{can_act_now, CooldownDecision, MineCooldowns};
use crate::guard::UserLocks;
use crate::journal::{EventKind, EventSink, LedgerEvent};
use crate::store::{Change, LedgerStore};
use crate::{
    Action, BalanceSnapshot, Clock, DailyOutcome, EconomyConfig, MineOutcome, Outcome, Request,
    Resource, Result, SystemClock,
};
use chrono::{DateTime, Utc};

/// The ledger engine serving requests for all users
pub struct Economy<S, C = SystemClock> {
    store: S,
    clock: C,
    rules: EconomyConfig,
    locks: UserLocks,
    mine_cooldowns: MineCooldowns,
    journal: Option<Box<dyn EventSink>>,
}

impl<S: LedgerStore> Economy<S, SystemClock> {
    pub fn new(store: S, rules: EconomyConfig) -> Self {
        Self::with_clock(store, SystemClock, rules)
    }
}

impl<S: LedgerStore, C: Clock> Economy<S, C> {
    pub fn with_clock(store: S, clock: C, rules: EconomyConfig) -> Self {
        Self {
            store,
            clock,
            rules,
            locks: UserLocks::new(),
            mine_cooldowns: MineCooldowns::new(),
            journal: None,
        }
    }

    /// Record every committed change to `sink`
    pub fn with_journal(mut self, sink: impl EventSink + 'static) -> Self {
        self.journal = Some(Box::new(sink));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn rules(&self) -> &EconomyConfig {
        &self.rules
    }

    /// Handle a request from the dispatch front end
    ///
    /// Never fails: errors are logged and reported as [`Outcome::Failed`].
    pub fn handle(&self, request: &Request) -> Outcome {
        let Some(action) = Action::parse(&request.action) else {
            return Outcome::UnknownAction {
                name: request.action.clone(),
            };
        };

        let argument = request
            .argument
            .as_deref()
            .map(str::trim)
            .filter(|arg| !arg.is_empty());

        let result = match (action, argument) {
            (Action::Balance, _) => self.query_balance(&request.user_id).map(Outcome::Balance),
            (Action::QuickMine, Some(arg)) => {
                self.quick_mine(&request.user_id, arg).map(Outcome::Mine)
            }
            (Action::Daily, Some(arg)) => {
                self.claim_daily(&request.user_id, arg).map(Outcome::Daily)
            }
            (action, None) => return Outcome::MissingArgument { action },
        };

        result.unwrap_or_else(|e| {
            tracing::error!(
                "{} for user {} failed: {}",
                action.as_str(),
                request.user_id,
                e
            );
            Outcome::Failed
        })
    }

    /// Read the user's balances, opening the account if needed
    pub fn query_balance(&self, user_id: &str) -> Result<BalanceSnapshot> {
        let starting_gold = self.rules.starting_gold;

        self.locks.with_user(user_id, || -> Result<BalanceSnapshot> {
            let now = self.clock.now();
            let (snapshot, created) = self.store.update(|ledger| {
                let (account, created) = account::ensure(ledger, user_id, starting_gold);
                let snapshot = BalanceSnapshot::from(&*account);
                Ok(commit_if(created, (snapshot, created)))
            })?;

            if created {
                self.journal(&[opened(user_id, now, starting_gold)]);
            }
            Ok(snapshot)
        })
    }

    /// Mine the configured amount of a resource, subject to the mining cooldown
    pub fn quick_mine(&self, user_id: &str, argument: &str) -> Result<MineOutcome> {
        let Ok(resource) = argument.parse::<Resource>() else {
            return Ok(MineOutcome::InvalidResource {
                argument: argument.to_string(),
            });
        };
        let window = self.rules.mine_cooldown();
        let amount = u64::from(self.rules.mine_amount);
        let starting_gold = self.rules.starting_gold;

        self.locks.with_user(user_id, || -> Result<MineOutcome> {
            let now = self.clock.now();
            if let CooldownDecision::Denied { remaining } =
                self.mine_cooldowns.check(user_id, now, window)
            {
                tracing::debug!(
                    "Mining denied for user {}: {}s remaining",
                    user_id,
                    remaining.num_seconds()
                );
                return Ok(MineOutcome::CooldownActive { remaining });
            }

            let (new_total, created) = self.store.update(|ledger| {
                let (account, created) = account::ensure(ledger, user_id, starting_gold);
                let new_total =
                    account::apply_delta(account, resource.into(), i64::from(self.rules.mine_amount))?;
                Ok(Change::Commit((new_total, created)))
            })?;

            // The cooldown only starts once the reward is durable
            self.mine_cooldowns.record(user_id, now, window);
            tracing::info!("User {} mined {} {} (total {})", user_id, amount, resource, new_total);

            let mined = LedgerEvent::new(
                user_id,
                now,
                EventKind::Mined {
                    resource,
                    amount,
                    new_total,
                },
            );
            if created {
                self.journal(&[opened(user_id, now, starting_gold), mined]);
            } else {
                self.journal(&[mined]);
            }

            Ok(MineOutcome::Mined {
                resource,
                amount,
                new_total,
            })
        })
    }

    /// Claim the daily grant of a resource, at most once per daily window
    ///
    /// The grant and the claim timestamp are saved together.
    pub fn claim_daily(&self, user_id: &str, argument: &str) -> Result<DailyOutcome> {
        let Ok(resource) = argument.parse::<Resource>() else {
            return Ok(DailyOutcome::InvalidResource {
                argument: argument.to_string(),
            });
        };
        let window = self.rules.daily_cooldown();
        let amount = u64::from(self.rules.daily_amount);
        let starting_gold = self.rules.starting_gold;

        self.locks.with_user(user_id, || -> Result<DailyOutcome> {
            let now = self.clock.now();
            let (outcome, created) = self.store.update(|ledger| {
                let (account, created) = account::ensure(ledger, user_id, starting_gold);

                if let CooldownDecision::Denied { remaining } =
                    can_act_now(account.last_daily, now, window)
                {
                    let available_at = now
                        .checked_add_signed(remaining)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC);
                    let outcome = DailyOutcome::AlreadyClaimed { available_at };
                    return Ok(commit_if(created, (outcome, created)));
                }

                let new_total =
                    account::apply_delta(account, resource.into(), i64::from(self.rules.daily_amount))?;
                account::record_daily_claim(account, now);
                let outcome = DailyOutcome::Claimed {
                    resource,
                    amount,
                    new_total,
                };
                Ok(Change::Commit((outcome, created)))
            })?;

            let mut events = Vec::with_capacity(2);
            if created {
                events.push(opened(user_id, now, starting_gold));
            }
            match &outcome {
                DailyOutcome::Claimed { new_total, .. } => {
                    tracing::info!(
                        "User {} claimed daily {} {} (total {})",
                        user_id,
                        amount,
                        resource,
                        new_total
                    );
                    events.push(LedgerEvent::new(
                        user_id,
                        now,
                        EventKind::DailyClaimed {
                            resource,
                            amount,
                            new_total: *new_total,
                        },
                    ));
                }
                DailyOutcome::AlreadyClaimed { available_at } => {
                    tracing::debug!(
                        "Daily claim denied for user {} until {}",
                        user_id,
                        available_at
                    );
                }
                DailyOutcome::InvalidResource { .. } => {}
            }
            self.journal(&events);

            Ok(outcome)
        })
    }

    fn journal(&self, events: &[LedgerEvent]) {
        let Some(sink) = &self.journal else {
            return;
        };
        for event in events {
            if let Err(e) = sink.append(event) {
                tracing::warn!("Failed to journal event {}: {}", event.id, e);
            }
        }
    }
}

fn commit_if<T>(changed: bool, value: T) -> Change<T> {
    if changed {
        Change::Commit(value)
    } else {
        Change::Discard(value)
    }
}

fn opened(user_id: &str, at: DateTime<Utc>, starting_gold: u64) -> LedgerEvent {
    LedgerEvent::new(user_id, at, EventKind::AccountOpened { starting_gold })
}
