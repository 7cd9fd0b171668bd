//! Raise Lifecycle
//!
//! Controller-gated transitions: finalize after the window closes,
//! cancel strictly before it opens, settle the custody balance with a
//! basis-points fee split, and hand the controller capability on.
//!
//! # Invariants
//! - Only the current controller can drive a transition
//! - `cancel` implies `finalize`: both flags set, settlement blocked
//! - `settle` pays the balance actually held, never the admission
//!   counter, so a repeat settle pays the zero that remains

use lib_types::{Address, Amount, Timestamp};

use crate::config::FEE_SCALE_BPS;
use crate::errors::{RaiseError, RaiseResult};
use crate::events::RaiseEvent;
use crate::ledger::RaiseLedger;

impl RaiseLedger {
    /// Close the raise to contributions after its window has ended
    ///
    /// Idempotent: a repeat call on an already closed raise is a no-op
    /// and returns no event, so hosts can retry without bookkeeping.
    pub fn finalize(&self, caller: Address, now: Timestamp) -> RaiseResult<Option<RaiseEvent>> {
        let cfg = &self.inner.config;
        let mut state = self.inner.state.lock();

        if state.entered {
            return Err(RaiseError::ReentrantCall);
        }
        if state.controller != caller {
            return Err(RaiseError::NotController { caller });
        }
        if state.finalized {
            return Ok(None);
        }
        if now < cfg.end_time {
            return Err(RaiseError::NotEnded {
                now,
                end_time: cfg.end_time,
            });
        }

        state.finalized = true;

        tracing::info!(
            "Raise {:?}: finalized at {} with {} payment units accepted",
            self.inner.raise_id,
            now,
            state.total_accepted
        );

        Ok(Some(RaiseEvent::Finalized {
            raise_id: self.inner.raise_id,
            total_accepted: state.total_accepted,
            timestamp: now,
        }))
    }

    /// Abort the raise before its presale window opens
    ///
    /// Terminal: marks the raise both finalized and cancelled, which
    /// blocks contributions and settlement alike. Nothing was collected
    /// yet, so there is nothing to refund.
    pub fn cancel(&self, caller: Address, now: Timestamp) -> RaiseResult<RaiseEvent> {
        let cfg = &self.inner.config;
        let mut state = self.inner.state.lock();

        if state.entered {
            return Err(RaiseError::ReentrantCall);
        }
        if state.controller != caller {
            return Err(RaiseError::NotController { caller });
        }
        if state.finalized {
            return Err(RaiseError::AlreadyClosed);
        }
        if now >= cfg.presale_start {
            return Err(RaiseError::CancelWindowPassed {
                now,
                presale_start: cfg.presale_start,
            });
        }

        state.finalized = true;
        state.cancelled = true;

        tracing::info!("Raise {:?}: cancelled at {}", self.inner.raise_id, now);

        Ok(RaiseEvent::Cancelled {
            raise_id: self.inner.raise_id,
            timestamp: now,
        })
    }

    /// Pay out the custody balance after a normal close
    ///
    /// The fee is `floor(held * fee_bps / 10_000)` of the balance the
    /// custody account actually holds; the remainder goes to the
    /// beneficiary. Zero-valued transfers are skipped, and an empty
    /// custody account settles to a zero-valued record rather than an
    /// error.
    pub fn settle(&self, caller: Address, now: Timestamp) -> RaiseResult<RaiseEvent> {
        let cfg = &self.inner.config;

        {
            let mut state = self.inner.state.lock();

            if state.entered {
                return Err(RaiseError::ReentrantCall);
            }
            if state.controller != caller {
                return Err(RaiseError::NotController { caller });
            }
            if !state.finalized || state.cancelled {
                return Err(RaiseError::NotSettleable);
            }

            state.entered = true;
        }

        let held = self
            .inner
            .vault
            .balance_of(&cfg.payment_asset, &self.inner.custody);

        if held == 0 {
            self.inner.state.lock().entered = false;
            tracing::info!("Raise {:?}: settled with nothing held", self.inner.raise_id);
            return Ok(RaiseEvent::Settled {
                raise_id: self.inner.raise_id,
                total_held: 0,
                fee: 0,
                payout: 0,
                timestamp: now,
            });
        }

        let split = split_fee(held, cfg.fee_bps as Amount);

        let transfers = split.and_then(|(fee, payout)| {
            if fee > 0 {
                self.inner
                    .vault
                    .credit(&cfg.payment_asset, &self.inner.custody, &cfg.fee_recipient, fee)?;
            }
            if payout > 0 {
                self.inner
                    .vault
                    .credit(&cfg.payment_asset, &self.inner.custody, &cfg.beneficiary, payout)?;
            }
            Ok((fee, payout))
        });

        self.inner.state.lock().entered = false;
        let (fee, payout) = transfers?;

        tracing::info!(
            "Raise {:?}: settled {} held, fee {}, payout {}",
            self.inner.raise_id,
            held,
            fee,
            payout
        );

        Ok(RaiseEvent::Settled {
            raise_id: self.inner.raise_id,
            total_held: held,
            fee,
            payout,
            timestamp: now,
        })
    }

    /// Hand the controller capability to a new address
    ///
    /// Allowed in any phase. The zero address is rejected so control
    /// can never be burned by accident.
    pub fn transfer_control(
        &self,
        caller: Address,
        new_controller: Address,
        now: Timestamp,
    ) -> RaiseResult<RaiseEvent> {
        if new_controller.is_zero() {
            return Err(RaiseError::ZeroAddress("new_controller"));
        }

        let mut state = self.inner.state.lock();

        if state.entered {
            return Err(RaiseError::ReentrantCall);
        }
        if state.controller != caller {
            return Err(RaiseError::NotController { caller });
        }

        let previous = state.controller;
        state.controller = new_controller;

        tracing::info!(
            "Raise {:?}: control moved from {:?} to {:?}",
            self.inner.raise_id,
            previous,
            new_controller
        );

        Ok(RaiseEvent::ControlTransferred {
            raise_id: self.inner.raise_id,
            previous,
            new_controller,
            timestamp: now,
        })
    }
}

/// Split a held balance into (fee, payout) at `fee_bps` basis points
fn split_fee(held: Amount, fee_bps: Amount) -> RaiseResult<(Amount, Amount)> {
    let fee = held
        .checked_mul(fee_bps)
        .ok_or(RaiseError::Overflow)?
        / FEE_SCALE_BPS as Amount;
    Ok((fee, held - fee))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::RaiseConfig;
    use crate::ledger::Phase;
    use lib_assets::{AssetVault, InMemoryVault};
    use lib_types::{AllowlistDigest, AssetId};

    fn addr(id: u8) -> Address {
        Address::new([id; 32])
    }

    fn asset(id: u8) -> AssetId {
        AssetId::new([id; 32])
    }

    /// Window [1_000, 3_000), public from 2_000. Price 1 so payment
    /// units equal sale units, keeping the fee arithmetic visible.
    fn base_config() -> RaiseConfig {
        RaiseConfig {
            sale_asset: asset(1),
            payment_asset: asset(2),
            price: 1,
            presale_start: 1_000,
            public_sale_start: 2_000,
            end_time: 3_000,
            allowlist_digest: AllowlistDigest::EMPTY,
            beneficiary: addr(10),
            fee_recipient: addr(11),
            fee_bps: 500,
            hard_cap: 1_000_000,
            min_allocation: 10,
            max_allocation: 100_000,
        }
    }

    fn controller() -> Address {
        addr(10)
    }

    fn open_with_funds(
        cfg: RaiseConfig,
        funded: &[(Address, Amount)],
    ) -> (RaiseLedger, Arc<InMemoryVault>) {
        let vault = Arc::new(InMemoryVault::new());
        vault.register_asset(cfg.sale_asset, 1);
        vault.register_asset(cfg.payment_asset, 1);
        for (account, amount) in funded {
            vault
                .deposit(&cfg.payment_asset, account, *amount)
                .expect("Failed to fund account");
        }
        let ledger = RaiseLedger::open(cfg, vault.clone(), 500).expect("Failed to open raise");
        (ledger, vault)
    }

    #[test]
    fn test_finalize_after_end() {
        let contributor = addr(1);
        let (ledger, _) = open_with_funds(base_config(), &[(contributor, 10_000)]);
        ledger
            .contribute(contributor, 1_000, &[], 2_500)
            .expect("Contribution should be admitted");

        let event = ledger
            .finalize(controller(), 3_000)
            .expect("Finalize should succeed at end_time")
            .expect("First finalize should emit an event");

        assert_eq!(
            event,
            RaiseEvent::Finalized {
                raise_id: ledger.raise_id(),
                total_accepted: 1_000,
                timestamp: 3_000,
            }
        );
        assert!(ledger.is_finalized());
        assert!(!ledger.is_cancelled());
        assert_eq!(ledger.phase(3_000), Phase::Finalized);
    }

    #[test]
    fn test_finalize_before_end_rejected() {
        let (ledger, _) = open_with_funds(base_config(), &[]);

        let result = ledger.finalize(controller(), 2_999);
        assert_eq!(
            result.err(),
            Some(RaiseError::NotEnded {
                now: 2_999,
                end_time: 3_000,
            })
        );
        assert!(!ledger.is_finalized());
    }

    #[test]
    fn test_finalize_requires_controller() {
        let (ledger, _) = open_with_funds(base_config(), &[]);

        let result = ledger.finalize(addr(99), 3_000);
        assert_eq!(
            result.err(),
            Some(RaiseError::NotController { caller: addr(99) })
        );
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let (ledger, _) = open_with_funds(base_config(), &[]);

        let first = ledger.finalize(controller(), 3_000).expect("First finalize");
        assert!(first.is_some());

        let second = ledger.finalize(controller(), 3_500).expect("Repeat finalize");
        assert_eq!(second, None);
    }

    #[test]
    fn test_contributions_blocked_after_finalize() {
        // end_time passes, finalize, then a contributor shows up with a
        // clock still inside the window
        let contributor = addr(1);
        let (ledger, _) = open_with_funds(base_config(), &[(contributor, 10_000)]);

        ledger.finalize(controller(), 3_000).expect("Finalize");

        let result = ledger.contribute(contributor, 100, &[], 2_500);
        assert_eq!(result.err(), Some(RaiseError::Closed));
    }

    #[test]
    fn test_cancel_before_presale() {
        let (ledger, _) = open_with_funds(base_config(), &[]);

        let event = ledger
            .cancel(controller(), 999)
            .expect("Cancel should succeed before presale_start");

        assert_eq!(
            event,
            RaiseEvent::Cancelled {
                raise_id: ledger.raise_id(),
                timestamp: 999,
            }
        );
        assert!(ledger.is_finalized());
        assert!(ledger.is_cancelled());
        assert_eq!(ledger.phase(999), Phase::Cancelled);
        // Cancellation wins over every later clock reading
        assert_eq!(ledger.phase(2_500), Phase::Cancelled);
    }

    #[test]
    fn test_cancel_window_is_exclusive() {
        let (ledger, _) = open_with_funds(base_config(), &[]);

        // Exactly at presale_start is already too late
        let result = ledger.cancel(controller(), 1_000);
        assert_eq!(
            result.err(),
            Some(RaiseError::CancelWindowPassed {
                now: 1_000,
                presale_start: 1_000,
            })
        );
    }

    #[test]
    fn test_cancel_after_finalize_rejected() {
        let (ledger, _) = open_with_funds(base_config(), &[]);
        ledger.finalize(controller(), 3_000).expect("Finalize");

        let result = ledger.cancel(controller(), 500);
        assert_eq!(result.err(), Some(RaiseError::AlreadyClosed));
    }

    #[test]
    fn test_double_cancel_rejected() {
        let (ledger, _) = open_with_funds(base_config(), &[]);
        ledger.cancel(controller(), 500).expect("First cancel");

        let result = ledger.cancel(controller(), 600);
        assert_eq!(result.err(), Some(RaiseError::AlreadyClosed));
    }

    #[test]
    fn test_settle_splits_fee() {
        let contributor = addr(1);
        let (ledger, vault) = open_with_funds(base_config(), &[(contributor, 10_000)]);
        ledger
            .contribute(contributor, 1_000, &[], 2_500)
            .expect("Contribution should be admitted");
        ledger.finalize(controller(), 3_000).expect("Finalize");

        let event = ledger
            .settle(controller(), 3_100)
            .expect("Settle should succeed");

        // 500 bps of 1_000 is exactly 50
        assert_eq!(
            event,
            RaiseEvent::Settled {
                raise_id: ledger.raise_id(),
                total_held: 1_000,
                fee: 50,
                payout: 950,
                timestamp: 3_100,
            }
        );
        assert_eq!(vault.balance_of(&asset(2), &addr(11)), 50);
        assert_eq!(vault.balance_of(&asset(2), &addr(10)), 950);
        assert_eq!(vault.balance_of(&asset(2), &ledger.custody_account()), 0);
    }

    #[test]
    fn test_settle_fee_rounds_down() {
        let contributor = addr(1);
        let (ledger, vault) = open_with_funds(base_config(), &[(contributor, 10_000)]);
        ledger
            .contribute(contributor, 1_001, &[], 2_500)
            .expect("Contribution should be admitted");
        ledger.finalize(controller(), 3_000).expect("Finalize");

        let event = ledger
            .settle(controller(), 3_100)
            .expect("Settle should succeed");

        // floor(1_001 * 500 / 10_000) = 50; the odd unit goes to the payout
        match event {
            RaiseEvent::Settled {
                total_held,
                fee,
                payout,
                ..
            } => {
                assert_eq!(total_held, 1_001);
                assert_eq!(fee, 50);
                assert_eq!(payout, 951);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
        assert_eq!(vault.balance_of(&asset(2), &addr(11)), 50);
        assert_eq!(vault.balance_of(&asset(2), &addr(10)), 951);
    }

    #[test]
    fn test_settle_skips_zero_fee_transfer() {
        let contributor = addr(1);
        let mut cfg = base_config();
        cfg.fee_bps = 0;
        let (ledger, vault) = open_with_funds(cfg, &[(contributor, 10_000)]);
        ledger
            .contribute(contributor, 1_000, &[], 2_500)
            .expect("Contribution should be admitted");
        ledger.finalize(controller(), 3_000).expect("Finalize");

        let event = ledger
            .settle(controller(), 3_100)
            .expect("Zero fee should not be transferred");

        match event {
            RaiseEvent::Settled { fee, payout, .. } => {
                assert_eq!(fee, 0);
                assert_eq!(payout, 1_000);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
        assert_eq!(vault.balance_of(&asset(2), &addr(11)), 0);
        assert_eq!(vault.balance_of(&asset(2), &addr(10)), 1_000);
    }

    #[test]
    fn test_settle_full_fee_skips_payout() {
        let contributor = addr(1);
        let mut cfg = base_config();
        cfg.fee_bps = 10_000;
        let (ledger, vault) = open_with_funds(cfg, &[(contributor, 10_000)]);
        ledger
            .contribute(contributor, 1_000, &[], 2_500)
            .expect("Contribution should be admitted");
        ledger.finalize(controller(), 3_000).expect("Finalize");

        let event = ledger
            .settle(controller(), 3_100)
            .expect("Full fee settle should succeed");

        match event {
            RaiseEvent::Settled { fee, payout, .. } => {
                assert_eq!(fee, 1_000);
                assert_eq!(payout, 0);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
        assert_eq!(vault.balance_of(&asset(2), &addr(11)), 1_000);
        assert_eq!(vault.balance_of(&asset(2), &addr(10)), 0);
    }

    #[test]
    fn test_settle_requires_finalized() {
        let (ledger, _) = open_with_funds(base_config(), &[]);

        let result = ledger.settle(controller(), 3_100);
        assert_eq!(result.err(), Some(RaiseError::NotSettleable));
    }

    #[test]
    fn test_settle_blocked_after_cancel() {
        let (ledger, _) = open_with_funds(base_config(), &[]);
        ledger.cancel(controller(), 500).expect("Cancel");

        // Cancelled raises are finalized but never settleable
        let result = ledger.settle(controller(), 3_100);
        assert_eq!(result.err(), Some(RaiseError::NotSettleable));
    }

    #[test]
    fn test_settle_requires_controller() {
        let (ledger, _) = open_with_funds(base_config(), &[]);
        ledger.finalize(controller(), 3_000).expect("Finalize");

        let result = ledger.settle(addr(99), 3_100);
        assert_eq!(
            result.err(),
            Some(RaiseError::NotController { caller: addr(99) })
        );
    }

    #[test]
    fn test_double_settle_pays_zero() {
        let contributor = addr(1);
        let (ledger, vault) = open_with_funds(base_config(), &[(contributor, 10_000)]);
        ledger
            .contribute(contributor, 1_000, &[], 2_500)
            .expect("Contribution should be admitted");
        ledger.finalize(controller(), 3_000).expect("Finalize");
        ledger.settle(controller(), 3_100).expect("First settle");

        let event = ledger
            .settle(controller(), 3_200)
            .expect("Repeat settle should succeed");

        assert_eq!(
            event,
            RaiseEvent::Settled {
                raise_id: ledger.raise_id(),
                total_held: 0,
                fee: 0,
                payout: 0,
                timestamp: 3_200,
            }
        );
        // Balances unchanged by the repeat
        assert_eq!(vault.balance_of(&asset(2), &addr(10)), 950);
        assert_eq!(vault.balance_of(&asset(2), &addr(11)), 50);
    }

    #[test]
    fn test_settle_empty_raise() {
        let (ledger, _) = open_with_funds(base_config(), &[]);
        ledger.finalize(controller(), 3_000).expect("Finalize");

        let event = ledger
            .settle(controller(), 3_100)
            .expect("Empty raise should settle cleanly");

        match event {
            RaiseEvent::Settled {
                total_held,
                fee,
                payout,
                ..
            } => {
                assert_eq!(total_held, 0);
                assert_eq!(fee, 0);
                assert_eq!(payout, 0);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_transfer_control() {
        let (ledger, _) = open_with_funds(base_config(), &[]);

        let event = ledger
            .transfer_control(controller(), addr(42), 600)
            .expect("Transfer should succeed");

        assert_eq!(
            event,
            RaiseEvent::ControlTransferred {
                raise_id: ledger.raise_id(),
                previous: addr(10),
                new_controller: addr(42),
                timestamp: 600,
            }
        );
        assert_eq!(ledger.controller(), addr(42));

        // The old controller lost its rights
        let result = ledger.finalize(controller(), 3_000);
        assert_eq!(
            result.err(),
            Some(RaiseError::NotController { caller: addr(10) })
        );

        // The new one can drive transitions
        ledger
            .finalize(addr(42), 3_000)
            .expect("New controller should finalize");
    }

    #[test]
    fn test_transfer_control_rejects_zero_address() {
        let (ledger, _) = open_with_funds(base_config(), &[]);

        let result = ledger.transfer_control(controller(), Address::zero(), 600);
        assert_eq!(result.err(), Some(RaiseError::ZeroAddress("new_controller")));
        assert_eq!(ledger.controller(), addr(10));
    }

    #[test]
    fn test_transfer_control_requires_controller() {
        let (ledger, _) = open_with_funds(base_config(), &[]);

        let result = ledger.transfer_control(addr(99), addr(42), 600);
        assert_eq!(
            result.err(),
            Some(RaiseError::NotController { caller: addr(99) })
        );
    }

    #[test]
    fn test_split_fee_floors() {
        assert_eq!(split_fee(1_000, 500).unwrap(), (50, 950));
        assert_eq!(split_fee(1_001, 500).unwrap(), (50, 951));
        assert_eq!(split_fee(1, 9_999).unwrap(), (0, 1));
        assert_eq!(split_fee(10_000, 1).unwrap(), (1, 9_999));
        assert_eq!(split_fee(u128::MAX, 10_000).err(), Some(RaiseError::Overflow));
    }
}
