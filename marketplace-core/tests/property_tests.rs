//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Monotonic ids: registrations return 1, 2, 3, ... with no gaps
//! - Fee conservation: fee + seller share == price, fee == floor(P*F/100)
//! - Self-trade always blocked
//! - Authorization scoping: only the latest purchase unlocks a token
//! - Atomicity: rejected operations leave state untouched

use marketplace_core::{
    Error, FixedClock, ItemId, MarketEventKind, MarketplaceLedger, Percentage, Principal,
    Settlement,
};
use proptest::prelude::*;

/// Strategy for generating valid prices
fn price_strategy() -> impl Strategy<Value = u64> {
    1u64..1_000_000_000u64
}

/// Strategy for generating fee rates
fn fee_strategy() -> impl Strategy<Value = Percentage> {
    (0u8..=100u8).prop_map(|p| Percentage::from_percent(p).unwrap())
}

/// Strategy for generating principals
fn principal_strategy() -> impl Strategy<Value = Principal> {
    "[a-z]{3,8}[0-9]{0,3}".prop_map(Principal::new)
}

/// One step of a random workload
#[derive(Debug, Clone)]
enum Op {
    Register { price: u64, seller: usize },
    Acquire { item: u64, buyer: usize },
    Retrieve { item: u64, buyer: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..500, 0usize..4).prop_map(|(price, seller)| Op::Register { price, seller }),
        (0u64..12, 0usize..4).prop_map(|(item, buyer)| Op::Acquire { item, buyer }),
        (0u64..12, 0usize..4).prop_map(|(item, buyer)| Op::Retrieve { item, buyer }),
    ]
}

fn create_test_ledger(fee: Percentage) -> MarketplaceLedger<FixedClock> {
    MarketplaceLedger::new(fee, FixedClock(100))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: ids are 1..=n in registration order
    #[test]
    fn prop_monotonic_ids(prices in prop::collection::vec(price_strategy(), 1..40)) {
        let mut ledger = create_test_ledger(Percentage::from_percent(3).unwrap());
        let seller = Principal::new("seller");

        for (i, price) in prices.iter().enumerate() {
            let id = ledger
                .register_content(*price, "summary", "image", "token", &seller)
                .unwrap();
            prop_assert_eq!(id.get(), i as u64 + 1);
        }
    }

    /// Property: failed registrations still never cause gaps or reuse
    #[test]
    fn prop_rejections_do_not_consume_ids(prices in prop::collection::vec(0u64..5, 1..40)) {
        let mut ledger = create_test_ledger(Percentage::from_percent(3).unwrap());
        let seller = Principal::new("seller");
        let mut expected = 1u64;

        for price in prices {
            match ledger.register_content(price, "summary", "image", "token", &seller) {
                Ok(id) => {
                    prop_assert_eq!(id.get(), expected);
                    expected += 1;
                }
                Err(err) => prop_assert!(matches!(err, Error::PriceInvalid)),
            }
        }
        prop_assert_eq!(ledger.counters().next_item_id.get(), expected);
    }

    /// Property: fee + seller share == price, fee == floor(P*F/100)
    #[test]
    fn prop_fee_conservation(price in price_strategy(), fee in fee_strategy()) {
        let mut ledger = create_test_ledger(fee);
        let item_id = ledger
            .register_content(price, "summary", "image", "token", &Principal::new("seller"))
            .unwrap();
        ledger.acquire_content(item_id, &Principal::new("buyer")).unwrap();

        let settlement = match &ledger.events()[1].kind {
            MarketEventKind::ContentAcquired { settlement, .. } => *settlement,
            other => panic!("unexpected event {:?}", other),
        };

        prop_assert_eq!(settlement.fee_amount + settlement.seller_share, price);
        prop_assert_eq!(
            settlement.fee_amount as u128,
            price as u128 * fee.percent() as u128 / 100
        );
        prop_assert_eq!(settlement, Settlement::split(price, fee));
        prop_assert_eq!(ledger.counters().fees_collected, settlement.fee_amount);
    }

    /// Property: the owner can never buy their own listing
    #[test]
    fn prop_self_trade_blocked(price in price_strategy(), owner in principal_strategy(), attempts in 1usize..5) {
        let mut ledger = create_test_ledger(Percentage::from_percent(3).unwrap());
        let item_id = ledger
            .register_content(price, "summary", "image", "token", &owner)
            .unwrap();

        for _ in 0..attempts {
            let result = ledger.acquire_content(item_id, &owner);
            prop_assert!(matches!(result, Err(Error::SelfTradeBlocked)));
        }
        prop_assert!(ledger.purchase_record(&owner).is_none());
        prop_assert_eq!(ledger.counters().total_volume, 0);
    }

    /// Property: after buying X then Y, only Y's token is retrievable
    #[test]
    fn prop_latest_purchase_authorizes(price_x in price_strategy(), price_y in price_strategy()) {
        let mut ledger = create_test_ledger(Percentage::from_percent(3).unwrap());
        let seller = Principal::new("seller");
        let buyer = Principal::new("buyer");

        let x = ledger.register_content(price_x, "x", "image", "token-x", &seller).unwrap();
        let y = ledger.register_content(price_y, "y", "audio", "token-y", &seller).unwrap();

        ledger.acquire_content(x, &buyer).unwrap();
        ledger.acquire_content(y, &buyer).unwrap();

        prop_assert!(matches!(
            ledger.retrieve_access_token(x, &buyer),
            Err(Error::Unauthorized(_))
        ));
        prop_assert_eq!(ledger.retrieve_access_token(y, &buyer).unwrap(), "token-y");
    }

    /// Property: random workloads keep the tables consistent and rejected
    /// operations change nothing
    #[test]
    fn prop_random_workload_preserves_invariants(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let principals: Vec<Principal> =
            ["alice", "bob", "carol", "dave"].iter().map(|p| Principal::new(*p)).collect();
        let mut ledger = create_test_ledger(Percentage::from_percent(3).unwrap());

        for op in ops {
            let before = ledger.state().clone();

            let result = match op {
                Op::Register { price, seller } => ledger
                    .register_content(price, "summary", "image", "token", &principals[seller])
                    .map(|_| ()),
                Op::Acquire { item, buyer } => {
                    ledger.acquire_content(ItemId::new(item), &principals[buyer])
                }
                Op::Retrieve { item, buyer } => ledger
                    .retrieve_access_token(ItemId::new(item), &principals[buyer])
                    .map(|_| ()),
            };

            if let Err(err) = result {
                prop_assert!(err.is_rejection());
                prop_assert_eq!(&before, ledger.state());
            }
            prop_assert!(ledger.state().is_consistent());
        }
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_full_marketplace_lifecycle() {
        let mut ledger = create_test_ledger(Percentage::from_percent(3).unwrap());
        let seller = Principal::new("user1");
        let buyer = Principal::new("user2");

        // 1. Register
        let item_id = ledger
            .register_content(100, "Test Content", "image", "secure-token-123", &seller)
            .unwrap();
        assert_eq!(item_id, ItemId::new(1));

        // 2. Acquire
        ledger.acquire_content(item_id, &buyer).unwrap();

        // 3. Retrieve
        let token = ledger.retrieve_access_token(item_id, &buyer).unwrap();
        assert_eq!(token, "secure-token-123");

        // 4. Stranger is refused
        let result = ledger.retrieve_access_token(item_id, &Principal::new("user3"));
        assert!(matches!(result, Err(Error::Unauthorized(1))));

        assert_eq!(ledger.counters().total_volume, 1);
        assert_eq!(ledger.counters().fees_collected, 3);
        assert_eq!(ledger.events().len(), 2);
    }

    #[test]
    fn test_invalid_registration_reports_price_first() {
        let mut ledger = create_test_ledger(Percentage::from_percent(3).unwrap());
        let result = ledger.register_content(0, "", "", "", &Principal::new("user1"));
        assert_eq!(result.unwrap_err().code(), "ERR_PRICE_INVALID");
    }

    #[test]
    fn test_unknown_item_on_empty_ledger() {
        let mut ledger = create_test_ledger(Percentage::from_percent(3).unwrap());
        let result = ledger.acquire_content(ItemId::new(999), &Principal::new("user2"));
        assert_eq!(result.unwrap_err().code(), "ERR_ITEM_UNAVAILABLE");
    }
}
