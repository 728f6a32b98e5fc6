use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use ledger_server::services::FixedClock;
use ledger_server::store::{AccountStore, Storage, UnitOfWork};
use ledger_server::{LedgerEngine, LedgerError, LedgerPolicy, MemoryStorage, Money};
use proptest::prelude::*;
use rust_decimal::Decimal;

const A: &str = "1234567890";
const B: &str = "0987654321";

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

async fn funded_pair(lock_timeout: Duration, balance: i64) -> Arc<LedgerEngine<MemoryStorage>> {
    let engine = LedgerEngine::new(MemoryStorage::new(lock_timeout), LedgerPolicy::default())
        .with_clock(FixedClock(day()));
    for number in [A, B] {
        engine.create_account(number).await.unwrap();
        if balance > 0 {
            engine.deposit(number, Decimal::from(balance)).await.unwrap();
        }
    }
    Arc::new(engine)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposite_transfers_do_not_deadlock() {
    let engine = funded_pair(Duration::from_secs(5), 1_000_000).await;

    let mut handles = Vec::new();
    for i in 0..100 {
        let engine = Arc::clone(&engine);
        let (from, to) = if i % 2 == 0 { (A, B) } else { (B, A) };
        handles.push(tokio::spawn(async move {
            engine.transfer(from, to, Decimal::from(100)).await
        }));
    }

    let all = async {
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(30), all)
        .await
        .expect("transfers deadlocked");

    // each side sent 50 x 101 and received 50 x 100
    let expected = Money::from(1_000_000 - 50);
    assert_eq!(engine.get_account(A).await.unwrap().balance, expected);
    assert_eq!(engine.get_account(B).await.unwrap().balance, expected);
    assert_eq!(engine.history(A, None).await.unwrap().len(), 101);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_withdrawals_never_overdraw() {
    let engine = funded_pair(Duration::from_secs(5), 1_000).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.withdraw(A, Decimal::from(100)).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(LedgerError::InsufficientBalance) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(engine.get_account(A).await.unwrap().balance, Money::ZERO);
}

#[tokio::test]
async fn held_lock_times_out_as_concurrent_update() {
    let storage = MemoryStorage::new(Duration::from_millis(50));
    let engine = LedgerEngine::new(storage.clone(), LedgerPolicy::default());
    engine.create_account(A).await.unwrap();

    let mut holder = storage.begin().await.unwrap();
    holder.get_account_for_update(A).await.unwrap();

    let err = engine.deposit(A, Decimal::from(10)).await.unwrap_err();
    assert!(matches!(err, LedgerError::ConcurrentUpdate));

    holder.rollback().await.unwrap();
    engine.deposit(A, Decimal::from(10)).await.unwrap();
    assert_eq!(engine.get_account(A).await.unwrap().balance, Money::from(10));
}

#[derive(Debug, Clone)]
enum Op {
    Deposit(bool, i64),
    Withdraw(bool, i64),
    Transfer(bool, i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<bool>(), 1i64..500_000).prop_map(|(a, cents)| Op::Deposit(a, cents)),
        (any::<bool>(), 1i64..500_000).prop_map(|(a, cents)| Op::Withdraw(a, cents)),
        (any::<bool>(), 1i64..500_000).prop_map(|(a, cents)| Op::Transfer(a, cents)),
    ]
}

fn pick(first: bool) -> (&'static str, &'static str) {
    if first { (A, B) } else { (B, A) }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn balances_stay_non_negative_and_money_is_conserved(ops in prop::collection::vec(op(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let engine = funded_pair(Duration::from_millis(500), 0).await;
            let mut expected_total = Money::ZERO;
            let mut fees = Money::ZERO;

            for op in ops {
                match op {
                    Op::Deposit(first, cents) => {
                        let (account, _) = pick(first);
                        let amount = Decimal::new(cents, 2);
                        engine.deposit(account, amount).await.unwrap();
                        expected_total += Money::from_decimal(amount);
                    }
                    Op::Withdraw(first, cents) => {
                        let (account, _) = pick(first);
                        let amount = Decimal::new(cents, 2);
                        if engine.withdraw(account, amount).await.is_ok() {
                            expected_total = expected_total
                                .checked_sub(Money::from_decimal(amount))
                                .unwrap();
                        }
                    }
                    Op::Transfer(first, cents) => {
                        let (from, to) = pick(first);
                        if let Ok(summary) = engine.transfer(from, to, Decimal::new(cents, 2)).await {
                            fees += summary.fee;
                            assert_eq!(summary.total_deduction, summary.amount + summary.fee);
                        }
                    }
                }

                let a = engine.get_account(A).await.unwrap().balance;
                let b = engine.get_account(B).await.unwrap().balance;
                assert!(a >= Money::ZERO && b >= Money::ZERO);
                assert_eq!(a + b + fees, expected_total);
            }
        });
    }
}
