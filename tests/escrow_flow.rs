//! Integration tests for escrow contracts driving the ledger

use solochain::crypto::Address;
use solochain::escrow::{EscrowManager, EscrowOutcome};
use solochain::ledger::Ledger;
use solochain::wallet::Wallet;

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

#[test]
fn test_escrow_transfer_reaches_the_chain() -> Result<(), Box<dyn std::error::Error>> {
    let alice = Wallet::generate(None);
    let bob = Wallet::generate(None);
    let miner = Address::from("M");

    let mut ledger = Ledger::new(1, alice.address.clone(), 10_000.0)?;
    let mut escrows = EscrowManager::new();

    let now = now_ms();
    let id = escrows.create(alice.address.clone(), bob.address.clone(), 250.0, now + 60_000)?;

    // Executed before the deadline: the transfer is submitted and signed.
    let outcome = escrows.execute(&id, now, &mut ledger, Some(&alice))?;
    assert_eq!(outcome, EscrowOutcome::Transferred);
    assert_eq!(ledger.pending().len(), 1);
    assert!(ledger.pending()[0].verify_signature(&alice.public_key_bytes()));

    // Mining settles it like any other transfer.
    ledger.mine_pending(&miner)?;
    assert_eq!(ledger.balance_of(&bob.address), 250.0);
    assert_eq!(ledger.balance_of(&alice.address), 10_000.0 - 250.0);
    assert!(ledger.is_valid());
    Ok(())
}

#[test]
fn test_expired_escrow_reports_refund_without_ledger_traffic(
) -> Result<(), Box<dyn std::error::Error>> {
    let alice = Wallet::generate(None);
    let bob = Wallet::generate(None);

    let mut ledger = Ledger::new(1, alice.address.clone(), 10_000.0)?;
    let mut escrows = EscrowManager::new();

    // Deadline already in the past.
    let now = now_ms();
    let id = escrows.create(alice.address.clone(), bob.address.clone(), 250.0, now - 1)?;

    let outcome = escrows.execute(&id, now, &mut ledger, Some(&alice))?;
    assert_eq!(outcome, EscrowOutcome::Refunded);

    // Funds never moved, so no refund transaction exists either.
    assert!(ledger.pending().is_empty());
    assert_eq!(ledger.balance_of(&alice.address), 10_000.0);
    assert!(escrows.get(&id).unwrap().executed);
    Ok(())
}

#[test]
fn test_execute_twice_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let alice = Wallet::generate(None);
    let bob = Wallet::generate(None);

    let mut ledger = Ledger::new(1, alice.address.clone(), 10_000.0)?;
    let mut escrows = EscrowManager::new();

    let now = now_ms();
    let id = escrows.create(alice.address.clone(), bob.address.clone(), 100.0, now + 60_000)?;

    assert_eq!(
        escrows.execute(&id, now, &mut ledger, Some(&alice))?,
        EscrowOutcome::Transferred
    );
    assert_eq!(
        escrows.execute(&id, now, &mut ledger, Some(&alice))?,
        EscrowOutcome::AlreadyExecuted
    );
    // Still exactly one submitted transfer.
    assert_eq!(ledger.pending().len(), 1);
    Ok(())
}
