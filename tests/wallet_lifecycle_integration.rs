//! End-to-end transaction lifecycle tests through the wallet facade
//!
//! Each test drives a real wallet with protocol events the way the native
//! worker threads would, then checks both wallet state and what the listener
//! saw after the dispatcher drained.

use std::sync::Arc;
use std::thread;

use tari_wallet_core::data_structures::{
    CancellationReason, Commitment, CommitmentSignature, CompletedTransaction, OutputFeatures,
    PrivateKey, PublicKey, Transaction, TransactionKind, TransactionStatus, TxId,
};
use tari_wallet_core::events::listeners::MockEventListener;
use tari_wallet_core::events::ProtocolEvent;
use tari_wallet_core::network::{ConnectivityCall, RecordingConnectivity};
use tari_wallet_core::{UtxoImport, Wallet, WalletError};

fn key() -> PublicKey {
    PrivateKey::random().public_key()
}

fn wallet_with_listener() -> (Wallet, MockEventListener, Arc<RecordingConnectivity>) {
    let listener = MockEventListener::builder().unlimited_events().build();
    let net = Arc::new(RecordingConnectivity::new());
    let wallet = Wallet::builder()
        .with_connectivity(net.clone())
        .with_event_listener(Box::new(listener.clone()))
        .build()
        .unwrap();
    (wallet, listener, net)
}

fn fund(wallet: &Wallet, amount: u64) {
    wallet
        .handle_protocol_event(ProtocolEvent::OutputRecovered {
            amount,
            source_public_key: key(),
            lock_height: 0,
            message: "funding".into(),
        })
        .unwrap();
}

fn completed(wallet: &Wallet, tx_id: TxId) -> CompletedTransaction {
    match wallet.transaction(tx_id).unwrap() {
        Transaction::Completed(tx) => tx,
        other => panic!("expected a completed transaction, got {other:?}"),
    }
}

#[test]
fn test_send_finalize_and_confirm() {
    let (wallet, listener, net) = wallet_with_listener();
    fund(&wallet, 10_000);

    let t1 = wallet.send_transaction(key(), 1000, 5, "hi", false).unwrap();
    assert_eq!(wallet.transaction_kind(t1), Some(TransactionKind::PendingOutbound));
    assert_eq!(net.submitted(), vec![t1]);

    for event in [
        ProtocolEvent::TransactionFinalized { tx_id: t1 },
        ProtocolEvent::TransactionMinedUnconfirmed {
            tx_id: t1,
            confirmations: 1,
        },
        ProtocolEvent::TransactionMinedUnconfirmed {
            tx_id: t1,
            confirmations: 2,
        },
        ProtocolEvent::TransactionMined { tx_id: t1 },
    ] {
        wallet.handle_protocol_event(event).unwrap();
    }

    let tx = completed(&wallet, t1);
    assert_eq!(tx.status, TransactionStatus::MinedConfirmed);
    assert_eq!(tx.confirmations, 3);
    assert_eq!(tx.fee, (3 + 1 + 2 * 13) * 5);

    assert!(wallet.flush_events());
    listener
        .assert_tx_sequence(
            t1,
            &[
                "TransactionFinalized",
                "TransactionMinedUnconfirmed",
                "TransactionMinedUnconfirmed",
                "TransactionMined",
            ],
        )
        .unwrap();
    assert_eq!(listener.last_balance(), Some(wallet.balance()));

    assert!(listener.event_type_count("BalanceUpdated") >= 4);
    assert_eq!(wallet.event_stats().stale_balance_dropped, 0);
}

#[test]
fn test_stale_confirmations_after_mined_are_ignored() {
    let (wallet, listener, _) = wallet_with_listener();
    fund(&wallet, 10_000);
    let tx_id = wallet.send_transaction(key(), 100, 1, "", false).unwrap();

    wallet
        .handle_protocol_event(ProtocolEvent::TransactionMined { tx_id })
        .unwrap();
    wallet
        .handle_protocol_event(ProtocolEvent::TransactionMinedUnconfirmed {
            tx_id,
            confirmations: 1,
        })
        .unwrap();
    wallet
        .handle_protocol_event(ProtocolEvent::TransactionBroadcast { tx_id })
        .unwrap();

    assert_eq!(completed(&wallet, tx_id).status, TransactionStatus::MinedConfirmed);
    assert!(wallet.flush_events());
    listener.assert_tx_sequence(tx_id, &["TransactionMined"]).unwrap();
}

#[test]
fn test_import_utxo_is_faux_confirmed() {
    let (wallet, listener, _) = wallet_with_listener();
    let spending_key = PrivateKey::random();
    let script_key = PrivateKey::random();
    let signature = CommitmentSignature::new(
        Commitment::from_bytes(key().as_bytes()).unwrap(),
        *PrivateKey::random().as_bytes(),
        *PrivateKey::random().as_bytes(),
    );

    let tx_id = wallet
        .import_utxo(UtxoImport {
            amount: 500,
            spending_key: &spending_key,
            source_public_key: key(),
            features: OutputFeatures::default(),
            commitment_signature: &signature,
            sender_public_key: key(),
            script_private_key: &script_key,
            message: "paper wallet".into(),
        })
        .unwrap();

    let tx = completed(&wallet, tx_id);
    assert_eq!(tx.status, TransactionStatus::FauxConfirmed);
    assert_eq!(tx.amount, 500);
    assert_eq!(wallet.balance().available, 500);

    assert!(wallet.flush_events());
    listener
        .assert_tx_sequence(tx_id, &["TransactionFauxConfirmed"])
        .unwrap();
    assert_eq!(listener.last_balance().map(|b| b.available), Some(500));
}

#[test]
fn test_cancel_rules() {
    let (wallet, listener, net) = wallet_with_listener();
    fund(&wallet, 10_000);

    let pending = wallet.send_transaction(key(), 100, 1, "", false).unwrap();
    assert!(wallet.cancel_pending_transaction(pending).unwrap());
    assert!(!wallet.cancel_pending_transaction(pending).unwrap());
    assert!(net.calls().contains(&ConnectivityCall::NotifyCancelled(pending)));

    let cancelled = wallet.cancelled_transactions();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(
        cancelled[0].cancellation_reason,
        Some(CancellationReason::UserCancelled)
    );

    let mined = wallet.send_transaction(key(), 100, 1, "", false).unwrap();
    wallet
        .handle_protocol_event(ProtocolEvent::TransactionMined { tx_id: mined })
        .unwrap();
    let err = wallet.cancel_pending_transaction(mined).unwrap_err();
    assert!(matches!(err, WalletError::InvalidState { .. }));
    assert_eq!(err.code(), 2);
    assert_eq!(wallet.transaction_kind(mined), Some(TransactionKind::Completed));

    assert!(matches!(
        wallet.cancel_pending_transaction(TxId::new(7)),
        Err(WalletError::NotFound(_))
    ));

    assert!(wallet.flush_events());
    listener
        .assert_tx_sequence(pending, &["TransactionCancelled"])
        .unwrap();
}

#[test]
fn test_network_cancellation_of_broadcast_transaction() {
    let (wallet, listener, _) = wallet_with_listener();
    fund(&wallet, 10_000);
    let tx_id = wallet.send_transaction(key(), 400, 2, "", true).unwrap();
    assert_eq!(completed(&wallet, tx_id).status, TransactionStatus::Broadcast);

    wallet
        .handle_protocol_event(ProtocolEvent::TransactionCancelled {
            tx_id,
            reason: CancellationReason::DoubleSpend,
        })
        .unwrap();
    assert_eq!(wallet.transaction_kind(tx_id), Some(TransactionKind::Cancelled));
    assert_eq!(wallet.balance().available, 10_000);

    // chain updates for a cancelled transaction change nothing
    wallet
        .handle_protocol_event(ProtocolEvent::TransactionMined { tx_id })
        .unwrap();
    assert_eq!(wallet.transaction_kind(tx_id), Some(TransactionKind::Cancelled));

    assert!(wallet.flush_events());
    listener
        .assert_tx_sequence(tx_id, &["TransactionBroadcast", "TransactionCancelled"])
        .unwrap();
}

#[test]
fn test_rejected_submission_is_never_announced() {
    let (wallet, listener, net) = wallet_with_listener();
    fund(&wallet, 10_000);
    net.set_reject_submissions(true);

    assert!(wallet.send_transaction(key(), 100, 1, "gift", true).is_err());
    assert!(wallet.coin_split(500, 5, 100, "split", 0).is_err());
    assert_eq!(net.submitted().len(), 2);
    for tx_id in net.submitted() {
        assert_eq!(wallet.transaction(tx_id).unwrap_err().code(), 4);
    }

    assert!(wallet.flush_events());
    listener
        .assert_event_type_count("TransactionBroadcast", 0)
        .unwrap();
    assert_eq!(listener.last_balance(), Some(wallet.balance()));
    assert_eq!(wallet.balance().available, 10_000);

    net.set_reject_submissions(false);
    let tx_id = wallet.send_transaction(key(), 100, 1, "gift", true).unwrap();
    assert!(wallet.flush_events());
    listener
        .assert_tx_sequence(tx_id, &["TransactionBroadcast"])
        .unwrap();
}

#[test]
fn test_events_for_unknown_transactions_are_rejected() {
    let (wallet, _, _) = wallet_with_listener();
    let before = wallet.balance();
    let err = wallet
        .handle_protocol_event(ProtocolEvent::TransactionFinalized { tx_id: TxId::new(99) })
        .unwrap_err();
    assert_eq!(err.code(), 4);
    assert_eq!(wallet.balance(), before);
    assert!(wallet.completed_transactions().is_empty());
}

#[test]
fn test_events_without_listener_are_dropped() {
    let net = Arc::new(RecordingConnectivity::new());
    let wallet = Wallet::builder().with_connectivity(net).build().unwrap();
    fund(&wallet, 1_000);
    wallet.send_transaction(key(), 100, 1, "", false).unwrap();

    let stats = wallet.event_stats();
    assert!(stats.dropped_no_listener >= 3);
    assert_eq!(stats.total_delivered, 0);

    // nothing queued earlier reaches a listener registered later
    let listener = MockEventListener::new();
    wallet.set_listener(Box::new(listener.clone()), None).unwrap();
    assert!(wallet.flush_events());
    assert_eq!(listener.event_count(), 0);

    fund(&wallet, 1);
    assert!(wallet.flush_events());
    listener
        .assert_event_type_count("TransactionFauxConfirmed", 1)
        .unwrap();
}

#[test]
fn test_validation_requests_get_distinct_ids() {
    let (wallet, listener, net) = wallet_with_listener();
    let txo = wallet.start_txo_validation().unwrap();
    let transactions = wallet.start_transaction_validation().unwrap();
    assert_ne!(txo, transactions);
    assert_eq!(
        net.calls(),
        vec![
            ConnectivityCall::TxoValidation(txo),
            ConnectivityCall::TransactionValidation(transactions),
        ]
    );

    wallet
        .handle_protocol_event(ProtocolEvent::TxoValidationComplete {
            request_id: txo,
            success: true,
        })
        .unwrap();
    assert!(!wallet.is_validation_outstanding(txo));
    assert!(wallet.is_validation_outstanding(transactions));

    let err = wallet
        .handle_protocol_event(ProtocolEvent::TxoValidationComplete {
            request_id: txo,
            success: true,
        })
        .unwrap_err();
    assert!(matches!(err, WalletError::UnknownRequest(id) if id == txo));

    assert!(wallet.flush_events());
    listener
        .assert_event_type_count("TxoValidationComplete", 1)
        .unwrap();
}

#[test]
fn test_concurrent_producers_keep_per_transaction_order() {
    const PRODUCERS: usize = 8;
    const PAYMENTS: usize = 25;

    let (wallet, listener, _) = wallet_with_listener();
    let wallet = Arc::new(wallet);

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let wallet = wallet.clone();
            thread::spawn(move || {
                let sender = key();
                (0..PAYMENTS)
                    .map(|_| {
                        let tx_id = TxId::random();
                        wallet
                            .handle_protocol_event(ProtocolEvent::TransactionReceived {
                                tx_id,
                                source_public_key: sender,
                                amount: 10,
                                message: String::new(),
                            })
                            .unwrap();
                        wallet
                            .handle_protocol_event(ProtocolEvent::TransactionFinalized { tx_id })
                            .unwrap();
                        wallet
                            .handle_protocol_event(ProtocolEvent::TransactionMined { tx_id })
                            .unwrap();
                        tx_id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let tx_ids: Vec<TxId> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert!(wallet.flush_events());

    for tx_id in &tx_ids {
        listener
            .assert_tx_sequence(
                *tx_id,
                &["TransactionReceived", "TransactionFinalized", "TransactionMined"],
            )
            .unwrap();
    }

    assert_eq!(wallet.event_stats().stale_balance_dropped, 0);
    assert_eq!(
        listener.last_balance().map(|b| b.available),
        Some((PRODUCERS * PAYMENTS * 10) as u64)
    );
    assert_eq!(wallet.balance().available, (PRODUCERS * PAYMENTS * 10) as u64);
}
