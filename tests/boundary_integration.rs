//! Host boundary tests: handles, byte buffers and error codes

use std::sync::Arc;

use tari_wallet_core::boundary::{CreateWalletArgs, ErrorCode, WalletBoundary};
use tari_wallet_core::codec::{u64_from_bytes, u64_to_bytes};
use tari_wallet_core::data_structures::{PrivateKey, TransactionStatus, TxId};
use tari_wallet_core::events::listeners::MockEventListener;
use tari_wallet_core::events::ProtocolEvent;
use tari_wallet_core::network::RecordingConnectivity;

fn create(listener: MockEventListener) -> WalletBoundary {
    let mut error = ErrorCode::OK;
    let boundary = WalletBoundary::create(
        CreateWalletArgs {
            config_json: r#"{ "network": "esmeralda", "required_confirmations": 2 }"#,
            log_path: None,
            max_log_files: 2,
            max_log_file_bytes: 1024 * 1024,
            passphrase: Some("boundary"),
            seed_words: None,
            connectivity: Arc::new(RecordingConnectivity::new()),
            listener: Box::new(listener),
            execution_context: None,
        },
        &mut error,
    )
    .expect("wallet");
    assert!(error.is_ok());
    boundary
}

#[test]
fn test_send_and_list_through_handles() {
    let listener = MockEventListener::new();
    let boundary = create(listener.clone());
    let mut error = ErrorCode::OK;

    boundary
        .wallet()
        .handle_protocol_event(ProtocolEvent::OutputRecovered {
            amount: 5_000,
            source_public_key: PrivateKey::random().public_key(),
            lock_height: 0,
            message: "funding".into(),
        })
        .unwrap();

    let destination = boundary
        .public_key_from_hex(&PrivateKey::random().public_key().to_hex(), &mut error)
        .unwrap();
    let tx_id = boundary.send_transaction(destination, "1000", "2", "rent", false, &mut error);
    assert!(error.is_ok());
    assert_ne!(u64_from_bytes(&tx_id).unwrap(), 0);

    let pending = boundary.get_pending_outbound_transactions(&mut error).unwrap();
    assert_eq!(boundary.pending_outbound_list_length(pending, &mut error), 1);
    let first = boundary
        .pending_outbound_list_get_at(pending, 0, &mut error)
        .unwrap();
    assert_eq!(boundary.pending_outbound_tx_id(first, &mut error), tx_id);
    assert_eq!(
        u64_from_bytes(&boundary.pending_outbound_amount(first, &mut error)).unwrap(),
        1000
    );
    assert_eq!(
        u64_from_bytes(&boundary.pending_outbound_fee(first, &mut error)).unwrap(),
        (3 + 1 + 2 * 13) * 2
    );
    assert_ne!(
        u64_from_bytes(&boundary.pending_outbound_timestamp(first, &mut error)).unwrap(),
        0
    );
    assert_eq!(
        boundary.pending_outbound_status(first, &mut error),
        i32::from(TransactionStatus::Pending)
    );
    assert_eq!(boundary.pending_outbound_message(first, &mut error), "rent");
    let counterparty = boundary
        .pending_outbound_destination_public_key(first, &mut error)
        .unwrap();
    assert_eq!(
        boundary.public_key_to_hex(counterparty, &mut error),
        boundary.public_key_to_hex(destination, &mut error)
    );
    boundary.destroy_public_key(counterparty, &mut error);

    let id = tari_wallet_core::codec::tx_id_from_bytes(&tx_id).unwrap();
    boundary
        .wallet()
        .handle_protocol_event(ProtocolEvent::TransactionReplyReceived { tx_id: id })
        .unwrap();
    boundary
        .wallet()
        .handle_protocol_event(ProtocolEvent::TransactionMined { tx_id: id })
        .unwrap();

    let completed = boundary
        .get_completed_transaction_by_id(&tx_id, false, &mut error)
        .unwrap();
    assert_eq!(
        boundary.completed_status(completed, &mut error),
        i32::from(TransactionStatus::MinedConfirmed)
    );
    assert_eq!(
        u64_from_bytes(&boundary.completed_confirmations(completed, &mut error)).unwrap(),
        2
    );
    assert_eq!(boundary.completed_cancellation_reason(completed, &mut error), -1);
    let recipient = boundary
        .completed_destination_public_key(completed, &mut error)
        .unwrap();
    assert_eq!(
        boundary.public_key_to_hex(recipient, &mut error),
        boundary.public_key_to_hex(destination, &mut error)
    );
    let sender = boundary.completed_source_public_key(completed, &mut error).unwrap();
    assert_eq!(
        boundary.public_key_to_hex(sender, &mut error),
        boundary.wallet().public_key().to_hex()
    );
    boundary.destroy_public_key(recipient, &mut error);
    boundary.destroy_public_key(sender, &mut error);

    // cancelling a mined transaction is an invalid state
    assert!(!boundary.cancel_pending_transaction(&tx_id, &mut error));
    assert_eq!(error.value(), 2);

    // looking a completed id up as cancelled is refused too
    assert!(boundary
        .get_completed_transaction_by_id(&tx_id, true, &mut error)
        .is_none());
    assert_eq!(error.value(), 2);

    for (handle, destroy) in [(first, true), (first, false)] {
        boundary.destroy_pending_outbound_transaction(handle, &mut error);
        assert_eq!(error.is_ok(), destroy);
    }
    boundary.destroy_pending_outbound_transactions(pending, &mut error);
    boundary.destroy_completed_transaction(completed, &mut error);
    boundary.destroy_public_key(destination, &mut error);
    assert_eq!(boundary.live_handles(), 0);

    assert!(boundary.wallet().flush_events());
    listener
        .assert_tx_sequence(id, &["TransactionReplyReceived", "TransactionMined"])
        .unwrap();
}

#[test]
fn test_pending_inbound_accessors() {
    let boundary = create(MockEventListener::new());
    let mut error = ErrorCode::OK;
    let sender = PrivateKey::random().public_key();
    let id = TxId::new(77);

    boundary
        .wallet()
        .handle_protocol_event(ProtocolEvent::TransactionReceived {
            tx_id: id,
            source_public_key: sender,
            amount: 250,
            message: "invoice 7".into(),
        })
        .unwrap();

    let tx = boundary
        .get_pending_inbound_transaction_by_id(&u64_to_bytes(77), &mut error)
        .unwrap();
    assert_eq!(
        u64_from_bytes(&boundary.pending_inbound_amount(tx, &mut error)).unwrap(),
        250
    );
    assert_eq!(boundary.pending_inbound_message(tx, &mut error), "invoice 7");
    assert_eq!(
        boundary.pending_inbound_status(tx, &mut error),
        i32::from(TransactionStatus::Pending)
    );
    assert_ne!(
        u64_from_bytes(&boundary.pending_inbound_timestamp(tx, &mut error)).unwrap(),
        0
    );
    let source = boundary.pending_inbound_source_public_key(tx, &mut error).unwrap();
    assert_eq!(boundary.public_key_to_hex(source, &mut error), sender.to_hex());
    assert!(error.is_ok());

    boundary.wallet().handle_protocol_event(ProtocolEvent::TransactionFinalized { tx_id: id }).unwrap();
    let completed = boundary
        .get_completed_transaction_by_id(&u64_to_bytes(77), false, &mut error)
        .unwrap();
    let completed_source = boundary.completed_source_public_key(completed, &mut error).unwrap();
    assert_eq!(boundary.public_key_to_hex(completed_source, &mut error), sender.to_hex());
    assert_eq!(
        boundary.completed_timestamp(completed, &mut error),
        boundary.pending_inbound_timestamp(tx, &mut error)
    );

    // accessors on a destroyed handle report the failure and return defaults
    boundary.destroy_pending_inbound_transaction(tx, &mut error);
    assert_eq!(boundary.pending_inbound_status(tx, &mut error), -1);
    assert!(!error.is_ok());
    assert!(boundary
        .pending_inbound_source_public_key(tx, &mut error)
        .is_none());

    boundary.destroy_public_key(source, &mut error);
    boundary.destroy_public_key(completed_source, &mut error);
    boundary.destroy_completed_transaction(completed, &mut error);
    assert_eq!(boundary.live_handles(), 0);
}

#[test]
fn test_numeric_arguments_and_results() {
    let boundary = create(MockEventListener::new());
    let mut error = ErrorCode::OK;

    boundary.estimate_fee("100", "1", "0", "2", &mut error);
    assert_eq!(error.value(), 1);

    boundary.estimate_fee("100", "1", "1", "2", &mut error);
    assert_eq!(error.value(), 5);

    boundary.coin_split("10", "2", "1", "", "0", &mut error);
    assert_eq!(error.value(), 1);

    boundary.set_required_confirmations("abc", &mut error);
    assert_eq!(error.value(), 1);
    boundary.set_required_confirmations(" 6 ", &mut error);
    assert!(error.is_ok());
    assert_eq!(boundary.get_required_confirmations(&mut error), u64_to_bytes(6));

    let first = boundary.start_txo_validation(&mut error);
    let second = boundary.start_transaction_validation(&mut error);
    assert!(error.is_ok());
    assert_ne!(first, second);

    let stats = boundary.get_fee_per_gram_stats(3, &mut error).unwrap();
    assert_eq!(boundary.fee_per_gram_stats_length(stats, &mut error), 3);
    assert_eq!(
        boundary.fee_per_gram_stat_at(stats, 2, &mut error).map(|s| s.order),
        Some(2)
    );
    assert!(boundary.get_fee_per_gram_stats(0, &mut error).is_none());
    assert_eq!(error.value(), 1);
}

#[test]
fn test_import_with_malformed_keys_is_an_import_error() {
    let boundary = create(MockEventListener::new());
    let mut error = ErrorCode::OK;
    let source = boundary.wallet_public_key(&mut error).unwrap();
    let tx_id = boundary.import_utxo(
        "500",
        "not hex",
        source,
        Default::default(),
        &PrivateKey::random().public_key().to_hex(),
        &hex::encode([1u8; 32]),
        &hex::encode([2u8; 32]),
        source,
        &hex::encode([3u8; 32]),
        "",
        &mut error,
    );
    assert_eq!(error.value(), 6);
    assert_eq!(tx_id, [0u8; 8]);
}
