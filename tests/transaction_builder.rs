//! End-to-end build and sign flows over in-memory live cells.

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use ckb_txkit::{
    address::Address,
    constants::{self, NetworkType},
    crypto::Privkey,
    dao,
    molecule::Entity,
    transaction::{
        builder::{CkbTransactionBuilder, DaoClaimTransactionBuilder, SimpleTransactionBuilder},
        handler::{
            dao::DaoClaimContext,
            multisig::{MultisigConfig, Secp256k1Blake160MultisigAllScriptContext},
            omnilock::{OmniLockConfig, OmniLockScriptContext, OmniLockScriptHandler,
                OmniLockWitnessLock},
            HandlerContexts,
        },
        input::{InputIterator, LiveCell, TransactionInput},
        signer::{
            generate_signing_message_with, SignContexts, TransactionSigner,
        },
        TransactionBuilderConfiguration, TxBuilderError,
    },
    types::{
        Capacity, CellDep, CellOutput, DepType, EpochNumberWithFraction, Header, OutPoint, Script,
        ScriptHashType, WitnessArgs,
    },
    H160, H256,
};

fn privkey(fill: u8) -> Privkey {
    Privkey::from_slice(&[fill; 32])
}

fn key_hash(key: &Privkey) -> H160 {
    key.pubkey().expect("pubkey").blake160()
}

fn live_input(tag: u8, capacity: u64, lock: Script, type_: Option<Script>, data: Bytes) -> TransactionInput {
    TransactionInput::new(
        LiveCell {
            out_point: OutPoint::new(H256([tag; 32]), 0),
            output: CellOutput::new(Capacity::shannons(capacity), lock, type_),
            output_data: data,
        },
        0,
    )
}

fn sighash_input(tag: u8, capacity: u64, owner: &Address) -> TransactionInput {
    live_input(tag, capacity, owner.payload().clone(), None, Bytes::new())
}

#[test]
fn single_input_fee_is_exact() {
    let key = privkey(1);
    let sender = Address::from_pubkey_hash(key_hash(&key), NetworkType::Testnet);
    let receiver = Address::from_pubkey_hash(H160([9; 20]), NetworkType::Testnet);

    let iterator =
        InputIterator::new_with_inputs(vec![sighash_input(1, 100_000_000_000, &sender)]);
    let mut builder =
        SimpleTransactionBuilder::new(TransactionBuilderConfiguration::new_testnet(), iterator);
    builder.add_output_by_address(&receiver, Capacity::shannons(50_100_000_000));
    builder.add_change_output_by_address(&sender).unwrap();

    let tx_with_groups = builder.build(&HandlerContexts::new_sighash()).unwrap();
    let tx = tx_with_groups.tx_view();

    assert_eq!(tx.inputs.len(), 1);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx_with_groups.script_groups().len(), 1);
    assert_eq!(tx.serialized_size_in_block(), 464);
    let fee = 100_000_000_000 - tx.outputs_capacity().unwrap().as_u64();
    assert_eq!(fee, 464);
}

#[test]
fn cell_selection_converges_over_two_inputs() {
    let key = privkey(1);
    let sender = Address::from_pubkey_hash(key_hash(&key), NetworkType::Testnet);
    let receiver = Address::from_pubkey_hash(H160([9; 20]), NetworkType::Testnet);

    let iterator = InputIterator::new_with_inputs(vec![
        sighash_input(1, 100_000_000_000, &sender),
        sighash_input(2, 10_000_000_000, &sender),
    ]);
    let mut builder =
        SimpleTransactionBuilder::new(TransactionBuilderConfiguration::new_testnet(), iterator);
    builder.add_output_by_address(&receiver, Capacity::shannons(100_000_000_000));
    builder.add_change_output_by_address(&sender).unwrap();

    let tx_with_groups = builder.build(&HandlerContexts::new_sighash()).unwrap();
    let tx = tx_with_groups.tx_view();

    assert_eq!(tx.inputs.len(), 2);
    assert_eq!(tx.outputs.len(), 2);
    let fee = 110_000_000_000 - tx.outputs_capacity().unwrap().as_u64();
    assert_eq!(fee, 516);
}

#[test]
fn build_requires_a_change_output() {
    let sender = Address::from_pubkey_hash(H160([1; 20]), NetworkType::Testnet);
    let iterator =
        InputIterator::new_with_inputs(vec![sighash_input(1, 100_000_000_000, &sender)]);
    let mut builder =
        SimpleTransactionBuilder::new(TransactionBuilderConfiguration::new_testnet(), iterator);
    builder.add_output_by_address(&sender, Capacity::shannons(50_000_000_000));
    assert!(matches!(
        builder.build(&HandlerContexts::new_sighash()),
        Err(TxBuilderError::NoChangeOutput)
    ));
}

#[test]
fn change_output_can_only_be_set_once() {
    let sender = Address::from_pubkey_hash(H160([1; 20]), NetworkType::Testnet);
    let iterator = InputIterator::new_with_inputs(vec![]);
    let mut builder =
        SimpleTransactionBuilder::new(TransactionBuilderConfiguration::new_testnet(), iterator);
    builder.add_change_output_by_address(&sender).unwrap();
    assert!(matches!(
        builder.add_change_output_by_address(&sender),
        Err(TxBuilderError::ChangeAlreadySet(0))
    ));
}

#[test]
fn exhausted_iterator_reports_insufficient_capacity() {
    let sender = Address::from_pubkey_hash(H160([1; 20]), NetworkType::Testnet);
    let iterator =
        InputIterator::new_with_inputs(vec![sighash_input(1, 10_000_000_000, &sender)]);
    let mut builder =
        SimpleTransactionBuilder::new(TransactionBuilderConfiguration::new_testnet(), iterator);
    builder.add_output_by_address(&sender, Capacity::shannons(50_000_000_000));
    builder.add_change_output_by_address(&sender).unwrap();
    match builder.build(&HandlerContexts::new_sighash()) {
        Err(TxBuilderError::InsufficientCapacity {
            required,
            collected,
        }) => {
            assert_eq!(collected, 10_000_000_000);
            assert!(required > 50_000_000_000);
        }
        other => panic!("expect InsufficientCapacity, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn sighash_signing_covers_every_group() {
    let key = privkey(1);
    let sender = Address::from_pubkey_hash(key_hash(&key), NetworkType::Testnet);
    let receiver = Address::from_pubkey_hash(H160([9; 20]), NetworkType::Testnet);

    let iterator =
        InputIterator::new_with_inputs(vec![sighash_input(1, 100_000_000_000, &sender)]);
    let mut builder =
        SimpleTransactionBuilder::new(TransactionBuilderConfiguration::new_testnet(), iterator);
    builder.add_output_by_address(&receiver, Capacity::shannons(50_100_000_000));
    builder.add_change_output_by_address(&sender).unwrap();
    let mut tx_with_groups = builder.build(&HandlerContexts::new_sighash()).unwrap();

    let signer = TransactionSigner::new(NetworkType::Testnet);
    let signed = signer
        .sign_transaction(&mut tx_with_groups, &SignContexts::new_sighash(key.clone()))
        .unwrap();
    assert_eq!(signed.len(), tx_with_groups.script_groups().len());

    // the signature must recover to the signing key over the message the
    // placeholder witness defines
    let tx = tx_with_groups.tx_view();
    let witness = WitnessArgs::from_slice(&tx.witnesses[0]).unwrap();
    let signature = witness.lock.unwrap();
    assert_eq!(signature.len(), 65);
    assert_ne!(&signature[..], &[0u8; 65][..]);

    let placeholder = WitnessArgs::new_lock(Bytes::from(vec![0u8; 65]));
    let group = &tx_with_groups.script_groups()[0];
    let message =
        generate_signing_message_with(tx, group, &placeholder.to_bytes()).unwrap();
    let recovered = ckb_txkit::crypto::Signature::from_slice(&signature)
        .unwrap()
        .recover(&message)
        .unwrap();
    assert_eq!(recovered, key.pubkey().unwrap());
}

#[test]
fn a_wrong_key_leaves_the_group_unsigned() {
    let key = privkey(1);
    let sender = Address::from_pubkey_hash(key_hash(&key), NetworkType::Testnet);
    let iterator =
        InputIterator::new_with_inputs(vec![sighash_input(1, 100_000_000_000, &sender)]);
    let mut builder =
        SimpleTransactionBuilder::new(TransactionBuilderConfiguration::new_testnet(), iterator);
    builder.add_output_by_address(&sender, Capacity::shannons(50_000_000_000));
    builder.add_change_output_by_address(&sender).unwrap();
    let mut tx_with_groups = builder.build(&HandlerContexts::new_sighash()).unwrap();

    let signer = TransactionSigner::new(NetworkType::Testnet);
    let signed = signer
        .sign_transaction(&mut tx_with_groups, &SignContexts::new_sighash(privkey(2)))
        .unwrap();
    assert!(signed.is_empty());
}

#[test]
fn multisig_threshold_fills_slots_in_order_of_arrival() {
    let key1 = privkey(1);
    let key2 = privkey(2);
    let outsider = privkey(3);
    let config =
        MultisigConfig::new(0, 2, vec![key_hash(&key1), key_hash(&key2)]).unwrap();

    let lock = Script::new(
        *constants::CODE_HASH_MULTISIG_ALL,
        ScriptHashType::Type,
        Bytes::copy_from_slice(config.hash160().as_bytes()),
    );
    let change = Address::new(lock.clone(), NetworkType::Testnet);
    let iterator =
        InputIterator::new_with_inputs(vec![live_input(1, 100_000_000_000, lock, None, Bytes::new())]);
    let mut builder =
        SimpleTransactionBuilder::new(TransactionBuilderConfiguration::new_testnet(), iterator);
    builder.add_output_by_address(
        &Address::from_pubkey_hash(H160([9; 20]), NetworkType::Testnet),
        Capacity::shannons(50_000_000_000),
    );
    builder.add_change_output_by_address(&change).unwrap();
    let mut tx_with_groups = builder
        .build(&HandlerContexts::new_multisig(config.clone()))
        .unwrap();

    let signer = TransactionSigner::new(NetworkType::Testnet);

    // first party holds key1 plus an unrelated key; only key1 lands
    let signed = signer
        .sign_transaction(
            &mut tx_with_groups,
            &SignContexts::new_multisig(vec![key1.clone(), outsider], config.clone()),
        )
        .unwrap();
    assert_eq!(signed, vec![0]);
    let header_len = config.encode().len();
    let lock_field = |tx_with_groups: &ckb_txkit::transaction::TransactionWithScriptGroups| {
        WitnessArgs::from_slice(&tx_with_groups.tx_view().witnesses[0])
            .unwrap()
            .lock
            .unwrap()
    };
    let partial = lock_field(&tx_with_groups);
    assert_ne!(&partial[header_len..header_len + 65], &[0u8; 65][..]);
    assert_eq!(&partial[header_len + 65..], &[0u8; 65][..]);

    // second party completes the threshold in a separate call
    let signed = signer
        .sign_transaction(
            &mut tx_with_groups,
            &SignContexts::new_multisig(vec![key2.clone()], config.clone()),
        )
        .unwrap();
    assert_eq!(signed, vec![0]);
    let full = lock_field(&tx_with_groups);
    assert_eq!(full.len(), header_len + 130);
    assert_eq!(&full[..header_len], &config.encode()[..]);
    assert_ne!(&full[header_len + 65..], &[0u8; 65][..]);

    // both signatures recover against the zeroed-placeholder message
    let tx = tx_with_groups.tx_view();
    let group = &tx_with_groups.script_groups()[0];
    let mut message_witness = WitnessArgs::from_slice(&tx.witnesses[0]).unwrap();
    message_witness.lock = Some(config.placeholder_witness_lock());
    let message =
        generate_signing_message_with(tx, group, &message_witness.to_bytes()).unwrap();
    for (slot, key) in [(0, &key1), (1, &key2)] {
        let start = header_len + slot * 65;
        let recovered = ckb_txkit::crypto::Signature::from_slice(&full[start..start + 65])
            .unwrap()
            .recover(&message)
            .unwrap();
        assert_eq!(recovered, key.pubkey().unwrap());
    }
}

#[test]
fn multisig_context_downcast_is_exact() {
    // a multisig context never triggers the sighash handler and vice versa
    let config = MultisigConfig::new(0, 1, vec![H160([1; 20])]).unwrap();
    let context = Secp256k1Blake160MultisigAllScriptContext::new(config);
    let mut contexts = HandlerContexts::default();
    contexts.add_context(Box::new(context));

    let sender = Address::from_pubkey_hash(H160([1; 20]), NetworkType::Testnet);
    let iterator =
        InputIterator::new_with_inputs(vec![sighash_input(1, 100_000_000_000, &sender)]);
    let mut builder =
        SimpleTransactionBuilder::new(TransactionBuilderConfiguration::new_testnet(), iterator);
    builder.add_output_by_address(&sender, Capacity::shannons(50_000_000_000));
    builder.add_change_output_by_address(&sender).unwrap();
    let tx_with_groups = builder.build(&contexts).unwrap();
    // without the sighash context no placeholder was installed
    assert!(tx_with_groups.tx_view().witnesses[0].is_empty());
}

fn dao_header(tag: u8, number: u64, epoch: EpochNumberWithFraction, ar: u64) -> Header {
    let mut dao = [0u8; 32];
    LittleEndian::write_u64(&mut dao[8..16], ar);
    Header {
        hash: H256([tag; 32]),
        number,
        epoch,
        timestamp: 0,
        dao,
    }
}

#[test]
fn dao_claim_feeds_the_reward_into_the_balance() {
    let key = privkey(1);
    let owner = Address::from_pubkey_hash(key_hash(&key), NetworkType::Testnet);
    let dao_type = Script::new(*constants::CODE_HASH_DAO, ScriptHashType::Type, Bytes::new());

    let deposit_header = dao_header(
        10,
        100,
        EpochNumberWithFraction::new(5, 0, 1800),
        10_000_000_000_000,
    );
    let withdraw_header = dao_header(
        20,
        200,
        EpochNumberWithFraction::new(200, 0, 1800),
        10_100_000_000_000,
    );

    let mut deposit_number_data = [0u8; 8];
    LittleEndian::write_u64(&mut deposit_number_data, deposit_header.number);
    let withdraw_cell = live_input(
        1,
        100_000_000_000,
        owner.payload().clone(),
        Some(dao_type),
        Bytes::copy_from_slice(&deposit_number_data),
    );
    let expected_reward = dao::reward(
        &withdraw_cell.live_cell.output,
        &withdraw_cell.live_cell.output_data,
        &deposit_header.dao,
        &withdraw_header.dao,
    )
    .unwrap();
    assert!(expected_reward > 0);

    let mut builder = DaoClaimTransactionBuilder::new(
        TransactionBuilderConfiguration::new_testnet(),
        InputIterator::new_with_inputs(vec![]),
        withdraw_cell,
        &deposit_header,
        &withdraw_header,
    )
    .unwrap();
    builder.add_change_output_by_address(&owner).unwrap();

    let mut contexts = HandlerContexts::new_sighash();
    contexts.add_context(Box::new(DaoClaimContext::new(
        deposit_header.clone(),
        withdraw_header.clone(),
    )));
    let mut tx_with_groups = builder.build(&contexts).unwrap();
    let tx = tx_with_groups.tx_view();

    assert_eq!(tx.header_deps, vec![deposit_header.hash, withdraw_header.hash]);
    let expected_since = dao::minimum_since(deposit_header.epoch, withdraw_header.epoch);
    assert_eq!(tx.inputs[0].since, expected_since.as_u64());
    let witness = WitnessArgs::from_slice(&tx.witnesses[0]).unwrap();
    assert_eq!(witness.input_type, Some(Bytes::from(vec![0u8; 8])));

    // the reward joins the inputs on the available side of the balance
    let fee = 100_000_000_000 + expected_reward - tx.outputs_capacity().unwrap().as_u64();
    assert_eq!(fee, tx.serialized_size_in_block() as u64);

    // two groups: the owner's lock and the DAO type; only the lock has a
    // registered signer and that is not an error
    assert_eq!(tx_with_groups.script_groups().len(), 2);
    let signer = TransactionSigner::new(NetworkType::Testnet);
    let signed = signer
        .sign_transaction(&mut tx_with_groups, &SignContexts::new_sighash(key))
        .unwrap();
    assert_eq!(signed.len(), 1);
}

fn omnilock_script(config: &OmniLockConfig) -> Script {
    let mut args = config.identity().encode().to_vec();
    args.push(0); // omni flags: no extra mode fields
    Script::new(
        constants::omnilock_code_hash(NetworkType::Testnet),
        ScriptHashType::Type,
        args.into(),
    )
}

fn omnilock_configuration() -> TransactionBuilderConfiguration {
    let mut configuration = TransactionBuilderConfiguration::new_testnet();
    let dep = CellDep::new(OutPoint::new(H256([0xAA; 32]), 0), DepType::DepGroup);
    configuration.register_script_handler(Box::new(OmniLockScriptHandler::new_with_network(
        NetworkType::Testnet,
        vec![dep],
    )));
    configuration
}

#[test]
fn omnilock_single_sig_signs_inside_the_witness_structure() {
    let key = privkey(1);
    let config = OmniLockConfig::new_pubkey_hash(key_hash(&key));
    let lock = omnilock_script(&config);
    let change = Address::new(lock.clone(), NetworkType::Testnet);

    let iterator =
        InputIterator::new_with_inputs(vec![live_input(1, 100_000_000_000, lock, None, Bytes::new())]);
    let mut builder = SimpleTransactionBuilder::new(omnilock_configuration(), iterator);
    builder.add_output_by_address(
        &Address::from_pubkey_hash(H160([9; 20]), NetworkType::Testnet),
        Capacity::shannons(50_000_000_000),
    );
    builder.add_change_output_by_address(&change).unwrap();

    let mut contexts = HandlerContexts::default();
    contexts.add_context(Box::new(OmniLockScriptContext::new(config.clone())));
    let mut tx_with_groups = builder.build(&contexts).unwrap();

    // the placeholder is the omnilock witness structure, not a bare signature
    let placeholder = WitnessArgs::from_slice(&tx_with_groups.tx_view().witnesses[0])
        .unwrap()
        .lock
        .unwrap();
    let parsed = OmniLockWitnessLock::from_slice(&placeholder).unwrap();
    assert_eq!(parsed.signature, Some(Bytes::from(vec![0u8; 65])));

    let signer = TransactionSigner::new(NetworkType::Testnet);
    let signed = signer
        .sign_transaction(
            &mut tx_with_groups,
            &SignContexts::new_omnilock(key.clone(), config),
        )
        .unwrap();
    assert_eq!(signed, vec![0]);

    let tx = tx_with_groups.tx_view();
    let witness = WitnessArgs::from_slice(&tx.witnesses[0]).unwrap();
    let omni = OmniLockWitnessLock::from_slice(&witness.lock.unwrap()).unwrap();
    let signature = omni.signature.unwrap();
    assert_ne!(&signature[..], &[0u8; 65][..]);

    // same length before and after, so the estimated fee still holds
    assert_eq!(
        tx.witnesses[0].len(),
        WitnessArgs::new_lock(placeholder).to_bytes().len()
    );
}
