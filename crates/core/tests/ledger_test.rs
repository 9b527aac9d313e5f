use powledger_core::{Amount, Block, Hash, Keypair, Record, Wallet};

#[test]
fn test_wallet_transfer_scenario() {
    let mut a = Wallet::new("wallet-a").unwrap();
    let b = Wallet::new("wallet-b").unwrap();

    let tx = a.send_funds(b.id(), "10.0".parse().unwrap()).unwrap();

    assert_eq!(tx.nonce, 1);
    assert_eq!(tx.amount, Amount::from_whole(10).unwrap());
    assert_eq!(tx.signature_len(), 64);
    assert!(tx.is_valid(a.public_key()));
    assert!(!tx.is_valid(b.public_key()));
}

#[test]
fn test_mine_block_with_two_transactions() {
    let mut a = Wallet::new("wallet-a").unwrap();
    let b = Wallet::new("wallet-b").unwrap();

    let records = vec![
        a.send_funds(b.id(), "10.0".parse().unwrap()).unwrap(),
        a.send_funds(b.id(), "2.5".parse().unwrap()).unwrap(),
    ];
    assert!(records.iter().all(|r| r.is_valid(a.public_key())));

    let prev = Hash::from_hex(&format!("{:0<64}", "0000")).unwrap();
    let mut block = Block::new(records, prev, 2).unwrap();
    let hash = block.mine_block();

    assert_eq!(&hash.to_hex()[..2], "00");
    assert_eq!(block.generate_hash(), hash);
    assert_eq!(block.block_hash(), Some(hash));
    assert_eq!(block.prev_hash(), prev);
    assert!(block.verify_pow());
}

#[test]
fn test_mining_difficulties_zero_to_four() {
    for difficulty in 0..=4 {
        let mut block = Block::genesis(difficulty).unwrap();
        let hash = block.mine_block();
        assert!(hash.leading_zero_nibbles() >= difficulty);
        assert_eq!(block.generate_hash(), hash);
    }
}

#[test]
fn test_blocks_chain_by_hash() {
    let kp = Keypair::generate().unwrap();
    let mut genesis = Block::genesis(1).unwrap();
    let genesis_hash = genesis.mine_block();

    let tx = Record::transfer("a", "b", Amount::from_whole(1).unwrap(), 1)
        .signed(&kp)
        .unwrap();
    let mut next = Block::new(vec![tx], genesis_hash, 1).unwrap();
    next.mine_block();

    assert!(genesis.is_genesis());
    assert_eq!(next.prev_hash(), genesis.block_hash().unwrap());
    assert!(next.verify_pow());
}

#[test]
fn test_mined_block_survives_serialization() {
    let kp = Keypair::generate().unwrap();
    let tx = Record::agreement("a", "b", Amount::ZERO, "deliver on friday", 7)
        .signed(&kp)
        .unwrap();
    let mut block = Block::new(vec![tx], Hash::ZERO, 1).unwrap();
    block.mine_block();

    let json = serde_json::to_string(&block).unwrap();
    let decoded: Block = serde_json::from_str(&json).unwrap();

    assert_eq!(decoded, block);
    assert!(decoded.verify_pow());
    assert!(decoded.records()[0].is_valid(kp.public_key()));
}
