//! Walkthrough of a channel from creation to payout.
//!
//! Alice and Bob each lock 20 tokens, make three payments off the ledger and
//! Bob closes the channel with the latest state Alice signed. Run with
//! `RUST_LOG=paychan=debug` to see the contract's events.

use std::sync::mpsc;

use paychan::{
    wire::{self, ProposalBus, ProtoBufEncodingLayer},
    Address, BalanceProposal, ChannelManager, Clock, EthVerifier, InMemoryEscrow, ManagerConfig,
    ManualClock, Signer,
};
use tracing_subscriber::EnvFilter;

const PARTICIPANTS: [&str; 2] = ["Alice", "Bob"];
const TOKEN: Address = Address([0xee; 20]);
const DEPOSIT: u32 = 20;

/// Byte link between the two parties. For simplicity only using
/// [std::sync::mpsc] and printing the frames to stdout.
#[derive(Debug)]
struct Link {
    participant: usize,
    tx: mpsc::Sender<Vec<u8>>,
}

impl ProposalBus for &Link {
    fn send_to_counterparty(&self, msg: &[u8]) {
        println!(
            "{}->{}: {} bytes",
            PARTICIPANTS[self.participant],
            PARTICIPANTS[1 - self.participant],
            msg.len()
        );
        self.tx.send(msg.to_vec()).unwrap();
    }
}

/// Helper macro to print significant places in the protocol.
macro_rules! print_bold {
    ($($arg:tt)*) => {
        print!("\x1b[1m");
        print!($($arg)*);
        println!("\x1b[0m");
    };
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut rng = rand::thread_rng();
    let alice = Signer::new(&mut rng);
    let bob = Signer::new(&mut rng);
    let (a, b) = (alice.address(), bob.address());

    let mut escrow = InMemoryEscrow::new();
    for party in [a, b] {
        escrow.mint(TOKEN, party, 1000).unwrap();
        escrow.approve(TOKEN, party, u64::from(DEPOSIT));
    }
    let clock = ManualClock::new(0);
    let mut contract =
        ChannelManager::new(EthVerifier, escrow, &clock, ManagerConfig::default()).unwrap();

    print_bold!("Alice opens a channel with Bob, both fund it");
    let id = rand::random();
    contract.create(id, a, b, TOKEN, DEPOSIT).unwrap();
    contract.fund(a, id).unwrap();
    contract.fund(b, id).unwrap();
    println!("{:#?}", contract.details(id).unwrap());

    print_bold!("Alice pays Bob three times, signing each new balance for Bob");
    let (tx, rx) = mpsc::channel();
    let link = Link { participant: 0, tx };
    let alice_out = ProtoBufEncodingLayer::new(&link);
    for (nonce, balance_a) in [(1, 15), (2, 11), (3, 6)] {
        let signed = BalanceProposal::new(id, nonce, balance_a)
            .sign(&alice, b)
            .unwrap();
        alice_out.relay(signed).unwrap();
    }
    drop(alice_out);
    drop(link);

    print_bold!("Bob submits what he received; only the newest one sticks");
    for frame in rx {
        let signed = wire::decode(&frame).unwrap();
        match contract.submit(b, signed) {
            Ok(()) => println!("nonce {} accepted", signed.proposal.nonce),
            Err(e) => println!("nonce {} rejected: {}", signed.proposal.nonce, e),
        }
    }

    let deadline = contract.details(id).unwrap().settlement_deadline.unwrap();
    print_bold!("Waiting for the dispute window to close at tick {}", deadline);
    if let Err(e) = contract.withdraw(id) {
        println!("early withdraw: {}", e);
    }
    clock.advance(deadline - clock.now());

    let payout = contract.withdraw(id).unwrap();
    print_bold!(
        "Paid out: Alice {}, Bob {}",
        payout.amount_a,
        payout.amount_b
    );
    println!(
        "Balances: Alice {}, Bob {}",
        contract.escrow().balance_of(TOKEN, a),
        contract.escrow().balance_of(TOKEN, b)
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&contract.details(id).unwrap()).unwrap()
    );
}
