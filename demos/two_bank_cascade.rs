//! Two-round default cascade.
//!
//! Bank 0 is insolvent; bank 1 is solvent only because bank 0 owes it.
//! Writing down bank 0's obligation pushes bank 1 under one round later.

use contagion_engine::prelude::*;
use rust_decimal_macros::dec;

fn main() {
    env_logger::init();

    println!("╔═════════════════════════════════════════════╗");
    println!("║  contagion-engine: Two-Bank Cascade Example ║");
    println!("╚═════════════════════════════════════════════╝\n");

    let claims = AssetMatrix::from_rows(vec![
        vec![dec!(0), dec!(6)],
        vec![dec!(0), dec!(0)],
    ])
    .expect("square matrix");

    let mut sim = Simulator::new(
        claims,
        vec![dec!(0), dec!(0)],
        vec![dec!(7), dec!(1)],
        dec!(0),
        MemorySink::new(),
    )
    .expect("valid network");

    println!("━━━ Before the shock ━━━\n");
    for bank in 0..sim.size() {
        let sheet = sim.balance_sheet(bank).expect("bank in range");
        println!(
            "  bank {}  assets {:>4}  liabilities {:>4}  equity {:>4}",
            bank,
            sheet.total_assets(),
            sheet.total_liabilities(),
            sheet.equity()
        );
    }
    println!();

    println!("━━━ Round by round ━━━\n");
    let mut outcome = sim.apply_initial_shock().expect("shock round");
    loop {
        println!(
            "  t={}  new defaults {:?}  status {}",
            outcome.t, outcome.new_defaults, outcome.status
        );
        if outcome.status.is_terminal() {
            break;
        }
        outcome = sim.step().expect("contagion round");
    }
    println!();

    println!("{}", sim.summary());
}
