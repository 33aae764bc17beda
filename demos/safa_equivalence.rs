use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use color_eyre::Result;
use log::info;

use symbolic_automata::algebra::BooleanAlgebra;
use symbolic_automata::congruence::{BddRelation, CongruenceRelation, SatRelation};
use symbolic_automata::deadline::Deadline;
use symbolic_automata::expr::BoolExpr;
use symbolic_automata::intervals::{CharAlgebra, Ranges};
use symbolic_automata::safa::{Safa, SafaMove};
use symbolic_automata::sop::SopLattice;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Backend {
    Bdd,
    Sat,
}

#[derive(Parser)]
#[command(author, version, about = "Equivalence of alternating automata by bisimulation up to congruence")]
struct Cli {
    /// Congruence relation backend.
    #[arg(short, long, value_enum, default_value = "bdd")]
    backend: Backend,

    /// Time budget in milliseconds.
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,
}

fn at_least_one(p: Ranges, ba: &CharAlgebra, d: &Deadline) -> Result<Safa<Ranges>> {
    Ok(Safa::new(
        [
            SafaMove::new(0, p.clone(), BoolExpr::State(1)),
            SafaMove::new(0, ba.mk_not(&p), BoolExpr::State(0)),
            SafaMove::new(1, ba.mk_true(), BoolExpr::State(1)),
        ],
        BoolExpr::State(0),
        [1],
        ba,
        d,
    )?)
}

/// Product of "some lowercase letter" and "some digit", built by hand.
fn product(ba: &CharAlgebra, d: &Deadline) -> Result<Safa<Ranges>> {
    let lower = ba.range('a', 'z');
    let digit = ba.range('0', '9');
    let other = ba.mk_not(&ba.mk_or(&lower, &digit));
    let s = BoolExpr::State;
    Ok(Safa::new(
        [
            SafaMove::new(0, lower.clone(), s(1)),
            SafaMove::new(0, digit.clone(), s(2)),
            SafaMove::new(0, other, s(0)),
            SafaMove::new(1, digit.clone(), s(3)),
            SafaMove::new(1, ba.mk_not(&digit), s(1)),
            SafaMove::new(2, lower.clone(), s(3)),
            SafaMove::new(2, ba.mk_not(&lower), s(2)),
            SafaMove::new(3, ba.mk_true(), s(3)),
        ],
        s(0),
        [3],
        ba,
        d,
    )?)
}

fn check<R: CongruenceRelation>(
    name: &str,
    a: &Safa<Ranges>,
    b: &Safa<Ranges>,
    relation: &mut R,
    ba: &CharAlgebra,
    d: &Deadline,
) -> Result<()> {
    let start = Instant::now();
    let result = Safa::is_equivalent(a, b, &mut SopLattice, relation, ba, d)?;
    match result {
        None => println!("{}: equivalent", name),
        Some(w) => println!("{}: differ on {:?}", name, w.iter().collect::<String>()),
    }
    info!(
        "{}: {} pairs recorded in {:.3}s",
        name,
        relation.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let cli = Cli::parse();
    let d = match cli.timeout {
        Some(ms) => Deadline::after(Duration::from_millis(ms)),
        None => Deadline::unlimited(),
    };
    let ba = CharAlgebra::new();

    let lower = at_least_one(ba.range('a', 'z'), &ba, &d)?;
    let digit = at_least_one(ba.range('0', '9'), &ba, &d)?;
    let both = lower.intersection(&digit, &ba, &d)?;
    let by_hand = product(&ba, &d)?;
    println!("intersection:\n{}", both);

    for w in ["a1", "aa", "11", "x9y"] {
        let word: Vec<char> = w.chars().collect();
        println!("{:?}: {}", w, both.accepts(&word, &ba));
    }

    let pairs = [("intersection vs product", &both, &by_hand), ("intersection vs lowercase", &both, &lower)];
    for (name, a, b) in pairs {
        match cli.backend {
            Backend::Bdd => check(name, a, b, &mut BddRelation::new(), &ba, &d)?,
            Backend::Sat => check(name, a, b, &mut SatRelation::new(), &ba, &d)?,
        }
    }

    Ok(())
}
