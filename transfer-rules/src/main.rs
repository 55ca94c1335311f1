use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use transfer_rules::scenario::Scenario;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: transfer-rules <scenario.json>");
        return ExitCode::from(2);
    };

    let scenario = match Scenario::load(&path) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("{path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = scenario.run();
    print!("{}", report.trace);

    match &report.outcome.reason {
        Some(reason) => println!("{} - {reason}", report.outcome.verdict),
        None => println!("{}", report.outcome.verdict),
    }

    for charge in &report.surcharges {
        println!(
            "SEG {} CHARGE {} {} DEC {}{}",
            charge.segment,
            charge.amount,
            charge.currency,
            charge.decimals,
            if charge.segment_specific { " SEGMENT SPECIFIC" } else { "" }
        );
    }

    ExitCode::SUCCESS
}
