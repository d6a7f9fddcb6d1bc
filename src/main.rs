//! Demand-response market simulator entry point: CLI wiring and config-driven market construction.

use std::path::Path;
use std::process;

use tracing::info;
use tracing_subscriber::EnvFilter;

use dr_market_sim::config::ScenarioConfig;
use dr_market_sim::io::export::export_csv;
use dr_market_sim::market::driver::Driver;
use dr_market_sim::market::kpi::KpiReport;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    telemetry_out: Option<String>,
    quiet: bool,
}

fn print_help() {
    eprintln!("dr-market-sim: hourly demand-response market simulator");
    eprintln!();
    eprintln!("Usage: dr-market-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --telemetry-out <path>   Export per-user hourly records to CSV");
    eprintln!("  --quiet                  Do not print per-user hourly records");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

/// Prints `message` and exits with status 1.
fn fail(message: &str) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        telemetry_out: None,
        quiet: false,
    };

    while let Some(flag) = args.next() {
        let mut value = |what: &str| {
            args.next()
                .unwrap_or_else(|| fail(&format!("{flag} requires {what}")))
        };
        match flag.as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => cli.scenario_path = Some(value("a path argument")),
            "--preset" => cli.preset = Some(value("a name argument")),
            "--telemetry-out" => cli.telemetry_out = Some(value("a path argument")),
            "--seed" => {
                let raw = value("a u64 argument");
                match raw.parse::<u64>() {
                    Ok(seed) => cli.seed_override = Some(seed),
                    Err(_) => fail(&format!("--seed value \"{raw}\" is not a valid u64")),
                }
            }
            "--quiet" => cli.quiet = true,
            _ => {
                print_help();
                fail(&format!("unknown argument \"{flag}\""));
            }
        }
    }

    cli
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();

    // --scenario takes priority, then --preset, then baseline default
    let loaded = match (&cli.scenario_path, &cli.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(Path::new(path)),
        (None, Some(name)) => ScenarioConfig::from_preset(name),
        (None, None) => Ok(ScenarioConfig::baseline()),
    };
    let mut scenario = loaded.unwrap_or_else(|e| fail(&e.to_string()));

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let market = scenario
        .build_market()
        .unwrap_or_else(|e| fail(&e.to_string()));
    let window = market.power_window();
    info!(
        users = market.users().len(),
        hours = scenario.simulation.hours_per_day,
        days = scenario.simulation.days,
        seed = scenario.simulation.seed,
        power_lo = window.lo,
        power_hi = window.hi,
        "market built"
    );

    let records = Driver::new(market, scenario.simulation.days)
        .and_then(|mut driver| driver.run_collect())
        .unwrap_or_else(|e| fail(&e.to_string()));

    if !cli.quiet {
        for r in &records {
            println!("{r}");
        }
    }

    let kpi = KpiReport::from_records(&records);
    println!("\n{kpi}");

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&records, Path::new(path)) {
            fail(&format!("failed to write CSV: {e}"));
        }
        eprintln!("Telemetry written to {path}");
    }
}
