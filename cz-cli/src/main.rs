//! cz: self-play policy learning for the crafting minigame.
//!
//! Runs the unbounded simulate/train loop with the canonical craft
//! parameters, or parameters loaded from a YAML file. Interrupt externally to
//! stop.

use std::env;
use std::process;

use cz_core::CraftParams;
use cz_logging::EventLog;
use cz_selfplay::{Driver, DriverConfig};
use rand::RngCore;

fn print_help() {
    println!(
        r#"cz - self-play learner for the crafting minigame

USAGE:
    cz [--config FILE] [--seed S] [--iters N] [--events FILE]

OPTIONS:
    --config FILE   Load craft parameters from a YAML file
                    (default: compiled-in canonical recipe)
    --seed S        RNG seed (default: drawn from the OS)
    --iters N       Stop after N iterations (default: run forever)
    --events FILE   Append NDJSON iteration events to FILE
    -h, --help      Show this help
"#
    );
}

struct Options {
    config: Option<String>,
    seed: Option<u64>,
    iters: Option<u64>,
    events: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut opts = Options {
        config: None,
        seed: None,
        iters: None,
        events: None,
    };
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => {
                i += 1;
                opts.config = Some(
                    args.get(i)
                        .ok_or("--config requires a file path")?
                        .clone(),
                );
            }
            "--seed" => {
                i += 1;
                let raw = args.get(i).ok_or("--seed requires a value")?;
                opts.seed = Some(raw.parse().map_err(|_| format!("bad seed: {}", raw))?);
            }
            "--iters" => {
                i += 1;
                let raw = args.get(i).ok_or("--iters requires a value")?;
                opts.iters = Some(raw.parse().map_err(|_| format!("bad count: {}", raw))?);
            }
            "--events" => {
                i += 1;
                opts.events = Some(
                    args.get(i)
                        .ok_or("--events requires a file path")?
                        .clone(),
                );
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
        i += 1;
    }
    Ok(opts)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let opts = match parse_args(&args) {
        Ok(o) => o,
        Err(msg) => {
            eprintln!("error: {}", msg);
            print_help();
            process::exit(2);
        }
    };

    let params = match &opts.config {
        Some(path) => match CraftParams::load(path) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(2);
            }
        },
        None => CraftParams::default(),
    };
    if let Err(e) = params.validate() {
        eprintln!("error: {}", e);
        process::exit(2);
    }

    let seed = opts
        .seed
        .unwrap_or_else(|| rand::thread_rng().next_u64());
    log::info!("seed = {}", seed);

    let mut events = match &opts.events {
        Some(path) => match EventLog::open(path) {
            Ok(log) => Some(log),
            Err(e) => {
                eprintln!("error: cannot open {}: {}", path, e);
                process::exit(2);
            }
        },
        None => None,
    };

    let mut driver = Driver::new(params, DriverConfig::default(), seed);
    loop {
        let summary = driver.run_iteration(events.as_mut());
        println!(
            "iter {:>6}  plies {:>3}  score {:.4}  {}  states {:>7}  buffer {:>5}  {} ms",
            summary.iteration,
            summary.plies,
            summary.score,
            if summary.resigned { "resigned" } else { "played  " },
            summary.table_states,
            summary.buffer_len,
            summary.elapsed_ms,
        );
        if let Some(n) = opts.iters {
            if summary.iteration >= n {
                break;
            }
        }
    }
}
