use std::path::Path;
use std::process;

use ansi_term::Colour::{Green, Red};
use clap::{App, Arg};
use log::debug;

use iron86::fixture::{self, FixtureError};

fn main() {
    env_logger::init();

    let matches = App::new("iron86")
        .version("0.1.0")
        .about("Runs a per-opcode 8086 conformance fixture against the core")
        .arg(
            Arg::with_name("fixture")
                .value_name("FILE")
                .help("gzip-compressed JSON fixture file")
                .required(true),
        )
        .arg(
            Arg::with_name("case")
                .short("c")
                .long("case")
                .value_name("INDEX")
                .takes_value(true)
                .help("run only the case at this index"),
        )
        .get_matches();

    let path = matches.value_of("fixture").unwrap();
    let case_index = match matches.value_of("case").map(str::parse::<usize>) {
        None => None,
        Some(Ok(index)) => Some(index),
        Some(Err(_)) => {
            eprintln!("error: --case expects a non-negative integer");
            process::exit(2);
        }
    };

    match run(Path::new(path), case_index) {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(2);
        }
    }
}

fn run(path: &Path, case_index: Option<usize>) -> Result<bool, FixtureError> {
    let cases = fixture::load(path)?;
    if let Some(index) = case_index {
        if index >= cases.len() {
            return Err(FixtureError::CaseOutOfRange { index, count: cases.len() });
        }
    }

    let mut passed = 0usize;
    let mut failed = 0usize;
    for (index, case) in cases.iter().enumerate() {
        if case_index.map_or(false, |only| only != index) {
            continue;
        }
        let mismatches = fixture::run_case(case);
        if mismatches.is_empty() {
            passed += 1;
            debug!("#{} {} ... ok", index, case.name);
        } else {
            failed += 1;
            println!("{} #{} {}", Red.paint("FAILED"), index, case.name);
            for m in &mismatches {
                println!("    {}: expected {:#06x}, got {:#06x}", m.field, m.expected, m.actual);
            }
        }
    }

    let verdict = if failed == 0 {
        Green.paint("ok").to_string()
    } else {
        Red.paint("FAILED").to_string()
    };
    println!("{}: {} passed, {} failed", verdict, passed, failed);
    Ok(failed == 0)
}
