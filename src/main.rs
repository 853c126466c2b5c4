use std::io;
use std::process::ExitCode;
use std::{env, fs};

use chocopy::RunStatus;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: chocopy [script]");
        return ExitCode::from(64);
    }

    let source = match fs::read_to_string(&args[1]) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read {}: {err}", args[1]);
            return ExitCode::from(66);
        }
    };

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut stdout = io::stdout().lock();

    match chocopy::run(&source, &mut reader, &mut stdout) {
        RunStatus::Success => ExitCode::SUCCESS,
        RunStatus::FrontEndErrors(messages) => {
            for message in messages {
                eprintln!("{message}");
            }
            ExitCode::from(65)
        }
        RunStatus::Fault(fault) => {
            eprintln!("{fault}");
            ExitCode::from(fault.exit_code)
        }
    }
}
