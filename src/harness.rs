use std::fs;
use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result, ensure};

use crate::RunStatus;

fn normalize_output(output: &str) -> String {
    output.replace("\r\n", "\n").trim_end().to_string()
}

fn run_program(source: &str, input: &str) -> (RunStatus, String) {
    let mut stdin = Cursor::new(input.as_bytes().to_vec());
    let mut stdout = Vec::new();
    let status = crate::run(source, &mut stdin, &mut stdout);
    (status, String::from_utf8_lossy(&stdout).into_owned())
}

/// Walks tests/programs: each .py runs against a sibling .out (expected
/// stdout) or .err (expected substring of the reported error). An optional
/// .in file provides stdin.
#[test]
fn runs_fixture_programs() -> Result<()> {
    let programs_dir = Path::new("tests/programs");
    let mut programs = Vec::new();

    for entry in
        fs::read_dir(programs_dir).with_context(|| format!("Reading {}", programs_dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("py") {
            programs.push(path);
        }
    }

    ensure!(
        !programs.is_empty(),
        "No .py programs found in {}",
        programs_dir.display()
    );
    programs.sort();

    for path in programs {
        let source =
            fs::read_to_string(&path).with_context(|| format!("Reading {}", path.display()))?;
        let input_path = path.with_extension("in");
        let input = if input_path.exists() {
            fs::read_to_string(&input_path)
                .with_context(|| format!("Reading {}", input_path.display()))?
        } else {
            String::new()
        };

        let (status, output) = run_program(&source, &input);

        let expected_error_path = path.with_extension("err");
        if expected_error_path.exists() {
            let expected_error = fs::read_to_string(&expected_error_path)
                .with_context(|| format!("Reading {}", expected_error_path.display()))?;
            let expected_error = expected_error.trim().to_string();
            let reported = match status {
                RunStatus::FrontEndErrors(messages) => messages.join("\n"),
                RunStatus::Fault(fault) => fault.to_string(),
                RunStatus::Success => {
                    anyhow::bail!(
                        "Expected error containing '{expected_error}' for {}, program succeeded",
                        path.display()
                    );
                }
            };
            ensure!(
                reported.contains(&expected_error),
                "Expected error containing '{expected_error}' for {}, got '{reported}'",
                path.display()
            );
            continue;
        }

        let expected_path = path.with_extension("out");
        let expected = fs::read_to_string(&expected_path)
            .with_context(|| format!("Reading {}", expected_path.display()))?;
        match status {
            RunStatus::Success => {}
            RunStatus::FrontEndErrors(messages) => {
                anyhow::bail!("Unexpected errors for {}: {messages:?}", path.display());
            }
            RunStatus::Fault(fault) => {
                anyhow::bail!("Unexpected fault for {}: {fault}", path.display());
            }
        }
        assert_eq!(
            normalize_output(&output),
            normalize_output(&expected),
            "Output mismatch for {}",
            path.display()
        );
    }

    Ok(())
}
