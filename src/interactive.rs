//! Prompt loop for manual simulations

use crate::error::{LootError, Result};
use crate::report::render_simulation;
use crate::simulation::{runs_for_stamina, simulate_stage};
use crate::stage::Dataset;
use rand::Rng;
use std::io::{self, BufRead, Write};

/// Read one answer. `None` on end of input or `exit`.
fn prompt<I: BufRead, O: Write>(
    input: &mut I,
    output: &mut O,
    question: &str,
) -> io::Result<Option<String>> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let answer = line.trim();
    if answer.eq_ignore_ascii_case("exit") {
        return Ok(None);
    }
    Ok(Some(answer.to_string()))
}

/// Ask for a stage and a run count or stamina budget, simulate, repeat.
///
/// Bad input and recoverable errors restart the loop; anything else ends it.
pub fn run_interactive<I, O, R>(
    dataset: &Dataset,
    input: &mut I,
    output: &mut O,
    rng: &mut R,
) -> Result<()>
where
    I: BufRead,
    O: Write,
    R: Rng + ?Sized,
{
    writeln!(output, "Enter 'exit' at any prompt to quit.")?;
    let bosses = dataset.bosses().join(", ");

    loop {
        writeln!(output, "{}", "-".repeat(50))?;

        let Some(boss) = prompt(input, output, &format!("Boss ({bosses}): "))? else {
            break;
        };
        if !dataset.has_boss(&boss) {
            writeln!(output, "Unknown boss, try again.")?;
            continue;
        }

        let difficulties = dataset.difficulties(&boss).join(", ");
        let question = format!("Difficulty for {boss} ({difficulties}): ");
        let Some(difficulty) = prompt(input, output, &question)? else {
            break;
        };
        let stage = match dataset.stage(&boss, &difficulty) {
            Ok(stage) => stage,
            Err(_) => {
                writeln!(output, "Unknown difficulty, try again.")?;
                continue;
            }
        };

        let Some(mode) = prompt(input, output, "Mode (1: run count, 2: stamina budget): ")? else {
            break;
        };
        let runs = match mode.as_str() {
            "1" => {
                let Some(answer) = prompt(input, output, "Runs: ")? else {
                    break;
                };
                match answer.parse::<u64>() {
                    Ok(runs) => runs,
                    Err(_) => {
                        writeln!(output, "Invalid number, try again.")?;
                        continue;
                    }
                }
            }
            "2" => {
                let Some(answer) = prompt(input, output, "Stamina: ")? else {
                    break;
                };
                let budget = match answer.parse::<u64>() {
                    Ok(budget) => budget,
                    Err(_) => {
                        writeln!(output, "Invalid number, try again.")?;
                        continue;
                    }
                };
                match runs_for_stamina(stage, budget) {
                    Ok(runs) => runs,
                    Err(LootError::InsufficientStamina {
                        stage, required, ..
                    }) => {
                        writeln!(
                            output,
                            "Not enough stamina for one run of {stage} (needs {required})."
                        )?;
                        continue;
                    }
                    Err(e) if e.is_recoverable() => {
                        writeln!(output, "Error: {e}")?;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }
            _ => {
                writeln!(output, "Invalid mode.")?;
                continue;
            }
        };

        if runs == 0 {
            continue;
        }
        match simulate_stage(stage, runs, rng) {
            Ok(outcome) => write!(output, "{}", render_simulation(&outcome))?,
            Err(e) if e.is_recoverable() => {
                log::warn!("simulation failed: {e}");
                writeln!(output, "Error: {e}")?;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
