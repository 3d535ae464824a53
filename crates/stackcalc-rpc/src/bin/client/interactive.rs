//! Line-oriented prompt over a `RemoteCalculator`.

use anyhow::Result;
use stackcalc_core::RemoteCalculator;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  push <value>   push an integer
  op <operator>  collapse the stack with min, max, gcd or lcm
  pop            pop the top value
  empty          report whether the stack is empty
  delay <ms>     wait, then pop
  help           show this message
  quit           exit";

/// One parsed prompt line.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Push(i32),
    Op(String),
    Pop,
    Empty,
    Delay(i64),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_lowercase();
    let arg = words.next();

    let command = match (verb.as_str(), arg) {
        ("push", Some(v)) => Command::Push(
            v.parse()
                .map_err(|_| format!("not a 32-bit integer: {}", v))?,
        ),
        ("op" | "operation", Some(op)) => Command::Op(op.to_string()),
        ("pop", None) => Command::Pop,
        ("empty" | "isempty", None) => Command::Empty,
        ("delay" | "delaypop", Some(ms)) => Command::Delay(
            ms.parse()
                .map_err(|_| format!("not a number of milliseconds: {}", ms))?,
        ),
        ("help" | "?", None) => Command::Help,
        ("quit" | "exit", None) => Command::Quit,
        ("push" | "op" | "operation" | "delay" | "delaypop", None) => {
            return Err(format!("{} needs an argument", verb))
        }
        _ => return Err(format!("unknown command: {}", line.trim())),
    };

    if words.next().is_some() {
        return Err(format!("too many arguments: {}", line.trim()));
    }
    Ok(command)
}

/// Run the prompt until `quit` or end of input.
pub async fn run(calc: &RemoteCalculator, client_id: &str) -> Result<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("[{}] > ", client_id);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(msg) => {
                println!("{}", msg);
                continue;
            }
        };

        // Errors from the server are printed, never fatal
        let outcome = match command {
            Command::Push(v) => calc.push_value(v).await.map(|_| format!("pushed {}", v)),
            Command::Op(op) => calc
                .push_operation(&op)
                .await
                .map(|_| format!("applied {}", op)),
            Command::Pop => calc.pop().await.map(|v| format!("popped {}", v)),
            Command::Empty => calc.is_empty().await.map(|e| format!("empty: {}", e)),
            Command::Delay(ms) => calc
                .delay_pop(ms)
                .await
                .map(|v| format!("popped {} after {} ms", v, ms)),
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => break,
        };

        match outcome {
            Ok(msg) => println!("{}", msg),
            Err(e) => println!("error: {}", e),
        }
    }

    println!("[{}] Bye", client_id);
    Ok(())
}
