use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};

use selene::{Interpreter, Repl, SeleneError, Value};

#[derive(Parser)]
#[command(author, version, about = "Selene language interpreter")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Selene script file
    Run { script: PathBuf },
    /// Start an interactive REPL session
    Repl,
    /// Evaluate a snippet of Selene code
    Eval { source: String },
}

fn main() -> ExitCode {
    let args = Args::parse();
    let outcome = match args.command.unwrap_or(Command::Repl) {
        Command::Run { script } => run_script(script),
        Command::Repl => {
            let mut repl = Repl::new();
            repl.run()
        }
        Command::Eval { source } => eval_snippet(&source),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run_script(path: PathBuf) -> Result<(), SeleneError> {
    let source = fs::read_to_string(&path)?;
    let mut interpreter = Interpreter::new();
    interpreter.eval_source(&source)?;
    Ok(())
}

fn eval_snippet(source: &str) -> Result<(), SeleneError> {
    let mut interpreter = Interpreter::new();
    match interpreter.eval_source(source)? {
        Value::Null => {}
        value => println!("{value}"),
    }
    Ok(())
}
