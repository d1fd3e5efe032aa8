// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and hands a TranslateConfig to Layer 2.
//
//   1. `train`     — bucket the data, train, checkpoint, evaluate
//   2. `decode`    — interactive translation from stdin
//   3. `evaluate`  — first-token predictions for a whole file
//   4. `self-test` — a few steps of a tiny model on built-in data
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DecodeArgs, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "window-translate",
    version = "0.1.0",
    about = "Train a bucketed translation model, then decode sentences window by window."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case. Never computes anything itself.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Decode(args)   => run_decode(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::SelfTest       => run_self_test(),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let use_case = TrainUseCase::new(args.into());
    use_case.execute()
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    use crate::application::decode_use_case::DecodeUseCase;

    DecodeUseCase::new(args.model.into())?.interactive()
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::decode_use_case::DecodeUseCase;

    let use_case = DecodeUseCase::new(args.model.into())?;
    let sentences = use_case.evaluate(&args.input, &args.output)?;
    println!("Wrote predictions for {} sentences to {}", sentences, args.output.display());
    Ok(())
}

fn run_self_test() -> Result<()> {
    crate::application::train_use_case::self_test()?;
    println!("Self-test passed.");
    Ok(())
}
