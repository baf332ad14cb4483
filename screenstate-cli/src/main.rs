use std::path::PathBuf;

use argh::FromArgs;

use screenstate_cli::{run, AppError, RunConfig};

/// Sort screenshots into per-state directories by visual similarity to a set
/// of reference images.
#[derive(FromArgs)]
struct Args {
    /// directory containing the screenshots to sort and the reference description
    #[argh(positional)]
    batch_dir: PathBuf,

    /// reference description file name inside the batch directory
    #[argh(option, default = "String::from(\"references.json\")")]
    references: String,

    /// output subdirectory for sorted captures
    #[argh(option, default = "String::from(\"sorted\")")]
    output: String,

    /// run log file name inside the batch directory
    #[argh(option, default = "String::from(\"processing.log\")")]
    log: String,
}

fn main() -> Result<(), AppError> {
    env_logger::init();

    let args: Args = argh::from_env();
    let config = RunConfig {
        batch_dir: args.batch_dir,
        references_file: args.references,
        output_dir: args.output,
        log_file: args.log,
    };

    let summary = run(&config)?;
    println!(
        "total: {}, succeeded: {}, failed: {}",
        summary.total, summary.succeeded, summary.failed
    );

    Ok(())
}
