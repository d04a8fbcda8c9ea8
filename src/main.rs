//! Binary entry point: argv → [`BuildTarget`] → [`Supervisor`].
//!
//! Only usage errors terminate the process; build failures and child crashes
//! are absorbed by the supervisor, which runs until interrupted.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use cwatch::{BuildTarget, Config, ConsoleReporter, Subscribe, Supervisor};

const USAGE: &str = "usage: cwatch <file.c or file.cpp> [compiler flags] [program args]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let target = match BuildTarget::from_args(env::args().skip(1)) {
        Ok(target) => target,
        Err(err) => {
            eprintln!("cwatch: {err}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(ConsoleReporter)];
    match Supervisor::new(Config::default(), target, subscribers)
        .run()
        .await
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("cwatch: {err}");
            ExitCode::FAILURE
        }
    }
}
