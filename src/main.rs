//! Obtain an access token for a service account via the JWT-bearer grant and print the
//! raw JSON response.
//!
//! Exits with status 1 when the token endpoint refuses the request, and with status 2
//! on an invalid command line.

use std::io::{self, Write};
use std::process::ExitCode;

use sa_access_token::{parse_args, run, Command, Error};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, Error> {
    env_logger::init();

    let opts = match parse_args(std::env::args()) {
        Ok(Command::Run(opts)) => opts,
        Ok(Command::Help(usage)) => {
            print!("{}", usage);
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            eprintln!("{}\n\n{}", e.message, e.usage);
            return Ok(ExitCode::from(2));
        }
    };

    let mut stdout = io::stdout().lock();
    match run(&opts, &mut stdout).await {
        Ok(()) => {
            stdout.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ Error::TokenEndpoint { .. }) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e),
    }
}
