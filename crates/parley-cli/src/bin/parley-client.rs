//! `parley-client HOST PORT [--json]`
//!
//! Reads chat lines from stdin and prints what the server says to stdout.
//! Logs go to stderr.

use parley::{ChatClient, JsonSink, LogTarget, TextSink, init_tracing};
use parley_cli::ClientArgs;
use tokio::io::BufReader;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match ClientArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{}", ClientArgs::USAGE);
            std::process::exit(2);
        }
    };

    init_tracing("warn", LogTarget::Stderr);

    let client = match ChatClient::connect(&args.addr).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Unable to connect to the server: {e}");
            std::process::exit(1);
        }
    };

    let input = BufReader::new(tokio::io::stdin());
    let stdout = std::io::stdout();
    let result = if args.json {
        client.run(input, &mut JsonSink::new(stdout.lock())).await
    } else {
        client.run(input, &mut TextSink::new(stdout.lock())).await
    };

    // Exit right away: tokio's stdin read can't be cancelled and would
    // keep the runtime from shutting down until the user hits enter.
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
