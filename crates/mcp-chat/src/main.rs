//! Chat with an LLM agent that can use the tools of MCP servers.
//!
//! Servers are read from `mcp-config.json` in the working directory. The
//! model is configured with `OPENAI_API_KEY`, `OPENAI_MODEL` and
//! `OPENAI_BASE_URL`, also read from a `.env` file.

#[macro_use]
extern crate tracing;

mod telemetry;

use std::error::Error as StdError;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::time::Duration;

use mcp_chat::console::{
    ConsoleLoop, EXIT_COMMANDS, WRAP_WIDTH, display_chain, wrap_text,
};
use mcp_chat::{bootstrap, config};
use tokio::io::BufReader;
use tokio::{select, signal};

fn main() -> ExitCode {
    println!("\nStarting Agent CLI...");
    dotenvy::dotenv().ok();
    let telemetry = telemetry::init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            println!("Unhandled exception: {err}");
            telemetry.shutdown();
            return ExitCode::FAILURE;
        }
    };

    let code = runtime.block_on(async {
        select! {
            result = run() => match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    let reason = display_chain(&*err);
                    error!("unhandled error: {reason}");
                    println!("Unhandled exception: {reason}");
                    ExitCode::FAILURE
                }
            },
            Ok(()) = signal::ctrl_c() => {
                println!("\n\nExiting due to keyboard interrupt (Ctrl+C)");
                println!("{}", wrap_text("See you next time!", WRAP_WIDTH));
                ExitCode::SUCCESS
            }
        }
    });

    // A pending stdin read would block the shutdown forever.
    runtime.shutdown_timeout(Duration::from_secs(1));
    telemetry.shutdown();
    code
}

async fn run() -> Result<(), Box<dyn StdError>> {
    let servers = config::load_or_empty(config::CONFIG_FILE);
    let builder = match bootstrap::initialize_from_env(servers) {
        Ok(builder) => builder,
        Err(err) => {
            error!("failed to initialize agent: {}", display_chain(&err));
            println!("Agent initialization failed.");
            return Ok(());
        }
    };

    println!(
        "\nType one of {EXIT_COMMANDS:?} to exit, or press Ctrl+C at any time.\n"
    );

    let session = builder.start().await?;
    let interactive = std::io::stdout().is_terminal();
    let result = ConsoleLoop::new(BufReader::new(tokio::io::stdin()), std::io::stdout())
        .with_spinner(interactive)
        .with_colors(interactive)
        .run(&session)
        .await;
    session.shutdown().await;

    let exit = result?;
    debug!("conversation ended: {exit:?}");
    Ok(())
}
