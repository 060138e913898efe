use anyhow::Result;
use std::path::PathBuf;

use askme::app::{App, AppOutcome};
use askme::config::Config;
use askme::terminal;

const DEFAULT_PROMPT: &str = "Please enter your next plan or confirmation:";

/// Editor process entry point. Launched by the host's disposable script as
/// `askme-ui <prompt> <socket-path>`; with no socket it runs standalone and
/// just prints the reply, which is handy for trying the editor out.
#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let prompt = args.next().unwrap_or_else(|| DEFAULT_PROMPT.to_string());
    let socket_path = args.next().map(PathBuf::from);

    let config = Config::load()?;
    config.validate()?;

    let mut app = App::new(prompt, socket_path, config.double_enter_ms);
    let mut term = terminal::setup()?;
    let outcome = app.run(&mut term).await;
    terminal::restore()?;

    match outcome? {
        AppOutcome::Submitted => println!("Reply submitted."),
        AppOutcome::Cancelled => println!("Cancelled, no reply sent."),
    }
    Ok(())
}
