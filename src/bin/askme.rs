use anyhow::Result;
use std::time::Duration;

use askme::config::Config;
use askme::logging;
use askme::tool;

/// Bounded grace period between a termination signal and a forced exit, so
/// a stalled cleanup can never hang the host.
const EXIT_GRACE: Duration = Duration::from_millis(500);

const DEFAULT_PROMPT: &str = "Please enter your next plan or confirmation:";

fn print_help() {
    println!(
        "askme - ask a human operator a question through a real terminal\n\
         \n\
         Usage:\n\
         \x20 askme [PROMPT]        Open a terminal window and wait for a reply\n\
         \x20 askme help            Show this help\n\
         \n\
         Environment:\n\
         \x20 ASKME_TERMINAL        Terminal app id (warp, iterm2, terminal, kitty,\n\
         \x20                       alacritty, hyper, windowsterminal) or a custom\n\
         \x20                       application name. Default: iterm2\n\
         \x20 ASKME_TIMEOUT_MS      Reply deadline in ms. Default: 600000\n\
         \x20 ASKME_DOUBLE_ENTER_MS Double-Enter submit window in ms. Default: 500"
    );
}

fn install_exit_protection() {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logging::emit_event("host", "interrupt received, exiting after grace period");
            tokio::time::sleep(EXIT_GRACE).await;
            std::process::exit(130);
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args
        .first()
        .is_some_and(|a| a == "help" || a == "--help" || a == "-h")
    {
        print_help();
        return Ok(());
    }

    let prompt = if args.is_empty() {
        DEFAULT_PROMPT.to_string()
    } else {
        args.join(" ")
    };

    let config = Config::load()?;
    config.validate()?;

    install_exit_protection();

    let reply = tool::request_confirmation(&prompt, &config).await;
    println!("{}", reply.text);
    for image in &reply.images {
        println!(
            "{} ({} bytes, {})",
            image.placeholder, image.size, image.mime_type
        );
    }

    Ok(())
}
