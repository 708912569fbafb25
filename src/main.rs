// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use minimidi::config::MonitorConfig;
use minimidi::midi::{
    messages, open_platform_session, Clock, MidiDriver, MidiMessage, MidiSession,
    ReconnectStatus, Reconnector, SystemClock,
};
use tracing::{info, warn};

fn print_usage() {
    println!("MiniMIDI - Minimal MIDI input monitor");
    println!();
    println!("Usage: minimidi [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --list-sources          List available MIDI sources (inputs)");
    println!("  --monitor [N]           Monitor MIDI input from source N (default: from config, else 0)");
    println!("  --config <FILE>         Load settings from a YAML or TOML file");
    println!("  --verbose               Log at debug level");
    println!("  --help                  Show this help message");
}

enum Command {
    ListSources,
    Monitor(Option<usize>),
    Help,
}

struct Args {
    command: Command,
    config: Option<PathBuf>,
    verbose: bool,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut command = None;
    let mut config = None;
    let mut verbose = false;
    let mut iter = args.iter().skip(1).peekable();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--list-sources" => command = Some(Command::ListSources),
            "--monitor" => {
                let source = match iter.peek() {
                    Some(next) if !next.starts_with("--") => {
                        let n = next
                            .parse()
                            .map_err(|_| anyhow!("Invalid source number: {}", next))?;
                        iter.next();
                        Some(n)
                    }
                    _ => None,
                };
                command = Some(Command::Monitor(source));
            }
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                config = Some(PathBuf::from(path));
            }
            "--verbose" | "-v" => verbose = true,
            "--help" | "-h" => command = Some(Command::Help),
            other => return Err(anyhow!("Unknown option: {}", other)),
        }
    }

    Ok(Args {
        command: command.unwrap_or(Command::Help),
        config,
        verbose,
    })
}

fn print_sources<D: MidiDriver>(session: &MidiSession<D>) {
    let sources = session.port_names();
    if sources.is_empty() {
        println!("No MIDI sources found.");
    } else {
        println!("Available MIDI sources (inputs):");
        for (i, name) in sources {
            println!("  {}: {}", i, name);
        }
    }
}

fn print_message(msg: &MidiMessage) {
    let channel = msg.channel().unwrap_or(0);
    match msg.kind() {
        messages::NOTE_OFF => println!(
            "note off... channel: {}, note: {}, velocity: {}",
            channel, msg.data1, msg.data2
        ),
        messages::NOTE_ON => println!(
            "note on! channel: {}, note: {}, velocity: {}",
            channel, msg.data1, msg.data2
        ),
        _ => println!("{}", msg),
    }
}

fn resolve_source<D: MidiDriver>(
    session: &MidiSession<D>,
    config: &MonitorConfig,
    requested: Option<usize>,
) -> Result<usize> {
    if let Some(index) = requested {
        return Ok(index);
    }
    if let Some(name) = &config.port_name {
        return session
            .find_port(name)
            .ok_or_else(|| anyhow!("No MIDI source matching '{}' found", name));
    }
    Ok(config.port.unwrap_or(0))
}

async fn monitor_input(config: &MonitorConfig, requested: Option<usize>) -> Result<()> {
    let mut session = open_platform_session(&config.client_name, config.session_options())?;

    if session.port_count() == 0 {
        return Err(anyhow!("No MIDI sources available"));
    }

    let source = resolve_source(&session, config, requested)?;
    let name = session
        .port_name(source)
        .context("Failed getting source name")?;
    session
        .connect(source, &config.port_label)
        .with_context(|| format!("Failed connecting to source {}", source))?;

    println!("Reading MIDI from source {} ({}). Quit with Ctrl-C.", source, name);

    let clock = SystemClock::new();
    let policy = config.reconnect_policy();
    let mut reconnect: Option<Reconnector> = None;
    let mut ticker = tokio::time::interval(config.poll_interval());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!("Shutting down");
                break;
            }
            _ = ticker.tick() => {}
        }

        for msg in session.drain() {
            print_message(&msg);
        }

        if let Some(episode) = reconnect.as_mut() {
            let label = config.port_label.as_str();
            let status = episode.poll(clock.now(), || {
                tokio::task::block_in_place(|| session.try_reconnect(label)).is_ok()
            });
            match status {
                ReconnectStatus::Waiting => {}
                ReconnectStatus::Reconnected => {
                    println!("Successfully reconnected!");
                    reconnect = None;
                }
                ReconnectStatus::GaveUp => {
                    warn!(attempts = episode.attempts(), "gave up reconnecting");
                    println!("Device did not come back; restart the monitor to try again.");
                    reconnect = None;
                }
            }
        } else if session.should_reconnect() {
            println!("WARNING: MIDI device disconnected!");
            println!("If this was your MIDI device, please plug it back in. This program will automatically reconnect.");
            reconnect = Some(Reconnector::start(policy, clock.now()));
        }
    }

    session.disconnect();
    if session.dropped_messages() > 0 {
        info!(dropped = session.dropped_messages(), "messages lost to buffer overflow");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("Error: {}", err);
            print_usage();
            std::process::exit(1);
        }
    };

    let config = match &args.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        config.level()
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::ListSources => {
            let session = open_platform_session(&config.client_name, config.session_options())?;
            print_sources(&session);
        }
        Command::Monitor(source) => monitor_input(&config, source).await?,
        Command::Help => print_usage(),
    }

    Ok(())
}
