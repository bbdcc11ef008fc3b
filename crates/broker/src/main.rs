use std::{net::SocketAddr, process::ExitCode, time::Instant};

use broker::{BrokerConfig, BrokerError, Cli};
use broker_dispatch::{Action, ActionQueue, Dispatcher};
use broker_transport::{PollEvent, Transport};
use clap::Parser;
use signal_hook::{consts::{SIGINT, SIGTERM}, low_level};
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("broker: {err}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.debug);

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "broker exiting");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();
}

/// Exits cleanly on SIGINT/SIGTERM. The core has no voluntary shutdown path
/// (spec.md §6); termination is signal-only, same as the original process.
fn install_signal_handlers() {
    for signal in [SIGINT, SIGTERM] {
        // SAFETY: the handler only calls `exit`, which is async-signal-safe.
        let registered = unsafe { low_level::register(signal, || std::process::exit(0)) };
        if let Err(err) = registered {
            error!(?err, signal, "couldn't install signal handler");
        }
    }
}

fn run(config: BrokerConfig) -> Result<(), BrokerError> {
    install_signal_handlers();

    let mut transport = Transport::new()?;
    transport.bind_sources(SocketAddr::from(([0, 0, 0, 0], config.sources_port)))?;
    transport.bind_listeners(SocketAddr::from(([0, 0, 0, 0], config.listeners_port)))?;

    info!(sources_port = config.sources_port, listeners_port = config.listeners_port, "broker listening");

    let mut dispatcher = Dispatcher::new();

    loop {
        let mut actions = ActionQueue::new();
        transport.poll_with(|event| {
            dispatcher.handle_event(event, Instant::now(), &mut actions);
        })?;

        // `transport.ack_source`/`send_listener` already tear down the
        // transport's own connection state on a write failure; feed a
        // synthetic close back into the dispatcher so its registries don't
        // keep a stale entry for a token mio will never report on again
        // (spec.md §7: "Listener socket write failure ... Listener Registry
        // entry removed").
        let pending: Vec<Action> = actions.drain().collect();
        for action in pending {
            match action {
                Action::AckSource { token, ack } => {
                    if !transport.ack_source(token, &ack) {
                        dispatcher.handle_event(PollEvent::SourceClosed { token }, Instant::now(), &mut actions);
                    }
                }
                Action::SendListener { token, bytes } => {
                    if !transport.send_listener(token, &bytes) {
                        dispatcher.handle_event(PollEvent::ListenerClosed { token }, Instant::now(), &mut actions);
                    }
                }
            }
        }

        for action in actions.drain() {
            match action {
                Action::AckSource { token, ack } => {
                    transport.ack_source(token, &ack);
                }
                Action::SendListener { token, bytes } => {
                    transport.send_listener(token, &bytes);
                }
            }
        }
    }
}
