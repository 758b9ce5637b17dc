use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use znpcoord_engine::{BringUpConfig, Coordinator, EngineConfig, EngineError};
use znpcoord_frame::FrameReader;
use znpcoord_transport::{LinkAddress, LinkConfig, LinkStream};

use crate::cmd::{parse_duration, RunArgs};
use crate::exit::{engine_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_peers, OutputFormat};

enum Exit {
    Interrupted,
    Link(EngineError),
}

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let address: LinkAddress = args
        .link
        .parse()
        .map_err(|err| transport_error("invalid link", err))?;
    let config = engine_config(&args)?;
    let sweep_interval = args.sweep_interval.as_deref().map(parse_duration).transpose()?;

    let stream = znpcoord_transport::open(
        &address,
        &LinkConfig {
            baud_rate: args.baud,
        },
    )
    .map_err(|err| transport_error("open failed", err))?;
    let reader_stream = stream
        .try_clone()
        .map_err(|err| transport_error("link split failed", err))?;
    info!(link = %address, kind = stream.kind(), "link open");

    let coordinator = Arc::new(Coordinator::new(stream, config));
    let (tx, rx) = mpsc::channel();
    install_ctrlc_handler(tx.clone())?;
    spawn_reader(Arc::clone(&coordinator), reader_stream, tx)?;

    coordinator
        .start()
        .map_err(|err| engine_error("bring-up failed", err))?;

    let exit = wait(&coordinator, &rx, sweep_interval);
    print_peers(&coordinator.discovered_peers(), format);

    match exit {
        Exit::Interrupted => {
            info!(state = ?coordinator.state(), "interrupted, shutting down");
            Ok(SUCCESS)
        }
        Exit::Link(err) => Err(engine_error("link failed", err)),
    }
}

fn engine_config(args: &RunArgs) -> CliResult<EngineConfig> {
    Ok(EngineConfig {
        bring_up: BringUpConfig {
            write_mode: args.write_mode.into(),
            discover_on_permit_join: !args.no_discover,
            ..BringUpConfig::default()
        },
        pending_ttl: args.pending_ttl.as_deref().map(parse_duration).transpose()?,
    })
}

fn spawn_reader(
    coordinator: Arc<Coordinator<LinkStream>>,
    stream: LinkStream,
    tx: Sender<Exit>,
) -> CliResult<()> {
    thread::Builder::new()
        .name("znp-reader".to_string())
        .spawn(move || {
            let err = coordinator.run(&mut FrameReader::new(stream));
            let _ = tx.send(Exit::Link(err));
        })
        .map(|_| ())
        .map_err(|err| CliError::new(INTERNAL, format!("reader thread failed to start: {err}")))
}

/// Block until interrupted or the link fails, sweeping on each interval tick.
fn wait(
    coordinator: &Coordinator<LinkStream>,
    rx: &Receiver<Exit>,
    sweep_interval: Option<Duration>,
) -> Exit {
    loop {
        let next = match sweep_interval {
            Some(interval) => rx.recv_timeout(interval),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match next {
            Ok(exit) => return exit,
            Err(RecvTimeoutError::Timeout) => {
                if let Err(err) = coordinator.permit_joining() {
                    if err.is_fatal() {
                        return Exit::Link(err);
                    }
                    warn!(error = %err, "association sweep skipped");
                }
            }
            Err(RecvTimeoutError::Disconnected) => return Exit::Interrupted,
        }
    }
}

fn install_ctrlc_handler(tx: Sender<Exit>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        let _ = tx.send(Exit::Interrupted);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
