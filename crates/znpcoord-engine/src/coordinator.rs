use std::io::{Read, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use znpcoord_frame::{Frame, FrameReader, FrameWriter};

use crate::bringup::BringUpState;
use crate::discovery::DiscoveredPeer;
use crate::engine::{Engine, EngineConfig};
use crate::error::{EngineError, Result};
use crate::request::Request;

/// Link-owning driver around [`Engine`].
///
/// One thread runs [`Coordinator::run`], the read loop. Operator calls such
/// as [`Coordinator::permit_joining`] may come from any other thread. The
/// engine lock is always released before the writer lock is taken, and every
/// batch of requests is written under a single writer lock.
pub struct Coordinator<W> {
    engine: Mutex<Engine>,
    writer: Mutex<FrameWriter<W>>,
}

impl<W: Write> Coordinator<W> {
    pub fn new(writer: W, config: EngineConfig) -> Self {
        Self::from_parts(Engine::new(config), FrameWriter::new(writer))
    }

    pub fn from_parts(engine: Engine, writer: FrameWriter<W>) -> Self {
        Self {
            engine: Mutex::new(engine),
            writer: Mutex::new(writer),
        }
    }

    fn engine(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn writer(&self) -> MutexGuard<'_, FrameWriter<W>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset the module and begin bring-up.
    pub fn start(&self) -> Result<()> {
        let requests = self.engine().start();
        self.send(&requests)
    }

    /// Run an association sweep on the running network.
    pub fn permit_joining(&self) -> Result<()> {
        let requests = self.engine().permit_joining()?;
        self.send(&requests)
    }

    /// Handle one received frame and write whatever it triggers.
    pub fn process(&self, frame: &Frame) -> Result<()> {
        let requests = {
            let mut engine = self.engine();
            let mut requests = engine.handle_frame(frame);
            requests.extend(engine.sweep_expired());
            requests
        };
        self.send(&requests)
    }

    /// Read loop. Runs until the link fails and returns the fatal error.
    ///
    /// Corrupted frames are logged and skipped.
    pub fn run<R: Read>(&self, reader: &mut FrameReader<R>) -> EngineError {
        info!("coordinator running");
        loop {
            let frame = match reader.read_frame() {
                Ok(frame) => frame,
                Err(err) if err.is_recoverable() => {
                    warn!(error = %err, "dropping malformed frame");
                    continue;
                }
                Err(err) => return EngineError::TransportRead(err),
            };

            if let Err(err) = self.process(&frame) {
                return err;
            }
        }
    }

    pub fn state(&self) -> BringUpState {
        self.engine().state()
    }

    pub fn discovered_peers(&self) -> Vec<DiscoveredPeer> {
        self.engine().discovered_peers().to_vec()
    }

    pub fn pending(&self) -> usize {
        self.engine().registry().len()
    }

    fn send(&self, requests: &[Request]) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }
        let mut writer = self.writer();
        for request in requests {
            writer
                .send(request.class, request.command, &request.payload)
                .map_err(EngineError::TransportWrite)?;
            debug!(request = request.name, "request sent");
        }
        Ok(())
    }
}

impl<W> std::fmt::Debug for Coordinator<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator").finish_non_exhaustive()
    }
}
