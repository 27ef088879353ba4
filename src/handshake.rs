// ─── Handshake WiFi: máquina de estados de la conexión station ───
//
// Los callbacks del event loop de ESP-IDF no tocan estado: solo envían un
// `LinkEvent` por un canal mpsc. El hilo principal recibe esos eventos y
// los aplica a un `Handshake`, que decide cuándo reintentar y cuándo
// declarar éxito o fallo.
//
//   Idle ─start→ Starting ─StaStarted→ Connecting ─GotIp→ Addressed
//                                  │        ↑
//                       StaDisconnected     │ retries < ceiling
//                                  ↓        │
//                              Disconnected ┴─ retries == ceiling → Aborted

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::mpsc::Receiver;

use crate::LOG_TAG;

/// Reintentos de conexión antes de declarar fallo.
pub const MAX_RETRIES: u32 = 10;

/// Eventos del stack de red que le importan al handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    StaStarted,
    StaConnected,
    StaDisconnected,
    GotIp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StationState {
    Idle,
    Starting,
    Connecting,
    Connected,
    Disconnected,
    Addressed,
    Aborted,
}

impl StationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StationState::Addressed | StationState::Aborted)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionOutcome {
    Success,
    Failure,
}

/// Lo que el handshake le pide al radio.
///
/// En el firmware lo implementa el driver `EspWifi`; en los tests, un fake
/// que cuenta llamadas.
pub trait StationControl {
    /// Arranca el driver en modo station. Un error aquí es fatal.
    fn start_radio(&mut self) -> Result<()>;

    /// Pide una (re)conexión al access point configurado.
    fn request_connect(&mut self) -> Result<()>;
}

/// Estado de un intento de conexión: dueño del contador de reintentos y
/// del resultado, que se fija una sola vez.
#[derive(Debug)]
pub struct Handshake {
    state: StationState,
    retries: u32,
    ceiling: u32,
    outcome: Option<ConnectionOutcome>,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new(MAX_RETRIES)
    }
}

impl Handshake {
    pub fn new(ceiling: u32) -> Self {
        Self {
            state: StationState::Idle,
            retries: 0,
            ceiling,
            outcome: None,
        }
    }

    pub fn state(&self) -> StationState {
        self.state
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn outcome(&self) -> Option<ConnectionOutcome> {
        self.outcome
    }

    /// Idle → Starting. El `StaStarted` que dispara el driver hace el primer connect.
    pub fn start<S: StationControl + ?Sized>(&mut self, station: &mut S) -> Result<()> {
        station.start_radio().context("failed to start WiFi driver")?;
        self.state = StationState::Starting;
        debug!(target: LOG_TAG, "WiFi driver started");
        Ok(())
    }

    /// Aplica un evento. Devuelve `Some` solo en la transición a un estado
    /// terminal; después de eso todo evento se ignora.
    pub fn handle<S: StationControl + ?Sized>(
        &mut self,
        event: LinkEvent,
        station: &mut S,
    ) -> Option<ConnectionOutcome> {
        if self.state.is_terminal() {
            debug!(target: LOG_TAG, "Ignoring {:?} after {:?}", event, self.state);
            return None;
        }

        match event {
            LinkEvent::StaStarted => {
                info!(target: LOG_TAG, "Connecting to Access Point...");
                self.connect(station);
                None
            }
            LinkEvent::StaConnected => {
                self.state = StationState::Connected;
                info!(target: LOG_TAG, "Associated, waiting for DHCP lease...");
                None
            }
            LinkEvent::StaDisconnected => {
                self.state = StationState::Disconnected;
                if self.retries < self.ceiling {
                    self.retries += 1;
                    info!(
                        target: LOG_TAG,
                        "Reconnecting to Access Point.... ({}/{})", self.retries, self.ceiling
                    );
                    self.connect(station);
                    None
                } else {
                    self.state = StationState::Aborted;
                    self.resolve(ConnectionOutcome::Failure)
                }
            }
            LinkEvent::GotIp => {
                self.retries = 0;
                self.state = StationState::Addressed;
                self.resolve(ConnectionOutcome::Success)
            }
        }
    }

    // Un connect rechazado no es fatal: el stack lo reporta como disconnect.
    fn connect<S: StationControl + ?Sized>(&mut self, station: &mut S) {
        self.state = StationState::Connecting;
        if let Err(e) = station.request_connect() {
            warn!(target: LOG_TAG, "Connect request rejected: {:?}", e);
        }
    }

    fn resolve(&mut self, outcome: ConnectionOutcome) -> Option<ConnectionOutcome> {
        match outcome {
            ConnectionOutcome::Success => info!(target: LOG_TAG, "Connected to an access point."),
            ConnectionOutcome::Failure => info!(target: LOG_TAG, "Failed to connect."),
        }
        self.outcome = Some(outcome);
        Some(outcome)
    }
}

/// Ejecuta un intento completo: arranca el radio y bloquea (sin timeout)
/// hasta que llega un resultado terminal.
///
/// Si todos los `Sender` del canal desaparecen antes de resolver, el
/// event loop murió: error fatal.
pub fn establish<S: StationControl + ?Sized>(
    station: &mut S,
    events: &Receiver<LinkEvent>,
) -> Result<ConnectionOutcome> {
    let mut handshake = Handshake::default();
    handshake.start(station)?;

    loop {
        let event = events
            .recv()
            .context("network event source closed before the WiFi handshake resolved")?;

        if let Some(outcome) = handshake.handle(event, station) {
            return Ok(outcome);
        }
    }
}
