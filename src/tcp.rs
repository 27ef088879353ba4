// ─── Fase TCP: una conexión saliente al servidor fijo ───
//
// Sin reintentos: si la IP es inválida o el connect falla, se loguea y se
// devuelve error. lwIP de ESP-IDF implementa std::net, así que este módulo
// es el mismo en el firmware y en el host.

use anyhow::{Context, Result};
use log::{error, info};
use std::io::Write;
use std::net::{Ipv4Addr, SocketAddrV4, TcpStream};

use crate::sentinel::{MatchMode, SentinelReader};
use crate::LOG_TAG;

/// IPv4 literal + puerto. Nunca resuelve nombres (no hay DNS en este firmware).
pub fn parse_endpoint(host: &str, port: u16) -> Result<SocketAddrV4> {
    let ip: Ipv4Addr = host.parse().map_err(|e| {
        error!(target: LOG_TAG, "Invalid host");
        anyhow::anyhow!("Invalid host {:?}: {}", host, e)
    })?;
    Ok(SocketAddrV4::new(ip, port))
}

pub fn connect(endpoint: SocketAddrV4) -> Result<TcpStream> {
    TcpStream::connect(endpoint)
        .inspect_err(|_| error!(target: LOG_TAG, "Failed to connect"))
        .with_context(|| format!("failed to connect to {}", endpoint))
}

/// Fase completa con eco a stdout.
pub fn await_sentinel(host: &str, port: u16, mode: MatchMode) -> Result<()> {
    await_sentinel_with(host, port, mode, std::io::stdout())
}

/// Conecta y lee hasta la línea sentinel, haciendo eco en `echo`.
///
/// El socket se cierra al dropear el stream, tanto en éxito como en error.
pub fn await_sentinel_with<W: Write>(
    host: &str,
    port: u16,
    mode: MatchMode,
    echo: W,
) -> Result<()> {
    let endpoint = parse_endpoint(host, port)?;
    let stream = connect(endpoint)?;

    info!(target: LOG_TAG, "Connected to TCP server");

    let mut reader = SentinelReader::new(stream, echo, mode);
    reader.run().inspect_err(|e| {
        error!(target: LOG_TAG, "TCP session ended without sentinel: {:#}", e)
    })
}
