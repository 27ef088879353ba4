// ─── Sentinel: leer del socket hasta recibir "HELLO\n" ───
//
// No hay protocolo: el servidor manda bytes arbitrarios y una línea igual
// a "HELLO\n" termina la sesión. Cada read va a un buffer fijo de 200 bytes
// que se pone a cero antes de leer, y lo recibido se hace eco por stdout.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::io::{ErrorKind, Read, Write};

use crate::LOG_TAG;

pub const SENTINEL: &[u8] = b"HELLO\n";

/// Capacidad del buffer de lectura; cada read usa como mucho `capacidad - 1`.
pub const SCRATCH_CAPACITY: usize = 200;

const LINE_CAPACITY: usize = SENTINEL.len();

/// Criterio para reconocer el sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Un read completo (hasta el primer NUL) tiene que ser exactamente
    /// "HELLO\n". Si el sentinel llega partido en dos reads no se reconoce.
    WholeRead,
    /// Se acumula la línea actual entre reads: cualquier línea completa
    /// igual a "HELLO\n" termina el loop, venga como venga fragmentada.
    /// Un read que por sí solo cumple `WholeRead` también lo termina, aunque
    /// el read anterior haya dejado una línea a medias.
    #[default]
    Line,
}

/// Acumula solo lo necesario para comparar la línea en curso con el
/// sentinel. Una línea más larga que el sentinel se marca como desbordada
/// y se descarta al llegar su '\n'.
#[derive(Debug, Default)]
struct LineMatcher {
    line: heapless::Vec<u8, LINE_CAPACITY>,
    overflowed: bool,
}

impl LineMatcher {
    fn feed(&mut self, bytes: &[u8]) -> bool {
        for &byte in bytes {
            if self.line.push(byte).is_err() {
                self.overflowed = true;
            }
            if byte == b'\n' {
                let hit = !self.overflowed && self.line.as_slice() == SENTINEL;
                self.line.clear();
                self.overflowed = false;
                if hit {
                    return true;
                }
            }
        }
        false
    }
}

/// Lector de un solo uso sobre cualquier `Read` (en el firmware, el
/// `TcpStream`), con eco a cualquier `Write` (stdout).
pub struct SentinelReader<R, W> {
    source: R,
    echo: W,
    mode: MatchMode,
    scratch: [u8; SCRATCH_CAPACITY],
    matcher: LineMatcher,
    reads: usize,
}

impl<R: Read, W: Write> SentinelReader<R, W> {
    pub fn new(source: R, echo: W, mode: MatchMode) -> Self {
        Self {
            source,
            echo,
            mode,
            scratch: [0; SCRATCH_CAPACITY],
            matcher: LineMatcher::default(),
            reads: 0,
        }
    }

    /// Reads hechos hasta ahora (sin contar los `Interrupted`).
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Bloquea hasta reconocer el sentinel.
    ///
    /// Un read de 0 bytes significa que el servidor cerró la conexión: se
    /// devuelve error en lugar de seguir comparando un buffer vacío.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.scratch.fill(0);

            let received = match self.source.read(&mut self.scratch[..SCRATCH_CAPACITY - 1]) {
                Ok(0) => bail!("server closed the connection before the sentinel line"),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("read from TCP server failed"),
            };
            self.reads += 1;
            debug!(target: LOG_TAG, "read #{}: {} bytes", self.reads, received);

            self.echo_received(received)?;

            if self.matches(received) {
                info!(target: LOG_TAG, "WE DID IT!");
                return Ok(());
            }
        }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.source, self.echo)
    }

    fn echo_received(&mut self, received: usize) -> Result<()> {
        self.echo
            .write_all(&self.scratch[..received])
            .and_then(|()| self.echo.flush())
            .context("failed to echo received bytes")
    }

    fn matches(&mut self, received: usize) -> bool {
        match self.mode {
            MatchMode::WholeRead => self.whole_read_matches(received),
            MatchMode::Line => {
                // feed() siempre, para que la línea en curso quede al día.
                let line_hit = self.matcher.feed(&self.scratch[..received]);
                line_hit || self.whole_read_matches(received)
            }
        }
    }

    // Equivalente al strcmp del firmware original: hasta el primer NUL.
    fn whole_read_matches(&self, received: usize) -> bool {
        let text = self.scratch[..received]
            .split(|&b| b == 0)
            .next()
            .unwrap_or_default();
        text == SENTINEL
    }
}
