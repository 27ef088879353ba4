//! Fase TCP contra un servidor real en loopback.
//!
//! Cada test levanta un `TcpListener` en 127.0.0.1 con puerto elegido por
//! el SO, sirve el guion de bytes desde un thread y corre
//! `tcp::await_sentinel_with` con un `Vec` como eco.

use std::io::Write;
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wifi_tcp_sentinel::{sentinel::MatchMode, tcp};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

/// Acepta una conexión y escribe cada chunk con una pausa entre medio, para
/// que lleguen como reads separados. Al terminar cierra el socket.
fn serve(chunks: &'static [&'static [u8]]) -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept client");
        for chunk in chunks {
            stream.write_all(chunk).unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_millis(50));
        }
    });

    (port, handle)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn sentinel_line_ends_session() {
    let (port, server) = serve(&[b"HELLO\n"]);
    let mut echo = Vec::new();

    tcp::await_sentinel_with("127.0.0.1", port, MatchMode::WholeRead, &mut echo)
        .expect("sentinel should end the session");

    assert_eq!(echo, b"HELLO\n");
    server.join().unwrap();
}

#[test]
fn noise_is_echoed_before_sentinel() {
    let (port, server) = serve(&[b"booting\n", b"still here\n", b"HELLO\n"]);
    let mut echo = Vec::new();

    tcp::await_sentinel_with("127.0.0.1", port, MatchMode::Line, &mut echo).unwrap();

    assert_eq!(echo, b"booting\nstill here\nHELLO\n");
    server.join().unwrap();
}

#[test]
fn line_mode_survives_fragmented_sentinel() {
    let (port, server) = serve(&[b"HEL", b"LO\n"]);
    let mut echo = Vec::new();

    tcp::await_sentinel_with("127.0.0.1", port, MatchMode::Line, &mut echo).unwrap();

    assert_eq!(echo, b"HELLO\n");
    server.join().unwrap();
}

#[test]
fn peer_close_without_sentinel_is_an_error() {
    let (port, server) = serve(&[b"HEL"]);
    let mut echo = Vec::new();

    let err = tcp::await_sentinel_with("127.0.0.1", port, MatchMode::Line, &mut echo).unwrap_err();

    assert!(format!("{:#}", err).contains("closed the connection"));
    assert_eq!(echo, b"HEL");
    server.join().unwrap();
}

#[test]
fn refused_connection_is_not_retried() {
    // Reservar un puerto y liberarlo: nadie escucha ahí.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut echo = Vec::new();

    let err = tcp::await_sentinel_with("127.0.0.1", port, MatchMode::Line, &mut echo).unwrap_err();

    assert!(err.to_string().contains("failed to connect"));
    assert!(echo.is_empty());
}
