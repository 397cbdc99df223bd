// src/live/hub.rs

//! WebSocket broadcast hub for reload notifications.
//!
//! Two plain threads: one accepts connections, one broadcasts. Messages are
//! best-effort and never replayed to late joiners.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use tungstenite::{Message, WebSocket};

/// Oldest connections beyond this many are closed.
pub const MAX_CLIENTS: usize = 10;

/// A client that cannot take a frame within this long is dropped, so one
/// stalled browser cannot hold up the others.
pub const CLIENT_IO_TIMEOUT: Duration = Duration::from_secs(2);

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

#[derive(Debug)]
pub struct ReloadHub {
    addr: SocketAddr,
    tx: Sender<String>,
    clients: Clients,
    _incoming: JoinHandle<()>,
    _broadcast: JoinHandle<()>,
}

impl ReloadHub {
    /// Bind on `host:preferred_port`, or an ephemeral port if that is taken.
    pub fn start(host: &str, preferred_port: u16) -> Result<Self> {
        let listener = reserve_port(host, preferred_port)?;
        let addr = listener.local_addr()?;
        if preferred_port != 0 && addr.port() != preferred_port {
            warn!(preferred_port, port = addr.port(), "reload port taken; using another");
        }
        info!(%addr, "reload channel listening");

        let clients: Clients = Arc::new(Mutex::new(Vec::new()));
        let incoming = spawn_incoming(listener, Arc::clone(&clients));
        let (tx, broadcast) = spawn_broadcast(Arc::clone(&clients));

        Ok(Self {
            addr,
            tx,
            clients,
            _incoming: incoming,
            _broadcast: broadcast,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn client_count(&self) -> usize {
        lock(&self.clients).len()
    }

    /// Queue a text frame for every connected client.
    pub fn broadcast(&self, message: String) -> Result<()> {
        self.tx
            .send(message)
            .context("reload broadcast thread has stopped")
    }
}

fn reserve_port(host: &str, preferred_port: u16) -> Result<TcpListener> {
    match TcpListener::bind((host, preferred_port)) {
        Ok(listener) => Ok(listener),
        Err(err) => {
            debug!(preferred_port, error = %err, "falling back to an ephemeral port");
            TcpListener::bind((host, 0)).with_context(|| format!("binding reload channel on {host}"))
        }
    }
}

fn lock(clients: &Clients) -> MutexGuard<'_, Vec<WebSocket<TcpStream>>> {
    clients.lock().unwrap_or_else(PoisonError::into_inner)
}

fn spawn_incoming(listener: TcpListener, clients: Clients) -> JoinHandle<()> {
    thread::spawn(move || {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(error = %err, "reload channel accept failed");
                    continue;
                }
            };
            if let Err(err) = stream
                .set_write_timeout(Some(CLIENT_IO_TIMEOUT))
                .and_then(|()| stream.set_read_timeout(Some(CLIENT_IO_TIMEOUT)))
            {
                warn!(error = %err, "could not set reload client timeouts");
                continue;
            }
            match tungstenite::accept(stream) {
                Ok(socket) => {
                    debug!("reload client connected");
                    lock(&clients).push(socket);
                }
                Err(err) => debug!(error = %err, "websocket handshake failed"),
            }
        }
    })
}

fn spawn_broadcast(clients: Clients) -> (Sender<String>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<String>();

    let thread = thread::spawn(move || {
        while let Ok(text) = rx.recv() {
            let mut clients = lock(&clients);
            let mut broken = Vec::new();

            for (i, socket) in clients.iter_mut().enumerate() {
                match socket.send(Message::text(text.clone())) {
                    Ok(()) => {}
                    Err(err) if is_disconnect(&err) => broken.push(i),
                    Err(err) => error!(error = %err, "failed to send reload message"),
                }
            }

            for i in broken.into_iter().rev() {
                clients.remove(i);
            }

            let len = clients.len();
            if len > MAX_CLIENTS {
                for mut socket in clients.drain(0..len - MAX_CLIENTS) {
                    socket.close(None).ok();
                }
            }
            debug!(clients = clients.len(), "reload message sent");
        }
    });

    (tx, thread)
}

fn is_disconnect(err: &tungstenite::Error) -> bool {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => true,
        tungstenite::Error::Io(io) => matches!(
            io.kind(),
            ErrorKind::BrokenPipe
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::WouldBlock
                | ErrorKind::TimedOut
        ),
        _ => false,
    }
}
