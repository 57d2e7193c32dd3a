use crate::constants;
use crate::error::{Error, Result};
use crate::schedule::Clock;
use crate::session::Session;
use crate::settings::Settings;

use log::{error, info, warn};
use socket2::{SockRef, TcpKeepalive};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Accepts tree connections and runs a session thread for each.
pub struct Listener {
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
    stopflag: Arc<AtomicBool>,
    sessions: Arc<AtomicUsize>,
    local_addr: Option<SocketAddr>,
    handle: Option<JoinHandle<()>>,
}

/// Counts a live session; decrements when the session thread drops it.
struct SessionGuard(Arc<AtomicUsize>);

impl SessionGuard {
    fn new(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        SessionGuard(count.clone())
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Listener {
    pub fn new(settings: Settings, clock: Arc<dyn Clock>) -> Self {
        Listener {
            settings: Arc::new(settings),
            clock: clock,
            stopflag: Arc::new(AtomicBool::new(false)),
            sessions: Arc::new(AtomicUsize::new(0)),
            local_addr: None,
            handle: None,
        }
    }

    /// Flag that stops the accept loop (and any pending bind retry) when set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stopflag.clone()
    }

    /// Bound address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of sessions still running.
    pub fn active_sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    /// Binds the listen socket and starts accepting on a background thread.
    pub fn start(mut self) -> Result<Self> {
        let bind_addr = self.settings.bind_addr();
        let listener = bind_with_retry(&bind_addr, &self.stopflag)?;
        listener.set_nonblocking(true)?;

        let local = listener.local_addr()?;
        info!("Listening on {}", local);
        self.local_addr = Some(local);

        let thr_settings = self.settings.clone();
        let thr_clock = self.clock.clone();
        let thr_stopflag = self.stopflag.clone();
        let thr_sessions = self.sessions.clone();

        self.handle = Some(
            thread::Builder::new()
                .name("listener".to_string())
                .spawn(move || {
                    for stream in listener.incoming() {
                        match stream {
                            Ok(stream) => {
                                if let Err(e) = spawn_session(stream, &thr_settings, &thr_clock, &thr_sessions) {
                                    warn!("Failed to start session: {}", e);
                                }
                            }
                            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                                if thr_stopflag.load(Ordering::Relaxed) {
                                    break;
                                } else {
                                    thread::sleep(Duration::from_millis(constants::ACCEPT_POLL_MS));
                                    continue;
                                }
                            }
                            Err(e) => {
                                // Persistent failures (e.g. out of file descriptors) must not spin.
                                error!("Accept failed: {}", e);

                                if thr_stopflag.load(Ordering::Relaxed) {
                                    break;
                                }

                                thread::sleep(Duration::from_millis(constants::ACCEPT_POLL_MS));
                            }
                        }
                    }

                    info!("Stopped listener.");
                })?,
        );

        Ok(self)
    }

    /// Stops accepting and waits for the accept thread. Running sessions are left alone.
    pub fn stop(&mut self) {
        self.stopflag.store(true, Ordering::SeqCst);
        self.join_accept_thread();
    }

    /// Waits until the accept loop exits (after the stop flag is raised).
    pub fn join(mut self) {
        self.join_accept_thread();
    }

    fn join_accept_thread(&mut self) {
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                error!("Listener thread panicked");
            }
        }
    }
}

/// Hands an accepted stream to its own session thread.
fn spawn_session(
    stream: TcpStream,
    settings: &Arc<Settings>,
    clock: &Arc<dyn Clock>,
    sessions: &Arc<AtomicUsize>,
) -> Result<()> {
    configure_stream(&stream)?;

    let session = Session::new(stream, settings.clone(), clock.clone())?;
    let guard = SessionGuard::new(sessions);
    let peer = session.peer();

    info!("{}: accepted connection", peer);

    thread::Builder::new().name(format!("session-{}", peer)).spawn(move || {
        let _guard = guard;
        session.run();
    })?;

    Ok(())
}

/// Puts an accepted stream in blocking mode and enables TCP keepalive, so a
/// tree that loses power without closing its connection is eventually detected.
fn configure_stream(stream: &TcpStream) -> Result<()> {
    // Accepted sockets may inherit non-blocking mode from the listener.
    stream.set_nonblocking(false)?;

    let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(constants::KEEPALIVE_IDLE_SECS));

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
        windows
    ))]
    let keepalive = keepalive.with_interval(Duration::from_secs(constants::KEEPALIVE_INTERVAL_SECS));

    SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
    Ok(())
}

/// Binds `addr`, retrying with exponential backoff while the address is in use.
fn bind_with_retry(addr: &str, stopflag: &AtomicBool) -> Result<TcpListener> {
    let mut backoff = Duration::from_millis(constants::BIND_RETRY_INITIAL_MS);

    loop {
        match TcpListener::bind(addr) {
            Ok(l) => return Ok(l),
            Err(ref e) if e.kind() == io::ErrorKind::AddrInUse => {
                if stopflag.load(Ordering::Relaxed) {
                    return Err(Error::BindInUse(addr.to_string()));
                }

                warn!("{} is already in use, retrying in {:?}", addr, backoff);
                thread::sleep(backoff);
                backoff = (backoff * 2).min(Duration::from_millis(constants::BIND_RETRY_MAX_MS));
            }
            Err(e) => return Err(e.into()),
        }
    }
}
