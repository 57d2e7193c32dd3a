use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::{self, Frame};
use crate::rotation::Rotation;
use crate::schedule::{Clock, Schedule};
use crate::settings::Settings;

use log::{debug, error, info, warn};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Closed,
}

/// Streams frames to one connected tree until the peer goes away.
pub struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    settings: Arc<Settings>,
    schedule: Schedule,
    period: Duration,
    clock: Arc<dyn Clock>,
    rotation: Rotation,
    state: State,
}

impl Session {
    pub fn new(stream: TcpStream, settings: Arc<Settings>, clock: Arc<dyn Clock>) -> Result<Self> {
        let peer = stream.peer_addr()?;

        Ok(Session {
            stream: stream,
            peer: peer,
            schedule: settings.schedule(),
            period: settings.tick_period(),
            settings: settings,
            clock: clock,
            rotation: Rotation::new(),
            state: State::Running,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Sends a frame every tick period until the connection fails.
    pub fn run(mut self) {
        info!("{}: session started", self.peer);

        while self.state == State::Running {
            if let Err(e) = self.tick() {
                match e {
                    Error::PeerDisconnected(_) => info!("{}: dropping connection [{}]", self.peer, e),
                    _ => error!("{}: closing connection [{}]", self.peer, e),
                }

                self.state = State::Closed;
            }
        }

        let _ = self.stream.shutdown(Shutdown::Both);
        info!("{}: session closed", self.peer);
    }

    /// One iteration: pick a frame, send it, wait out the period.
    /// Config problems skip the send; only socket errors are returned.
    fn tick(&mut self) -> Result<()> {
        match self.next_frame() {
            Ok(frame) => self.send(&frame)?,
            Err(e) if e.is_recoverable() => warn!("{}: skipping send [{}]", self.peer, e),
            Err(e) => warn!("{}: skipping send, unexpected error [{}]", self.peer, e),
        }

        self.wait()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if self.schedule.is_on(&self.clock.now()) {
            let sel = self.rotation.next(&self.settings.config_dir)?;
            debug!("{}: playing {}", self.peer, sel.path.display());
            Ok(sel.frame)
        } else {
            debug!("{}: outside schedule, sending off descriptor", self.peer);
            frame::encode(&Config::load(&self.settings.off_config)?)
        }
    }

    fn send(&mut self, frame: &Frame) -> Result<()> {
        self.stream.write_all(frame.as_bytes()).map_err(Error::from_socket)?;
        self.stream.flush().map_err(Error::from_socket)?;

        debug!(
            "{}: sent frame ({} colors, {} steps)",
            self.peer,
            frame.color_count(),
            frame.step_count()
        );
        Ok(())
    }

    /// Blocks for one tick period. Reading doubles as hangup detection:
    /// anything the device sends is discarded, end of stream closes the session.
    fn wait(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.period;
        let mut scratch = [0u8; 64];

        loop {
            let now = Instant::now();

            if now >= deadline {
                return Ok(());
            }

            self.stream.set_read_timeout(Some(deadline - now))?;

            match self.stream.read(&mut scratch) {
                Ok(0) => return Err(Error::PeerDisconnected(io::ErrorKind::UnexpectedEof.into())),
                Ok(n) => debug!("{}: ignoring {} bytes from device", self.peer, n),
                Err(ref e) if is_read_timeout(e) => {}
                Err(e) => return Err(Error::from_socket(e)),
            }
        }
    }
}

/// An expired `SO_RCVTIMEO` reads as `WouldBlock` on Unix and `TimedOut` on
/// Windows. On Unix `TimedOut` means keepalive probes went unanswered.
fn is_read_timeout(e: &io::Error) -> bool {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => true,
        io::ErrorKind::TimedOut => cfg!(windows),
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::FRAME_SIZE;
    use chrono::NaiveTime;
    use std::fs;
    use std::net::TcpListener;
    use std::path::Path;
    use std::thread::{self, JoinHandle};
    use tempfile::TempDir;

    const ON_CONFIG: &str = r##"{"active": 1, "led_count": 120, "step_shift": 1, "color_shift": 2,
        "step_delay": 30, "led_interval": 1, "colors": ["#ff8000"], "steps": [10, 20]}"##;
    const OFF_CONFIG: &str = r#"{"active": 0, "led_count": 120, "step_shift": 0, "color_shift": 0,
        "step_delay": 0, "led_interval": 0}"#;

    struct FixedClock(NaiveTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveTime {
            self.0
        }
    }

    fn at(h: u32) -> Arc<dyn Clock> {
        Arc::new(FixedClock(NaiveTime::from_hms_opt(h, 0, 0).unwrap()))
    }

    fn settings(root: &Path) -> Arc<Settings> {
        Arc::new(Settings {
            tick_period_seconds: 0.1,
            config_dir: root.join("configs"),
            off_config: root.join("config_off.json"),
            ..Settings::default()
        })
    }

    fn fixture() -> TempDir {
        let root = tempfile::tempdir().expect("tempdir failed");
        fs::create_dir(root.path().join("configs")).expect("mkdir failed");
        fs::write(root.path().join("config_off.json"), OFF_CONFIG).expect("write failed");
        root
    }

    /// Connects a client and runs a session for it on a thread.
    fn connect(settings: Arc<Settings>, clock: Arc<dyn Clock>) -> (TcpStream, JoinHandle<()>) {
        let srv = TcpListener::bind("127.0.0.1:0").expect("bind failed");
        let client = TcpStream::connect(srv.local_addr().unwrap()).expect("connect failed");
        let (stream, _) = srv.accept().expect("accept failed");

        let session = Session::new(stream, settings, clock).expect("session failed");
        assert_eq!(session.state(), State::Running);

        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

        (client, thread::spawn(move || session.run()))
    }

    fn read_frame(client: &mut TcpStream) -> [u8; FRAME_SIZE] {
        let mut buf = [0u8; FRAME_SIZE];
        client.read_exact(&mut buf).expect("read failed");
        buf
    }

    /// Tests the rotation config is streamed inside the schedule window.
    #[test]
    fn session_sends_rotation_when_on() {
        let root = fixture();
        fs::write(root.path().join("configs/tree.json"), ON_CONFIG).unwrap();

        let (mut client, handle) = connect(settings(root.path()), at(19));

        let expected = frame::encode(&Config::load(&root.path().join("configs/tree.json")).unwrap()).unwrap();

        for _ in 0..3 {
            assert_eq!(&read_frame(&mut client)[..], expected.as_bytes());
        }

        drop(client);
        handle.join().expect("session join failed");
    }

    /// Tests the off descriptor is streamed outside the window.
    #[test]
    fn session_sends_off_descriptor() {
        let root = fixture();
        fs::write(root.path().join("configs/tree.json"), ON_CONFIG).unwrap();

        let (mut client, handle) = connect(settings(root.path()), at(12));

        let frame = read_frame(&mut client);

        assert_eq!(frame[0..2], [0, 0]);
        assert_eq!(frame[2..4], [120, 0]);
        assert!(frame[4..8].iter().all(|&b| b == 0));

        drop(client);
        handle.join().expect("session join failed");
    }

    /// Tests ticks without a valid config are skipped, not fatal.
    #[test]
    fn session_survives_missing_configs() {
        let root = fixture();
        let (mut client, handle) = connect(settings(root.path()), at(20));

        // Let a few empty ticks pass, then provide a config.
        thread::sleep(Duration::from_millis(350));
        fs::write(root.path().join("configs/late.json"), ON_CONFIG).unwrap();

        let frame = read_frame(&mut client);
        assert_eq!(frame[0..2], [1, 0]);

        drop(client);
        handle.join().expect("session join failed");
    }

    /// Tests which read errors just mean the tick period elapsed.
    #[test]
    fn read_timeouts_are_not_hangups() {
        assert!(is_read_timeout(&io::ErrorKind::WouldBlock.into()));
        assert!(is_read_timeout(&io::ErrorKind::Interrupted.into()));
        assert!(!is_read_timeout(&io::ErrorKind::ConnectionReset.into()));

        #[cfg(unix)]
        assert!(!is_read_timeout(&io::ErrorKind::TimedOut.into()));
    }

    /// Tests the session ends promptly once the client hangs up.
    #[test]
    fn session_closes_on_hangup() {
        let root = fixture();
        let mut s = (*settings(root.path())).clone();
        s.tick_period_seconds = 60.0;

        let (mut client, handle) = connect(Arc::new(s), at(12));
        read_frame(&mut client);

        let started = Instant::now();
        drop(client);
        handle.join().expect("session join failed");

        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
