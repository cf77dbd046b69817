//! A line-oriented TCP control server.
//!
//! Each connection sends one command per line and receives exactly one reply line per command.

use std::io::{self, BufRead as _, BufReader, Read as _, Write as _};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, error_span, info, warn};

use crate::command;
use crate::player::Controller;

const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Longest request line accepted, newline included.
const MAX_LINE_LEN: u64 = 4096;

/// Doubling delay between attempts to re-bind the listener.
#[derive(Debug)]
struct Backoff {
    next: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self { next: MIN_BACKOFF }
    }

    fn reset(&mut self) {
        self.next = MIN_BACKOFF;
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_BACKOFF);
        delay
    }
}

pub struct Server {
    bind: SocketAddr,
    controller: Arc<Controller>,
}

impl Server {
    pub fn new(bind: SocketAddr, controller: Arc<Controller>) -> Self {
        Self { bind, controller }
    }

    /// Serve forever. Bind and accept failures are retried with backoff.
    pub fn run(&self) -> ! {
        let mut backoff = Backoff::new();

        loop {
            let listener = match TcpListener::bind(self.bind) {
                Ok(listener) => listener,
                Err(err) => {
                    let delay = backoff.next_delay();
                    error!("failed to bind {}: {err}; retrying in {delay:?}", self.bind);
                    thread::sleep(delay);
                    continue;
                }
            };

            info!("listening on {}", self.bind);
            backoff.reset();

            if let Err(err) = self.serve(&listener) {
                let delay = backoff.next_delay();
                error!("failed to accept connection: {err}; rebinding in {delay:?}");
                thread::sleep(delay);
            }
        }
    }

    /// Accept connections until `listener` fails.
    pub fn serve(&self, listener: &TcpListener) -> io::Result<()> {
        loop {
            let (stream, peer) = listener.accept()?;
            let controller = Arc::clone(&self.controller);
            let span = error_span!("connection", %peer);

            let spawned = thread::Builder::new()
                .name(format!("connection {peer}"))
                .spawn(move || {
                    let _guard = span.enter();
                    debug!("connected");

                    match handle_connection(&controller, stream) {
                        Ok(()) => debug!("disconnected"),
                        Err(err) => warn!("connection closed: {err}"),
                    }
                });

            if let Err(err) = spawned {
                error!("failed to spawn connection thread for {peer}: {err}");
            }
        }
    }
}

fn handle_connection(controller: &Controller, stream: TcpStream) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = (&mut reader)
            .take(MAX_LINE_LEN)
            .read_until(b'\n', &mut line)?;

        if read == 0 {
            return Ok(());
        }

        let reply = if !line.ends_with(b"\n") && read as u64 == MAX_LINE_LEN {
            reader.skip_until(b'\n')?;
            warn!("discarded a request longer than {MAX_LINE_LEN} bytes");
            format!("Error processing message: request longer than {MAX_LINE_LEN} bytes")
        } else {
            match std::str::from_utf8(&line) {
                Ok(request) if request.trim().is_empty() => continue,
                Ok(request) => command::respond(controller, request.trim()),
                Err(err) => {
                    warn!("rejected request: {err}");
                    "Error processing message: invalid UTF-8".to_owned()
                }
            }
        };

        writeln!(writer, "{reply}")?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brightness::Brightness;
    use crate::playlist::Playlist;
    use crate::sink::NullSink;
    use crate::source::MediaLoader;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut backoff = Backoff::new();
        let delays = (0..5).map(|_| backoff.next_delay().as_secs()).collect::<Vec<_>>();
        assert_eq!(delays, [1, 2, 4, 5, 5]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), MIN_BACKOFF);
    }

    fn connect() -> (BufReader<TcpStream>, TcpStream) {
        let controller = Controller::new(
            Playlist::default(),
            Box::new(NullSink::new(Brightness::new(50))),
            Box::new(MediaLoader::default()),
            30,
        )
        .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        let server = Server::new(address, Arc::new(controller));
        thread::spawn(move || server.serve(&listener));

        let stream = TcpStream::connect(address).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        (BufReader::new(stream.try_clone().unwrap()), stream)
    }

    fn reply(reader: &mut BufReader<TcpStream>) -> String {
        let mut reply = String::new();
        reader.read_line(&mut reply).unwrap();
        reply.trim_end().to_owned()
    }

    #[test]
    fn answers_each_line() {
        let (mut reader, mut writer) = connect();

        let mut ask = |request: &str| {
            writeln!(writer, "{request}").unwrap();
            reply(&mut reader)
        };

        assert_eq!(ask("get_state"), "stopped");
        assert_eq!(ask("set_brightness 12"), "OK");
        assert_eq!(ask("get_brightness"), "12");
        assert_eq!(ask("warp"), "Unknown command");
        assert_eq!(ask("get_fps"), "30");
    }

    #[test]
    fn invalid_utf8_keeps_the_connection() {
        let (mut reader, mut writer) = connect();

        writer.write_all(b"get_\xffstate\n").unwrap();
        assert_eq!(reply(&mut reader), "Error processing message: invalid UTF-8");

        writeln!(writer, "get_state").unwrap();
        assert_eq!(reply(&mut reader), "stopped");
    }

    #[test]
    fn overlong_line_is_rejected() {
        let (mut reader, mut writer) = connect();

        let mut request = vec![b'x'; 10_000];
        request.push(b'\n');
        writer.write_all(&request).unwrap();
        assert_eq!(
            reply(&mut reader),
            format!("Error processing message: request longer than {MAX_LINE_LEN} bytes")
        );

        writeln!(writer, "get_fps").unwrap();
        assert_eq!(reply(&mut reader), "30");
    }
}
