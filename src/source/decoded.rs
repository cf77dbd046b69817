use std::thread;

use anyhow::Context as _;
use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use tracing::{debug, error_span, trace};
use ww::Frame;

use crate::source::{AnimationSource, Pull};

/// How many decoded frames may wait for the playback loop.
pub const QUEUE_DEPTH: usize = 10;

/// Produces frames one at a time. Runs on its own thread.
pub trait FrameDecoder {
    /// Decode the next frame, or return `None` at the end of the stream.
    fn decode(&mut self) -> anyhow::Result<Option<Frame>>;
}

/// Frames decoded ahead of time on a background thread.
///
/// The decoder blocks once [`QUEUE_DEPTH`] frames are waiting, so it never runs further ahead
/// than that. Dropping the source stops the decoder at its next frame.
pub struct DecodedSource {
    frames: Receiver<anyhow::Result<Frame>>,
}

impl DecodedSource {
    /// Spawn a decoder thread. `open` runs on that thread, so the decoder itself need not be
    /// [`Send`].
    pub fn spawn<F, D>(name: &str, open: F) -> anyhow::Result<Self>
    where
        F: FnOnce() -> anyhow::Result<D> + Send + 'static,
        D: FrameDecoder,
    {
        let (tx, rx) = channel::bounded(QUEUE_DEPTH);
        let span = error_span!("decoder", media = name);

        thread::Builder::new()
            .name(format!("decode {name}"))
            .spawn(move || {
                let _guard = span.enter();

                match open() {
                    Ok(mut decoder) => decode_loop(&mut decoder, &tx),
                    Err(err) => {
                        _ = tx.send(Err(err));
                    }
                }
            })
            .context("failed to spawn decoder thread")?;

        Ok(Self { frames: rx })
    }
}

fn decode_loop(decoder: &mut impl FrameDecoder, tx: &Sender<anyhow::Result<Frame>>) {
    debug!("decoder started");

    loop {
        let item = match decoder.decode() {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => {
                debug!("end of stream");
                return;
            }
            Err(err) => Err(err),
        };

        let failed = item.is_err();
        if tx.send(item).is_err() {
            trace!("source dropped, stopping");
            return;
        }

        if failed {
            return;
        }
    }
}

impl AnimationSource for DecodedSource {
    fn pull(&mut self) -> anyhow::Result<Pull> {
        match self.frames.try_recv() {
            Ok(Ok(frame)) => Ok(Pull::Frame(frame)),
            Ok(Err(err)) => Err(err),
            Err(TryRecvError::Empty) => Ok(Pull::Underrun),
            Err(TryRecvError::Disconnected) => Ok(Pull::Exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use anyhow::anyhow;

    use super::*;

    struct Counter {
        next: u8,
        limit: u8,
        decoded: Arc<AtomicUsize>,
    }

    impl FrameDecoder for Counter {
        fn decode(&mut self) -> anyhow::Result<Option<Frame>> {
            if self.next == self.limit {
                return Ok(None);
            }
            self.decoded.fetch_add(1, Ordering::SeqCst);
            self.next += 1;
            Ok(Some(Frame::from_slice(&[self.next - 1])))
        }
    }

    struct Broken;

    impl FrameDecoder for Broken {
        fn decode(&mut self) -> anyhow::Result<Option<Frame>> {
            Err(anyhow!("corrupt frame"))
        }
    }

    /// Pull until something other than an underrun arrives.
    fn pull_ready(source: &mut DecodedSource) -> anyhow::Result<Pull> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match source.pull() {
                Ok(Pull::Underrun) if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(1));
                }
                other => return other,
            }
        }
    }

    fn counter(limit: u8) -> (Arc<AtomicUsize>, impl FnOnce() -> anyhow::Result<Counter>) {
        let decoded = Arc::new(AtomicUsize::new(0));
        let shared = Arc::clone(&decoded);
        let open = move || {
            Ok(Counter {
                next: 0,
                limit,
                decoded: shared,
            })
        };
        (decoded, open)
    }

    #[test]
    fn delivers_frames_in_order_then_ends() {
        let (_, open) = counter(3);
        let mut source = DecodedSource::spawn("counter", open).unwrap();

        for expected in 0..3 {
            assert_eq!(
                pull_ready(&mut source).unwrap(),
                Pull::Frame(Frame::from_slice(&[expected]))
            );
        }
        assert_eq!(pull_ready(&mut source).unwrap(), Pull::Exhausted);
    }

    #[test]
    fn decoder_stays_bounded() {
        let (decoded, open) = counter(100);
        let _source = DecodedSource::spawn("counter", open).unwrap();

        thread::sleep(Duration::from_millis(100));
        // The queue holds QUEUE_DEPTH frames and the decoder may hold one more waiting to send.
        assert!(decoded.load(Ordering::SeqCst) <= QUEUE_DEPTH + 1);
    }

    #[test]
    fn decode_errors_surface_once() {
        let mut source = DecodedSource::spawn("broken", || Ok(Broken)).unwrap();

        let err = pull_ready(&mut source).unwrap_err();
        assert_eq!(err.to_string(), "corrupt frame");
        assert_eq!(pull_ready(&mut source).unwrap(), Pull::Exhausted);
    }

    #[test]
    fn open_errors_surface() {
        let mut source =
            DecodedSource::spawn("missing", || -> anyhow::Result<Broken> { Err(anyhow!("gone")) })
                .unwrap();

        assert_eq!(pull_ready(&mut source).unwrap_err().to_string(), "gone");
    }
}
