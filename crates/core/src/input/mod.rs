//! Discrete player input and the background reader that feeds it to a session.
//!
//! Device transports and the keyboard both resolve to [`InputEvent`]s pushed
//! into one queue, which the session drains at the start of each tick. The
//! reader never touches game state itself.

use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{config::InputConfig, Lane};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    LaneHit(Lane),
    /// Unconditional bonus, e.g. shaking the controller.
    ShakeOrBonus,
}

impl InputEvent {
    /// Maps a transport token (`A`, `B`, `SHAKE`) to an event. Anything else
    /// is noise and yields `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim() {
            "A" => Some(Self::LaneHit(Lane::Left)),
            "B" => Some(Self::LaneHit(Lane::Right)),
            "SHAKE" => Some(Self::ShakeOrBonus),
            _ => None,
        }
    }
}

/// Keyboard substitute for the two device buttons.
#[derive(Debug, Clone)]
pub struct KeyMap {
    left: char,
    right: char,
}

impl KeyMap {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            left: config.left_key.to_ascii_lowercase(),
            right: config.right_key.to_ascii_lowercase(),
        }
    }

    /// Case-insensitive lookup of a pressed key.
    pub fn event_for_key(&self, key: char) -> Option<InputEvent> {
        let key = key.to_ascii_lowercase();
        if key == self.left {
            Some(InputEvent::LaneHit(Lane::Left))
        } else if key == self.right {
            Some(InputEvent::LaneHit(Lane::Right))
        } else {
            None
        }
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new(&InputConfig::default())
    }
}

pub type InputSender = mpsc::UnboundedSender<InputEvent>;
pub type InputReceiver = mpsc::UnboundedReceiver<InputEvent>;

pub fn input_queue() -> (InputSender, InputReceiver) {
    mpsc::unbounded_channel()
}

/// Why a line reader stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    EndOfStream,
    Cancelled,
    /// The session side of the queue was dropped.
    QueueClosed,
    TransportError,
}

/// Owner side of a running reader task. Dropping it cancels the reader.
#[derive(Debug)]
pub struct InputReaderHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<ReaderExit>,
}

impl InputReaderHandle {
    /// Asks the reader to stop at its next suspension point.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the reader to end and reports why.
    pub async fn join(self) -> ReaderExit {
        let Self { shutdown, task } = self;
        // Keep the shutdown sender alive until the task ends on its own.
        let exit = task.await.unwrap_or(ReaderExit::Cancelled);
        drop(shutdown);
        exit
    }
}

/// Spawns a task that reads whitespace-separated tokens line by line from
/// `reader` and forwards recognised events to `sender`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_line_reader<R>(reader: R, sender: InputSender) -> InputReaderHandle
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(read_lines(reader, sender, shutdown_rx));
    InputReaderHandle {
        shutdown: Some(shutdown_tx),
        task,
    }
}

async fn read_lines<R>(
    reader: R,
    sender: InputSender,
    mut shutdown: oneshot::Receiver<()>,
) -> ReaderExit
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    let exit = loop {
        buf.clear();
        tokio::select! {
            _ = &mut shutdown => break ReaderExit::Cancelled,
            read = reader.read_until(b'\n', &mut buf) => match read {
                Ok(0) => break ReaderExit::EndOfStream,
                Ok(_) => {
                    // Garbled bytes decode to U+FFFD and fall out as unknown tokens.
                    let line = String::from_utf8_lossy(&buf);
                    if !forward_tokens(&line, &sender) {
                        break ReaderExit::QueueClosed;
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "input transport failed, reader stopped");
                    break ReaderExit::TransportError;
                }
            },
        }
    };

    tracing::debug!(?exit, "input reader finished");
    exit
}

/// Returns false once the queue is closed.
fn forward_tokens(line: &str, sender: &InputSender) -> bool {
    for token in line.split_whitespace() {
        match InputEvent::from_token(token) {
            Some(event) => {
                if sender.send(event).is_err() {
                    return false;
                }
            }
            None => tracing::trace!(token, "ignoring unrecognised input token"),
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tokio::io::AsyncWriteExt;

    use super::*;

    #[test]
    fn tokens_map_to_events() {
        assert_eq!(
            InputEvent::from_token("A"),
            Some(InputEvent::LaneHit(Lane::Left))
        );
        assert_eq!(
            InputEvent::from_token(" B\r"),
            Some(InputEvent::LaneHit(Lane::Right))
        );
        assert_eq!(
            InputEvent::from_token("SHAKE"),
            Some(InputEvent::ShakeOrBonus)
        );
        assert_eq!(InputEvent::from_token("a"), None);
        assert_eq!(InputEvent::from_token("garbage"), None);
    }

    #[test]
    fn keyboard_is_case_insensitive() {
        let keys = KeyMap::default();
        assert_eq!(
            keys.event_for_key('A'),
            Some(InputEvent::LaneHit(Lane::Left))
        );
        assert_eq!(
            keys.event_for_key('b'),
            Some(InputEvent::LaneHit(Lane::Right))
        );
        assert_eq!(keys.event_for_key('x'), None);
    }

    #[tokio::test]
    async fn reader_forwards_known_tokens_until_eof() {
        let (tx, mut rx) = input_queue();
        let transport = Cursor::new(b"A\nnoise\nB SHAKE\n".to_vec());
        let reader = spawn_line_reader(transport, tx);
        assert_eq!(reader.join().await, ReaderExit::EndOfStream);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                InputEvent::LaneHit(Lane::Left),
                InputEvent::LaneHit(Lane::Right),
                InputEvent::ShakeOrBonus,
            ]
        );
    }

    #[tokio::test]
    async fn garbled_bytes_are_skipped_and_reading_continues() {
        let (tx, mut rx) = input_queue();
        let transport = Cursor::new(b"A\n\xff\xfe\nB\x80\nB\nSHA\xffKE\nSHAKE".to_vec());
        let reader = spawn_line_reader(transport, tx);
        assert_eq!(reader.join().await, ReaderExit::EndOfStream);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                InputEvent::LaneHit(Lane::Left),
                InputEvent::LaneHit(Lane::Right),
                InputEvent::ShakeOrBonus,
            ]
        );
    }

    #[tokio::test]
    async fn reader_ends_cleanly_at_eof() {
        let (tx, _rx) = input_queue();
        let reader = spawn_line_reader(Cursor::new(b"A\n".to_vec()), tx);
        assert_eq!(reader.join().await, ReaderExit::EndOfStream);
    }

    #[tokio::test]
    async fn shutdown_cancels_a_waiting_reader() {
        let (tx, mut rx) = input_queue();
        let (mut device, transport) = tokio::io::duplex(64);
        let mut reader = spawn_line_reader(transport, tx);

        device.write_all(b"A\n").await.unwrap();
        assert_eq!(rx.recv().await, Some(InputEvent::LaneHit(Lane::Left)));

        reader.shutdown();
        assert_eq!(reader.join().await, ReaderExit::Cancelled);
    }

    #[tokio::test]
    async fn reader_stops_when_queue_closes() {
        let (tx, rx) = input_queue();
        drop(rx);
        let reader = spawn_line_reader(Cursor::new(b"B\n".to_vec()), tx);
        assert_eq!(reader.join().await, ReaderExit::QueueClosed);
    }
}
