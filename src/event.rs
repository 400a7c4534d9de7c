use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub enum AppEvent {
    Line(String),
    Tick,
    Eof,
}

/// Stdin lines arrive from a reader thread; a `Tick` is produced whenever
/// `tick_rate` passes without input so the countdown keeps moving.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        Self::from_reader(io::BufReader::new(io::stdin()), tick_rate)
    }

    pub fn from_reader<B: BufRead + Send + 'static>(reader: B, tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if tx.send(AppEvent::Line(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(AppEvent::Eof);
        });

        Self { rx, tick_rate }
    }

    pub fn next(&self) -> AppEvent {
        match self.rx.recv_timeout(self.tick_rate) {
            Ok(event) => event,
            Err(mpsc::RecvTimeoutError::Timeout) => AppEvent::Tick,
            Err(mpsc::RecvTimeoutError::Disconnected) => AppEvent::Eof,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_lines_then_eof() {
        let events = EventHandler::from_reader(Cursor::new("a\nb\n"), Duration::from_secs(5));
        assert!(matches!(events.next(), AppEvent::Line(l) if l == "a"));
        assert!(matches!(events.next(), AppEvent::Line(l) if l == "b"));
        assert!(matches!(events.next(), AppEvent::Eof));
    }
}
