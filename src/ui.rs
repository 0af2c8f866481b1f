use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Where user-visible notifications go.
///
/// Owners hold it as `Box<dyn Ui>`.
pub trait Ui: Send {
    fn display(&self, line: &str);
}

/// The process's own console.
pub struct Terminal;

impl Ui for Terminal {
    fn display(&self, line: &str) {
        println!("{line}");
    }
}

/// Forward stdin lines into an event queue, one event per line, followed by
/// `closed` once stdin ends or fails.
pub fn spawn_console<E, F>(events: mpsc::UnboundedSender<E>, line: F, closed: E) -> JoinHandle<()>
where
    E: Send + 'static,
    F: Fn(String) -> E + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(text)) => {
                    if events.send(line(text)).is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("unexpected error while reading from console: {e}");
                    break;
                }
            }
        }
        let _ = events.send(closed);
    })
}

#[cfg(test)]
pub mod testing {
    use std::sync::{Arc, Mutex};

    use super::Ui;

    /// Keeps every displayed line for later assertions.
    #[derive(Clone, Default)]
    pub struct Recorder {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        pub fn last(&self) -> Option<String> {
            self.lines.lock().unwrap().last().cloned()
        }

        pub fn clear(&self) {
            self.lines.lock().unwrap().clear();
        }
    }

    impl Ui for Recorder {
        fn display(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }
    }
}
