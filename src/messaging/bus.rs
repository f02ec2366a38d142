use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::SynthMessage;

/// MessageBus carries commands from input threads to the application loop
pub struct MessageBus {
    pub(crate) sender: Sender<SynthMessage>,
    pub(crate) receiver: Receiver<SynthMessage>,
}

impl MessageBus {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        MessageBus { sender, receiver }
    }

    /// Get a sender that can be cloned and passed to input threads
    pub fn sender(&self) -> Sender<SynthMessage> {
        self.sender.clone()
    }

    /// Public method to try to receive a message
    pub fn try_receive(&self) -> Result<SynthMessage, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Wait up to `timeout` for the next message
    pub fn receive_timeout(&self, timeout: Duration) -> Result<SynthMessage, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Public method to send a message
    pub fn send(&self, msg: SynthMessage) -> Result<(), crossbeam_channel::SendError<SynthMessage>> {
        self.sender.send(msg)
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Read commands line by line and forward them to the bus.
///
/// Unparsable lines are reported on stderr and skipped. A `Quit` is sent at
/// end of input so the application loop always terminates.
pub fn forward_lines<R: BufRead>(input: R, sender: &Sender<SynthMessage>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("console read failed: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        if line == "help" {
            eprintln!("{}", super::COMMAND_HELP);
            continue;
        }
        match line.parse::<SynthMessage>() {
            Ok(msg) => {
                debug!("console: {:?}", msg);
                let quit = msg == SynthMessage::Quit;
                if sender.send(msg).is_err() || quit {
                    return;
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }
    let _ = sender.send(SynthMessage::Quit);
}

/// Spawn a thread forwarding stdin to the bus
pub fn spawn_console(sender: Sender<SynthMessage>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || forward_lines(std::io::stdin().lock(), &sender))
}
