use crossbeam_channel::{Receiver, Sender};

/// Two independent unbounded text queues between control logic and the
/// vision client.
///
/// - outbox: commands waiting to be written to the server
/// - inbox: response lines waiting to be picked up
///
/// Cloning yields another handle to the same queues. Every handle may both
/// produce and consume, from any thread.
#[derive(Debug, Clone)]
pub struct MessageGateway {
    outbox_tx: Sender<String>,
    outbox_rx: Receiver<String>,
    inbox_tx: Sender<String>,
    inbox_rx: Receiver<String>,
}

impl MessageGateway {
    pub fn new() -> Self {
        let (outbox_tx, outbox_rx) = crossbeam_channel::unbounded();
        let (inbox_tx, inbox_rx) = crossbeam_channel::unbounded();
        Self {
            outbox_tx,
            outbox_rx,
            inbox_tx,
            inbox_rx,
        }
    }

    /// Queue a command for transmission. Never blocks.
    pub fn send(&self, msg: impl Into<String>) {
        let msg = msg.into();
        log::debug!("Queueing outbound message: {}", msg);
        // Both channel ends live in `self`, so the channel cannot be disconnected here.
        let _ = self.outbox_tx.send(msg);
    }

    /// Oldest pending outbound message, if any.
    pub fn poll_outbox(&self) -> Option<String> {
        self.outbox_rx.try_recv().ok()
    }

    /// Queue a response line for the consumer side.
    pub fn deposit_response(&self, msg: impl Into<String>) {
        let _ = self.inbox_tx.send(msg.into());
    }

    /// Oldest pending response, if any.
    pub fn get_response(&self) -> Option<String> {
        self.inbox_rx.try_recv().ok()
    }

    pub fn outbox_len(&self) -> usize {
        self.outbox_rx.len()
    }

    pub fn inbox_len(&self) -> usize {
        self.inbox_rx.len()
    }
}

impl Default for MessageGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_gateway_returns_none() {
        let gw = MessageGateway::new();
        assert_eq!(gw.poll_outbox(), None);
        assert_eq!(gw.get_response(), None);
    }

    #[test]
    fn test_outbox_fifo() {
        let gw = MessageGateway::new();
        gw.send("a");
        gw.send("b");
        gw.send(String::from("c"));
        assert_eq!(gw.outbox_len(), 3);
        assert_eq!(gw.poll_outbox().as_deref(), Some("a"));
        assert_eq!(gw.poll_outbox().as_deref(), Some("b"));
        assert_eq!(gw.poll_outbox().as_deref(), Some("c"));
        assert_eq!(gw.poll_outbox(), None);
    }

    #[test]
    fn test_queues_are_independent() {
        let gw = MessageGateway::new();
        gw.send("cmd");
        gw.deposit_response("resp");
        assert_eq!(gw.get_response().as_deref(), Some("resp"));
        assert_eq!(gw.get_response(), None);
        assert_eq!(gw.poll_outbox().as_deref(), Some("cmd"));
    }

    #[test]
    fn test_concurrent_producers_and_consumers() {
        let gw = MessageGateway::new();
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let gw = gw.clone();
                std::thread::spawn(move || {
                    for i in 0..500 {
                        gw.send(format!("{}:{}", p, i));
                    }
                })
            })
            .collect();
        for h in producers {
            h.join().unwrap();
        }

        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let gw = gw.clone();
                std::thread::spawn(move || {
                    let mut got = Vec::new();
                    while let Some(msg) = gw.poll_outbox() {
                        got.push(msg);
                    }
                    got
                })
            })
            .collect();
        let mut all: Vec<String> = consumers
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), 2000);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 2000);
    }

    #[test]
    fn test_per_producer_order_preserved() {
        let gw = MessageGateway::new();
        let a = {
            let gw = gw.clone();
            std::thread::spawn(move || (0..200).for_each(|i| gw.send(format!("a{}", i))))
        };
        let b = {
            let gw = gw.clone();
            std::thread::spawn(move || (0..200).for_each(|i| gw.send(format!("b{}", i))))
        };
        a.join().unwrap();
        b.join().unwrap();

        let (mut next_a, mut next_b) = (0, 0);
        while let Some(msg) = gw.poll_outbox() {
            let (tag, n) = msg.split_at(1);
            let n: usize = n.parse().unwrap();
            if tag == "a" {
                assert_eq!(n, next_a);
                next_a += 1;
            } else {
                assert_eq!(n, next_b);
                next_b += 1;
            }
        }
        assert_eq!((next_a, next_b), (200, 200));
    }
}
