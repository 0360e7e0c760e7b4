//! Delivery of rendered message bodies to downstream consumers.

use parking_lot::Mutex;
use wardflow_core::Result;

/// Sends rendered message bodies somewhere: a socket, a file, stdout.
///
/// The engine sends each body exactly once, when the message becomes due.
/// `close` is called once when the hospital shuts down.
pub trait Transport: Send + Sync {
    fn send(&self, body: &[u8]) -> Result<()>;
    fn close(&self) -> Result<()>;
}

/// Keeps sent bodies in memory instead of delivering them anywhere.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every body sent so far, in send order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl Transport for MemoryTransport {
    fn send(&self, body: &[u8]) -> Result<()> {
        self.sent
            .lock()
            .push(String::from_utf8_lossy(body).into_owned());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_transport_keeps_send_order() {
        let transport = MemoryTransport::new();
        transport.send(b"first").unwrap();
        transport.send(b"second").unwrap();
        assert_eq!(transport.sent(), vec!["first", "second"]);
        assert_eq!(transport.len(), 2);
        transport.close().unwrap();
    }
}
