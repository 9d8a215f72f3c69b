//! Shared helpers for the integration tests.
#![allow(dead_code)]

use mcp23s17_spi::{Mcp23s17, Result, Transport};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory register file that answers like a chip and counts transfers.
pub struct FakeTransport {
    registers: [u8; 0x16],
    calls: Arc<AtomicUsize>,
}

impl FakeTransport {
    /// Returns the transport and a handle to its transfer counter.
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = Self {
            registers: [0; 0x16],
            calls: Arc::clone(&calls),
        };
        (transport, calls)
    }
}

impl Transport for FakeTransport {
    fn transfer(&mut self, tx: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let addr = usize::from(tx[1]);
        if tx[0] & 1 == 1 {
            Ok(vec![0, 0, self.registers[addr]])
        } else {
            self.registers[addr] = tx[2];
            Ok(vec![0; 3])
        }
    }

    fn close(&mut self) {}
}

pub fn fake_chip() -> (Mcp23s17<FakeTransport>, Arc<AtomicUsize>) {
    let (transport, calls) = FakeTransport::new();
    let chip = Mcp23s17::new(0, transport).expect("valid hardware address");
    (chip, calls)
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A fresh, empty directory under the system temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "mcp23s17-{}-{}-{}",
        name,
        std::process::id(),
        n
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
