//! Lifecycle of the host GPIO that carries the expander's interrupt output.
//!
//! Uses the sysfs GPIO interface: the pin is exported, its edge mode is set,
//! and its `value` file is what the listener waits on.

use crate::consts;
use crate::error::{Error, Result};
use log::{debug, trace};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Signal edge(s) that raise a readiness notification on the value file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    None,
    Rising,
    Falling,
    Both,
}

impl Edge {
    /// The string written to the sysfs `edge` file.
    pub fn as_str(self) -> &'static str {
        match self {
            Edge::None => "none",
            Edge::Rising => "rising",
            Edge::Falling => "falling",
            Edge::Both => "both",
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the interrupt line lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptLineConfig {
    /// Host GPIO number.
    pub pin: u32,
    /// Root of the sysfs GPIO tree, `/sys/class/gpio` by default.
    pub sysfs_root: PathBuf,
    /// Bound for each of the two waits in [`GpioInterruptLine::enable`].
    pub timeout: Duration,
    /// Delay between retries while waiting.
    pub poll_interval: Duration,
    /// Edge mode set by `enable`. The expander's INT output is active low.
    pub edge: Edge,
}

impl Default for InterruptLineConfig {
    fn default() -> Self {
        Self {
            pin: consts::GPIO_INTERRUPT_PIN,
            sysfs_root: PathBuf::from(consts::GPIO_SYSFS_ROOT),
            timeout: consts::FILE_IO_TIMEOUT,
            poll_interval: consts::FILE_IO_POLL_INTERVAL,
            edge: Edge::Falling,
        }
    }
}

impl InterruptLineConfig {
    pub fn export_path(&self) -> PathBuf {
        self.sysfs_root.join("export")
    }

    pub fn unexport_path(&self) -> PathBuf {
        self.sysfs_root.join("unexport")
    }

    pub fn edge_path(&self) -> PathBuf {
        self.pin_dir().join("edge")
    }

    /// The file used for edge-triggered readiness notification.
    pub fn value_path(&self) -> PathBuf {
        self.pin_dir().join("value")
    }

    fn pin_dir(&self) -> PathBuf {
        self.sysfs_root.join(format!("gpio{}", self.pin))
    }
}

/// The shared interrupt-notification GPIO.
///
/// States: unexported → exported → edge set (via [`enable`](Self::enable)) → unexported
/// (via [`disable`](Self::disable)).
#[derive(Debug, Clone, Default)]
pub struct GpioInterruptLine {
    config: InterruptLineConfig,
}

impl GpioInterruptLine {
    pub fn new(config: InterruptLineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InterruptLineConfig {
        &self.config
    }

    /// Exports the pin (unless already exported) and sets its edge mode.
    ///
    /// A sysfs wait that runs out of time is reported as
    /// [`Error::InterruptEnable`] wrapping the [`Error::Timeout`].
    pub fn enable(&self) -> Result<()> {
        self.bring_into_userspace()
            .and_then(|()| self.set_edge_with_retry(self.config.edge))
            .map_err(|e| match e {
                Error::Timeout { .. } => Error::InterruptEnable {
                    pin: self.config.pin,
                    source: Box::new(e),
                },
                other => other,
            })
    }

    /// Sets the edge mode to `none` and unexports the pin.
    pub fn disable(&self) -> Result<()> {
        debug!("Disabling interrupt line gpio{}", self.config.pin);
        write_file(&self.config.edge_path(), Edge::None.as_str())?;
        write_file(&self.config.unexport_path(), &self.config.pin.to_string())?;
        Ok(())
    }

    fn bring_into_userspace(&self) -> Result<()> {
        let value_path = self.config.value_path();
        if File::open(&value_path).is_ok() {
            trace!("gpio{} already exported", self.config.pin);
            return Ok(());
        }
        debug!("Exporting gpio{}", self.config.pin);
        write_file(&self.config.export_path(), &self.config.pin.to_string())?;
        self.wait_until_file_exists(&value_path)
    }

    fn wait_until_file_exists(&self, path: &Path) -> Result<()> {
        let time_limit = Instant::now() + self.config.timeout;
        loop {
            if File::open(path).is_ok() {
                return Ok(());
            }
            if Instant::now() >= time_limit {
                return Err(Error::Timeout {
                    path: path.to_path_buf(),
                });
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    // Control files appear asynchronously after export and may briefly be unwritable.
    fn set_edge_with_retry(&self, edge: Edge) -> Result<()> {
        let edge_path = self.config.edge_path();
        let time_limit = Instant::now() + self.config.timeout;
        loop {
            match write_file(&edge_path, edge.as_str()) {
                Ok(()) => {
                    debug!("Set gpio{} edge to {}", self.config.pin, edge);
                    return Ok(());
                }
                Err(e) => trace!("Edge file not ready yet: {}", e),
            }
            if Instant::now() >= time_limit {
                return Err(Error::Timeout { path: edge_path });
            }
            thread::sleep(self.config.poll_interval);
        }
    }
}

/// Opens an existing sysfs file, writes `contents` and closes it again.
fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;
    file.write_all(contents.as_bytes())
}
