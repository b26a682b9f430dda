//! Syslog sink over the local Unix datagram socket
//!
//! Messages use the BSD syslog format (RFC 3164):
//! `<PRI>Mmm dd hh:mm:ss ident[pid]: text`.

use crate::core::error::{LoggerError, Result};
use crate::core::log_level::LogLevel;
use crate::core::sink::{Sink, SinkCell, Threading};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};

/// Socket paths probed by [`SyslogSink::new`], in order
pub const DEFAULT_SOCKET_PATHS: [&str; 3] = ["/dev/log", "/var/run/syslog", "/var/run/log"];

/// Syslog facility. Only the facility number is stored; it is shifted into
/// the priority when a message is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facility {
    Kern = 0,
    #[default]
    User = 1,
    Mail = 2,
    Daemon = 3,
    Auth = 4,
    Syslog = 5,
    Lpr = 6,
    News = 7,
    Uucp = 8,
    Cron = 9,
    Authpriv = 10,
    Ftp = 11,
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    Local7 = 23,
}

impl Facility {
    /// Facility bits of the priority value
    pub fn code(self) -> u8 {
        (self as u8) << 3
    }
}

/// Syslog severity of a level
pub fn severity(level: LogLevel) -> u8 {
    match level {
        LogLevel::Emerg => 0,
        LogLevel::Alert => 1,
        LogLevel::Critical => 2,
        LogLevel::Error => 3,
        LogLevel::Warn => 4,
        LogLevel::Notice => 5,
        LogLevel::Info => 6,
        LogLevel::Trace | LogLevel::Debug | LogLevel::Off => 7,
    }
}

struct Connection {
    socket: UnixDatagram,
    path: PathBuf,
}

impl Connection {
    fn open(path: &Path) -> std::io::Result<Self> {
        let socket = UnixDatagram::unbound()?;
        socket.connect(path)?;
        Ok(Self {
            socket,
            path: path.to_path_buf(),
        })
    }

    fn send(&mut self, message: &[u8]) -> std::io::Result<()> {
        if self.socket.send(message).is_ok() {
            return Ok(());
        }
        // The daemon may have restarted; reconnect once
        *self = Connection::open(&self.path)?;
        self.socket.send(message).map(|_| ())
    }
}

/// Forwards records to the local syslog daemon
pub struct SyslogSink {
    ident: String,
    facility: Facility,
    include_pid: bool,
    cell: SinkCell<Connection>,
}

impl SyslogSink {
    /// Connect to the first reachable default socket
    ///
    /// # Errors
    ///
    /// Returns error if none of [`DEFAULT_SOCKET_PATHS`] accepts a connection
    pub fn new(ident: impl Into<String>, facility: Facility) -> Result<Self> {
        let ident = ident.into();
        let mut last_error = None;
        for path in DEFAULT_SOCKET_PATHS {
            match Self::with_path(path, ident.clone(), facility) {
                Ok(sink) => return Ok(sink),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| LoggerError::other("no syslog socket available")))
    }

    /// Connect to the datagram socket at `path`
    pub fn with_path(
        path: impl AsRef<Path>,
        ident: impl Into<String>,
        facility: Facility,
    ) -> Result<Self> {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|e| {
            LoggerError::io_operation(
                "connecting to syslog",
                format!("cannot reach '{}'", path.display()),
                e,
            )
        })?;
        Ok(Self {
            ident: ident.into(),
            facility,
            include_pid: true,
            cell: SinkCell::new("syslog", connection, Threading::Multi),
        })
    }

    /// Whether `[pid]` follows the ident (on by default)
    #[must_use]
    pub fn with_pid(mut self, include_pid: bool) -> Self {
        self.include_pid = include_pid;
        self
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn facility(&self) -> Facility {
        self.facility
    }

    /// The datagram sent for `text` at `level`
    pub fn format_message(&self, text: &str, level: LogLevel) -> String {
        let priority = u16::from(self.facility.code()) + u16::from(severity(level));
        let timestamp = Local::now().format("%b %e %H:%M:%S");
        if self.include_pid {
            format!(
                "<{}>{} {}[{}]: {}",
                priority,
                timestamp,
                self.ident,
                std::process::id(),
                text
            )
        } else {
            format!("<{}>{} {}: {}", priority, timestamp, self.ident, text)
        }
    }
}

impl Sink for SyslogSink {
    fn accept(&self, text: &str, level: LogLevel) -> Result<()> {
        if !self.should_accept(level) {
            return Ok(());
        }
        let message = self.format_message(text, level);
        self.cell.with(|connection| {
            connection.send(message.as_bytes()).map_err(|e| {
                LoggerError::sink_write("syslog", format!("send failed: {}", e))
            })
        })
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn set_level(&self, level: LogLevel) {
        self.cell.set_level(level);
    }

    fn level(&self) -> LogLevel {
        self.cell.level()
    }

    fn name(&self) -> &str {
        self.cell.name()
    }
}
