//! Following a growing text file, `tail -f` style, and picking the server
//! connection out of the TF2 console log.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOffset {
    Beginning,
    End,
    At(u64),
}

/// Yields complete lines appended to a file after the start offset.
///
/// As an `Iterator` it never ends: at end of file it sleeps `poll_interval`
/// and tries again. Consumers stop it themselves.
pub struct LogTailer {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
    pending: Vec<u8>,
    poll_interval: Duration,
}

impl LogTailer {
    pub fn open(path: impl AsRef<Path>, start: StartOffset) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let offset = match start {
            StartOffset::Beginning => file.seek(SeekFrom::Start(0))?,
            StartOffset::End => file.seek(SeekFrom::End(0))?,
            StartOffset::At(pos) => file.seek(SeekFrom::Start(pos))?,
        };
        debug!("Tailing {} from offset {}", path.display(), offset);
        Ok(Self {
            path,
            reader: BufReader::new(file),
            offset,
            pending: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Offset just past the last complete line handed out.
    pub fn resume_offset(&self) -> u64 {
        self.offset - self.pending.len() as u64
    }

    /// Next complete line, or `None` at the current end of file. A trailing
    /// line without its newline is held back until the newline arrives.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.pending)?;
        self.offset += read as u64;
        if read == 0 || self.pending.last() != Some(&b'\n') {
            return Ok(None);
        }

        let mut line = std::mem::take(&mut self.pending);
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

impl Iterator for LogTailer {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.read_line() {
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => thread::sleep(self.poll_interval),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Open `path` and follow it from `start`. See [`LogTailer`].
pub fn follow(path: impl AsRef<Path>, start: StartOffset) -> io::Result<LogTailer> {
    LogTailer::open(path, start)
}

lazy_static! {
    static ref CONNECTION_LINE: Regex =
        Regex::new(r"IP ([0-9.]+|unknown), .+, ports (\d+) SV / (\d+) CL")
            .expect("connection pattern is valid");
}

/// Where the game client ended up connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// `None` when the console reported the address as `unknown`.
    pub ip: Option<Ipv4Addr>,
    pub server_port: u16,
    pub client_port: u16,
}

/// Two-stage console scan: first the `IP ..., ports N SV / M CL` line, then
/// any later line containing `connected`.
#[derive(Debug, Default)]
pub struct ConnectionDiscovery {
    endpoint: Option<ConnectionInfo>,
}

impl ConnectionDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// The connection triple captured so far, if any.
    pub fn endpoint(&self) -> Option<ConnectionInfo> {
        self.endpoint
    }

    /// Returns the connection once the `connected` marker has been seen.
    pub fn feed(&mut self, line: &str) -> Option<ConnectionInfo> {
        match self.endpoint {
            None => {
                self.endpoint = parse_connection_line(line);
                if let Some(endpoint) = self.endpoint {
                    debug!("Console reported connection {:?}", endpoint);
                }
                None
            }
            Some(endpoint) if line.contains("connected") => Some(endpoint),
            Some(_) => None,
        }
    }
}

pub fn parse_connection_line(line: &str) -> Option<ConnectionInfo> {
    let caps = CONNECTION_LINE.captures(line)?;
    let ip = match &caps[1] {
        "unknown" => None,
        addr => match addr.parse() {
            Ok(ip) => Some(ip),
            Err(err) => {
                debug!("Console reported unparseable address {:?}: {}", addr, err);
                None
            }
        },
    };
    Some(ConnectionInfo {
        ip,
        server_port: caps[2].parse().ok()?,
        client_port: caps[3].parse().ok()?,
    })
}
