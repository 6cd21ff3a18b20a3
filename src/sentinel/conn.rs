//! The "transient connection to a Sentinel" external collaborator.
//!
//! `SENTINEL get-master-addr-by-name`, `SENTINEL sentinels`, and `ROLE` are
//! the only commands the resolver issues, and the reply parser proper is out
//! of scope, so this module exposes a narrow, typed, dyn-safe trait instead
//! of a generic command/reply pair. `ConnectionProvider::connect` returns an
//! owned, boxed connection; its `Drop` impl guarantees release on every exit
//! path, including error, without a callback-taking API (see DESIGN.md).

use crate::addr::SentinelAddr;
use crate::sentinel::config::ConnOpts;
use crate::Result;
use std::io::{BufReader, Read};
use std::net::TcpStream;
use std::time::Duration;

/// One `ip`/`port` descriptor reported by `SENTINEL sentinels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelDescriptor {
    pub ip: Option<String>,
    pub port: Option<String>,
}

/// A transient connection to either a Sentinel or a candidate master.
pub trait SentinelConn {
    /// `SENTINEL get-master-addr-by-name <master_name>`. `Ok(None)` is an
    /// ignorant sentinel; `Ok(Some((host, port)))` is a candidate.
    fn get_master_addr_by_name(&mut self, master_name: &str) -> Result<Option<(String, String)>>;

    /// `SENTINEL sentinels <master_name>`, only sent when
    /// `add_missing_sentinels` is set.
    fn sentinels(&mut self, master_name: &str) -> Result<Vec<SentinelDescriptor>>;

    /// `ROLE`, sent to a candidate master to confirm it. Returns the first
    /// element of the reply (e.g. `"master"`, `"slave"`, `"sentinel"`).
    fn role(&mut self) -> Result<String>;
}

/// Opens transient connections to Sentinel/master addresses.
pub trait ConnectionProvider {
    fn connect(&self, addr: &SentinelAddr, conn_opts: &ConnOpts) -> Result<Box<dyn SentinelConn>>;
}

/// Hosts that short-circuit to a fixed test bucket without any network I/O.
/// Honored by every `ConnectionProvider`, including the real TCP one, so
/// integration tests can point a resolver at these names without a live
/// Sentinel deployment.
fn simulated(host: &str) -> Option<SimulatedKind> {
    match host {
        "unreachable" => Some(SimulatedKind::Unreachable),
        "ignorant" => Some(SimulatedKind::Ignorant),
        "misidentified" => Some(SimulatedKind::Misidentified),
        _ => None,
    }
}

enum SimulatedKind {
    Unreachable,
    Ignorant,
    Misidentified,
}

struct SimulatedConn(SimulatedKind);

impl SentinelConn for SimulatedConn {
    fn get_master_addr_by_name(&mut self, _master_name: &str) -> Result<Option<(String, String)>> {
        match self.0 {
            SimulatedKind::Unreachable => Err(crate::Error::Io("simulated unreachable sentinel".into())),
            SimulatedKind::Ignorant => Ok(None),
            SimulatedKind::Misidentified => Ok(Some(("misidentified".to_owned(), "0".to_owned()))),
        }
    }

    fn sentinels(&mut self, _master_name: &str) -> Result<Vec<SentinelDescriptor>> {
        Ok(Vec::new())
    }

    fn role(&mut self) -> Result<String> {
        match self.0 {
            SimulatedKind::Unreachable => Err(crate::Error::Io("simulated unreachable sentinel".into())),
            SimulatedKind::Ignorant => Ok("master".to_owned()),
            SimulatedKind::Misidentified => Ok("slave".to_owned()),
        }
    }
}

/// Real, blocking, `TcpStream`-backed connection: connect, then read/write
/// directly on the socket with no pooling.
pub struct TcpSentinelConn {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

/// Opens a fresh `TcpSentinelConn` per call; never pools, because the
/// target is a transient Sentinel connection, not a pooled data connection.
pub struct TcpConnectionProvider;

impl ConnectionProvider for TcpConnectionProvider {
    fn connect(&self, addr: &SentinelAddr, conn_opts: &ConnOpts) -> Result<Box<dyn SentinelConn>> {
        if let Some(kind) = simulated(&addr.host) {
            return Ok(Box::new(SimulatedConn(kind)));
        }

        let stream = TcpStream::connect((addr.host.as_str(), addr.port))?;
        stream.set_nodelay(true).ok();
        if let Some(timeout) = conn_opts.connect_timeout {
            stream.set_read_timeout(Some(timeout)).ok();
            stream.set_write_timeout(Some(timeout)).ok();
        }
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Box::new(TcpSentinelConn { stream, reader }))
    }
}

impl TcpSentinelConn {
    fn send_command(&mut self, name: &str, args: &[&str]) -> Result<()> {
        let mut all_args: Vec<crate::resp::Arg> = vec![name.to_owned().into()];
        all_args.extend(args.iter().map(|a| (*a).to_owned().into()));
        crate::resp::write_requests(&mut self.stream, std::iter::once(all_args), false)
    }

    fn read_reply(&mut self) -> Result<MiniReply> {
        read_mini_reply(&mut self.reader)
    }
}

impl SentinelConn for TcpSentinelConn {
    fn get_master_addr_by_name(&mut self, master_name: &str) -> Result<Option<(String, String)>> {
        self.send_command("SENTINEL", &["get-master-addr-by-name", master_name])?;
        match self.read_reply()? {
            MiniReply::Nil => Ok(None),
            MiniReply::Array(mut items) if items.len() >= 2 => {
                let port = items.pop().unwrap().into_bulk_string()?;
                let host = items.pop().unwrap().into_bulk_string()?;
                Ok(Some((host, port)))
            }
            MiniReply::Array(_) => Ok(None),
            other => Err(crate::Error::Io(format!("unexpected reply to SENTINEL get-master-addr-by-name: {other:?}"))),
        }
    }

    fn sentinels(&mut self, master_name: &str) -> Result<Vec<SentinelDescriptor>> {
        self.send_command("SENTINEL", &["sentinels", master_name])?;
        let reply = self.read_reply()?;
        let mut descriptors = Vec::new();
        if let MiniReply::Array(entries) = reply {
            for entry in entries {
                if let MiniReply::Array(fields) = entry {
                    descriptors.push(descriptor_from_alternating(&fields));
                }
            }
        }
        Ok(descriptors)
    }

    fn role(&mut self) -> Result<String> {
        self.send_command("ROLE", &[])?;
        match self.read_reply()? {
            MiniReply::Array(mut items) if !items.is_empty() => items.remove(0).into_bulk_string(),
            other => Err(crate::Error::Io(format!("unexpected reply to ROLE: {other:?}"))),
        }
    }
}

fn descriptor_from_alternating(fields: &[MiniReply]) -> SentinelDescriptor {
    let mut ip = None;
    let mut port = None;
    let mut i = 0;
    while i + 1 < fields.len() {
        if let (Ok(key), Ok(value)) = (fields[i].as_bulk_string(), fields[i + 1].as_bulk_string()) {
            match key.as_str() {
                "ip" => ip = Some(value),
                "port" => port = Some(value),
                _ => {}
            }
        }
        i += 2;
    }
    SentinelDescriptor { ip, port }
}

/// The minimal RESP reply shapes this module needs to read
/// `SENTINEL get-master-addr-by-name`, `SENTINEL sentinels`, and `ROLE`
/// replies. Not a general-purpose reply parser — only arrays, bulk strings,
/// simple strings, integers, and nil.
#[derive(Debug)]
enum MiniReply {
    Nil,
    BulkString(String),
    SimpleString(String),
    Integer(i64),
    Array(Vec<MiniReply>),
}

impl MiniReply {
    fn into_bulk_string(self) -> Result<String> {
        match self {
            MiniReply::BulkString(s) | MiniReply::SimpleString(s) => Ok(s),
            MiniReply::Integer(i) => Ok(i.to_string()),
            other => Err(crate::Error::Io(format!("expected a string reply, got {other:?}"))),
        }
    }

    fn as_bulk_string(&self) -> Result<String> {
        match self {
            MiniReply::BulkString(s) | MiniReply::SimpleString(s) => Ok(s.clone()),
            MiniReply::Integer(i) => Ok(i.to_string()),
            other => Err(crate::Error::Io(format!("expected a string reply, got {other:?}"))),
        }
    }
}

fn read_line(r: &mut impl Read) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = r.read(&mut byte)?;
        if n == 0 {
            return Err(crate::Error::Io("connection closed while reading a reply".into()));
        }
        if byte[0] == b'\n' {
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            return Ok(line);
        }
        line.push(byte[0]);
    }
}

fn read_mini_reply(r: &mut impl Read) -> Result<MiniReply> {
    let line = read_line(r)?;
    if line.is_empty() {
        return Err(crate::Error::Io("empty reply line".into()));
    }
    let prefix = line[0];
    let rest = std::str::from_utf8(&line[1..]).map_err(|e| crate::Error::Io(e.to_string()))?;
    match prefix {
        b'+' => Ok(MiniReply::SimpleString(rest.to_owned())),
        b'-' => Err(crate::Error::Io(format!("server error: {rest}"))),
        b':' => Ok(MiniReply::Integer(
            rest.parse().map_err(|_| crate::Error::Io(format!("bad integer reply: {rest}")))?,
        )),
        b'$' => {
            let len: i64 = rest.parse().map_err(|_| crate::Error::Io(format!("bad bulk length: {rest}")))?;
            if len < 0 {
                return Ok(MiniReply::Nil);
            }
            let mut buf = vec![0u8; len as usize + 2];
            r.read_exact(&mut buf)?;
            buf.truncate(len as usize);
            Ok(MiniReply::BulkString(
                String::from_utf8(buf).map_err(|e| crate::Error::Io(e.to_string()))?,
            ))
        }
        b'*' => {
            let len: i64 = rest.parse().map_err(|_| crate::Error::Io(format!("bad array length: {rest}")))?;
            if len < 0 {
                return Ok(MiniReply::Nil);
            }
            let mut items = Vec::with_capacity(len as usize);
            for _ in 0..len {
                items.push(read_mini_reply(r)?);
            }
            Ok(MiniReply::Array(items))
        }
        _ => Err(crate::Error::Io(format!("unsupported reply prefix: {}", prefix as char))),
    }
}

/// Write timeout/connect timeout bundled for a provider; see
/// `sentinel::config::ConnOpts`.
pub fn default_connect_timeout() -> Duration {
    Duration::from_millis(250)
}
