//! PowerDNS pipe backend wire format.
//!
//! ```text
//! <- HELO\t1
//! -> OK\t<backend name>
//! <- Q\tapple.example.com\tIN\tA\t1\t192.0.2.1
//! -> DATA\tapple.example.com\tIN\tA\t3600\t1\t1.1.1.1
//! -> LOG\tQ\tapple.example.com\tIN\tA\t1\t192.0.2.1
//! -> END
//! ```
//!
//! Every line is tab separated and newline terminated. Nothing but these lines
//! may be written to the output stream.

use std::io::{self, Write};

use crate::error::BackendError;

/// Number of tab-separated fields in a query line.
pub const QUERY_FIELDS: usize = 6;

/// Query type answered with the synthetic SOA record.
pub const SOA_QTYPE: &str = "SOA";

/// A parsed query line, borrowing from the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query<'a> {
    /// Line kind (`Q` for ABI version 1 queries).
    pub kind: &'a str,
    /// Queried name.
    pub qname: &'a str,
    /// Query class, usually `IN`.
    pub qclass: &'a str,
    /// Query type (`A`, `SOA`, `ANY`, ...).
    pub qtype: &'a str,
    /// Query id, echoed back in answers.
    pub id: &'a str,
    /// Address of the resolver that asked.
    pub remote_ip: &'a str,
}

impl<'a> Query<'a> {
    /// Parse a query line with its line terminator already removed.
    pub fn parse(line: &'a str) -> Result<Self, BackendError> {
        let fields: Vec<&str> = line.split('\t').collect();

        match fields.as_slice() {
            &[kind, qname, qclass, qtype, id, remote_ip] => Ok(Self {
                kind,
                qname,
                qclass,
                qtype,
                id,
                remote_ip,
            }),
            _ => Err(BackendError::Protocol(format!(
                "expected {} tab-separated fields, got {}",
                QUERY_FIELDS,
                fields.len()
            ))),
        }
    }

    /// True for SOA queries.
    pub fn is_soa(&self) -> bool {
        self.qtype == SOA_QTYPE
    }
}

/// One `DATA` answer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    /// Owner name (the queried name).
    pub qname: String,
    /// Record class.
    pub qclass: String,
    /// Record type wire name.
    pub qtype: String,
    /// Time to live in seconds.
    pub ttl: u32,
    /// Query id.
    pub id: String,
    /// Record content.
    pub content: String,
}

/// Response to one query line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// A record for the queried name.
    Data(DataRecord),
    /// The name does not exist.
    NxDomain,
    /// The query could not be processed.
    Fail,
}

/// Strip a trailing `\n` or `\r\n`.
pub fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Write the handshake acknowledgment.
pub fn write_handshake<W: Write>(out: &mut W, backend_name: &str) -> io::Result<()> {
    writeln!(out, "OK\t{}", backend_name)
}

/// Write the response group for `answer`.
///
/// `DATA` and `NXDOMAIN` are followed by a `LOG` echo of `raw_line` and `END`.
/// `FAIL` stands alone: it terminates the group by itself.
pub fn write_answer<W: Write>(out: &mut W, answer: &Answer, raw_line: &str) -> io::Result<()> {
    match answer {
        Answer::Data(record) => writeln!(
            out,
            "DATA\t{}\t{}\t{}\t{}\t{}\t{}",
            record.qname, record.qclass, record.qtype, record.ttl, record.id, record.content
        )?,
        Answer::NxDomain => writeln!(out, "NXDOMAIN")?,
        Answer::Fail => return writeln!(out, "FAIL"),
    }

    writeln!(out, "LOG\t{}", raw_line)?;
    writeln!(out, "END")
}
