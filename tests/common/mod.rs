//! Shared test infrastructure for pipe protocol integration tests.

#![allow(dead_code)]

use std::io::{self, Write};

use fdm_pipe_backend::{
    KeyFunction, MalformedPolicy, PartitionRule, PartitionTable, PipeServer, RecordKind, Router,
    RoutingConfig, SessionStats, SoaConfig, TargetSelection,
};

// --- Constants ---

pub const BACKEND_NAME: &str = "test-backend";
pub const HELO: &str = "HELO\t1\n";
pub const SOA_CONTENT: &str = "ns1.runonflux.io st.runonflux.io 2022040801 3600 600 86400 3600";

// --- Config builders ---

/// `a..n → 1.1.1.1`, `o..z → 2.2.2.2`, first letter, A records.
pub fn split_routing() -> RoutingConfig {
    RoutingConfig {
        key_function: KeyFunction::FirstLetter,
        table: PartitionTable::build(&[
            PartitionRule::new('a', 'n', &["1.1.1.1"]),
            PartitionRule::new('o', 'z', &["2.2.2.2"]),
        ])
        .expect("valid split rules"),
        record_type: RecordKind::A,
        ttl: 3600,
        target_selection: TargetSelection::First,
        case_sensitive: false,
        soa: SoaConfig::default(),
    }
}

/// Hash-prefix routing over all 16 hex keys to CNAME targets.
pub fn hash_routing() -> RoutingConfig {
    RoutingConfig {
        key_function: KeyFunction::HashPrefix,
        table: PartitionTable::build(&[
            PartitionRule::new('0', '9', &["cdn-a.example.net"]),
            PartitionRule::new('a', 'f', &["cdn-b.example.net"]),
        ])
        .expect("valid hash rules"),
        record_type: RecordKind::Cname,
        ..split_routing()
    }
}

// --- Session helpers ---

/// Output of one served session.
pub struct Session {
    pub output: String,
    pub stats: SessionStats,
}

impl Session {
    /// Output lines after the handshake acknowledgment.
    pub fn responses(&self) -> Vec<&str> {
        self.output.lines().skip(1).collect()
    }

    /// Response groups: each group ends with `END` or is a lone `FAIL`.
    pub fn groups(&self) -> Vec<Vec<&str>> {
        let mut groups = Vec::new();
        let mut current = Vec::new();
        for line in self.responses() {
            current.push(line);
            if line == "END" || line == "FAIL" {
                groups.push(std::mem::take(&mut current));
            }
        }
        assert!(current.is_empty(), "unterminated response group: {current:?}");
        groups
    }
}

/// Run a full session: handshake followed by `lines`, each newline terminated.
pub fn serve(routing: RoutingConfig, lines: &[&str]) -> Session {
    serve_with_policy(routing, MalformedPolicy::Fail, lines)
}

/// Handshake followed by `lines`, each newline terminated.
fn session_input(lines: &[&str]) -> String {
    let mut input = String::from(HELO);
    for line in lines {
        input.push_str(line);
        input.push('\n');
    }
    input
}

/// Run a full session with an explicit malformed-line policy.
pub fn serve_with_policy(routing: RoutingConfig, policy: MalformedPolicy, lines: &[&str]) -> Session {
    let input = session_input(lines);
    let mut output = Vec::new();
    let stats = PipeServer::new(BACKEND_NAME, Router::new(routing), input.as_bytes(), &mut output)
        .with_malformed_policy(policy)
        .run()
        .expect("session failed");

    Session {
        output: String::from_utf8(output).expect("output is not UTF-8"),
        stats,
    }
}

/// Writer that records what each `flush` delivers.
#[derive(Debug, Default)]
pub struct FlushRecorder {
    /// Bytes written since the last flush.
    pub pending: Vec<u8>,
    /// One entry per flush that had bytes to deliver.
    pub delivered: Vec<String>,
}

impl Write for FlushRecorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let chunk = String::from_utf8(std::mem::take(&mut self.pending))
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            self.delivered.push(chunk);
        }
        Ok(())
    }
}

/// Run a full session into a [`FlushRecorder`].
pub fn serve_recording_flushes(routing: RoutingConfig, lines: &[&str]) -> FlushRecorder {
    let input = session_input(lines);
    let mut recorder = FlushRecorder::default();
    PipeServer::new(BACKEND_NAME, Router::new(routing), input.as_bytes(), &mut recorder)
        .run()
        .expect("session failed");
    recorder
}

/// Build a query line.
pub fn query_line(qname: &str, qtype: &str, id: u32) -> String {
    format!("Q\t{qname}\tIN\t{qtype}\t{id}\t192.0.2.1")
}

// --- Assertions ---

/// Assert a group is `DATA`, `LOG <raw>`, `END` with the given data line.
pub fn assert_data_group(group: &[&str], expected_data: &str, raw: &str) {
    let log = format!("LOG\t{raw}");
    let expected = [expected_data, log.as_str(), "END"];
    assert_eq!(group, &expected[..], "unexpected response group");
}

/// Assert a group is `NXDOMAIN`, `LOG <raw>`, `END`.
pub fn assert_nxdomain_group(group: &[&str], raw: &str) {
    let log = format!("LOG\t{raw}");
    let expected = ["NXDOMAIN", log.as_str(), "END"];
    assert_eq!(group, &expected[..], "unexpected response group");
}
