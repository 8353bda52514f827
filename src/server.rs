//! Pipe backend request loop.

use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

use crate::config::{BackendConfig, MalformedPolicy};
use crate::error::BackendError;
use crate::metrics::{self, QueryResult, Timer};
use crate::protocol::{self, Answer, Query};
use crate::router::Router;

/// Counters for one served session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Query lines answered, malformed ones included.
    pub queries: u64,
    /// Query lines that could not be parsed.
    pub malformed: u64,
}

/// Serves the pipe protocol over a line reader and a writer.
///
/// One query is read, answered and flushed before the next is read. The session
/// ends when the input reaches end of stream.
pub struct PipeServer<R, W> {
    name: String,
    on_malformed: MalformedPolicy,
    router: Router,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PipeServer<R, W> {
    /// Create a server announcing `name` and answering from `router`.
    pub fn new(name: impl Into<String>, router: Router, input: R, output: W) -> Self {
        Self {
            name: name.into(),
            on_malformed: MalformedPolicy::default(),
            router,
            input,
            output,
        }
    }

    /// Build the router for the active environment of `config` and create a server.
    pub fn from_config(config: &BackendConfig, input: R, output: W) -> Result<Self, BackendError> {
        let router = Router::new(config.routing_config()?);
        Ok(Self::new(config.name.clone(), router, input, output)
            .with_malformed_policy(config.on_malformed))
    }

    /// Set the response to unparseable query lines.
    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.on_malformed = policy;
        self
    }

    /// The router answering queries.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Run the handshake and serve queries until end of input.
    pub fn run(mut self) -> Result<SessionStats, BackendError> {
        let mut stats = SessionStats::default();
        let mut buf = Vec::with_capacity(256);

        if !self.read_line(&mut buf)? {
            info!("input closed before handshake");
            return Ok(stats);
        }

        let helo = String::from_utf8_lossy(&buf);
        let helo = protocol::trim_line_ending(&helo);
        if !helo.starts_with("HELO") {
            warn!(line = %helo, "unexpected handshake line, acknowledging anyway");
        }

        protocol::write_handshake(&mut self.output, &self.name)?;
        self.output.flush()?;
        metrics::record_handshake();
        info!(name = %self.name, "handshake complete");

        loop {
            buf.clear();
            if !self.read_line(&mut buf)? {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            let result = self.handle_line(protocol::trim_line_ending(&line))?;

            stats.queries += 1;
            if result == QueryResult::Malformed {
                stats.malformed += 1;
            }
        }

        info!(
            queries = stats.queries,
            malformed = stats.malformed,
            "input closed, stopping"
        );
        Ok(stats)
    }

    /// Answer one query line and flush the response group.
    fn handle_line(&mut self, raw: &str) -> Result<QueryResult, BackendError> {
        let timer = Timer::start();

        let (answer, qtype, result) = match Query::parse(raw) {
            Ok(query) => {
                if query.kind != "Q" {
                    debug!(kind = query.kind, "answering line with unexpected kind");
                }
                let answer = self.router.answer(&query);
                let result = classify(&query, &answer);
                debug!(qname = query.qname, qtype = query.qtype, id = query.id, ?result, "answered query");
                (answer, query.qtype, result)
            }
            Err(e) => {
                warn!(error = %e, line = raw, policy = ?self.on_malformed, "malformed query line");
                let answer = match self.on_malformed {
                    MalformedPolicy::Fail => Answer::Fail,
                    MalformedPolicy::Nxdomain => Answer::NxDomain,
                };
                (answer, "unknown", QueryResult::Malformed)
            }
        };

        protocol::write_answer(&mut self.output, &answer, raw)?;
        self.output.flush()?;

        metrics::record_query(qtype, result, timer.elapsed());
        Ok(result)
    }

    /// Read one line into `buf`. Returns `false` at end of stream.
    fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<bool, BackendError> {
        let read = self.input.read_until(b'\n', buf)?;
        Ok(read > 0)
    }
}

/// Metrics category of the answer to a parsed query.
fn classify(query: &Query<'_>, answer: &Answer) -> QueryResult {
    match answer {
        Answer::Data(_) if query.is_soa() => QueryResult::Soa,
        Answer::Data(_) => QueryResult::Data,
        Answer::NxDomain => QueryResult::NxDomain,
        Answer::Fail => QueryResult::Malformed,
    }
}
