//! Query routing over a partition table.

use std::borrow::Cow;
use tracing::{debug, trace};

use crate::config::{RecordKind, SoaConfig};
use crate::key::{derive_key, first_label, KeyFunction};
use crate::partition::{PartitionTable, TargetSelection};
use crate::protocol::{Answer, DataRecord, Query, SOA_QTYPE};

/// Resolved routing configuration for the active environment.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Partition key derivation.
    pub key_function: KeyFunction,
    /// Partition key to targets.
    pub table: PartitionTable,
    /// Record type of routed answers.
    pub record_type: RecordKind,
    /// TTL of routed answers in seconds.
    pub ttl: u32,
    /// Policy for keys mapped to several targets.
    pub target_selection: TargetSelection,
    /// Use `FirstLetter` keys verbatim instead of lowercasing them first.
    pub case_sensitive: bool,
    /// Synthetic SOA record.
    pub soa: SoaConfig,
}

/// Answers queries from a [`RoutingConfig`].
#[derive(Debug, Clone)]
pub struct Router {
    config: RoutingConfig,
}

impl Router {
    /// Create a router for the given configuration.
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    /// The routing configuration.
    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Answer a parsed query.
    pub fn answer(&self, query: &Query<'_>) -> Answer {
        if query.is_soa() {
            return Answer::Data(DataRecord {
                qname: query.qname.to_string(),
                qclass: query.qclass.to_string(),
                qtype: SOA_QTYPE.to_string(),
                ttl: self.config.soa.ttl,
                id: query.id.to_string(),
                content: self.config.soa.content(),
            });
        }

        match self.resolve(query.qname) {
            Some(target) => Answer::Data(DataRecord {
                qname: query.qname.to_string(),
                qclass: query.qclass.to_string(),
                qtype: self.config.record_type.as_str().to_string(),
                ttl: self.config.ttl,
                id: query.id.to_string(),
                content: target.to_string(),
            }),
            None => Answer::NxDomain,
        }
    }

    /// Target for `qname`, or `None` if its partition key has no entry.
    pub fn resolve(&self, qname: &str) -> Option<&str> {
        let label = self.normalize(first_label(qname));

        let key = match derive_key(&label, self.config.key_function) {
            Ok(key) => key,
            Err(e) => {
                debug!(qname, error = %e, "no partition key for query name");
                return None;
            }
        };

        let Some(targets) = self.config.table.get(key) else {
            trace!(qname, %key, "partition key not in table");
            return None;
        };

        let target = self.config.target_selection.select(targets, &label);
        trace!(qname, %key, selected = ?target, "routed query");
        target
    }

    /// Lowercase the label for `FirstLetter` keys. `HashPrefix` always hashes the
    /// label bytes as received.
    fn normalize<'a>(&self, label: &'a str) -> Cow<'a, str> {
        if self.config.case_sensitive
            || self.config.key_function != KeyFunction::FirstLetter
            || !label.bytes().any(|b| b.is_ascii_uppercase())
        {
            Cow::Borrowed(label)
        } else {
            Cow::Owned(label.to_ascii_lowercase())
        }
    }
}
