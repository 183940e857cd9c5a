//! RFC 5322 email partitioner.

use chrono::{DateTime, Utc};
use mail_parser::{Addr, Address, Message, MessageParser};

use super::partition::{elements_from_body, PartitionError, Partitioner};
use super::source::SourceDocument;
use crate::domain::{ElementMetadata, RawElement};

/// Partitions `.eml` files.
///
/// Metadata comes from the `Subject`, `Date`, `From` and `To` headers; the
/// plain-text body (or the HTML body converted to text) is split into blocks.
#[derive(Debug, Default, Clone)]
pub struct EmailPartitioner;

impl EmailPartitioner {
    pub fn new() -> Self {
        Self
    }

    fn parse_address(addr: &Addr) -> Option<String> {
        addr.address().map(|s| s.to_string())
    }

    fn address_list(address: Option<&Address>) -> Vec<String> {
        let Some(address) = address else {
            return Vec::new();
        };

        match address.as_list() {
            Some(list) => list.iter().filter_map(Self::parse_address).collect(),
            None => address
                .as_group()
                .map(|groups| {
                    groups
                        .iter()
                        .flat_map(|g| g.addresses.iter())
                        .filter_map(Self::parse_address)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    fn metadata(doc: &SourceDocument, message: &Message) -> ElementMetadata {
        let date = message
            .date()
            .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0));

        ElementMetadata {
            filename: doc.filename.clone(),
            subject: message.subject().map(|s| s.to_string()),
            date,
            sent_from: Self::address_list(message.from()),
            sent_to: Self::address_list(message.to()),
        }
    }
}

impl Partitioner for EmailPartitioner {
    fn partition(&self, doc: &SourceDocument) -> Result<Vec<RawElement>, PartitionError> {
        if doc.bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(PartitionError::malformed(doc, "empty document"));
        }

        let message = MessageParser::default()
            .parse(doc.bytes.as_slice())
            .ok_or_else(|| PartitionError::malformed(doc, "not an RFC 5322 message"))?;

        if message.headers().is_empty() {
            return Err(PartitionError::malformed(doc, "no headers"));
        }

        let metadata = Self::metadata(doc, &message);
        let body = message.body_text(0).unwrap_or_default();

        let elements = elements_from_body(&body, &metadata);
        tracing::debug!(
            filename = %doc.filename,
            elements = elements.len(),
            "Partitioned email"
        );

        Ok(elements)
    }
}
