//! Version 2 object header encoding.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::message_type::MessageType;
use crate::object_header::FLAG_ATTR_CREATION_ORDER_TRACKED;
use crate::util::push_uint;

/// Message flag: the message is constant once written.
pub const MSG_FLAG_CONSTANT: u8 = 0x01;

/// Builds a single-chunk `OHDR` header.
#[derive(Debug, Default)]
pub struct ObjectHeaderWriter {
    messages: Vec<(MessageType, u8, Vec<u8>)>,
    track_attribute_order: bool,
}

impl ObjectHeaderWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record attribute creation order; attribute messages are numbered in
    /// the order they are added.
    pub fn track_attribute_order(&mut self, on: bool) -> &mut Self {
        self.track_attribute_order = on;
        self
    }

    pub fn add_message(&mut self, msg_type: MessageType, data: Vec<u8>) -> &mut Self {
        self.add_message_with_flags(msg_type, data, 0)
    }

    pub fn add_message_with_flags(
        &mut self,
        msg_type: MessageType,
        data: Vec<u8>,
        flags: u8,
    ) -> &mut Self {
        self.messages.push((msg_type, flags, data));
        self
    }

    /// Encode the header, prefix through trailing checksum.
    pub fn serialize(&self) -> Result<Vec<u8>, FormatError> {
        let prefix = if self.track_attribute_order { 6 } else { 4 };
        let mut body = Vec::new();
        let mut next_order: u16 = 0;
        for (msg_type, flags, data) in &self.messages {
            let size = u16::try_from(data.len())
                .map_err(|_| FormatError::InvalidFieldWidth(data.len()))?;
            let raw_type = u8::try_from(msg_type.to_u16())
                .map_err(|_| FormatError::UnsupportedMessage(msg_type.to_u16()))?;
            body.push(raw_type);
            body.extend_from_slice(&size.to_le_bytes());
            body.push(*flags);
            if prefix == 6 {
                let order = if *msg_type == MessageType::Attribute {
                    next_order += 1;
                    next_order - 1
                } else {
                    0
                };
                body.extend_from_slice(&order.to_le_bytes());
            }
            body.extend_from_slice(data);
        }

        let (width_bits, width) = match body.len() {
            0..=0xFF => (0u8, 1),
            0x100..=0xFFFF => (1, 2),
            _ => (2, 4),
        };
        let mut flags = width_bits;
        if self.track_attribute_order {
            flags |= FLAG_ATTR_CREATION_ORDER_TRACKED;
        }

        let mut out = Vec::with_capacity(body.len() + 16);
        out.extend_from_slice(b"OHDR");
        out.push(2);
        out.push(flags);
        push_uint(&mut out, body.len() as u64, width);
        out.extend_from_slice(&body);
        let checksum = jenkins_lookup3(&out);
        out.extend_from_slice(&checksum.to_le_bytes());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_header::ObjectHeader;

    #[test]
    fn parses_back() {
        let mut w = ObjectHeaderWriter::new();
        w.add_message(MessageType::GroupInfo, vec![0, 0])
            .add_message_with_flags(MessageType::Attribute, vec![7; 12], MSG_FLAG_CONSTANT);
        let bytes = w.serialize().unwrap();
        assert_eq!(&bytes[..4], b"OHDR");
        assert_eq!(bytes[5] & 0x03, 0);

        let oh = ObjectHeader::parse(&bytes, 0, 8, 8).unwrap();
        assert_eq!(oh.version, 2);
        assert_eq!(oh.messages.len(), 2);
        assert_eq!(oh.messages[1].msg_type, MessageType::Attribute);
        assert_eq!(oh.messages[1].flags, MSG_FLAG_CONSTANT);
        assert_eq!(oh.messages[1].data, vec![7; 12]);
        assert!(!oh.tracks_attribute_order());
    }

    #[test]
    fn wide_chunk_size() {
        let mut w = ObjectHeaderWriter::new();
        w.add_message(MessageType::Attribute, vec![1; 300]);
        let bytes = w.serialize().unwrap();
        assert_eq!(bytes[5] & 0x03, 1);
        let oh = ObjectHeader::parse(&bytes, 0, 8, 8).unwrap();
        assert_eq!(oh.messages[0].data.len(), 300);
    }

    #[test]
    fn attribute_orders_are_numbered() {
        let mut w = ObjectHeaderWriter::new();
        w.track_attribute_order(true)
            .add_message(MessageType::Attribute, vec![1])
            .add_message(MessageType::GroupInfo, vec![0, 0])
            .add_message(MessageType::Attribute, vec![2]);
        let bytes = w.serialize().unwrap();
        let oh = ObjectHeader::parse(&bytes, 0, 8, 8).unwrap();
        assert!(oh.tracks_attribute_order());
        let orders: Vec<_> = oh
            .messages_of(MessageType::Attribute)
            .map(|m| m.creation_order)
            .collect();
        assert_eq!(orders, vec![Some(0), Some(1)]);
    }

    #[test]
    fn oversized_message_is_rejected() {
        let mut w = ObjectHeaderWriter::new();
        w.add_message(MessageType::Attribute, vec![0; 70_000]);
        assert!(w.serialize().is_err());
    }
}
