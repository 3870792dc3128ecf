//! ## gmond-bridge-protocol::gmetric
//! Ganglia 3.1 gmetric messages.
//!
//! A metric is announced with a metadata message (id 128) describing its type,
//! units, slope and lifetime, followed by a value message. Values are always
//! sent as strings (id 133, format `%s`) and converted by gmond according to
//! the declared type.

use bytes::Bytes;

use crate::xdr::{XdrReader, XdrWriter};
use crate::{ProtocolError, MAX_DATAGRAM_LEN};

/// `gmetadata_full` message id.
pub const METADATA_MSG_ID: u32 = 128;
/// `gmetric_string` message id.
pub const STRING_VALUE_MSG_ID: u32 = 133;

/// Extra-data key carrying the metric group.
pub const GROUP_KEY: &str = "GROUP";
/// Extra-data key carrying a human readable description.
pub const DESC_KEY: &str = "DESC";
/// Extra-data key carrying the spoofed `ip:hostname`.
pub const SPOOF_HOST_KEY: &str = "SPOOF_HOST";

/// How a metric is expected to evolve; drives RRD graph semantics in gmetad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slope {
    Zero = 0,
    Positive = 1,
    Negative = 2,
    Both = 3,
}

impl Slope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slope::Zero => "zero",
            Slope::Positive => "positive",
            Slope::Negative => "negative",
            Slope::Both => "both",
        }
    }
}

impl TryFrom<u32> for Slope {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Slope::Zero),
            1 => Ok(Slope::Positive),
            2 => Ok(Slope::Negative),
            3 => Ok(Slope::Both),
            other => Err(ProtocolError::InvalidSlope(other)),
        }
    }
}

/// Identifies the metric and the host it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricId {
    /// Reporting host. Only honoured by gmond when `spoof` is set.
    pub host: String,
    pub name: String,
    pub spoof: bool,
}

impl MetricId {
    pub fn new(host: impl Into<String>, name: impl Into<String>, spoof: bool) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
            spoof,
        }
    }

    fn encode(&self, writer: &mut XdrWriter) {
        writer
            .put_string(&self.host)
            .put_string(&self.name)
            .put_bool(self.spoof);
    }

    fn decode(reader: &mut XdrReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            host: reader.get_string()?,
            name: reader.get_string()?,
            spoof: reader.get_bool()?,
        })
    }
}

/// Metadata announcing a metric to gmond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataMessage {
    pub id: MetricId,
    /// gmond value type, e.g. `double`.
    pub value_type: String,
    pub units: String,
    pub slope: Slope,
    /// Expected maximum seconds between updates.
    pub tmax: u32,
    /// Seconds after which gmond drops the metric; 0 keeps it forever.
    pub dmax: u32,
    pub extra: Vec<(String, String)>,
}

impl MetadataMessage {
    /// Looks up an extra-data entry by key.
    pub fn extra_value(&self, key: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn group(&self) -> Option<&str> {
        self.extra_value(GROUP_KEY)
    }

    fn encode(&self, writer: &mut XdrWriter) {
        writer.put_u32(METADATA_MSG_ID);
        self.id.encode(writer);
        writer
            .put_string(&self.value_type)
            .put_string(&self.id.name)
            .put_string(&self.units)
            .put_u32(self.slope as u32)
            .put_u32(self.tmax)
            .put_u32(self.dmax)
            .put_u32(self.extra.len() as u32);
        for (key, value) in &self.extra {
            writer.put_string(key).put_string(value);
        }
    }

    fn decode_body(reader: &mut XdrReader<'_>) -> Result<Self, ProtocolError> {
        let id = MetricId::decode(reader)?;
        let value_type = reader.get_string()?;
        // The metric name is repeated inside the definition; the id copy wins.
        let _name = reader.get_string()?;
        let units = reader.get_string()?;
        let slope = Slope::try_from(reader.get_u32()?)?;
        let tmax = reader.get_u32()?;
        let dmax = reader.get_u32()?;
        let count = reader.get_u32()? as usize;
        // Each entry needs at least two empty strings.
        if reader.remaining() < count.saturating_mul(8) {
            return Err(ProtocolError::Truncated {
                needed: count.saturating_mul(8),
                remaining: reader.remaining(),
            });
        }
        let mut extra = Vec::with_capacity(count);
        for _ in 0..count {
            extra.push((reader.get_string()?, reader.get_string()?));
        }
        Ok(Self {
            id,
            value_type,
            units,
            slope,
            tmax,
            dmax,
            extra,
        })
    }
}

/// A metric value rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueMessage {
    pub id: MetricId,
    /// printf-style format gmond uses to display the value.
    pub format: String,
    pub value: String,
}

impl ValueMessage {
    pub fn new(id: MetricId, value: impl Into<String>) -> Self {
        Self {
            id,
            format: "%s".to_string(),
            value: value.into(),
        }
    }

    fn encode(&self, writer: &mut XdrWriter) {
        writer.put_u32(STRING_VALUE_MSG_ID);
        self.id.encode(writer);
        writer.put_string(&self.format).put_string(&self.value);
    }

    fn decode_body(reader: &mut XdrReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: MetricId::decode(reader)?,
            format: reader.get_string()?,
            value: reader.get_string()?,
        })
    }
}

/// Any message this crate can put on, or take off, the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GangliaMessage {
    Metadata(MetadataMessage),
    Value(ValueMessage),
}

impl GangliaMessage {
    pub fn metric_name(&self) -> &str {
        match self {
            GangliaMessage::Metadata(m) => &m.id.name,
            GangliaMessage::Value(v) => &v.id.name,
        }
    }

    /// Encodes the message into a single datagram.
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut writer = XdrWriter::with_capacity(256);
        match self {
            GangliaMessage::Metadata(m) => m.encode(&mut writer),
            GangliaMessage::Value(v) => v.encode(&mut writer),
        }
        if writer.len() > MAX_DATAGRAM_LEN {
            return Err(ProtocolError::Oversized { len: writer.len() });
        }
        Ok(writer.finish())
    }

    /// Decodes one datagram. Trailing bytes are ignored, as gmond does.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = XdrReader::new(data);
        match reader.get_u32()? {
            METADATA_MSG_ID => MetadataMessage::decode_body(&mut reader).map(Self::Metadata),
            STRING_VALUE_MSG_ID => ValueMessage::decode_body(&mut reader).map(Self::Value),
            other => Err(ProtocolError::UnknownMessage(other)),
        }
    }
}

impl From<MetadataMessage> for GangliaMessage {
    fn from(message: MetadataMessage) -> Self {
        GangliaMessage::Metadata(message)
    }
}

impl From<ValueMessage> for GangliaMessage {
    fn from(message: ValueMessage) -> Self {
        GangliaMessage::Value(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> MetadataMessage {
        MetadataMessage {
            id: MetricId::new("10.0.0.1:broker-1", "kafka.requests_total", true),
            value_type: "double".into(),
            units: "count".into(),
            slope: Slope::Positive,
            tmax: 60,
            dmax: 0,
            extra: vec![
                (GROUP_KEY.into(), "kafka".into()),
                (SPOOF_HOST_KEY.into(), "10.0.0.1:broker-1".into()),
            ],
        }
    }

    #[test]
    fn test_metadata_layout() {
        let message = MetadataMessage {
            id: MetricId::new("", "ab", false),
            value_type: "double".into(),
            units: "".into(),
            slope: Slope::Both,
            tmax: 60,
            dmax: 0,
            extra: vec![],
        };
        let bytes = GangliaMessage::from(message).encode().unwrap();
        let parts: [&[u8]; 11] = [
            &[0, 0, 0, 128],
            &[0, 0, 0, 0],
            &[0, 0, 0, 2, b'a', b'b', 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 6, b'd', b'o', b'u', b'b', b'l', b'e', 0, 0],
            &[0, 0, 0, 2, b'a', b'b', 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 3],
            &[0, 0, 0, 60],
            &[0, 0, 0, 0],
            &[0, 0, 0, 0],
        ];
        assert_eq!(bytes.as_ref(), parts.concat().as_slice());
    }

    #[test]
    fn test_value_layout() {
        let message = ValueMessage::new(MetricId::new("", "x", false), "1.5");
        let bytes = GangliaMessage::from(message).encode().unwrap();
        let parts: [&[u8]; 6] = [
            &[0, 0, 0, 133],
            &[0, 0, 0, 0],
            &[0, 0, 0, 1, b'x', 0, 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 2, b'%', b's', 0, 0],
            &[0, 0, 0, 3, b'1', b'.', b'5', 0],
        ];
        assert_eq!(bytes.as_ref(), parts.concat().as_slice());
    }

    #[test]
    fn test_decode_metadata() {
        let original = sample_metadata();
        let bytes = GangliaMessage::from(original.clone()).encode().unwrap();
        match GangliaMessage::decode(&bytes).unwrap() {
            GangliaMessage::Metadata(decoded) => {
                assert_eq!(decoded, original);
                assert_eq!(decoded.group(), Some("kafka"));
            }
            other => panic!("expected metadata, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_message_id() {
        let data = [0, 0, 0, 134, 0, 0, 0, 0];
        assert_eq!(
            GangliaMessage::decode(&data),
            Err(ProtocolError::UnknownMessage(134))
        );
    }

    #[test]
    fn test_invalid_slope() {
        let mut bytes = GangliaMessage::from(sample_metadata())
            .encode()
            .unwrap()
            .to_vec();
        // Locate the slope word: it follows id, metric id, type, name and units.
        let mut reader = XdrReader::new(&bytes);
        reader.get_u32().unwrap();
        reader.get_string().unwrap();
        reader.get_string().unwrap();
        reader.get_bool().unwrap();
        reader.get_string().unwrap();
        reader.get_string().unwrap();
        reader.get_string().unwrap();
        let offset = bytes.len() - reader.remaining();
        bytes[offset..offset + 4].copy_from_slice(&9u32.to_be_bytes());

        assert_eq!(
            GangliaMessage::decode(&bytes),
            Err(ProtocolError::InvalidSlope(9))
        );
    }

    #[test]
    fn test_bogus_extra_count_is_truncated() {
        let mut message = sample_metadata();
        message.extra.clear();
        let mut bytes = GangliaMessage::from(message).encode().unwrap().to_vec();
        let len = bytes.len();
        bytes[len - 4..].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(
            GangliaMessage::decode(&bytes),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn test_oversized_message_rejected() {
        let message = ValueMessage::new(MetricId::new("", "big", false), "9".repeat(2000));
        assert!(matches!(
            GangliaMessage::from(message).encode(),
            Err(ProtocolError::Oversized { .. })
        ));
    }

    #[test]
    fn test_slope_names() {
        assert_eq!(Slope::Positive.as_str(), "positive");
        assert_eq!(Slope::try_from(3).unwrap(), Slope::Both);
    }
}
