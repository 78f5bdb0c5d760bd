//! `psldns-proto` provides just enough of the DNS wire protocol to construct PTR/CNAME/TXT
//! queries and decode their answers: [`Message`], [`Name`], and the [`rdata`] module.
//!
//! It's a standalone, independently testable codec that
//! [`psldns-core`](https://docs.rs/psldns-core)'s client is built on top of. Unlike a
//! general-purpose DNS library, it only implements the record types and message shapes the
//! PSL zone format needs (see `psldns-core::client`), so e.g. `OPT`/EDNS0, DNSSEC, and most
//! RDATA types are not implemented.
//!
//! # Basic usage example
//! ```rust
//! use psldns_proto::{HeaderFlags, Message, Name, Opcode, RecordType};
//!
//! let flags = HeaderFlags { aa: false, tc: false, rd: true, ra: false, ad: false, cd: false };
//! let msg = Message::new_query(
//!     Name::from_ascii("example.com").unwrap(),
//!     RecordType::PTR,
//!     Opcode::QUERY,
//!     flags,
//! ).unwrap();
//! let _encoded = msg.encode().unwrap();
//! ```

use std::fmt::{self, Display};
use std::io::{Cursor, Read, Write};

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use rand::Rng;
use repr_with_fallback::repr_with_fallback;
#[cfg(feature = "serde")]
use serde::Serialize;
use strum_macros::EnumString;

pub mod error;
pub mod name;
pub mod rdata;

use error::{EncodeError, ParseError};
use rdata::RdataTrait;

pub use name::Name;
pub use rdata::Rdata;

/// Represents a DNS OpCode.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Opcode {
    QUERY,
    IQUERY,
    STATUS,
    NOTIFY,
    UPDATE,
    DSO,
}

/// Represents a DNS RCODE.
///
/// See
/// [here](https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-6)
/// for further information.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum RCode {
    NOERROR,
    FORMERR,
    SERVFAIL,
    NXDOMAIN,
    NOTIMP,
    REFUSED,
    YXDOMAIN,
    YXRRSET,
    NXRRSET,
    NOTAUTH,
    NOTZONE,
    DSOTYPENI,
}

repr_with_fallback! {
    /// Represents a DNS TYPE.
    ///
    /// Only the types this crate actually encodes/decodes have a named variant; everything else
    /// falls back to `Unknown(u16)`.
    #[cfg_attr(feature = "serde", derive(Serialize))]
    #[derive(PartialEq, Eq, Copy, Clone, EnumString, Debug)]
    #[non_exhaustive]
    pub enum RecordType {
        CNAME = 5,
        PTR = 12,
        TXT = 16,
        Unknown(u16),
    }
}

/// Represents a DNS CLASS.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Class {
    IN,
    CH,
    HS,
    NONE,
    ANY,
}

/// Represents the flags of a [`Header`].
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct HeaderFlags {
    /// authoritative answer (valid in responses only)
    pub aa: bool,
    /// truncated (set on all truncated messages except last one)
    pub tc: bool,
    /// recursion desired (copied in answer if supported and accepted)
    pub rd: bool,
    /// valid in responses, indicating recursive query support in the name server
    pub ra: bool,
    /// see [RFC 4035](https://www.rfc-editor.org/rfc/rfc4035)
    pub ad: bool,
    /// see [RFC 4035](https://www.rfc-editor.org/rfc/rfc4035)
    pub cd: bool,
}

/// Represents a DNS header.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Header {
    /// Supplied by questioner and reflected back unchanged by responder.
    pub msg_id: u16,
    /// False for queries, true for responses.
    pub qr: bool,
    pub opcode: Opcode,
    pub flags: HeaderFlags,
    /// For queries: [`None`]. For responses: the return/status code of the server.
    pub rcode: Option<RCode>,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

/// Represents a DNS question, i.e. an entry in the question section of a DNS message.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Question {
    pub qname: Name,
    pub qtype: RecordType,
    pub qclass: Class,
}

/// Represents a DNS resource record, i.e. an entry in the answer, authority, or additional
/// section of a DNS message.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Record {
    /// The [`Name`] that this record is for.
    pub owner: Name,
    /// The type of this record.
    pub rtype: RecordType,
    /// The class of this record (will almost always be [`Class::IN`]).
    pub class: Class,
    /// The amount of seconds this record may be cached for.
    pub ttl: u32,
    // rdlength omitted as rdata knows its own length
    #[cfg_attr(feature = "serde", serde(skip))]
    encoded_rdata: Vec<u8>,
    rdata: Rdata,
}

/// Represents a DNS message.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authoritative_answers: Vec<Record>,
    pub additional_answers: Vec<Record>,
}

impl Opcode {
    pub fn encode(&self) -> u8 {
        match self {
            Opcode::QUERY => 0,
            Opcode::IQUERY => 1,
            Opcode::STATUS => 2,
            Opcode::NOTIFY => 4,
            Opcode::UPDATE => 5,
            Opcode::DSO => 6,
        }
    }

    pub fn parse(val: u8) -> Result<Opcode, ParseError> {
        Ok(match val {
            0 => Opcode::QUERY,
            1 => Opcode::IQUERY,
            2 => Opcode::STATUS,
            4 => Opcode::NOTIFY,
            5 => Opcode::UPDATE,
            6 => Opcode::DSO,
            x => return Err(ParseError::InvalidOpcode(x)),
        })
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl RCode {
    pub fn encode(&self) -> u8 {
        match self {
            RCode::NOERROR => 0,
            RCode::FORMERR => 1,
            RCode::SERVFAIL => 2,
            RCode::NXDOMAIN => 3,
            RCode::NOTIMP => 4,
            RCode::REFUSED => 5,
            RCode::YXDOMAIN => 6,
            RCode::YXRRSET => 7,
            RCode::NXRRSET => 8,
            RCode::NOTAUTH => 9,
            RCode::NOTZONE => 10,
            RCode::DSOTYPENI => 11,
        }
    }

    pub fn parse(val: u16) -> Result<RCode, ParseError> {
        Ok(match val {
            0 => RCode::NOERROR,
            1 => RCode::FORMERR,
            2 => RCode::SERVFAIL,
            3 => RCode::NXDOMAIN,
            4 => RCode::NOTIMP,
            5 => RCode::REFUSED,
            6 => RCode::YXDOMAIN,
            7 => RCode::YXRRSET,
            8 => RCode::NXRRSET,
            9 => RCode::NOTAUTH,
            10 => RCode::NOTZONE,
            11 => RCode::DSOTYPENI,
            x => return Err(ParseError::InvalidRcode(x)),
        })
    }
}

impl Display for RCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Unknown(x) => write!(f, "TYPE{}", x),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl Class {
    pub fn encode(&self) -> u16 {
        match self {
            Class::IN => 1,
            Class::CH => 3,
            Class::HS => 4,
            Class::NONE => 254,
            Class::ANY => 255,
        }
    }

    pub fn parse(val: u16) -> Result<Class, ParseError> {
        Ok(match val {
            1 => Class::IN,
            3 => Class::CH,
            4 => Class::HS,
            254 => Class::NONE,
            255 => Class::ANY,
            x => return Err(ParseError::InvalidClass(x)),
        })
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl HeaderFlags {
    pub fn from_flags(flags: u16) -> Self {
        Self {
            aa: (flags & (1 << 10)) != 0,
            tc: (flags & (1 << 9)) != 0,
            rd: (flags & (1 << 8)) != 0,
            ra: (flags & (1 << 7)) != 0,
            ad: (flags & (1 << 5)) != 0,
            cd: (flags & (1 << 4)) != 0,
        }
    }

    pub fn as_flags(&self) -> u16 {
        let aa = if self.aa { 1 } else { 0 };
        let tc = if self.tc { 1 } else { 0 };
        let rd = if self.rd { 1 } else { 0 };
        let ra = if self.ra { 1 } else { 0 };
        let ad = if self.ad { 1 } else { 0 };
        let cd = if self.cd { 1 } else { 0 };
        (aa << 10) + (tc << 9) + (rd << 8) + (ra << 7) + (ad << 5) + (cd << 4)
    }
}

impl Header {
    pub fn new_query_header(
        msg_id: u16,
        opcode: Opcode,
        flags: HeaderFlags,
        qdcount: u16,
    ) -> Result<Self, EncodeError> {
        if flags.aa || flags.ra {
            Err(EncodeError::AaOrRaInQuery)
        } else {
            Ok(Header {
                msg_id,
                qr: false,
                opcode,
                flags,
                rcode: None,
                qdcount,
                ancount: 0,
                nscount: 0,
                arcount: 0,
            })
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    pub fn encode_into(&self, buf: &mut impl Write) -> Result<(), EncodeError> {
        let qr = if self.qr { 1u16 } else { 0u16 };
        let opcode = self.opcode.encode() as u16;
        let rcode = match &self.rcode {
            Some(val) => val.encode() as u16,
            None => 0u16,
        };

        let line_two = (qr << 15) + (opcode << 11) + self.flags.as_flags() + rcode;
        buf.write_u16::<NetworkEndian>(self.msg_id)?;
        buf.write_u16::<NetworkEndian>(line_two)?;
        buf.write_u16::<NetworkEndian>(self.qdcount)?;
        buf.write_u16::<NetworkEndian>(self.ancount)?;
        buf.write_u16::<NetworkEndian>(self.nscount)?;
        buf.write_u16::<NetworkEndian>(self.arcount)?;

        Ok(())
    }

    pub fn parse(header: &mut Cursor<&[u8]>) -> Result<Self, ParseError> {
        let msg_id = header.read_u16::<NetworkEndian>()?;
        let line_two = header.read_u16::<NetworkEndian>()?;
        let qr = (line_two & (1 << 15)) >> 15;
        let opcode = Opcode::parse(((line_two & (0b1111 << 11)) >> 11) as u8)?;
        let flags = HeaderFlags::from_flags(line_two & 0b0000011110110000);
        let rcode = RCode::parse(line_two & 0b1111)?;

        Ok(Header {
            msg_id,
            qr: qr != 0,
            opcode,
            flags,
            rcode: if qr != 0 { Some(rcode) } else { None },
            qdcount: header.read_u16::<NetworkEndian>()?,
            ancount: header.read_u16::<NetworkEndian>()?,
            nscount: header.read_u16::<NetworkEndian>()?,
            arcount: header.read_u16::<NetworkEndian>()?,
        })
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.qr {
            write!(f, "DNS Response (id: {}, opcode: {})", self.msg_id, self.opcode)
        } else {
            write!(f, "DNS Query (id: {}, opcode: {})", self.msg_id, self.opcode)
        }
    }
}

impl Question {
    pub fn new(name: Name, qtype: RecordType, qclass: Class) -> Self {
        Question {
            qname: name,
            qtype,
            qclass,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    pub fn encode_into(&self, buf: &mut impl Write) -> Result<(), EncodeError> {
        self.qname.encode_into(buf)?;
        buf.write_u16::<NetworkEndian>(self.qtype.into())?;
        buf.write_u16::<NetworkEndian>(self.qclass.encode())?;
        Ok(())
    }

    pub fn parse(msg: &mut Cursor<&[u8]>) -> Result<Self, ParseError> {
        let qname = Name::parse(msg, name::Compression::Allowed)?;
        let qtype: RecordType = msg.read_u16::<NetworkEndian>()?.into();
        let qclass = Class::parse(msg.read_u16::<NetworkEndian>()?)?;

        Ok(Question {
            qname,
            qtype,
            qclass,
        })
    }
}

impl Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DNS Question for '{}' (type: {}, class: {})",
            self.qname, self.qtype, self.qclass
        )
    }
}

impl Record {
    /// Creates a new `Record` from [`Rdata`].
    pub fn new(owner: Name, class: Class, ttl: u32, rdata: Rdata) -> Result<Self, EncodeError> {
        let rtype = rdata.rtype();
        let encoded_rdata = rdata.encode()?;

        Ok(Self {
            owner,
            rtype,
            class,
            ttl,
            rdata,
            encoded_rdata,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    pub fn encode_into(&self, buf: &mut impl Write) -> Result<(), EncodeError> {
        self.owner.encode_into(buf)?;
        buf.write_u16::<NetworkEndian>(self.rtype.into())?;
        buf.write_u16::<NetworkEndian>(self.class.encode())?;
        buf.write_u32::<NetworkEndian>(self.ttl)?;
        buf.write_u16::<NetworkEndian>(self.encoded_rdata.len() as u16)?;
        buf.write_all(&self.encoded_rdata)?;
        Ok(())
    }

    pub fn parse(msg: &mut Cursor<&[u8]>) -> Result<Self, ParseError> {
        let owner = Name::parse(msg, name::Compression::Allowed)?;
        let atype: RecordType = msg.read_u16::<NetworkEndian>()?.into();
        let class = Class::parse(msg.read_u16::<NetworkEndian>()?)?;
        let ttl = msg.read_u32::<NetworkEndian>()?;
        let rdlength = msg.read_u16::<NetworkEndian>()?;

        let mut encoded_rdata = vec![0; rdlength as usize];
        let pos_rdata_start = msg.position();
        msg.read_exact(&mut encoded_rdata)?;
        msg.set_position(pos_rdata_start);
        let rdata = Record::parse_rdata(&atype, msg, rdlength)?;

        Ok(Record {
            owner,
            rtype: atype,
            class,
            ttl,
            encoded_rdata,
            rdata,
        })
    }

    /// Decodes RDATA for the given record type, falling back to [`Rdata::Unknown`] for anything
    /// this crate does not implement.
    pub fn parse_rdata(
        atype: &RecordType,
        msg: &mut Cursor<&[u8]>,
        rdlength: u16,
    ) -> Result<Rdata, ParseError> {
        match atype {
            RecordType::CNAME => rdata::CNAME::parse_rdata(msg, rdlength),
            RecordType::PTR => rdata::PTR::parse_rdata(msg, rdlength),
            RecordType::TXT => rdata::TXT::parse_rdata(msg, rdlength),
            RecordType::Unknown(_) => {
                let mut rdata = vec![0; rdlength as usize];
                msg.read_exact(&mut rdata)?;
                Ok(Rdata::Unknown(rdata))
            }
        }
    }

    pub fn rdata(&self) -> &Rdata {
        &self.rdata
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}  {}  {}", self.owner, self.ttl, self.rtype, self.rdata)
    }
}

impl Message {
    /// Creates a DNS query with a single question and a random message id.
    pub fn new_query(
        domain: Name,
        qtype: RecordType,
        opcode: Opcode,
        flags: HeaderFlags,
    ) -> Result<Self, EncodeError> {
        if flags.aa || flags.ra {
            return Err(EncodeError::AaOrRaInQuery);
        }

        let msg_id = rand::thread_rng().gen_range(0..(1u32 << 16)) as u16;
        let header = Header::new_query_header(msg_id, opcode, flags, 1)?;

        Ok(Message {
            header,
            questions: vec![Question::new(domain, qtype, Class::IN)],
            answers: Vec::new(),
            authoritative_answers: Vec::new(),
            additional_answers: Vec::new(),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    pub fn encode_into(&self, buf: &mut impl Write) -> Result<(), EncodeError> {
        self.header.encode_into(buf)?;
        for question in &self.questions {
            question.encode_into(buf)?;
        }
        for record in &self.answers {
            record.encode_into(buf)?;
        }
        for record in &self.authoritative_answers {
            record.encode_into(buf)?;
        }
        for record in &self.additional_answers {
            record.encode_into(buf)?;
        }

        Ok(())
    }

    /// Parses an encoded `Message` from a series of bytes.
    ///
    /// Returns [`ParseError::TruncatedMessage`] if the `TC` flag is set; callers should retry
    /// over TCP in that case (this crate's own transport only ever uses TCP, see
    /// `psldns-core::client`).
    pub fn parse(msg: &mut Cursor<&[u8]>) -> Result<Self, ParseError> {
        let header = Header::parse(msg)?;

        if header.flags.tc {
            return Err(ParseError::TruncatedMessage);
        }

        let questions = Message::parse_questions(msg, header.qdcount)?;
        let answers = Message::parse_records(msg, header.ancount)?;
        let authoritative_answers = Message::parse_records(msg, header.nscount)?;
        let additional_answers = Message::parse_records(msg, header.arcount)?;

        Ok(Message {
            header,
            questions,
            answers,
            authoritative_answers,
            additional_answers,
        })
    }

    /// Returns the [`Record`]s at `qname` of the given `rtype` in the answer section.
    pub fn answers_for<'a>(&'a self, qname: &Name, rtype: RecordType) -> Vec<&'a Record> {
        self.answers
            .iter()
            .filter(|r| &r.owner == qname && r.rtype == rtype)
            .collect()
    }

    fn parse_questions(msg: &mut Cursor<&[u8]>, qdcount: u16) -> Result<Vec<Question>, ParseError> {
        let mut questions = Vec::with_capacity(qdcount as usize);
        for _ in 0..qdcount {
            questions.push(Question::parse(msg)?);
        }
        Ok(questions)
    }

    fn parse_records(msg: &mut Cursor<&[u8]>, count: u16) -> Result<Vec<Record>, ParseError> {
        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            records.push(Record::parse(msg)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_round_trips_through_wire_format() {
        let flags = HeaderFlags {
            aa: false,
            tc: false,
            rd: true,
            ra: false,
            ad: false,
            cd: false,
        };
        let msg = Message::new_query(
            Name::from_ascii("com.query.publicsuffix.zone").unwrap(),
            RecordType::PTR,
            Opcode::QUERY,
            flags,
        )
        .unwrap();

        let encoded = msg.encode().unwrap();
        let decoded = Message::parse(&mut Cursor::new(&encoded)).unwrap();

        assert_eq!(decoded.header.msg_id, msg.header.msg_id);
        assert_eq!(decoded.questions, msg.questions);
        assert_eq!(decoded.header.opcode, Opcode::QUERY);
    }

    #[test]
    fn record_type_round_trips_through_u16() {
        assert_eq!(RecordType::from(12u16), RecordType::PTR);
        assert_eq!(RecordType::from(5u16), RecordType::CNAME);
        assert_eq!(RecordType::from(16u16), RecordType::TXT);
        assert_eq!(u16::from(RecordType::PTR), 12);
        match RecordType::from(999u16) {
            RecordType::Unknown(999) => {}
            other => panic!("expected Unknown(999), got {:?}", other),
        }
    }
}
