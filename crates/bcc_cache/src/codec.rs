//! Binary layout of cache entries.
//!
//! An entry is a fixed-width header followed by the payload. All integers
//! are little-endian.
//!
//! ```text
//! header
//!   magic              u32       "oBCC"
//!   version            u32       FORMAT_VERSION
//!   content digest     [u8; 20]
//!   mod time           i64
//!   crc32              u32
//!   signature length   u32       <= MAX_SIGNATURE_LEN
//!   signature          [u8; signature length]
//!   payload length     u64
//!   payload checksum   u32       CRC-32 of the payload
//! payload
//!   section table      6 x (offset u64, len u64), offsets from payload start
//!   strings            raw UTF-8, referenced as (offset u32, len u32)
//!   symbols            count u32, then (name ref, kind u32, offset u64)
//!   relocations        count u32, then (offset u64, kind u32, symbol ref, addend i64)
//!   functions          count u32, then (name ref, offset u64, len u64)
//!   pragmas            count u32, then (key ref, value ref)
//!   code               raw bytes
//! ```
//!
//! Sections are contiguous and appear in table order, so any one can be
//! reached from the table without scanning the others. Decoding checks every
//! length and offset against the bytes actually present before using it.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use bcc_common::{crc32, ContentDigest, ToolchainSignature, MAX_SIGNATURE_LEN};

use crate::artifact::{
    CompiledArtifact, ExportedSymbol, FunctionRange, Pragma, Relocation, SymbolKind,
};
use crate::error::{DecodeError, EncodeError};
use crate::fingerprint::SourceFingerprint;

/// Magic number opening every cache file (`"oBCC"` read little-endian).
pub const MAGIC: u32 = u32::from_le_bytes(*b"oBCC");

/// Current format version. Increment on any layout change.
pub const FORMAT_VERSION: u32 = 1;

/// Header bytes up to and including the signature length.
pub(crate) const FIXED_PREFIX_LEN: usize = 4 + 4 + 20 + 8 + 4 + 4;

/// Header bytes after the signature.
const HEADER_TAIL_LEN: usize = 8 + 4;

const SECTION_COUNT: usize = 6;
const SECTION_TABLE_LEN: usize = SECTION_COUNT * 16;

const STR_REF_LEN: usize = 8;
const SYMBOL_RECORD_LEN: usize = STR_REF_LEN + 4 + 8;
const RELOCATION_RECORD_LEN: usize = 8 + 4 + STR_REF_LEN + 8;
const FUNCTION_RECORD_LEN: usize = STR_REF_LEN + 8 + 8;
const PRAGMA_RECORD_LEN: usize = STR_REF_LEN * 2;

/// Regions of a cache file, named in decode diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Fixed-width header fields.
    Header,
    /// Toolchain signature bytes inside the header.
    Signature,
    /// Everything after the header.
    Payload,
    /// The payload's section table.
    SectionTable,
    /// String pool.
    Strings,
    /// Exported symbol records.
    Symbols,
    /// Relocation records.
    Relocations,
    /// Function range records.
    Functions,
    /// Pragma records.
    Pragmas,
    /// Machine code.
    Code,
}

/// Payload sections in table order.
const PAYLOAD_SECTIONS: [Section; SECTION_COUNT] = [
    Section::Strings,
    Section::Symbols,
    Section::Relocations,
    Section::Functions,
    Section::Pragmas,
    Section::Code,
];

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Header => "header",
            Section::Signature => "signature",
            Section::Payload => "payload",
            Section::SectionTable => "section table",
            Section::Strings => "strings",
            Section::Symbols => "symbols",
            Section::Relocations => "relocations",
            Section::Functions => "functions",
            Section::Pragmas => "pragmas",
            Section::Code => "code",
        })
    }
}

/// Decoded cache entry header.
///
/// Magic and version are validated during decoding, so a header value
/// always describes a current-format entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Format version the entry was written with.
    pub version: u32,
    /// Fingerprint of the source the artifact was built from.
    pub fingerprint: SourceFingerprint,
    /// Exact payload length in bytes.
    pub payload_len: u64,
    /// CRC-32 of the payload.
    pub payload_checksum: u32,
}

impl EntryHeader {
    /// Size of this header on disk.
    pub fn encoded_len(&self) -> usize {
        FIXED_PREFIX_LEN + self.fingerprint.toolchain.len() + HEADER_TAIL_LEN
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let fp = &self.fingerprint;
        put_u32(out, MAGIC);
        put_u32(out, self.version);
        out.extend_from_slice(fp.content_digest.as_bytes());
        out.extend_from_slice(&fp.mod_time.to_le_bytes());
        put_u32(out, fp.crc32);
        put_u32(out, to_u32(fp.toolchain.len(), Section::Signature)?);
        out.extend_from_slice(fp.toolchain.as_bytes());
        put_u64(out, self.payload_len);
        put_u32(out, self.payload_checksum);
        Ok(())
    }
}

/// Serializes an artifact and the fingerprint it was built from.
///
/// Output is deterministic: equal inputs always produce equal bytes. An
/// artifact that fails [`CompiledArtifact::validate`] is refused, since
/// [`decode`] would reject the entry.
pub fn encode(
    artifact: &CompiledArtifact,
    fingerprint: &SourceFingerprint,
) -> Result<Vec<u8>, EncodeError> {
    artifact.validate().map_err(EncodeError::InvalidArtifact)?;
    let payload = encode_payload(artifact)?;
    let header = EntryHeader {
        version: FORMAT_VERSION,
        fingerprint: fingerprint.clone(),
        payload_len: payload.len() as u64,
        payload_checksum: crc32(&payload),
    };
    let mut out = Vec::with_capacity(header.encoded_len() + payload.len());
    header.write_to(&mut out)?;
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decodes a complete cache entry.
pub fn decode(bytes: &[u8]) -> Result<(EntryHeader, CompiledArtifact), DecodeError> {
    let (header, header_len) = parse_header(bytes)?;
    let payload = &bytes[header_len..];
    verify_payload(&header, payload)?;
    let artifact = decode_payload(payload)?;
    Ok((header, artifact))
}

/// Decodes only the header. Trailing payload bytes are ignored.
pub fn decode_header(bytes: &[u8]) -> Result<EntryHeader, DecodeError> {
    parse_header(bytes).map(|(header, _)| header)
}

/// Number of header bytes still to read after [`FIXED_PREFIX_LEN`].
///
/// Returns `None` when `prefix` is short or declares an oversized signature;
/// [`decode_header`] reports the precise error in both cases.
pub(crate) fn header_remainder_len(prefix: &[u8]) -> Option<usize> {
    let raw = prefix.get(FIXED_PREFIX_LEN - 4..FIXED_PREFIX_LEN)?;
    let sig_len = u32::from_le_bytes(raw.try_into().ok()?) as usize;
    (sig_len <= MAX_SIGNATURE_LEN).then_some(sig_len + HEADER_TAIL_LEN)
}

/// Checks the payload length and checksum against the header.
pub fn verify_payload(header: &EntryHeader, payload: &[u8]) -> Result<(), DecodeError> {
    let len = payload.len() as u64;
    if len < header.payload_len {
        return Err(DecodeError::Truncated {
            section: Section::Payload,
            needed: header.payload_len,
            available: len,
        });
    }
    if len > header.payload_len {
        return Err(DecodeError::BadLength {
            section: Section::Payload,
            reason: format!("{} trailing bytes", len - header.payload_len),
        });
    }
    let actual = crc32(payload);
    if actual != header.payload_checksum {
        return Err(DecodeError::ChecksumMismatch {
            expected: header.payload_checksum,
            actual,
        });
    }
    Ok(())
}

/// Decodes a payload whose checksum has already been verified.
pub fn decode_payload(payload: &[u8]) -> Result<CompiledArtifact, DecodeError> {
    let [strings, symbols, relocations, functions, pragmas, code] = read_section_table(payload)?;
    let pool = &payload[strings];

    let symbols = decode_records(
        &payload[symbols],
        Section::Symbols,
        SYMBOL_RECORD_LEN,
        |cur| {
            let name = read_str(cur, pool)?;
            let tag = cur.u32()?;
            let kind = SymbolKind::from_tag(tag).ok_or(DecodeError::BadTag {
                section: Section::Symbols,
                tag,
            })?;
            let offset = cur.u64()?;
            Ok(ExportedSymbol { name, kind, offset })
        },
    )?;

    let relocations = decode_records(
        &payload[relocations],
        Section::Relocations,
        RELOCATION_RECORD_LEN,
        |cur| {
            Ok(Relocation {
                offset: cur.u64()?,
                kind: cur.u32()?,
                symbol: read_str(cur, pool)?,
                addend: cur.i64()?,
            })
        },
    )?;

    let functions = decode_records(
        &payload[functions],
        Section::Functions,
        FUNCTION_RECORD_LEN,
        |cur| {
            Ok(FunctionRange {
                name: read_str(cur, pool)?,
                offset: cur.u64()?,
                len: cur.u64()?,
            })
        },
    )?;

    let pragmas = decode_records(
        &payload[pragmas],
        Section::Pragmas,
        PRAGMA_RECORD_LEN,
        |cur| {
            Ok(Pragma {
                key: read_str(cur, pool)?,
                value: read_str(cur, pool)?,
            })
        },
    )?;

    let artifact = CompiledArtifact {
        code: payload[code].to_vec(),
        symbols,
        relocations,
        functions,
        pragmas,
    };
    artifact.validate()?;
    Ok(artifact)
}

fn parse_header(bytes: &[u8]) -> Result<(EntryHeader, usize), DecodeError> {
    let mut cur = Cursor::new(bytes, Section::Header);
    let magic = cur.u32()?;
    if magic != MAGIC {
        return Err(DecodeError::BadMagic { found: magic });
    }
    let version = cur.u32()?;
    if version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }
    let content_digest = ContentDigest::from_raw(cur.array()?);
    let mod_time = cur.i64()?;
    let crc32 = cur.u32()?;

    let sig_len = cur.u32()? as usize;
    if sig_len > MAX_SIGNATURE_LEN {
        return Err(DecodeError::BadLength {
            section: Section::Signature,
            reason: format!("{sig_len} bytes exceeds limit of {MAX_SIGNATURE_LEN}"),
        });
    }
    cur.section = Section::Signature;
    let toolchain = ToolchainSignature::new(cur.take(sig_len)?.to_vec()).map_err(|e| {
        DecodeError::BadLength {
            section: Section::Signature,
            reason: e.to_string(),
        }
    })?;
    cur.section = Section::Header;

    let payload_len = cur.u64()?;
    let payload_checksum = cur.u32()?;
    let header = EntryHeader {
        version,
        fingerprint: SourceFingerprint {
            content_digest,
            mod_time,
            crc32,
            toolchain,
        },
        payload_len,
        payload_checksum,
    };
    Ok((header, cur.pos))
}

fn encode_payload(artifact: &CompiledArtifact) -> Result<Vec<u8>, EncodeError> {
    let mut pool = StringPool::default();

    let mut symbols = record_section(artifact.symbols.len(), Section::Symbols, SYMBOL_RECORD_LEN)?;
    for sym in &artifact.symbols {
        put_str_ref(&mut symbols, pool.intern(&sym.name)?);
        put_u32(&mut symbols, sym.kind.to_tag());
        put_u64(&mut symbols, sym.offset);
    }

    let mut relocations = record_section(
        artifact.relocations.len(),
        Section::Relocations,
        RELOCATION_RECORD_LEN,
    )?;
    for reloc in &artifact.relocations {
        put_u64(&mut relocations, reloc.offset);
        put_u32(&mut relocations, reloc.kind);
        put_str_ref(&mut relocations, pool.intern(&reloc.symbol)?);
        relocations.extend_from_slice(&reloc.addend.to_le_bytes());
    }

    let mut functions = record_section(
        artifact.functions.len(),
        Section::Functions,
        FUNCTION_RECORD_LEN,
    )?;
    for func in &artifact.functions {
        put_str_ref(&mut functions, pool.intern(&func.name)?);
        put_u64(&mut functions, func.offset);
        put_u64(&mut functions, func.len);
    }

    let mut pragmas = record_section(artifact.pragmas.len(), Section::Pragmas, PRAGMA_RECORD_LEN)?;
    for pragma in &artifact.pragmas {
        put_str_ref(&mut pragmas, pool.intern(&pragma.key)?);
        put_str_ref(&mut pragmas, pool.intern(&pragma.value)?);
    }

    let sections: [&[u8]; SECTION_COUNT] = [
        &pool.bytes,
        &symbols,
        &relocations,
        &functions,
        &pragmas,
        &artifact.code,
    ];
    let total = SECTION_TABLE_LEN + sections.iter().map(|s| s.len()).sum::<usize>();
    let mut payload = Vec::with_capacity(total);
    let mut offset = SECTION_TABLE_LEN as u64;
    for section in &sections {
        put_u64(&mut payload, offset);
        put_u64(&mut payload, section.len() as u64);
        offset += section.len() as u64;
    }
    for section in &sections {
        payload.extend_from_slice(section);
    }
    Ok(payload)
}

/// Validates the section table and returns each section's byte range.
fn read_section_table(payload: &[u8]) -> Result<[Range<usize>; SECTION_COUNT], DecodeError> {
    let mut cur = Cursor::new(payload, Section::SectionTable);
    let total = payload.len() as u64;
    let mut expected_start = SECTION_TABLE_LEN as u64;
    let mut ranges: [Range<usize>; SECTION_COUNT] = Default::default();

    for (range, section) in ranges.iter_mut().zip(PAYLOAD_SECTIONS) {
        let offset = cur.u64()?;
        let len = cur.u64()?;
        if offset != expected_start {
            return Err(DecodeError::BadLength {
                section,
                reason: format!("starts at {offset}, expected {expected_start}"),
            });
        }
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= total)
            .ok_or(DecodeError::Truncated {
                section,
                needed: len,
                available: total.saturating_sub(offset),
            })?;
        // Both bounds are within the in-memory payload.
        *range = offset as usize..end as usize;
        expected_start = end;
    }

    if expected_start != total {
        return Err(DecodeError::BadLength {
            section: Section::Payload,
            reason: format!("{} bytes after last section", total - expected_start),
        });
    }
    Ok(ranges)
}

/// Decodes `count u32` followed by exactly `count` fixed-size records.
fn decode_records<T>(
    bytes: &[u8],
    section: Section,
    record_len: usize,
    mut decode_one: impl FnMut(&mut Cursor<'_>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let mut cur = Cursor::new(bytes, section);
    let count = cur.u32()? as u64;
    let body = cur.remaining() as u64;
    let needed = count * record_len as u64;
    if needed != body {
        return Err(DecodeError::BadLength {
            section,
            reason: format!(
                "{count} records of {record_len} bytes need {needed}, section holds {body}"
            ),
        });
    }
    // `count` is bounded by bytes actually present.
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        out.push(decode_one(&mut cur)?);
    }
    Ok(out)
}

fn read_str(cur: &mut Cursor<'_>, pool: &[u8]) -> Result<String, DecodeError> {
    let offset = cur.u32()?;
    let len = cur.u32()?;
    let end = offset as u64 + len as u64;
    if end > pool.len() as u64 {
        return Err(DecodeError::BadOffset {
            section: Section::Strings,
            offset: end,
            limit: pool.len() as u64,
        });
    }
    let bytes = &pool[offset as usize..end as usize];
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| DecodeError::BadString { offset })
}

/// Starts a record section with its `count` prefix.
fn record_section(count: usize, section: Section, record_len: usize) -> Result<Vec<u8>, EncodeError> {
    let count32 = to_u32(count, section)?;
    let mut out = Vec::with_capacity(4 + count * record_len);
    put_u32(&mut out, count32);
    Ok(out)
}

/// Deduplicating string pool builder.
#[derive(Default)]
struct StringPool {
    bytes: Vec<u8>,
    index: HashMap<String, (u32, u32)>,
}

impl StringPool {
    fn intern(&mut self, s: &str) -> Result<(u32, u32), EncodeError> {
        if let Some(&r) = self.index.get(s) {
            return Ok(r);
        }
        let offset = to_u32(self.bytes.len(), Section::Strings)?;
        let len = to_u32(s.len(), Section::Strings)?;
        to_u32(self.bytes.len() + s.len(), Section::Strings)?;
        self.bytes.extend_from_slice(s.as_bytes());
        self.index.insert(s.to_owned(), (offset, len));
        Ok((offset, len))
    }
}

fn to_u32(n: usize, section: Section) -> Result<u32, EncodeError> {
    u32::try_from(n).map_err(|_| EncodeError::TooLarge {
        section,
        len: n as u64,
    })
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_str_ref(out: &mut Vec<u8>, (offset, len): (u32, u32)) {
    put_u32(out, offset);
    put_u32(out, len);
}

/// Bounds-checked little-endian reader over a byte slice.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    section: Section,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8], section: Section) -> Self {
        Self {
            buf,
            pos: 0,
            section,
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.remaining();
        if n > available {
            return Err(DecodeError::Truncated {
                section: self.section,
                needed: n as u64,
                available: available as u64,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        self.array().map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        self.array().map(u64::from_le_bytes)
    }

    fn i64(&mut self) -> Result<i64, DecodeError> {
        self.array().map(i64::from_le_bytes)
    }
}
