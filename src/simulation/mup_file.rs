// src/simulation/mup_file.rs
//! Binary persistence of MUP buffers
//!
//! Layout (little-endian):
//!
//! ```text
//! "MUP " ' ' <6-digit unit id> "; "
//! i32 header_size, n_buffers, base_sample_count, alignment_index, alignment_offset, flags
//! extension records (tag i32, len i32, payload[len]) up to header_size
//! i32 offset per buffer (0 = absent), one more for the cannula when flagged
//! records: i32 fibre_id, i32 sample_count, sample_count x f32
//! ```
//!
//! Readers skip unknown extension tags by length. The extension block has to
//! end exactly at `header_size`.

use super::buffer_pool::FibreBuffer;
use crate::config::constants::format;
use crate::error::{EmgErrorBuilder, EmgResult, FileFormat, IoResultExt};
use crate::utils::{samples_as_le_bytes, samples_from_le_bytes, verify_crc32, PayloadChecksum};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const COMPONENT: &str = "mup_file";

/// Bytes before the fixed header fields
pub const PREFIX_LEN: usize = 4 + 1 + format::UNIT_ID_WIDTH + 2;
/// Bytes up to the end of the fixed header fields
pub const FIXED_HEADER_LEN: usize = PREFIX_LEN + 6 * 4;

/// Length-prefixed header extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRecord {
    /// Record type; unknown tags are skipped on read
    pub tag: i32,
    /// Raw record bytes
    pub payload: Vec<u8>,
}

impl ExtensionRecord {
    /// Record of `tag` carrying `payload`
    pub fn new(tag: i32, payload: Vec<u8>) -> Self {
        Self { tag, payload }
    }

    fn encoded_len(&self) -> usize {
        8 + self.payload.len()
    }
}

/// Parsed header and offset table
#[derive(Debug, Clone)]
pub struct MupHeader {
    /// Unit id from the text prefix
    pub unit_id: u32,
    /// File started with the legacy magic
    pub legacy_magic: bool,
    /// Bytes before the offset table
    pub header_size: u64,
    /// Slots, composite included
    pub buffer_count: usize,
    /// Samples per base-rate buffer
    pub base_sample_count: usize,
    /// Slot of the alignment fibre
    pub alignment_index: Option<usize>,
    /// Expanded-rate index of its steepest step
    pub alignment_offset: Option<i64>,
    /// A cannula record follows the slot offsets
    pub has_cannula: bool,
    /// Format version extension, when present
    pub version: Option<i32>,
    /// CRC-32 of all records, when present
    pub payload_crc: Option<u32>,
    /// Tags of extension records this reader does not know
    pub skipped_extensions: Vec<i32>,
    /// Absolute record offset per slot, 0 when absent
    pub buffer_offsets: Vec<u64>,
    /// Absolute offset of the cannula record
    pub cannula_offset: Option<u64>,
}

/// Buffers restored from a file
#[derive(Debug, Clone, Default)]
pub struct LoadedBuffers {
    /// One entry per slot
    pub slots: Vec<Option<FibreBuffer>>,
    /// Cannula buffer
    pub cannula: Option<FibreBuffer>,
}

/// Borrowed view of what a MUP file stores
#[derive(Debug, Clone, Copy)]
pub struct MupImage<'a> {
    /// Unit id written into the prefix
    pub unit_id: u32,
    /// Samples per base-rate buffer
    pub base_sample_count: usize,
    /// Alignment slot and expanded-rate offset
    pub alignment: Option<(usize, i64)>,
    /// Slots in order, composite first
    pub slots: &'a [Option<FibreBuffer>],
    /// Cannula buffer
    pub cannula: Option<&'a FibreBuffer>,
}

/// Serialises a [`MupImage`]; extra extension records can be appended
pub struct MupFileWriter<'a> {
    image: MupImage<'a>,
    extensions: Vec<ExtensionRecord>,
}

impl<'a> MupFileWriter<'a> {
    /// Writer with the standard version and CRC extensions
    pub fn new(image: MupImage<'a>) -> Self {
        Self {
            image,
            extensions: Vec::new(),
        }
    }

    /// Append an extra extension record
    pub fn with_extension(mut self, record: ExtensionRecord) -> Self {
        self.extensions.push(record);
        self
    }

    /// Write the whole file to `path`
    pub fn write(&self, path: &Path) -> EmgResult<()> {
        let image = &self.image;
        if image.unit_id >= 10u32.pow(format::UNIT_ID_WIDTH as u32) {
            return Err(EmgErrorBuilder::new(COMPONENT, "write")
                .invalid_data("unit id", format!("{} exceeds {} digits", image.unit_id, format::UNIT_ID_WIDTH)));
        }

        let records: Vec<Option<Vec<u8>>> = image
            .slots
            .iter()
            .map(|slot| slot.as_ref().filter(|b| b.sample_count() > 0).map(encode_record))
            .chain(image.cannula.map(|c| Some(encode_record(c))))
            .collect();

        let mut checksum = PayloadChecksum::new();
        for record in records.iter().flatten() {
            checksum.update(record);
        }

        let mut extensions = vec![
            ExtensionRecord::new(format::EXT_TAG_VERSION, format::FORMAT_VERSION.to_le_bytes().to_vec()),
            ExtensionRecord::new(format::EXT_TAG_PAYLOAD_CRC, checksum.finalize().to_le_bytes().to_vec()),
        ];
        extensions.extend(self.extensions.iter().cloned());

        let header_size = FIXED_HEADER_LEN + extensions.iter().map(ExtensionRecord::encoded_len).sum::<usize>();
        let table_len = 4 * records.len();
        let mut next_offset = header_size + table_len;
        let mut offsets = Vec::with_capacity(records.len());
        for record in &records {
            match record {
                Some(bytes) => {
                    offsets.push(to_i32(next_offset, path)?);
                    next_offset += bytes.len();
                }
                None => offsets.push(0),
            }
        }

        let (alignment_index, alignment_offset) = match image.alignment {
            Some((index, offset)) => (to_i32(index, path)?, to_i32(offset.max(0) as usize, path)?),
            None => (-1, -1),
        };
        let flags = if image.cannula.is_some() { format::FLAG_CANNULA } else { 0 };

        let file = File::create(path).io_err(COMPONENT, "create", path)?;
        let mut out = BufWriter::new(file);

        put(&mut out, format::MUP_MAGIC, path)?;
        put(
            &mut out,
            format!(" {:0width$}; ", image.unit_id, width = format::UNIT_ID_WIDTH).as_bytes(),
            path,
        )?;
        for field in [
            to_i32(header_size, path)?,
            to_i32(image.slots.len(), path)?,
            to_i32(image.base_sample_count, path)?,
            alignment_index,
            alignment_offset,
            flags,
        ] {
            put(&mut out, &field.to_le_bytes(), path)?;
        }
        for ext in &extensions {
            put(&mut out, &ext.tag.to_le_bytes(), path)?;
            put(&mut out, &to_i32(ext.payload.len(), path)?.to_le_bytes(), path)?;
            put(&mut out, &ext.payload, path)?;
        }
        for offset in &offsets {
            put(&mut out, &offset.to_le_bytes(), path)?;
        }
        for record in records.iter().flatten() {
            put(&mut out, record, path)?;
        }
        out.flush().io_err(COMPONENT, "flush", path)?;

        debug!(
            unit = image.unit_id,
            buffers = image.slots.len(),
            cannula = image.cannula.is_some(),
            path = %path.display(),
            "MUP file written"
        );
        Ok(())
    }
}

fn put(out: &mut BufWriter<File>, bytes: &[u8], path: &Path) -> EmgResult<()> {
    out.write_all(bytes).io_err(COMPONENT, "write", path)
}

fn encode_record(buffer: &FibreBuffer) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + 4 * buffer.sample_count());
    bytes.extend_from_slice(&buffer.fibre_id().to_le_bytes());
    bytes.extend_from_slice(&(buffer.sample_count() as i32).to_le_bytes());
    bytes.extend_from_slice(&samples_as_le_bytes(buffer.samples()));
    bytes
}

fn to_i32(value: usize, path: &Path) -> EmgResult<i32> {
    i32::try_from(value).map_err(|_| {
        EmgErrorBuilder::new(COMPONENT, "write").format(
            FileFormat::MupFile,
            path,
            format!("value {} does not fit a 32-bit field", value),
        )
    })
}

/// Write a MUP file with the standard extension records
pub fn write_mup(path: &Path, image: MupImage<'_>) -> EmgResult<()> {
    MupFileWriter::new(image).write(path)
}

struct MupReader {
    inner: BufReader<File>,
    path: PathBuf,
    file_len: u64,
}

impl MupReader {
    fn open(path: &Path) -> EmgResult<Self> {
        let file = File::open(path).io_err(COMPONENT, "open", path)?;
        let file_len = file.metadata().io_err(COMPONENT, "metadata", path)?.len();
        Ok(Self {
            inner: BufReader::new(file),
            path: path.to_path_buf(),
            file_len,
        })
    }

    fn format_error(&self, operation: &str, reason: impl Into<String>) -> crate::error::EmgError {
        EmgErrorBuilder::new(COMPONENT, operation).format(FileFormat::MupFile, &self.path, reason)
    }

    fn read_bytes(&mut self, buf: &mut [u8], what: &str) -> EmgResult<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                Err(self.format_error("read", format!("truncated while reading {}", what)))
            }
            Err(e) => Err(EmgErrorBuilder::new(COMPONENT, "read").io(&self.path, e)),
        }
    }

    fn read_i32(&mut self, what: &str) -> EmgResult<i32> {
        let mut bytes = [0u8; 4];
        self.read_bytes(&mut bytes, what)?;
        Ok(i32::from_le_bytes(bytes))
    }

    fn seek_to(&mut self, offset: u64) -> EmgResult<()> {
        self.inner
            .seek(SeekFrom::Start(offset))
            .map(|_| ())
            .io_err(COMPONENT, "seek", &self.path)
    }
}

/// Read prefix, fixed fields, extensions and the offset table
pub fn read_header(path: &Path) -> EmgResult<MupHeader> {
    let mut reader = MupReader::open(path)?;
    read_header_from(&mut reader)
}

fn read_header_from(reader: &mut MupReader) -> EmgResult<MupHeader> {
    let mut prefix = [0u8; PREFIX_LEN];
    reader.read_bytes(&mut prefix, "file prefix")?;

    let magic = &prefix[..4];
    let legacy_magic = magic == format::LEGACY_MUP_MAGIC;
    if magic != format::MUP_MAGIC && !legacy_magic {
        return Err(reader.format_error("read_header", format!("bad magic {:?}", String::from_utf8_lossy(magic))));
    }
    let id_end = 5 + format::UNIT_ID_WIDTH;
    if prefix[4] != b' ' || &prefix[id_end..] != b"; " {
        return Err(reader.format_error("read_header", "malformed unit id prefix"));
    }
    let unit_id = std::str::from_utf8(&prefix[5..id_end])
        .ok()
        .and_then(|digits| digits.parse::<u32>().ok())
        .ok_or_else(|| reader.format_error("read_header", "unit id is not a decimal number"))?;

    let header_size = reader.read_i32("header size")?;
    let buffer_count = reader.read_i32("buffer count")?;
    let base_sample_count = reader.read_i32("base sample count")?;
    let alignment_index = reader.read_i32("alignment index")?;
    let alignment_offset = reader.read_i32("alignment offset")?;
    let flags = reader.read_i32("flags")?;

    if header_size < FIXED_HEADER_LEN as i32 {
        return Err(reader.format_error(
            "read_header",
            format!("header size {} below fixed length {}", header_size, FIXED_HEADER_LEN),
        ));
    }
    if buffer_count < 0 || base_sample_count < 0 {
        return Err(reader.format_error(
            "read_header",
            format!("negative counts (buffers {}, base {})", buffer_count, base_sample_count),
        ));
    }
    let buffer_count = buffer_count as usize;
    let alignment_index = match alignment_index {
        -1 => None,
        i if i >= 1 && (i as usize) < buffer_count => Some(i as usize),
        i => {
            return Err(reader.format_error("read_header", format!("alignment index {} out of range", i)));
        }
    };
    let alignment_offset = match alignment_offset {
        o if o < 0 => None,
        o => Some(o as i64),
    };
    if alignment_index.is_some() != alignment_offset.is_some() {
        return Err(reader.format_error("read_header", "alignment index and offset disagree"));
    }

    let mut header = MupHeader {
        unit_id,
        legacy_magic,
        header_size: header_size as u64,
        buffer_count,
        base_sample_count: base_sample_count as usize,
        alignment_index,
        alignment_offset,
        has_cannula: flags & format::FLAG_CANNULA != 0,
        version: None,
        payload_crc: None,
        skipped_extensions: Vec::new(),
        buffer_offsets: Vec::new(),
        cannula_offset: None,
    };

    let extension_len = header_size as usize - FIXED_HEADER_LEN;
    if extension_len > 0 {
        let mut block = vec![0u8; extension_len];
        reader.read_bytes(&mut block, "header extensions")?;
        parse_extensions(&block, &mut header, reader)?;
    }

    let table_entries = buffer_count + usize::from(header.has_cannula);
    if header.header_size + 4 * table_entries as u64 > reader.file_len {
        return Err(reader.format_error("read_header", "offset table runs past end of file"));
    }
    for _ in 0..buffer_count {
        header.buffer_offsets.push(read_offset(reader)?);
    }
    if header.has_cannula {
        header.cannula_offset = Some(read_offset(reader)?);
    }

    if legacy_magic {
        debug!(unit = unit_id, "legacy MUAP magic");
    }
    Ok(header)
}

fn read_offset(reader: &mut MupReader) -> EmgResult<u64> {
    let offset = reader.read_i32("offset table")?;
    if offset < 0 {
        return Err(reader.format_error("read_header", format!("negative buffer offset {}", offset)));
    }
    Ok(offset as u64)
}

fn parse_extensions(block: &[u8], header: &mut MupHeader, reader: &MupReader) -> EmgResult<()> {
    let mut pos = 0;
    while pos < block.len() {
        if block.len() - pos < 8 {
            return Err(reader.format_error("read_extensions", "truncated extension record header"));
        }
        let tag = le_i32(&block[pos..pos + 4]);
        let len = le_i32(&block[pos + 4..pos + 8]);
        pos += 8;
        if len < 0 || len as usize > block.len() - pos {
            return Err(reader.format_error(
                "read_extensions",
                format!("extension tag {} claims {} bytes past header end", tag, len),
            ));
        }
        let payload = &block[pos..pos + len as usize];
        pos += len as usize;

        match tag {
            format::EXT_TAG_VERSION if payload.len() == 4 => header.version = Some(le_i32(payload)),
            format::EXT_TAG_PAYLOAD_CRC if payload.len() == 4 => {
                header.payload_crc = Some(u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]))
            }
            format::EXT_TAG_VERSION | format::EXT_TAG_PAYLOAD_CRC => {
                return Err(reader.format_error(
                    "read_extensions",
                    format!("extension tag {} has {} bytes, expected 4", tag, payload.len()),
                ));
            }
            unknown => {
                debug!(tag = unknown, len, "skipping unknown MUP header extension");
                header.skipped_extensions.push(unknown);
            }
        }
    }

    if let Some(version) = header.version {
        if version > format::FORMAT_VERSION {
            warn!(version, supported = format::FORMAT_VERSION, "MUP file written by a newer format version");
        }
    }
    Ok(())
}

fn le_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read every buffer record named by `header`
pub fn read_buffers(path: &Path, header: &MupHeader) -> EmgResult<LoadedBuffers> {
    let mut reader = MupReader::open(path)?;
    let mut checksum = PayloadChecksum::new();

    let mut slots = Vec::with_capacity(header.buffer_count);
    for (slot, &offset) in header.buffer_offsets.iter().enumerate() {
        let buffer = read_record(&mut reader, offset, header.base_sample_count, Some(slot), &mut checksum)?;
        slots.push(buffer);
    }

    let cannula = match header.cannula_offset {
        Some(offset) => read_record(&mut reader, offset, header.base_sample_count, None, &mut checksum)?,
        None => None,
    };

    if let Some(expected) = header.payload_crc {
        verify_crc32(expected, checksum.finalize(), &path.display().to_string())
            .map_err(|e| reader.format_error("read_buffers", e.to_string()))?;
    }

    Ok(LoadedBuffers { slots, cannula })
}

/// `slot` is `None` for the cannula record
fn read_record(
    reader: &mut MupReader,
    offset: u64,
    base_sample_count: usize,
    slot: Option<usize>,
    checksum: &mut PayloadChecksum,
) -> EmgResult<Option<FibreBuffer>> {
    if offset == 0 {
        return Ok(None);
    }
    if offset + 8 > reader.file_len {
        return Err(reader.format_error("read_buffers", format!("record offset {} past end of file", offset)));
    }
    reader.seek_to(offset)?;

    let mut head = [0u8; 8];
    reader.read_bytes(&mut head, "record header")?;
    let fibre_id = le_i32(&head[..4]);
    let count = le_i32(&head[4..]);
    if count < 0 {
        return Err(reader.format_error("read_buffers", format!("negative sample count {}", count)));
    }
    if count == 0 {
        return Ok(None);
    }
    let count = count as usize;
    if offset + 8 + 4 * count as u64 > reader.file_len {
        return Err(reader.format_error("read_buffers", format!("record at {} truncated", offset)));
    }

    let mut payload = vec![0u8; 4 * count];
    reader.read_bytes(&mut payload, "record samples")?;
    checksum.update(&head);
    checksum.update(&payload);

    let expansion_factor = match slot {
        Some(0) | None => {
            if count != base_sample_count {
                return Err(reader.format_error(
                    "read_buffers",
                    format!("base-rate record holds {} samples, header says {}", count, base_sample_count),
                ));
            }
            1
        }
        Some(index) => {
            if base_sample_count == 0 || count % base_sample_count != 0 {
                return Err(reader.format_error(
                    "read_buffers",
                    format!("slot {} holds {} samples, not a multiple of base {}", index, count, base_sample_count),
                ));
            }
            count / base_sample_count
        }
    };

    Ok(Some(FibreBuffer::new(fibre_id, samples_from_le_bytes(&payload), expansion_factor)))
}
