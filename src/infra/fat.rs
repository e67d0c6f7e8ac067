//! Universal binary containers
//!
//! Direct parsing of the multi-architecture container format: architecture
//! inspection, slice merge, and in-place slice removal. No external tool is
//! involved, which keeps the operations usable off the build host.
//!
//! The container is a big-endian header (magic + slice count) followed by
//! one 20-byte entry per slice giving cputype, cpusubtype, file offset,
//! size, and alignment. Thin images are recognized by their own magic in
//! either byte order.

use std::collections::BTreeSet;
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::core::platform::Architecture;
use crate::error::{FatError, MergeError, StripError};

const FAT_MAGIC: u32 = 0xCAFE_BABE;
const MH_MAGIC: u32 = 0xFEED_FACE;
const MH_MAGIC_64: u32 = 0xFEED_FACF;
const MH_CIGAM: u32 = 0xCEFA_EDFE;
const MH_CIGAM_64: u32 = 0xCFFA_EDFE;

const FAT_HEADER_LEN: usize = 8;
const FAT_ARCH_LEN: usize = 20;
const THIN_HEADER_LEN: usize = 16;

const CPU_TYPE_ARM: i32 = 12;
/// Capability bits in the upper byte of cpusubtype are not part of identity
const CPU_SUBTYPE_MASK: i32 = 0x00FF_FFFF;
const CPU_TYPE_MASK: i32 = 0x00FF_FFFF;

/// Known (name, cputype, cpusubtype) triples
const KNOWN_ARCHS: &[(&str, i32, i32)] = &[
    ("i386", 0x7, 3),
    ("x86_64", 0x0100_0007, 3),
    ("armv7", 12, 9),
    ("arm64", 0x0100_000C, 0),
];

/// One architecture slice: identity fields plus the raw image bytes
#[derive(Debug, Clone)]
pub(crate) struct Slice {
    cputype: i32,
    cpusubtype: i32,
    align: u32,
    data: Vec<u8>,
}

impl Slice {
    pub(crate) fn architecture(&self) -> Architecture {
        arch_name(self.cputype, self.cpusubtype)
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    /// Image filetype from the embedded thin header, if readable
    fn filetype(&self) -> Option<u32> {
        parse_thin_header(&self.data).map(|header| header.filetype)
    }
}

struct ThinHeader {
    cputype: i32,
    cpusubtype: i32,
    filetype: u32,
}

fn arch_name(cputype: i32, cpusubtype: i32) -> Architecture {
    let sub = cpusubtype & CPU_SUBTYPE_MASK;
    for (name, known_type, known_sub) in KNOWN_ARCHS {
        if *known_type == cputype && *known_sub == sub {
            return Architecture::from(*name);
        }
    }
    Architecture::new(format!("cputype{cputype}.{sub}"))
}

fn read_u32(bytes: &[u8], offset: usize, big_endian: bool) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(if big_endian {
        u32::from_be_bytes(raw)
    } else {
        u32::from_le_bytes(raw)
    })
}

fn read_i32(bytes: &[u8], offset: usize, big_endian: bool) -> Option<i32> {
    let raw: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(if big_endian {
        i32::from_be_bytes(raw)
    } else {
        i32::from_le_bytes(raw)
    })
}

fn parse_thin_header(bytes: &[u8]) -> Option<ThinHeader> {
    let magic = read_u32(bytes, 0, true)?;
    let big_endian = match magic {
        MH_MAGIC | MH_MAGIC_64 => true,
        MH_CIGAM | MH_CIGAM_64 => false,
        _ => return None,
    };
    Some(ThinHeader {
        cputype: read_i32(bytes, 4, big_endian)?,
        cpusubtype: read_i32(bytes, 8, big_endian)?,
        filetype: read_u32(bytes, 12, big_endian)?,
    })
}

fn io_error(path: &Path, error: &std::io::Error) -> FatError {
    FatError::Io {
        path: path.to_path_buf(),
        error: error.to_string(),
    }
}

/// Report the set of architectures embedded in a binary
///
/// Walks headers only; slice payloads are never loaded.
pub fn architectures(path: &Path) -> Result<BTreeSet<Architecture>, FatError> {
    let mut file = fs::File::open(path).map_err(|e| io_error(path, &e))?;
    let mut head = [0u8; THIN_HEADER_LEN];
    let got = read_full(&mut file, &mut head).map_err(|e| io_error(path, &e))?;
    if got < 4 {
        return Err(FatError::Truncated {
            path: path.to_path_buf(),
        });
    }

    let magic = read_u32(&head, 0, true).unwrap_or(0);
    if magic == FAT_MAGIC {
        if got < FAT_HEADER_LEN {
            return Err(FatError::Truncated {
                path: path.to_path_buf(),
            });
        }
        let count = read_u32(&head, 4, true).unwrap_or(0) as usize;
        // The declared entry count is untrusted; bound it by the file
        // length before allocating the table
        let available = file
            .metadata()
            .map_err(|e| io_error(path, &e))?
            .len()
            .saturating_sub(FAT_HEADER_LEN as u64);
        if count as u64 * FAT_ARCH_LEN as u64 > available {
            return Err(FatError::Truncated {
                path: path.to_path_buf(),
            });
        }
        let mut entries = vec![0u8; count * FAT_ARCH_LEN];
        file.seek(SeekFrom::Start(FAT_HEADER_LEN as u64))
            .map_err(|e| io_error(path, &e))?;
        file.read_exact(&mut entries)
            .map_err(|_| FatError::Truncated {
                path: path.to_path_buf(),
            })?;
        let mut set = BTreeSet::new();
        for entry in entries.chunks_exact(FAT_ARCH_LEN) {
            let cputype = read_i32(entry, 0, true).unwrap_or(0);
            let cpusubtype = read_i32(entry, 4, true).unwrap_or(0);
            set.insert(arch_name(cputype, cpusubtype));
        }
        Ok(set)
    } else if let Some(header) = parse_thin_header(&head[..got]) {
        Ok(BTreeSet::from([arch_name(
            header.cputype,
            header.cpusubtype,
        )]))
    } else {
        Err(FatError::BadMagic {
            path: path.to_path_buf(),
            magic,
        })
    }
}

/// Read until the buffer is full or the stream ends, returning bytes read
fn read_full(file: &mut fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// Load every slice of a thin or universal binary into memory
pub(crate) fn load_slices(path: &Path) -> Result<Vec<Slice>, FatError> {
    let bytes = fs::read(path).map_err(|e| io_error(path, &e))?;
    let truncated = || FatError::Truncated {
        path: path.to_path_buf(),
    };
    if bytes.len() < 4 {
        return Err(truncated());
    }

    let magic = read_u32(&bytes, 0, true).unwrap_or(0);
    if magic == FAT_MAGIC {
        let count = read_u32(&bytes, 4, true).ok_or_else(truncated)? as usize;
        // Same bound as in `architectures`: the count must fit the file
        count
            .checked_mul(FAT_ARCH_LEN)
            .and_then(|table| table.checked_add(FAT_HEADER_LEN))
            .filter(|end| *end <= bytes.len())
            .ok_or_else(truncated)?;
        let mut slices = Vec::with_capacity(count);
        for index in 0..count {
            let base = FAT_HEADER_LEN + index * FAT_ARCH_LEN;
            let cputype = read_i32(&bytes, base, true).ok_or_else(truncated)?;
            let cpusubtype = read_i32(&bytes, base + 4, true).ok_or_else(truncated)?;
            let offset = read_u32(&bytes, base + 8, true).ok_or_else(truncated)? as usize;
            let size = read_u32(&bytes, base + 12, true).ok_or_else(truncated)? as usize;
            let align = read_u32(&bytes, base + 16, true).ok_or_else(truncated)?;
            let end = offset
                .checked_add(size)
                .filter(|end| *end <= bytes.len())
                .ok_or_else(truncated)?;
            slices.push(Slice {
                cputype,
                cpusubtype,
                align,
                data: bytes[offset..end].to_vec(),
            });
        }
        Ok(slices)
    } else if let Some(header) = parse_thin_header(&bytes) {
        let align = default_align(header.cputype);
        Ok(vec![Slice {
            cputype: header.cputype,
            cpusubtype: header.cpusubtype,
            align,
            data: bytes,
        }])
    } else {
        Err(FatError::BadMagic {
            path: path.to_path_buf(),
            magic,
        })
    }
}

/// Page alignment (log2) used when a thin image joins a container
fn default_align(cputype: i32) -> u32 {
    if cputype & CPU_TYPE_MASK == CPU_TYPE_ARM {
        14
    } else {
        12
    }
}

/// Serialize slices into a universal container image
fn write_container(slices: &[Slice], path: &Path) -> Result<Vec<u8>, FatError> {
    let header_len = FAT_HEADER_LEN + slices.len() * FAT_ARCH_LEN;
    let oversized = || FatError::Io {
        path: path.to_path_buf(),
        error: "slice does not fit in a 32-bit container".to_string(),
    };

    // Lay out slice offsets before writing the entry table
    let mut offsets = Vec::with_capacity(slices.len());
    let mut cursor = header_len;
    for slice in slices {
        let alignment = 1usize << slice.align.min(20);
        cursor = cursor
            .checked_add(alignment - 1)
            .map(|c| c & !(alignment - 1))
            .ok_or_else(oversized)?;
        offsets.push(cursor);
        cursor = cursor.checked_add(slice.data.len()).ok_or_else(oversized)?;
    }

    let mut buf = Vec::with_capacity(cursor);
    buf.extend_from_slice(&FAT_MAGIC.to_be_bytes());
    let count = u32::try_from(slices.len()).map_err(|_| oversized())?;
    buf.extend_from_slice(&count.to_be_bytes());
    for (slice, offset) in slices.iter().zip(&offsets) {
        buf.extend_from_slice(&slice.cputype.to_be_bytes());
        buf.extend_from_slice(&slice.cpusubtype.to_be_bytes());
        let offset32 = u32::try_from(*offset).map_err(|_| oversized())?;
        let size32 = u32::try_from(slice.data.len()).map_err(|_| oversized())?;
        buf.extend_from_slice(&offset32.to_be_bytes());
        buf.extend_from_slice(&size32.to_be_bytes());
        buf.extend_from_slice(&slice.align.to_be_bytes());
    }
    for (slice, offset) in slices.iter().zip(&offsets) {
        buf.resize(*offset, 0);
        buf.extend_from_slice(&slice.data);
    }
    Ok(buf)
}

/// Merge thin or universal inputs into one universal binary at `output`
///
/// Inputs are left untouched. Each architecture may appear in exactly one
/// input, and all slices must agree on the image filetype (the interface
/// shape check).
pub fn merge(inputs: &[PathBuf], output: &Path) -> Result<(), MergeError> {
    if inputs.is_empty() {
        return Err(MergeError::NotEnoughInputs);
    }

    let mut slices = Vec::new();
    for input in inputs {
        slices.extend(load_slices(input)?);
    }

    let mut seen = BTreeSet::new();
    for slice in &slices {
        let architecture = slice.architecture();
        if !seen.insert(architecture.clone()) {
            return Err(MergeError::DuplicateArchitecture { architecture });
        }
    }

    let mut filetypes = slices.iter().filter_map(Slice::filetype);
    if let Some(first) = filetypes.next() {
        if let Some(other) = filetypes.find(|filetype| *filetype != first) {
            return Err(MergeError::MismatchedInputs {
                reason: format!("image filetype {other} differs from {first}"),
            });
        }
    }

    let image = write_container(&slices, output)?;
    fs::write(output, image).map_err(|e| MergeError::Container(io_error(output, &e)))
}

/// Remove the named architecture slice from a binary in place
///
/// Remaining slice bytes are carried over verbatim. A binary is never
/// stripped down to an empty container.
pub fn strip(path: &Path, architecture: &Architecture) -> Result<(), StripError> {
    let slices = load_slices(path)?;
    let Some(index) = slices
        .iter()
        .position(|slice| slice.architecture() == *architecture)
    else {
        return Err(StripError::NotPresent {
            architecture: architecture.clone(),
            path: path.to_path_buf(),
        });
    };
    if slices.len() == 1 {
        return Err(StripError::WouldEmptyContainer {
            path: path.to_path_buf(),
        });
    }

    let remaining: Vec<Slice> = slices
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, slice)| slice)
        .collect();
    let image = write_container(&remaining, path)?;
    fs::write(path, image).map_err(|e| StripError::Container(io_error(path, &e)))
}
