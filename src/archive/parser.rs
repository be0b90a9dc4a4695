//! Low-level zip container parsing.
//!
//! Zip archives are read from the end: locate the End of Central Directory
//! (searching past an optional comment), follow it to the central
//! directory, and resolve each entry's data through its Local File Header.

use std::{
    fs::File,
    io::{Cursor, Read, Seek, SeekFrom},
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{ZipreelError, ZipreelResult};

use super::structures::*;

/// The format caps the archive comment at 65535 bytes, which bounds the
/// EOCD search window.
const MAX_COMMENT_SIZE: u64 = 65535;

pub struct ZipParser {
    file: File,
    size: u64,
}

impl ZipParser {
    pub fn open(path: &Path) -> ZipreelResult<Self> {
        if !path.exists() {
            return Err(ZipreelError::NotFound(path.to_path_buf()));
        }
        let file = File::open(path)
            .map_err(|e| ZipreelError::corrupt(format!("cannot open '{}': {e}", path.display())))?;
        let size = file
            .metadata()
            .map_err(|e| ZipreelError::corrupt(format!("cannot stat '{}': {e}", path.display())))?
            .len();
        Ok(Self { file, size })
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> ZipreelResult<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(buf))
            .map_err(|_| ZipreelError::corrupt("truncated archive"))
    }

    /// Locate and parse the End of Central Directory record.
    fn find_eocd(&mut self) -> ZipreelResult<(EndOfCentralDirectory, u64)> {
        // Common case first: no archive comment, EOCD sits at the very end.
        if self.size >= EndOfCentralDirectory::SIZE as u64 {
            let offset = self.size - EndOfCentralDirectory::SIZE as u64;
            let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
            self.read_at(offset, &mut buf)?;

            if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
                return Ok((EndOfCentralDirectory::from_bytes(&buf)?, offset));
            }
        }

        // A comment pushes the EOCD away from the end; scan backwards over
        // the maximum comment window for the signature.
        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.read_at(search_start, &mut buf)?;

        for i in (0..buf.len().saturating_sub(EndOfCentralDirectory::SIZE)).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(ZipreelError::corrupt("no end of central directory found"))
    }

    fn read_zip64_eocd(&mut self, eocd_offset: u64) -> ZipreelResult<Zip64Eocd> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64EocdLocator::SIZE as u64)
            .ok_or_else(|| ZipreelError::corrupt("zip64 locator out of bounds"))?;
        let mut locator_buf = vec![0u8; Zip64EocdLocator::SIZE];
        self.read_at(locator_offset, &mut locator_buf)?;
        let locator = Zip64EocdLocator::from_bytes(&locator_buf)?;

        let mut eocd64_buf = vec![0u8; Zip64Eocd::MIN_SIZE];
        self.read_at(locator.eocd64_offset, &mut eocd64_buf)?;
        Zip64Eocd::from_bytes(&eocd64_buf)
    }

    /// Parse the central directory into entry records.
    pub fn entries(&mut self) -> ZipreelResult<Vec<ZipEntryRecord>> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        let mut cd_data = vec![0u8; cd_size as usize];
        self.read_at(cd_offset, &mut cd_data)?;

        let mut entries = Vec::with_capacity(total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());
        for _ in 0..total_entries {
            entries.push(parse_cdfh(&mut cursor)?);
        }
        Ok(entries)
    }

    /// Resolve where an entry's compressed data begins, via its Local File
    /// Header (whose variable-length fields may differ from the central
    /// directory's).
    fn data_offset(&mut self, entry: &ZipEntryRecord) -> ZipreelResult<u64> {
        let mut lfh_buf = vec![0u8; LFH_SIZE];
        self.read_at(entry.lfh_offset, &mut lfh_buf)?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(ZipreelError::corrupt(format!(
                "invalid local file header for '{}'",
                entry.file_name
            )));
        }

        let file_name_length = u16::from_le_bytes([lfh_buf[26], lfh_buf[27]]) as u64;
        let extra_field_length = u16::from_le_bytes([lfh_buf[28], lfh_buf[29]]) as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    /// Read and decompress one entry, verifying its CRC32.
    pub fn read_entry_bytes(&mut self, entry: &ZipEntryRecord) -> ZipreelResult<Vec<u8>> {
        let offset = self.data_offset(entry)?;
        let mut compressed = vec![0u8; entry.compressed_size as usize];
        self.read_at(offset, &mut compressed)?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => compressed,
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                flate2::read::DeflateDecoder::new(compressed.as_slice())
                    .read_to_end(&mut out)
                    .map_err(|e| {
                        ZipreelError::corrupt(format!(
                            "failed to inflate '{}': {e}",
                            entry.file_name
                        ))
                    })?;
                out
            }
            CompressionMethod::Unknown(method) => {
                return Err(ZipreelError::corrupt(format!(
                    "unsupported compression method {method} for '{}'",
                    entry.file_name
                )));
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            return Err(ZipreelError::corrupt(format!(
                "entry '{}' decompressed to {} bytes, expected {}",
                entry.file_name,
                data.len(),
                entry.uncompressed_size
            )));
        }

        let mut crc = flate2::Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            return Err(ZipreelError::corrupt(format!(
                "crc mismatch for '{}'",
                entry.file_name
            )));
        }

        Ok(data)
    }
}

fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> ZipreelResult<ZipEntryRecord> {
    let mut sig = [0u8; 4];
    cursor
        .read_exact(&mut sig)
        .map_err(|_| ZipreelError::corrupt("truncated central directory"))?;
    if sig != CDFH_SIGNATURE {
        return Err(ZipreelError::corrupt("invalid central directory file header"));
    }

    let read_err = |_| ZipreelError::corrupt("truncated central directory");

    let _version_made_by = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
    let _version_needed = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
    let _flags = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
    let compression_method = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
    let last_mod_time = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
    let last_mod_date = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
    let crc32 = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>().map_err(read_err)? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>().map_err(read_err)? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
    let extra_field_length = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
    let file_comment_length = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
    let _external_attrs = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>().map_err(read_err)? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor
        .read_exact(&mut file_name_bytes)
        .map_err(|_| ZipreelError::corrupt("truncated central directory"))?;
    // Lossy conversion keeps non-UTF8 names listable instead of fatal.
    let file_name = String::from_utf8_lossy(&file_name_bytes).to_string();
    let is_directory = file_name.ends_with('/');

    // ZIP64 extended information lives in extra field id 0x0001; each
    // 64-bit value is present only when its 32-bit field is saturated.
    let extra_field_end = cursor.position() + extra_field_length as u64;
    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
        let field_size = cursor.read_u16::<LittleEndian>().map_err(read_err)?;

        if header_id == 0x0001 {
            if uncompressed_size == 0xFFFF_FFFF && cursor.position() + 8 <= extra_field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>().map_err(read_err)?;
            }
            if compressed_size == 0xFFFF_FFFF && cursor.position() + 8 <= extra_field_end {
                compressed_size = cursor.read_u64::<LittleEndian>().map_err(read_err)?;
            }
            if lfh_offset == 0xFFFF_FFFF && cursor.position() + 8 <= extra_field_end {
                lfh_offset = cursor.read_u64::<LittleEndian>().map_err(read_err)?;
            }
            break;
        }
        cursor.set_position(cursor.position() + field_size as u64);
    }
    cursor.set_position(extra_field_end);

    cursor.set_position(cursor.position() + file_comment_length as u64);

    Ok(ZipEntryRecord {
        file_name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
        last_mod_time,
        last_mod_date,
        is_directory,
    })
}
