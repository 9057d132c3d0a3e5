//! USTAR header block codec.
//!
//! Header layout (512 bytes, numeric fields are NUL-terminated ASCII octal):
//! - name:     100 bytes (offset 0)
//! - mode:       8 bytes (offset 100)
//! - uid:        8 bytes (offset 108)
//! - gid:        8 bytes (offset 116)
//! - size:      12 bytes (offset 124)
//! - mtime:     12 bytes (offset 136)
//! - chksum:     8 bytes (offset 148)
//! - typeflag:   1 byte  (offset 156)
//! - linkname: 100 bytes (offset 157, unused)
//! - magic:      6 bytes (offset 257) "ustar\0"
//! - version:    2 bytes (offset 263) "00"
//! - uname:     32 bytes (offset 265)
//! - gname:     32 bytes (offset 297)
//! - devmajor:   8 bytes (offset 329)
//! - devminor:   8 bytes (offset 337)
//! - prefix:   155 bytes (offset 345, unused)

use std::fmt;
use std::fs::{self, Metadata};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use crate::core::identity::IdentityResolver;
use crate::error::{IdentityKind, TarError, TarResult};
use crate::formats::ustar::constants::*;

/// Metadata carried by one header, independent of its on-disk encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFields {
    pub name: PathBuf,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub mtime: u64,
    pub uname: String,
    pub gname: String,
    pub devmajor: u32,
    pub devminor: u32,
}

impl HeaderFields {
    /// Collects header metadata for `path` from an already obtained `stat`.
    pub fn from_metadata(
        path: &Path,
        meta: &Metadata,
        resolver: &dyn IdentityResolver,
    ) -> TarResult<Self> {
        let uid = meta.uid();
        let gid = meta.gid();

        let uname = resolver
            .user_name(uid)
            .ok_or_else(|| TarError::IdentityUnresolved {
                path: path.to_path_buf(),
                kind: IdentityKind::Owner,
                id: uid,
            })?;
        let gname = resolver
            .group_name(gid)
            .ok_or_else(|| TarError::IdentityUnresolved {
                path: path.to_path_buf(),
                kind: IdentityKind::Group,
                id: gid,
            })?;

        let (devmajor, devminor) = device_numbers(meta.dev());

        Ok(Self {
            name: path.to_path_buf(),
            mode: meta.mode() & 0o7777,
            uid,
            gid,
            size: meta.len(),
            // Pre-epoch timestamps are stored as 0.
            mtime: u64::try_from(meta.mtime()).unwrap_or(0),
            uname,
            gname,
            devmajor,
            devminor,
        })
    }
}

// dev_t and the major/minor return types vary by platform.
#[allow(clippy::unnecessary_cast)]
fn device_numbers(dev: u64) -> (u32, u32) {
    let dev = dev as libc::dev_t;
    (libc::major(dev) as u32, libc::minor(dev) as u32)
}

/// One 512-byte header block exactly as it appears in the archive.
#[derive(Clone, PartialEq, Eq)]
pub struct HeaderBlock {
    bytes: [u8; BLOCK_SIZE],
}

impl HeaderBlock {
    /// Builds the header for the regular file at `path` from its live metadata.
    pub fn encode(path: &Path, resolver: &dyn IdentityResolver) -> TarResult<Self> {
        let meta = fs::metadata(path).map_err(|source| TarError::MetadataUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        if !meta.is_file() {
            return Err(TarError::NotRegularFile {
                path: path.to_path_buf(),
            });
        }
        let fields = HeaderFields::from_metadata(path, &meta, resolver)?;
        Self::build(&fields)
    }

    /// Serializes `fields` into a regular-file header with a valid checksum.
    pub fn build(fields: &HeaderFields) -> TarResult<Self> {
        let mut bytes = [0u8; BLOCK_SIZE];

        let name = fields.name.as_os_str().as_bytes();
        if name.len() > NAME.1 {
            return Err(TarError::NameTooLong {
                path: fields.name.clone(),
                limit: NAME.1,
            });
        }
        put_bytes(&mut bytes, NAME, name);

        put_octal(&mut bytes, MODE, "mode", u64::from(fields.mode))?;
        put_octal(&mut bytes, UID, "uid", u64::from(fields.uid))?;
        put_octal(&mut bytes, GID, "gid", u64::from(fields.gid))?;
        put_octal(&mut bytes, SIZE, "size", fields.size)?;
        put_octal(&mut bytes, MTIME, "mtime", fields.mtime)?;
        bytes[TYPEFLAG] = REGTYPE;
        put_bytes(&mut bytes, MAGIC_FIELD, MAGIC);
        put_bytes(&mut bytes, VERSION_FIELD, VERSION);
        // Names longer than the field are cut; they are informational only.
        put_bytes(&mut bytes, UNAME, fields.uname.as_bytes());
        put_bytes(&mut bytes, GNAME, fields.gname.as_bytes());
        put_octal(&mut bytes, DEVMAJOR, "devmajor", u64::from(fields.devmajor))?;
        put_octal(&mut bytes, DEVMINOR, "devminor", u64::from(fields.devminor))?;

        let checksum = compute_checksum(&bytes);
        put_octal(&mut bytes, CHKSUM, "chksum", u64::from(checksum))?;

        Ok(Self { bytes })
    }

    /// Reinterprets a raw block as a header. The checksum is not checked;
    /// see [`HeaderBlock::validate`].
    pub fn decode(bytes: &[u8; BLOCK_SIZE]) -> Self {
        Self { bytes: *bytes }
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.bytes
    }

    /// Raw name bytes, up to the first NUL or the end of the field.
    pub fn name_bytes(&self) -> &[u8] {
        terminated(field(&self.bytes, NAME))
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(std::ffi::OsStr::from_bytes(self.name_bytes()))
    }

    pub fn mode(&self) -> TarResult<u32> {
        parse_octal_u32(field(&self.bytes, MODE), "mode")
    }

    pub fn uid(&self) -> TarResult<u32> {
        parse_octal_u32(field(&self.bytes, UID), "uid")
    }

    pub fn gid(&self) -> TarResult<u32> {
        parse_octal_u32(field(&self.bytes, GID), "gid")
    }

    /// Declared size of the entry's content in bytes.
    pub fn size(&self) -> TarResult<u64> {
        parse_octal(field(&self.bytes, SIZE), "size")
    }

    pub fn mtime(&self) -> TarResult<u64> {
        parse_octal(field(&self.bytes, MTIME), "mtime")
    }

    pub fn entry_type(&self) -> u8 {
        self.bytes[TYPEFLAG]
    }

    pub fn is_ustar(&self) -> bool {
        field(&self.bytes, MAGIC_FIELD) == MAGIC && field(&self.bytes, VERSION_FIELD) == VERSION
    }

    pub fn uname(&self) -> String {
        String::from_utf8_lossy(terminated(field(&self.bytes, UNAME))).into_owned()
    }

    pub fn gname(&self) -> String {
        String::from_utf8_lossy(terminated(field(&self.bytes, GNAME))).into_owned()
    }

    pub fn devmajor(&self) -> TarResult<u32> {
        parse_octal_u32(field(&self.bytes, DEVMAJOR), "devmajor")
    }

    pub fn devminor(&self) -> TarResult<u32> {
        parse_octal_u32(field(&self.bytes, DEVMINOR), "devminor")
    }

    pub fn stored_checksum(&self) -> TarResult<u32> {
        parse_octal_u32(field(&self.bytes, CHKSUM), "chksum")
    }

    pub fn computed_checksum(&self) -> u32 {
        compute_checksum(&self.bytes)
    }

    /// True when the stored checksum matches the block's contents.
    pub fn validate(&self) -> bool {
        validate(&self.bytes)
    }

    /// Decodes every numeric and string field.
    pub fn fields(&self) -> TarResult<HeaderFields> {
        Ok(HeaderFields {
            name: self.path(),
            mode: self.mode()?,
            uid: self.uid()?,
            gid: self.gid()?,
            size: self.size()?,
            mtime: self.mtime()?,
            uname: self.uname(),
            gname: self.gname(),
            devmajor: self.devmajor()?,
            devminor: self.devminor()?,
        })
    }
}

impl fmt::Debug for HeaderBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderBlock")
            .field("name", &self.path())
            .field("size", &self.size().ok())
            .field("typeflag", &(self.entry_type() as char))
            .finish()
    }
}

/// Unsigned byte sum of `block` with the checksum field counted as eight spaces.
pub fn compute_checksum(block: &[u8; BLOCK_SIZE]) -> u32 {
    let (off, len) = CHKSUM;
    block[..off]
        .iter()
        .chain(std::iter::repeat(&b' ').take(len))
        .chain(block[off + len..].iter())
        .map(|&b| u32::from(b))
        .sum()
}

/// Recomputes the checksum of `block` and compares it to the stored value.
pub fn validate(block: &[u8; BLOCK_SIZE]) -> bool {
    match parse_octal(field(block, CHKSUM), "chksum") {
        Ok(stored) => stored == u64::from(compute_checksum(block)),
        Err(_) => false,
    }
}

fn field(block: &[u8; BLOCK_SIZE], (off, len): (usize, usize)) -> &[u8] {
    &block[off..off + len]
}

fn terminated(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

fn put_bytes(block: &mut [u8; BLOCK_SIZE], (off, len): (usize, usize), value: &[u8]) {
    let n = value.len().min(len);
    block[off..off + n].copy_from_slice(&value[..n]);
}

/// Writes `value` as zero-padded octal filling all but the last byte of the
/// field, followed by a NUL.
fn put_octal(
    block: &mut [u8; BLOCK_SIZE],
    (off, len): (usize, usize),
    name: &'static str,
    value: u64,
) -> TarResult<()> {
    let digits = len - 1;
    if value >> (3 * digits) != 0 {
        return Err(TarError::FieldOverflow { field: name, value });
    }
    let text = format!("{:0width$o}", value, width = digits);
    block[off..off + digits].copy_from_slice(text.as_bytes());
    block[off + digits] = 0;
    Ok(())
}

/// Parses an octal field the way `strtol(field, NULL, 8)` would: leading
/// spaces are skipped and parsing stops at the first NUL or space. An empty
/// field reads as zero.
fn parse_octal(bytes: &[u8], name: &'static str) -> TarResult<u64> {
    let invalid = || TarError::InvalidHeader {
        path: PathBuf::new(),
        field: name,
        value: String::from_utf8_lossy(terminated(bytes)).into_owned(),
    };

    let mut value: u64 = 0;
    for &b in bytes.iter().skip_while(|&&b| b == b' ') {
        match b {
            b'0'..=b'7' => {
                value = value
                    .checked_mul(8)
                    .and_then(|v| v.checked_add(u64::from(b - b'0')))
                    .ok_or_else(invalid)?;
            }
            0 | b' ' => break,
            _ => return Err(invalid()),
        }
    }
    Ok(value)
}

fn parse_octal_u32(bytes: &[u8], name: &'static str) -> TarResult<u32> {
    let value = parse_octal(bytes, name)?;
    u32::try_from(value).map_err(|_| TarError::InvalidHeader {
        path: PathBuf::new(),
        field: name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::FixedIdentity;

    fn sample_fields() -> HeaderFields {
        HeaderFields {
            name: PathBuf::from("notes/hello.txt"),
            mode: 0o644,
            uid: 1000,
            gid: 100,
            size: 10,
            mtime: 1_700_000_000,
            uname: "alice".to_string(),
            gname: "users".to_string(),
            devmajor: 8,
            devminor: 1,
        }
    }

    struct Nobody;

    impl IdentityResolver for Nobody {
        fn user_name(&self, _uid: u32) -> Option<String> {
            None
        }
        fn group_name(&self, _gid: u32) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_field_layout() {
        let block = HeaderBlock::build(&sample_fields()).unwrap();
        let bytes = block.as_bytes();

        assert_eq!(&bytes[0..15], b"notes/hello.txt");
        assert!(bytes[15..100].iter().all(|&b| b == 0));
        assert_eq!(&bytes[100..108], b"0000644\0");
        assert_eq!(&bytes[108..116], b"0001750\0");
        assert_eq!(&bytes[116..124], b"0000144\0");
        assert_eq!(&bytes[124..136], b"00000000012\0");
        assert_eq!(&bytes[136..148], b"14524770400\0");
        assert_eq!(bytes[156], b'0');
        assert!(bytes[157..257].iter().all(|&b| b == 0));
        assert_eq!(&bytes[257..263], b"ustar\0");
        assert_eq!(&bytes[263..265], b"00");
        assert_eq!(&bytes[265..271], b"alice\0");
        assert_eq!(&bytes[297..303], b"users\0");
        assert_eq!(&bytes[329..337], b"0000010\0");
        assert_eq!(&bytes[337..345], b"0000001\0");
        assert!(bytes[345..].iter().all(|&b| b == 0));
        assert!(block.is_ustar());
    }

    #[test]
    fn test_checksum_rendering() {
        let block = HeaderBlock::build(&sample_fields()).unwrap();
        let bytes = block.as_bytes();

        let expected = block.computed_checksum();
        let text = format!("{:07o}\0", expected);
        assert_eq!(&bytes[148..156], text.as_bytes());
        assert_eq!(block.stored_checksum().unwrap(), expected);
        assert!(block.validate());
    }

    #[test]
    fn test_checksum_treats_field_as_spaces() {
        let block = HeaderBlock::build(&sample_fields()).unwrap();
        let mut raw = *block.as_bytes();
        let without_field: u32 = raw[..148]
            .iter()
            .chain(raw[156..].iter())
            .map(|&b| u32::from(b))
            .sum();
        assert_eq!(compute_checksum(&raw), without_field + 8 * u32::from(b' '));

        // The stored digits never feed into the sum.
        raw[148..156].copy_from_slice(b"7777777\0");
        assert_eq!(compute_checksum(&raw), without_field + 8 * u32::from(b' '));
    }

    #[test]
    fn test_validate_detects_corruption() {
        let block = HeaderBlock::build(&sample_fields()).unwrap();
        let mut raw = *block.as_bytes();
        raw[0] = b'N';
        assert!(!validate(&raw));
        assert!(!HeaderBlock::decode(&raw).validate());

        let mut raw = *block.as_bytes();
        raw[148..156].copy_from_slice(b"zzzzzzz\0");
        assert!(!validate(&raw));
    }

    #[test]
    fn test_decode_roundtrip_fields() {
        let fields = sample_fields();
        let block = HeaderBlock::build(&fields).unwrap();
        let decoded = HeaderBlock::decode(block.as_bytes());
        assert_eq!(decoded, block);
        assert_eq!(decoded.fields().unwrap(), fields);
        assert_eq!(decoded.entry_type(), REGTYPE);
    }

    #[test]
    fn test_name_filling_whole_field() {
        let mut fields = sample_fields();
        fields.name = PathBuf::from("n".repeat(100));
        let block = HeaderBlock::build(&fields).unwrap();
        assert_eq!(block.name_bytes().len(), 100);
        assert_eq!(block.path(), fields.name);
        // The next field starts right after, with no terminator in between.
        assert_eq!(block.as_bytes()[100], b'0');
    }

    #[test]
    fn test_name_too_long() {
        let mut fields = sample_fields();
        fields.name = PathBuf::from("n".repeat(101));
        let err = HeaderBlock::build(&fields).unwrap_err();
        assert!(matches!(err, TarError::NameTooLong { limit: 100, .. }));
    }

    #[test]
    fn test_size_overflow() {
        let mut fields = sample_fields();
        fields.size = 0o77777777777;
        assert!(HeaderBlock::build(&fields).is_ok());

        fields.size = 0o77777777777 + 1;
        let err = HeaderBlock::build(&fields).unwrap_err();
        assert!(matches!(err, TarError::FieldOverflow { field: "size", .. }));
    }

    #[test]
    fn test_long_owner_names_are_cut() {
        let mut fields = sample_fields();
        fields.uname = "u".repeat(40);
        let block = HeaderBlock::build(&fields).unwrap();
        assert_eq!(block.uname(), "u".repeat(32));
        assert_eq!(block.gname(), "users");
    }

    #[test]
    fn test_parse_octal_like_strtol() {
        assert_eq!(parse_octal(b"0000644\0", "mode").unwrap(), 0o644);
        assert_eq!(parse_octal(b"   644 \0", "mode").unwrap(), 0o644);
        assert_eq!(parse_octal(b"\0\0\0\0\0\0\0\0", "mode").unwrap(), 0);
        assert_eq!(parse_octal(b"12\0garbage", "size").unwrap(), 0o12);
        assert!(matches!(
            parse_octal(b"0000899\0", "size"),
            Err(TarError::InvalidHeader { field: "size", .. })
        ));
    }

    #[test]
    fn test_encode_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hello.txt");
        fs::write(&path, b"hi\nthere!\n").unwrap();

        let ids = FixedIdentity::new(Some("someone".into()), Some("staff".into()));
        let block = HeaderBlock::encode(&path, &ids).unwrap();
        let meta = fs::metadata(&path).unwrap();

        assert_eq!(block.path(), path);
        assert_eq!(block.size().unwrap(), 10);
        assert_eq!(block.mode().unwrap(), meta.mode() & 0o7777);
        assert_eq!(block.uid().unwrap(), meta.uid());
        assert_eq!(block.gid().unwrap(), meta.gid());
        assert_eq!(block.mtime().unwrap(), meta.mtime() as u64);
        assert_eq!(block.uname(), "someone");
        assert_eq!(block.gname(), "staff");
        assert!(block.validate());
    }

    #[test]
    fn test_encode_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent");
        let err = HeaderBlock::encode(&path, &Nobody).unwrap_err();
        assert!(matches!(err, TarError::MetadataUnavailable { .. }));
    }

    #[test]
    fn test_encode_directory_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = HeaderBlock::encode(dir.path(), &Nobody).unwrap_err();
        assert!(matches!(err, TarError::NotRegularFile { .. }));
    }

    #[test]
    fn test_encode_unresolved_owner() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"x").unwrap();
        let err = HeaderBlock::encode(&path, &Nobody).unwrap_err();
        assert!(matches!(
            err,
            TarError::IdentityUnresolved {
                kind: IdentityKind::Owner,
                ..
            }
        ));
    }

    #[test]
    fn test_encode_unresolved_group() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"x").unwrap();
        let gid = fs::metadata(&path).unwrap().gid();

        let ids = FixedIdentity {
            user: Some("someone".to_string()),
            group: None,
            fallback: Nobody,
        };
        match HeaderBlock::encode(&path, &ids).unwrap_err() {
            TarError::IdentityUnresolved { path: failed, kind, id } => {
                assert_eq!(failed, path);
                assert_eq!(kind, IdentityKind::Group);
                assert_eq!(id, gid);
            }
            other => panic!("expected IdentityUnresolved, got {:?}", other),
        }
    }
}
