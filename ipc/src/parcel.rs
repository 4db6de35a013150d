//! Binary parcel: the request and reply buffer
//!
//! A parcel is an append-only byte buffer with a read cursor. Writers append
//! fields in declaration order; readers consume them in the same order.
//!
//! ## Wire primitives
//!
//! ```text
//! u8 / presence flag / bool   1 byte
//! i32 / u32                   4 bytes, little-endian
//! i64 / u64                   8 bytes, little-endian
//! string / byte array         u32 length, then bytes
//! list                        u32 count, then elements
//! nullable                    presence flag (0 | 1), then value if 1
//! interface token             u32 major, u32 minor, string descriptor
//! ```

use crate::{ParcelError, Parcelable, SchemaVersion, VersionPolicy, CODEC_VERSION};
use core_types::InterfaceDescriptor;

/// Default upper bound on a parcel's size (1 MiB)
pub const DEFAULT_MAX_PARCEL_SIZE: usize = 1024 * 1024;

const PRESENT: u8 = 1;
const ABSENT: u8 = 0;

/// Ordered byte buffer carrying one request or one reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parcel {
    data: Vec<u8>,
    position: usize,
    max_size: usize,
}

impl Parcel {
    /// Creates an empty parcel
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty parcel with preallocated storage
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            position: 0,
            max_size: DEFAULT_MAX_PARCEL_SIZE,
        }
    }

    /// Creates a parcel positioned at the start of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
            position: 0,
            max_size: DEFAULT_MAX_PARCEL_SIZE.max(bytes.len()),
        }
    }

    /// Sets the size limit enforced on writes
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the size limit enforced on writes
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
    }

    /// Returns the size limit enforced on writes
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the written bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the parcel, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Number of bytes written
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Read cursor
    pub fn data_position(&self) -> usize {
        self.position
    }

    /// Moves the read cursor, clamped to the written size
    pub fn set_data_position(&mut self, position: usize) {
        self.position = position.min(self.data.len());
    }

    /// Bytes left to read
    pub fn data_avail(&self) -> usize {
        self.data.len() - self.position
    }

    /// Allocated storage
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Empties the parcel, keeping its allocation
    pub fn clear(&mut self) {
        self.data.clear();
        self.position = 0;
    }

    /// Replaces the contents with `bytes` and rewinds the cursor
    pub fn set_data(&mut self, bytes: &[u8]) -> Result<(), ParcelError> {
        if bytes.len() > self.max_size {
            return Err(ParcelError::TooLarge {
                size: bytes.len(),
                limit: self.max_size,
            });
        }
        self.data.clear();
        self.data.extend_from_slice(bytes);
        self.position = 0;
        Ok(())
    }

    /// Fails with `TrailingBytes` if anything is left unread
    pub fn finish(&self) -> Result<(), ParcelError> {
        match self.data_avail() {
            0 => Ok(()),
            left => Err(ParcelError::TrailingBytes(left)),
        }
    }

    // ===== Raw access =====

    /// Appends raw bytes without a length prefix
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ParcelError> {
        let size = self.data.len() + bytes.len();
        if size > self.max_size {
            return Err(ParcelError::TooLarge {
                size,
                limit: self.max_size,
            });
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Consumes `len` raw bytes
    pub fn read_raw(&mut self, len: usize) -> Result<&[u8], ParcelError> {
        let remaining = self.data_avail();
        if len > remaining {
            return Err(ParcelError::Truncated {
                needed: len,
                remaining,
            });
        }
        let start = self.position;
        self.position += len;
        Ok(&self.data[start..self.position])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ParcelError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_raw(N)?);
        Ok(out)
    }

    // ===== Fixed-width scalars =====

    pub fn write_u8(&mut self, value: u8) -> Result<(), ParcelError> {
        self.write_raw(&[value])
    }

    pub fn read_u8(&mut self) -> Result<u8, ParcelError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), ParcelError> {
        self.write_u8(value as u8)
    }

    pub fn read_bool(&mut self) -> Result<bool, ParcelError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ParcelError::InvalidBool(other)),
        }
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), ParcelError> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn read_i32(&mut self) -> Result<i32, ParcelError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), ParcelError> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn read_u32(&mut self) -> Result<u32, ParcelError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), ParcelError> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn read_i64(&mut self) -> Result<i64, ParcelError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), ParcelError> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn read_u64(&mut self) -> Result<u64, ParcelError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    // ===== Length-prefixed values =====

    fn write_len(&mut self, len: usize) -> Result<(), ParcelError> {
        let len = u32::try_from(len).map_err(|_| ParcelError::TooLarge {
            size: len,
            limit: u32::MAX as usize,
        })?;
        self.write_u32(len)
    }

    /// Reads a length prefix and checks that `len * min_item` bytes remain
    fn read_len(&mut self, min_item: usize) -> Result<usize, ParcelError> {
        let count = self.read_u32()? as usize;
        let remaining = self.data_avail();
        // Zero-sized items need the size limit as a bound on the count
        if count > self.max_size || count.saturating_mul(min_item) > remaining {
            return Err(ParcelError::LengthOverflow { count, remaining });
        }
        Ok(count)
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), ParcelError> {
        self.write_byte_array(value.as_bytes())
    }

    pub fn read_string(&mut self) -> Result<String, ParcelError> {
        let bytes = self.read_byte_array()?;
        String::from_utf8(bytes).map_err(|_| ParcelError::InvalidUtf8)
    }

    pub fn write_byte_array(&mut self, bytes: &[u8]) -> Result<(), ParcelError> {
        self.write_len(bytes.len())?;
        self.write_raw(bytes)
    }

    pub fn read_byte_array(&mut self) -> Result<Vec<u8>, ParcelError> {
        let len = self.read_len(1)?;
        Ok(self.read_raw(len)?.to_vec())
    }

    // ===== Interface token =====

    /// Writes the request header for `descriptor` at the current codec version
    pub fn write_interface_token(
        &mut self,
        descriptor: InterfaceDescriptor,
    ) -> Result<(), ParcelError> {
        self.write_interface_token_versioned(descriptor.as_str(), CODEC_VERSION)
    }

    /// Writes a request header with an explicit version and descriptor text
    pub fn write_interface_token_versioned(
        &mut self,
        descriptor: &str,
        version: SchemaVersion,
    ) -> Result<(), ParcelError> {
        self.write_u32(version.major)?;
        self.write_u32(version.minor)?;
        self.write_string(descriptor)
    }

    /// Reads a request header without validating it
    pub fn read_interface_token(&mut self) -> Result<(SchemaVersion, String), ParcelError> {
        let major = self.read_u32()?;
        let minor = self.read_u32()?;
        let descriptor = self.read_string()?;
        Ok((SchemaVersion::new(major, minor), descriptor))
    }

    /// Reads a request header and checks it against `descriptor` and `policy`
    pub fn enforce_interface(
        &mut self,
        descriptor: InterfaceDescriptor,
        policy: &VersionPolicy,
    ) -> Result<SchemaVersion, ParcelError> {
        let (version, received) = self.read_interface_token()?;
        if !descriptor.matches(&received) {
            return Err(ParcelError::DescriptorMismatch {
                expected: descriptor.as_str().to_string(),
                received,
            });
        }
        policy.require(version)?;
        Ok(version)
    }

    // ===== Typed values =====

    pub fn write<T: Parcelable>(&mut self, value: &T) -> Result<(), ParcelError> {
        value.write_to_parcel(self)
    }

    pub fn read<T: Parcelable>(&mut self) -> Result<T, ParcelError> {
        T::read_from_parcel(self)
    }

    pub fn write_presence(&mut self, present: bool) -> Result<(), ParcelError> {
        self.write_u8(if present { PRESENT } else { ABSENT })
    }

    pub fn read_presence(&mut self) -> Result<bool, ParcelError> {
        match self.read_u8()? {
            ABSENT => Ok(false),
            PRESENT => Ok(true),
            other => Err(ParcelError::InvalidPresenceFlag(other)),
        }
    }

    /// Writes a presence flag, then the value if there is one
    pub fn write_nullable<T: Parcelable>(&mut self, value: Option<&T>) -> Result<(), ParcelError> {
        match value {
            Some(value) => {
                self.write_presence(true)?;
                value.write_to_parcel(self)
            }
            None => self.write_presence(false),
        }
    }

    /// Reads a presence flag; decodes a value only when it is set
    pub fn read_nullable<T: Parcelable>(&mut self) -> Result<Option<T>, ParcelError> {
        if self.read_presence()? {
            T::read_from_parcel(self).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Writes an element count, then each element in order
    pub fn write_typed_list<T: Parcelable>(&mut self, items: &[T]) -> Result<(), ParcelError> {
        self.write_len(items.len())?;
        for item in items {
            item.write_to_parcel(self)?;
        }
        Ok(())
    }

    /// Reads an element count, then that many elements
    pub fn read_typed_list<T: Parcelable>(&mut self) -> Result<Vec<T>, ParcelError> {
        let count = self.read_len(T::MIN_ENCODED_LEN)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::read_from_parcel(self)?);
        }
        Ok(items)
    }
}

impl Default for Parcel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: InterfaceDescriptor = InterfaceDescriptor::new("test.IParcel");

    #[test]
    fn test_scalars_are_little_endian() {
        let mut parcel = Parcel::new();
        parcel.write_i32(-2).unwrap();
        parcel.write_u32(0x0102_0304).unwrap();
        parcel.write_bool(true).unwrap();

        assert_eq!(
            parcel.as_bytes(),
            &[0xfe, 0xff, 0xff, 0xff, 0x04, 0x03, 0x02, 0x01, 0x01]
        );

        assert_eq!(parcel.read_i32().unwrap(), -2);
        assert_eq!(parcel.read_u32().unwrap(), 0x0102_0304);
        assert!(parcel.read_bool().unwrap());
        assert!(parcel.finish().is_ok());
    }

    #[test]
    fn test_string_layout() {
        let mut parcel = Parcel::new();
        parcel.write_string("hé").unwrap();
        assert_eq!(parcel.as_bytes(), &[3, 0, 0, 0, b'h', 0xc3, 0xa9]);
        assert_eq!(parcel.read_string().unwrap(), "hé");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut parcel = Parcel::from_bytes(&[2, 0, 0, 0, 0xff, 0xfe]);
        assert_eq!(parcel.read_string(), Err(ParcelError::InvalidUtf8));
    }

    #[test]
    fn test_truncated_read() {
        let mut parcel = Parcel::from_bytes(&[1, 2]);
        assert_eq!(
            parcel.read_i32(),
            Err(ParcelError::Truncated {
                needed: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let mut parcel = Parcel::from_bytes(&[7]);
        assert_eq!(parcel.read_bool(), Err(ParcelError::InvalidBool(7)));
    }

    #[test]
    fn test_absent_value_is_a_single_byte() {
        let mut parcel = Parcel::new();
        parcel.write_nullable::<String>(None).unwrap();
        assert_eq!(parcel.as_bytes(), &[0]);

        let decoded: Option<String> = parcel.read_nullable().unwrap();
        assert_eq!(decoded, None);
        assert_eq!(parcel.data_avail(), 0);
    }

    #[test]
    fn test_absent_flag_does_not_consume_following_fields() {
        let mut parcel = Parcel::new();
        parcel.write_nullable::<i32>(None).unwrap();
        parcel.write_i32(99).unwrap();

        assert_eq!(parcel.read_nullable::<i32>().unwrap(), None);
        assert_eq!(parcel.read_i32().unwrap(), 99);
    }

    #[test]
    fn test_present_value_follows_flag() {
        let mut parcel = Parcel::new();
        parcel.write_nullable(Some(&7i32)).unwrap();
        assert_eq!(parcel.as_bytes(), &[1, 7, 0, 0, 0]);
        assert_eq!(parcel.read_nullable::<i32>().unwrap(), Some(7));
    }

    #[test]
    fn test_bad_presence_flag_rejected() {
        let mut parcel = Parcel::from_bytes(&[2, 0, 0, 0, 0]);
        assert_eq!(
            parcel.read_nullable::<i32>(),
            Err(ParcelError::InvalidPresenceFlag(2))
        );
    }

    #[test]
    fn test_typed_list_preserves_order() {
        let values = vec![3i32, 1, 2];
        let mut parcel = Parcel::new();
        parcel.write_typed_list(&values).unwrap();
        assert_eq!(parcel.data_size(), 4 + 3 * 4);
        assert_eq!(parcel.read_typed_list::<i32>().unwrap(), values);
    }

    #[test]
    fn test_empty_list_is_count_only() {
        let mut parcel = Parcel::new();
        parcel.write_typed_list::<String>(&[]).unwrap();
        assert_eq!(parcel.as_bytes(), &[0, 0, 0, 0]);
        assert!(parcel.read_typed_list::<String>().unwrap().is_empty());
    }

    #[test]
    fn test_oversized_list_count_rejected_before_allocation() {
        let mut parcel = Parcel::new();
        parcel.write_u32(u32::MAX).unwrap();
        parcel.write_i32(1).unwrap();

        assert_eq!(
            parcel.read_typed_list::<i32>(),
            Err(ParcelError::LengthOverflow {
                count: u32::MAX as usize,
                remaining: 4
            })
        );
    }

    #[test]
    fn test_zero_sized_list_count_bounded_by_max_size() {
        let mut parcel = Parcel::new().with_max_size(64);
        parcel.write_u32(u32::MAX).unwrap();

        assert_eq!(
            parcel.read_typed_list::<()>(),
            Err(ParcelError::LengthOverflow {
                count: u32::MAX as usize,
                remaining: 0
            })
        );

        let mut parcel = Parcel::new().with_max_size(64);
        parcel.write_u32(3).unwrap();
        assert_eq!(parcel.read_typed_list::<()>().unwrap(), vec![(), (), ()]);
    }

    #[test]
    fn test_interface_token_roundtrip() {
        let mut parcel = Parcel::new();
        parcel.write_interface_token(DESCRIPTOR).unwrap();

        let version = parcel
            .enforce_interface(DESCRIPTOR, &VersionPolicy::codec())
            .unwrap();
        assert_eq!(version, CODEC_VERSION);
        assert!(parcel.finish().is_ok());
    }

    #[test]
    fn test_interface_token_mismatch() {
        let mut parcel = Parcel::new();
        parcel
            .write_interface_token(InterfaceDescriptor::new("test.IOther"))
            .unwrap();

        let err = parcel
            .enforce_interface(DESCRIPTOR, &VersionPolicy::codec())
            .unwrap_err();
        assert_eq!(
            err,
            ParcelError::DescriptorMismatch {
                expected: "test.IParcel".to_string(),
                received: "test.IOther".to_string(),
            }
        );
    }

    #[test]
    fn test_interface_token_version_mismatch() {
        let mut parcel = Parcel::new();
        parcel
            .write_interface_token_versioned(DESCRIPTOR.as_str(), SchemaVersion::new(9, 0))
            .unwrap();

        let err = parcel
            .enforce_interface(DESCRIPTOR, &VersionPolicy::codec())
            .unwrap_err();
        assert!(matches!(err, ParcelError::IncompatibleVersion { .. }));
    }

    #[test]
    fn test_trailing_bytes_detected() {
        let mut parcel = Parcel::new();
        parcel.write_i32(1).unwrap();
        parcel.write_u8(0).unwrap();
        parcel.read_i32().unwrap();
        assert_eq!(parcel.finish(), Err(ParcelError::TrailingBytes(1)));
    }

    #[test]
    fn test_max_size_enforced() {
        let mut parcel = Parcel::new().with_max_size(6);
        parcel.write_i32(1).unwrap();
        assert_eq!(
            parcel.write_i32(2),
            Err(ParcelError::TooLarge { size: 8, limit: 6 })
        );
        assert_eq!(parcel.data_size(), 4);

        assert!(parcel.set_data(&[0; 7]).is_err());
    }

    #[test]
    fn test_clear_and_reposition() {
        let mut parcel = Parcel::new();
        parcel.write_i32(5).unwrap();
        parcel.read_i32().unwrap();
        parcel.set_data_position(0);
        assert_eq!(parcel.read_i32().unwrap(), 5);

        parcel.set_data_position(100);
        assert_eq!(parcel.data_position(), 4);

        parcel.clear();
        assert_eq!(parcel.data_size(), 0);
        assert_eq!(parcel.data_position(), 0);
    }
}
