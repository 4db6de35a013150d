//! Values that can cross the process boundary

use crate::{Parcel, ParcelError};

/// A value with a defined encode/decode pair
///
/// Implementations write their fields in a fixed order and read them back in
/// the same order. Record types usually delegate field by field:
///
/// ```
/// use ipc::{Parcel, Parcelable, ParcelError};
///
/// #[derive(Debug, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Parcelable for Point {
///     const MIN_ENCODED_LEN: usize = 8;
///
///     fn write_to_parcel(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
///         parcel.write_i32(self.x)?;
///         parcel.write_i32(self.y)
///     }
///
///     fn read_from_parcel(parcel: &mut Parcel) -> Result<Self, ParcelError> {
///         Ok(Self {
///             x: parcel.read_i32()?,
///             y: parcel.read_i32()?,
///         })
///     }
/// }
///
/// let mut parcel = Parcel::new();
/// parcel.write(&Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(parcel.read::<Point>().unwrap(), Point { x: 1, y: 2 });
/// ```
pub trait Parcelable: Sized {
    /// Smallest number of bytes any encoding of this type occupies
    ///
    /// Used to reject list counts that cannot fit in the remaining bytes.
    const MIN_ENCODED_LEN: usize = 1;

    fn write_to_parcel(&self, parcel: &mut Parcel) -> Result<(), ParcelError>;

    fn read_from_parcel(parcel: &mut Parcel) -> Result<Self, ParcelError>;
}

macro_rules! scalar_parcelable {
    ($ty:ty, $len:expr, $write:ident, $read:ident) => {
        impl Parcelable for $ty {
            const MIN_ENCODED_LEN: usize = $len;

            fn write_to_parcel(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
                parcel.$write(*self)
            }

            fn read_from_parcel(parcel: &mut Parcel) -> Result<Self, ParcelError> {
                parcel.$read()
            }
        }
    };
}

scalar_parcelable!(u8, 1, write_u8, read_u8);
scalar_parcelable!(bool, 1, write_bool, read_bool);
scalar_parcelable!(i32, 4, write_i32, read_i32);
scalar_parcelable!(u32, 4, write_u32, read_u32);
scalar_parcelable!(i64, 8, write_i64, read_i64);
scalar_parcelable!(u64, 8, write_u64, read_u64);

impl Parcelable for String {
    const MIN_ENCODED_LEN: usize = 4;

    fn write_to_parcel(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_string(self)
    }

    fn read_from_parcel(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        parcel.read_string()
    }
}

/// Unit encodes to nothing; used for methods without arguments or results
impl Parcelable for () {
    const MIN_ENCODED_LEN: usize = 0;

    fn write_to_parcel(&self, _parcel: &mut Parcel) -> Result<(), ParcelError> {
        Ok(())
    }

    fn read_from_parcel(_parcel: &mut Parcel) -> Result<Self, ParcelError> {
        Ok(())
    }
}

// Argument lists: tuple fields are written in declaration order.
macro_rules! tuple_parcelable {
    ($($name:ident),+) => {
        impl<$($name: Parcelable),+> Parcelable for ($($name,)+) {
            const MIN_ENCODED_LEN: usize = 0 $(+ $name::MIN_ENCODED_LEN)+;

            #[allow(non_snake_case)]
            fn write_to_parcel(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
                let ($($name,)+) = self;
                $($name.write_to_parcel(parcel)?;)+
                Ok(())
            }

            fn read_from_parcel(parcel: &mut Parcel) -> Result<Self, ParcelError> {
                Ok(($($name::read_from_parcel(parcel)?,)+))
            }
        }
    };
}

tuple_parcelable!(A, B);
tuple_parcelable!(A, B, C);
tuple_parcelable!(A, B, C, D);

/// Lists are always present; the count may be zero
impl<T: Parcelable> Parcelable for Vec<T> {
    const MIN_ENCODED_LEN: usize = 4;

    fn write_to_parcel(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_typed_list(self)
    }

    fn read_from_parcel(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        parcel.read_typed_list()
    }
}

/// Nullable values carry a presence flag
impl<T: Parcelable> Parcelable for Option<T> {
    const MIN_ENCODED_LEN: usize = 1;

    fn write_to_parcel(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_nullable(self.as_ref())
    }

    fn read_from_parcel(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        parcel.read_nullable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Record {
        id: i64,
        label: Option<String>,
        tags: Vec<String>,
    }

    impl Parcelable for Record {
        const MIN_ENCODED_LEN: usize = 8 + 1 + 4;

        fn write_to_parcel(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
            parcel.write_i64(self.id)?;
            parcel.write(&self.label)?;
            parcel.write(&self.tags)
        }

        fn read_from_parcel(parcel: &mut Parcel) -> Result<Self, ParcelError> {
            Ok(Self {
                id: parcel.read_i64()?,
                label: parcel.read()?,
                tags: parcel.read()?,
            })
        }
    }

    #[test]
    fn test_argument_list_roundtrip() {
        let records = vec![
            Record {
                id: 1,
                label: None,
                tags: Vec::new(),
            },
            Record {
                id: -7,
                label: Some("seven".to_string()),
                tags: vec!["a".to_string(), "b".to_string()],
            },
        ];
        let missing: Option<Record> = None;

        let mut parcel = Parcel::new();
        parcel.write(&records).unwrap();
        parcel.write(&missing).unwrap();
        parcel.write(&Some(records[1].clone())).unwrap();
        parcel.write(&42u64).unwrap();

        let decoded_records: Vec<Record> = parcel.read().unwrap();
        let decoded_missing: Option<Record> = parcel.read().unwrap();
        let decoded_present: Option<Record> = parcel.read().unwrap();
        let decoded_tail: u64 = parcel.read().unwrap();

        assert_eq!(decoded_records, records);
        assert_eq!(decoded_missing, None);
        assert_eq!(decoded_present, Some(records[1].clone()));
        assert_eq!(decoded_tail, 42);
        assert!(parcel.finish().is_ok());
    }

    #[test]
    fn test_tuple_fields_in_declaration_order() {
        let args = (5i32, Some("x".to_string()), false);
        let mut parcel = Parcel::new();
        parcel.write(&args).unwrap();

        assert_eq!(parcel.as_bytes(), &[5, 0, 0, 0, 1, 1, 0, 0, 0, b'x', 0]);
        assert_eq!(
            parcel.read::<(i32, Option<String>, bool)>().unwrap(),
            args
        );
        assert_eq!(<(i32, Option<String>, bool)>::MIN_ENCODED_LEN, 6);
    }

    #[test]
    fn test_unit_encodes_to_nothing() {
        let mut parcel = Parcel::new();
        parcel.write(&()).unwrap();
        assert_eq!(parcel.data_size(), 0);
        parcel.read::<()>().unwrap();
    }

    #[test]
    fn test_nullable_list_is_distinct_from_empty_list() {
        let mut parcel = Parcel::new();
        parcel.write(&None::<Vec<i32>>).unwrap();
        parcel.write(&Some(Vec::<i32>::new())).unwrap();

        assert_eq!(parcel.as_bytes(), &[0, 1, 0, 0, 0, 0]);
        assert_eq!(parcel.read::<Option<Vec<i32>>>().unwrap(), None);
        let empty: Option<Vec<i32>> = parcel.read().unwrap();
        assert_eq!(empty, Some(Vec::new()));
    }

    #[test]
    fn test_record_list_count_guard_uses_min_len() {
        let mut parcel = Parcel::new();
        parcel.write_u32(2).unwrap();
        parcel.write_raw(&[0; 20]).unwrap();

        let err = parcel.read::<Vec<Record>>().unwrap_err();
        assert_eq!(
            err,
            ParcelError::LengthOverflow {
                count: 2,
                remaining: 20
            }
        );
    }
}
