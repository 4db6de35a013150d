use ipc::{Parcel, ParcelError, Parcelable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored book
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Book {
    pub id: i32,
    pub name: String,
}

impl Book {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.name)
    }
}

/// Wire layout: `i32 id`, then `String name`
impl Parcelable for Book {
    const MIN_ENCODED_LEN: usize = 4 + 4;

    fn write_to_parcel(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_i32(self.id)?;
        parcel.write_string(&self.name)
    }

    fn read_from_parcel(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        Ok(Self {
            id: parcel.read_i32()?,
            name: parcel.read_string()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order() {
        let mut parcel = Parcel::new();
        parcel.write(&Book::new(2, "Go")).unwrap();
        assert_eq!(parcel.as_bytes(), &[2, 0, 0, 0, 2, 0, 0, 0, b'G', b'o']);
        assert_eq!(parcel.read::<Book>().unwrap(), Book::new(2, "Go"));
    }

    #[test]
    fn test_name_longer_than_parcel() {
        let mut parcel = Parcel::from_bytes(&[2, 0, 0, 0, 5, 0, 0, 0, b'G']);
        assert_eq!(
            parcel.read::<Book>().unwrap_err(),
            ParcelError::LengthOverflow {
                count: 5,
                remaining: 1
            }
        );
    }

    #[test]
    fn test_serde_json() {
        let book = Book::new(7, "Dune");
        let json = serde_json::to_string(&book).unwrap();
        assert_eq!(json, r#"{"id":7,"name":"Dune"}"#);
        assert_eq!(serde_json::from_str::<Book>(&json).unwrap(), book);
    }

    #[test]
    fn test_display() {
        assert_eq!(Book::new(3, "Emma").to_string(), "#3 Emma");
    }
}
