use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + Display + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(RequestType {
    Inscriere => "inscriere",
    Trimitere => "trimitere",
});

str_enum!(RequestStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn request_type_round_trips() {
        assert_eq!(RequestType::from_str("inscriere").unwrap(), RequestType::Inscriere);
        assert_eq!(RequestType::Trimitere.as_str(), "trimitere");
    }

    #[test]
    fn request_status_round_trips() {
        for s in ["pending", "approved", "rejected"] {
            assert_eq!(RequestStatus::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn unknown_value_is_invalid_enum() {
        let err = RequestStatus::from_str("reopened").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(RequestStatus::Approved.to_string(), "approved");
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&RequestType::Inscriere).unwrap();
        assert_eq!(json, "\"inscriere\"");
    }
}
