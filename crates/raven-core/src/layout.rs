//! Per-version field positions of the response token.

/// A named field of the response token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Ver,
    Status,
    Msg,
    Issue,
    Ident,
    Url,
    Principal,
    Ptags,
    Auth,
    Sso,
    Life,
    Params,
    Kid,
    Sig,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ver => "ver",
            Self::Status => "status",
            Self::Msg => "msg",
            Self::Issue => "issue",
            Self::Ident => "id",
            Self::Url => "url",
            Self::Principal => "principal",
            Self::Ptags => "ptags",
            Self::Auth => "auth",
            Self::Sso => "sso",
            Self::Life => "life",
            Self::Params => "params",
            Self::Kid => "kid",
            Self::Sig => "sig",
        }
    }
}

/// Field layout, selected once the version is known.
///
/// Version 3 inserts `ptags` between `principal` and `auth`; every later field
/// shifts by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    V1V2,
    V3,
}

impl Layout {
    pub fn for_version(ver: u8) -> Option<Self> {
        match ver {
            1 | 2 => Some(Self::V1V2),
            3 => Some(Self::V3),
            _ => None,
        }
    }

    /// Total number of `!`-separated tokens.
    pub fn field_count(&self) -> usize {
        match self {
            Self::V1V2 => 13,
            Self::V3 => 14,
        }
    }

    /// Number of leading fields covered by the signature (everything but
    /// `kid` and `sig`).
    pub fn signed_count(&self) -> usize {
        self.field_count() - 2
    }

    /// Position of `field`, or `None` when this layout does not carry it.
    pub fn index(&self, field: Field) -> Option<usize> {
        let shared = match field {
            Field::Ver => return Some(0),
            Field::Status => return Some(1),
            Field::Msg => return Some(2),
            Field::Issue => return Some(3),
            Field::Ident => return Some(4),
            Field::Url => return Some(5),
            Field::Principal => return Some(6),
            Field::Ptags => {
                return match self {
                    Self::V1V2 => None,
                    Self::V3 => Some(7),
                }
            }
            Field::Auth => 7,
            Field::Sso => 8,
            Field::Life => 9,
            Field::Params => 10,
            Field::Kid => 11,
            Field::Sig => 12,
        };

        Some(match self {
            Self::V1V2 => shared,
            Self::V3 => shared + 1,
        })
    }
}
