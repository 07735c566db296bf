//! Capability flags exchanged in the handshake.
//!
//! Reference: <https://dev.mysql.com/doc/dev/mysql-server/latest/group__group__cs__capabilities__flags.html>

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// 32-bit capability bitmask
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilityFlags(u32);

impl CapabilityFlags {
    /// New more secure passwords
    pub const LONG_PASSWORD: Self = Self(1 << 0);
    /// Found instead of affected rows
    pub const FOUND_ROWS: Self = Self(1 << 1);
    /// Get all column flags
    pub const LONG_FLAG: Self = Self(1 << 2);
    /// Database can be specified on connect
    pub const CONNECT_WITH_DB: Self = Self(1 << 3);
    /// Don't allow database.table.column
    pub const NO_SCHEMA: Self = Self(1 << 4);
    /// Compression protocol
    pub const COMPRESS: Self = Self(1 << 5);
    pub const ODBC: Self = Self(1 << 6);
    /// LOAD DATA LOCAL
    pub const LOCAL_FILES: Self = Self(1 << 7);
    /// Ignore spaces before '('
    pub const IGNORE_SPACE: Self = Self(1 << 8);
    /// 4.1 protocol
    pub const PROTOCOL_41: Self = Self(1 << 9);
    pub const INTERACTIVE: Self = Self(1 << 10);
    /// Switch to SSL after the capability exchange
    pub const SSL: Self = Self(1 << 11);
    pub const IGNORE_SIGPIPE: Self = Self(1 << 12);
    pub const TRANSACTIONS: Self = Self(1 << 13);
    pub const RESERVED: Self = Self(1 << 14);
    /// 4.1 authentication (1-byte length-prefixed auth response)
    pub const SECURE_CONNECTION: Self = Self(1 << 15);
    pub const MULTI_STATEMENTS: Self = Self(1 << 16);
    pub const MULTI_RESULTS: Self = Self(1 << 17);
    pub const PS_MULTI_RESULTS: Self = Self(1 << 18);
    /// Authentication plugin names in handshake and response
    pub const PLUGIN_AUTH: Self = Self(1 << 19);
    pub const CONNECT_ATTRS: Self = Self(1 << 20);
    /// Length-encoded auth response
    pub const PLUGIN_AUTH_LENENC_CLIENT_DATA: Self = Self(1 << 21);
    pub const CAN_HANDLE_EXPIRED_PASSWORDS: Self = Self(1 << 22);
    pub const SESSION_TRACK: Self = Self(1 << 23);
    pub const DEPRECATE_EOF: Self = Self(1 << 24);
    pub const OPTIONAL_RESULTSET_METADATA: Self = Self(1 << 25);
    pub const ZSTD_COMPRESSION_ALGORITHM: Self = Self(1 << 26);
    pub const QUERY_ATTRIBUTES: Self = Self(1 << 27);
    pub const MULTI_FACTOR_AUTHENTICATION: Self = Self(1 << 28);
    pub const CAPABILITY_EXTENSION: Self = Self(1 << 29);
    pub const SSL_VERIFY_SERVER_CERT: Self = Self(1 << 30);
    pub const REMEMBER_OPTIONS: Self = Self(1 << 31);

    /// Every named flag, in bit order
    pub const ALL: [(&'static str, Self); 32] = [
        ("LONG_PASSWORD", Self::LONG_PASSWORD),
        ("FOUND_ROWS", Self::FOUND_ROWS),
        ("LONG_FLAG", Self::LONG_FLAG),
        ("CONNECT_WITH_DB", Self::CONNECT_WITH_DB),
        ("NO_SCHEMA", Self::NO_SCHEMA),
        ("COMPRESS", Self::COMPRESS),
        ("ODBC", Self::ODBC),
        ("LOCAL_FILES", Self::LOCAL_FILES),
        ("IGNORE_SPACE", Self::IGNORE_SPACE),
        ("PROTOCOL_41", Self::PROTOCOL_41),
        ("INTERACTIVE", Self::INTERACTIVE),
        ("SSL", Self::SSL),
        ("IGNORE_SIGPIPE", Self::IGNORE_SIGPIPE),
        ("TRANSACTIONS", Self::TRANSACTIONS),
        ("RESERVED", Self::RESERVED),
        ("SECURE_CONNECTION", Self::SECURE_CONNECTION),
        ("MULTI_STATEMENTS", Self::MULTI_STATEMENTS),
        ("MULTI_RESULTS", Self::MULTI_RESULTS),
        ("PS_MULTI_RESULTS", Self::PS_MULTI_RESULTS),
        ("PLUGIN_AUTH", Self::PLUGIN_AUTH),
        ("CONNECT_ATTRS", Self::CONNECT_ATTRS),
        (
            "PLUGIN_AUTH_LENENC_CLIENT_DATA",
            Self::PLUGIN_AUTH_LENENC_CLIENT_DATA,
        ),
        (
            "CAN_HANDLE_EXPIRED_PASSWORDS",
            Self::CAN_HANDLE_EXPIRED_PASSWORDS,
        ),
        ("SESSION_TRACK", Self::SESSION_TRACK),
        ("DEPRECATE_EOF", Self::DEPRECATE_EOF),
        (
            "OPTIONAL_RESULTSET_METADATA",
            Self::OPTIONAL_RESULTSET_METADATA,
        ),
        ("ZSTD_COMPRESSION_ALGORITHM", Self::ZSTD_COMPRESSION_ALGORITHM),
        ("QUERY_ATTRIBUTES", Self::QUERY_ATTRIBUTES),
        (
            "MULTI_FACTOR_AUTHENTICATION",
            Self::MULTI_FACTOR_AUTHENTICATION,
        ),
        ("CAPABILITY_EXTENSION", Self::CAPABILITY_EXTENSION),
        ("SSL_VERIFY_SERVER_CERT", Self::SSL_VERIFY_SERVER_CERT),
        ("REMEMBER_OPTIONS", Self::REMEMBER_OPTIONS),
    ];

    /// Flags this client always asks for, before intersecting with the server's.
    pub const DEFAULT_CLIENT: Self = Self(
        Self::LONG_PASSWORD.0
            | Self::LONG_FLAG.0
            | Self::PROTOCOL_41.0
            | Self::TRANSACTIONS.0
            | Self::SECURE_CONNECTION.0
            | Self::MULTI_RESULTS.0
            | Self::PLUGIN_AUTH.0
            | Self::PLUGIN_AUTH_LENENC_CLIENT_DATA.0,
    );

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Combine the two 16-bit halves the server sends at separate offsets
    pub const fn from_halves(low: u16, high: u16) -> Self {
        Self(low as u32 | (high as u32) << 16)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn low(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub const fn high(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// All bits of `other` are set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: Self, enabled: bool) {
        if enabled {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Names of the set flags, lowest bit first
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::ALL
            .into_iter()
            .filter(move |(_, flag)| self.contains(*flag))
            .map(|(name, _)| name)
    }
}

impl BitOr for CapabilityFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CapabilityFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for CapabilityFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for CapabilityFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for CapabilityFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilityFlags(0x{:08X}", self.0)?;
        let mut names = self.names().peekable();
        if names.peek().is_some() {
            f.write_str(": ")?;
            for (i, name) in names.enumerate() {
                if i > 0 {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
            }
        }
        f.write_str(")")
    }
}

impl fmt::LowerHex for CapabilityFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
