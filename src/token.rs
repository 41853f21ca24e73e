//! Metadata tokens identifying the methods and types a pipeline operates on.
//!
//! A token is the 32-bit value the .NET runtime uses to address a row in a
//! metadata table: the high byte selects the table, the low 24 bits the row.
//! The transform pipeline keys its functions by their `MethodDef` token and
//! stamps every recorded event with it.

use std::fmt;

/// Table id of the `MethodDef` metadata table.
const TABLE_METHODDEF: u8 = 0x06;

/// A metadata token (`table << 24 | row`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a `MethodDef` token for the given 1-based row.
    #[must_use]
    pub const fn method_def(row: u32) -> Self {
        Token(((TABLE_METHODDEF as u32) << 24) | (row & 0x00FF_FFFF))
    }

    const fn table(self) -> u8 {
        (self.0 >> 24) as u8
    }

    const fn row(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
