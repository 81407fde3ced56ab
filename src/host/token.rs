//! Tokenized handles for registered host classes and their members.

use std::fmt;

/// Member kind encoded in the high byte of a [`Token`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum TokenKind {
    /// A registered host class
    Class = 0x01,
    /// A declared field of a host class
    Field = 0x04,
    /// A declared method or constructor of a host class
    Method = 0x06,
}

/// A token identifying one registered class or declared member of the host image.
///
/// Tokens consist of a 32-bit value where:
/// - The high byte (bits 24-31) carries the [`TokenKind`]
/// - The low 24 bits (bits 0-23) carry the registry-assigned index
///
/// Tokens are assigned once when a class is registered and never change for the
/// lifetime of the process; resolved handles and object slots key off them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a kind and a registry index
    #[must_use]
    pub fn new(kind: TokenKind, index: u32) -> Self {
        Token(((kind as u32) << 24) | (index & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the kind byte from the token
    #[must_use]
    pub fn kind(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Extracts the registry index from the token (low 24 bits)
    #[must_use]
    pub fn index(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// `true` if this token identifies a class
    #[must_use]
    pub fn is_class(&self) -> bool {
        self.kind() == TokenKind::Class as u8
    }

    /// `true` if this token identifies a field
    #[must_use]
    pub fn is_field(&self) -> bool {
        self.kind() == TokenKind::Field as u8
    }

    /// `true` if this token identifies a method
    #[must_use]
    pub fn is_method(&self) -> bool {
        self.kind() == TokenKind::Method as u8
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(0x{:08X})", self.0)
    }
}
