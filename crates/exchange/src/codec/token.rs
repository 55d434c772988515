use bytes::Bytes;

/// Structural markers of the body token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// The next data token is a payload chunk
    Chunk,
    /// A new body starts, the next data token is its kind tag
    Type,
    /// No more bodies, always the last token
    End,
}

/// One item of the flat token stream produced from a response's bodies.
///
/// For every body the stream carries `Type`, the kind tag as data, then a
/// `Chunk` marker and data token per payload chunk. A single `End` closes
/// the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Control(Control),
    Data(Bytes),
}

impl Token {
    /// Returns true if this token is a control marker
    #[inline]
    pub fn is_control(&self) -> bool {
        matches!(self, Token::Control(_))
    }

    /// Returns true if this token terminates the stream
    #[inline]
    pub fn is_end(&self) -> bool {
        matches!(self, Token::Control(Control::End))
    }

    /// Returns a reference to the contained bytes if this is a data token
    pub fn as_data(&self) -> Option<&Bytes> {
        match self {
            Token::Data(bytes) => Some(bytes),
            Token::Control(_) => None,
        }
    }

    /// Consumes the token and returns the contained bytes if this is a data token
    pub fn into_data(self) -> Option<Bytes> {
        match self {
            Token::Data(bytes) => Some(bytes),
            Token::Control(_) => None,
        }
    }
}

impl From<Control> for Token {
    fn from(control: Control) -> Self {
        Token::Control(control)
    }
}

impl From<Bytes> for Token {
    fn from(bytes: Bytes) -> Self {
        Token::Data(bytes)
    }
}
