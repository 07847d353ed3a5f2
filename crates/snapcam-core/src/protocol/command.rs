//! Request grammar.
//!
//! A request is whatever bytes a single receive call returned.  The server
//! compares them, in full, against the ASCII token `TAKE_PHOTO`.  There is no
//! delimiter: `TAKE_PHOTO\n` does not match, and a token split across two
//! receives never matches either.  Everything that does not match is ignored.

/// The only command token the server recognises.
pub const TAKE_PHOTO: &[u8] = b"TAKE_PHOTO";

/// Maximum number of bytes the server reads per receive.
pub const READ_BUFFER_SIZE: usize = 1024;

/// A decoded client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Capture one frame now and send it back.
    TakePhoto,
}

impl Command {
    /// Parses the bytes of one receive into a command.
    ///
    /// Returns `None` for anything that is not exactly a known token.  This
    /// is not an error: the caller simply waits for the next receive.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use snapcam_core::Command;
    ///
    /// assert_eq!(Command::parse(b"TAKE_PHOTO"), Some(Command::TakePhoto));
    /// assert_eq!(Command::parse(b"TAKE_PHOTO\n"), None);
    /// ```
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes == TAKE_PHOTO {
            Some(Command::TakePhoto)
        } else {
            None
        }
    }

    /// Returns the wire representation of this command.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Command::TakePhoto => TAKE_PHOTO,
        }
    }
}
