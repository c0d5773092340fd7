//! JSON text stored in the payload fields of Execution and Error records.
//!
//! The text uses `", "` between items and `": "` after keys, with non-ASCII
//! characters written as `\uXXXX` escapes: `{"start_date": "2021-10-12"}`.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

use crate::error::{Error, ErrorKind, Result};

#[derive(Debug, Default, Clone, Copy)]
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    writer.write_all(format!("\\u{:04x}", unit).as_bytes())?;
                }
            }
        }
        Ok(())
    }
}

/// Serialize `value` as payload text.
pub fn to_payload_text<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buffer = Vec::with_capacity(128);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, SpacedFormatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buffer).map_err(|e| Error::new(ErrorKind::Json(e.to_string())))
}
