//! Bounded line reads

use std::io::{Error, ErrorKind};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Read one `\n`-terminated line of at most `max_len` bytes of content.
///
/// The limit applies after the line terminator (`\n` or `\r\n`) is stripped;
/// at most `max_len + 2` bytes are ever buffered. Returns `Ok(None)` at end of
/// stream with nothing buffered. A final line without a terminator is
/// returned as a line.
///
/// Not cancel-safe: dropping the future may leave part of a line consumed.
pub async fn read_line_bounded<R>(reader: &mut R, max_len: usize) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut bytes = Vec::new();
    let mut terminated = false;

    loop {
        let available = reader.fill_buf().await?;

        if available.is_empty() {
            if bytes.is_empty() {
                return Ok(None);
            }
            break;
        }

        let newline_pos = available.iter().position(|&b| b == b'\n');
        let to_consume = newline_pos.map(|p| p + 1).unwrap_or(available.len());

        if bytes.len() + to_consume > max_len + 2 {
            return Err(too_long(max_len));
        }

        bytes.extend_from_slice(&available[..to_consume]);
        reader.consume(to_consume);

        if newline_pos.is_some() {
            terminated = true;
            break;
        }
    }

    if terminated {
        bytes.pop();
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
    }
    if bytes.len() > max_len {
        return Err(too_long(max_len));
    }

    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| Error::new(ErrorKind::InvalidData, e))
}

fn too_long(max_len: usize) -> Error {
    Error::new(ErrorKind::InvalidData, format!("Line exceeded {} byte limit", max_len))
}
