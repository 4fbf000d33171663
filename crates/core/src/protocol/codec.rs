//! Text codec for the data server protocol
//!
//! Outbound: one line per command, `NAME<SEP>arg1<SEP>arg2...`.
//! Inbound: any number of lines followed by the terminator line. Rows inside
//! the block are either one per line or packed into a line with the
//! record-join token; both forms are accepted.
//!
//! Arguments are written as-is. The server does not understand any escaping,
//! so an argument containing a token desynchronizes field counts on the
//! server side; [`LineCodec::unsafe_argument`] lets callers detect that.

use crate::error::{CoreError, Result};
use crate::protocol::ResponseBlock;
use crate::types::Command;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source of inbound lines, one call per line
///
/// `Ok(None)` signals end of stream.
#[async_trait]
pub trait LineSource: Send {
    async fn read_line(&mut self) -> Result<Option<String>>;
}

/// The three delimiters of the wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireTokens {
    /// Joins command name and arguments, and fields within a row
    pub separator: String,
    /// Joins rows packed into one transmitted line
    pub record_join: String,
    /// Line marking the end of a response
    pub terminator: String,
}

impl Default for WireTokens {
    fn default() -> Self {
        Self {
            separator: "@Tr&m".to_string(),
            record_join: "@Jump".to_string(),
            terminator: "FIN_COMANDO".to_string(),
        }
    }
}

impl WireTokens {
    pub fn validate(&self) -> Result<()> {
        for (name, token) in [
            ("separator", &self.separator),
            ("record_join", &self.record_join),
            ("terminator", &self.terminator),
        ] {
            if token.is_empty() {
                return Err(CoreError::Config(format!("{} token cannot be empty", name)));
            }
            if token.contains('\n') || token.contains('\r') {
                return Err(CoreError::Config(format!("{} token cannot contain a newline", name)));
            }
        }
        Ok(())
    }
}

/// Encoder/decoder bound to one set of wire tokens
#[derive(Debug, Clone, Default)]
pub struct LineCodec {
    tokens: WireTokens,
}

impl LineCodec {
    pub fn new(tokens: WireTokens) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &WireTokens {
        &self.tokens
    }

    /// Encode a command into one outbound line (without line terminator)
    pub fn encode(&self, cmd: &Command) -> String {
        if let Some((index, _)) = self.unsafe_argument(cmd) {
            tracing::warn!(
                "Argument {} of {} contains a protocol token or newline; sending unescaped",
                index,
                cmd.name()
            );
        }

        let mut line = String::with_capacity(
            cmd.name().len()
                + cmd
                    .args()
                    .iter()
                    .map(|a| a.len() + self.tokens.separator.len())
                    .sum::<usize>(),
        );
        line.push_str(cmd.name());
        for arg in cmd.args() {
            line.push_str(&self.tokens.separator);
            line.push_str(arg);
        }
        line
    }

    /// First argument that would not survive the trip to the server intact
    pub fn unsafe_argument<'a>(&self, cmd: &'a Command) -> Option<(usize, &'a str)> {
        cmd.args()
            .iter()
            .enumerate()
            .find(|(_, arg)| {
                arg.contains('\n')
                    || arg.contains('\r')
                    || arg.contains(&self.tokens.separator)
                    || arg.contains(&self.tokens.record_join)
                    || arg.as_str() == self.tokens.terminator
            })
            .map(|(i, arg)| (i, arg.as_str()))
    }

    /// Decode one command line, the way the server reads it
    pub fn decode_command(&self, line: &str) -> Result<Command> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut parts = line.split(self.tokens.separator.as_str());
        let name = match parts.next() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(CoreError::Protocol("Empty command line".into())),
        };
        Ok(Command::with_args(name, parts))
    }

    /// Read lines until the terminator line
    ///
    /// The terminator is consumed and not part of the block. End of stream
    /// before the terminator is a protocol error; nothing read so far is
    /// returned.
    pub async fn read_block<S>(&self, source: &mut S) -> Result<ResponseBlock>
    where
        S: LineSource + ?Sized,
    {
        let mut block = ResponseBlock::default();
        loop {
            match source.read_line().await? {
                Some(line) if line == self.tokens.terminator => {
                    tracing::trace!("Block complete with {} lines", block.len());
                    return Ok(block);
                }
                Some(line) => block.push(line),
                None => {
                    return Err(CoreError::Protocol(format!(
                        "Stream ended before terminator after {} lines",
                        block.len()
                    )));
                }
            }
        }
    }

    /// Split a block into raw record strings
    ///
    /// Each line is split on the record-join token; blank chunks and stray
    /// terminator chunks are dropped.
    pub fn records<'a>(&'a self, block: &'a ResponseBlock) -> impl Iterator<Item = &'a str> + 'a {
        block
            .lines()
            .iter()
            .flat_map(move |line| line.split(self.tokens.record_join.as_str()))
            .filter(move |chunk| {
                let trimmed = chunk.trim();
                !trimmed.is_empty() && trimmed != self.tokens.terminator
            })
    }

    /// Split one record into positional fields
    pub fn fields(&self, record: &str) -> Vec<String> {
        record
            .trim_matches(['\r', '\n'])
            .split(self.tokens.separator.as_str())
            .map(str::to_string)
            .collect()
    }

    /// Records of a block, already split into fields
    pub fn rows(&self, block: &ResponseBlock) -> Vec<Vec<String>> {
        self.records(block).map(|record| self.fields(record)).collect()
    }
}
