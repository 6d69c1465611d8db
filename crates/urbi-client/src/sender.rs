//! Outbound command framing.

use std::io::{self, Write};

use tracing::debug;

use crate::SEND_TARGET;
use crate::message::TAG_SEPARATOR;

/// Formats a command as the line written to the server, terminator included.
///
/// With a tag the line is `"<tag>: <command>\n"`, otherwise the command is
/// written verbatim followed by `\n`. The command is neither validated nor
/// escaped: an embedded `\n` reaches the server as several lines.
///
/// # Examples
///
/// ```
/// use urbi_client::format_command;
///
/// assert_eq!(format_command("12;", None), "12;\n");
/// assert_eq!(format_command("12;", Some("tag")), "tag: 12;\n");
/// ```
#[must_use]
pub fn format_command(command: &str, tag: Option<&str>) -> String {
    match tag {
        Some(tag) => format!("{tag}{TAG_SEPARATOR}{command}\n"),
        None => format!("{command}\n"),
    }
}

/// Writes framed commands to the server half of a connection.
pub(crate) struct CommandSender<W> {
    writer: W,
}

impl<W: Write> CommandSender<W> {
    pub(crate) const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one command line and flushes it.
    pub(crate) fn send(&mut self, command: &str, tag: Option<&str>) -> io::Result<()> {
        let line = format_command(command, tag);
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        debug!(target: SEND_TARGET, tag = ?tag, command, "command sent");
        Ok(())
    }

    /// Writes a block of script verbatim, terminating it with `\n` if needed.
    pub(crate) fn send_raw(&mut self, script: &[u8]) -> io::Result<()> {
        self.writer.write_all(script)?;
        if !script.ends_with(b"\n") {
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        debug!(target: SEND_TARGET, bytes = script.len(), "script uploaded");
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer
    }
}
