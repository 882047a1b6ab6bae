//! Producer-facing line writer

use embassy_sync::blocking_mutex::raw::RawMutex;
use muxlog_driver::Host;

use crate::chunk::ChunkBuilder;
use crate::core::{Format, TaskId};

/// Mark emitted instead of a value that failed to render
const NUMERIC_ERROR: u8 = b'#';
/// Zero-fill character
const NUMERIC_FILL: u8 = b'0';
/// Digit characters for all supported bases
const DIGITS: [u8; 16] = *b"0123456789abcdef";
/// Digit scratch size: a 32-bit binary rendering plus margin
const DIGIT_BUFFER: usize = 34;

/// One message under construction
///
/// Obtained from [`Mux::line`](crate::Mux::line); the underlying chunks are
/// submitted as they fill, and dropping the writer terminates the message
/// with `\n`. All sinks render text, so values are converted here, on the
/// producer's stack. Avoid writing `\n`, `#` or `@` yourself; the first is
/// the message terminator and the others are reserved marks.
///
/// A writer handed out in a context that may not log (interrupt logging
/// disabled, producer not registered, topic not registered) accepts writes
/// and discards them.
pub struct LineWriter<'a, H: Host, M: RawMutex, const K: usize, const Q: usize> {
    builder: ChunkBuilder<'a, H, M, K, Q>,
    align_signed: bool,
}

impl<'a, H: Host, M: RawMutex, const K: usize, const Q: usize> LineWriter<'a, H, M, K, Q> {
    pub(crate) fn new(builder: ChunkBuilder<'a, H, M, K, Q>, align_signed: bool) -> Self {
        Self {
            builder,
            align_signed,
        }
    }

    /// False when this writer discards everything.
    pub fn is_active(&self) -> bool {
        self.builder.is_active()
    }

    pub(crate) fn tag(&self) -> TaskId {
        self.builder.tag()
    }

    /// Appends one raw byte.
    pub fn push(&mut self, byte: u8) -> &mut Self {
        self.builder.push(byte);
        self
    }

    pub fn str(&mut self, value: &str) -> &mut Self {
        for byte in value.bytes() {
            self.builder.push(byte);
        }
        self
    }

    pub fn chr(&mut self, value: char) -> &mut Self {
        let mut buffer = [0; 4];
        self.str(value.encode_utf8(&mut buffer))
    }

    pub fn boolean(&mut self, value: bool) -> &mut Self {
        self.str(if value { "true" } else { "false" })
    }

    pub fn uint(&mut self, value: u32, format: Format) -> &mut Self {
        self.render_unsigned(value, format, false);
        self
    }

    pub fn int(&mut self, value: i32, format: Format) -> &mut Self {
        self.render_unsigned(value.unsigned_abs(), format, value < 0);
        self
    }

    /// Renders in scientific form: leading digit, point, `format.fill - 1`
    /// mantissa digits, `e`, signed decimal exponent.
    pub fn float(&mut self, value: f64, format: Format) -> &mut Self {
        self.render_float(value, format.fill);
        self
    }

    fn render_unsigned(&mut self, value: u32, format: Format, negative: bool) {
        let base = format.base as u32;
        if base != 2 && base != 10 && base != 16 {
            self.push(NUMERIC_ERROR);
            return;
        }
        let mut digits = [0; DIGIT_BUFFER];
        let mut length = 0;
        let mut rest = value;
        loop {
            digits[length] = DIGITS[(rest % base) as usize];
            length += 1;
            rest /= base;
            if rest == 0 {
                break;
            }
        }
        if negative {
            self.push(b'-');
        } else if self.align_signed && format.fill > 0 {
            self.push(b' ');
        }
        let mut fill = format.fill as usize;
        while fill > length {
            self.push(NUMERIC_FILL);
            fill -= 1;
        }
        for index in (0..length).rev() {
            self.push(digits[index]);
        }
    }

    fn render_float(&mut self, value: f64, digits: u8) {
        if value.is_nan() {
            self.str("nan");
            return;
        }
        if value.is_infinite() {
            self.str("inf");
            return;
        }
        if value == 0.0 {
            self.push(b'0');
            return;
        }

        let mut normalized = value;
        if normalized < 0.0 {
            normalized = -normalized;
            self.push(b'-');
        } else if self.align_signed {
            self.push(b' ');
        }

        let mut exponent = 0;
        while normalized >= 10.0 {
            normalized /= 10.0;
            exponent += 1;
        }
        while normalized < 1.0 {
            normalized *= 10.0;
            exponent -= 1;
        }

        for position in 1..digits {
            let digit = (normalized as u32).min(9);
            self.push(DIGITS[digit as usize]);
            normalized = 10.0 * (normalized - digit as f64);
            if position == 1 {
                self.push(b'.');
            }
        }
        let digit = ((normalized + 0.5) as u32).min(9);
        self.push(DIGITS[digit as usize]);
        self.push(b'e');
        if exponent >= 0 {
            self.push(b'+');
        }
        self.int(exponent, Format::DEFAULT);
    }
}

impl<'a, H: Host, M: RawMutex, const K: usize, const Q: usize> Drop
    for LineWriter<'a, H, M, K, Q>
{
    fn drop(&mut self) {
        self.builder.flush();
    }
}
