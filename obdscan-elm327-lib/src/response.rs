//! Prompt-framed response reading and normalization.
//!
//! The adapter terminates every reply with a `>` prompt. Raw replies
//! carry carriage returns, echoed confirmation bytes, and the literal
//! `NO DATA` when the vehicle has nothing to say; [`normalize`] and
//! [`prune_echo`] rewrite them into a pure hex payload ready for
//! numeric decoding.

use crate::error::LinkError;
use crate::link::Link;
use log::trace;
use smallvec::SmallVec;

/// Adapter end-of-response delimiter.
pub const PROMPT: u8 = b'>';

/// Literal the adapter sends when the vehicle has no data for a
/// request.
pub const NO_DATA_LITERAL: &str = "NO DATA";

/// Fixed-length all-zero placeholder substituted for
/// [`NO_DATA_LITERAL`], so numeric decoding never needs a special case
/// for absent data.
pub const NO_DATA_PLACEHOLDER: &str = "00000000000000";

/// Confirmation bytes echoed before the payload of a trouble-code
/// request.
pub const ECHO_DTC: usize = 1;
/// Confirmation bytes echoed before the payload of a standard
/// mode-01/09 single-frame PID.
pub const ECHO_STANDARD: usize = 2;
/// Confirmation bytes (including the continuation-index byte) echoed
/// on each line of a multi-frame bitmap or string PID.
pub const ECHO_MULTILINE: usize = 3;

/// Write `command` and accumulate the reply until the prompt byte
/// (excluded) or a timeout/zero-length read ends the response.
///
/// A link failure fails this request only; the caller treats it as a
/// failed command, not a fatal engine condition.
pub fn read_response(link: &mut impl Link, command: &[u8]) -> Result<String, LinkError> {
    link.send(command)?;
    let mut raw: SmallVec<u8, 64> = SmallVec::new();
    while let Some(byte) = link.read_byte()? {
        if byte == PROMPT {
            break;
        }
        raw.push(byte);
    }
    let text = String::from_utf8_lossy(&raw).into_owned();
    trace!(
        "response to {:?}: {text:?}",
        String::from_utf8_lossy(command)
    );
    Ok(text)
}

/// Rewrite a raw framed reply into canonical line-joined form:
/// carriage returns become line breaks, runs of line breaks collapse
/// to one, and the adapter's `NO DATA` literal becomes the all-zero
/// placeholder. Applying it twice yields the same text as once.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut text = raw.replace('\r', "\n");
    while text.contains("\n\n") {
        text = text.replace("\n\n", "\n");
    }
    text.replace(NO_DATA_LITERAL, NO_DATA_PLACEHOLDER)
}

/// Discard `removed_byte_count` echoed bytes (two hex characters each)
/// from the start of every line, then concatenate the remainders into
/// the pure data payload.
#[must_use]
pub fn prune_echo(text: &str, removed_byte_count: usize) -> String {
    let mut payload = String::new();
    for line in text.split('\n') {
        payload.push_str(line.get(2 * removed_byte_count..).unwrap_or(""));
    }
    payload
}
