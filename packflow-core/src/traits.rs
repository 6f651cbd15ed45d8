//! The per-call contract every codec session implements.
//!
//! Native engines expose very different buffer shapes: zlib's
//! `next_in`/`avail_in` counters, zstd's `pos`/`size` buffer structs, and
//! liblzma's counters plus an explicit run/finish action. [`Codec`] flattens
//! all of them into one call that takes an input slice and an output slice
//! and reports how much of each it used, so the chunked pump in
//! [`crate::pump`] is written once.

use crate::error::Result;

/// Whether more input may still arrive.
///
/// Once a session has been called with [`Action::Finish`] it is never called
/// with [`Action::Run`] again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// More input may follow.
    #[default]
    Run,
    /// The input stream has ended; drain everything that is left.
    Finish,
}

/// Outcome of a single engine call.
///
/// The fatal case is the `Err` arm of the call's `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The stream is not finished; call again.
    Continue,
    /// The engine reported stream completion and all output has been produced.
    Complete,
}

/// A streaming codec session.
///
/// A session owns exactly one engine handle and decodes or encodes exactly
/// one stream. Engine resources are released when the session is dropped,
/// whichever way the pump exits.
pub trait Codec {
    /// Short codec name used in errors and log lines.
    fn name(&self) -> &'static str;

    /// Run one engine call.
    ///
    /// The engine consumes as much of `input` and fills as much of `output`
    /// as it chooses; neither is guaranteed to be drained.
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, outcome)
    fn process(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        action: Action,
    ) -> Result<(usize, usize, StreamOutcome)>;

    /// Check if the engine has reported stream completion.
    fn is_complete(&self) -> bool;
}

impl<C: Codec + ?Sized> Codec for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn process(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        action: Action,
    ) -> Result<(usize, usize, StreamOutcome)> {
        (**self).process(input, output, action)
    }

    fn is_complete(&self) -> bool {
        (**self).is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_default() {
        assert_eq!(Action::default(), Action::Run);
    }
}
