//! The chunked pump shared by every codec.
//!
//! ```text
//!  reader ──read──▶ InputBlock ──process──▶ OutputBlock ──write_all──▶ writer
//!                      ▲   (Run │ Finish)        │
//!                      └── refill when exhausted └── flushed after every call
//! ```
//!
//! The loop ends only when the engine reports [`StreamOutcome::Complete`].
//! Running out of input flips the action to [`Action::Finish`] but does not
//! end the loop, since engines may still hold buffered output.

use crate::config::PumpConfig;
use crate::cursor::{InputBlock, OutputBlock};
use crate::error::{CodecError, Result};
use crate::traits::{Action, Codec, StreamOutcome};
use std::io::{Read, Write};
use tracing::{debug, trace};

/// Byte counters for one pump run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Bytes read from the input stream.
    pub bytes_in: u64,
    /// Bytes written to the output stream.
    pub bytes_out: u64,
    /// Number of engine calls made.
    pub engine_calls: u64,
}

/// Moves bytes from a reader through a codec session to a writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pump {
    config: PumpConfig,
}

impl Pump {
    /// Create a pump with the given block sizes.
    pub fn new(config: PumpConfig) -> Self {
        Self { config }
    }

    /// Get the block configuration.
    pub fn config(&self) -> PumpConfig {
        self.config
    }

    /// Run `codec` over the whole of `reader`, writing its output to `writer`.
    ///
    /// Returns once the engine reports completion and every produced byte has
    /// been written. The first engine or I/O error aborts the run; bytes
    /// already written stay written.
    pub fn run<C, R, W>(&self, codec: &mut C, reader: &mut R, writer: &mut W) -> Result<PumpStats>
    where
        C: Codec + ?Sized,
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut input = InputBlock::new(self.config.input_block);
        let mut output = OutputBlock::new(self.config.output_block);
        let mut action = Action::Run;
        let mut stats = PumpStats::default();

        debug!(
            codec = codec.name(),
            input_block = self.config.input_block,
            output_block = self.config.output_block,
            "starting codec session"
        );

        loop {
            if input.is_exhausted() && action == Action::Run {
                let n = input.refill(reader).map_err(CodecError::Read)?;
                if n == 0 {
                    trace!(codec = codec.name(), "end of input");
                    action = Action::Finish;
                } else {
                    stats.bytes_in += n as u64;
                }
            }

            let (consumed, produced, outcome) =
                codec.process(input.remaining(), output.unfilled_mut(), action)?;
            stats.engine_calls += 1;
            input.consume(consumed);
            output.advance(produced);

            trace!(
                codec = codec.name(),
                consumed,
                produced,
                ?action,
                ?outcome,
                "engine call"
            );

            stats.bytes_out += output.flush_to(writer).map_err(CodecError::Write)? as u64;

            match outcome {
                StreamOutcome::Complete => break,
                StreamOutcome::Continue if consumed == 0 && produced == 0 => {
                    return Err(match action {
                        Action::Finish => CodecError::truncated(codec.name()),
                        Action::Run => CodecError::engine(codec.name(), "engine made no progress"),
                    });
                }
                StreamOutcome::Continue => {}
            }
        }

        writer.flush().map_err(CodecError::Write)?;

        debug!(
            codec = codec.name(),
            bytes_in = stats.bytes_in,
            bytes_out = stats.bytes_out,
            engine_calls = stats.engine_calls,
            "codec session complete"
        );

        Ok(stats)
    }
}
