//! Data types flowing through the transcription pipeline.

/// A speech-bearing audio window queued for transcription.
///
/// Sequence numbers are assigned by the segmenter in strictly increasing
/// order starting at 0, with no gaps, before the item is enqueued. Each item
/// is consumed by exactly one worker.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Position of this window in capture order.
    pub sequence: u64,
    /// PCM samples (16-bit signed integers).
    pub samples: Vec<i16>,
}

impl WorkItem {
    /// Creates a new work item.
    pub fn new(sequence: u64, samples: Vec<i16>) -> Self {
        Self { sequence, samples }
    }
}

/// Outcome of processing one work item.
///
/// A failed item still produces an outcome so its sequence number reaches the
/// reordering sink; losing a sequence would stall emission forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    /// Successful transcription.
    Text(String),
    /// Transcription failed; carries the error message as a marker.
    Failed(String),
}

/// A processed item on its way back to the reordering sink.
///
/// The sequence always equals the sequence of the work item it was derived
/// from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultItem {
    pub sequence: u64,
    pub outcome: WorkOutcome,
}

impl ResultItem {
    /// Creates a result item for a sequence.
    pub fn new(sequence: u64, outcome: WorkOutcome) -> Self {
        Self { sequence, outcome }
    }
}

/// One in-order emission from the reordering sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission<T> {
    /// The value submitted for this sequence, released in order.
    Item { sequence: u64, value: T },
    /// This sequence never arrived within the stall timeout and was skipped.
    Skipped { sequence: u64 },
}

impl<T> Emission<T> {
    /// The sequence number this emission accounts for.
    pub fn sequence(&self) -> u64 {
        match self {
            Emission::Item { sequence, .. } => *sequence,
            Emission::Skipped { sequence } => *sequence,
        }
    }
}
