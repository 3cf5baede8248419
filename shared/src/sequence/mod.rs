mod error;
pub use error::SequenceError;

mod seqno_range;
pub use seqno_range::SeqnoRange;

mod seqno_tracker;
pub use seqno_tracker::{Classification, SeqnoTracker};

mod sequence_buffer;
pub use sequence_buffer::SequenceBuffer;

mod digest;
pub use digest::{Digest, DigestEntry};
