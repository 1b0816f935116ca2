// Minute generation support for Call Minutes
// Prompt construction, tolerant decoding of LLM output, and document export

pub mod export;
pub mod parser;
pub mod prompts;

pub use export::ExportFormat;
pub use parser::{DecodeOutcome, MinutePayload, TimelineBrief, TimelineNode};
