use serde::Serialize;

/// Counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub messages_found: usize,
    pub ebooks_processed: usize,
    pub messages_deleted: usize,
}
