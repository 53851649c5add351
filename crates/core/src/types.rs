/// Content item identifiers are PostgreSQL BIGINT values drawn from a sequence.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
