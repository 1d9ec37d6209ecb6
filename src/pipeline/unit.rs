use super::error::PipelineError;

/// Ordered batch of records moving between stages
pub type Chunk<T> = Vec<T>;

/// One item of pipeline output; an `Err` unit ends the stream
pub type Unit<T> = Result<Chunk<T>, PipelineError>;
