//! Error taxonomy for model loading and the constraint/sampling pipeline.

/// Failures that can occur while loading or validating a [`crate::network::Network`].
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zip archive contains no .json member")]
    NoJsonInZip,

    #[error("node `{0}` references unknown parent `{1}`")]
    UnknownParent(String, String),

    #[error("node `{0}` references parent `{1}` which does not precede it in sampling order")]
    ParentOutOfOrder(String, String),

    #[error("duplicate node name `{0}`")]
    DuplicateNode(String),

    #[error("network is not a valid DAG (cycle involving `{0}`)")]
    Cyclic(String),
}

/// Failures that can occur while running the input/value pipeline.
///
/// `UnknownNode` from the spec's error table has no variant here: per §7 it
/// is recovered locally (the constraint entry is dropped) and never reaches
/// a caller.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("constraint set included an empty whitelist for `{0}`")]
    EmptyConstraint(String),

    #[error("no sample satisfies the given constraints after relaxation")]
    UnsatisfiableConstraints,

    #[error("value network produced no User-Agent header")]
    MissingUserAgent,

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}
