use thiserror::Error;

/// The networking core's error kinds, shared across `p2p` and `sync` so
/// that a single match arm set covers both crates (spec.md §7).
///
/// Each variant is independently distinguishable at call sites; no error
/// carries a wrapped type name that downstream code would need to know
/// about to classify it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetError {
    /// A peer's current fork digest does not match ours. Terminal: the peer
    /// is flagged bad (spec.md §4.1 peer-status axis, §7).
    #[error("wrong fork digest")]
    WrongForkDigest,

    /// A status whose finalized epoch is impossibly advanced for the
    /// current wall-clock time.
    #[error("invalid epoch")]
    InvalidEpoch,

    /// A status whose finalized root is unknown and unreachable from our
    /// chain.
    #[error("invalid finalized root")]
    InvalidFinalizedRoot,

    /// A blocks-by-range response violated ordering, step, or slot bounds.
    #[error("invalid fetched data")]
    InvalidFetchedData,

    /// Local rate-limit refusal, or the remote peer reported one.
    #[error("rate limited")]
    RateLimited,

    /// The requested step or range was rejected.
    #[error("step error")]
    StepError,

    /// The operation referenced a peer that is not in the peer store.
    #[error("unknown peer")]
    PeerUnknown,

    /// No suitable peer was available for the requested operation.
    #[error("no peers")]
    NoPeers,

    /// The requested start slot is beyond best-finalized + 1.
    #[error("start too high")]
    StartTooHigh,

    /// The operation was cooperatively cancelled.
    #[error("cancelled")]
    ContextCancelled,

    /// A stream deadline (time-to-first-byte or per-write) was exceeded.
    #[error("timeout")]
    Timeout,

    /// A payload could not be deserialised, or exceeded the maximum length.
    #[error("decode failure: {0}")]
    DecodeFailure(String),

    /// Wraps an I/O failure from the transport layer.
    #[error("io error: {0}")]
    Io(String),
}

pub type NetResult<T> = Result<T, NetError>;
