use thiserror::Error;

/// Why the authority refused a request.
///
/// Rejections are silent on the wire: no state changes, no events go out, and
/// the sender learns nothing beyond the absence of a confirming event. The
/// reason exists for logging and for tests.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    #[error("game already has a winner")]
    GameOver,

    #[error("not this player's turn")]
    NotYourTurn,

    #[error("coordinate out of bounds")]
    OutOfBounds,

    #[error("cell already holds a piece")]
    CellOccupied,

    #[error("trap budget exhausted")]
    TrapBudgetExhausted,

    #[error("player already has a trap on that cell")]
    DuplicateTrap,
}

/// Session and transport errors. Unlike [`Reject`], these are surfaced to the
/// offending peer, since they concern the connection rather than game rules.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("match not found: {0}")]
    MatchNotFound(String),

    #[error("match is full")]
    MatchFull,

    #[error("only the host may restart the match")]
    NotHost,

    #[error("peer not connected: {0}")]
    PeerNotFound(String),

    #[error("match command queue closed")]
    QueueClosed,
}

/// Top-level error type for the server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
