/// Errors produced by anm2ed-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("selector not found: {0}")]
    SelectorNotFound(u32),

    #[error("item not found: {0}")]
    ItemNotFound(u32),

    #[error("parameter not found: {0}")]
    ParamNotFound(u32),

    #[error("no selector or item with id {0} to insert at")]
    InvalidPosition(u32),

    #[error("item {0} is not an animation item")]
    NotAnimationItem(u32),

    #[error("item {0} is not a value item")]
    NotValueItem(u32),

    #[error("parameter {0} does not belong to item {1}")]
    ParamOutsideItem(u32, u32),

    #[error("no transaction in progress")]
    NoTransaction,

    #[error("a field contains the forbidden character sequence \"]==]\"")]
    ForbiddenSequence,

    #[error("not a valid selector script: {0}")]
    InvalidFormat(&'static str),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
