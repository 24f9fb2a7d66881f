use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("cannot parse '{0}' as a number")]
    Parse(String),

    #[error("value is not exactly representable in the target form")]
    NotRepresentable,
}
