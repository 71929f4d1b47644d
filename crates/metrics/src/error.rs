#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("a global metrics recorder is already installed")]
    RecorderInstalled,
}

pub type Result<T> = std::result::Result<T, Error>;
