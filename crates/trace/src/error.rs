#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build export client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("export request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("collector rejected export with {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to write span payload: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
