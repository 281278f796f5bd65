#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Missing `url` query parameter")]
    MissingUrl,

    #[error("Invalid url")]
    InvalidUrl,

    #[error("Unsupported `lang` {0:?}, expected one of: en, ja")]
    UnsupportedLang(String),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),
}
