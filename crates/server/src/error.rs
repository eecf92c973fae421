use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] tokengate::ConfigError),

    #[error("registry error: {0}")]
    Registry(#[from] tokengate::RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
