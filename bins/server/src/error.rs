#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config: {0}")]
    Config(#[from] broker::ConfigError),

    #[error("{0}")]
    Broker(#[from] broker::BrokerError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
