#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    #[error("topic name must not be empty")]
    EmptyName,
}
