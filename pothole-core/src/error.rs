use thiserror::Error;

#[derive(Error, Debug)]
pub enum PotholeError {
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Pothole #{0} not found")]
    NotFound(u64),

    #[error("Storage read error: {0}")]
    StorageRead(String),

    #[error("Storage write error: {0}")]
    StorageWrite(String),

    #[error("Detection failed: {0}")]
    DetectionFailure(String),

    #[error("Notification failed: {0}")]
    NotificationFailure(String),
}

pub type Result<T> = std::result::Result<T, PotholeError>;
