use shared_types::MediaId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("Media {media_id} is not in the local cache")]
    UnknownMedia { media_id: MediaId },
}
