#![forbid(unsafe_code)]

pub mod cache;
pub mod http;
pub mod repository;

pub use cache::{CacheConfig, CachedQuizRepository, TtlCache};
pub use http::{ClientConfig, ConfigError, DEFAULT_BASE_URL, HttpQuizClient};
pub use repository::{
    Endpoint, InMemoryRepository, QuizAdminRepository, QuizRepository, RepositoryError,
    ResultSubmitter, Storage,
};
