pub mod preferences;
pub mod providers;
pub mod quota;
pub mod recommendations;
pub mod reranker;
pub mod selector;

pub use providers::{CatalogSource, RandomKind, StaticCatalog, TmdbProvider};
pub use quota::{Clock, QuotaProvider, QuotaStore, SystemClock};
pub use recommendations::RecommendationService;
pub use reranker::{GeminiReranker, Reranker};
