pub mod client;
pub mod key;
pub mod store;

mod macros;

pub use client::CancelPolicy;
pub use client::QueryClient;
pub use key::CacheKey;
pub use store::RequestCache;
