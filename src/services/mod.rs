pub mod auth;
pub mod browse;
pub mod catalog;
pub mod phrases;
pub mod providers;
pub mod related;
pub mod session;
pub mod trailer;
pub mod trigger;

pub use browse::CategoryBrowser;
pub use catalog::Catalog;
pub use phrases::PhraseDeriver;
pub use related::{RelatedOptions, RelatedPipeline};
pub use session::{SessionServices, ViewSession};
pub use trailer::TrailerService;
pub use trigger::LazyTrigger;
