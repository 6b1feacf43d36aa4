// 危険事象の発生頻度（Annex A）
pub mod dangerous_events;

// 損傷確率（Annex B）
pub mod probability;

// 損失（Annex C）
pub mod loss;

pub use dangerous_events::*;
pub use loss::*;
pub use probability::*;
