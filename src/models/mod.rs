// カテゴリ、係数テーブル、検証エラー
pub mod common;

// 集計器が参照するインターフェース（trait）定義
pub mod traits;

// ドメインモデル
pub mod protection;
pub mod structure;
pub mod zone;
pub mod line;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use protection::{Lps, Shielding, SpdSystem, Tws};
pub use structure::Structure;
pub use zone::{InternalSystem, Zone};
pub use line::{Line, LineSection};
