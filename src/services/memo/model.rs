use serde::{Deserialize, Serialize};

use crate::model::record::TranslationRecord;

fn default_timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Item salvo pelo usuário. Imutável depois de persistido; só sai da
/// lista por remoção explícita (índice) ou clear.
///
/// O registro fica achatado no JSON — o item no storage tem o mesmo
/// shape que a extensão sempre gravou.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StoredItem {
    #[serde(flatten)]
    pub record: TranslationRecord,

    /// Epoch ms. Se o frontend não mandar, vale o momento do save.
    #[serde(default = "default_timestamp")]
    pub timestamp: i64,

    #[serde(default)]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}
