// ==========================================
// 租赁订单装箱标签系统 - 导入层
// ==========================================
// 职责: 上游订单载荷 -> 标准 Order（清洗名称 + 品类识别）
// ==========================================

pub mod error;
pub mod feed_normalizer;

pub use error::{ImportError, ImportResult};
pub use feed_normalizer::{FeedBatch, FeedNormalizer, FeedPlatform};
