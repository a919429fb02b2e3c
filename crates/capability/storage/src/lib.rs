//! # 状态存储模块
//!
//! 保存最近一次轮询得到的设备状态，单写多读：
//!
//! - [`StatusWriter`]：唯一写入端，由轮询循环持有，每个周期整体替换快照
//! - [`StatusStore`]：可克隆的只读端，返回不可变快照，读取方不会阻塞轮询
//! - [`WriteEcho`]：写入控制回显，只能登记已写入的值，下一次快照发布后失效
//!
//! ```rust,ignore
//! let (mut writer, store) = status_channel();
//! writer.publish(status, raw, cycle_started_at);
//! let latest = store.get_latest();
//! ```

mod echo;
mod status;

pub use echo::WriteEcho;
pub use status::{StatusSnapshot, StatusStore, StatusWriter, status_channel};
