// 数据模型模块

pub mod key_record;
pub mod login_event;
pub mod scan;
pub mod settings;

pub use key_record::KeyRecord;
pub use login_event::{AuthType, LoginEvent};
pub use scan::ScanReport;
pub use settings::{AppConfig, CorrelationOptions, ParseStrategy, RemoteSettings};
