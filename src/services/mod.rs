// 业务服务模块
//
// - keys: 公钥解析与指纹计算
// - inventory: 公钥清单（扫描 / 缓存）
// - storage: 清单缓存读写
// - log_source: 日志来源（本地 / 远程）
// - log_parser: 认证日志解析
// - correlator: 登录事件归属
// - actions: 命令处理流程

pub mod actions;
pub mod correlator;
pub mod inventory;
pub mod keys;
pub mod log_parser;
pub mod log_source;
pub mod storage;
