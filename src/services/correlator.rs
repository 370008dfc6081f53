// 登录事件与公钥清单关联

use crate::models::{CorrelationOptions, LoginEvent};
use crate::services::inventory::Inventory;

/// 关联单个事件
///
/// 线性扫描清单，每条指纹匹配的记录输出一行（同一公钥登记在多个身份下会输出多行）。
/// 没有匹配时默认不输出；`report_unmatched` 时按声明用户名输出一行。
pub fn attribute(
    event: &LoginEvent,
    inventory: &Inventory,
    options: CorrelationOptions,
) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for record in inventory.records() {
        if !record.matches_fingerprint(&event.fingerprint) {
            continue;
        }
        let line = event.format(Some(&record.identity));
        if options.dedup && lines.contains(&line) {
            continue;
        }
        lines.push(line);
    }

    if lines.is_empty() && options.report_unmatched {
        lines.push(event.format(None));
    }
    lines
}

/// 关联一组事件，按事件顺序输出
pub fn correlate(
    events: &[LoginEvent],
    inventory: &Inventory,
    options: CorrelationOptions,
) -> Vec<String> {
    events
        .iter()
        .flat_map(|event| attribute(event, inventory, options))
        .collect()
}
