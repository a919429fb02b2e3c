//! 输入验证辅助函数
//!
//! 数值范围校验由 `ModeController` 负责，这里只处理无法映射到领域类型的输入。

use crate::utils::response::bad_request_error;
use axum::response::Response;
use domain::LgMode;

/// 解析模式名（cool / heat / auto，大小写不敏感）
pub fn parse_lg_mode(value: &str) -> Result<LgMode, Response> {
    LgMode::parse(value).ok_or_else(|| {
        hp_telemetry::record_validation_rejected();
        bad_request_error(format!("unknown lg mode: {}", value.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::parse_lg_mode;
    use axum::http::StatusCode;
    use domain::LgMode;

    #[test]
    fn parses_known_modes() {
        assert_eq!(parse_lg_mode(" Heat ").ok(), Some(LgMode::Heat));
        assert_eq!(parse_lg_mode("auto").ok(), Some(LgMode::Auto));
    }

    #[test]
    fn rejects_unknown_mode() {
        let response = parse_lg_mode("dry").expect_err("unknown mode");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
