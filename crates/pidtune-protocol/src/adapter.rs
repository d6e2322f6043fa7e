//! 帧分类适配器链
//!
//! 每个适配器尝试把一帧文本归类为 [`Record`]，按顺序尝试，第一个匹配的生效：
//!
//! ```text
//! StructuredAdapter   {"type": ...}
//!     ↓ None
//! LegacyTagAdapter    >field:value / ERROR:text
//!     ↓ None
//! CommandEchoAdapter  {"command": ...} / PID:a,b,c / RPM:n
//!     ↓ None
//! Record::Unrecognized
//! ```
//!
//! 任何输入都不会 panic，也不会返回错误：无法解析的内容降级为
//! `Unrecognized` 或 `Error`。

use crate::command::Command;
use crate::record::{Record, ResponseStatus, Telemetry, TelemetryField};
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// 协议适配器
pub trait ProtocolAdapter: Send + Sync {
    /// 适配器名称（用于日志）
    fn name(&self) -> &'static str;

    /// 尝试分类一帧（已去除首尾空白）
    ///
    /// 返回 `None` 表示该适配器不认识这种格式，交给下一个适配器。
    fn classify(&self, frame: &str) -> Option<Record>;
}

/// 尽力而为的数值转换，失败时退化为 0
fn coerce_number(value: Option<&Value>) -> f64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    number.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn coerce_text_number(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn message_of(map: &Map<String, Value>) -> String {
    match map.get("message") {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

/// 以 `{` 开头的帧的 JSON 解析结果
enum JsonFrame {
    Object(Map<String, Value>),
    /// 合法 JSON 但不是对象
    Other,
    /// JSON 语法错误
    Malformed(String),
}

/// 只有以 `{` 开头的帧才按 JSON 处理；设备的调试输出经常是纯数字，
/// 不能让它们被误识别为 JSON 数值。
fn parse_object(frame: &str) -> Option<JsonFrame> {
    if !frame.starts_with('{') {
        return None;
    }
    Some(match serde_json::from_str::<Value>(frame) {
        Ok(Value::Object(map)) => JsonFrame::Object(map),
        Ok(_) => JsonFrame::Other,
        Err(e) => JsonFrame::Malformed(e.to_string()),
    })
}

/// 结构化 JSON 记录：`{"type": "data" | "response" | "log" | "status" | "error", ...}`
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredAdapter;

impl ProtocolAdapter for StructuredAdapter {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn classify(&self, frame: &str) -> Option<Record> {
        let map = match parse_object(frame)? {
            JsonFrame::Object(map) => map,
            JsonFrame::Other => return Some(Record::unrecognized(frame)),
            JsonFrame::Malformed(reason) => {
                return Some(Record::error(format!(
                    "malformed structured record: {reason}"
                )));
            },
        };

        // 命令形状留给回显适配器
        if !map.contains_key("type") && map.contains_key("command") {
            return None;
        }

        let Some(Value::String(kind)) = map.get("type") else {
            return Some(Record::unrecognized(frame));
        };

        let record = match kind.as_str() {
            "data" => {
                let mut telemetry = Telemetry::default();
                for field in TelemetryField::ALL {
                    telemetry.set(field, coerce_number(map.get(field.wire_name())));
                }
                Record::Telemetry(telemetry)
            },
            "response" => {
                let status = match map.get("status") {
                    Some(Value::String(s)) => ResponseStatus::from_wire(s),
                    _ => ResponseStatus::Failure,
                };
                Record::Response {
                    status,
                    message: message_of(&map),
                }
            },
            "log" => Record::Log {
                message: message_of(&map),
            },
            "status" => Record::Status {
                message: message_of(&map),
            },
            "error" => Record::Error {
                message: message_of(&map),
            },
            _ => Record::unrecognized(frame),
        };
        Some(record)
    }
}

/// 旧版标签行：`>field:value` 与 `ERROR:text`
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyTagAdapter;

impl LegacyTagAdapter {
    const ERROR_PREFIX: &'static str = "ERROR:";
}

impl ProtocolAdapter for LegacyTagAdapter {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn classify(&self, frame: &str) -> Option<Record> {
        if let Some(rest) = frame.strip_prefix(Self::ERROR_PREFIX) {
            let message = rest.trim();
            let message = if message.is_empty() {
                "unknown error"
            } else {
                message
            };
            return Some(Record::error(message));
        }

        let rest = frame.strip_prefix('>')?;
        let Some((name, value)) = rest.split_once(':') else {
            return Some(Record::unrecognized(frame));
        };
        let (name, value) = (name.trim(), value.trim());

        if let Some(field) = TelemetryField::from_wire_name(name) {
            return Some(Record::TelemetryField {
                field,
                value: coerce_text_number(value),
            });
        }

        let record = match name {
            "status" => Record::Status {
                message: value.to_string(),
            },
            "log" => Record::Log {
                message: value.to_string(),
            },
            _ => Record::unrecognized(frame),
        };
        Some(record)
    }
}

/// 命令回显：识别与下行命令同形的帧
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandEchoAdapter;

impl CommandEchoAdapter {
    fn classify_structured(map: &Map<String, Value>, frame: &str) -> Record {
        match map.get("command").and_then(Value::as_str) {
            Some("set_pid") => Record::Echo(Command::SetPid {
                kp: coerce_number(map.get("kp")),
                ki: coerce_number(map.get("ki")),
                kd: coerce_number(map.get("kd")),
            }),
            Some("set_rpm") => Record::Echo(Command::SetTarget {
                rpm: coerce_number(map.get("value")).round() as i32,
            }),
            _ => Record::unrecognized(frame),
        }
    }

    fn classify_legacy(frame: &str) -> Option<Record> {
        if let Some(rest) = frame.strip_prefix("PID:") {
            let values: Option<Vec<f64>> = rest
                .split(',')
                .map(|v| v.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
                .collect();
            return Some(match values.as_deref() {
                Some([kp, ki, kd]) => Record::Echo(Command::SetPid {
                    kp: *kp,
                    ki: *ki,
                    kd: *kd,
                }),
                _ => Record::unrecognized(frame),
            });
        }

        let rest = frame.strip_prefix("RPM:")?;
        Some(
            match rest.trim().parse::<f64>().ok().filter(|v| v.is_finite()) {
                Some(rpm) => Record::Echo(Command::SetTarget {
                    rpm: rpm.round() as i32,
                }),
                None => Record::unrecognized(frame),
            },
        )
    }
}

impl ProtocolAdapter for CommandEchoAdapter {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn classify(&self, frame: &str) -> Option<Record> {
        match parse_object(frame) {
            Some(JsonFrame::Object(map)) if map.contains_key("command") => {
                Some(Self::classify_structured(&map, frame))
            },
            Some(_) => None,
            None => Self::classify_legacy(frame),
        }
    }
}

/// 有序适配器链，第一个匹配的适配器生效
pub struct AdapterChain {
    adapters: Vec<Box<dyn ProtocolAdapter>>,
}

impl AdapterChain {
    /// 空链（所有帧都是 `Unrecognized`）
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// 追加适配器（链尾）
    pub fn with(mut self, adapter: impl ProtocolAdapter + 'static) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    /// 适配器名称（按尝试顺序）
    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// 把一帧归类为 `Record`
    pub fn parse(&self, frame: &str) -> Record {
        let frame = frame.trim();
        for adapter in &self.adapters {
            if let Some(record) = adapter.classify(frame) {
                tracing::trace!("frame classified by {}: {:?}", adapter.name(), record.kind());
                return record;
            }
        }
        Record::unrecognized(frame)
    }
}

impl Default for AdapterChain {
    fn default() -> Self {
        Self::empty()
            .with(StructuredAdapter)
            .with(LegacyTagAdapter)
            .with(CommandEchoAdapter)
    }
}

static DEFAULT_CHAIN: LazyLock<AdapterChain> = LazyLock::new(AdapterChain::default);

/// 使用默认适配器链解析一帧
pub fn parse_frame(frame: &str) -> Record {
    DEFAULT_CHAIN.parse(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PidGains, WireFormat};
    use proptest::prelude::*;

    #[test]
    fn test_structured_telemetry() {
        let record = parse_frame(
            r#"{"type":"data","target_rpm":100,"current_rpm":98.5,"error":1.5,"motor_output":40}"#,
        );
        assert_eq!(
            record,
            Record::Telemetry(Telemetry {
                target_rpm: 100.0,
                current_rpm: 98.5,
                error: 1.5,
                motor_output: 40.0,
            })
        );
    }

    #[test]
    fn test_structured_telemetry_missing_fields_default_to_zero() {
        let record = parse_frame(r#"{"type":"data","current_rpm":12}"#);
        assert_eq!(
            record,
            Record::Telemetry(Telemetry {
                current_rpm: 12.0,
                ..Telemetry::default()
            })
        );
    }

    #[test]
    fn test_structured_telemetry_bad_field_degrades_only_that_field() {
        let record = parse_frame(
            r#"{"type":"data","target_rpm":"abc","current_rpm":"42.5","error":null,"motor_output":[1]}"#,
        );
        assert_eq!(
            record,
            Record::Telemetry(Telemetry {
                current_rpm: 42.5,
                ..Telemetry::default()
            })
        );
    }

    #[test]
    fn test_structured_response() {
        assert_eq!(
            parse_frame(r#"{"type":"response","status":"success","message":"PID updated"}"#),
            Record::Response {
                status: ResponseStatus::Success,
                message: "PID updated".into(),
            }
        );
        assert_eq!(
            parse_frame(r#"{"type":"response","status":"failure","message":"bad value"}"#),
            Record::Response {
                status: ResponseStatus::Failure,
                message: "bad value".into(),
            }
        );
    }

    #[test]
    fn test_structured_messages() {
        assert_eq!(
            parse_frame(r#"{"type":"log","message":"hello"}"#),
            Record::Log {
                message: "hello".into()
            }
        );
        assert_eq!(
            parse_frame(r#"{"type":"status","message":"running"}"#),
            Record::Status {
                message: "running".into()
            }
        );
        assert_eq!(
            parse_frame(r#"{"type":"error","message":"stall"}"#),
            Record::Error {
                message: "stall".into()
            }
        );
    }

    #[test]
    fn test_discriminator_is_case_sensitive() {
        assert!(matches!(
            parse_frame(r#"{"type":"DATA","target_rpm":1}"#),
            Record::Unrecognized { .. }
        ));
        assert!(matches!(
            parse_frame(r#"{"Type":"data","target_rpm":1}"#),
            Record::Unrecognized { .. }
        ));
    }

    #[test]
    fn test_malformed_json_becomes_error() {
        assert!(matches!(
            parse_frame(r#"{"type":"data","target_rpm":"#),
            Record::Error { .. }
        ));
    }

    #[test]
    fn test_plain_number_is_not_json() {
        assert_eq!(parse_frame("1234"), Record::unrecognized("1234"));
    }

    #[test]
    fn test_legacy_fields() {
        assert_eq!(
            parse_frame(">current_rpm:98.25"),
            Record::TelemetryField {
                field: TelemetryField::CurrentRpm,
                value: 98.25
            }
        );
        assert_eq!(
            parse_frame(">motor_output: oops"),
            Record::TelemetryField {
                field: TelemetryField::MotorOutput,
                value: 0.0
            }
        );
        assert_eq!(
            parse_frame(">status:motor running"),
            Record::Status {
                message: "motor running".into()
            }
        );
        assert!(matches!(
            parse_frame(">voltage:12"),
            Record::Unrecognized { .. }
        ));
    }

    #[test]
    fn test_legacy_error_prefix() {
        assert_eq!(parse_frame("ERROR:port vanished"), Record::error("port vanished"));
        assert_eq!(parse_frame("ERROR:"), Record::error("unknown error"));
    }

    #[test]
    fn test_command_echo_round_trip() {
        let gains = PidGains::new(0.5, 0.2, 0.1).unwrap();
        for format in [WireFormat::Structured, WireFormat::Legacy] {
            let bytes = Command::set_pid(gains).encode(format).unwrap();
            let text = String::from_utf8(bytes).unwrap();
            match parse_frame(&text) {
                Record::Echo(Command::SetPid { kp, ki, kd }) => {
                    assert!((kp - 0.5).abs() < 1e-9);
                    assert!((ki - 0.2).abs() < 1e-9);
                    assert!((kd - 0.1).abs() < 1e-9);
                },
                other => panic!("unexpected record for {format:?}: {other:?}"),
            }

            let bytes = Command::set_target(175).encode(format).unwrap();
            let text = String::from_utf8(bytes).unwrap();
            assert_eq!(parse_frame(&text), Record::Echo(Command::set_target(175)));
        }
    }

    #[test]
    fn test_unknown_command_echo_is_unrecognized() {
        assert!(matches!(
            parse_frame(r#"{"command":"reboot"}"#),
            Record::Unrecognized { .. }
        ));
        assert!(matches!(parse_frame("PID:1,2"), Record::Unrecognized { .. }));
    }

    #[test]
    fn test_plain_text_is_unrecognized() {
        assert_eq!(
            parse_frame("  --- motor status ---  "),
            Record::unrecognized("--- motor status ---")
        );
    }

    #[test]
    fn test_custom_chain_order() {
        let chain = AdapterChain::empty().with(LegacyTagAdapter);
        assert_eq!(chain.names(), vec!["legacy"]);
        assert!(matches!(
            chain.parse(r#"{"type":"log","message":"x"}"#),
            Record::Unrecognized { .. }
        ));
        assert_eq!(
            AdapterChain::default().names(),
            vec!["structured", "legacy", "echo"]
        );
    }

    proptest! {
        #[test]
        fn prop_unknown_type_is_unrecognized(kind in "[a-z_]{1,12}") {
            prop_assume!(!["data", "response", "log", "status", "error"].contains(&kind.as_str()));
            let frame = format!(r#"{{"type":"{kind}","message":"x"}}"#);
            let is_unrecognized = matches!(parse_frame(&frame), Record::Unrecognized { .. });
            prop_assert!(is_unrecognized);
        }

        #[test]
        fn prop_never_panics(frame in ".{0,64}") {
            let _ = parse_frame(&frame);
        }
    }
}
