// ==========================================
// PV 配置快照管理 - 领域类型定义
// ==========================================
// 职责: PV 取值的封闭类型、配置身份标识、派生函数
// 红线: 取值类型必须穷举,不允许运行时"未实现"分支
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==========================================
// ValueType - PV 声明类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Float, // 浮点设定值 (电流/电压等)
    Int,   // 整数设定值
    Bool,  // 开关量
    Enum,  // 枚举量 (按字符串保存)
}

impl ValueType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Float => "Float",
            ValueType::Int => "Int",
            ValueType::Bool => "Bool",
            ValueType::Enum => "Enum",
        }
    }

    /// 从字符串解析 (兼容大小写及常见别名)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float" | "f64" | "double" => Some(ValueType::Float),
            "int" | "i64" | "integer" => Some(ValueType::Int),
            "bool" | "boolean" => Some(ValueType::Bool),
            "enum" | "str" | "string" => Some(ValueType::Enum),
            _ => None,
        }
    }

    /// 是否为数值类型 (可参与插值/派生)
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Float | ValueType::Int)
    }

    /// 新建配置时使用的默认值
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Float => Value::Float(0.0),
            ValueType::Int => Value::Int(0),
            ValueType::Bool => Value::Bool(false),
            ValueType::Enum => Value::Enum(String::new()),
        }
    }

    /// 按声明类型解析文本输入
    ///
    /// # 返回
    /// - Ok(Value): 解析成功
    /// - Err(String): 解析失败原因
    pub fn parse(&self, text: &str) -> Result<Value, String> {
        let raw = text.trim();
        match self {
            ValueType::Float => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("无法解析为浮点数: '{}' ({})", raw, e)),
            ValueType::Int => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| format!("无法解析为整数: '{}' ({})", raw, e)),
            ValueType::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "off" | "no" => Ok(Value::Bool(false)),
                _ => Err(format!("无法解析为开关量: '{}'", raw)),
            },
            ValueType::Enum => Ok(Value::Enum(raw.to_string())),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Value - PV 取值
// ==========================================
// 序列化格式: {"type": "Float", "value": 1.0}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Float(f64),
    Int(i64),
    Bool(bool),
    Enum(String),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Float(_) => ValueType::Float,
            Value::Int(_) => ValueType::Int,
            Value::Bool(_) => ValueType::Bool,
            Value::Enum(_) => ValueType::Enum,
        }
    }

    /// 表格显示格式 (浮点按固定精度)
    pub fn format(&self, precision: usize) -> String {
        match self {
            Value::Float(v) => format!("{:.*}", precision, v),
            Value::Int(v) => v.to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Enum(v) => v.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Bool(_) | Value::Enum(_) => None,
        }
    }

    /// 数值偏移; 非数值类型原样返回
    pub fn offset(&self, delta: f64) -> Value {
        match self {
            Value::Float(v) => Value::Float(v + delta),
            Value::Int(v) => Value::Int(v.saturating_add(delta.round() as i64)),
            other => other.clone(),
        }
    }

    /// 两个同类型数值的算术平均
    ///
    /// # 返回
    /// - Some(Value): 平均值 (整数四舍五入,远离零)
    /// - None: 任一方非数值或类型不一致
    pub fn mean(a: &Value, b: &Value) -> Option<Value> {
        match (a, b) {
            (Value::Float(x), Value::Float(y)) => Some(Value::Float((x + y) / 2.0)),
            (Value::Int(x), Value::Int(y)) => {
                // 整除向零截断,先向远离零方向补 1
                let sum = *x as i128 + *y as i128;
                let mean = if sum >= 0 { (sum + 1) / 2 } else { (sum - 1) / 2 };
                Some(Value::Int(mean as i64))
            }
            _ => None,
        }
    }

    /// 回读校验用的近似相等 (非数值类型要求严格相等)
    pub fn approx_eq(&self, other: &Value, tolerance: f64) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() <= tolerance,
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Enum(v) => write!(f, "{}", v),
        }
    }
}

// ==========================================
// ConfigKey - 会话内配置身份
// ==========================================
// 创建时分配,改名不变; 撤销/重做与列查找均以此为键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigKey(Uuid);

impl ConfigKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConfigKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// DeriveFunc - 派生配置函数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeriveFunc {
    Tune,         // 工作点调整: QD/QF 族偏移
    Chromaticity, // 色品调整: 暂未实现偏移,原样复制
}

impl fmt::Display for DeriveFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeriveFunc::Tune => write!(f, "TUNE"),
            DeriveFunc::Chromaticity => write!(f, "CHROMATICITY"),
        }
    }
}
