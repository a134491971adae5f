//! 动态参数（DynArgs）与参数声明（ArgSpec）
//!
//! 用于参数形态只在运行期确定的事件：位置参数与具名参数都以 JSON 值表示。
//! 具名参数按名称排序存储，因此调用方以任意顺序书写具名参数，处理器收到的都是同一份参数。
//!
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EventResult, ValidationError};
use crate::eventing::{ArgsValidator, Event};

/// 一次发射的动态参数
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DynArgs {
    pub positional: Vec<Value>,
    pub named: Map<String, Value>,
}

impl DynArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个位置参数
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// 设置一个具名参数
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// 等待结果：恰好一个位置参数时取该值，否则取全部位置参数组成的数组。
    ///
    /// 具名参数不参与结果，会被丢弃。
    pub fn into_awaited(self) -> Value {
        let mut positional = self.positional;
        if positional.len() == 1 {
            positional.pop().unwrap_or(Value::Null)
        } else {
            Value::Array(positional)
        }
    }
}

impl Event<DynArgs> {
    /// 等待下一次发射，并按单值/元组规则取结果
    pub async fn next_value(&self) -> EventResult<Value> {
        Ok(self.next_emission().await?.into_awaited())
    }
}

/// 参数类型声明
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    Any,
    Null,
    Bool,
    Integer,
    /// 任意数字（整数或浮点）
    Float,
    String,
    Array,
    Object,
}

impl ArgKind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ArgKind::Any => true,
            ArgKind::Null => value.is_null(),
            ArgKind::Bool => value.is_boolean(),
            ArgKind::Integer => value.is_i64() || value.is_u64(),
            ArgKind::Float => value.is_number(),
            ArgKind::String => value.is_string(),
            ArgKind::Array => value.is_array(),
            ArgKind::Object => value.is_object(),
        }
    }
}

/// 事件声明的参数形态：位置参数 + 具名参数（保持声明顺序）
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    #[serde(default)]
    pub positional: Vec<ArgKind>,
    #[serde(default)]
    pub named: Vec<(String, ArgKind)>,
}

impl ArgSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(mut self, kind: ArgKind) -> Self {
        self.positional.push(kind);
        self
    }

    pub fn named(mut self, name: impl Into<String>, kind: ArgKind) -> Self {
        self.named.push((name.into(), kind));
        self
    }

    fn arity(&self) -> usize {
        self.positional.len() + self.named.len()
    }
}

/// 按 `ArgSpec` 校验动态参数
///
/// 绑定规则：位置参数先填充声明的位置槽位，再按声明顺序填充具名槽位；
/// 具名参数只能绑定到尚未绑定的已声明名称；所有声明的参数都必须绑定。
#[derive(Clone, Debug)]
pub struct ShapeValidator {
    spec: ArgSpec,
}

impl ShapeValidator {
    pub fn new(spec: ArgSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &ArgSpec {
        &self.spec
    }
}

impl ArgsValidator<DynArgs> for ShapeValidator {
    fn validate(&self, args: &DynArgs) -> Result<(), ValidationError> {
        let spec = &self.spec;
        if args.positional.len() > spec.arity() {
            return Err(ValidationError::new(format!(
                "expected at most {} positional arguments, got {}",
                spec.arity(),
                args.positional.len()
            )));
        }

        for (idx, value) in args.positional.iter().enumerate() {
            let (label, kind) = match spec.positional.get(idx) {
                Some(kind) => (format!("#{idx}"), *kind),
                None => {
                    let (name, kind) = &spec.named[idx - spec.positional.len()];
                    (format!("`{name}`"), *kind)
                }
            };
            if !kind.matches(value) {
                return Err(ValidationError::new(format!(
                    "argument {label} expected {kind:?}, got {value}"
                )));
            }
        }

        let bound_by_position = args.positional.len().saturating_sub(spec.positional.len());
        for name in args.named.keys() {
            match spec.named.iter().position(|(n, _)| n == name) {
                None => {
                    return Err(ValidationError::new(format!(
                        "unexpected argument `{name}`"
                    )));
                }
                Some(slot) if slot < bound_by_position => {
                    return Err(ValidationError::new(format!(
                        "argument `{name}` given both positionally and by name"
                    )));
                }
                Some(_) => {}
            }
        }

        if args.positional.len() < spec.positional.len() {
            return Err(ValidationError::new(format!(
                "missing positional argument #{}",
                args.positional.len()
            )));
        }

        for (name, kind) in spec.named.iter().skip(bound_by_position) {
            let Some(value) = args.named.get(name) else {
                return Err(ValidationError::new(format!("missing argument `{name}`")));
            };
            if !kind.matches(value) {
                return Err(ValidationError::new(format!(
                    "argument `{name}` expected {kind:?}, got {value}"
                )));
            }
        }

        Ok(())
    }
}
