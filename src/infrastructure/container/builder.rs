//! 对象图构建
//!
//! 按字段声明顺序处理每个带注入标记的字段：
//! 字面默认值 -> 结构注入 -> 命名参数 / 位置参数 / 产出值 的优先级提交。
//! 构建不做回滚，失败前已写入的字段保持原样。

use std::collections::HashMap;
use std::sync::Arc;

use super::registry::ComponentType;
use super::resolver::Resolver;
use super::Container;
use crate::config::{ConfigurationData, InjectMode, InjectableDescription};
use crate::errors::InjectError;
use crate::infrastructure::component::{Component, FieldSpec, Injected, Instance, NestedType, Shape};
use crate::types::{Args, Value};

/// 字段内部名与对外名的双向映射，仅记录两者不同的字段
#[derive(Debug, Default)]
pub(crate) struct RemapTable {
    forward: HashMap<&'static str, &'static str>,
    reverse: HashMap<&'static str, &'static str>,
}

impl RemapTable {
    pub(crate) fn of(fields: &[FieldSpec]) -> Self {
        let mut table = Self::default();
        for field in fields.iter().filter(|f| f.is_injectable()) {
            let external = field.external_name();
            if external != field.name {
                table.forward.insert(field.name, external);
                table.reverse.insert(external, field.name);
            }
        }
        table
    }

    pub(crate) fn external(&self, internal: &'static str) -> &'static str {
        self.forward.get(internal).copied().unwrap_or(internal)
    }

    pub(crate) fn internal<'k>(&self, key: &'k str) -> &'k str {
        self.reverse.get(key).copied().unwrap_or(key)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// 布尔字面值：仅这些写法为假
pub(crate) fn parse_bool_literal(literal: &str) -> bool {
    !matches!(
        literal.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "nil" | "none" | "null" | ""
    )
}

/// 字面默认值解析结果；映射与列表同时作为子对象构建的参数
#[derive(Default)]
struct Literal {
    produced: Option<Injected>,
    named: Option<Args>,
    positional: Option<Vec<Value>>,
}

fn invalid_default(spec: &FieldSpec, literal: &str, reason: impl ToString) -> InjectError {
    InjectError::InvalidDefault {
        field: spec.name.to_string(),
        literal: literal.to_string(),
        reason: reason.to_string(),
    }
}

pub(crate) struct Injector<'a> {
    container: &'a Container,
    config: Arc<ConfigurationData>,
}

impl<'a> Injector<'a> {
    pub(crate) fn new(container: &'a Container) -> Self {
        Self {
            container,
            config: container.configuration(),
        }
    }

    /// 就地构建 `target`
    pub(crate) fn build(
        &self,
        target: &mut dyn Component,
        named: Option<&Args>,
        positional: Option<&[Value]>,
        remap: bool,
    ) -> Result<(), InjectError> {
        let fields = target.fields();
        let label = target.type_label();
        let table = remap.then(|| RemapTable::of(&fields));

        for (index, spec) in fields.iter().enumerate() {
            if !spec.is_injectable() {
                continue;
            }
            if !spec.settable {
                tracing::debug!("{}.{} 只读，跳过", label, spec.name);
                continue;
            }

            let mut literal = match spec.default {
                Some(text) => self.parse_literal(spec, text, remap)?,
                None => Literal::default(),
            };

            if spec.is_structural() {
                let resolved = self
                    .resolve_structural(spec, &literal, remap)
                    .map_err(|e| e.in_field(label, spec.name))?;
                if let Some(instance) = resolved {
                    literal.produced = Some(Injected::Component(instance));
                }
            }

            if literal.produced.is_none() && spec.shape.is_structured() {
                tracing::debug!("{}.{} 未解析，保持零值", label, spec.name);
                continue;
            }

            let key = table
                .as_ref()
                .map(|t| t.external(spec.name))
                .unwrap_or(spec.name);
            let value = if let Some(arg) = named.and_then(|args| args.get(key)) {
                Some(self.argument(spec, arg.clone(), remap)?)
            } else if let Some(arg) = positional.and_then(|args| args.get(index)) {
                Some(self.argument(spec, arg.clone(), remap)?)
            } else {
                literal.produced
            };

            if let Some(value) = value {
                target
                    .set_field(spec.name, value)
                    .map_err(|e| e.in_field(label, spec.name))?;
            }
        }
        Ok(())
    }

    fn parse_literal(
        &self,
        spec: &FieldSpec,
        text: &str,
        remap: bool,
    ) -> Result<Literal, InjectError> {
        // 空字面值等同于未声明默认值
        if text.is_empty() && !matches!(spec.shape, Shape::Text | Shape::Boolean) {
            return Ok(Literal::default());
        }
        let value = match &spec.shape {
            Shape::Text => Value::Text(text.to_string()),
            Shape::Integer => text
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| invalid_default(spec, text, e))?,
            Shape::Float => text
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| invalid_default(spec, text, e))?,
            Shape::Boolean => Value::Bool(parse_bool_literal(text)),
            Shape::List => {
                let Value::List(items) = parse_json(spec, text)? else {
                    return Err(invalid_default(spec, text, "expected a JSON list"));
                };
                return Ok(Literal {
                    produced: Some(Value::List(items.clone()).into()),
                    named: None,
                    positional: Some(items),
                });
            }
            Shape::Map => {
                let Value::Map(map) = parse_json(spec, text)? else {
                    return Err(invalid_default(spec, text, "expected a JSON object"));
                };
                let named = map.clone().into_iter().collect();
                return Ok(Literal {
                    produced: Some(Value::Map(map).into()),
                    named: Some(named),
                    positional: None,
                });
            }
            Shape::Struct(nested) => {
                let Value::Map(map) = parse_json(spec, text)? else {
                    return Err(invalid_default(spec, text, "expected a JSON object"));
                };
                let named: Args = map.into_iter().collect();
                let instance = self.build_nested(nested, Some(&named), None, remap)?;
                return Ok(Literal {
                    produced: Some(Injected::Component(instance)),
                    named: Some(named),
                    positional: None,
                });
            }
            Shape::Interface(_) | Shape::Opaque => {
                tracing::debug!("{} 的形状 {:?} 不支持字面默认值", spec.name, spec.shape);
                return Ok(Literal::default());
            }
        };
        Ok(Literal {
            produced: Some(value.into()),
            ..Default::default()
        })
    }

    fn resolve_structural(
        &self,
        spec: &FieldSpec,
        literal: &Literal,
        remap: bool,
    ) -> Result<Option<Instance>, InjectError> {
        let Some(path) = spec.shape.type_path() else {
            tracing::debug!("{} 不是结构或接口字段，无法结构注入", spec.name);
            return Ok(None);
        };
        let resolver = Resolver::new(&self.config);
        let Some(description) = resolver
            .resolve(&path.canonical())
            .or_else(|| resolver.resolve(&path.name))
        else {
            return Ok(None);
        };
        self.materialize(
            description,
            literal.named.as_ref(),
            literal.positional.as_deref(),
            remap,
            None,
        )
    }

    /// 按声明构建具体实例：工厂模式取受管实例，否则新建并合并 `params`。
    /// `explicit` 中的参数由调用方显式给出，`params` 不会覆盖它们。
    pub(crate) fn materialize(
        &self,
        description: &InjectableDescription,
        named: Option<&Args>,
        positional: Option<&[Value]>,
        remap: bool,
        explicit: Option<&Args>,
    ) -> Result<Option<Instance>, InjectError> {
        let registry = self.container.registry();
        let registered = registry
            .injectable(&description.path.canonical())
            .or_else(|| registry.injectable(&description.path.name));

        if description.mode == InjectMode::Factory {
            if let Some(instance) = self.managed(description, registered.as_ref()) {
                return Ok(Some(instance));
            }
            tracing::debug!("{} 没有可用的受管实例，改为直接构建", description.path);
        }

        let Some(component_type) = registered else {
            tracing::warn!("{} 已在配置中声明但未注册", description.path);
            return Ok(None);
        };
        self.build_registered(
            &component_type,
            description.params.as_ref(),
            named,
            positional,
            remap,
            explicit,
        )
        .map(Some)
    }

    pub(crate) fn build_registered(
        &self,
        component_type: &ComponentType,
        params: Option<&Value>,
        named: Option<&Args>,
        positional: Option<&[Value]>,
        remap: bool,
        explicit: Option<&Args>,
    ) -> Result<Instance, InjectError> {
        let mut component = component_type.instantiate();
        self.build(&mut *component, named, positional, remap)?;
        if let Some(params) = params {
            self.fill_struct_fields(&mut *component, params, remap, explicit)?;
        }
        Ok(Instance::owned(component, component_type.casts()))
    }

    fn managed(
        &self,
        description: &InjectableDescription,
        registered: Option<&ComponentType>,
    ) -> Option<Instance> {
        let reference = description.factory.as_deref()?;
        let (value, label, casts) =
            self.container
                .factories()
                .get_by_path(self.container, reference, None)?;
        // 注册表里的转换表带有接口转换
        let concrete = (*value).type_id();
        let casts = registered
            .filter(|ty| ty.type_id == concrete)
            .map(|ty| ty.casts())
            .unwrap_or(casts);
        tracing::debug!("{} 使用工厂 {} 的受管实例", description.path, reference);
        Some(Instance::shared(value, label, casts))
    }

    fn build_nested(
        &self,
        nested: &NestedType,
        named: Option<&Args>,
        positional: Option<&[Value]>,
        remap: bool,
    ) -> Result<Instance, InjectError> {
        let mut component = nested.make();
        self.build(&mut *component, named, positional, remap)?;
        Ok(Instance::owned(component, nested.casts()))
    }

    /// 参数值转为字段值；结构字段收到映射时构建新的子对象
    fn argument(&self, spec: &FieldSpec, arg: Value, remap: bool) -> Result<Injected, InjectError> {
        match (&spec.shape, arg) {
            (Shape::Struct(nested), Value::Map(map)) => {
                let named: Args = map.into_iter().collect();
                self.build_nested(nested, Some(&named), None, remap)
                    .map(Injected::Component)
            }
            (_, arg) => Ok(Injected::Value(arg)),
        }
    }

    /// 把默认参数合并进已构建的实例，跳过 `keep` 中已显式给出的字段
    pub(crate) fn fill_struct_fields(
        &self,
        target: &mut dyn Component,
        data: &Value,
        remap: bool,
        keep: Option<&Args>,
    ) -> Result<(), InjectError> {
        let fields = target.fields();
        let label = target.type_label();
        let table = remap.then(|| RemapTable::of(&fields));
        let kept = |spec: &FieldSpec| {
            let key = table
                .as_ref()
                .map(|t| t.external(spec.name))
                .unwrap_or(spec.name);
            spec.is_injectable() && keep.is_some_and(|args| args.contains_key(key))
        };

        match data {
            Value::Null => {}
            Value::List(items) => {
                for (spec, item) in fields.iter().zip(items) {
                    if !kept(spec) {
                        self.assign(target, spec, item.clone(), remap)?;
                    }
                }
            }
            Value::Map(map) => {
                for (key, item) in map {
                    let name = table
                        .as_ref()
                        .map(|t| t.internal(key))
                        .unwrap_or(key.as_str());
                    match fields.iter().find(|f| f.name == name) {
                        Some(spec) if kept(spec) => {
                            tracing::debug!("{}.{} 已由命名参数给出，忽略配置值", label, spec.name)
                        }
                        Some(spec) => self.assign(target, spec, item.clone(), remap)?,
                        None => tracing::debug!("{} 没有字段 '{}'，忽略", label, key),
                    }
                }
            }
            other => {
                if let Some(first) = fields.first().filter(|f| !kept(*f)) {
                    tracing::debug!("标量默认参数写入 {} 的第一个字段 {}", label, first.name);
                    self.assign(target, first, other.clone(), remap)?;
                }
            }
        }
        Ok(())
    }

    fn assign(
        &self,
        target: &mut dyn Component,
        spec: &FieldSpec,
        value: Value,
        remap: bool,
    ) -> Result<(), InjectError> {
        if !spec.settable {
            return Ok(());
        }
        let label = target.type_label();
        let injected = self
            .argument(spec, value, remap)
            .map_err(|e| e.in_field(label, spec.name))?;
        match target.set_field(spec.name, injected) {
            Err(e) if e.is_unknown_field() => Ok(()),
            other => other.map_err(|e| e.in_field(label, spec.name)),
        }
    }
}

fn parse_json(spec: &FieldSpec, text: &str) -> Result<Value, InjectError> {
    serde_json::from_str(text).map_err(|e| invalid_default(spec, text, e))
}
