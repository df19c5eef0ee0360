//! 组件描述
//!
//! 宿主为每个可构建的结构体实现一次 [`Component`]：按声明顺序列出字段（[`FieldSpec`]），
//! 并提供按字段名写入的类型化 setter。注入引擎只通过这两者访问结构体。

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::config::ComponentPath;
use crate::errors::InjectError;
use crate::types::{FromValue, Value};
use crate::utils::describe::Describe;

/// 类型擦除辅助
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

/// 可注入结构体
pub trait Component: AsAny + Describe {
    /// 注册与配置匹配所用的标识
    fn component_path() -> ComponentPath
    where
        Self: Sized,
    {
        ComponentPath::of::<Self>()
    }

    /// 全部字段，按声明顺序
    fn fields(&self) -> Vec<FieldSpec>;

    /// 写入单个字段；未知或只读字段返回 `InjectError::UnknownField`
    fn set_field(&mut self, name: &str, value: Injected) -> Result<(), InjectError>;

    fn type_label(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// 字段的声明形状，决定字面默认值如何解析
#[derive(Clone)]
pub enum Shape {
    Text,
    Integer,
    Float,
    Boolean,
    List,
    Map,
    /// 具体结构体（按值、`Box` 或 `Arc` 持有）
    Struct(NestedType),
    /// 能力接口，按名称经解析器绑定到具体实现
    Interface(ComponentPath),
    /// 不支持字面默认值的形状
    Opaque,
}

impl Shape {
    pub fn nested<T: Component + Default>() -> Self {
        Shape::Struct(NestedType::of::<T>())
    }

    pub fn interface<I: ?Sized>() -> Self {
        Shape::Interface(ComponentPath::of::<I>())
    }

    /// 用于解析器查找的类型标识
    pub fn type_path(&self) -> Option<ComponentPath> {
        match self {
            Shape::Struct(nested) => Some(nested.path()),
            Shape::Interface(path) => Some(path.clone()),
            _ => None,
        }
    }

    /// Struct/Interface 字段在没有产出值时不读取参数
    pub fn is_structured(&self) -> bool {
        matches!(self, Shape::Struct(_) | Shape::Interface(_))
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Text => write!(f, "Text"),
            Shape::Integer => write!(f, "Integer"),
            Shape::Float => write!(f, "Float"),
            Shape::Boolean => write!(f, "Boolean"),
            Shape::List => write!(f, "List"),
            Shape::Map => write!(f, "Map"),
            Shape::Struct(nested) => write!(f, "Struct({})", nested.path()),
            Shape::Interface(path) => write!(f, "Interface({})", path),
            Shape::Opaque => write!(f, "Opaque"),
        }
    }
}

/// 嵌套结构体的构造信息
#[derive(Clone, Copy)]
pub struct NestedType {
    path: fn() -> ComponentPath,
    make: fn() -> Box<dyn Component>,
    casts: fn() -> CastTable,
}

impl NestedType {
    pub fn of<T: Component + Default>() -> Self {
        Self {
            path: T::component_path,
            make: make_default::<T>,
            casts: CastTable::identity::<T>,
        }
    }

    pub fn path(&self) -> ComponentPath {
        (self.path)()
    }

    pub(crate) fn make(&self) -> Box<dyn Component> {
        (self.make)()
    }

    pub(crate) fn casts(&self) -> Arc<CastTable> {
        Arc::new((self.casts)())
    }
}

pub(crate) fn make_default<T: Component + Default>() -> Box<dyn Component> {
    Box::new(T::default())
}

/// 注入标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injection {
    /// 对外名称（命名参数与重映射使用）
    pub external: &'static str,
    /// 是否经解析器构建子对象
    pub structural: bool,
}

/// 字段描述
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: Shape,
    pub injection: Option<Injection>,
    pub default: Option<&'static str>,
    pub settable: bool,
}

impl FieldSpec {
    /// 未标记字段：只参与参数默认值合并
    pub fn new(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            injection: None,
            default: None,
            settable: true,
        }
    }

    pub fn inject(self) -> Self {
        let name = self.name;
        self.inject_as(name)
    }

    pub fn inject_as(mut self, external: &'static str) -> Self {
        let structural = self.injection.map(|i| i.structural).unwrap_or(false);
        self.injection = Some(Injection {
            external,
            structural,
        });
        self
    }

    /// 标记为结构注入（隐含注入标记）
    pub fn structural(mut self) -> Self {
        let external = self.injection.map(|i| i.external).unwrap_or(self.name);
        self.injection = Some(Injection {
            external,
            structural: true,
        });
        self
    }

    /// 字面默认值
    pub fn value(mut self, literal: &'static str) -> Self {
        self.default = Some(literal);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.settable = false;
        self
    }

    pub fn is_injectable(&self) -> bool {
        self.injection.is_some()
    }

    pub fn is_structural(&self) -> bool {
        self.injection.map(|i| i.structural).unwrap_or(false)
    }

    pub fn external_name(&self) -> &'static str {
        self.injection.map(|i| i.external).unwrap_or(self.name)
    }
}

type CastFn =
    Arc<dyn Fn(Arc<dyn Any + Send + Sync>) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// 具体类型到可用句柄类型（`Arc<T>`、`Arc<dyn Trait>`）的转换表
#[derive(Clone, Default)]
pub struct CastTable {
    casts: HashMap<TypeId, (CastFn, &'static str)>,
}

impl CastTable {
    /// 仅包含 `Arc<T>` 本身
    pub fn identity<T: Any + Send + Sync>() -> Self {
        let mut table = Self::default();
        table.insert::<T, T>(|component| component);
        table
    }

    pub fn insert<T, I>(&mut self, cast: fn(Arc<T>) -> Arc<I>)
    where
        T: Any + Send + Sync,
        I: ?Sized + Send + Sync + 'static,
    {
        let f: CastFn = Arc::new(move |any: Arc<dyn Any + Send + Sync>| {
            any.downcast::<T>()
                .ok()
                .map(|concrete| Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
        });
        self.casts.insert(TypeId::of::<Arc<I>>(), (f, type_name::<I>()));
    }

    pub fn supports<I: ?Sized + 'static>(&self) -> bool {
        self.casts.contains_key(&TypeId::of::<Arc<I>>())
    }

    /// 支持的句柄类型名称
    pub fn targets(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.casts.values().map(|(_, name)| *name).collect();
        names.sort_unstable();
        names
    }

    fn cast<I: ?Sized + Send + Sync + 'static>(
        &self,
        any: Arc<dyn Any + Send + Sync>,
    ) -> Option<Arc<I>> {
        let (f, _) = self.casts.get(&TypeId::of::<Arc<I>>())?;
        f(any)?.downcast::<Arc<I>>().ok().map(|handle| *handle)
    }
}

enum Slot {
    Owned(Box<dyn Component>),
    Shared(Arc<dyn Any + Send + Sync>),
}

/// 已构建的组件实例
pub struct Instance {
    label: &'static str,
    slot: Slot,
    casts: Arc<CastTable>,
}

impl Instance {
    pub(crate) fn owned(component: Box<dyn Component>, casts: Arc<CastTable>) -> Self {
        Self {
            label: component.type_label(),
            slot: Slot::Owned(component),
            casts,
        }
    }

    pub(crate) fn shared(
        value: Arc<dyn Any + Send + Sync>,
        label: &'static str,
        casts: Arc<CastTable>,
    ) -> Self {
        Self {
            label,
            slot: Slot::Shared(value),
            casts,
        }
    }

    pub fn type_label(&self) -> &'static str {
        self.label
    }

    /// 是否为工厂托管的共享实例
    pub fn is_shared(&self) -> bool {
        matches!(self.slot, Slot::Shared(_))
    }

    pub fn as_component(&self) -> Option<&dyn Component> {
        match &self.slot {
            Slot::Owned(component) => Some(&**component),
            Slot::Shared(_) => None,
        }
    }

    /// 按值取出具体结构体（仅限非共享实例）
    pub fn into_component<T: Component>(self) -> Result<T, InjectError> {
        let label = self.label;
        match self.slot {
            Slot::Owned(component) => AsAny::into_any(component)
                .downcast::<T>()
                .map(|boxed| *boxed)
                .map_err(|_| InjectError::TypeMismatch {
                    expected: type_name::<T>().to_string(),
                    actual: label.to_string(),
                }),
            Slot::Shared(_) => Err(InjectError::TypeMismatch {
                expected: type_name::<T>().to_string(),
                actual: format!("shared {}", label),
            }),
        }
    }

    /// 转换为 `Arc<T>` 或已声明实现的 `Arc<dyn Trait>`
    pub fn into_shared<I: ?Sized + Send + Sync + 'static>(self) -> Result<Arc<I>, InjectError> {
        let any: Arc<dyn Any + Send + Sync> = match self.slot {
            Slot::Owned(component) => Arc::from(AsAny::into_any(component)),
            Slot::Shared(value) => value,
        };
        self.casts
            .cast::<I>(any)
            .ok_or_else(|| InjectError::TypeMismatch {
                expected: type_name::<Arc<I>>().to_string(),
                actual: self.label.to_string(),
            })
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.label)
            .field("shared", &self.is_shared())
            .field("casts", &self.casts.targets())
            .finish()
    }
}

/// 写入字段的值：动态值或已构建的组件
#[derive(Debug)]
pub enum Injected {
    Value(Value),
    Component(Instance),
}

impl Injected {
    pub fn extract<T: FromInjected>(self) -> Result<T, InjectError> {
        T::from_injected(self)
    }

    pub fn into_component<T: Component>(self) -> Result<T, InjectError> {
        match self {
            Injected::Component(instance) => instance.into_component(),
            Injected::Value(value) => Err(InjectError::coercion(type_name::<T>(), value)),
        }
    }
}

impl From<Value> for Injected {
    fn from(value: Value) -> Self {
        Injected::Value(value)
    }
}

/// 从 [`Injected`] 提取字段类型
pub trait FromInjected: Sized {
    fn from_injected(value: Injected) -> Result<Self, InjectError>;
}

fn value_only<T: FromValue>(value: Injected) -> Result<T, InjectError> {
    match value {
        Injected::Value(value) => T::from_value(value),
        Injected::Component(instance) => Err(InjectError::TypeMismatch {
            expected: type_name::<T>().to_string(),
            actual: instance.type_label().to_string(),
        }),
    }
}

macro_rules! from_injected_value {
    ($($t:ty),*) => {
        $(
            impl FromInjected for $t {
                fn from_injected(value: Injected) -> Result<Self, InjectError> {
                    value_only(value)
                }
            }
        )*
    };
}

from_injected_value!(
    Value, String, bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64
);

impl<T: FromValue> FromInjected for Vec<T> {
    fn from_injected(value: Injected) -> Result<Self, InjectError> {
        value_only(value)
    }
}

impl<T: FromValue> FromInjected for BTreeMap<String, T> {
    fn from_injected(value: Injected) -> Result<Self, InjectError> {
        value_only(value)
    }
}

impl<T: FromValue> FromInjected for HashMap<String, T> {
    fn from_injected(value: Injected) -> Result<Self, InjectError> {
        value_only(value)
    }
}

impl<T: FromInjected> FromInjected for Option<T> {
    fn from_injected(value: Injected) -> Result<Self, InjectError> {
        match value {
            Injected::Value(Value::Null) => Ok(None),
            other => T::from_injected(other).map(Some),
        }
    }
}

impl<I: ?Sized + Send + Sync + 'static> FromInjected for Arc<I> {
    fn from_injected(value: Injected) -> Result<Self, InjectError> {
        match value {
            Injected::Component(instance) => instance.into_shared::<I>(),
            Injected::Value(value) => Err(InjectError::coercion(type_name::<Arc<I>>(), value)),
        }
    }
}

impl<T: Component> FromInjected for Box<T> {
    fn from_injected(value: Injected) -> Result<Self, InjectError> {
        value.into_component::<T>().map(Box::new)
    }
}

/// 生成 `Arc<具体类型>` 到 `Arc<dyn 接口>` 的转换函数：
/// `registration.implements(bind!(PrinterA => dyn Printer))`
#[macro_export]
macro_rules! bind {
    ($concrete:ty => $iface:ty) => {
        |component: ::std::sync::Arc<$concrete>| -> ::std::sync::Arc<$iface> {
            let bound: ::std::sync::Arc<$iface> = component;
            bound
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::describe::Node;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    #[derive(Default, Debug, PartialEq)]
    struct Hello {
        name: String,
    }

    impl Greeter for Hello {
        fn greet(&self) -> String {
            format!("hello {}", self.name)
        }
    }

    impl Describe for Hello {
        fn describe(&self) -> Node {
            Node::record("Hello").field("name", &self.name)
        }
    }

    impl Component for Hello {
        fn fields(&self) -> Vec<FieldSpec> {
            vec![FieldSpec::new("name", Shape::Text).inject()]
        }

        fn set_field(&mut self, name: &str, value: Injected) -> Result<(), InjectError> {
            match name {
                "name" => self.name = value.extract()?,
                _ => return Err(InjectError::unknown_field(name)),
            }
            Ok(())
        }
    }

    fn hello_instance(name: &str) -> Instance {
        let mut casts = CastTable::identity::<Hello>();
        casts.insert::<Hello, dyn Greeter>(crate::bind!(Hello => dyn Greeter));
        Instance::owned(
            Box::new(Hello {
                name: name.to_string(),
            }),
            Arc::new(casts),
        )
    }

    #[test]
    fn test_field_spec_builder() {
        let spec = FieldSpec::new("count", Shape::Integer)
            .inject_as("Count")
            .value("12");
        assert!(spec.is_injectable());
        assert!(!spec.is_structural());
        assert_eq!(spec.external_name(), "Count");
        assert_eq!(spec.default, Some("12"));

        let spec = FieldSpec::new("printer", Shape::Opaque).structural();
        assert!(spec.is_structural());
        assert_eq!(spec.external_name(), "printer");

        let plain = FieldSpec::new("hidden", Shape::Text).read_only();
        assert!(!plain.is_injectable());
        assert!(!plain.settable);
    }

    #[test]
    fn test_instance_into_interface() {
        let greeter: Arc<dyn Greeter> = hello_instance("rust").into_shared().unwrap();
        assert_eq!(greeter.greet(), "hello rust");
    }

    #[test]
    fn test_instance_into_concrete() {
        let hello: Hello = hello_instance("a").into_component().unwrap();
        assert_eq!(hello.name, "a");

        let shared: Arc<Hello> = hello_instance("b").into_shared().unwrap();
        assert_eq!(shared.name, "b");
    }

    #[test]
    fn test_instance_unknown_cast_fails() {
        trait Other: Send + Sync {}
        let result = hello_instance("a").into_shared::<dyn Other>();
        assert!(matches!(result, Err(InjectError::TypeMismatch { .. })));
    }

    #[test]
    fn test_shared_instance_cannot_be_taken_by_value() {
        let shared: Arc<dyn Any + Send + Sync> = Arc::new(Hello::default());
        let instance = Instance::shared(
            shared,
            "Hello",
            Arc::new(CastTable::identity::<Hello>()),
        );
        assert!(instance.is_shared());
        assert!(instance.into_component::<Hello>().is_err());
    }

    #[test]
    fn test_from_injected_option_and_mismatch() {
        let none: Option<Arc<dyn Greeter>> = Injected::Value(Value::Null).extract().unwrap();
        assert!(none.is_none());

        let some: Option<Arc<dyn Greeter>> = Injected::Component(hello_instance("x"))
            .extract()
            .unwrap();
        assert_eq!(some.unwrap().greet(), "hello x");

        let err = Injected::Component(hello_instance("x")).extract::<String>();
        assert!(matches!(err, Err(InjectError::TypeMismatch { .. })));

        let err = Injected::Value(Value::Int(1)).extract::<Arc<dyn Greeter>>();
        assert!(matches!(err, Err(InjectError::Coercion { .. })));
    }

    #[test]
    fn test_set_field_through_trait_object() {
        let mut component: Box<dyn Component> = Box::new(Hello::default());
        component
            .set_field("name", Injected::Value(Value::from("dyn")))
            .unwrap();
        assert!(component
            .set_field("missing", Injected::Value(Value::Null))
            .unwrap_err()
            .is_unknown_field());
        assert_eq!(component.fields().len(), 1);
    }
}
