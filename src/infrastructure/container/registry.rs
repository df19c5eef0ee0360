//! 类型注册表
//!
//! 保存“能构建什么”：接口名称表与可注入类型表。只做查找、插入与重置。

use std::any::{type_name, Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::ComponentPath;
use crate::infrastructure::component::{make_default, CastTable, Component};

/// 已注册的可注入具体类型
#[derive(Clone)]
pub struct ComponentType {
    pub path: ComponentPath,
    pub type_id: TypeId,
    pub type_name: &'static str,
    make: fn() -> Box<dyn Component>,
    casts: Arc<CastTable>,
}

impl ComponentType {
    pub fn of<T: Component + Default>() -> Self {
        Self {
            path: T::component_path(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            make: make_default::<T>,
            casts: Arc::new(CastTable::identity::<T>()),
        }
    }

    /// 零值实例
    pub(crate) fn instantiate(&self) -> Box<dyn Component> {
        (self.make)()
    }

    pub(crate) fn casts(&self) -> Arc<CastTable> {
        self.casts.clone()
    }

    /// 可转换的句柄类型
    pub fn provides(&self) -> Vec<&'static str> {
        self.casts.targets()
    }
}

/// 已注册的能力接口
#[derive(Debug, Clone)]
pub struct InterfaceType {
    pub path: ComponentPath,
    /// `Arc<dyn Trait>` 的类型 ID
    pub handle_id: TypeId,
    pub type_name: &'static str,
}

/// 注册表
#[derive(Default)]
pub struct Registry {
    interfaces: DashMap<String, InterfaceType>,
    injectables: DashMap<String, ComponentType>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_interface<I: ?Sized + Any>(&self, path: ComponentPath) {
        let key = path.canonical();
        tracing::debug!("注册接口 {} ({})", key, type_name::<I>());
        self.interfaces.insert(
            key,
            InterfaceType {
                path,
                handle_id: TypeId::of::<Arc<I>>(),
                type_name: type_name::<I>(),
            },
        );
    }

    pub fn add_injectable<T: Component + Default>(&self, path: ComponentPath) -> Registration<'_, T> {
        let key = path.canonical();
        tracing::debug!("注册可注入类型 {} ({})", key, type_name::<T>());
        let mut entry = ComponentType::of::<T>();
        entry.path = path;
        self.injectables.insert(key.clone(), entry);
        Registration {
            registry: self,
            key,
            _marker: PhantomData,
        }
    }

    /// 按规范路径查找，找不到时按短名称取第一个匹配
    pub fn injectable(&self, identifier: &str) -> Option<ComponentType> {
        if let Some(entry) = self.injectables.get(identifier) {
            return Some(entry.value().clone());
        }
        self.injectables
            .iter()
            .find(|entry| entry.path.matches(identifier))
            .map(|entry| entry.value().clone())
    }

    pub fn interface(&self, identifier: &str) -> Option<InterfaceType> {
        if let Some(entry) = self.interfaces.get(identifier) {
            return Some(entry.value().clone());
        }
        self.interfaces
            .iter()
            .find(|entry| entry.path.matches(identifier))
            .map(|entry| entry.value().clone())
    }

    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }

    pub fn injectable_count(&self) -> usize {
        self.injectables.len()
    }

    pub fn clear(&self) {
        self.interfaces.clear();
        self.injectables.clear();
    }
}

/// 注册句柄，用于声明具体类型实现的接口
pub struct Registration<'a, T> {
    registry: &'a Registry,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Component> Registration<'a, T> {
    /// 声明 `T` 可作为 `Arc<I>` 注入，转换函数通常由 `bind!` 生成
    pub fn implements<I>(self, cast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        if let Some(mut entry) = self.registry.injectables.get_mut(&self.key) {
            Arc::make_mut(&mut entry.casts).insert::<T, I>(cast);
        }
        self
    }
}
