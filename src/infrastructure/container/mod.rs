//! 注入容器
//!
//! [`Container`] 持有注册表、受管工厂与当前生效的配置。注册与导入配置在初始化阶段完成；
//! 构建只读注册表，每次构建取一份配置快照，可在多个线程上并发进行。

pub mod builder;
pub mod factory;
pub mod registry;
pub mod resolver;

use std::any::{type_name, Any};
use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::config::{ComponentPath, ConfigLoader, ConfigurationData, InjectableDescription};
use crate::errors::{ConfigError, InjectError};
use crate::infrastructure::component::{Component, Instance};
use crate::types::{Args, Value};
use crate::utils::describe::Describe;

use builder::Injector;
pub use factory::{FactoryRegistry, FactoryStats};
pub use registry::{ComponentType, InterfaceType, Registration, Registry};
pub use resolver::Resolver;

/// 受管根对象的生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifetime {
    /// 首次请求时构建，之后共享同一实例
    Singleton,
    /// 每次请求新建
    Transient,
}

struct ContainerInner {
    registry: Registry,
    factories: FactoryRegistry,
    config: RwLock<Arc<ConfigurationData>>,
}

/// 依赖注入容器，克隆后共享同一份状态
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

lazy_static! {
    static ref GLOBAL: Container = Container::new();
}

/// 进程级容器，首次访问时创建
pub fn global() -> &'static Container {
    &GLOBAL
}

impl Container {
    pub fn new() -> Self {
        Self::with_configuration(ConfigurationData::default())
    }

    pub fn with_configuration(config: ConfigurationData) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                registry: Registry::new(),
                factories: FactoryRegistry::new(),
                config: RwLock::new(Arc::new(config)),
            }),
        }
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub(crate) fn factories(&self) -> &FactoryRegistry {
        &self.inner.factories
    }

    // ---- 配置 ----

    /// 当前配置快照
    pub fn configuration(&self) -> Arc<ConfigurationData> {
        self.inner.config.read().clone()
    }

    /// 整体替换配置并清空单例缓存
    pub fn load_configuration(&self, config: ConfigurationData) {
        for duplicate in config.duplicates() {
            tracing::warn!("{}", duplicate);
        }
        tracing::info!(
            "导入注入配置: {} 个工厂, {} 个可注入类型, {} 个接口",
            config.factories.len(),
            config.injectables.len(),
            config.interfaces.len()
        );
        *self.inner.config.write() = Arc::new(config);
        self.reset_instances();
    }

    /// 读取配置文件（按扩展名选择 TOML / JSON / YAML）
    pub fn import_configuration(&self, source: impl AsRef<Path>) -> Result<(), ConfigError> {
        let config = ConfigLoader::new().load(source)?;
        self.load_configuration(config);
        Ok(())
    }

    /// 导入失败时记录原因并以退出码 1 结束进程
    pub fn import_configuration_or_exit(&self, source: impl AsRef<Path>) {
        if let Err(e) = self.import_configuration(source) {
            tracing::error!("无法导入注入配置: {}", e);
            std::process::exit(1);
        }
    }

    // ---- 注册 ----

    /// 以类型名推导的路径注册接口，如 `register_interface::<dyn Printer>()`
    pub fn register_interface<I: ?Sized + Any>(&self) -> ComponentPath {
        let path = ComponentPath::of::<I>();
        self.inner.registry.add_interface::<I>(path.clone());
        path
    }

    pub fn register_interface_as<I: ?Sized + Any>(&self, path: ComponentPath) {
        self.inner.registry.add_interface::<I>(path);
    }

    pub fn register_injectable<T: Component + Default>(&self) -> Registration<'_, T> {
        self.inner.registry.add_injectable::<T>(T::component_path())
    }

    pub fn register_injectable_as<T: Component + Default>(
        &self,
        path: ComponentPath,
    ) -> Registration<'_, T> {
        self.inner.registry.add_injectable::<T>(path)
    }

    pub fn register_factory<T: Component + Default>(&self, is_singleton: bool) {
        self.inner.factories.register::<T>(is_singleton);
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.inner.factories.is_registered::<T>()
    }

    pub fn injectable_type(&self, identifier: &str) -> Option<ComponentType> {
        self.inner.registry.injectable(identifier)
    }

    pub fn interface_type(&self, identifier: &str) -> Option<InterfaceType> {
        self.inner.registry.interface(identifier)
    }

    // ---- 构建 ----

    /// 当前配置下 `identifier` 解析到的声明
    pub fn resolve(&self, identifier: &str) -> Option<InjectableDescription> {
        let config = self.configuration();
        Resolver::new(&config).resolve(identifier).cloned()
    }

    pub fn build<T: Component + Default>(&self) -> Result<T, InjectError> {
        self.build_with(None, None, false)
    }

    pub fn build_with_args<T: Component + Default>(&self, args: &Args) -> Result<T, InjectError> {
        self.build_with(Some(args), None, false)
    }

    /// 命名参数按字段的对外名称匹配
    pub fn build_with_remap<T: Component + Default>(
        &self,
        args: Option<&Args>,
    ) -> Result<T, InjectError> {
        self.build_with(args, None, true)
    }

    pub fn build_with_positional<T: Component + Default>(
        &self,
        args: &[Value],
    ) -> Result<T, InjectError> {
        self.build_with(None, Some(args), false)
    }

    pub fn build_with<T: Component + Default>(
        &self,
        named: Option<&Args>,
        positional: Option<&[Value]>,
        remap: bool,
    ) -> Result<T, InjectError> {
        let mut target = T::default();
        Injector::new(self).build(&mut target, named, positional, remap)?;
        Ok(target)
    }

    /// 按名称动态构建：先经解析器，再直接查已注册类型。
    /// 显式给出的命名参数优先于配置中的 `params`。
    pub fn build_named(&self, identifier: &str, args: Option<&Args>) -> Result<Instance, InjectError> {
        let injector = Injector::new(self);
        let config = self.configuration();
        if let Some(description) = Resolver::new(&config).resolve(identifier) {
            if let Some(instance) = injector.materialize(description, args, None, false, args)? {
                return Ok(instance);
            }
        }
        match self.inner.registry.injectable(identifier) {
            Some(component_type) => {
                let params = config
                    .injectable(&component_type.path.canonical())
                    .and_then(|d| d.params.as_ref());
                injector.build_registered(&component_type, params, args, None, false, args)
            }
            None => Err(InjectError::InvalidTarget(identifier.to_string())),
        }
    }

    /// 就地注入已有实例
    pub fn inject(&self, target: &mut dyn Component) -> Result<(), InjectError> {
        Injector::new(self).build(target, None, None, false)
    }

    pub fn inject_with_args(
        &self,
        target: &mut dyn Component,
        args: &Args,
        remap: bool,
    ) -> Result<(), InjectError> {
        Injector::new(self).build(target, Some(args), None, remap)
    }

    pub fn inject_with_positional(
        &self,
        target: &mut dyn Component,
        args: &[Value],
    ) -> Result<(), InjectError> {
        Injector::new(self).build(target, None, Some(args), false)
    }

    /// 把默认参数（列表、映射或标量）合并进已有实例
    pub fn fill_struct_fields(
        &self,
        target: &mut dyn Component,
        data: &Value,
        remap: bool,
    ) -> Result<(), InjectError> {
        Injector::new(self).fill_struct_fields(target, data, remap, None)
    }

    // ---- 受管实例 ----

    /// 构建失败或未注册工厂时返回 `None`
    pub fn get_managed_instance<T: Component + Default>(&self, args: Option<&Args>) -> Option<Arc<T>> {
        tracing::debug!("请求受管实例 {}", type_name::<T>());
        self.inner.factories.get::<T>(self, args)
    }

    pub fn is_cached<T: 'static>(&self) -> bool {
        self.inner.factories.is_cached::<T>()
    }

    pub fn factory_stats(&self) -> FactoryStats {
        self.inner.factories.stats()
    }

    /// 清空所有单例缓存
    pub fn reset_instances(&self) {
        self.inner.factories.reset_all();
    }

    /// 清空注册表、工厂与配置
    pub fn reset(&self) {
        self.inner.factories.clear();
        self.inner.registry.clear();
        *self.inner.config.write() = Arc::new(ConfigurationData::default());
    }

    /// 对象树调试输出
    pub fn describe(&self, value: &(impl Describe + ?Sized)) -> String {
        crate::utils::describe::describe(value)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

/// 注册单例工厂
#[macro_export]
macro_rules! register_singleton {
    ($container:expr, $type:ty) => {
        $container.register_factory::<$type>(true)
    };
}

/// 注册瞬态工厂
#[macro_export]
macro_rules! register_transient {
    ($container:expr, $type:ty) => {
        $container.register_factory::<$type>(false)
    };
}

/// 取受管实例
#[macro_export]
macro_rules! managed {
    ($container:expr, $type:ty) => {
        $container.get_managed_instance::<$type>(None)
    };
    ($container:expr, $type:ty, $args:expr) => {
        $container.get_managed_instance::<$type>(Some($args))
    };
}
