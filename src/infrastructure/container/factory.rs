//! 受管根对象工厂
//!
//! 每个根类型一个工厂：单例在首次请求时构建并缓存，瞬态每次重新构建。
//! 单例的“检查-构建-写入”由每个工厂自己的互斥锁保护，保证只构建一次。

use std::any::{type_name, Any, TypeId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::{Container, ServiceLifetime};
use crate::config::{ComponentPath, ConfigurationData};
use crate::infrastructure::component::{CastTable, Component};
use crate::types::Args;

/// 单次请求的结果
pub(crate) enum Outcome {
    Cached(Arc<dyn Any + Send + Sync>),
    Built(Arc<dyn Any + Send + Sync>),
    Failed,
}

/// 类型擦除后的工厂
pub(crate) trait ManagedFactory: Send + Sync {
    fn path(&self) -> &ComponentPath;

    fn type_label(&self) -> &'static str;

    /// 注册时的策略，可被配置中的 `factories` 条目覆盖
    fn lifetime(&self, config: &ConfigurationData) -> ServiceLifetime;

    fn casts(&self) -> Arc<CastTable>;

    fn instance(&self, container: &Container, args: Option<&Args>) -> Outcome;

    fn reset(&self);

    fn is_cached(&self) -> bool;
}

struct Factory<T> {
    path: ComponentPath,
    is_singleton: bool,
    instance: Mutex<Option<Arc<T>>>,
}

impl<T: Component + Default> Factory<T> {
    fn new(is_singleton: bool) -> Self {
        Self {
            path: T::component_path(),
            is_singleton,
            instance: Mutex::new(None),
        }
    }

    fn build(&self, container: &Container, args: Option<&Args>) -> Option<Arc<T>> {
        match container.build_with(args, None, false) {
            Ok(root) => Some(Arc::new(root)),
            Err(e) => {
                tracing::warn!("构建受管实例 {} 失败: {}", self.path, e);
                None
            }
        }
    }
}

impl<T: Component + Default> ManagedFactory for Factory<T> {
    fn path(&self) -> &ComponentPath {
        &self.path
    }

    fn type_label(&self) -> &'static str {
        type_name::<T>()
    }

    fn lifetime(&self, config: &ConfigurationData) -> ServiceLifetime {
        let is_singleton = config
            .factory(&self.path.canonical())
            .or_else(|| config.factory(&self.path.name))
            .map(|f| f.is_singleton)
            .unwrap_or(self.is_singleton);
        if is_singleton {
            ServiceLifetime::Singleton
        } else {
            ServiceLifetime::Transient
        }
    }

    fn casts(&self) -> Arc<CastTable> {
        Arc::new(CastTable::identity::<T>())
    }

    fn instance(&self, container: &Container, args: Option<&Args>) -> Outcome {
        let config = container.configuration();
        match self.lifetime(&config) {
            ServiceLifetime::Singleton => {
                // 构建期间持有锁
                let mut cached = self.instance.lock();
                if let Some(root) = cached.as_ref() {
                    return Outcome::Cached(root.clone());
                }
                match self.build(container, args) {
                    Some(root) => {
                        *cached = Some(root.clone());
                        Outcome::Built(root)
                    }
                    None => Outcome::Failed,
                }
            }
            ServiceLifetime::Transient => match self.build(container, args) {
                Some(root) => Outcome::Built(root),
                None => Outcome::Failed,
            },
        }
    }

    fn reset(&self) {
        self.instance.lock().take();
    }

    fn is_cached(&self) -> bool {
        self.instance.lock().is_some()
    }
}

/// 内部统计信息（原子计数器）
#[derive(Default)]
struct InnerStats {
    requests: AtomicUsize,
    cache_hits: AtomicUsize,
    builds: AtomicUsize,
    build_failures: AtomicUsize,
}

/// 工厂统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactoryStats {
    pub requests: usize,
    pub cache_hits: usize,
    pub builds: usize,
    pub build_failures: usize,
}

impl FactoryStats {
    pub fn total(&self) -> usize {
        self.requests
    }

    /// 缓存命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total() as f64
        }
    }
}

/// 工厂注册表
#[derive(Default)]
pub struct FactoryRegistry {
    factories: DashMap<TypeId, Arc<dyn ManagedFactory>>,
    stats: InnerStats,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Component + Default>(&self, is_singleton: bool) {
        let factory = Factory::<T>::new(is_singleton);
        tracing::debug!(
            "注册工厂 {} ({})",
            factory.path,
            if is_singleton { "singleton" } else { "transient" }
        );
        self.factories.insert(TypeId::of::<T>(), Arc::new(factory));
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.factories.contains_key(&TypeId::of::<T>())
    }

    pub fn is_cached<T: 'static>(&self) -> bool {
        self.factory(&TypeId::of::<T>())
            .map(|factory| factory.is_cached())
            .unwrap_or(false)
    }

    pub fn get<T: Component>(&self, container: &Container, args: Option<&Args>) -> Option<Arc<T>> {
        let Some(factory) = self.factory(&TypeId::of::<T>()) else {
            tracing::debug!("{} 没有注册工厂", type_name::<T>());
            return None;
        };
        self.request(factory.as_ref(), container, args)?
            .downcast::<T>()
            .ok()
    }

    /// 按名称或规范路径取受管实例，返回 (实例, 类型名, 转换表)
    pub(crate) fn get_by_path(
        &self,
        container: &Container,
        reference: &str,
        args: Option<&Args>,
    ) -> Option<(Arc<dyn Any + Send + Sync>, &'static str, Arc<CastTable>)> {
        let config = container.configuration();
        let declared = config.factory(reference).map(|f| f.path.clone());
        // 克隆出 Arc 后再构建，避免构建期间持有分片锁
        let factory = self
            .factories
            .iter()
            .find(|entry| {
                let path = entry.value().path();
                path.matches(reference) || declared.as_ref() == Some(path)
            })
            .map(|entry| entry.value().clone());
        let Some(factory) = factory else {
            tracing::warn!("引用的工厂 '{}' 未注册", reference);
            return None;
        };
        let value = self.request(factory.as_ref(), container, args)?;
        Some((value, factory.type_label(), factory.casts()))
    }

    fn factory(&self, type_id: &TypeId) -> Option<Arc<dyn ManagedFactory>> {
        self.factories.get(type_id).map(|entry| entry.value().clone())
    }

    fn request(
        &self,
        factory: &dyn ManagedFactory,
        container: &Container,
        args: Option<&Args>,
    ) -> Option<Arc<dyn Any + Send + Sync>> {
        self.stats.requests.fetch_add(1, Ordering::Relaxed);
        match factory.instance(container, args) {
            Outcome::Cached(value) => {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Outcome::Built(value) => {
                self.stats.builds.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Outcome::Failed => {
                self.stats.build_failures.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// 清空所有单例缓存
    pub fn reset_all(&self) {
        for entry in self.factories.iter() {
            entry.value().reset();
        }
    }

    pub fn clear(&self) {
        self.factories.clear();
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn stats(&self) -> FactoryStats {
        FactoryStats {
            requests: self.stats.requests.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            builds: self.stats.builds.load(Ordering::Relaxed),
            build_failures: self.stats.build_failures.load(Ordering::Relaxed),
        }
    }
}
