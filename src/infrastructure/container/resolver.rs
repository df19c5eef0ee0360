//! 解析器：类型标识 -> 可注入声明
//!
//! 接口绑定优先；否则仅当同名可注入声明为 `auto` 模式时才直接使用。

use crate::config::{ConfigurationData, InjectMode, InjectableDescription, InterfaceDescription};

pub struct Resolver<'a> {
    config: &'a ConfigurationData,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a ConfigurationData) -> Self {
        Self { config }
    }

    pub fn resolve(&self, identifier: &str) -> Option<&'a InjectableDescription> {
        if let Some(interface) = self.config.interface(identifier) {
            match self.chosen(interface) {
                Some(injectable) => {
                    tracing::debug!("{} -> {} (接口绑定)", identifier, injectable.path);
                    return Some(injectable);
                }
                None => tracing::debug!(
                    "接口 {} 选择的实现 '{}' 未声明",
                    interface.path,
                    interface.injectable
                ),
            }
        }

        let direct = self
            .config
            .injectable(identifier)
            .filter(|injectable| injectable.mode == InjectMode::Auto);
        match direct {
            Some(injectable) => tracing::debug!("{} -> {} (auto)", identifier, injectable.path),
            None => tracing::debug!("{} 无可用绑定", identifier),
        }
        direct
    }

    /// 接口选择的实现声明
    pub fn chosen(&self, interface: &InterfaceDescription) -> Option<&'a InjectableDescription> {
        if interface.injectable.is_empty() {
            return None;
        }
        self.config.injectable(&interface.injectable)
    }

    /// 每个已声明接口及其解析结果
    pub fn bindings(&self) -> Vec<(&'a InterfaceDescription, Option<&'a InjectableDescription>)> {
        self.config
            .interfaces
            .iter()
            .map(|interface| (interface, self.chosen(interface)))
            .collect()
    }
}
