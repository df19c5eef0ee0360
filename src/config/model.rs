//! Injection configuration model.
//!
//! The model is loaded wholesale (see [`super::loader::ConfigLoader`]) and only ever
//! read afterwards. Lookups accept either the short name or the canonical
//! `package.name` path and return the first match.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Value;

/// (package, name) identity of a component type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ComponentPath {
    pub name: String,
    #[serde(default)]
    pub package: String,
}

impl ComponentPath {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
        }
    }

    /// Derives a path from the Rust type name: the last segment becomes the name
    /// and the module segment right before it the package.
    pub fn of<T: ?Sized>() -> Self {
        Self::parse(std::any::type_name::<T>())
    }

    /// Parses a Rust type name (`dyn`, generic arguments and `+ Bounds` are dropped)
    /// or a dotted canonical path.
    pub fn parse(type_name: &str) -> Self {
        let trimmed = type_name.trim();
        let trimmed = trimmed.strip_prefix("dyn ").unwrap_or(trimmed);
        let trimmed = trimmed.split(" +").next().unwrap_or(trimmed);
        let trimmed = trimmed.split('<').next().unwrap_or(trimmed).trim();

        if let Some((module, name)) = trimmed.rsplit_once("::") {
            let package = module.rsplit("::").next().unwrap_or(module);
            return Self::new(package, name);
        }
        match trimmed.rsplit_once('.') {
            Some((package, name)) => Self::new(package, name),
            None => Self::new("", trimmed),
        }
    }

    /// Canonical dotted identifier `package.name`.
    pub fn canonical(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    /// True when `identifier` is this component's short name or canonical path.
    pub fn matches(&self, identifier: &str) -> bool {
        self.name == identifier || self.canonical() == identifier
    }
}

impl fmt::Display for ComponentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// 受管根对象声明
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FactoryDescription {
    #[serde(flatten)]
    pub path: ComponentPath,
    #[serde(rename = "is-singleton", default)]
    pub is_singleton: bool,
}

/// How an injectable may be reached by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectMode {
    /// Resolvable directly by its own name.
    Auto,
    /// Reachable only through an interface binding.
    #[default]
    Interface,
    /// Handed out by the factory named in `factory`.
    Factory,
}

/// 可注入的具体类型声明
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InjectableDescription {
    #[serde(flatten)]
    pub path: ComponentPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default)]
    pub mode: InjectMode,
}

/// 能力接口绑定
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InterfaceDescription {
    #[serde(flatten)]
    pub path: ComponentPath,
    #[serde(default)]
    pub injectable: String,
}

/// A name declared more than once in the same category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub category: &'static str,
    pub name: String,
    pub count: usize,
}

impl fmt::Display for Duplicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' declared {} times, the first declaration wins",
            self.category, self.name, self.count
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigurationData {
    #[serde(default)]
    pub factories: Vec<FactoryDescription>,
    #[serde(default)]
    pub injectables: Vec<InjectableDescription>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceDescription>,
}

impl ConfigurationData {
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty() && self.injectables.is_empty() && self.interfaces.is_empty()
    }

    pub fn factory(&self, identifier: &str) -> Option<&FactoryDescription> {
        self.factories.iter().find(|f| f.path.matches(identifier))
    }

    pub fn injectable(&self, identifier: &str) -> Option<&InjectableDescription> {
        self.injectables.iter().find(|i| i.path.matches(identifier))
    }

    pub fn interface(&self, identifier: &str) -> Option<&InterfaceDescription> {
        self.interfaces.iter().find(|i| i.path.matches(identifier))
    }

    /// Lists canonical paths declared more than once per category.
    pub fn duplicates(&self) -> Vec<Duplicate> {
        let mut found = Vec::new();
        collect_duplicates("factory", self.factories.iter().map(|f| &f.path), &mut found);
        collect_duplicates(
            "injectable",
            self.injectables.iter().map(|i| &i.path),
            &mut found,
        );
        collect_duplicates(
            "interface",
            self.interfaces.iter().map(|i| &i.path),
            &mut found,
        );
        found
    }
}

fn collect_duplicates<'a>(
    category: &'static str,
    paths: impl Iterator<Item = &'a ComponentPath>,
    out: &mut Vec<Duplicate>,
) {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for path in paths {
        let canonical = path.canonical();
        match counts.iter_mut().find(|(name, _)| *name == canonical) {
            Some((_, count)) => *count += 1,
            None => counts.push((canonical, 1)),
        }
    }
    out.extend(
        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, count)| Duplicate {
                category,
                name,
                count,
            }),
    );
}
