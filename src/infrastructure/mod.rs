//! 基础设施层
//!
//! - 组件描述（字段、形状、实例与接口转换）
//! - 注入容器（注册表、解析器、对象图构建、受管工厂）

pub mod component;
pub mod container;

pub use component::{
    AsAny, CastTable, Component, FieldSpec, FromInjected, Injected, Injection, Instance,
    NestedType, Shape,
};
pub use container::{
    global, ComponentType, Container, FactoryStats, InterfaceType, Registration, Resolver,
    ServiceLifetime,
};
