//! 受管工厂的集成测试

#![allow(clippy::uninlined_format_args, clippy::print_stdout)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use futures_util::future;
use inject::{
    register_singleton, register_transient, ComponentPath, Component, Container, Describe,
    FieldSpec, InjectError, Injected, Node, Shape,
};

/// 构建较慢的根对象，用于放大并发竞争窗口
#[derive(Default)]
struct SlowRoot {
    label: String,
}

impl Describe for SlowRoot {
    fn describe(&self) -> Node {
        Node::record("SlowRoot").field("label", &self.label)
    }
}

impl Component for SlowRoot {
    fn component_path() -> ComponentPath {
        ComponentPath::new("app", "SlowRoot")
    }

    fn fields(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::new("label", Shape::Text).inject().value("slow")]
    }

    fn set_field(&mut self, name: &str, value: Injected) -> Result<(), InjectError> {
        match name {
            "label" => {
                std::thread::sleep(Duration::from_millis(5));
                self.label = value.extract()?;
            }
            _ => return Err(InjectError::unknown_field(name)),
        }
        Ok(())
    }
}

/// 字面默认值非法，构建必然失败
#[derive(Default)]
struct BrokenRoot {
    count: i32,
}

impl Describe for BrokenRoot {
    fn describe(&self) -> Node {
        Node::record("BrokenRoot").field("count", &self.count)
    }
}

impl Component for BrokenRoot {
    fn fields(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::new("count", Shape::Integer).inject().value("many")]
    }

    fn set_field(&mut self, name: &str, value: Injected) -> Result<(), InjectError> {
        match name {
            "count" => self.count = value.extract()?,
            _ => return Err(InjectError::unknown_field(name)),
        }
        Ok(())
    }
}

#[test]
fn test_singleton_returns_same_instance_until_reset() {
    let container = Container::new();
    register_singleton!(container, SlowRoot);

    let first = container.get_managed_instance::<SlowRoot>(None).unwrap();
    let second = container.get_managed_instance::<SlowRoot>(None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.label, "slow");

    container.reset_instances();
    let third = container.get_managed_instance::<SlowRoot>(None).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn test_transient_returns_new_instance_each_time() {
    let container = Container::new();
    register_transient!(container, SlowRoot);

    let first = container.get_managed_instance::<SlowRoot>(None).unwrap();
    let second = container.get_managed_instance::<SlowRoot>(None).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(!container.is_cached::<SlowRoot>());
}

#[test]
fn test_build_failure_yields_none() {
    let container = Container::new();
    register_singleton!(container, BrokenRoot);

    assert!(container.get_managed_instance::<BrokenRoot>(None).is_none());
    assert!(!container.is_cached::<BrokenRoot>());

    let stats = container.factory_stats();
    assert_eq!(stats.requests, 1);
    assert_eq!(stats.build_failures, 1);
    assert_eq!(stats.builds, 0);
}

#[test]
fn test_singleton_ignores_args_once_cached() {
    let container = Container::new();
    register_singleton!(container, SlowRoot);

    let args = inject::args! { "label" => "custom" };
    let first = container.get_managed_instance::<SlowRoot>(Some(&args)).unwrap();
    assert_eq!(first.label, "custom");

    let other = inject::args! { "label" => "other" };
    let second = container.get_managed_instance::<SlowRoot>(Some(&other)).unwrap();
    assert_eq!(second.label, "custom");
}

#[test]
fn test_factory_mediated_injection_shares_managed_instance() {
    let container = printer_container();
    container.register_factory::<PrinterB>(false);
    container
        .import_configuration(fixture("injection-config.factory.json"))
        .unwrap();

    let first = container.build::<PrinterContainer>().unwrap();
    let second = container.build::<PrinterContainer>().unwrap();
    let managed = container.get_managed_instance::<PrinterB>(None).unwrap();

    let first_ptr = Arc::as_ptr(first.printer.as_ref().unwrap()) as *const u8;
    let second_ptr = Arc::as_ptr(second.printer.as_ref().unwrap()) as *const u8;
    let managed_ptr = Arc::as_ptr(&managed) as *const u8;
    assert_eq!(first_ptr, second_ptr);
    assert_eq!(first_ptr, managed_ptr);
}

#[test]
fn test_reset_unregisters_factories() {
    let container = Container::new();
    register_singleton!(container, SlowRoot);
    assert!(container.is_registered::<SlowRoot>());

    container.reset();
    assert!(!container.is_registered::<SlowRoot>());
    assert!(container.get_managed_instance::<SlowRoot>(None).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_singleton_requests_build_once() {
    let container = Container::new();
    register_singleton!(container, SlowRoot);

    let mut handles = vec![];
    for _ in 0..64 {
        let container_clone = container.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            container_clone.get_managed_instance::<SlowRoot>(None).unwrap()
        }));
    }

    let results = future::join_all(handles).await;

    let first = results[0].as_ref().unwrap().clone();
    for result in results {
        assert!(Arc::ptr_eq(&result.unwrap(), &first));
    }

    let stats = container.factory_stats();
    assert_eq!(stats.builds, 1);
    assert_eq!(stats.requests, 64);
    assert_eq!(stats.cache_hits, 63);
    assert!(stats.hit_rate() > 0.9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_builds_are_independent() {
    let container = printer_container();
    container
        .import_configuration(fixture("injection-config.qa.toml"))
        .unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let container_clone = container.clone();
            tokio::task::spawn_blocking(move || {
                container_clone
                    .build::<PrinterContainer>()
                    .unwrap()
                    .printer
                    .unwrap()
                    .message()
            })
        })
        .collect();

    for message in future::join_all(handles).await {
        assert_eq!(message.unwrap(), "x: 0\nx: 1\nx: 2\n");
    }
}
