//! 集成测试共用的打印机组件

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use inject::{bind, ComponentPath, Component, Container, Describe, FieldSpec, InjectError, Injected, Node, Shape, Value};

pub const PRINTER_A_MESSAGE: &str = "This message is from PrinterA";

pub trait Printer: Describe + Send + Sync {
    fn message(&self) -> String;
}

pub fn printer_path() -> ComponentPath {
    ComponentPath::new("inject", "Printer")
}

#[derive(Default)]
pub struct PrinterA;

impl Printer for PrinterA {
    fn message(&self) -> String {
        PRINTER_A_MESSAGE.to_string()
    }
}

impl Describe for PrinterA {
    fn describe(&self) -> Node {
        Node::record("PrinterA")
    }
}

impl Component for PrinterA {
    fn component_path() -> ComponentPath {
        ComponentPath::new("inject", "PrinterA")
    }

    fn fields(&self) -> Vec<FieldSpec> {
        Vec::new()
    }

    fn set_field(&mut self, name: &str, _value: Injected) -> Result<(), InjectError> {
        Err(InjectError::unknown_field(name))
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct PrinterB {
    pub message: String,
}

impl Printer for PrinterB {
    fn message(&self) -> String {
        self.message.clone()
    }
}

impl Describe for PrinterB {
    fn describe(&self) -> Node {
        Node::record("PrinterB").field("message", &self.message)
    }
}

impl Component for PrinterB {
    fn component_path() -> ComponentPath {
        ComponentPath::new("inject", "PrinterB")
    }

    fn fields(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::new("message", Shape::Text).inject()]
    }

    fn set_field(&mut self, name: &str, value: Injected) -> Result<(), InjectError> {
        match name {
            "message" => self.message = value.extract()?,
            _ => return Err(InjectError::unknown_field(name)),
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct PrinterC {
    pub message: String,
    pub count: usize,
}

impl Printer for PrinterC {
    fn message(&self) -> String {
        (0..self.count)
            .map(|i| format!("{}: {}\n", self.message, i))
            .collect()
    }
}

impl Describe for PrinterC {
    fn describe(&self) -> Node {
        Node::record("PrinterC")
            .field("message", &self.message)
            .field("count", &self.count)
    }
}

impl Component for PrinterC {
    fn component_path() -> ComponentPath {
        ComponentPath::new("inject", "PrinterC")
    }

    fn fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("message", Shape::Text),
            FieldSpec::new("count", Shape::Integer),
        ]
    }

    fn set_field(&mut self, name: &str, value: Injected) -> Result<(), InjectError> {
        match name {
            "message" => self.message = value.extract()?,
            "count" => self.count = value.extract()?,
            _ => return Err(InjectError::unknown_field(name)),
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct PrinterD {
    pub message1: String,
    pub message2: Value,
    pub flag: bool,
    pub message3: Value,
    pub value: f64,
    pub sub_printer: PrinterB,
}

impl Printer for PrinterD {
    fn message(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.message1,
            self.message2,
            self.flag,
            self.message3,
            self.value,
            self.sub_printer.message()
        )
    }
}

impl Describe for PrinterD {
    fn describe(&self) -> Node {
        Node::record("PrinterD")
            .field("message1", &self.message1)
            .field("message2", &self.message2)
            .field("flag", &self.flag)
            .field("message3", &self.message3)
            .field("value", &self.value)
            .field("sub_printer", &self.sub_printer)
    }
}

impl Component for PrinterD {
    fn component_path() -> ComponentPath {
        ComponentPath::new("inject", "PrinterD")
    }

    fn fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("message1", Shape::Text),
            FieldSpec::new("message2", Shape::Opaque),
            FieldSpec::new("flag", Shape::Boolean),
            FieldSpec::new("message3", Shape::Opaque),
            FieldSpec::new("value", Shape::Float),
            FieldSpec::new("sub_printer", Shape::nested::<PrinterB>()).inject(),
        ]
    }

    fn set_field(&mut self, name: &str, value: Injected) -> Result<(), InjectError> {
        match name {
            "message1" => self.message1 = value.extract()?,
            "message2" => self.message2 = value.extract()?,
            "flag" => self.flag = value.extract()?,
            "message3" => self.message3 = value.extract()?,
            "value" => self.value = value.extract()?,
            "sub_printer" => self.sub_printer = value.into_component()?,
            _ => return Err(InjectError::unknown_field(name)),
        }
        Ok(())
    }
}

/// 通过接口结构注入打印机的根对象
#[derive(Default)]
pub struct PrinterContainer {
    pub printer: Option<Arc<dyn Printer>>,
}

impl Describe for PrinterContainer {
    fn describe(&self) -> Node {
        Node::record("PrinterContainer").field("printer", &self.printer)
    }
}

impl Component for PrinterContainer {
    fn component_path() -> ComponentPath {
        ComponentPath::new("inject", "PrinterContainer")
    }

    fn fields(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::new("printer", Shape::Interface(printer_path())).structural()]
    }

    fn set_field(&mut self, name: &str, value: Injected) -> Result<(), InjectError> {
        match name {
            "printer" => self.printer = value.extract()?,
            _ => return Err(InjectError::unknown_field(name)),
        }
        Ok(())
    }
}

/// 注册全部打印机类型的容器
pub fn printer_container() -> Container {
    let container = Container::new();
    container.register_interface_as::<dyn Printer>(printer_path());
    container
        .register_injectable::<PrinterA>()
        .implements(bind!(PrinterA => dyn Printer));
    container
        .register_injectable::<PrinterB>()
        .implements(bind!(PrinterB => dyn Printer));
    container
        .register_injectable::<PrinterC>()
        .implements(bind!(PrinterC => dyn Printer));
    container
        .register_injectable::<PrinterD>()
        .implements(bind!(PrinterD => dyn Printer));
    container.register_factory::<PrinterContainer>(false);
    container
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
