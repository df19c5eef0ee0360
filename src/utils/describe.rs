//! 调试用的对象树打印
//!
//! 输出格式仅用于排查注入结果，不是稳定的序列化格式。

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Write};
use std::sync::Arc;

use crate::types::Value;

/// 描述节点
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Record {
        name: String,
        fields: Vec<(String, Node)>,
    },
    List(Vec<Node>),
    Map(Vec<(String, Node)>),
    Text(String),
    Scalar(String),
    Nil,
}

impl Node {
    /// 开始描述一个结构体
    pub fn record(name: impl Into<String>) -> Self {
        Node::Record {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// 追加字段（仅对 `Record` 生效）
    pub fn field(mut self, name: &str, value: &(impl Describe + ?Sized)) -> Self {
        if let Node::Record { fields, .. } = &mut self {
            fields.push((name.to_string(), value.describe()));
        }
        self
    }

    pub fn scalar(value: impl Display) -> Self {
        Node::Scalar(value.to_string())
    }

    /// 渲染为缩进文本树
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, "");
        out
    }

    fn render_into(&self, out: &mut String, tabs: &str) {
        let inner = format!("{}  ", tabs);
        match self {
            Node::Record { name, fields } => {
                let _ = write!(out, "{} {{", name);
                render_entries(out, fields, tabs, &inner);
            }
            Node::Map(entries) => {
                out.push_str("map {");
                render_entries(out, entries, tabs, &inner);
            }
            Node::List(items) if items.is_empty() => out.push_str("[]"),
            Node::List(items) => {
                out.push_str("[\n");
                for (i, item) in items.iter().enumerate() {
                    out.push_str(&inner);
                    item.render_into(out, &inner);
                    if i + 1 < items.len() {
                        out.push(',');
                    }
                    out.push('\n');
                }
                let _ = write!(out, "{}]", tabs);
            }
            Node::Text(s) => {
                let _ = write!(out, "{:?}", s);
            }
            Node::Scalar(s) => out.push_str(s),
            Node::Nil => out.push_str("nil"),
        }
    }
}

fn render_entries(out: &mut String, entries: &[(String, Node)], tabs: &str, inner: &str) {
    for (key, node) in entries {
        let _ = write!(out, "\n{}{}: ", inner, key);
        node.render_into(out, inner);
    }
    let _ = write!(out, "\n{}}}", tabs);
}

/// 可被打印为对象树的类型
pub trait Describe {
    fn describe(&self) -> Node;
}

/// 打印任意已构建实例
pub fn describe(value: &(impl Describe + ?Sized)) -> String {
    value.describe().render()
}

impl Describe for String {
    fn describe(&self) -> Node {
        Node::Text(self.clone())
    }
}

impl Describe for str {
    fn describe(&self) -> Node {
        Node::Text(self.to_string())
    }
}

macro_rules! describe_scalar {
    ($($t:ty),*) => {
        $(
            impl Describe for $t {
                fn describe(&self) -> Node {
                    Node::scalar(self)
                }
            }
        )*
    };
}

describe_scalar!(bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<T: Describe> Describe for Vec<T> {
    fn describe(&self) -> Node {
        Node::List(self.iter().map(Describe::describe).collect())
    }
}

impl<T: Describe> Describe for [T] {
    fn describe(&self) -> Node {
        Node::List(self.iter().map(Describe::describe).collect())
    }
}

impl<K: Display, V: Describe> Describe for BTreeMap<K, V> {
    fn describe(&self) -> Node {
        Node::Map(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.describe()))
                .collect(),
        )
    }
}

impl<K: Display + Ord, V: Describe> Describe for HashMap<K, V> {
    fn describe(&self) -> Node {
        // 排序保证输出稳定
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Node::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.describe()))
                .collect(),
        )
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe(&self) -> Node {
        match self {
            Some(value) => value.describe(),
            None => Node::Nil,
        }
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe(&self) -> Node {
        (**self).describe()
    }
}

impl<T: Describe + ?Sized> Describe for Arc<T> {
    fn describe(&self) -> Node {
        (**self).describe()
    }
}

impl Describe for Value {
    fn describe(&self) -> Node {
        match self {
            Value::Null => Node::Nil,
            Value::Text(s) => Node::Text(s.clone()),
            Value::List(items) => items.describe(),
            Value::Map(map) => map.describe(),
            scalar => Node::scalar(scalar),
        }
    }
}
