//! 结果集列描述

use serde::{Deserialize, Serialize};

use crate::protocol::messages::{
    ArrayTypeEntry, MapTypeEntry, StructTypeEntry, TypeId, UnionTypeEntry, UserDefinedTypeEntry,
};

/// 列的声明类型
///
/// 基本类型只保留类型标识；复合类型原样保留服务端给出的条目。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Primitive(TypeId),
    Map(MapTypeEntry),
    Union(UnionTypeEntry),
    Array(ArrayTypeEntry),
    Struct(StructTypeEntry),
    UserDefined(UserDefinedTypeEntry),
}

impl ColumnType {
    /// 类型名，例如 `INT_TYPE`、`MAP_TYPE`
    pub fn name(&self) -> &str {
        match self {
            ColumnType::Primitive(id) => id.name(),
            ColumnType::Map(_) => TypeId::Map.name(),
            ColumnType::Union(_) => TypeId::Union.name(),
            ColumnType::Array(_) => TypeId::Array.name(),
            ColumnType::Struct(_) => TypeId::Struct.name(),
            ColumnType::UserDefined(entry) => entry.type_class_name.as_str(),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 列描述
///
/// 只在产生它的操作句柄被替换之前有效。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub column_name: String,
    /// 类型描述中没有可识别条目时为 `None`
    pub column_type: Option<ColumnType>,
    pub comment: Option<String>,
}

impl ColumnDescriptor {
    pub fn type_name(&self) -> Option<&str> {
        self.column_type.as_ref().map(|t| t.name())
    }
}
