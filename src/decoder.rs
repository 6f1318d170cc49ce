//! 结果解码
//!
//! 把协议中的类型描述和带标签的值联合体转换为 `ColumnType` / `Value`。
//! 纯函数，无状态。

use crate::core::types::{ColumnDescriptor, ColumnType, ResultRow, Value};
use crate::protocol::messages::{ColumnDesc, ColumnValue, Row, TypeDesc};

/// 取类型描述中第一个有可识别条目的类型
///
/// 同一条目内按 primitive、map、union、array、struct、user-defined 的顺序检查。
pub fn get_type(type_desc: &TypeDesc) -> Option<ColumnType> {
    type_desc.types.iter().find_map(|entry| {
        if let Some(primitive) = &entry.primitive_entry {
            Some(ColumnType::Primitive(primitive.type_id))
        } else if let Some(map) = &entry.map_entry {
            Some(ColumnType::Map(map.clone()))
        } else if let Some(union) = &entry.union_entry {
            Some(ColumnType::Union(union.clone()))
        } else if let Some(array) = &entry.array_entry {
            Some(ColumnType::Array(array.clone()))
        } else if let Some(st) = &entry.struct_entry {
            Some(ColumnType::Struct(st.clone()))
        } else {
            entry
                .user_defined_type_entry
                .as_ref()
                .map(|udt| ColumnType::UserDefined(udt.clone()))
        }
    })
}

/// 解码单个值
///
/// 标签检查顺序：bool、byte、i16、i32、i64、double、string。
/// 没有任何标签，或标签内的值为空时返回 `None`。
pub fn get_value(col_value: &ColumnValue) -> Option<Value> {
    if let Some(v) = &col_value.bool_val {
        v.value.map(Value::Bool)
    } else if let Some(v) = &col_value.byte_val {
        v.value.map(Value::Byte)
    } else if let Some(v) = &col_value.i16_val {
        v.value.map(Value::I16)
    } else if let Some(v) = &col_value.i32_val {
        v.value.map(Value::I32)
    } else if let Some(v) = &col_value.i64_val {
        v.value.map(Value::I64)
    } else if let Some(v) = &col_value.double_val {
        v.value.map(Value::Double)
    } else if let Some(v) = &col_value.string_val {
        v.value.clone().map(Value::String)
    } else {
        None
    }
}

pub fn decode_row(row: &Row) -> ResultRow {
    row.col_vals.iter().map(get_value).collect()
}

pub fn decode_column(column: &ColumnDesc) -> ColumnDescriptor {
    ColumnDescriptor {
        column_name: column.column_name.clone(),
        column_type: get_type(&column.type_desc),
        comment: column.comment.clone(),
    }
}
